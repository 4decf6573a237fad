//! Genetic mutation probability and generation.

use crate::catalog::PatternSet;
use crate::config::GeneticsConfig;
use crate::random::RandomProvider;
use chrono::{DateTime, Utc};
use felis_data::{
    Gene, GeneticProfile, InheritanceType, InheritedTrait, Mutation, MutationEffect,
    MutationOrigin, TraitInheritancePattern, TraitValue,
};
use std::collections::BTreeMap;

/// Fraction of shared genetic markers whose values differ. 0 when nothing is shared.
#[must_use]
pub fn genetic_diversity(parent1: &GeneticProfile, parent2: &GeneticProfile) -> f64 {
    let mut total = 0usize;
    let mut differences = 0usize;
    for (_, mine, theirs) in parent1.common_markers(parent2) {
        total += 1;
        if mine != theirs {
            differences += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        differences as f64 / total as f64
    }
}

pub struct MutationEngine<'a> {
    config: &'a GeneticsConfig,
}

impl<'a> MutationEngine<'a> {
    #[must_use]
    pub fn new(config: &'a GeneticsConfig) -> Self {
        Self { config }
    }

    /// Probability that any single inherited trait mutates, in `[0, mutation_cap]`.
    #[must_use]
    pub fn mutation_probability(&self, parent1: &GeneticProfile, parent2: &GeneticProfile) -> f64 {
        let diversity = genetic_diversity(parent1, parent2);
        let mut probability = self.config.mutation_base_rate * (1.0 + diversity);

        let avg_generation =
            ((f64::from(parent1.generation) + f64::from(parent2.generation)) / 2.0).max(1.0);
        probability *= 1.0 + avg_generation.log10() * self.config.generation_weight;

        if probability.is_nan() {
            return 0.0;
        }
        probability.clamp(0.0, self.config.mutation_cap)
    }

    /// Rolls every inherited trait once against `probability`.
    ///
    /// Traits without a catalog pattern, or whose pattern produces no change,
    /// yield no record.
    pub fn apply_mutations<R: RandomProvider + ?Sized>(
        &self,
        traits: &BTreeMap<String, InheritedTrait>,
        probability: f64,
        patterns: &PatternSet,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, Mutation> {
        let mut mutations = BTreeMap::new();

        for (trait_name, value) in traits {
            if rng.uniform() >= probability {
                continue;
            }
            let Some(pattern) = patterns.get(trait_name) else {
                continue;
            };
            if let Some(effect) = generate_effect(value, pattern, rng) {
                mutations.insert(
                    trait_name.clone(),
                    Mutation {
                        origin: MutationOrigin::Trait(trait_name.clone()),
                        kind: effect.kind().to_string(),
                        strength: effect_strength(&effect, pattern),
                        permanent: true,
                        effect: Some(effect),
                        timestamp: now,
                    },
                );
            }
        }

        mutations
    }
}

fn generate_effect<R: RandomProvider + ?Sized>(
    value: &InheritedTrait,
    pattern: &TraitInheritancePattern,
    rng: &mut R,
) -> Option<MutationEffect> {
    match pattern.inheritance_type {
        InheritanceType::Simple => {
            let current = value.expressed_alleles();
            let candidates: Vec<&str> = pattern
                .alleles()
                .filter(|allele| !current.contains(allele))
                .collect();
            if candidates.is_empty() {
                return None;
            }
            let allele = candidates[rng.pick(candidates.len())].to_string();
            Some(MutationEffect::AlleleSwap { allele })
        }
        InheritanceType::Complex => {
            let mut genes = BTreeMap::new();
            for marker in &pattern.gene_markers {
                if rng.uniform() < pattern.mutation_rates.base {
                    genes.insert(marker.clone(), rng.uniform());
                }
            }
            (!genes.is_empty()).then_some(MutationEffect::GeneReroll { genes })
        }
        InheritanceType::Polygenic => {
            let InheritedTrait::Polygenic { value, .. } = value else {
                return None;
            };
            let factor = 1.0 + rng.gaussian(0.0, pattern.mutation_rates.modifier);
            Some(MutationEffect::PolygenicShift {
                factor,
                value: value * factor,
            })
        }
    }
}

/// Share of the trait the mutation changed, in [0, 1].
fn effect_strength(effect: &MutationEffect, pattern: &TraitInheritancePattern) -> f64 {
    match effect {
        MutationEffect::AlleleSwap { .. } => 1.0,
        MutationEffect::GeneReroll { genes } => {
            genes.len() as f64 / pattern.gene_markers.len().max(1) as f64
        }
        MutationEffect::PolygenicShift { factor, .. } => (factor - 1.0).abs().min(1.0),
    }
}

/// Storable trait value of `inherited` with `effect` applied.
#[must_use]
pub fn express_mutation(inherited: &InheritedTrait, effect: &MutationEffect) -> TraitValue {
    match (effect, inherited.to_trait_value()) {
        (MutationEffect::AlleleSwap { allele }, _) => TraitValue::Allele(allele.clone()),
        (MutationEffect::GeneReroll { genes }, TraitValue::Genes(mut current)) => {
            for (marker, level) in genes {
                current.insert(marker.clone(), Gene::Level(*level));
            }
            TraitValue::Genes(current)
        }
        (MutationEffect::GeneReroll { genes }, _) => TraitValue::Genes(
            genes
                .iter()
                .map(|(marker, level)| (marker.clone(), Gene::Level(*level)))
                .collect(),
        ),
        (MutationEffect::PolygenicShift { factor, .. }, TraitValue::Genes(current)) => {
            TraitValue::Genes(
                current
                    .into_iter()
                    .map(|(marker, gene)| match gene {
                        Gene::Level(v) => (marker, Gene::Level(v * factor)),
                        other => (marker, other),
                    })
                    .collect(),
            )
        }
        (MutationEffect::PolygenicShift { .. }, value) => value,
    }
}
