//! Breeding workflow: the inheritance pipeline, child and founder profiles,
//! and pairing rules.

use crate::catalog::PatternSet;
use crate::config::{AppConfig, BreedingConfig};
use crate::fitness::FitnessScorer;
use crate::inheritance::InheritanceCalculator;
use crate::mutation::{express_mutation, genetic_diversity, MutationEngine};
use crate::random::RandomProvider;
use chrono::{DateTime, Utc};
use felis_data::{
    CatId, EvolutionStage, Gene, GeneticProfile, InheritanceResult, InheritanceType, TraitValue,
};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Share of common genetic markers the two profiles agree on.
///
/// Profiles with no marker in common have nothing to compare and score 0.0.
#[must_use]
pub fn genetic_similarity(parent1: &GeneticProfile, parent2: &GeneticProfile) -> f64 {
    if parent1.common_markers(parent2).next().is_none() {
        return 0.0;
    }
    1.0 - genetic_diversity(parent1, parent2)
}

/// Reason a pair may not breed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Incompatibility {
    #[error("Parents are too similar ({similarity:.2} > {limit:.2})")]
    TooSimilar { similarity: f64, limit: f64 },

    #[error("Generation gap {gap} exceeds {limit}")]
    GenerationGap { gap: u32, limit: u32 },

    #[error("Cat {cat_id} is at stage {stage}, needs {required}")]
    StageTooLow {
        cat_id: CatId,
        stage: EvolutionStage,
        required: EvolutionStage,
    },
}

/// Every rule the pair breaks; empty when they may breed.
#[must_use]
pub fn check_compatibility(
    config: &BreedingConfig,
    parent1: (&GeneticProfile, EvolutionStage),
    parent2: (&GeneticProfile, EvolutionStage),
) -> Vec<Incompatibility> {
    let mut issues = Vec::new();

    let similarity = genetic_similarity(parent1.0, parent2.0);
    let limit = 1.0 - config.min_breeding_diversity;
    if similarity > limit {
        issues.push(Incompatibility::TooSimilar { similarity, limit });
    }

    let gap = parent1.0.generation.abs_diff(parent2.0.generation);
    if gap > config.max_generation_gap {
        issues.push(Incompatibility::GenerationGap {
            gap,
            limit: config.max_generation_gap,
        });
    }

    for (profile, stage) in [parent1, parent2] {
        if stage < config.min_breeding_stage {
            issues.push(Incompatibility::StageTooLow {
                cat_id: profile.cat_id,
                stage,
                required: config.min_breeding_stage,
            });
        }
    }

    issues
}

/// Child markers: a uniform pick where both parents carry the marker, the
/// present value otherwise.
pub fn combine_markers<R: RandomProvider + ?Sized>(
    parent1: &GeneticProfile,
    parent2: &GeneticProfile,
    rng: &mut R,
) -> BTreeMap<String, Gene> {
    let mut markers = parent1.genetic_markers.clone();
    for (name, theirs) in &parent2.genetic_markers {
        match markers.get_mut(name) {
            Some(mine) => {
                if rng.pick(2) == 1 {
                    *mine = theirs.clone();
                }
            }
            None => {
                markers.insert(name.clone(), theirs.clone());
            }
        }
    }
    markers
}

/// Parents first, then their recorded ancestors, without repeats.
#[must_use]
pub fn lineage_path(parents: &[&GeneticProfile], depth: usize) -> Vec<CatId> {
    let mut seen = HashSet::new();
    parents
        .iter()
        .map(|p| p.cat_id)
        .chain(parents.iter().flat_map(|p| p.lineage_path.iter().copied()))
        .filter(|id| seen.insert(*id))
        .take(depth)
        .collect()
}

/// One past the oldest parent's generation; 1 for founders.
#[must_use]
pub fn child_generation(parents: &[&GeneticProfile]) -> u32 {
    parents
        .iter()
        .map(|p| p.generation)
        .max()
        .map_or(1, |g| g.saturating_add(1))
}

/// Runs inheritance, mutation and fitness for a parent pair.
pub struct Breeder<'a> {
    config: &'a AppConfig,
}

impl<'a> Breeder<'a> {
    #[must_use]
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    pub fn inherit<R: RandomProvider + ?Sized>(
        &self,
        parent1: &GeneticProfile,
        parent2: &GeneticProfile,
        patterns: &PatternSet,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> InheritanceResult {
        let inherited_traits = InheritanceCalculator::new(&self.config.genetics)
            .inherit(parent1, parent2, patterns, rng);

        let engine = MutationEngine::new(&self.config.genetics);
        let probability = engine.mutation_probability(parent1, parent2);
        let mutations = engine.apply_mutations(&inherited_traits, probability, patterns, rng, now);

        let fitness_score =
            FitnessScorer::new(&self.config.fitness).score(&inherited_traits, &mutations);
        let genetic_markers = combine_markers(parent1, parent2, rng);

        tracing::debug!(
            parent1 = parent1.cat_id,
            parent2 = parent2.cat_id,
            probability,
            traits = inherited_traits.len(),
            mutations = mutations.len(),
            fitness_score,
            "Inheritance computed"
        );

        InheritanceResult {
            inherited_traits,
            mutations,
            fitness_score,
            genetic_markers,
        }
    }

    /// Storable child profile with mutation effects applied to its traits.
    #[must_use]
    pub fn child_profile(
        &self,
        cat_id: CatId,
        parents: &[&GeneticProfile],
        result: &InheritanceResult,
    ) -> GeneticProfile {
        let mut trait_data = BTreeMap::new();
        for (name, inherited) in &result.inherited_traits {
            let value = match result.mutations.get(name).and_then(|m| m.effect.as_ref()) {
                Some(effect) => express_mutation(inherited, effect),
                None => inherited.to_trait_value(),
            };
            trait_data.insert(name.clone(), value);
        }

        GeneticProfile {
            cat_id,
            genetic_markers: result.genetic_markers.clone(),
            trait_data,
            mutation_history: result.mutations.values().cloned().collect(),
            generation: child_generation(parents),
            lineage_path: lineage_path(parents, self.config.genetics.lineage_depth),
        }
    }

    /// First-generation profile with traits drawn from the catalog.
    ///
    /// Simple traits pick one known allele, complex markers pick an allele from
    /// the trait's dominance table, polygenic markers get a uniform level.
    pub fn founder<R: RandomProvider + ?Sized>(
        &self,
        cat_id: CatId,
        patterns: &PatternSet,
        rng: &mut R,
    ) -> GeneticProfile {
        let mut profile = GeneticProfile::founder(cat_id);

        for pattern in patterns.iter() {
            let alleles: Vec<&str> = pattern.alleles().collect();
            let value = match pattern.inheritance_type {
                InheritanceType::Simple => {
                    let Some(allele) = pick_allele(&alleles, rng) else {
                        continue;
                    };
                    profile
                        .genetic_markers
                        .insert(pattern.trait_name.clone(), Gene::from(allele));
                    TraitValue::Allele(allele.to_string())
                }
                InheritanceType::Complex => {
                    let mut genes = BTreeMap::new();
                    for marker in &pattern.gene_markers {
                        if let Some(allele) = pick_allele(&alleles, rng) {
                            genes.insert(marker.clone(), Gene::from(allele));
                        }
                    }
                    profile.genetic_markers.extend(genes.clone());
                    TraitValue::Genes(genes)
                }
                InheritanceType::Polygenic => {
                    let mut genes = BTreeMap::new();
                    for marker in &pattern.gene_markers {
                        let level = (rng.uniform() * 100.0).round() / 100.0;
                        genes.insert(marker.clone(), Gene::Level(level));
                    }
                    profile.genetic_markers.extend(genes.clone());
                    TraitValue::Genes(genes)
                }
            };
            profile.trait_data.insert(pattern.trait_name.clone(), value);
        }

        profile
    }
}

fn pick_allele<'p, R: RandomProvider + ?Sized>(
    alleles: &[&'p str],
    rng: &mut R,
) -> Option<&'p str> {
    if alleles.is_empty() {
        return None;
    }
    Some(alleles[rng.pick(alleles.len())])
}
