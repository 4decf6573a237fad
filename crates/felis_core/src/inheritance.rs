//! Trait inheritance between two parent profiles.
//!
//! Each catalog pattern carried by both parents is inherited according to its
//! type:
//!
//! - **simple**: one random allele from each parent, the strictly more dominant
//!   one is expressed, equal weights give a co-dominant result.
//! - **complex**: every shared gene marker is expressed by dominance share.
//! - **polygenic**: marker values are averaged with Gaussian noise and the
//!   trait value is the mean over markers.
//!
//! Traits missing from either parent are left out of the result.

use crate::catalog::PatternSet;
use crate::config::GeneticsConfig;
use crate::random::RandomProvider;
use felis_data::{
    Gene, GeneExpression, GeneShare, GeneticProfile, InheritanceType, InheritedTrait,
    TraitInheritancePattern, TraitValue,
};
use std::collections::BTreeMap;

pub struct InheritanceCalculator<'a> {
    config: &'a GeneticsConfig,
}

impl<'a> InheritanceCalculator<'a> {
    #[must_use]
    pub fn new(config: &'a GeneticsConfig) -> Self {
        Self { config }
    }

    /// Inherited trait values, keyed by trait name.
    pub fn inherit<R: RandomProvider + ?Sized>(
        &self,
        parent1: &GeneticProfile,
        parent2: &GeneticProfile,
        patterns: &PatternSet,
        rng: &mut R,
    ) -> BTreeMap<String, InheritedTrait> {
        let mut inherited = BTreeMap::new();

        for pattern in patterns.iter() {
            let (Some(t1), Some(t2)) = (
                parent1.trait_data.get(&pattern.trait_name),
                parent2.trait_data.get(&pattern.trait_name),
            ) else {
                continue;
            };

            let value = match pattern.inheritance_type {
                InheritanceType::Simple => simple(t1, t2, pattern, rng),
                InheritanceType::Complex => Some(self.complex(t1, t2, pattern)),
                InheritanceType::Polygenic => self.polygenic(t1, t2, pattern, rng),
            };

            if let Some(value) = value {
                inherited.insert(pattern.trait_name.clone(), value);
            }
        }

        inherited
    }

    fn complex(
        &self,
        t1: &TraitValue,
        t2: &TraitValue,
        pattern: &TraitInheritancePattern,
    ) -> InheritedTrait {
        let mut genes = BTreeMap::new();

        for marker in &pattern.gene_markers {
            let (Some(gene1), Some(gene2)) = (t1.gene(marker), t2.gene(marker)) else {
                continue;
            };

            let dom1 = pattern
                .dominance(&gene1.dominance_key())
                .unwrap_or(self.config.default_dominance);
            let dom2 = pattern
                .dominance(&gene2.dominance_key())
                .unwrap_or(self.config.default_dominance);

            genes.insert(marker.clone(), gene_expression(gene1, gene2, dom1, dom2));
        }

        InheritedTrait::Complex { genes }
    }

    fn polygenic<R: RandomProvider + ?Sized>(
        &self,
        t1: &TraitValue,
        t2: &TraitValue,
        pattern: &TraitInheritancePattern,
        rng: &mut R,
    ) -> Option<InheritedTrait> {
        if pattern.gene_markers.is_empty() {
            return None;
        }

        let mut loci = BTreeMap::new();
        for marker in &pattern.gene_markers {
            let v1 = t1.gene(marker).and_then(Gene::as_level).unwrap_or(0.0);
            let v2 = t2.gene(marker).and_then(Gene::as_level).unwrap_or(0.0);
            let sample = (v1 + v2) / 2.0 + rng.gaussian(0.0, self.config.polygenic_noise);
            loci.insert(marker.clone(), sample);
        }

        let value = loci.values().sum::<f64>() / loci.len() as f64;
        Some(InheritedTrait::Polygenic { value, loci })
    }
}

fn select_allele<'t, R: RandomProvider + ?Sized>(
    value: &'t TraitValue,
    rng: &mut R,
) -> Option<&'t str> {
    let alleles = value.alleles();
    if alleles.is_empty() {
        return None;
    }
    Some(alleles[rng.pick(alleles.len())])
}

fn simple<R: RandomProvider + ?Sized>(
    t1: &TraitValue,
    t2: &TraitValue,
    pattern: &TraitInheritancePattern,
    rng: &mut R,
) -> Option<InheritedTrait> {
    let allele1 = select_allele(t1, rng)?;
    let allele2 = select_allele(t2, rng)?;

    // Alleles absent from the dominance table never win against a listed one.
    let dom1 = pattern.dominance(allele1).unwrap_or(0.0);
    let dom2 = pattern.dominance(allele2).unwrap_or(0.0);

    let inherited = if dom1 > dom2 {
        InheritedTrait::Expressed {
            allele: allele1.to_string(),
        }
    } else if dom2 > dom1 {
        InheritedTrait::Expressed {
            allele: allele2.to_string(),
        }
    } else {
        InheritedTrait::Codominant {
            allele1: allele1.to_string(),
            allele2: allele2.to_string(),
            expression: if allele1 == allele2 { 1.0 } else { 0.5 },
        }
    };
    Some(inherited)
}

fn gene_expression(gene1: &Gene, gene2: &Gene, dom1: f64, dom2: f64) -> Option<GeneExpression> {
    let total = dom1 + dom2;
    if total == 0.0 {
        return None;
    }
    Some(GeneExpression {
        gene1: GeneShare {
            value: gene1.clone(),
            expression: dom1 / total,
        },
        gene2: GeneShare {
            value: gene2.clone(),
            expression: dom2 / total,
        },
    })
}
