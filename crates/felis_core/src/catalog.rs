//! Trait pattern lookup, the built-in trait catalog and per-category trait queries.

use felis_data::{
    GeneticProfile, InheritanceType, MutationRates, TraitCategory, TraitInheritancePattern,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Category average reported when a cat has no numeric trait in the category.
pub const NEUTRAL_CATEGORY_VALUE: f64 = 0.5;

/// Default cut-off for [`excellent_traits`].
pub const EXCELLENCE_THRESHOLD: f64 = 0.8;

/// Catalog snapshot indexed by trait name, iterated in catalog order.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<TraitInheritancePattern>,
    by_name: HashMap<String, usize>,
}

impl PatternSet {
    /// Builds the index. A later row with a duplicate name replaces the earlier one.
    #[must_use]
    pub fn new(patterns: Vec<TraitInheritancePattern>) -> Self {
        let mut set = Self::default();
        for pattern in patterns {
            match set.by_name.get(&pattern.trait_name) {
                Some(&idx) => set.patterns[idx] = pattern,
                None => {
                    set.by_name
                        .insert(pattern.trait_name.clone(), set.patterns.len());
                    set.patterns.push(pattern);
                }
            }
        }
        set
    }

    #[must_use]
    pub fn get(&self, trait_name: &str) -> Option<&TraitInheritancePattern> {
        self.by_name.get(trait_name).map(|&idx| &self.patterns[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraitInheritancePattern> {
        self.patterns.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl From<Vec<TraitInheritancePattern>> for PatternSet {
    fn from(patterns: Vec<TraitInheritancePattern>) -> Self {
        Self::new(patterns)
    }
}

fn pattern(
    name: &str,
    inheritance_type: InheritanceType,
    markers: &[&str],
    dominance: &[(&str, f64)],
    rates: (f64, f64),
    description: &str,
) -> TraitInheritancePattern {
    TraitInheritancePattern {
        trait_name: name.to_string(),
        inheritance_type,
        gene_markers: markers.iter().map(|m| (*m).to_string()).collect(),
        dominance_factors: dominance
            .iter()
            .map(|(a, w)| ((*a).to_string(), *w))
            .collect(),
        mutation_rates: MutationRates {
            base: rates.0,
            modifier: rates.1,
        },
        description: Some(description.to_string()),
    }
}

/// Trait catalog seeded into a fresh store.
#[must_use]
pub fn default_patterns() -> Vec<TraitInheritancePattern> {
    use InheritanceType::{Complex, Polygenic, Simple};
    vec![
        pattern(
            "size",
            Polygenic,
            &["body_mass", "height", "muscle_density", "skeletal_structure"],
            &[],
            (0.01, 0.1),
            "Controls the physical size and build of the cat",
        ),
        pattern(
            "color",
            Simple,
            &[],
            &[
                ("black", 0.7),
                ("orange", 0.5),
                ("grey", 0.5),
                ("cream", 0.3),
                ("white", 0.3),
            ],
            (0.015, 0.1),
            "Determines the coat color",
        ),
        pattern(
            "pattern",
            Complex,
            &["pattern_type", "marking_distribution", "pattern_clarity"],
            &[
                ("tabby", 0.7),
                ("spotted", 0.5),
                ("bicolor", 0.5),
                ("solid", 0.3),
            ],
            (0.02, 0.1),
            "Controls coat patterns and markings",
        ),
        pattern(
            "features",
            Complex,
            &["ear_shape", "tail_length", "face_structure"],
            &[
                ("upright", 0.7),
                ("folded", 0.3),
                ("long", 0.5),
                ("short", 0.5),
                ("round", 0.5),
                ("wedge", 0.5),
            ],
            (0.01, 0.1),
            "Determines distinctive physical features",
        ),
        pattern(
            "temperament",
            Simple,
            &[],
            &[
                ("playful", 0.6),
                ("calm", 0.4),
                ("curious", 0.6),
                ("shy", 0.2),
            ],
            (0.02, 0.1),
            "Influences basic personality and behavior patterns",
        ),
        pattern(
            "intelligence",
            Polygenic,
            &["problem_solving", "memory_capacity", "learning_speed", "adaptability"],
            &[],
            (0.015, 0.12),
            "Affects learning ability and problem-solving skills",
        ),
        pattern(
            "social",
            Polygenic,
            &["empathy", "communication", "leadership", "cooperation"],
            &[],
            (0.02, 0.1),
            "Shapes social behavior and bonding",
        ),
        pattern(
            "agility",
            Polygenic,
            &["balance", "reflexes", "flexibility", "coordination"],
            &[],
            (0.02, 0.1),
            "Determines physical agility and movement capabilities",
        ),
        pattern(
            "strength",
            Polygenic,
            &["muscle_power", "endurance", "recovery_rate", "stamina"],
            &[],
            (0.015, 0.1),
            "Influences physical strength and endurance",
        ),
        pattern(
            "special",
            Complex,
            &["unique_ability", "energy_control"],
            &[("latent", 0.6), ("awakened", 0.4), ("dormant", 0.0)],
            (0.03, 0.15),
            "Controls development of special abilities",
        ),
    ]
}

/// A trait whose level reaches the excellence threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcellentTrait {
    pub category: TraitCategory,
    pub trait_name: String,
    pub value: f64,
}

/// Mean level of the profile's numeric traits in `category`.
#[must_use]
pub fn category_value(profile: &GeneticProfile, category: TraitCategory) -> f64 {
    let levels: Vec<f64> = profile
        .trait_data
        .iter()
        .filter(|(name, _)| TraitCategory::of(name) == category)
        .filter_map(|(_, value)| value.level())
        .collect();
    if levels.is_empty() {
        return NEUTRAL_CATEGORY_VALUE;
    }
    levels.iter().sum::<f64>() / levels.len() as f64
}

/// [`category_value`] for every known category.
#[must_use]
pub fn category_values(profile: &GeneticProfile) -> BTreeMap<TraitCategory, f64> {
    TraitCategory::KNOWN
        .iter()
        .map(|&category| (category, category_value(profile, category)))
        .collect()
}

/// Numeric traits at or above `threshold`, in trait name order.
#[must_use]
pub fn excellent_traits(profile: &GeneticProfile, threshold: f64) -> Vec<ExcellentTrait> {
    profile
        .trait_data
        .iter()
        .filter_map(|(name, value)| {
            let level = value.level()?;
            (level >= threshold).then(|| ExcellentTrait {
                category: TraitCategory::of(name),
                trait_name: name.clone(),
                value: level,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use felis_data::{Gene, TraitValue};

    #[test]
    fn test_default_catalog_names_are_unique() {
        let patterns = default_patterns();
        let set = PatternSet::new(patterns.clone());
        assert_eq!(set.len(), patterns.len());
        assert!(set.get("size").is_some());
        assert!(set.get("wings").is_none());
    }

    #[test]
    fn test_duplicate_rows_keep_order_and_last_value() {
        let mut first = default_patterns().remove(0);
        let mut second = first.clone();
        first.mutation_rates.base = 0.5;
        second.mutation_rates.base = 0.25;
        let set = PatternSet::new(vec![first, second]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("size").map(|p| p.mutation_rates.base), Some(0.25));
    }

    fn leveled(cat_id: i64, traits: &[(&str, &[(&str, f64)])]) -> GeneticProfile {
        let mut profile = GeneticProfile::founder(cat_id);
        for (name, markers) in traits {
            let genes = markers
                .iter()
                .map(|(m, v)| ((*m).to_string(), Gene::Level(*v)))
                .collect();
            profile
                .trait_data
                .insert((*name).to_string(), TraitValue::Genes(genes));
        }
        profile
            .trait_data
            .insert("color".into(), TraitValue::Allele("black".into()));
        profile
    }

    #[test]
    fn test_category_value_averages_numeric_traits() {
        let profile = leveled(
            1,
            &[
                ("strength", &[("muscle_power", 0.9), ("stamina", 0.7)]),
                ("agility", &[("balance", 0.4)]),
                ("size", &[("height", 0.3)]),
            ],
        );
        assert!((category_value(&profile, TraitCategory::Abilities) - 0.6).abs() < 1e-12);
        assert!((category_value(&profile, TraitCategory::Physical) - 0.3).abs() < 1e-12);
        assert_eq!(
            category_value(&profile, TraitCategory::Personality),
            NEUTRAL_CATEGORY_VALUE
        );
        assert_eq!(category_values(&profile).len(), 3);
    }

    #[test]
    fn test_excellent_traits_at_threshold() {
        let profile = leveled(
            2,
            &[
                ("intelligence", &[("memory_capacity", 0.8)]),
                ("strength", &[("endurance", 0.79)]),
                ("wings", &[("span", 0.95)]),
            ],
        );
        let excellent = excellent_traits(&profile, EXCELLENCE_THRESHOLD);
        let names: Vec<_> = excellent
            .iter()
            .map(|t| (t.category, t.trait_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                (TraitCategory::Personality, "intelligence"),
                (TraitCategory::Unknown, "wings"),
            ]
        );
        assert!(excellent_traits(&GeneticProfile::founder(3), 0.0).is_empty());
    }
}
