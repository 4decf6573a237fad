use crate::config::FitnessConfig;
use felis_data::{InheritedTrait, Mutation};
use std::collections::BTreeMap;

/// Multiplicative fitness model bounded by `max_score`.
pub struct FitnessScorer<'a> {
    config: &'a FitnessConfig,
}

impl<'a> FitnessScorer<'a> {
    #[must_use]
    pub fn new(config: &'a FitnessConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn trait_multiplier(&self, trait_name: &str) -> f64 {
        self.config
            .trait_multipliers
            .get(trait_name)
            .copied()
            .unwrap_or(1.0)
    }

    /// Starts at 1.0, multiplies once per trait and once per mutation, then clamps.
    #[must_use]
    pub fn score(
        &self,
        traits: &BTreeMap<String, InheritedTrait>,
        mutations: &BTreeMap<String, Mutation>,
    ) -> f64 {
        let mut score = 1.0;
        for trait_name in traits.keys() {
            score *= self.trait_multiplier(trait_name);
        }
        for _ in mutations.values() {
            score *= self.config.mutation_impact;
        }

        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, self.config.max_score)
    }
}
