//! Experience, adaptation and stage progression.
//!
//! [`EvolutionEngine::advance`] is a pure step: it takes the current
//! [`EvolutionData`] and an event, and returns the next state together with
//! the event record to append. Storage swaps the two atomically.

use crate::config::EvolutionConfig;
use crate::random::RandomProvider;
use chrono::{DateTime, Utc};
use felis_data::{
    Adaptation, EventData, EventRecord, EventType, EvolutionData, EvolutionStage, Mutation,
    MutationOrigin,
};
use thiserror::Error;

const GENERIC_ADAPTATION: &str = "generic";
const RANDOM_MUTATION: &str = "random";

/// Failure inside an evolution step. The current state is left untouched.
#[derive(Debug, Error, PartialEq)]
pub enum EvolutionFault {
    #[error("Invalid experience gain {gain} for event '{event_type}'")]
    InvalidExperience { event_type: String, gain: f64 },

    #[error("Experience overflow for cat {cat_id}")]
    ExperienceOverflow { cat_id: i64 },
}

/// Outcome of applying one event to a cat's evolution state.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionStep {
    pub next: EvolutionData,
    pub record: EventRecord,
}

impl EvolutionStep {
    #[must_use]
    pub fn stage_changed(&self, previous: &EvolutionData) -> bool {
        self.next.evolution_stage != previous.evolution_stage
    }
}

pub struct EvolutionEngine<'a> {
    config: &'a EvolutionConfig,
}

impl<'a> EvolutionEngine<'a> {
    #[must_use]
    pub fn new(config: &'a EvolutionConfig) -> Self {
        Self { config }
    }

    /// `round(base × rate × difficulty × success × Π conditions)`.
    pub fn experience_gain(
        &self,
        event_type: &EventType,
        data: &EventData,
    ) -> Result<u64, EvolutionFault> {
        let c = self.config;
        let base = data.base_experience.unwrap_or(c.base_experience);
        let difficulty = data
            .difficulty
            .map_or(1.0, |d| 1.0 + d * c.difficulty_weight);
        let success = data.success_rate.map_or(1.0, |s| c.success_offset + s);
        let conditions: f64 = data
            .conditions
            .iter()
            .map(|condition| c.condition_multiplier(condition))
            .product();

        let gain = (base * c.rate_multiplier(event_type) * difficulty * success * conditions).round();
        if !gain.is_finite() || gain < 0.0 || gain > u64::MAX as f64 {
            return Err(EvolutionFault::InvalidExperience {
                event_type: event_type.to_string(),
                gain,
            });
        }
        Ok(gain as u64)
    }

    /// One draw per configured factor, then a subtype pick and a strength for each hit.
    pub fn roll_adaptations<R: RandomProvider + ?Sized>(
        &self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Vec<Adaptation> {
        let mut adaptations = Vec::new();
        for factor in &self.config.adaptation_factors {
            if !rng.chance(self.config.adaptation_chance) {
                continue;
            }
            let kind = pick_subtype(rng, &factor.subtypes, GENERIC_ADAPTATION);
            adaptations.push(Adaptation {
                factor: factor.factor.clone(),
                kind,
                weight: factor.weight,
                strength: rng.strength(),
                timestamp: now,
            });
        }
        adaptations
    }

    /// Triggers whose `<trigger>_level` reaches the threshold get one chance draw each.
    pub fn roll_mutations<R: RandomProvider + ?Sized>(
        &self,
        data: &EventData,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        for trigger in &self.config.mutation_triggers {
            let Some(level) = data.trigger_level(&trigger.trigger) else {
                continue;
            };
            if level < trigger.threshold || !rng.chance(trigger.chance) {
                continue;
            }
            let kind = pick_subtype(rng, &trigger.subtypes, RANDOM_MUTATION);
            let strength = rng.strength();
            let permanent = rng.chance(self.config.permanent_chance);
            mutations.push(Mutation {
                origin: MutationOrigin::Trigger(trigger.trigger.clone()),
                kind,
                strength,
                permanent,
                effect: None,
                timestamp: now,
            });
        }
        mutations
    }

    /// Highest stage reached by `total`, never below `current`.
    #[must_use]
    pub fn resolve_stage(&self, current: EvolutionStage, total: u64) -> EvolutionStage {
        current.max(self.config.stage_for(total))
    }

    pub fn advance<R: RandomProvider + ?Sized>(
        &self,
        current: &EvolutionData,
        event_type: EventType,
        data: EventData,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<EvolutionStep, EvolutionFault> {
        let gain = self.experience_gain(&event_type, &data)?;
        let adaptations = self.roll_adaptations(rng, now);
        let mutations = self.roll_mutations(&data, rng, now);

        let total = current
            .experience_points
            .checked_add(gain)
            .ok_or(EvolutionFault::ExperienceOverflow {
                cat_id: current.cat_id,
            })?;
        let new_stage = self.resolve_stage(current.evolution_stage, total);

        let mut next = current.clone();
        next.experience_points = total;
        next.evolution_stage = new_stage;
        next.adaptations.extend(adaptations.iter().cloned());
        next.mutations.extend(mutations.iter().cloned());
        next.updated_at = now;

        Ok(EvolutionStep {
            next,
            record: EventRecord {
                cat_id: current.cat_id,
                event_type,
                event_data: data,
                experience_gain: gain,
                adaptations,
                mutations,
                new_stage,
                created_at: now,
            },
        })
    }

    /// True when accumulated experience already covers the next stage.
    #[must_use]
    pub fn can_evolve(&self, data: &EvolutionData) -> bool {
        self.next_stage_threshold(data)
            .is_some_and(|threshold| data.experience_points >= threshold)
    }

    /// Experience needed for the stage after the current one; `None` at the ceiling.
    #[must_use]
    pub fn next_stage_threshold(&self, data: &EvolutionData) -> Option<u64> {
        data.evolution_stage
            .next()
            .map(|stage| self.config.threshold(stage))
    }
}

fn pick_subtype<R: RandomProvider + ?Sized>(
    rng: &mut R,
    subtypes: &[String],
    fallback: &str,
) -> String {
    if subtypes.is_empty() {
        return fallback.to_string();
    }
    subtypes[rng.pick(subtypes.len())].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    const NO_ADAPTATIONS: [f64; 4] = [0.9, 0.9, 0.9, 0.9];

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_experience_gain_combines_factors() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let data = EventData::new()
            .with_base_experience(100.0)
            .with_difficulty(2.0)
            .with_success_rate(0.5)
            .with_condition("first_time");
        // 100 × 2.0 × 1.4 × 1.0 × 1.5
        let gain = engine.experience_gain(&EventType::Training, &data).unwrap();
        assert_eq!(gain, 420);
    }

    #[test]
    fn test_unknown_event_type_and_condition_are_neutral() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let data = EventData::new()
            .with_base_experience(7.0)
            .with_condition("lucky");
        let gain = engine
            .experience_gain(&EventType::from("napping"), &data)
            .unwrap();
        assert_eq!(gain, 7);
    }

    #[test]
    fn test_default_base_experience() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let gain = engine
            .experience_gain(&EventType::Combat, &EventData::new())
            .unwrap();
        assert_eq!(gain, 18);
    }

    #[test]
    fn test_negative_gain_is_rejected() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let data = EventData::new().with_base_experience(-10.0);
        assert!(matches!(
            engine.experience_gain(&EventType::Training, &data),
            Err(EvolutionFault::InvalidExperience { .. })
        ));
    }

    #[test]
    fn test_crossing_threshold_advances_stage() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let mut current = EvolutionData::new(1, now());
        current.experience_points = 999;

        let mut rng = ScriptedRandom::new(NO_ADAPTATIONS);
        let data = EventData::new().with_base_experience(5.0);
        let step = engine
            .advance(&current, EventType::from("napping"), data, &mut rng, now())
            .unwrap();

        assert_eq!(step.record.experience_gain, 5);
        assert_eq!(step.next.experience_points, 1004);
        assert_eq!(step.next.evolution_stage, EvolutionStage::Evolved);
        assert!(step.stage_changed(&current));
        assert!(step.record.adaptations.is_empty());
    }

    #[test]
    fn test_exact_threshold_resolves_to_that_stage() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        assert_eq!(
            engine.resolve_stage(EvolutionStage::Basic, 5000),
            EvolutionStage::Advanced
        );
        assert_eq!(
            engine.resolve_stage(EvolutionStage::Basic, 4999),
            EvolutionStage::Evolved
        );
        assert_eq!(
            engine.resolve_stage(EvolutionStage::Ultimate, 10),
            EvolutionStage::Ultimate
        );
    }

    #[test]
    fn test_adaptation_draw_order() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        // environment hits: subtype index 1 (terrain), strength 0.25; the rest miss.
        let mut rng = ScriptedRandom::new([0.1, 0.5, 0.24, 0.7, 0.9, 0.95]);
        let adaptations = engine.roll_adaptations(&mut rng, now());
        assert_eq!(adaptations.len(), 1);
        assert_eq!(adaptations[0].factor, "environment");
        assert_eq!(adaptations[0].kind, "terrain");
        assert!((adaptations[0].weight - 0.3).abs() < 1e-12);
        assert!((adaptations[0].strength - 0.25).abs() < 1e-12);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn test_stress_trigger_fires_below_chance() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let data = EventData::new().with_trigger_level("stress", 0.85);

        let mut rng = ScriptedRandom::new([0.1, 0.0, 0.5, 0.5]);
        let mutations = engine.roll_mutations(&data, &mut rng, now());
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].origin, MutationOrigin::Trigger("stress".into()));
        assert_eq!(mutations[0].kind, "adaptation");
        assert!((mutations[0].strength - 0.51).abs() < 1e-12);
        assert!(!mutations[0].permanent);

        let mut rng = ScriptedRandom::new([0.2]);
        assert!(engine.roll_mutations(&data, &mut rng, now()).is_empty());
    }

    #[test]
    fn test_trigger_below_threshold_draws_nothing() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let data = EventData::new().with_trigger_level("mastery", 0.9);
        let mut rng = ScriptedRandom::new([0.0]);
        assert!(engine.roll_mutations(&data, &mut rng, now()).is_empty());
        assert_eq!(rng.remaining(), 1);
    }

    #[test]
    fn test_failed_step_leaves_state_untouched() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let mut current = EvolutionData::new(3, now());
        current.experience_points = u64::MAX - 1;
        let snapshot = current.clone();
        let mut rng = ScriptedRandom::new(NO_ADAPTATIONS);
        let result = engine.advance(
            &current,
            EventType::Training,
            EventData::new(),
            &mut rng,
            now(),
        );
        assert_eq!(result, Err(EvolutionFault::ExperienceOverflow { cat_id: 3 }));
        assert_eq!(current, snapshot);
    }

    #[test]
    fn test_progress_queries() {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let mut data = EvolutionData::new(1, now());
        assert_eq!(engine.next_stage_threshold(&data), Some(1000));
        assert!(!engine.can_evolve(&data));
        data.experience_points = 1200;
        assert!(engine.can_evolve(&data));
        data.evolution_stage = EvolutionStage::Ultimate;
        assert_eq!(engine.next_stage_threshold(&data), None);
        assert!(!engine.can_evolve(&data));
    }
}
