//! Configuration management for the genetics and evolution engine.
//!
//! Every tunable constant lives in [`AppConfig`], which is built once and
//! handed to the services at construction. Nothing reads module-level state,
//! so tests can override any constant by editing a config value.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. `config.toml` file (overrides defaults, missing sections keep defaults)
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [genetics]
//! mutation_base_rate = 0.01
//! mutation_cap = 0.05
//!
//! [fitness]
//! max_score = 10.0
//! mutation_impact = 0.95
//!
//! [evolution]
//! stage_thresholds = [0, 1000, 5000, 15000, 50000]
//!
//! [storage]
//! database_path = "felis.db"
//! seed = 42
//! ```

use felis_data::{Condition, EventType, EvolutionStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Hard ceiling on any single mutation probability.
pub const MUTATION_PROBABILITY_LIMIT: f64 = 0.05;

/// Inheritance and mutation-probability parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GeneticsConfig {
    pub mutation_base_rate: f64,
    pub mutation_cap: f64,
    /// Weight of `log10(avg_generation)` in the probability scaling.
    pub generation_weight: f64,
    /// Standard deviation of the per-marker noise in polygenic inheritance.
    pub polygenic_noise: f64,
    /// Dominance assumed for complex genes missing from the dominance table.
    pub default_dominance: f64,
    /// Maximum number of ancestors kept in a lineage path.
    pub lineage_depth: usize,
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            mutation_base_rate: 0.01,
            mutation_cap: MUTATION_PROBABILITY_LIMIT,
            generation_weight: 0.1,
            polygenic_noise: 0.1,
            default_dominance: 0.5,
            lineage_depth: 32,
        }
    }
}

/// Fitness scoring parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FitnessConfig {
    pub max_score: f64,
    /// Multiplier applied once per mutation.
    pub mutation_impact: f64,
    /// Per-trait multipliers; traits not listed use 1.0.
    pub trait_multipliers: BTreeMap<String, f64>,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            max_score: 10.0,
            mutation_impact: 0.95,
            trait_multipliers: BTreeMap::new(),
        }
    }
}

/// An adaptation factor rolled on every evolution event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdaptationFactor {
    pub factor: String,
    pub weight: f64,
    pub subtypes: Vec<String>,
}

/// A mutation trigger read from `<trigger>_level` in the event payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MutationTrigger {
    pub trigger: String,
    pub threshold: f64,
    pub chance: f64,
    pub subtypes: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn table(items: &[(&str, f64)]) -> BTreeMap<String, f64> {
    items.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

/// Experience, stage and event-roll parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Experience granted when the payload carries no `base_experience`.
    pub base_experience: f64,
    pub difficulty_weight: f64,
    pub success_offset: f64,
    /// Event type → rate multiplier; unknown types use 1.0.
    pub experience_rates: BTreeMap<String, f64>,
    /// Condition → multiplier; unknown conditions use 1.0.
    pub condition_multipliers: BTreeMap<String, f64>,
    /// Experience needed for stages 1..=5.
    pub stage_thresholds: [u64; 5],
    pub adaptation_chance: f64,
    pub adaptation_factors: Vec<AdaptationFactor>,
    pub mutation_triggers: Vec<MutationTrigger>,
    pub permanent_chance: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            base_experience: 10.0,
            difficulty_weight: 0.2,
            success_offset: 0.5,
            experience_rates: table(&[
                ("physical_activity", 1.2),
                ("mental_challenge", 1.5),
                ("social_interaction", 1.3),
                ("combat", 1.8),
                ("exploration", 1.4),
                ("training", 2.0),
            ]),
            condition_multipliers: table(&[
                ("first_time", 1.5),
                ("rare_event", 1.3),
                ("challenging", 1.2),
                ("mastery", 1.4),
                ("discovery", 1.25),
            ]),
            stage_thresholds: [0, 1000, 5000, 15000, 50000],
            adaptation_chance: 0.7,
            adaptation_factors: vec![
                AdaptationFactor {
                    factor: "environment".to_string(),
                    weight: 0.3,
                    subtypes: strings(&["climate", "terrain", "habitat"]),
                },
                AdaptationFactor {
                    factor: "challenge".to_string(),
                    weight: 0.4,
                    subtypes: strings(&["skill", "strategy", "resistance"]),
                },
                AdaptationFactor {
                    factor: "social".to_string(),
                    weight: 0.2,
                    subtypes: strings(&["communication", "empathy", "leadership"]),
                },
                AdaptationFactor {
                    factor: "random".to_string(),
                    weight: 0.1,
                    subtypes: strings(&["mutation", "enhancement", "specialization"]),
                },
            ],
            mutation_triggers: vec![
                MutationTrigger {
                    trigger: "stress".to_string(),
                    threshold: 0.8,
                    chance: 0.2,
                    subtypes: strings(&["adaptation", "resistance", "enhancement"]),
                },
                MutationTrigger {
                    trigger: "achievement".to_string(),
                    threshold: 0.9,
                    chance: 0.3,
                    subtypes: strings(&["specialization", "mastery", "evolution"]),
                },
                MutationTrigger {
                    trigger: "mastery".to_string(),
                    threshold: 0.95,
                    chance: 0.4,
                    subtypes: strings(&["transcendence", "perfection", "breakthrough"]),
                },
            ],
            permanent_chance: 0.3,
        }
    }
}

impl EvolutionConfig {
    #[must_use]
    pub fn rate_multiplier(&self, event_type: &EventType) -> f64 {
        self.experience_rates
            .get(event_type.as_str())
            .copied()
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn condition_multiplier(&self, condition: &Condition) -> f64 {
        self.condition_multipliers
            .get(condition.as_str())
            .copied()
            .unwrap_or(1.0)
    }

    /// Experience required to occupy `stage`.
    #[must_use]
    pub fn threshold(&self, stage: EvolutionStage) -> u64 {
        self.stage_thresholds[usize::from(stage.level() - 1)]
    }

    /// Highest stage whose threshold is at or below `total_experience`.
    #[must_use]
    pub fn stage_for(&self, total_experience: u64) -> EvolutionStage {
        EvolutionStage::ALL
            .iter()
            .rev()
            .copied()
            .find(|stage| total_experience >= self.threshold(*stage))
            .unwrap_or_default()
    }
}

/// Pairing rules checked before two cats breed.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BreedingConfig {
    pub min_breeding_diversity: f64,
    pub max_generation_gap: u32,
    pub min_breeding_stage: EvolutionStage,
}

impl Default for BreedingConfig {
    fn default() -> Self {
        Self {
            min_breeding_diversity: 0.2,
            max_generation_gap: 2,
            min_breeding_stage: EvolutionStage::Evolved,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
    /// Fixed seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "felis.db".to_string(),
            seed: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub genetics: GeneticsConfig,
    pub fitness: FitnessConfig,
    pub evolution: EvolutionConfig,
    pub breeding: BreedingConfig,
    pub storage: StorageConfig,
}

fn unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        let g = &self.genetics;
        anyhow::ensure!(
            g.mutation_base_rate >= 0.0 && g.mutation_base_rate.is_finite(),
            "Mutation base rate must be non-negative"
        );
        anyhow::ensure!(
            g.mutation_cap >= 0.0 && g.mutation_cap <= MUTATION_PROBABILITY_LIMIT,
            "Mutation cap must be in [0.0, {MUTATION_PROBABILITY_LIMIT}]"
        );
        anyhow::ensure!(
            g.generation_weight >= 0.0,
            "Generation weight must be non-negative"
        );
        anyhow::ensure!(
            g.polygenic_noise >= 0.0,
            "Polygenic noise must be non-negative"
        );
        anyhow::ensure!(
            unit(g.default_dominance),
            "Default dominance must be in [0.0, 1.0]"
        );

        let f = &self.fitness;
        anyhow::ensure!(
            f.max_score > 0.0 && f.max_score.is_finite(),
            "Max fitness score must be positive"
        );
        anyhow::ensure!(
            f.mutation_impact >= 0.0,
            "Mutation impact must be non-negative"
        );
        anyhow::ensure!(
            f.trait_multipliers.values().all(|m| *m >= 0.0),
            "Trait fitness multipliers must be non-negative"
        );

        let e = &self.evolution;
        anyhow::ensure!(
            e.base_experience >= 0.0,
            "Base experience must be non-negative"
        );
        anyhow::ensure!(
            e.experience_rates.values().all(|r| *r >= 0.0),
            "Experience rates must be non-negative"
        );
        anyhow::ensure!(
            e.condition_multipliers.values().all(|m| *m >= 0.0),
            "Condition multipliers must be non-negative"
        );
        anyhow::ensure!(
            e.stage_thresholds[0] == 0,
            "First stage threshold must be 0"
        );
        anyhow::ensure!(
            e.stage_thresholds.windows(2).all(|w| w[0] < w[1]),
            "Stage thresholds must be strictly increasing"
        );
        anyhow::ensure!(
            unit(e.adaptation_chance),
            "Adaptation chance must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            unit(e.permanent_chance),
            "Permanent chance must be in [0.0, 1.0]"
        );
        for trigger in &e.mutation_triggers {
            anyhow::ensure!(
                unit(trigger.chance),
                "Trigger '{}' chance must be in [0.0, 1.0]",
                trigger.trigger
            );
        }

        let b = &self.breeding;
        anyhow::ensure!(
            unit(b.min_breeding_diversity),
            "Min breeding diversity must be in [0.0, 1.0]"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.genetics).as_bytes());
        hasher.update(format!("{:?}", self.fitness).as_bytes());
        hasher.update(format!("{:?}", self.evolution).as_bytes());
        hasher.update(format!("{:?}", self.breeding).as_bytes());
        hex::encode(hasher.finalize())
    }
}
