//! # Felis Core
//!
//! The deterministic genetics and evolution engine for Felis.
//!
//! This crate contains the algorithmic core, free of storage concerns:
//! - Trait inheritance (simple, complex and polygenic patterns)
//! - Diversity- and generation-adjusted mutation
//! - Multiplicative fitness scoring
//! - Experience, adaptation and evolution-stage progression
//! - Breeding rules, founder generation and lineage tracking
//! - Metrics collection and structured logging
//!
//! ## Architecture
//!
//! Every operation takes its configuration and a [`RandomProvider`] explicitly:
//! - **Explicit configuration**: [`AppConfig`] is built once and borrowed
//! - **Pure steps**: evolution computes the next state, storage commits it
//! - **Deterministic runs**: seeded or scripted randomness for reproducible results
//!
//! ## Example
//!
//! ```
//! use felis_core::catalog::{default_patterns, PatternSet};
//! use felis_core::random::SeededRandom;
//! use felis_core::{AppConfig, Breeder};
//!
//! let config = AppConfig::default();
//! let patterns = PatternSet::new(default_patterns());
//! let mut rng = SeededRandom::new(42);
//!
//! let breeder = Breeder::new(&config);
//! let mother = breeder.founder(1, &patterns, &mut rng);
//! let father = breeder.founder(2, &patterns, &mut rng);
//! let result = breeder.inherit(&mother, &father, &patterns, &mut rng, chrono::Utc::now());
//! assert!(result.fitness_score <= config.fitness.max_score);
//! ```

/// Breeding pipeline, founders, lineage and pairing rules
pub mod breeding;
/// Trait pattern index and the built-in catalog
pub mod catalog;
/// Configuration management for engine parameters
pub mod config;
/// Experience gain and stage progression
pub mod evolution;
/// Bounded fitness scoring
pub mod fitness;
/// Parent-to-child trait inheritance
pub mod inheritance;
/// Engine metrics collection and logging
pub mod metrics;
/// Mutation probability and generation
pub mod mutation;
/// Uniform and Gaussian sampling sources
pub mod random;

pub use breeding::{check_compatibility, genetic_similarity, Breeder, Incompatibility};
pub use catalog::{
    category_value, category_values, excellent_traits, ExcellentTrait, PatternSet,
};
pub use config::AppConfig;
pub use evolution::{EvolutionEngine, EvolutionFault, EvolutionStep};
pub use fitness::FitnessScorer;
pub use inheritance::InheritanceCalculator;
pub use metrics::{init_logging, Metrics};
pub use mutation::{genetic_diversity, MutationEngine};
pub use random::{RandomProvider, ScriptedRandom, SeededRandom, ThreadRandom};
