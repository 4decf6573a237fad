//! Service entry points used by breeding and activity-completion workflows.

/// Experience events and stage progression
pub mod evolution;
/// Genetic profiles and inheritance
pub mod genetics;

pub use evolution::EvolutionService;
pub use genetics::{GeneticsService, Parentage};
