//! # Felis Data
//!
//! Plain data types shared by the Felis engine crates: genetic profiles and
//! trait patterns, mutations, evolution rows and activity event payloads.

pub mod data;

pub use data::event::{Condition, EventData, EventType};
pub use data::evolution::{
    Adaptation, EventId, EventRecord, EvolutionData, EvolutionEvent, EvolutionStage,
};
pub use data::genetics::{
    CatId, Gene, GeneExpression, GeneShare, GeneticProfile, InheritanceResult, InheritanceType,
    InheritedTrait, Mutation, MutationEffect, MutationOrigin, MutationRates,
    TraitCategory, TraitInheritancePattern, TraitValue,
};
