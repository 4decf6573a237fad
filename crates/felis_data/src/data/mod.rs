//! Core data structures for the Felis genetics and evolution engine.

pub mod event;
pub mod evolution;
pub mod genetics;
