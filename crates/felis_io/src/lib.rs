//! # Felis IO
//!
//! Persistence layer for the Felis genetics and evolution engine.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - JSON helpers for stored columns and command-line payloads
//! - Store traits for the trait catalog, genetic profiles and evolution records
//! - A SQLite backend with transactional evolution events

/// Error types and result aliases for storage operations
pub mod error;
/// Validated JSON helpers
pub mod serialization;
/// Store traits and the SQLite backend
pub mod storage;

pub use error::{Result, StoreError};
pub use serialization::{from_json, read_json_file, to_json, to_json_pretty};
pub use storage::{EvolutionStore, GeneticStore, SqliteStore, StaticCatalog, TraitPatternCatalog};
