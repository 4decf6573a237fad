//! Error types for felis_io crate.
//!
//! Provides structured error handling for the trait catalog, genetic
//! profiles and evolution records.

use felis_core::EvolutionFault;
use thiserror::Error;

/// Main error type for felis_io operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system errors
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    /// JSON column encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Column values that do not decode into engine types
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A row that must be unique already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The evolution step rejected the event
    #[error("Evolution step failed: {0}")]
    Evolution(#[from] EvolutionFault),

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<StoreError>,
    },
}

/// Result type alias for felis_io operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a new unavailable error.
    #[must_use]
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Creates a new validation error.
    #[must_use]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a new not found error.
    #[must_use]
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound(resource.into())
    }

    /// Creates a new conflict error.
    #[must_use]
    pub fn conflict<S: Into<String>>(resource: S) -> Self {
        Self::Conflict(resource.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    #[must_use]
    pub fn root(&self) -> &StoreError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}
