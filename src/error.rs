//! Error types surfaced by the genetics and evolution services.

use felis_data::CatId;
use felis_io::StoreError;
use thiserror::Error;

/// Failures reported to callers of the services.
///
/// Expected gaps (a trait missing from a parent, an unknown event type, a
/// trait without a pattern) never show up here; they are skipped or defaulted.
#[derive(Error, Debug)]
pub enum EngineError {
    /// One or both parent profiles are absent, so inheritance cannot run
    #[error("Missing genetic profile for parent cat(s) {0:?}")]
    MissingParentData(Vec<CatId>),

    /// The trait pattern catalog could not be read
    #[error("Trait pattern catalog unavailable: {0}")]
    CatalogUnavailable(#[source] StoreError),

    /// Reading or writing a profile or evolution row failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The evolution transaction was aborted; nothing was recorded
    #[error("Evolution processing failed for cat {cat_id}: {source}")]
    EvolutionProcessing {
        cat_id: CatId,
        #[source]
        source: StoreError,
    },
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, EngineError>;
