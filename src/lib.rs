//! # Felis
//!
//! Cat genetics and evolution engine.
//!
//! The [`service`] layer wires the algorithms of `felis_core` to the stores of
//! `felis_io`:
//! - [`GeneticsService`] creates genetic profiles and computes inheritance
//! - [`EvolutionService`] turns activity events into experience and stages

pub mod error;
pub mod service;

pub use error::{EngineError, Result};
pub use felis_core::{AppConfig, Metrics};
pub use service::{EvolutionService, GeneticsService, Parentage};
