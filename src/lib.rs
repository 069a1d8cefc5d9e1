//! Quiz attempt lifecycle, grading, and statistics engine.
//!
//! Callers drive attempts through the free functions in [`services`];
//! persistence sits behind the gateway traits in [`store`]. The crate
//! never spawns background tasks and never dispatches events itself:
//! each operation returns the facts to broadcast as [`domain::events::Effect`]s.

pub mod core;
pub mod domain;
pub mod error;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;

pub use crate::core::config::{ConfigError, EngineSettings, TimeoutGrading};
pub use crate::core::state::Engine;
pub use crate::error::{EngineError, EngineResult};
pub use crate::store::memory::MemoryGateway;
pub use crate::store::{AttemptFilter, AttemptStore, Gateway, QuizCatalog, ReviewStore};
