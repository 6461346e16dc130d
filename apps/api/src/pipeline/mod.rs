//! Asynchronous stage pipeline: a database-backed queue, per-stage handlers,
//! and the orchestrator that sequences them.

pub mod orchestrator;
pub mod queue;
pub mod stages;

pub use orchestrator::Orchestrator;
pub use queue::{Queue, Stage};
