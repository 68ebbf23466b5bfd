//! Worker process supervision and diagnostic capture

pub mod drain;
pub mod supervisor;

pub use drain::{DiagnosticSink, StderrDrain, TRUNCATION_MARKER};
pub use supervisor::{ProcessSupervisor, WorkerState};
