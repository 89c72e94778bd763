//! reqctx — drivers for the request context store.
//!
//! The `demo` and `stress` runs behind the `reqctx` binary.

pub mod demo;
pub mod stress;

pub use demo::run_demo;
pub use stress::{StressConfig, run_stress};

pub type RunResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
