//! Batch orchestration of conversion workers.
//!
//! The orchestrator resolves candidate inputs, allocates a collision-free
//! destination for each, launches one worker per input concurrently and
//! aggregates the outcome:
//! - **Exit code**: number of workers that did not succeed, capped at 255
//! - **List-only**: resolve and enumerate, never launch
//! - **Dry-run**: every worker succeeds without spawning

mod config;
mod runner;
mod types;

pub use config::{BatchOptions, Placement};
pub use runner::BatchOrchestrator;
pub use types::{aggregate_exit_code, BatchOutcome, BatchReport, OrchestratorError, MAX_EXIT_CODE};
