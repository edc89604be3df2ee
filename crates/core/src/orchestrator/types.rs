//! Types for the batch orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::allocator::AllocationError;
use crate::worker::{Worker, WorkerState, WorkerSummary};

/// Highest representable process exit code.
pub const MAX_EXIT_CODE: u8 = 255;

/// Errors that abort a batch before any worker launches.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The rules file does not exist.
    #[error("rules file not found: {path}")]
    RulesNotFound { path: PathBuf },

    /// A destination could not be allocated.
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
}

/// Caps a failure count to the 8-bit exit code range.
pub fn aggregate_exit_code(failures: usize) -> u8 {
    failures.min(MAX_EXIT_CODE as usize) as u8
}

/// Final summary of a batch, in launch order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub workers: Vec<WorkerSummary>,
    pub failures: usize,
    pub exit_code: u8,
}

impl BatchReport {
    pub fn from_summaries(workers: Vec<WorkerSummary>) -> Self {
        let failures = workers
            .iter()
            .filter(|w| w.state != WorkerState::Succeeded)
            .count();
        Self {
            workers,
            failures,
            exit_code: aggregate_exit_code(failures),
        }
    }

    pub fn from_workers(workers: &[Worker]) -> Self {
        Self::from_summaries(workers.iter().map(Worker::summary).collect())
    }

    /// The one failure whose diagnostics are surfaced.
    pub fn first_failure(&self) -> Option<&WorkerSummary> {
        self.workers
            .iter()
            .find(|w| w.state != WorkerState::Succeeded)
    }
}

/// Result of [`BatchOrchestrator::run`](super::BatchOrchestrator::run).
#[derive(Debug)]
pub enum BatchOutcome {
    /// List-only mode: the resolved candidates.
    Listed(Vec<PathBuf>),
    /// Every worker reached a terminal state.
    Completed {
        workers: Vec<Worker>,
        report: BatchReport,
    },
}

impl BatchOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Listed(_) => 0,
            Self::Completed { report, .. } => report.exit_code,
        }
    }

    pub fn workers(&self) -> &[Worker] {
        match self {
            Self::Listed(_) => &[],
            Self::Completed { workers, .. } => workers,
        }
    }

    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            Self::Listed(_) => None,
            Self::Completed { report, .. } => Some(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{WorkerExit, WorkerId};

    fn summary(id: u64, exit: WorkerExit) -> WorkerSummary {
        WorkerSummary {
            id: WorkerId(id),
            source: PathBuf::from(format!("in/{}.xml", id)),
            rules: PathBuf::from("rules.py"),
            destination: PathBuf::from(format!("in/{}-1.xml", id)),
            command_line: Vec::new(),
            state: exit.state(),
            exit: Some(exit),
            exit_code: Some(exit.code()),
            stdout: String::new(),
            stderr: format!("stderr {}", id),
            dry_run: false,
            started_at: None,
            duration_ms: None,
        }
    }

    #[test]
    fn test_aggregate_exit_code_caps() {
        assert_eq!(aggregate_exit_code(0), 0);
        assert_eq!(aggregate_exit_code(1), 1);
        assert_eq!(aggregate_exit_code(255), 255);
        assert_eq!(aggregate_exit_code(256), 255);
        assert_eq!(aggregate_exit_code(10_000), 255);
    }

    #[test]
    fn test_report_counts_every_non_success() {
        let report = BatchReport::from_summaries(vec![
            summary(1, WorkerExit::Exited(0)),
            summary(2, WorkerExit::Exited(3)),
            summary(3, WorkerExit::TimedOut),
            summary(4, WorkerExit::LaunchFailed),
            summary(5, WorkerExit::Signaled),
        ]);
        assert_eq!(report.failures, 4);
        assert_eq!(report.exit_code, 4);
        assert_eq!(report.first_failure().unwrap().id, WorkerId(2));
    }

    #[test]
    fn test_report_caps_large_batches() {
        let workers = (0..300).map(|i| summary(i, WorkerExit::Exited(1))).collect();
        let report = BatchReport::from_summaries(workers);
        assert_eq!(report.failures, 300);
        assert_eq!(report.exit_code, 255);
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = BatchReport::from_summaries(Vec::new());
        assert_eq!(report.exit_code, 0);
        assert!(report.first_failure().is_none());
    }

    #[test]
    fn test_listed_outcome() {
        let outcome = BatchOutcome::Listed(vec![PathBuf::from("a.xml")]);
        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.workers().is_empty());
        assert!(outcome.report().is_none());
    }
}
