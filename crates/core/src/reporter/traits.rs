//! Trait definitions for the reporter module.

use std::path::{Path, PathBuf};

use crate::orchestrator::BatchReport;
use crate::worker::{CommandLine, WorkerExit, WorkerId, WorkerState};

/// Observer of a batch run.
///
/// Hooks return nothing on purpose: a reporter cannot influence workers
/// or the aggregate exit code.
pub trait Reporter: Send + Sync {
    /// A worker entered `Running`.
    fn worker_started(&self, id: WorkerId, source: &Path, command_line: &CommandLine);

    /// A worker reached a terminal state.
    fn worker_stopped(&self, id: WorkerId, state: WorkerState, exit: &WorkerExit);

    /// A non-fatal problem, such as a missing input directory.
    fn warning(&self, message: &str);

    /// Candidates resolved in list-only mode.
    fn listed(&self, paths: &[PathBuf]);

    /// Final summary once every worker is terminal.
    fn summary(&self, report: &BatchReport);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn worker_started(&self, _id: WorkerId, _source: &Path, _command_line: &CommandLine) {}

    fn worker_stopped(&self, _id: WorkerId, _state: WorkerState, _exit: &WorkerExit) {}

    fn warning(&self, _message: &str) {}

    fn listed(&self, _paths: &[PathBuf]) {}

    fn summary(&self, _report: &BatchReport) {}
}
