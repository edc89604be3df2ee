//! Reporter that records events for assertions.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::orchestrator::BatchReport;
use crate::reporter::Reporter;
use crate::worker::{CommandLine, WorkerExit, WorkerId, WorkerState};

/// A recorded reporter call.
#[derive(Debug, Clone)]
pub enum ReportEvent {
    Started {
        id: WorkerId,
        source: PathBuf,
        command_line: String,
    },
    Stopped {
        id: WorkerId,
        state: WorkerState,
        exit: WorkerExit,
    },
    Warning(String),
    Listed(Vec<PathBuf>),
    Summary(BatchReport),
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events, in the order they were reported.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.lock().clone()
    }

    pub fn started_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, ReportEvent::Started { .. }))
            .count()
    }

    pub fn stopped_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, ReportEvent::Stopped { .. }))
            .count()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Warning(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// The last summary reported, if any.
    pub fn last_summary(&self) -> Option<BatchReport> {
        self.lock().iter().rev().find_map(|e| match e {
            ReportEvent::Summary(report) => Some(report.clone()),
            _ => None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReportEvent>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn push(&self, event: ReportEvent) {
        self.lock().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn worker_started(&self, id: WorkerId, source: &Path, command_line: &CommandLine) {
        self.push(ReportEvent::Started {
            id,
            source: source.to_path_buf(),
            command_line: command_line.to_string(),
        });
    }

    fn worker_stopped(&self, id: WorkerId, state: WorkerState, exit: &WorkerExit) {
        self.push(ReportEvent::Stopped {
            id,
            state,
            exit: *exit,
        });
    }

    fn warning(&self, message: &str) {
        self.push(ReportEvent::Warning(message.to_string()));
    }

    fn listed(&self, paths: &[PathBuf]) {
        self.push(ReportEvent::Listed(paths.to_vec()));
    }

    fn summary(&self, report: &BatchReport) {
        self.push(ReportEvent::Summary(report.clone()));
    }
}
