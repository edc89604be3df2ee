//! Orchestrator options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::worker::{CommandTemplate, WorkerOptions, DEFAULT_TIMEOUT};

/// Where destination paths are allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Next to each source file, named after its stem.
    #[default]
    BesideSource,
    /// Inside the batch output directory, named after the source stem.
    OutputDirectory,
}

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Scanned when no candidates are given.
    pub source_directory: PathBuf,
    /// Conversion tool and its leading arguments.
    pub command: CommandTemplate,
    /// Extension of allocated destinations.
    pub output_extension: String,
    /// Per-worker timeout, counted from launch.
    pub timeout: Duration,
    pub placement: Placement,
    /// Report command lines without spawning anything.
    pub dry_run: bool,
    /// Only enumerate the resolved candidates.
    pub list_only: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            source_directory: PathBuf::from("input"),
            command: CommandTemplate::parse("ruledxml"),
            output_extension: "xml".to_string(),
            timeout: DEFAULT_TIMEOUT,
            placement: Placement::default(),
            dry_run: false,
            list_only: false,
        }
    }
}

impl BatchOptions {
    /// Worker options derived from these batch options.
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            timeout: self.timeout,
            dry_run: self.dry_run,
        }
    }

    pub fn with_command(mut self, command: CommandTemplate) -> Self {
        self.command = command;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_source_directory(mut self, directory: PathBuf) -> Self {
        self.source_directory = directory;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn list_only(mut self, list_only: bool) -> Self {
        self.list_only = list_only;
        self
    }
}
