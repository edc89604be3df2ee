//! Error types for the worker module.

use thiserror::Error;

/// Errors raised while launching or supervising a single worker.
///
/// These never abort a batch: the worker records them as its terminal
/// state and captured error text.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A job field required by the command line is empty.
    #[error("Command line is missing the {field} path")]
    IncompleteCommand { field: &'static str },

    /// The command template names no program.
    #[error("Worker command is empty")]
    EmptyCommand,

    /// The process could not be spawned.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while supervising the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Creates a spawn error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Whether the error means no process was ever created.
    pub fn is_launch_error(&self) -> bool {
        matches!(
            self,
            Self::IncompleteCommand { .. } | Self::EmptyCommand | Self::Spawn { .. }
        )
    }
}
