//! Testing utilities and mock implementations.
//!
//! These let orchestration be exercised without spawning real processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use rulebatch_core::testing::{MockOutcome, MockSpawner, RecordingReporter};
//!
//! let spawner = MockSpawner::new();
//! spawner.set_outcome("in/b.xml", MockOutcome::exit(3)).await;
//! let reporter = Arc::new(RecordingReporter::new());
//!
//! let orchestrator = BatchOrchestrator::new(Arc::new(spawner.clone()), reporter.clone());
//! ```

mod mock_spawner;
mod recording_reporter;

pub use mock_spawner::{MockOutcome, MockSpawner};
pub use recording_reporter::{RecordingReporter, ReportEvent};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    /// Writes one empty file per name into `directory` and returns the paths.
    pub fn input_files(directory: &Path, names: &[&str]) -> std::io::Result<Vec<PathBuf>> {
        names
            .iter()
            .map(|name| {
                let path = directory.join(name);
                std::fs::write(&path, "<root/>")?;
                Ok(path)
            })
            .collect()
    }

    /// Writes a placeholder rules file into `directory`.
    pub fn rules_file(directory: &Path) -> std::io::Result<PathBuf> {
        let path = directory.join("rules.py");
        std::fs::write(&path, "def rule_noop():\n    pass\n")?;
        Ok(path)
    }
}
