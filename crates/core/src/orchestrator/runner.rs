//! Batch orchestrator implementation.
//!
//! One run goes through four phases:
//! - **Resolve**: flatten candidates into input files
//! - **Allocate**: reserve every destination before anything launches
//! - **Launch**: start one worker per input, eagerly and unthrottled
//! - **Join**: await every worker, then aggregate

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::allocator::{AllocationError, PathAllocator};
use crate::reporter::Reporter;
use crate::worker::{CommandSpawner, Job, Spawner, Worker, WorkerId};

use super::config::{BatchOptions, Placement};
use super::types::{BatchOutcome, BatchReport, OrchestratorError};

/// Runs batches of workers over candidate input files.
pub struct BatchOrchestrator {
    spawner: Arc<dyn Spawner>,
    reporter: Arc<dyn Reporter>,
    next_id: AtomicU64,
}

impl BatchOrchestrator {
    /// Create a new orchestrator.
    pub fn new(spawner: Arc<dyn Spawner>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            spawner,
            reporter,
            next_id: AtomicU64::new(1),
        }
    }

    /// Create an orchestrator that launches real processes.
    pub fn with_processes(reporter: Arc<dyn Reporter>) -> Self {
        Self::new(Arc::new(CommandSpawner::new()), reporter)
    }

    /// Flattens `candidates` into input files.
    ///
    /// No candidates means `default_directory`. Directories expand to their
    /// immediate regular files, sorted by path. Missing candidates are
    /// reported as warnings and skipped.
    pub fn resolve_candidates(
        &self,
        candidates: &[PathBuf],
        default_directory: &Path,
    ) -> Vec<PathBuf> {
        let defaulted;
        let candidates = if candidates.is_empty() {
            debug!(dir = %default_directory.display(), "No candidates given, using source directory");
            defaulted = [default_directory.to_path_buf()];
            &defaulted[..]
        } else {
            candidates
        };

        let mut inputs = Vec::new();
        for candidate in candidates {
            if candidate.is_dir() {
                match list_files(candidate) {
                    Ok(files) => inputs.extend(files),
                    Err(e) => {
                        warn!(dir = %candidate.display(), "Cannot read directory: {}", e);
                        self.reporter.warning(&format!(
                            "cannot read directory {}: {}",
                            candidate.display(),
                            e
                        ));
                    }
                }
            } else if candidate.exists() {
                inputs.push(candidate.clone());
            } else {
                warn!(path = %candidate.display(), "Input does not exist, skipping");
                self.reporter
                    .warning(&format!("{} does not exist, skipping", candidate.display()));
            }
        }
        inputs
    }

    /// Runs one batch and returns once every worker is terminal.
    ///
    /// Fatal preconditions (missing rules, unwritable output locations)
    /// return an error before any worker starts.
    pub async fn run(
        &self,
        candidates: &[PathBuf],
        rules: &Path,
        output_directory: &Path,
        options: &BatchOptions,
    ) -> Result<BatchOutcome, OrchestratorError> {
        let inputs = self.resolve_candidates(candidates, &options.source_directory);

        if !rules.exists() {
            error!(rules = %rules.display(), "Rules file not found, aborting batch");
            return Err(OrchestratorError::RulesNotFound {
                path: rules.to_path_buf(),
            });
        }

        if options.list_only {
            info!(count = inputs.len(), "List-only mode, not launching workers");
            self.reporter.listed(&inputs);
            return Ok(BatchOutcome::Listed(inputs));
        }

        let jobs = self.allocate_jobs(&inputs, rules, output_directory, options)?;
        info!(
            count = jobs.len(),
            dry_run = options.dry_run,
            spawner = self.spawner.name(),
            "Launching workers"
        );

        let reporter = self.reporter.as_ref();
        let spawner = self.spawner.as_ref();
        let worker_options = options.worker_options();

        let mut workers = Vec::with_capacity(jobs.len());
        for job in jobs {
            let mut worker = Worker::new(self.next_id(), job, worker_options);
            worker.start(spawner, reporter).await;
            workers.push(worker);
        }

        join_all(workers.iter_mut().map(|w| w.wait(reporter))).await;

        let report = BatchReport::from_workers(&workers);
        info!(
            workers = workers.len(),
            failures = report.failures,
            exit_code = report.exit_code,
            "Batch complete"
        );
        reporter.summary(&report);

        Ok(BatchOutcome::Completed { workers, report })
    }

    /// Reserves a destination for every input and builds the jobs.
    fn allocate_jobs(
        &self,
        inputs: &[PathBuf],
        rules: &Path,
        output_directory: &Path,
        options: &BatchOptions,
    ) -> Result<Vec<Job>, OrchestratorError> {
        let mut allocator = if options.dry_run {
            PathAllocator::for_dry_run()
        } else {
            PathAllocator::new()
        };
        allocator.ensure_writable(output_directory)?;

        let mut jobs = Vec::with_capacity(inputs.len());
        for source in inputs {
            let directory = match options.placement {
                Placement::BesideSource => source_directory_of(source),
                Placement::OutputDirectory => output_directory.to_path_buf(),
            };
            let destination =
                match allocator.allocate_for(&directory, source, &options.output_extension) {
                    Ok(destination) => destination,
                    Err(AllocationError::InvalidBaseName { path }) => {
                        warn!(path = %path.display(), "Input has no file name, skipping");
                        self.reporter.warning(&format!(
                            "{} has no file name, skipping",
                            path.display()
                        ));
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
            jobs.push(Job::new(
                source.clone(),
                rules,
                destination,
                options.command.clone(),
            ));
        }
        Ok(jobs)
    }

    fn next_id(&self) -> WorkerId {
        WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Parent directory of `source`, with `.` standing in for a bare file name.
fn source_directory_of(source: &Path) -> PathBuf {
    match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn list_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        } else {
            debug!(path = %path.display(), "Skipping non-file entry");
        }
    }
    files.sort();
    if files.is_empty() {
        warn!(dir = %directory.display(), "Directory has no files");
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use crate::testing::{MockOutcome, MockSpawner, RecordingReporter};
    use tempfile::TempDir;

    fn orchestrator(spawner: MockSpawner, reporter: Arc<RecordingReporter>) -> BatchOrchestrator {
        BatchOrchestrator::new(Arc::new(spawner), reporter)
    }

    #[test]
    fn test_source_directory_of_bare_name() {
        assert_eq!(source_directory_of(Path::new("a.xml")), PathBuf::from("."));
        assert_eq!(
            source_directory_of(Path::new("/data/a.xml")),
            PathBuf::from("/data")
        );
    }

    #[test]
    fn test_resolve_expands_directories_non_recursively() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.xml"), "").unwrap();
        std::fs::write(temp.path().join("a.xml"), "").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested").join("c.xml"), "").unwrap();

        let orchestrator = BatchOrchestrator::new(Arc::new(MockSpawner::new()), Arc::new(NullReporter));
        let inputs = orchestrator.resolve_candidates(&[temp.path().to_path_buf()], Path::new("unused"));

        assert_eq!(
            inputs,
            vec![temp.path().join("a.xml"), temp.path().join("b.xml")]
        );
    }

    #[test]
    fn test_resolve_defaults_to_source_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.xml"), "").unwrap();

        let orchestrator = BatchOrchestrator::new(Arc::new(MockSpawner::new()), Arc::new(NullReporter));
        let inputs = orchestrator.resolve_candidates(&[], temp.path());
        assert_eq!(inputs, vec![temp.path().join("a.xml")]);
    }

    #[test]
    fn test_resolve_warns_on_missing_candidate() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.xml");
        std::fs::write(&file, "").unwrap();
        let reporter = Arc::new(RecordingReporter::new());

        let orchestrator = orchestrator(MockSpawner::new(), Arc::clone(&reporter));
        let inputs = orchestrator.resolve_candidates(
            &[temp.path().join("missing"), file.clone()],
            Path::new("unused"),
        );

        assert_eq!(inputs, vec![file]);
        let warnings = reporter.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missing"));
    }

    #[tokio::test]
    async fn test_worker_ids_increase_across_batches() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("a.xml");
        let rules = temp.path().join("rules.py");
        std::fs::write(&input, "").unwrap();
        std::fs::write(&rules, "").unwrap();

        let reporter = Arc::new(RecordingReporter::new());
        let orchestrator = orchestrator(MockSpawner::new(), reporter);
        let options = BatchOptions::default();

        let first = orchestrator
            .run(&[input.clone()], &rules, temp.path(), &options)
            .await
            .unwrap();
        let second = orchestrator
            .run(&[input], &rules, temp.path(), &options)
            .await
            .unwrap();

        assert_eq!(first.workers()[0].id(), WorkerId(1));
        assert_eq!(second.workers()[0].id(), WorkerId(2));
    }

    #[tokio::test]
    async fn test_output_directory_placement() {
        let temp = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = temp.path().join("a.xml");
        let rules = temp.path().join("rules.py");
        std::fs::write(&input, "").unwrap();
        std::fs::write(&rules, "").unwrap();
        std::fs::write(out.path().join("a.xml"), "").unwrap();

        let spawner = MockSpawner::new();
        let orchestrator = BatchOrchestrator::new(Arc::new(spawner), Arc::new(NullReporter));
        let options = BatchOptions::default().with_placement(Placement::OutputDirectory);

        let outcome = orchestrator
            .run(&[input], &rules, out.path(), &options)
            .await
            .unwrap();
        assert_eq!(
            outcome.workers()[0].job().destination(),
            out.path().join("a-1.xml")
        );
    }

    #[tokio::test]
    async fn test_unwritable_output_directory_is_fatal() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("a.xml");
        let rules = temp.path().join("rules.py");
        std::fs::write(&input, "").unwrap();
        std::fs::write(&rules, "").unwrap();

        let spawner = MockSpawner::new();
        let reporter = Arc::new(RecordingReporter::new());
        let orchestrator = BatchOrchestrator::new(Arc::new(spawner.clone()), reporter.clone());

        let result = orchestrator
            .run(
                &[input],
                &rules,
                &temp.path().join("missing-out"),
                &BatchOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(OrchestratorError::Allocation(_))));
        assert_eq!(spawner.spawn_count().await, 0);
        assert_eq!(reporter.started_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_worker_does_not_stop_siblings() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.xml");
        let b = temp.path().join("b.xml");
        let rules = temp.path().join("rules.py");
        for path in [&a, &b, &rules] {
            std::fs::write(path, "").unwrap();
        }

        let spawner = MockSpawner::new();
        spawner
            .set_outcome(&a, MockOutcome::spawn_failure())
            .await;
        let orchestrator = BatchOrchestrator::new(Arc::new(spawner.clone()), Arc::new(NullReporter));

        let outcome = orchestrator
            .run(&[a, b], &rules, temp.path(), &BatchOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code(), 1);
        assert!(!outcome.workers()[0].succeeded());
        assert!(outcome.workers()[1].succeeded());
    }
}
