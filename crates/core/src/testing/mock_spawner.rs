//! Mock spawner for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::worker::{CapturedOutput, CommandLine, Spawner, TaskHandle, WorkerError};

/// Scripted behavior of one mocked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockOutcome {
    /// Exit code, or `None` to run until terminated.
    pub exit: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// How long the task runs before exiting.
    pub delay: Duration,
    /// Fail at spawn time instead of running.
    pub fail_spawn: bool,
}

impl Default for MockOutcome {
    fn default() -> Self {
        Self::success()
    }
}

impl MockOutcome {
    pub fn success() -> Self {
        Self::exit(0)
    }

    pub fn exit(code: i32) -> Self {
        Self {
            exit: Some(code),
            stdout: String::new(),
            stderr: String::new(),
            delay: Duration::ZERO,
            fail_spawn: false,
        }
    }

    /// Never exits on its own.
    pub fn hang() -> Self {
        Self {
            exit: None,
            ..Self::success()
        }
    }

    pub fn spawn_failure() -> Self {
        Self {
            fail_spawn: true,
            ..Self::success()
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Mock implementation of the Spawner trait.
///
/// Provides controllable behavior for testing:
/// - Script outcomes per source path (the third-from-last argument)
/// - Record every spawned command line
/// - Track how many tasks were alive at the same time
///
/// # Example
///
/// ```rust,ignore
/// use rulebatch_core::testing::{MockOutcome, MockSpawner};
///
/// let spawner = MockSpawner::new();
/// spawner.set_outcome("in/b.xml", MockOutcome::exit(3).with_stderr("bad")).await;
///
/// // ...run a batch...
///
/// assert_eq!(spawner.spawn_count().await, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSpawner {
    outcomes: Arc<RwLock<HashMap<PathBuf, MockOutcome>>>,
    default_outcome: Arc<RwLock<MockOutcome>>,
    spawned: Arc<RwLock<Vec<CommandLine>>>,
    live: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outcome for tasks whose source is `source`.
    pub async fn set_outcome(&self, source: impl AsRef<Path>, outcome: MockOutcome) {
        self.outcomes
            .write()
            .await
            .insert(source.as_ref().to_path_buf(), outcome);
    }

    /// Set the outcome for sources without a specific one.
    pub async fn set_default_outcome(&self, outcome: MockOutcome) {
        *self.default_outcome.write().await = outcome;
    }

    /// Every command line passed to `spawn`, in call order.
    pub async fn spawned(&self) -> Vec<CommandLine> {
        self.spawned.read().await.clone()
    }

    pub async fn spawn_count(&self) -> usize {
        self.spawned.read().await.len()
    }

    /// Highest number of tasks alive at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Tasks currently alive.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn source_of(command: &CommandLine) -> Option<PathBuf> {
        let args = command.args();
        args.len()
            .checked_sub(3)
            .map(|i| PathBuf::from(&args[i]))
    }
}

#[async_trait]
impl Spawner for MockSpawner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn spawn(&self, command: &CommandLine) -> Result<Box<dyn TaskHandle>, WorkerError> {
        self.spawned.write().await.push(command.clone());

        let specific = match Self::source_of(command) {
            Some(source) => self.outcomes.read().await.get(&source).cloned(),
            None => None,
        };
        let outcome = match specific {
            Some(outcome) => outcome,
            None => self.default_outcome.read().await.clone(),
        };

        if outcome.fail_spawn {
            return Err(WorkerError::spawn(
                command.program().to_string_lossy(),
                io::Error::new(io::ErrorKind::NotFound, "mock spawn failure"),
            ));
        }

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(MockTask {
            ready_at: Instant::now() + outcome.delay,
            outcome,
            done: false,
            live: Arc::clone(&self.live),
        }))
    }
}

struct MockTask {
    outcome: MockOutcome,
    ready_at: Instant,
    done: bool,
    live: Arc<AtomicUsize>,
}

impl MockTask {
    fn mark_done(&mut self) {
        if !self.done {
            self.done = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockTask {
    fn drop(&mut self) {
        self.mark_done();
    }
}

#[async_trait]
impl TaskHandle for MockTask {
    fn id(&self) -> Option<u32> {
        None
    }

    async fn wait(&mut self) -> Result<Option<i32>, WorkerError> {
        if self.done {
            return Ok(self.outcome.exit);
        }
        match self.outcome.exit {
            Some(code) => {
                tokio::time::sleep_until(self.ready_at).await;
                self.mark_done();
                Ok(Some(code))
            }
            None => std::future::pending().await,
        }
    }

    async fn terminate(&mut self) -> Result<(), WorkerError> {
        self.mark_done();
        Ok(())
    }

    async fn capture(&mut self, _drain: Duration) -> CapturedOutput {
        CapturedOutput {
            stdout: self.outcome.stdout.clone(),
            stderr: self.outcome.stderr.clone(),
        }
    }

    fn is_running(&mut self) -> bool {
        !self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn command(source: &str) -> CommandLine {
        CommandLine::new(
            "ruledxml",
            vec![
                OsString::from(source),
                OsString::from("rules.py"),
                OsString::from("out.xml"),
            ],
        )
    }

    #[tokio::test]
    async fn test_scripted_outcome_by_source() {
        let spawner = MockSpawner::new();
        spawner
            .set_outcome("in/b.xml", MockOutcome::exit(3).with_stderr("bad"))
            .await;

        let mut ok = spawner.spawn(&command("in/a.xml")).await.unwrap();
        let mut bad = spawner.spawn(&command("in/b.xml")).await.unwrap();

        assert_eq!(ok.wait().await.unwrap(), Some(0));
        assert_eq!(bad.wait().await.unwrap(), Some(3));
        assert_eq!(bad.capture(Duration::ZERO).await.stderr, "bad");
        assert_eq!(spawner.spawn_count().await, 2);
        assert_eq!(spawner.peak_concurrency(), 2);
        assert_eq!(spawner.live_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_hanging_task() {
        let spawner = MockSpawner::new();
        spawner.set_default_outcome(MockOutcome::hang()).await;

        let mut task = spawner.spawn(&command("in/a.xml")).await.unwrap();
        assert!(task.is_running());
        {
            let mut wait = tokio_test::task::spawn(task.wait());
            tokio_test::assert_pending!(wait.poll());
        }

        task.terminate().await.unwrap();
        assert!(!task.is_running());
        assert_eq!(spawner.live_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let spawner = MockSpawner::new();
        spawner
            .set_default_outcome(MockOutcome::spawn_failure())
            .await;

        let result = spawner.spawn(&command("in/a.xml")).await;
        assert!(matches!(result, Err(WorkerError::Spawn { .. })));
        assert_eq!(spawner.spawn_count().await, 1);
    }
}
