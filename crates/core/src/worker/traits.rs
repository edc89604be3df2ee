//! Trait definitions for the worker module.

use async_trait::async_trait;
use std::time::Duration;

use super::error::WorkerError;
use super::types::{CapturedOutput, CommandLine};

/// Launches external processes for workers.
#[async_trait]
pub trait Spawner: Send + Sync {
    /// Returns the name of this spawner implementation.
    fn name(&self) -> &str;

    /// Starts `command` and returns a handle that owns the running task.
    async fn spawn(&self, command: &CommandLine) -> Result<Box<dyn TaskHandle>, WorkerError>;
}

/// A running, cancellable task bound to one worker.
#[async_trait]
pub trait TaskHandle: Send {
    /// OS process id, when there is one.
    fn id(&self) -> Option<u32>;

    /// Waits for the task to end and returns its exit code, or `None` if it
    /// ended without one.
    ///
    /// Must be cancel-safe: dropping the future leaves the task running.
    async fn wait(&mut self) -> Result<Option<i32>, WorkerError>;

    /// Forcibly stops the task and reaps it.
    async fn terminate(&mut self) -> Result<(), WorkerError>;

    /// Collects whatever output is available, waiting at most `drain` for
    /// the streams to close.
    async fn capture(&mut self, drain: Duration) -> CapturedOutput;

    /// Whether the task is still alive.
    fn is_running(&mut self) -> bool;
}
