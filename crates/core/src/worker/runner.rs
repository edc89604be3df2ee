//! The worker state machine.
//!
//! `Pending → Running → {Succeeded, Failed, TimedOut}`. A worker owns at most
//! one task handle and enforces its timeout as a deadline counted from the
//! moment it entered `Running`, so awaiting workers one after another never
//! stretches any single worker's budget.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::reporter::Reporter;

use super::error::WorkerError;
use super::traits::{Spawner, TaskHandle};
use super::types::{
    CapturedOutput, CommandLine, Job, WorkerExit, WorkerId, WorkerOptions, WorkerState,
    WorkerSummary,
};

/// How long a killed worker's pipes may stay open before capture gives up.
pub const DRAIN_WINDOW: Duration = Duration::from_millis(500);

/// Runtime handle that executes one [`Job`].
pub struct Worker {
    id: WorkerId,
    job: Job,
    options: WorkerOptions,
    state: WorkerState,
    exit: Option<WorkerExit>,
    output: CapturedOutput,
    command_line: Option<CommandLine>,
    started_at: Option<DateTime<Utc>>,
    deadline: Option<Instant>,
    started: Option<Instant>,
    elapsed: Option<Duration>,
    handle: Option<Box<dyn TaskHandle>>,
}

impl Worker {
    pub fn new(id: WorkerId, job: Job, options: WorkerOptions) -> Self {
        Self {
            id,
            job,
            options,
            state: WorkerState::Pending,
            exit: None,
            output: CapturedOutput::default(),
            command_line: None,
            started_at: None,
            deadline: None,
            started: None,
            elapsed: None,
            handle: None,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn exit(&self) -> Option<WorkerExit> {
        self.exit
    }

    pub fn stdout(&self) -> &str {
        &self.output.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.output.stderr
    }

    pub fn command_line(&self) -> Option<&CommandLine> {
        self.command_line.as_ref()
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn succeeded(&self) -> bool {
        self.state == WorkerState::Succeeded
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Whether the bound process is still alive. Always false in dry-run.
    pub fn is_process_running(&mut self) -> bool {
        self.handle.as_mut().is_some_and(|h| h.is_running())
    }

    /// Moves `Pending → Running` and launches the process.
    ///
    /// Launch problems are recorded on the worker as a `Failed` terminal
    /// state; they never propagate to the caller.
    pub async fn start(&mut self, spawner: &dyn Spawner, reporter: &dyn Reporter) {
        if self.state != WorkerState::Pending {
            warn!(worker = %self.id, state = %self.state, "Worker already started");
            return;
        }

        let command_line = match self.job.command_line() {
            Ok(line) => line,
            Err(e) => {
                self.fail_launch(e, reporter);
                return;
            }
        };

        self.state = WorkerState::Running;
        self.started_at = Some(Utc::now());
        let now = Instant::now();
        self.started = Some(now);
        self.deadline = Some(now + self.options.timeout);
        reporter.worker_started(self.id, self.job.source(), &command_line);

        let spawned = if self.options.dry_run {
            None
        } else {
            Some(spawner.spawn(&command_line).await)
        };
        self.command_line = Some(command_line);

        match spawned {
            None => {
                debug!(worker = %self.id, "Dry run, not spawning");
                self.finish(WorkerExit::Exited(0), reporter);
            }
            Some(Ok(handle)) => {
                info!(
                    worker = %self.id,
                    pid = ?handle.id(),
                    source = %self.job.source().display(),
                    "Worker running"
                );
                self.handle = Some(handle);
            }
            Some(Err(e)) => self.fail_launch(e, reporter),
        }
    }

    /// Waits until the worker reaches a terminal state, killing the process
    /// once the deadline passes.
    pub async fn wait(&mut self, reporter: &dyn Reporter) -> WorkerState {
        if self.state != WorkerState::Running {
            return self.state;
        }

        let deadline = self
            .deadline
            .unwrap_or_else(|| Instant::now() + self.options.timeout);
        let Some(handle) = self.handle.as_mut() else {
            // Running without a handle only happens in dry-run, which
            // finishes inside start().
            return self.state;
        };

        let exit = match timeout_at(deadline, handle.wait()).await {
            Ok(result) => {
                let drain = deadline.saturating_duration_since(Instant::now()) + DRAIN_WINDOW;
                self.output = handle.capture(drain).await;
                match result {
                    Ok(Some(code)) => WorkerExit::Exited(code),
                    Ok(None) => WorkerExit::Signaled,
                    Err(e) => {
                        append_line(&mut self.output.stderr, &e.to_string());
                        WorkerExit::Signaled
                    }
                }
            }
            Err(_) => {
                warn!(
                    worker = %self.id,
                    timeout = ?self.options.timeout,
                    "Worker timed out, terminating"
                );
                if let Err(e) = handle.terminate().await {
                    warn!(worker = %self.id, "Failed to terminate worker: {}", e);
                }
                self.output = handle.capture(DRAIN_WINDOW).await;
                WorkerExit::TimedOut
            }
        };

        self.finish(exit, reporter);
        self.state
    }

    /// Starts and awaits the worker in one call.
    pub async fn run(&mut self, spawner: &dyn Spawner, reporter: &dyn Reporter) -> WorkerState {
        self.start(spawner, reporter).await;
        self.wait(reporter).await
    }

    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            id: self.id,
            source: self.job.source().to_path_buf(),
            rules: self.job.rules().to_path_buf(),
            destination: self.job.destination().to_path_buf(),
            command_line: self
                .command_line
                .as_ref()
                .map(CommandLine::to_strings)
                .unwrap_or_default(),
            state: self.state,
            exit: self.exit,
            exit_code: self.exit.map(|e| e.code()),
            stdout: self.output.stdout.clone(),
            stderr: self.output.stderr.clone(),
            dry_run: self.options.dry_run,
            started_at: self.started_at,
            duration_ms: self.elapsed.map(|d| d.as_millis() as u64),
        }
    }

    fn fail_launch(&mut self, error: WorkerError, reporter: &dyn Reporter) {
        warn!(worker = %self.id, "Worker failed to launch: {}", error);
        append_line(&mut self.output.stderr, &error.to_string());
        self.finish(WorkerExit::LaunchFailed, reporter);
    }

    fn finish(&mut self, exit: WorkerExit, reporter: &dyn Reporter) {
        self.exit = Some(exit);
        self.state = exit.state();
        self.elapsed = self.started.map(|s| s.elapsed());
        debug!(worker = %self.id, state = %self.state, exit = %exit, "Worker finished");
        reporter.worker_stopped(self.id, self.state, &exit);
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("job", &self.job)
            .field("state", &self.state)
            .field("exit", &self.exit)
            .field("dry_run", &self.options.dry_run)
            .finish_non_exhaustive()
    }
}

fn append_line(buffer: &mut String, line: &str) {
    if !buffer.is_empty() && !buffer.ends_with('\n') {
        buffer.push('\n');
    }
    buffer.push_str(line);
}
