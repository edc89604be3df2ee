//! Workers wrap one external conversion each.
//!
//! A [`Worker`] builds the command line `[command..., source, rules,
//! destination]` for its [`Job`], launches it through a [`Spawner`], enforces
//! a timeout and captures both output streams.
//!
//! # Example
//!
//! ```ignore
//! use rulebatch_core::worker::{CommandSpawner, CommandTemplate, Job, Worker, WorkerId, WorkerOptions};
//! use rulebatch_core::reporter::NullReporter;
//!
//! let job = Job::new("in/a.xml", "rules.py", "in/a-1.xml", CommandTemplate::parse("ruledxml"));
//! let mut worker = Worker::new(WorkerId(1), job, WorkerOptions::default());
//! let state = worker.run(&CommandSpawner::new(), &NullReporter).await;
//! println!("{} -> {}", worker.id(), state);
//! ```

mod error;
mod process;
mod runner;
mod traits;
mod types;

pub use error::WorkerError;
pub use process::{CommandSpawner, ProcessHandle};
pub use runner::{Worker, DRAIN_WINDOW};
pub use traits::{Spawner, TaskHandle};
pub use types::{
    CapturedOutput, CommandLine, CommandTemplate, Job, WorkerExit, WorkerId, WorkerOptions,
    WorkerState, WorkerSummary, DEFAULT_TIMEOUT,
};
