//! Process-backed spawner built on `tokio::process`.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::error::WorkerError;
use super::traits::{Spawner, TaskHandle};
use super::types::{CapturedOutput, CommandLine};

const READ_CHUNK: usize = 8 * 1024;

/// Spawns each command as a child process with piped output.
#[derive(Debug, Default, Clone)]
pub struct CommandSpawner;

impl CommandSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Spawner for CommandSpawner {
    fn name(&self) -> &str {
        "process"
    }

    async fn spawn(&self, command: &CommandLine) -> Result<Box<dyn TaskHandle>, WorkerError> {
        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::spawn(command.program().to_string_lossy(), e))?;

        debug!(pid = ?child.id(), command = %command, "Spawned worker process");

        let stdout = Arc::new(Mutex::new(Vec::new()));
        let stderr = Arc::new(Mutex::new(Vec::new()));
        let mut readers = Vec::with_capacity(2);
        if let Some(pipe) = child.stdout.take() {
            readers.push(drain_into(pipe, Arc::clone(&stdout)));
        }
        if let Some(pipe) = child.stderr.take() {
            readers.push(drain_into(pipe, Arc::clone(&stderr)));
        }

        Ok(Box::new(ProcessHandle {
            child,
            stdout,
            stderr,
            readers,
        }))
    }
}

/// Copies a pipe into a shared buffer chunk by chunk, so a partial capture
/// is possible while the pipe is still open.
fn drain_into<R>(mut pipe: R, buffer: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buffer.lock().await.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    debug!("Stopped reading worker output: {}", e);
                    break;
                }
            }
        }
    })
}

/// Handle to a spawned child process.
pub struct ProcessHandle {
    child: Child,
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
    readers: Vec<JoinHandle<()>>,
}

#[async_trait]
impl TaskHandle for ProcessHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<Option<i32>, WorkerError> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn terminate(&mut self) -> Result<(), WorkerError> {
        // kill() also reaps the child
        self.child.kill().await?;
        Ok(())
    }

    async fn capture(&mut self, drain: Duration) -> CapturedOutput {
        let readers = std::mem::take(&mut self.readers);
        let aborts: Vec<_> = readers.iter().map(|r| r.abort_handle()).collect();

        if timeout(drain, futures::future::join_all(readers))
            .await
            .is_err()
        {
            // a grandchild may still hold the pipes open
            warn!("Worker output still open after {:?}, capturing partial output", drain);
            for abort in aborts {
                abort.abort();
            }
        }

        CapturedOutput {
            stdout: String::from_utf8_lossy(&self.stdout.lock().await).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr.lock().await).into_owned(),
        }
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}
