//! Types for the worker module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::WorkerError;

/// Default time a worker may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Batch-scoped worker identity, assigned in launch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl WorkerState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a worker's process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum WorkerExit {
    /// The process exited with this status code.
    Exited(i32),
    /// The process ended without an exit code (killed from outside).
    Signaled,
    /// The process outlived its timeout and was killed.
    TimedOut,
    /// No process was created.
    LaunchFailed,
}

impl WorkerExit {
    /// Numeric status shown to operators.
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled => -1,
            Self::LaunchFailed => -2,
            Self::TimedOut => -9,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Terminal state this exit maps to.
    pub fn state(&self) -> WorkerState {
        match self {
            Self::Exited(0) => WorkerState::Succeeded,
            Self::TimedOut => WorkerState::TimedOut,
            _ => WorkerState::Failed,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit {}", code),
            Self::Signaled => f.write_str("signaled"),
            Self::TimedOut => f.write_str("timed out"),
            Self::LaunchFailed => f.write_str("launch failed"),
        }
    }
}

/// Program and leading arguments of the conversion tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTemplate(Vec<String>);

impl CommandTemplate {
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    /// Splits a command string on whitespace.
    pub fn parse(command: &str) -> Self {
        Self(command.split_whitespace().map(str::to_string).collect())
    }

    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.first().map_or(true, |p| p.trim().is_empty())
    }
}

/// A fully built command line, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Program followed by every argument, lossily converted for display.
    pub fn to_strings(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_strings().join(" "))
    }
}

/// One (source, rules, destination) conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    source: PathBuf,
    rules: PathBuf,
    destination: PathBuf,
    command: CommandTemplate,
}

impl Job {
    pub fn new(
        source: impl Into<PathBuf>,
        rules: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        command: CommandTemplate,
    ) -> Self {
        Self {
            source: source.into(),
            rules: rules.into(),
            destination: destination.into(),
            command,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn rules(&self) -> &Path {
        &self.rules
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn command(&self) -> &CommandTemplate {
        &self.command
    }

    /// Builds `[command..., source, rules, destination]`.
    pub fn command_line(&self) -> Result<CommandLine, WorkerError> {
        let program = self.command.program().filter(|p| !p.trim().is_empty());
        let program = program.ok_or(WorkerError::EmptyCommand)?;

        for (field, path) in [
            ("source", &self.source),
            ("rules", &self.rules),
            ("destination", &self.destination),
        ] {
            if path.as_os_str().is_empty() {
                return Err(WorkerError::IncompleteCommand { field });
            }
        }

        let mut args: Vec<OsString> = self.command.args().iter().map(OsString::from).collect();
        args.push(self.source.clone().into_os_string());
        args.push(self.rules.clone().into_os_string());
        args.push(self.destination.clone().into_os_string());

        Ok(CommandLine::new(program, args))
    }
}

/// Runtime knobs shared by every worker in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    pub timeout: Duration,
    pub dry_run: bool,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            dry_run: false,
        }
    }
}

/// Text captured from a worker's standard streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Snapshot of a finished worker, used by reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub id: WorkerId,
    pub source: PathBuf,
    pub rules: PathBuf,
    pub destination: PathBuf,
    pub command_line: Vec<String>,
    pub state: WorkerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<WorkerExit>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            "/in/a.xml",
            "/rules.py",
            "/out/a.xml",
            CommandTemplate::parse("python3 -m ruledxml"),
        )
    }

    #[test]
    fn test_command_line_order() {
        let line = job().command_line().unwrap();
        assert_eq!(
            line.to_strings(),
            vec!["python3", "-m", "ruledxml", "/in/a.xml", "/rules.py", "/out/a.xml"]
        );
        assert_eq!(
            line.to_string(),
            "python3 -m ruledxml /in/a.xml /rules.py /out/a.xml"
        );
    }

    #[test]
    fn test_command_line_requires_every_path() {
        let job = Job::new("/in/a.xml", "", "/out/a.xml", CommandTemplate::parse("ruledxml"));
        let err = job.command_line().unwrap_err();
        assert!(matches!(err, WorkerError::IncompleteCommand { field: "rules" }));

        let job = Job::new("/in/a.xml", "/r.py", "", CommandTemplate::parse("ruledxml"));
        let err = job.command_line().unwrap_err();
        assert!(matches!(
            err,
            WorkerError::IncompleteCommand {
                field: "destination"
            }
        ));
    }

    #[test]
    fn test_command_line_requires_program() {
        let job = Job::new("/a", "/r", "/d", CommandTemplate::default());
        assert!(matches!(job.command_line(), Err(WorkerError::EmptyCommand)));
    }

    #[test]
    fn test_template_parse() {
        let template = CommandTemplate::parse("  sh   -c  'exit' ");
        assert_eq!(template.program(), Some("sh"));
        assert_eq!(template.args(), &["-c".to_string(), "'exit'".to_string()]);
        assert!(CommandTemplate::parse("   ").is_empty());
    }

    #[test]
    fn test_exit_maps_to_state() {
        assert_eq!(WorkerExit::Exited(0).state(), WorkerState::Succeeded);
        assert_eq!(WorkerExit::Exited(3).state(), WorkerState::Failed);
        assert_eq!(WorkerExit::Signaled.state(), WorkerState::Failed);
        assert_eq!(WorkerExit::LaunchFailed.state(), WorkerState::Failed);
        assert_eq!(WorkerExit::TimedOut.state(), WorkerState::TimedOut);
    }

    #[test]
    fn test_timeout_sentinel_is_distinct() {
        assert_ne!(WorkerExit::TimedOut.code(), WorkerExit::Signaled.code());
        assert_ne!(WorkerExit::TimedOut.code(), WorkerExit::LaunchFailed.code());
        assert!(WorkerExit::TimedOut.code() < 0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!WorkerState::Pending.is_terminal());
        assert!(!WorkerState::Running.is_terminal());
        assert!(WorkerState::Succeeded.is_terminal());
        assert!(WorkerState::Failed.is_terminal());
        assert!(WorkerState::TimedOut.is_terminal());
    }

    #[test]
    fn test_exit_serialization() {
        let json = serde_json::to_string(&WorkerExit::Exited(3)).unwrap();
        assert_eq!(json, r#"{"kind":"exited","code":3}"#);
        let json = serde_json::to_string(&WorkerExit::TimedOut).unwrap();
        assert_eq!(json, r#"{"kind":"timed_out"}"#);
    }
}
