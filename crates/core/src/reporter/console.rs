//! Plain-text and JSON rendering of batch events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::orchestrator::BatchReport;
use crate::worker::{CommandLine, WorkerExit, WorkerId, WorkerState};

use super::traits::Reporter;

/// How the final summary is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFormat {
    /// Event lines plus an aligned summary table.
    #[default]
    Table,
    /// Only the summary, as a JSON document.
    Json,
}

impl std::str::FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown summary format: {}", other)),
        }
    }
}

/// Reporter that writes to a sink such as stdout.
///
/// Every event is also logged through `tracing`.
pub struct ConsoleReporter<W: Write + Send> {
    sink: Mutex<W>,
    format: SummaryFormat,
}

impl ConsoleReporter<std::io::Stdout> {
    /// Creates a reporter writing to stdout.
    pub fn stdout(format: SummaryFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(sink: W, format: SummaryFormat) -> Self {
        Self {
            sink: Mutex::new(sink),
            format,
        }
    }

    pub fn format(&self) -> SummaryFormat {
        self.format
    }

    /// Returns the sink, e.g. to inspect a buffer in tests.
    pub fn into_inner(self) -> W {
        match self.sink.into_inner() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, text: fmt::Arguments<'_>) {
        let mut sink = match self.sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = sink.write_fmt(text).and_then(|_| sink.flush()) {
            warn!("Failed to write report output: {}", e);
        }
    }

    fn render_table(&self, report: &BatchReport) -> String {
        let headers = ["SOURCE", "RULES", "STATUS"];
        let rows: Vec<[String; 3]> = report
            .workers
            .iter()
            .map(|w| {
                let status = match w.exit {
                    Some(WorkerExit::Exited(code)) if code != 0 => {
                        format!("{} ({})", w.state, code)
                    }
                    _ => w.state.to_string(),
                };
                [
                    w.source.display().to_string(),
                    w.rules.display().to_string(),
                    status,
                ]
            })
            .collect();

        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.len());
            }
        }

        let mut out = String::new();
        push_row(&mut out, &widths, headers);
        for row in &rows {
            push_row(&mut out, &widths, [row[0].as_str(), row[1].as_str(), row[2].as_str()]);
        }

        out.push_str(&format!(
            "\n{} worker(s), {} failed\n",
            report.workers.len(),
            report.failures
        ));

        if let Some(first) = report.first_failure() {
            out.push_str(&format!(
                "\nFirst failure: {} {} ({})\n",
                first.id,
                first.source.display(),
                first.exit.map_or_else(|| first.state.to_string(), |e| e.to_string()),
            ));
            if first.stderr.is_empty() {
                out.push_str("(no error output)\n");
            } else {
                out.push_str(&first.stderr);
                if !first.stderr.ends_with('\n') {
                    out.push('\n');
                }
            }
        }

        out
    }
}

fn push_row(out: &mut String, widths: &[usize; 3], cells: [&str; 3]) {
    out.push_str(&format!(
        "{:<w0$}  {:<w1$}  {}\n",
        cells[0],
        cells[1],
        cells[2],
        w0 = widths[0],
        w1 = widths[1],
    ));
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn worker_started(&self, id: WorkerId, source: &Path, command_line: &CommandLine) {
        debug!(worker = %id, source = %source.display(), command = %command_line, "Worker started");
        if self.format == SummaryFormat::Table {
            self.emit(format_args!(
                "[{}] start {}: {}\n",
                id,
                source.display(),
                command_line
            ));
        }
    }

    fn worker_stopped(&self, id: WorkerId, state: WorkerState, exit: &WorkerExit) {
        debug!(worker = %id, state = %state, exit = %exit, "Worker stopped");
        if self.format == SummaryFormat::Table {
            self.emit(format_args!("[{}] stop {} ({})\n", id, state, exit));
        }
    }

    fn warning(&self, message: &str) {
        match self.format {
            SummaryFormat::Table => self.emit(format_args!("warning: {}\n", message)),
            SummaryFormat::Json => debug!("{}", message),
        }
    }

    fn listed(&self, paths: &[PathBuf]) {
        debug!(count = paths.len(), "Listing candidate files");
        match self.format {
            SummaryFormat::Table => {
                for path in paths {
                    self.emit(format_args!("{}\n", path.display()));
                }
            }
            SummaryFormat::Json => {
                let listed: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
                match serde_json::to_string_pretty(&listed) {
                    Ok(json) => self.emit(format_args!("{}\n", json)),
                    Err(e) => warn!("Failed to render file list: {}", e),
                }
            }
        }
    }

    fn summary(&self, report: &BatchReport) {
        info!(
            workers = report.workers.len(),
            failures = report.failures,
            exit_code = report.exit_code,
            "Batch finished"
        );
        match self.format {
            SummaryFormat::Table => {
                let table = self.render_table(report);
                self.emit(format_args!("\n{}", table));
            }
            SummaryFormat::Json => match serde_json::to_string_pretty(report) {
                Ok(json) => self.emit(format_args!("{}\n", json)),
                Err(e) => warn!("Failed to render summary: {}", e),
            },
        }
    }
}
