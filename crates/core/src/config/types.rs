use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::orchestrator::{BatchOptions, Placement};
use crate::reporter::SummaryFormat;
use crate::worker::CommandTemplate;

/// Root configuration for a batch run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Directory scanned when no source files are given.
    #[serde(default = "default_source_directory")]
    pub source_directory: PathBuf,
    /// Rules file handed to every worker.
    #[serde(default = "default_rules_file")]
    pub rules_file: PathBuf,
    /// Directory that must be writable before any worker launches.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    /// Extension of allocated destination files (with or without the dot).
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
    /// Program and leading arguments of the conversion tool. Accepts a list
    /// or a single whitespace-separated string.
    #[serde(
        default = "default_worker_command",
        deserialize_with = "deserialize_command"
    )]
    pub worker_command: Vec<String>,
    /// Per-worker timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where destination paths are allocated.
    #[serde(default)]
    pub placement: Placement,
    /// How the final summary is rendered.
    #[serde(default)]
    pub summary_format: SummaryFormat,
}

fn default_source_directory() -> PathBuf {
    PathBuf::from("input")
}

fn default_rules_file() -> PathBuf {
    PathBuf::from("rules.py")
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_output_extension() -> String {
    "xml".to_string()
}

fn default_worker_command() -> Vec<String> {
    vec!["ruledxml".to_string()]
}

fn deserialize_command<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Command {
        Line(String),
        Parts(Vec<String>),
    }

    Ok(match Command::deserialize(deserializer)? {
        Command::Line(line) => line.split_whitespace().map(String::from).collect(),
        Command::Parts(parts) => parts,
    })
}

fn default_timeout() -> u64 {
    30
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            source_directory: default_source_directory(),
            rules_file: default_rules_file(),
            output_directory: default_output_directory(),
            output_extension: default_output_extension(),
            worker_command: default_worker_command(),
            timeout_secs: default_timeout(),
            placement: Placement::default(),
            summary_format: SummaryFormat::default(),
        }
    }
}

impl BatchConfig {
    /// Builds the orchestrator options described by this config.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            source_directory: self.source_directory.clone(),
            command: CommandTemplate::new(self.worker_command.clone()),
            output_extension: self.output_extension.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            placement: self.placement,
            dry_run: false,
            list_only: false,
        }
    }
}
