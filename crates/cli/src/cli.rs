//! Command-line surface of the batch runner.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use rulebatch_core::{CommandTemplate, Placement, SummaryFormat};

/// Run a rule-based XML conversion tool over many files at once.
///
/// Exits with the number of failed conversions (capped at 255).
#[derive(Debug, Parser)]
#[command(name = "rulebatch", version, about)]
pub struct Cli {
    /// Source files or directories; defaults to the configured source directory
    pub source_files: Vec<PathBuf>,

    /// Rules file passed to every conversion
    #[arg(short = 'r', long)]
    pub rules_file: Option<PathBuf>,

    /// Directory that must be writable before anything runs
    #[arg(short = 'o', long)]
    pub output_directory: Option<PathBuf>,

    /// Only list the files that would be converted
    #[arg(short = 'l', long)]
    pub list_files: bool,

    /// Print the command lines without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Conversion tool and leading arguments, split on whitespace
    #[arg(long)]
    pub worker_command: Option<String>,

    /// Seconds before a conversion is killed
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// TOML configuration file
    #[arg(long, env = "RULEBATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write each result next to its source file
    #[arg(long, conflicts_with = "into_output_directory")]
    pub beside_source: bool,

    /// Write results into the output directory
    #[arg(long)]
    pub into_output_directory: bool,

    /// Extension of the written files
    #[arg(long)]
    pub output_extension: Option<String>,

    /// Summary rendering: table or json
    #[arg(long)]
    pub summary_format: Option<SummaryFormat>,

    /// Delete each source file whose conversion succeeded
    #[arg(long)]
    pub remove_sources: bool,
}

/// Configuration keys set on the command line. Unset flags are skipped so
/// they do not shadow file or environment values.
#[derive(Debug, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_command: Option<CommandTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_format: Option<SummaryFormat>,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        let placement = if self.into_output_directory {
            Some(Placement::OutputDirectory)
        } else if self.beside_source {
            Some(Placement::BesideSource)
        } else {
            None
        };

        CliOverrides {
            rules_file: self.rules_file.clone(),
            output_directory: self.output_directory.clone(),
            output_extension: self.output_extension.clone(),
            worker_command: self.worker_command.as_deref().map(CommandTemplate::parse),
            timeout_secs: self.timeout_secs,
            placement,
            summary_format: self.summary_format,
        }
    }
}
