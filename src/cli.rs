//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{SearchField, SearchQuery};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// RecordBoard - terminal dashboard for a records backend
///
/// Fetches records, charts them by sector and region, and renders a
/// table with expandable rows.
///
/// Examples:
///   recordboard
///   recordboard --field sector --term Energy
///   recordboard --field id --term 42 --format json
///   recordboard --expand 17 --output board.md --format markdown
///   recordboard --interactive
///   recordboard --ping-only
///   recordboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Origin of the records backend
    ///
    /// Can also be set via RECORDBOARD_URL env var or .recordboard.toml config.
    #[arg(long, value_name = "URL", env = "RECORDBOARD_URL")]
    pub url: Option<String>,

    /// Field to search in
    ///
    /// Submitted together with --term after the initial load.
    #[arg(short, long, value_name = "FIELD")]
    pub field: Option<SearchField>,

    /// Search term (blank falls back to "accounts")
    #[arg(short, long, value_name = "TEXT")]
    pub term: Option<String>,

    /// Toggle expansion of a row by id (or position when the row has no id)
    ///
    /// May be repeated; toggles are applied in order. `#N` always names the
    /// row at position N and a quoted key names a string id.
    #[arg(short, long, value_name = "KEY")]
    pub expand: Vec<String>,

    /// Ping the backend alongside the initial load
    #[arg(long)]
    pub ping: bool,

    /// Only ping the backend, then exit
    #[arg(long, conflicts_with_all = ["interactive", "ping"])]
    pub ping_only: bool,

    /// Start an interactive session after the first render
    #[arg(short, long)]
    pub interactive: bool,

    /// Output format (text, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the rendered dashboard to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Request timeout in seconds (no timeout by default)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Width of the longest bar in text charts
    #[arg(long, value_name = "COLUMNS")]
    pub chart_width: Option<usize>,

    /// Skip the sector and region charts
    #[arg(long)]
    pub no_charts: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .recordboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .recordboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the rendered dashboard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain terminal text (default)
    #[default]
    Text,
    /// Markdown tables
    Markdown,
    /// JSON snapshot
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The search to submit after the initial load, if any was requested.
    pub fn requested_search(&self) -> Option<SearchQuery> {
        if self.field.is_none() && self.term.is_none() {
            return None;
        }

        Some(SearchQuery::new(
            self.field.unwrap_or_default(),
            self.term.clone().unwrap_or_default(),
        ))
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Backend URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(width) = self.chart_width {
            if width == 0 {
                return Err("Chart width must be at least 1".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
