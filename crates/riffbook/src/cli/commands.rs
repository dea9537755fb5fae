//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Catalog command arguments.
#[derive(Debug, Args)]
pub struct CatalogCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Plan management commands.
#[derive(Debug, Subcommand)]
pub enum PlanCommand {
    /// List all plans
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show a plan and its techniques
    Show {
        /// Plan id or name
        plan: String,
    },

    /// Create a new plan
    Create {
        /// Plan name (defaults to "New Practice Plan")
        #[arg(short, long)]
        name: Option<String>,

        /// Technique ids to include (repeatable)
        #[arg(short, long = "technique", value_name = "TECHNIQUE")]
        techniques: Vec<String>,
    },

    /// Rename a plan
    Rename {
        /// Plan id or name
        plan: String,

        /// The new name
        name: String,
    },

    /// Add a technique to a plan
    Add {
        /// Plan id or name
        plan: String,

        /// Technique id
        technique: String,
    },

    /// Remove a technique from a plan
    Remove {
        /// Plan id or name
        plan: String,

        /// Technique id
        technique: String,
    },

    /// Delete a plan and all progress logged against it
    Delete {
        /// Plan id or name
        plan: String,

        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },
}

/// The plan and day a logging command acts on.
#[derive(Debug, Clone, Args)]
pub struct Selection {
    /// Plan id or name
    #[arg(short, long)]
    pub plan: String,

    /// Date as YYYY-MM-DD (defaults to today, UTC)
    #[arg(short, long)]
    pub date: Option<String>,
}

/// Progress logging commands.
#[derive(Debug, Subcommand)]
pub enum LogCommand {
    /// Show the fields for a plan and date
    Show {
        #[command(flatten)]
        selection: Selection,
    },

    /// Set metric values and save
    Set {
        #[command(flatten)]
        selection: Selection,

        /// Values as TECHNIQUE.METRIC=VALUE; an empty VALUE clears the field
        #[arg(required = true, value_parser = parse_assignment)]
        values: Vec<Assignment>,
    },

    /// Clear every field and save, removing the day's entry
    Clear {
        #[command(flatten)]
        selection: Selection,
    },

    /// Show which days of the week have logged progress
    Week {
        #[command(flatten)]
        selection: Selection,
    },
}

/// One `TECHNIQUE.METRIC=VALUE` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Technique id.
    pub technique: String,
    /// Metric id.
    pub metric: String,
    /// Raw value text, parsed on save.
    pub raw: String,
}

/// Parse a `TECHNIQUE.METRIC=VALUE` argument.
///
/// # Errors
///
/// Returns a message if the argument is not in that form.
pub fn parse_assignment(arg: &str) -> Result<Assignment, String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected TECHNIQUE.METRIC=VALUE, got '{arg}'"))?;
    let (technique, metric) = key
        .split_once('.')
        .filter(|(t, m)| !t.is_empty() && !m.is_empty())
        .ok_or_else(|| format!("expected TECHNIQUE.METRIC before '=', got '{key}'"))?;
    Ok(Assignment {
        technique: technique.to_string(),
        metric: metric.to_string(),
        raw: raw.to_string(),
    })
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Technique id
    #[arg(short, long)]
    pub technique: String,

    /// Metric id
    #[arg(short, long)]
    pub metric: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export commands.
#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    /// Write all progress to a CSV file
    Csv {
        /// Output directory (defaults to the configured export directory)
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

/// Printable report commands.
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Print every recorded value as a table
    Table,

    /// Print a progress chart per technique metric
    Graphs,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// JSON document in the flat-key format
    pub file: PathBuf,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
