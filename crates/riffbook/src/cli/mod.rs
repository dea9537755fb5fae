//! Command-line interface for riffbook.
//!
//! This module provides the CLI structure for the `riffbook` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_assignment, Assignment, CatalogCommand, ConfigCommand, ExportCommand, ImportCommand,
    LogCommand, PlanCommand, ReportCommand, Selection, StatsCommand, StatusCommand,
};

/// riffbook - Track your guitar technique practice
///
/// Build practice plans from a catalog of techniques, log daily metric
/// values, and follow your progress over time.
#[derive(Debug, Parser)]
#[command(name = "riffbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List instructors and their techniques
    Catalog(CatalogCommand),

    /// Create and edit practice plans
    #[command(subcommand)]
    Plan(PlanCommand),

    /// Log metric values for a plan and day
    #[command(subcommand)]
    Log(LogCommand),

    /// Show statistics for a technique metric
    Stats(StatsCommand),

    /// Export recorded progress
    #[command(subcommand)]
    Export(ExportCommand),

    /// Print reports of recorded progress
    #[command(subcommand)]
    Report(ReportCommand),

    /// Import a document in the flat-key format
    Import(ImportCommand),

    /// Print the document every time it changes
    Watch,

    /// Show store status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Log verbosity from `-q` and `-v`.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
