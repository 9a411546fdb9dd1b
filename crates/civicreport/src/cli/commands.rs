//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::issue::Department;

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Short title of the issue
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// What is wrong and where exactly
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Responsible department (label or slug, e.g. "Roads & Transport")
    #[arg(long)]
    pub department: Option<Department>,

    /// Latitude of the issue
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    pub lat: Option<f64>,

    /// Longitude of the issue
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lng: Option<f64>,

    /// Street address or landmark
    #[arg(short, long, default_value = "")]
    pub address: String,

    /// Photo or video to attach (repeatable)
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,
}

/// Commands for browsing stored issues.
#[derive(Debug, Subcommand)]
pub enum IssuesCommand {
    /// List recent issues
    List {
        /// Only issues for this department
        #[arg(short, long)]
        department: Option<Department>,

        /// Only issues reported by the signed-in user
        #[arg(short, long, conflicts_with = "department")]
        mine: bool,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Show a single issue
    Show {
        /// Issue identifier
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show database statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Session commands.
#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in as a user
    Login {
        /// User identifier
        #[arg(long)]
        id: String,

        /// Email address
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,
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

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per issue
    #[default]
    Plain,
    /// JSON array
    Json,
}
