//! Command-line interface for civicreport.
//!
//! This module provides the CLI structure for the `civrep` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{AuthCommand, ConfigCommand, IssuesCommand, OutputFormat, ReportCommand};

use crate::logging::Verbosity;

/// civrep - Report civic issues to your municipality
///
/// Files an issue with a title, description, department, map location and
/// optional photos or videos, then lets you browse what has been reported.
#[derive(Debug, Parser)]
#[command(name = "civrep")]
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
    /// Report a new issue
    Report(ReportCommand),

    /// Browse reported issues
    #[command(subcommand)]
    Issues(IssuesCommand),

    /// List departments issues can be assigned to
    Departments,

    /// Sign in, sign out, or show the current user
    #[command(subcommand)]
    Auth(AuthCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Department;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "civrep");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["civrep", "departments"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["civrep", "-v", "departments"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["civrep", "-vv", "departments"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["civrep", "-q", "departments"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_report() {
        let cli = parse(&[
            "civrep",
            "report",
            "--title",
            "Pothole",
            "--description",
            "Deep one",
            "--department",
            "Roads & Transport",
            "--lat",
            "-33.86",
            "--lng",
            "151.2",
            "--address",
            "George St",
            "--file",
            "a.jpg",
            "--file",
            "b.mp4",
        ]);
        let Command::Report(report) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(report.title, "Pothole");
        assert_eq!(report.department, Some(Department::RoadsTransport));
        assert_eq!(report.lat, Some(-33.86));
        assert_eq!(report.lng, Some(151.2));
        assert_eq!(
            report.files,
            vec![PathBuf::from("a.jpg"), PathBuf::from("b.mp4")]
        );
    }

    #[test]
    fn test_parse_report_accepts_slug() {
        let cli = parse(&["civrep", "report", "--department", "water-supply"]);
        let Command::Report(report) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(report.department, Some(Department::WaterSupply));
        assert!(report.lat.is_none());
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_parse_report_rejects_unknown_department() {
        assert!(Cli::try_parse_from(["civrep", "report", "--department", "mayor"]).is_err());
    }

    #[test]
    fn test_parse_report_lat_requires_lng() {
        assert!(Cli::try_parse_from(["civrep", "report", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn test_parse_issues_list() {
        let cli = parse(&["civrep", "issues", "list", "--mine", "-l", "5", "-f", "json"]);
        assert!(matches!(
            cli.command,
            Command::Issues(IssuesCommand::List {
                mine: true,
                limit: 5,
                format: OutputFormat::Json,
                department: None,
            })
        ));
    }

    #[test]
    fn test_parse_issues_show() {
        let cli = parse(&["civrep", "issues", "show", "abc", "--json"]);
        match cli.command {
            Command::Issues(IssuesCommand::Show { id, json }) => {
                assert_eq!(id, "abc");
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_auth_login() {
        let cli = parse(&[
            "civrep", "auth", "login", "--id", "u1", "--email", "a@b.in", "--name", "Asha",
        ]);
        match cli.command {
            Command::Auth(AuthCommand::Login { id, email, name }) => {
                assert_eq!(id, "u1");
                assert_eq!(email, "a@b.in");
                assert_eq!(name.as_deref(), Some("Asha"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["civrep", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }
}
