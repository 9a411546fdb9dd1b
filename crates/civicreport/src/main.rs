//! `civrep` - CLI for civicreport
//!
//! This binary files civic issue reports and lets you browse, sign in, and
//! inspect configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, warn};

use civicreport::cli::{
    AuthCommand, Cli, Command, ConfigCommand, IssuesCommand, OutputFormat, ReportCommand,
};
use civicreport::config::BackendKind;
use civicreport::{
    init_logging, Attachment, Config, CurrentUser, Department, Error, IssueDatabase, IssueForm,
    LocalObjectStore, Location, NextView, Notice, PersistedIssue, RestBackend, Session,
    SubmissionCoordinator,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Configuration commands load (or fail to load) the file themselves.
    let command = match cli.command {
        Command::Config(cmd) => return handle_config(cli.config, cmd),
        command => command,
    };

    let config = Config::load_from(cli.config)?;
    debug!("Using {} backend", config.backend);

    match command {
        Command::Report(cmd) => handle_report(&config, cmd).await,
        Command::Issues(cmd) => handle_issues(&config, cmd).map(|()| ExitCode::SUCCESS),
        Command::Departments => {
            handle_departments();
            Ok(ExitCode::SUCCESS)
        }
        Command::Auth(cmd) => handle_auth(&config, cmd).map(|()| ExitCode::SUCCESS),
        Command::Config(_) => Ok(ExitCode::SUCCESS),
    }
}

/// Build the coordinator for the configured backend.
fn coordinator(config: &Config) -> anyhow::Result<SubmissionCoordinator> {
    match config.backend {
        BackendKind::Local => {
            let database = Arc::new(IssueDatabase::open(config.database_path())?);
            let objects = Arc::new(LocalObjectStore::new(
                config.media_dir(),
                config.storage.media_bucket.clone(),
                config.public_base_url(),
                config.storage.max_upload_bytes,
            ));
            Ok(SubmissionCoordinator::new(objects, database))
        }
        BackendKind::Remote => {
            let backend = Arc::new(remote_backend(config)?);
            Ok(SubmissionCoordinator::new(backend.clone(), backend))
        }
    }
}

fn remote_backend(config: &Config) -> anyhow::Result<RestBackend> {
    let url = config
        .remote
        .url
        .clone()
        .context("remote.url is not configured")?;
    let api_key = config
        .remote
        .api_key
        .clone()
        .context("remote.api_key is not configured")?;
    Ok(RestBackend::new(
        url,
        api_key,
        config.storage.media_bucket.clone(),
        config.remote_timeout(),
    )?)
}

/// Open the local database, or explain why browsing is unavailable.
fn local_database(config: &Config, operation: &'static str) -> anyhow::Result<IssueDatabase> {
    match config.backend {
        BackendKind::Local => Ok(IssueDatabase::open(config.database_path())?),
        BackendKind::Remote => Err(Error::Unsupported {
            backend: "remote",
            operation,
        }
        .into()),
    }
}

async fn handle_report(config: &Config, cmd: ReportCommand) -> anyhow::Result<ExitCode> {
    let mut form = IssueForm::new();
    form.set_title(cmd.title);
    form.set_description(cmd.description);
    if let Some(department) = cmd.department {
        form.set_department(department);
    }
    if let (Some(lat), Some(lng)) = (cmd.lat, cmd.lng) {
        form.set_location(Location::new(lat, lng, cmd.address)?);
    }
    for path in &cmd.files {
        form.add_attachment(Attachment::from_path(path)?);
    }

    let session = Session::load(config.session_path())?;
    let coordinator = coordinator(config)?;
    let result = coordinator.submit(&mut form, session.current_user()).await;

    let notice = Notice::for_result(&result);
    match &result {
        Ok(receipt) => {
            println!("{notice}");
            for url in &receipt.record.media_urls {
                println!("  {url}");
            }
            if receipt.next == NextView::IssueMap {
                println!("Run `civrep issues list` to see it alongside other reports.");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{notice}");
            if err.redirect() == Some(NextView::SignIn) {
                eprintln!("Sign in with `civrep auth login --id <ID> --email <EMAIL>`.");
            }
            if let Some(cause) = err.cause() {
                warn!("Submission failed: {err}: {cause}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn handle_issues(config: &Config, cmd: IssuesCommand) -> anyhow::Result<()> {
    match cmd {
        IssuesCommand::List {
            department,
            mine,
            limit,
            format,
        } => {
            let db = local_database(config, "issues list")?;
            let issues = if mine {
                let session = Session::load(config.session_path())?;
                let Some(user) = session.current_user() else {
                    bail!("--mine requires a signed-in user; run `civrep auth login` first");
                };
                db.list_by_user(&user.id, limit)?
            } else if let Some(department) = department {
                db.list_by_department(department, limit)?
            } else {
                db.list_recent(limit)?
            };
            print_issues(&issues, format)?;
        }
        IssuesCommand::Show { id, json } => {
            let db = local_database(config, "issues show")?;
            let Some(issue) = db.get(&id)? else {
                bail!("no issue with id {id}");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&issue)?);
            } else {
                print_issue_detail(&issue);
            }
        }
        IssuesCommand::Stats { json } => {
            let db = local_database(config, "issues stats")?;
            let stats = db.stats()?;
            if json {
                let by_department: serde_json::Map<String, serde_json::Value> = stats
                    .by_department
                    .iter()
                    .map(|(slug, count)| (slug.clone(), (*count).into()))
                    .collect();
                let value = serde_json::json!({
                    "total_issues": stats.total_issues,
                    "by_department": by_department,
                    "newest_issue": stats.newest_issue,
                    "db_size_bytes": stats.db_size_bytes,
                    "database_path": db.path(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("civrep issue statistics");
                println!("-----------------------");
                println!("Database:      {}", db.path().display());
                println!("Total issues:  {}", stats.total_issues);
                if let Some(newest) = stats.newest_issue {
                    println!("Newest:        {}", newest.format("%Y-%m-%d %H:%M UTC"));
                }
                println!("Size:          {} bytes", stats.db_size_bytes);
                for (slug, count) in &stats.by_department {
                    let label = Department::from_slug(slug).map_or(slug.as_str(), |d| d.label());
                    println!("  {label:<24} {count}");
                }
            }
        }
    }
    Ok(())
}

fn print_issues(issues: &[PersistedIssue], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(issues)?),
        OutputFormat::Plain => {
            if issues.is_empty() {
                println!("No issues reported yet.");
            }
            for issue in issues {
                println!(
                    "{}  {}  [{}]  {}  ({})",
                    issue.id,
                    issue.created_at.format("%Y-%m-%d %H:%M"),
                    issue.record.department.slug(),
                    issue.record.title,
                    issue.record.location_name,
                );
            }
        }
    }
    Ok(())
}

fn print_issue_detail(issue: &PersistedIssue) {
    let record = &issue.record;
    println!("{}", record.title);
    println!("{}", "=".repeat(record.title.chars().count()));
    println!("Id:          {}", issue.id);
    println!("Reported:    {}", issue.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Reporter:    {}", record.user_id);
    println!("Department:  {}", record.department);
    println!(
        "Location:    {} ({:.6}, {:.6})",
        record.location_name, record.latitude, record.longitude
    );
    println!();
    println!("{}", record.description);
    if !record.media_urls.is_empty() {
        println!();
        println!("Attachments:");
        for url in &record.media_urls {
            println!("  {url}");
        }
    }
}

fn handle_departments() {
    for department in Department::ALL {
        println!("{:<24} {}", department.label(), department.slug());
    }
}

fn handle_auth(config: &Config, cmd: AuthCommand) -> anyhow::Result<()> {
    let path = config.session_path();
    let mut session = Session::load(&path)?;
    match cmd {
        AuthCommand::Login { id, email, name } => {
            let mut user = CurrentUser::new(id, email);
            if let Some(name) = name {
                user = user.with_display_name(name);
            }
            println!("Signed in as {}", user.display_label());
            session.sign_in(user);
            session.save(&path)?;
        }
        AuthCommand::Logout => {
            match session.sign_out() {
                Some(user) => println!("Signed out {}", user.display_label()),
                None => println!("Not signed in."),
            }
            session.save(&path)?;
        }
        AuthCommand::Whoami => match session.current_user() {
            Some(user) => println!("{} <{}> ({})", user.display_label(), user.email, user.id),
            None => println!("Not signed in."),
        },
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            let mut shown = Config::load_from(config_path)?;
            if shown.remote.api_key.is_some() {
                shown.remote.api_key = Some("********".to_string());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print_config(&shown);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Backend:              {}", config.backend);
    println!();
    println!("[Storage]");
    println!("  Database path:      {}", config.database_path().display());
    println!("  Media directory:    {}", config.media_dir().display());
    println!("  Media bucket:       {}", config.storage.media_bucket);
    println!("  Public base URL:    {}", config.public_base_url());
    println!("  Max upload bytes:   {}", config.storage.max_upload_bytes);
    println!();
    println!("[Remote]");
    println!(
        "  URL:                {}",
        config.remote.url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  API key:            {}",
        config.remote.api_key.as_deref().unwrap_or("(not set)")
    );
    println!("  Timeout (secs):     {}", config.remote.timeout_secs);
    println!();
    println!("[Session]");
    println!("  Path:               {}", config.session_path().display());
}
