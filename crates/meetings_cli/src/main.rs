//! Command-line frontend for the meetings core.
//!
//! # Responsibility
//! - Resolve configuration from flags and `MEETINGS_*` environment variables.
//! - Map subcommands onto meeting use-cases and print JSON payloads.
//!
//! # Invariants
//! - Success prints the payload to stdout and exits 0.
//! - Use-case failures print `{"status": .., ..payload}` and exit 1.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::debug;
use meetings_core::db::{open_db, open_db_in_memory};
use meetings_core::{
    default_log_level, init_logging, MeetingError, MeetingInput, MeetingService,
    MeetingServiceOptions, SqliteIdentityRepository, SqliteMeetingRepository,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "meetings", version, about = "Manage CRM meeting records")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "MEETINGS_DB", default_value = "meetings.sqlite3")]
    db: PathBuf,

    /// Use a throwaway in-memory database instead of `--db`.
    #[arg(long)]
    in_memory: bool,

    /// trace|debug|info|warn|error; defaults by build mode.
    #[arg(long, env = "MEETINGS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when unset.
    #[arg(long, env = "MEETINGS_LOG_DIR")]
    log_dir: Option<String>,

    /// Require referenced users, contacts and leads to exist on create.
    #[arg(long, env = "MEETINGS_VERIFY_REFERENCES")]
    verify_references: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a meeting.
    Create(CreateArgs),
    /// List active meetings.
    List {
        /// `key=value` filter; repeatable.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Show one meeting with expanded relations.
    Get { id: String },
    /// Soft-delete one meeting.
    Delete { id: String },
    /// Soft-delete several meetings, all or nothing.
    DeleteMany {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long)]
    agenda: String,
    #[arg(long)]
    created_by: String,
    /// Contact id; repeatable.
    #[arg(long = "attendee")]
    attendees: Vec<String>,
    /// Lead id; repeatable.
    #[arg(long = "attendee-lead")]
    attendees_lead: Vec<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    related: Option<String>,
    /// Date text or epoch milliseconds.
    #[arg(long)]
    date_time: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::List { .. } => "list",
            Self::Get { .. } => "get",
            Self::Delete { .. } => "delete",
            Self::DeleteMany { .. } => "delete-many",
        }
    }
}

impl From<CreateArgs> for MeetingInput {
    fn from(args: CreateArgs) -> Self {
        Self {
            agenda: Some(args.agenda),
            attendees: id_list(args.attendees),
            attendees_lead: id_list(args.attendees_lead),
            location: args.location,
            related: args.related,
            date_time: args.date_time.map(Value::String),
            notes: args.notes,
            created_by: Some(args.created_by),
        }
    }
}

fn id_list(ids: Vec<String>) -> Option<Value> {
    if ids.is_empty() {
        None
    } else {
        Some(Value::from(ids))
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, cli.log_dir.as_deref())
        .map_err(anyhow::Error::msg)
        .context("failed to initialize logging")?;

    let conn = if cli.in_memory {
        open_db_in_memory()
    } else {
        open_db(&cli.db)
    }
    .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;

    let service = MeetingService::with_options(
        SqliteMeetingRepository::new(&conn),
        SqliteIdentityRepository::new(&conn),
        MeetingServiceOptions {
            verify_references: cli.verify_references,
        },
    );

    debug!(
        "event=cli_dispatch module=cli command={} verify_references={}",
        cli.command.name(),
        cli.verify_references
    );
    let outcome = match cli.command {
        Command::Create(args) => service
            .create(&MeetingInput::from(args))
            .map(|meeting| json!(meeting)),
        Command::List { filters } => service.list(filters).map(|items| json!(items)),
        Command::Get { id } => service.get_by_id(&id).map(|detail| json!(detail)),
        Command::Delete { id } => service.delete_one(&id).map(|meeting| {
            json!({
                "message": "Meeting deleted.",
                "result": meeting,
            })
        }),
        Command::DeleteMany { ids } => service.delete_many(ids.as_slice()).map(|outcome| {
            json!({
                "message": "Meetings deleted successfully",
                "matched": outcome.matched,
            })
        }),
    };

    match outcome {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&error_body(&err))?);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn error_body(err: &MeetingError) -> Value {
    let mut body = err.to_payload();
    if let Value::Object(fields) = &mut body {
        fields.insert("status".to_string(), json!(err.status_code()));
    }
    body
}
