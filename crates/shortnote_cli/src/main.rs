//! `shortnote` command-line entry point.
//!
//! # Responsibility
//! - Run gateway operations against the configured local store.
//! - Start the HTTP server (`serve`).
//!
//! # Invariants
//! - Configuration is resolved once from `SHORTNOTE_*` and passed down.
//! - Exit status is non-zero on any failed operation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use shortnote_core::db::open_db_with_config;
use shortnote_core::{
    init_logging, init_stderr_logging, CoreConfig, Note, NoteService, SqliteNoteRepository,
};
use shortnote_server::{NoteServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "shortnote", version, about = "Publish and edit short notes by 6-character id")]
struct Cli {
    /// SQLite database file (overrides SHORTNOTE_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON HTTP API.
    Serve {
        /// Listen address (overrides SHORTNOTE_BIND_ADDR).
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    #[command(flatten)]
    Local(LocalCommand),
}

/// Commands that run directly against the local store.
#[derive(Debug, Subcommand)]
enum LocalCommand {
    /// Publish a note under a freshly allocated id.
    Publish { content: String },
    /// Show a note.
    Show { id: String },
    /// Replace a note's content.
    Edit { id: String, content: String },
    /// Report whether an id is taken.
    Check { id: String },
}

impl LocalCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Publish { .. } => "publish",
            Self::Show { .. } => "show",
            Self::Edit { .. } => "edit",
            Self::Check { .. } => "check",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut server_config = ServerConfig::from_env().context("failed to resolve configuration")?;
    if let Some(db) = cli.db.clone() {
        server_config.core.db_path = db;
    }
    init_cli_logging(&server_config.core)?;

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                server_config.bind_addr = bind;
            }
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(NoteServer::new(server_config).serve())?;
            Ok(())
        }
        Command::Local(command) => {
            let operation = command.name();
            let started_at = Instant::now();
            let result = run_local(&server_config.core, command, cli.json);
            match &result {
                Ok(()) => info!(
                    "event=cli_command module=cli status=ok operation={} duration_ms={}",
                    operation,
                    started_at.elapsed().as_millis()
                ),
                Err(err) => warn!(
                    "event=cli_command module=cli status=error operation={} duration_ms={} error={:#}",
                    operation,
                    started_at.elapsed().as_millis(),
                    err
                ),
            }
            result
        }
    }
}

fn init_cli_logging(config: &CoreConfig) -> Result<()> {
    let result = match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None => init_stderr_logging(&config.log_level),
    };
    result.map_err(|message| anyhow::anyhow!("failed to initialize logging: {message}"))
}

fn run_local(config: &CoreConfig, command: LocalCommand, json: bool) -> Result<()> {
    let conn = open_db_with_config(config)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let service = NoteService::with_config(SqliteNoteRepository::try_new(&conn)?, config);

    match command {
        LocalCommand::Publish { content } => print_note(&service.publish(&content)?, json),
        LocalCommand::Show { id } => print_note(&service.get(&id)?, json),
        LocalCommand::Edit { id, content } => print_note(&service.update(&id, &content)?, json),
        LocalCommand::Check { id } => {
            let exists = service.exists(&id)?;
            if json {
                println!("{}", serde_json::json!({ "exists": exists }));
            } else {
                println!("{id} {}", if exists { "taken" } else { "free" });
            }
            Ok(())
        }
    }
}

fn print_note(note: &Note, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(note)?);
    } else {
        println!("{}", render_note(note));
    }
    Ok(())
}

fn render_note(note: &Note) -> String {
    let marker = if note.is_edited() { " (edited)" } else { "" };
    let edited = note
        .last_edited_at
        .map_or_else(|| "never".to_string(), |edited| edited.to_string());
    format!(
        "id: {}{marker}\ncreated_at: {}\nlast_edited_at: {edited}\n\n{}",
        note.id, note.created_at, note.content
    )
}
