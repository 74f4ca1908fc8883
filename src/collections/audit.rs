//! Append-only system audit log.
//!
//! Every mutating command records who did what. Entries are only ever
//! appended, never rewritten, so line order is write order for the life of
//! the file.

use crate::core::collection::{Collection, Layout, Record};
use crate::core::error::StoreError;
use crate::core::output;
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditEvent {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub details: String,
    pub timestamp: String,
}

impl Record for AuditEvent {
    fn id(&self) -> &str {
        &self.id
    }

    // Pure append-only log; update paths never run.
    fn touch(&mut self, _now: String) {}
}

pub fn log_path(root: &Path) -> PathBuf {
    root.join("system_logs.jsonl")
}

pub fn collection(root: &Path) -> Collection<AuditEvent> {
    Collection::new("system_logs", log_path(root), Layout::Log)
}

pub fn initialize(store: &Store) -> Result<(), StoreError> {
    collection(&store.root).init_if_absent(&[])
}

/// Append one event. ULID ids keep events sortable by creation order.
pub fn record(store: &Store, actor: &str, action: &str, details: &str) -> Result<(), StoreError> {
    let event = AuditEvent {
        id: time::new_event_id(),
        user_id: actor.to_string(),
        action: action.to_string(),
        details: details.to_string(),
        timestamp: time::now_iso(),
    };
    collection(&store.root).append(&event)
}

/// The trailing `limit` events, oldest first.
pub fn recent(store: &Store, limit: usize) -> Result<Vec<AuditEvent>, StoreError> {
    let events = collection(&store.root).read_all()?;
    let skip = events.len().saturating_sub(limit);
    Ok(events.into_iter().skip(skip).collect())
}

#[derive(Parser, Debug)]
#[clap(name = "log", about = "Inspect the append-only system audit log.")]
pub struct AuditCli {
    #[clap(subcommand)]
    command: AuditCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Show the most recent events.
    Show {
        #[clap(long, default_value = "100")]
        limit: usize,
    },
}

pub fn run_audit_cli(store: &Store, cli: AuditCli) -> Result<(), StoreError> {
    match cli.command {
        AuditCommand::Show { limit } => {
            for event in recent(store, limit)? {
                println!(
                    "{}  {:<20} {:<24} {}",
                    event.timestamp.dimmed(),
                    event.user_id,
                    event.action,
                    output::compact_line(&event.details, 80)
                );
            }
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "system_logs",
        "version": "1.0.0",
        "description": "Append-only audit trail of mutating commands",
        "commands": [
            { "name": "show", "parameters": ["limit"] }
        ],
        "storage": ["system_logs.jsonl"]
    })
}
