//! Tidepool: a file-backed record store for a local-first collaboration
//! platform.
//!
//! All state lives in one data directory as plain JSON you can read, diff,
//! and back up. Small reference tables (users, roles, objectives,
//! knowledge) are pretty-printed JSON arrays rewritten in full on every
//! mutation; high-churn collections (issues, tasks, the audit log) are
//! JSON-lines files where creation is a single appended line and updates
//! rewrite the file in original order.
//!
//! # Storage model
//!
//! - **Document collections**: `users.json`, `roles.json`,
//!   `objectives.json`, `knowledge.json`
//! - **Append-log collections**: `issues.jsonl`, `tasks.jsonl`,
//!   `system_logs.jsonl` (pure append-only, never rewritten)
//!
//! Every record carries an opaque unique `id` and ISO-8601 timestamps.
//! Full-file writes go through a temp-file-and-rename replace, so an
//! interrupted write never leaves a truncated file visible; torn trailing
//! lines from a crashed append are skipped at read time. Operations with a
//! read-then-write phase hold one in-process advisory lock per backing
//! file. There is no cross-process locking and no retry: the store is the
//! assumed sole writer, and every failure either degrades to an empty read
//! or surfaces once as a typed error.
//!
//! # Examples
//!
//! ```bash
//! # Seed a data directory (bootstrap admin + default roles)
//! tidepool init
//!
//! # File an issue and follow up on it
//! tidepool issue add "Sync job drops records" --category bug --priority high
//! tidepool issue comment --id <ID> --comment "Reproduced on the staging mirror"
//! tidepool issue status --id <ID> --status resolved
//!
//! # See who did what
//! tidepool log show --limit 20
//! ```
//!
//! # Crate structure
//!
//! - [`core`]: storage strategies, typed collections, locking, errors
//! - [`collections`]: one module per domain collection, each with its CLI

pub mod collections;
pub mod core;

mod cli;

use crate::cli::{Cli, Command};
use crate::collections::{audit, issues, knowledge, objectives, roles, tasks, users};
use crate::core::error::StoreError;
use crate::core::store::Store;

use clap::Parser;
use colored::Colorize;
use std::env;
use std::fs;

/// Create the data directory and seed every collection. Idempotent: files
/// that already exist are left untouched.
pub fn init_store(store: &Store) -> Result<(), StoreError> {
    fs::create_dir_all(&store.root)?;
    roles::initialize(store)?;
    users::initialize(store)?;
    objectives::initialize(store)?;
    knowledge::initialize(store)?;
    issues::initialize(store)?;
    tasks::initialize(store)?;
    audit::initialize(store)?;
    Ok(())
}

/// Command schemas for every collection, for discovery tooling.
pub fn collection_schemas() -> serde_json::Value {
    serde_json::json!([
        users::schema(),
        roles::schema(),
        objectives::schema(),
        issues::schema(),
        tasks::schema(),
        knowledge::schema(),
        audit::schema(),
    ])
}

pub fn run() -> Result<(), StoreError> {
    let cli = Cli::parse();
    let store = Store::resolve(cli.data_dir);
    let actor = cli
        .actor
        .or_else(|| env::var("TIDEPOOL_ACTOR").ok())
        .unwrap_or_else(|| "local".to_string());

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
        }
        Command::Init => {
            init_store(&store)?;
            println!(
                "{} initialized data directory at {}",
                "✓".green(),
                store.root.display().to_string().bold()
            );
            println!(
                "  {} bootstrap admin '{}' seeded; rotate its password with {}",
                "▸".cyan(),
                users::BOOTSTRAP_ADMIN_USERNAME,
                "tidepool user set-password".bold()
            );
        }
        Command::User(user_cli) => users::run_user_cli(&store, &actor, user_cli)?,
        Command::Role(role_cli) => roles::run_role_cli(&store, role_cli)?,
        Command::Objective(objective_cli) => {
            objectives::run_objective_cli(&store, &actor, objective_cli)?
        }
        Command::Issue(issue_cli) => issues::run_issue_cli(&store, &actor, issue_cli)?,
        Command::Task(task_cli) => tasks::run_task_cli(&store, &actor, task_cli)?,
        Command::Knowledge(knowledge_cli) => {
            knowledge::run_knowledge_cli(&store, &actor, knowledge_cli)?
        }
        Command::Log(audit_cli) => audit::run_audit_cli(&store, audit_cli)?,
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&collection_schemas())?);
        }
    }
    Ok(())
}
