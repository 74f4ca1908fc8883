//! CLI struct definitions for the Tidepool command-line interface.
//!
//! All top-level clap-derived types live here. Dispatch logic lives in
//! `lib.rs`; per-collection command groups live with their collection.

use crate::collections::{audit, issues, knowledge, objectives, roles, tasks, users};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "tidepool",
    version = env!("CARGO_PKG_VERSION"),
    about = "Tidepool is the file-backed record store behind a local-first team collaboration platform: users, objectives, issues, tasks, and knowledge kept in plain JSON you can read, diff, and back up. 🦀"
)]
pub(crate) struct Cli {
    /// Data directory (falls back to $TIDEPOOL_DATA, then ./data).
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Acting user recorded in the audit log (falls back to $TIDEPOOL_ACTOR,
    /// then 'local').
    #[clap(long, global = true)]
    pub actor: Option<String>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the data directory and seed every collection.
    Init,
    /// Manage user accounts.
    User(users::UserCli),
    /// Inspect the seeded role table.
    Role(roles::RoleCli),
    /// Manage objectives and their progress.
    Objective(objectives::ObjectiveCli),
    /// Track issues: submit, assign, discuss, resolve.
    Issue(issues::IssueCli),
    /// Manage work tasks and their progress logs.
    Task(tasks::TaskCli),
    /// Browse and maintain the knowledge base.
    Knowledge(knowledge::KnowledgeCli),
    /// Inspect the append-only system audit log.
    Log(audit::AuditCli),
    /// Print every collection's command schema as JSON.
    Schema,
    /// Print the version.
    Version,
}
