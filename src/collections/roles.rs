//! Role reference table.
//!
//! Seeded once at store initialization and read-only afterwards; role
//! assignment lives on the user record, permission lookup happens here.

use crate::core::collection::{Collection, Layout, Record};
use crate::core::error::StoreError;
use crate::core::store::Store;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

impl Record for Role {
    fn id(&self) -> &str {
        &self.id
    }

    // Read-only after seeding; nothing to stamp.
    fn touch(&mut self, _now: String) {}
}

pub fn roles_path(root: &Path) -> PathBuf {
    root.join("roles.json")
}

pub fn collection(root: &Path) -> Collection<Role> {
    Collection::new("roles", roles_path(root), Layout::Document)
}

pub fn initialize(store: &Store) -> Result<(), StoreError> {
    let seed = vec![
        Role {
            id: "admin".to_string(),
            name: "System Administrator".to_string(),
            permissions: vec!["all".to_string()],
        },
        Role {
            id: "province_manager".to_string(),
            name: "Province Manager".to_string(),
            permissions: vec![
                "view_all".to_string(),
                "manage_province".to_string(),
                "create_objective".to_string(),
                "assign_task".to_string(),
            ],
        },
        Role {
            id: "staff".to_string(),
            name: "Staff".to_string(),
            permissions: vec![
                "view_own".to_string(),
                "report_progress".to_string(),
                "submit_issue".to_string(),
                "view_knowledge".to_string(),
            ],
        },
    ];
    collection(&store.root).init_if_absent(&seed)
}

pub fn list_roles(store: &Store) -> Result<Vec<Role>, StoreError> {
    collection(&store.root).read_all()
}

pub fn get_role(store: &Store, id: &str) -> Result<Option<Role>, StoreError> {
    collection(&store.root).get(id)
}

/// `all` grants everything; otherwise the permission must be listed.
pub fn role_has_permission(store: &Store, role_id: &str, permission: &str) -> Result<bool, StoreError> {
    let Some(role) = get_role(store, role_id)? else {
        return Ok(false);
    };
    Ok(role.permissions.iter().any(|p| p == "all" || p == permission))
}

#[derive(Parser, Debug)]
#[clap(name = "role", about = "Inspect the seeded role table.")]
pub struct RoleCli {
    #[clap(subcommand)]
    command: RoleCommand,
}

#[derive(Subcommand, Debug)]
pub enum RoleCommand {
    /// List every role and its permissions.
    List,
    /// Show one role.
    Show {
        #[clap(long)]
        id: String,
    },
}

pub fn run_role_cli(store: &Store, cli: RoleCli) -> Result<(), StoreError> {
    match cli.command {
        RoleCommand::List => {
            for role in list_roles(store)? {
                println!(
                    "{:<18} {:<24} {}",
                    role.id.bold(),
                    role.name,
                    role.permissions.join(", ").dimmed()
                );
            }
        }
        RoleCommand::Show { id } => {
            let role = get_role(store, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("role '{}'", id)))?;
            println!("{}", serde_json::to_string_pretty(&role)?);
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "roles",
        "version": "1.0.0",
        "description": "Seeded role reference table",
        "commands": [
            { "name": "list" },
            { "name": "show", "parameters": ["id"] }
        ],
        "storage": ["roles.json"]
    })
}
