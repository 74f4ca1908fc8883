//! User accounts.
//!
//! A document collection seeded with one bootstrap administrator the first
//! time the store is initialized. Credentials are salted hashes, never
//! plaintext; login verification refuses deactivated accounts.

use crate::collections::{audit, roles};
use crate::core::auth;
use crate::core::collection::{Collection, Layout, Record};
use crate::core::error::StoreError;
use crate::core::output;
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand};
use colored::Colorize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
pub const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@tidepool.local";
/// Default bootstrap credential; operators are expected to rotate it with
/// `user set-password` right after `init`.
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Accounts stored before this field existed were implicitly active;
    /// the default is applied here, once, at load time.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Record for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: String) {
        self.updated_at = Some(now);
    }
}

/// Fields accepted by [`update_profile`]. `None` leaves a field unchanged.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub role: Option<String>,
    pub province: Option<String>,
    pub department: Option<String>,
}

pub fn users_path(root: &Path) -> PathBuf {
    root.join("users.json")
}

pub fn collection(root: &Path) -> Collection<User> {
    Collection::new("users", users_path(root), Layout::Document)
}

/// Seed the bootstrap administrator if the collection file does not exist.
pub fn initialize(store: &Store) -> Result<(), StoreError> {
    let now = time::now_iso();
    let seed = vec![User {
        id: time::new_record_id(),
        username: BOOTSTRAP_ADMIN_USERNAME.to_string(),
        email: BOOTSTRAP_ADMIN_EMAIL.to_string(),
        password_hash: auth::hash_password(BOOTSTRAP_ADMIN_PASSWORD),
        role: "admin".to_string(),
        province: None,
        department: Some("Platform Operations".to_string()),
        created_at: now,
        updated_at: None,
        is_active: true,
    }];
    collection(&store.root).init_if_absent(&seed)
}

fn validate_username(username: &str) -> Result<(), StoreError> {
    let re = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{2,31}$").unwrap();
    if !re.is_match(username) {
        return Err(StoreError::ValidationError(format!(
            "Invalid username '{}'. Use 3-32 characters: letters, digits, '_', '.', '-'",
            username
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), StoreError> {
    let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    if !re.is_match(email) {
        return Err(StoreError::ValidationError(format!(
            "Invalid email address '{}'",
            email
        )));
    }
    Ok(())
}

pub fn create_user(
    store: &Store,
    actor: &str,
    username: &str,
    email: &str,
    password: &str,
    role: &str,
    province: Option<String>,
    department: Option<String>,
) -> Result<User, StoreError> {
    validate_username(username)?;
    validate_email(email)?;
    if roles::get_role(store, role)?.is_none() {
        return Err(StoreError::ValidationError(format!("Unknown role '{}'", role)));
    }
    if find_by_username(store, username)?.is_some() {
        return Err(StoreError::ValidationError(format!(
            "Username '{}' already exists",
            username
        )));
    }

    let user = User {
        id: time::new_record_id(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: auth::hash_password(password),
        role: role.to_string(),
        province,
        department,
        created_at: time::now_iso(),
        updated_at: None,
        is_active: true,
    };
    collection(&store.root).insert(user.clone())?;
    audit::record(
        store,
        actor,
        "create_user",
        &format!("Created user '{}' with role '{}'", username, role),
    )?;
    Ok(user)
}

pub fn list_users(store: &Store) -> Result<Vec<User>, StoreError> {
    collection(&store.root).read_all()
}

pub fn get_user(store: &Store, id: &str) -> Result<Option<User>, StoreError> {
    collection(&store.root).get(id)
}

pub fn find_by_username(store: &Store, username: &str) -> Result<Option<User>, StoreError> {
    Ok(collection(&store.root)
        .read_all()?
        .into_iter()
        .find(|u| u.username == username))
}

pub fn update_profile(
    store: &Store,
    actor: &str,
    id: &str,
    update: UserUpdate,
) -> Result<bool, StoreError> {
    if let Some(email) = &update.email {
        validate_email(email)?;
    }
    if let Some(role) = &update.role {
        if roles::get_role(store, role)?.is_none() {
            return Err(StoreError::ValidationError(format!("Unknown role '{}'", role)));
        }
    }
    let updated = collection(&store.root).update_by_id(id, |user| {
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(province) = update.province {
            user.province = Some(province);
        }
        if let Some(department) = update.department {
            user.department = Some(department);
        }
    })?;
    if updated {
        audit::record(store, actor, "update_user", &format!("Updated user {}", id))?;
    }
    Ok(updated)
}

pub fn set_password(store: &Store, actor: &str, id: &str, password: &str) -> Result<bool, StoreError> {
    let hash = auth::hash_password(password);
    let updated = collection(&store.root).update_by_id(id, |user| {
        user.password_hash = hash;
    })?;
    if updated {
        audit::record(store, actor, "reset_password", &format!("Reset password for user {}", id))?;
    }
    Ok(updated)
}

pub fn set_active(store: &Store, actor: &str, id: &str, active: bool) -> Result<bool, StoreError> {
    let updated = collection(&store.root).update_by_id(id, |user| {
        user.is_active = active;
    })?;
    if updated {
        let action = if active { "activate_user" } else { "deactivate_user" };
        audit::record(store, actor, action, &format!("Set user {} active={}", id, active))?;
    }
    Ok(updated)
}

pub fn delete_user(store: &Store, actor: &str, id: &str) -> Result<bool, StoreError> {
    let deleted = collection(&store.root).delete_by_id(id)?;
    if deleted {
        audit::record(store, actor, "delete_user", &format!("Deleted user {}", id))?;
    }
    Ok(deleted)
}

/// Verify a credential pair. Returns the user on success; unknown username,
/// wrong password, and deactivated accounts all report `None` so callers
/// cannot distinguish which check failed.
pub fn verify_login(store: &Store, username: &str, password: &str) -> Result<Option<User>, StoreError> {
    let Some(user) = find_by_username(store, username)? else {
        return Ok(None);
    };
    if !user.is_active || !auth::verify_password(&user.password_hash, password) {
        return Ok(None);
    }
    audit::record(store, &user.id, "login", &format!("User '{}' logged in", username))?;
    Ok(Some(user))
}

#[derive(Parser, Debug)]
#[clap(name = "user", about = "Manage user accounts.")]
pub struct UserCli {
    /// Output format: 'text' or 'json'.
    #[clap(long, global = true, default_value = "text")]
    format: String,
    #[clap(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Add a new user.
    Add {
        #[clap(value_name = "USERNAME")]
        username: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
        #[clap(long, default_value = "staff")]
        role: String,
        #[clap(long)]
        province: Option<String>,
        #[clap(long)]
        department: Option<String>,
    },
    /// List users.
    List,
    /// Show one user by id.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Edit profile fields.
    Edit {
        #[clap(long)]
        id: String,
        #[clap(long)]
        email: Option<String>,
        #[clap(long)]
        role: Option<String>,
        #[clap(long)]
        province: Option<String>,
        #[clap(long)]
        department: Option<String>,
    },
    /// Set a new password.
    SetPassword {
        #[clap(long)]
        id: String,
        #[clap(long)]
        password: String,
    },
    /// Deactivate an account (refuses future logins).
    Deactivate {
        #[clap(long)]
        id: String,
    },
    /// Reactivate an account.
    Activate {
        #[clap(long)]
        id: String,
    },
    /// Delete an account.
    Delete {
        #[clap(long)]
        id: String,
    },
    /// Check a credential pair.
    Login {
        #[clap(long)]
        username: String,
        #[clap(long)]
        password: String,
    },
}

pub fn run_user_cli(store: &Store, actor: &str, cli: UserCli) -> Result<(), StoreError> {
    let json = cli.format == "json";
    match cli.command {
        UserCommand::Add {
            username,
            email,
            password,
            role,
            province,
            department,
        } => {
            let user = create_user(store, actor, &username, &email, &password, &role, province, department)?;
            if json {
                println!(
                    "{}",
                    time::command_envelope("user.add", "ok", serde_json::json!({"id": user.id}))
                );
            } else {
                println!(
                    "{} created user {} ({})",
                    "✓".green(),
                    user.username.bold(),
                    output::short_id(&user.id)
                );
            }
        }
        UserCommand::List => {
            let users = list_users(store)?;
            if json {
                println!(
                    "{}",
                    time::command_envelope(
                        "user.list",
                        "ok",
                        serde_json::json!({"items": serde_json::to_value(&users)?})
                    )
                );
            } else {
                for user in users {
                    let state = if user.is_active {
                        "active".green()
                    } else {
                        "inactive".red()
                    };
                    println!(
                        "{}  {:<20} {:<18} {:<10} {}",
                        output::short_id(&user.id),
                        user.username,
                        user.role,
                        state,
                        user.email.dimmed()
                    );
                }
            }
        }
        UserCommand::Get { id } => {
            let user = get_user(store, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        UserCommand::Edit {
            id,
            email,
            role,
            province,
            department,
        } => {
            let update = UserUpdate {
                email,
                role,
                province,
                department,
            };
            report_hit(json, "user.edit", update_profile(store, actor, &id, update)?, &id)?;
        }
        UserCommand::SetPassword { id, password } => {
            report_hit(json, "user.set-password", set_password(store, actor, &id, &password)?, &id)?;
        }
        UserCommand::Deactivate { id } => {
            report_hit(json, "user.deactivate", set_active(store, actor, &id, false)?, &id)?;
        }
        UserCommand::Activate { id } => {
            report_hit(json, "user.activate", set_active(store, actor, &id, true)?, &id)?;
        }
        UserCommand::Delete { id } => {
            report_hit(json, "user.delete", delete_user(store, actor, &id)?, &id)?;
        }
        UserCommand::Login { username, password } => {
            match verify_login(store, &username, &password)? {
                Some(user) => {
                    if json {
                        println!(
                            "{}",
                            time::command_envelope(
                                "user.login",
                                "ok",
                                serde_json::json!({"id": user.id, "role": user.role})
                            )
                        );
                    } else {
                        println!("{} credentials accepted for {}", "✓".green(), username.bold());
                    }
                }
                None => {
                    if json {
                        println!(
                            "{}",
                            time::command_envelope("user.login", "denied", serde_json::json!({}))
                        );
                    } else {
                        println!("{} credentials rejected", "✗".red());
                    }
                }
            }
        }
    }
    Ok(())
}

fn report_hit(json: bool, cmd: &str, hit: bool, id: &str) -> Result<(), StoreError> {
    if !hit {
        return Err(StoreError::NotFound(format!("user {}", id)));
    }
    if json {
        println!("{}", time::command_envelope(cmd, "ok", serde_json::json!({"id": id})));
    } else {
        println!("{} {}", "✓".green(), cmd);
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "users",
        "version": "1.0.0",
        "description": "User accounts with hashed credentials",
        "commands": [
            { "name": "add", "parameters": ["username", "email", "password", "role", "province", "department"] },
            { "name": "list" },
            { "name": "get", "parameters": ["id"] },
            { "name": "edit", "parameters": ["id", "email", "role", "province", "department"] },
            { "name": "set-password", "parameters": ["id", "password"] },
            { "name": "deactivate", "parameters": ["id"] },
            { "name": "activate", "parameters": ["id"] },
            { "name": "delete", "parameters": ["id"] },
            { "name": "login", "parameters": ["username", "password"] }
        ],
        "storage": ["users.json"]
    })
}
