//! Objectives: hierarchical goals with a progress percentage and an
//! approval step.
//!
//! A document collection. Children reference their parent through
//! `parent_id`; the parent mirrors the link in `sub_objectives` so a
//! detail view never has to scan the whole collection.

use crate::collections::audit;
use crate::core::collection::{Collection, Layout, Record};
use crate::core::error::StoreError;
use crate::core::output;
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STATUSES: &[&str] = &["pending", "in_progress", "completed", "overdue"];

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Objective {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub target_province: Option<String>,
    #[serde(default)]
    pub target_user: Option<String>,
    pub deadline: String,
    pub creator_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub status: String,
    pub progress: u8,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub sub_objectives: Vec<String>,
}

impl Record for Objective {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: String) {
        self.updated_at = now;
    }
}

/// Input for [`create_objective`].
#[derive(Debug, Clone)]
pub struct NewObjective {
    pub title: String,
    pub description: String,
    pub target_province: Option<String>,
    pub target_user: Option<String>,
    pub deadline: String,
    pub creator_id: String,
    pub parent_id: Option<String>,
}

/// List filters; `None` matches everything.
#[derive(Debug, Default, Clone)]
pub struct ObjectiveFilters {
    pub status: Option<String>,
    pub province: Option<String>,
    pub creator: Option<String>,
}

pub fn objectives_path(root: &Path) -> PathBuf {
    root.join("objectives.json")
}

pub fn collection(root: &Path) -> Collection<Objective> {
    Collection::new("objectives", objectives_path(root), Layout::Document)
}

pub fn initialize(store: &Store) -> Result<(), StoreError> {
    collection(&store.root).init_if_absent(&[])
}

pub fn create_objective(store: &Store, actor: &str, new: NewObjective) -> Result<Objective, StoreError> {
    if new.title.trim().is_empty() {
        return Err(StoreError::ValidationError("Objective title cannot be empty".to_string()));
    }
    let coll = collection(&store.root);
    if let Some(parent_id) = &new.parent_id {
        if coll.get(parent_id)?.is_none() {
            return Err(StoreError::ValidationError(format!(
                "Parent objective {} does not exist",
                parent_id
            )));
        }
    }

    let now = time::now_iso();
    let objective = Objective {
        id: time::new_record_id(),
        title: new.title,
        description: new.description,
        target_province: new.target_province,
        target_user: new.target_user,
        deadline: new.deadline,
        creator_id: new.creator_id,
        parent_id: new.parent_id.clone(),
        status: "pending".to_string(),
        progress: 0,
        created_at: now.clone(),
        updated_at: now,
        sub_objectives: Vec::new(),
    };
    coll.insert(objective.clone())?;
    if let Some(parent_id) = &new.parent_id {
        let child_id = objective.id.clone();
        coll.update_by_id(parent_id, |parent| {
            parent.sub_objectives.push(child_id);
        })?;
    }
    audit::record(
        store,
        actor,
        "create_objective",
        &format!("Created objective '{}'", objective.title),
    )?;
    Ok(objective)
}

pub fn get_objective(store: &Store, id: &str) -> Result<Option<Objective>, StoreError> {
    collection(&store.root).get(id)
}

pub fn list_objectives(store: &Store, filters: &ObjectiveFilters) -> Result<Vec<Objective>, StoreError> {
    let mut objectives = collection(&store.root).read_all()?;
    objectives.retain(|o| {
        filters.status.as_ref().is_none_or(|s| &o.status == s)
            && filters
                .province
                .as_ref()
                .is_none_or(|p| o.target_province.as_deref() == Some(p.as_str()))
            && filters.creator.as_ref().is_none_or(|c| &o.creator_id == c)
    });
    Ok(objectives)
}

/// Report progress. The percentage is clamped to 100; unless an explicit
/// status is given, 100 percent reads as `completed` and anything else as
/// `in_progress`.
pub fn update_progress(
    store: &Store,
    actor: &str,
    id: &str,
    progress: u8,
    status: Option<String>,
) -> Result<bool, StoreError> {
    let progress = progress.min(100);
    let status = match status {
        Some(s) => {
            if !STATUSES.contains(&s.as_str()) {
                return Err(StoreError::ValidationError(format!(
                    "Invalid status '{}'. Expected one of: {}",
                    s,
                    STATUSES.join(", ")
                )));
            }
            s
        }
        None if progress == 100 => "completed".to_string(),
        None => "in_progress".to_string(),
    };
    let updated = collection(&store.root).update_by_id(id, |objective| {
        objective.progress = progress;
        objective.status = status;
    })?;
    if updated {
        audit::record(
            store,
            actor,
            "update_objective_progress",
            &format!("Objective {} progress -> {}%", id, progress),
        )?;
    }
    Ok(updated)
}

/// Review a finished objective: approval completes it, rejection sends it
/// back to `in_progress`.
pub fn approve(
    store: &Store,
    actor: &str,
    id: &str,
    approved: bool,
    comment: &str,
) -> Result<bool, StoreError> {
    let status = if approved { "completed" } else { "in_progress" };
    let updated = collection(&store.root).update_by_id(id, |objective| {
        objective.status = status.to_string();
    })?;
    if updated {
        let verdict = if approved { "approved" } else { "rejected" };
        let details = if comment.is_empty() {
            format!("Objective {} {}", id, verdict)
        } else {
            format!("Objective {} {}: {}", id, verdict, comment)
        };
        audit::record(store, actor, "review_objective", &details)?;
    }
    Ok(updated)
}

#[derive(Parser, Debug)]
#[clap(name = "objective", about = "Manage objectives and their progress.")]
pub struct ObjectiveCli {
    #[clap(subcommand)]
    command: ObjectiveCommand,
}

#[derive(Subcommand, Debug)]
pub enum ObjectiveCommand {
    /// Create a new objective.
    Add {
        #[clap(value_name = "TITLE")]
        title: String,
        #[clap(long, default_value = "")]
        description: String,
        #[clap(long)]
        province: Option<String>,
        #[clap(long)]
        target_user: Option<String>,
        #[clap(long)]
        deadline: String,
        #[clap(long)]
        parent: Option<String>,
    },
    /// List objectives.
    List {
        #[clap(long)]
        status: Option<String>,
        #[clap(long)]
        province: Option<String>,
        #[clap(long)]
        creator: Option<String>,
    },
    /// Show one objective.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Report progress (0-100).
    Progress {
        #[clap(long)]
        id: String,
        #[clap(long)]
        percent: u8,
        #[clap(long)]
        status: Option<String>,
    },
    /// Approve or reject a finished objective.
    Review {
        #[clap(long)]
        id: String,
        #[clap(long)]
        approve: bool,
        #[clap(long, default_value = "")]
        comment: String,
    },
}

pub fn run_objective_cli(store: &Store, actor: &str, cli: ObjectiveCli) -> Result<(), StoreError> {
    match cli.command {
        ObjectiveCommand::Add {
            title,
            description,
            province,
            target_user,
            deadline,
            parent,
        } => {
            let objective = create_objective(
                store,
                actor,
                NewObjective {
                    title,
                    description,
                    target_province: province,
                    target_user,
                    deadline,
                    creator_id: actor.to_string(),
                    parent_id: parent,
                },
            )?;
            println!(
                "{} created objective {} ({})",
                "✓".green(),
                objective.title.bold(),
                output::short_id(&objective.id)
            );
        }
        ObjectiveCommand::List {
            status,
            province,
            creator,
        } => {
            let filters = ObjectiveFilters {
                status,
                province,
                creator,
            };
            for objective in list_objectives(store, &filters)? {
                println!(
                    "{}  {:<12} {:>4}%  {}",
                    output::short_id(&objective.id),
                    objective.status,
                    objective.progress,
                    output::compact_line(&objective.title, 60)
                );
            }
        }
        ObjectiveCommand::Get { id } => {
            let objective = get_objective(store, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("objective {}", id)))?;
            println!("{}", serde_json::to_string_pretty(&objective)?);
        }
        ObjectiveCommand::Progress { id, percent, status } => {
            if !update_progress(store, actor, &id, percent, status)? {
                return Err(StoreError::NotFound(format!("objective {}", id)));
            }
            println!("{} progress recorded", "✓".green());
        }
        ObjectiveCommand::Review { id, approve: ok, comment } => {
            if !approve(store, actor, &id, ok, &comment)? {
                return Err(StoreError::NotFound(format!("objective {}", id)));
            }
            println!("{} review recorded", "✓".green());
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "objectives",
        "version": "1.0.0",
        "description": "Hierarchical objectives with progress and review",
        "commands": [
            { "name": "add", "parameters": ["title", "description", "province", "target_user", "deadline", "parent"] },
            { "name": "list", "parameters": ["status", "province", "creator"] },
            { "name": "get", "parameters": ["id"] },
            { "name": "progress", "parameters": ["id", "percent", "status"] },
            { "name": "review", "parameters": ["id", "approve", "comment"] }
        ],
        "storage": ["objectives.json"]
    })
}
