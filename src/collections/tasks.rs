//! Work tasks on the append log.
//!
//! Same storage shape as issues: creation appends one line, everything else
//! rewrites. Tasks carry an embedded work log and two lifecycle timestamps
//! (`completed_at`, `verified_at`) stamped by the matching status change.

use crate::collections::audit;
use crate::core::collection::{Collection, Layout, Record};
use crate::core::error::StoreError;
use crate::core::output;
use crate::core::store::Store;
use crate::core::time;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TASK_TYPES: &[&str] = &["support", "maintenance", "deployment", "other"];
pub const PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];
pub const STATUSES: &[&str] = &["pending", "assigned", "in_progress", "completed", "verified"];

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub priority: String,
    pub status: String,
    pub creator_id: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub logs: Vec<TaskLogEntry>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub verified_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskLogEntry {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: String) {
        self.updated_at = now;
    }
}

/// Input for [`create_task`].
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub priority: String,
    pub creator_id: String,
    pub assigned_to: Option<String>,
    pub province: Option<String>,
}

/// List filters; `None` matches everything.
#[derive(Debug, Default, Clone)]
pub struct TaskFilters {
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub province: Option<String>,
}

pub fn tasks_path(root: &Path) -> PathBuf {
    root.join("tasks.jsonl")
}

pub fn collection(root: &Path) -> Collection<Task> {
    Collection::new("tasks", tasks_path(root), Layout::Log)
}

pub fn initialize(store: &Store) -> Result<(), StoreError> {
    collection(&store.root).init_if_absent(&[])
}

fn ensure_one_of(value: &str, allowed: &[&str], what: &str) -> Result<(), StoreError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(StoreError::ValidationError(format!(
        "Invalid {} '{}'. Expected one of: {}",
        what,
        value,
        allowed.join(", ")
    )))
}

pub fn create_task(store: &Store, actor: &str, new: NewTask) -> Result<Task, StoreError> {
    if new.title.trim().is_empty() {
        return Err(StoreError::ValidationError("Task title cannot be empty".to_string()));
    }
    ensure_one_of(&new.task_type, TASK_TYPES, "task type")?;
    ensure_one_of(&new.priority, PRIORITIES, "priority")?;

    let now = time::now_iso();
    let task = Task {
        id: time::new_record_id(),
        title: new.title,
        description: new.description,
        task_type: new.task_type,
        priority: new.priority,
        status: "pending".to_string(),
        creator_id: new.creator_id,
        assigned_to: new.assigned_to,
        province: new.province,
        created_at: now.clone(),
        updated_at: now,
        logs: Vec::new(),
        completed_at: None,
        verified_at: None,
    };
    collection(&store.root).insert(task.clone())?;
    audit::record(store, actor, "create_task", &format!("Created task '{}'", task.title))?;
    Ok(task)
}

pub fn get_task(store: &Store, id: &str) -> Result<Option<Task>, StoreError> {
    collection(&store.root).get(id)
}

pub fn list_tasks(store: &Store, filters: &TaskFilters) -> Result<Vec<Task>, StoreError> {
    let mut tasks = collection(&store.root).read_all()?;
    tasks.retain(|task| matches_filters(task, filters));
    Ok(tasks)
}

fn matches_filters(task: &Task, filters: &TaskFilters) -> bool {
    if let Some(status) = &filters.status {
        if &task.status != status {
            return false;
        }
    }
    if let Some(assignee) = &filters.assignee {
        if task.assigned_to.as_deref() != Some(assignee.as_str()) {
            return false;
        }
    }
    if let Some(province) = &filters.province {
        if task.province.as_deref() != Some(province.as_str()) {
            return false;
        }
    }
    true
}

/// Status change. `completed` stamps `completed_at`; `verified` stamps
/// `verified_at`; both are left untouched otherwise.
pub fn update_status(store: &Store, actor: &str, id: &str, status: &str) -> Result<bool, StoreError> {
    ensure_one_of(status, STATUSES, "status")?;
    let now = time::now_iso();
    let updated = collection(&store.root).update_by_id(id, |task| {
        task.status = status.to_string();
        match status {
            "completed" => task.completed_at = Some(now),
            "verified" => task.verified_at = Some(now),
            _ => {}
        }
    })?;
    if updated {
        audit::record(
            store,
            actor,
            "update_task_status",
            &format!("Task {} moved to '{}'", id, status),
        )?;
    }
    Ok(updated)
}

/// Reassigning also moves the task to `assigned`.
pub fn reassign(store: &Store, actor: &str, id: &str, assignee: &str) -> Result<bool, StoreError> {
    let updated = collection(&store.root).update_by_id(id, |task| {
        task.assigned_to = Some(assignee.to_string());
        task.status = "assigned".to_string();
    })?;
    if updated {
        audit::record(
            store,
            actor,
            "reassign_task",
            &format!("Task {} reassigned to {}", id, assignee),
        )?;
    }
    Ok(updated)
}

pub fn add_log(store: &Store, actor: &str, id: &str, content: &str) -> Result<bool, StoreError> {
    if content.trim().is_empty() {
        return Err(StoreError::ValidationError("Log entry cannot be empty".to_string()));
    }
    let entry = TaskLogEntry {
        id: time::new_record_id(),
        user_id: actor.to_string(),
        content: content.to_string(),
        created_at: time::now_iso(),
    };
    let appended = collection(&store.root).append_nested(id, |task| {
        task.logs.push(entry);
    })?;
    if appended {
        audit::record(store, actor, "log_task_progress", &format!("Logged progress on task {}", id))?;
    }
    Ok(appended)
}

fn validate_task_type(s: &str) -> Result<String, String> {
    ensure_one_of(s, TASK_TYPES, "task type")
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

fn validate_priority(s: &str) -> Result<String, String> {
    ensure_one_of(s, PRIORITIES, "priority")
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

fn validate_status(s: &str) -> Result<String, String> {
    ensure_one_of(s, STATUSES, "status")
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[clap(name = "task", about = "Manage work tasks and their progress logs.")]
pub struct TaskCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a new task.
    Add {
        #[clap(value_name = "TITLE")]
        title: String,
        #[clap(long, default_value = "")]
        description: String,
        #[clap(long = "type", default_value = "support", value_parser = validate_task_type)]
        task_type: String,
        #[clap(long, default_value = "medium", value_parser = validate_priority)]
        priority: String,
        #[clap(long)]
        assign: Option<String>,
        #[clap(long)]
        province: Option<String>,
    },
    /// List tasks.
    List {
        #[clap(long)]
        status: Option<String>,
        #[clap(long)]
        assignee: Option<String>,
        #[clap(long)]
        province: Option<String>,
    },
    /// Show one task with its work log.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Append a work-log entry.
    Log {
        #[clap(long)]
        id: String,
        #[clap(long)]
        content: String,
    },
    /// Change status.
    Status {
        #[clap(long)]
        id: String,
        #[clap(long, value_parser = validate_status)]
        status: String,
    },
    /// Reassign to another user (moves the task to 'assigned').
    Reassign {
        #[clap(long)]
        id: String,
        #[clap(long)]
        to: String,
    },
}

pub fn run_task_cli(store: &Store, actor: &str, cli: TaskCli) -> Result<(), StoreError> {
    let json = cli.format == OutputFormat::Json;
    match cli.command {
        TaskCommand::Add {
            title,
            description,
            task_type,
            priority,
            assign,
            province,
        } => {
            let task = create_task(
                store,
                actor,
                NewTask {
                    title,
                    description,
                    task_type,
                    priority,
                    creator_id: actor.to_string(),
                    assigned_to: assign,
                    province,
                },
            )?;
            if json {
                println!(
                    "{}",
                    time::command_envelope("task.add", "ok", serde_json::json!({"id": task.id}))
                );
            } else {
                println!(
                    "{} created task {} ({})",
                    "✓".green(),
                    task.title.bold(),
                    output::short_id(&task.id)
                );
            }
        }
        TaskCommand::List {
            status,
            assignee,
            province,
        } => {
            let filters = TaskFilters {
                status,
                assignee,
                province,
            };
            let tasks = list_tasks(store, &filters)?;
            if json {
                println!(
                    "{}",
                    time::command_envelope(
                        "task.list",
                        "ok",
                        serde_json::json!({"items": serde_json::to_value(&tasks)?})
                    )
                );
            } else {
                for task in tasks {
                    println!(
                        "{}  {:<12} {:<12} {:<8} {}",
                        output::short_id(&task.id),
                        render_status(&task.status),
                        task.task_type,
                        task.priority,
                        output::compact_line(&task.title, 60)
                    );
                }
            }
        }
        TaskCommand::Get { id } => {
            let task = get_task(store, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))?;
            if json {
                println!(
                    "{}",
                    time::command_envelope(
                        "task.get",
                        "ok",
                        serde_json::json!({"item": serde_json::to_value(&task)?})
                    )
                );
            } else {
                println!("{}", serde_json::to_string_pretty(&task)?);
            }
        }
        TaskCommand::Log { id, content } => {
            report_hit(json, "task.log", add_log(store, actor, &id, &content)?, &id)?;
        }
        TaskCommand::Status { id, status } => {
            report_hit(json, "task.status", update_status(store, actor, &id, &status)?, &id)?;
        }
        TaskCommand::Reassign { id, to } => {
            report_hit(json, "task.reassign", reassign(store, actor, &id, &to)?, &id)?;
        }
    }
    Ok(())
}

fn render_status(status: &str) -> colored::ColoredString {
    match status {
        "pending" => status.yellow(),
        "assigned" | "in_progress" => status.cyan(),
        "completed" => status.green(),
        "verified" => status.bright_green(),
        _ => status.normal(),
    }
}

fn report_hit(json: bool, cmd: &str, hit: bool, id: &str) -> Result<(), StoreError> {
    if !hit {
        return Err(StoreError::NotFound(format!("task {}", id)));
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
        "name": "tasks",
        "version": "1.0.0",
        "description": "Work tasks with embedded progress logs",
        "commands": [
            { "name": "add", "parameters": ["title", "description", "type", "priority", "assign", "province"] },
            { "name": "list", "parameters": ["status", "assignee", "province"] },
            { "name": "get", "parameters": ["id"] },
            { "name": "log", "parameters": ["id", "content"] },
            { "name": "status", "parameters": ["id", "status"] },
            { "name": "reassign", "parameters": ["id", "to"] }
        ],
        "storage": ["tasks.jsonl"]
    })
}
