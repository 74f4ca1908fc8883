//! Issue tracking on the append log.
//!
//! Creation is a single appended line; status changes, assignment, and
//! comments go through the whole-file rewrite path. Comments are embedded
//! in the parent issue record, so appending one rewrites the full
//! collection, not just a line.

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

pub const CATEGORIES: &[&str] = &["bug", "feature", "improvement", "question"];
pub const PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];
pub const STATUSES: &[&str] = &["open", "assigned", "in_progress", "resolved", "closed"];

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub submitter_id: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub comment: String,
    pub created_at: String,
}

impl Record for Issue {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: String) {
        self.updated_at = now;
    }
}

/// Input for [`create_issue`].
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub submitter_id: String,
    pub province: Option<String>,
}

/// List filters; `None` matches everything.
#[derive(Debug, Default, Clone)]
pub struct IssueFilters {
    pub status: Option<String>,
    pub category: Option<String>,
    pub province: Option<String>,
    pub submitter: Option<String>,
}

pub fn issues_path(root: &Path) -> PathBuf {
    root.join("issues.jsonl")
}

pub fn collection(root: &Path) -> Collection<Issue> {
    Collection::new("issues", issues_path(root), Layout::Log)
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

pub fn create_issue(store: &Store, actor: &str, new: NewIssue) -> Result<Issue, StoreError> {
    if new.title.trim().is_empty() {
        return Err(StoreError::ValidationError("Issue title cannot be empty".to_string()));
    }
    ensure_one_of(&new.category, CATEGORIES, "category")?;
    ensure_one_of(&new.priority, PRIORITIES, "priority")?;

    let now = time::now_iso();
    let issue = Issue {
        id: time::new_record_id(),
        title: new.title,
        description: new.description,
        category: new.category,
        priority: new.priority,
        status: "open".to_string(),
        submitter_id: new.submitter_id,
        province: new.province,
        assigned_to: None,
        created_at: now.clone(),
        updated_at: now,
        comments: Vec::new(),
    };
    collection(&store.root).insert(issue.clone())?;
    audit::record(
        store,
        actor,
        "create_issue",
        &format!("Submitted issue '{}'", issue.title),
    )?;
    Ok(issue)
}

pub fn get_issue(store: &Store, id: &str) -> Result<Option<Issue>, StoreError> {
    collection(&store.root).get(id)
}

pub fn list_issues(store: &Store, filters: &IssueFilters) -> Result<Vec<Issue>, StoreError> {
    let mut issues = collection(&store.root).read_all()?;
    issues.retain(|issue| matches_filters(issue, filters));
    Ok(issues)
}

fn matches_filters(issue: &Issue, filters: &IssueFilters) -> bool {
    if let Some(status) = &filters.status {
        if &issue.status != status {
            return false;
        }
    }
    if let Some(category) = &filters.category {
        if &issue.category != category {
            return false;
        }
    }
    if let Some(province) = &filters.province {
        if issue.province.as_deref() != Some(province.as_str()) {
            return false;
        }
    }
    if let Some(submitter) = &filters.submitter {
        if &issue.submitter_id != submitter {
            return false;
        }
    }
    true
}

pub fn update_status(store: &Store, actor: &str, id: &str, status: &str) -> Result<bool, StoreError> {
    ensure_one_of(status, STATUSES, "status")?;
    let updated = collection(&store.root).update_by_id(id, |issue| {
        issue.status = status.to_string();
    })?;
    if updated {
        audit::record(
            store,
            actor,
            "update_issue_status",
            &format!("Issue {} moved to '{}'", id, status),
        )?;
    }
    Ok(updated)
}

/// Assigning also moves the issue to `assigned`.
pub fn assign(store: &Store, actor: &str, id: &str, assignee: &str) -> Result<bool, StoreError> {
    let updated = collection(&store.root).update_by_id(id, |issue| {
        issue.assigned_to = Some(assignee.to_string());
        issue.status = "assigned".to_string();
    })?;
    if updated {
        audit::record(
            store,
            actor,
            "assign_issue",
            &format!("Issue {} assigned to {}", id, assignee),
        )?;
    }
    Ok(updated)
}

pub fn add_comment(store: &Store, actor: &str, id: &str, body: &str) -> Result<bool, StoreError> {
    if body.trim().is_empty() {
        return Err(StoreError::ValidationError("Comment cannot be empty".to_string()));
    }
    let comment = Comment {
        id: time::new_record_id(),
        user_id: actor.to_string(),
        comment: body.to_string(),
        created_at: time::now_iso(),
    };
    let appended = collection(&store.root).append_nested(id, |issue| {
        issue.comments.push(comment);
    })?;
    if appended {
        audit::record(store, actor, "comment_issue", &format!("Commented on issue {}", id))?;
    }
    Ok(appended)
}

fn validate_category(s: &str) -> Result<String, String> {
    ensure_one_of(s, CATEGORIES, "category")
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
#[clap(name = "issue", about = "Track issues: submit, assign, discuss, resolve.")]
pub struct IssueCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: IssueCommand,
}

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// Submit a new issue.
    Add {
        #[clap(value_name = "TITLE")]
        title: String,
        #[clap(long, default_value = "")]
        description: String,
        #[clap(long, default_value = "bug", value_parser = validate_category)]
        category: String,
        #[clap(long, default_value = "medium", value_parser = validate_priority)]
        priority: String,
        #[clap(long)]
        province: Option<String>,
    },
    /// List issues.
    List {
        #[clap(long)]
        status: Option<String>,
        #[clap(long)]
        category: Option<String>,
        #[clap(long)]
        province: Option<String>,
        #[clap(long)]
        submitter: Option<String>,
    },
    /// Show one issue with its comments.
    Get {
        #[clap(long)]
        id: String,
    },
    /// Add a comment.
    Comment {
        #[clap(long)]
        id: String,
        #[clap(long)]
        comment: String,
    },
    /// Assign to a user (moves the issue to 'assigned').
    Assign {
        #[clap(long)]
        id: String,
        #[clap(long)]
        to: String,
    },
    /// Change status.
    Status {
        #[clap(long)]
        id: String,
        #[clap(long, value_parser = validate_status)]
        status: String,
    },
}

pub fn run_issue_cli(store: &Store, actor: &str, cli: IssueCli) -> Result<(), StoreError> {
    let json = cli.format == OutputFormat::Json;
    match cli.command {
        IssueCommand::Add {
            title,
            description,
            category,
            priority,
            province,
        } => {
            let issue = create_issue(
                store,
                actor,
                NewIssue {
                    title,
                    description,
                    category,
                    priority,
                    submitter_id: actor.to_string(),
                    province,
                },
            )?;
            if json {
                println!(
                    "{}",
                    time::command_envelope("issue.add", "ok", serde_json::json!({"id": issue.id}))
                );
            } else {
                println!(
                    "{} filed issue {} ({})",
                    "✓".green(),
                    issue.title.bold(),
                    output::short_id(&issue.id)
                );
            }
        }
        IssueCommand::List {
            status,
            category,
            province,
            submitter,
        } => {
            let filters = IssueFilters {
                status,
                category,
                province,
                submitter,
            };
            let issues = list_issues(store, &filters)?;
            if json {
                println!(
                    "{}",
                    time::command_envelope(
                        "issue.list",
                        "ok",
                        serde_json::json!({"items": serde_json::to_value(&issues)?})
                    )
                );
            } else {
                for issue in issues {
                    println!(
                        "{}  {:<12} {:<8} {}",
                        output::short_id(&issue.id),
                        render_status(&issue.status),
                        issue.priority,
                        output::compact_line(&issue.title, 60)
                    );
                }
            }
        }
        IssueCommand::Get { id } => {
            let issue = get_issue(store, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("issue {}", id)))?;
            if json {
                println!(
                    "{}",
                    time::command_envelope(
                        "issue.get",
                        "ok",
                        serde_json::json!({"item": serde_json::to_value(&issue)?})
                    )
                );
            } else {
                println!("{}", serde_json::to_string_pretty(&issue)?);
            }
        }
        IssueCommand::Comment { id, comment } => {
            report_hit(json, "issue.comment", add_comment(store, actor, &id, &comment)?, &id)?;
        }
        IssueCommand::Assign { id, to } => {
            report_hit(json, "issue.assign", assign(store, actor, &id, &to)?, &id)?;
        }
        IssueCommand::Status { id, status } => {
            report_hit(json, "issue.status", update_status(store, actor, &id, &status)?, &id)?;
        }
    }
    Ok(())
}

fn render_status(status: &str) -> colored::ColoredString {
    match status {
        "open" => status.yellow(),
        "assigned" | "in_progress" => status.cyan(),
        "resolved" => status.green(),
        "closed" => status.dimmed(),
        _ => status.normal(),
    }
}

fn report_hit(json: bool, cmd: &str, hit: bool, id: &str) -> Result<(), StoreError> {
    if !hit {
        return Err(StoreError::NotFound(format!("issue {}", id)));
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
        "name": "issues",
        "version": "1.0.0",
        "description": "Issue tracking over the append log",
        "commands": [
            { "name": "add", "parameters": ["title", "description", "category", "priority", "province"] },
            { "name": "list", "parameters": ["status", "category", "province", "submitter"] },
            { "name": "get", "parameters": ["id"] },
            { "name": "comment", "parameters": ["id", "comment"] },
            { "name": "assign", "parameters": ["id", "to"] },
            { "name": "status", "parameters": ["id", "status"] }
        ],
        "storage": ["issues.jsonl"]
    })
}
