//! Knowledge base entries.
//!
//! A document collection with free-text search over title, content, and
//! tags. Reading an article bumps its view counter through the amend path,
//! which deliberately leaves `updated_at` alone: a view is not an edit.

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

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KnowledgeEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub views: u64,
}

impl Record for KnowledgeEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: String) {
        self.updated_at = now;
    }
}

/// Fields accepted by [`edit_knowledge`]. `None` leaves a field unchanged.
#[derive(Debug, Default, Clone)]
pub struct KnowledgeUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub fn knowledge_path(root: &Path) -> PathBuf {
    root.join("knowledge.json")
}

pub fn collection(root: &Path) -> Collection<KnowledgeEntry> {
    Collection::new("knowledge", knowledge_path(root), Layout::Document)
}

pub fn initialize(store: &Store) -> Result<(), StoreError> {
    collection(&store.root).init_if_absent(&[])
}

pub fn create_knowledge(
    store: &Store,
    actor: &str,
    title: &str,
    content: &str,
    category: &str,
    tags: Vec<String>,
) -> Result<KnowledgeEntry, StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::ValidationError("Knowledge title cannot be empty".to_string()));
    }
    let now = time::now_iso();
    let entry = KnowledgeEntry {
        id: time::new_record_id(),
        title: title.to_string(),
        content: content.to_string(),
        category: category.to_string(),
        author_id: actor.to_string(),
        tags,
        created_at: now.clone(),
        updated_at: now,
        views: 0,
    };
    collection(&store.root).insert(entry.clone())?;
    audit::record(
        store,
        actor,
        "create_knowledge",
        &format!("Published '{}' to the knowledge base", entry.title),
    )?;
    Ok(entry)
}

pub fn get_knowledge(store: &Store, id: &str) -> Result<Option<KnowledgeEntry>, StoreError> {
    collection(&store.root).get(id)
}

pub fn list_knowledge(store: &Store, category: Option<&str>) -> Result<Vec<KnowledgeEntry>, StoreError> {
    let mut entries = collection(&store.root).read_all()?;
    if let Some(category) = category {
        entries.retain(|e| e.category == category);
    }
    Ok(entries)
}

/// Case-insensitive substring search over title, content, and tags.
pub fn search_knowledge(store: &Store, query: &str) -> Result<Vec<KnowledgeEntry>, StoreError> {
    let needle = query.to_lowercase();
    let mut entries = collection(&store.root).read_all()?;
    entries.retain(|e| {
        e.title.to_lowercase().contains(&needle)
            || e.content.to_lowercase().contains(&needle)
            || e.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    });
    Ok(entries)
}

pub fn edit_knowledge(
    store: &Store,
    actor: &str,
    id: &str,
    update: KnowledgeUpdate,
) -> Result<bool, StoreError> {
    let updated = collection(&store.root).update_by_id(id, |entry| {
        if let Some(title) = update.title {
            entry.title = title;
        }
        if let Some(content) = update.content {
            entry.content = content;
        }
        if let Some(category) = update.category {
            entry.category = category;
        }
        if let Some(tags) = update.tags {
            entry.tags = tags;
        }
    })?;
    if updated {
        audit::record(store, actor, "update_knowledge", &format!("Edited knowledge entry {}", id))?;
    }
    Ok(updated)
}

pub fn delete_knowledge(store: &Store, actor: &str, id: &str) -> Result<bool, StoreError> {
    let deleted = collection(&store.root).delete_by_id(id)?;
    if deleted {
        audit::record(store, actor, "delete_knowledge", &format!("Deleted knowledge entry {}", id))?;
    }
    Ok(deleted)
}

/// Bump the view counter. Not an edit: `updated_at` stays put.
pub fn record_view(store: &Store, id: &str) -> Result<bool, StoreError> {
    collection(&store.root).amend_by_id(id, |entry| {
        entry.views += 1;
    })
}

#[derive(Parser, Debug)]
#[clap(name = "knowledge", about = "Browse and maintain the knowledge base.")]
pub struct KnowledgeCli {
    #[clap(subcommand)]
    command: KnowledgeCommand,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeCommand {
    /// Publish a new entry.
    Add {
        #[clap(value_name = "TITLE")]
        title: String,
        #[clap(long, default_value = "")]
        content: String,
        #[clap(long, default_value = "general")]
        category: String,
        /// Comma-separated tag list.
        #[clap(long, default_value = "")]
        tags: String,
    },
    /// List entries.
    List {
        #[clap(long)]
        category: Option<String>,
    },
    /// Search title, content, and tags.
    Search {
        #[clap(value_name = "QUERY")]
        query: String,
    },
    /// Show one entry (counts as a view).
    Show {
        #[clap(long)]
        id: String,
    },
    /// Edit an entry.
    Edit {
        #[clap(long)]
        id: String,
        #[clap(long)]
        title: Option<String>,
        #[clap(long)]
        content: Option<String>,
        #[clap(long)]
        category: Option<String>,
        /// Comma-separated tag list; replaces the existing tags.
        #[clap(long)]
        tags: Option<String>,
    },
    /// Delete an entry.
    Delete {
        #[clap(long)]
        id: String,
    },
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn run_knowledge_cli(store: &Store, actor: &str, cli: KnowledgeCli) -> Result<(), StoreError> {
    match cli.command {
        KnowledgeCommand::Add {
            title,
            content,
            category,
            tags,
        } => {
            let entry = create_knowledge(store, actor, &title, &content, &category, split_tags(&tags))?;
            println!(
                "{} published {} ({})",
                "✓".green(),
                entry.title.bold(),
                output::short_id(&entry.id)
            );
        }
        KnowledgeCommand::List { category } => {
            for entry in list_knowledge(store, category.as_deref())? {
                println!(
                    "{}  {:<12} {:>5} views  {} {}",
                    output::short_id(&entry.id),
                    entry.category,
                    entry.views,
                    output::compact_line(&entry.title, 50),
                    output::tag_list(&entry.tags).dimmed()
                );
            }
        }
        KnowledgeCommand::Search { query } => {
            for entry in search_knowledge(store, &query)? {
                println!(
                    "{}  {}  {}",
                    output::short_id(&entry.id),
                    output::compact_line(&entry.title, 50).bold(),
                    output::compact_line(&entry.content, 60).dimmed()
                );
            }
        }
        KnowledgeCommand::Show { id } => {
            let entry = get_knowledge(store, &id)?
                .ok_or_else(|| StoreError::NotFound(format!("knowledge entry {}", id)))?;
            record_view(store, &id)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        KnowledgeCommand::Edit {
            id,
            title,
            content,
            category,
            tags,
        } => {
            let update = KnowledgeUpdate {
                title,
                content,
                category,
                tags: tags.as_deref().map(split_tags),
            };
            if !edit_knowledge(store, actor, &id, update)? {
                return Err(StoreError::NotFound(format!("knowledge entry {}", id)));
            }
            println!("{} entry updated", "✓".green());
        }
        KnowledgeCommand::Delete { id } => {
            if !delete_knowledge(store, actor, &id)? {
                return Err(StoreError::NotFound(format!("knowledge entry {}", id)));
            }
            println!("{} entry deleted", "✓".green());
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "knowledge",
        "version": "1.0.0",
        "description": "Knowledge base with search and view counts",
        "commands": [
            { "name": "add", "parameters": ["title", "content", "category", "tags"] },
            { "name": "list", "parameters": ["category"] },
            { "name": "search", "parameters": ["query"] },
            { "name": "show", "parameters": ["id"] },
            { "name": "edit", "parameters": ["id", "title", "content", "category", "tags"] },
            { "name": "delete", "parameters": ["id"] }
        ],
        "storage": ["knowledge.json"]
    })
}
