//! Typed collection handles over flat-file storage.
//!
//! A [`Collection<T>`] binds one record type to one backing file and one
//! layout, and exposes the full mutation contract: reads return on-disk
//! order, creation is an append (log) or a push-and-rewrite (document), and
//! every update or delete is a whole-file read-modify-rewrite guarded by the
//! per-file advisory lock.

use crate::core::error::StoreError;
use crate::core::flatfile;
use crate::core::lock::with_file_lock;
use crate::core::time;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// On-disk layout of a collection's backing file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// One pretty-printed JSON array, rewritten in full on every mutation.
    Document,
    /// One compact JSON object per line. O(1) appends, full rewrite on update.
    Log,
}

/// A persisted record with a stable identity and a mutation timestamp.
pub trait Record: Serialize + DeserializeOwned {
    /// Unique identifier, generated at creation, immutable thereafter.
    /// Duplicate ids are undefined behavior; the first match wins.
    fn id(&self) -> &str;

    /// Stamp the mutation timestamp. Called by every mutating operation
    /// that is not a pure append. Append-only records may ignore it.
    fn touch(&mut self, now: String);
}

/// Typed handle over one backing file.
pub struct Collection<T> {
    name: &'static str,
    path: PathBuf,
    layout: Layout,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Collection<T> {
    pub fn new(name: &'static str, path: PathBuf, layout: Layout) -> Self {
        Self {
            name,
            path,
            layout,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Create the backing file containing `seed` if it does not exist.
    /// A second call on an existing file is a no-op.
    pub fn init_if_absent(&self, seed: &[T]) -> Result<(), StoreError> {
        with_file_lock(&self.path, || {
            if self.path.exists() {
                return Ok(());
            }
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir)?;
            }
            match self.layout {
                Layout::Document => flatfile::write_document(&self.path, seed),
                Layout::Log => {
                    flatfile::ensure_log(&self.path)?;
                    for record in seed {
                        flatfile::append_log(&self.path, record)?;
                    }
                    Ok(())
                }
            }
        })
    }

    /// Every record in on-disk order.
    pub fn read_all(&self) -> Result<Vec<T>, StoreError> {
        self.read_unlocked()
    }

    /// First record whose id matches, if any.
    pub fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.read_all()?.into_iter().find(|r| r.id() == id))
    }

    /// Add a record. For a log collection this is a single O(1) append; for
    /// a document collection the whole sequence is read, extended, and
    /// rewritten.
    pub fn insert(&self, record: T) -> Result<(), StoreError> {
        match self.layout {
            Layout::Log => self.append(&record),
            Layout::Document => with_file_lock(&self.path, || {
                let mut records = self.read_unlocked()?;
                records.push(record);
                self.write_unlocked(&records)
            }),
        }
    }

    /// Append a record as a new final line. Log collections only; the pure
    /// audit path, never preceded by a read.
    pub fn append(&self, record: &T) -> Result<(), StoreError> {
        debug_assert_eq!(self.layout, Layout::Log, "append is a log-layout operation");
        with_file_lock(&self.path, || flatfile::append_log(&self.path, record))
    }

    /// Replace the entire collection with `records`, preserving their order.
    pub fn rewrite_all(&self, records: &[T]) -> Result<(), StoreError> {
        with_file_lock(&self.path, || self.write_unlocked(records))
    }

    /// Locate the first record matching `id`, apply `mutate`, stamp
    /// `updated_at`, and rewrite the file in original order. Returns `false`
    /// without side effects when no record matches.
    pub fn update_by_id(&self, id: &str, mutate: impl FnOnce(&mut T)) -> Result<bool, StoreError> {
        with_file_lock(&self.path, || {
            let mut records = self.read_unlocked()?;
            let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
                return Ok(false);
            };
            mutate(record);
            record.touch(time::now_iso());
            self.write_unlocked(&records)?;
            Ok(true)
        })
    }

    /// Like [`update_by_id`](Self::update_by_id) but without stamping
    /// `updated_at`. For bookkeeping mutations that are not edits, e.g.
    /// view counters.
    pub fn amend_by_id(&self, id: &str, mutate: impl FnOnce(&mut T)) -> Result<bool, StoreError> {
        with_file_lock(&self.path, || {
            let mut records = self.read_unlocked()?;
            let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
                return Ok(false);
            };
            mutate(record);
            self.write_unlocked(&records)?;
            Ok(true)
        })
    }

    /// Remove every record matching `id` and rewrite. Returns `false` (a
    /// silent no-op, not an error) when nothing matched.
    pub fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        with_file_lock(&self.path, || {
            let mut records = self.read_unlocked()?;
            let before = records.len();
            records.retain(|r| r.id() != id);
            if records.len() == before {
                return Ok(false);
            }
            self.write_unlocked(&records)?;
            Ok(true)
        })
    }

    /// Append an embedded child record through the parent's rewrite path.
    /// The `push` closure owns stamping the child's id and creation time;
    /// the parent's `updated_at` is stamped here. Returns `false` when the
    /// parent id is not found.
    pub fn append_nested(&self, parent_id: &str, push: impl FnOnce(&mut T)) -> Result<bool, StoreError> {
        self.update_by_id(parent_id, push)
    }

    fn read_unlocked(&self) -> Result<Vec<T>, StoreError> {
        match self.layout {
            Layout::Document => flatfile::read_document(&self.path),
            Layout::Log => flatfile::read_log(&self.path),
        }
    }

    fn write_unlocked(&self, records: &[T]) -> Result<(), StoreError> {
        match self.layout {
            Layout::Document => flatfile::write_document(&self.path, records),
            Layout::Log => flatfile::rewrite_log(&self.path, records),
        }
    }
}
