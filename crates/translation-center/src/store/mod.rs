//! Entity store: tag and translation rows, their relation table, and the
//! transaction boundary every write goes through.
//!
//! A file-backed store keeps `catalog.json` plus an append-only
//! `catalog.journal` beside it. Each committed transaction appends one journal
//! line. The snapshot is rewritten only when the journal is folded into it: on
//! open, every `compact_after` journaled changes, and on [`EntityStore::compact`].
//!
//! One process owns a catalog file at a time. Nothing locks the files, so a
//! second writer (say `translation-center seed` next to a running `serve`)
//! overwrites the first one's snapshot and loses its updates.

mod journal;
mod snapshot;
mod tables;

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Result;
use tracing::{debug, info, warn};

use journal::JournalEntry;
use tables::Change;
pub use tables::Tables;

/// Journaled changes after which the journal is folded into the snapshot.
pub const DEFAULT_COMPACT_AFTER: usize = 50_000;

/// Shared handle to the catalog tables.
///
/// Readers see committed state only. Writers mutate the live tables under the
/// write lock and record an undo log, so a failed closure or a failed journal
/// append is rolled back before the lock is released.
#[derive(Debug, Clone)]
pub struct EntityStore {
    inner: Arc<EntityStoreInner>,
}

#[derive(Debug)]
struct EntityStoreInner {
    tables: RwLock<Tables>,
    files: Option<StoreFiles>,
}

#[derive(Debug)]
struct StoreFiles {
    snapshot: PathBuf,
    journal: PathBuf,
    compact_after: usize,
    journaled: AtomicUsize,
}

impl StoreFiles {
    /// Append committed changes, compacting once enough have piled up.
    fn record(&self, tables: &Tables, changes: &[Change]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let entries: Vec<JournalEntry> = changes.iter().map(JournalEntry::from).collect();
        journal::append(&self.journal, &entries)?;

        let journaled = self.journaled.fetch_add(entries.len(), Ordering::Relaxed) + entries.len();
        if journaled >= self.compact_after {
            // A failed fold leaves the journal intact.
            if let Err(err) = self.compact(tables) {
                warn!(error = ?err, path = %self.snapshot.display(), "catalog compaction failed");
            }
        }
        Ok(())
    }

    fn compact(&self, tables: &Tables) -> Result<()> {
        snapshot::write(&self.snapshot, &tables.to_snapshot())?;
        journal::clear(&self.journal)?;
        let folded = self.journaled.swap(0, Ordering::Relaxed);
        debug!(path = %self.snapshot.display(), folded, "catalog snapshot compacted");
        Ok(())
    }
}

impl EntityStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default(), None)
    }

    /// Open a store backed by a JSON snapshot file, loading it when present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(path, DEFAULT_COMPACT_AFTER)
    }

    /// Like [`EntityStore::open`] with an explicit compaction threshold.
    ///
    /// Replays any journal left by the previous process and folds it into the
    /// snapshot before returning.
    pub fn open_with(path: impl Into<PathBuf>, compact_after: usize) -> Result<Self> {
        let snapshot_path = path.into();
        let journal_path = journal::path_for(&snapshot_path);

        let mut tables = Tables::from_snapshot(snapshot::read(&snapshot_path)?);
        let mut replayed = 0usize;
        for record in journal::read(&journal_path)? {
            replayed += record.entries.len();
            for entry in record.entries {
                tables.apply(entry);
            }
        }

        let files = StoreFiles {
            snapshot: snapshot_path,
            journal: journal_path,
            compact_after: compact_after.max(1),
            journaled: AtomicUsize::new(0),
        };
        if replayed > 0 {
            files.compact(&tables)?;
        }
        info!(
            path = %files.snapshot.display(),
            tags = tables.tag_count(),
            translations = tables.translation_count(),
            links = tables.link_count(),
            replayed,
            "catalog store opened"
        );
        Ok(Self::with_tables(tables, Some(files)))
    }

    fn with_tables(tables: Tables, files: Option<StoreFiles>) -> Self {
        Self { inner: Arc::new(EntityStoreInner { tables: RwLock::new(tables), files }) }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.inner.files.as_ref().map(|files| files.snapshot.as_path())
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.inner.files.as_ref().map(|files| files.journal.as_path())
    }

    /// Run a read-only closure against the current tables.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.inner.tables.read().expect("catalog tables poisoned");
        f(&tables)
    }

    /// Run a closure as one atomic unit.
    ///
    /// Concurrent writers are serialised by the write lock. When the closure or
    /// the journal append fails, everything it did is undone.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
        let mut tables = self.inner.tables.write().expect("catalog tables poisoned");
        let result = f(&mut *tables);
        let changes = tables.take_changes();
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                tables.undo(changes);
                return Err(err);
            }
        };
        if let Some(files) = &self.inner.files {
            if let Err(err) = files.record(&tables, &changes) {
                tables.undo(changes);
                return Err(err);
            }
        }
        Ok(value)
    }

    /// Fold the journal into the snapshot now. A no-op for in-memory stores.
    pub fn compact(&self) -> Result<()> {
        let Some(files) = &self.inner.files else {
            return Ok(());
        };
        let tables = self.inner.tables.read().expect("catalog tables poisoned");
        files.compact(&tables)
    }
}
