use std::{
    fs,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::tables::Change;
use crate::{
    error::CoreError,
    model::{Link, Tag, TagId, Translation, TranslationId},
};

/// Forward effect of one committed change, as written to the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum JournalEntry {
    PutTag { tag: Tag },
    RemoveTag { id: TagId },
    PutTranslation { row: Translation },
    RemoveTranslation { id: TranslationId },
    Link { link: Link },
    Unlink { link: Link },
}

impl From<&Change> for JournalEntry {
    fn from(change: &Change) -> Self {
        match change {
            Change::TagPut { after, .. } => JournalEntry::PutTag { tag: after.clone() },
            Change::TagRemoved(tag) => JournalEntry::RemoveTag { id: tag.id },
            Change::TranslationPut { after, .. } => {
                JournalEntry::PutTranslation { row: after.clone() }
            }
            Change::TranslationRemoved(row) => JournalEntry::RemoveTranslation { id: row.id },
            Change::Linked(link) => JournalEntry::Link { link: *link },
            Change::Unlinked(link) => JournalEntry::Unlink { link: *link },
        }
    }
}

/// One committed transaction. Each record is a single line in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct JournalRecord {
    pub entries: Vec<JournalEntry>,
}

/// The journal that sits next to a snapshot: `catalog.json` -> `catalog.journal`.
pub(crate) fn path_for(snapshot: &Path) -> PathBuf {
    snapshot.with_extension("journal")
}

/// Load every complete record. Reading stops at the first line that does not
/// parse, which is where a crash cut an append short.
pub(crate) fn read(path: &Path) -> Result<Vec<JournalRecord>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(CoreError::ReadJournal { path: path.to_path_buf(), source }.into());
        }
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.map_err(|source| CoreError::ReadJournal { path: path.to_path_buf(), source })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %err,
                    "ignoring truncated catalog journal tail"
                );
                break;
            }
        }
    }
    Ok(records)
}

/// Append one record and flush it to disk.
pub(crate) fn append(path: &Path, entries: &[JournalEntry]) -> Result<()> {
    let mut line = serde_json::to_vec(&JournalRecordRef { entries })
        .map_err(|source| CoreError::SerialiseJournal { source })?;
    line.push(b'\n');

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| CoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CoreError::WriteJournal { path: path.to_path_buf(), source })?;
    file.write_all(&line)
        .and_then(|_| file.sync_data())
        .map_err(|source| CoreError::WriteJournal { path: path.to_path_buf(), source })?;
    Ok(())
}

/// Drop the journal once a snapshot holds everything it recorded.
pub(crate) fn clear(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CoreError::WriteJournal { path: path.to_path_buf(), source }.into()),
    }
}

#[derive(Serialize)]
struct JournalRecordRef<'a> {
    entries: &'a [JournalEntry],
}
