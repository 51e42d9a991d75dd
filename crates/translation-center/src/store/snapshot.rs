use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    error::CoreError,
    model::{Link, Tag, Translation},
};

const MAX_TEMP_ATTEMPTS: u32 = 100;

/// On-disk form of the whole catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CatalogSnapshot {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub translations: Vec<Translation>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Load a snapshot, treating a missing or blank file as an empty catalog.
pub(crate) fn read(path: &Path) -> Result<CatalogSnapshot> {
    if !path.exists() {
        return Ok(CatalogSnapshot::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|source| CoreError::ReadSnapshot { path: path.to_path_buf(), source })?;
    if content.trim().is_empty() {
        return Ok(CatalogSnapshot::default());
    }
    let snapshot = serde_json::from_str(&content)
        .map_err(|source| CoreError::ParseSnapshot { path: path.to_path_buf(), source })?;
    Ok(snapshot)
}

/// Replace the snapshot file atomically: write a sibling temp file, then rename.
pub(crate) fn write(path: &Path, snapshot: &CatalogSnapshot) -> Result<()> {
    let buffer = serde_json::to_vec(snapshot)
        .map_err(|source| CoreError::SerialiseSnapshot { source })?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent).map_err(|source| CoreError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let (mut file, temp_path) = create_temp_file(path)?;
    let written = file.write_all(&buffer).and_then(|_| file.sync_all());
    drop(file);
    if let Err(source) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(CoreError::WriteSnapshot { path: temp_path, source }.into());
    }

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(CoreError::WriteSnapshot { path: path.to_path_buf(), source }.into());
    }
    Ok(())
}

fn create_temp_file(path: &Path) -> Result<(fs::File, PathBuf)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("catalog.json")
        .to_string();
    let mut last_error = None;
    for attempt in 0..MAX_TEMP_ATTEMPTS {
        let candidate = path.with_file_name(format!(".{file_name}.tmp{attempt}"));
        match fs::OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((file, candidate)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                last_error = Some(err);
            }
            Err(source) => {
                return Err(CoreError::WriteSnapshot { path: candidate, source }.into());
            }
        }
    }
    let source = last_error
        .unwrap_or_else(|| std::io::Error::other("no temporary file name available"));
    Err(CoreError::WriteSnapshot { path: path.to_path_buf(), source }.into())
}
