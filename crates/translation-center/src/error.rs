use std::{
    io,
    path::{Path, PathBuf},
};

use serde_json::Error as JsonError;
use thiserror::Error;
use toml_edit::{de::Error as TomlDeError, ser::Error as TomlSerError};

use crate::model::{TagId, TranslationId};

/// Coarse classification used by outer layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("tag '{id}' not found")]
    TagNotFound { id: TagId },

    #[error("translation '{id}' not found")]
    TranslationNotFound { id: TranslationId },

    #[error("tag name '{name}' already exists")]
    TagNameConflict { name: String },

    #[error("translation for key '{key}' and locale '{locale}' already exists")]
    TranslationConflict { key: String, locale: String },

    #[error("page index must be zero or greater, got {page}")]
    InvalidPage { page: i64 },

    #[error("page size must be between 1 and {max}, got {size}")]
    InvalidPageSize { size: i64, max: u32 },

    #[error("tag name cannot be empty")]
    BlankTagName,

    #[error("translation {field} cannot be empty")]
    BlankField { field: &'static str },

    #[error("failed to create directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read config file {path}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: TomlDeError,
    },

    #[error("failed to serialise service config to TOML")]
    SerialiseConfig {
        #[source]
        source: TomlSerError,
    },

    #[error("failed to write config file {path}")]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read catalog snapshot {path}")]
    ReadSnapshot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse catalog snapshot {path}")]
    ParseSnapshot {
        path: PathBuf,
        #[source]
        source: JsonError,
    },

    #[error("failed to serialise catalog snapshot")]
    SerialiseSnapshot {
        #[source]
        source: JsonError,
    },

    #[error("failed to write catalog snapshot {path}")]
    WriteSnapshot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read catalog journal {path}")]
    ReadJournal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialise catalog journal entry")]
    SerialiseJournal {
        #[source]
        source: JsonError,
    },

    #[error("failed to append to catalog journal {path}")]
    WriteJournal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to determine user home directory for TRANSLATION_CENTER_ROOT")]
    HomeDirectoryUnknown,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::TagNotFound { .. } | CoreError::TranslationNotFound { .. } => {
                ErrorKind::NotFound
            }
            CoreError::TagNameConflict { .. } | CoreError::TranslationConflict { .. } => {
                ErrorKind::Conflict
            }
            CoreError::InvalidPage { .. }
            | CoreError::InvalidPageSize { .. }
            | CoreError::BlankTagName
            | CoreError::BlankField { .. } => ErrorKind::Validation,
            CoreError::CreateDirectory { .. }
            | CoreError::ReadConfig { .. }
            | CoreError::ParseConfig { .. }
            | CoreError::SerialiseConfig { .. }
            | CoreError::WriteConfig { .. }
            | CoreError::ReadSnapshot { .. }
            | CoreError::ParseSnapshot { .. }
            | CoreError::SerialiseSnapshot { .. }
            | CoreError::WriteSnapshot { .. }
            | CoreError::ReadJournal { .. }
            | CoreError::SerialiseJournal { .. }
            | CoreError::WriteJournal { .. }
            | CoreError::HomeDirectoryUnknown => ErrorKind::Internal,
        }
    }

    /// Path the failure relates to, for I/O and parse errors.
    pub fn path(&self) -> Option<&Path> {
        match self {
            CoreError::CreateDirectory { path, .. }
            | CoreError::ReadConfig { path, .. }
            | CoreError::ParseConfig { path, .. }
            | CoreError::WriteConfig { path, .. }
            | CoreError::ReadSnapshot { path, .. }
            | CoreError::ParseSnapshot { path, .. }
            | CoreError::WriteSnapshot { path, .. }
            | CoreError::ReadJournal { path, .. }
            | CoreError::WriteJournal { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}
