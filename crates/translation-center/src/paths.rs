//! Filesystem layout helpers for translation-center.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Result;

use crate::error::CoreError;

/// Environment variable that overrides the default root directory.
const ROOT_ENV_KEY: &str = "TRANSLATION_CENTER_ROOT";
const DEFAULT_ROOT_DIRNAME: &str = ".translation-center";

const SERVICE_CONFIG_FILE: &str = "service.toml";
const CATALOG_SNAPSHOT_FILE: &str = "catalog.json";

/// Descriptor for the on-disk directory structure.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
    config_dir: PathBuf,
    data_dir: PathBuf,
    logs_dir: PathBuf,
}

impl Layout {
    /// Construct a new layout without touching the filesystem.
    pub fn new(root: PathBuf) -> Self {
        let config_dir = root.join("config");
        let data_dir = root.join("data");
        let logs_dir = root.join("logs");

        Self { root, config_dir, data_dir, logs_dir }
    }

    /// Ensure that all directories exist on disk.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root(), self.config_dir(), self.data_dir(), self.logs_dir()] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|source| CoreError::CreateDirectory {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Directory holding the catalog snapshot.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Rolling log directory used by `serve`.
    pub fn service_logs_dir(&self) -> PathBuf {
        self.logs_dir().join("service")
    }

    pub fn service_config_path(&self) -> PathBuf {
        self.config_dir().join(SERVICE_CONFIG_FILE)
    }

    pub fn catalog_snapshot_path(&self) -> PathBuf {
        self.data_dir().join(CATALOG_SNAPSHOT_FILE)
    }
}

/// Determine the default root directory for translation-center.
pub fn default_root() -> Result<PathBuf> {
    if let Ok(value) = env::var(ROOT_ENV_KEY) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }

    let home = user_home_dir().ok_or(CoreError::HomeDirectoryUnknown)?;
    Ok(home.join(DEFAULT_ROOT_DIRNAME))
}

fn user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    None
}
