use std::{fs, path::Path};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::CoreError, store::DEFAULT_COMPACT_AFTER};

pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";

/// Service settings read from `config/service.toml`.
///
/// Every section and field is optional in the file; missing values take the
/// defaults below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub http: HttpSection,
    pub store: StoreSection,
    pub seed: SeedSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub bind: String,
    /// Bearer / `x-api-token` secret. Unset disables authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self { bind: DEFAULT_HTTP_BIND.to_string(), auth_token: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Keep the catalog in `data/catalog.json` across restarts.
    pub persist: bool,
    /// Journaled changes after which `catalog.journal` is folded into the snapshot.
    pub compact_after: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self { persist: true, compact_after: DEFAULT_COMPACT_AFTER }
    }
}

/// Bulk loader sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSection {
    pub tag_count: u32,
    pub translation_count: u32,
    pub batch_size: u32,
}

impl Default for SeedSection {
    fn default() -> Self {
        Self { tag_count: 20, translation_count: 100_000, batch_size: 1_000 }
    }
}

impl ServiceConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| CoreError::ReadConfig { path: path.to_path_buf(), source })?;
        let config: ServiceConfig = toml_edit::de::from_str(&content)
            .map_err(|source| CoreError::ParseConfig { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), "loaded service config");
        Ok(config.normalised())
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() { Self::from_file(path) } else { Ok(Self::default()) }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml_edit::ser::to_string_pretty(self)
            .map_err(|source| CoreError::SerialiseConfig { source }.into())
    }

    /// Write the config, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let doc = self.to_toml_string()?;
        fs::write(path, doc)
            .map_err(|source| CoreError::WriteConfig { path: path.to_path_buf(), source })?;
        Ok(())
    }

    fn normalised(mut self) -> Self {
        self.http.bind = self.http.bind.trim().to_string();
        if self.http.bind.is_empty() {
            self.http.bind = DEFAULT_HTTP_BIND.to_string();
        }
        self.http.auth_token = self
            .http
            .auth_token
            .take()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        self.seed.batch_size = self.seed.batch_size.max(1);
        self.store.compact_after = self.store.compact_after.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_sections_take_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("service.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[http]
bind = "0.0.0.0:9000"
"#
        )
        .unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.http.bind, "0.0.0.0:9000");
        assert_eq!(config.http.auth_token, None);
        assert_eq!(config.store, StoreSection::default());
        assert_eq!(config.seed, SeedSection::default());
    }

    #[test]
    fn blank_token_and_zero_batch_are_normalised() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("service.toml");
        fs::write(
            &path,
            r#"
[http]
bind = " "
auth_token = "  "

[store]
compact_after = 0

[seed]
batch_size = 0
"#,
        )
        .unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.http.bind, DEFAULT_HTTP_BIND);
        assert_eq!(config.http.auth_token, None);
        assert_eq!(config.seed.batch_size, 1);
        assert_eq!(config.store.compact_after, 1);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("service.toml");
        let mut config = ServiceConfig::default();
        config.http.auth_token = Some("secret".into());
        config.store.persist = false;
        config.store.compact_after = 500;
        config.seed.tag_count = 3;
        config.save(&path).unwrap();

        assert_eq!(ServiceConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn absent_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config = ServiceConfig::load_or_default(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("service.toml");
        fs::write(&path, "[http\nbind = 1").unwrap();
        let err = ServiceConfig::from_file(&path).unwrap_err();
        let core = err.downcast_ref::<CoreError>().unwrap();
        assert!(matches!(core, CoreError::ParseConfig { .. }));
        assert_eq!(core.path(), Some(path.as_path()));
    }
}
