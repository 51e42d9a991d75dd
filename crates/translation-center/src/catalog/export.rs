use std::collections::BTreeMap;

use tracing::info;

use crate::store::EntityStore;

/// `locale -> key -> value`.
pub type ExportMap = BTreeMap<String, BTreeMap<String, String>>;

/// Groups every translation by locale for client bundles.
#[derive(Debug, Clone)]
pub struct ExportAggregator {
    store: EntityStore,
}

impl ExportAggregator {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Walk every translation once in store order. A later row with the same
    /// locale and key replaces an earlier one.
    pub fn export_all(&self) -> ExportMap {
        let export = self.store.read(|tables| {
            let mut export = ExportMap::new();
            for row in tables.translations() {
                export
                    .entry(row.locale.clone())
                    .or_default()
                    .insert(row.key.clone(), row.value.clone());
            }
            export
        });
        info!(
            locales = export.len(),
            entries = export.values().map(BTreeMap::len).sum::<usize>(),
            "exported translations"
        );
        export
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Translation;

    fn store_with(rows: &[(&str, &str, &str)]) -> EntityStore {
        let store = EntityStore::in_memory();
        store
            .transaction(|tables| {
                for (key, locale, value) in rows {
                    tables.insert_translation(Translation::new(
                        key.to_string(),
                        locale.to_string(),
                        value.to_string(),
                    ))?;
                }
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn groups_by_locale_then_key() {
        let store = store_with(&[
            ("login.title", "en", "Login"),
            ("login.title", "fr", "Connexion"),
            ("logout", "en", "Logout"),
        ]);
        let export = ExportAggregator::new(store).export_all();

        assert_eq!(export.len(), 2);
        assert_eq!(export["en"]["login.title"], "Login");
        assert_eq!(export["en"]["logout"], "Logout");
        assert_eq!(export["fr"]["login.title"], "Connexion");
    }

    #[test]
    fn empty_store_exports_empty_map() {
        let export = ExportAggregator::new(EntityStore::in_memory()).export_all();
        assert!(export.is_empty());
    }

    #[test]
    fn later_duplicate_row_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let snapshot = serde_json::json!({
            "translations": [
                {
                    "id": "01890000-0000-7000-8000-000000000002",
                    "key": "greeting", "locale": "en", "value": "Hi",
                    "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
                },
                {
                    "id": "01890000-0000-7000-8000-000000000001",
                    "key": "greeting", "locale": "en", "value": "Hello",
                    "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
                }
            ]
        });
        std::fs::write(&path, snapshot.to_string()).unwrap();

        let export = ExportAggregator::new(EntityStore::open(&path).unwrap()).export_all();
        assert_eq!(export["en"]["greeting"], "Hi");
    }

    #[test]
    fn repeated_exports_are_identical() {
        let store = store_with(&[("b", "en", "B"), ("a", "en", "A"), ("a", "de", "Ä")]);
        let exporter = ExportAggregator::new(store);
        let first = serde_json::to_string(&exporter.export_all()).unwrap();
        let second = serde_json::to_string(&exporter.export_all()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, r#"{"de":{"a":"Ä"},"en":{"a":"A","b":"B"}}"#);
    }
}
