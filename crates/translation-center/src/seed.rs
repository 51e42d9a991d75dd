//! Bulk loader that fills an empty catalog with generated rows.

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use specta::Type;
use tracing::info;

use crate::{
    catalog::{Catalog, TagRequest, TranslationRequest},
    config::SeedSection,
    model::TagId,
};

/// Outcome of one loader run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    /// The store already held enough translations.
    pub skipped: bool,
    pub tags_created: u32,
    pub translations_created: u32,
}

/// Generates `tag1..tagN` and `key1..keyM`, going through the regular
/// managers so every row obeys the same uniqueness and relation rules as API
/// writes.
#[derive(Debug, Clone)]
pub struct Seeder {
    catalog: Catalog,
}

impl Seeder {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn run(&self, config: SeedSection) -> Result<SeedReport> {
        let target = config.translation_count as usize;
        let existing = self.catalog.translations().count();
        if existing >= target {
            info!(existing, target, "catalog already seeded");
            return Ok(SeedReport { skipped: true, ..SeedReport::default() });
        }

        let tag_ids = self.ensure_tags(config.tag_count)?;
        let tags_created = tag_ids.created;

        let mut translations_created = 0u32;
        let mut batch = Vec::with_capacity(config.batch_size.max(1) as usize);
        for i in 1..=config.translation_count {
            let key = format!("key{i}");
            let locale = if i % 2 == 0 { "en" } else { "fr" };
            let exists = self
                .catalog
                .store()
                .read(|tables| tables.translation_id_by_key(&key, locale).is_some());
            if exists {
                continue;
            }
            let tags = tag_ids.for_row(i);
            batch.push(TranslationRequest::new(key, locale, format!("value{i}"), tags));
            if batch.len() >= config.batch_size.max(1) as usize {
                translations_created += self.flush(&mut batch)?;
            }
        }
        if !batch.is_empty() {
            translations_created += self.flush(&mut batch)?;
        }

        info!(tags_created, translations_created, "seeded catalog");
        Ok(SeedReport { skipped: false, tags_created, translations_created })
    }

    fn ensure_tags(&self, count: u32) -> Result<SeedTags> {
        let requests = (1..=count).map(|i| TagRequest::named(format!("tag{i}"))).collect();
        let created = self.catalog.tags().create_tags(requests)?;

        let by_name: HashMap<String, TagId> =
            self.catalog.tags().all_tags().into_iter().map(|tag| (tag.name, tag.id)).collect();
        let ids = (1..=count).filter_map(|i| by_name.get(&format!("tag{i}")).copied()).collect();
        Ok(SeedTags { ids, created: created.len() as u32 })
    }

    fn flush(&self, batch: &mut Vec<TranslationRequest>) -> Result<u32> {
        let created = self.catalog.translations().create_translations(std::mem::take(batch))?;
        Ok(created.len() as u32)
    }
}

struct SeedTags {
    ids: Vec<TagId>,
    created: u32,
}

impl SeedTags {
    /// Row `i` gets tag `i % n`, counting from the first generated tag.
    fn for_row(&self, i: u32) -> Option<TagId> {
        if self.ids.is_empty() {
            return None;
        }
        self.ids.get(i as usize % self.ids.len()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PageRequest, TranslationFilter};

    fn small() -> SeedSection {
        SeedSection { tag_count: 3, translation_count: 10, batch_size: 4 }
    }

    #[test]
    fn seeds_tags_and_translations() {
        let catalog = Catalog::in_memory();
        let report = Seeder::new(catalog.clone()).run(small()).unwrap();

        assert_eq!(report, SeedReport { skipped: false, tags_created: 3, translations_created: 10 });
        assert_eq!(catalog.translations().count(), 10);
        assert_eq!(catalog.tags().all_tags().len(), 3);

        let page = catalog
            .search()
            .search(&TranslationFilter::new().with_keys(["key2"]), PageRequest::new(0, 10).unwrap());
        let row = &page.content[0];
        assert_eq!(row.locale, "en");
        assert_eq!(row.value, "value2");
        assert_eq!(row.tags.iter().collect::<Vec<_>>(), vec!["tag3"]);

        let fr = catalog
            .search()
            .search(&TranslationFilter::new().with_locales(["fr"]), PageRequest::new(0, 10).unwrap());
        assert_eq!(fr.total_elements, 5);
    }

    #[test]
    fn second_run_is_skipped() {
        let catalog = Catalog::in_memory();
        let seeder = Seeder::new(catalog.clone());
        seeder.run(small()).unwrap();

        let report = seeder.run(small()).unwrap();
        assert!(report.skipped);
        assert_eq!(catalog.translations().count(), 10);
    }

    #[test]
    fn partial_store_is_topped_up() {
        let catalog = Catalog::in_memory();
        let seeder = Seeder::new(catalog.clone());
        seeder.run(SeedSection { translation_count: 4, ..small() }).unwrap();

        let report = seeder.run(small()).unwrap();
        assert_eq!(report.tags_created, 0);
        assert_eq!(report.translations_created, 6);
        assert_eq!(catalog.translations().count(), 10);
    }

    #[test]
    fn zero_tags_seeds_untagged_rows() {
        let catalog = Catalog::in_memory();
        let config = SeedSection { tag_count: 0, ..small() };
        let report = Seeder::new(catalog.clone()).run(config).unwrap();
        assert_eq!(report.translations_created, 10);
        assert_eq!(catalog.store().read(|tables| tables.link_count()), 0);
    }
}
