//! Translation catalog: tags, translations, their relation, search and export.

pub mod association;
pub mod dto;
pub mod export;
pub mod page;
pub mod search;
pub mod tags;
pub mod translations;

pub use dto::{TagRequest, TagResponse, TranslationRequest, TranslationResponse, TranslationSearchRequest};
pub use export::{ExportAggregator, ExportMap};
pub use page::{MAX_PAGE_SIZE, Page, PageRequest};
pub use search::{Predicate, SearchEngine, TranslationFilter};
pub use tags::TagManager;
pub use translations::TranslationManager;

use crate::store::EntityStore;

/// Every catalog service wired to one shared store.
#[derive(Debug, Clone)]
pub struct Catalog {
    store: EntityStore,
    tags: TagManager,
    translations: TranslationManager,
    search: SearchEngine,
    export: ExportAggregator,
}

impl Catalog {
    pub fn new(store: EntityStore) -> Self {
        Self {
            tags: TagManager::new(store.clone()),
            translations: TranslationManager::new(store.clone()),
            search: SearchEngine::new(store.clone()),
            export: ExportAggregator::new(store.clone()),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(EntityStore::in_memory())
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn tags(&self) -> &TagManager {
        &self.tags
    }

    pub fn translations(&self) -> &TranslationManager {
        &self.translations
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn export(&self) -> &ExportAggregator {
        &self.export
    }
}
