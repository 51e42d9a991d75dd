use anyhow::Result;
use tracing::{debug, info};

use super::{
    association,
    dto::{TranslationRequest, TranslationResponse},
    page::{Page, PageRequest},
};
use crate::{
    error::CoreError,
    model::{Translation, TranslationId},
    store::{EntityStore, Tables},
};

/// Create, read, update and delete translations together with their tags.
#[derive(Debug, Clone)]
pub struct TranslationManager {
    store: EntityStore,
}

impl TranslationManager {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Create a batch of translations in one transaction.
    ///
    /// Unknown tag ids are dropped. A key/locale pair that already exists, in
    /// the store or earlier in the batch, rejects the whole batch.
    pub fn create_translations(
        &self,
        requests: Vec<TranslationRequest>,
    ) -> Result<Vec<TranslationResponse>> {
        for request in &requests {
            validate(request)?;
        }
        let requested = requests.len();

        let created = self.store.transaction(|tables| {
            let mut created = Vec::with_capacity(requests.len());
            for request in requests {
                let TranslationRequest { key, locale, value, tag_ids } = request;
                let row = Translation::new(key, locale, value);
                let id = row.id;
                tables.insert_translation(row)?;
                association::attach_tags(tables, &id, tag_ids);
                created.push(id);
            }
            let tables: &Tables = tables;
            Ok(created.iter().filter_map(|id| view(tables, id)).collect::<Vec<_>>())
        })?;

        info!(requested, created = created.len(), "created translations");
        Ok(created)
    }

    /// One page of every translation, in store order.
    pub fn all_translations(&self, request: PageRequest) -> Page<TranslationResponse> {
        self.store.read(|tables| {
            Page::slice(request, tables.translations().map(|row| row_view(tables, row)))
        })
    }

    pub fn translation(&self, id: &TranslationId) -> Result<TranslationResponse> {
        self.store
            .read(|tables| view(tables, id))
            .ok_or_else(|| CoreError::TranslationNotFound { id: *id }.into())
    }

    /// Overwrite key, locale and value, and replace the tag set.
    pub fn update_translation(
        &self,
        id: &TranslationId,
        request: TranslationRequest,
    ) -> Result<TranslationResponse> {
        validate(&request)?;
        let TranslationRequest { key, locale, value, tag_ids } = request;

        let updated = self.store.transaction(|tables| {
            tables.update_translation(id, &key, &locale, &value)?;
            association::replace_tags(tables, id, tag_ids);
            view(tables, id).ok_or_else(|| CoreError::TranslationNotFound { id: *id }.into())
        })?;

        info!(translation_id = %id, key = %updated.key, locale = %updated.locale, "updated translation");
        Ok(updated)
    }

    /// Remove a translation: its links first, then the row, in one transaction.
    pub fn delete_translation(&self, id: &TranslationId) -> Result<()> {
        let unlinked = self.store.transaction(|tables| {
            if tables.translation(id).is_none() {
                return Err(CoreError::TranslationNotFound { id: *id }.into());
            }
            let unlinked = association::clear_tags(tables, id);
            tables.remove_translation(id);
            Ok(unlinked)
        })?;

        info!(translation_id = %id, unlinked, "deleted translation");
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.store.read(Tables::translation_count)
    }
}

/// Load a translation and join its tag names.
pub(crate) fn view(tables: &Tables, id: &TranslationId) -> Option<TranslationResponse> {
    tables.translation(id).map(|row| row_view(tables, row))
}

pub(crate) fn row_view(tables: &Tables, row: &Translation) -> TranslationResponse {
    TranslationResponse::from_row(row, association::tag_names(tables, &row.id))
}

fn validate(request: &TranslationRequest) -> Result<()> {
    if request.key.trim().is_empty() {
        return Err(CoreError::BlankField { field: "key" }.into());
    }
    if request.locale.trim().is_empty() {
        return Err(CoreError::BlankField { field: "locale" }.into());
    }
    debug!(key = %request.key, locale = %request.locale, tags = request.tag_ids.len(), "translation request accepted");
    Ok(())
}
