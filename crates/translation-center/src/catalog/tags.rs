use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info};

use super::dto::TagRequest;
use crate::{
    error::CoreError,
    model::{Tag, TagId},
    store::EntityStore,
};

/// CRUD over tags.
#[derive(Debug, Clone)]
pub struct TagManager {
    store: EntityStore,
}

impl TagManager {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Create every requested tag whose name is not taken yet.
    ///
    /// Names that already exist, and repeats within the same request, are left
    /// out of the result without raising an error.
    pub fn create_tags(&self, requests: Vec<TagRequest>) -> Result<Vec<Tag>> {
        let mut names = Vec::with_capacity(requests.len());
        for request in requests {
            if request.name.trim().is_empty() {
                return Err(CoreError::BlankTagName.into());
            }
            names.push(request.name);
        }
        let requested = names.len();

        let created = self.store.transaction(|tables| {
            let mut seen = HashSet::new();
            let mut created = Vec::new();
            for name in names {
                if tables.tag_id_by_name(&name).is_some() || !seen.insert(name.clone()) {
                    continue;
                }
                let tag = Tag::new(name);
                tables.insert_tag(tag.clone())?;
                created.push(tag);
            }
            Ok(created)
        })?;

        info!(requested, created = created.len(), "created tags");
        Ok(created)
    }

    pub fn all_tags(&self) -> Vec<Tag> {
        self.store.read(|tables| tables.tags().cloned().collect())
    }

    pub fn tag(&self, id: &TagId) -> Result<Tag> {
        self.store
            .read(|tables| tables.tag(id).cloned())
            .ok_or_else(|| CoreError::TagNotFound { id: *id }.into())
    }

    /// Delete a tag and its links. Returns false when the tag does not exist.
    pub fn delete_tag(&self, id: &TagId) -> Result<bool> {
        let removed = self.store.transaction(|tables| Ok(tables.remove_tag(id)))?;
        match removed {
            Some(tag) => {
                info!(tag_id = %id, name = %tag.name, "deleted tag");
                Ok(true)
            }
            None => {
                debug!(tag_id = %id, "delete requested for unknown tag");
                Ok(false)
            }
        }
    }

    /// Rename a tag. A name held by another tag is rejected.
    pub fn update_tag(&self, id: &TagId, name: &str) -> Result<Tag> {
        if name.trim().is_empty() {
            return Err(CoreError::BlankTagName.into());
        }
        let tag = self.store.transaction(|tables| tables.rename_tag(id, name).cloned())?;
        info!(tag_id = %id, name = %tag.name, "updated tag");
        Ok(tag)
    }
}
