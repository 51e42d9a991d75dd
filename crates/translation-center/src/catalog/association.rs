//! Translation ↔ tag relation handling.
//!
//! Every join between translations and tags goes through these functions; rows
//! never carry their tags implicitly.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    model::{TagId, TranslationId},
    store::Tables,
};

/// Keep only ids of tags that exist. Duplicates collapse.
pub fn resolve_tags(tables: &Tables, ids: impl IntoIterator<Item = TagId>) -> BTreeSet<TagId> {
    ids.into_iter().filter(|id| tables.tag(id).is_some()).collect()
}

/// Link a translation to every tag in `ids` that exists.
pub fn attach_tags(
    tables: &mut Tables,
    translation: &TranslationId,
    ids: impl IntoIterator<Item = TagId>,
) -> BTreeSet<TagId> {
    let resolved = resolve_tags(tables, ids);
    for tag in &resolved {
        tables.link(translation, tag);
    }
    resolved
}

/// Replace the whole tag set of a translation.
pub fn replace_tags(
    tables: &mut Tables,
    translation: &TranslationId,
    ids: impl IntoIterator<Item = TagId>,
) -> BTreeSet<TagId> {
    let removed = clear_tags(tables, translation);
    let attached = attach_tags(tables, translation, ids);
    debug!(
        translation = %translation,
        removed,
        attached = attached.len(),
        "replaced translation tags"
    );
    attached
}

/// Drop every link of a translation.
pub fn clear_tags(tables: &mut Tables, translation: &TranslationId) -> usize {
    tables.unlink_all(translation)
}

/// Names of the tags linked to a translation.
pub fn tag_names(tables: &Tables, translation: &TranslationId) -> BTreeSet<String> {
    tables
        .tag_ids_of(translation)
        .filter_map(|id| tables.tag(&id))
        .map(|tag| tag.name.clone())
        .collect()
}
