use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use tracing::warn;

use super::{journal::JournalEntry, snapshot::CatalogSnapshot};
use crate::{
    error::CoreError,
    model::{Link, Tag, TagId, Translation, TranslationId},
};

/// Row-level effect of one write.
///
/// Carries the prior row where there is one, so a failed transaction can be
/// rolled back in place and a committed one appended to the journal.
#[derive(Debug, Clone)]
pub(crate) enum Change {
    TagPut { before: Option<Tag>, after: Tag },
    TagRemoved(Tag),
    TranslationPut { before: Option<Translation>, after: Translation },
    TranslationRemoved(Translation),
    Linked(Link),
    Unlinked(Link),
}

/// In-memory rows plus the indexes that enforce uniqueness and drive joins.
///
/// Both directions of the relation are kept so a tag filter can start from the
/// tag side and a translation can list its tags without a scan. Relation sets
/// are never left empty in either map. The (key, locale) index holds every row
/// carrying the pair, so rows duplicated by a hand-edited snapshot keep the
/// pair claimed until the last of them is gone.
#[derive(Debug, Default)]
pub struct Tables {
    tags: BTreeMap<TagId, Tag>,
    tag_names: HashMap<String, TagId>,
    translations: BTreeMap<TranslationId, Translation>,
    key_locale: HashMap<(String, String), BTreeSet<TranslationId>>,
    links: BTreeMap<TranslationId, BTreeSet<TagId>>,
    tag_links: BTreeMap<TagId, BTreeSet<TranslationId>>,
    changes: Vec<Change>,
}

impl Tables {
    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.get(id)
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn tag_id_by_name(&self, name: &str) -> Option<TagId> {
        self.tag_names.get(name).copied()
    }

    pub fn translation(&self, id: &TranslationId) -> Option<&Translation> {
        self.translations.get(id)
    }

    /// Every translation in ascending id order.
    pub fn translations(&self) -> impl ExactSizeIterator<Item = &Translation> {
        self.translations.values()
    }

    pub fn translation_count(&self) -> usize {
        self.translations.len()
    }

    /// The newest row holding the pair.
    pub fn translation_id_by_key(&self, key: &str, locale: &str) -> Option<TranslationId> {
        self.key_locale
            .get(&(key.to_string(), locale.to_string()))
            .and_then(|ids| ids.last().copied())
    }

    /// Tag ids linked to a translation.
    pub fn tag_ids_of<'a>(
        &'a self,
        translation: &TranslationId,
    ) -> impl Iterator<Item = TagId> + use<'a> {
        self.links.get(translation).into_iter().flat_map(|ids| ids.iter().copied())
    }

    /// Translation ids linked to a tag.
    pub fn translation_ids_tagged<'a>(
        &'a self,
        tag: &TagId,
    ) -> impl Iterator<Item = TranslationId> + use<'a> {
        self.tag_links.get(tag).into_iter().flat_map(|ids| ids.iter().copied())
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(BTreeSet::len).sum()
    }

    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.links.iter().flat_map(|(translation_id, tags)| {
            tags.iter().map(move |tag_id| Link { translation_id: *translation_id, tag_id: *tag_id })
        })
    }

    fn has_link(&self, link: &Link) -> bool {
        self.links.get(&link.translation_id).is_some_and(|tags| tags.contains(&link.tag_id))
    }

    fn pair_taken_by_other(&self, key: &str, locale: &str, id: &TranslationId) -> bool {
        self.key_locale
            .get(&(key.to_string(), locale.to_string()))
            .is_some_and(|ids| ids.iter().any(|owner| owner != id))
    }

    pub fn insert_tag(&mut self, tag: Tag) -> Result<()> {
        if self.tag_names.contains_key(&tag.name) {
            return Err(CoreError::TagNameConflict { name: tag.name }.into());
        }
        self.changes.push(Change::TagPut { before: None, after: tag.clone() });
        self.put_tag_row(tag);
        Ok(())
    }

    pub fn rename_tag(&mut self, id: &TagId, name: &str) -> Result<&Tag> {
        let current = self.tags.get(id).ok_or(CoreError::TagNotFound { id: *id })?;
        if current.name != name {
            if self.tag_names.contains_key(name) {
                return Err(CoreError::TagNameConflict { name: name.to_string() }.into());
            }
            let after = Tag { id: *id, name: name.to_string() };
            let before = self.put_tag_row(after.clone());
            self.changes.push(Change::TagPut { before, after });
        }
        self.tags.get(id).ok_or_else(|| CoreError::TagNotFound { id: *id }.into())
    }

    /// Remove a tag and every link that points at it.
    pub fn remove_tag(&mut self, id: &TagId) -> Option<Tag> {
        if !self.tags.contains_key(id) {
            return None;
        }
        let linked: Vec<TranslationId> = self.translation_ids_tagged(id).collect();
        for translation_id in linked {
            self.unlink(Link { translation_id, tag_id: *id });
        }
        let tag = self.remove_tag_row(id)?;
        self.changes.push(Change::TagRemoved(tag.clone()));
        Some(tag)
    }

    pub fn insert_translation(&mut self, row: Translation) -> Result<()> {
        if self.pair_taken_by_other(&row.key, &row.locale, &row.id) {
            return Err(CoreError::TranslationConflict { key: row.key, locale: row.locale }.into());
        }
        self.changes.push(Change::TranslationPut { before: None, after: row.clone() });
        self.put_translation_row(row);
        Ok(())
    }

    /// Overwrite key, locale and value of an existing translation.
    pub fn update_translation(
        &mut self,
        id: &TranslationId,
        key: &str,
        locale: &str,
        value: &str,
    ) -> Result<&Translation> {
        let current =
            self.translations.get(id).ok_or(CoreError::TranslationNotFound { id: *id })?;
        let rekeyed = current.key != key || current.locale != locale;
        if rekeyed && self.pair_taken_by_other(key, locale, id) {
            return Err(CoreError::TranslationConflict {
                key: key.to_string(),
                locale: locale.to_string(),
            }
            .into());
        }

        let mut after = current.clone();
        after.key = key.to_string();
        after.locale = locale.to_string();
        after.value = value.to_string();
        after.touch();
        let before = self.put_translation_row(after.clone());
        self.changes.push(Change::TranslationPut { before, after });
        self.translations.get(id).ok_or_else(|| CoreError::TranslationNotFound { id: *id }.into())
    }

    /// Remove a translation row. Any links still attached go with it.
    pub fn remove_translation(&mut self, id: &TranslationId) -> Option<Translation> {
        if !self.translations.contains_key(id) {
            return None;
        }
        self.unlink_all(id);
        let row = self.remove_translation_row(id)?;
        self.changes.push(Change::TranslationRemoved(row.clone()));
        Some(row)
    }

    /// Link a translation to a tag. Returns false when either side is missing
    /// or the pair already exists.
    pub fn link(&mut self, translation: &TranslationId, tag: &TagId) -> bool {
        let link = Link { translation_id: *translation, tag_id: *tag };
        let inserted = self.link_row(link);
        if inserted {
            self.changes.push(Change::Linked(link));
        }
        inserted
    }

    /// Drop every link of a translation, returning how many were removed.
    pub fn unlink_all(&mut self, translation: &TranslationId) -> usize {
        let tags: Vec<TagId> = self.tag_ids_of(translation).collect();
        tags.into_iter()
            .filter(|tag_id| self.unlink(Link { translation_id: *translation, tag_id: *tag_id }))
            .count()
    }

    fn unlink(&mut self, link: Link) -> bool {
        let removed = self.unlink_row(link);
        if removed {
            self.changes.push(Change::Unlinked(link));
        }
        removed
    }

    /// Hand over the changes recorded since the last call.
    pub(crate) fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    /// Revert `changes`, newest first.
    pub(crate) fn undo(&mut self, changes: Vec<Change>) {
        for change in changes.into_iter().rev() {
            match change {
                Change::TagPut { before: Some(before), .. } => {
                    self.put_tag_row(before);
                }
                Change::TagPut { before: None, after } => {
                    self.remove_tag_row(&after.id);
                }
                Change::TagRemoved(tag) => {
                    self.put_tag_row(tag);
                }
                Change::TranslationPut { before: Some(before), .. } => {
                    self.put_translation_row(before);
                }
                Change::TranslationPut { before: None, after } => {
                    self.remove_translation_row(&after.id);
                }
                Change::TranslationRemoved(row) => {
                    self.put_translation_row(row);
                }
                Change::Linked(link) => {
                    self.unlink_row(link);
                }
                Change::Unlinked(link) => {
                    self.link_row(link);
                }
            }
        }
    }

    /// Replay one journal entry. Entries are idempotent, so replaying a
    /// journal over a snapshot that already holds its effects is harmless.
    pub(crate) fn apply(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::PutTag { tag } => {
                self.put_tag_row(tag);
            }
            JournalEntry::RemoveTag { id } => {
                self.remove_tag_row(&id);
            }
            JournalEntry::PutTranslation { row } => {
                self.put_translation_row(row);
            }
            JournalEntry::RemoveTranslation { id } => {
                self.remove_translation_row(&id);
            }
            JournalEntry::Link { link } => {
                self.link_row(link);
            }
            JournalEntry::Unlink { link } => {
                self.unlink_row(link);
            }
        }
    }

    fn put_tag_row(&mut self, tag: Tag) -> Option<Tag> {
        let (id, name) = (tag.id, tag.name.clone());
        let previous = self.tags.insert(id, tag);
        if let Some(old) = &previous {
            if self.tag_names.get(&old.name) == Some(&id) {
                self.tag_names.remove(&old.name);
            }
        }
        self.tag_names.insert(name, id);
        previous
    }

    fn remove_tag_row(&mut self, id: &TagId) -> Option<Tag> {
        let tag = self.tags.remove(id)?;
        if self.tag_names.get(&tag.name) == Some(id) {
            self.tag_names.remove(&tag.name);
        }
        Some(tag)
    }

    fn put_translation_row(&mut self, row: Translation) -> Option<Translation> {
        let id = row.id;
        let pair = (row.key.clone(), row.locale.clone());
        let previous = self.translations.insert(id, row);
        if let Some(old) = &previous {
            self.unindex_pair(old, &id);
        }
        self.key_locale.entry(pair).or_default().insert(id);
        previous
    }

    fn remove_translation_row(&mut self, id: &TranslationId) -> Option<Translation> {
        let row = self.translations.remove(id)?;
        self.unindex_pair(&row, id);
        Some(row)
    }

    fn unindex_pair(&mut self, row: &Translation, id: &TranslationId) {
        let pair = (row.key.clone(), row.locale.clone());
        if let Some(ids) = self.key_locale.get_mut(&pair) {
            ids.remove(id);
            if ids.is_empty() {
                self.key_locale.remove(&pair);
            }
        }
    }

    fn link_row(&mut self, link: Link) -> bool {
        if !self.translations.contains_key(&link.translation_id)
            || !self.tags.contains_key(&link.tag_id)
        {
            return false;
        }
        let inserted = self.links.entry(link.translation_id).or_default().insert(link.tag_id);
        if inserted {
            self.tag_links.entry(link.tag_id).or_default().insert(link.translation_id);
        }
        inserted
    }

    fn unlink_row(&mut self, link: Link) -> bool {
        let Some(tags) = self.links.get_mut(&link.translation_id) else {
            return false;
        };
        let removed = tags.remove(&link.tag_id);
        if tags.is_empty() {
            self.links.remove(&link.translation_id);
        }
        if let Some(translations) = self.tag_links.get_mut(&link.tag_id) {
            translations.remove(&link.translation_id);
            if translations.is_empty() {
                self.tag_links.remove(&link.tag_id);
            }
        }
        removed
    }

    pub(crate) fn to_snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            tags: self.tags.values().cloned().collect(),
            translations: self.translations.values().cloned().collect(),
            links: self.links().collect(),
        }
    }

    /// Rebuild tables and indexes from a snapshot, dropping rows that would
    /// break the relation invariants.
    pub(crate) fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut tables = Tables::default();

        for tag in snapshot.tags {
            if tables.tag_names.contains_key(&tag.name) {
                warn!(tag = %tag.name, "skipping tag with duplicate name in snapshot");
                continue;
            }
            tables.put_tag_row(tag);
        }

        let mut translations = snapshot.translations;
        translations.sort_by_key(|row| row.id);
        for row in translations {
            if tables.pair_taken_by_other(&row.key, &row.locale, &row.id) {
                warn!(
                    key = %row.key,
                    locale = %row.locale,
                    "snapshot holds duplicate key/locale pair; keeping both rows"
                );
            }
            tables.put_translation_row(row);
        }

        let mut dropped = 0usize;
        for link in snapshot.links {
            if !tables.link_row(link) && !tables.has_link(&link) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped snapshot links that reference missing rows");
        }

        tables
    }
}
