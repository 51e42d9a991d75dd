//! Entity rows held by the store.

use std::fmt;

use serde::{Deserialize, Serialize};
use specta::Type;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Identifier of a tag.
///
/// Ids are UUID v7, so ascending id order is creation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type,
)]
#[serde(transparent)]
pub struct TagId(Uuid);

impl TagId {
    pub fn generate() -> Self {
        TagId(Uuid::now_v7())
    }
}

impl From<Uuid> for TagId {
    fn from(value: Uuid) -> Self {
        TagId(value)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a translation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type,
)]
#[serde(transparent)]
pub struct TranslationId(Uuid);

impl TranslationId {
    pub fn generate() -> Self {
        TranslationId(Uuid::now_v7())
    }
}

impl From<Uuid> for TranslationId {
    fn from(value: Uuid) -> Self {
        TranslationId(value)
    }
}

impl fmt::Display for TranslationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag { id: TagId::generate(), name: name.into() }
    }
}

/// A translation row. Its tags live in the relation table, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    pub key: String,
    pub locale: String,
    pub value: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Translation {
    pub fn new(key: String, locale: String, value: String) -> Self {
        let now = OffsetDateTime::now_utc();
        Translation {
            id: TranslationId::generate(),
            key,
            locale,
            value,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// A (translation, tag) link row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub translation_id: TranslationId,
    pub tag_id: TagId,
}

pub(crate) fn format_timestamp(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.unix_timestamp().to_string())
}
