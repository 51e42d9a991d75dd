//! Request and response objects exchanged with the catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use specta::Type;

use crate::model::{Tag, TagId, Translation, TranslationId, format_timestamp};

const DEFAULT_SEARCH_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    /// Accepted for wire compatibility; creation always assigns a fresh id.
    #[serde(default)]
    pub id: Option<TagId>,
    pub name: String,
}

impl TagRequest {
    pub fn named(name: impl Into<String>) -> Self {
        TagRequest { id: None, name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: TagId,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        TagResponse { id: tag.id, name: tag.name }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub key: String,
    pub locale: String,
    pub value: String,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl TranslationRequest {
    pub fn new(
        key: impl Into<String>,
        locale: impl Into<String>,
        value: impl Into<String>,
        tag_ids: impl IntoIterator<Item = TagId>,
    ) -> Self {
        TranslationRequest {
            key: key.into(),
            locale: locale.into(),
            value: value.into(),
            tag_ids: tag_ids.into_iter().collect(),
        }
    }
}

/// A translation with its tag names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResponse {
    pub id: TranslationId,
    pub key: String,
    pub locale: String,
    pub value: String,
    pub tags: BTreeSet<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TranslationResponse {
    pub(crate) fn from_row(row: &Translation, tags: BTreeSet<String>) -> Self {
        TranslationResponse {
            id: row.id,
            key: row.key.clone(),
            locale: row.locale.clone(),
            value: row.value.clone(),
            tags,
            created_at: format_timestamp(row.created_at),
            updated_at: format_timestamp(row.updated_at),
        }
    }
}

/// Search body: every filter is optional, paging defaults to `page=0, size=50`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
pub struct TranslationSearchRequest {
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub locales: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_search_size")]
    pub size: i64,
}

impl Default for TranslationSearchRequest {
    fn default() -> Self {
        TranslationSearchRequest {
            keys: None,
            values: None,
            locales: None,
            tags: None,
            page: 0,
            size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }
}

fn default_search_size() -> i64 {
    DEFAULT_SEARCH_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn search_request_defaults_paging() {
        let request: TranslationSearchRequest =
            serde_json::from_value(json!({ "locales": ["en"] })).unwrap();
        assert_eq!(request.page, 0);
        assert_eq!(request.size, 50);
        assert_eq!(request.locales, Some(vec!["en".to_string()]));
        assert_eq!(request.keys, None);
    }

    #[test]
    fn translation_request_reads_camel_case_tag_ids() {
        let id = TagId::generate();
        let request: TranslationRequest = serde_json::from_value(json!({
            "key": "login.title",
            "locale": "en",
            "value": "Login",
            "tagIds": [id],
        }))
        .unwrap();
        assert_eq!(request.tag_ids, vec![id]);
    }

    #[test]
    fn tag_request_id_is_optional() {
        let request: TagRequest = serde_json::from_value(json!({ "name": "ui" })).unwrap();
        assert_eq!(request, TagRequest::named("ui"));
    }
}
