//! Multi-field translation search.
//!
//! A [`TranslationFilter`] is turned into a list of [`Predicate`]s holding only
//! the fields the caller actually constrained. Predicates are ANDed together;
//! each one is an OR over its own value set. Matching is exact and
//! case-sensitive.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::{
    dto::{TranslationResponse, TranslationSearchRequest},
    page::{Page, PageRequest},
    translations,
};
use crate::{
    model::{Translation, TranslationId},
    store::{EntityStore, Tables},
};

/// Optional constraints on translation fields. `None` and empty sets both mean
/// "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationFilter {
    pub keys: Option<Vec<String>>,
    pub values: Option<Vec<String>>,
    pub locales: Option<Vec<String>>,
    pub tags: Option<BTreeSet<String>>,
}

impl TranslationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_locales<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locales = Some(locales.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Predicates for every non-empty field.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::with_capacity(4);
        if let Some(set) = non_empty(self.keys.iter().flatten()) {
            predicates.push(Predicate::KeyIn(set));
        }
        if let Some(set) = non_empty(self.values.iter().flatten()) {
            predicates.push(Predicate::ValueIn(set));
        }
        if let Some(set) = non_empty(self.locales.iter().flatten()) {
            predicates.push(Predicate::LocaleIn(set));
        }
        if let Some(set) = non_empty(self.tags.iter().flatten()) {
            predicates.push(Predicate::TagNameIn(set));
        }
        predicates
    }
}

fn non_empty<'a>(values: impl Iterator<Item = &'a String>) -> Option<HashSet<String>> {
    let set: HashSet<String> = values.cloned().collect();
    (!set.is_empty()).then_some(set)
}

impl From<&TranslationSearchRequest> for TranslationFilter {
    fn from(request: &TranslationSearchRequest) -> Self {
        TranslationFilter {
            keys: request.keys.clone(),
            values: request.values.clone(),
            locales: request.locales.clone(),
            tags: request.tags.clone(),
        }
    }
}

/// One set-membership test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    KeyIn(HashSet<String>),
    ValueIn(HashSet<String>),
    LocaleIn(HashSet<String>),
    /// At least one linked tag has a name in the set.
    TagNameIn(HashSet<String>),
}

impl Predicate {
    fn matches(&self, tables: &Tables, row: &Translation) -> bool {
        match self {
            Predicate::KeyIn(keys) => keys.contains(&row.key),
            Predicate::ValueIn(values) => values.contains(&row.value),
            Predicate::LocaleIn(locales) => locales.contains(&row.locale),
            Predicate::TagNameIn(names) => tables
                .tag_ids_of(&row.id)
                .filter_map(|id| tables.tag(&id))
                .any(|tag| names.contains(&tag.name)),
        }
    }
}

/// Read-side search over the store.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    store: EntityStore,
}

impl SearchEngine {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Return one page of translations matching every predicate of `filter`.
    pub fn search(
        &self,
        filter: &TranslationFilter,
        request: PageRequest,
    ) -> Page<TranslationResponse> {
        let predicates = filter.predicates();
        self.store.read(|tables| {
            let matches = matching_rows(tables, &predicates);
            debug!(
                predicates = predicates.len(),
                matches = matches.len(),
                page = request.page(),
                size = request.size(),
                "translation search evaluated"
            );
            Page::slice(
                request,
                matches.into_iter().map(|row| translations::row_view(tables, row)),
            )
        })
    }
}

/// Distinct matching translations, in ascending id order.
///
/// With a tag predicate the candidates come from the tag side of the relation,
/// so only translations linked to one of the named tags are visited.
pub(crate) fn matching_rows<'a>(
    tables: &'a Tables,
    predicates: &[Predicate],
) -> Vec<&'a Translation> {
    let tag_names = predicates.iter().find_map(|predicate| match predicate {
        Predicate::TagNameIn(names) => Some(names),
        _ => None,
    });
    let field_predicates: Vec<&Predicate> = predicates
        .iter()
        .filter(|predicate| !matches!(predicate, Predicate::TagNameIn(_)))
        .collect();
    let accepts = |row: &Translation| field_predicates.iter().all(|p| p.matches(tables, row));

    match tag_names {
        Some(names) => {
            let candidates: BTreeSet<TranslationId> = names
                .iter()
                .filter_map(|name| tables.tag_id_by_name(name))
                .flat_map(|tag| tables.translation_ids_tagged(&tag))
                .collect();
            candidates
                .iter()
                .filter_map(|id| tables.translation(id))
                .filter(|row| accepts(row))
                .collect()
        }
        None => tables.translations().filter(|row| accepts(row)).collect(),
    }
}

/// Split a wire search request into its filter and validated page position.
pub fn split_request(
    request: &TranslationSearchRequest,
) -> anyhow::Result<(TranslationFilter, PageRequest)> {
    let page = PageRequest::new(request.page, request.size)?;
    Ok((TranslationFilter::from(request), page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;

    struct Data {
        tables: Tables,
        login_en: TranslationId,
        login_fr: TranslationId,
        logout_en: TranslationId,
        plain_de: TranslationId,
    }

    fn data() -> Data {
        let mut tables = Tables::default();
        let ui = Tag::new("ui");
        let web = Tag::new("web");
        let team = Tag::new("en-team");
        let (ui_id, web_id, team_id) = (ui.id, web.id, team.id);
        for tag in [ui, web, team] {
            tables.insert_tag(tag).unwrap();
        }

        let mut insert = |key: &str, locale: &str, value: &str, tags: &[crate::model::TagId]| {
            let row = Translation::new(key.into(), locale.into(), value.into());
            let id = row.id;
            tables.insert_translation(row).unwrap();
            for tag in tags {
                tables.link(&id, tag);
            }
            id
        };
        let login_en = insert("login.title", "en", "Login", &[ui_id, web_id, team_id]);
        let login_fr = insert("login.title", "fr", "Connexion", &[ui_id]);
        let logout_en = insert("logout", "en", "Logout", &[web_id]);
        let plain_de = insert("login.title", "de", "Anmelden", &[]);

        Data { tables, login_en, login_fr, logout_en, plain_de }
    }

    fn run(data: &Data, filter: &TranslationFilter) -> Vec<TranslationId> {
        matching_rows(&data.tables, &filter.predicates()).into_iter().map(|row| row.id).collect()
    }

    #[test]
    fn empty_filter_matches_everything_in_id_order() {
        let d = data();
        let ids = run(&d, &TranslationFilter::new());
        assert_eq!(ids, vec![d.login_en, d.login_fr, d.logout_en, d.plain_de]);
    }

    #[test]
    fn empty_sets_are_pass_through() {
        let d = data();
        let filter = TranslationFilter::new()
            .with_keys(Vec::<String>::new())
            .with_tags(Vec::<String>::new());
        assert!(filter.predicates().is_empty());
        assert_eq!(run(&d, &filter).len(), 4);
    }

    #[test]
    fn fields_are_anded_and_values_ored() {
        let d = data();
        let filter = TranslationFilter::new().with_locales(["en", "fr"]).with_keys(["login.title"]);
        assert_eq!(run(&d, &filter), vec![d.login_en, d.login_fr]);

        let filter = TranslationFilter::new().with_values(["Logout", "Anmelden"]);
        assert_eq!(run(&d, &filter), vec![d.logout_en, d.plain_de]);
    }

    #[test]
    fn tag_filter_matches_any_tag_and_is_distinct() {
        let d = data();
        let filter = TranslationFilter::new().with_tags(["ui", "web", "en-team"]);
        assert_eq!(run(&d, &filter), vec![d.login_en, d.login_fr, d.logout_en]);
    }

    #[test]
    fn unknown_tag_names_match_nothing() {
        let d = data();
        let filter = TranslationFilter::new().with_tags(["missing"]);
        assert!(run(&d, &filter).is_empty());
    }

    #[test]
    fn matching_is_exact() {
        let d = data();
        assert!(run(&d, &TranslationFilter::new().with_keys(["login"])).is_empty());
        assert!(run(&d, &TranslationFilter::new().with_locales(["EN"])).is_empty());
        assert!(run(&d, &TranslationFilter::new().with_tags(["UI"])).is_empty());
    }

    #[test]
    fn adding_constraints_never_grows_the_result() {
        let d = data();
        let steps = [
            TranslationFilter::new(),
            TranslationFilter::new().with_keys(["login.title", "logout"]),
            TranslationFilter::new().with_keys(["login.title", "logout"]).with_locales(["en"]),
            TranslationFilter::new()
                .with_keys(["login.title", "logout"])
                .with_locales(["en"])
                .with_tags(["ui"]),
            TranslationFilter::new()
                .with_keys(["login.title", "logout"])
                .with_locales(["en"])
                .with_tags(["ui"])
                .with_values(["Nope"]),
        ];
        let mut previous: Option<BTreeSet<TranslationId>> = None;
        for filter in &steps {
            let current: BTreeSet<_> = run(&d, filter).into_iter().collect();
            if let Some(previous) = &previous {
                assert!(current.is_subset(previous), "{filter:?} widened the result");
            }
            previous = Some(current);
        }
        assert_eq!(previous.map(|set| set.len()), Some(0));
    }

    #[test]
    fn tag_predicate_also_checks_row_side() {
        let d = data();
        let tag_names = HashSet::from(["web".to_string()]);
        let predicate = Predicate::TagNameIn(tag_names);
        let row = d.tables.translation(&d.logout_en).unwrap();
        assert!(predicate.matches(&d.tables, row));
        let row = d.tables.translation(&d.login_fr).unwrap();
        assert!(!predicate.matches(&d.tables, row));
    }

    #[test]
    fn split_request_validates_paging() {
        let request = TranslationSearchRequest { size: 0, ..TranslationSearchRequest::default() };
        assert!(split_request(&request).is_err());

        let request = TranslationSearchRequest {
            locales: Some(vec!["en".into()]),
            ..TranslationSearchRequest::default()
        };
        let (filter, page) = split_request(&request).unwrap();
        assert_eq!(filter.locales, Some(vec!["en".to_string()]));
        assert_eq!(page.size(), 50);
    }
}
