//! Author search: turns loosely typed filter input into a bounded query.
//!
//! # Key invariants
//! - Every supplied criterion narrows the result (AND semantics); absent or
//!   empty criteria impose nothing.
//! - Client supplied sort names only ever resolve through the allow-list in
//!   [`author_sort_fields`]. Unknown names degrade to `names` ascending with a
//!   warning instead of failing the request.
//! - Building never executes the query.
use crate::api::types::{AuthorResponse, AuthorWithBooksResponse};
use crate::hypermedia::{Decorator, Listing};
use crate::model::AuthorRecord;
use catalog_query::page::{DEFAULT_PAGE, DEFAULT_RECORDS_PER_PAGE};
use catalog_query::{Pagination, Query, SortDirection, SortRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::IntoParams;

pub const DEFAULT_SORT_FIELD: &str = "names";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorFilter {
    /// Substring of the author's names.
    pub names: Option<String>,
    /// Substring of the author's last names.
    pub last_names: Option<String>,
    pub has_picture: Option<bool>,
    pub has_books: Option<bool>,
    /// Substring of any credited book title.
    pub book_title: Option<String>,
    #[serde(default)]
    pub include_books: bool,
    /// Field to order by; unknown fields fall back to `names`.
    pub order_field: Option<String>,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_records_per_page")]
    pub records_per_page: u32,
}

fn default_ascending() -> bool {
    true
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_records_per_page() -> u32 {
    DEFAULT_RECORDS_PER_PAGE
}

impl Default for AuthorFilter {
    fn default() -> Self {
        Self {
            names: None,
            last_names: None,
            has_picture: None,
            has_books: None,
            book_title: None,
            include_books: false,
            order_field: None,
            ascending: true,
            page: DEFAULT_PAGE,
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
        }
    }
}

impl AuthorFilter {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.records_per_page)
    }
}

/// Fields clients may sort authors by.
pub fn author_sort_fields() -> SortRegistry<AuthorRecord> {
    SortRegistry::new()
        .by_key("id", |row: &AuthorRecord| row.author.id)
        .by_key("names", |row: &AuthorRecord| row.author.names.clone())
        .by_key("last_names", |row: &AuthorRecord| {
            row.author.last_names.clone()
        })
        .by_key("identification", |row: &AuthorRecord| {
            row.author.identification.clone()
        })
        .by_key("full_name", |row: &AuthorRecord| row.author.full_name())
}

fn by_id() -> catalog_query::Comparator<AuthorRecord> {
    Arc::new(|left: &AuthorRecord, right: &AuthorRecord| left.author.id.cmp(&right.author.id))
}

fn by_names() -> catalog_query::Comparator<AuthorRecord> {
    Arc::new(|left: &AuthorRecord, right: &AuthorRecord| {
        left.author.names.cmp(&right.author.names)
    })
}

/// Unfiltered author listing ordered by names.
pub fn all_authors_query() -> Query<AuthorRecord> {
    Query::new().order_by(by_names()).then_by(by_id())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|value| !value.is_empty()).cloned()
}

pub fn build_author_query(
    filter: &AuthorFilter,
    sort_fields: &SortRegistry<AuthorRecord>,
) -> Query<AuthorRecord> {
    let mut query = Query::new();

    if let Some(names) = non_empty(&filter.names) {
        query = query.filter(move |row: &AuthorRecord| row.author.names.contains(names.as_str()));
    }
    if let Some(last_names) = non_empty(&filter.last_names) {
        query = query.filter(move |row: &AuthorRecord| {
            row.author.last_names.contains(last_names.as_str())
        });
    }
    if let Some(has_picture) = filter.has_picture {
        query = query.filter(move |row: &AuthorRecord| row.author.picture.is_some() == has_picture);
    }
    if let Some(has_books) = filter.has_books {
        query = query.filter(move |row: &AuthorRecord| !row.books.is_empty() == has_books);
    }
    if let Some(title) = non_empty(&filter.book_title) {
        query = query.filter(move |row: &AuthorRecord| {
            row.books
                .iter()
                .any(|book| book.title.contains(title.as_str()))
        });
    }

    let ordering = match filter.order_field.as_deref().map(str::trim) {
        None | Some("") => by_names(),
        Some(field) => {
            let direction = SortDirection::from_ascending(filter.ascending);
            sort_fields.resolve(field, direction).unwrap_or_else(|err| {
                tracing::warn!(
                    order_field = field,
                    error = %err,
                    "unsupported author sort field; ordering by names"
                );
                by_names()
            })
        }
    };

    query
        .order_by(ordering)
        .then_by(by_id())
        .window(filter.pagination().window())
}

/// Author list body in the shape the caller asked for.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AuthorListing {
    Summaries(Listing<AuthorResponse>),
    WithBooks(Listing<AuthorWithBooksResponse>),
}

impl AuthorListing {
    pub fn project(
        records: Vec<AuthorRecord>,
        include_books: bool,
        decorator: Option<Decorator<'_>>,
    ) -> Self {
        if include_books {
            let items = records
                .into_iter()
                .map(AuthorWithBooksResponse::from)
                .collect();
            AuthorListing::WithBooks(Listing::build(items, decorator))
        } else {
            let items = records
                .into_iter()
                .map(|record| AuthorResponse::from(record.author))
                .collect();
            AuthorListing::Summaries(Listing::build(items, decorator))
        }
    }
}
