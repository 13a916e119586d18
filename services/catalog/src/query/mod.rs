//! Query builders for the catalog's list and search endpoints.
//!
//! Builders only compose a [`catalog_query::Query`]; evaluation happens in
//! the store through [`catalog_query::QuerySource`].
pub mod authors;
pub mod books;

pub use authors::{AuthorFilter, AuthorListing, all_authors_query, author_sort_fields, build_author_query};
pub use books::books_by_title;
