//! Storage-agnostic query building blocks for the catalog service.
//!
//! # Purpose
//! Provides a lazily evaluated [`Query`] description, an allow-list based
//! [`SortRegistry`] for untrusted "order by" input, and the [`paginate`]
//! helper that reports the pre-window total next to the requested page.
//!
//! # Notes
//! Nothing in this crate executes I/O. Backends implement [`QuerySource`] and
//! decide how a query is evaluated.
pub mod page;
pub mod query;
pub mod sort;

pub use page::{Page, Pagination, QuerySource, paginate};
pub use query::{Comparator, Predicate, Query, Window};
pub use sort::{SortDirection, SortError, SortRegistry};
