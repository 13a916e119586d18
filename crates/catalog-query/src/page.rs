//! Pagination over [`QuerySource`] backends.
//!
//! # Purpose
//! Produces one page of a query's results together with the total number of
//! rows that matched before the window was applied, so HTTP handlers can
//! report it (for example as a response header).
//!
//! # Key invariants
//! - `page` is 1-based; values below 1 behave as page 1.
//! - `offset = (page - 1) * records_per_page`.
//! - `total` counts filtered rows and never depends on the window.
use crate::query::{Query, Window};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_RECORDS_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_records_per_page")]
    pub records_per_page: u32,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_records_per_page() -> u32 {
    DEFAULT_RECORDS_PER_PAGE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, records_per_page: u32) -> Self {
        Self {
            page,
            records_per_page,
        }
    }

    pub fn offset(&self) -> usize {
        let page = self.page.max(1) as usize;
        (page - 1).saturating_mul(self.records_per_page as usize)
    }

    pub fn window(&self) -> Window {
        Window {
            offset: self.offset(),
            limit: self.records_per_page as usize,
        }
    }
}

/// One page of results plus the pre-window match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Backend able to evaluate a [`Query`] over rows of type `T`.
#[async_trait]
pub trait QuerySource<T: Send + Sync + 'static>: Send + Sync {
    type Error: Send;

    /// Count rows matching the query's predicates; the window is ignored.
    async fn count(&self, query: &Query<T>) -> Result<u64, Self::Error>;

    /// Fetch matching rows in query order, honouring the window when present.
    async fn fetch(&self, query: &Query<T>) -> Result<Vec<T>, Self::Error>;
}

/// Count the filtered set, then fetch the requested window of it.
pub async fn paginate<T, S>(
    source: &S,
    query: &Query<T>,
    pagination: Pagination,
) -> Result<Page<T>, S::Error>
where
    T: Send + Sync + 'static,
    S: QuerySource<T> + ?Sized,
{
    let total = source.count(&query.unwindowed()).await?;
    let windowed = query.clone().window(pagination.window());
    let items = source.fetch(&windowed).await?;
    Ok(Page { total, items })
}
