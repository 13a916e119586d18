//! Allow-list based sorting for untrusted field names.
//!
//! Clients may name a sort field in a query string. Instead of resolving that
//! name against the row type at runtime, a [`SortRegistry`] maps a fixed set of
//! public names to comparators; anything else is rejected with [`SortError`]
//! and the caller decides on a fallback ordering.
use crate::query::Comparator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    #[error("sort field is empty")]
    Empty,
    #[error("unknown sort field: {0}")]
    UnknownField(String),
}

/// Registry of sortable fields for rows of type `T`.
///
/// Lookups ignore ASCII case, surrounding whitespace, `_` and `-`, so
/// `last_names`, `LastNames` and `last-names` resolve to the same entry.
pub struct SortRegistry<T> {
    fields: BTreeMap<String, Comparator<T>>,
}

impl<T> Default for SortRegistry<T> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }
}

impl<T> Clone for SortRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
        }
    }
}

impl<T: 'static> SortRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<F>(mut self, name: &str, comparator: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.fields.insert(normalize(name), Arc::new(comparator));
        self
    }

    /// Register a field ordered by the natural ordering of an extracted key.
    pub fn by_key<K, F>(self, name: &str, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.field(name, move |left, right| key(left).cmp(&key(right)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&normalize(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Resolve a client supplied field name into a directed comparator.
    pub fn resolve(&self, name: &str, direction: SortDirection) -> Result<Comparator<T>, SortError> {
        let normalized = normalize(name);
        if normalized.is_empty() {
            return Err(SortError::Empty);
        }
        let comparator = self
            .fields
            .get(&normalized)
            .cloned()
            .ok_or_else(|| SortError::UnknownField(name.trim().to_string()))?;
        let directed: Comparator<T> = match direction {
            SortDirection::Ascending => comparator,
            SortDirection::Descending => {
                Arc::new(move |left: &T, right: &T| comparator(left, right).reverse())
            }
        };
        Ok(directed)
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|ch| *ch != '_' && *ch != '-')
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}
