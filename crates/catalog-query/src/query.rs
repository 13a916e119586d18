//! Lazily evaluated query description.
//!
//! A [`Query`] accumulates predicates, an ordering chain and an optional
//! result window. Building a query never touches data; a backend evaluates it
//! with [`Query::run`] / [`Query::count`] (or its own translation).
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Boolean test applied to every candidate row.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Total ordering between two rows.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Offset/limit slice applied after filtering and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

/// Composable, side-effect free query over rows of type `T`.
///
/// # Invariants
/// - Predicates combine with AND semantics.
/// - Orderings apply in insertion order; later ones only break ties.
/// - The window is applied last, and [`Query::count`] ignores it.
pub struct Query<T> {
    predicates: Vec<Predicate<T>>,
    orderings: Vec<Comparator<T>>,
    window: Option<Window>,
}

impl<T> Default for Query<T> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
            orderings: Vec::new(),
            window: None,
        }
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            orderings: self.orderings.clone(),
            window: self.window,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("predicates", &self.predicates.len())
            .field("orderings", &self.orderings.len())
            .field("window", &self.window)
            .finish()
    }
}

impl<T> Query<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Replace the ordering chain with a single comparator.
    pub fn order_by(mut self, comparator: Comparator<T>) -> Self {
        self.orderings.clear();
        self.orderings.push(comparator);
        self
    }

    /// Append a tie-breaking comparator.
    pub fn then_by(mut self, comparator: Comparator<T>) -> Self {
        self.orderings.push(comparator);
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// Same query without its window; used to count the full result set.
    pub fn unwindowed(&self) -> Self {
        let mut query = self.clone();
        query.window = None;
        query
    }

    pub fn current_window(&self) -> Option<Window> {
        self.window
    }

    pub fn is_ordered(&self) -> bool {
        !self.orderings.is_empty()
    }

    pub fn matches(&self, row: &T) -> bool {
        self.predicates.iter().all(|predicate| predicate(row))
    }

    pub fn compare(&self, left: &T, right: &T) -> Ordering {
        self.orderings
            .iter()
            .map(|comparator| comparator(left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Number of rows matching every predicate, ignoring the window.
    pub fn count<'a, I>(&self, rows: I) -> usize
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        rows.into_iter().filter(|row| self.matches(row)).count()
    }

    /// Filter, order and window `rows`, cloning the survivors.
    pub fn run<'a, I>(&self, rows: I) -> Vec<T>
    where
        I: IntoIterator<Item = &'a T>,
        T: Clone + 'a,
    {
        let mut selected: Vec<&T> = rows.into_iter().filter(|row| self.matches(row)).collect();
        if self.is_ordered() {
            selected.sort_by(|left, right| self.compare(left, right));
        }
        let iter = selected.into_iter();
        match self.window {
            Some(window) => iter
                .skip(window.offset)
                .take(window.limit)
                .cloned()
                .collect(),
            None => iter.cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers() -> Vec<i32> {
        vec![5, 3, 9, 1, 7, 2]
    }

    #[test]
    fn predicates_combine_with_and() {
        let query: Query<i32> = Query::new()
            .filter(|n: &i32| *n > 2)
            .filter(|n: &i32| n % 2 == 1);
        let rows = numbers();
        let mut result = query.run(&rows);
        result.sort();
        assert_eq!(result, vec![3, 5, 7, 9]);
    }

    #[test]
    fn ordering_and_window_apply_after_filtering() {
        let query: Query<i32> = Query::new()
            .filter(|n: &i32| *n > 1)
            .order_by(Arc::new(|a: &i32, b: &i32| a.cmp(b)))
            .window(Window {
                offset: 1,
                limit: 2,
            });
        let rows = numbers();
        assert_eq!(query.run(&rows), vec![3, 5]);
        assert_eq!(query.count(&rows), 5);
    }

    #[test]
    fn tie_breakers_only_apply_on_equal_keys() {
        let rows = vec![(1, 'b'), (0, 'z'), (1, 'a')];
        let query: Query<(i32, char)> = Query::new()
            .order_by(Arc::new(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0)))
            .then_by(Arc::new(|a: &(i32, char), b: &(i32, char)| a.1.cmp(&b.1)));
        assert_eq!(query.run(&rows), vec![(0, 'z'), (1, 'a'), (1, 'b')]);
    }

    #[test]
    fn unwindowed_drops_only_the_window() {
        let query: Query<i32> = Query::new()
            .filter(|n: &i32| *n < 6)
            .window(Window {
                offset: 0,
                limit: 1,
            });
        let full = query.unwindowed();
        assert!(full.current_window().is_none());
        assert_eq!(full.run(&numbers()).len(), 4);
    }
}
