use crate::model::BookRecord;
use catalog_query::Query;
use std::sync::Arc;

/// Every book ordered by title, ties broken by id.
pub fn books_by_title() -> Query<BookRecord> {
    Query::new()
        .order_by(Arc::new(|left: &BookRecord, right: &BookRecord| {
            left.book.title.cmp(&right.book.title)
        }))
        .then_by(Arc::new(|left: &BookRecord, right: &BookRecord| {
            left.book.id.cmp(&right.book.id)
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Book;

    fn record(id: i64, title: &str) -> BookRecord {
        BookRecord {
            book: Book {
                id,
                title: title.to_string(),
            },
            authors: Vec::new(),
        }
    }

    #[test]
    fn orders_by_title_then_id() {
        let rows = [record(3, "Zorba"), record(2, "Emma"), record(1, "Emma")];
        let ids: Vec<i64> = books_by_title()
            .run(rows.iter())
            .into_iter()
            .map(|row| row.book.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
