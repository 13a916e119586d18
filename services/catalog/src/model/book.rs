//! Book entity, author/book relation rows and the joined book record.
use crate::model::Author;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
}

/// Relation row crediting an author on a book.
///
/// `order` is the author's 0-based position in the book's author list and is
/// rewritten as `0..n` every time the list is written.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct AuthorBook {
    pub author_id: i64,
    pub book_id: i64,
    pub order: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    /// Author ids in credit order.
    pub author_ids: Vec<i64>,
}

/// Book joined with its authors in credit order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub book: Book,
    pub authors: Vec<Author>,
}
