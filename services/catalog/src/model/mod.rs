//! Catalog data model module.
//!
//! # Purpose
//! Re-exports the author, book and comment entities plus the joined records
//! the store hands to query evaluation and HTTP projections.
mod author;
mod book;
mod comment;

pub use author::{Author, AuthorDraft, AuthorRecord};
pub use book::{AuthorBook, Book, BookDraft, BookRecord};
pub use comment::{Comment, CommentDraft};
