//! Persistence boundary for the catalog.
//!
//! # Purpose
//! Defines the [`CatalogStore`] trait consumed by HTTP handlers and the
//! [`StoreError`] taxonomy they translate into API errors.
//!
//! # Key invariants
//! - Every mutating call commits atomically: an entity write and the rewrite
//!   of its relation rows are visible together or not at all.
//! - Soft-deleted comments are never returned by any read.
//! - Read queries are evaluated through [`QuerySource`], so filtering, ordering
//!   and windowing stay in the backend.
use crate::model::{
    Author, AuthorDraft, AuthorRecord, BookDraft, BookRecord, Comment, CommentDraft,
};
use async_trait::async_trait;
use catalog_query::QuerySource;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore:
    QuerySource<AuthorRecord, Error = StoreError> + QuerySource<BookRecord, Error = StoreError>
{
    async fn create_author(&self, draft: AuthorDraft) -> StoreResult<Author>;
    /// Insert every draft in one commit; either all rows land or none do.
    async fn create_authors(&self, drafts: Vec<AuthorDraft>) -> StoreResult<Vec<Author>>;
    async fn get_author(&self, id: i64) -> StoreResult<Author>;
    async fn get_author_record(&self, id: i64) -> StoreResult<AuthorRecord>;
    /// Records for the requested ids that exist, in request order.
    async fn author_records_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<AuthorRecord>>;
    /// Subset of `ids` that exist.
    async fn existing_author_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>>;
    async fn update_author(&self, id: i64, draft: AuthorDraft) -> StoreResult<Author>;
    /// Remove the author and its relation rows, returning the removed entity.
    async fn delete_author(&self, id: i64) -> StoreResult<Author>;

    /// Insert the book and its ordered relation rows. Fails with `NotFound`
    /// when any referenced author is missing.
    async fn create_book(&self, draft: BookDraft) -> StoreResult<BookRecord>;
    async fn get_book_record(&self, id: i64) -> StoreResult<BookRecord>;
    /// Replace the title and rewrite the relation rows with orders `0..n`.
    async fn update_book(&self, id: i64, draft: BookDraft) -> StoreResult<BookRecord>;
    /// Remove the book, its relation rows and its comments.
    async fn delete_book(&self, id: i64) -> StoreResult<()>;
    async fn book_exists(&self, id: i64) -> StoreResult<bool>;

    async fn create_comment(&self, book_id: i64, draft: CommentDraft) -> StoreResult<Comment>;
    async fn get_comment(&self, book_id: i64, id: Uuid) -> StoreResult<Comment>;
    /// Visible comments of a book, newest first.
    async fn list_comments(&self, book_id: i64) -> StoreResult<Vec<Comment>>;
    async fn update_comment(&self, book_id: i64, id: Uuid, body: String) -> StoreResult<Comment>;
    async fn soft_delete_comment(&self, book_id: i64, id: Uuid) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}
