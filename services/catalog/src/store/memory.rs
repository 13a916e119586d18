//! In-memory implementation of the catalog store.
//!
//! # Purpose
//! Implements [`CatalogStore`] with plain collections so the service runs and
//! tests without external dependencies.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Every table lives behind a single `tokio::sync::RwLock`. A write takes the
//!   lock once, so an entity and its relation rows change in one step and no
//!   reader observes a half-written book.
//!
//! # Performance characteristics
//! Joined records are assembled on every read by scanning the relation table.
//! That is fine for development datasets and keeps the query layer honest: the
//! same [`Query`] runs here that a durable backend would translate.
//!
//! # Metrics
//! Entity gauges and a write counter mirror what a durable backend reports.
use super::{CatalogStore, StoreError, StoreResult};
use crate::model::{
    Author, AuthorBook, AuthorDraft, AuthorRecord, Book, BookDraft, BookRecord, Comment,
    CommentDraft,
};
use async_trait::async_trait;
use catalog_query::{Query, QuerySource};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    author_books: Vec<AuthorBook>,
    comments: Vec<Comment>,
    last_author_id: i64,
    last_book_id: i64,
}

impl Tables {
    fn next_author_id(&mut self) -> i64 {
        self.last_author_id += 1;
        self.last_author_id
    }

    fn next_book_id(&mut self) -> i64 {
        self.last_book_id += 1;
        self.last_book_id
    }

    fn author_record(&self, author: &Author) -> AuthorRecord {
        let mut books: Vec<Book> = self
            .author_books
            .iter()
            .filter(|link| link.author_id == author.id)
            .filter_map(|link| self.books.get(&link.book_id).cloned())
            .collect();
        books.sort_by_key(|book| book.id);
        AuthorRecord {
            author: author.clone(),
            books,
        }
    }

    fn author_records(&self) -> Vec<AuthorRecord> {
        self.authors
            .values()
            .map(|author| self.author_record(author))
            .collect()
    }

    fn book_record(&self, book: &Book) -> BookRecord {
        let mut links: Vec<&AuthorBook> = self
            .author_books
            .iter()
            .filter(|link| link.book_id == book.id)
            .collect();
        links.sort_by_key(|link| link.order);
        let authors = links
            .into_iter()
            .filter_map(|link| self.authors.get(&link.author_id).cloned())
            .collect();
        BookRecord {
            book: book.clone(),
            authors,
        }
    }

    fn book_records(&self) -> Vec<BookRecord> {
        self.books
            .values()
            .map(|book| self.book_record(book))
            .collect()
    }

    fn ensure_authors_exist(&self, ids: &[i64]) -> StoreResult<()> {
        match ids.iter().find(|id| !self.authors.contains_key(*id)) {
            Some(missing) => Err(StoreError::NotFound(format!("author {missing}"))),
            None => Ok(()),
        }
    }

    /// Replace every relation row of `book_id` with `author_ids` in order.
    fn write_book_authors(&mut self, book_id: i64, author_ids: &[i64]) {
        self.author_books.retain(|link| link.book_id != book_id);
        for (order, author_id) in author_ids.iter().enumerate() {
            self.author_books.push(AuthorBook {
                author_id: *author_id,
                book_id,
                order: order as u32,
            });
        }
    }

    fn visible_comment_mut(&mut self, book_id: i64, id: Uuid) -> Option<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|comment| comment.id == id && comment.book_id == book_id && !comment.is_deleted)
    }

    fn record_gauges(&self) {
        metrics::gauge!("catalog_authors_total").set(self.authors.len() as f64);
        metrics::gauge!("catalog_books_total").set(self.books.len() as f64);
        let visible = self
            .comments
            .iter()
            .filter(|comment| !comment.is_deleted)
            .count();
        metrics::gauge!("catalog_comments_total").set(visible as f64);
    }
}

fn record_write(entity: &'static str, op: &'static str) {
    metrics::counter!("catalog_store_writes_total", "entity" => entity, "op" => op).increment(1);
}

/// In-memory catalog store.
///
/// Cloning is cheap and every clone shares the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuerySource<AuthorRecord> for InMemoryStore {
    type Error = StoreError;

    async fn count(&self, query: &Query<AuthorRecord>) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        let records = tables.author_records();
        Ok(query.count(&records) as u64)
    }

    async fn fetch(&self, query: &Query<AuthorRecord>) -> StoreResult<Vec<AuthorRecord>> {
        let tables = self.tables.read().await;
        let records = tables.author_records();
        Ok(query.run(&records))
    }
}

#[async_trait]
impl QuerySource<BookRecord> for InMemoryStore {
    type Error = StoreError;

    async fn count(&self, query: &Query<BookRecord>) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        let records = tables.book_records();
        Ok(query.count(&records) as u64)
    }

    async fn fetch(&self, query: &Query<BookRecord>) -> StoreResult<Vec<BookRecord>> {
        let tables = self.tables.read().await;
        let records = tables.book_records();
        Ok(query.run(&records))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_author(&self, draft: AuthorDraft) -> StoreResult<Author> {
        let mut tables = self.tables.write().await;
        let id = tables.next_author_id();
        let author = Author {
            id,
            names: draft.names,
            last_names: draft.last_names,
            identification: draft.identification,
            picture: draft.picture,
        };
        tables.authors.insert(id, author.clone());
        record_write("author", "created");
        tables.record_gauges();
        Ok(author)
    }

    async fn create_authors(&self, drafts: Vec<AuthorDraft>) -> StoreResult<Vec<Author>> {
        let mut tables = self.tables.write().await;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = tables.next_author_id();
            let author = Author {
                id,
                names: draft.names,
                last_names: draft.last_names,
                identification: draft.identification,
                picture: draft.picture,
            };
            tables.authors.insert(id, author.clone());
            created.push(author);
        }
        record_write("author", "created");
        tables.record_gauges();
        Ok(created)
    }

    async fn get_author(&self, id: i64) -> StoreResult<Author> {
        self.tables
            .read()
            .await
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("author {id}")))
    }

    async fn get_author_record(&self, id: i64) -> StoreResult<AuthorRecord> {
        let tables = self.tables.read().await;
        let author = tables
            .authors
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("author {id}")))?;
        Ok(tables.author_record(author))
    }

    async fn author_records_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<AuthorRecord>> {
        let tables = self.tables.read().await;
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| tables.authors.get(id))
            .map(|author| tables.author_record(author))
            .collect())
    }

    async fn existing_author_ids(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.authors.contains_key(id))
            .collect())
    }

    async fn update_author(&self, id: i64, draft: AuthorDraft) -> StoreResult<Author> {
        let mut tables = self.tables.write().await;
        let author = tables
            .authors
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("author {id}")))?;
        author.apply(draft);
        let updated = author.clone();
        record_write("author", "updated");
        Ok(updated)
    }

    async fn delete_author(&self, id: i64) -> StoreResult<Author> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .authors
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("author {id}")))?;
        tables.author_books.retain(|link| link.author_id != id);
        record_write("author", "deleted");
        tables.record_gauges();
        Ok(removed)
    }

    async fn create_book(&self, draft: BookDraft) -> StoreResult<BookRecord> {
        let mut tables = self.tables.write().await;
        tables.ensure_authors_exist(&draft.author_ids)?;
        let id = tables.next_book_id();
        let book = Book {
            id,
            title: draft.title,
        };
        tables.books.insert(id, book.clone());
        tables.write_book_authors(id, &draft.author_ids);
        record_write("book", "created");
        tables.record_gauges();
        Ok(tables.book_record(&book))
    }

    async fn get_book_record(&self, id: i64) -> StoreResult<BookRecord> {
        let tables = self.tables.read().await;
        let book = tables
            .books
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("book {id}")))?;
        Ok(tables.book_record(book))
    }

    async fn update_book(&self, id: i64, draft: BookDraft) -> StoreResult<BookRecord> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&id) {
            return Err(StoreError::NotFound(format!("book {id}")));
        }
        tables.ensure_authors_exist(&draft.author_ids)?;
        let book = Book {
            id,
            title: draft.title,
        };
        tables.books.insert(id, book.clone());
        tables.write_book_authors(id, &draft.author_ids);
        record_write("book", "updated");
        Ok(tables.book_record(&book))
    }

    async fn delete_book(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.books.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("book {id}")));
        }
        tables.author_books.retain(|link| link.book_id != id);
        tables.comments.retain(|comment| comment.book_id != id);
        record_write("book", "deleted");
        tables.record_gauges();
        Ok(())
    }

    async fn book_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.read().await.books.contains_key(&id))
    }

    async fn create_comment(&self, book_id: i64, draft: CommentDraft) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&book_id) {
            return Err(StoreError::NotFound(format!("book {book_id}")));
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            body: draft.body,
            published_at: Utc::now(),
            book_id,
            user_id: draft.user_id,
            user_email: draft.user_email,
            is_deleted: false,
        };
        tables.comments.push(comment.clone());
        record_write("comment", "created");
        tables.record_gauges();
        Ok(comment)
    }

    async fn get_comment(&self, book_id: i64, id: Uuid) -> StoreResult<Comment> {
        self.tables
            .read()
            .await
            .comments
            .iter()
            .find(|comment| comment.id == id && comment.book_id == book_id && !comment.is_deleted)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("comment {id}")))
    }

    async fn list_comments(&self, book_id: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|comment| comment.book_id == book_id && !comment.is_deleted)
            .cloned()
            .collect();
        comments.sort_by(|left, right| right.published_at.cmp(&left.published_at));
        Ok(comments)
    }

    async fn update_comment(&self, book_id: i64, id: Uuid, body: String) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        let comment = tables
            .visible_comment_mut(book_id, id)
            .ok_or_else(|| StoreError::NotFound(format!("comment {id}")))?;
        comment.body = body;
        let updated = comment.clone();
        record_write("comment", "updated");
        Ok(updated)
    }

    async fn soft_delete_comment(&self, book_id: i64, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let comment = tables
            .visible_comment_mut(book_id, id)
            .ok_or_else(|| StoreError::NotFound(format!("comment {id}")))?;
        comment.is_deleted = true;
        record_write("comment", "deleted");
        tables.record_gauges();
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        let _tables = self.tables.read().await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_query::{Pagination, paginate};

    fn draft(names: &str, last_names: &str) -> AuthorDraft {
        AuthorDraft {
            names: names.to_string(),
            last_names: last_names.to_string(),
            identification: None,
            picture: None,
        }
    }

    #[tokio::test]
    async fn author_ids_are_sequential_from_one() {
        let store = InMemoryStore::new();
        let first = store.create_author(draft("Jorge", "Borges")).await.expect("a");
        let batch = store
            .create_authors(vec![draft("Ursula", "Le Guin"), draft("Italo", "Calvino")])
            .await
            .expect("batch");
        assert_eq!(first.id, 1);
        assert_eq!(
            batch.iter().map(|author| author.id).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[tokio::test]
    async fn book_authors_keep_credit_order_across_updates() {
        let store = InMemoryStore::new();
        let a = store.create_author(draft("Ann", "One")).await.expect("a");
        let b = store.create_author(draft("Bob", "Two")).await.expect("b");
        let c = store.create_author(draft("Cy", "Three")).await.expect("c");

        let created = store
            .create_book(BookDraft {
                title: "Shared".to_string(),
                author_ids: vec![c.id, a.id],
            })
            .await
            .expect("book");
        let names: Vec<_> = created.authors.iter().map(|x| x.id).collect();
        assert_eq!(names, vec![c.id, a.id]);

        let updated = store
            .update_book(
                created.book.id,
                BookDraft {
                    title: "Shared".to_string(),
                    author_ids: vec![b.id, c.id, a.id],
                },
            )
            .await
            .expect("update");
        let ids: Vec<_> = updated.authors.iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![b.id, c.id, a.id]);

        let tables = store.tables.read().await;
        let mut orders: Vec<u32> = tables
            .author_books
            .iter()
            .filter(|link| link.book_id == created.book.id)
            .map(|link| link.order)
            .collect();
        orders.sort();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn create_book_with_missing_author_writes_nothing() {
        let store = InMemoryStore::new();
        let a = store.create_author(draft("Ann", "One")).await.expect("a");
        let err = store
            .create_book(BookDraft {
                title: "Ghost".to_string(),
                author_ids: vec![a.id, 99],
            })
            .await
            .err()
            .expect("missing author");
        assert!(matches!(err, StoreError::NotFound(_)));
        let tables = store.tables.read().await;
        assert!(tables.books.is_empty());
        assert!(tables.author_books.is_empty());
    }

    #[tokio::test]
    async fn deleting_author_drops_relation_rows() {
        let store = InMemoryStore::new();
        let a = store.create_author(draft("Ann", "One")).await.expect("a");
        let book = store
            .create_book(BookDraft {
                title: "Solo".to_string(),
                author_ids: vec![a.id],
            })
            .await
            .expect("book");
        store.delete_author(a.id).await.expect("delete");
        let record = store.get_book_record(book.book.id).await.expect("book");
        assert!(record.authors.is_empty());
        assert!(matches!(
            store.get_author(a.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn soft_deleted_comments_are_invisible() {
        let store = InMemoryStore::new();
        let a = store.create_author(draft("Ann", "One")).await.expect("a");
        let book = store
            .create_book(BookDraft {
                title: "Solo".to_string(),
                author_ids: vec![a.id],
            })
            .await
            .expect("book");
        let comment = store
            .create_comment(
                book.book.id,
                CommentDraft {
                    body: "Great".to_string(),
                    user_id: "u1".to_string(),
                    user_email: "u1@example.com".to_string(),
                },
            )
            .await
            .expect("comment");
        store
            .soft_delete_comment(book.book.id, comment.id)
            .await
            .expect("delete");
        assert!(matches!(
            store.get_comment(book.book.id, comment.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list_comments(book.book.id).await.expect("list").is_empty());
        assert!(matches!(
            store
                .update_comment(book.book.id, comment.id, "Edited".to_string())
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn author_query_source_counts_before_window() {
        let store = InMemoryStore::new();
        for i in 0..12 {
            store
                .create_author(draft(&format!("Name{i:02}"), "Same"))
                .await
                .expect("author");
        }
        let query: Query<AuthorRecord> =
            Query::new().filter(|record: &AuthorRecord| record.author.id % 2 == 0);
        let page = paginate(&store, &query, Pagination::new(2, 4))
            .await
            .expect("page");
        assert_eq!(page.total, 6);
        let ids: Vec<_> = page.items.iter().map(|record| record.author.id).collect();
        assert_eq!(ids, vec![10, 12]);
    }
}
