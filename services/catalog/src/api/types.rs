//! HTTP API request/response types.
//!
//! # Purpose
//! Defines payload shapes for the catalog REST API and OpenAPI schema
//! generation. Request bodies carry their validation rules; the same rules
//! run on create, full update and patch.
use crate::hypermedia::{Link, LinkBuilder, Linked, author_links, author_collection_links};
use crate::model::{Author, AuthorDraft, AuthorRecord, Book, BookRecord, Comment};
use crate::validation::{FieldErrors, capitalized_text, distinct_ids, not_blank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<FieldErrors>,
}

/// Author fields accepted on create, full update and patch.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate, Clone, PartialEq, Eq, Default)]
pub struct AuthorInput {
    #[validate(
        required(message = "this field is required"),
        length(max = 100, message = "must be at most 100 characters"),
        custom(function = "capitalized_text")
    )]
    pub names: Option<String>,
    #[validate(
        required(message = "this field is required"),
        length(max = 100, message = "must be at most 100 characters"),
        custom(function = "capitalized_text")
    )]
    pub last_names: Option<String>,
    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub identification: Option<String>,
}

impl AuthorInput {
    /// Convert a validated input into a store draft.
    pub fn into_draft(self, picture: Option<String>) -> AuthorDraft {
        AuthorDraft {
            names: self.names.unwrap_or_default(),
            last_names: self.last_names.unwrap_or_default(),
            identification: self.identification,
            picture,
        }
    }
}

impl From<&Author> for AuthorInput {
    fn from(author: &Author) -> Self {
        Self {
            names: Some(author.names.clone()),
            last_names: Some(author.last_names.clone()),
            identification: author.identification.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate, Clone, PartialEq, Eq, Default)]
pub struct BookInput {
    #[validate(
        required(message = "this field is required"),
        length(max = 100, message = "must be at most 100 characters"),
        custom(function = "capitalized_text")
    )]
    pub title: Option<String>,
    /// Author ids in credit order.
    #[validate(
        required(message = "this field is required"),
        length(min = 1, message = "a book needs at least one author"),
        custom(function = "distinct_ids")
    )]
    pub author_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate, Clone, PartialEq, Eq, Default)]
pub struct CommentInput {
    #[validate(
        required(message = "this field is required"),
        custom(function = "not_blank")
    )]
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct AuthorResponse {
    pub id: i64,
    pub full_name: String,
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            full_name: author.full_name(),
            picture: author.picture,
            links: Vec::new(),
        }
    }
}

impl Linked for AuthorResponse {
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }

    fn resource_links(&self, builder: &LinkBuilder, privileged: bool) -> Vec<Link> {
        author_links(builder, self.id, privileged)
    }

    fn collection_links(builder: &LinkBuilder, privileged: bool) -> Vec<Link> {
        author_collection_links(builder, privileged)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct BookSummaryResponse {
    pub id: i64,
    pub title: String,
}

impl From<Book> for BookSummaryResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct AuthorWithBooksResponse {
    pub id: i64,
    pub full_name: String,
    pub picture: Option<String>,
    pub books: Vec<BookSummaryResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl From<AuthorRecord> for AuthorWithBooksResponse {
    fn from(record: AuthorRecord) -> Self {
        let full_name = record.author.full_name();
        Self {
            id: record.author.id,
            full_name,
            picture: record.author.picture,
            books: record
                .books
                .into_iter()
                .map(BookSummaryResponse::from)
                .collect(),
            links: Vec::new(),
        }
    }
}

impl Linked for AuthorWithBooksResponse {
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }

    fn resource_links(&self, builder: &LinkBuilder, privileged: bool) -> Vec<Link> {
        author_links(builder, self.id, privileged)
    }

    fn collection_links(builder: &LinkBuilder, privileged: bool) -> Vec<Link> {
        author_collection_links(builder, privileged)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct BookWithAuthorsResponse {
    pub id: i64,
    pub title: String,
    /// Authors in credit order.
    pub authors: Vec<AuthorResponse>,
}

impl From<BookRecord> for BookWithAuthorsResponse {
    fn from(record: BookRecord) -> Self {
        Self {
            id: record.book.id,
            title: record.book.title,
            authors: record
                .authors
                .into_iter()
                .map(AuthorResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct CommentResponse {
    pub id: Uuid,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub user_email: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            body: comment.body,
            published_at: comment.published_at,
            user_email: comment.user_email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ListingTokenResponse {
    /// Absolute URL of the token-gated book listing.
    pub url: String,
    pub expires_in_secs: u64,
}
