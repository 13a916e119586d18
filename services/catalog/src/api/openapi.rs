//! OpenAPI document for the catalog API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document served
//! at `/v1/openapi.json`.
use crate::api::{
    author_collection, authors, books, comments, root, system,
    types::{
        AuthorInput, AuthorResponse, AuthorWithBooksResponse, BookInput, BookSummaryResponse,
        BookWithAuthorsResponse, CommentInput, CommentResponse, ErrorResponse, HealthStatus,
        ListingTokenResponse,
    },
};
use crate::hypermedia::Link;
use crate::patch::PatchOperation;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "catalog",
        version = "v1",
        description = "Catalog of authors, books and comments"
    ),
    paths(
        root::get_root,
        system::system_health,
        authors::list_authors,
        authors::get_author,
        authors::filter_authors,
        authors::create_author,
        authors::create_author_with_picture,
        authors::update_author,
        authors::replace_picture,
        authors::patch_author,
        authors::delete_author,
        author_collection::get_authors_by_ids,
        author_collection::create_authors,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::get_listing_token,
        books::list_books_with_token,
        comments::list_comments,
        comments::get_comment,
        comments::create_comment,
        comments::patch_comment,
        comments::delete_comment
    ),
    components(schemas(
        HealthStatus,
        ErrorResponse,
        Link,
        PatchOperation,
        AuthorInput,
        AuthorResponse,
        AuthorWithBooksResponse,
        BookInput,
        BookSummaryResponse,
        BookWithAuthorsResponse,
        CommentInput,
        CommentResponse,
        ListingTokenResponse
    )),
    tags(
        (name = "system", description = "Entry point and health"),
        (name = "authors", description = "Author management and search"),
        (name = "books", description = "Book management"),
        (name = "comments", description = "Book comments")
    )
)]
pub struct ApiDoc;
