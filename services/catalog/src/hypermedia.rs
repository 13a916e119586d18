//! Opt-in hypermedia decoration of resource responses.
//!
//! # Purpose
//! Callers that send `IncludeHATEOAS: Y` (or the older `IncludeHATEOS`
//! spelling) receive navigation links next to each resource, filtered by
//! what the caller is allowed to do.
//!
//! # Key invariants
//! - Decoration only runs on successful responses; handlers call it after
//!   every fallible step.
//! - Privilege is computed once per request and shared by every item of a
//!   collection.
//! - Only types implementing [`Linked`] can be decorated.
use axum::http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const HYPERMEDIA_HEADER: &str = "includehateoas";
/// Misspelled name still sent by older clients.
pub const LEGACY_HYPERMEDIA_HEADER: &str = "includehateos";

/// Whether the request opted into link decoration under either header name.
pub fn wants_hypermedia(headers: &HeaderMap) -> bool {
    [HYPERMEDIA_HEADER, LEGACY_HYPERMEDIA_HEADER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.trim().eq_ignore_ascii_case("y"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub link: String,
    pub description: String,
    pub method: String,
}

/// Named API routes that links can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Authors,
    Author(i64),
    AuthorsWithPicture,
    AuthorCollection,
    Books,
    Book(i64),
}

impl Route {
    pub fn path(self) -> String {
        match self {
            Route::Root => "/v1".to_string(),
            Route::Authors => "/v1/authors".to_string(),
            Route::Author(id) => format!("/v1/authors/{id}"),
            Route::AuthorsWithPicture => "/v1/authors/with-picture".to_string(),
            Route::AuthorCollection => "/v1/author-collection".to_string(),
            Route::Books => "/v1/books".to_string(),
            Route::Book(id) => format!("/v1/books/{id}"),
        }
    }
}

/// Turns routes into absolute URLs under the service's public base URL.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resolve(&self, route: Route) -> String {
        self.url(&route.path())
    }

    /// Absolute URL for an arbitrary service path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn link(&self, route: Route, description: &str, method: Method) -> Link {
        Link {
            link: self.resolve(route),
            description: description.to_string(),
            method: method.to_string(),
        }
    }
}

/// A response body that can carry links.
pub trait Linked {
    fn links_mut(&mut self) -> &mut Vec<Link>;

    /// Links describing this resource for a caller with the given privilege.
    fn resource_links(&self, builder: &LinkBuilder, privileged: bool) -> Vec<Link>;

    /// Links attached to a collection of this resource type.
    fn collection_links(_builder: &LinkBuilder, _privileged: bool) -> Vec<Link> {
        Vec::new()
    }
}

pub fn author_links(builder: &LinkBuilder, id: i64, privileged: bool) -> Vec<Link> {
    let mut links = vec![builder.link(Route::Author(id), "self", Method::GET)];
    if privileged {
        links.push(builder.link(Route::Author(id), "update-author", Method::PUT));
        links.push(builder.link(Route::Author(id), "patch-author", Method::PATCH));
        links.push(builder.link(Route::Author(id), "delete-author", Method::DELETE));
    }
    links
}

pub fn author_collection_links(builder: &LinkBuilder, privileged: bool) -> Vec<Link> {
    let mut links = vec![builder.link(Route::Authors, "self", Method::GET)];
    if privileged {
        links.push(builder.link(Route::Authors, "create-author", Method::POST));
        links.push(builder.link(
            Route::AuthorsWithPicture,
            "create-author-with-picture",
            Method::POST,
        ));
    }
    links
}

/// Entry points advertised by `GET /v1`.
pub fn root_links(builder: &LinkBuilder, privileged: bool) -> Vec<Link> {
    let mut links = vec![
        builder.link(Route::Root, "self", Method::GET),
        builder.link(Route::Authors, "get-authors", Method::GET),
        builder.link(Route::Books, "get-books", Method::GET),
    ];
    if privileged {
        links.push(builder.link(Route::Authors, "create-author", Method::POST));
        links.push(builder.link(Route::AuthorCollection, "create-authors", Method::POST));
        links.push(builder.link(Route::Books, "create-book", Method::POST));
    }
    links
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCollection<T> {
    pub items: Vec<T>,
    pub links: Vec<Link>,
}

/// A list body: a bare array unless the caller opted into links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Plain(Vec<T>),
    Decorated(ResourceCollection<T>),
}

/// Applies links for one request with a privilege decided up front.
#[derive(Debug, Clone, Copy)]
pub struct Decorator<'a> {
    builder: &'a LinkBuilder,
    privileged: bool,
}

impl<'a> Decorator<'a> {
    pub fn new(builder: &'a LinkBuilder, privileged: bool) -> Self {
        Self {
            builder,
            privileged,
        }
    }

    pub fn item<T: Linked>(&self, mut item: T) -> T {
        let links = item.resource_links(self.builder, self.privileged);
        *item.links_mut() = links;
        item
    }

    pub fn collection<T: Linked>(&self, items: Vec<T>) -> ResourceCollection<T> {
        let items = items.into_iter().map(|item| self.item(item)).collect();
        ResourceCollection {
            items,
            links: T::collection_links(self.builder, self.privileged),
        }
    }
}

impl<T: Linked> Listing<T> {
    /// Decorate when a decorator is supplied, otherwise return the bare list.
    pub fn build(items: Vec<T>, decorator: Option<Decorator<'_>>) -> Self {
        match decorator {
            Some(decorator) => Listing::Decorated(decorator.collection(items)),
            None => Listing::Plain(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[derive(Debug, Clone, Serialize)]
    struct Item {
        id: i64,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        links: Vec<Link>,
    }

    impl Linked for Item {
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

    fn builder() -> LinkBuilder {
        LinkBuilder::new("http://localhost:8080/")
    }

    fn descriptions(links: &[Link]) -> Vec<&str> {
        links.iter().map(|link| link.description.as_str()).collect()
    }

    #[test]
    fn opt_in_header_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        assert!(!wants_hypermedia(&headers));
        headers.insert("IncludeHATEOAS", HeaderValue::from_static("y"));
        assert!(wants_hypermedia(&headers));
        headers.insert("includehateoas", HeaderValue::from_static("N"));
        assert!(!wants_hypermedia(&headers));
    }

    #[test]
    fn legacy_header_name_also_opts_in() {
        let mut headers = HeaderMap::new();
        headers.insert("IncludeHATEOS", HeaderValue::from_static("Y"));
        assert!(wants_hypermedia(&headers));
        headers.insert("IncludeHATEOS", HeaderValue::from_static("no"));
        assert!(!wants_hypermedia(&headers));
    }

    #[test]
    fn single_resource_links_follow_privilege() {
        let builder = builder();
        let plain = Decorator::new(&builder, false).item(Item {
            id: 1,
            links: Vec::new(),
        });
        assert_eq!(descriptions(&plain.links), vec!["self"]);
        assert_eq!(plain.links[0].link, "http://localhost:8080/v1/authors/1");
        assert_eq!(plain.links[0].method, "GET");

        let admin = Decorator::new(&builder, true).item(Item {
            id: 1,
            links: Vec::new(),
        });
        assert_eq!(
            descriptions(&admin.links),
            vec!["self", "update-author", "patch-author", "delete-author"]
        );
        assert_eq!(admin.links[3].method, "DELETE");
    }

    #[test]
    fn collection_wraps_items_and_adds_create_links() {
        let builder = builder();
        let items = vec![
            Item {
                id: 1,
                links: Vec::new(),
            },
            Item {
                id: 2,
                links: Vec::new(),
            },
        ];
        let collection = Decorator::new(&builder, true).collection(items);
        assert_eq!(collection.items.len(), 2);
        assert!(collection.items.iter().all(|item| item.links.len() == 4));
        assert_eq!(
            descriptions(&collection.links),
            vec!["self", "create-author", "create-author-with-picture"]
        );
    }

    #[test]
    fn plain_listing_serializes_as_array() {
        let listing = Listing::build(
            vec![Item {
                id: 3,
                links: Vec::new(),
            }],
            None,
        );
        let value = serde_json::to_value(&listing).expect("serialize");
        assert_eq!(value, serde_json::json!([{ "id": 3 }]));

        let builder = builder();
        let listing = Listing::build(
            vec![Item {
                id: 3,
                links: Vec::new(),
            }],
            Some(Decorator::new(&builder, false)),
        );
        let value = serde_json::to_value(&listing).expect("serialize");
        assert_eq!(value["items"][0]["links"][0]["description"], "self");
        assert_eq!(value["links"][0]["link"], "http://localhost:8080/v1/authors");
    }

    #[test]
    fn root_links_expand_for_admins() {
        let builder = builder();
        assert_eq!(
            descriptions(&root_links(&builder, false)),
            vec!["self", "get-authors", "get-books"]
        );
        assert_eq!(root_links(&builder, true).len(), 6);
    }
}
