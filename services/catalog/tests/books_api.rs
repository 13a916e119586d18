mod common;

use axum::http::StatusCode;
use common::{BASE_URL, TestApp, read_json};
use http_helpers::{authorized, empty_request, get, json_request};
use std::time::Duration;

#[tokio::test]
async fn books_list_by_title_with_authors_in_credit_order() {
    let app = TestApp::new();
    let borges = app.seed_author("Jorge Luis", "Borges").await;
    let casares = app.seed_author("Adolfo", "Bioy Casares").await;
    let book = app.seed_book("Ficciones", &[casares, borges]).await;
    app.seed_book("El Aleph", &[borges]).await;

    let response = app.send(get("/v1/books")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("total-quantity").expect("total"), "2");
    let body = read_json(response).await;
    let titles: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|book| book["title"].as_str().expect("title"))
        .collect();
    assert_eq!(titles, vec!["El Aleph", "Ficciones"]);

    let body = read_json(app.send(get(&format!("/v1/books/{book}"))).await).await;
    assert_eq!(body["authors"][0]["id"], casares);
    assert_eq!(body["authors"][1]["id"], borges);
}

#[tokio::test]
async fn book_validation_reports_missing_authors() {
    let app = TestApp::new();
    let borges = app.seed_author("Jorge Luis", "Borges").await;

    let response = app
        .send(authorized(
            json_request(
                "POST",
                "/v1/books",
                serde_json::json!({ "title": "Ficciones", "author_ids": [borges, 7, 9] }),
            ),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(
        body["errors"]["author_ids"][0],
        "the following authors do not exist: 7,9"
    );

    let response = app
        .send(authorized(
            json_request(
                "POST",
                "/v1/books",
                serde_json::json!({ "title": "ficciones", "author_ids": [] }),
            ),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["errors"]["title"].is_array());
    assert_eq!(
        body["errors"]["author_ids"][0],
        "a book needs at least one author"
    );

    let response = app
        .send(authorized(
            json_request(
                "POST",
                "/v1/books",
                serde_json::json!({ "title": "Ficciones", "author_ids": [borges, borges] }),
            ),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_of_missing_book_is_not_found_before_author_checks() {
    let app = TestApp::new();
    let response = app
        .send(authorized(
            json_request(
                "PUT",
                "/v1/books/999",
                serde_json::json!({ "title": "Ficciones", "author_ids": [12345] }),
            ),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let borges = app.seed_author("Jorge Luis", "Borges").await;
    let book = app.seed_book("Ficciones", &[borges]).await;
    let response = app
        .send(authorized(
            json_request(
                "PUT",
                &format!("/v1/books/{book}"),
                serde_json::json!({ "title": "Ficciones", "author_ids": [12345] }),
            ),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(
        body["errors"]["author_ids"][0],
        "the following authors do not exist: 12345"
    );
}

#[tokio::test]
async fn update_rewrites_credits_and_delete_removes_book() {
    let app = TestApp::new();
    let borges = app.seed_author("Jorge Luis", "Borges").await;
    let casares = app.seed_author("Adolfo", "Bioy Casares").await;
    let book = app.seed_book("Ficciones", &[borges]).await;
    let uri = format!("/v1/books/{book}");

    let response = app
        .send(authorized(
            json_request(
                "PUT",
                &uri,
                serde_json::json!({ "title": "Crónicas de Bustos Domecq", "author_ids": [casares, borges] }),
            ),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["title"], "Crónicas de Bustos Domecq");
    assert_eq!(body["authors"][0]["id"], casares);

    let response = app
        .send(authorized(empty_request("DELETE", &uri), &app.admin_token()))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.send(get(&uri)).await.status(), StatusCode::NOT_FOUND);

    let body = read_json(app.send(get(&format!("/v1/authors/{borges}"))).await).await;
    assert!(body["books"].as_array().expect("books").is_empty());
}

#[tokio::test]
async fn listing_token_grants_short_lived_access() {
    let app = TestApp::new();
    let borges = app.seed_author("Jorge Luis", "Borges").await;
    app.seed_book("Ficciones", &[borges]).await;

    let response = app.send(get("/v1/books/list/get-token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(authorized(
            get("/v1/books/list/get-token"),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["expires_in_secs"], 30);
    let url = body["url"].as_str().expect("url");
    let path = url.strip_prefix(BASE_URL).expect("absolute url");
    assert!(path.starts_with("/v1/books/list/"));

    for _ in 0..2 {
        let response = app.send(get(path)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body[0]["title"], "Ficciones");
    }
}

#[tokio::test]
async fn expired_or_forged_listing_tokens_are_rejected() {
    let app = TestApp::with_capability_ttl(Duration::ZERO);
    let response = app
        .send(authorized(
            get("/v1/books/list/get-token"),
            &app.admin_token(),
        ))
        .await;
    let body = read_json(response).await;
    let path = body["url"]
        .as_str()
        .expect("url")
        .strip_prefix(BASE_URL)
        .expect("absolute url")
        .to_string();

    let response = app.send(get(&path)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["errors"]["token"][0], "the token has expired");

    let response = app.send(get("/v1/books/list/not-a-token")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let access = app.admin_token();
    let response = app.send(get(&format!("/v1/books/list/{access}"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
