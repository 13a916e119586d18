mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{BASE_URL, TestApp, read_json};
use http_helpers::{authorized, empty_request};

const BOUNDARY: &str = "catalog-test-boundary";

fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    picture: Option<&[u8]>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = picture {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"picture\"; filename=\"portrait.PNG\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn stored_path(app: &TestApp, url: &str) -> std::path::PathBuf {
    let relative = url
        .strip_prefix(&format!("{BASE_URL}/files/"))
        .expect("file url");
    app.files.path().join(relative)
}

#[tokio::test]
async fn picture_lifecycle_follows_the_author() {
    let app = TestApp::new();
    let token = app.admin_token();

    let response = app
        .send(authorized(
            multipart_request(
                "POST",
                "/v1/authors/with-picture",
                &[("names", "Frida"), ("last_names", "Kahlo")],
                Some(b"first"),
            ),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    let id = body["id"].as_i64().expect("id");
    let first_url = body["picture"].as_str().expect("picture").to_string();
    assert!(first_url.ends_with(".png"));
    let first_path = stored_path(&app, &first_url);
    assert_eq!(std::fs::read(&first_path).expect("stored picture"), b"first");

    let response = app
        .send(authorized(
            multipart_request(
                "PUT",
                &format!("/v1/authors/{id}/picture"),
                &[],
                Some(b"second"),
            ),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let second_path = stored_path(&app, body["picture"].as_str().expect("picture"));
    assert!(!first_path.exists());
    assert_eq!(std::fs::read(&second_path).expect("new picture"), b"second");

    let response = app
        .send(authorized(
            empty_request("DELETE", &format!("/v1/authors/{id}")),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!second_path.exists());
}

#[tokio::test]
async fn invalid_form_stores_no_file() {
    let app = TestApp::new();
    let response = app
        .send(authorized(
            multipart_request(
                "POST",
                "/v1/authors/with-picture",
                &[("names", "frida")],
                Some(b"bytes"),
            ),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["errors"]["names"].is_array());
    assert!(body["errors"]["last_names"].is_array());
    assert!(!app.files.path().join("authors").exists());
}

#[tokio::test]
async fn replacing_requires_a_picture() {
    let app = TestApp::new();
    let id = app.seed_author("Frida", "Kahlo").await;
    let response = app
        .send(authorized(
            multipart_request("PUT", &format!("/v1/authors/{id}/picture"), &[], None),
            &app.admin_token(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["errors"]["picture"][0], "this field is required");
}
