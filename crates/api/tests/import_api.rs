//! HTTP-level tests for the `/import` endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, delete, get, post_json, send, TestApp};
use gatehouse_db::models::proxy_host::CreateProxyHost;
use gatehouse_pipeline::store::ProxyHostStore;
use serde_json::json;

const TWO_SITES: &str = "a.com {\n  reverse_proxy app-a:3000\n}\nb.com {\n  reverse_proxy app-b:4000\n}\n";

async fn seed_host(app: &TestApp, domain: &str) {
    let dto: CreateProxyHost = serde_json::from_value(json!({
        "domain_names": domain,
        "name": "Existing",
        "forward_host": "old",
        "forward_port": 80,
    }))
    .unwrap();
    app.hosts.create(&dto).await.unwrap();
}

async fn upload(app: &TestApp, content: &str) -> serde_json::Value {
    let response = post_json(app, "/api/v1/import/upload", json!({ "content": content })).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn status_without_pending_import() {
    let app = build_test_app();
    let response = get(&app, "/api/v1/import/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["has_pending"], false);
}

#[tokio::test]
async fn upload_returns_preview_with_conflicts() {
    let app = build_test_app();
    seed_host(&app, "example.com").await;

    let json = upload(&app, "example.com").await;
    let data = &json["data"];
    assert_eq!(data["session"]["status"], "transient");
    assert_eq!(data["preview"]["hosts"][0]["domain_names"], "example.com");
    assert_eq!(data["preview"]["conflicts"], json!(["example.com"]));
    assert_eq!(
        data["conflict_details"]["example.com"]["existing"]["forward_host"],
        "old"
    );
}

#[tokio::test]
async fn empty_upload_is_validation_error() {
    let app = build_test_app();
    let response = post_json(&app, "/api/v1/import/upload", json!({ "content": "" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn multi_upload_flattens_imported_sites() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/import/upload-multi",
        json!({ "files": [
            { "filename": "Caddyfile", "content": "import sites/*\n" },
            { "filename": "sites/site1", "content": "site1.com" },
            { "filename": "sites/site2", "content": "site2.com" },
        ]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["session"]["status"], "transient");
    assert_eq!(json["data"]["preview"]["hosts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn multi_upload_rejects_traversal() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/import/upload-multi",
        json!({ "files": [
            { "filename": "Caddyfile", "content": "a.com" },
            { "filename": "../outside", "content": "b.com" },
        ]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!app.dir.path().join("outside").exists());
}

#[tokio::test]
async fn detect_imports_lists_import_targets() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/import/detect-imports",
        json!({ "content": "# import ignored\nimport sites/*.caddy\n" }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["has_imports"], true);
    assert_eq!(json["data"]["imports"], json!(["sites/*.caddy"]));
}

#[tokio::test]
async fn commit_creates_hosts_then_second_commit_is_404() {
    let app = build_test_app();
    let uploaded = upload(&app, TWO_SITES).await;
    let session_uuid = uploaded["data"]["session"]["uuid"].as_str().unwrap().to_string();

    let body = json!({
        "session_uuid": session_uuid,
        "resolutions": { "b.com": "skip" },
        "names": { "a.com": "Shop" },
    });
    let response = post_json(&app, "/api/v1/import/commit", body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["created"], 1);
    assert_eq!(json["data"]["skipped"], 1);
    assert_eq!(app.applier.push_count(), 1);

    let hosts = body_json(get(&app, "/api/v1/proxy-hosts").await).await;
    assert_eq!(hosts["data"][0]["name"], "Shop");

    let again = post_json(&app, "/api/v1/import/commit", body).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn commit_with_malformed_session_uuid_is_400() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/import/commit",
        json!({ "session_uuid": "../../etc/passwd" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn preview_with_malformed_session_uuid_is_400() {
    let app = build_test_app();
    let response = get(&app, "/api/v1/import/preview?session_uuid=not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_discards_upload() {
    let app = build_test_app();
    let uploaded = upload(&app, TWO_SITES).await;
    let session_uuid = uploaded["data"]["session"]["uuid"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/import/cancel?session_uuid={session_uuid}");
    assert_eq!(delete(&app, &uri).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(delete(&app, &uri).await.status(), StatusCode::NOT_FOUND);

    let preview = get(&app, &format!("/api/v1/import/preview?session_uuid={session_uuid}")).await;
    assert_eq!(preview.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_without_session_uuid_is_400() {
    let app = build_test_app();
    let response = delete(&app, "/api/v1/import/cancel").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn commit_without_session_uuid_is_400() {
    let app = build_test_app();
    let response = post_json(&app, "/api/v1/import/commit", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn detect_imports_with_non_string_content_is_400() {
    let app = build_test_app();
    let response = post_json(&app, "/api/v1/import/detect-imports", json!({ "content": 5 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn upload_without_content_is_400() {
    let app = build_test_app();
    let response = post_json(&app, "/api/v1/import/upload", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    let response = send(&app, Method::POST, "/api/v1/import/upload", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn commit_of_upload_broken_on_disk_is_500_and_retryable() {
    let app = build_test_app();
    let response = post_json(
        &app,
        "/api/v1/import/upload-multi",
        json!({ "files": [
            { "filename": "Caddyfile", "content": "import sites/*\n" },
            { "filename": "sites/a", "content": "a.com {\n  reverse_proxy app:80\n}\n" },
        ]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let session_uuid = body_json(response).await["data"]["session"]["uuid"]
        .as_str()
        .unwrap()
        .to_string();
    let site = app
        .dir
        .path()
        .join("imports/uploads")
        .join(&session_uuid)
        .join("sites/a");

    std::fs::write(&site, "a.com {\n").unwrap();
    let body = json!({ "session_uuid": session_uuid });
    let response = post_json(&app, "/api/v1/import/commit", body.clone()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PARSE_ERROR");
    let dir = app.dir.path().display().to_string();
    assert!(!json["error"].as_str().unwrap().contains(&dir));

    std::fs::write(&site, "a.com {\n  reverse_proxy app:80\n}\n").unwrap();
    let response = post_json(&app, "/api/v1/import/commit", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["created"], 1);
    assert!(!app.dir.path().join("imports/uploads").join(&session_uuid).exists());
}
