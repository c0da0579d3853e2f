//! `AppError` → HTTP response mapping, checked without a server.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use gatehouse_api::error::AppError;
use gatehouse_caddy::caddyfile::CaddyfileError;
use gatehouse_core::error::CoreError;
use gatehouse_pipeline::error::{ApplyError, PipelineError, StoreError};
use http_body_util::BodyExt;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::not_found("ImportSession", "abc"));
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "ImportSession with id abc not found");
}

#[tokio::test]
async fn validation_inside_pipeline_error_returns_400() {
    let err = AppError::Pipeline(PipelineError::Core(CoreError::Validation(
        "Caddyfile content is required".into(),
    )));
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Caddyfile content is required");
}

#[tokio::test]
async fn store_conflict_returns_409() {
    let err = AppError::Pipeline(PipelineError::Store(StoreError::Conflict(
        "uq_proxy_hosts_uuid".into(),
    )));
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn rolled_back_apply_failure_returns_500() {
    let err = AppError::Pipeline(PipelineError::Apply(ApplyError("dial tcp: refused".into())));
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "APPLY_FAILED");
    assert!(!json["error"].as_str().unwrap().contains("refused"));
}

#[tokio::test]
async fn apply_failure_after_saved_change_returns_502() {
    let err = AppError::Pipeline(PipelineError::ApplyNotRolledBack(ApplyError(
        "dial tcp: refused".into(),
    )));
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "APPLY_FAILED_NOT_ROLLED_BACK");
}

#[tokio::test]
async fn internal_error_sanitizes_message() {
    let err = AppError::InternalError("secret connection string".into());
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn io_error_is_sanitized() {
    let err = AppError::Pipeline(PipelineError::Io {
        path: "/data/imports/uploads/x".into(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    });
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!json["error"].as_str().unwrap().contains("/data"));
}

#[tokio::test]
async fn parse_error_on_stored_source_is_500_without_paths() {
    let err = AppError::Pipeline(PipelineError::Parse {
        path: "/data/imports/uploads/abc/Caddyfile".into(),
        source: CaddyfileError::Syntax {
            file: "/data/imports/uploads/abc/sites/a".into(),
            line: 1,
            message: "unclosed block".into(),
        },
    });
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "PARSE_ERROR");
    assert!(!json["error"].as_str().unwrap().contains("/data"));
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("Invalid session_uuid: must be a UUID".into());
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}
