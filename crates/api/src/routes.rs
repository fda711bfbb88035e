//! Route table and the HTTP middleware stack

use axum::{
    http::{header, StatusCode, Uri},
    middleware::{from_fn_with_state, map_response},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use quillpost_auth::{protect, require_roles, BLOG_AUTHORS};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::error::ApiError;
use crate::{blogs, users, AppState};

/// Request bodies above this size are rejected with 413
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    // Role gate sits inside `protect`, which attaches the caller
    let blog_writers = Router::new()
        .route("/blogs", post(blogs::create_blog))
        .route(
            "/blogs/{id}",
            post(blogs::create_blog_for_author)
                .patch(blogs::update_blog)
                .delete(blogs::delete_blog),
        )
        .route_layer(from_fn_with_state(BLOG_AUTHORS, require_roles));

    let signed_in = Router::new()
        .route("/users", get(users::get_all))
        .route("/users/me", get(users::get_me))
        .route(
            "/users/{id}",
            get(users::get_one)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/blogs/{id}", get(blogs::get_blog))
        .merge(blog_writers)
        .route_layer(from_fn_with_state(state.auth_state(), protect));

    let public = Router::new()
        .route("/health", get(health))
        .route("/users/signup", post(users::sign_up))
        .route("/users/signin", post(users::sign_in))
        .route("/blogs", get(blogs::get_all_blogs));

    public
        .merge(signed_in)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(map_response(envelope_bare_errors))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Can't find {} on this server", uri.path()))
}

/// Wrap error responses produced outside the handlers (timeouts, 405s,
/// body-limit rejections) in the same `{status, message}` envelope.
async fn envelope_bare_errors(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let message = match status {
        StatusCode::REQUEST_TIMEOUT => "Request timed out",
        StatusCode::METHOD_NOT_ALLOWED => "Method not allowed",
        StatusCode::PAYLOAD_TOO_LARGE => "Request body too large",
        other => other.canonical_reason().unwrap_or("Request failed"),
    };

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut enveloped =
        (status, Json(json!({ "status": "fail", "message": message }))).into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(header::ALLOW, allow);
    }
    enveloped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use axum::http::Method;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.request(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let app = TestApp::new();
        let (status, body) = app.request(Method::GET, "/posts", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Can't find /posts on this server");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let app = TestApp::new();
        let body = format!("{{\"title\":\"{}\"}}", "x".repeat(super::MAX_BODY_BYTES + 1));
        let (status, body) = app
            .raw_request(Method::POST, "/users/signup", None, &body)
            .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn test_wrong_method_uses_envelope() {
        let app = TestApp::new();
        let (status, body) = app.request(Method::PUT, "/health", None, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_timeout_uses_envelope() {
        let bare = StatusCode::REQUEST_TIMEOUT.into_response();
        let response = envelope_bare_errors(bare).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Request timed out");
    }

    #[tokio::test]
    async fn test_handler_errors_pass_through() {
        let response = ApiError::Forbidden("nope").into_response();
        let response = envelope_bare_errors(response).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "nope");
    }

    #[tokio::test]
    async fn test_bad_path_id_is_bad_request() {
        let app = TestApp::new();
        let (token, _) = app.create_admin("admin@example.com").await;
        let (status, body) = app
            .request(Method::GET, "/users/not-a-uuid", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid id in path");
    }
}
