//! API error type and JSON envelope
//!
//! Every failure renders as `{"status": "fail", "message": "<text>"}`.
//! Server-side failures are logged and reported with a generic message.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quillpost_auth::AuthError;
use quillpost_core::{validation::ValidationError, RepoError};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// Update/delete of a missing user
    #[error("There is no user with the id {0}")]
    NoSuchUser(Uuid),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Internal error")]
    Internal,
    #[error("{0}")]
    Json(#[from] JsonRejection),
    #[error("Invalid id in path")]
    Path(#[from] PathRejection),
    #[error("{0}")]
    Query(#[from] QueryRejection),
}

const GENERIC_MESSAGE: &str = "Something went wrong";

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::BadRequest(_)
            | ApiError::NoSuchUser(_)
            | ApiError::Path(_)
            | ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Json(rejection) => match rejection.status() {
                StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Auth(e) => e.status_code(),
            ApiError::Repo(RepoError::Duplicate(_)) => StatusCode::BAD_REQUEST,
            ApiError::Repo(RepoError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Repo(RepoError::Database(_)) | ApiError::Token(_) | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Auth(e) = self {
            return e.into_response();
        }

        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
            GENERIC_MESSAGE.to_string()
        } else {
            match &self {
                ApiError::Json(rejection) => rejection.body_text(),
                other => other.to_string(),
            }
        };

        (status, Json(json!({ "status": "fail", "message": message }))).into_response()
    }
}

/// `axum::Json` with rejections rendered as `ApiError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with rejections rendered as `ApiError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with rejections rendered as `ApiError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
