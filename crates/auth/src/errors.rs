//! Authentication and authorization failures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quillpost_core::RepoError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable `Authorization: Bearer <token>` header
    #[error("Not logged In")]
    NotLoggedIn,
    #[error("Invalid or expired token")]
    InvalidToken,
    /// Token is valid but its user has been deleted
    #[error("The user belonging to this token no longer exists")]
    UserGone,
    /// Role not in the route's allow-list
    #[error("You are not authorized to do this")]
    RoleDenied,
    #[error("Store error: {0}")]
    Store(#[from] RepoError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotLoggedIn => StatusCode::FORBIDDEN,
            AuthError::InvalidToken | AuthError::UserGone | AuthError::RoleDenied => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AuthError::Store(e) => {
                tracing::error!("Store error during authentication: {:?}", e);
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "status": "fail", "message": message }))).into_response()
    }
}
