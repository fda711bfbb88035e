//! HTTP API for the Quillpost blogging backend

pub mod blogs;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod password;
pub mod routes;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

use quillpost_auth::{AuthState, TokenService};
use quillpost_core::{BlogRepository, UserRepository};
use std::sync::Arc;

pub use config::AppConfig;
pub use error::ApiError;
pub use routes::router;

/// Shared application state
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub blogs: Arc<dyn BlogRepository>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// State for the `protect` middleware, sharing the same store and keys
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            tokens: self.tokens.clone(),
            users: self.users.clone(),
        }
    }
}
