//! In-process application harness for handler tests

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use quillpost_auth::{JwtConfig, TokenService};
use quillpost_core::models::{NewUser, Role};
use quillpost_core::{MemoryRepository, UserRepository};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use crate::password::hash_password;
use crate::{routes, AppState};

pub(crate) struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub tokens: Arc<TokenService>,
}

impl TestApp {
    pub const PASSWORD: &'static str = "correct-horse-battery";

    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let tokens = Arc::new(TokenService::new(JwtConfig {
            secret: "quillpost-test-secret-at-least-32-chars".to_string(),
            secret_secondary: None,
            issuer: "quillpost".to_string(),
            audience: "quillpost-api".to_string(),
            expires_in: Duration::from_secs(3600),
        }));

        let state = Arc::new(AppState {
            users: repo.clone(),
            blogs: repo.clone(),
            tokens: tokens.clone(),
        });

        Self {
            router: routes::router(state, Duration::from_secs(30)),
            repo,
            tokens,
        }
    }

    /// Send a raw body with a JSON content type. An empty response body reads
    /// as `Null` and a non-JSON one as a string.
    pub async fn raw_request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len());
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        self.raw_request(method, uri, token, &body).await
    }

    /// Sign up through the HTTP route, returning the issued token and new id
    pub async fn sign_up(&self, email: &str, role: Role) -> (String, Uuid) {
        let (status, body) = self
            .request(
                Method::POST,
                "/users/signup",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "fullName": "Test User",
                    "password": Self::PASSWORD,
                    "role": role.as_str(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

        let token = body["token"].as_str().unwrap().to_string();
        let id = body["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
        (token, id)
    }

    /// Admins cannot sign up, so they are written straight to the store
    pub async fn create_admin(&self, email: &str) -> (String, Uuid) {
        let user = self
            .repo
            .create_user(NewUser {
                email: email.to_string(),
                full_name: "Admin".to_string(),
                phone_number: None,
                password_hash: hash_password(Self::PASSWORD).unwrap(),
                role: Role::Admin,
            })
            .await
            .unwrap();

        (self.tokens.issue(user.id).unwrap(), user.id)
    }
}
