use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use quillpost_core::{models::Role, UserRepository};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::AuthError;
use crate::jwt::{TokenService, VerifiedToken};

const BEARER_PREFIX: &str = "Bearer ";

/// Roles allowed to write blogs
pub const BLOG_AUTHORS: &[Role] = &[Role::Blogger, Role::Admin];
pub const ADMINS: &[Role] = &[Role::Admin];

/// Authenticated user context that gets inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners act on their own records; admins act on anyone's
    pub fn can_act_for(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}

/// State for the `protect` middleware
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserRepository>,
}

/// Extract stage: the token after the `Bearer ` scheme marker.
///
/// Missing, non-UTF-8, non-Bearer and empty-token headers are all rejected.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::NotLoggedIn)?
        .to_str()
        .map_err(|_| AuthError::NotLoggedIn)?;

    value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::NotLoggedIn)
}

/// Load stage: resolve the verified token to a stored user
pub async fn load_user(
    users: &dyn UserRepository,
    token: &VerifiedToken,
) -> Result<AuthUser, AuthError> {
    let user = users
        .find_user_by_id(token.user_id)
        .await?
        .ok_or(AuthError::UserGone)?;

    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
        role: user.role,
    })
}

/// Extract -> Verify -> Load
pub async fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let token = extract_bearer(headers)?;
    let verified = state.tokens.verify(token)?;
    load_user(state.users.as_ref(), &verified).await
}

/// Authorize stage: pass only if the user's role is in the allow-list
pub fn restrict_to(auth_user: &AuthUser, allowed_roles: &[Role]) -> Result<(), AuthError> {
    if allowed_roles.contains(&auth_user.role) {
        Ok(())
    } else {
        Err(AuthError::RoleDenied)
    }
}

/// Authentication middleware
///
/// Only accepts tokens from the Authorization header. The loaded user is
/// checked against the store on every request so deleted accounts lose
/// access immediately.
pub async fn protect(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_user = match authenticate(&state, req.headers()).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Rejected request to {}: {}", req.uri().path(), e);
            return Err(e);
        }
    };

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

/// Role gate middleware; must be layered inside `protect`
pub async fn require_roles(
    State(allowed_roles): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::NotLoggedIn)?;

    if let Err(e) = restrict_to(auth_user, allowed_roles) {
        tracing::warn!(
            "User {} with role {} denied access to {}",
            auth_user.user_id,
            auth_user.role,
            req.uri().path()
        );
        return Err(e);
    }

    Ok(next.run(req).await)
}
