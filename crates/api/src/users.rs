use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use quillpost_auth::AuthUser;
use quillpost_core::models::{NewUser, Role, SignInInput, SignUpInput, UpdateUserInput, UserChanges};
use quillpost_core::validation::{
    normalize_email, normalize_phone_number, required, validate_full_name, validate_password,
    ValidationError,
};
use quillpost_core::RepoError;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiJson, ApiPath};
use crate::password::{hash_password_blocking, verify_password_blocking};
use crate::AppState;

/// Roles a caller may pick for themselves at signup
fn signup_role(requested: Option<&str>) -> Result<Role, ApiError> {
    let role = match requested.map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::default(),
        Some(r) => r
            .parse::<Role>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };

    if role == Role::Admin {
        return Err(ApiError::Forbidden("Admin accounts cannot be created through signup"));
    }
    Ok(role)
}

fn required_password(password: Option<String>) -> Result<String, ValidationError> {
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or(ValidationError::Missing("Password"))?;
    validate_password(&password)?;
    Ok(password)
}

/// Sign up
/// POST /users/signup
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<SignUpInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = normalize_email(required(input.email.as_deref(), "Email")?)?;
    let full_name = validate_full_name(required(input.full_name.as_deref(), "Full name")?)?;
    let phone_number = normalize_phone_number(input.phone_number.as_deref())?;
    let password = required_password(input.password)?;
    let role = signup_role(input.role.as_deref())?;

    let password_hash = hash_password_blocking(password).await?;

    let user = state
        .users
        .create_user(NewUser {
            email,
            full_name,
            phone_number,
            password_hash,
            role,
        })
        .await?;

    let token = state.tokens.issue(user.id)?;
    tracing::info!("User {} signed up with role {}", user.id, user.role);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "token": token,
            "data": { "user": user }
        })),
    ))
}

/// Sign in
/// POST /users/signin
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<SignInInput>,
) -> Result<Json<Value>, ApiError> {
    let email = input.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let password = input.password.filter(|p| !p.is_empty());
    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email.to_lowercase(), password),
        _ => {
            return Err(ApiError::BadRequest(
                "Please enter a valid password and email".to_string(),
            ))
        }
    };

    // Check the user exists before touching its hash
    let user = match state.users.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            tracing::warn!("Failed sign-in: unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        tracing::warn!("Failed sign-in for user {}: invalid password", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id)?;
    tracing::info!("User {} signed in", user.id);

    Ok(Json(json!({
        "status": "success",
        "token": token,
        "data": { "user": user }
    })))
}

/// List users
/// GET /users
pub async fn get_all(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let users = state.users.list_users().await?;

    Ok(Json(json!({
        "status": "success",
        "results": users.len(),
        "data": { "user": users }
    })))
}

/// Get one user
/// GET /users/{id}
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .users
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user found with the id {}", id)))?;

    Ok(Json(json!({
        "status": "success",
        "data": { "user": user }
    })))
}

/// Get the signed-in user
/// GET /users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    get_one(State(state), ApiPath(auth.user_id)).await
}

/// Update a user; omitted fields keep their stored values
/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateUserInput>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .users
        .find_user_by_id(id)
        .await?
        .ok_or(ApiError::NoSuchUser(id))?;

    if !auth.can_act_for(user.id) {
        return Err(ApiError::Forbidden("You can only update your own account"));
    }

    let mut changes = UserChanges::from_existing(&user);
    if let Some(email) = input.email.as_deref() {
        changes.email = normalize_email(email)?;
    }
    if let Some(full_name) = input.full_name.as_deref() {
        changes.full_name = validate_full_name(full_name)?;
    }
    if let Some(phone_number) = input.phone_number.as_deref() {
        changes.phone_number = normalize_phone_number(Some(phone_number))?;
    }
    // No password in the body keeps the stored hash as-is
    if input.password.is_some() {
        let password = required_password(input.password)?;
        changes.password_hash = hash_password_blocking(password).await?;
    }

    let updated_user = state
        .users
        .update_user(id, changes)
        .await
        .map_err(|e| match e {
            RepoError::NotFound => ApiError::NoSuchUser(id),
            other => other.into(),
        })?;

    tracing::info!("User {} updated by {}", id, auth.user_id);

    Ok(Json(json!({
        "status": "success",
        "data": { "updatedUser": updated_user }
    })))
}

/// Delete a user and their blogs
/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user = state
        .users
        .find_user_by_id(id)
        .await?
        .ok_or(ApiError::NoSuchUser(id))?;

    if !auth.can_act_for(user.id) {
        return Err(ApiError::Forbidden("You can only delete your own account"));
    }

    state.users.delete_user(id).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::NoSuchUser(id),
        other => other.into(),
    })?;

    tracing::info!("User {} deleted by {}", id, auth.user_id);
    Ok(StatusCode::NO_CONTENT)
}
