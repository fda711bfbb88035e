use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use quillpost_auth::AuthUser;
use quillpost_core::models::{Blog, BlogChanges, BlogFilters, CreateBlogInput, NewBlog, UpdateBlogInput};
use quillpost_core::validation::{validate_body, validate_title};
use quillpost_core::RepoError;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery};
use crate::AppState;

async fn find_blog(state: &AppState, id: Uuid) -> Result<Blog, ApiError> {
    state
        .blogs
        .find_blog_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No blog found with the id {}", id)))
}

/// Bloggers manage their own posts; admins manage all of them
fn ensure_can_modify(auth: &AuthUser, blog: &Blog) -> Result<(), ApiError> {
    if auth.can_act_for(blog.author_id) {
        Ok(())
    } else {
        tracing::warn!("User {} tried to modify blog {} owned by {}", auth.user_id, blog.id, blog.author_id);
        Err(ApiError::Forbidden("You can only modify your own blogs"))
    }
}

/// List blogs, newest first
/// GET /blogs?author={id}
pub async fn get_all_blogs(
    State(state): State<Arc<AppState>>,
    ApiQuery(filters): ApiQuery<BlogFilters>,
) -> Result<Json<Value>, ApiError> {
    let blogs = state.blogs.list_blogs(filters.author).await?;

    Ok(Json(json!({
        "status": "success",
        "results": blogs.len(),
        "data": { "blogs": blogs }
    })))
}

/// Create a blog authored by the caller
/// POST /blogs
pub async fn create_blog(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<CreateBlogInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create(&state, &auth, auth.user_id, input).await
}

/// Create a blog for an explicit author
/// POST /blogs/{author_id}
pub async fn create_blog_for_author(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(author_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CreateBlogInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if author_id != auth.user_id {
        if !auth.is_admin() {
            return Err(ApiError::Forbidden("You can only publish blogs as yourself"));
        }
        state
            .users
            .find_user_by_id(author_id)
            .await?
            .ok_or(ApiError::NoSuchUser(author_id))?;
    }

    create(&state, &auth, author_id, input).await
}

async fn create(
    state: &AppState,
    auth: &AuthUser,
    author_id: Uuid,
    input: CreateBlogInput,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let title = validate_title(input.title.as_deref().unwrap_or_default())?;
    let body = validate_body(input.body.as_deref().unwrap_or_default())?;

    let blog = state
        .blogs
        .create_blog(NewBlog {
            title,
            body,
            author_id,
        })
        .await
        .map_err(|e| match e {
            RepoError::NotFound => ApiError::NoSuchUser(author_id),
            other => other.into(),
        })?;

    tracing::info!("Blog {} created by {} for author {}", blog.id, auth.user_id, author_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": { "blog": blog }
        })),
    ))
}

/// GET /blogs/{id}
pub async fn get_blog(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let blog = find_blog(&state, id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "blog": blog }
    })))
}

/// PATCH /blogs/{id}
pub async fn update_blog(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateBlogInput>,
) -> Result<Json<Value>, ApiError> {
    let blog = find_blog(&state, id).await?;
    ensure_can_modify(&auth, &blog)?;

    let changes = BlogChanges {
        title: match input.title.as_deref() {
            Some(title) => validate_title(title)?,
            None => blog.title,
        },
        body: match input.body.as_deref() {
            Some(body) => validate_body(body)?,
            None => blog.body,
        },
    };

    let blog = state.blogs.update_blog(id, changes).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::NotFound(format!("No blog found with the id {}", id)),
        other => other.into(),
    })?;

    Ok(Json(json!({
        "status": "success",
        "data": { "blog": blog }
    })))
}

/// DELETE /blogs/{id}
pub async fn delete_blog(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let blog = find_blog(&state, id).await?;
    ensure_can_modify(&auth, &blog)?;

    state.blogs.delete_blog(id).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::NotFound(format!("No blog found with the id {}", id)),
        other => other.into(),
    })?;

    tracing::info!("Blog {} deleted by {}", id, auth.user_id);
    Ok(StatusCode::NO_CONTENT)
}
