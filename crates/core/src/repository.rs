//! Store layer for users and blogs
//!
//! Handlers only talk to the `UserRepository` and `BlogRepository` traits.
//! `PgRepository` is the production implementation; `memory::MemoryRepository`
//! backs tests and local runs without a database.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Blog, BlogChanges, NewBlog, NewUser, User, UserChanges};

/// Postgres error code for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Resource not found")]
    NotFound,
    #[error("A record with this {0} already exists")]
    Duplicate(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Constraint violations that callers handle as client errors.
/// A unique violation on `field` is a duplicate; a missing referenced row is
/// `NotFound`, matching the in-memory store.
fn constraint_error(code: Option<&str>, field: &'static str) -> Option<RepoError> {
    match code {
        Some(UNIQUE_VIOLATION) => Some(RepoError::Duplicate(field)),
        Some(FOREIGN_KEY_VIOLATION) => Some(RepoError::NotFound),
        _ => None,
    }
}

fn map_constraint_violation(err: sqlx::Error, field: &'static str) -> RepoError {
    if let sqlx::Error::Database(ref db_err) = err {
        if let Some(mapped) = constraint_error(db_err.code().as_deref(), field) {
            return mapped;
        }
    }
    RepoError::Database(err)
}

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    /// Lookup includes the password hash; callers must not serialize it
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn list_users(&self) -> Result<Vec<User>, RepoError>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, RepoError>;
    /// Deleting a user also deletes their blogs
    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait::async_trait]
pub trait BlogRepository: Send + Sync {
    async fn create_blog(&self, blog: NewBlog) -> Result<Blog, RepoError>;
    async fn find_blog_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError>;
    /// Newest first, optionally restricted to one author
    async fn list_blogs(&self, author_id: Option<Uuid>) -> Result<Vec<Blog>, RepoError>;
    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> Result<Blog, RepoError>;
    async fn delete_blog(&self, id: Uuid) -> Result<(), RepoError>;
}

const USER_COLUMNS: &str =
    "id, email, full_name, phone_number, password_hash, role, created_at, updated_at";
const BLOG_COLUMNS: &str = "id, title, body, author_id, created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl UserRepository for PgRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, full_name, phone_number, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "email"))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = $1, full_name = $2, phone_number = $3, password_hash = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&changes.email)
        .bind(&changes.full_name)
        .bind(&changes.phone_number)
        .bind(&changes.password_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "email"))?
        .ok_or(RepoError::NotFound)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        // blogs.author_id cascades
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Err(RepoError::NotFound)
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl BlogRepository for PgRepository {
    async fn create_blog(&self, blog: NewBlog) -> Result<Blog, RepoError> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            r#"
            INSERT INTO blogs (id, title, body, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&blog.title)
        .bind(&blog.body)
        .bind(blog.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "id"))?;
        Ok(blog)
    }

    async fn find_blog_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(blog)
    }

    async fn list_blogs(&self, author_id: Option<Uuid>) -> Result<Vec<Blog>, RepoError> {
        let blogs = sqlx::query_as::<_, Blog>(&format!(
            r#"
            SELECT {BLOG_COLUMNS} FROM blogs
            WHERE ($1::uuid IS NULL OR author_id = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(blogs)
    }

    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> Result<Blog, RepoError> {
        sqlx::query_as::<_, Blog>(&format!(
            r#"
            UPDATE blogs SET title = $1, body = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(&changes.title)
        .bind(&changes.body)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn delete_blog(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Err(RepoError::NotFound)
        } else {
            Ok(())
        }
    }
}
