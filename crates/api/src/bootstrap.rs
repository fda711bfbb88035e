//! Startup seeding of the admin account
//!
//! Signup never grants the admin role, so the first admin comes from
//! `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_PASSWORD`. An existing account
//! with that email is left untouched.

use quillpost_core::models::{NewUser, Role, User};
use quillpost_core::validation::{normalize_email, validate_password};
use quillpost_core::UserRepository;

use crate::config::AdminBootstrap;
use crate::error::ApiError;
use crate::password::hash_password_blocking;

pub async fn ensure_admin(
    users: &dyn UserRepository,
    admin: &AdminBootstrap,
) -> Result<User, ApiError> {
    let email = normalize_email(&admin.email)?;

    if let Some(existing) = users.find_user_by_email(&email).await? {
        if existing.role != Role::Admin {
            tracing::warn!(
                "Bootstrap admin {} already exists with role {}; leaving it unchanged",
                existing.id,
                existing.role
            );
        }
        return Ok(existing);
    }

    validate_password(&admin.password)?;
    let password_hash = hash_password_blocking(admin.password.clone()).await?;

    let user = users
        .create_user(NewUser {
            email,
            full_name: "Administrator".to_string(),
            phone_number: None,
            password_hash,
            role: Role::Admin,
        })
        .await?;

    tracing::info!("Created bootstrap admin {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use quillpost_core::MemoryRepository;

    fn bootstrap(email: &str, password: &str) -> AdminBootstrap {
        AdminBootstrap {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_creates_admin_once() {
        let repo = MemoryRepository::new();
        let config = bootstrap("Root@Example.com", "root-password-123");

        let first = ensure_admin(&repo, &config).await.unwrap();
        assert_eq!(first.role, Role::Admin);
        assert_eq!(first.email, "root@example.com");
        assert!(verify_password("root-password-123", &first.password_hash));

        let second = ensure_admin(&repo, &config).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_account_is_not_promoted() {
        let repo = MemoryRepository::new();
        repo.create_user(NewUser {
            email: "root@example.com".to_string(),
            full_name: "Someone".to_string(),
            phone_number: None,
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap();

        let user = ensure_admin(&repo, &bootstrap("root@example.com", "root-password-123"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_rejects_weak_password() {
        let repo = MemoryRepository::new();
        let result = ensure_admin(&repo, &bootstrap("root@example.com", "short")).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
