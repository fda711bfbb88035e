//! In-memory store implementing both repository traits
//!
//! Mirrors the Postgres constraints that handlers rely on: unique emails and
//! blogs cascading away with their author.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Blog, BlogChanges, NewBlog, NewUser, User, UserChanges};
use crate::repository::{BlogRepository, RepoError, UserRepository};

#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<Uuid, User>>,
    blogs: RwLock<HashMap<Uuid, Blog>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(items: &mut [T], created_at: F)
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait::async_trait]
impl UserRepository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Duplicate("email"));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            full_name: user.full_name,
            phone_number: user.phone_number,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != id && u.email == changes.email)
        {
            return Err(RepoError::Duplicate("email"));
        }

        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.email = changes.email;
        user.full_name = changes.full_name;
        user.phone_number = changes.phone_number;
        user.password_hash = changes.password_hash;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        if users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        self.blogs.write().await.retain(|_, b| b.author_id != id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl BlogRepository for MemoryRepository {
    async fn create_blog(&self, blog: NewBlog) -> Result<Blog, RepoError> {
        // Same guarantee as the Postgres foreign key. The users guard is held
        // across the insert; lock order is users then blogs, as in `delete_user`.
        let users = self.users.read().await;
        if !users.contains_key(&blog.author_id) {
            return Err(RepoError::NotFound);
        }

        let now = Utc::now();
        let created = Blog {
            id: Uuid::new_v4(),
            title: blog.title,
            body: blog.body,
            author_id: blog.author_id,
            created_at: now,
            updated_at: now,
        };
        self.blogs.write().await.insert(created.id, created.clone());
        drop(users);
        Ok(created)
    }

    async fn find_blog_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        Ok(self.blogs.read().await.get(&id).cloned())
    }

    async fn list_blogs(&self, author_id: Option<Uuid>) -> Result<Vec<Blog>, RepoError> {
        let mut blogs: Vec<Blog> = self
            .blogs
            .read()
            .await
            .values()
            .filter(|b| author_id.map_or(true, |a| b.author_id == a))
            .cloned()
            .collect();
        newest_first(&mut blogs, |b| b.created_at);
        Ok(blogs)
    }

    async fn update_blog(&self, id: Uuid, changes: BlogChanges) -> Result<Blog, RepoError> {
        let mut blogs = self.blogs.write().await;
        let blog = blogs.get_mut(&id).ok_or(RepoError::NotFound)?;
        blog.title = changes.title;
        blog.body = changes.body;
        blog.updated_at = Utc::now();
        Ok(blog.clone())
    }

    async fn delete_blog(&self, id: Uuid) -> Result<(), RepoError> {
        match self.blogs.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            phone_number: None,
            password_hash: "hash".to_string(),
            role: Role::Blogger,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = MemoryRepository::new();
        repo.create_user(new_user("a@example.com")).await.unwrap();

        let err = repo.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate("email")));
    }

    #[tokio::test]
    async fn test_update_to_taken_email_rejected() {
        let repo = MemoryRepository::new();
        repo.create_user(new_user("a@example.com")).await.unwrap();
        let b = repo.create_user(new_user("b@example.com")).await.unwrap();

        let mut changes = UserChanges::from_existing(&b);
        changes.email = "a@example.com".to_string();
        let err = repo.update_user(b.id, changes).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate("email")));

        // Keeping your own email is fine
        let same = UserChanges::from_existing(&b);
        assert!(repo.update_user(b.id, same).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user_cascades_to_blogs() {
        let repo = MemoryRepository::new();
        let author = repo.create_user(new_user("a@example.com")).await.unwrap();
        let other = repo.create_user(new_user("b@example.com")).await.unwrap();
        for author_id in [author.id, other.id] {
            repo.create_blog(NewBlog {
                title: "t".to_string(),
                body: "b".to_string(),
                author_id,
            })
            .await
            .unwrap();
        }

        repo.delete_user(author.id).await.unwrap();

        assert!(repo.find_user_by_id(author.id).await.unwrap().is_none());
        let remaining = repo.list_blogs(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].author_id, other.id);
        assert!(matches!(repo.delete_user(author.id).await, Err(RepoError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_delete_leaves_no_orphan_blogs() {
        let repo = std::sync::Arc::new(MemoryRepository::new());
        for i in 0..50 {
            let author_id = repo
                .create_user(new_user(&format!("u{}@example.com", i)))
                .await
                .unwrap()
                .id;

            let creator = {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create_blog(NewBlog {
                        title: "t".to_string(),
                        body: "b".to_string(),
                        author_id,
                    })
                    .await
                })
            };
            let deleter = {
                let repo = repo.clone();
                tokio::spawn(async move { repo.delete_user(author_id).await })
            };

            let _ = creator.await.unwrap();
            deleter.await.unwrap().unwrap();
            assert!(repo.list_blogs(Some(author_id)).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_blog_requires_existing_author() {
        let repo = MemoryRepository::new();
        let result = repo
            .create_blog(NewBlog {
                title: "t".to_string(),
                body: "b".to_string(),
                author_id: Uuid::new_v4(),
            })
            .await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_blogs_filters_by_author() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(new_user("a@example.com")).await.unwrap();
        let b = repo.create_user(new_user("b@example.com")).await.unwrap();
        for author_id in [a.id, a.id, b.id] {
            repo.create_blog(NewBlog {
                title: "t".to_string(),
                body: "b".to_string(),
                author_id,
            })
            .await
            .unwrap();
        }

        assert_eq!(repo.list_blogs(None).await.unwrap().len(), 3);
        assert_eq!(repo.list_blogs(Some(a.id)).await.unwrap().len(), 2);
        assert_eq!(repo.list_blogs(Some(Uuid::new_v4())).await.unwrap().len(), 0);
    }
}
