use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::repo::{RepoError, UserRepo};
use crate::users::repo_types::{NewUser, User};

/// Process-local store used when no `DATABASE_URL` is configured.
#[derive(Default)]
pub struct InMemoryUserRepo {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        // check and insert under one write lock
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&new.email)) {
            return Err(RepoError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
            last_login_at: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn record_login(&self, id: &str, at: OffsetDateTime) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.iter_mut().find(|u| u.id == id).ok_or(RepoError::NotFound)?;
        user.last_login_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let repo = InMemoryUserRepo::new();
        let user = repo.create(new_user("ada@example.com")).await.expect("create");
        assert!(user.last_login_at.is_none());

        let by_email = repo.find_by_email("ADA@example.com").await.unwrap().expect("by email");
        assert_eq!(by_email.id, user.id);
        let by_id = repo.find_by_id(&user.id).await.unwrap().expect("by id");
        assert_eq!(by_id.email, "ada@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_append() {
        let repo = InMemoryUserRepo::new();
        repo.create(new_user("ada@example.com")).await.expect("first");
        let err = repo.create(new_user("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateEmail));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_signups_with_same_email_store_one_user() {
        let repo = Arc::new(InMemoryUserRepo::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create(new_user("race@example.com")).await.is_ok()
            }));
        }
        let mut created = 0;
        for h in handles {
            if h.await.expect("join") {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn record_login_sets_timestamp() {
        let repo = InMemoryUserRepo::new();
        let user = repo.create(new_user("ada@example.com")).await.expect("create");
        let at = OffsetDateTime::now_utc();
        repo.record_login(&user.id, at).await.expect("record");
        let stored = repo.find_by_id(&user.id).await.unwrap().expect("user");
        assert_eq!(stored.last_login_at, Some(at));

        let err = repo.record_login("missing", at).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }
}
