use axum::async_trait;
use time::OffsetDateTime;

use crate::users::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Credential store. Implementations enforce unique emails themselves.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError>;

    /// Fails with `RepoError::DuplicateEmail` when the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, RepoError>;

    async fn record_login(&self, id: &str, at: OffsetDateTime) -> Result<(), RepoError>;
}
