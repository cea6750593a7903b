use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use super::{jwt::JwtKeys, password::hash_password, token::session_cookies};
use crate::{
    config::AdminSeed,
    error::ApiError,
    state::AppState,
    users::{NewUser, RepoError, Role, User, UserRepo},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed, non-empty field or a 400 naming it.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}

/// Signs a token for `user` and builds the matching `Set-Cookie` values.
pub(crate) fn issue_session(
    state: &AppState,
    keys: &JwtKeys,
    user: &User,
) -> Result<(String, [String; 2]), ApiError> {
    let token = keys
        .sign(user)
        .map_err(|e| ApiError::Internal(format!("jwt sign failed: {e}")))?;
    let cookies = session_cookies(
        &token,
        keys.session_ttl.as_secs(),
        state.config.cookie_secure(),
    );
    Ok((token, cookies))
}

/// Creates the configured admin account unless the email is already taken.
pub async fn ensure_admin(users: &dyn UserRepo, seed: &AdminSeed) -> anyhow::Result<()> {
    let email = normalize_email(&seed.email);
    if users.find_by_email(&email).await?.is_some() {
        return Ok(());
    }
    let password_hash = hash_password(&seed.password)?;
    match users
        .create(NewUser {
            name: seed.name.clone(),
            email: email.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, %email, "admin account created");
            Ok(())
        }
        // another instance won the race
        Err(RepoError::DuplicateEmail) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::InMemoryUserRepo;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example.com"));
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn required_rejects_blank() {
        assert_eq!(required(Some(" x ".into()), "Name").unwrap(), "x");
        let err = required(Some("   ".into()), "Name").unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
        assert!(required(None, "Email").is_err());
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let repo = InMemoryUserRepo::new();
        let seed = AdminSeed {
            email: "Root@Example.com".into(),
            password: "changeme123".into(),
            name: "Root".into(),
        };
        ensure_admin(&repo, &seed).await.expect("first");
        ensure_admin(&repo, &seed).await.expect("second");
        assert_eq!(repo.len().await, 1);
        let admin = repo.find_by_email("root@example.com").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
