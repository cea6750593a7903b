use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::session::Identity;
use crate::{error::ApiError, state::AppState};

/// Resolved identity; 401 when there is none.
pub struct AuthUser(pub Identity);

/// Resolved identity with the admin role; 401 without identity, 403 otherwise.
pub struct AdminUser(pub Identity);

/// Resolved identity if any. Never rejects.
pub struct MaybeUser(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(state.sessions.resolve(&parts.headers).await))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match state.sessions.resolve(&parts.headers).await {
            Some(identity) => Ok(AuthUser(identity)),
            None => {
                warn!(path = %parts.uri.path(), "unauthenticated request");
                Err(ApiError::unauthenticated())
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            warn!(user_id = %identity.id, path = %parts.uri.path(), "admin role required");
            return Err(ApiError::forbidden());
        }
        Ok(AdminUser(identity))
    }
}
