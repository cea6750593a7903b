//! Practice history. Both routes need a resolved identity; the backend
//! scopes the records by the bearer token it receives.

use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, Method},
    routing::get,
    Router,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    extract::JsonBody,
    forward::{require_object, with_query, CookiePolicy, Forwarded},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/practice/history", get(list_history).post(record_history))
}

#[instrument(skip(state, headers, user), fields(user_id = %user.id))]
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = with_query("/practice/history", query.as_deref());
    state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Forward, None)
        .await
}

#[instrument(skip(state, headers, user, body), fields(user_id = %user.id))]
pub async fn record_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    let mut entry = require_object(&body, &[])?.clone();
    if !entry.get("score").is_some_and(Value::is_number) {
        return Err(ApiError::Validation("score must be a number".into()));
    }
    // the caller cannot record history for someone else
    entry.insert("userId".into(), Value::String(user.id.clone()));

    let res = state
        .backend
        .relay(
            Method::POST,
            "/practice/history",
            &headers,
            CookiePolicy::Forward,
            Some(&Value::Object(entry)),
        )
        .await?;
    info!("practice result recorded");
    Ok(res)
}
