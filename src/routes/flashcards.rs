use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method},
    routing::get,
    Router,
};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    error::ApiError,
    extract::JsonBody,
    forward::{checked_id, forward_headers, require_object, with_query, CookiePolicy, Forwarded},
    state::AppState,
};

pub const CATEGORIES_PATH: &str = "/flashcards/categories";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/flashcards", get(list_flashcards).post(create_flashcard))
        .route("/flashcards/categories", get(list_categories))
        .route(
            "/flashcards/:id",
            get(get_flashcard).put(update_flashcard).delete(delete_flashcard),
        )
}

#[instrument(skip(state, headers))]
pub async fn list_flashcards(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = with_query("/flashcards", query.as_deref());
    state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await
}

#[instrument(skip(state, headers, body))]
pub async fn create_flashcard(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    require_object(&body, &["word"])?;
    state
        .backend
        .relay(Method::POST, "/flashcards", &headers, CookiePolicy::Strip, Some(&body))
        .await
}

#[instrument(skip(state, headers))]
pub async fn get_flashcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/flashcards/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await
}

#[instrument(skip(state, headers, body))]
pub async fn update_flashcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    require_object(&body, &[])?;
    let path = format!("/flashcards/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::PUT, &path, &headers, CookiePolicy::Strip, Some(&body))
        .await
}

#[instrument(skip(state, headers))]
pub async fn delete_flashcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/flashcards/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::DELETE, &path, &headers, CookiePolicy::Strip, None)
        .await
}

/// Categories come from one endpoint. Configured fallback paths are a
/// compatibility shim for older backends and are only tried after it fails.
#[instrument(skip(state, headers))]
pub async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let outbound = forward_headers(&headers, CookiePolicy::Strip);
    let mut last_err = match state
        .backend
        .forward(Method::GET, CATEGORIES_PATH, outbound.clone(), None)
        .await
    {
        Ok(res) => return Ok(res),
        Err(e) => e,
    };

    for path in &state.config.category_fallback_paths {
        warn!(error = %last_err, %path, "category lookup failed; trying fallback path");
        match state
            .backend
            .forward(Method::GET, path, outbound.clone(), None)
            .await
        {
            Ok(res) => {
                info!(%path, "categories served by fallback path");
                return Ok(res);
            }
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}
