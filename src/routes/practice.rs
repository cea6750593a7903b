use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method},
    routing::get,
    Router,
};
use serde_json::Value;
use tracing::instrument;

use crate::{
    error::ApiError,
    extract::JsonBody,
    forward::{
        checked_id,
        filters::{filter_set, filter_sets, retain_valid_questions, validate_question_body},
        require_object, with_query, CookiePolicy, Forwarded,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/practice", get(list_questions).post(create_question))
        .route("/practice/sets", get(list_sets).post(create_set))
        .route("/practice/sets/:id", get(get_set).put(update_set).delete(delete_set))
        .route(
            "/practice/:id",
            get(get_question).put(update_question).delete(delete_question),
        )
}

#[instrument(skip(state, headers))]
pub async fn list_questions(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = with_query("/practice", query.as_deref());
    let res = state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await?;
    Ok(res.map_body(retain_valid_questions))
}

#[instrument(skip(state, headers, body))]
pub async fn create_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    validate_question_body(&body)?;
    state
        .backend
        .relay(Method::POST, "/practice", &headers, CookiePolicy::Strip, Some(&body))
        .await
}

#[instrument(skip(state, headers))]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/practice/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await
}

#[instrument(skip(state, headers, body))]
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    require_object(&body, &[])?;
    let path = format!("/practice/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::PUT, &path, &headers, CookiePolicy::Strip, Some(&body))
        .await
}

#[instrument(skip(state, headers))]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/practice/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::DELETE, &path, &headers, CookiePolicy::Strip, None)
        .await
}

#[instrument(skip(state, headers))]
pub async fn list_sets(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = with_query("/practice/sets", query.as_deref());
    let res = state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await?;
    Ok(res.map_body(filter_sets))
}

#[instrument(skip(state, headers, body))]
pub async fn create_set(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    require_object(&body, &["name"])?;
    state
        .backend
        .relay(Method::POST, "/practice/sets", &headers, CookiePolicy::Strip, Some(&body))
        .await
}

#[instrument(skip(state, headers))]
pub async fn get_set(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/practice/sets/{}", checked_id(&id)?);
    let res = state
        .backend
        .relay(Method::GET, &path, &headers, CookiePolicy::Strip, None)
        .await?;
    Ok(res.map_body(filter_set))
}

#[instrument(skip(state, headers, body))]
pub async fn update_set(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> Result<Forwarded, ApiError> {
    require_object(&body, &[])?;
    let path = format!("/practice/sets/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::PUT, &path, &headers, CookiePolicy::Strip, Some(&body))
        .await
}

#[instrument(skip(state, headers))]
pub async fn delete_set(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Forwarded, ApiError> {
    let path = format!("/practice/sets/{}", checked_id(&id)?);
    state
        .backend
        .relay(Method::DELETE, &path, &headers, CookiePolicy::Strip, None)
        .await
}

#[cfg(test)]
mod tests {
    use crate::{
        app::build_app,
        state::AppState,
        test_support::{get_with_cookie, json_request, read_json, send, spawn_backend},
    };
    use axum::{
        http::{Method, StatusCode},
        routing::{delete, get},
        Json, Router,
    };
    use serde_json::json;

    fn practice_backend() -> Router {
        Router::new()
            .route(
                "/practice",
                get(|| async {
                    Json(json!([
                        { "id": "q1", "type": "fill", "word": "lucid", "sentence": "A ___ mind." },
                        { "id": "q2", "type": "fill", "word": "terse" }
                    ]))
                })
                .post(|| async { (StatusCode::CREATED, Json(json!({ "id": "q3" }))) }),
            )
            .route(
                "/practice/sets/:id",
                get(|| async {
                    Json(json!({ "id": "s1", "name": "Week 1", "questions": [
                        { "id": "q1", "type": "multiple_choice", "options": ["a"] },
                        { "id": "q9", "type": "multiple_choice" }
                    ]}))
                }),
            )
            .route("/practice/:id", delete(|| async { StatusCode::NO_CONTENT }))
    }

    #[tokio::test]
    async fn question_list_drops_malformed_entries() {
        let app = build_app(AppState::fake(&spawn_backend(practice_backend()).await));
        let res = send(&app, get_with_cookie("/api/practice", "token=t")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = read_json(res).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "q1");
    }

    #[tokio::test]
    async fn set_questions_are_filtered() {
        let app = build_app(AppState::fake(&spawn_backend(practice_backend()).await));
        let res = send(&app, get_with_cookie("/api/practice/sets/s1", "token=t")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = read_json(res).await;
        assert_eq!(body["name"], "Week 1");
        assert_eq!(body["questions"], json!([{ "id": "q1", "type": "multiple_choice", "options": ["a"] }]));
    }

    #[tokio::test]
    async fn create_question_rejects_fill_without_sentence() {
        let app = build_app(AppState::fake(&spawn_backend(practice_backend()).await));
        let res = send(&app, json_request(Method::POST, "/api/practice", json!({ "type": "fill", "word": "terse" }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(
            &app,
            json_request(Method::POST, "/api/practice", json!({ "type": "fill", "word": "terse", "sentence": "Be ___." })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn delete_passes_no_content_through() {
        let app = build_app(AppState::fake(&spawn_backend(practice_backend()).await));
        let req = axum::http::Request::builder()
            .method(Method::DELETE)
            .uri("/api/practice/q1")
            .body(axum::body::Body::empty())
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn malformed_id_is_rejected_before_forwarding() {
        let app = build_app(AppState::fake(crate::test_support::UNREACHABLE_BACKEND));
        let res = send(&app, get_with_cookie("/api/practice/bad%20id", "token=t")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(res).await, json!({ "message": "Invalid id" }));
    }
}
