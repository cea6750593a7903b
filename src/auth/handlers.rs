use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SessionResponse, SignupRequest},
        extractors::MaybeUser,
        jwt::JwtKeys,
        password::{burn_verification, hash_password, verify_password},
        services::{is_valid_email, issue_session, normalize_email, required},
        token::cleared_session_cookies,
    },
    error::ApiError,
    extract::JsonBody,
    state::AppState,
    users::{NewUser, Role},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required(payload.name, "Name")?;
    let email = normalize_email(&required(payload.email, "Email")?);
    let password = required(payload.password, "Password")?;

    if !is_valid_email(&email) {
        warn!("signup rejected: invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash =
        hash_password(&password).map_err(|e| ApiError::Internal(e.to_string()))?;

    // the store enforces uniqueness; a taken email comes back as 409
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role: Role::User,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "signup rejected");
            ApiError::from(e)
        })?;

    let keys = JwtKeys::from_ref(&state);
    let (token, cookies) = issue_session(&state, &keys, &user)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        AppendHeaders(cookies.map(|c| (SET_COOKIE, c))),
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&required(payload.email, "Email")?);
    let password = required(payload.password, "Password")?;

    let invalid = || ApiError::Authentication("Invalid credentials".into());

    let Some(mut user) = state.users.find_by_email(&email).await? else {
        burn_verification(&password);
        warn!("login rejected: unknown email");
        return Err(invalid());
    };

    let ok = verify_password(&password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !ok {
        warn!(user_id = %user.id, "login rejected: invalid password");
        return Err(invalid());
    }

    let now = OffsetDateTime::now_utc();
    match state.users.record_login(&user.id, now).await {
        Ok(()) => user.last_login_at = Some(now),
        Err(e) => warn!(error = %e, user_id = %user.id, "could not record login time"),
    }

    let keys = JwtKeys::from_ref(&state);
    let (token, cookies) = issue_session(&state, &keys, &user)?;

    info!(user_id = %user.id, "user logged in");
    Ok((
        AppendHeaders(cookies.map(|c| (SET_COOKIE, c))),
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookies = cleared_session_cookies(state.config.cookie_secure());
    (
        AppendHeaders(cookies.map(|c| (SET_COOKIE, c))),
        Json(json!({ "message": "Logged out" })),
    )
}

#[instrument(skip_all)]
pub async fn session(MaybeUser(user): MaybeUser) -> Result<Json<SessionResponse>, ApiError> {
    user.map(|user| Json(SessionResponse { user }))
        .ok_or_else(ApiError::unauthenticated)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{json_request, read_json, send, UNREACHABLE_BACKEND};
    use crate::{app::build_app, state::AppState};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::json;

    fn signup_body(email: &str) -> serde_json::Value {
        json!({ "name": "Ada", "email": email, "password": "correct-horse" })
    }

    #[tokio::test]
    async fn signup_creates_user_and_sets_cookies() {
        let state = AppState::fake(UNREACHABLE_BACKEND);
        let app = build_app(state.clone());

        let res = send(&app, json_request(Method::POST, "/api/auth/signup", signup_body("Ada@Example.com"))).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let cookies: Vec<_> = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().any(|c| c.starts_with("auth_session=")));
        assert!(cookies.iter().all(|c| c.contains("HttpOnly") && c.contains("SameSite=Lax")));

        let body = read_json(res).await;
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert_eq!(body["user"]["role"], "user");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn duplicate_signup_is_conflict_without_new_record() {
        let (state, users) = AppState::fake_with_users(UNREACHABLE_BACKEND);
        let app = build_app(state.clone());

        let first = send(&app, json_request(Method::POST, "/api/auth/signup", signup_body("ada@example.com"))).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = send(&app, json_request(Method::POST, "/api/auth/signup", signup_body("ADA@example.com"))).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(
            read_json(second).await,
            json!({ "message": "User with this email already exists" })
        );

        let stored = state.users.find_by_email("ada@example.com").await.unwrap();
        assert!(stored.is_some());
        assert_eq!(users.len().await, 1);
    }

    #[tokio::test]
    async fn signup_rejects_missing_and_invalid_fields() {
        let app = build_app(AppState::fake(UNREACHABLE_BACKEND));

        let res = send(&app, json_request(Method::POST, "/api/auth/signup", json!({ "email": "a@b.co", "password": "longenough" }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(res).await, json!({ "message": "Name is required" }));

        let res = send(&app, json_request(Method::POST, "/api/auth/signup", json!({ "name": "A", "email": "nope", "password": "longenough" }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, json_request(Method::POST, "/api/auth/signup", json!({ "name": "A", "email": "a@b.co", "password": "short" }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(res).await, json!({ "message": "Invalid JSON body" }));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn rejected_credentials_do_not_log_emails() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = build_app(AppState::fake(UNREACHABLE_BACKEND));
        send(&app, json_request(Method::POST, "/api/auth/signup", signup_body("ada@example.com"))).await;
        send(&app, json_request(Method::POST, "/api/auth/signup", json!({ "name": "A", "email": "bad-address@", "password": "longenough" }))).await;
        send(&app, json_request(Method::POST, "/api/auth/login", json!({ "email": "ada@example.com", "password": "wrong-password" }))).await;
        send(&app, json_request(Method::POST, "/api/auth/login", json!({ "email": "ghost@example.com", "password": "whatever1" }))).await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("login rejected"), "{output}");
        for email in ["ada@example.com", "bad-address@", "ghost@example.com"] {
            assert!(!output.contains(email), "{email} leaked into logs:\n{output}");
        }
    }

    #[tokio::test]
    async fn login_checks_password_and_records_time() {
        let state = AppState::fake(UNREACHABLE_BACKEND);
        let app = build_app(state.clone());
        send(&app, json_request(Method::POST, "/api/auth/signup", signup_body("ada@example.com"))).await;

        let res = send(&app, json_request(Method::POST, "/api/auth/login", json!({ "email": "ada@example.com", "password": "wrong-password" }))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(read_json(res).await, json!({ "message": "Invalid credentials" }));

        let res = send(&app, json_request(Method::POST, "/api/auth/login", json!({ "email": "nobody@example.com", "password": "correct-horse" }))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(&app, json_request(Method::POST, "/api/auth/login", json!({ "email": "ada@example.com", "password": "correct-horse" }))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = read_json(res).await;
        assert!(body["user"]["lastLoginAt"].is_string());

        let stored = state.users.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn session_round_trip_and_logout() {
        let app = build_app(AppState::fake(UNREACHABLE_BACKEND));
        let res = send(&app, json_request(Method::POST, "/api/auth/signup", signup_body("ada@example.com"))).await;
        let token = read_json(res).await["token"].as_str().unwrap().to_string();

        let req = Request::builder()
            .uri("/api/auth/session")
            .header(header::COOKIE, format!("auth_session={token}"))
            .body(Body::empty())
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_json(res).await["user"]["email"], "ada@example.com");

        let req = Request::builder().uri("/api/auth/session").body(Body::empty()).unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cleared: Vec<_> = res.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|c| c.to_str().unwrap().contains("Max-Age=0")));
    }
}
