//! Helpers shared by router-level tests.

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

/// Nothing listens here; requests fail at connect time.
pub const UNREACHABLE_BACKEND: &str = "http://127.0.0.1:1";

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test backend");
    });
    format!("http://{addr}")
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("infallible router")
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request")
}

pub async fn read_bytes(res: Response<Body>) -> axum::body::Bytes {
    axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body")
}

pub async fn read_json(res: Response<Body>) -> Value {
    serde_json::from_slice(&read_bytes(res).await).expect("json body")
}

/// `Cookie` value carrying a token signed for the sample user with `role`.
pub fn session_cookie_for(state: &crate::state::AppState, role: crate::users::Role) -> String {
    let user = crate::auth::jwt::tests::sample_user(role);
    format!("token={}", state.jwt.sign(&user).expect("sign"))
}

pub fn request_with_cookie(method: Method, uri: &str, cookie: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}
