//! Page-level access gate.
//!
//! Runs before routing. Protected and admin pages need a session cookie;
//! without one the browser is sent to the login page with the original path
//! as `callbackUrl`. Only presence is checked here. The token is validated
//! by whatever handles the request.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;
use url::form_urlencoded;

use crate::auth::token::has_session_cookie;

pub const LOGIN_PATH: &str = "/login";

const PUBLIC_PATHS: [&str; 4] = ["/", "/login", "/signup", "/about"];
const PROTECTED_PREFIXES: [&str; 5] = ["/dashboard", "/flashcards", "/practice", "/history", "/profile"];
const ADMIN_PREFIX: &str = "/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// API, static assets and framework internals; never gated.
    Excluded,
    Public,
    Protected,
    Admin,
    Unlisted,
}

/// True when `path` is `prefix` itself or lies below it.
fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn classify(path: &str) -> PathClass {
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if under(path, "/api")
        || path.starts_with("/_next/")
        || path.starts_with("/static/")
        || path == "/favicon.ico"
        || last_segment.contains('.')
    {
        return PathClass::Excluded;
    }
    if under(path, ADMIN_PREFIX) {
        return PathClass::Admin;
    }
    if PROTECTED_PREFIXES.iter().any(|p| under(path, p)) {
        return PathClass::Protected;
    }
    if PUBLIC_PATHS.contains(&path) {
        return PathClass::Public;
    }
    PathClass::Unlisted
}

/// `/login?callbackUrl=<path>`, with the path form-encoded except for `/`.
pub fn login_redirect(path: &str) -> Redirect {
    let callback = path
        .split('/')
        .map(|segment| form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("/");
    Redirect::temporary(&format!("{LOGIN_PATH}?callbackUrl={callback}"))
}

pub async fn route_gate(req: Request, next: Next) -> Response {
    let path = req.uri().path();
    match classify(path) {
        PathClass::Protected | PathClass::Admin if !has_session_cookie(req.headers()) => {
            debug!(%path, "no session cookie; redirecting to login");
            login_redirect(path).into_response()
        }
        _ => next.run(req).await,
    }
}
