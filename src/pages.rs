//! Page descriptors.
//!
//! Pages are answered with `{page, user}` JSON. The gate has already made
//! sure a session cookie exists for protected paths; here the token is
//! actually resolved and admin pages check the role.

use axum::{
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    auth::{extractors::MaybeUser, session::Identity},
    error::ApiError,
    gate::{classify, login_redirect, PathClass},
    state::AppState,
};

const PAGES: [&str; 10] = [
    "/",
    "/login",
    "/signup",
    "/about",
    "/dashboard",
    "/flashcards",
    "/practice",
    "/history",
    "/profile",
    "/admin",
];

/// Sections that also serve nested pages such as `/flashcards/42`.
const NESTED: [&str; 6] = ["/dashboard", "/flashcards", "/practice", "/history", "/profile", "/admin"];

#[derive(Debug, Serialize)]
pub struct PageDescriptor {
    pub page: String,
    pub user: Option<Identity>,
}

pub fn router() -> Router<AppState> {
    let mut router = Router::new();
    for path in PAGES {
        router = router.route(path, get(page));
    }
    for section in NESTED {
        router = router.route(&format!("{section}/*rest"), get(page));
    }
    router
}

/// `home` for `/`, otherwise the path without its leading slash.
fn page_name(path: &str) -> String {
    match path.trim_matches('/') {
        "" => "home".to_string(),
        name => name.to_string(),
    }
}

pub async fn page(uri: Uri, MaybeUser(user): MaybeUser) -> Result<Response, ApiError> {
    let path = uri.path();
    match classify(path) {
        PathClass::Protected | PathClass::Admin if user.is_none() => {
            debug!(%path, "session did not resolve; redirecting to login");
            return Ok(login_redirect(path).into_response());
        }
        PathClass::Admin if !user.as_ref().is_some_and(Identity::is_admin) => {
            warn!(%path, "non-admin requested an admin page");
            return Err(ApiError::forbidden());
        }
        PathClass::Excluded | PathClass::Unlisted => {
            return Err(ApiError::NotFound("Not found".into()));
        }
        _ => {}
    }
    Ok(Json(PageDescriptor {
        page: page_name(path),
        user,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::build_app,
        test_support::{get_with_cookie, read_json, send, session_cookie_for, UNREACHABLE_BACKEND},
        users::Role,
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::json;

    #[test]
    fn page_names() {
        assert_eq!(page_name("/"), "home");
        assert_eq!(page_name("/flashcards/42"), "flashcards/42");
    }

    #[tokio::test]
    async fn public_page_is_served_anonymously() {
        let app = build_app(AppState::fake(UNREACHABLE_BACKEND));
        let req = Request::builder().uri("/about").body(Body::empty()).unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_json(res).await, json!({ "page": "about", "user": null }));
    }

    #[tokio::test]
    async fn unresolvable_token_redirects_from_protected_page() {
        let app = build_app(AppState::fake(UNREACHABLE_BACKEND));
        let res = send(&app, get_with_cookie("/flashcards/42", "token=garbage")).await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/login?callbackUrl=/flashcards/42"
        );
    }

    #[tokio::test]
    async fn admin_page_checks_role() {
        let state = AppState::fake(UNREACHABLE_BACKEND);
        let user = session_cookie_for(&state, Role::User);
        let admin = session_cookie_for(&state, Role::Admin);
        let app = build_app(state);

        let res = send(&app, get_with_cookie("/admin/users", &user)).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(&app, get_with_cookie("/admin/users", &admin)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = read_json(res).await;
        assert_eq!(body["page"], "admin/users");
        assert_eq!(body["user"]["id"], "user-42");
        assert_eq!(body["user"]["role"], "admin");
    }
}
