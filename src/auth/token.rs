//! Bearer token lookup and session cookie helpers.
//!
//! A token can arrive in the `Authorization` header or in one of several
//! cookies. The header always wins; cookies are tried in the fixed order of
//! [`SESSION_COOKIE_NAMES`], independent of their order in the header.

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};

/// Cookie names that may carry a session token, in lookup order.
pub const SESSION_COOKIE_NAMES: [&str; 4] =
    ["token", "auth_token", "auth_session", "next-auth.session-token"];

/// Cookies written on login/signup.
pub const ISSUED_COOKIE_NAMES: [&str; 2] = ["auth_session", "token"];

/// Value of the named cookie, skipping empty values.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let mut parts = pair.trim().splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(key), Some(value)) if key.trim() == name && !value.trim().is_empty() => {
                Some(value.trim())
            }
            _ => None,
        }
    })
}

/// Token from an `Authorization` value, with the bearer scheme stripped.
fn token_from_authorization(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

pub fn extract_token(authorization: Option<&str>, cookie_header: Option<&str>) -> Option<String> {
    if let Some(token) = authorization.and_then(token_from_authorization) {
        return Some(token.to_string());
    }
    let cookies = cookie_header?;
    SESSION_COOKIE_NAMES
        .iter()
        .find_map(|name| cookie_value(cookies, name))
        .map(str::to_string)
}

pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

pub fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(COOKIE).and_then(|v| v.to_str().ok())
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    extract_token(authorization_header(headers), cookie_header(headers))
}

/// True when any session cookie is present. Says nothing about validity.
pub fn has_session_cookie(headers: &HeaderMap) -> bool {
    cookie_header(headers).is_some_and(|cookies| {
        SESSION_COOKIE_NAMES
            .iter()
            .any(|name| cookie_value(cookies, name).is_some())
    })
}

fn build_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` values carrying a freshly issued token.
pub fn session_cookies(token: &str, max_age_secs: u64, secure: bool) -> [String; 2] {
    ISSUED_COOKIE_NAMES.map(|name| build_cookie(name, token, max_age_secs, secure))
}

/// `Set-Cookie` values that expire the session cookies.
pub fn cleared_session_cookies(secure: bool) -> [String; 2] {
    ISSUED_COOKIE_NAMES.map(|name| build_cookie(name, "", 0, secure))
}
