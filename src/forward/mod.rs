//! Relays `/api` requests to the backend service.
//!
//! Outbound headers always carry `Content-Type: application/json` and, when
//! the caller has one, a bearer token. Backend errors keep their status and
//! JSON body; transport and decoding failures become 500s.

pub mod filters;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, error, instrument, warn};

use crate::{auth::token, error::ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookiePolicy {
    Strip,
    Forward,
}

pub fn forward_headers(inbound: &HeaderMap, cookies: CookiePolicy) -> HeaderMap {
    let mut out = HeaderMap::new();
    out.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(auth) = inbound.get(AUTHORIZATION) {
        out.insert(AUTHORIZATION, auth.clone());
    } else if let Some(token) = token::extract_token(None, token::cookie_header(inbound)) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(v) => {
                out.insert(AUTHORIZATION, v);
            }
            Err(_) => warn!("session cookie is not a valid header value; sending without auth"),
        }
    }

    if cookies == CookiePolicy::Forward {
        if let Some(raw) = inbound.get(COOKIE) {
            out.insert(COOKIE, raw.clone());
        }
    }
    out
}

/// `path` plus the inbound query string, if any.
pub fn with_query(path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    }
}

/// Ids are interpolated into backend paths, so only plain segments pass.
pub fn checked_id(id: &str) -> Result<&str, ApiError> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(id)
    } else {
        Err(ApiError::Validation("Invalid id".into()))
    }
}

/// Body must be a JSON object, optionally with non-empty string `fields`.
pub fn require_object<'a>(
    body: &'a Value,
    fields: &[&str],
) -> Result<&'a serde_json::Map<String, Value>, ApiError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ApiError::Validation("Request body must be a JSON object".into()))?;
    for field in fields {
        let present = obj
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !present {
            return Err(ApiError::Validation(format!("{field} is required")));
        }
    }
    Ok(obj)
}

/// Successful backend answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Forwarded {
    pub status: StatusCode,
    pub body: Value,
}

impl Forwarded {
    pub fn map_body(self, f: impl FnOnce(Value) -> Value) -> Self {
        Self {
            status: self.status,
            body: f(self.body),
        }
    }
}

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        if self.status == StatusCode::NO_CONTENT {
            return self.status.into_response();
        }
        (self.status, Json(self.body)).into_response()
    }
}

/// Error body for a failed backend call: the backend's JSON when usable.
fn upstream_error_body(status: StatusCode, raw: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(raw) {
        Ok(body @ Value::Object(_)) => body,
        Ok(Value::String(message)) if !message.is_empty() => json!({ "message": message }),
        _ => json!({ "message": format!("Request failed with status {}", status.as_u16()) }),
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl BackendClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("wordwise/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build backend http client")?;
        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    #[instrument(skip(self, headers, body))]
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<Forwarded, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            req = req.body(body.to_string());
        }

        let res = req.send().await.map_err(|e| {
            error!(error = %e, %url, "backend request failed");
            ApiError::Internal(format!("backend request to {url} failed: {e}"))
        })?;

        let status = res.status();
        let raw = res.bytes().await.map_err(|e| {
            error!(error = %e, %url, "reading backend response failed");
            ApiError::Internal(format!("read backend response: {e}"))
        })?;

        if !status.is_success() {
            warn!(%status, %url, "backend returned an error");
            return Err(ApiError::Upstream {
                status,
                body: upstream_error_body(status, &raw),
            });
        }

        let body = if raw.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&raw).map_err(|e| {
                error!(error = %e, %url, "backend returned invalid JSON");
                ApiError::Internal(format!("decode backend response: {e}"))
            })?
        };
        debug!(%status, %url, "backend responded");
        Ok(Forwarded { status, body })
    }

    /// Forwards with headers derived from the inbound request.
    pub async fn relay(
        &self,
        method: Method,
        path: &str,
        inbound: &HeaderMap,
        cookies: CookiePolicy,
        body: Option<&Value>,
    ) -> Result<Forwarded, ApiError> {
        self.forward(method, path, forward_headers(inbound, cookies), body)
            .await
    }
}
