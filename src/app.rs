use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, config::AppConfig, error::ApiError, gate, pages, routes, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(routes::router())
                .route("/health", get(|| async { "ok" })),
        )
        .merge(pages::router())
        .fallback(|| async { ApiError::NotFound("Not found".into()) })
        .with_state(state)
        .layer(middleware::from_fn(gate::route_gate))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(%addr, backend = %config.backend_url, env = ?config.environment, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{read_bytes, read_json, send, UNREACHABLE_BACKEND};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake(UNREACHABLE_BACKEND));
        let res = send(&app, Request::builder().uri("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_bytes(res).await, "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let app = build_app(AppState::fake(UNREACHABLE_BACKEND));
        let res = send(&app, Request::builder().uri("/api/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(res).await, json!({ "message": "Not found" }));
    }
}
