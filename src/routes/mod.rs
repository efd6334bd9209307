//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one practice session per connection)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Catalogue
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/scenarios", get(http::http_get_scenarios))
        .route("/api/v1/languages", get(http::http_get_languages))
        .route("/api/v1/levels", get(http::http_get_levels))
        // Sessions
        .route("/api/v1/sessions", post(http::http_post_session))
        .route(
            "/api/v1/sessions/:id",
            get(http::http_get_session).delete(http::http_delete_session),
        )
        .route("/api/v1/sessions/:id/next", post(http::http_post_next))
        .route("/api/v1/sessions/:id/simplify", post(http::http_post_simplify))
        .route("/api/v1/sessions/:id/attempt", post(http::http_post_attempt))
        .route("/api/v1/sessions/:id/transcribe", post(http::http_post_transcribe))
        .route("/api/v1/sessions/:id/cancel", post(http::http_post_cancel))
        .route("/api/v1/sessions/:id/speak", post(http::http_post_speak))
        .route("/api/v1/sessions/:id/language", post(http::http_post_language))
        .route("/api/v1/sessions/:id/scenario", post(http::http_post_scenario))
        .route("/api/v1/sessions/:id/settings", post(http::http_post_settings))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::speech::Unavailable;

    fn app() -> Router {
        let cfg = AppConfig { rng_seed: Some(7), ..AppConfig::default() };
        let state = AppState::new(cfg, Arc::new(Unavailable), Arc::new(Unavailable)).unwrap();
        build_router(Arc::new(state))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, v)
    }

    #[tokio::test]
    async fn catalogue_endpoints() {
        let app = app();
        let (status, v) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["ok"], true);

        let (_, v) = call(&app, Method::GET, "/api/v1/scenarios", None).await;
        assert_eq!(v[0]["id"], "identification");
        let (_, v) = call(&app, Method::GET, "/api/v1/languages", None).await;
        assert_eq!(v.as_array().unwrap().len(), 20);
        let (_, v) = call(&app, Method::GET, "/api/v1/levels", None).await;
        assert_eq!(v[0]["label"], "A0-A1");
    }

    #[tokio::test]
    async fn practice_turn_over_http() {
        let app = app();
        let (status, v) = call(&app, Method::POST, "/api/v1/sessions", Some(json!({ "language": "fr" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(v["language"], "fr");
        assert_eq!(v["messages"].as_array().unwrap().len(), 1);
        let id = v["id"].as_str().unwrap().to_string();
        let target = v["messages"][0]["text"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/sessions/{id}/attempt");
        let (status, v) = call(&app, Method::POST, &uri, Some(json!({ "transcript": target }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["score"], 100);
        assert_eq!(v["skill"]["skillScore"], 51);

        // No TTS configured: playback is a transient 503.
        let uri = format!("/api/v1/sessions/{id}/speak");
        let (status, v) = call(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(v["transient"], true);

        let uri = format!("/api/v1/sessions/{id}/settings");
        let (_, v) = call(&app, Method::POST, &uri, Some(json!({ "dailyGoalTarget": 23 }))).await;
        assert_eq!(v["dailyGoal"]["target"], 25);

        let uri = format!("/api/v1/sessions/{id}");
        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn caller_errors_map_to_status_codes() {
        let app = app();
        let (status, _) = call(&app, Method::POST, "/api/v1/sessions", Some(json!({ "scenario": "moon" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, v) = call(&app, Method::POST, "/api/v1/sessions", None).await;
        let id = v["id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/sessions/{id}/transcribe");
        let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "audioBase64": "@@", "mime": "audio/webm" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Nothing is recording, so there is nothing to cancel.
        let uri = format!("/api/v1/sessions/{id}/cancel");
        let (status, _) = call(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/api/v1/sessions/{id}/scenario");
        let (status, v) = call(&app, Method::POST, &uri, Some(json!({ "scenario": "appointments" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["scenario"], "appointments");
        assert_eq!(v["messages"].as_array().unwrap().len(), 1);
    }
}
