//! API layer - HTTP handlers and routing
//!
//! Every resource module exposes a `router(state)` whose read routes are
//! public and whose routes acting on behalf of a user sit behind
//! [`middleware::require_auth`]. All routes live under `/api/v1`.

pub mod article_categories;
pub mod articles;
pub mod auth;
pub mod common;
pub mod events;
pub mod exam_attempts;
pub mod exams;
pub mod extract;
pub mod leaderboards;
pub mod middleware;
pub mod slides;
pub mod spaced_repetition;
pub mod user_notes;
pub mod users;
pub mod vocabularies;
pub mod vocabulary_lists;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router())
        .nest("/vocabularies", vocabularies::router(state.clone()))
        .nest("/vocabulary-lists", vocabulary_lists::router(state.clone()))
        .nest("/articles", articles::router(state.clone()))
        .nest("/article-categories", article_categories::router(state.clone()))
        .nest("/events", events::router(state.clone()))
        .nest("/slides", slides::router(state.clone()))
        .nest("/user-notes", user_notes::router(state.clone()))
        .nest("/spaced-repetition", spaced_repetition::router(state.clone()))
        .nest("/leaderboards", leaderboards::router(state.clone()))
        .nest("/exams", exams::router(state.clone()))
        .nest("/exam-attempts", exam_attempts::router(state))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) if cors_origin != "*" => CorsLayer::new().allow_origin(origin),
        _ => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: String,
}

/// GET /api/v1/health - Database ping
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.pool.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {:#}", e);
        ApiError::internal_error("An internal server error occurred.")
    })?;

    Ok(Json(HealthResponse {
        status: "ok",
        database: format!("{:?}", state.pool.driver()).to_lowercase(),
    }))
}

/// Request helpers for router tests
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::test_support::test_pool;
    use crate::services::user::DEFAULT_SESSION_DAYS;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    pub async fn test_app() -> (Router, AppState) {
        let pool = test_pool().await;
        let state = AppState::new(pool, Arc::new(MemoryCache::new()), DEFAULT_SESSION_DAYS);
        (build_router(state.clone(), "*"), state)
    }

    /// Open a session for a seeded user and return its bearer token
    pub async fn sign_in(state: &AppState, user_id: i64) -> String {
        state
            .services
            .users
            .create_session(user_id)
            .await
            .expect("Failed to open session")
            .id
    }

    /// Send one request; the body is parsed as JSON (`Null` when empty)
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}
