//! Authentication API endpoints
//!
//! - POST /api/v1/auth/login  - Exchange email and password for a session token
//! - POST /api/v1/auth/logout - Invalidate the presented token
//! - GET  /api/v1/auth/me     - The user behind the presented token

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::extract::ApiJson;
use crate::api::middleware::{
    extract_session_token, require_auth, ApiError, AppState, AuthenticatedUser,
};
use crate::models::{LoginInput, User};

/// Token handed to the client after a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.services.users.login(input).await?;
    Ok(Json(LoginResponse {
        token: session.id,
        user_id: session.user_id,
        expires_at: session.expires_at,
    }))
}

/// POST /api/v1/auth/logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;
    state.services.users.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
async fn me(Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, test_app};
    use crate::db::repositories::test_support::seed_user_with_role;
    use crate::models::UserRole;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_login_me_and_logout() {
        let (app, _state) = test_app().await;
        let (status, user) = send(
            &app,
            "POST",
            "/api/v1/users",
            None,
            Some(json!({"email": "ada@lumina.dev", "full_name": "Ada", "password": "analytical"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ada@lumina.dev", "password": "analytical"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], user["id"]);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "ada@lumina.dev");

        let (status, _) = send(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized() {
        let (app, _state) = test_app().await;
        send(
            &app,
            "POST",
            "/api/v1/users",
            None,
            Some(json!({"email": "ada@lumina.dev", "full_name": "Ada", "password": "analytical"})),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ada@lumina.dev", "password": "guess"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid username or password");

        let (status, _) = send(&app, "POST", "/api/v1/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_client_supplied_user_id_is_ignored() {
        let (app, state) = test_app().await;
        let admin = seed_user_with_role(&state.pool, "admin@lumina.dev", UserRole::Admin).await;

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/v1/leaderboards/1")
            .header("x-user-id", admin.to_string())
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
