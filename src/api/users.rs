//! User API endpoints
//!
//! - GET  /api/v1/users/{id} - Get a user
//! - POST /api/v1/users      - Register a user

use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::{check_id, created};
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateUserInput, User, UserRole};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/{id}", get(get_user))
}

/// GET /api/v1/users/{id}
async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<User>, ApiError> {
    let id = check_id(id, "userId")?;
    Ok(Json(state.services.users.get_by_id(id).await?))
}

/// POST /api/v1/users
///
/// Self-registration always creates a customer account.
async fn create_user(
    State(state): State<AppState>,
    ApiJson(mut input): ApiJson<CreateUserInput>,
) -> Result<Response, ApiError> {
    input.role = UserRole::Customer;
    let user = state.services.users.create(input).await?;
    Ok(created(user))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_fetch() {
        let (app, _state) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/users",
            None,
            Some(json!({
                "email": "Ada@Lumina.dev",
                "full_name": "Ada",
                "role": "Admin",
                "password": "analytical"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "ada@lumina.dev");
        assert_eq!(body["role"], "Customer");
        assert!(body.get("password_hash").is_none());
        assert!(body.get("password").is_none());

        let id = body["id"].as_i64().unwrap();
        let (status, body) = send(&app, "GET", &format!("/api/v1/users/{}", id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Ada");

        let (status, _) = send(&app, "GET", "/api/v1/users/404", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_path_id_is_rejected() {
        let (app, _state) = test_app().await;
        let (status, body) = send(&app, "GET", "/api/v1/users/0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": {"code": "VALIDATION_ERROR", "message": "Invalid userId."}})
        );
    }
}
