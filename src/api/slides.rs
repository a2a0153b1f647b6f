//! Slide API endpoints

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::common::{check_id, created};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateSlideInput, Slide, UpdateSlideInput};

#[derive(Debug, Deserialize)]
pub struct ListSlidesQuery {
    pub keyword: Option<String>,
    pub is_active: Option<bool>,
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_slide))
        .route("/{id}", put(update_slide).delete(delete_slide))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(list_slides))
        .route("/{id}", get(get_slide))
        .merge(protected)
}

/// GET /api/v1/slides?keyword&is_active
async fn list_slides(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListSlidesQuery>,
) -> Result<Json<Vec<Slide>>, ApiError> {
    let slides = state
        .services
        .slides
        .list(query.keyword.as_deref(), query.is_active)
        .await?;
    Ok(Json(slides))
}

/// GET /api/v1/slides/{id}
async fn get_slide(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Slide>, ApiError> {
    let id = check_id(id, "slideId")?;
    Ok(Json(state.services.slides.get_by_id(id).await?))
}

/// POST /api/v1/slides
async fn create_slide(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreateSlideInput>,
) -> Result<Response, ApiError> {
    let slide = state.services.slides.create(input, user.id).await?;
    Ok(created(slide))
}

/// PUT /api/v1/slides/{id}
async fn update_slide(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateSlideInput>,
) -> Result<Json<Slide>, ApiError> {
    let id = check_id(id, "slideId")?;
    Ok(Json(state.services.slides.update(id, input).await?))
}

/// DELETE /api/v1/slides/{id}
async fn delete_slide(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "slideId")?;
    state.services.slides.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, sign_in, test_app};
    use crate::db::repositories::test_support::seed_user;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_slides_filter_by_activity() {
        let (app, state) = test_app().await;
        let user = seed_user(&state.pool, "staff@lumina.dev").await;
        let user_token = sign_in(&state, user).await;

        for (name, active) in [("Welcome", true), ("Old promo", false)] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/v1/slides",
                Some(user_token.as_str()),
                Some(json!({"slide_name": name, "slide_url": "/img/a.png", "is_active": active})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(&app, "GET", "/api/v1/slides?is_active=true", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["slide_name"], "Welcome");

        let (_, body) = send(&app, "GET", "/api/v1/slides?keyword=promo", None, None).await;
        let id = body[0]["id"].as_i64().unwrap();
        let uri = format!("/api/v1/slides/{}", id);

        let (status, body) = send(&app, "PUT", &uri, Some(user_token.as_str()), Some(json!({"is_active": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], true);

        let (status, _) = send(&app, "POST", "/api/v1/slides", Some(user_token.as_str()), Some(json!({"slide_name": "", "slide_url": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "DELETE", &uri, Some(user_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", &uri, Some(user_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
