//! Article category API endpoints

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::api::common::created;
use crate::api::extract::ApiJson;
use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::models::{ArticleCategory, CreateArticleCategoryInput};

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_category))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(list_categories))
        .merge(protected)
}

/// GET /api/v1/article-categories
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<ArticleCategory>>, ApiError> {
    Ok(Json(state.services.article_categories.list().await?))
}

/// POST /api/v1/article-categories
async fn create_category(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreateArticleCategoryInput>,
) -> Result<Response, ApiError> {
    let category = state
        .services
        .article_categories
        .create(input, user.id)
        .await?;
    Ok(created(category))
}
