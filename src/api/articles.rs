//! Article API endpoints
//!
//! - GET    /api/v1/articles                        - Filtered, paged listing; published
//!                                                    only unless the caller is staff
//! - GET    /api/v1/articles/{id}                   - Published article with sections
//! - GET    /api/v1/articles/{id}/manage            - Any article with sections (staff)
//! - POST   /api/v1/articles                        - Create with sections
//! - PUT    /api/v1/articles/{id}                   - Update (author or staff)
//! - PUT    /api/v1/articles/{id}/sections          - Replace sections
//! - DELETE /api/v1/articles/{id}                   - Delete (staff only)
//! - POST   /api/v1/articles/{id}/request-approval  - Submit for review
//! - POST   /api/v1/articles/{id}/review            - Approve or reject
//! - PUT    /api/v1/articles/{id}/toggle-hide       - Show or hide a published article
//! - POST   /api/v1/articles/{id}/progress          - Save the caller's reading progress
//! - GET    /api/v1/articles/progress?article_ids=  - The caller's progress for some articles
//! - POST   /api/v1/articles/{id}/mark-as-done      - Mark an article as read

use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{check_id, created, default_page, default_page_size};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{
    optional_auth, require_auth, require_staff, ApiError, AppState, AuthenticatedUser,
    OptionalUser,
};
use crate::models::{
    ArticleDetail, ArticleProgress, ArticleQuery, ArticleSection, ArticleSort, ArticleSummary,
    ContentStatus, CreateArticleInput, ListParams, NewSection, PagedResult, ReviewInput,
    SaveProgressInput, SortDirection, ToggleHideInput, UpdateArticleInput,
};

/// Query parameters for listing articles
#[derive(Debug, Deserialize)]
pub struct ListArticlesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub is_published: Option<bool>,
    pub status: Option<ContentStatus>,
    pub created_by: Option<i64>,
    #[serde(default)]
    pub sort_by: ArticleSort,
    #[serde(default)]
    pub sort_dir: SortDirection,
}

impl ListArticlesQuery {
    fn split(self) -> (ArticleQuery, ListParams) {
        let params = ListParams::new(self.page, self.page_size);
        let query = ArticleQuery {
            search: self.search,
            category_id: self.category_id,
            is_published: self.is_published,
            status: self.status,
            created_by: self.created_by,
            sort_by: self.sort_by,
            sort_dir: self.sort_dir,
        };
        (query, params)
    }
}

/// Query parameters for reading progress, e.g. `?article_ids=1,2,3`
#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(default)]
    pub article_ids: String,
}

impl ProgressQuery {
    /// Parse the comma-separated ids; entries that are not numbers are skipped
    fn ids(&self) -> Result<Vec<i64>, ApiError> {
        if self.article_ids.trim().is_empty() {
            return Err(ApiError::validation_error("articleIds parameter is required."));
        }
        let ids: Vec<i64> = self
            .article_ids
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect();
        if ids.is_empty() {
            return Err(ApiError::validation_error("Invalid articleIds format."));
        }
        Ok(ids)
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleHideResponse {
    pub message: &'static str,
    pub is_published: bool,
}

pub fn router(state: AppState) -> Router<AppState> {
    let staff = Router::new()
        .route("/{id}", delete(delete_article))
        .route("/{id}/manage", get(get_article_for_manager))
        .route_layer(from_fn(require_staff))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let protected = Router::new()
        .route("/", post(create_article))
        .route("/progress", get(get_progress))
        .route("/{id}", put(update_article))
        .route("/{id}/sections", put(update_sections))
        .route("/{id}/request-approval", post(request_approval))
        .route("/{id}/review", post(review_article))
        .route("/{id}/toggle-hide", put(toggle_hide))
        .route("/{id}/progress", post(save_progress))
        .route("/{id}/mark-as-done", post(mark_as_done))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let listing = Router::new()
        .route("/", get(list_articles))
        .route_layer(from_fn_with_state(state, optional_auth));

    Router::new()
        .route("/{id}", get(get_article))
        .merge(listing)
        .merge(protected)
        .merge(staff)
}

/// GET /api/v1/articles
async fn list_articles(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    ApiQuery(query): ApiQuery<ListArticlesQuery>,
) -> Result<Json<PagedResult<ArticleSummary>>, ApiError> {
    let (query, params) = query.split();
    let page = state
        .services
        .articles
        .query_visible(query, &params, viewer.as_ref())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/articles/{id}
async fn get_article(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let id = check_id(id, "articleId")?;
    Ok(Json(state.services.articles.get_detail(id).await?))
}

/// GET /api/v1/articles/{id}/manage
async fn get_article_for_manager(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let id = check_id(id, "articleId")?;
    Ok(Json(state.services.articles.get_detail_for_manager(id).await?))
}

/// POST /api/v1/articles - The caller becomes the author
async fn create_article(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreateArticleInput>,
) -> Result<Response, ApiError> {
    let article = state.services.articles.create(input, user.id).await?;
    Ok(created(article))
}

/// PUT /api/v1/articles/{id}
async fn update_article(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateArticleInput>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let id = check_id(id, "articleId")?;
    Ok(Json(state.services.articles.update(id, input, &user).await?))
}

/// PUT /api/v1/articles/{id}/sections
async fn update_sections(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(sections): ApiJson<Vec<NewSection>>,
) -> Result<Json<Vec<ArticleSection>>, ApiError> {
    let id = check_id(id, "articleId")?;
    let sections = state
        .services
        .articles
        .update_sections(id, sections, &user)
        .await?;
    Ok(Json(sections))
}

/// DELETE /api/v1/articles/{id}
async fn delete_article(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "articleId")?;
    state.services.articles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/articles/{id}/request-approval
async fn request_approval(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "articleId")?;
    state.services.articles.request_approval(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/articles/{id}/review
async fn review_article(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "articleId")?;
    state.services.articles.review(id, input, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/articles/{id}/toggle-hide
async fn toggle_hide(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ToggleHideInput>,
) -> Result<Json<ToggleHideResponse>, ApiError> {
    let id = check_id(id, "articleId")?;
    let article = state
        .services
        .articles
        .toggle_hide(id, input.is_published, &user)
        .await?;
    let message = if article.is_published {
        "Article has been shown"
    } else {
        "Article has been hidden"
    };
    Ok(Json(ToggleHideResponse {
        message,
        is_published: article.is_published,
    }))
}

/// POST /api/v1/articles/{id}/progress
async fn save_progress(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<SaveProgressInput>,
) -> Result<Json<ArticleProgress>, ApiError> {
    let id = check_id(id, "articleId")?;
    Ok(Json(state.services.articles.save_progress(user.id, id, input).await?))
}

/// GET /api/v1/articles/progress
async fn get_progress(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<ProgressQuery>,
) -> Result<Json<Vec<ArticleProgress>>, ApiError> {
    let ids = query.ids()?;
    Ok(Json(state.services.articles.progress_for(user.id, &ids).await?))
}

/// POST /api/v1/articles/{id}/mark-as-done
async fn mark_as_done(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "articleId")?;
    state.services.articles.mark_as_done(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
