//! Event API endpoints

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::common::{check_id, created, default_page, default_page_size};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateEventInput, Event, EventFilter, ListParams, PagedResult, UpdateEventInput};

/// Filter plus pagination for the paged listing
#[derive(Debug, Deserialize)]
pub struct PagedEventsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_event))
        .route("/{id}", put(update_event).delete(delete_event))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(list_events))
        .route("/paged", get(list_events_paged))
        .route("/{id}", get(get_event))
        .merge(protected)
}

/// GET /api/v1/events?from&to&keyword
async fn list_events(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<EventFilter>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.services.events.list(&filter).await?))
}

/// GET /api/v1/events/paged
async fn list_events_paged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PagedEventsQuery>,
) -> Result<Json<PagedResult<Event>>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let filter = EventFilter {
        from: query.from,
        to: query.to,
        keyword: query.keyword,
    };
    Ok(Json(state.services.events.list_paged(&filter, &params).await?))
}

/// GET /api/v1/events/{id}
async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Event>, ApiError> {
    let id = check_id(id, "eventId")?;
    Ok(Json(state.services.events.get_by_id(id).await?))
}

/// POST /api/v1/events
async fn create_event(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreateEventInput>,
) -> Result<Response, ApiError> {
    let event = state.services.events.create(input, user.id).await?;
    Ok(created(event))
}

/// PUT /api/v1/events/{id}
async fn update_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateEventInput>,
) -> Result<Json<Event>, ApiError> {
    let id = check_id(id, "eventId")?;
    Ok(Json(state.services.events.update(id, input).await?))
}

/// DELETE /api/v1/events/{id}
async fn delete_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "eventId")?;
    state.services.events.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
