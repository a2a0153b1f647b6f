//! User note API endpoints
//!
//! Every route acts on the caller's own notes.

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::get,
    Extension, Json, Router,
};

use crate::api::common::check_id;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::models::{UpsertUserNoteInput, UserNote};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_notes).put(save_note))
        .route("/{id}", get(get_note))
        .route_layer(from_fn_with_state(state, require_auth))
}

/// GET /api/v1/user-notes
async fn list_notes(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<UserNote>>, ApiError> {
    Ok(Json(state.services.user_notes.list_by_user(user.id).await?))
}

/// GET /api/v1/user-notes/{id}
async fn get_note(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserNote>, ApiError> {
    let id = check_id(id, "noteId")?;
    Ok(Json(state.services.user_notes.get_by_id(id, user.id).await?))
}

/// PUT /api/v1/user-notes - Create or replace the note on a section
async fn save_note(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<UpsertUserNoteInput>,
) -> Result<Json<UserNote>, ApiError> {
    Ok(Json(state.services.user_notes.upsert(user.id, input).await?))
}
