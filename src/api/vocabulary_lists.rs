//! Vocabulary list API endpoints
//!
//! Published lists and single lists are public. Everything acting for a
//! user (listing visible lists, editing, the approval workflow) requires
//! authentication.

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};

use crate::api::common::{check_id, created, SearchQuery};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CreateVocabularyListInput, ReviewInput, UpdateVocabularyListInput, VocabularyList,
    VocabularyListSummary,
};

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(list_visible).post(create_list))
        .route("/mine", get(list_mine))
        .route("/{id}", put(update_list).delete(delete_list))
        .route("/{id}/request-approval", post(request_approval))
        .route("/{id}/review", post(review_list))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/published", get(list_published))
        .route("/{id}", get(get_list))
        .merge(protected)
}

/// GET /api/v1/vocabulary-lists - Lists visible to the caller
async fn list_visible(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<VocabularyListSummary>>, ApiError> {
    let lists = state
        .services
        .vocabulary_lists
        .list(&user, query.search.as_deref())
        .await?;
    Ok(Json(lists))
}

/// GET /api/v1/vocabulary-lists/mine
async fn list_mine(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<VocabularyListSummary>>, ApiError> {
    let lists = state
        .services
        .vocabulary_lists
        .get_mine(&user, query.search.as_deref())
        .await?;
    Ok(Json(lists))
}

/// GET /api/v1/vocabulary-lists/published
async fn list_published(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<VocabularyListSummary>>, ApiError> {
    let lists = state
        .services
        .vocabulary_lists
        .get_published(query.search.as_deref())
        .await?;
    Ok(Json(lists))
}

/// GET /api/v1/vocabulary-lists/{id}
async fn get_list(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<VocabularyListSummary>, ApiError> {
    let id = check_id(id, "listId")?;
    Ok(Json(state.services.vocabulary_lists.get_by_id(id).await?))
}

/// POST /api/v1/vocabulary-lists
async fn create_list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreateVocabularyListInput>,
) -> Result<Response, ApiError> {
    let list = state.services.vocabulary_lists.create(input, &user).await?;
    Ok(created(list))
}

/// PUT /api/v1/vocabulary-lists/{id}
async fn update_list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateVocabularyListInput>,
) -> Result<Json<VocabularyList>, ApiError> {
    let id = check_id(id, "listId")?;
    let list = state.services.vocabulary_lists.update(id, input, &user).await?;
    Ok(Json(list))
}

/// DELETE /api/v1/vocabulary-lists/{id}
async fn delete_list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "listId")?;
    state.services.vocabulary_lists.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/vocabulary-lists/{id}/request-approval
async fn request_approval(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "listId")?;
    state
        .services
        .vocabulary_lists
        .request_approval(id, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/vocabulary-lists/{id}/review
async fn review_list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "listId")?;
    state
        .services
        .vocabulary_lists
        .review(id, input, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, sign_in, test_app};
    use crate::db::repositories::test_support::seed_user_with_role;
    use crate::models::UserRole;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_review_workflow_over_http() {
        let (app, state) = test_app().await;
        let owner = seed_user_with_role(&state.pool, "owner@lumina.dev", UserRole::Customer).await;
        let owner_token = sign_in(&state, owner).await;
        let admin = seed_user_with_role(&state.pool, "admin@lumina.dev", UserRole::Admin).await;
        let admin_token = sign_in(&state, admin).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/vocabulary-lists",
            Some(owner_token.as_str()),
            Some(json!({"name": "Kitchen", "is_public": true})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "Draft");
        let id = body["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/vocabulary-lists/{}/request-approval", id),
            Some(owner_token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let review_uri = format!("/api/v1/vocabulary-lists/{}/review", id);
        let approve = json!({"decision": "approve"});
        let (status, body) = send(&app, "POST", &review_uri, Some(owner_token.as_str()), Some(approve.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, _) = send(&app, "POST", &review_uri, Some(admin_token.as_str()), Some(approve.clone())).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Already published
        let (status, body) = send(&app, "POST", &review_uri, Some(admin_token.as_str()), Some(approve)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_STATE");

        let (status, body) = send(&app, "GET", "/api/v1/vocabulary-lists/published", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["list"]["name"], "Kitchen");
        assert_eq!(body[0]["word_count"], 0);
    }

    #[tokio::test]
    async fn test_visibility_and_ownership() {
        let (app, state) = test_app().await;
        let alice = seed_user_with_role(&state.pool, "alice@lumina.dev", UserRole::Customer).await;
        let alice_token = sign_in(&state, alice).await;
        let bob = seed_user_with_role(&state.pool, "bob@lumina.dev", UserRole::Customer).await;
        let bob_token = sign_in(&state, bob).await;

        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/vocabulary-lists",
            Some(alice_token.as_str()),
            Some(json!({"name": "Alice words"})),
        )
        .await;
        let id = body["id"].as_i64().unwrap();

        let (status, _) = send(&app, "GET", "/api/v1/vocabulary-lists", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, body) = send(&app, "GET", "/api/v1/vocabulary-lists", Some(bob_token.as_str()), None).await;
        assert_eq!(body, json!([]));
        let (_, body) = send(&app, "GET", "/api/v1/vocabulary-lists/mine", Some(alice_token.as_str()), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let uri = format!("/api/v1/vocabulary-lists/{}", id);
        let (status, _) = send(&app, "PUT", &uri, Some(bob_token.as_str()), Some(json!({"name": "Mine now"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, "DELETE", &uri, Some(bob_token.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, "PUT", &uri, Some(alice_token.as_str()), Some(json!({"name": "Renamed"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Renamed");

        let (status, _) = send(&app, "DELETE", &uri, Some(alice_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
