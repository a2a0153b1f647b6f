//! Vocabulary API endpoints
//!
//! Reads are public; writes require an authenticated user.

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{check_id, created};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{require_auth, ApiError, AppState};
use crate::models::{CreateVocabularyInput, ListWordCount, UpdateVocabularyInput, Vocabulary};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub list_id: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TermQuery {
    pub term: Option<String>,
    pub list_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub total: i64,
    pub by_list: Vec<ListWordCount>,
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_vocabulary))
        .route("/{id}", put(update_vocabulary).delete(delete_vocabulary))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(list_vocabularies))
        .route("/search", get(search_vocabularies))
        .route("/count", get(count_vocabularies))
        .route("/categories", get(list_categories))
        .route("/{id}", get(get_vocabulary))
        .merge(protected)
}

/// GET /api/v1/vocabularies?list_id&search
async fn list_vocabularies(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Vocabulary>>, ApiError> {
    let items = state
        .services
        .vocabularies
        .get_by_list(query.list_id, query.search.as_deref())
        .await?;
    Ok(Json(items))
}

/// GET /api/v1/vocabularies/search?term&list_id
async fn search_vocabularies(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TermQuery>,
) -> Result<Json<Vec<Vocabulary>>, ApiError> {
    let items = state
        .services
        .vocabularies
        .search(query.term.as_deref(), query.list_id)
        .await?;
    Ok(Json(items))
}

/// GET /api/v1/vocabularies/count
async fn count_vocabularies(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let service = &state.services.vocabularies;
    Ok(Json(CountResponse {
        total: service.count().await?,
        by_list: service.counts_by_list().await?,
    }))
}

/// GET /api/v1/vocabularies/categories
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.services.vocabularies.categories().await?))
}

/// GET /api/v1/vocabularies/{id}
async fn get_vocabulary(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vocabulary>, ApiError> {
    let id = check_id(id, "vocabularyId")?;
    Ok(Json(state.services.vocabularies.get_by_id(id).await?))
}

/// POST /api/v1/vocabularies
async fn create_vocabulary(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateVocabularyInput>,
) -> Result<Response, ApiError> {
    let vocabulary = state.services.vocabularies.create(input).await?;
    Ok(created(vocabulary))
}

/// PUT /api/v1/vocabularies/{id}
async fn update_vocabulary(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateVocabularyInput>,
) -> Result<Json<Vocabulary>, ApiError> {
    let id = check_id(id, "vocabularyId")?;
    Ok(Json(state.services.vocabularies.update(id, input).await?))
}

/// DELETE /api/v1/vocabularies/{id}
async fn delete_vocabulary(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "vocabularyId")?;
    state.services.vocabularies.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, sign_in, test_app};
    use crate::db::repositories::test_support::{seed_list, seed_user, seed_word};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_flow() {
        let (app, state) = test_app().await;
        let user = seed_user(&state.pool, "tutor@lumina.dev").await;
        let user_token = sign_in(&state, user).await;
        let list = seed_list(&state.pool, "Travel", user).await;

        let payload = json!({
            "list_id": list,
            "word": "luggage",
            "definition": "bags",
            "type_of_word": "noun",
            "category": "Travel"
        });
        let (status, _) = send(&app, "POST", "/api/v1/vocabularies", None, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, "POST", "/api/v1/vocabularies", Some(user_token.as_str()), Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/v1/vocabularies/{}", id),
            Some(user_token.as_str()),
            Some(json!({"example": "My luggage is heavy."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["example"], "My luggage is heavy.");

        let (status, body) = send(&app, "GET", "/api/v1/vocabularies/categories", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Travel"]));

        let uri = format!("/api/v1/vocabularies/{}", id);
        let (status, _) = send(&app, "DELETE", &uri, Some(user_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_and_count() {
        let (app, state) = test_app().await;
        let user = seed_user(&state.pool, "tutor@lumina.dev").await;
        let user_token = sign_in(&state, user).await;
        let list = seed_list(&state.pool, "Travel", user).await;
        seed_word(&state.pool, list, "airport").await;
        seed_word(&state.pool, list, "ticket").await;

        let uri = format!("/api/v1/vocabularies?list_id={}&search=AIR", list);
        let (status, body) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["word"], "airport");

        let (status, body) = send(&app, "GET", "/api/v1/vocabularies/search?term=noun", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = send(&app, "GET", "/api/v1/vocabularies/count", None, None).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["by_list"][0]["count"], 2);

        let (status, body) = send(&app, "GET", "/api/v1/vocabularies?list_id=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid listId.");
    }

    #[tokio::test]
    async fn test_invalid_path_id_skips_the_service() {
        let (app, _state) = test_app().await;
        let (status, body) = send(&app, "DELETE", "/api/v1/vocabularies/-3", None, None).await;
        // Authentication runs first for writes
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"]["code"].is_string());

        let (status, body) = send(&app, "GET", "/api/v1/vocabularies/0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": {"code": "VALIDATION_ERROR", "message": "Invalid vocabularyId."}})
        );
    }
}
