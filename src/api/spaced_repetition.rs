//! Spaced repetition API endpoints
//!
//! - GET  /api/v1/spaced-repetition/due                 - Records due for review
//! - GET  /api/v1/spaced-repetition/all                 - Every record of the caller
//! - POST /api/v1/spaced-repetition/review              - Rate recall of a record or word
//! - GET  /api/v1/spaced-repetition/by-list/{list_id}   - The caller's record for a list
//! - POST /api/v1/spaced-repetition/create/{list_id}    - Start repeating a list
//! - POST /api/v1/spaced-repetition/quiz-results        - Store a quiz score
//! - GET  /api/v1/spaced-repetition/quiz-scores         - Quiz history, optionally one list
//!
//! Every route acts on the caller's own records.

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::common::check_id;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::models::{QuizResultInput, QuizScore, RepetitionView, ReviewOutcome, ReviewWordInput};

#[derive(Debug, Deserialize)]
pub struct QuizScoresQuery {
    pub list_id: Option<i64>,
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/due", get(due_for_review))
        .route("/all", get(all_repetitions))
        .route("/review", post(review))
        .route("/by-list/{list_id}", get(get_by_list))
        .route("/create/{list_id}", post(create_for_list))
        .route("/quiz-results", post(save_quiz_result))
        .route("/quiz-scores", get(quiz_scores))
        .route_layer(from_fn_with_state(state, require_auth))
}

/// GET /api/v1/spaced-repetition/due
async fn due_for_review(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<RepetitionView>>, ApiError> {
    Ok(Json(state.services.spaced_repetitions.due_for_review(user.id).await?))
}

/// GET /api/v1/spaced-repetition/all
async fn all_repetitions(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<RepetitionView>>, ApiError> {
    Ok(Json(state.services.spaced_repetitions.all_for_user(user.id).await?))
}

/// POST /api/v1/spaced-repetition/review
async fn review(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<ReviewWordInput>,
) -> Result<Json<ReviewOutcome>, ApiError> {
    Ok(Json(state.services.spaced_repetitions.review(user.id, input).await?))
}

/// GET /api/v1/spaced-repetition/by-list/{list_id}
async fn get_by_list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(list_id): ApiPath<i64>,
) -> Result<Json<RepetitionView>, ApiError> {
    let list_id = check_id(list_id, "listId")?;
    Ok(Json(
        state.services.spaced_repetitions.get_by_list(user.id, list_id).await?,
    ))
}

/// POST /api/v1/spaced-repetition/create/{list_id} - Returns the existing record if any
async fn create_for_list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(list_id): ApiPath<i64>,
) -> Result<Json<RepetitionView>, ApiError> {
    let list_id = check_id(list_id, "listId")?;
    Ok(Json(
        state
            .services
            .spaced_repetitions
            .create_for_list(user.id, list_id)
            .await?,
    ))
}

/// POST /api/v1/spaced-repetition/quiz-results
async fn save_quiz_result(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<QuizResultInput>,
) -> Result<Json<QuizScore>, ApiError> {
    Ok(Json(
        state.services.spaced_repetitions.save_quiz_result(user.id, input).await?,
    ))
}

/// GET /api/v1/spaced-repetition/quiz-scores
async fn quiz_scores(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<QuizScoresQuery>,
) -> Result<Json<Vec<QuizScore>>, ApiError> {
    Ok(Json(
        state
            .services
            .spaced_repetitions
            .quiz_scores(user.id, query.list_id)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, sign_in, test_app};
    use crate::db::repositories::test_support::{seed_list, seed_user, seed_word};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_repetition_flow() {
        let (app, state) = test_app().await;
        let user = seed_user(&state.pool, "learner@lumina.dev").await;
        let token = sign_in(&state, user).await;
        let list = seed_list(&state.pool, "Travel", user).await;
        let word = seed_word(&state.pool, list, "airport").await;

        let (status, _) = send(&app, "GET", "/api/v1/spaced-repetition/all", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let uri = format!("/api/v1/spaced-repetition/create/{}", list);
        let (status, body) = send(&app, "POST", &uri, Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "New");
        assert_eq!(body["vocabulary_list_name"], "Travel");
        assert_eq!(body["is_due"], false);
        let id = body["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/spaced-repetition/review",
            Some(token.as_str()),
            Some(json!({"repetition_id": id, "quality": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["new_intervals"], 2);
        assert_eq!(body["repetition"]["review_count"], 1);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/spaced-repetition/review",
            Some(token.as_str()),
            Some(json!({"vocabulary_id": word, "vocabulary_list_id": list, "quality": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["repetition"]["vocabulary_word"], "airport");

        let (_, body) = send(&app, "GET", "/api/v1/spaced-repetition/all", Some(token.as_str()), None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        let (_, body) = send(&app, "GET", "/api/v1/spaced-repetition/due", Some(token.as_str()), None).await;
        assert!(body.as_array().unwrap().is_empty());

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/v1/spaced-repetition/by-list/{}", list),
            Some(token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/spaced-repetition/review",
            Some(token.as_str()),
            Some(json!({"repetition_id": id, "quality": 9})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_quiz_scores() {
        let (app, state) = test_app().await;
        let user = seed_user(&state.pool, "learner@lumina.dev").await;
        let token = sign_in(&state, user).await;
        let list = seed_list(&state.pool, "Travel", user).await;

        for score in [6, 9, 4] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/v1/spaced-repetition/quiz-results",
                Some(token.as_str()),
                Some(json!({"vocabulary_list_id": list, "score": score})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/v1/spaced-repetition/quiz-scores?list_id={}", list),
            Some(token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["best_score"], 9);
        assert_eq!(body[0]["last_score"], 4);
        assert_eq!(body[0]["total_attempts"], 3);

        let (status, _) = send(
            &app,
            "GET",
            "/api/v1/spaced-repetition/by-list/999",
            Some(token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
