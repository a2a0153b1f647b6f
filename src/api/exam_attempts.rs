//! Exam attempt API endpoints
//!
//! All routes act for the authenticated user; attempts of other users are
//! reported as missing.

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::api::common::{check_id, created};
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::models::{
    AttemptDetail, AttemptSummary, ChoiceAnswer, ChoiceAnswerInput, ExamAttempt,
    FinishAttemptInput, SpeakingAnswer, SpeakingAnswerInput, StartAttemptInput, WritingAnswer,
    WritingAnswerInput,
};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_attempts))
        .route("/start", post(start_attempt))
        .route("/{id}", get(get_attempt))
        .route("/{id}/finish", post(finish_attempt))
        .route("/answers/multiple-choice", post(save_choice_answer))
        .route("/answers/writing", post(save_writing_answer))
        .route("/answers/speaking", post(save_speaking_answer))
        .route_layer(from_fn_with_state(state, require_auth))
}

/// GET /api/v1/exam-attempts - The caller's attempts, newest first
async fn list_attempts(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<AttemptSummary>>, ApiError> {
    Ok(Json(state.services.exam_attempts.list_by_user(user.id).await?))
}

/// POST /api/v1/exam-attempts/start
async fn start_attempt(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<StartAttemptInput>,
) -> Result<Response, ApiError> {
    let attempt = state.services.exam_attempts.start(user.id, input).await?;
    Ok(created(attempt))
}

/// GET /api/v1/exam-attempts/{id} - Attempt with its answers grouped by skill
async fn get_attempt(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AttemptDetail>, ApiError> {
    let id = check_id(id, "attemptId")?;
    Ok(Json(state.services.exam_attempts.get_detail(id, user.id).await?))
}

/// POST /api/v1/exam-attempts/{id}/finish
async fn finish_attempt(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<FinishAttemptInput>,
) -> Result<Json<ExamAttempt>, ApiError> {
    let id = check_id(id, "attemptId")?;
    let attempt = state
        .services
        .exam_attempts
        .finish(id, user.id, input)
        .await?;
    Ok(Json(attempt))
}

/// POST /api/v1/exam-attempts/answers/multiple-choice
async fn save_choice_answer(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<ChoiceAnswerInput>,
) -> Result<Json<ChoiceAnswer>, ApiError> {
    let answer = state
        .services
        .exam_attempts
        .save_multiple_choice_answer(user.id, input)
        .await?;
    Ok(Json(answer))
}

/// POST /api/v1/exam-attempts/answers/writing
async fn save_writing_answer(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<WritingAnswerInput>,
) -> Result<Json<WritingAnswer>, ApiError> {
    let answer = state
        .services
        .exam_attempts
        .save_writing_answer(user.id, input)
        .await?;
    Ok(Json(answer))
}

/// POST /api/v1/exam-attempts/answers/speaking
async fn save_speaking_answer(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<SpeakingAnswerInput>,
) -> Result<Json<SpeakingAnswer>, ApiError> {
    let answer = state
        .services
        .exam_attempts
        .save_speaking_answer(user.id, input)
        .await?;
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, sign_in, test_app};
    use crate::db::repositories::exam::fixtures::seed_exam;
    use crate::db::repositories::test_support::{seed_user, seed_user_with_role};
    use crate::models::UserRole;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_attempt_lifecycle() {
        let (app, state) = test_app().await;
        let staff = seed_user(&state.pool, "staff@lumina.dev").await;
        let staff_token = sign_in(&state, staff).await;
        let student = seed_user_with_role(&state.pool, "student@lumina.dev", UserRole::Customer).await;
        let student_token = sign_in(&state, student).await;
        let other = seed_user_with_role(&state.pool, "other@lumina.dev", UserRole::Customer).await;
        let other_token = sign_in(&state, other).await;
        let exam = seed_exam(&state.pool, staff).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/start",
            Some(student_token.as_str()),
            Some(json!({"exam_id": exam.exam_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "Doing");
        let attempt = body["id"].as_i64().unwrap();

        let right = &exam.reading_question.options[0];
        let wrong = &exam.listening_question.options[1];
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/answers/multiple-choice",
            Some(student_token.as_str()),
            Some(json!({
                "attempt_id": attempt,
                "question_id": exam.reading_question.question.id,
                "selected_option_id": right.id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_correct"], true);

        // Option of another question
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/answers/multiple-choice",
            Some(student_token.as_str()),
            Some(json!({
                "attempt_id": attempt,
                "question_id": exam.reading_question.question.id,
                "selected_option_id": wrong.id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/v1/exam-attempts/{}", attempt);
        let (status, body) = send(&app, "GET", &uri, Some(student_token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reading_answers"].as_array().unwrap().len(), 1);
        assert_eq!(body["summary"]["is_mocktest"], true);
        let (status, _) = send(&app, "GET", &uri, Some(other_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let finish = format!("{}/finish", uri);
        let (status, _) = send(&app, "POST", &finish, Some(student_token.as_str()), Some(json!({"score": -1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, "POST", &finish, Some(student_token.as_str()), Some(json!({"score": 450}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Completed");
        assert_eq!(body["score"], 450);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/answers/writing",
            Some(student_token.as_str()),
            Some(json!({
                "attempt_id": attempt,
                "question_id": exam.reading_question.question.id,
                "answer_content": "Too late"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_STATE");

        let (_, body) = send(&app, "GET", "/api/v1/exam-attempts", Some(student_token.as_str()), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["exam_name"], "TOEIC Practice 1");
    }

    #[tokio::test]
    async fn test_part_attempt_and_speaking_answer() {
        let (app, state) = test_app().await;
        let staff = seed_user(&state.pool, "staff@lumina.dev").await;
        let staff_token = sign_in(&state, staff).await;
        let student = seed_user_with_role(&state.pool, "student@lumina.dev", UserRole::Customer).await;
        let student_token = sign_in(&state, student).await;
        let exam = seed_exam(&state.pool, staff).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/start",
            Some(student_token.as_str()),
            Some(json!({"exam_id": exam.exam_id, "exam_part_id": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/start",
            Some(student_token.as_str()),
            Some(json!({"exam_id": exam.exam_id, "exam_part_id": exam.listening_part})),
        )
        .await;
        let attempt = body["id"].as_i64().unwrap();

        let question = exam.listening_question.question.id;
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/answers/speaking",
            Some(student_token.as_str()),
            Some(json!({"attempt_id": attempt, "question_id": question})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/exam-attempts/answers/speaking",
            Some(student_token.as_str()),
            Some(json!({
                "attempt_id": attempt,
                "question_id": question,
                "audio_url": "/audio/1.mp3",
                "overall_score": 6.5
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["audio_url"], "/audio/1.mp3");

        let (_, body) = send(&app, "GET", &format!("/api/v1/exam-attempts/{}", attempt), Some(student_token.as_str()), None).await;
        assert_eq!(body["summary"]["is_mocktest"], false);
        assert_eq!(body["summary"]["part_code"], "P1");
        assert_eq!(body["speaking_answers"].as_array().unwrap().len(), 1);
    }
}
