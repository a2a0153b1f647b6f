//! Exam catalog API endpoints
//!
//! The catalog is public; authoring routes are limited to staff.

use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::api::common::{check_id, created};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{require_auth, require_staff, ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CreateExamInput, CreateExamPartInput, CreateQuestionInput, Exam, ExamDetail, ExamFilter,
    ExamPartDetail,
};

pub fn router(state: AppState) -> Router<AppState> {
    let staff = Router::new()
        .route("/", post(create_exam))
        .route("/parts", post(create_part))
        .route("/questions", post(create_question))
        .route_layer(from_fn(require_staff))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(list_exams))
        .route("/{id}", get(get_exam))
        .route("/parts/{id}", get(get_part))
        .merge(staff)
}

/// GET /api/v1/exams?exam_type&part_code
async fn list_exams(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ExamFilter>,
) -> Result<Json<Vec<Exam>>, ApiError> {
    Ok(Json(state.services.exams.list(&filter).await?))
}

/// GET /api/v1/exams/{id} - Exam with its parts
async fn get_exam(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ExamDetail>, ApiError> {
    let id = check_id(id, "examId")?;
    Ok(Json(state.services.exams.get_detail(id).await?))
}

/// GET /api/v1/exams/parts/{id} - Part with questions and options
async fn get_part(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ExamPartDetail>, ApiError> {
    let id = check_id(id, "partId")?;
    Ok(Json(state.services.exams.get_part_detail(id).await?))
}

/// POST /api/v1/exams
async fn create_exam(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CreateExamInput>,
) -> Result<Response, ApiError> {
    let exam = state.services.exams.create_exam(input, user.id).await?;
    Ok(created(exam))
}

/// POST /api/v1/exams/parts
async fn create_part(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateExamPartInput>,
) -> Result<Response, ApiError> {
    let part = state.services.exams.create_part(input).await?;
    Ok(created(part))
}

/// POST /api/v1/exams/questions
async fn create_question(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateQuestionInput>,
) -> Result<Response, ApiError> {
    let question = state.services.exams.create_question(input).await?;
    Ok(created(question))
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
    async fn test_catalog_reads() {
        let (app, state) = test_app().await;
        let staff = seed_user(&state.pool, "staff@lumina.dev").await;
        let staff_token = sign_in(&state, staff).await;
        let seeded = seed_exam(&state.pool, staff).await;

        let (status, body) = send(&app, "GET", "/api/v1/exams?exam_type=TOEIC", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = send(&app, "GET", "/api/v1/exams?part_code=P7", None, None).await;
        assert_eq!(body, json!([]));

        let (status, body) = send(&app, "GET", &format!("/api/v1/exams/{}", seeded.exam_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parts"][0]["part_code"], "P1");
        assert_eq!(body["parts"][1]["part_code"], "P5");

        let uri = format!("/api/v1/exams/parts/{}", seeded.reading_part);
        let (status, body) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"][0]["options"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, "GET", "/api/v1/exams/parts/0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid partId.");
    }

    #[tokio::test]
    async fn test_authoring_requires_staff() {
        let (app, state) = test_app().await;
        let staff = seed_user(&state.pool, "staff@lumina.dev").await;
        let staff_token = sign_in(&state, staff).await;
        let student = seed_user_with_role(&state.pool, "student@lumina.dev", UserRole::Customer).await;
        let student_token = sign_in(&state, student).await;
        let exam = json!({"exam_type": "IELTS", "name": "IELTS Mock 1"});

        let (status, _) = send(&app, "POST", "/api/v1/exams", Some(student_token.as_str()), Some(exam.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Warm the catalog cache; the create below must invalidate it
        let (_, body) = send(&app, "GET", "/api/v1/exams", None, None).await;
        assert_eq!(body, json!([]));

        let (status, body) = send(&app, "POST", "/api/v1/exams", Some(staff_token.as_str()), Some(exam)).await;
        assert_eq!(status, StatusCode::CREATED);
        let exam_id = body["id"].as_i64().unwrap();

        let (_, body) = send(&app, "GET", "/api/v1/exams", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/exams/parts",
            Some(staff_token.as_str()),
            Some(json!({"exam_id": exam_id, "part_code": "W1", "title": "Task 1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let part_id = body["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/exams/questions",
            Some(staff_token.as_str()),
            Some(json!({
                "part_id": part_id,
                "question_type": "Reading",
                "score_weight": 1,
                "question_number": 1,
                "options": [
                    {"content": "a", "is_correct": true},
                    {"content": "b", "is_correct": true}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
