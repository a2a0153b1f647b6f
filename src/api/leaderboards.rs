//! Leaderboard API endpoints
//!
//! Seasons, their rankings and the caller's own rank.
//!
//! - POST /api/v1/leaderboards/calculate-score - Season points for a finished part
//! - POST /api/v1/leaderboards/auto-manage     - End expired seasons, start the due one (staff)

use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{check_id, created, default_page, default_page_size};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{
    require_auth, require_staff, ApiError, AppState, AuthenticatedUser,
};
use crate::models::{
    CalculateScoreInput, CreateLeaderboardInput, LeaderboardSummary, ListParams, PagedResult,
    RankingEntry, SeasonRollover, SeasonScoreResult, UpdateLeaderboardInput,
};

#[derive(Debug, Deserialize)]
pub struct ListLeaderboardsQuery {
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub top: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    /// 1-based position, 0 when the user has no score in the season
    pub rank: i64,
}

pub fn router(state: AppState) -> Router<AppState> {
    let staff = Router::new()
        .route("/auto-manage", post(auto_manage_seasons))
        .route_layer(from_fn(require_staff))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let protected = Router::new()
        .route("/", post(create_leaderboard))
        .route("/calculate-score", post(calculate_score))
        .route("/{id}", put(update_leaderboard).delete(delete_leaderboard))
        .route("/{id}/activate", post(activate_leaderboard))
        .route("/{id}/my-rank", get(my_rank))
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(list_leaderboards))
        .route("/current", get(current_leaderboard))
        .route("/{id}", get(get_leaderboard))
        .route("/{id}/ranking", get(ranking))
        .merge(protected)
        .merge(staff)
}

/// GET /api/v1/leaderboards?keyword&page&page_size
async fn list_leaderboards(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListLeaderboardsQuery>,
) -> Result<Json<PagedResult<LeaderboardSummary>>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let seasons = state
        .services
        .leaderboards
        .list(query.keyword.as_deref(), &params)
        .await?;
    Ok(Json(seasons))
}

/// GET /api/v1/leaderboards/current
async fn current_leaderboard(State(state): State<AppState>) -> Result<Json<LeaderboardSummary>, ApiError> {
    Ok(Json(state.services.leaderboards.get_current().await?))
}

/// GET /api/v1/leaderboards/{id}
async fn get_leaderboard(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<LeaderboardSummary>, ApiError> {
    let id = check_id(id, "leaderboardId")?;
    Ok(Json(state.services.leaderboards.get_by_id(id).await?))
}

/// GET /api/v1/leaderboards/{id}/ranking?top
async fn ranking(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RankingQuery>,
) -> Result<Json<Vec<RankingEntry>>, ApiError> {
    let id = check_id(id, "leaderboardId")?;
    Ok(Json(state.services.leaderboards.ranking(id, query.top).await?))
}

/// GET /api/v1/leaderboards/{id}/my-rank
async fn my_rank(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<RankResponse>, ApiError> {
    let id = check_id(id, "leaderboardId")?;
    let rank = state.services.leaderboards.user_rank(user.id, id).await?;
    Ok(Json(RankResponse { rank }))
}

/// POST /api/v1/leaderboards
async fn create_leaderboard(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateLeaderboardInput>,
) -> Result<Response, ApiError> {
    let season = state.services.leaderboards.create(input).await?;
    Ok(created(season))
}

/// PUT /api/v1/leaderboards/{id}
async fn update_leaderboard(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateLeaderboardInput>,
) -> Result<Json<LeaderboardSummary>, ApiError> {
    let id = check_id(id, "leaderboardId")?;
    Ok(Json(state.services.leaderboards.update(id, input).await?))
}

/// DELETE /api/v1/leaderboards/{id}
async fn delete_leaderboard(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "leaderboardId")?;
    state.services.leaderboards.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/leaderboards/{id}/activate
async fn activate_leaderboard(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let id = check_id(id, "leaderboardId")?;
    state.services.leaderboards.activate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/leaderboards/calculate-score
async fn calculate_score(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    ApiJson(input): ApiJson<CalculateScoreInput>,
) -> Result<Json<SeasonScoreResult>, ApiError> {
    let result = state
        .services
        .leaderboards
        .calculate_season_score(user.id, input)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/leaderboards/auto-manage
async fn auto_manage_seasons(State(state): State<AppState>) -> Result<Json<SeasonRollover>, ApiError> {
    Ok(Json(state.services.leaderboards.auto_manage_seasons().await?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{send, sign_in, test_app};
    use crate::db::repositories::exam::fixtures::seed_exam;
    use crate::db::repositories::test_support::seed_user_with_role;
    use crate::db::repositories::{
        ExamAttemptRepository, ExamRepository, SqlxExamAttemptRepository, SqlxExamRepository,
    };
    use crate::models::{CreateExamPartInput, FinishAttemptInput, StartAttemptInput, UserRole};
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_seasons_and_ranking() {
        let (app, state) = test_app().await;
        let admin = seed_user_with_role(&state.pool, "admin@lumina.dev", UserRole::Admin).await;
        let admin_token = sign_in(&state, admin).await;
        let player = seed_user_with_role(&state.pool, "player@lumina.dev", UserRole::Customer).await;
        let player_token = sign_in(&state, player).await;
        let now = Utc::now();

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/leaderboards",
            Some(admin_token.as_str()),
            Some(json!({
                "season_name": "Autumn",
                "season_number": 1,
                "start_date": now - Duration::days(1),
                "end_date": now + Duration::days(30),
                "is_active": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "Active");
        let id = body["leaderboard"]["id"].as_i64().unwrap();

        let (status, body) = send(&app, "GET", "/api/v1/leaderboards/current", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["leaderboard"]["id"], id);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/leaderboards",
            Some(admin_token.as_str()),
            Some(json!({"season_number": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        state
            .services
            .leaderboards
            .record_score(player, id, 120)
            .await
            .unwrap();

        let (_, body) = send(&app, "GET", &format!("/api/v1/leaderboards/{}/ranking?top=500", id), None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["rank"], 1);
        assert_eq!(body[0]["score"], 120);

        let rank_uri = format!("/api/v1/leaderboards/{}/my-rank", id);
        let (_, body) = send(&app, "GET", &rank_uri, Some(player_token.as_str()), None).await;
        assert_eq!(body, json!({"rank": 1}));
        let (_, body) = send(&app, "GET", &rank_uri, Some(admin_token.as_str()), None).await;
        assert_eq!(body, json!({"rank": 0}));

        let (_, body) = send(&app, "GET", "/api/v1/leaderboards?keyword=autumn", None, None).await;
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn test_activate_and_delete() {
        let (app, state) = test_app().await;
        let admin = seed_user_with_role(&state.pool, "admin@lumina.dev", UserRole::Admin).await;
        let admin_token = sign_in(&state, admin).await;

        let (status, _) = send(&app, "GET", "/api/v1/leaderboards/current", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/leaderboards",
            Some(admin_token.as_str()),
            Some(json!({"season_number": 2})),
        )
        .await;
        let uri = format!("/api/v1/leaderboards/{}", body["leaderboard"]["id"]);

        let (status, _) = send(&app, "POST", &format!("{}/activate", uri), Some(admin_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(body["leaderboard"]["is_active"], true);

        let (status, _) = send(&app, "POST", "/api/v1/leaderboards/999/activate", Some(admin_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", &uri, Some(admin_token.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_auto_manage_requires_staff() {
        let (app, state) = test_app().await;
        let admin = seed_user_with_role(&state.pool, "admin@lumina.dev", UserRole::Admin).await;
        let admin_token = sign_in(&state, admin).await;
        let player = seed_user_with_role(&state.pool, "player@lumina.dev", UserRole::Customer).await;
        let player_token = sign_in(&state, player).await;
        let now = Utc::now();

        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/leaderboards",
            Some(admin_token.as_str()),
            Some(json!({
                "season_number": 1,
                "start_date": now - Duration::days(2),
                "end_date": now + Duration::days(20)
            })),
        )
        .await;
        let id = body["leaderboard"]["id"].clone();

        let (status, _) = send(&app, "POST", "/api/v1/leaderboards/auto-manage", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/leaderboards/auto-manage",
            Some(player_token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/leaderboards/auto-manage",
            Some(admin_token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ended": 0, "activated": id}));

        let (_, body) = send(&app, "GET", "/api/v1/leaderboards/current", None, None).await;
        assert_eq!(body["leaderboard"]["id"], id);
    }

    #[tokio::test]
    async fn test_calculate_score() {
        let (app, state) = test_app().await;
        let admin = seed_user_with_role(&state.pool, "admin@lumina.dev", UserRole::Admin).await;
        let player = seed_user_with_role(&state.pool, "player@lumina.dev", UserRole::Customer).await;
        let player_token = sign_in(&state, player).await;
        let exam = seed_exam(&state.pool, admin).await.exam_id;

        let part = SqlxExamRepository::new(state.pool.clone())
            .create_part(&CreateExamPartInput {
                exam_id: exam,
                part_code: "READING_PART_7".into(),
                title: "Reading comprehension".into(),
                order_index: 7,
            })
            .await
            .unwrap();
        let attempts = SqlxExamAttemptRepository::new(state.pool.clone());
        let attempt = attempts
            .start(
                player,
                &StartAttemptInput {
                    exam_id: exam,
                    exam_part_id: Some(part.id),
                },
            )
            .await
            .unwrap();
        attempts
            .finish(attempt.id, &FinishAttemptInput { score: 4, end_time: None })
            .await
            .unwrap();

        let body = json!({
            "exam_attempt_id": attempt.id,
            "correct_answers": 4,
            "total_questions": 10,
            "time_spent_seconds": 900,
            "expected_time_seconds": 600
        });
        let (status, _) = send(&app, "POST", "/api/v1/leaderboards/calculate-score", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, reply) = send(
            &app,
            "POST",
            "/api/v1/leaderboards/calculate-score",
            Some(player_token.as_str()),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"]["code"], "INVALID_STATE");

        state
            .services
            .leaderboards
            .create(crate::models::CreateLeaderboardInput {
                season_name: None,
                season_number: 1,
                start_date: Some(Utc::now() - Duration::days(1)),
                end_date: Some(Utc::now() + Duration::days(10)),
                is_active: true,
            })
            .await
            .unwrap();

        // 4 of 10 at beginner level: 60 base points, no bonus
        let (status, reply) = send(
            &app,
            "POST",
            "/api/v1/leaderboards/calculate-score",
            Some(player_token.as_str()),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["season_score"], 60);
        assert_eq!(reply["base_points"], 60);
        assert_eq!(reply["time_bonus"], 0);
        assert_eq!(reply["points_added"], 60);
        assert_eq!(reply["total_accumulated_score"], 60);
        assert_eq!(reply["is_first_attempt"], true);
    }
}
