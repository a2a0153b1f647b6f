//! Leaderboard service
//!
//! Season numbers are unique and season windows never overlap. At most one
//! season is active at a time.
//!
//! Finished listening and reading parts earn season points once per part;
//! see `models::season_score` for the scoring rules.

use crate::db::repositories::{ExamAttemptRepository, LeaderboardRepository};
use crate::models::{
    completion_message, estimate_toeic, level_for, score_part, AttemptStatus, AttemptSummary,
    CalculateScoreInput, CreateLeaderboardInput, Leaderboard, LeaderboardSummary, ListParams,
    PagedResult, RankingEntry, SeasonRollover, SeasonScoreResult, Skill, SkillAttempt,
    UpdateLeaderboardInput, UserLeaderboard,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{require_id, ServiceError, ServiceResult};

/// Ranking size used when the caller does not ask for one
pub const DEFAULT_RANKING_SIZE: i64 = 10;
const MAX_RANKING_SIZE: i64 = 100;

pub struct LeaderboardService {
    repo: Arc<dyn LeaderboardRepository>,
    attempts: Arc<dyn ExamAttemptRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Leaderboard not found.".to_string())
}

impl LeaderboardService {
    pub fn new(repo: Arc<dyn LeaderboardRepository>, attempts: Arc<dyn ExamAttemptRepository>) -> Self {
        Self { repo, attempts }
    }

    pub async fn list(
        &self,
        keyword: Option<&str>,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<LeaderboardSummary>> {
        let (seasons, total) = self.repo.list_paged(keyword, params).await?;
        let now = Utc::now();

        let mut items = Vec::with_capacity(seasons.len());
        for season in seasons {
            items.push(self.summarize(season, now).await?);
        }
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<LeaderboardSummary> {
        require_id(id, "leaderboardId")?;
        let season = self.repo.get_by_id(id).await?.ok_or_else(not_found)?;
        self.summarize(season, Utc::now()).await
    }

    /// The active season running right now
    pub async fn get_current(&self) -> ServiceResult<LeaderboardSummary> {
        let now = Utc::now();
        let season = self
            .repo
            .get_current(now)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No season is currently running.".to_string()))?;
        self.summarize(season, now).await
    }

    pub async fn create(&self, input: CreateLeaderboardInput) -> ServiceResult<LeaderboardSummary> {
        self.validate(input.season_number, input.start_date, input.end_date, None)
            .await?;

        let created = self.repo.create(&input).await?;
        if input.is_active {
            self.repo.set_current(created.id).await?;
        }
        tracing::info!("Created leaderboard season {}", created.season_number);
        self.get_by_id(created.id).await
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateLeaderboardInput,
    ) -> ServiceResult<LeaderboardSummary> {
        require_id(id, "leaderboardId")?;
        let current = self.repo.get_by_id(id).await?.ok_or_else(not_found)?;

        let season_number = input.season_number.unwrap_or(current.season_number);
        let start = input.start_date.unwrap_or(current.start_date);
        let end = input.end_date.unwrap_or(current.end_date);
        self.validate(season_number, start, end, Some(id)).await?;

        self.repo.update(id, &input).await?.ok_or_else(not_found)?;
        if input.is_active == Some(true) {
            self.repo.set_current(id).await?;
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        require_id(id, "leaderboardId")?;
        if !self.repo.delete(id).await? {
            return Err(not_found());
        }
        tracing::info!("Deleted leaderboard {}", id);
        Ok(())
    }

    /// Make this season the only active one
    pub async fn activate(&self, id: i64) -> ServiceResult<()> {
        require_id(id, "leaderboardId")?;
        if !self.repo.set_current(id).await? {
            return Err(not_found());
        }
        tracing::info!("Leaderboard {} is now the current season", id);
        Ok(())
    }

    /// Top participants; `top` is clamped to 1..=100
    pub async fn ranking(&self, id: i64, top: Option<i64>) -> ServiceResult<Vec<RankingEntry>> {
        require_id(id, "leaderboardId")?;
        self.repo.get_by_id(id).await?.ok_or_else(not_found)?;
        let top = top.unwrap_or(DEFAULT_RANKING_SIZE).clamp(1, MAX_RANKING_SIZE);
        Ok(self.repo.ranking(id, top).await?)
    }

    /// 1-based rank of the user in the season; 0 when unranked
    pub async fn user_rank(&self, user_id: i64, id: i64) -> ServiceResult<i64> {
        require_id(id, "leaderboardId")?;
        require_id(user_id, "userId")?;
        self.repo.get_by_id(id).await?.ok_or_else(not_found)?;
        Ok(self.repo.user_rank(user_id, id).await?)
    }

    /// Record a participant's score for a season
    pub async fn record_score(
        &self,
        user_id: i64,
        id: i64,
        score: i32,
    ) -> ServiceResult<UserLeaderboard> {
        require_id(id, "leaderboardId")?;
        require_id(user_id, "userId")?;
        if score < 0 {
            return Err(ServiceError::Validation("Score must not be negative.".to_string()));
        }
        self.repo.get_by_id(id).await?.ok_or_else(not_found)?;
        Ok(self.repo.upsert_score(user_id, id, score).await?)
    }

    /// End seasons past their end date, then start the season whose window
    /// contains now if none is running
    pub async fn auto_manage_seasons(&self) -> ServiceResult<SeasonRollover> {
        let now = Utc::now();
        let ended = self.repo.end_expired(now).await?;

        let mut activated = None;
        if self.repo.get_current(now).await?.is_none() {
            if let Some(season) = self.repo.find_startable(now).await? {
                self.repo.set_current(season.id).await?;
                tracing::info!("Season {} started automatically", season.season_number);
                activated = Some(season.id);
            }
        }
        if ended > 0 {
            tracing::info!("Ended {} expired season(s)", ended);
        }
        Ok(SeasonRollover { ended, activated })
    }

    /// Score a finished listening or reading part for the running season.
    ///
    /// Points are added only for the first completed attempt of a part and
    /// only when at least one answer is correct; repeats still get a result.
    pub async fn calculate_season_score(
        &self,
        user_id: i64,
        input: CalculateScoreInput,
    ) -> ServiceResult<SeasonScoreResult> {
        require_id(user_id, "userId")?;
        require_id(input.exam_attempt_id, "examAttemptId")?;
        if input.correct_answers < 0
            || input.total_questions < 0
            || input.time_spent_seconds < 0
            || input.expected_time_seconds < 0
        {
            return Err(ServiceError::Validation(
                "Answer counts and times must not be negative.".to_string(),
            ));
        }
        if input.total_questions > 0 && input.correct_answers > input.total_questions {
            return Err(ServiceError::Validation(
                "Correct answers cannot exceed total questions.".to_string(),
            ));
        }

        let summary = self
            .attempts
            .get_summary(input.exam_attempt_id)
            .await?
            .filter(|summary| summary.attempt.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound("Exam attempt not found.".to_string()))?;
        if Skill::from_part_code(&summary.part_code).is_none() {
            return Err(ServiceError::Validation(
                "Only listening and reading parts earn season points.".to_string(),
            ));
        }

        let season = self
            .repo
            .get_current(Utc::now())
            .await?
            .ok_or_else(|| ServiceError::InvalidState("No season is currently running.".to_string()))?;

        let history = self.attempts.list_by_user(user_id).await?;
        let attempt = &summary.attempt;
        let is_first_attempt = !history.iter().any(|earlier| {
            earlier.attempt.exam_id == attempt.exam_id
                && earlier.attempt.exam_part_id == attempt.exam_part_id
                && earlier.attempt.status == AttemptStatus::Completed
                && earlier.attempt.id < attempt.id
        });
        let completed: Vec<SkillAttempt> = history.iter().filter_map(skill_attempt).collect();
        let level = level_for(estimate_toeic(&completed));

        let breakdown = score_part(&input, level);
        let season_score = breakdown.total();
        let (points_added, total_accumulated_score) =
            if input.correct_answers > 0 && is_first_attempt {
                let row = self.repo.add_score(user_id, season.id, season_score).await?;
                tracing::info!(
                    "User {} earned {} points in season {} (total {})",
                    user_id,
                    season_score,
                    season.season_number,
                    row.score
                );
                (season_score, row.score)
            } else {
                let total = self
                    .repo
                    .get_score(user_id, season.id)
                    .await?
                    .map(|row| row.score)
                    .unwrap_or(0);
                (0, total)
            };

        Ok(SeasonScoreResult {
            leaderboard_id: season.id,
            season_score,
            breakdown,
            points_added,
            is_first_attempt,
            message: completion_message(season_score, is_first_attempt).to_string(),
            total_accumulated_score,
        })
    }

    async fn summarize(&self, season: Leaderboard, now: DateTime<Utc>) -> ServiceResult<LeaderboardSummary> {
        let participants = self.repo.participant_count(season.id).await?;
        Ok(LeaderboardSummary::new(season, participants, now))
    }

    /// Overlap is only checked for seasons with a complete window
    async fn validate(
        &self,
        season_number: i32,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        exclude_id: Option<i64>,
    ) -> ServiceResult<()> {
        if season_number <= 0 {
            return Err(ServiceError::Validation(
                "Season number must be greater than 0.".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(ServiceError::Validation(
                    "End date must not be before start date.".to_string(),
                ));
            }
        }
        if self.repo.exists_season_number(season_number, exclude_id).await? {
            return Err(ServiceError::Validation(format!(
                "Season {} already exists.",
                season_number
            )));
        }
        if start.is_some()
            && end.is_some()
            && self.repo.has_date_overlap(start, end, exclude_id).await?
        {
            return Err(ServiceError::Validation(
                "Season dates overlap an existing season.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Completed part attempt as seen by the TOEIC estimate; a part attempt's
/// score counts its correct answers
fn skill_attempt(summary: &AttemptSummary) -> Option<SkillAttempt> {
    let attempt = &summary.attempt;
    if attempt.status != AttemptStatus::Completed {
        return None;
    }
    Some(SkillAttempt {
        exam_id: attempt.exam_id,
        exam_part_id: attempt.exam_part_id?,
        skill: Skill::from_part_code(&summary.part_code)?,
        correct: attempt.score.unwrap_or(0),
        finished_at: attempt.end_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::exam::fixtures::seed_exam;
    use crate::db::repositories::test_support::{seed_user, test_pool};
    use crate::db::repositories::{
        ExamRepository, SqlxExamAttemptRepository, SqlxExamRepository, SqlxLeaderboardRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::{CreateExamPartInput, FinishAttemptInput, SeasonStatus, StartAttemptInput};
    use chrono::Duration;

    fn season(number: i32, start_offset: i64, end_offset: i64) -> CreateLeaderboardInput {
        let now = Utc::now();
        CreateLeaderboardInput {
            season_name: Some(format!("Season {}", number)),
            season_number: number,
            start_date: Some(now + Duration::days(start_offset)),
            end_date: Some(now + Duration::days(end_offset)),
            is_active: false,
        }
    }

    async fn setup() -> (DynDatabasePool, LeaderboardService) {
        let pool = test_pool().await;
        let service = LeaderboardService::new(
            SqlxLeaderboardRepository::boxed(pool.clone()),
            SqlxExamAttemptRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    #[tokio::test]
    async fn test_create_validations() {
        let (_pool, service) = setup().await;
        service.create(season(1, -10, 10)).await.unwrap();

        for bad in [season(0, 20, 30), season(2, 30, 20), season(1, 20, 30), season(2, 5, 30)] {
            let err = service.create(bad).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{:?}", err);
        }

        let created = service.create(season(2, 11, 30)).await.unwrap();
        assert_eq!(created.status, SeasonStatus::Upcoming);
        assert_eq!(created.total_participants, 0);
    }

    #[tokio::test]
    async fn test_update_excludes_itself() {
        let (_pool, service) = setup().await;
        let first = service.create(season(1, -10, 10)).await.unwrap();
        service.create(season(2, 20, 30)).await.unwrap();

        let updated = service
            .update(
                first.leaderboard.id,
                UpdateLeaderboardInput {
                    season_name: Some(Some("Kick-off".into())),
                    end_date: Some(Some(Utc::now() + Duration::days(15))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.leaderboard.season_name.as_deref(), Some("Kick-off"));

        let err = service
            .update(
                first.leaderboard.id,
                UpdateLeaderboardInput {
                    season_number: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_activation_and_ranking() {
        let (pool, service) = setup().await;
        let alice = seed_user(&pool, "alice@lumina.dev").await;
        let bob = seed_user(&pool, "bob@lumina.dev").await;

        let past = service.create(season(1, -30, -20)).await.unwrap();
        let running = service.create(season(2, -5, 5)).await.unwrap();
        let id = running.leaderboard.id;

        assert!(matches!(service.get_current().await, Err(ServiceError::NotFound(_))));
        service.activate(id).await.unwrap();
        assert_eq!(service.get_current().await.unwrap().leaderboard.id, id);
        assert!(matches!(service.activate(999).await, Err(ServiceError::NotFound(_))));

        service.record_score(alice, id, 40).await.unwrap();
        service.record_score(bob, id, 70).await.unwrap();
        assert!(service.record_score(bob, id, -1).await.is_err());

        let ranking = service.ranking(id, None).await.unwrap();
        assert_eq!(ranking.iter().map(|r| r.user_id).collect::<Vec<_>>(), vec![bob, alice]);
        assert_eq!(service.user_rank(alice, id).await.unwrap(), 2);
        assert_eq!(service.user_rank(alice, past.leaderboard.id).await.unwrap(), 0);
        assert_eq!(service.get_by_id(id).await.unwrap().total_participants, 2);

        let page = service.list(None, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);

        service.delete(past.leaderboard.id).await.unwrap();
        assert!(matches!(
            service.ranking(past.leaderboard.id, Some(5)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    /// Finished attempt on a fresh part of `exam_id` with the given code
    async fn finished_part(
        pool: &DynDatabasePool,
        user: i64,
        exam_id: i64,
        part_id: Option<i64>,
        code: &str,
        correct: i32,
    ) -> (i64, i64) {
        let part_id = match part_id {
            Some(id) => id,
            None => {
                SqlxExamRepository::new(pool.clone())
                    .create_part(&CreateExamPartInput {
                        exam_id,
                        part_code: code.into(),
                        title: code.into(),
                        order_index: 1,
                    })
                    .await
                    .unwrap()
                    .id
            }
        };
        let attempts = SqlxExamAttemptRepository::new(pool.clone());
        let attempt = attempts
            .start(
                user,
                &StartAttemptInput {
                    exam_id,
                    exam_part_id: Some(part_id),
                },
            )
            .await
            .unwrap();
        attempts
            .finish(
                attempt.id,
                &FinishAttemptInput {
                    score: correct,
                    end_time: None,
                },
            )
            .await
            .unwrap();
        (attempt.id, part_id)
    }

    fn submitted(attempt_id: i64, correct: i32, total: i32) -> CalculateScoreInput {
        CalculateScoreInput {
            exam_attempt_id: attempt_id,
            correct_answers: correct,
            total_questions: total,
            time_spent_seconds: 300,
            expected_time_seconds: 600,
        }
    }

    #[tokio::test]
    async fn test_auto_manage_seasons() {
        let (_pool, service) = setup().await;
        let mut expired = season(1, -40, -10);
        expired.is_active = true;
        let expired = service.create(expired).await.unwrap();
        let due = service.create(season(2, -5, 20)).await.unwrap();
        service.create(season(3, 30, 60)).await.unwrap();

        let rollover = service.auto_manage_seasons().await.unwrap();
        assert_eq!(rollover, SeasonRollover { ended: 1, activated: Some(due.leaderboard.id) });
        assert!(!service.get_by_id(expired.leaderboard.id).await.unwrap().leaderboard.is_active);
        assert_eq!(service.get_current().await.unwrap().leaderboard.id, due.leaderboard.id);

        let again = service.auto_manage_seasons().await.unwrap();
        assert_eq!(again, SeasonRollover { ended: 0, activated: None });
    }

    #[tokio::test]
    async fn test_season_score_counts_first_attempts_only() {
        let (pool, service) = setup().await;
        let user = seed_user(&pool, "learner@lumina.dev").await;
        let other = seed_user(&pool, "other@lumina.dev").await;
        let exam = seed_exam(&pool, user).await.exam_id;

        let (first, part) = finished_part(&pool, user, exam, None, "LISTENING_PART_1", 10).await;
        let err = service
            .calculate_season_score(user, submitted(first, 10, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let mut running = season(1, -1, 30);
        running.is_active = true;
        let running = service.create(running).await.unwrap();

        // 10 correct at beginner level: 150 base, 15 time, 225 accuracy
        let result = service
            .calculate_season_score(user, submitted(first, 10, 10))
            .await
            .unwrap();
        assert!(result.is_first_attempt);
        assert_eq!(result.leaderboard_id, running.leaderboard.id);
        assert_eq!(result.season_score, 390);
        assert_eq!(result.points_added, 390);
        assert_eq!(result.total_accumulated_score, 390);
        assert!(result.message.starts_with("Well done"));

        let (retake, _) = finished_part(&pool, user, exam, Some(part), "", 10).await;
        let result = service
            .calculate_season_score(user, submitted(retake, 10, 10))
            .await
            .unwrap();
        assert!(!result.is_first_attempt);
        assert_eq!(result.points_added, 0);
        assert_eq!(result.total_accumulated_score, 390);

        let (reading, _) = finished_part(&pool, user, exam, None, "READING_PART_5", 0).await;
        let result = service
            .calculate_season_score(user, submitted(reading, 0, 10))
            .await
            .unwrap();
        assert_eq!((result.season_score, result.points_added), (0, 0));
        assert_eq!(service.user_rank(user, running.leaderboard.id).await.unwrap(), 1);

        let err = service
            .calculate_season_score(other, submitted(first, 10, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = service
            .calculate_season_score(user, submitted(first, 11, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let (writing, _) = finished_part(&pool, user, exam, None, "WRITING_PART_1", 3).await;
        let err = service
            .calculate_season_score(user, submitted(writing, 3, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
