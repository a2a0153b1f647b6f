//! Spaced repetition service
//!
//! Review scheduling for vocabulary lists and single words, plus the quiz
//! scores kept on list-level records. Every operation acts for the calling
//! user only.

use crate::db::repositories::{
    SpacedRepetitionRepository, VocabularyListRepository, VocabularyRepository,
};
use crate::models::{
    schedule_review, QuizResultInput, QuizScore, RepetitionView, ReviewOutcome, ReviewWordInput,
    SpacedRepetition, MAX_QUALITY,
};
use chrono::Utc;
use std::sync::Arc;

use super::{require_id, ServiceError, ServiceResult};

pub struct SpacedRepetitionService {
    repo: Arc<dyn SpacedRepetitionRepository>,
    lists: Arc<dyn VocabularyListRepository>,
    vocabularies: Arc<dyn VocabularyRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Spaced repetition record not found.".to_string())
}

fn list_not_found() -> ServiceError {
    ServiceError::NotFound("Vocabulary list not found.".to_string())
}

impl SpacedRepetitionService {
    pub fn new(
        repo: Arc<dyn SpacedRepetitionRepository>,
        lists: Arc<dyn VocabularyListRepository>,
        vocabularies: Arc<dyn VocabularyRepository>,
    ) -> Self {
        Self {
            repo,
            lists,
            vocabularies,
        }
    }

    /// Records that need another look today
    pub async fn due_for_review(&self, user_id: i64) -> ServiceResult<Vec<RepetitionView>> {
        require_id(user_id, "userId")?;
        let now = Utc::now();
        let due = self.repo.list_due(user_id, now).await?;
        Ok(due.into_iter().map(|r| RepetitionView::at(r, now)).collect())
    }

    pub async fn all_for_user(&self, user_id: i64) -> ServiceResult<Vec<RepetitionView>> {
        require_id(user_id, "userId")?;
        let now = Utc::now();
        let records = self.repo.list_by_user(user_id).await?;
        Ok(records.into_iter().map(|r| RepetitionView::at(r, now)).collect())
    }

    /// The caller's list-level record for a vocabulary list
    pub async fn get_by_list(&self, user_id: i64, list_id: i64) -> ServiceResult<RepetitionView> {
        require_id(user_id, "userId")?;
        require_id(list_id, "listId")?;
        let record = self
            .repo
            .get_by_user_and_list(user_id, list_id)
            .await?
            .ok_or_else(not_found)?;
        Ok(RepetitionView::at(record, Utc::now()))
    }

    /// Start tracking a vocabulary list; an existing record is returned as is
    pub async fn create_for_list(&self, user_id: i64, list_id: i64) -> ServiceResult<RepetitionView> {
        require_id(user_id, "userId")?;
        require_id(list_id, "listId")?;
        let record = self.list_record(user_id, list_id).await?;
        Ok(RepetitionView::at(record, Utc::now()))
    }

    /// Rate recall of a record (by id) or of a word (created on first review)
    pub async fn review(&self, user_id: i64, input: ReviewWordInput) -> ServiceResult<ReviewOutcome> {
        require_id(user_id, "userId")?;
        if !(0..=MAX_QUALITY).contains(&input.quality) {
            return Err(ServiceError::Validation(format!(
                "Quality must be between 0 and {}.",
                MAX_QUALITY
            )));
        }

        let record = match (input.repetition_id, input.vocabulary_id, input.vocabulary_list_id) {
            (Some(id), _, _) => {
                require_id(id, "repetitionId")?;
                self.repo
                    .get_by_id(id)
                    .await?
                    .filter(|r| r.user_id == user_id)
                    .ok_or_else(not_found)?
            }
            (None, Some(vocabulary_id), Some(list_id)) => {
                self.word_record(user_id, list_id, vocabulary_id).await?
            }
            _ => {
                return Err(ServiceError::Validation(
                    "Either repetitionId or both vocabularyId and vocabularyListId are required."
                        .to_string(),
                ))
            }
        };

        let schedule = schedule_review(input.quality, record.intervals, record.review_count);
        let now = Utc::now();
        let updated = self
            .repo
            .save_review(record.id, schedule, now)
            .await?
            .ok_or_else(not_found)?;

        tracing::debug!(
            "User {} reviewed repetition {} with quality {}: {} day(s), {}",
            user_id,
            updated.id,
            input.quality,
            schedule.intervals,
            schedule.status
        );
        Ok(ReviewOutcome {
            next_review_at: updated.next_review_at,
            new_intervals: schedule.intervals,
            repetition: RepetitionView::at(updated, now),
        })
    }

    /// Store a quiz score on the caller's list-level record
    pub async fn save_quiz_result(&self, user_id: i64, input: QuizResultInput) -> ServiceResult<QuizScore> {
        require_id(user_id, "userId")?;
        require_id(input.vocabulary_list_id, "listId")?;
        if input.score < 0 {
            return Err(ServiceError::Validation("Score cannot be negative.".to_string()));
        }

        let record = self.list_record(user_id, input.vocabulary_list_id).await?;
        let updated = self
            .repo
            .record_quiz(record.id, input.score, Utc::now())
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(
            "User {} scored {} on list {}",
            user_id,
            input.score,
            input.vocabulary_list_id
        );
        QuizScore::from_repetition(&updated)
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("Quiz score was not stored")))
    }

    /// Quiz history of the caller, for one list or every list quizzed so far
    pub async fn quiz_scores(&self, user_id: i64, list_id: Option<i64>) -> ServiceResult<Vec<QuizScore>> {
        require_id(user_id, "userId")?;
        let records = match list_id {
            Some(list_id) => {
                require_id(list_id, "listId")?;
                self.repo
                    .get_by_user_and_list(user_id, list_id)
                    .await?
                    .into_iter()
                    .collect()
            }
            None => self.repo.list_by_user(user_id).await?,
        };
        Ok(records.iter().filter_map(QuizScore::from_repetition).collect())
    }

    /// The list-level record, created when missing
    async fn list_record(&self, user_id: i64, list_id: i64) -> ServiceResult<SpacedRepetition> {
        if let Some(existing) = self.repo.get_by_user_and_list(user_id, list_id).await? {
            return Ok(existing);
        }
        if self.lists.get_by_id(list_id).await?.is_none() {
            return Err(list_not_found());
        }
        let created = self
            .repo
            .create(&SpacedRepetition::fresh(user_id, list_id, None, Utc::now()))
            .await?;
        tracing::info!("User {} started repeating list {}", user_id, list_id);
        Ok(created)
    }

    /// The word-level record, created when missing
    async fn word_record(
        &self,
        user_id: i64,
        list_id: i64,
        vocabulary_id: i64,
    ) -> ServiceResult<SpacedRepetition> {
        require_id(list_id, "listId")?;
        require_id(vocabulary_id, "vocabularyId")?;
        if let Some(existing) = self.repo.get_by_user_and_word(user_id, vocabulary_id).await? {
            return Ok(existing);
        }
        if self.lists.get_by_id(list_id).await?.is_none() {
            return Err(list_not_found());
        }
        let word = self
            .vocabularies
            .get_by_id(vocabulary_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vocabulary not found.".to_string()))?;
        if word.list_id != list_id {
            return Err(ServiceError::Validation(
                "Vocabulary does not belong to this list.".to_string(),
            ));
        }
        Ok(self
            .repo
            .create(&SpacedRepetition::fresh(user_id, list_id, Some(vocabulary_id), Utc::now()))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_list, seed_user, seed_word, test_pool};
    use crate::db::repositories::{
        SqlxSpacedRepetitionRepository, SqlxVocabularyListRepository, SqlxVocabularyRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::RepetitionStatus;

    struct Fixture {
        service: SpacedRepetitionService,
        pool: DynDatabasePool,
        user: i64,
        list: i64,
    }

    async fn setup() -> Fixture {
        let pool = test_pool().await;
        let user = seed_user(&pool, "learner@lumina.dev").await;
        let list = seed_list(&pool, "Travel", user).await;
        let service = SpacedRepetitionService::new(
            SqlxSpacedRepetitionRepository::boxed(pool.clone()),
            SqlxVocabularyListRepository::boxed(pool.clone()),
            SqlxVocabularyRepository::boxed(pool.clone()),
        );
        Fixture {
            service,
            pool,
            user,
            list,
        }
    }

    fn rate(repetition_id: i64, quality: i32) -> ReviewWordInput {
        ReviewWordInput {
            repetition_id: Some(repetition_id),
            quality,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_for_list_is_idempotent() {
        let fx = setup().await;
        let first = fx.service.create_for_list(fx.user, fx.list).await.unwrap();
        let again = fx.service.create_for_list(fx.user, fx.list).await.unwrap();
        assert_eq!(first.repetition.id, again.repetition.id);
        assert_eq!(first.repetition.status, RepetitionStatus::New);
        assert_eq!(first.days_until_review, 1);
        assert_eq!(first.repetition.vocabulary_list_name, "Travel");

        assert!(matches!(
            fx.service.create_for_list(fx.user, 999).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.get_by_list(fx.user, 999).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(fx.service.all_for_user(fx.user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_review_schedules_by_quality() {
        let fx = setup().await;
        let id = fx.service.create_for_list(fx.user, fx.list).await.unwrap().repetition.id;

        let outcome = fx.service.review(fx.user, rate(id, 4)).await.unwrap();
        assert_eq!(outcome.new_intervals, 2);
        assert_eq!(outcome.repetition.repetition.review_count, 1);
        assert_eq!(outcome.repetition.repetition.status, RepetitionStatus::Learning);

        let outcome = fx.service.review(fx.user, rate(id, 1)).await.unwrap();
        assert_eq!(outcome.new_intervals, 1);
        let outcome = fx.service.review(fx.user, rate(id, 3)).await.unwrap();
        assert_eq!(outcome.new_intervals, 1);
        assert!(!outcome.repetition.is_due);

        assert!(matches!(
            fx.service.review(fx.user, rate(id, 6)).await,
            Err(ServiceError::Validation(_))
        ));
        let other = seed_user(&fx.pool, "other@lumina.dev").await;
        assert!(matches!(
            fx.service.review(other, rate(id, 4)).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            fx.service
                .review(fx.user, ReviewWordInput { quality: 3, ..Default::default() })
                .await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_word_review_creates_a_word_record() {
        let fx = setup().await;
        let word = seed_word(&fx.pool, fx.list, "airport").await;
        let other_list = seed_list(&fx.pool, "Food", fx.user).await;

        let input = ReviewWordInput {
            vocabulary_id: Some(word),
            vocabulary_list_id: Some(fx.list),
            quality: 2,
            ..Default::default()
        };
        let outcome = fx.service.review(fx.user, input.clone()).await.unwrap();
        assert_eq!(outcome.repetition.repetition.vocabulary_id, Some(word));
        assert_eq!(outcome.repetition.repetition.vocabulary_word.as_deref(), Some("airport"));

        let again = fx.service.review(fx.user, input.clone()).await.unwrap();
        assert_eq!(again.repetition.repetition.id, outcome.repetition.repetition.id);
        assert_eq!(again.repetition.repetition.review_count, 2);

        let wrong_list = ReviewWordInput {
            vocabulary_list_id: Some(other_list),
            vocabulary_id: Some(seed_word(&fx.pool, fx.list, "gate").await),
            ..input
        };
        assert!(matches!(
            fx.service.review(fx.user, wrong_list).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            fx.service.get_by_list(fx.user, fx.list).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_quiz_results() {
        let fx = setup().await;
        assert!(fx.service.quiz_scores(fx.user, None).await.unwrap().is_empty());

        let first = fx
            .service
            .save_quiz_result(fx.user, QuizResultInput { vocabulary_list_id: fx.list, score: 7 })
            .await
            .unwrap();
        assert_eq!(first.best_score, Some(7));
        let second = fx
            .service
            .save_quiz_result(fx.user, QuizResultInput { vocabulary_list_id: fx.list, score: 5 })
            .await
            .unwrap();
        assert_eq!(second.best_score, Some(7));
        assert_eq!(second.last_score, Some(5));
        assert_eq!(second.total_attempts, 2);

        let scores = fx.service.quiz_scores(fx.user, Some(fx.list)).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].vocabulary_list_name, "Travel");
        let record = fx.service.get_by_list(fx.user, fx.list).await.unwrap();
        assert_eq!(record.repetition.status, RepetitionStatus::Learning);

        assert!(matches!(
            fx.service
                .save_quiz_result(fx.user, QuizResultInput { vocabulary_list_id: fx.list, score: -1 })
                .await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            fx.service
                .save_quiz_result(fx.user, QuizResultInput { vocabulary_list_id: 999, score: 1 })
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
