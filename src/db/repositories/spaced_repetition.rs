//! Spaced repetition repository
//!
//! Database operations for `user_spaced_repetitions`. Reads join the
//! vocabulary list name and, for word-level records, the word itself.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{is_valid_id, RepetitionStatus, Schedule, SpacedRepetition};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Spaced repetition repository trait
#[async_trait]
pub trait SpacedRepetitionRepository: Send + Sync {
    /// Insert a record and return it with its joined display names
    async fn create(&self, repetition: &SpacedRepetition) -> Result<SpacedRepetition>;

    async fn get_by_id(&self, id: i64) -> Result<Option<SpacedRepetition>>;

    /// The list-level record of a user for one vocabulary list
    async fn get_by_user_and_list(&self, user_id: i64, list_id: i64) -> Result<Option<SpacedRepetition>>;

    /// The word-level record of a user for one vocabulary
    async fn get_by_user_and_word(&self, user_id: i64, vocabulary_id: i64) -> Result<Option<SpacedRepetition>>;

    /// Every record of a user, latest review date first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<SpacedRepetition>>;

    /// Records due at `now` that are still at the one-day interval after at
    /// least one review, earliest first
    async fn list_due(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<SpacedRepetition>>;

    /// Store a review outcome and bump the review count
    async fn save_review(
        &self,
        id: i64,
        schedule: Schedule,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Option<SpacedRepetition>>;

    /// Record a quiz score on a record, keeping the best score
    async fn record_quiz(&self, id: i64, score: i32, now: DateTime<Utc>) -> Result<Option<SpacedRepetition>>;
}

/// SQLx-based spaced repetition repository implementation
pub struct SqlxSpacedRepetitionRepository {
    pool: DynDatabasePool,
}

impl SqlxSpacedRepetitionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SpacedRepetitionRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_REPETITION: &str = r#"
    SELECT r.id, r.user_id, r.vocabulary_list_id, r.vocabulary_id, r.last_reviewed_at,
           r.next_review_at, r.review_count, r.intervals, r.status, r.best_quiz_score,
           r.last_quiz_score, r.last_quiz_completed_at, r.total_quiz_attempts,
           COALESCE(l.name, 'Unknown') AS vocabulary_list_name,
           v.word AS vocabulary_word
    FROM user_spaced_repetitions r
    LEFT JOIN vocabulary_lists l ON l.id = r.vocabulary_list_id
    LEFT JOIN vocabularies v ON v.id = r.vocabulary_id
"#;

const INSERT_REPETITION: &str = r#"
    INSERT INTO user_spaced_repetitions
        (user_id, vocabulary_list_id, vocabulary_id, last_reviewed_at, next_review_at,
         review_count, intervals, status, total_quiz_attempts)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SAVE_REVIEW: &str = r#"
    UPDATE user_spaced_repetitions SET
        last_reviewed_at = ?,
        next_review_at = ?,
        review_count = review_count + 1,
        intervals = ?,
        status = ?
    WHERE id = ?
"#;

const RECORD_QUIZ: &str = r#"
    UPDATE user_spaced_repetitions SET
        best_quiz_score = CASE WHEN best_quiz_score IS NULL OR ? > best_quiz_score
                               THEN ? ELSE best_quiz_score END,
        last_quiz_score = ?,
        last_quiz_completed_at = ?,
        total_quiz_attempts = total_quiz_attempts + 1,
        status = CASE WHEN intervals >= 30 THEN 'Mastered' ELSE 'Learning' END
    WHERE id = ?
"#;

#[async_trait]
impl SpacedRepetitionRepository for SqlxSpacedRepetitionRepository {
    async fn create(&self, repetition: &SpacedRepetition) -> Result<SpacedRepetition> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_repetition_sqlite(pool, repetition).await?,
            Backend::Mysql(pool) => insert_repetition_mysql(pool, repetition).await?,
        };
        self.get_by_id(id)
            .await?
            .context("Spaced repetition missing after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SpacedRepetition>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let sql = format!("{} WHERE r.id = ?", SELECT_REPETITION);
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_one_sqlite(pool, &sql, &[id]).await,
            Backend::Mysql(pool) => fetch_one_mysql(pool, &sql, &[id]).await,
        }
    }

    async fn get_by_user_and_list(&self, user_id: i64, list_id: i64) -> Result<Option<SpacedRepetition>> {
        let sql = format!(
            "{} WHERE r.user_id = ? AND r.vocabulary_list_id = ? AND r.vocabulary_id IS NULL ORDER BY r.id LIMIT 1",
            SELECT_REPETITION
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_one_sqlite(pool, &sql, &[user_id, list_id]).await,
            Backend::Mysql(pool) => fetch_one_mysql(pool, &sql, &[user_id, list_id]).await,
        }
    }

    async fn get_by_user_and_word(&self, user_id: i64, vocabulary_id: i64) -> Result<Option<SpacedRepetition>> {
        let sql = format!(
            "{} WHERE r.user_id = ? AND r.vocabulary_id = ? ORDER BY r.id LIMIT 1",
            SELECT_REPETITION
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_one_sqlite(pool, &sql, &[user_id, vocabulary_id]).await,
            Backend::Mysql(pool) => fetch_one_mysql(pool, &sql, &[user_id, vocabulary_id]).await,
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<SpacedRepetition>> {
        let sql = format!(
            "{} WHERE r.user_id = ? ORDER BY r.next_review_at DESC, r.id DESC",
            SELECT_REPETITION
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_all_sqlite(pool, &sql, user_id, None).await,
            Backend::Mysql(pool) => fetch_all_mysql(pool, &sql, user_id, None).await,
        }
    }

    async fn list_due(&self, user_id: i64, now: DateTime<Utc>) -> Result<Vec<SpacedRepetition>> {
        let sql = format!(
            r#"{} WHERE r.user_id = ?
                  AND r.next_review_at IS NOT NULL AND r.next_review_at <= ?
                  AND r.status IN ('New', 'Learning')
                  AND r.review_count > 0
                  AND r.intervals = 1
                ORDER BY r.next_review_at, r.id"#,
            SELECT_REPETITION
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_all_sqlite(pool, &sql, user_id, Some(now)).await,
            Backend::Mysql(pool) => fetch_all_mysql(pool, &sql, user_id, Some(now)).await,
        }
    }

    async fn save_review(
        &self,
        id: i64,
        schedule: Schedule,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Option<SpacedRepetition>> {
        let next_review_at = reviewed_at + chrono::Duration::days(i64::from(schedule.intervals));
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SAVE_REVIEW)
                .bind(reviewed_at)
                .bind(next_review_at)
                .bind(schedule.intervals)
                .bind(schedule.status.as_str())
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to save review")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(SAVE_REVIEW)
                .bind(reviewed_at)
                .bind(next_review_at)
                .bind(schedule.intervals)
                .bind(schedule.status.as_str())
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to save review")?
                .rows_affected(),
        };
        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn record_quiz(&self, id: i64, score: i32, now: DateTime<Utc>) -> Result<Option<SpacedRepetition>> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(RECORD_QUIZ)
                .bind(score)
                .bind(score)
                .bind(score)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record quiz result")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(RECORD_QUIZ)
                .bind(score)
                .bind(score)
                .bind(score)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to record quiz result")?
                .rows_affected(),
        };
        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }
}

fn parse_status(raw: &str) -> Result<RepetitionStatus> {
    RepetitionStatus::parse(raw).with_context(|| format!("Unknown repetition status: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_repetition_sqlite(pool: &SqlitePool, r: &SpacedRepetition) -> Result<i64> {
    let result = sqlx::query(INSERT_REPETITION)
        .bind(r.user_id)
        .bind(r.vocabulary_list_id)
        .bind(r.vocabulary_id)
        .bind(r.last_reviewed_at)
        .bind(r.next_review_at)
        .bind(r.review_count)
        .bind(r.intervals)
        .bind(r.status.as_str())
        .bind(r.total_quiz_attempts)
        .execute(pool)
        .await
        .context("Failed to create spaced repetition")?;
    Ok(result.last_insert_rowid())
}

async fn fetch_one_sqlite(pool: &SqlitePool, sql: &str, binds: &[i64]) -> Result<Option<SpacedRepetition>> {
    let mut query = sqlx::query(sql);
    for value in binds {
        query = query.bind(*value);
    }
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get spaced repetition")?;
    row.as_ref().map(row_to_repetition_sqlite).transpose()
}

async fn fetch_all_sqlite(
    pool: &SqlitePool,
    sql: &str,
    user_id: i64,
    now: Option<DateTime<Utc>>,
) -> Result<Vec<SpacedRepetition>> {
    let mut query = sqlx::query(sql).bind(user_id);
    if let Some(now) = now {
        query = query.bind(now);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list spaced repetitions")?;
    rows.iter().map(row_to_repetition_sqlite).collect()
}

fn row_to_repetition_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<SpacedRepetition> {
    let status: String = row.get("status");
    Ok(SpacedRepetition {
        id: row.get("id"),
        user_id: row.get("user_id"),
        vocabulary_list_id: row.get("vocabulary_list_id"),
        vocabulary_id: row.get("vocabulary_id"),
        vocabulary_list_name: row.get("vocabulary_list_name"),
        vocabulary_word: row.get("vocabulary_word"),
        last_reviewed_at: row.get("last_reviewed_at"),
        next_review_at: row.get("next_review_at"),
        review_count: row.get("review_count"),
        intervals: row.get("intervals"),
        status: parse_status(&status)?,
        best_quiz_score: row.get("best_quiz_score"),
        last_quiz_score: row.get("last_quiz_score"),
        last_quiz_completed_at: row.get("last_quiz_completed_at"),
        total_quiz_attempts: row.get("total_quiz_attempts"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_repetition_mysql(pool: &MySqlPool, r: &SpacedRepetition) -> Result<i64> {
    let result = sqlx::query(INSERT_REPETITION)
        .bind(r.user_id)
        .bind(r.vocabulary_list_id)
        .bind(r.vocabulary_id)
        .bind(r.last_reviewed_at)
        .bind(r.next_review_at)
        .bind(r.review_count)
        .bind(r.intervals)
        .bind(r.status.as_str())
        .bind(r.total_quiz_attempts)
        .execute(pool)
        .await
        .context("Failed to create spaced repetition")?;
    Ok(result.last_insert_id() as i64)
}

async fn fetch_one_mysql(pool: &MySqlPool, sql: &str, binds: &[i64]) -> Result<Option<SpacedRepetition>> {
    let mut query = sqlx::query(sql);
    for value in binds {
        query = query.bind(*value);
    }
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get spaced repetition")?;
    row.as_ref().map(row_to_repetition_mysql).transpose()
}

async fn fetch_all_mysql(
    pool: &MySqlPool,
    sql: &str,
    user_id: i64,
    now: Option<DateTime<Utc>>,
) -> Result<Vec<SpacedRepetition>> {
    let mut query = sqlx::query(sql).bind(user_id);
    if let Some(now) = now {
        query = query.bind(now);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list spaced repetitions")?;
    rows.iter().map(row_to_repetition_mysql).collect()
}

fn row_to_repetition_mysql(row: &sqlx::mysql::MySqlRow) -> Result<SpacedRepetition> {
    let status: String = row.get("status");
    Ok(SpacedRepetition {
        id: row.get("id"),
        user_id: row.get("user_id"),
        vocabulary_list_id: row.get("vocabulary_list_id"),
        vocabulary_id: row.get("vocabulary_id"),
        vocabulary_list_name: row.get("vocabulary_list_name"),
        vocabulary_word: row.get("vocabulary_word"),
        last_reviewed_at: row.get("last_reviewed_at"),
        next_review_at: row.get("next_review_at"),
        review_count: row.get("review_count"),
        intervals: row.get("intervals"),
        status: parse_status(&status)?,
        best_quiz_score: row.get("best_quiz_score"),
        last_quiz_score: row.get("last_quiz_score"),
        last_quiz_completed_at: row.get("last_quiz_completed_at"),
        total_quiz_attempts: row.get("total_quiz_attempts"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_list, seed_user, seed_word, test_pool};
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_joins_display_names() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "learner@lumina.dev").await;
        let list = seed_list(&pool, "Travel", user).await;
        let word = seed_word(&pool, list, "airport").await;
        let repo = SqlxSpacedRepetitionRepository::new(pool);
        let now = Utc::now();

        let list_record = repo
            .create(&SpacedRepetition::fresh(user, list, None, now))
            .await
            .unwrap();
        assert!(list_record.id > 0);
        assert_eq!(list_record.vocabulary_list_name, "Travel");
        assert_eq!(list_record.vocabulary_word, None);

        let word_record = repo
            .create(&SpacedRepetition::fresh(user, list, Some(word), now))
            .await
            .unwrap();
        assert_eq!(word_record.vocabulary_word.as_deref(), Some("airport"));

        let by_list = repo.get_by_user_and_list(user, list).await.unwrap().unwrap();
        assert_eq!(by_list.id, list_record.id);
        let by_word = repo.get_by_user_and_word(user, word).await.unwrap().unwrap();
        assert_eq!(by_word.id, word_record.id);
        assert_eq!(repo.list_by_user(user).await.unwrap().len(), 2);
        assert!(repo.get_by_id(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_due_only_returns_struggling_reviewed_records() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "learner@lumina.dev").await;
        let list = seed_list(&pool, "Travel", user).await;
        let word = seed_word(&pool, list, "airport").await;
        let repo = SqlxSpacedRepetitionRepository::new(pool);
        let past = Utc::now() - Duration::days(3);

        repo.create(&SpacedRepetition::fresh(user, list, None, past)).await.unwrap();
        let struggling = repo
            .create(&SpacedRepetition::fresh(user, list, Some(word), past))
            .await
            .unwrap();
        let failed = Schedule {
            intervals: 1,
            status: RepetitionStatus::Learning,
        };
        repo.save_review(struggling.id, failed, past).await.unwrap().unwrap();

        let due = repo.list_due(user, Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, struggling.id);
        assert_eq!(due[0].review_count, 1);

        let learned = Schedule {
            intervals: 6,
            status: RepetitionStatus::Learning,
        };
        repo.save_review(struggling.id, learned, past).await.unwrap();
        assert!(repo.list_due(user, Utc::now()).await.unwrap().is_empty());
        assert!(repo.save_review(999, learned, past).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_quiz_keeps_best_score() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "learner@lumina.dev").await;
        let list = seed_list(&pool, "Travel", user).await;
        let repo = SqlxSpacedRepetitionRepository::new(pool);
        let record = repo
            .create(&SpacedRepetition::fresh(user, list, None, Utc::now()))
            .await
            .unwrap();

        repo.record_quiz(record.id, 80, Utc::now()).await.unwrap();
        let after = repo.record_quiz(record.id, 60, Utc::now()).await.unwrap().unwrap();
        assert_eq!(after.best_quiz_score, Some(80));
        assert_eq!(after.last_quiz_score, Some(60));
        assert_eq!(after.total_quiz_attempts, 2);
        assert_eq!(after.status, RepetitionStatus::Learning);
        assert!(after.last_quiz_completed_at.is_some());
        assert!(repo.record_quiz(999, 10, Utc::now()).await.unwrap().is_none());
    }
}
