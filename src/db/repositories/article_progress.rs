//! Article progress repository
//!
//! One row per (user, article) holding how far the user has read.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{is_valid_id, ArticleProgress, ProgressStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article progress repository trait
#[async_trait]
pub trait ArticleProgressRepository: Send + Sync {
    /// Insert or overwrite the progress row for a user and article.
    ///
    /// `completed_at` keeps its first value while the status stays
    /// `Completed` and is cleared otherwise.
    async fn upsert(
        &self,
        user_id: i64,
        article_id: i64,
        progress_percent: i32,
        status: ProgressStatus,
        now: DateTime<Utc>,
    ) -> Result<ArticleProgress>;

    /// Progress rows of a user for the given articles; unknown ids are skipped
    async fn list_for_articles(&self, user_id: i64, article_ids: &[i64]) -> Result<Vec<ArticleProgress>>;
}

pub struct SqlxArticleProgressRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleProgressRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleProgressRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_PROGRESS: &str = r#"
    SELECT user_id, article_id, progress_percent, status, last_accessed_at, completed_at
    FROM user_article_progress
"#;

const UPSERT_PROGRESS_SQLITE: &str = r#"
    INSERT INTO user_article_progress
        (user_id, article_id, progress_percent, status, last_accessed_at, completed_at)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT (user_id, article_id) DO UPDATE SET
        progress_percent = excluded.progress_percent,
        status = excluded.status,
        last_accessed_at = excluded.last_accessed_at,
        completed_at = CASE WHEN excluded.status = 'completed'
                            THEN COALESCE(user_article_progress.completed_at, excluded.completed_at)
                            ELSE NULL END
"#;

const UPSERT_PROGRESS_MYSQL: &str = r#"
    INSERT INTO user_article_progress
        (user_id, article_id, progress_percent, status, last_accessed_at, completed_at)
    VALUES (?, ?, ?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        completed_at = CASE WHEN VALUES(status) = 'completed'
                            THEN COALESCE(completed_at, VALUES(completed_at))
                            ELSE NULL END,
        progress_percent = VALUES(progress_percent),
        status = VALUES(status),
        last_accessed_at = VALUES(last_accessed_at)
"#;

fn select_for_articles(count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!(
        "{} WHERE user_id = ? AND article_id IN ({}) ORDER BY article_id",
        SELECT_PROGRESS, placeholders
    )
}

fn parse_status(raw: &str) -> Result<ProgressStatus> {
    ProgressStatus::parse(raw).with_context(|| format!("Unknown progress status: {}", raw))
}

#[async_trait]
impl ArticleProgressRepository for SqlxArticleProgressRepository {
    async fn upsert(
        &self,
        user_id: i64,
        article_id: i64,
        progress_percent: i32,
        status: ProgressStatus,
        now: DateTime<Utc>,
    ) -> Result<ArticleProgress> {
        let completed_at = (status == ProgressStatus::Completed).then_some(now);
        let select = format!("{} WHERE user_id = ? AND article_id = ?", SELECT_PROGRESS);

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(UPSERT_PROGRESS_SQLITE)
                    .bind(user_id)
                    .bind(article_id)
                    .bind(progress_percent)
                    .bind(status.as_str())
                    .bind(now)
                    .bind(completed_at)
                    .execute(pool)
                    .await
                    .context("Failed to save article progress")?;
                let row = sqlx::query(&select)
                    .bind(user_id)
                    .bind(article_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to reload article progress")?;
                row_to_progress_sqlite(&row)
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPSERT_PROGRESS_MYSQL)
                    .bind(user_id)
                    .bind(article_id)
                    .bind(progress_percent)
                    .bind(status.as_str())
                    .bind(now)
                    .bind(completed_at)
                    .execute(pool)
                    .await
                    .context("Failed to save article progress")?;
                let row = sqlx::query(&select)
                    .bind(user_id)
                    .bind(article_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to reload article progress")?;
                row_to_progress_mysql(&row)
            }
        }
    }

    async fn list_for_articles(&self, user_id: i64, article_ids: &[i64]) -> Result<Vec<ArticleProgress>> {
        let ids: Vec<i64> = article_ids.iter().copied().filter(|id| is_valid_id(*id)).collect();
        if !is_valid_id(user_id) || ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = select_for_articles(ids.len());

        match self.pool.backend() {
            Backend::Sqlite(pool) => list_for_articles_sqlite(pool, &sql, user_id, &ids).await,
            Backend::Mysql(pool) => list_for_articles_mysql(pool, &sql, user_id, &ids).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_for_articles_sqlite(
    pool: &SqlitePool,
    sql: &str,
    user_id: i64,
    ids: &[i64],
) -> Result<Vec<ArticleProgress>> {
    let mut query = sqlx::query(sql).bind(user_id);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list article progress")?;
    rows.iter().map(row_to_progress_sqlite).collect()
}

fn row_to_progress_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ArticleProgress> {
    let status: String = row.get("status");
    Ok(ArticleProgress {
        article_id: row.get("article_id"),
        user_id: row.get("user_id"),
        progress_percent: row.get("progress_percent"),
        status: parse_status(&status)?,
        last_accessed_at: row.get("last_accessed_at"),
        completed_at: row.get("completed_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_for_articles_mysql(
    pool: &MySqlPool,
    sql: &str,
    user_id: i64,
    ids: &[i64],
) -> Result<Vec<ArticleProgress>> {
    let mut query = sqlx::query(sql).bind(user_id);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list article progress")?;
    rows.iter().map(row_to_progress_mysql).collect()
}

fn row_to_progress_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ArticleProgress> {
    let status: String = row.get("status");
    Ok(ArticleProgress {
        article_id: row.get("article_id"),
        user_id: row.get("user_id"),
        progress_percent: row.get("progress_percent"),
        status: parse_status(&status)?,
        last_accessed_at: row.get("last_accessed_at"),
        completed_at: row.get("completed_at"),
    })
}
