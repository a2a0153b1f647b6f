//! Leaderboard repository
//!
//! Seasons (`leaderboards`) and per-user season scores
//! (`user_leaderboards`).

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    is_valid_id, CreateLeaderboardInput, Leaderboard, ListParams, RankingEntry,
    UpdateLeaderboardInput, UserLeaderboard,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{like_pattern, normalize_search};

/// Leaderboard repository trait
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    async fn create(&self, input: &CreateLeaderboardInput) -> Result<Leaderboard>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Leaderboard>>;

    async fn update(&self, id: i64, input: &UpdateLeaderboardInput)
        -> Result<Option<Leaderboard>>;

    /// Hard delete; scores go with the season
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Seasons matching a keyword (name or number), latest start first
    async fn list_paged(
        &self,
        keyword: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<Leaderboard>, i64)>;

    /// The active season whose window contains `now`
    async fn get_current(&self, now: DateTime<Utc>) -> Result<Option<Leaderboard>>;

    /// Make `id` the only active season; `false` when it does not exist
    async fn set_current(&self, id: i64) -> Result<bool>;

    async fn exists_season_number(&self, season_number: i32, exclude_id: Option<i64>)
        -> Result<bool>;

    /// Whether another season's window intersects `[start, end]`.
    ///
    /// A missing bound on either side is treated as open.
    async fn has_date_overlap(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        exclude_id: Option<i64>,
    ) -> Result<bool>;

    /// Distinct users holding a score in the season
    async fn participant_count(&self, id: i64) -> Result<i64>;

    /// Top `top` participants by score, ranked from 1
    async fn ranking(&self, id: i64, top: i64) -> Result<Vec<RankingEntry>>;

    /// 1-based rank of a user; 0 when the user has no positive score
    async fn user_rank(&self, user_id: i64, id: i64) -> Result<i64>;

    /// Insert or overwrite a user's score for the season
    async fn upsert_score(&self, user_id: i64, id: i64, score: i32) -> Result<UserLeaderboard>;

    /// Add `points` to a user's season score, creating the row at `points`
    async fn add_score(&self, user_id: i64, id: i64, points: i32) -> Result<UserLeaderboard>;

    async fn get_score(&self, user_id: i64, id: i64) -> Result<Option<UserLeaderboard>>;

    /// Deactivate active seasons whose end date is before `now`; returns how many
    async fn end_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Latest-starting inactive season whose window contains `now`
    async fn find_startable(&self, now: DateTime<Utc>) -> Result<Option<Leaderboard>>;
}

/// SQLx-based leaderboard repository implementation
pub struct SqlxLeaderboardRepository {
    pool: DynDatabasePool,
}

impl SqlxLeaderboardRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LeaderboardRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_LEADERBOARD: &str = r#"
    SELECT id, season_name, season_number, start_date, end_date, is_active,
           created_at, updated_at
    FROM leaderboards
"#;

const CURRENT_FILTER: &str = r#"
    WHERE is_active = 1
      AND (start_date IS NULL OR start_date <= ?)
      AND (end_date IS NULL OR end_date >= ?)
    ORDER BY start_date DESC, id DESC
    LIMIT 1
"#;

const OVERLAP_COUNT: &str = r#"
    SELECT COUNT(*) AS count FROM leaderboards
    WHERE (? IS NULL OR id <> ?)
      AND (start_date IS NULL OR ? IS NULL OR start_date <= ?)
      AND (? IS NULL OR end_date IS NULL OR ? <= end_date)
"#;

const END_EXPIRED: &str = r#"
    UPDATE leaderboards SET is_active = 0, updated_at = ?
    WHERE is_active = 1 AND end_date IS NOT NULL AND end_date < ?
"#;

const STARTABLE_FILTER: &str = r#"
    WHERE is_active = 0
      AND start_date IS NOT NULL AND start_date <= ?
      AND (end_date IS NULL OR end_date >= ?)
    ORDER BY start_date DESC, id DESC
    LIMIT 1
"#;

const SELECT_SCORE: &str = r#"
    SELECT id, user_id, leaderboard_id, score FROM user_leaderboards
    WHERE user_id = ? AND leaderboard_id = ?
"#;

const RANKING: &str = r#"
    SELECT ul.user_id, u.full_name, u.avatar_url, ul.score
    FROM user_leaderboards ul
    INNER JOIN users u ON u.id = ul.user_id
    WHERE ul.leaderboard_id = ?
    ORDER BY ul.score DESC, ul.user_id ASC
    LIMIT ?
"#;

/// Keyword clause; the season number is matched through its text form,
/// whose cast differs per backend.
fn keyword_filter(number_as_text: &str) -> String {
    format!(
        "WHERE (? IS NULL OR LOWER(season_name) LIKE LOWER(?) ESCAPE '!' OR {} LIKE ? ESCAPE '!')",
        number_as_text
    )
}

const UPDATE_LEADERBOARD: &str = r#"
    UPDATE leaderboards SET
        season_name = CASE WHEN ? THEN ? ELSE season_name END,
        season_number = COALESCE(?, season_number),
        start_date = CASE WHEN ? THEN ? ELSE start_date END,
        end_date = CASE WHEN ? THEN ? ELSE end_date END,
        is_active = COALESCE(?, is_active),
        updated_at = ?
    WHERE id = ?
"#;

fn ranked(rows: Vec<(i64, String, Option<String>, i32)>) -> Vec<RankingEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(index, (user_id, full_name, avatar_url, score))| RankingEntry {
            rank: index as i64 + 1,
            user_id,
            full_name,
            avatar_url,
            score,
        })
        .collect()
}

#[async_trait]
impl LeaderboardRepository for SqlxLeaderboardRepository {
    async fn create(&self, input: &CreateLeaderboardInput) -> Result<Leaderboard> {
        let leaderboard = Leaderboard {
            id: 0,
            season_name: input.season_name.clone(),
            season_number: input.season_number,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: input.is_active,
            created_at: Utc::now(),
            updated_at: None,
        };
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_leaderboard_sqlite(pool, &leaderboard).await?,
            Backend::Mysql(pool) => insert_leaderboard_mysql(pool, &leaderboard).await?,
        };
        Ok(Leaderboard { id, ..leaderboard })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Leaderboard>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_leaderboard_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_leaderboard_by_id_mysql(pool, id).await,
        }
    }

    async fn update(
        &self,
        id: i64,
        input: &UpdateLeaderboardInput,
    ) -> Result<Option<Leaderboard>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => update_leaderboard_sqlite(pool, id, input).await?,
            Backend::Mysql(pool) => update_leaderboard_mysql(pool, id, input).await?,
        };
        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => delete_leaderboard_sqlite(pool, id).await?,
            Backend::Mysql(pool) => delete_leaderboard_mysql(pool, id).await?,
        };
        Ok(affected > 0)
    }

    async fn list_paged(
        &self,
        keyword: Option<&str>,
        params: &ListParams,
    ) -> Result<(Vec<Leaderboard>, i64)> {
        let pattern = normalize_search(keyword).map(|t| like_pattern(&t));
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_leaderboards_sqlite(pool, pattern.as_deref(), params).await,
            Backend::Mysql(pool) => list_leaderboards_mysql(pool, pattern.as_deref(), params).await,
        }
    }

    async fn get_current(&self, now: DateTime<Utc>) -> Result<Option<Leaderboard>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_current_sqlite(pool, now).await,
            Backend::Mysql(pool) => get_current_mysql(pool, now).await,
        }
    }

    async fn set_current(&self, id: i64) -> Result<bool> {
        if self.get_by_id(id).await?.is_none() {
            return Ok(false);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => set_current_sqlite(pool, id).await?,
            Backend::Mysql(pool) => set_current_mysql(pool, id).await?,
        }
        Ok(true)
    }

    async fn exists_season_number(
        &self,
        season_number: i32,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                count_season_number_sqlite(pool, season_number, exclude_id).await?
            }
            Backend::Mysql(pool) => {
                count_season_number_mysql(pool, season_number, exclude_id).await?
            }
        };
        Ok(count > 0)
    }

    async fn has_date_overlap(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => count_overlaps_sqlite(pool, start, end, exclude_id).await?,
            Backend::Mysql(pool) => count_overlaps_mysql(pool, start, end, exclude_id).await?,
        };
        Ok(count > 0)
    }

    async fn participant_count(&self, id: i64) -> Result<i64> {
        if !is_valid_id(id) {
            return Ok(0);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => participant_count_sqlite(pool, id).await,
            Backend::Mysql(pool) => participant_count_mysql(pool, id).await,
        }
    }

    async fn ranking(&self, id: i64, top: i64) -> Result<Vec<RankingEntry>> {
        if !is_valid_id(id) || top <= 0 {
            return Ok(Vec::new());
        }
        let rows = match self.pool.backend() {
            Backend::Sqlite(pool) => ranking_sqlite(pool, id, top).await?,
            Backend::Mysql(pool) => ranking_mysql(pool, id, top).await?,
        };
        Ok(ranked(rows))
    }

    async fn user_rank(&self, user_id: i64, id: i64) -> Result<i64> {
        if !is_valid_id(user_id) || !is_valid_id(id) {
            return Ok(0);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => user_rank_sqlite(pool, user_id, id).await,
            Backend::Mysql(pool) => user_rank_mysql(pool, user_id, id).await,
        }
    }

    async fn upsert_score(&self, user_id: i64, id: i64, score: i32) -> Result<UserLeaderboard> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => upsert_score_sqlite(pool, user_id, id, score).await,
            Backend::Mysql(pool) => upsert_score_mysql(pool, user_id, id, score).await,
        }
    }

    async fn add_score(&self, user_id: i64, id: i64, points: i32) -> Result<UserLeaderboard> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO user_leaderboards (user_id, leaderboard_id, score)
                    VALUES (?, ?, ?)
                    ON CONFLICT (user_id, leaderboard_id)
                    DO UPDATE SET score = user_leaderboards.score + excluded.score
                    "#,
                )
                .bind(user_id)
                .bind(id)
                .bind(points)
                .execute(pool)
                .await
                .context("Failed to add leaderboard points")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO user_leaderboards (user_id, leaderboard_id, score)
                    VALUES (?, ?, ?)
                    ON DUPLICATE KEY UPDATE score = score + VALUES(score)
                    "#,
                )
                .bind(user_id)
                .bind(id)
                .bind(points)
                .execute(pool)
                .await
                .context("Failed to add leaderboard points")?;
            }
        }
        self.get_score(user_id, id)
            .await?
            .context("Leaderboard score missing after update")
    }

    async fn get_score(&self, user_id: i64, id: i64) -> Result<Option<UserLeaderboard>> {
        if !is_valid_id(user_id) || !is_valid_id(id) {
            return Ok(None);
        }
        let score = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query_as::<_, (i64, i64, i64, i32)>(SELECT_SCORE)
                .bind(user_id)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get leaderboard score")?,
            Backend::Mysql(pool) => sqlx::query_as::<_, (i64, i64, i64, i32)>(SELECT_SCORE)
                .bind(user_id)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get leaderboard score")?,
        };
        Ok(score.map(|(id, user_id, leaderboard_id, score)| UserLeaderboard {
            id,
            user_id,
            leaderboard_id,
            score,
        }))
    }

    async fn end_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(END_EXPIRED)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to end expired seasons")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(END_EXPIRED)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to end expired seasons")?
                .rows_affected(),
        };
        Ok(result)
    }

    async fn find_startable(&self, now: DateTime<Utc>) -> Result<Option<Leaderboard>> {
        let sql = format!("{} {}", SELECT_LEADERBOARD, STARTABLE_FILTER);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(now)
                    .bind(now)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to find startable season")?;
                Ok(row.map(|row| row_to_leaderboard_sqlite(&row)))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(now)
                    .bind(now)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to find startable season")?;
                Ok(row.map(|row| row_to_leaderboard_mysql(&row)))
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_leaderboard_sqlite(pool: &SqlitePool, lb: &Leaderboard) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO leaderboards (season_name, season_number, start_date, end_date, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lb.season_name)
    .bind(lb.season_number)
    .bind(lb.start_date)
    .bind(lb.end_date)
    .bind(lb.is_active)
    .bind(lb.created_at)
    .execute(pool)
    .await
    .context("Failed to create leaderboard")?;
    Ok(result.last_insert_rowid())
}

async fn get_leaderboard_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Leaderboard>> {
    let sql = format!("{} WHERE id = ?", SELECT_LEADERBOARD);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get leaderboard by ID")?;

    Ok(row.map(|row| row_to_leaderboard_sqlite(&row)))
}

async fn update_leaderboard_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &UpdateLeaderboardInput,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_LEADERBOARD)
        .bind(input.season_name.is_some())
        .bind(input.season_name.clone().flatten())
        .bind(input.season_number)
        .bind(input.start_date.is_some())
        .bind(input.start_date.flatten())
        .bind(input.end_date.is_some())
        .bind(input.end_date.flatten())
        .bind(input.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update leaderboard")?;
    Ok(result.rows_affected())
}

async fn delete_leaderboard_sqlite(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM leaderboards WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete leaderboard")?;
    Ok(result.rows_affected())
}

async fn list_leaderboards_sqlite(
    pool: &SqlitePool,
    pattern: Option<&str>,
    params: &ListParams,
) -> Result<(Vec<Leaderboard>, i64)> {
    let filter = keyword_filter("CAST(season_number AS TEXT)");

    let count_sql = format!("SELECT COUNT(*) AS count FROM leaderboards {}", filter);
    let total: i64 = sqlx::query(&count_sql)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count leaderboards")?
        .get("count");

    let sql = format!(
        "{} {} ORDER BY start_date DESC, id DESC LIMIT ? OFFSET ?",
        SELECT_LEADERBOARD, filter
    );
    let rows = sqlx::query(&sql)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list leaderboards")?;

    Ok((rows.iter().map(row_to_leaderboard_sqlite).collect(), total))
}

async fn get_current_sqlite(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Option<Leaderboard>> {
    let sql = format!("{} {}", SELECT_LEADERBOARD, CURRENT_FILTER);
    let row = sqlx::query(&sql)
        .bind(now)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("Failed to get current leaderboard")?;

    Ok(row.map(|row| row_to_leaderboard_sqlite(&row)))
}

async fn set_current_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE leaderboards SET is_active = CASE WHEN id = ? THEN 1 ELSE 0 END, updated_at = ?",
    )
    .bind(id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to set current leaderboard")?;
    Ok(())
}

async fn count_season_number_sqlite(
    pool: &SqlitePool,
    season_number: i32,
    exclude_id: Option<i64>,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM leaderboards WHERE season_number = ? AND (? IS NULL OR id <> ?)",
    )
    .bind(season_number)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
    .context("Failed to check season number")?;
    Ok(row.get("count"))
}

async fn count_overlaps_sqlite(
    pool: &SqlitePool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    exclude_id: Option<i64>,
) -> Result<i64> {
    let row = sqlx::query(OVERLAP_COUNT)
        .bind(exclude_id)
        .bind(exclude_id)
        .bind(end)
        .bind(end)
        .bind(start)
        .bind(start)
        .fetch_one(pool)
        .await
        .context("Failed to check leaderboard overlap")?;
    Ok(row.get("count"))
}

async fn participant_count_sqlite(pool: &SqlitePool, id: i64) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(DISTINCT user_id) AS count FROM user_leaderboards WHERE leaderboard_id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .context("Failed to count participants")?;
    Ok(row.get("count"))
}

async fn ranking_sqlite(
    pool: &SqlitePool,
    id: i64,
    top: i64,
) -> Result<Vec<(i64, String, Option<String>, i32)>> {
    let rows = sqlx::query(RANKING)
        .bind(id)
        .bind(top)
        .fetch_all(pool)
        .await
        .context("Failed to load ranking")?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("user_id"),
                row.get("full_name"),
                row.get("avatar_url"),
                row.get("score"),
            )
        })
        .collect())
}

async fn user_rank_sqlite(pool: &SqlitePool, user_id: i64, id: i64) -> Result<i64> {
    let score: Option<i32> = sqlx::query(
        "SELECT score FROM user_leaderboards WHERE user_id = ? AND leaderboard_id = ?",
    )
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user score")?
    .map(|row| row.get("score"));

    let Some(score) = score.filter(|s| *s > 0) else {
        return Ok(0);
    };

    let ahead: i64 = sqlx::query(
        "SELECT COUNT(*) AS count FROM user_leaderboards WHERE leaderboard_id = ? AND score > ?",
    )
    .bind(id)
    .bind(score)
    .fetch_one(pool)
    .await
    .context("Failed to compute user rank")?
    .get("count");

    Ok(ahead + 1)
}

async fn upsert_score_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    id: i64,
    score: i32,
) -> Result<UserLeaderboard> {
    let row = sqlx::query(
        r#"
        INSERT INTO user_leaderboards (user_id, leaderboard_id, score)
        VALUES (?, ?, ?)
        ON CONFLICT (user_id, leaderboard_id) DO UPDATE SET score = excluded.score
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(id)
    .bind(score)
    .fetch_one(pool)
    .await
    .context("Failed to save leaderboard score")?;

    Ok(UserLeaderboard {
        id: row.get("id"),
        user_id,
        leaderboard_id: id,
        score,
    })
}

fn row_to_leaderboard_sqlite(row: &sqlx::sqlite::SqliteRow) -> Leaderboard {
    Leaderboard {
        id: row.get("id"),
        season_name: row.get("season_name"),
        season_number: row.get("season_number"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_leaderboard_mysql(pool: &MySqlPool, lb: &Leaderboard) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO leaderboards (season_name, season_number, start_date, end_date, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lb.season_name)
    .bind(lb.season_number)
    .bind(lb.start_date)
    .bind(lb.end_date)
    .bind(lb.is_active)
    .bind(lb.created_at)
    .execute(pool)
    .await
    .context("Failed to create leaderboard")?;
    Ok(result.last_insert_id() as i64)
}

async fn get_leaderboard_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Leaderboard>> {
    let sql = format!("{} WHERE id = ?", SELECT_LEADERBOARD);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get leaderboard by ID")?;

    Ok(row.map(|row| row_to_leaderboard_mysql(&row)))
}

async fn update_leaderboard_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &UpdateLeaderboardInput,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_LEADERBOARD)
        .bind(input.season_name.is_some())
        .bind(input.season_name.clone().flatten())
        .bind(input.season_number)
        .bind(input.start_date.is_some())
        .bind(input.start_date.flatten())
        .bind(input.end_date.is_some())
        .bind(input.end_date.flatten())
        .bind(input.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update leaderboard")?;
    Ok(result.rows_affected())
}

async fn delete_leaderboard_mysql(pool: &MySqlPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM leaderboards WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete leaderboard")?;
    Ok(result.rows_affected())
}

async fn list_leaderboards_mysql(
    pool: &MySqlPool,
    pattern: Option<&str>,
    params: &ListParams,
) -> Result<(Vec<Leaderboard>, i64)> {
    let filter = keyword_filter("CAST(season_number AS CHAR)");

    let count_sql = format!("SELECT COUNT(*) AS count FROM leaderboards {}", filter);
    let total: i64 = sqlx::query(&count_sql)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count leaderboards")?
        .get("count");

    let sql = format!(
        "{} {} ORDER BY start_date DESC, id DESC LIMIT ? OFFSET ?",
        SELECT_LEADERBOARD, filter
    );
    let rows = sqlx::query(&sql)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list leaderboards")?;

    Ok((rows.iter().map(row_to_leaderboard_mysql).collect(), total))
}

async fn get_current_mysql(pool: &MySqlPool, now: DateTime<Utc>) -> Result<Option<Leaderboard>> {
    let sql = format!("{} {}", SELECT_LEADERBOARD, CURRENT_FILTER);
    let row = sqlx::query(&sql)
        .bind(now)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("Failed to get current leaderboard")?;

    Ok(row.map(|row| row_to_leaderboard_mysql(&row)))
}

async fn set_current_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE leaderboards SET is_active = CASE WHEN id = ? THEN 1 ELSE 0 END, updated_at = ?",
    )
    .bind(id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to set current leaderboard")?;
    Ok(())
}

async fn count_season_number_mysql(
    pool: &MySqlPool,
    season_number: i32,
    exclude_id: Option<i64>,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM leaderboards WHERE season_number = ? AND (? IS NULL OR id <> ?)",
    )
    .bind(season_number)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
    .context("Failed to check season number")?;
    Ok(row.get("count"))
}

async fn count_overlaps_mysql(
    pool: &MySqlPool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    exclude_id: Option<i64>,
) -> Result<i64> {
    let row = sqlx::query(OVERLAP_COUNT)
        .bind(exclude_id)
        .bind(exclude_id)
        .bind(end)
        .bind(end)
        .bind(start)
        .bind(start)
        .fetch_one(pool)
        .await
        .context("Failed to check leaderboard overlap")?;
    Ok(row.get("count"))
}

async fn participant_count_mysql(pool: &MySqlPool, id: i64) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(DISTINCT user_id) AS count FROM user_leaderboards WHERE leaderboard_id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .context("Failed to count participants")?;
    Ok(row.get("count"))
}

async fn ranking_mysql(
    pool: &MySqlPool,
    id: i64,
    top: i64,
) -> Result<Vec<(i64, String, Option<String>, i32)>> {
    let rows = sqlx::query(RANKING)
        .bind(id)
        .bind(top)
        .fetch_all(pool)
        .await
        .context("Failed to load ranking")?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get("user_id"),
                row.get("full_name"),
                row.get("avatar_url"),
                row.get("score"),
            )
        })
        .collect())
}

async fn user_rank_mysql(pool: &MySqlPool, user_id: i64, id: i64) -> Result<i64> {
    let score: Option<i32> = sqlx::query(
        "SELECT score FROM user_leaderboards WHERE user_id = ? AND leaderboard_id = ?",
    )
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user score")?
    .map(|row| row.get("score"));

    let Some(score) = score.filter(|s| *s > 0) else {
        return Ok(0);
    };

    let ahead: i64 = sqlx::query(
        "SELECT COUNT(*) AS count FROM user_leaderboards WHERE leaderboard_id = ? AND score > ?",
    )
    .bind(id)
    .bind(score)
    .fetch_one(pool)
    .await
    .context("Failed to compute user rank")?
    .get("count");

    Ok(ahead + 1)
}

async fn upsert_score_mysql(
    pool: &MySqlPool,
    user_id: i64,
    id: i64,
    score: i32,
) -> Result<UserLeaderboard> {
    sqlx::query(
        r#"
        INSERT INTO user_leaderboards (user_id, leaderboard_id, score)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE score = VALUES(score)
        "#,
    )
    .bind(user_id)
    .bind(id)
    .bind(score)
    .execute(pool)
    .await
    .context("Failed to save leaderboard score")?;

    let row = sqlx::query(
        "SELECT id FROM user_leaderboards WHERE user_id = ? AND leaderboard_id = ?",
    )
    .bind(user_id)
    .bind(id)
    .fetch_one(pool)
    .await
    .context("Failed to load leaderboard score")?;

    Ok(UserLeaderboard {
        id: row.get("id"),
        user_id,
        leaderboard_id: id,
        score,
    })
}

fn row_to_leaderboard_mysql(row: &sqlx::mysql::MySqlRow) -> Leaderboard {
    Leaderboard {
        id: row.get("id"),
        season_name: row.get("season_name"),
        season_number: row.get("season_number"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
