//! User note repository
//!
//! Database operations for per-section reading notes. A user has at most one
//! note per (article, section).

use crate::db::{Backend, DynDatabasePool};
use crate::models::{is_valid_id, UserNote};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User note repository trait
#[async_trait]
pub trait UserNoteRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserNote>>;

    /// The note a user left on one section, if any
    async fn find(&self, user_id: i64, article_id: i64, section_id: i64)
        -> Result<Option<UserNote>>;

    async fn exists(&self, user_id: i64, article_id: i64, section_id: i64) -> Result<bool>;

    /// Notes of one user, most recently touched first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<UserNote>>;

    /// Insert the note, or replace the content of the existing one
    async fn upsert(
        &self,
        user_id: i64,
        article_id: i64,
        section_id: i64,
        content: &str,
    ) -> Result<UserNote>;
}

/// SQLx-based user note repository implementation
pub struct SqlxUserNoteRepository {
    pool: DynDatabasePool,
}

impl SqlxUserNoteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserNoteRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_NOTE: &str = r#"
    SELECT id, user_id, article_id, section_id, note_content, created_at, updated_at
    FROM user_notes
"#;

#[async_trait]
impl UserNoteRepository for SqlxUserNoteRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserNote>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_note_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_note_by_id_mysql(pool, id).await,
        }
    }

    async fn find(
        &self,
        user_id: i64,
        article_id: i64,
        section_id: i64,
    ) -> Result<Option<UserNote>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => find_note_sqlite(pool, user_id, article_id, section_id).await,
            Backend::Mysql(pool) => find_note_mysql(pool, user_id, article_id, section_id).await,
        }
    }

    async fn exists(&self, user_id: i64, article_id: i64, section_id: i64) -> Result<bool> {
        Ok(self.find(user_id, article_id, section_id).await?.is_some())
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<UserNote>> {
        if !is_valid_id(user_id) {
            return Ok(Vec::new());
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_notes_sqlite(pool, user_id).await,
            Backend::Mysql(pool) => list_notes_mysql(pool, user_id).await,
        }
    }

    async fn upsert(
        &self,
        user_id: i64,
        article_id: i64,
        section_id: i64,
        content: &str,
    ) -> Result<UserNote> {
        let existing = self.find(user_id, article_id, section_id).await?;
        let now = Utc::now();

        if let Some(mut note) = existing {
            match self.pool.backend() {
                Backend::Sqlite(pool) => update_note_sqlite(pool, note.id, content, now).await?,
                Backend::Mysql(pool) => update_note_mysql(pool, note.id, content, now).await?,
            }
            note.note_content = content.to_string();
            note.updated_at = Some(now);
            return Ok(note);
        }

        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                insert_note_sqlite(pool, user_id, article_id, section_id, content, now).await?
            }
            Backend::Mysql(pool) => {
                insert_note_mysql(pool, user_id, article_id, section_id, content, now).await?
            }
        };
        Ok(UserNote {
            id,
            user_id,
            article_id,
            section_id,
            note_content: content.to_string(),
            created_at: now,
            updated_at: None,
        })
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_note_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<UserNote>> {
    let sql = format!("{} WHERE id = ?", SELECT_NOTE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get note by ID")?;

    Ok(row.map(|row| row_to_note_sqlite(&row)))
}

async fn find_note_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
    section_id: i64,
) -> Result<Option<UserNote>> {
    let sql = format!(
        "{} WHERE user_id = ? AND article_id = ? AND section_id = ?",
        SELECT_NOTE
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(article_id)
        .bind(section_id)
        .fetch_optional(pool)
        .await
        .context("Failed to find note")?;

    Ok(row.map(|row| row_to_note_sqlite(&row)))
}

async fn list_notes_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<UserNote>> {
    let sql = format!(
        "{} WHERE user_id = ? ORDER BY COALESCE(updated_at, created_at) DESC, id DESC",
        SELECT_NOTE
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list notes")?;

    Ok(rows.iter().map(row_to_note_sqlite).collect())
}

async fn insert_note_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
    section_id: i64,
    content: &str,
    now: chrono::DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO user_notes (user_id, article_id, section_id, note_content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .bind(section_id)
    .bind(content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create note")?;
    Ok(result.last_insert_rowid())
}

async fn update_note_sqlite(
    pool: &SqlitePool,
    id: i64,
    content: &str,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE user_notes SET note_content = ?, updated_at = ? WHERE id = ?")
        .bind(content)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update note")?;
    Ok(())
}

fn row_to_note_sqlite(row: &sqlx::sqlite::SqliteRow) -> UserNote {
    UserNote {
        id: row.get("id"),
        user_id: row.get("user_id"),
        article_id: row.get("article_id"),
        section_id: row.get("section_id"),
        note_content: row.get("note_content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_note_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<UserNote>> {
    let sql = format!("{} WHERE id = ?", SELECT_NOTE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get note by ID")?;

    Ok(row.map(|row| row_to_note_mysql(&row)))
}

async fn find_note_mysql(
    pool: &MySqlPool,
    user_id: i64,
    article_id: i64,
    section_id: i64,
) -> Result<Option<UserNote>> {
    let sql = format!(
        "{} WHERE user_id = ? AND article_id = ? AND section_id = ?",
        SELECT_NOTE
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(article_id)
        .bind(section_id)
        .fetch_optional(pool)
        .await
        .context("Failed to find note")?;

    Ok(row.map(|row| row_to_note_mysql(&row)))
}

async fn list_notes_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<UserNote>> {
    let sql = format!(
        "{} WHERE user_id = ? ORDER BY COALESCE(updated_at, created_at) DESC, id DESC",
        SELECT_NOTE
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list notes")?;

    Ok(rows.iter().map(row_to_note_mysql).collect())
}

async fn insert_note_mysql(
    pool: &MySqlPool,
    user_id: i64,
    article_id: i64,
    section_id: i64,
    content: &str,
    now: chrono::DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO user_notes (user_id, article_id, section_id, note_content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .bind(section_id)
    .bind(content)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create note")?;
    Ok(result.last_insert_id() as i64)
}

async fn update_note_mysql(
    pool: &MySqlPool,
    id: i64,
    content: &str,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE user_notes SET note_content = ?, updated_at = ? WHERE id = ?")
        .bind(content)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update note")?;
    Ok(())
}

fn row_to_note_mysql(row: &sqlx::mysql::MySqlRow) -> UserNote {
    UserNote {
        id: row.get("id"),
        user_id: row.get("user_id"),
        article_id: row.get("article_id"),
        section_id: row.get("section_id"),
        note_content: row.get("note_content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
