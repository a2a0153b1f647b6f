//! Slide repository
//!
//! Database operations for home-page slides.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{is_valid_id, CreateSlideInput, Slide, UpdateSlideInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{like_pattern, normalize_search};

/// Slide repository trait
#[async_trait]
pub trait SlideRepository: Send + Sync {
    async fn create(&self, input: &CreateSlideInput, created_by: i64) -> Result<Slide>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Slide>>;

    /// Apply an update command; `None` when the slide is missing
    async fn update(&self, id: i64, input: &UpdateSlideInput) -> Result<Option<Slide>>;

    /// Hard delete; `false` when the slide did not exist
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Slides matching a keyword (name or url) and activity flag, newest first
    async fn list(&self, keyword: Option<&str>, is_active: Option<bool>) -> Result<Vec<Slide>>;
}

/// SQLx-based slide repository implementation
pub struct SqlxSlideRepository {
    pool: DynDatabasePool,
}

impl SqlxSlideRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SlideRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_SLIDE: &str = r#"
    SELECT id, slide_name, slide_url, is_active, created_at, updated_at, created_by
    FROM slides
"#;

const LIST_SLIDES: &str = r#"
    SELECT id, slide_name, slide_url, is_active, created_at, updated_at, created_by
    FROM slides
    WHERE (? IS NULL OR LOWER(slide_name) LIKE LOWER(?) ESCAPE '!' OR LOWER(slide_url) LIKE LOWER(?) ESCAPE '!')
      AND (? IS NULL OR is_active = ?)
    ORDER BY created_at DESC, id DESC
"#;

const UPDATE_SLIDE: &str = r#"
    UPDATE slides SET
        slide_name = COALESCE(?, slide_name),
        slide_url = COALESCE(?, slide_url),
        is_active = COALESCE(?, is_active),
        updated_at = ?
    WHERE id = ?
"#;

#[async_trait]
impl SlideRepository for SqlxSlideRepository {
    async fn create(&self, input: &CreateSlideInput, created_by: i64) -> Result<Slide> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_slide_sqlite(pool, input, created_by).await,
            Backend::Mysql(pool) => create_slide_mysql(pool, input, created_by).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Slide>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_slide_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_slide_by_id_mysql(pool, id).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateSlideInput) -> Result<Option<Slide>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => update_slide_sqlite(pool, id, input).await?,
            Backend::Mysql(pool) => update_slide_mysql(pool, id, input).await?,
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
            Backend::Sqlite(pool) => delete_slide_sqlite(pool, id).await?,
            Backend::Mysql(pool) => delete_slide_mysql(pool, id).await?,
        };
        Ok(affected > 0)
    }

    async fn list(&self, keyword: Option<&str>, is_active: Option<bool>) -> Result<Vec<Slide>> {
        let pattern = normalize_search(keyword).map(|t| like_pattern(&t));
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_slides_sqlite(pool, pattern.as_deref(), is_active).await,
            Backend::Mysql(pool) => list_slides_mysql(pool, pattern.as_deref(), is_active).await,
        }
    }
}

fn slide_from_input(input: &CreateSlideInput, created_by: i64) -> Slide {
    Slide {
        id: 0,
        slide_name: input.slide_name.clone(),
        slide_url: input.slide_url.clone(),
        is_active: input.is_active,
        created_at: Utc::now(),
        updated_at: None,
        created_by,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_slide_sqlite(
    pool: &SqlitePool,
    input: &CreateSlideInput,
    created_by: i64,
) -> Result<Slide> {
    let slide = slide_from_input(input, created_by);

    let result = sqlx::query(
        r#"
        INSERT INTO slides (slide_name, slide_url, is_active, created_at, created_by)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&slide.slide_name)
    .bind(&slide.slide_url)
    .bind(slide.is_active)
    .bind(slide.created_at)
    .bind(slide.created_by)
    .execute(pool)
    .await
    .context("Failed to create slide")?;

    Ok(Slide {
        id: result.last_insert_rowid(),
        ..slide
    })
}

async fn get_slide_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Slide>> {
    let sql = format!("{} WHERE id = ?", SELECT_SLIDE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get slide by ID")?;

    Ok(row.map(|row| row_to_slide_sqlite(&row)))
}

async fn update_slide_sqlite(pool: &SqlitePool, id: i64, input: &UpdateSlideInput) -> Result<u64> {
    let result = sqlx::query(UPDATE_SLIDE)
        .bind(input.slide_name.as_deref())
        .bind(input.slide_url.as_deref())
        .bind(input.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update slide")?;
    Ok(result.rows_affected())
}

async fn delete_slide_sqlite(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM slides WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete slide")?;
    Ok(result.rows_affected())
}

async fn list_slides_sqlite(
    pool: &SqlitePool,
    pattern: Option<&str>,
    is_active: Option<bool>,
) -> Result<Vec<Slide>> {
    let rows = sqlx::query(LIST_SLIDES)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(is_active)
        .bind(is_active)
        .fetch_all(pool)
        .await
        .context("Failed to list slides")?;

    Ok(rows.iter().map(row_to_slide_sqlite).collect())
}

fn row_to_slide_sqlite(row: &sqlx::sqlite::SqliteRow) -> Slide {
    Slide {
        id: row.get("id"),
        slide_name: row.get("slide_name"),
        slide_url: row.get("slide_url"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_slide_mysql(
    pool: &MySqlPool,
    input: &CreateSlideInput,
    created_by: i64,
) -> Result<Slide> {
    let slide = slide_from_input(input, created_by);

    let result = sqlx::query(
        r#"
        INSERT INTO slides (slide_name, slide_url, is_active, created_at, created_by)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&slide.slide_name)
    .bind(&slide.slide_url)
    .bind(slide.is_active)
    .bind(slide.created_at)
    .bind(slide.created_by)
    .execute(pool)
    .await
    .context("Failed to create slide")?;

    Ok(Slide {
        id: result.last_insert_id() as i64,
        ..slide
    })
}

async fn get_slide_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Slide>> {
    let sql = format!("{} WHERE id = ?", SELECT_SLIDE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get slide by ID")?;

    Ok(row.map(|row| row_to_slide_mysql(&row)))
}

async fn update_slide_mysql(pool: &MySqlPool, id: i64, input: &UpdateSlideInput) -> Result<u64> {
    let result = sqlx::query(UPDATE_SLIDE)
        .bind(input.slide_name.as_deref())
        .bind(input.slide_url.as_deref())
        .bind(input.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update slide")?;
    Ok(result.rows_affected())
}

async fn delete_slide_mysql(pool: &MySqlPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM slides WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete slide")?;
    Ok(result.rows_affected())
}

async fn list_slides_mysql(
    pool: &MySqlPool,
    pattern: Option<&str>,
    is_active: Option<bool>,
) -> Result<Vec<Slide>> {
    let rows = sqlx::query(LIST_SLIDES)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(is_active)
        .bind(is_active)
        .fetch_all(pool)
        .await
        .context("Failed to list slides")?;

    Ok(rows.iter().map(row_to_slide_mysql).collect())
}

fn row_to_slide_mysql(row: &sqlx::mysql::MySqlRow) -> Slide {
    Slide {
        id: row.get("id"),
        slide_name: row.get("slide_name"),
        slide_url: row.get("slide_url"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
    }
}
