//! Article category repository
//!
//! Database operations for article categories.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{is_valid_id, ArticleCategory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article category repository trait
#[async_trait]
pub trait ArticleCategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &ArticleCategory) -> Result<ArticleCategory>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<ArticleCategory>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<ArticleCategory>>;

    /// Check if a category name already exists (case-insensitive)
    async fn exists_by_name(&self, name: &str) -> Result<bool>;
}

/// SQLx-based article category repository implementation
pub struct SqlxArticleCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleCategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleCategoryRepository for SqlxArticleCategoryRepository {
    async fn create(&self, category: &ArticleCategory) -> Result<ArticleCategory> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_category_sqlite(pool, category).await,
            Backend::Mysql(pool) => create_category_mysql(pool, category).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ArticleCategory>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_category_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_category_by_id_mysql(pool, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<ArticleCategory>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_categories_sqlite(pool).await,
            Backend::Mysql(pool) => list_categories_mysql(pool).await,
        }
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => exists_by_name_sqlite(pool, name).await,
            Backend::Mysql(pool) => exists_by_name_mysql(pool, name).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(
    pool: &SqlitePool,
    category: &ArticleCategory,
) -> Result<ArticleCategory> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO article_categories (name, created_at, created_by) VALUES (?, ?, ?)",
    )
    .bind(&category.name)
    .bind(now)
    .bind(category.created_by)
    .execute(pool)
    .await
    .context("Failed to create article category")?;

    Ok(ArticleCategory {
        id: result.last_insert_rowid(),
        name: category.name.clone(),
        created_at: now,
        created_by: category.created_by,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ArticleCategory>> {
    let row = sqlx::query(
        "SELECT id, name, created_at, created_by FROM article_categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get article category by ID")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<ArticleCategory>> {
    let rows = sqlx::query(
        "SELECT id, name, created_at, created_by FROM article_categories ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list article categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn exists_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM article_categories WHERE LOWER(name) = LOWER(?)",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .context("Failed to check article category name")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> ArticleCategory {
    ArticleCategory {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(
    pool: &MySqlPool,
    category: &ArticleCategory,
) -> Result<ArticleCategory> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO article_categories (name, created_at, created_by) VALUES (?, ?, ?)",
    )
    .bind(&category.name)
    .bind(now)
    .bind(category.created_by)
    .execute(pool)
    .await
    .context("Failed to create article category")?;

    Ok(ArticleCategory {
        id: result.last_insert_id() as i64,
        name: category.name.clone(),
        created_at: now,
        created_by: category.created_by,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ArticleCategory>> {
    let row = sqlx::query(
        "SELECT id, name, created_at, created_by FROM article_categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get article category by ID")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<ArticleCategory>> {
    let rows = sqlx::query(
        "SELECT id, name, created_at, created_by FROM article_categories ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list article categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn exists_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM article_categories WHERE LOWER(name) = LOWER(?)",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .context("Failed to check article category name")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> ArticleCategory {
    ArticleCategory {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
    }
}
