//! Article repository
//!
//! Database operations for articles and the sections they own.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL
//!
//! Methods ending in `_in` join a caller-owned [`DbTransaction`]; they must
//! not be interleaved with pool reads while that transaction is open.
//! `update_sections` and `delete` open their own transaction and are
//! all-or-nothing.

use crate::db::{Backend, DbTransaction, DynDatabasePool};
use crate::models::{
    is_valid_id, Article, ArticleChanges, ArticleDetail, ArticleQuery, ArticleSection,
    ArticleSort, ArticleSummary, ContentStatus, ListParams, NewSection, SortDirection,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlArguments, MySqlConnection};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection};
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

use super::{like_pattern, normalize_search};

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert an article inside an open transaction
    async fn create_in(&self, tx: &mut DbTransaction, article: &Article) -> Result<Article>;

    /// Insert sections for an article inside an open transaction
    async fn add_sections_in(
        &self,
        tx: &mut DbTransaction,
        article_id: i64,
        sections: &[NewSection],
    ) -> Result<Vec<ArticleSection>>;

    /// Apply changes inside an open transaction; `false` when no row matched
    async fn update_in(
        &self,
        tx: &mut DbTransaction,
        id: i64,
        changes: &ArticleChanges,
    ) -> Result<bool>;

    /// Replace every section of an article inside an open transaction
    async fn replace_sections_in(
        &self,
        tx: &mut DbTransaction,
        article_id: i64,
        sections: &[NewSection],
    ) -> Result<Vec<ArticleSection>>;

    /// Apply changes; returns the updated article or `None` if absent
    async fn update(&self, id: i64, changes: &ArticleChanges) -> Result<Option<Article>>;

    /// Set the workflow status (and publication flag) of an article
    async fn set_status(
        &self,
        id: i64,
        status: ContentStatus,
        rejection_reason: Option<String>,
        updated_by: i64,
    ) -> Result<Option<Article>>;

    /// Replace the section set in one transaction; the previous set survives
    /// any failure
    async fn update_sections(
        &self,
        article_id: i64,
        sections: &[NewSection],
    ) -> Result<Vec<ArticleSection>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Article with category name, author name and ordered sections
    async fn get_detail(&self, id: i64) -> Result<Option<ArticleDetail>>;

    /// Sections of an article ordered by `order_index`
    async fn get_sections(&self, article_id: i64) -> Result<Vec<ArticleSection>>;

    /// Every article, newest first
    async fn list_all(&self) -> Result<Vec<ArticleSummary>>;

    /// Filtered, sorted page of articles plus the total match count
    async fn query(
        &self,
        query: &ArticleQuery,
        params: &ListParams,
    ) -> Result<(Vec<ArticleSummary>, i64)>;

    /// Delete an article and its sections; `false` when it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based article repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_ARTICLE: &str = r#"
    SELECT id, title, summary, category_id, created_by, updated_by, created_at, updated_at,
           is_published, status, rejection_reason
    FROM articles
"#;

const SELECT_SUMMARY: &str = r#"
    SELECT a.id, a.title, a.summary, a.category_id, a.created_by, a.updated_by, a.created_at,
           a.updated_at, a.is_published, a.status, a.rejection_reason,
           COALESCE(c.name, '') AS category_name,
           COALESCE(u.full_name, '') AS author_name
    FROM articles a
    LEFT JOIN article_categories c ON c.id = a.category_id
    LEFT JOIN users u ON u.id = a.created_by
"#;

const QUERY_FILTER: &str = r#"
    WHERE (? IS NULL
           OR LOWER(a.title) LIKE LOWER(?) ESCAPE '!'
           OR LOWER(a.summary) LIKE LOWER(?) ESCAPE '!'
           OR EXISTS (SELECT 1 FROM article_sections s
                      WHERE s.article_id = a.id AND LOWER(s.section_content) LIKE LOWER(?) ESCAPE '!'))
      AND (? IS NULL OR a.category_id = ?)
      AND (? IS NULL OR a.is_published = ?)
      AND (? IS NULL OR a.status = ?)
      AND (? IS NULL OR a.created_by = ?)
"#;

const UPDATE_ARTICLE: &str = r#"
    UPDATE articles SET
        title = COALESCE(?, title),
        summary = COALESCE(?, summary),
        category_id = COALESCE(?, category_id),
        status = COALESCE(?, status),
        is_published = COALESCE(?, is_published),
        rejection_reason = CASE WHEN ? THEN ? ELSE rejection_reason END,
        updated_by = COALESCE(?, updated_by),
        updated_at = ?
    WHERE id = ?
"#;

/// Bind values for [`QUERY_FILTER`]
struct QueryFilters {
    pattern: Option<String>,
    category_id: Option<i64>,
    is_published: Option<bool>,
    status: Option<&'static str>,
    created_by: Option<i64>,
}

impl QueryFilters {
    fn from_query(query: &ArticleQuery) -> Self {
        Self {
            pattern: normalize_search(query.search.as_deref()).map(|t| like_pattern(&t)),
            category_id: query.category_id,
            is_published: query.is_published,
            status: query.status.map(|s| s.as_str()),
            created_by: query.created_by,
        }
    }
}

fn order_clause(query: &ArticleQuery) -> String {
    let column = match query.sort_by {
        ArticleSort::Title => "a.title",
        ArticleSort::Category => "category_name",
        ArticleSort::CreatedAt => "a.created_at",
    };
    let direction = match query.sort_dir {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!(" ORDER BY {} {}, a.id {}", column, direction, direction)
}

fn parse_status(value: &str) -> Result<ContentStatus> {
    ContentStatus::parse(value).with_context(|| format!("Unknown content status '{}'", value))
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create_in(&self, tx: &mut DbTransaction, article: &Article) -> Result<Article> {
        match tx {
            DbTransaction::Sqlite(tx) => create_article_sqlite(&mut **tx, article).await,
            DbTransaction::Mysql(tx) => create_article_mysql(&mut **tx, article).await,
        }
    }

    async fn add_sections_in(
        &self,
        tx: &mut DbTransaction,
        article_id: i64,
        sections: &[NewSection],
    ) -> Result<Vec<ArticleSection>> {
        match tx {
            DbTransaction::Sqlite(tx) => insert_sections_sqlite(&mut **tx, article_id, sections).await,
            DbTransaction::Mysql(tx) => insert_sections_mysql(&mut **tx, article_id, sections).await,
        }
    }

    async fn update_in(
        &self,
        tx: &mut DbTransaction,
        id: i64,
        changes: &ArticleChanges,
    ) -> Result<bool> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        let affected = match tx {
            DbTransaction::Sqlite(tx) => update_article_sqlite(&mut **tx, id, changes).await?,
            DbTransaction::Mysql(tx) => update_article_mysql(&mut **tx, id, changes).await?,
        };
        Ok(affected > 0)
    }

    async fn replace_sections_in(
        &self,
        tx: &mut DbTransaction,
        article_id: i64,
        sections: &[NewSection],
    ) -> Result<Vec<ArticleSection>> {
        match tx {
            DbTransaction::Sqlite(tx) => {
                replace_sections_sqlite(&mut **tx, article_id, sections).await
            }
            DbTransaction::Mysql(tx) => replace_sections_mysql(&mut **tx, article_id, sections).await,
        }
    }

    async fn update(&self, id: i64, changes: &ArticleChanges) -> Result<Option<Article>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut conn = pool.acquire().await.context("Failed to acquire connection")?;
                update_article_sqlite(&mut conn, id, changes).await?
            }
            Backend::Mysql(pool) => {
                let mut conn = pool.acquire().await.context("Failed to acquire connection")?;
                update_article_mysql(&mut conn, id, changes).await?
            }
        };
        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn set_status(
        &self,
        id: i64,
        status: ContentStatus,
        rejection_reason: Option<String>,
        updated_by: i64,
    ) -> Result<Option<Article>> {
        let changes = ArticleChanges {
            status: Some(status),
            is_published: Some(status == ContentStatus::Published),
            rejection_reason: Some(rejection_reason),
            updated_by: Some(updated_by),
            ..Default::default()
        };
        self.update(id, &changes).await
    }

    async fn update_sections(
        &self,
        article_id: i64,
        sections: &[NewSection],
    ) -> Result<Vec<ArticleSection>> {
        let mut tx = DbTransaction::begin(&self.pool).await?;
        match self.replace_sections_in(&mut tx, article_id, sections).await {
            Ok(inserted) => {
                tx.commit().await?;
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        "Failed to roll back section update for article {}: {}",
                        article_id,
                        rollback_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_article_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_article_by_id_mysql(pool, id).await,
        }
    }

    async fn get_detail(&self, id: i64) -> Result<Option<ArticleDetail>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let summary = match self.pool.backend() {
            Backend::Sqlite(pool) => get_summary_sqlite(pool, id).await?,
            Backend::Mysql(pool) => get_summary_mysql(pool, id).await?,
        };
        let Some(summary) = summary else {
            return Ok(None);
        };
        let sections = self.get_sections(id).await?;
        Ok(Some(ArticleDetail { summary, sections }))
    }

    async fn get_sections(&self, article_id: i64) -> Result<Vec<ArticleSection>> {
        if !is_valid_id(article_id) {
            return Ok(Vec::new());
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_sections_sqlite(pool, article_id).await,
            Backend::Mysql(pool) => get_sections_mysql(pool, article_id).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<ArticleSummary>> {
        let sql = format!("{} ORDER BY a.created_at DESC, a.id DESC", SELECT_SUMMARY);
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_summaries_sqlite(pool, &sql).await,
            Backend::Mysql(pool) => list_summaries_mysql(pool, &sql).await,
        }
    }

    async fn query(
        &self,
        query: &ArticleQuery,
        params: &ListParams,
    ) -> Result<(Vec<ArticleSummary>, i64)> {
        let filters = QueryFilters::from_query(query);
        let page_sql = format!(
            "{}{}{} LIMIT ? OFFSET ?",
            SELECT_SUMMARY,
            QUERY_FILTER,
            order_clause(query)
        );
        let count_sql = format!(
            "SELECT COUNT(*) as count FROM articles a LEFT JOIN article_categories c ON c.id = a.category_id {}",
            QUERY_FILTER
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                query_articles_sqlite(pool, &page_sql, &count_sql, &filters, params).await
            }
            Backend::Mysql(pool) => {
                query_articles_mysql(pool, &page_sql, &count_sql, &filters, params).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        let mut tx = DbTransaction::begin(&self.pool).await?;
        let deleted = match &mut tx {
            DbTransaction::Sqlite(tx) => delete_article_sqlite(&mut **tx, id).await,
            DbTransaction::Mysql(tx) => delete_article_mysql(&mut **tx, id).await,
        };
        match deleted {
            Ok(affected) => {
                tx.commit().await?;
                Ok(affected > 0)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Failed to roll back delete of article {}: {}", id, rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_articles_sqlite(pool).await,
            Backend::Mysql(pool) => count_articles_mysql(pool).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(conn: &mut SqliteConnection, article: &Article) -> Result<Article> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, summary, category_id, created_by, created_at, is_published, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.summary)
    .bind(article.category_id)
    .bind(article.created_by)
    .bind(article.created_at)
    .bind(article.is_published)
    .bind(article.status.as_str())
    .execute(&mut *conn)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        ..article.clone()
    })
}

async fn insert_sections_sqlite(
    conn: &mut SqliteConnection,
    article_id: i64,
    sections: &[NewSection],
) -> Result<Vec<ArticleSection>> {
    let mut inserted = Vec::with_capacity(sections.len());
    for section in sections {
        let result = sqlx::query(
            r#"
            INSERT INTO article_sections (article_id, section_title, section_content, order_index)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(article_id)
        .bind(&section.section_title)
        .bind(&section.section_content)
        .bind(section.order_index)
        .execute(&mut *conn)
        .await
        .context("Failed to insert article section")?;

        inserted.push(section_from_new(result.last_insert_rowid(), article_id, section));
    }
    Ok(inserted)
}

async fn replace_sections_sqlite(
    conn: &mut SqliteConnection,
    article_id: i64,
    sections: &[NewSection],
) -> Result<Vec<ArticleSection>> {
    sqlx::query("DELETE FROM article_sections WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete article sections")?;

    insert_sections_sqlite(conn, article_id, sections).await
}

async fn update_article_sqlite(
    conn: &mut SqliteConnection,
    id: i64,
    changes: &ArticleChanges,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_ARTICLE)
        .bind(changes.title.as_deref())
        .bind(changes.summary.as_deref())
        .bind(changes.category_id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.is_published)
        .bind(changes.rejection_reason.is_some())
        .bind(changes.rejection_reason.clone().flatten())
        .bind(changes.updated_by)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to update article")?;
    Ok(result.rows_affected())
}

async fn delete_article_sqlite(conn: &mut SqliteConnection, id: i64) -> Result<u64> {
    sqlx::query("DELETE FROM article_sections WHERE article_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete article sections")?;

    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete article")?;
    Ok(result.rows_affected())
}

async fn get_article_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let sql = format!("{} WHERE id = ?", SELECT_ARTICLE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    row.map(|row| row_to_article_sqlite(&row)).transpose()
}

async fn get_summary_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ArticleSummary>> {
    let sql = format!("{} WHERE a.id = ?", SELECT_SUMMARY);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article detail")?;

    row.map(|row| row_to_summary_sqlite(&row)).transpose()
}

async fn get_sections_sqlite(pool: &SqlitePool, article_id: i64) -> Result<Vec<ArticleSection>> {
    let rows = sqlx::query(
        r#"
        SELECT id, article_id, section_title, section_content, order_index
        FROM article_sections
        WHERE article_id = ?
        ORDER BY order_index, id
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
    .context("Failed to get article sections")?;

    Ok(rows
        .iter()
        .map(|row| ArticleSection {
            id: row.get("id"),
            article_id: row.get("article_id"),
            section_title: row.get("section_title"),
            section_content: row.get("section_content"),
            order_index: row.get("order_index"),
        })
        .collect())
}

async fn list_summaries_sqlite(pool: &SqlitePool, sql: &str) -> Result<Vec<ArticleSummary>> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_summary_sqlite).collect()
}

fn bind_filters_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    filters: &'q QueryFilters,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let pattern = filters.pattern.as_deref();
    query
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(filters.category_id)
        .bind(filters.category_id)
        .bind(filters.is_published)
        .bind(filters.is_published)
        .bind(filters.status)
        .bind(filters.status)
        .bind(filters.created_by)
        .bind(filters.created_by)
}

async fn query_articles_sqlite(
    pool: &SqlitePool,
    page_sql: &str,
    count_sql: &str,
    filters: &QueryFilters,
    params: &ListParams,
) -> Result<(Vec<ArticleSummary>, i64)> {
    let count_row = bind_filters_sqlite(sqlx::query(count_sql), filters)
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;
    let total: i64 = count_row.get("count");

    let rows = bind_filters_sqlite(sqlx::query(page_sql), filters)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to query articles")?;

    let items = rows
        .iter()
        .map(row_to_summary_sqlite)
        .collect::<Result<Vec<_>>>()?;
    Ok((items, total))
}

async fn count_articles_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles")
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;
    Ok(row.get("count"))
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let status: String = row.get("status");
    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        category_id: row.get("category_id"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        is_published: row.get("is_published"),
        status: parse_status(&status)?,
        rejection_reason: row.get("rejection_reason"),
    })
}

fn row_to_summary_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ArticleSummary> {
    Ok(ArticleSummary {
        article: row_to_article_sqlite(row)?,
        category_name: row.get("category_name"),
        author_name: row.get("author_name"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(conn: &mut MySqlConnection, article: &Article) -> Result<Article> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, summary, category_id, created_by, created_at, is_published, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.summary)
    .bind(article.category_id)
    .bind(article.created_by)
    .bind(article.created_at)
    .bind(article.is_published)
    .bind(article.status.as_str())
    .execute(&mut *conn)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_id() as i64,
        ..article.clone()
    })
}

async fn insert_sections_mysql(
    conn: &mut MySqlConnection,
    article_id: i64,
    sections: &[NewSection],
) -> Result<Vec<ArticleSection>> {
    let mut inserted = Vec::with_capacity(sections.len());
    for section in sections {
        let result = sqlx::query(
            r#"
            INSERT INTO article_sections (article_id, section_title, section_content, order_index)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(article_id)
        .bind(&section.section_title)
        .bind(&section.section_content)
        .bind(section.order_index)
        .execute(&mut *conn)
        .await
        .context("Failed to insert article section")?;

        inserted.push(section_from_new(
            result.last_insert_id() as i64,
            article_id,
            section,
        ));
    }
    Ok(inserted)
}

async fn replace_sections_mysql(
    conn: &mut MySqlConnection,
    article_id: i64,
    sections: &[NewSection],
) -> Result<Vec<ArticleSection>> {
    sqlx::query("DELETE FROM article_sections WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete article sections")?;

    insert_sections_mysql(conn, article_id, sections).await
}

async fn update_article_mysql(
    conn: &mut MySqlConnection,
    id: i64,
    changes: &ArticleChanges,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_ARTICLE)
        .bind(changes.title.as_deref())
        .bind(changes.summary.as_deref())
        .bind(changes.category_id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.is_published)
        .bind(changes.rejection_reason.is_some())
        .bind(changes.rejection_reason.clone().flatten())
        .bind(changes.updated_by)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to update article")?;
    Ok(result.rows_affected())
}

async fn delete_article_mysql(conn: &mut MySqlConnection, id: i64) -> Result<u64> {
    sqlx::query("DELETE FROM article_sections WHERE article_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete article sections")?;

    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete article")?;
    Ok(result.rows_affected())
}

async fn get_article_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Article>> {
    let sql = format!("{} WHERE id = ?", SELECT_ARTICLE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    row.map(|row| row_to_article_mysql(&row)).transpose()
}

async fn get_summary_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ArticleSummary>> {
    let sql = format!("{} WHERE a.id = ?", SELECT_SUMMARY);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article detail")?;

    row.map(|row| row_to_summary_mysql(&row)).transpose()
}

async fn get_sections_mysql(pool: &MySqlPool, article_id: i64) -> Result<Vec<ArticleSection>> {
    let rows = sqlx::query(
        r#"
        SELECT id, article_id, section_title, section_content, order_index
        FROM article_sections
        WHERE article_id = ?
        ORDER BY order_index, id
        "#,
    )
    .bind(article_id)
    .fetch_all(pool)
    .await
    .context("Failed to get article sections")?;

    Ok(rows
        .iter()
        .map(|row| ArticleSection {
            id: row.get("id"),
            article_id: row.get("article_id"),
            section_title: row.get("section_title"),
            section_content: row.get("section_content"),
            order_index: row.get("order_index"),
        })
        .collect())
}

async fn list_summaries_mysql(pool: &MySqlPool, sql: &str) -> Result<Vec<ArticleSummary>> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_summary_mysql).collect()
}

fn bind_filters_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    filters: &'q QueryFilters,
) -> Query<'q, MySql, MySqlArguments> {
    let pattern = filters.pattern.as_deref();
    query
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .bind(filters.category_id)
        .bind(filters.category_id)
        .bind(filters.is_published)
        .bind(filters.is_published)
        .bind(filters.status)
        .bind(filters.status)
        .bind(filters.created_by)
        .bind(filters.created_by)
}

async fn query_articles_mysql(
    pool: &MySqlPool,
    page_sql: &str,
    count_sql: &str,
    filters: &QueryFilters,
    params: &ListParams,
) -> Result<(Vec<ArticleSummary>, i64)> {
    let count_row = bind_filters_mysql(sqlx::query(count_sql), filters)
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;
    let total: i64 = count_row.get("count");

    let rows = bind_filters_mysql(sqlx::query(page_sql), filters)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to query articles")?;

    let items = rows
        .iter()
        .map(row_to_summary_mysql)
        .collect::<Result<Vec<_>>>()?;
    Ok((items, total))
}

async fn count_articles_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles")
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;
    Ok(row.get("count"))
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    let status: String = row.get("status");
    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        category_id: row.get("category_id"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        is_published: row.get("is_published"),
        status: parse_status(&status)?,
        rejection_reason: row.get("rejection_reason"),
    })
}

fn row_to_summary_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ArticleSummary> {
    Ok(ArticleSummary {
        article: row_to_article_mysql(row)?,
        category_name: row.get("category_name"),
        author_name: row.get("author_name"),
    })
}

fn section_from_new(id: i64, article_id: i64, section: &NewSection) -> ArticleSection {
    ArticleSection {
        id,
        article_id,
        section_title: section.section_title.clone(),
        section_content: section.section_content.clone(),
        order_index: section.order_index,
    }
}
