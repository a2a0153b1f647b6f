//! Vocabulary repository
//!
//! Database operations for vocabulary entries. Entries are soft-deleted:
//! `delete` flips `is_deleted` and every read except
//! `get_by_id_including_deleted` skips flagged rows.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    is_valid_id, CreateVocabularyInput, ListWordCount, UpdateVocabularyInput, Vocabulary,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{like_pattern, normalize_search};

/// Vocabulary repository trait
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    async fn create(&self, input: &CreateVocabularyInput) -> Result<Vocabulary>;

    /// Get an active entry by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Vocabulary>>;

    /// Get an entry by ID even when it was soft-deleted
    async fn get_by_id_including_deleted(&self, id: i64) -> Result<Option<Vocabulary>>;

    /// Apply an update command; `None` when the entry is missing or deleted
    async fn update(&self, id: i64, input: &UpdateVocabularyInput) -> Result<Option<Vocabulary>>;

    /// Soft delete; `false` when there was no active entry to delete
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Number of active entries
    async fn count(&self) -> Result<i64>;

    /// Entries of one list (or all lists), optionally matching a search term
    /// against word, definition or a non-null category. Ordered by word.
    async fn get_by_list(&self, list_id: Option<i64>, search: Option<&str>)
        -> Result<Vec<Vocabulary>>;

    /// Broad search over word, definition, example, part of speech and category
    async fn search(&self, term: Option<&str>, list_id: Option<i64>) -> Result<Vec<Vocabulary>>;

    async fn get_by_type(&self, type_of_word: &str) -> Result<Vec<Vocabulary>>;

    async fn get_by_category(&self, category: &str) -> Result<Vec<Vocabulary>>;

    /// Distinct non-null categories of active entries
    async fn get_distinct_categories(&self) -> Result<Vec<String>>;

    /// Active entry count per list
    async fn get_counts_by_list(&self) -> Result<Vec<ListWordCount>>;
}

/// SQLx-based vocabulary repository implementation
pub struct SqlxVocabularyRepository {
    pool: DynDatabasePool,
}

impl SqlxVocabularyRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VocabularyRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_VOCABULARY: &str = r#"
    SELECT id, list_id, word, definition, type_of_word, category, example, is_deleted
    FROM vocabularies
"#;

const LIST_FILTER: &str = r#"
    WHERE is_deleted = 0
      AND (? IS NULL OR list_id = ?)
      AND (? IS NULL
           OR LOWER(word) LIKE LOWER(?) ESCAPE '!'
           OR LOWER(definition) LIKE LOWER(?) ESCAPE '!'
           OR (category IS NOT NULL AND LOWER(category) LIKE LOWER(?) ESCAPE '!'))
    ORDER BY word
"#;

const SEARCH_FILTER: &str = r#"
    WHERE is_deleted = 0
      AND (? IS NULL OR list_id = ?)
      AND (? IS NULL
           OR LOWER(word) LIKE LOWER(?) ESCAPE '!'
           OR LOWER(definition) LIKE LOWER(?) ESCAPE '!'
           OR LOWER(type_of_word) LIKE LOWER(?) ESCAPE '!'
           OR (example IS NOT NULL AND LOWER(example) LIKE LOWER(?) ESCAPE '!')
           OR (category IS NOT NULL AND LOWER(category) LIKE LOWER(?) ESCAPE '!'))
    ORDER BY word
"#;

/// Partial update; absent fields keep their stored value
const UPDATE_VOCABULARY: &str = r#"
    UPDATE vocabularies SET
        list_id = COALESCE(?, list_id),
        word = COALESCE(?, word),
        definition = COALESCE(?, definition),
        type_of_word = COALESCE(?, type_of_word),
        category = CASE WHEN ? THEN ? ELSE category END,
        example = CASE WHEN ? THEN ? ELSE example END
    WHERE id = ? AND is_deleted = 0
"#;

#[async_trait]
impl VocabularyRepository for SqlxVocabularyRepository {
    async fn create(&self, input: &CreateVocabularyInput) -> Result<Vocabulary> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_vocabulary_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_vocabulary_mysql(pool, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Vocabulary>> {
        Ok(self
            .get_by_id_including_deleted(id)
            .await?
            .filter(|v| !v.is_deleted))
    }

    async fn get_by_id_including_deleted(&self, id: i64) -> Result<Option<Vocabulary>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_vocabulary_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_vocabulary_by_id_mysql(pool, id).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateVocabularyInput) -> Result<Option<Vocabulary>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => update_vocabulary_sqlite(pool, id, input).await?,
            Backend::Mysql(pool) => update_vocabulary_mysql(pool, id, input).await?,
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
            Backend::Sqlite(pool) => soft_delete_vocabulary_sqlite(pool, id).await?,
            Backend::Mysql(pool) => soft_delete_vocabulary_mysql(pool, id).await?,
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_vocabularies_sqlite(pool).await,
            Backend::Mysql(pool) => count_vocabularies_mysql(pool).await,
        }
    }

    async fn get_by_list(
        &self,
        list_id: Option<i64>,
        search: Option<&str>,
    ) -> Result<Vec<Vocabulary>> {
        let pattern = normalize_search(search).map(|t| like_pattern(&t));
        let sql = format!("{}{}", SELECT_VOCABULARY, LIST_FILTER);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                filter_vocabularies_sqlite(pool, &sql, list_id, pattern.as_deref(), 3).await
            }
            Backend::Mysql(pool) => {
                filter_vocabularies_mysql(pool, &sql, list_id, pattern.as_deref(), 3).await
            }
        }
    }

    async fn search(&self, term: Option<&str>, list_id: Option<i64>) -> Result<Vec<Vocabulary>> {
        let pattern = normalize_search(term).map(|t| like_pattern(&t));
        let sql = format!("{}{}", SELECT_VOCABULARY, SEARCH_FILTER);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                filter_vocabularies_sqlite(pool, &sql, list_id, pattern.as_deref(), 5).await
            }
            Backend::Mysql(pool) => {
                filter_vocabularies_mysql(pool, &sql, list_id, pattern.as_deref(), 5).await
            }
        }
    }

    async fn get_by_type(&self, type_of_word: &str) -> Result<Vec<Vocabulary>> {
        let sql = format!(
            "{} WHERE is_deleted = 0 AND LOWER(type_of_word) = LOWER(?) ORDER BY word",
            SELECT_VOCABULARY
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_by_column_sqlite(pool, &sql, type_of_word).await,
            Backend::Mysql(pool) => list_by_column_mysql(pool, &sql, type_of_word).await,
        }
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Vocabulary>> {
        let sql = format!(
            "{} WHERE is_deleted = 0 AND category IS NOT NULL AND LOWER(category) = LOWER(?) ORDER BY word",
            SELECT_VOCABULARY
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_by_column_sqlite(pool, &sql, category).await,
            Backend::Mysql(pool) => list_by_column_mysql(pool, &sql, category).await,
        }
    }

    async fn get_distinct_categories(&self) -> Result<Vec<String>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => distinct_categories_sqlite(pool).await,
            Backend::Mysql(pool) => distinct_categories_mysql(pool).await,
        }
    }

    async fn get_counts_by_list(&self) -> Result<Vec<ListWordCount>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => counts_by_list_sqlite(pool).await,
            Backend::Mysql(pool) => counts_by_list_mysql(pool).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_vocabulary_sqlite(
    pool: &SqlitePool,
    input: &CreateVocabularyInput,
) -> Result<Vocabulary> {
    let result = sqlx::query(
        r#"
        INSERT INTO vocabularies (list_id, word, definition, type_of_word, category, example, is_deleted)
        VALUES (?, ?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(input.list_id)
    .bind(&input.word)
    .bind(&input.definition)
    .bind(&input.type_of_word)
    .bind(&input.category)
    .bind(&input.example)
    .execute(pool)
    .await
    .context("Failed to create vocabulary")?;

    Ok(vocabulary_from_input(result.last_insert_rowid(), input))
}

async fn get_vocabulary_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Vocabulary>> {
    let sql = format!("{} WHERE id = ?", SELECT_VOCABULARY);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get vocabulary by ID")?;

    Ok(row.map(|row| row_to_vocabulary_sqlite(&row)))
}

async fn update_vocabulary_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &UpdateVocabularyInput,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_VOCABULARY)
        .bind(input.list_id)
        .bind(input.word.as_deref())
        .bind(input.definition.as_deref())
        .bind(input.type_of_word.as_deref())
        .bind(input.category.is_some())
        .bind(input.category.clone().flatten())
        .bind(input.example.is_some())
        .bind(input.example.clone().flatten())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update vocabulary")?;
    Ok(result.rows_affected())
}

async fn soft_delete_vocabulary_sqlite(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE vocabularies SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete vocabulary")?;
    Ok(result.rows_affected())
}

async fn count_vocabularies_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM vocabularies WHERE is_deleted = 0")
        .fetch_one(pool)
        .await
        .context("Failed to count vocabularies")?;
    Ok(row.get("count"))
}

/// Bind the list filter, then the search pattern `pattern_slots` times
async fn filter_vocabularies_sqlite(
    pool: &SqlitePool,
    sql: &str,
    list_id: Option<i64>,
    pattern: Option<&str>,
    pattern_slots: usize,
) -> Result<Vec<Vocabulary>> {
    let mut query = sqlx::query(sql).bind(list_id).bind(list_id).bind(pattern);
    for _ in 0..pattern_slots {
        query = query.bind(pattern);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to filter vocabularies")?;

    Ok(rows.iter().map(row_to_vocabulary_sqlite).collect())
}

async fn list_by_column_sqlite(pool: &SqlitePool, sql: &str, value: &str) -> Result<Vec<Vocabulary>> {
    let rows = sqlx::query(sql)
        .bind(value)
        .fetch_all(pool)
        .await
        .context("Failed to list vocabularies")?;

    Ok(rows.iter().map(row_to_vocabulary_sqlite).collect())
}

async fn distinct_categories_sqlite(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT category FROM vocabularies
        WHERE is_deleted = 0 AND category IS NOT NULL AND category <> ''
        ORDER BY category
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list vocabulary categories")?;

    Ok(rows.iter().map(|row| row.get("category")).collect())
}

async fn counts_by_list_sqlite(pool: &SqlitePool) -> Result<Vec<ListWordCount>> {
    let rows = sqlx::query(
        r#"
        SELECT list_id, COUNT(*) as count FROM vocabularies
        WHERE is_deleted = 0
        GROUP BY list_id
        ORDER BY list_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to count vocabularies per list")?;

    Ok(rows
        .iter()
        .map(|row| ListWordCount {
            list_id: row.get("list_id"),
            count: row.get("count"),
        })
        .collect())
}

fn row_to_vocabulary_sqlite(row: &sqlx::sqlite::SqliteRow) -> Vocabulary {
    Vocabulary {
        id: row.get("id"),
        list_id: row.get("list_id"),
        word: row.get("word"),
        definition: row.get("definition"),
        type_of_word: row.get("type_of_word"),
        category: row.get("category"),
        example: row.get("example"),
        is_deleted: row.get("is_deleted"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_vocabulary_mysql(
    pool: &MySqlPool,
    input: &CreateVocabularyInput,
) -> Result<Vocabulary> {
    let result = sqlx::query(
        r#"
        INSERT INTO vocabularies (list_id, word, definition, type_of_word, category, example, is_deleted)
        VALUES (?, ?, ?, ?, ?, ?, FALSE)
        "#,
    )
    .bind(input.list_id)
    .bind(&input.word)
    .bind(&input.definition)
    .bind(&input.type_of_word)
    .bind(&input.category)
    .bind(&input.example)
    .execute(pool)
    .await
    .context("Failed to create vocabulary")?;

    Ok(vocabulary_from_input(result.last_insert_id() as i64, input))
}

async fn get_vocabulary_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Vocabulary>> {
    let sql = format!("{} WHERE id = ?", SELECT_VOCABULARY);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get vocabulary by ID")?;

    Ok(row.map(|row| row_to_vocabulary_mysql(&row)))
}

async fn update_vocabulary_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &UpdateVocabularyInput,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_VOCABULARY)
        .bind(input.list_id)
        .bind(input.word.as_deref())
        .bind(input.definition.as_deref())
        .bind(input.type_of_word.as_deref())
        .bind(input.category.is_some())
        .bind(input.category.clone().flatten())
        .bind(input.example.is_some())
        .bind(input.example.clone().flatten())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update vocabulary")?;
    Ok(result.rows_affected())
}

async fn soft_delete_vocabulary_mysql(pool: &MySqlPool, id: i64) -> Result<u64> {
    let result =
        sqlx::query("UPDATE vocabularies SET is_deleted = TRUE WHERE id = ? AND is_deleted = FALSE")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete vocabulary")?;
    Ok(result.rows_affected())
}

async fn count_vocabularies_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM vocabularies WHERE is_deleted = FALSE")
        .fetch_one(pool)
        .await
        .context("Failed to count vocabularies")?;
    Ok(row.get("count"))
}

async fn filter_vocabularies_mysql(
    pool: &MySqlPool,
    sql: &str,
    list_id: Option<i64>,
    pattern: Option<&str>,
    pattern_slots: usize,
) -> Result<Vec<Vocabulary>> {
    let mut query = sqlx::query(sql).bind(list_id).bind(list_id).bind(pattern);
    for _ in 0..pattern_slots {
        query = query.bind(pattern);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to filter vocabularies")?;

    Ok(rows.iter().map(row_to_vocabulary_mysql).collect())
}

async fn list_by_column_mysql(pool: &MySqlPool, sql: &str, value: &str) -> Result<Vec<Vocabulary>> {
    let rows = sqlx::query(sql)
        .bind(value)
        .fetch_all(pool)
        .await
        .context("Failed to list vocabularies")?;

    Ok(rows.iter().map(row_to_vocabulary_mysql).collect())
}

async fn distinct_categories_mysql(pool: &MySqlPool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT category FROM vocabularies
        WHERE is_deleted = FALSE AND category IS NOT NULL AND category <> ''
        ORDER BY category
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list vocabulary categories")?;

    Ok(rows.iter().map(|row| row.get("category")).collect())
}

async fn counts_by_list_mysql(pool: &MySqlPool) -> Result<Vec<ListWordCount>> {
    let rows = sqlx::query(
        r#"
        SELECT list_id, COUNT(*) as count FROM vocabularies
        WHERE is_deleted = FALSE
        GROUP BY list_id
        ORDER BY list_id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to count vocabularies per list")?;

    Ok(rows
        .iter()
        .map(|row| ListWordCount {
            list_id: row.get("list_id"),
            count: row.get("count"),
        })
        .collect())
}

fn row_to_vocabulary_mysql(row: &sqlx::mysql::MySqlRow) -> Vocabulary {
    Vocabulary {
        id: row.get("id"),
        list_id: row.get("list_id"),
        word: row.get("word"),
        definition: row.get("definition"),
        type_of_word: row.get("type_of_word"),
        category: row.get("category"),
        example: row.get("example"),
        is_deleted: row.get("is_deleted"),
    }
}

fn vocabulary_from_input(id: i64, input: &CreateVocabularyInput) -> Vocabulary {
    Vocabulary {
        id,
        list_id: input.list_id,
        word: input.word.clone(),
        definition: input.definition.clone(),
        type_of_word: input.type_of_word.clone(),
        category: input.category.clone(),
        example: input.example.clone(),
        is_deleted: false,
    }
}
