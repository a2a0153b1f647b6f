//! Vocabulary list repository
//!
//! Database operations for vocabulary lists. Lists are soft-deleted and carry
//! the approval workflow columns (`status`, `rejection_reason`, `updated_by`).

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    is_valid_id, ContentStatus, CreateVocabularyListInput, VocabularyList, VocabularyListChanges,
    VocabularyListSummary,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{like_pattern, normalize_search};

/// Vocabulary list repository trait
#[async_trait]
pub trait VocabularyListRepository: Send + Sync {
    /// Create a draft list owned by `make_by`
    async fn create(&self, input: &CreateVocabularyListInput, make_by: i64)
        -> Result<VocabularyList>;

    /// Get an active list by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<VocabularyList>>;

    /// Get a list by ID even when it was soft-deleted
    async fn get_by_id_including_deleted(&self, id: i64) -> Result<Option<VocabularyList>>;

    /// Active list with maker name and word count
    async fn get_summary(&self, id: i64) -> Result<Option<VocabularyListSummary>>;

    /// Every active list, optionally filtered by name
    async fn get_all(&self, search: Option<&str>) -> Result<Vec<VocabularyListSummary>>;

    /// Lists created by one user
    async fn get_by_user(&self, user_id: i64, search: Option<&str>)
        -> Result<Vec<VocabularyListSummary>>;

    /// Public lists that passed review
    async fn get_published(&self, search: Option<&str>) -> Result<Vec<VocabularyListSummary>>;

    /// The user's own lists plus every list made by staff
    async fn get_my_and_staff_lists(
        &self,
        user_id: i64,
        search: Option<&str>,
    ) -> Result<Vec<VocabularyListSummary>>;

    /// Apply changes and stamp `updated_at`; `None` when missing or deleted
    async fn update(&self, id: i64, changes: &VocabularyListChanges)
        -> Result<Option<VocabularyList>>;

    /// Soft delete; `false` when there was no active list to delete
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Number of active lists
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based vocabulary list repository implementation
pub struct SqlxVocabularyListRepository {
    pool: DynDatabasePool,
}

impl SqlxVocabularyListRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn VocabularyListRepository> {
        Arc::new(Self::new(pool))
    }

    async fn list_summaries(
        &self,
        scope: ListScope,
        search: Option<&str>,
    ) -> Result<Vec<VocabularyListSummary>> {
        let pattern = normalize_search(search).map(|t| like_pattern(&t));
        let sql = format!(
            "{} WHERE l.is_deleted = 0 AND {} AND (? IS NULL OR LOWER(l.name) LIKE LOWER(?) ESCAPE '!') ORDER BY l.created_at DESC, l.id DESC",
            SELECT_SUMMARY,
            scope.clause()
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                list_summaries_sqlite(pool, &sql, scope.param(), pattern.as_deref()).await
            }
            Backend::Mysql(pool) => {
                list_summaries_mysql(pool, &sql, scope.param(), pattern.as_deref()).await
            }
        }
    }
}

/// Which lists a summary query covers
#[derive(Debug, Clone, Copy)]
enum ListScope {
    Id(i64),
    All,
    Owner(i64),
    Published,
    OwnerAndStaff(i64),
}

impl ListScope {
    fn clause(&self) -> &'static str {
        match self {
            ListScope::Id(_) => "l.id = ?",
            ListScope::All => "1 = 1",
            ListScope::Owner(_) => "l.make_by = ?",
            ListScope::Published => "l.is_public = 1 AND l.status = 'Published'",
            ListScope::OwnerAndStaff(_) => "(l.make_by = ? OR u.role IN (1, 2, 3))",
        }
    }

    /// Value bound to the clause placeholder, if it has one
    fn param(&self) -> Option<i64> {
        match self {
            ListScope::Id(id) | ListScope::Owner(id) | ListScope::OwnerAndStaff(id) => Some(*id),
            ListScope::All | ListScope::Published => None,
        }
    }
}

const SELECT_LIST: &str = r#"
    SELECT id, name, make_by, created_at, updated_at, updated_by, is_public, status,
           rejection_reason, is_deleted
    FROM vocabulary_lists
"#;

const SELECT_SUMMARY: &str = r#"
    SELECT l.id, l.name, l.make_by, l.created_at, l.updated_at, l.updated_by, l.is_public,
           l.status, l.rejection_reason, l.is_deleted,
           u.full_name AS maker_name,
           (SELECT COUNT(*) FROM vocabularies v
            WHERE v.list_id = l.id AND v.is_deleted = 0) AS word_count
    FROM vocabulary_lists l
    LEFT JOIN users u ON u.id = l.make_by
"#;

#[async_trait]
impl VocabularyListRepository for SqlxVocabularyListRepository {
    async fn create(
        &self,
        input: &CreateVocabularyListInput,
        make_by: i64,
    ) -> Result<VocabularyList> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_list_sqlite(pool, input, make_by).await,
            Backend::Mysql(pool) => create_list_mysql(pool, input, make_by).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<VocabularyList>> {
        Ok(self
            .get_by_id_including_deleted(id)
            .await?
            .filter(|list| !list.is_deleted))
    }

    async fn get_by_id_including_deleted(&self, id: i64) -> Result<Option<VocabularyList>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_list_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_list_by_id_mysql(pool, id).await,
        }
    }

    async fn get_summary(&self, id: i64) -> Result<Option<VocabularyListSummary>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        Ok(self.list_summaries(ListScope::Id(id), None).await?.pop())
    }

    async fn get_all(&self, search: Option<&str>) -> Result<Vec<VocabularyListSummary>> {
        self.list_summaries(ListScope::All, search).await
    }

    async fn get_by_user(
        &self,
        user_id: i64,
        search: Option<&str>,
    ) -> Result<Vec<VocabularyListSummary>> {
        self.list_summaries(ListScope::Owner(user_id), search).await
    }

    async fn get_published(&self, search: Option<&str>) -> Result<Vec<VocabularyListSummary>> {
        self.list_summaries(ListScope::Published, search).await
    }

    async fn get_my_and_staff_lists(
        &self,
        user_id: i64,
        search: Option<&str>,
    ) -> Result<Vec<VocabularyListSummary>> {
        self.list_summaries(ListScope::OwnerAndStaff(user_id), search)
            .await
    }

    async fn update(
        &self,
        id: i64,
        changes: &VocabularyListChanges,
    ) -> Result<Option<VocabularyList>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => update_list_sqlite(pool, id, changes).await?,
            Backend::Mysql(pool) => update_list_mysql(pool, id, changes).await?,
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
            Backend::Sqlite(pool) => soft_delete_list_sqlite(pool, id).await?,
            Backend::Mysql(pool) => soft_delete_list_mysql(pool, id).await?,
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_lists_sqlite(pool).await,
            Backend::Mysql(pool) => count_lists_mysql(pool).await,
        }
    }
}

const UPDATE_LIST: &str = r#"
    UPDATE vocabulary_lists SET
        name = COALESCE(?, name),
        is_public = COALESCE(?, is_public),
        status = COALESCE(?, status),
        rejection_reason = CASE WHEN ? THEN ? ELSE rejection_reason END,
        updated_by = COALESCE(?, updated_by),
        updated_at = ?
    WHERE id = ? AND is_deleted = 0
"#;

fn parse_status(value: Option<String>) -> Result<Option<ContentStatus>> {
    value
        .map(|s| {
            ContentStatus::parse(&s).with_context(|| format!("Unknown content status '{}'", s))
        })
        .transpose()
}

fn list_from_input(id: i64, input: &CreateVocabularyListInput, make_by: i64) -> VocabularyList {
    VocabularyList {
        id,
        name: input.name.clone(),
        make_by,
        created_at: Utc::now(),
        updated_at: None,
        updated_by: None,
        is_public: input.is_public,
        status: Some(ContentStatus::Draft),
        rejection_reason: None,
        is_deleted: false,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_list_sqlite(
    pool: &SqlitePool,
    input: &CreateVocabularyListInput,
    make_by: i64,
) -> Result<VocabularyList> {
    let list = list_from_input(0, input, make_by);

    let result = sqlx::query(
        r#"
        INSERT INTO vocabulary_lists (name, make_by, created_at, is_public, status, is_deleted)
        VALUES (?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(&list.name)
    .bind(list.make_by)
    .bind(list.created_at)
    .bind(list.is_public)
    .bind(ContentStatus::Draft.as_str())
    .execute(pool)
    .await
    .context("Failed to create vocabulary list")?;

    Ok(VocabularyList {
        id: result.last_insert_rowid(),
        ..list
    })
}

async fn get_list_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<VocabularyList>> {
    let sql = format!("{} WHERE id = ?", SELECT_LIST);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get vocabulary list by ID")?;

    row.map(|row| row_to_list_sqlite(&row)).transpose()
}

async fn list_summaries_sqlite(
    pool: &SqlitePool,
    sql: &str,
    scope_param: Option<i64>,
    pattern: Option<&str>,
) -> Result<Vec<VocabularyListSummary>> {
    let mut query = sqlx::query(sql);
    if let Some(param) = scope_param {
        query = query.bind(param);
    }
    let rows = query
        .bind(pattern)
        .bind(pattern)
        .fetch_all(pool)
        .await
        .context("Failed to list vocabulary lists")?;

    rows.iter()
        .map(|row| {
            Ok(VocabularyListSummary {
                list: row_to_list_sqlite(row)?,
                maker_name: row.get("maker_name"),
                word_count: row.get("word_count"),
            })
        })
        .collect()
}

async fn update_list_sqlite(
    pool: &SqlitePool,
    id: i64,
    changes: &VocabularyListChanges,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_LIST)
        .bind(changes.name.as_deref())
        .bind(changes.is_public)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.rejection_reason.is_some())
        .bind(changes.rejection_reason.clone().flatten())
        .bind(changes.updated_by)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update vocabulary list")?;
    Ok(result.rows_affected())
}

async fn soft_delete_list_sqlite(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE vocabulary_lists SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to delete vocabulary list")?;
    Ok(result.rows_affected())
}

async fn count_lists_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM vocabulary_lists WHERE is_deleted = 0")
        .fetch_one(pool)
        .await
        .context("Failed to count vocabulary lists")?;
    Ok(row.get("count"))
}

fn row_to_list_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<VocabularyList> {
    Ok(VocabularyList {
        id: row.get("id"),
        name: row.get("name"),
        make_by: row.get("make_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
        is_public: row.get("is_public"),
        status: parse_status(row.get("status"))?,
        rejection_reason: row.get("rejection_reason"),
        is_deleted: row.get("is_deleted"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_list_mysql(
    pool: &MySqlPool,
    input: &CreateVocabularyListInput,
    make_by: i64,
) -> Result<VocabularyList> {
    let list = list_from_input(0, input, make_by);

    let result = sqlx::query(
        r#"
        INSERT INTO vocabulary_lists (name, make_by, created_at, is_public, status, is_deleted)
        VALUES (?, ?, ?, ?, ?, FALSE)
        "#,
    )
    .bind(&list.name)
    .bind(list.make_by)
    .bind(list.created_at)
    .bind(list.is_public)
    .bind(ContentStatus::Draft.as_str())
    .execute(pool)
    .await
    .context("Failed to create vocabulary list")?;

    Ok(VocabularyList {
        id: result.last_insert_id() as i64,
        ..list
    })
}

async fn get_list_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<VocabularyList>> {
    let sql = format!("{} WHERE id = ?", SELECT_LIST);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get vocabulary list by ID")?;

    row.map(|row| row_to_list_mysql(&row)).transpose()
}

async fn list_summaries_mysql(
    pool: &MySqlPool,
    sql: &str,
    scope_param: Option<i64>,
    pattern: Option<&str>,
) -> Result<Vec<VocabularyListSummary>> {
    let mut query = sqlx::query(sql);
    if let Some(param) = scope_param {
        query = query.bind(param);
    }
    let rows = query
        .bind(pattern)
        .bind(pattern)
        .fetch_all(pool)
        .await
        .context("Failed to list vocabulary lists")?;

    rows.iter()
        .map(|row| {
            Ok(VocabularyListSummary {
                list: row_to_list_mysql(row)?,
                maker_name: row.get("maker_name"),
                word_count: row.get("word_count"),
            })
        })
        .collect()
}

async fn update_list_mysql(
    pool: &MySqlPool,
    id: i64,
    changes: &VocabularyListChanges,
) -> Result<u64> {
    let result = sqlx::query(UPDATE_LIST)
        .bind(changes.name.as_deref())
        .bind(changes.is_public)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.rejection_reason.is_some())
        .bind(changes.rejection_reason.clone().flatten())
        .bind(changes.updated_by)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update vocabulary list")?;
    Ok(result.rows_affected())
}

async fn soft_delete_list_mysql(pool: &MySqlPool, id: i64) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE vocabulary_lists SET is_deleted = TRUE, updated_at = ? WHERE id = ? AND is_deleted = FALSE",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to delete vocabulary list")?;
    Ok(result.rows_affected())
}

async fn count_lists_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM vocabulary_lists WHERE is_deleted = FALSE")
        .fetch_one(pool)
        .await
        .context("Failed to count vocabulary lists")?;
    Ok(row.get("count"))
}

fn row_to_list_mysql(row: &sqlx::mysql::MySqlRow) -> Result<VocabularyList> {
    Ok(VocabularyList {
        id: row.get("id"),
        name: row.get("name"),
        make_by: row.get("make_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
        is_public: row.get("is_public"),
        status: parse_status(row.get("status"))?,
        rejection_reason: row.get("rejection_reason"),
        is_deleted: row.get("is_deleted"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{
        seed_list, seed_user, seed_user_with_role, seed_word, test_pool,
    };
    use crate::db::repositories::VocabularyRepository;
    use crate::models::UserRole;

    #[tokio::test]
    async fn test_create_starts_as_draft() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "owner@lumina.dev").await;
        let repo = SqlxVocabularyListRepository::new(pool);

        let input = CreateVocabularyListInput {
            name: "IELTS Core".to_string(),
            is_public: true,
        };
        let created = repo.create(&input, user).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "IELTS Core");
        assert_eq!(found.status, Some(ContentStatus::Draft));
        assert!(found.is_public);
        assert_eq!(found.make_by, user);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_list() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "owner@lumina.dev").await;
        let id = seed_list(&pool, "Basics", user).await;
        seed_list(&pool, "Travel", user).await;
        let repo = SqlxVocabularyListRepository::new(pool);

        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert!(!repo.delete(0).await.unwrap());

        assert!(repo.get_by_id(id).await.unwrap().is_none());
        assert!(repo.get_summary(id).await.unwrap().is_none());
        assert!(repo
            .get_by_id_including_deleted(id)
            .await
            .unwrap()
            .unwrap()
            .is_deleted);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get_all(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_counts_active_words() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "owner@lumina.dev").await;
        let list = seed_list(&pool, "Basics", user).await;
        seed_word(&pool, list, "apple").await;
        let gone = seed_word(&pool, list, "banana").await;
        crate::db::repositories::SqlxVocabularyRepository::new(pool.clone())
            .delete(gone)
            .await
            .unwrap();
        let repo = SqlxVocabularyListRepository::new(pool);

        let summary = repo.get_summary(list).await.unwrap().unwrap();
        assert_eq!(summary.word_count, 1);
        assert_eq!(summary.maker_name.as_deref(), Some("User owner@lumina.dev"));
    }

    #[tokio::test]
    async fn test_scoped_listings() {
        let pool = test_pool().await;
        let customer = seed_user_with_role(&pool, "learner@lumina.dev", UserRole::Customer).await;
        let other = seed_user_with_role(&pool, "other@lumina.dev", UserRole::Customer).await;
        let staff = seed_user_with_role(&pool, "staff@lumina.dev", UserRole::Staff).await;

        let mine = seed_list(&pool, "My words", customer).await;
        seed_list(&pool, "Their words", other).await;
        let staff_list = seed_list(&pool, "Staff picks", staff).await;
        let repo = SqlxVocabularyListRepository::new(pool);

        let publish = VocabularyListChanges {
            is_public: Some(true),
            status: Some(ContentStatus::Published),
            ..Default::default()
        };
        repo.update(staff_list, &publish).await.unwrap().unwrap();

        let by_user = repo.get_by_user(customer, None).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].list.id, mine);

        let published = repo.get_published(None).await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].list.id, staff_list);

        let visible = repo.get_my_and_staff_lists(customer, None).await.unwrap();
        let mut ids: Vec<_> = visible.iter().map(|s| s.list.id).collect();
        ids.sort();
        assert_eq!(ids, vec![mine, staff_list]);

        let searched = repo.get_all(Some("  PICKS ")).await.unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].list.id, staff_list);
    }

    #[tokio::test]
    async fn test_update_changes_and_stamps() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "owner@lumina.dev").await;
        let id = seed_list(&pool, "Basics", user).await;
        let repo = SqlxVocabularyListRepository::new(pool);

        let changes = VocabularyListChanges {
            name: Some("Basics II".to_string()),
            status: Some(ContentStatus::Rejected),
            rejection_reason: Some(Some("Too short".to_string())),
            updated_by: Some(user),
            ..Default::default()
        };
        let updated = repo.update(id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.name, "Basics II");
        assert!(updated.updated_at.is_some());

        let stored = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, Some(ContentStatus::Rejected));
        assert_eq!(stored.rejection_reason.as_deref(), Some("Too short"));
        assert_eq!(stored.updated_by, Some(user));

        assert!(repo.update(9999, &changes).await.unwrap().is_none());
    }
}
