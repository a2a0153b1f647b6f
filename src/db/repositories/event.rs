//! Event repository
//!
//! Database operations for promotional events.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    is_valid_id, CreateEventInput, Event, EventFilter, ListParams, UpdateEventInput,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{like_pattern, normalize_search};

/// Event repository trait
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, input: &CreateEventInput, created_by: i64) -> Result<Event>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>>;

    /// Apply an update command; `None` when the event is missing
    async fn update(&self, id: i64, input: &UpdateEventInput) -> Result<Option<Event>>;

    /// Hard delete; `false` when the event did not exist
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Filtered events, latest start first
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// One page of [`list`](Self::list) plus the total match count
    async fn list_paged(&self, filter: &EventFilter, params: &ListParams)
        -> Result<(Vec<Event>, i64)>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based event repository implementation
pub struct SqlxEventRepository {
    pool: DynDatabasePool,
}

impl SqlxEventRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EventRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_EVENT: &str = r#"
    SELECT id, event_name, content, start_date, end_date, created_at, updated_at, created_by
    FROM events
"#;

const EVENT_FILTER: &str = r#"
    WHERE (? IS NULL OR start_date >= ?)
      AND (? IS NULL OR end_date <= ?)
      AND (? IS NULL
           OR LOWER(event_name) LIKE LOWER(?) ESCAPE '!'
           OR (content IS NOT NULL AND LOWER(content) LIKE LOWER(?) ESCAPE '!'))
"#;

const UPDATE_EVENT: &str = r#"
    UPDATE events SET
        event_name = COALESCE(?, event_name),
        content = CASE WHEN ? THEN ? ELSE content END,
        start_date = COALESCE(?, start_date),
        end_date = COALESCE(?, end_date),
        updated_at = ?
    WHERE id = ?
"#;

/// Bind values for [`EVENT_FILTER`]
struct FilterValues {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    pattern: Option<String>,
}

impl From<&EventFilter> for FilterValues {
    fn from(filter: &EventFilter) -> Self {
        Self {
            from: filter.from,
            to: filter.to,
            pattern: normalize_search(filter.keyword.as_deref()).map(|t| like_pattern(&t)),
        }
    }
}

/// Page window appended to the filtered query
#[derive(Clone, Copy)]
struct Window {
    limit: i64,
    offset: i64,
}

#[async_trait]
impl EventRepository for SqlxEventRepository {
    async fn create(&self, input: &CreateEventInput, created_by: i64) -> Result<Event> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_event_sqlite(pool, input, created_by).await,
            Backend::Mysql(pool) => create_event_mysql(pool, input, created_by).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_event_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_event_by_id_mysql(pool, id).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateEventInput) -> Result<Option<Event>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => update_event_sqlite(pool, id, input).await?,
            Backend::Mysql(pool) => update_event_mysql(pool, id, input).await?,
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
            Backend::Sqlite(pool) => delete_event_sqlite(pool, id).await?,
            Backend::Mysql(pool) => delete_event_mysql(pool, id).await?,
        };
        Ok(affected > 0)
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let values = FilterValues::from(filter);
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_events_sqlite(pool, &values, None).await,
            Backend::Mysql(pool) => list_events_mysql(pool, &values, None).await,
        }
    }

    async fn list_paged(
        &self,
        filter: &EventFilter,
        params: &ListParams,
    ) -> Result<(Vec<Event>, i64)> {
        let values = FilterValues::from(filter);
        let window = Window {
            limit: params.limit(),
            offset: params.offset(),
        };
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let total = count_filtered_sqlite(pool, &values).await?;
                let items = list_events_sqlite(pool, &values, Some(window)).await?;
                Ok((items, total))
            }
            Backend::Mysql(pool) => {
                let total = count_filtered_mysql(pool, &values).await?;
                let items = list_events_mysql(pool, &values, Some(window)).await?;
                Ok((items, total))
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let values = FilterValues::from(&EventFilter::default());
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_filtered_sqlite(pool, &values).await,
            Backend::Mysql(pool) => count_filtered_mysql(pool, &values).await,
        }
    }
}

fn listing_sql(window: Option<Window>) -> String {
    let mut sql = format!("{}{} ORDER BY start_date DESC, id DESC", SELECT_EVENT, EVENT_FILTER);
    if window.is_some() {
        sql.push_str(" LIMIT ? OFFSET ?");
    }
    sql
}

fn event_from_input(id: i64, input: &CreateEventInput, created_by: i64) -> Event {
    Event {
        id,
        event_name: input.event_name.clone(),
        content: input.content.clone(),
        start_date: input.start_date,
        end_date: input.end_date,
        created_at: Utc::now(),
        updated_at: None,
        created_by,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_event_sqlite(
    pool: &SqlitePool,
    input: &CreateEventInput,
    created_by: i64,
) -> Result<Event> {
    let event = event_from_input(0, input, created_by);

    let result = sqlx::query(
        r#"
        INSERT INTO events (event_name, content, start_date, end_date, created_at, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.event_name)
    .bind(&event.content)
    .bind(event.start_date)
    .bind(event.end_date)
    .bind(event.created_at)
    .bind(event.created_by)
    .execute(pool)
    .await
    .context("Failed to create event")?;

    Ok(Event {
        id: result.last_insert_rowid(),
        ..event
    })
}

async fn get_event_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Event>> {
    let sql = format!("{} WHERE id = ?", SELECT_EVENT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get event by ID")?;

    Ok(row.map(|row| row_to_event_sqlite(&row)))
}

async fn update_event_sqlite(pool: &SqlitePool, id: i64, input: &UpdateEventInput) -> Result<u64> {
    let result = sqlx::query(UPDATE_EVENT)
        .bind(input.event_name.as_deref())
        .bind(input.content.is_some())
        .bind(input.content.clone().flatten())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update event")?;
    Ok(result.rows_affected())
}

async fn delete_event_sqlite(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete event")?;
    Ok(result.rows_affected())
}

async fn list_events_sqlite(
    pool: &SqlitePool,
    values: &FilterValues,
    window: Option<Window>,
) -> Result<Vec<Event>> {
    let sql = listing_sql(window);
    let pattern = values.pattern.as_deref();
    let mut query = sqlx::query(&sql)
        .bind(values.from)
        .bind(values.from)
        .bind(values.to)
        .bind(values.to)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern);
    if let Some(window) = window {
        query = query.bind(window.limit).bind(window.offset);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list events")?;

    Ok(rows.iter().map(row_to_event_sqlite).collect())
}

async fn count_filtered_sqlite(pool: &SqlitePool, values: &FilterValues) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM events {}", EVENT_FILTER);
    let pattern = values.pattern.as_deref();
    let row = sqlx::query(&sql)
        .bind(values.from)
        .bind(values.from)
        .bind(values.to)
        .bind(values.to)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count events")?;
    Ok(row.get("count"))
}

fn row_to_event_sqlite(row: &sqlx::sqlite::SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        event_name: row.get("event_name"),
        content: row.get("content"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_event_mysql(
    pool: &MySqlPool,
    input: &CreateEventInput,
    created_by: i64,
) -> Result<Event> {
    let event = event_from_input(0, input, created_by);

    let result = sqlx::query(
        r#"
        INSERT INTO events (event_name, content, start_date, end_date, created_at, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.event_name)
    .bind(&event.content)
    .bind(event.start_date)
    .bind(event.end_date)
    .bind(event.created_at)
    .bind(event.created_by)
    .execute(pool)
    .await
    .context("Failed to create event")?;

    Ok(Event {
        id: result.last_insert_id() as i64,
        ..event
    })
}

async fn get_event_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Event>> {
    let sql = format!("{} WHERE id = ?", SELECT_EVENT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get event by ID")?;

    Ok(row.map(|row| row_to_event_mysql(&row)))
}

async fn update_event_mysql(pool: &MySqlPool, id: i64, input: &UpdateEventInput) -> Result<u64> {
    let result = sqlx::query(UPDATE_EVENT)
        .bind(input.event_name.as_deref())
        .bind(input.content.is_some())
        .bind(input.content.clone().flatten())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update event")?;
    Ok(result.rows_affected())
}

async fn delete_event_mysql(pool: &MySqlPool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete event")?;
    Ok(result.rows_affected())
}

async fn list_events_mysql(
    pool: &MySqlPool,
    values: &FilterValues,
    window: Option<Window>,
) -> Result<Vec<Event>> {
    let sql = listing_sql(window);
    let pattern = values.pattern.as_deref();
    let mut query = sqlx::query(&sql)
        .bind(values.from)
        .bind(values.from)
        .bind(values.to)
        .bind(values.to)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern);
    if let Some(window) = window {
        query = query.bind(window.limit).bind(window.offset);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list events")?;

    Ok(rows.iter().map(row_to_event_mysql).collect())
}

async fn count_filtered_mysql(pool: &MySqlPool, values: &FilterValues) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM events {}", EVENT_FILTER);
    let pattern = values.pattern.as_deref();
    let row = sqlx::query(&sql)
        .bind(values.from)
        .bind(values.from)
        .bind(values.to)
        .bind(values.to)
        .bind(pattern)
        .bind(pattern)
        .bind(pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count events")?;
    Ok(row.get("count"))
}

fn row_to_event_mysql(row: &sqlx::mysql::MySqlRow) -> Event {
    Event {
        id: row.get("id"),
        event_name: row.get("event_name"),
        content: row.get("content"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_user, test_pool};
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 9, 0, 0).unwrap()
    }

    fn input(name: &str, content: Option<&str>, start: u32, end: u32) -> CreateEventInput {
        CreateEventInput {
            event_name: name.to_string(),
            content: content.map(str::to_string),
            start_date: day(start),
            end_date: day(end),
        }
    }

    async fn setup() -> (SqlxEventRepository, i64) {
        let pool = test_pool().await;
        let user = seed_user(&pool, "events@lumina.dev").await;
        let repo = SqlxEventRepository::new(pool);
        repo.create(&input("Spring Sale", Some("Discount on IELTS"), 1, 5), user)
            .await
            .unwrap();
        repo.create(&input("Mock Test Week", None, 10, 15), user)
            .await
            .unwrap();
        repo.create(&input("Speaking Club", Some("Weekly practice"), 20, 25), user)
            .await
            .unwrap();
        (repo, user)
    }

    #[tokio::test]
    async fn test_list_orders_by_start_desc() {
        let (repo, _) = setup().await;
        let names: Vec<_> = repo
            .list(&EventFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event_name)
            .collect();
        assert_eq!(names, vec!["Speaking Club", "Mock Test Week", "Spring Sale"]);
    }

    #[tokio::test]
    async fn test_list_filters_by_range_and_keyword() {
        let (repo, _) = setup().await;

        let window = EventFilter {
            from: Some(day(2)),
            to: Some(day(16)),
            keyword: None,
        };
        let found = repo.list(&window).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_name, "Mock Test Week");

        let by_content = EventFilter {
            keyword: Some("ielts".into()),
            ..Default::default()
        };
        assert_eq!(repo.list(&by_content).await.unwrap()[0].event_name, "Spring Sale");

        let by_name = EventFilter {
            keyword: Some("mock".into()),
            ..Default::default()
        };
        assert_eq!(repo.list(&by_name).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_paged() {
        let (repo, _) = setup().await;
        let (items, total) = repo
            .list_paged(&EventFilter::default(), &ListParams::new(2, 2))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].event_name, "Spring Sale");
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_and_hard_delete() {
        let (repo, user) = setup().await;
        let created = repo
            .create(&input("Temp", Some("x"), 1, 2), user)
            .await
            .unwrap();

        let update = UpdateEventInput {
            content: Some(None),
            end_date: Some(day(3) + Duration::hours(1)),
            ..Default::default()
        };
        let updated = repo.update(created.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.content, None);
        assert_eq!(updated.event_name, "Temp");
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.end_date, day(3) + Duration::hours(1));
        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap(), updated);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(0).await.unwrap());
        assert!(repo.update(created.id, &update).await.unwrap().is_none());
    }
}
