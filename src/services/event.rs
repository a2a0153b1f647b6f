//! Event service

use crate::db::repositories::EventRepository;
use crate::models::{CreateEventInput, Event, EventFilter, ListParams, PagedResult, UpdateEventInput};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

pub struct EventService {
    repo: Arc<dyn EventRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Event not found.".to_string())
}

fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> ServiceResult<()> {
    if end < start {
        return Err(ServiceError::Validation(
            "End date must not be before start date.".to_string(),
        ));
    }
    Ok(())
}

impl EventService {
    pub fn new(repo: Arc<dyn EventRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Event> {
        require_id(id, "eventId")?;
        self.repo.get_by_id(id).await?.ok_or_else(not_found)
    }

    pub async fn list(&self, filter: &EventFilter) -> ServiceResult<Vec<Event>> {
        Ok(self.repo.list(filter).await?)
    }

    pub async fn list_paged(
        &self,
        filter: &EventFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<Event>> {
        let (items, total) = self.repo.list_paged(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn create(&self, input: CreateEventInput, created_by: i64) -> ServiceResult<Event> {
        require_text(&input.event_name, "Event name")?;
        check_range(input.start_date, input.end_date)?;

        let event = self.repo.create(&input, created_by).await?;
        tracing::info!("Created event {} ({})", event.id, event.event_name);
        Ok(event)
    }

    /// Apply changes; the resulting date range must stay ordered
    pub async fn update(&self, id: i64, input: UpdateEventInput) -> ServiceResult<Event> {
        require_id(id, "eventId")?;
        if let Some(name) = &input.event_name {
            require_text(name, "Event name")?;
        }
        let current = self.repo.get_by_id(id).await?.ok_or_else(not_found)?;
        check_range(
            input.start_date.unwrap_or(current.start_date),
            input.end_date.unwrap_or(current.end_date),
        )?;

        self.repo.update(id, &input).await?.ok_or_else(not_found)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        require_id(id, "eventId")?;
        if !self.repo.delete(id).await? {
            return Err(not_found());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_user, test_pool};
    use crate::db::repositories::SqlxEventRepository;
    use chrono::{Duration, TimeZone};

    fn input(name: &str, start_day: u32, end_day: u32) -> CreateEventInput {
        CreateEventInput {
            event_name: name.to_string(),
            content: None,
            start_date: Utc.with_ymd_and_hms(2026, 3, start_day, 9, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 3, end_day, 17, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_and_update_keep_dates_ordered() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "events@lumina.dev").await;
        let service = EventService::new(SqlxEventRepository::boxed(pool));

        let err = service.create(input("Backwards", 10, 5), user).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let event = service.create(input("Spring camp", 5, 10), user).await.unwrap();

        let err = service
            .update(
                event.id,
                UpdateEventInput {
                    end_date: Some(event.start_date - Duration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let updated = service
            .update(
                event.id,
                UpdateEventInput {
                    content: Some(Some("Bring a notebook".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.content.as_deref(), Some("Bring a notebook"));
    }

    #[tokio::test]
    async fn test_delete_and_paging() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "events@lumina.dev").await;
        let service = EventService::new(SqlxEventRepository::boxed(pool));

        let first = service.create(input("One", 1, 2), user).await.unwrap();
        service.create(input("Two", 3, 4), user).await.unwrap();

        let page = service
            .list_paged(&EventFilter::default(), &ListParams::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].event_name, "Two");

        service.delete(first.id).await.unwrap();
        assert!(matches!(service.get_by_id(first.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(0).await, Err(ServiceError::InvalidId("eventId"))));
    }
}
