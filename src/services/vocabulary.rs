//! Vocabulary service
//!
//! Word entries belong to an existing (not deleted) vocabulary list.
//! Deletion is soft.

use crate::db::repositories::{VocabularyListRepository, VocabularyRepository};
use crate::models::{CreateVocabularyInput, ListWordCount, UpdateVocabularyInput, Vocabulary};
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

pub struct VocabularyService {
    repo: Arc<dyn VocabularyRepository>,
    lists: Arc<dyn VocabularyListRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Vocabulary not found.".to_string())
}

impl VocabularyService {
    pub fn new(
        repo: Arc<dyn VocabularyRepository>,
        lists: Arc<dyn VocabularyListRepository>,
    ) -> Self {
        Self { repo, lists }
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Vocabulary> {
        require_id(id, "vocabularyId")?;
        self.repo.get_by_id(id).await?.ok_or_else(not_found)
    }

    /// Entries of one list (or of all lists) matching an optional search term
    pub async fn get_by_list(
        &self,
        list_id: Option<i64>,
        search: Option<&str>,
    ) -> ServiceResult<Vec<Vocabulary>> {
        if let Some(list_id) = list_id {
            require_id(list_id, "listId")?;
        }
        Ok(self.repo.get_by_list(list_id, search).await?)
    }

    /// Broader search that also covers examples, word types and categories
    pub async fn search(
        &self,
        term: Option<&str>,
        list_id: Option<i64>,
    ) -> ServiceResult<Vec<Vocabulary>> {
        if let Some(list_id) = list_id {
            require_id(list_id, "listId")?;
        }
        Ok(self.repo.search(term, list_id).await?)
    }

    pub async fn get_by_type(&self, type_of_word: &str) -> ServiceResult<Vec<Vocabulary>> {
        require_text(type_of_word, "Word type")?;
        Ok(self.repo.get_by_type(type_of_word.trim()).await?)
    }

    pub async fn get_by_category(&self, category: &str) -> ServiceResult<Vec<Vocabulary>> {
        require_text(category, "Category")?;
        Ok(self.repo.get_by_category(category.trim()).await?)
    }

    pub async fn categories(&self) -> ServiceResult<Vec<String>> {
        Ok(self.repo.get_distinct_categories().await?)
    }

    pub async fn counts_by_list(&self) -> ServiceResult<Vec<ListWordCount>> {
        Ok(self.repo.get_counts_by_list().await?)
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.repo.count().await?)
    }

    pub async fn create(&self, input: CreateVocabularyInput) -> ServiceResult<Vocabulary> {
        require_id(input.list_id, "listId")?;
        require_text(&input.word, "Word")?;
        require_text(&input.definition, "Definition")?;
        require_text(&input.type_of_word, "Word type")?;
        self.ensure_list_exists(input.list_id).await?;

        let vocabulary = self.repo.create(&input).await?;
        tracing::debug!("Created vocabulary {} in list {}", vocabulary.id, vocabulary.list_id);
        Ok(vocabulary)
    }

    pub async fn update(&self, id: i64, input: UpdateVocabularyInput) -> ServiceResult<Vocabulary> {
        require_id(id, "vocabularyId")?;
        if !input.has_changes() {
            return Err(ServiceError::Validation("No changes supplied.".to_string()));
        }
        if let Some(word) = &input.word {
            require_text(word, "Word")?;
        }
        if let Some(definition) = &input.definition {
            require_text(definition, "Definition")?;
        }
        if let Some(list_id) = input.list_id {
            require_id(list_id, "listId")?;
            self.ensure_list_exists(list_id).await?;
        }

        self.repo.update(id, &input).await?.ok_or_else(not_found)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        require_id(id, "vocabularyId")?;
        if !self.repo.delete(id).await? {
            return Err(not_found());
        }
        Ok(())
    }

    async fn ensure_list_exists(&self, list_id: i64) -> ServiceResult<()> {
        if self.lists.get_by_id(list_id).await?.is_none() {
            return Err(ServiceError::NotFound(
                "Vocabulary list not found.".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_list, seed_user, seed_word, test_pool};
    use crate::db::repositories::{SqlxVocabularyListRepository, SqlxVocabularyRepository};
    use crate::db::DynDatabasePool;

    async fn setup() -> (DynDatabasePool, VocabularyService, i64) {
        let pool = test_pool().await;
        let user = seed_user(&pool, "tutor@lumina.dev").await;
        let list = seed_list(&pool, "Travel", user).await;
        let service = VocabularyService::new(
            SqlxVocabularyRepository::boxed(pool.clone()),
            SqlxVocabularyListRepository::boxed(pool.clone()),
        );
        (pool, service, list)
    }

    #[tokio::test]
    async fn test_create_requires_existing_list() {
        let (_pool, service, list) = setup().await;

        let created = service
            .create(CreateVocabularyInput::new(list, "ticket", "a pass", "noun"))
            .await
            .unwrap();
        assert_eq!(created.list_id, list);

        let err = service
            .create(CreateVocabularyInput::new(999, "ticket", "a pass", "noun"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service
            .create(CreateVocabularyInput::new(list, " ", "a pass", "noun"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_is_soft_and_reports_missing() {
        let (pool, service, list) = setup().await;
        let id = seed_word(&pool, list, "airport").await;
        seed_word(&pool, list, "luggage").await;

        assert_eq!(service.count().await.unwrap(), 2);
        service.delete(id).await.unwrap();
        assert_eq!(service.count().await.unwrap(), 1);
        assert!(matches!(service.get_by_id(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service.delete(-1).await,
            Err(ServiceError::InvalidId("vocabularyId"))
        ));
    }

    #[tokio::test]
    async fn test_update_validates_command() {
        let (pool, service, list) = setup().await;
        let id = seed_word(&pool, list, "airport").await;

        let err = service
            .update(id, UpdateVocabularyInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let updated = service
            .update(
                id,
                UpdateVocabularyInput {
                    category: Some(Some("Travel".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category.as_deref(), Some("Travel"));
        assert_eq!(service.categories().await.unwrap(), vec!["Travel".to_string()]);

        let err = service
            .update(
                id,
                UpdateVocabularyInput {
                    list_id: Some(404),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_rejects_invalid_list_id() {
        let (pool, service, list) = setup().await;
        seed_word(&pool, list, "airport").await;

        assert!(matches!(
            service.get_by_list(Some(0), None).await,
            Err(ServiceError::InvalidId("listId"))
        ));
        assert_eq!(service.get_by_list(Some(list), Some("air")).await.unwrap().len(), 1);
        assert_eq!(service.get_by_type("noun").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_internal() {
        let (pool, service, _list) = setup().await;
        pool.close().await;
        assert!(matches!(service.count().await, Err(ServiceError::Internal(_))));
    }
}
