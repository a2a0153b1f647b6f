//! Article category service
//!
//! The category list is read on almost every article screen, so it is kept
//! in the shared cache and dropped whenever a category is added.

use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::ArticleCategoryRepository;
use crate::models::{ArticleCategory, CreateArticleCategoryInput};
use chrono::Utc;
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

const CACHE_KEY_ALL: &str = "article-categories:all";

pub struct ArticleCategoryService {
    repo: Arc<dyn ArticleCategoryRepository>,
    cache: SharedCache,
}

impl ArticleCategoryService {
    pub fn new(repo: Arc<dyn ArticleCategoryRepository>, cache: SharedCache) -> Self {
        Self { repo, cache }
    }

    /// All categories ordered by name
    pub async fn list(&self) -> ServiceResult<Vec<ArticleCategory>> {
        let cached: anyhow::Result<Option<Vec<ArticleCategory>>> =
            self.cache.get(CACHE_KEY_ALL).await;
        match cached {
            Ok(Some(categories)) => return Ok(categories),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unreadable category cache entry: {}", e),
        }

        let categories = self.repo.list().await?;
        if let Err(e) = self.cache.set_default(CACHE_KEY_ALL, &categories).await {
            tracing::warn!("Failed to cache article categories: {}", e);
        }
        Ok(categories)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<ArticleCategory> {
        require_id(id, "categoryId")?;
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found.".to_string()))
    }

    pub async fn create(
        &self,
        input: CreateArticleCategoryInput,
        created_by: i64,
    ) -> ServiceResult<ArticleCategory> {
        require_text(&input.name, "Name")?;
        let name = input.name.trim().to_string();
        if self.repo.exists_by_name(&name).await? {
            return Err(ServiceError::Validation(format!(
                "Category '{}' already exists.",
                name
            )));
        }

        let category = ArticleCategory {
            id: 0,
            name,
            created_at: Utc::now(),
            created_by,
        };
        let created = self.repo.create(&category).await?;
        self.cache.delete(CACHE_KEY_ALL).await?;

        tracing::info!("Created article category {} ({})", created.id, created.name);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::test_support::{seed_category, seed_user, test_pool};
    use crate::db::repositories::SqlxArticleCategoryRepository;

    fn input(name: &str) -> CreateArticleCategoryInput {
        CreateArticleCategoryInput {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_is_cached_until_create() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "editor@lumina.dev").await;
        let service = ArticleCategoryService::new(
            SqlxArticleCategoryRepository::boxed(pool.clone()),
            Arc::new(MemoryCache::new()),
        );

        service.create(input("Grammar"), user).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        // Written behind the service's back: the cached list is still served
        seed_category(&pool, "Listening", user).await;
        assert_eq!(service.list().await.unwrap().len(), 1);

        service.create(input("Reading"), user).await.unwrap();
        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Grammar", "Listening", "Reading"]);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_blank_names() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "editor@lumina.dev").await;
        let service = ArticleCategoryService::new(
            SqlxArticleCategoryRepository::boxed(pool),
            Arc::new(MemoryCache::new()),
        );

        service.create(input("Grammar"), user).await.unwrap();
        let err = service.create(input(" grammar "), user).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service.create(input(""), user).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
