//! Unit of work
//!
//! Groups the repositories that take part in multi-step writes and hands out
//! transactions over the shared pool. Repository methods ending in `_in`
//! accept a `&mut DbTransaction` so several of them can commit together.

use anyhow::{Context, Result};
use sqlx::{MySql, Sqlite, Transaction};
use std::sync::Arc;

use super::repositories::{
    ArticleCategoryRepository, ArticleProgressRepository, ArticleRepository,
    SqlxArticleCategoryRepository, SqlxArticleProgressRepository, SqlxArticleRepository,
    SqlxUserRepository, SqlxVocabularyListRepository, SqlxVocabularyRepository, UserRepository,
    VocabularyListRepository, VocabularyRepository,
};
use super::{Backend, DynDatabasePool};

/// An open transaction on either backend.
///
/// Dropping it without calling [`commit`](Self::commit) rolls back.
pub enum DbTransaction {
    Sqlite(Transaction<'static, Sqlite>),
    Mysql(Transaction<'static, MySql>),
}

impl DbTransaction {
    /// Begin a transaction on the given pool
    pub async fn begin(pool: &DynDatabasePool) -> Result<Self> {
        match pool.backend() {
            Backend::Sqlite(pool) => Ok(Self::Sqlite(
                pool.begin().await.context("Failed to begin transaction")?,
            )),
            Backend::Mysql(pool) => Ok(Self::Mysql(
                pool.begin().await.context("Failed to begin transaction")?,
            )),
        }
    }

    pub async fn commit(self) -> Result<()> {
        match self {
            Self::Sqlite(tx) => tx.commit().await,
            Self::Mysql(tx) => tx.commit().await,
        }
        .context("Failed to commit transaction")
    }

    pub async fn rollback(self) -> Result<()> {
        match self {
            Self::Sqlite(tx) => tx.rollback().await,
            Self::Mysql(tx) => tx.rollback().await,
        }
        .context("Failed to roll back transaction")
    }
}

/// Repositories sharing one pool, plus transaction boundaries.
#[derive(Clone)]
pub struct UnitOfWork {
    pool: DynDatabasePool,
    pub articles: Arc<dyn ArticleRepository>,
    pub categories: Arc<dyn ArticleCategoryRepository>,
    pub article_progress: Arc<dyn ArticleProgressRepository>,
    pub vocabularies: Arc<dyn VocabularyRepository>,
    pub vocabulary_lists: Arc<dyn VocabularyListRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl UnitOfWork {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            articles: SqlxArticleRepository::boxed(pool.clone()),
            categories: SqlxArticleCategoryRepository::boxed(pool.clone()),
            article_progress: SqlxArticleProgressRepository::boxed(pool.clone()),
            vocabularies: SqlxVocabularyRepository::boxed(pool.clone()),
            vocabulary_lists: SqlxVocabularyListRepository::boxed(pool.clone()),
            users: SqlxUserRepository::boxed(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DynDatabasePool {
        &self.pool
    }

    /// Begin a transaction that `_in` repository methods can join
    pub async fn begin(&self) -> Result<DbTransaction> {
        DbTransaction::begin(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_category, seed_user};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, ContentStatus, NewSection};

    async fn setup() -> UnitOfWork {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        UnitOfWork::new(pool)
    }

    fn draft(category_id: i64, user_id: i64) -> Article {
        Article::new(
            "Tenses".to_string(),
            "Present and past".to_string(),
            category_id,
            user_id,
            ContentStatus::Draft,
        )
    }

    #[tokio::test]
    async fn test_commit_persists_all_writes() {
        let uow = setup().await;
        let user = seed_user(uow.pool(), "author@lumina.dev").await;
        let category = seed_category(uow.pool(), "Grammar", user).await;

        let mut tx = uow.begin().await.expect("Failed to begin");
        let article = uow
            .articles
            .create_in(&mut tx, &draft(category, user))
            .await
            .expect("Failed to create article");
        uow.articles
            .add_sections_in(
                &mut tx,
                article.id,
                &[NewSection::new("Intro", "Hello", 0)],
            )
            .await
            .expect("Failed to add sections");
        tx.commit().await.expect("Failed to commit");

        let detail = uow
            .articles
            .get_detail(article.id)
            .await
            .expect("Failed to load")
            .expect("Article should exist");
        assert_eq!(detail.sections.len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_all_writes() {
        let uow = setup().await;
        let user = seed_user(uow.pool(), "author@lumina.dev").await;
        let category = seed_category(uow.pool(), "Grammar", user).await;

        let mut tx = uow.begin().await.expect("Failed to begin");
        let article = uow
            .articles
            .create_in(&mut tx, &draft(category, user))
            .await
            .expect("Failed to create article");
        tx.rollback().await.expect("Failed to roll back");

        assert!(uow.articles.get_by_id(article.id).await.unwrap().is_none());
        assert_eq!(uow.articles.count().await.unwrap(), 0);
    }
}
