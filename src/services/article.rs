//! Article service
//!
//! Articles and their sections are written through the unit of work so an
//! article never exists without the sections it was created with. Every
//! lookup that precedes a write runs before the transaction is opened.

use crate::db::{DbTransaction, UnitOfWork};
use crate::models::{
    Article, ArticleChanges, ArticleDetail, ArticleProgress, ArticleQuery, ArticleSection,
    ArticleSummary, ContentStatus, CreateArticleInput, ListParams, NewSection, PagedResult,
    ReviewDecision, ReviewInput, SaveProgressInput, UpdateArticleInput, User, UserRole,
    MAX_PROGRESS_PERCENT,
};
use anyhow::Result;
use chrono::Utc;

use super::{require_id, require_text, ServiceError, ServiceResult};

pub struct ArticleService {
    uow: UnitOfWork,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Article not found.".to_string())
}

/// Commit on success; otherwise roll back and hand back the original error
async fn finish<T>(tx: DbTransaction, result: Result<T>, article_id: Option<i64>) -> ServiceResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(
                    "Failed to roll back article write ({:?}): {}",
                    article_id,
                    rollback_err
                );
            }
            Err(e.into())
        }
    }
}

impl ArticleService {
    pub fn new(uow: UnitOfWork) -> Self {
        Self { uow }
    }

    /// Public detail; unpublished and hidden articles read as missing
    pub async fn get_detail(&self, id: i64) -> ServiceResult<ArticleDetail> {
        let detail = self.get_detail_for_manager(id).await?;
        if !detail.summary.article.is_published {
            return Err(not_found());
        }
        Ok(detail)
    }

    /// Detail regardless of workflow status or visibility
    pub async fn get_detail_for_manager(&self, id: i64) -> ServiceResult<ArticleDetail> {
        require_id(id, "articleId")?;
        self.uow.articles.get_detail(id).await?.ok_or_else(not_found)
    }

    pub async fn list_all(&self) -> ServiceResult<Vec<ArticleSummary>> {
        Ok(self.uow.articles.list_all().await?)
    }

    pub async fn query(
        &self,
        query: &ArticleQuery,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<ArticleSummary>> {
        let (items, total) = self.uow.articles.query(query, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Listing as seen by `viewer`; anyone but staff sees published articles only
    pub async fn query_visible(
        &self,
        query: ArticleQuery,
        params: &ListParams,
        viewer: Option<&User>,
    ) -> ServiceResult<PagedResult<ArticleSummary>> {
        let query = match viewer {
            Some(user) if user.is_staff() => query,
            _ => query.published_only(),
        };
        self.query(&query, params).await
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.uow.articles.count().await?)
    }

    /// Create an article with its sections in one transaction
    pub async fn create(&self, input: CreateArticleInput, author_id: i64) -> ServiceResult<ArticleDetail> {
        require_id(author_id, "userId")?;
        require_id(input.category_id, "categoryId")?;
        require_text(&input.title, "Title")?;
        self.ensure_category_exists(input.category_id).await?;
        if self.uow.users.get_by_id(author_id).await?.is_none() {
            return Err(ServiceError::NotFound("User not found.".to_string()));
        }

        let status = if input.publish_now {
            ContentStatus::Published
        } else {
            ContentStatus::Draft
        };
        let article = Article::new(
            input.title.trim().to_string(),
            input.summary,
            input.category_id,
            author_id,
            status,
        );

        let mut tx = self.uow.begin().await?;
        let result = self.insert_with_sections(&mut tx, &article, &input.sections).await;
        let created = finish(tx, result, None).await?;

        tracing::info!(
            "Created article {} ({}) with {} sections",
            created.id,
            created.status,
            input.sections.len()
        );
        self.get_detail_for_manager(created.id).await
    }

    /// Apply editor changes, replacing the sections when they are supplied
    pub async fn update(
        &self,
        id: i64,
        input: UpdateArticleInput,
        editor: &User,
    ) -> ServiceResult<ArticleDetail> {
        require_id(id, "articleId")?;
        if let Some(title) = &input.title {
            require_text(title, "Title")?;
        }
        let article = self.load_editable(id, editor).await?;
        if let Some(category_id) = input.category_id {
            require_id(category_id, "categoryId")?;
            self.ensure_category_exists(category_id).await?;
        }

        let mut changes = ArticleChanges {
            title: input.title.map(|t| t.trim().to_string()),
            summary: input.summary,
            category_id: input.category_id,
            updated_by: Some(editor.id),
            ..Default::default()
        };
        if editor.role == UserRole::Staff && article.status == ContentStatus::Published {
            changes.status = Some(ContentStatus::Pending);
            changes.is_published = Some(false);
        }

        let mut tx = self.uow.begin().await?;
        let result = self
            .apply_update(&mut tx, id, &changes, input.sections.as_deref())
            .await;
        finish(tx, result, Some(id)).await?;

        tracing::debug!("Article {} updated by {}", id, editor.id);
        self.get_detail_for_manager(id).await
    }

    /// Replace the section set of an article
    pub async fn update_sections(
        &self,
        id: i64,
        sections: Vec<NewSection>,
        editor: &User,
    ) -> ServiceResult<Vec<ArticleSection>> {
        require_id(id, "articleId")?;
        self.load_editable(id, editor).await?;
        Ok(self.uow.articles.update_sections(id, &sections).await?)
    }

    /// Delete an article together with its sections
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        require_id(id, "articleId")?;
        if !self.uow.articles.delete(id).await? {
            return Err(not_found());
        }
        tracing::info!("Deleted article {}", id);
        Ok(())
    }

    /// Submit a draft or rejected article for review
    pub async fn request_approval(&self, id: i64, user: &User) -> ServiceResult<Article> {
        require_id(id, "articleId")?;
        let article = self.load_editable(id, user).await?;
        if !article.status.can_request_approval() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot request approval for an article in {} status.",
                article.status
            )));
        }

        let changes = ArticleChanges {
            status: Some(ContentStatus::Pending),
            is_published: Some(false),
            updated_by: Some(user.id),
            ..Default::default()
        };
        self.uow.articles.update(id, &changes).await?.ok_or_else(not_found)
    }

    /// Approve or reject a pending article
    pub async fn review(&self, id: i64, input: ReviewInput, reviewer: &User) -> ServiceResult<Article> {
        require_id(id, "articleId")?;
        if !reviewer.can_review() {
            return Err(ServiceError::Forbidden(
                "Only admins and managers can review articles.".to_string(),
            ));
        }
        let article = self.uow.articles.get_by_id(id).await?.ok_or_else(not_found)?;
        if !article.status.can_be_reviewed() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot review an article in {} status.",
                article.status
            )));
        }

        let reason = match input.decision {
            ReviewDecision::Approve => None,
            ReviewDecision::Reject => input.comment,
        };
        let reviewed = self
            .uow
            .articles
            .set_status(id, ContentStatus::after_review(input.decision), reason, reviewer.id)
            .await?
            .ok_or_else(not_found)?;

        tracing::info!("Article {} reviewed by {}: {}", id, reviewer.id, reviewed.status);
        Ok(reviewed)
    }

    /// Show or hide a published article without touching its workflow status
    pub async fn toggle_hide(&self, id: i64, is_published: bool, reviewer: &User) -> ServiceResult<Article> {
        require_id(id, "articleId")?;
        if !reviewer.can_review() {
            return Err(ServiceError::Forbidden(
                "Only admins and managers can hide articles.".to_string(),
            ));
        }
        let article = self.uow.articles.get_by_id(id).await?.ok_or_else(not_found)?;
        if article.status != ContentStatus::Published {
            return Err(ServiceError::InvalidState(format!(
                "Only published articles can be hidden or shown, not {}.",
                article.status
            )));
        }

        let changes = ArticleChanges {
            is_published: Some(is_published),
            updated_by: Some(reviewer.id),
            ..Default::default()
        };
        let updated = self.uow.articles.update(id, &changes).await?.ok_or_else(not_found)?;
        tracing::info!(
            "Article {} visibility set to {} by {}",
            id,
            is_published,
            reviewer.id
        );
        Ok(updated)
    }

    /// Record how far `user_id` has read an article
    pub async fn save_progress(
        &self,
        user_id: i64,
        article_id: i64,
        input: SaveProgressInput,
    ) -> ServiceResult<ArticleProgress> {
        require_id(user_id, "userId")?;
        require_id(article_id, "articleId")?;
        if !(0..=MAX_PROGRESS_PERCENT).contains(&input.progress_percent) {
            return Err(ServiceError::Validation(format!(
                "Progress must be between 0 and {}.",
                MAX_PROGRESS_PERCENT
            )));
        }
        if self.uow.articles.get_by_id(article_id).await?.is_none() {
            return Err(not_found());
        }

        let progress = self
            .uow
            .article_progress
            .upsert(user_id, article_id, input.progress_percent, input.status, Utc::now())
            .await?;
        tracing::debug!(
            "User {} at {}% of article {} ({})",
            user_id,
            progress.progress_percent,
            article_id,
            progress.status
        );
        Ok(progress)
    }

    /// Progress of `user_id` for the requested articles
    pub async fn progress_for(&self, user_id: i64, article_ids: &[i64]) -> ServiceResult<Vec<ArticleProgress>> {
        require_id(user_id, "userId")?;
        if article_ids.is_empty() {
            return Err(ServiceError::Validation("articleIds parameter is required.".to_string()));
        }
        Ok(self.uow.article_progress.list_for_articles(user_id, article_ids).await?)
    }

    /// Mark an article as fully read
    pub async fn mark_as_done(&self, user_id: i64, article_id: i64) -> ServiceResult<ArticleProgress> {
        self.save_progress(user_id, article_id, SaveProgressInput::done()).await
    }

    async fn insert_with_sections(
        &self,
        tx: &mut DbTransaction,
        article: &Article,
        sections: &[NewSection],
    ) -> Result<Article> {
        let created = self.uow.articles.create_in(tx, article).await?;
        if !sections.is_empty() {
            self.uow.articles.add_sections_in(tx, created.id, sections).await?;
        }
        Ok(created)
    }

    async fn apply_update(
        &self,
        tx: &mut DbTransaction,
        id: i64,
        changes: &ArticleChanges,
        sections: Option<&[NewSection]>,
    ) -> Result<()> {
        self.uow.articles.update_in(tx, id, changes).await?;
        if let Some(sections) = sections {
            self.uow.articles.replace_sections_in(tx, id, sections).await?;
        }
        Ok(())
    }

    async fn ensure_category_exists(&self, category_id: i64) -> ServiceResult<()> {
        if self.uow.categories.get_by_id(category_id).await?.is_none() {
            return Err(ServiceError::NotFound("Category not found.".to_string()));
        }
        Ok(())
    }

    /// Authors may edit their own articles; staff may edit any
    async fn load_editable(&self, id: i64, user: &User) -> ServiceResult<Article> {
        let article = self.uow.articles.get_by_id(id).await?.ok_or_else(not_found)?;
        if article.created_by != user.id && !user.is_staff() {
            return Err(ServiceError::Forbidden(
                "You can only modify your own articles.".to_string(),
            ));
        }
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_category, seed_user_with_role, test_pool};
    use crate::models::ProgressStatus;

    struct Fixture {
        service: ArticleService,
        uow: UnitOfWork,
        category: i64,
    }

    async fn setup() -> Fixture {
        let pool = test_pool().await;
        let uow = UnitOfWork::new(pool.clone());
        let admin = seed_user_with_role(&pool, "admin@lumina.dev", UserRole::Admin).await;
        let category = seed_category(&pool, "Grammar", admin).await;
        Fixture {
            service: ArticleService::new(uow.clone()),
            uow,
            category,
        }
    }

    async fn user(fx: &Fixture, email: &str, role: UserRole) -> User {
        let id = seed_user_with_role(fx.uow.pool(), email, role).await;
        fx.uow.users.get_by_id(id).await.unwrap().unwrap()
    }

    fn input(category_id: i64, publish_now: bool, sections: Vec<NewSection>) -> CreateArticleInput {
        CreateArticleInput {
            title: " Tenses ".to_string(),
            summary: "Present and past".to_string(),
            category_id,
            publish_now,
            sections,
        }
    }

    #[tokio::test]
    async fn test_create_with_sections() {
        let fx = setup().await;
        let author = user(&fx, "author@lumina.dev", UserRole::Staff).await;

        let detail = fx
            .service
            .create(
                input(
                    fx.category,
                    true,
                    vec![NewSection::new("Past", "was", 1), NewSection::new("Intro", "is", 0)],
                ),
                author.id,
            )
            .await
            .unwrap();

        let article = &detail.summary.article;
        assert_eq!(article.title, "Tenses");
        assert_eq!(article.status, ContentStatus::Published);
        assert!(article.is_published);
        assert_eq!(detail.summary.category_name, "Grammar");
        let titles: Vec<&str> = detail.sections.iter().map(|s| s.section_title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Past"]);
    }

    #[tokio::test]
    async fn test_create_validates_references() {
        let fx = setup().await;
        let author = user(&fx, "author@lumina.dev", UserRole::Staff).await;

        let err = fx.service.create(input(999, false, vec![]), author.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = fx.service.create(input(fx.category, false, vec![]), 999).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let mut blank = input(fx.category, false, vec![]);
        blank.title = "  ".into();
        let err = fx.service.create(blank, author.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rolls_back_when_a_section_fails() {
        let fx = setup().await;
        let author = user(&fx, "author@lumina.dev", UserRole::Staff).await;

        let err = fx
            .service
            .create(
                input(
                    fx.category,
                    false,
                    vec![NewSection::new("Ok", "fine", 0), NewSection::new("Bad", "order", -1)],
                ),
                author.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert_eq!(fx.service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_staff_edit_of_published_article_returns_to_pending() {
        let fx = setup().await;
        let staff = user(&fx, "staff@lumina.dev", UserRole::Staff).await;
        let manager = user(&fx, "manager@lumina.dev", UserRole::Manager).await;

        let created = fx
            .service
            .create(input(fx.category, true, vec![NewSection::new("Intro", "is", 0)]), staff.id)
            .await
            .unwrap();
        let id = created.summary.article.id;

        let update = UpdateArticleInput {
            title: Some("Verb tenses".into()),
            sections: Some(vec![NewSection::new("Only", "one", 0), NewSection::new("Two", "two", 1)]),
            ..Default::default()
        };
        let detail = fx.service.update(id, update, &staff).await.unwrap();
        assert_eq!(detail.summary.article.title, "Verb tenses");
        assert_eq!(detail.summary.article.status, ContentStatus::Pending);
        assert!(!detail.summary.article.is_published);
        assert_eq!(detail.summary.article.updated_by, Some(staff.id));
        assert_eq!(detail.sections.len(), 2);

        let approved = fx
            .service
            .review(
                id,
                ReviewInput {
                    decision: ReviewDecision::Approve,
                    comment: None,
                },
                &manager,
            )
            .await
            .unwrap();
        assert_eq!(approved.status, ContentStatus::Published);

        let update = UpdateArticleInput {
            summary: Some("Edited by a manager".into()),
            ..Default::default()
        };
        let detail = fx.service.update(id, update, &manager).await.unwrap();
        assert_eq!(detail.summary.article.status, ContentStatus::Published);
    }

    #[tokio::test]
    async fn test_review_workflow() {
        let fx = setup().await;
        let author = user(&fx, "author@lumina.dev", UserRole::Customer).await;
        let staff = user(&fx, "staff@lumina.dev", UserRole::Staff).await;
        let manager = user(&fx, "manager@lumina.dev", UserRole::Manager).await;
        let id = fx
            .service
            .create(input(fx.category, false, vec![]), author.id)
            .await
            .unwrap()
            .summary
            .article
            .id;

        let reject = ReviewInput {
            decision: ReviewDecision::Reject,
            comment: Some("Needs examples".into()),
        };
        let err = fx.service.review(id, reject.clone(), &manager).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let pending = fx.service.request_approval(id, &author).await.unwrap();
        assert_eq!(pending.status, ContentStatus::Pending);

        let err = fx.service.review(id, reject.clone(), &staff).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let rejected = fx.service.review(id, reject, &manager).await.unwrap();
        assert_eq!(rejected.status, ContentStatus::Rejected);
        assert!(!rejected.is_published);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Needs examples"));
    }

    #[tokio::test]
    async fn test_delete_and_paging() {
        let fx = setup().await;
        let author = user(&fx, "author@lumina.dev", UserRole::Staff).await;
        for _ in 0..3 {
            fx.service.create(input(fx.category, true, vec![]), author.id).await.unwrap();
        }

        let page = fx
            .service
            .query(&ArticleQuery::default(), &ListParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next());

        let id = page.items[0].article.id;
        fx.service.delete(id).await.unwrap();
        assert!(matches!(fx.service.delete(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            fx.service.get_detail(0).await,
            Err(ServiceError::InvalidId("articleId"))
        ));
    }

    #[tokio::test]
    async fn test_public_reads_hide_unpublished_articles() {
        let fx = setup().await;
        let author = user(&fx, "author@lumina.dev", UserRole::Customer).await;
        let staff = user(&fx, "staff@lumina.dev", UserRole::Staff).await;
        let draft = fx
            .service
            .create(input(fx.category, false, vec![]), author.id)
            .await
            .unwrap()
            .summary
            .article
            .id;

        assert!(matches!(fx.service.get_detail(draft).await, Err(ServiceError::NotFound(_))));
        let detail = fx.service.get_detail_for_manager(draft).await.unwrap();
        assert_eq!(detail.summary.article.status, ContentStatus::Draft);

        let asks_for_drafts = ArticleQuery {
            status: Some(ContentStatus::Draft),
            is_published: Some(false),
            ..Default::default()
        };
        let params = ListParams::new(1, 10);
        for viewer in [None, Some(&author)] {
            let page = fx
                .service
                .query_visible(asks_for_drafts.clone(), &params, viewer)
                .await
                .unwrap();
            assert_eq!(page.total, 0);
        }
        let page = fx
            .service
            .query_visible(asks_for_drafts, &params, Some(&staff))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_toggle_hide() {
        let fx = setup().await;
        let staff = user(&fx, "staff@lumina.dev", UserRole::Staff).await;
        let manager = user(&fx, "manager@lumina.dev", UserRole::Manager).await;
        let published = fx
            .service
            .create(input(fx.category, true, vec![]), staff.id)
            .await
            .unwrap()
            .summary
            .article
            .id;
        let draft = fx
            .service
            .create(input(fx.category, false, vec![]), staff.id)
            .await
            .unwrap()
            .summary
            .article
            .id;

        assert!(matches!(
            fx.service.toggle_hide(published, false, &staff).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            fx.service.toggle_hide(draft, true, &manager).await,
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            fx.service.toggle_hide(999, true, &manager).await,
            Err(ServiceError::NotFound(_))
        ));

        let hidden = fx.service.toggle_hide(published, false, &manager).await.unwrap();
        assert!(!hidden.is_published);
        assert_eq!(hidden.status, ContentStatus::Published);
        assert_eq!(hidden.updated_by, Some(manager.id));
        assert!(matches!(fx.service.get_detail(published).await, Err(ServiceError::NotFound(_))));

        let shown = fx.service.toggle_hide(published, true, &manager).await.unwrap();
        assert!(shown.is_published);
        assert!(fx.service.get_detail(published).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_progress_and_mark_as_done() {
        let fx = setup().await;
        let reader = user(&fx, "reader@lumina.dev", UserRole::Customer).await;
        let staff = user(&fx, "staff@lumina.dev", UserRole::Staff).await;
        let id = fx
            .service
            .create(input(fx.category, true, vec![]), staff.id)
            .await
            .unwrap()
            .summary
            .article
            .id;

        let halfway = SaveProgressInput {
            progress_percent: 50,
            status: ProgressStatus::InProgress,
        };
        let saved = fx.service.save_progress(reader.id, id, halfway.clone()).await.unwrap();
        assert_eq!(saved.progress_percent, 50);
        assert!(saved.completed_at.is_none());

        let done = fx.service.mark_as_done(reader.id, id).await.unwrap();
        assert_eq!(done.status, ProgressStatus::Completed);
        assert_eq!(done.progress_percent, 100);
        assert!(done.completed_at.is_some());

        let rows = fx.service.progress_for(reader.id, &[id]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ProgressStatus::Completed);

        let too_far = SaveProgressInput {
            progress_percent: 101,
            ..halfway.clone()
        };
        assert!(matches!(
            fx.service.save_progress(reader.id, id, too_far).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            fx.service.save_progress(reader.id, 999, halfway).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.progress_for(reader.id, &[]).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
