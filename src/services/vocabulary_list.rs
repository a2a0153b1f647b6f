//! Vocabulary list service
//!
//! Lists are owned by their creator. Owners and staff may edit or delete a
//! list; reviewers (admins and managers) approve or reject lists submitted
//! for review.

use crate::db::repositories::VocabularyListRepository;
use crate::models::{
    ContentStatus, CreateVocabularyListInput, ReviewDecision, ReviewInput,
    UpdateVocabularyListInput, User, VocabularyList, VocabularyListChanges,
    VocabularyListSummary,
};
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

pub struct VocabularyListService {
    repo: Arc<dyn VocabularyListRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Vocabulary list not found.".to_string())
}

impl VocabularyListService {
    pub fn new(repo: Arc<dyn VocabularyListRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(
        &self,
        mut input: CreateVocabularyListInput,
        user: &User,
    ) -> ServiceResult<VocabularyList> {
        require_text(&input.name, "Name")?;
        input.name = input.name.trim().to_string();

        let list = self.repo.create(&input, user.id).await?;
        tracing::info!("User {} created vocabulary list {}", user.id, list.id);
        Ok(list)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<VocabularyListSummary> {
        require_id(id, "listId")?;
        self.repo.get_summary(id).await?.ok_or_else(not_found)
    }

    /// Staff see every list; everyone else sees their own lists and staff lists
    pub async fn list(
        &self,
        user: &User,
        search: Option<&str>,
    ) -> ServiceResult<Vec<VocabularyListSummary>> {
        let lists = if user.is_staff() {
            self.repo.get_all(search).await?
        } else {
            self.repo.get_my_and_staff_lists(user.id, search).await?
        };
        Ok(lists)
    }

    pub async fn get_published(
        &self,
        search: Option<&str>,
    ) -> ServiceResult<Vec<VocabularyListSummary>> {
        Ok(self.repo.get_published(search).await?)
    }

    pub async fn get_mine(
        &self,
        user: &User,
        search: Option<&str>,
    ) -> ServiceResult<Vec<VocabularyListSummary>> {
        Ok(self.repo.get_by_user(user.id, search).await?)
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.repo.count().await?)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateVocabularyListInput,
        user: &User,
    ) -> ServiceResult<VocabularyList> {
        require_id(id, "listId")?;
        if input.name.is_none() && input.is_public.is_none() {
            return Err(ServiceError::Validation("No changes supplied.".to_string()));
        }
        if let Some(name) = &input.name {
            require_text(name, "Name")?;
        }
        let list = self.load_editable(id, user).await?;

        let mut changes = VocabularyListChanges::from(input);
        changes.name = changes.name.map(|name| name.trim().to_string());
        changes.updated_by = Some(user.id);

        self.repo
            .update(list.id, &changes)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn delete(&self, id: i64, user: &User) -> ServiceResult<()> {
        require_id(id, "listId")?;
        let list = self.load_editable(id, user).await?;

        if !self.repo.delete(list.id).await? {
            return Err(not_found());
        }
        tracing::info!("User {} deleted vocabulary list {}", user.id, id);
        Ok(())
    }

    /// Submit a draft or rejected list for review
    pub async fn request_approval(&self, id: i64, user: &User) -> ServiceResult<VocabularyList> {
        require_id(id, "listId")?;
        let list = self.load_editable(id, user).await?;

        let status = list.effective_status();
        if !status.can_request_approval() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot request approval for a list in {} status.",
                status
            )));
        }

        let changes = VocabularyListChanges {
            status: Some(ContentStatus::Pending),
            updated_by: Some(user.id),
            ..Default::default()
        };
        self.repo.update(id, &changes).await?.ok_or_else(not_found)
    }

    /// Approve or reject a pending list
    pub async fn review(
        &self,
        id: i64,
        input: ReviewInput,
        reviewer: &User,
    ) -> ServiceResult<VocabularyList> {
        require_id(id, "listId")?;
        if !reviewer.can_review() {
            return Err(ServiceError::Forbidden(
                "Only admins and managers can review vocabulary lists.".to_string(),
            ));
        }
        let list = self.repo.get_by_id(id).await?.ok_or_else(not_found)?;

        let status = list.effective_status();
        if !status.can_be_reviewed() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot review a list in {} status.",
                status
            )));
        }

        let rejection_reason = match input.decision {
            ReviewDecision::Approve => None,
            ReviewDecision::Reject => input.comment,
        };
        let changes = VocabularyListChanges {
            status: Some(ContentStatus::after_review(input.decision)),
            rejection_reason: Some(rejection_reason),
            updated_by: Some(reviewer.id),
            ..Default::default()
        };

        let reviewed = self.repo.update(id, &changes).await?.ok_or_else(not_found)?;
        tracing::info!(
            "Vocabulary list {} reviewed by {}: {}",
            id,
            reviewer.id,
            reviewed.effective_status()
        );
        Ok(reviewed)
    }

    async fn load_editable(&self, id: i64, user: &User) -> ServiceResult<VocabularyList> {
        let list = self.repo.get_by_id(id).await?.ok_or_else(not_found)?;
        if list.make_by != user.id && !user.is_staff() {
            return Err(ServiceError::Forbidden(
                "You can only modify your own vocabulary lists.".to_string(),
            ));
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{seed_user_with_role, test_pool};
    use crate::db::repositories::{SqlxUserRepository, SqlxVocabularyListRepository, UserRepository};
    use crate::db::DynDatabasePool;
    use crate::models::UserRole;

    async fn user(pool: &DynDatabasePool, email: &str, role: UserRole) -> User {
        let id = seed_user_with_role(pool, email, role).await;
        SqlxUserRepository::new(pool.clone())
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
    }

    fn input(name: &str) -> CreateVocabularyListInput {
        CreateVocabularyListInput {
            name: name.to_string(),
            is_public: true,
        }
    }

    #[tokio::test]
    async fn test_approval_workflow() {
        let pool = test_pool().await;
        let service = VocabularyListService::new(SqlxVocabularyListRepository::boxed(pool.clone()));
        let owner = user(&pool, "owner@lumina.dev", UserRole::Customer).await;
        let manager = user(&pool, "manager@lumina.dev", UserRole::Manager).await;

        let list = service.create(input("  Travel "), &owner).await.unwrap();
        assert_eq!(list.name, "Travel");
        assert_eq!(list.effective_status(), ContentStatus::Draft);

        let review = ReviewInput {
            decision: ReviewDecision::Approve,
            comment: None,
        };
        let err = service.review(list.id, review.clone(), &manager).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let pending = service.request_approval(list.id, &owner).await.unwrap();
        assert_eq!(pending.effective_status(), ContentStatus::Pending);
        assert_eq!(pending.updated_by, Some(owner.id));

        let err = service.request_approval(list.id, &owner).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let err = service.review(list.id, review.clone(), &owner).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let rejected = service
            .review(
                list.id,
                ReviewInput {
                    decision: ReviewDecision::Reject,
                    comment: Some("Too short".into()),
                },
                &manager,
            )
            .await
            .unwrap();
        assert_eq!(rejected.effective_status(), ContentStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Too short"));

        service.request_approval(list.id, &owner).await.unwrap();
        let published = service.review(list.id, review, &manager).await.unwrap();
        assert_eq!(published.effective_status(), ContentStatus::Published);
        assert!(published.rejection_reason.is_none());

        let visible = service.get_published(None).await.unwrap();
        assert_eq!(visible.len(), 1);
    }

    #[tokio::test]
    async fn test_only_owner_or_staff_can_modify() {
        let pool = test_pool().await;
        let service = VocabularyListService::new(SqlxVocabularyListRepository::boxed(pool.clone()));
        let owner = user(&pool, "owner@lumina.dev", UserRole::Customer).await;
        let other = user(&pool, "other@lumina.dev", UserRole::Customer).await;
        let staff = user(&pool, "staff@lumina.dev", UserRole::Staff).await;

        let list = service.create(input("Food"), &owner).await.unwrap();
        let rename = UpdateVocabularyListInput {
            name: Some("Cooking".into()),
            is_public: None,
        };

        let err = service.update(list.id, rename.clone(), &other).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let updated = service.update(list.id, rename, &staff).await.unwrap();
        assert_eq!(updated.name, "Cooking");
        assert_eq!(updated.updated_by, Some(staff.id));

        let err = service.delete(list.id, &other).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        service.delete(list.id, &owner).await.unwrap();
        assert!(matches!(
            service.get_by_id(list.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_scope_depends_on_role() {
        let pool = test_pool().await;
        let service = VocabularyListService::new(SqlxVocabularyListRepository::boxed(pool.clone()));
        let alice = user(&pool, "alice@lumina.dev", UserRole::Customer).await;
        let bob = user(&pool, "bob@lumina.dev", UserRole::Customer).await;
        let staff = user(&pool, "staff@lumina.dev", UserRole::Staff).await;

        service.create(input("Alice words"), &alice).await.unwrap();
        service.create(input("Bob words"), &bob).await.unwrap();
        service.create(input("Staff words"), &staff).await.unwrap();

        assert_eq!(service.list(&staff, None).await.unwrap().len(), 3);

        let visible: Vec<String> = service
            .list(&alice, None)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.list.name)
            .collect();
        assert_eq!(visible.len(), 2);
        assert!(visible.contains(&"Alice words".to_string()));
        assert!(visible.contains(&"Staff words".to_string()));

        assert_eq!(service.get_mine(&bob, None).await.unwrap().len(), 1);
    }
}
