//! Services layer - Business logic
//!
//! One service per feature area. Services validate ids and inputs, call the
//! repositories (through the unit of work where several writes must commit
//! together) and return a [`ServiceResult`]. Persistence failures are never
//! folded into `None`/`false`; they travel as [`ServiceError::Internal`].

pub mod article;
pub mod article_category;
pub mod event;
pub mod exam;
pub mod exam_attempt;
pub mod leaderboard;
pub mod password;
pub mod slide;
pub mod spaced_repetition;
pub mod user;
pub mod user_note;
pub mod vocabulary;
pub mod vocabulary_list;

pub use article::ArticleService;
pub use article_category::ArticleCategoryService;
pub use event::EventService;
pub use exam::ExamService;
pub use exam_attempt::ExamAttemptService;
pub use leaderboard::LeaderboardService;
pub use slide::SlideService;
pub use spaced_repetition::SpacedRepetitionService;
pub use user::UserService;
pub use user_note::UserNoteService;
pub use vocabulary::VocabularyService;
pub use vocabulary_list::VocabularyListService;

use std::sync::Arc;

use crate::cache::SharedCache;
use crate::db::repositories::{
    SqlxEventRepository, SqlxExamAttemptRepository, SqlxExamRepository,
    SqlxLeaderboardRepository, SqlxSessionRepository, SqlxSlideRepository,
    SqlxSpacedRepetitionRepository, SqlxUserNoteRepository,
};
use crate::db::{DynDatabasePool, UnitOfWork};
use crate::models::is_valid_id;

/// Error returned by every service operation
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// An id parameter was zero or negative
    #[error("Invalid {0}.")]
    InvalidId(&'static str),

    #[error("{0}")]
    Validation(String),

    /// The requested workflow transition is not allowed from the current state
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// Credentials or session token were not accepted
    #[error("{0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Reject ids that can never exist
pub(crate) fn require_id(id: i64, field: &'static str) -> ServiceResult<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ServiceError::InvalidId(field))
    }
}

/// Reject blank text
pub(crate) fn require_text(value: &str, field: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} is required.", field)));
    }
    Ok(())
}

/// Every service, wired over one pool and one cache
#[derive(Clone)]
pub struct Services {
    pub users: Arc<UserService>,
    pub vocabularies: Arc<VocabularyService>,
    pub vocabulary_lists: Arc<VocabularyListService>,
    pub articles: Arc<ArticleService>,
    pub article_categories: Arc<ArticleCategoryService>,
    pub events: Arc<EventService>,
    pub slides: Arc<SlideService>,
    pub user_notes: Arc<UserNoteService>,
    pub spaced_repetitions: Arc<SpacedRepetitionService>,
    pub leaderboards: Arc<LeaderboardService>,
    pub exams: Arc<ExamService>,
    pub exam_attempts: Arc<ExamAttemptService>,
}

impl Services {
    pub fn new(pool: DynDatabasePool, cache: SharedCache, session_days: i64) -> Self {
        let uow = UnitOfWork::new(pool.clone());
        let exam_repo = SqlxExamRepository::boxed(pool.clone());

        Self {
            users: Arc::new(UserService::with_session_days(
                uow.users.clone(),
                SqlxSessionRepository::boxed(pool.clone()),
                session_days,
            )),
            vocabularies: Arc::new(VocabularyService::new(
                uow.vocabularies.clone(),
                uow.vocabulary_lists.clone(),
            )),
            vocabulary_lists: Arc::new(VocabularyListService::new(uow.vocabulary_lists.clone())),
            article_categories: Arc::new(ArticleCategoryService::new(
                uow.categories.clone(),
                cache.clone(),
            )),
            user_notes: Arc::new(UserNoteService::new(
                SqlxUserNoteRepository::boxed(pool.clone()),
                uow.articles.clone(),
            )),
            spaced_repetitions: Arc::new(SpacedRepetitionService::new(
                SqlxSpacedRepetitionRepository::boxed(pool.clone()),
                uow.vocabulary_lists.clone(),
                uow.vocabularies.clone(),
            )),
            articles: Arc::new(ArticleService::new(uow)),
            events: Arc::new(EventService::new(SqlxEventRepository::boxed(pool.clone()))),
            slides: Arc::new(SlideService::new(SqlxSlideRepository::boxed(pool.clone()))),
            leaderboards: Arc::new(LeaderboardService::new(
                SqlxLeaderboardRepository::boxed(pool.clone()),
                SqlxExamAttemptRepository::boxed(pool.clone()),
            )),
            exams: Arc::new(ExamService::new(exam_repo.clone(), cache)),
            exam_attempts: Arc::new(ExamAttemptService::new(
                SqlxExamAttemptRepository::boxed(pool),
                exam_repo,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id_message_names_the_field() {
        let err = require_id(0, "vocabularyId").unwrap_err();
        assert_eq!(err.to_string(), "Invalid vocabularyId.");
        assert!(require_id(7, "vocabularyId").is_ok());
    }

    #[test]
    fn test_require_text_rejects_blank() {
        assert!(matches!(
            require_text("   ", "Word"),
            Err(ServiceError::Validation(msg)) if msg == "Word is required."
        ));
        assert!(require_text("apple", "Word").is_ok());
    }
}
