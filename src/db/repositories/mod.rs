//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the persistence of one entity (plus the rows it
//! owns) against either SQLite or MySQL.

pub mod article;
pub mod article_category;
pub mod article_progress;
pub mod event;
pub mod exam;
pub mod exam_attempt;
pub mod leaderboard;
pub mod session;
pub mod slide;
pub mod spaced_repetition;
pub mod user;
pub mod user_note;
pub mod vocabulary;
pub mod vocabulary_list;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use article_category::{ArticleCategoryRepository, SqlxArticleCategoryRepository};
pub use article_progress::{ArticleProgressRepository, SqlxArticleProgressRepository};
pub use event::{EventRepository, SqlxEventRepository};
pub use exam::{ExamRepository, SqlxExamRepository};
pub use exam_attempt::{ExamAttemptRepository, SqlxExamAttemptRepository};
pub use leaderboard::{LeaderboardRepository, SqlxLeaderboardRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use slide::{SlideRepository, SqlxSlideRepository};
pub use spaced_repetition::{SpacedRepetitionRepository, SqlxSpacedRepetitionRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use user_note::{SqlxUserNoteRepository, UserNoteRepository};
pub use vocabulary::{SqlxVocabularyRepository, VocabularyRepository};
pub use vocabulary_list::{SqlxVocabularyListRepository, VocabularyListRepository};

/// Trim a search term; blank terms mean "no filter"
pub(crate) fn normalize_search(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

/// Escape character used by every `LIKE ... ESCAPE '!'` clause
pub(crate) const LIKE_ESCAPE: char = '!';

/// `%term%` pattern for `LOWER(col) LIKE LOWER(?) ESCAPE '!'` matching.
/// Wildcards in the term match literally.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if ch == LIKE_ESCAPE || ch == '%' || ch == '_' {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Fixtures shared by repository, service and API tests
#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::db::DbTransaction;
    use crate::models::{
        Article, ArticleCategory, ContentStatus, CreateUserInput, CreateVocabularyInput,
        CreateVocabularyListInput, UserRole,
    };

    /// In-memory SQLite pool with the full schema
    pub async fn test_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    pub async fn seed_user_with_role(pool: &DynDatabasePool, email: &str, role: UserRole) -> i64 {
        let input = CreateUserInput {
            email: email.to_string(),
            full_name: format!("User {}", email),
            role,
            avatar_url: None,
            password: String::new(),
        };
        SqlxUserRepository::new(pool.clone())
            .create(&input, "")
            .await
            .expect("Failed to seed user")
            .id
    }

    pub async fn seed_user(pool: &DynDatabasePool, email: &str) -> i64 {
        seed_user_with_role(pool, email, UserRole::Staff).await
    }

    pub async fn seed_category(pool: &DynDatabasePool, name: &str, user_id: i64) -> i64 {
        let category = ArticleCategory {
            id: 0,
            name: name.to_string(),
            created_at: chrono::Utc::now(),
            created_by: user_id,
        };
        SqlxArticleCategoryRepository::new(pool.clone())
            .create(&category)
            .await
            .expect("Failed to seed category")
            .id
    }

    /// Article in `status` under `category_id`, without sections
    pub async fn seed_article_in(
        pool: &DynDatabasePool,
        category_id: i64,
        user_id: i64,
        status: ContentStatus,
    ) -> i64 {
        let article = Article::new("Seeded".to_string(), String::new(), category_id, user_id, status);
        let mut tx = DbTransaction::begin(pool).await.expect("Failed to begin");
        let created = SqlxArticleRepository::new(pool.clone())
            .create_in(&mut tx, &article)
            .await
            .expect("Failed to seed article");
        tx.commit().await.expect("Failed to commit");
        created.id
    }

    /// Published article in a fresh category
    pub async fn seed_article(pool: &DynDatabasePool, user_id: i64) -> i64 {
        let count = SqlxArticleRepository::new(pool.clone())
            .count()
            .await
            .expect("Failed to count articles");
        let category = seed_category(pool, &format!("Category {}", count + 1), user_id).await;
        seed_article_in(pool, category, user_id, ContentStatus::Published).await
    }

    pub async fn seed_list(pool: &DynDatabasePool, name: &str, user_id: i64) -> i64 {
        let input = CreateVocabularyListInput {
            name: name.to_string(),
            is_public: false,
        };
        SqlxVocabularyListRepository::new(pool.clone())
            .create(&input, user_id)
            .await
            .expect("Failed to seed vocabulary list")
            .id
    }

    pub async fn seed_word(pool: &DynDatabasePool, list_id: i64, word: &str) -> i64 {
        let input = CreateVocabularyInput::new(list_id, word, &format!("meaning of {}", word), "noun");
        SqlxVocabularyRepository::new(pool.clone())
            .create(&input)
            .await
            .expect("Failed to seed vocabulary")
            .id
    }
}
