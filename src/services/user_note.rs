//! User note service
//!
//! One note per user and article section. The section must belong to the
//! article the note is filed under.

use crate::db::repositories::{ArticleRepository, UserNoteRepository};
use crate::models::{UpsertUserNoteInput, UserNote};
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

pub struct UserNoteService {
    repo: Arc<dyn UserNoteRepository>,
    articles: Arc<dyn ArticleRepository>,
}

impl UserNoteService {
    pub fn new(repo: Arc<dyn UserNoteRepository>, articles: Arc<dyn ArticleRepository>) -> Self {
        Self { repo, articles }
    }

    /// A note, visible only to its owner
    pub async fn get_by_id(&self, id: i64, user_id: i64) -> ServiceResult<UserNote> {
        require_id(id, "noteId")?;
        let note = self
            .repo
            .get_by_id(id)
            .await?
            .filter(|note| note.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound("Note not found.".to_string()))?;
        Ok(note)
    }

    pub async fn list_by_user(&self, user_id: i64) -> ServiceResult<Vec<UserNote>> {
        require_id(user_id, "userId")?;
        Ok(self.repo.list_by_user(user_id).await?)
    }

    /// Create the note for a section, or replace its content
    pub async fn upsert(&self, user_id: i64, input: UpsertUserNoteInput) -> ServiceResult<UserNote> {
        require_id(user_id, "userId")?;
        require_id(input.article_id, "articleId")?;
        require_id(input.section_id, "sectionId")?;
        require_text(&input.note_content, "Note content")?;

        let sections = self.articles.get_sections(input.article_id).await?;
        if !sections.iter().any(|s| s.id == input.section_id) {
            return Err(ServiceError::NotFound(
                "Section not found in this article.".to_string(),
            ));
        }

        let note = self
            .repo
            .upsert(user_id, input.article_id, input.section_id, &input.note_content)
            .await?;
        tracing::debug!("Saved note {} for user {}", note.id, user_id);
        Ok(note)
    }
}
