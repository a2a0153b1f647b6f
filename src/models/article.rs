//! Article model
//!
//! This module provides:
//! - `Article` entity and its owned `ArticleSection` rows
//! - `ArticleCategory`
//! - Create / update commands and the `ArticleQuery` filter used by listings
//! - `ArticleProgress`, a reader's position in an article

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentStatus, Deletable, DeletionPolicy};

/// Upper bound of `progress_percent`
pub const MAX_PROGRESS_PERCENT: i32 = 100;

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub category_id: i64,
    /// Creator user id
    pub created_by: i64,
    /// Last editor, if the article was ever updated
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub status: ContentStatus,
    pub rejection_reason: Option<String>,
}

impl Deletable for Article {
    const DELETION_POLICY: DeletionPolicy = DeletionPolicy::Cascade;
}

impl Article {
    /// Create a new article; `Published` also marks it as published
    pub fn new(
        title: String,
        summary: String,
        category_id: i64,
        created_by: i64,
        status: ContentStatus,
    ) -> Self {
        Self {
            id: 0, // Will be set by database
            title,
            summary,
            category_id,
            created_by,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: None,
            is_published: status == ContentStatus::Published,
            status,
            rejection_reason: None,
        }
    }
}

/// A titled block of article content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSection {
    pub id: i64,
    pub article_id: i64,
    pub section_title: String,
    pub section_content: String,
    pub order_index: i32,
}

/// A section to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSection {
    pub section_title: String,
    pub section_content: String,
    pub order_index: i32,
}

impl NewSection {
    pub fn new(title: &str, content: &str, order_index: i32) -> Self {
        Self {
            section_title: title.to_string(),
            section_content: content.to_string(),
            order_index,
        }
    }
}

/// Article category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleCategory {
    pub id: i64,
    /// Category name (unique)
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: i64,
}

impl Deletable for ArticleCategory {
    const DELETION_POLICY: DeletionPolicy = DeletionPolicy::Hard;
}

/// Input for creating an article category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleCategoryInput {
    pub name: String,
}

/// Article row joined with display names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub article: Article,
    pub category_name: String,
    pub author_name: String,
}

/// Article with its ordered sections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub summary: ArticleSummary,
    pub sections: Vec<ArticleSection>,
}

/// Input for creating an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub title: String,
    pub summary: String,
    pub category_id: i64,
    /// Publish immediately instead of saving a draft
    #[serde(default)]
    pub publish_now: bool,
    #[serde(default)]
    pub sections: Vec<NewSection>,
}

/// Editor-facing field changes for an article.
///
/// When `sections` is present the whole section set is replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub category_id: Option<i64>,
    pub sections: Option<Vec<NewSection>>,
}

/// Column changes written by the repository
#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub category_id: Option<i64>,
    pub status: Option<ContentStatus>,
    pub is_published: Option<bool>,
    pub rejection_reason: Option<Option<String>>,
    pub updated_by: Option<i64>,
}

impl ArticleChanges {
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.summary.is_some()
            || self.category_id.is_some()
            || self.status.is_some()
            || self.is_published.is_some()
            || self.rejection_reason.is_some()
            || self.updated_by.is_some()
    }
}

/// Sortable article columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArticleSort {
    Title,
    Category,
    #[default]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Filters for the article listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleQuery {
    /// Case-insensitive match on title, summary or any section content
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub is_published: Option<bool>,
    pub status: Option<ContentStatus>,
    pub created_by: Option<i64>,
    #[serde(default)]
    pub sort_by: ArticleSort,
    #[serde(default)]
    pub sort_dir: SortDirection,
}

impl ArticleQuery {
    /// Narrow the query to what anonymous readers may see
    pub fn published_only(mut self) -> Self {
        self.is_published = Some(true);
        self.status = Some(ContentStatus::Published);
        self
    }
}

/// Body of the toggle-hide request
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToggleHideInput {
    pub is_published: bool,
}

// ============================================================================
// Reading progress
// ============================================================================

/// How far a user has got through an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's progress through one article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleProgress {
    pub article_id: i64,
    pub user_id: i64,
    pub progress_percent: i32,
    pub status: ProgressStatus,
    pub last_accessed_at: DateTime<Utc>,
    /// Set the first time the article is completed; cleared if reopened
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for saving reading progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveProgressInput {
    pub progress_percent: i32,
    #[serde(default)]
    pub status: ProgressStatus,
}

impl SaveProgressInput {
    /// Progress of a finished article
    pub fn done() -> Self {
        Self {
            progress_percent: MAX_PROGRESS_PERCENT,
            status: ProgressStatus::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_article_publication_flag_follows_status() {
        let draft = Article::new("a".into(), "b".into(), 1, 1, ContentStatus::Draft);
        assert!(!draft.is_published);
        assert_eq!(draft.id, 0);

        let published = Article::new("a".into(), "b".into(), 1, 1, ContentStatus::Published);
        assert!(published.is_published);
    }

    #[test]
    fn test_query_defaults_sort_newest_first() {
        let query: ArticleQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.sort_by, ArticleSort::CreatedAt);
        assert_eq!(query.sort_dir, SortDirection::Desc);
    }

    #[test]
    fn test_published_only_overrides_filters() {
        let query = ArticleQuery {
            is_published: Some(false),
            status: Some(ContentStatus::Draft),
            ..Default::default()
        }
        .published_only();
        assert_eq!(query.is_published, Some(true));
        assert_eq!(query.status, Some(ContentStatus::Published));
    }

    #[test]
    fn test_progress_status_wire_names() {
        let input: SaveProgressInput =
            serde_json::from_str(r#"{"progress_percent": 40, "status": "in_progress"}"#).unwrap();
        assert_eq!(input.status, ProgressStatus::InProgress);
        assert_eq!(ProgressStatus::parse("completed"), Some(ProgressStatus::Completed));
        assert_eq!(ProgressStatus::parse("done"), None);
        assert_eq!(SaveProgressInput::done().progress_percent, 100);
    }
}
