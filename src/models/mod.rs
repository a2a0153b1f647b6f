//! Data models
//!
//! Entities stored by the repositories, the explicit create/update commands
//! applied to them, and a few shared types:
//! - `DeletionPolicy` / `Deletable` declaring how each entity is removed
//! - `ContentStatus` / `ReviewDecision` for the approval workflow
//! - `ListParams` / `PagedResult` for paginated queries

pub mod article;
pub mod event;
pub mod exam;
pub mod exam_attempt;
pub mod leaderboard;
pub mod season_score;
pub mod session;
pub mod slide;
pub mod spaced_repetition;
pub mod user;
pub mod user_note;
pub mod vocabulary;

pub use article::*;
pub use event::*;
pub use exam::*;
pub use exam_attempt::*;
pub use leaderboard::*;
pub use season_score::*;
pub use session::*;
pub use slide::*;
pub use spaced_repetition::*;
pub use user::*;
pub use user_note::*;
pub use vocabulary::*;

use serde::{Deserialize, Serialize};

/// Identifiers are positive; anything else never reaches the database.
pub fn is_valid_id(id: i64) -> bool {
    id > 0
}

/// Serde helper telling an absent field apart from an explicit `null`
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// ============================================================================
// Deletion policy
// ============================================================================

/// How a delete request is carried out for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Flip the `is_deleted` flag; the row stays and is hidden from reads
    Soft,
    /// Remove the row
    Hard,
    /// Remove the row and its owned children in one transaction
    Cascade,
}

/// Entities that can be deleted declare their policy here.
pub trait Deletable {
    const DELETION_POLICY: DeletionPolicy;
}

// ============================================================================
// Approval workflow
// ============================================================================

/// Publication state shared by articles and vocabulary lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContentStatus {
    #[default]
    Draft,
    Pending,
    Published,
    Rejected,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "Draft",
            ContentStatus::Pending => "Pending",
            ContentStatus::Published => "Published",
            ContentStatus::Rejected => "Rejected",
        }
    }

    /// Parse the stored representation (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Some(ContentStatus::Draft),
            "pending" => Some(ContentStatus::Pending),
            "published" => Some(ContentStatus::Published),
            "rejected" => Some(ContentStatus::Rejected),
            _ => None,
        }
    }

    /// Only drafts and rejected content can be submitted for review.
    pub fn can_request_approval(&self) -> bool {
        matches!(self, ContentStatus::Draft | ContentStatus::Rejected)
    }

    pub fn can_be_reviewed(&self) -> bool {
        matches!(self, ContentStatus::Pending)
    }

    /// Status reached after a review decision
    pub fn after_review(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => ContentStatus::Published,
            ReviewDecision::Reject => ContentStatus::Rejected,
        }
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer verdict on pending content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Review request body: a decision plus an optional comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

// ============================================================================
// Pagination
// ============================================================================

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64).div_ceil(self.per_page as u64)) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Convert the items while keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
