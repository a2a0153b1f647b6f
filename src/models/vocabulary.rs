//! Vocabulary models
//!
//! - `Vocabulary`: a word entry that belongs to a list
//! - `VocabularyList`: a named collection owned by a user, going through the
//!   approval workflow before it becomes public
//!
//! Both are soft-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentStatus, Deletable, DeletionPolicy};

/// A vocabulary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub id: i64,
    pub list_id: i64,
    pub word: String,
    pub definition: String,
    /// Part of speech
    pub type_of_word: String,
    pub category: Option<String>,
    pub example: Option<String>,
    pub is_deleted: bool,
}

impl Deletable for Vocabulary {
    const DELETION_POLICY: DeletionPolicy = DeletionPolicy::Soft;
}

/// Input for creating a vocabulary entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVocabularyInput {
    pub list_id: i64,
    pub word: String,
    pub definition: String,
    pub type_of_word: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

impl CreateVocabularyInput {
    pub fn new(list_id: i64, word: &str, definition: &str, type_of_word: &str) -> Self {
        Self {
            list_id,
            word: word.to_string(),
            definition: definition.to_string(),
            type_of_word: type_of_word.to_string(),
            category: None,
            example: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }
}

/// Field changes for a vocabulary entry.
///
/// `None` leaves a field untouched; for nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVocabularyInput {
    pub list_id: Option<i64>,
    pub word: Option<String>,
    pub definition: Option<String>,
    pub type_of_word: Option<String>,
    #[serde(default, with = "crate::models::double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, with = "crate::models::double_option")]
    pub example: Option<Option<String>>,
}

impl UpdateVocabularyInput {
    pub fn has_changes(&self) -> bool {
        self.list_id.is_some()
            || self.word.is_some()
            || self.definition.is_some()
            || self.type_of_word.is_some()
            || self.category.is_some()
            || self.example.is_some()
    }
}

/// Number of active entries per list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListWordCount {
    pub list_id: i64,
    pub count: i64,
}

/// A vocabulary list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyList {
    pub id: i64,
    pub name: String,
    /// Creator user id
    pub make_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<i64>,
    pub is_public: bool,
    pub status: Option<ContentStatus>,
    pub rejection_reason: Option<String>,
    pub is_deleted: bool,
}

impl Deletable for VocabularyList {
    const DELETION_POLICY: DeletionPolicy = DeletionPolicy::Soft;
}

impl VocabularyList {
    /// Lists without a status predate the workflow and count as drafts.
    pub fn effective_status(&self) -> ContentStatus {
        self.status.unwrap_or_default()
    }
}

/// A list together with its creator name and word count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyListSummary {
    pub list: VocabularyList,
    pub maker_name: Option<String>,
    pub word_count: i64,
}

/// Input for creating a vocabulary list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVocabularyListInput {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

/// Field changes for a vocabulary list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVocabularyListInput {
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

/// Workflow and audit changes applied by the list service
#[derive(Debug, Clone, Default)]
pub struct VocabularyListChanges {
    pub name: Option<String>,
    pub is_public: Option<bool>,
    pub status: Option<ContentStatus>,
    pub rejection_reason: Option<Option<String>>,
    pub updated_by: Option<i64>,
}

impl From<UpdateVocabularyListInput> for VocabularyListChanges {
    fn from(input: UpdateVocabularyListInput) -> Self {
        Self {
            name: input.name,
            is_public: input.is_public,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_distinguishes_null_from_absent() {
        let input: UpdateVocabularyInput =
            serde_json::from_str(r#"{"word": "Hi", "category": null}"#).unwrap();
        assert_eq!(input.word.as_deref(), Some("Hi"));
        assert_eq!(input.category, Some(None));
        assert_eq!(input.example, None);
        assert!(input.has_changes());

        let empty: UpdateVocabularyInput = serde_json::from_str("{}").unwrap();
        assert!(!empty.has_changes());
    }

    #[test]
    fn test_effective_status_defaults_to_draft() {
        let list = VocabularyList {
            id: 1,
            name: "Basics".into(),
            make_by: 1,
            created_at: Utc::now(),
            updated_at: None,
            updated_by: None,
            is_public: false,
            status: None,
            rejection_reason: None,
            is_deleted: false,
        };
        assert_eq!(list.effective_status(), ContentStatus::Draft);
    }
}
