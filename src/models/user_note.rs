//! User note model
//!
//! A note is keyed by (user, article, section); saving twice for the same
//! section updates the existing note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNote {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub section_id: i64,
    pub note_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of a note save request; the user comes from the request identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUserNoteInput {
    pub article_id: i64,
    pub section_id: i64,
    pub note_content: String,
}
