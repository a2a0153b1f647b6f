//! Event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Deletable, DeletionPolicy};

/// A promotional event with a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub event_name: String,
    pub content: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: i64,
}

impl Deletable for Event {
    const DELETION_POLICY: DeletionPolicy = DeletionPolicy::Hard;
}

/// Optional filters for listing events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Events starting at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Events ending at or before this instant
    pub to: Option<DateTime<Utc>>,
    /// Matches the name, or the content when it is set
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventInput {
    pub event_name: String,
    #[serde(default)]
    pub content: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventInput {
    pub event_name: Option<String>,
    #[serde(default, with = "crate::models::double_option")]
    pub content: Option<Option<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
