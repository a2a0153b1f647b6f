//! Slide model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Deletable, DeletionPolicy};

/// A home-page banner slide
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    pub id: i64,
    pub slide_name: String,
    pub slide_url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: i64,
}

impl Deletable for Slide {
    const DELETION_POLICY: DeletionPolicy = DeletionPolicy::Hard;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlideInput {
    pub slide_name: String,
    pub slide_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSlideInput {
    pub slide_name: Option<String>,
    pub slide_url: Option<String>,
    pub is_active: Option<bool>,
}
