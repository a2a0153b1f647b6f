//! Spaced repetition model
//!
//! A repetition record tracks when a user should next revisit a vocabulary
//! list (list-level record, `vocabulary_id` is `None`) or a single word of
//! that list. Scheduling follows a simplified SM-2: the reviewer rates recall
//! from 0 to 5 and the interval in days grows or resets accordingly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Highest recall rating
pub const MAX_QUALITY: i32 = 5;
/// Interval a record starts with and falls back to after a failed review
pub const FIRST_INTERVAL_DAYS: i32 = 1;
/// Interval after the first successful follow-up review
pub const SECOND_INTERVAL_DAYS: i32 = 6;
/// Intervals at or above this many days count as mastered
pub const MASTERED_INTERVAL_DAYS: i32 = 30;
/// Intervals never exceed this many days
pub const MAX_INTERVAL_DAYS: i32 = 90;

/// Learning stage of a repetition record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepetitionStatus {
    #[default]
    New,
    Learning,
    Mastered,
}

impl RepetitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Learning => "Learning",
            Self::Mastered => "Mastered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "New" => Some(Self::New),
            "Learning" => Some(Self::Learning),
            "Mastered" => Some(Self::Mastered),
            _ => None,
        }
    }
}

impl std::fmt::Display for RepetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interval and stage chosen by a review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub intervals: i32,
    pub status: RepetitionStatus,
}

/// Next interval after a review rated `quality` (clamped to 0..=5).
///
/// - below 3: back to one day
/// - exactly 3: six days on the first follow-up, otherwise unchanged
/// - above 3: six days on the first follow-up, otherwise the interval grows
///   by half a step per point above 3, rounded up
pub fn schedule_review(quality: i32, intervals: i32, review_count: i32) -> Schedule {
    let quality = quality.clamp(0, MAX_QUALITY);
    let first_follow_up = review_count == 1 && intervals == FIRST_INTERVAL_DAYS;

    let (next, status) = if quality < 3 {
        let status = if review_count == 0 {
            RepetitionStatus::New
        } else {
            RepetitionStatus::Learning
        };
        (FIRST_INTERVAL_DAYS, status)
    } else if quality == 3 {
        let next = if first_follow_up { SECOND_INTERVAL_DAYS } else { intervals };
        (next, RepetitionStatus::Learning)
    } else {
        let next = if first_follow_up {
            SECOND_INTERVAL_DAYS
        } else {
            let factor = 1.0 + f64::from(quality - 3) * 0.5;
            (f64::from(intervals) * factor).ceil() as i32
        };
        let status = if next >= MASTERED_INTERVAL_DAYS {
            RepetitionStatus::Mastered
        } else {
            RepetitionStatus::Learning
        };
        (next, status)
    };

    Schedule {
        intervals: next.min(MAX_INTERVAL_DAYS),
        status,
    }
}

/// Repetition record joined with the list name and word for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacedRepetition {
    pub id: i64,
    pub user_id: i64,
    pub vocabulary_list_id: i64,
    /// `None` for a list-level record
    pub vocabulary_id: Option<i64>,
    pub vocabulary_list_name: String,
    pub vocabulary_word: Option<String>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_review_at: Option<DateTime<Utc>>,
    pub review_count: i32,
    pub intervals: i32,
    pub status: RepetitionStatus,
    pub best_quiz_score: Option<i32>,
    pub last_quiz_score: Option<i32>,
    pub last_quiz_completed_at: Option<DateTime<Utc>>,
    pub total_quiz_attempts: i32,
}

impl SpacedRepetition {
    /// Unreviewed record due one day from `now`
    pub fn fresh(
        user_id: i64,
        vocabulary_list_id: i64,
        vocabulary_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0, // Will be set by database
            user_id,
            vocabulary_list_id,
            vocabulary_id,
            vocabulary_list_name: String::new(),
            vocabulary_word: None,
            last_reviewed_at: Some(now),
            next_review_at: Some(now + Duration::days(i64::from(FIRST_INTERVAL_DAYS))),
            review_count: 0,
            intervals: FIRST_INTERVAL_DAYS,
            status: RepetitionStatus::New,
            best_quiz_score: None,
            last_quiz_score: None,
            last_quiz_completed_at: None,
            total_quiz_attempts: 0,
        }
    }

    /// Stage derived from the record itself rather than the stored column
    pub fn derived_status(&self) -> RepetitionStatus {
        if self.intervals >= MASTERED_INTERVAL_DAYS {
            RepetitionStatus::Mastered
        } else if self.review_count > 0
            || self.best_quiz_score.is_some()
            || self.last_quiz_score.is_some()
        {
            RepetitionStatus::Learning
        } else {
            RepetitionStatus::New
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.is_some_and(|at| at <= now)
    }

    /// Whole days until the next review; zero when due or unscheduled
    pub fn days_until_review(&self, now: DateTime<Utc>) -> i64 {
        self.next_review_at
            .map(|at| (at - now).num_days().max(0))
            .unwrap_or(0)
    }
}

/// A repetition record as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionView {
    #[serde(flatten)]
    pub repetition: SpacedRepetition,
    pub is_due: bool,
    pub days_until_review: i64,
}

impl RepetitionView {
    /// View of `repetition` at `now`, with the stage re-derived
    pub fn at(mut repetition: SpacedRepetition, now: DateTime<Utc>) -> Self {
        repetition.status = repetition.derived_status();
        Self {
            is_due: repetition.is_due(now),
            days_until_review: repetition.days_until_review(now),
            repetition,
        }
    }
}

/// Review request: an existing record by id, or a word of a list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewWordInput {
    pub repetition_id: Option<i64>,
    pub vocabulary_id: Option<i64>,
    pub vocabulary_list_id: Option<i64>,
    pub quality: i32,
}

/// Result of a review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub repetition: RepetitionView,
    pub next_review_at: Option<DateTime<Utc>>,
    pub new_intervals: i32,
}

/// Quiz score for one vocabulary list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResultInput {
    pub vocabulary_list_id: i64,
    pub score: i32,
}

/// Quiz history of one vocabulary list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizScore {
    pub vocabulary_list_id: i64,
    pub vocabulary_list_name: String,
    pub best_score: Option<i32>,
    pub last_score: Option<i32>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub total_attempts: i32,
}

impl QuizScore {
    /// Quiz history of a record that has at least one quiz
    pub fn from_repetition(repetition: &SpacedRepetition) -> Option<Self> {
        if repetition.best_quiz_score.is_none() && repetition.last_quiz_score.is_none() {
            return None;
        }
        Some(Self {
            vocabulary_list_id: repetition.vocabulary_list_id,
            vocabulary_list_name: repetition.vocabulary_list_name.clone(),
            best_score: repetition.best_quiz_score,
            last_score: repetition.last_quiz_score,
            last_completed_at: repetition.last_quiz_completed_at,
            total_attempts: repetition.total_quiz_attempts,
        })
    }
}
