//! Exam attempt models
//!
//! An attempt records one sitting of an exam (or of a single part) and
//! aggregates the answers given per skill.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Question, QuestionOption};

/// Question type marking listening items among multiple-choice answers
pub const LISTENING_QUESTION_TYPE: &str = "Listening";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AttemptStatus {
    #[default]
    Doing,
    Completed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Doing => "Doing",
            AttemptStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "doing" => Some(AttemptStatus::Doing),
            "completed" => Some(AttemptStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamAttempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub exam_part_id: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub status: AttemptStatus,
}

/// Attempt joined with display names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt: ExamAttempt,
    pub user_name: String,
    pub exam_name: String,
    /// Code of the attempted part, empty for full-exam attempts
    pub part_code: String,
    /// Full-exam attempt rather than single-part practice
    pub is_mocktest: bool,
}

/// A saved reading or listening answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question: Question,
    pub selected_option: QuestionOption,
    pub is_correct: bool,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question: Question,
    pub answer_content: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakingAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question: Question,
    pub transcript: Option<String>,
    pub audio_url: Option<String>,
    pub overall_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub summary: AttemptSummary,
    pub reading_answers: Vec<ChoiceAnswer>,
    pub listening_answers: Vec<ChoiceAnswer>,
    pub writing_answers: Vec<WritingAnswer>,
    pub speaking_answers: Vec<SpeakingAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptInput {
    pub exam_id: i64,
    #[serde(default)]
    pub exam_part_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishAttemptInput {
    pub score: i32,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceAnswerInput {
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingAnswerInput {
    pub attempt_id: i64,
    pub question_id: i64,
    pub answer_content: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakingAnswerInput {
    pub attempt_id: i64,
    pub question_id: i64,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub overall_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_status_parse() {
        assert_eq!(AttemptStatus::parse("Doing"), Some(AttemptStatus::Doing));
        assert_eq!(AttemptStatus::parse("completed"), Some(AttemptStatus::Completed));
        assert_eq!(AttemptStatus::parse("paused"), None);
        assert_eq!(AttemptStatus::Completed.as_str(), "Completed");
    }
}
