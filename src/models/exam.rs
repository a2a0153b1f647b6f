//! Exam catalog models
//!
//! An exam owns ordered parts, a part owns numbered questions and a question
//! owns its answer options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub exam_type: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamPart {
    pub id: i64,
    pub exam_id: i64,
    pub part_code: String,
    pub title: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub part_id: i64,
    pub question_type: String,
    pub stem_text: Option<String>,
    pub score_weight: i32,
    pub question_explain: Option<String>,
    /// Seconds allowed for the question
    pub time_limit: i32,
    pub question_number: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
}

/// Exam with its parts in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDetail {
    pub exam: Exam,
    pub parts: Vec<ExamPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

/// Part with its questions ordered by number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamPartDetail {
    pub part: ExamPart,
    pub questions: Vec<QuestionDetail>,
}

/// Optional filters for the exam catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamFilter {
    pub exam_type: Option<String>,
    /// Only exams having a part with this code
    pub part_code: Option<String>,
}

impl ExamFilter {
    /// Stable cache key for this filter
    pub fn cache_key(&self) -> String {
        format!(
            "exams:list:{}:{}",
            self.exam_type.as_deref().unwrap_or("*"),
            self.part_code.as_deref().unwrap_or("*")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExamInput {
    pub exam_type: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExamPartInput {
    pub exam_id: i64,
    pub part_code: String,
    pub title: String,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOptionInput {
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionInput {
    pub part_id: i64,
    pub question_type: String,
    #[serde(default)]
    pub stem_text: Option<String>,
    pub score_weight: i32,
    #[serde(default)]
    pub question_explain: Option<String>,
    #[serde(default)]
    pub time_limit: i32,
    pub question_number: i32,
    #[serde(default)]
    pub options: Vec<CreateOptionInput>,
}
