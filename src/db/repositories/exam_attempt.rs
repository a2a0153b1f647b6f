//! Exam attempt repository
//!
//! Attempts and the answers saved against them. Answer reads join the
//! question (and for choice answers the selected option) so callers get
//! complete rows back.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    is_valid_id, AttemptDetail, AttemptStatus, AttemptSummary, ChoiceAnswer, ExamAttempt,
    FinishAttemptInput, Question, QuestionOption, SpeakingAnswer, SpeakingAnswerInput,
    StartAttemptInput, WritingAnswer, WritingAnswerInput, LISTENING_QUESTION_TYPE,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Exam attempt repository trait
#[async_trait]
pub trait ExamAttemptRepository: Send + Sync {
    /// Open an attempt in the `Doing` state
    async fn start(&self, user_id: i64, input: &StartAttemptInput) -> Result<ExamAttempt>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ExamAttempt>>;

    /// Close an attempt with its score; `None` when it does not exist
    async fn finish(&self, id: i64, input: &FinishAttemptInput) -> Result<Option<ExamAttempt>>;

    /// A user's attempts, most recent first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<AttemptSummary>>;

    async fn get_summary(&self, id: i64) -> Result<Option<AttemptSummary>>;

    /// Summary plus answers grouped by skill
    async fn get_detail(&self, id: i64) -> Result<Option<AttemptDetail>>;

    /// Store a choice answer; correctness and score follow the selected option
    async fn save_multiple_choice_answer(
        &self,
        attempt_id: i64,
        question: &Question,
        option: &QuestionOption,
    ) -> Result<ChoiceAnswer>;

    async fn save_writing_answer(
        &self,
        input: &WritingAnswerInput,
        question: &Question,
    ) -> Result<WritingAnswer>;

    async fn save_speaking_answer(
        &self,
        input: &SpeakingAnswerInput,
        question: &Question,
    ) -> Result<SpeakingAnswer>;
}

/// SQLx-based exam attempt repository implementation
pub struct SqlxExamAttemptRepository {
    pool: DynDatabasePool,
}

impl SqlxExamAttemptRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ExamAttemptRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_ATTEMPT: &str = r#"
    SELECT id, user_id, exam_id, exam_part_id, start_time, end_time, score, status
    FROM exam_attempts
"#;

const SELECT_SUMMARY: &str = r#"
    SELECT a.id, a.user_id, a.exam_id, a.exam_part_id, a.start_time, a.end_time,
           a.score, a.status,
           u.full_name AS user_name,
           e.name AS exam_name,
           COALESCE(p.part_code, '') AS part_code
    FROM exam_attempts a
    INNER JOIN users u ON u.id = a.user_id
    INNER JOIN exams e ON e.id = a.exam_id
    LEFT JOIN exam_parts p ON p.id = a.exam_part_id
"#;

/// Question columns, prefixed so they never clash with the answer row
const QUESTION_COLUMNS: &str = r#"
    q.id AS q_id, q.part_id AS q_part_id, q.question_type AS q_question_type,
    q.stem_text AS q_stem_text, q.score_weight AS q_score_weight,
    q.question_explain AS q_question_explain, q.time_limit AS q_time_limit,
    q.question_number AS q_question_number
"#;

fn choice_answers_sql() -> String {
    format!(
        r#"
        SELECT ca.id, ca.attempt_id, ca.is_correct, ca.score,
               o.id AS o_id, o.question_id AS o_question_id, o.content AS o_content,
               o.is_correct AS o_is_correct,
               {}
        FROM attempt_choice_answers ca
        INNER JOIN questions q ON q.id = ca.question_id
        INNER JOIN question_options o ON o.id = ca.selected_option_id
        WHERE ca.attempt_id = ?
        ORDER BY q.question_number, ca.id
        "#,
        QUESTION_COLUMNS
    )
}

fn writing_answers_sql() -> String {
    format!(
        r#"
        SELECT wa.id, wa.attempt_id, wa.answer_content, wa.feedback, {}
        FROM attempt_writing_answers wa
        INNER JOIN questions q ON q.id = wa.question_id
        WHERE wa.attempt_id = ?
        ORDER BY q.question_number, wa.id
        "#,
        QUESTION_COLUMNS
    )
}

fn speaking_answers_sql() -> String {
    format!(
        r#"
        SELECT sa.id, sa.attempt_id, sa.transcript, sa.audio_url, sa.overall_score, {}
        FROM attempt_speaking_answers sa
        INNER JOIN questions q ON q.id = sa.question_id
        WHERE sa.attempt_id = ?
        ORDER BY q.question_number, sa.id
        "#,
        QUESTION_COLUMNS
    )
}

fn parse_status(value: String) -> Result<AttemptStatus> {
    AttemptStatus::parse(&value).with_context(|| format!("Unknown attempt status '{}'", value))
}

/// Attempts on a single part are practice; attempts without one are mock tests.
fn summary_from(
    attempt: ExamAttempt,
    user_name: String,
    exam_name: String,
    part_code: String,
) -> AttemptSummary {
    let is_mocktest = attempt.exam_part_id.is_none();
    AttemptSummary {
        attempt,
        user_name,
        exam_name,
        part_code,
        is_mocktest,
    }
}

/// Split choice answers into (reading, listening)
fn split_by_skill(answers: Vec<ChoiceAnswer>) -> (Vec<ChoiceAnswer>, Vec<ChoiceAnswer>) {
    answers
        .into_iter()
        .partition(|a| a.question.question_type != LISTENING_QUESTION_TYPE)
}

fn choice_score(question: &Question, option: &QuestionOption) -> i32 {
    if option.is_correct {
        question.score_weight
    } else {
        0
    }
}

#[async_trait]
impl ExamAttemptRepository for SqlxExamAttemptRepository {
    async fn start(&self, user_id: i64, input: &StartAttemptInput) -> Result<ExamAttempt> {
        let attempt = ExamAttempt {
            id: 0,
            user_id,
            exam_id: input.exam_id,
            exam_part_id: input.exam_part_id,
            start_time: Utc::now(),
            end_time: None,
            score: None,
            status: AttemptStatus::Doing,
        };
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_attempt_sqlite(pool, &attempt).await?,
            Backend::Mysql(pool) => insert_attempt_mysql(pool, &attempt).await?,
        };
        Ok(ExamAttempt { id, ..attempt })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ExamAttempt>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_attempt_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_attempt_mysql(pool, id).await,
        }
    }

    async fn finish(&self, id: i64, input: &FinishAttemptInput) -> Result<Option<ExamAttempt>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let end_time = input.end_time.unwrap_or_else(Utc::now);
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => finish_attempt_sqlite(pool, id, end_time, input.score).await?,
            Backend::Mysql(pool) => finish_attempt_mysql(pool, id, end_time, input.score).await?,
        };
        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<AttemptSummary>> {
        if !is_valid_id(user_id) {
            return Ok(Vec::new());
        }
        let sql = format!(
            "{} WHERE a.user_id = ? ORDER BY a.start_time DESC, a.id DESC",
            SELECT_SUMMARY
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_summaries_sqlite(pool, &sql, user_id).await,
            Backend::Mysql(pool) => list_summaries_mysql(pool, &sql, user_id).await,
        }
    }

    async fn get_summary(&self, id: i64) -> Result<Option<AttemptSummary>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let sql = format!("{} WHERE a.id = ?", SELECT_SUMMARY);
        let mut summaries = match self.pool.backend() {
            Backend::Sqlite(pool) => list_summaries_sqlite(pool, &sql, id).await?,
            Backend::Mysql(pool) => list_summaries_mysql(pool, &sql, id).await?,
        };
        Ok(summaries.pop())
    }

    async fn get_detail(&self, id: i64) -> Result<Option<AttemptDetail>> {
        let Some(summary) = self.get_summary(id).await? else {
            return Ok(None);
        };
        let (choices, writing_answers, speaking_answers) = match self.pool.backend() {
            Backend::Sqlite(pool) => (
                choice_answers_sqlite(pool, id).await?,
                writing_answers_sqlite(pool, id).await?,
                speaking_answers_sqlite(pool, id).await?,
            ),
            Backend::Mysql(pool) => (
                choice_answers_mysql(pool, id).await?,
                writing_answers_mysql(pool, id).await?,
                speaking_answers_mysql(pool, id).await?,
            ),
        };
        let (reading_answers, listening_answers) = split_by_skill(choices);

        Ok(Some(AttemptDetail {
            summary,
            reading_answers,
            listening_answers,
            writing_answers,
            speaking_answers,
        }))
    }

    async fn save_multiple_choice_answer(
        &self,
        attempt_id: i64,
        question: &Question,
        option: &QuestionOption,
    ) -> Result<ChoiceAnswer> {
        let answer = ChoiceAnswer {
            id: 0,
            attempt_id,
            question: question.clone(),
            selected_option: option.clone(),
            is_correct: option.is_correct,
            score: choice_score(question, option),
        };
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_choice_answer_sqlite(pool, &answer).await?,
            Backend::Mysql(pool) => insert_choice_answer_mysql(pool, &answer).await?,
        };
        Ok(ChoiceAnswer { id, ..answer })
    }

    async fn save_writing_answer(
        &self,
        input: &WritingAnswerInput,
        question: &Question,
    ) -> Result<WritingAnswer> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_writing_answer_sqlite(pool, input).await?,
            Backend::Mysql(pool) => insert_writing_answer_mysql(pool, input).await?,
        };
        Ok(WritingAnswer {
            id,
            attempt_id: input.attempt_id,
            question: question.clone(),
            answer_content: input.answer_content.clone(),
            feedback: input.feedback.clone(),
        })
    }

    async fn save_speaking_answer(
        &self,
        input: &SpeakingAnswerInput,
        question: &Question,
    ) -> Result<SpeakingAnswer> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_speaking_answer_sqlite(pool, input).await?,
            Backend::Mysql(pool) => insert_speaking_answer_mysql(pool, input).await?,
        };
        Ok(SpeakingAnswer {
            id,
            attempt_id: input.attempt_id,
            question: question.clone(),
            transcript: input.transcript.clone(),
            audio_url: input.audio_url.clone(),
            overall_score: input.overall_score,
        })
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_attempt_sqlite(pool: &SqlitePool, attempt: &ExamAttempt) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exam_attempts (user_id, exam_id, exam_part_id, start_time, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(attempt.user_id)
    .bind(attempt.exam_id)
    .bind(attempt.exam_part_id)
    .bind(attempt.start_time)
    .bind(attempt.status.as_str())
    .execute(pool)
    .await
    .context("Failed to start exam attempt")?;
    Ok(result.last_insert_rowid())
}

async fn get_attempt_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ExamAttempt>> {
    let sql = format!("{} WHERE id = ?", SELECT_ATTEMPT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exam attempt by ID")?;

    row.map(|row| row_to_attempt_sqlite(&row)).transpose()
}

async fn finish_attempt_sqlite(
    pool: &SqlitePool,
    id: i64,
    end_time: DateTime<Utc>,
    score: i32,
) -> Result<u64> {
    let result =
        sqlx::query("UPDATE exam_attempts SET end_time = ?, score = ?, status = ? WHERE id = ?")
            .bind(end_time)
            .bind(score)
            .bind(AttemptStatus::Completed.as_str())
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to finish exam attempt")?;
    Ok(result.rows_affected())
}

async fn list_summaries_sqlite(
    pool: &SqlitePool,
    sql: &str,
    param: i64,
) -> Result<Vec<AttemptSummary>> {
    let rows = sqlx::query(sql)
        .bind(param)
        .fetch_all(pool)
        .await
        .context("Failed to list exam attempts")?;

    rows.iter()
        .map(|row| {
            Ok(summary_from(
                row_to_attempt_sqlite(row)?,
                row.get("user_name"),
                row.get("exam_name"),
                row.get("part_code"),
            ))
        })
        .collect()
}

async fn choice_answers_sqlite(pool: &SqlitePool, attempt_id: i64) -> Result<Vec<ChoiceAnswer>> {
    let rows = sqlx::query(&choice_answers_sql())
        .bind(attempt_id)
        .fetch_all(pool)
        .await
        .context("Failed to load choice answers")?;

    Ok(rows
        .iter()
        .map(|row| ChoiceAnswer {
            id: row.get("id"),
            attempt_id: row.get("attempt_id"),
            question: prefixed_question_sqlite(row),
            selected_option: QuestionOption {
                id: row.get("o_id"),
                question_id: row.get("o_question_id"),
                content: row.get("o_content"),
                is_correct: row.get("o_is_correct"),
            },
            is_correct: row.get("is_correct"),
            score: row.get("score"),
        })
        .collect())
}

async fn writing_answers_sqlite(pool: &SqlitePool, attempt_id: i64) -> Result<Vec<WritingAnswer>> {
    let rows = sqlx::query(&writing_answers_sql())
        .bind(attempt_id)
        .fetch_all(pool)
        .await
        .context("Failed to load writing answers")?;

    Ok(rows
        .iter()
        .map(|row| WritingAnswer {
            id: row.get("id"),
            attempt_id: row.get("attempt_id"),
            question: prefixed_question_sqlite(row),
            answer_content: row.get("answer_content"),
            feedback: row.get("feedback"),
        })
        .collect())
}

async fn speaking_answers_sqlite(
    pool: &SqlitePool,
    attempt_id: i64,
) -> Result<Vec<SpeakingAnswer>> {
    let rows = sqlx::query(&speaking_answers_sql())
        .bind(attempt_id)
        .fetch_all(pool)
        .await
        .context("Failed to load speaking answers")?;

    Ok(rows
        .iter()
        .map(|row| SpeakingAnswer {
            id: row.get("id"),
            attempt_id: row.get("attempt_id"),
            question: prefixed_question_sqlite(row),
            transcript: row.get("transcript"),
            audio_url: row.get("audio_url"),
            overall_score: row.get("overall_score"),
        })
        .collect())
}

async fn insert_choice_answer_sqlite(pool: &SqlitePool, answer: &ChoiceAnswer) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attempt_choice_answers (attempt_id, question_id, selected_option_id, is_correct, score)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(answer.attempt_id)
    .bind(answer.question.id)
    .bind(answer.selected_option.id)
    .bind(answer.is_correct)
    .bind(answer.score)
    .execute(pool)
    .await
    .context("Failed to save choice answer")?;
    Ok(result.last_insert_rowid())
}

async fn insert_writing_answer_sqlite(pool: &SqlitePool, input: &WritingAnswerInput) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attempt_writing_answers (attempt_id, question_id, answer_content, feedback)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(input.attempt_id)
    .bind(input.question_id)
    .bind(&input.answer_content)
    .bind(&input.feedback)
    .execute(pool)
    .await
    .context("Failed to save writing answer")?;
    Ok(result.last_insert_rowid())
}

async fn insert_speaking_answer_sqlite(
    pool: &SqlitePool,
    input: &SpeakingAnswerInput,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attempt_speaking_answers (attempt_id, question_id, transcript, audio_url, overall_score)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.attempt_id)
    .bind(input.question_id)
    .bind(&input.transcript)
    .bind(&input.audio_url)
    .bind(input.overall_score)
    .execute(pool)
    .await
    .context("Failed to save speaking answer")?;
    Ok(result.last_insert_rowid())
}

fn row_to_attempt_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ExamAttempt> {
    Ok(ExamAttempt {
        id: row.get("id"),
        user_id: row.get("user_id"),
        exam_id: row.get("exam_id"),
        exam_part_id: row.get("exam_part_id"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        score: row.get("score"),
        status: parse_status(row.get("status"))?,
    })
}

fn prefixed_question_sqlite(row: &sqlx::sqlite::SqliteRow) -> Question {
    Question {
        id: row.get("q_id"),
        part_id: row.get("q_part_id"),
        question_type: row.get("q_question_type"),
        stem_text: row.get("q_stem_text"),
        score_weight: row.get("q_score_weight"),
        question_explain: row.get("q_question_explain"),
        time_limit: row.get("q_time_limit"),
        question_number: row.get("q_question_number"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_attempt_mysql(pool: &MySqlPool, attempt: &ExamAttempt) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exam_attempts (user_id, exam_id, exam_part_id, start_time, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(attempt.user_id)
    .bind(attempt.exam_id)
    .bind(attempt.exam_part_id)
    .bind(attempt.start_time)
    .bind(attempt.status.as_str())
    .execute(pool)
    .await
    .context("Failed to start exam attempt")?;
    Ok(result.last_insert_id() as i64)
}

async fn get_attempt_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ExamAttempt>> {
    let sql = format!("{} WHERE id = ?", SELECT_ATTEMPT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exam attempt by ID")?;

    row.map(|row| row_to_attempt_mysql(&row)).transpose()
}

async fn finish_attempt_mysql(
    pool: &MySqlPool,
    id: i64,
    end_time: DateTime<Utc>,
    score: i32,
) -> Result<u64> {
    let result =
        sqlx::query("UPDATE exam_attempts SET end_time = ?, score = ?, status = ? WHERE id = ?")
            .bind(end_time)
            .bind(score)
            .bind(AttemptStatus::Completed.as_str())
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to finish exam attempt")?;
    Ok(result.rows_affected())
}

async fn list_summaries_mysql(
    pool: &MySqlPool,
    sql: &str,
    param: i64,
) -> Result<Vec<AttemptSummary>> {
    let rows = sqlx::query(sql)
        .bind(param)
        .fetch_all(pool)
        .await
        .context("Failed to list exam attempts")?;

    rows.iter()
        .map(|row| {
            Ok(summary_from(
                row_to_attempt_mysql(row)?,
                row.get("user_name"),
                row.get("exam_name"),
                row.get("part_code"),
            ))
        })
        .collect()
}

async fn choice_answers_mysql(pool: &MySqlPool, attempt_id: i64) -> Result<Vec<ChoiceAnswer>> {
    let rows = sqlx::query(&choice_answers_sql())
        .bind(attempt_id)
        .fetch_all(pool)
        .await
        .context("Failed to load choice answers")?;

    Ok(rows
        .iter()
        .map(|row| ChoiceAnswer {
            id: row.get("id"),
            attempt_id: row.get("attempt_id"),
            question: prefixed_question_mysql(row),
            selected_option: QuestionOption {
                id: row.get("o_id"),
                question_id: row.get("o_question_id"),
                content: row.get("o_content"),
                is_correct: row.get("o_is_correct"),
            },
            is_correct: row.get("is_correct"),
            score: row.get("score"),
        })
        .collect())
}

async fn writing_answers_mysql(pool: &MySqlPool, attempt_id: i64) -> Result<Vec<WritingAnswer>> {
    let rows = sqlx::query(&writing_answers_sql())
        .bind(attempt_id)
        .fetch_all(pool)
        .await
        .context("Failed to load writing answers")?;

    Ok(rows
        .iter()
        .map(|row| WritingAnswer {
            id: row.get("id"),
            attempt_id: row.get("attempt_id"),
            question: prefixed_question_mysql(row),
            answer_content: row.get("answer_content"),
            feedback: row.get("feedback"),
        })
        .collect())
}

async fn speaking_answers_mysql(pool: &MySqlPool, attempt_id: i64) -> Result<Vec<SpeakingAnswer>> {
    let rows = sqlx::query(&speaking_answers_sql())
        .bind(attempt_id)
        .fetch_all(pool)
        .await
        .context("Failed to load speaking answers")?;

    Ok(rows
        .iter()
        .map(|row| SpeakingAnswer {
            id: row.get("id"),
            attempt_id: row.get("attempt_id"),
            question: prefixed_question_mysql(row),
            transcript: row.get("transcript"),
            audio_url: row.get("audio_url"),
            overall_score: row.get("overall_score"),
        })
        .collect())
}

async fn insert_choice_answer_mysql(pool: &MySqlPool, answer: &ChoiceAnswer) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attempt_choice_answers (attempt_id, question_id, selected_option_id, is_correct, score)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(answer.attempt_id)
    .bind(answer.question.id)
    .bind(answer.selected_option.id)
    .bind(answer.is_correct)
    .bind(answer.score)
    .execute(pool)
    .await
    .context("Failed to save choice answer")?;
    Ok(result.last_insert_id() as i64)
}

async fn insert_writing_answer_mysql(pool: &MySqlPool, input: &WritingAnswerInput) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attempt_writing_answers (attempt_id, question_id, answer_content, feedback)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(input.attempt_id)
    .bind(input.question_id)
    .bind(&input.answer_content)
    .bind(&input.feedback)
    .execute(pool)
    .await
    .context("Failed to save writing answer")?;
    Ok(result.last_insert_id() as i64)
}

async fn insert_speaking_answer_mysql(
    pool: &MySqlPool,
    input: &SpeakingAnswerInput,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO attempt_speaking_answers (attempt_id, question_id, transcript, audio_url, overall_score)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.attempt_id)
    .bind(input.question_id)
    .bind(&input.transcript)
    .bind(&input.audio_url)
    .bind(input.overall_score)
    .execute(pool)
    .await
    .context("Failed to save speaking answer")?;
    Ok(result.last_insert_id() as i64)
}

fn row_to_attempt_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ExamAttempt> {
    Ok(ExamAttempt {
        id: row.get("id"),
        user_id: row.get("user_id"),
        exam_id: row.get("exam_id"),
        exam_part_id: row.get("exam_part_id"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        score: row.get("score"),
        status: parse_status(row.get("status"))?,
    })
}

fn prefixed_question_mysql(row: &sqlx::mysql::MySqlRow) -> Question {
    Question {
        id: row.get("q_id"),
        part_id: row.get("q_part_id"),
        question_type: row.get("q_question_type"),
        stem_text: row.get("q_stem_text"),
        score_weight: row.get("q_score_weight"),
        question_explain: row.get("q_question_explain"),
        time_limit: row.get("q_time_limit"),
        question_number: row.get("q_question_number"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::exam::fixtures::seed_exam;
    use crate::db::repositories::test_support::{seed_user, test_pool};

    #[tokio::test]
    async fn test_start_list_and_finish() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "learner@lumina.dev").await;
        let seeded = seed_exam(&pool, user).await;
        let repo = SqlxExamAttemptRepository::new(pool);

        let full = repo
            .start(user, &StartAttemptInput { exam_id: seeded.exam_id, exam_part_id: None })
            .await
            .unwrap();
        let practice = repo
            .start(
                user,
                &StartAttemptInput {
                    exam_id: seeded.exam_id,
                    exam_part_id: Some(seeded.listening_part),
                },
            )
            .await
            .unwrap();
        assert_eq!(full.status, AttemptStatus::Doing);

        let summaries = repo.list_by_user(user).await.unwrap();
        assert_eq!(summaries.len(), 2);
        let full_summary = summaries.iter().find(|s| s.attempt.id == full.id).unwrap();
        assert!(full_summary.is_mocktest);
        assert_eq!(full_summary.part_code, "");
        assert_eq!(full_summary.exam_name, "TOEIC Practice 1");
        let practice_summary = summaries.iter().find(|s| s.attempt.id == practice.id).unwrap();
        assert!(!practice_summary.is_mocktest);
        assert_eq!(practice_summary.part_code, "P1");

        let finished = repo
            .finish(full.id, &FinishAttemptInput { score: 42, end_time: None })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(finished.status, AttemptStatus::Completed);
        assert_eq!(finished.score, Some(42));
        let reloaded = repo.get_by_id(full.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, AttemptStatus::Completed);
        assert!(reloaded.end_time.is_some());

        assert!(repo
            .finish(9999, &FinishAttemptInput { score: 1, end_time: None })
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_detail_groups_answers_by_skill() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "learner@lumina.dev").await;
        let seeded = seed_exam(&pool, user).await;
        let repo = SqlxExamAttemptRepository::new(pool);
        let attempt = repo
            .start(user, &StartAttemptInput { exam_id: seeded.exam_id, exam_part_id: None })
            .await
            .unwrap();

        let reading = &seeded.reading_question;
        let correct = repo
            .save_multiple_choice_answer(attempt.id, &reading.question, &reading.options[0])
            .await
            .unwrap();
        assert!(correct.is_correct);
        assert_eq!(correct.score, 5);

        let listening = &seeded.listening_question;
        let wrong = repo
            .save_multiple_choice_answer(attempt.id, &listening.question, &listening.options[1])
            .await
            .unwrap();
        assert!(!wrong.is_correct);
        assert_eq!(wrong.score, 0);

        repo.save_writing_answer(
            &WritingAnswerInput {
                attempt_id: attempt.id,
                question_id: reading.question.id,
                answer_content: "An essay".into(),
                feedback: None,
            },
            &reading.question,
        )
        .await
        .unwrap();
        repo.save_speaking_answer(
            &SpeakingAnswerInput {
                attempt_id: attempt.id,
                question_id: listening.question.id,
                transcript: Some("hello".into()),
                audio_url: None,
                overall_score: Some(6.5),
            },
            &listening.question,
        )
        .await
        .unwrap();

        let detail = repo.get_detail(attempt.id).await.unwrap().unwrap();
        assert_eq!(detail.reading_answers.len(), 1);
        assert_eq!(detail.reading_answers[0].selected_option.content, "right");
        assert_eq!(detail.listening_answers.len(), 1);
        assert_eq!(detail.listening_answers[0].question.question_type, "Listening");
        assert_eq!(detail.writing_answers[0].answer_content, "An essay");
        assert_eq!(detail.speaking_answers[0].overall_score, Some(6.5));
        assert_eq!(detail.summary.user_name, "User learner@lumina.dev");

        assert!(repo.get_detail(9999).await.unwrap().is_none());
        assert!(repo.get_detail(-3).await.unwrap().is_none());
    }
}
