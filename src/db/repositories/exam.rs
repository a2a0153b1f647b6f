//! Exam repository
//!
//! Read access to the exam catalog (exams, parts, questions, options) and
//! the authoring inserts that build it.

use crate::db::{Backend, DbTransaction, DynDatabasePool};
use crate::models::{
    is_valid_id, CreateExamInput, CreateExamPartInput, CreateQuestionInput, Exam, ExamDetail,
    ExamFilter, ExamPart, ExamPartDetail, Question, QuestionDetail, QuestionOption,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlConnection, MySqlPool, Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use super::normalize_search;

/// Exam repository trait
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Active exams, optionally narrowed by type and by a part code they contain
    async fn list(&self, filter: &ExamFilter) -> Result<Vec<Exam>>;

    /// Exam by id regardless of its active flag
    async fn get_by_id(&self, id: i64) -> Result<Option<Exam>>;

    /// Active exam with its parts ordered by `order_index`
    async fn get_detail(&self, id: i64) -> Result<Option<ExamDetail>>;

    async fn get_part(&self, part_id: i64) -> Result<Option<ExamPart>>;

    /// Part with questions ordered by number, each with its options
    async fn get_part_detail(&self, part_id: i64) -> Result<Option<ExamPartDetail>>;

    async fn get_question(&self, id: i64) -> Result<Option<Question>>;

    async fn get_option(&self, id: i64) -> Result<Option<QuestionOption>>;

    async fn create_exam(&self, input: &CreateExamInput, created_by: i64) -> Result<Exam>;

    async fn create_part(&self, input: &CreateExamPartInput) -> Result<ExamPart>;

    /// Insert a question and its options in one transaction
    async fn create_question(&self, input: &CreateQuestionInput) -> Result<QuestionDetail>;
}

/// SQLx-based exam repository implementation
pub struct SqlxExamRepository {
    pool: DynDatabasePool,
}

impl SqlxExamRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ExamRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_EXAM: &str = r#"
    SELECT e.id, e.exam_type, e.name, e.description, e.is_active, e.created_by, e.created_at
    FROM exams e
"#;

const LIST_EXAMS: &str = r#"
    SELECT e.id, e.exam_type, e.name, e.description, e.is_active, e.created_by, e.created_at
    FROM exams e
    WHERE e.is_active = 1
      AND (? IS NULL OR e.exam_type = ?)
      AND (? IS NULL OR EXISTS (
          SELECT 1 FROM exam_parts p WHERE p.exam_id = e.id AND p.part_code = ?
      ))
    ORDER BY e.created_at DESC, e.id DESC
"#;

const SELECT_PART: &str = "SELECT id, exam_id, part_code, title, order_index FROM exam_parts";

const SELECT_QUESTION: &str = r#"
    SELECT id, part_id, question_type, stem_text, score_weight, question_explain,
           time_limit, question_number
    FROM questions
"#;

const SELECT_OPTION: &str = "SELECT id, question_id, content, is_correct FROM question_options";

const PART_OPTIONS: &str = r#"
    SELECT o.id, o.question_id, o.content, o.is_correct
    FROM question_options o
    INNER JOIN questions q ON q.id = o.question_id
    WHERE q.part_id = ?
    ORDER BY o.id
"#;

/// Attach options to their questions, keeping question order
fn with_options(questions: Vec<Question>, options: Vec<QuestionOption>) -> Vec<QuestionDetail> {
    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }
    questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionDetail { question, options }
        })
        .collect()
}

#[async_trait]
impl ExamRepository for SqlxExamRepository {
    async fn list(&self, filter: &ExamFilter) -> Result<Vec<Exam>> {
        let exam_type = normalize_search(filter.exam_type.as_deref());
        let part_code = normalize_search(filter.part_code.as_deref());
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                list_exams_sqlite(pool, exam_type.as_deref(), part_code.as_deref()).await
            }
            Backend::Mysql(pool) => {
                list_exams_mysql(pool, exam_type.as_deref(), part_code.as_deref()).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Exam>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_exam_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_exam_mysql(pool, id).await,
        }
    }

    async fn get_detail(&self, id: i64) -> Result<Option<ExamDetail>> {
        let Some(exam) = self.get_by_id(id).await?.filter(|e| e.is_active) else {
            return Ok(None);
        };
        let parts = match self.pool.backend() {
            Backend::Sqlite(pool) => get_parts_sqlite(pool, id).await?,
            Backend::Mysql(pool) => get_parts_mysql(pool, id).await?,
        };
        Ok(Some(ExamDetail { exam, parts }))
    }

    async fn get_part(&self, part_id: i64) -> Result<Option<ExamPart>> {
        if !is_valid_id(part_id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_part_sqlite(pool, part_id).await,
            Backend::Mysql(pool) => get_part_mysql(pool, part_id).await,
        }
    }

    async fn get_part_detail(&self, part_id: i64) -> Result<Option<ExamPartDetail>> {
        let Some(part) = self.get_part(part_id).await? else {
            return Ok(None);
        };
        let (questions, options) = match self.pool.backend() {
            Backend::Sqlite(pool) => (
                get_part_questions_sqlite(pool, part_id).await?,
                get_part_options_sqlite(pool, part_id).await?,
            ),
            Backend::Mysql(pool) => (
                get_part_questions_mysql(pool, part_id).await?,
                get_part_options_mysql(pool, part_id).await?,
            ),
        };
        Ok(Some(ExamPartDetail {
            part,
            questions: with_options(questions, options),
        }))
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_question_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_question_mysql(pool, id).await,
        }
    }

    async fn get_option(&self, id: i64) -> Result<Option<QuestionOption>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_option_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_option_mysql(pool, id).await,
        }
    }

    async fn create_exam(&self, input: &CreateExamInput, created_by: i64) -> Result<Exam> {
        let exam = Exam {
            id: 0,
            exam_type: input.exam_type.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            is_active: true,
            created_by,
            created_at: Utc::now(),
        };
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_exam_sqlite(pool, &exam).await?,
            Backend::Mysql(pool) => insert_exam_mysql(pool, &exam).await?,
        };
        Ok(Exam { id, ..exam })
    }

    async fn create_part(&self, input: &CreateExamPartInput) -> Result<ExamPart> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => insert_part_sqlite(pool, input).await?,
            Backend::Mysql(pool) => insert_part_mysql(pool, input).await?,
        };
        Ok(ExamPart {
            id,
            exam_id: input.exam_id,
            part_code: input.part_code.clone(),
            title: input.title.clone(),
            order_index: input.order_index,
        })
    }

    async fn create_question(&self, input: &CreateQuestionInput) -> Result<QuestionDetail> {
        let mut tx = DbTransaction::begin(&self.pool).await?;
        let created = match &mut tx {
            DbTransaction::Sqlite(tx) => insert_question_sqlite(&mut **tx, input).await,
            DbTransaction::Mysql(tx) => insert_question_mysql(&mut **tx, input).await,
        };
        match created {
            Ok(detail) => {
                tx.commit().await?;
                Ok(detail)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Failed to roll back question insert: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

fn question_from_input(id: i64, input: &CreateQuestionInput) -> Question {
    Question {
        id,
        part_id: input.part_id,
        question_type: input.question_type.clone(),
        stem_text: input.stem_text.clone(),
        score_weight: input.score_weight,
        question_explain: input.question_explain.clone(),
        time_limit: input.time_limit,
        question_number: input.question_number,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_exams_sqlite(
    pool: &SqlitePool,
    exam_type: Option<&str>,
    part_code: Option<&str>,
) -> Result<Vec<Exam>> {
    let rows = sqlx::query(LIST_EXAMS)
        .bind(exam_type)
        .bind(exam_type)
        .bind(part_code)
        .bind(part_code)
        .fetch_all(pool)
        .await
        .context("Failed to list exams")?;

    Ok(rows.iter().map(row_to_exam_sqlite).collect())
}

async fn get_exam_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Exam>> {
    let sql = format!("{} WHERE e.id = ?", SELECT_EXAM);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exam by ID")?;

    Ok(row.map(|row| row_to_exam_sqlite(&row)))
}

async fn get_parts_sqlite(pool: &SqlitePool, exam_id: i64) -> Result<Vec<ExamPart>> {
    let sql = format!("{} WHERE exam_id = ? ORDER BY order_index, id", SELECT_PART);
    let rows = sqlx::query(&sql)
        .bind(exam_id)
        .fetch_all(pool)
        .await
        .context("Failed to get exam parts")?;

    Ok(rows.iter().map(row_to_part_sqlite).collect())
}

async fn get_part_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<ExamPart>> {
    let sql = format!("{} WHERE id = ?", SELECT_PART);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exam part by ID")?;

    Ok(row.map(|row| row_to_part_sqlite(&row)))
}

async fn get_part_questions_sqlite(pool: &SqlitePool, part_id: i64) -> Result<Vec<Question>> {
    let sql = format!("{} WHERE part_id = ? ORDER BY question_number, id", SELECT_QUESTION);
    let rows = sqlx::query(&sql)
        .bind(part_id)
        .fetch_all(pool)
        .await
        .context("Failed to get part questions")?;

    Ok(rows.iter().map(row_to_question_sqlite).collect())
}

async fn get_part_options_sqlite(pool: &SqlitePool, part_id: i64) -> Result<Vec<QuestionOption>> {
    let rows = sqlx::query(PART_OPTIONS)
        .bind(part_id)
        .fetch_all(pool)
        .await
        .context("Failed to get question options")?;

    Ok(rows.iter().map(row_to_option_sqlite).collect())
}

async fn get_question_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Question>> {
    let sql = format!("{} WHERE id = ?", SELECT_QUESTION);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get question by ID")?;

    Ok(row.map(|row| row_to_question_sqlite(&row)))
}

async fn get_option_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<QuestionOption>> {
    let sql = format!("{} WHERE id = ?", SELECT_OPTION);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get question option by ID")?;

    Ok(row.map(|row| row_to_option_sqlite(&row)))
}

async fn insert_exam_sqlite(pool: &SqlitePool, exam: &Exam) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exams (exam_type, name, description, is_active, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&exam.exam_type)
    .bind(&exam.name)
    .bind(&exam.description)
    .bind(exam.is_active)
    .bind(exam.created_by)
    .bind(exam.created_at)
    .execute(pool)
    .await
    .context("Failed to create exam")?;
    Ok(result.last_insert_rowid())
}

async fn insert_part_sqlite(pool: &SqlitePool, input: &CreateExamPartInput) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO exam_parts (exam_id, part_code, title, order_index) VALUES (?, ?, ?, ?)",
    )
    .bind(input.exam_id)
    .bind(&input.part_code)
    .bind(&input.title)
    .bind(input.order_index)
    .execute(pool)
    .await
    .context("Failed to create exam part")?;
    Ok(result.last_insert_rowid())
}

async fn insert_question_sqlite(
    conn: &mut SqliteConnection,
    input: &CreateQuestionInput,
) -> Result<QuestionDetail> {
    let result = sqlx::query(
        r#"
        INSERT INTO questions (part_id, question_type, stem_text, score_weight,
                               question_explain, time_limit, question_number)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.part_id)
    .bind(&input.question_type)
    .bind(&input.stem_text)
    .bind(input.score_weight)
    .bind(&input.question_explain)
    .bind(input.time_limit)
    .bind(input.question_number)
    .execute(&mut *conn)
    .await
    .context("Failed to create question")?;
    let question = question_from_input(result.last_insert_rowid(), input);

    let mut options = Vec::with_capacity(input.options.len());
    for option in &input.options {
        let result = sqlx::query(
            "INSERT INTO question_options (question_id, content, is_correct) VALUES (?, ?, ?)",
        )
        .bind(question.id)
        .bind(&option.content)
        .bind(option.is_correct)
        .execute(&mut *conn)
        .await
        .context("Failed to create question option")?;

        options.push(QuestionOption {
            id: result.last_insert_rowid(),
            question_id: question.id,
            content: option.content.clone(),
            is_correct: option.is_correct,
        });
    }

    Ok(QuestionDetail { question, options })
}

fn row_to_exam_sqlite(row: &sqlx::sqlite::SqliteRow) -> Exam {
    Exam {
        id: row.get("id"),
        exam_type: row.get("exam_type"),
        name: row.get("name"),
        description: row.get("description"),
        is_active: row.get("is_active"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn row_to_part_sqlite(row: &sqlx::sqlite::SqliteRow) -> ExamPart {
    ExamPart {
        id: row.get("id"),
        exam_id: row.get("exam_id"),
        part_code: row.get("part_code"),
        title: row.get("title"),
        order_index: row.get("order_index"),
    }
}

fn row_to_question_sqlite(row: &sqlx::sqlite::SqliteRow) -> Question {
    Question {
        id: row.get("id"),
        part_id: row.get("part_id"),
        question_type: row.get("question_type"),
        stem_text: row.get("stem_text"),
        score_weight: row.get("score_weight"),
        question_explain: row.get("question_explain"),
        time_limit: row.get("time_limit"),
        question_number: row.get("question_number"),
    }
}

fn row_to_option_sqlite(row: &sqlx::sqlite::SqliteRow) -> QuestionOption {
    QuestionOption {
        id: row.get("id"),
        question_id: row.get("question_id"),
        content: row.get("content"),
        is_correct: row.get("is_correct"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_exams_mysql(
    pool: &MySqlPool,
    exam_type: Option<&str>,
    part_code: Option<&str>,
) -> Result<Vec<Exam>> {
    let rows = sqlx::query(LIST_EXAMS)
        .bind(exam_type)
        .bind(exam_type)
        .bind(part_code)
        .bind(part_code)
        .fetch_all(pool)
        .await
        .context("Failed to list exams")?;

    Ok(rows.iter().map(row_to_exam_mysql).collect())
}

async fn get_exam_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Exam>> {
    let sql = format!("{} WHERE e.id = ?", SELECT_EXAM);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exam by ID")?;

    Ok(row.map(|row| row_to_exam_mysql(&row)))
}

async fn get_parts_mysql(pool: &MySqlPool, exam_id: i64) -> Result<Vec<ExamPart>> {
    let sql = format!("{} WHERE exam_id = ? ORDER BY order_index, id", SELECT_PART);
    let rows = sqlx::query(&sql)
        .bind(exam_id)
        .fetch_all(pool)
        .await
        .context("Failed to get exam parts")?;

    Ok(rows.iter().map(row_to_part_mysql).collect())
}

async fn get_part_mysql(pool: &MySqlPool, id: i64) -> Result<Option<ExamPart>> {
    let sql = format!("{} WHERE id = ?", SELECT_PART);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get exam part by ID")?;

    Ok(row.map(|row| row_to_part_mysql(&row)))
}

async fn get_part_questions_mysql(pool: &MySqlPool, part_id: i64) -> Result<Vec<Question>> {
    let sql = format!("{} WHERE part_id = ? ORDER BY question_number, id", SELECT_QUESTION);
    let rows = sqlx::query(&sql)
        .bind(part_id)
        .fetch_all(pool)
        .await
        .context("Failed to get part questions")?;

    Ok(rows.iter().map(row_to_question_mysql).collect())
}

async fn get_part_options_mysql(pool: &MySqlPool, part_id: i64) -> Result<Vec<QuestionOption>> {
    let rows = sqlx::query(PART_OPTIONS)
        .bind(part_id)
        .fetch_all(pool)
        .await
        .context("Failed to get question options")?;

    Ok(rows.iter().map(row_to_option_mysql).collect())
}

async fn get_question_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Question>> {
    let sql = format!("{} WHERE id = ?", SELECT_QUESTION);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get question by ID")?;

    Ok(row.map(|row| row_to_question_mysql(&row)))
}

async fn get_option_mysql(pool: &MySqlPool, id: i64) -> Result<Option<QuestionOption>> {
    let sql = format!("{} WHERE id = ?", SELECT_OPTION);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get question option by ID")?;

    Ok(row.map(|row| row_to_option_mysql(&row)))
}

async fn insert_exam_mysql(pool: &MySqlPool, exam: &Exam) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO exams (exam_type, name, description, is_active, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&exam.exam_type)
    .bind(&exam.name)
    .bind(&exam.description)
    .bind(exam.is_active)
    .bind(exam.created_by)
    .bind(exam.created_at)
    .execute(pool)
    .await
    .context("Failed to create exam")?;
    Ok(result.last_insert_id() as i64)
}

async fn insert_part_mysql(pool: &MySqlPool, input: &CreateExamPartInput) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO exam_parts (exam_id, part_code, title, order_index) VALUES (?, ?, ?, ?)",
    )
    .bind(input.exam_id)
    .bind(&input.part_code)
    .bind(&input.title)
    .bind(input.order_index)
    .execute(pool)
    .await
    .context("Failed to create exam part")?;
    Ok(result.last_insert_id() as i64)
}

async fn insert_question_mysql(
    conn: &mut MySqlConnection,
    input: &CreateQuestionInput,
) -> Result<QuestionDetail> {
    let result = sqlx::query(
        r#"
        INSERT INTO questions (part_id, question_type, stem_text, score_weight,
                               question_explain, time_limit, question_number)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.part_id)
    .bind(&input.question_type)
    .bind(&input.stem_text)
    .bind(input.score_weight)
    .bind(&input.question_explain)
    .bind(input.time_limit)
    .bind(input.question_number)
    .execute(&mut *conn)
    .await
    .context("Failed to create question")?;
    let question = question_from_input(result.last_insert_id() as i64, input);

    let mut options = Vec::with_capacity(input.options.len());
    for option in &input.options {
        let result = sqlx::query(
            "INSERT INTO question_options (question_id, content, is_correct) VALUES (?, ?, ?)",
        )
        .bind(question.id)
        .bind(&option.content)
        .bind(option.is_correct)
        .execute(&mut *conn)
        .await
        .context("Failed to create question option")?;

        options.push(QuestionOption {
            id: result.last_insert_id() as i64,
            question_id: question.id,
            content: option.content.clone(),
            is_correct: option.is_correct,
        });
    }

    Ok(QuestionDetail { question, options })
}

fn row_to_exam_mysql(row: &sqlx::mysql::MySqlRow) -> Exam {
    Exam {
        id: row.get("id"),
        exam_type: row.get("exam_type"),
        name: row.get("name"),
        description: row.get("description"),
        is_active: row.get("is_active"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn row_to_part_mysql(row: &sqlx::mysql::MySqlRow) -> ExamPart {
    ExamPart {
        id: row.get("id"),
        exam_id: row.get("exam_id"),
        part_code: row.get("part_code"),
        title: row.get("title"),
        order_index: row.get("order_index"),
    }
}

fn row_to_question_mysql(row: &sqlx::mysql::MySqlRow) -> Question {
    Question {
        id: row.get("id"),
        part_id: row.get("part_id"),
        question_type: row.get("question_type"),
        stem_text: row.get("stem_text"),
        score_weight: row.get("score_weight"),
        question_explain: row.get("question_explain"),
        time_limit: row.get("time_limit"),
        question_number: row.get("question_number"),
    }
}

fn row_to_option_mysql(row: &sqlx::mysql::MySqlRow) -> QuestionOption {
    QuestionOption {
        id: row.get("id"),
        question_id: row.get("question_id"),
        content: row.get("content"),
        is_correct: row.get("is_correct"),
    }
}
