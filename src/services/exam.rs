//! Exam catalog service
//!
//! Catalog reads go through the shared cache: exam lists under
//! `exams:list:<type>:<part>` and exam details under `exams:detail:<id>`.
//! Every authoring write drops the whole `exams:` prefix.

use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::ExamRepository;
use crate::models::{
    CreateExamInput, CreateExamPartInput, CreateQuestionInput, Exam, ExamDetail, ExamFilter,
    ExamPart, ExamPartDetail, QuestionDetail,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

const CACHE_PREFIX: &str = "exams:";

pub struct ExamService {
    repo: Arc<dyn ExamRepository>,
    cache: SharedCache,
}

fn detail_key(id: i64) -> String {
    format!("exams:detail:{}", id)
}

impl ExamService {
    pub fn new(repo: Arc<dyn ExamRepository>, cache: SharedCache) -> Self {
        Self { repo, cache }
    }

    /// Active exams matching the filter
    pub async fn list(&self, filter: &ExamFilter) -> ServiceResult<Vec<Exam>> {
        let key = filter.cache_key();
        if let Some(exams) = self.cached(&key).await {
            return Ok(exams);
        }

        let exams = self.repo.list(filter).await?;
        self.store(&key, &exams).await;
        Ok(exams)
    }

    pub async fn get_detail(&self, id: i64) -> ServiceResult<ExamDetail> {
        require_id(id, "examId")?;
        let key = detail_key(id);
        if let Some(detail) = self.cached(&key).await {
            return Ok(detail);
        }

        let detail = self
            .repo
            .get_detail(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Exam not found.".to_string()))?;
        self.store(&key, &detail).await;
        Ok(detail)
    }

    pub async fn get_part_detail(&self, part_id: i64) -> ServiceResult<ExamPartDetail> {
        require_id(part_id, "partId")?;
        self.repo
            .get_part_detail(part_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Exam part not found.".to_string()))
    }

    pub async fn create_exam(&self, input: CreateExamInput, created_by: i64) -> ServiceResult<Exam> {
        require_text(&input.name, "Exam name")?;
        require_text(&input.exam_type, "Exam type")?;

        let exam = self.repo.create_exam(&input, created_by).await?;
        self.invalidate().await?;
        tracing::info!("Created exam {} ({})", exam.id, exam.name);
        Ok(exam)
    }

    pub async fn create_part(&self, input: CreateExamPartInput) -> ServiceResult<ExamPart> {
        require_id(input.exam_id, "examId")?;
        require_text(&input.part_code, "Part code")?;
        if self.repo.get_by_id(input.exam_id).await?.is_none() {
            return Err(ServiceError::NotFound("Exam not found.".to_string()));
        }

        let part = self.repo.create_part(&input).await?;
        self.invalidate().await?;
        Ok(part)
    }

    /// Add a question with its options; exactly one option must be correct
    pub async fn create_question(&self, input: CreateQuestionInput) -> ServiceResult<QuestionDetail> {
        require_id(input.part_id, "partId")?;
        require_text(&input.question_type, "Question type")?;
        if !input.options.is_empty() && input.options.iter().filter(|o| o.is_correct).count() != 1 {
            return Err(ServiceError::Validation(
                "Exactly one option must be marked correct.".to_string(),
            ));
        }
        if self.repo.get_part(input.part_id).await?.is_none() {
            return Err(ServiceError::NotFound("Exam part not found.".to_string()));
        }

        let question = self.repo.create_question(&input).await?;
        self.invalidate().await?;
        Ok(question)
    }

    async fn cached<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store<T: Serialize + Send + Sync>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set_default(key, value).await {
            tracing::warn!("Failed to cache {}: {}", key, e);
        }
    }

    async fn invalidate(&self) -> ServiceResult<()> {
        self.cache.delete_prefix(CACHE_PREFIX).await?;
        Ok(())
    }
}
