//! Exam attempt service
//!
//! Attempts belong to the user who started them; other users see them as
//! missing. Answers are accepted only while an attempt is in progress.

use crate::db::repositories::{ExamAttemptRepository, ExamRepository};
use crate::models::{
    AttemptDetail, AttemptStatus, AttemptSummary, ChoiceAnswer, ChoiceAnswerInput, ExamAttempt,
    FinishAttemptInput, Question, SpeakingAnswer, SpeakingAnswerInput, StartAttemptInput,
    WritingAnswer, WritingAnswerInput,
};
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

pub struct ExamAttemptService {
    repo: Arc<dyn ExamAttemptRepository>,
    exams: Arc<dyn ExamRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Exam attempt not found.".to_string())
}

impl ExamAttemptService {
    pub fn new(repo: Arc<dyn ExamAttemptRepository>, exams: Arc<dyn ExamRepository>) -> Self {
        Self { repo, exams }
    }

    /// Open an attempt on a whole exam, or on one of its parts
    pub async fn start(&self, user_id: i64, input: StartAttemptInput) -> ServiceResult<ExamAttempt> {
        require_id(user_id, "userId")?;
        require_id(input.exam_id, "examId")?;
        let exam = self
            .exams
            .get_by_id(input.exam_id)
            .await?
            .filter(|exam| exam.is_active)
            .ok_or_else(|| ServiceError::NotFound("Exam not found.".to_string()))?;

        if let Some(part_id) = input.exam_part_id {
            require_id(part_id, "partId")?;
            let part = self
                .exams
                .get_part(part_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Exam part not found.".to_string()))?;
            if part.exam_id != exam.id {
                return Err(ServiceError::Validation(
                    "The part does not belong to this exam.".to_string(),
                ));
            }
        }

        let attempt = self.repo.start(user_id, &input).await?;
        tracing::info!("User {} started attempt {} on exam {}", user_id, attempt.id, exam.id);
        Ok(attempt)
    }

    pub async fn finish(
        &self,
        id: i64,
        user_id: i64,
        input: FinishAttemptInput,
    ) -> ServiceResult<ExamAttempt> {
        require_id(id, "attemptId")?;
        if input.score < 0 {
            return Err(ServiceError::Validation("Score must not be negative.".to_string()));
        }
        let attempt = self.load_open(id, user_id).await?;
        if let Some(end_time) = input.end_time {
            if end_time < attempt.start_time {
                return Err(ServiceError::Validation(
                    "End time must not be before the start time.".to_string(),
                ));
            }
        }

        let finished = self.repo.finish(id, &input).await?.ok_or_else(not_found)?;
        tracing::info!("Attempt {} finished with score {}", id, input.score);
        Ok(finished)
    }

    pub async fn list_by_user(&self, user_id: i64) -> ServiceResult<Vec<AttemptSummary>> {
        require_id(user_id, "userId")?;
        Ok(self.repo.list_by_user(user_id).await?)
    }

    pub async fn get_detail(&self, id: i64, user_id: i64) -> ServiceResult<AttemptDetail> {
        require_id(id, "attemptId")?;
        self.repo
            .get_detail(id)
            .await?
            .filter(|detail| detail.summary.attempt.user_id == user_id)
            .ok_or_else(not_found)
    }

    /// Record a reading or listening answer
    pub async fn save_multiple_choice_answer(
        &self,
        user_id: i64,
        input: ChoiceAnswerInput,
    ) -> ServiceResult<ChoiceAnswer> {
        require_id(input.attempt_id, "attemptId")?;
        require_id(input.question_id, "questionId")?;
        require_id(input.selected_option_id, "optionId")?;
        self.load_open(input.attempt_id, user_id).await?;
        let question = self.load_question(input.question_id).await?;

        let option = self
            .exams
            .get_option(input.selected_option_id)
            .await?
            .filter(|option| option.question_id == question.id)
            .ok_or_else(|| {
                ServiceError::Validation("The option does not belong to this question.".to_string())
            })?;

        Ok(self
            .repo
            .save_multiple_choice_answer(input.attempt_id, &question, &option)
            .await?)
    }

    pub async fn save_writing_answer(
        &self,
        user_id: i64,
        input: WritingAnswerInput,
    ) -> ServiceResult<WritingAnswer> {
        require_id(input.attempt_id, "attemptId")?;
        require_id(input.question_id, "questionId")?;
        require_text(&input.answer_content, "Answer")?;
        self.load_open(input.attempt_id, user_id).await?;
        let question = self.load_question(input.question_id).await?;

        Ok(self.repo.save_writing_answer(&input, &question).await?)
    }

    pub async fn save_speaking_answer(
        &self,
        user_id: i64,
        input: SpeakingAnswerInput,
    ) -> ServiceResult<SpeakingAnswer> {
        require_id(input.attempt_id, "attemptId")?;
        require_id(input.question_id, "questionId")?;
        if input.transcript.is_none() && input.audio_url.is_none() {
            return Err(ServiceError::Validation(
                "A transcript or an audio URL is required.".to_string(),
            ));
        }
        self.load_open(input.attempt_id, user_id).await?;
        let question = self.load_question(input.question_id).await?;

        Ok(self.repo.save_speaking_answer(&input, &question).await?)
    }

    /// The user's attempt, still in progress
    async fn load_open(&self, id: i64, user_id: i64) -> ServiceResult<ExamAttempt> {
        let attempt = self
            .repo
            .get_by_id(id)
            .await?
            .filter(|attempt| attempt.user_id == user_id)
            .ok_or_else(not_found)?;
        if attempt.status != AttemptStatus::Doing {
            return Err(ServiceError::InvalidState(
                "The attempt is already completed.".to_string(),
            ));
        }
        Ok(attempt)
    }

    async fn load_question(&self, id: i64) -> ServiceResult<Question> {
        self.exams
            .get_question(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Question not found.".to_string()))
    }
}
