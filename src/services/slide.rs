//! Slide service

use crate::db::repositories::SlideRepository;
use crate::models::{CreateSlideInput, Slide, UpdateSlideInput};
use std::sync::Arc;

use super::{require_id, require_text, ServiceError, ServiceResult};

pub struct SlideService {
    repo: Arc<dyn SlideRepository>,
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Slide not found.".to_string())
}

impl SlideService {
    pub fn new(repo: Arc<dyn SlideRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Slide> {
        require_id(id, "slideId")?;
        self.repo.get_by_id(id).await?.ok_or_else(not_found)
    }

    pub async fn list(&self, keyword: Option<&str>, is_active: Option<bool>) -> ServiceResult<Vec<Slide>> {
        Ok(self.repo.list(keyword, is_active).await?)
    }

    pub async fn create(&self, input: CreateSlideInput, created_by: i64) -> ServiceResult<Slide> {
        require_text(&input.slide_name, "Slide name")?;
        require_text(&input.slide_url, "Slide URL")?;
        Ok(self.repo.create(&input, created_by).await?)
    }

    pub async fn update(&self, id: i64, input: UpdateSlideInput) -> ServiceResult<Slide> {
        require_id(id, "slideId")?;
        if let Some(name) = &input.slide_name {
            require_text(name, "Slide name")?;
        }
        if let Some(url) = &input.slide_url {
            require_text(url, "Slide URL")?;
        }
        self.repo.update(id, &input).await?.ok_or_else(not_found)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        require_id(id, "slideId")?;
        if !self.repo.delete(id).await? {
            return Err(not_found());
        }
        Ok(())
    }
}
