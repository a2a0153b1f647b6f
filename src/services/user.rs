//! User service
//!
//! Registration, password login and session tokens. Request identity
//! resolves through [`UserService::validate_session`].

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, LoginInput, Session, User};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

use super::password::{hash_password, verify_password};
use super::{require_id, require_text, ServiceError, ServiceResult};

/// Default session lifetime in days
pub const DEFAULT_SESSION_DAYS: i64 = 7;

const MIN_PASSWORD_LENGTH: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_days(repo, sessions, DEFAULT_SESSION_DAYS)
    }

    /// Create a user service issuing sessions valid for `session_days`
    pub fn with_session_days(
        repo: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            repo,
            sessions,
            session_days,
        }
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<User> {
        require_id(id, "userId")?;
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))
    }

    /// Register a user; the email must be unique
    pub async fn create(&self, mut input: CreateUserInput) -> ServiceResult<User> {
        input.email = input.email.trim().to_lowercase();
        require_text(&input.email, "Email")?;
        require_text(&input.full_name, "Full name")?;
        if !input.email.contains('@') {
            return Err(ServiceError::Validation("Email is not valid.".to_string()));
        }
        if input.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LENGTH
            )));
        }
        if self.repo.exists_by_email(&input.email).await? {
            return Err(ServiceError::Validation(
                "Email is already registered.".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self.repo.create(&input, &password_hash).await?;
        tracing::info!("Registered user {} ({})", user.id, user.role);
        Ok(user)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, input: LoginInput) -> ServiceResult<Session> {
        let email = input.email.trim().to_lowercase();
        let invalid = || ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string());

        let user = self.repo.get_by_email(&email).await?.ok_or_else(invalid)?;
        if user.password_hash.is_empty()
            || !verify_password(&input.password, &user.password_hash)?
        {
            tracing::debug!("Rejected login for user {}", user.id);
            return Err(invalid());
        }
        if !user.is_active {
            return Err(ServiceError::Unauthorized("Account is inactive".to_string()));
        }

        self.create_session(user.id).await
    }

    /// Issue a session for a known user
    pub async fn create_session(&self, user_id: i64) -> ServiceResult<Session> {
        require_id(user_id, "userId")?;
        let session = self
            .sessions
            .create(&Session::issue(user_id, self.session_days))
            .await?;
        tracing::info!("Opened session for user {}", user_id);
        Ok(session)
    }

    /// Invalidate a session token; unknown tokens are ignored
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        if self.sessions.delete(token).await? {
            tracing::debug!("Closed session");
        }
        Ok(())
    }

    /// Resolve a token to its active user.
    ///
    /// Unknown, expired and inactive-user sessions all yield `None`; an
    /// expired session is removed on the way.
    pub async fn validate_session(&self, token: &str) -> ServiceResult<Option<User>> {
        let Some(session) = self.sessions.get_by_id(token).await? else {
            return Ok(None);
        };

        if session.is_expired() {
            self.sessions
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self.repo.get_by_id(session.user_id).await?;
        Ok(user.filter(|user| user.is_active))
    }

    /// Remove every expired session, returning how many were dropped
    pub async fn purge_expired_sessions(&self) -> ServiceResult<u64> {
        Ok(self.sessions.delete_expired(Utc::now()).await?)
    }
}
