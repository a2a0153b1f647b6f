//! User model
//!
//! Users are referenced by id from almost every other entity (creators,
//! editors, attempt owners, leaderboard participants).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Argon2 PHC string; empty when the account has no password login
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

impl User {
    pub fn new(email: String, full_name: String, role: UserRole) -> Self {
        Self {
            id: 0, // Will be set by the database
            email,
            full_name,
            role,
            avatar_url: None,
            is_active: true,
            created_at: Utc::now(),
            password_hash: String::new(),
        }
    }

    /// Admins, managers and staff may curate shared content.
    pub fn is_staff(&self) -> bool {
        !matches!(self.role, UserRole::Customer)
    }

    /// Admins and managers review submitted content.
    pub fn can_review(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Manager)
    }
}

/// User role, stored as its numeric id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
    #[default]
    Customer,
}

impl UserRole {
    pub fn id(&self) -> i32 {
        match self {
            UserRole::Admin => 1,
            UserRole::Manager => 2,
            UserRole::Staff => 3,
            UserRole::Customer => 4,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(UserRole::Admin),
            2 => Some(UserRole::Manager),
            3 => Some(UserRole::Staff),
            4 => Some(UserRole::Customer),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserRole::Admin => "Admin",
            UserRole::Manager => "Manager",
            UserRole::Staff => "Staff",
            UserRole::Customer => "Customer",
        };
        f.write_str(name)
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Plaintext, hashed before it is stored
    #[serde(skip_serializing)]
    pub password: String,
}
