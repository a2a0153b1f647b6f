//! Lumina - Backend for an English learning platform
//!
//! Vocabulary lists, articles, events, slides, leaderboards and practice
//! exams behind a JSON API, stored in SQLite or MySQL.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
