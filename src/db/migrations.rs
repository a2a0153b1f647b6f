//! Database migrations module
//!
//! Code-based migrations for the Lumina schema. Every migration carries SQL for
//! both SQLite and MySQL and is recorded in the `_migrations` table once applied.
//!
//! # Usage
//!
//! ```ignore
//! use lumina::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::{Backend, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255) NOT NULL,
                role INTEGER NOT NULL DEFAULT 4,
                avatar_url TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255) NOT NULL,
                role INT NOT NULL DEFAULT 4,
                avatar_url TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_role ON users(role);
        "#,
    },
    Migration {
        version: 2,
        name: "create_vocabulary",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS vocabulary_lists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                make_by INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP,
                updated_by INTEGER,
                is_public BOOLEAN NOT NULL DEFAULT 0,
                status VARCHAR(20),
                rejection_reason TEXT,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (make_by) REFERENCES users(id),
                FOREIGN KEY (updated_by) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_vocabulary_lists_make_by ON vocabulary_lists(make_by);
            CREATE TABLE IF NOT EXISTS vocabularies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                list_id INTEGER NOT NULL,
                word VARCHAR(255) NOT NULL,
                definition TEXT NOT NULL,
                type_of_word VARCHAR(50) NOT NULL,
                category VARCHAR(100),
                example TEXT,
                is_deleted BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (list_id) REFERENCES vocabulary_lists(id)
            );
            CREATE INDEX IF NOT EXISTS idx_vocabularies_list_id ON vocabularies(list_id);
            CREATE INDEX IF NOT EXISTS idx_vocabularies_word ON vocabularies(word);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS vocabulary_lists (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                make_by BIGINT NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NULL,
                updated_by BIGINT NULL,
                is_public BOOLEAN NOT NULL DEFAULT FALSE,
                status VARCHAR(20) NULL,
                rejection_reason TEXT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (make_by) REFERENCES users(id),
                FOREIGN KEY (updated_by) REFERENCES users(id)
            );
            CREATE INDEX idx_vocabulary_lists_make_by ON vocabulary_lists(make_by);
            CREATE TABLE IF NOT EXISTS vocabularies (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                list_id BIGINT NOT NULL,
                word VARCHAR(255) NOT NULL,
                definition TEXT NOT NULL,
                type_of_word VARCHAR(50) NOT NULL,
                category VARCHAR(100) NULL,
                example TEXT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (list_id) REFERENCES vocabulary_lists(id)
            );
            CREATE INDEX idx_vocabularies_list_id ON vocabularies(list_id);
            CREATE INDEX idx_vocabularies_word ON vocabularies(word);
        "#,
    },
    Migration {
        version: 3,
        name: "create_articles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS article_categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL,
                created_by INTEGER NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                summary TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                created_by INTEGER NOT NULL,
                updated_by INTEGER,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP,
                is_published BOOLEAN NOT NULL DEFAULT 0,
                status VARCHAR(20) NOT NULL DEFAULT 'Draft',
                rejection_reason TEXT,
                FOREIGN KEY (category_id) REFERENCES article_categories(id),
                FOREIGN KEY (created_by) REFERENCES users(id),
                FOREIGN KEY (updated_by) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_articles_category_id ON articles(category_id);
            CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at);
            CREATE TABLE IF NOT EXISTS article_sections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                section_title VARCHAR(255) NOT NULL,
                section_content TEXT NOT NULL,
                order_index INTEGER NOT NULL CHECK (order_index >= 0),
                FOREIGN KEY (article_id) REFERENCES articles(id)
            );
            CREATE INDEX IF NOT EXISTS idx_article_sections_article_id ON article_sections(article_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS article_categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL UNIQUE,
                created_at DATETIME NOT NULL,
                created_by BIGINT NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
            CREATE TABLE IF NOT EXISTS articles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                summary TEXT NOT NULL,
                category_id BIGINT NOT NULL,
                created_by BIGINT NOT NULL,
                updated_by BIGINT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NULL,
                is_published BOOLEAN NOT NULL DEFAULT FALSE,
                status VARCHAR(20) NOT NULL DEFAULT 'Draft',
                rejection_reason TEXT NULL,
                FOREIGN KEY (category_id) REFERENCES article_categories(id),
                FOREIGN KEY (created_by) REFERENCES users(id),
                FOREIGN KEY (updated_by) REFERENCES users(id)
            );
            CREATE INDEX idx_articles_category_id ON articles(category_id);
            CREATE INDEX idx_articles_created_at ON articles(created_at);
            CREATE TABLE IF NOT EXISTS article_sections (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                article_id BIGINT NOT NULL,
                section_title VARCHAR(255) NOT NULL,
                section_content TEXT NOT NULL,
                order_index INT NOT NULL CHECK (order_index >= 0),
                FOREIGN KEY (article_id) REFERENCES articles(id)
            );
            CREATE INDEX idx_article_sections_article_id ON article_sections(article_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_user_notes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS user_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                section_id INTEGER NOT NULL,
                note_content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP,
                UNIQUE (user_id, article_id, section_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (section_id) REFERENCES article_sections(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS user_notes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                section_id BIGINT NOT NULL,
                note_content TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NULL,
                UNIQUE KEY uq_user_notes_target (user_id, article_id, section_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (section_id) REFERENCES article_sections(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_events_and_slides",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_name VARCHAR(255) NOT NULL,
                content TEXT,
                start_date TIMESTAMP NOT NULL,
                end_date TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP,
                created_by INTEGER NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_events_start_date ON events(start_date);
            CREATE TABLE IF NOT EXISTS slides (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slide_name VARCHAR(255) NOT NULL,
                slide_url TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP,
                created_by INTEGER NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS events (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                event_name VARCHAR(255) NOT NULL,
                content TEXT NULL,
                start_date DATETIME NOT NULL,
                end_date DATETIME NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NULL,
                created_by BIGINT NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
            CREATE INDEX idx_events_start_date ON events(start_date);
            CREATE TABLE IF NOT EXISTS slides (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slide_name VARCHAR(255) NOT NULL,
                slide_url TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NULL,
                created_by BIGINT NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_leaderboards",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS leaderboards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                season_name VARCHAR(255),
                season_number INTEGER NOT NULL,
                start_date TIMESTAMP,
                end_date TIMESTAMP,
                is_active BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS user_leaderboards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                leaderboard_id INTEGER NOT NULL,
                score INTEGER NOT NULL DEFAULT 0,
                UNIQUE (user_id, leaderboard_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (leaderboard_id) REFERENCES leaderboards(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_user_leaderboards_board ON user_leaderboards(leaderboard_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS leaderboards (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                season_name VARCHAR(255) NULL,
                season_number INT NOT NULL,
                start_date DATETIME NULL,
                end_date DATETIME NULL,
                is_active BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NULL
            );
            CREATE TABLE IF NOT EXISTS user_leaderboards (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                leaderboard_id BIGINT NOT NULL,
                score INT NOT NULL DEFAULT 0,
                UNIQUE KEY uq_user_leaderboards (user_id, leaderboard_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (leaderboard_id) REFERENCES leaderboards(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_user_leaderboards_board ON user_leaderboards(leaderboard_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_exams",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS exams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exam_type VARCHAR(50) NOT NULL,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_by INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
            CREATE TABLE IF NOT EXISTS exam_parts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exam_id INTEGER NOT NULL,
                part_code VARCHAR(50) NOT NULL,
                title VARCHAR(255) NOT NULL,
                order_index INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_exam_parts_exam_id ON exam_parts(exam_id);
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                part_id INTEGER NOT NULL,
                question_type VARCHAR(50) NOT NULL,
                stem_text TEXT,
                score_weight INTEGER NOT NULL DEFAULT 1,
                question_explain TEXT,
                time_limit INTEGER NOT NULL DEFAULT 0,
                question_number INTEGER NOT NULL,
                FOREIGN KEY (part_id) REFERENCES exam_parts(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_questions_part_id ON questions(part_id);
            CREATE TABLE IF NOT EXISTS question_options (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                is_correct BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_question_options_question_id ON question_options(question_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS exams (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                exam_type VARCHAR(50) NOT NULL,
                name VARCHAR(255) NOT NULL,
                description TEXT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_by BIGINT NOT NULL,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (created_by) REFERENCES users(id)
            );
            CREATE TABLE IF NOT EXISTS exam_parts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                exam_id BIGINT NOT NULL,
                part_code VARCHAR(50) NOT NULL,
                title VARCHAR(255) NOT NULL,
                order_index INT NOT NULL DEFAULT 0,
                FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_exam_parts_exam_id ON exam_parts(exam_id);
            CREATE TABLE IF NOT EXISTS questions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                part_id BIGINT NOT NULL,
                question_type VARCHAR(50) NOT NULL,
                stem_text TEXT NULL,
                score_weight INT NOT NULL DEFAULT 1,
                question_explain TEXT NULL,
                time_limit INT NOT NULL DEFAULT 0,
                question_number INT NOT NULL,
                FOREIGN KEY (part_id) REFERENCES exam_parts(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_questions_part_id ON questions(part_id);
            CREATE TABLE IF NOT EXISTS question_options (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                question_id BIGINT NOT NULL,
                content TEXT NOT NULL,
                is_correct BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_question_options_question_id ON question_options(question_id);
        "#,
    },
    Migration {
        version: 8,
        name: "create_exam_attempts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS exam_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                exam_id INTEGER NOT NULL,
                exam_part_id INTEGER,
                start_time TIMESTAMP NOT NULL,
                end_time TIMESTAMP,
                score INTEGER,
                status VARCHAR(20) NOT NULL DEFAULT 'Doing',
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (exam_id) REFERENCES exams(id),
                FOREIGN KEY (exam_part_id) REFERENCES exam_parts(id)
            );
            CREATE INDEX IF NOT EXISTS idx_exam_attempts_user_id ON exam_attempts(user_id);
            CREATE TABLE IF NOT EXISTS attempt_choice_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                selected_option_id INTEGER NOT NULL,
                is_correct BOOLEAN NOT NULL,
                score INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (attempt_id) REFERENCES exam_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id),
                FOREIGN KEY (selected_option_id) REFERENCES question_options(id)
            );
            CREATE TABLE IF NOT EXISTS attempt_writing_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                answer_content TEXT NOT NULL,
                feedback TEXT,
                FOREIGN KEY (attempt_id) REFERENCES exam_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id)
            );
            CREATE TABLE IF NOT EXISTS attempt_speaking_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attempt_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                transcript TEXT,
                audio_url TEXT,
                overall_score REAL,
                FOREIGN KEY (attempt_id) REFERENCES exam_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS exam_attempts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                exam_id BIGINT NOT NULL,
                exam_part_id BIGINT NULL,
                start_time DATETIME NOT NULL,
                end_time DATETIME NULL,
                score INT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'Doing',
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (exam_id) REFERENCES exams(id),
                FOREIGN KEY (exam_part_id) REFERENCES exam_parts(id)
            );
            CREATE INDEX idx_exam_attempts_user_id ON exam_attempts(user_id);
            CREATE TABLE IF NOT EXISTS attempt_choice_answers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                attempt_id BIGINT NOT NULL,
                question_id BIGINT NOT NULL,
                selected_option_id BIGINT NOT NULL,
                is_correct BOOLEAN NOT NULL,
                score INT NOT NULL DEFAULT 0,
                FOREIGN KEY (attempt_id) REFERENCES exam_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id),
                FOREIGN KEY (selected_option_id) REFERENCES question_options(id)
            );
            CREATE TABLE IF NOT EXISTS attempt_writing_answers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                attempt_id BIGINT NOT NULL,
                question_id BIGINT NOT NULL,
                answer_content TEXT NOT NULL,
                feedback TEXT NULL,
                FOREIGN KEY (attempt_id) REFERENCES exam_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id)
            );
            CREATE TABLE IF NOT EXISTS attempt_speaking_answers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                attempt_id BIGINT NOT NULL,
                question_id BIGINT NOT NULL,
                transcript TEXT NULL,
                audio_url TEXT NULL,
                overall_score DOUBLE NULL,
                FOREIGN KEY (attempt_id) REFERENCES exam_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id)
            );
        "#,
    },
    Migration {
        version: 9,
        name: "create_sessions",
        up_sqlite: r#"
            ALTER TABLE users ADD COLUMN password_hash VARCHAR(255) NOT NULL DEFAULT '';
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            ALTER TABLE users ADD COLUMN password_hash VARCHAR(255) NOT NULL DEFAULT '';
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at DATETIME NOT NULL,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 10,
        name: "create_spaced_repetitions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS user_spaced_repetitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                vocabulary_list_id INTEGER NOT NULL,
                vocabulary_id INTEGER,
                last_reviewed_at TIMESTAMP,
                next_review_at TIMESTAMP,
                review_count INTEGER NOT NULL DEFAULT 0,
                intervals INTEGER NOT NULL DEFAULT 1,
                status VARCHAR(20) NOT NULL DEFAULT 'New',
                best_quiz_score INTEGER,
                last_quiz_score INTEGER,
                last_quiz_completed_at TIMESTAMP,
                total_quiz_attempts INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (vocabulary_list_id) REFERENCES vocabulary_lists(id),
                FOREIGN KEY (vocabulary_id) REFERENCES vocabularies(id)
            );
            CREATE INDEX IF NOT EXISTS idx_spaced_repetitions_user_list ON user_spaced_repetitions(user_id, vocabulary_list_id);
            CREATE INDEX IF NOT EXISTS idx_spaced_repetitions_next_review ON user_spaced_repetitions(user_id, next_review_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS user_spaced_repetitions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                vocabulary_list_id BIGINT NOT NULL,
                vocabulary_id BIGINT NULL,
                last_reviewed_at DATETIME NULL,
                next_review_at DATETIME NULL,
                review_count INT NOT NULL DEFAULT 0,
                intervals INT NOT NULL DEFAULT 1,
                status VARCHAR(20) NOT NULL DEFAULT 'New',
                best_quiz_score INT NULL,
                last_quiz_score INT NULL,
                last_quiz_completed_at DATETIME NULL,
                total_quiz_attempts INT NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (vocabulary_list_id) REFERENCES vocabulary_lists(id),
                FOREIGN KEY (vocabulary_id) REFERENCES vocabularies(id)
            );
            CREATE INDEX idx_spaced_repetitions_user_list ON user_spaced_repetitions(user_id, vocabulary_list_id);
            CREATE INDEX idx_spaced_repetitions_next_review ON user_spaced_repetitions(user_id, next_review_at);
        "#,
    },
    Migration {
        version: 11,
        name: "create_article_progress",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS user_article_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                article_id INTEGER NOT NULL,
                progress_percent INTEGER NOT NULL DEFAULT 0 CHECK (progress_percent BETWEEN 0 AND 100),
                status VARCHAR(20) NOT NULL DEFAULT 'not_started',
                last_accessed_at TIMESTAMP NOT NULL,
                completed_at TIMESTAMP,
                UNIQUE (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS user_article_progress (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                article_id BIGINT NOT NULL,
                progress_percent INT NOT NULL DEFAULT 0 CHECK (progress_percent BETWEEN 0 AND 100),
                status VARCHAR(20) NOT NULL DEFAULT 'not_started',
                last_accessed_at DATETIME NOT NULL,
                completed_at DATETIME NULL,
                UNIQUE KEY uq_user_article_progress (user_id, article_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
            );
        "#,
    },
];

/// Run all pending database migrations.
///
/// Creates the `_migrations` tracking table if needed, then applies every
/// migration whose version has not been recorded yet, in order.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.backend() {
        Backend::Sqlite(pool) => get_applied_migrations_sqlite(pool).await,
        Backend::Mysql(pool) => get_applied_migrations_mysql(pool).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get::<i32, _>("version") as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.backend() {
        Backend::Sqlite(pool) => apply_migration_sqlite(pool, migration).await,
        Backend::Mysql(pool) => apply_migration_mysql(pool, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin migration")?;

    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.context("Failed to commit migration")?;
    Ok(())
}

// MySQL commits DDL implicitly, so statements run directly on the pool.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}
