//! User account database operations

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// A stored user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub registration_no: Option<String>,
    pub created_at: String,
}

/// Public view of a user returned by the auth endpoints
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Fields required to create a user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub registration_no: Option<&'a str>,
}

/// Repository for user accounts
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user and return the stored row
    pub async fn create(&self, user: &NewUser<'_>) -> Result<User> {
        let id = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, name, registration_no)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.name)
        .bind(user.registration_no)
        .execute(self.pool)
        .await?
        .last_insert_rowid();

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} missing after insert", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, registration_no, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, registration_no, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Whether an account already uses `email`
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
