//! Chat message database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// A message in the shared chat room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub message: String,
    pub created_at: String,
}

/// Repository for chat messages
pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of messages, newest first
    pub async fn list_recent(&self, limit: i64, offset: i64) -> Result<Vec<ChatMessage>> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, user_id, user_name, message, created_at
            FROM chat_messages
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(messages)
    }

    /// Store a message and return it as saved
    pub async fn create(&self, user_id: i64, user_name: &str, message: &str) -> Result<ChatMessage> {
        let id = sqlx::query(
            "INSERT INTO chat_messages (user_id, user_name, message) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(user_name)
        .bind(message)
        .execute(self.pool)
        .await?
        .last_insert_rowid();

        self.get(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Message {} missing after insert", id)))
    }

    pub async fn get(&self, id: i64) -> Result<Option<ChatMessage>> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, user_id, user_name, message, created_at
            FROM chat_messages
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(message)
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(self.pool)
            .await?;

        Ok(row.0)
    }
}
