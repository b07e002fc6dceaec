//! Route modules for the ReaDefy server

pub mod auth;
pub mod chat;
pub mod health;

use crate::error::AppError;

/// Fallback for unmatched paths
pub async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}
