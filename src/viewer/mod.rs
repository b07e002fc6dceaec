//! Viewing session
//!
//! Ties one open document to its annotation store, the tool controller and
//! the per-page annotation layers.

pub mod document;
pub mod session;

pub use document::{
    is_pdf_file, validate_document, Document, DocumentSessionStore, LAST_DOCUMENT_KEY,
};
pub use session::ViewerSession;

use thiserror::Error;

use crate::storage::StorageError;

/// Viewer errors
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("No document is open")]
    NoDocument,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
