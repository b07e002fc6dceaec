//! Document intake and last-document session storage

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::ViewerError;
use crate::fingerprint::Fingerprint;
use crate::storage::KeyValueStore;

/// Session storage key for the last opened document
pub const LAST_DOCUMENT_KEY: &str = "lastPdf";

/// MIME type accepted for uploads
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Leading bytes of every PDF file
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Whether an upload looks like a PDF by MIME type or file name
pub fn is_pdf_file(name: &str, mime_type: Option<&str>) -> bool {
    mime_type == Some(PDF_MIME_TYPE) || name.to_lowercase().ends_with(".pdf")
}

/// Check that `bytes` hold a PDF
pub fn validate_document(bytes: &[u8]) -> Result<(), ViewerError> {
    if bytes.is_empty() {
        return Err(ViewerError::InvalidDocument("document is empty".to_string()));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ViewerError::InvalidDocument(
            "missing PDF header".to_string(),
        ));
    }
    Ok(())
}

/// A validated document and its fingerprint
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    fingerprint: Fingerprint,
}

impl Document {
    /// Validate `bytes` and compute the fingerprint
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ViewerError> {
        validate_document(&bytes)?;
        let fingerprint = Fingerprint::compute(&bytes);
        Ok(Self { bytes, fingerprint })
    }

    /// Validate an upload by name, MIME type and content
    pub fn from_upload(
        name: &str,
        mime_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, ViewerError> {
        if !is_pdf_file(name, mime_type) {
            return Err(ViewerError::InvalidDocument(format!(
                "{} is not a PDF file",
                name
            )));
        }
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Keeps the last opened document in session storage as base64
pub struct DocumentSessionStore<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> DocumentSessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Remember `bytes` as the last document
    ///
    /// On failure the key is removed so a stale document is never restored.
    pub async fn save(&self, bytes: &[u8]) {
        let encoded = STANDARD.encode(bytes);
        if let Err(e) = self.storage.set(LAST_DOCUMENT_KEY, &encoded).await {
            tracing::error!(error = %e, size = bytes.len(), "Failed to save document to session");
            self.clear().await;
        }
    }

    /// Bytes of the last document, if any
    ///
    /// Undecodable data is removed and yields `None`.
    pub async fn restore(&self) -> Option<Vec<u8>> {
        let encoded = match self.storage.get(LAST_DOCUMENT_KEY).await {
            Ok(Some(encoded)) => encoded,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read document from session");
                return None;
            }
        };

        match STANDARD.decode(encoded.as_bytes()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!(error = %e, "Failed to decode document from session");
                self.clear().await;
                None
            }
        }
    }

    /// Forget the last document
    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove(LAST_DOCUMENT_KEY).await {
            tracing::warn!(error = %e, "Failed to remove document from session");
        }
    }
}
