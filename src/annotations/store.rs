//! Annotation store
//!
//! Owns the [`AnnotationMap`] of the open document and mirrors it to durable
//! storage under the document's fingerprint key. Storage faults never reach
//! the caller: a failed read loads an empty map and a failed write is logged
//! and dropped.

use std::sync::Arc;

use super::types::{Annotation, AnnotationKind, AnnotationMap, PageAnnotations};
use crate::fingerprint::Fingerprint;
use crate::storage::KeyValueStore;

/// In-memory annotations of one document plus their durable mirror
///
/// Mutations are copy-on-write: a snapshot taken with [`snapshot`] is never
/// changed by later calls.
///
/// [`snapshot`]: AnnotationStore::snapshot
pub struct AnnotationStore<S: KeyValueStore> {
    storage: S,
    fingerprint: Option<Fingerprint>,
    annotations: Arc<AnnotationMap>,
}

impl<S: KeyValueStore> AnnotationStore<S> {
    /// Create an empty store with no document bound
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            fingerprint: None,
            annotations: Arc::new(AnnotationMap::new()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Fingerprint of the bound document
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// Current map
    pub fn annotations(&self) -> &AnnotationMap {
        &self.annotations
    }

    /// Immutable handle to the current map
    pub fn snapshot(&self) -> Arc<AnnotationMap> {
        Arc::clone(&self.annotations)
    }

    pub fn page(&self, page: u32) -> Option<&PageAnnotations> {
        self.annotations.page(page)
    }

    /// Bind the store to `fingerprint` and load its stored annotations
    ///
    /// Missing, unreadable or malformed entries all load as an empty map.
    pub async fn load(&mut self, fingerprint: Fingerprint) {
        let key = fingerprint.storage_key();
        let map = match self.storage.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str::<AnnotationMap>(&json) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding malformed annotations");
                    AnnotationMap::new()
                }
            },
            Ok(None) => AnnotationMap::new(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read annotations");
                AnnotationMap::new()
            }
        };

        tracing::debug!(
            key = %key,
            pages = map.page_count(),
            annotations = map.annotation_count(),
            "Loaded annotations"
        );
        self.fingerprint = Some(fingerprint);
        self.annotations = Arc::new(map);
    }

    /// Unbind the document, keeping its durable entry
    pub fn unload(&mut self) {
        self.fingerprint = None;
        self.annotations = Arc::new(AnnotationMap::new());
    }

    /// Append `annotation` to `page`, creating the page entry if needed
    pub async fn add(&mut self, page: u32, annotation: Annotation) {
        Arc::make_mut(&mut self.annotations)
            .page_mut(page)
            .push(annotation);
        self.persist().await;
    }

    /// Remove the `kind` annotation `id` from `page`
    ///
    /// Returns whether anything was removed; a miss leaves the map and
    /// storage untouched.
    pub async fn delete(&mut self, page: u32, id: &str, kind: AnnotationKind) -> bool {
        let present = self.annotations.page(page).is_some_and(|set| match kind {
            AnnotationKind::Highlight => set.highlights.iter().any(|h| h.id == id),
            AnnotationKind::Drawing => set.drawings.iter().any(|d| d.id == id),
        });
        if !present {
            return false;
        }

        if let Some(set) = Arc::make_mut(&mut self.annotations).existing_page_mut(page) {
            set.remove(id, kind);
        }
        self.persist().await;
        true
    }

    /// Empty the map and drop the durable entry
    pub async fn clear_all(&mut self) {
        self.annotations = Arc::new(AnnotationMap::new());

        let Some(fingerprint) = &self.fingerprint else {
            return;
        };
        let key = fingerprint.storage_key();
        match self.storage.remove(&key).await {
            Ok(()) => tracing::info!(key = %key, "Cleared annotations"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to remove annotations"),
        }
    }

    /// Write the map under the fingerprint key when it is non-empty
    async fn persist(&self) {
        if self.annotations.is_empty() {
            return;
        }
        let Some(fingerprint) = &self.fingerprint else {
            tracing::debug!("No document bound, annotations kept in memory only");
            return;
        };

        let key = fingerprint.storage_key();
        let json = match serde_json::to_string(self.annotations.as_ref()) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to serialize annotations");
                return;
            }
        };

        if let Err(e) = self.storage.set(&key, &json).await {
            tracing::error!(key = %key, error = %e, "Failed to persist annotations");
        }
    }
}
