//! Viewer session orchestration
//!
//! A [`ViewerSession`] owns everything one browser view holds for the open
//! document. Pointer gestures go to the page's [`AnnotationLayer`], the
//! resulting [`LayerAction`] is applied to the [`AnnotationStore`] and the
//! layer is re-rendered from the new map.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::document::{Document, DocumentSessionStore, LAST_DOCUMENT_KEY};
use super::ViewerError;
use crate::annotations::{
    highlight_from_selection, AnnotationLayer, AnnotationMap, AnnotationStore, LayerAction,
    Point, SelectionControl, TextSelection, Tool, ToolController, ToolSettings, Viewport,
};
use crate::fingerprint::Fingerprint;
use crate::storage::KeyValueStore;

/// Which pointer event is being routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerEvent {
    Down,
    Move,
    Up,
    Leave,
}

/// State of one viewing session
///
/// `S` is the durable store for annotations; the last document goes to a
/// separate session-scoped store.
pub struct ViewerSession<S: KeyValueStore, C: SelectionControl> {
    store: AnnotationStore<S>,
    tools: ToolController<C>,
    documents: DocumentSessionStore<Arc<dyn KeyValueStore>>,
    document: Option<Document>,
    layers: BTreeMap<u32, AnnotationLayer>,
}

impl<S: KeyValueStore, C: SelectionControl> ViewerSession<S, C> {
    pub fn new(durable: S, session: Arc<dyn KeyValueStore>, control: C) -> Self {
        Self {
            store: AnnotationStore::new(durable),
            tools: ToolController::new(control),
            documents: DocumentSessionStore::new(session),
            document: None,
            layers: BTreeMap::new(),
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.document.as_ref().map(Document::fingerprint)
    }

    pub fn annotations(&self) -> &AnnotationMap {
        self.store.annotations()
    }

    pub fn snapshot(&self) -> Arc<AnnotationMap> {
        self.store.snapshot()
    }

    pub fn tools(&self) -> &ToolController<C> {
        &self.tools
    }

    pub fn tool_settings(&self) -> &ToolSettings {
        self.tools.settings()
    }

    /// Reopen the document remembered in session storage
    ///
    /// Returns the fingerprint of the restored document. A remembered entry
    /// that is not a valid PDF is forgotten.
    pub async fn restore(&mut self) -> Option<Fingerprint> {
        let bytes = self.documents.restore().await?;
        match self.open_document(bytes).await {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding remembered document");
                self.documents.clear().await;
                None
            }
        }
    }

    /// Open `bytes`, reloading any annotations stored for them
    pub async fn open_document(&mut self, bytes: Vec<u8>) -> Result<Fingerprint, ViewerError> {
        let document = Document::from_bytes(bytes)?;
        let fingerprint = document.fingerprint().clone();

        self.cancel_gestures();
        self.layers.clear();
        self.store.load(fingerprint.clone()).await;
        self.document = Some(document);

        tracing::info!(
            fingerprint = %fingerprint,
            annotations = self.store.annotations().annotation_count(),
            "Opened document"
        );
        Ok(fingerprint)
    }

    /// Load a newly picked file in place of the current document
    ///
    /// The upload is validated first. The previous document's annotations
    /// are then cleared in memory and in durable storage, the tool returns
    /// to [`Tool::None`] and the new file is remembered for the session.
    pub async fn replace_document(
        &mut self,
        name: &str,
        mime_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Fingerprint, ViewerError> {
        let document = Document::from_upload(name, mime_type, bytes)?;

        self.store.clear_all().await;
        self.tools.set_tool(Tool::None);
        self.documents.save(document.bytes()).await;

        let fingerprint = document.fingerprint().clone();
        self.cancel_gestures();
        self.layers.clear();
        self.store.load(fingerprint.clone()).await;
        self.document = Some(document);

        tracing::info!(name = %name, fingerprint = %fingerprint, "Replaced document");
        Ok(fingerprint)
    }

    /// Close the document and forget it for the session
    ///
    /// Stored annotations are kept.
    pub async fn close_document(&mut self) -> Result<(), ViewerError> {
        if self.document.take().is_none() {
            return Err(ViewerError::NoDocument);
        }
        self.layers.clear();
        self.store.unload();
        self.documents.storage().remove(LAST_DOCUMENT_KEY).await?;
        Ok(())
    }

    /// Register the layer for a rendered page and draw its annotations
    pub fn attach_page(&mut self, page: u32, viewport: Viewport) -> Result<(), ViewerError> {
        if self.document.is_none() {
            return Err(ViewerError::NoDocument);
        }
        let layer = self
            .layers
            .entry(page)
            .and_modify(|layer| layer.set_viewport(viewport))
            .or_insert_with(|| AnnotationLayer::new(page, viewport));
        layer.render(self.store.page(page));
        Ok(())
    }

    pub fn layer(&self, page: u32) -> Option<&AnnotationLayer> {
        self.layers.get(&page)
    }

    /// Overlay of `page` as an SVG document
    pub fn page_svg(&self, page: u32) -> Option<String> {
        self.layers.get(&page).map(AnnotationLayer::to_svg)
    }

    /// Whether page layers take pointer events with the active tool
    pub fn intercepts_pointer(&self) -> bool {
        AnnotationLayer::intercepts_pointer(self.tools.tool())
    }

    pub fn cursor(&self) -> &'static str {
        AnnotationLayer::cursor(self.tools.tool())
    }

    /// Switch tools; any gesture in progress is abandoned
    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tools.tool() {
            self.cancel_gestures();
        }
        self.tools.set_tool(tool);
    }

    pub fn set_color(&mut self, color: &str) {
        self.tools.set_color(color);
    }

    pub fn set_width(&mut self, width: u32) {
        self.tools.set_width(width);
    }

    pub async fn pointer_down(&mut self, page: u32, point: Point) -> Option<LayerAction> {
        self.route(page, PointerEvent::Down, point).await
    }

    pub async fn pointer_move(&mut self, page: u32, point: Point) -> Option<LayerAction> {
        self.route(page, PointerEvent::Move, point).await
    }

    pub async fn pointer_up(&mut self, page: u32, point: Point) -> Option<LayerAction> {
        self.route(page, PointerEvent::Up, point).await
    }

    pub async fn pointer_leave(&mut self, page: u32, point: Point) -> Option<LayerAction> {
        self.route(page, PointerEvent::Leave, point).await
    }

    /// Handle a finished text selection
    ///
    /// Only the highlighter turns selections into highlights, and only while
    /// no stroke is being captured. The host selection is cleared once the
    /// highlight is stored.
    pub async fn finish_text_selection(&mut self, selection: &TextSelection) -> Option<u32> {
        if self.tools.tool() != Tool::Highlighter || self.document.is_none() {
            return None;
        }
        if self.layers.values().any(AnnotationLayer::is_capturing) {
            return None;
        }

        let (page, highlight) = highlight_from_selection(selection, self.tools.color())?;
        self.store.add(page, highlight.into()).await;
        self.render_page(page);
        self.tools.control_mut().clear_selection();
        Some(page)
    }

    /// Remove every annotation of the open document
    pub async fn clear_all(&mut self) {
        self.store.clear_all().await;
        for layer in self.layers.values_mut() {
            layer.render(None);
        }
    }

    async fn route(&mut self, page: u32, event: PointerEvent, point: Point) -> Option<LayerAction> {
        if event == PointerEvent::Down && !self.intercepts_pointer() {
            return None;
        }

        let layer = self.layers.get_mut(&page)?;
        let settings = self.tools.settings();
        let action = match event {
            PointerEvent::Down => layer.pointer_down(point, settings, self.store.page(page)),
            PointerEvent::Move => layer.pointer_move(point, settings, self.store.page(page)),
            PointerEvent::Up => layer.pointer_up(settings),
            PointerEvent::Leave => layer.pointer_leave(settings),
        }?;

        match &action {
            LayerAction::Add(annotation) => {
                self.store.add(page, annotation.clone()).await;
            }
            LayerAction::Delete { id, kind } => {
                self.store.delete(page, id, *kind).await;
            }
        }
        self.render_page(page);
        Some(action)
    }

    fn render_page(&mut self, page: u32) {
        if let Some(layer) = self.layers.get_mut(&page) {
            layer.render(self.store.page(page));
        }
    }

    fn cancel_gestures(&mut self) {
        for layer in self.layers.values_mut() {
            layer.cancel();
        }
    }
}
