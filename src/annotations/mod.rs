//! Annotation engine
//!
//! Highlights and freehand drawings on PDF pages, in page-local pixels at
//! the fixed render scale.
//!
//! - [`types`]: the annotation model and the per-page [`AnnotationMap`]
//! - [`store`]: the in-memory map with its durable mirror
//! - [`layer`]: the per-page gesture state machine and overlay rendering
//! - [`hit_test`]: eraser hit-testing
//! - [`selection`]: highlights from native text selections
//! - [`tools`]: the active tool and its settings

pub mod layer;
pub mod selection;
pub mod store;
pub mod tools;
pub mod types;

pub use hit_test::{erase_hit, EraseHit, ERASER_THRESHOLD};
pub use layer::{
    AnnotationLayer, GestureState, LayerAction, OverlayItem, PreviewSegment, Viewport,
    RENDER_SCALE,
};
pub use selection::{highlight_from_selection, PageContainer, TextSelection};
pub use store::AnnotationStore;
pub use tools::{
    NoSelectionControl, SelectionControl, Tool, ToolController, ToolSettings,
    HIGHLIGHTER_PALETTE, MAX_PEN_WIDTH, MIN_PEN_WIDTH, PEN_PALETTE,
};
pub use types::{
    generate_id, Annotation, AnnotationKind, AnnotationMap, Drawing, Highlight, PageAnnotations,
    Point, Rect,
};
