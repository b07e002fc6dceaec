//! Per-page annotation layer
//!
//! Each rendered page owns one [`AnnotationLayer`]. The layer turns pointer
//! gestures into [`LayerAction`]s according to the active tool and keeps two
//! pieces of render output:
//!
//! - the overlay: one item per highlight rect or drawing, rebuilt from
//!   scratch by [`AnnotationLayer::render`]
//! - the preview: segments drawn while a stroke is being captured, cleared
//!   when the stroke ends
//!
//! Gestures run through an explicit state machine:
//!
//! ```text
//!            down(pen|highlighter)          up/leave
//!   Idle ───────────────────────────▶ Capturing ─────▶ Idle (+ Add)
//!    │        down(eraser)              up/leave
//!    └──────────────────────────────▶ Erasing ───────▶ Idle
//! ```

use serde::Serialize;

use super::hit_test::{erase_hit, ERASER_THRESHOLD};
use super::tools::{Tool, ToolSettings};
use super::types::{
    Annotation, AnnotationKind, Drawing, Highlight, PageAnnotations, Point, Rect,
    DEFAULT_DRAWING_COLOR, DEFAULT_DRAWING_WIDTH, DEFAULT_HIGHLIGHT_COLOR,
};

/// Scale pages are rendered at; viewport sizes are in pixels at this scale
pub const RENDER_SCALE: f64 = 1.5;

/// Fill opacity of rendered highlights and highlighter previews
pub const HIGHLIGHT_OPACITY: f32 = 0.3;

/// Preview stroke width for the highlighter when none is configured
pub const HIGHLIGHTER_PREVIEW_WIDTH: u32 = 12;

/// Page viewport in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Viewport for a page of the given size in PDF points
    pub fn from_page_size(width_pt: f64, height_pt: f64) -> Self {
        Self::new(width_pt * RENDER_SCALE, height_pt * RENDER_SCALE)
    }
}

/// One element of the rendered overlay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum OverlayItem {
    Rect {
        annotation_id: String,
        rect: Rect,
        fill: String,
        opacity: f32,
    },
    Polyline {
        annotation_id: String,
        points: Vec<Point>,
        stroke: String,
        stroke_width: u32,
    },
}

impl OverlayItem {
    pub fn annotation_id(&self) -> &str {
        match self {
            OverlayItem::Rect { annotation_id, .. } | OverlayItem::Polyline { annotation_id, .. } => {
                annotation_id
            }
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            OverlayItem::Rect { .. } => AnnotationKind::Highlight,
            OverlayItem::Polyline { .. } => AnnotationKind::Drawing,
        }
    }
}

/// Incremental stroke segment drawn while capturing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewSegment {
    pub from: Point,
    pub to: Point,
    pub color: String,
    pub width: u32,
    pub opacity: f32,
}

/// Gesture state of a page surface
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// A pen or highlighter stroke is being recorded
    Capturing { tool: Tool, path: Vec<Point> },
    /// The eraser button is held down
    Erasing,
}

/// What a gesture asks the annotation store to do
#[derive(Debug, Clone, PartialEq)]
pub enum LayerAction {
    Add(Annotation),
    Delete { id: String, kind: AnnotationKind },
}

/// Interactive overlay for one page
#[derive(Debug, Clone)]
pub struct AnnotationLayer {
    page_number: u32,
    viewport: Viewport,
    state: GestureState,
    overlay: Vec<OverlayItem>,
    preview: Vec<PreviewSegment>,
}

impl AnnotationLayer {
    pub fn new(page_number: u32, viewport: Viewport) -> Self {
        Self {
            page_number,
            viewport,
            state: GestureState::Idle,
            overlay: Vec::new(),
            preview: Vec::new(),
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resize the surface; like a canvas resize this drops the preview
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.preview.clear();
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, GestureState::Capturing { .. })
    }

    pub fn overlay(&self) -> &[OverlayItem] {
        &self.overlay
    }

    pub fn preview(&self) -> &[PreviewSegment] {
        &self.preview
    }

    /// Whether the layer takes pointer events for `tool`
    pub fn intercepts_pointer(tool: Tool) -> bool {
        tool != Tool::None
    }

    /// Cursor hint for `tool`
    pub fn cursor(tool: Tool) -> &'static str {
        match tool {
            Tool::Eraser => "grab",
            Tool::Pen | Tool::Highlighter => "crosshair",
            Tool::None => "default",
        }
    }

    /// Rebuild the overlay from the page's annotations
    pub fn render(&mut self, page: Option<&PageAnnotations>) {
        self.overlay.clear();
        let Some(page) = page else {
            return;
        };

        for highlight in &page.highlights {
            let fill = color_or(&highlight.color, DEFAULT_HIGHLIGHT_COLOR);
            for rect in &highlight.rects {
                self.overlay.push(OverlayItem::Rect {
                    annotation_id: highlight.id.clone(),
                    rect: *rect,
                    fill: fill.clone(),
                    opacity: HIGHLIGHT_OPACITY,
                });
            }
        }

        for drawing in page.drawings.iter().filter(|d| d.path.len() >= 2) {
            self.overlay.push(OverlayItem::Polyline {
                annotation_id: drawing.id.clone(),
                points: drawing.path.clone(),
                stroke: color_or(&drawing.color, DEFAULT_DRAWING_COLOR),
                stroke_width: if drawing.width > 0 {
                    drawing.width
                } else {
                    DEFAULT_DRAWING_WIDTH
                },
            });
        }
    }

    pub fn pointer_down(
        &mut self,
        point: Point,
        settings: &ToolSettings,
        page: Option<&PageAnnotations>,
    ) -> Option<LayerAction> {
        match settings.tool {
            Tool::None => None,
            Tool::Eraser => {
                self.state = GestureState::Erasing;
                Self::erase_at(point, page)
            }
            tool @ (Tool::Pen | Tool::Highlighter) => {
                self.preview.clear();
                self.state = GestureState::Capturing {
                    tool,
                    path: vec![point],
                };
                None
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        point: Point,
        settings: &ToolSettings,
        page: Option<&PageAnnotations>,
    ) -> Option<LayerAction> {
        match &mut self.state {
            GestureState::Idle => None,
            GestureState::Erasing => Self::erase_at(point, page),
            GestureState::Capturing { tool, path } => {
                let tool = *tool;
                let from = path.last().copied();
                path.push(point);
                if let Some(from) = from {
                    self.preview.push(PreviewSegment {
                        from,
                        to: point,
                        color: settings.color.clone(),
                        width: preview_width(tool, settings.width),
                        opacity: if tool == Tool::Highlighter {
                            HIGHLIGHT_OPACITY
                        } else {
                            1.0
                        },
                    });
                }
                None
            }
        }
    }

    /// Finish the gesture; emits the captured annotation, if any
    pub fn pointer_up(&mut self, settings: &ToolSettings) -> Option<LayerAction> {
        let state = std::mem::take(&mut self.state);
        self.preview.clear();

        let GestureState::Capturing { tool, path } = state else {
            return None;
        };
        if path.is_empty() {
            return None;
        }

        let annotation: Annotation = match tool {
            Tool::Highlighter => {
                let bounds = Rect::bounding(&path)?;
                Highlight::new(&settings.color, vec![bounds], "")
                    .with_path(path)
                    .into()
            }
            _ => Drawing::new(
                &settings.color,
                settings.width.unwrap_or(DEFAULT_DRAWING_WIDTH),
                path,
            )
            .into(),
        };

        tracing::debug!(
            page = self.page_number,
            kind = annotation.kind().as_str(),
            id = annotation.id(),
            "Captured annotation"
        );
        Some(LayerAction::Add(annotation))
    }

    /// Pointer left the surface; ends the gesture like a release
    pub fn pointer_leave(&mut self, settings: &ToolSettings) -> Option<LayerAction> {
        self.pointer_up(settings)
    }

    /// Abandon any gesture in progress without emitting anything
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
        self.preview.clear();
    }

    fn erase_at(point: Point, page: Option<&PageAnnotations>) -> Option<LayerAction> {
        let hit = erase_hit(page?, point, ERASER_THRESHOLD)?;
        Some(LayerAction::Delete {
            id: hit.id,
            kind: hit.kind,
        })
    }

    /// Serialize the overlay as a standalone SVG document
    pub fn to_svg(&self) -> String {
        use html_escape::encode_double_quoted_attribute as attr;

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
            self.viewport.width, self.viewport.height
        );
        for item in &self.overlay {
            match item {
                OverlayItem::Rect {
                    annotation_id,
                    rect,
                    fill,
                    opacity,
                } => svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" opacity="{}" data-annotation-id="{}" data-annotation-type="highlight"/>"#,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    attr(fill),
                    opacity,
                    attr(annotation_id)
                )),
                OverlayItem::Polyline {
                    annotation_id,
                    points,
                    stroke,
                    stroke_width,
                } => {
                    let d = points
                        .iter()
                        .enumerate()
                        .map(|(i, p)| format!("{} {} {}", if i == 0 { "M" } else { "L" }, p.x, p.y))
                        .collect::<Vec<_>>()
                        .join(" ");
                    svg.push_str(&format!(
                        r#"<path d="{}" stroke="{}" stroke-width="{}" fill="none" stroke-linecap="round" stroke-linejoin="round" data-annotation-id="{}" data-annotation-type="drawing"/>"#,
                        d,
                        attr(stroke),
                        stroke_width,
                        attr(annotation_id)
                    ));
                }
            }
        }
        svg.push_str("</svg>");
        svg
    }
}

fn color_or(color: &str, fallback: &str) -> String {
    if color.is_empty() {
        fallback.to_string()
    } else {
        color.to_string()
    }
}

fn preview_width(tool: Tool, configured: Option<u32>) -> u32 {
    match configured {
        Some(width) if width > 0 => width,
        _ if tool == Tool::Highlighter => HIGHLIGHTER_PREVIEW_WIDTH,
        _ => DEFAULT_DRAWING_WIDTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tool: Tool) -> ToolSettings {
        ToolSettings {
            tool,
            color: "#ff0000".to_string(),
            width: Some(4),
        }
    }

    fn layer() -> AnnotationLayer {
        AnnotationLayer::new(1, Viewport::from_page_size(612.0, 792.0))
    }

    #[test]
    fn test_viewport_scale() {
        assert_eq!(layer().viewport(), Viewport::new(918.0, 1188.0));
    }

    #[test]
    fn test_highlighter_drag_produces_bounding_rect() {
        let mut layer = layer();
        let s = settings(Tool::Highlighter);

        assert!(layer.pointer_down(Point::new(0.0, 0.0), &s, None).is_none());
        assert!(layer.pointer_move(Point::new(40.0, 30.0), &s, None).is_none());
        assert_eq!(layer.preview().len(), 1);
        assert_eq!(layer.preview()[0].opacity, HIGHLIGHT_OPACITY);

        let Some(LayerAction::Add(Annotation::Highlight(h))) = layer.pointer_up(&s) else {
            panic!("expected a highlight");
        };
        assert_eq!(h.rects, vec![Rect::new(0.0, 0.0, 40.0, 30.0)]);
        assert_eq!(h.text, "");
        assert_eq!(h.color, "#ff0000");
        assert_eq!(h.path.as_ref().map(Vec::len), Some(2));
        assert!(layer.preview().is_empty());
        assert_eq!(*layer.state(), GestureState::Idle);
    }

    #[test]
    fn test_pen_stroke_produces_drawing() {
        let mut layer = layer();
        let s = settings(Tool::Pen);

        layer.pointer_down(Point::new(1.0, 1.0), &s, None);
        layer.pointer_move(Point::new(2.0, 2.0), &s, None);
        layer.pointer_move(Point::new(3.0, 5.0), &s, None);
        assert_eq!(layer.preview().len(), 2);
        assert_eq!(layer.preview()[1].from, Point::new(2.0, 2.0));
        assert_eq!(layer.preview()[1].opacity, 1.0);
        assert_eq!(layer.preview()[1].width, 4);

        let Some(LayerAction::Add(Annotation::Drawing(d))) = layer.pointer_leave(&s) else {
            panic!("expected a drawing");
        };
        assert_eq!(d.width, 4);
        assert_eq!(d.path.len(), 3);
        assert!(layer.preview().is_empty());
    }

    #[test]
    fn test_single_click_pen_still_emits() {
        let mut layer = layer();
        let s = settings(Tool::Pen);
        layer.pointer_down(Point::new(1.0, 1.0), &s, None);
        assert!(matches!(
            layer.pointer_up(&s),
            Some(LayerAction::Add(Annotation::Drawing(_)))
        ));
    }

    #[test]
    fn test_preview_width_defaults() {
        assert_eq!(preview_width(Tool::Highlighter, None), 12);
        assert_eq!(preview_width(Tool::Pen, None), 2);
        assert_eq!(preview_width(Tool::Pen, Some(0)), 2);
        assert_eq!(preview_width(Tool::Highlighter, Some(7)), 7);
    }

    #[test]
    fn test_tool_none_is_inert() {
        let mut layer = layer();
        let s = settings(Tool::None);
        assert!(!AnnotationLayer::intercepts_pointer(Tool::None));
        assert!(layer.pointer_down(Point::new(1.0, 1.0), &s, None).is_none());
        assert!(layer.pointer_move(Point::new(2.0, 2.0), &s, None).is_none());
        assert!(layer.pointer_up(&s).is_none());
        assert!(layer.preview().is_empty());
        assert_eq!(*layer.state(), GestureState::Idle);
    }

    #[test]
    fn test_eraser_deletes_on_down_and_move() {
        let mut page = PageAnnotations::default();
        page.push(Highlight::new("#ffff00", vec![Rect::new(10.0, 10.0, 50.0, 20.0)], "").into());
        page.push(
            Drawing::new("#000000", 2, vec![Point::new(200.0, 200.0), Point::new(210.0, 200.0)])
                .into(),
        );
        let highlight_id = page.highlights[0].id.clone();
        let drawing_id = page.drawings[0].id.clone();

        let mut layer = layer();
        let s = settings(Tool::Eraser);

        let action = layer.pointer_down(Point::new(5.0, 5.0), &s, Some(&page));
        assert_eq!(
            action,
            Some(LayerAction::Delete {
                id: highlight_id,
                kind: AnnotationKind::Highlight
            })
        );
        assert_eq!(*layer.state(), GestureState::Erasing);

        assert!(layer
            .pointer_move(Point::new(100.0, 100.0), &s, Some(&page))
            .is_none());
        let action = layer.pointer_move(Point::new(205.0, 205.0), &s, Some(&page));
        assert_eq!(
            action,
            Some(LayerAction::Delete {
                id: drawing_id,
                kind: AnnotationKind::Drawing
            })
        );

        assert!(layer.pointer_up(&s).is_none());
        assert!(layer
            .pointer_move(Point::new(205.0, 205.0), &s, Some(&page))
            .is_none());
    }

    #[test]
    fn test_render_replaces_previous_output() {
        let mut page = PageAnnotations::default();
        page.push(
            Highlight::new(
                "",
                vec![Rect::new(0.0, 0.0, 5.0, 5.0), Rect::new(0.0, 10.0, 5.0, 5.0)],
                "two lines",
            )
            .into(),
        );
        page.push(Drawing::new("#0000ff", 3, vec![Point::new(0.0, 0.0)]).into());
        page.push(
            Drawing::new("#0000ff", 3, vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).into(),
        );

        let mut layer = layer();
        layer.render(Some(&page));
        layer.render(Some(&page));

        // Two rects for the highlight, one polyline (single-point drawing skipped)
        assert_eq!(layer.overlay().len(), 3);
        assert!(matches!(
            &layer.overlay()[0],
            OverlayItem::Rect { fill, opacity, .. } if fill == "#ffff00" && *opacity == HIGHLIGHT_OPACITY
        ));
        assert_eq!(layer.overlay()[2].kind(), AnnotationKind::Drawing);
        assert_eq!(layer.overlay()[2].annotation_id(), page.drawings[1].id);

        layer.render(None);
        assert!(layer.overlay().is_empty());
    }

    #[test]
    fn test_svg_output() {
        let mut page = PageAnnotations::default();
        let mut highlight = Highlight::new("#ffff00", vec![Rect::new(1.0, 2.0, 3.0, 4.0)], "");
        highlight.id = "h\"1".to_string();
        page.push(highlight.into());
        page.push(
            Drawing::new("#000000", 2, vec![Point::new(0.0, 0.0), Point::new(10.5, 3.0)]).into(),
        );

        let mut layer = AnnotationLayer::new(1, Viewport::new(100.0, 50.0));
        layer.render(Some(&page));
        let svg = layer.to_svg();

        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50">"#));
        assert!(svg.contains(r##"<rect x="1" y="2" width="3" height="4" fill="#ffff00""##));
        assert!(svg.contains("data-annotation-id=\"h&quot;1\""));
        assert!(svg.contains(r#"d="M 0 0 L 10.5 3""#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_cursor_hints() {
        assert_eq!(AnnotationLayer::cursor(Tool::Eraser), "grab");
        assert_eq!(AnnotationLayer::cursor(Tool::Pen), "crosshair");
        assert_eq!(AnnotationLayer::cursor(Tool::None), "default");
    }
}
