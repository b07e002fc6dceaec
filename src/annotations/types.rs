//! Annotation types
//!
//! Highlights and freehand drawings live in page-local pixel coordinates at
//! the fixed render scale. The [`AnnotationMap`] serializes to the JSON shape
//! kept in durable storage:
//!
//! ```json
//! { "1": { "highlights": [ ... ], "drawings": [ ... ] } }
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default fill for highlights with no color
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#ffff00";

/// Default stroke for drawings with no color
pub const DEFAULT_DRAWING_COLOR: &str = "#000000";

/// Default pen stroke width in pixels
pub const DEFAULT_DRAWING_WIDTH: u32 = 2;

/// Length of the random suffix in generated ids
const ID_SUFFIX_LEN: usize = 9;

/// A point in page-local pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned rectangle in page-local pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing every point, `None` for no points
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Inclusive containment test
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Shift the origin by `(-dx, -dy)`, e.g. from client to page space
    pub fn relative_to(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x - dx, self.y - dy, self.width, self.height)
    }

    /// True when the rectangle has a positive width and height
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Discriminates the two annotation buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Drawing,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Drawing => "drawing",
        }
    }
}

/// A highlight: one or more rectangles over the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub rects: Vec<Rect>,
    /// Selected text; empty for highlights drawn by hand
    #[serde(default)]
    pub text: String,
    /// Raw pointer path for hand-drawn highlights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Point>>,
    /// Creation time in milliseconds since the epoch
    #[serde(default)]
    pub timestamp: i64,
}

impl Highlight {
    /// Create a highlight with a fresh id and timestamp
    pub fn new(color: &str, rects: Vec<Rect>, text: &str) -> Self {
        Self {
            id: generate_id(AnnotationKind::Highlight),
            color: color.to_string(),
            rects,
            text: text.to_string(),
            path: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Attach the raw pointer path
    pub fn with_path(mut self, path: Vec<Point>) -> Self {
        self.path = Some(path);
        self
    }
}

/// A freehand polyline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: String,
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_drawing_width")]
    pub width: u32,
    #[serde(default)]
    pub path: Vec<Point>,
    #[serde(default)]
    pub timestamp: i64,
}

fn default_drawing_width() -> u32 {
    DEFAULT_DRAWING_WIDTH
}

impl Drawing {
    /// Create a drawing with a fresh id and timestamp
    pub fn new(color: &str, width: u32, path: Vec<Point>) -> Self {
        Self {
            id: generate_id(AnnotationKind::Drawing),
            color: color.to_string(),
            width,
            path,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Either kind of annotation, tagged with `"type"` when serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Highlight(Highlight),
    Drawing(Drawing),
}

impl Annotation {
    pub fn id(&self) -> &str {
        match self {
            Annotation::Highlight(h) => &h.id,
            Annotation::Drawing(d) => &d.id,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Highlight(_) => AnnotationKind::Highlight,
            Annotation::Drawing(_) => AnnotationKind::Drawing,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            Annotation::Highlight(h) => &h.color,
            Annotation::Drawing(d) => &d.color,
        }
    }
}

impl From<Highlight> for Annotation {
    fn from(h: Highlight) -> Self {
        Annotation::Highlight(h)
    }
}

impl From<Drawing> for Annotation {
    fn from(d: Drawing) -> Self {
        Annotation::Drawing(d)
    }
}

/// Annotations on a single page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageAnnotations {
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    #[serde(default)]
    pub drawings: Vec<Drawing>,
}

impl PageAnnotations {
    /// Append to the matching bucket
    pub fn push(&mut self, annotation: Annotation) {
        match annotation {
            Annotation::Highlight(h) => self.highlights.push(h),
            Annotation::Drawing(d) => self.drawings.push(d),
        }
    }

    /// Remove the entry with `id` from the `kind` bucket
    ///
    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: &str, kind: AnnotationKind) -> bool {
        match kind {
            AnnotationKind::Highlight => {
                let before = self.highlights.len();
                self.highlights.retain(|h| h.id != id);
                self.highlights.len() != before
            }
            AnnotationKind::Drawing => {
                let before = self.drawings.len();
                self.drawings.retain(|d| d.id != id);
                self.drawings.len() != before
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.highlights.iter().any(|h| h.id == id) || self.drawings.iter().any(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.highlights.len() + self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty() && self.drawings.is_empty()
    }
}

/// Page number (1-based) to page annotations
///
/// Pages without an entry are implicitly empty. A page whose buckets were
/// emptied by deletions keeps its entry, so the map stays non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationMap(BTreeMap<u32, PageAnnotations>);

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotations on `page`, if the page has an entry
    pub fn page(&self, page: u32) -> Option<&PageAnnotations> {
        self.0.get(&page)
    }

    /// Entry for `page`, created empty when missing
    pub fn page_mut(&mut self, page: u32) -> &mut PageAnnotations {
        self.0.entry(page).or_default()
    }

    /// Page entry without creating it
    pub fn existing_page_mut(&mut self, page: u32) -> Option<&mut PageAnnotations> {
        self.0.get_mut(&page)
    }

    /// Iterate pages in ascending order
    pub fn pages(&self) -> impl Iterator<Item = (u32, &PageAnnotations)> {
        self.0.iter().map(|(page, set)| (*page, set))
    }

    /// True when no page has an entry
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of page entries
    pub fn page_count(&self) -> usize {
        self.0.len()
    }

    /// Total annotations across all pages
    pub fn annotation_count(&self) -> usize {
        self.0.values().map(PageAnnotations::len).sum()
    }

    /// Whether any page holds an annotation with `id`
    pub fn contains_id(&self, id: &str) -> bool {
        self.0.values().any(|set| set.contains(id))
    }
}

/// Generate `<kind>-<epoch millis>-<random suffix>`
///
/// Unique enough within one session; collisions are possible but negligible.
pub fn generate_id(kind: AnnotationKind) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}-{}-{}", kind.as_str(), Utc::now().timestamp_millis(), suffix)
}
