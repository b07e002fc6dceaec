//! Text-selection highlighting
//!
//! Turns a finished native text selection into a [`Highlight`] on the page
//! that contains it.

use serde::{Deserialize, Serialize};

use super::types::{Highlight, Rect};

/// Page element enclosing a selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageContainer {
    pub page_number: u32,
    /// Container bounds in client (viewport) coordinates
    pub client_bounds: Rect,
}

/// Snapshot of the host's text selection at mouse-up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSelection {
    pub text: String,
    /// Selection rects in client coordinates, one per line fragment
    pub client_rects: Vec<Rect>,
    /// Page container found by walking up from the selection anchor
    pub page: Option<PageContainer>,
}

impl TextSelection {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Build a page-local highlight from a selection
///
/// Returns the page number and the highlight, or `None` when the selection
/// is blank, is not inside a page, or has no rect with area. The selected
/// text is stored as is.
pub fn highlight_from_selection(selection: &TextSelection, color: &str) -> Option<(u32, Highlight)> {
    if selection.is_empty() {
        return None;
    }
    let page = selection.page?;

    let rects: Vec<Rect> = selection
        .client_rects
        .iter()
        .map(|r| r.relative_to(page.client_bounds.x, page.client_bounds.y))
        .filter(Rect::has_area)
        .collect();
    if rects.is_empty() {
        return None;
    }

    Some((page.page_number, Highlight::new(color, rects, &selection.text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32) -> Option<PageContainer> {
        Some(PageContainer {
            page_number: n,
            client_bounds: Rect::new(100.0, 50.0, 918.0, 1188.0),
        })
    }

    #[test]
    fn test_rects_become_page_local() {
        let selection = TextSelection {
            text: "  Lorem ipsum \n".to_string(),
            client_rects: vec![
                Rect::new(120.0, 80.0, 200.0, 18.0),
                Rect::new(110.0, 100.0, 0.0, 18.0),
                Rect::new(110.0, 100.0, 150.0, 18.0),
            ],
            page: page(3),
        };

        let (page_number, highlight) = highlight_from_selection(&selection, "#00ff00").unwrap();
        assert_eq!(page_number, 3);
        assert_eq!(highlight.text, "  Lorem ipsum \n");
        assert_eq!(highlight.color, "#00ff00");
        assert_eq!(
            highlight.rects,
            vec![Rect::new(20.0, 30.0, 200.0, 18.0), Rect::new(10.0, 50.0, 150.0, 18.0)]
        );
        assert!(highlight.path.is_none());
    }

    #[test]
    fn test_blank_selection_is_ignored() {
        let selection = TextSelection {
            text: " \t".to_string(),
            client_rects: vec![Rect::new(0.0, 0.0, 10.0, 10.0)],
            page: page(1),
        };
        assert!(selection.is_empty());
        assert!(highlight_from_selection(&selection, "#ffff00").is_none());
    }

    #[test]
    fn test_selection_outside_page_is_ignored() {
        let selection = TextSelection {
            text: "toolbar".to_string(),
            client_rects: vec![Rect::new(0.0, 0.0, 10.0, 10.0)],
            page: None,
        };
        assert!(highlight_from_selection(&selection, "#ffff00").is_none());
    }

    #[test]
    fn test_zero_sized_rects_only() {
        let selection = TextSelection {
            text: "x".to_string(),
            client_rects: vec![Rect::new(5.0, 5.0, 0.0, 0.0)],
            page: page(1),
        };
        assert!(highlight_from_selection(&selection, "#ffff00").is_none());
    }
}
