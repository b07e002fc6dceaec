//! Tool controller
//!
//! Holds the active tool with its color and width, and keeps global text
//! selection suppressed while a freehand tool (pen or eraser) is active.

use serde::{Deserialize, Serialize};

use super::types::{DEFAULT_DRAWING_WIDTH, DEFAULT_HIGHLIGHT_COLOR};

/// Highlighter palette offered to callers
pub const HIGHLIGHTER_PALETTE: &[(&str, &str)] = &[
    ("Yellow", "#ffff00"),
    ("Green", "#00ff00"),
    ("Pink", "#ff00ff"),
    ("Blue", "#00ffff"),
    ("Orange", "#ff8800"),
];

/// Pen palette offered to callers
pub const PEN_PALETTE: &[(&str, &str)] = &[
    ("Black", "#000000"),
    ("Red", "#ff0000"),
    ("Blue", "#0000ff"),
    ("Green", "#008000"),
    ("Purple", "#800080"),
];

/// Smallest pen width offered to callers
pub const MIN_PEN_WIDTH: u32 = 1;

/// Largest pen width offered to callers
pub const MAX_PEN_WIDTH: u32 = 20;

/// Input mode for pointer gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Pointer events pass through (text selection, scrolling)
    #[default]
    None,
    Highlighter,
    Pen,
    Eraser,
}

impl Tool {
    /// Tools that conflict with native text selection
    pub fn suppresses_text_selection(&self) -> bool {
        matches!(self, Tool::Pen | Tool::Eraser)
    }

    /// Tools that capture a pointer path
    pub fn is_drawing_tool(&self) -> bool {
        matches!(self, Tool::Pen | Tool::Highlighter)
    }

    /// Palette the UI should offer for this tool
    pub fn palette(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Tool::Highlighter => HIGHLIGHTER_PALETTE,
            Tool::Pen => PEN_PALETTE,
            Tool::None | Tool::Eraser => &[],
        }
    }
}

/// Host hook for the document-wide text selection
pub trait SelectionControl {
    /// Enable or disable native text selection
    fn set_selection_suppressed(&mut self, suppressed: bool);

    /// Drop the current selection, if any
    fn clear_selection(&mut self);
}

/// A [`SelectionControl`] that does nothing, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSelectionControl;

impl SelectionControl for NoSelectionControl {
    fn set_selection_suppressed(&mut self, _suppressed: bool) {}

    fn clear_selection(&mut self) {}
}

/// Snapshot of the tool state handed to the annotation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub tool: Tool,
    pub color: String,
    /// Stroke width; `None` means "use the tool default"
    pub width: Option<u32>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: Tool::None,
            color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            width: Some(DEFAULT_DRAWING_WIDTH),
        }
    }
}

/// Owns the tool state and the text-selection side effect
///
/// Any value is accepted; callers constrain choices to the palettes and to
/// [`MIN_PEN_WIDTH`]..=[`MAX_PEN_WIDTH`]. Suppression is lifted when the
/// controller is dropped.
pub struct ToolController<C: SelectionControl> {
    settings: ToolSettings,
    control: C,
    suppressed: bool,
}

impl<C: SelectionControl> ToolController<C> {
    pub fn new(control: C) -> Self {
        Self {
            settings: ToolSettings::default(),
            control,
            suppressed: false,
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn tool(&self) -> Tool {
        self.settings.tool
    }

    pub fn color(&self) -> &str {
        &self.settings.color
    }

    pub fn width(&self) -> Option<u32> {
        self.settings.width
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if self.settings.tool != tool {
            tracing::debug!(from = ?self.settings.tool, to = ?tool, "Tool changed");
        }
        self.settings.tool = tool;
        self.sync_suppression();
    }

    pub fn set_color(&mut self, color: &str) {
        self.settings.color = color.to_string();
    }

    pub fn set_width(&mut self, width: u32) {
        self.settings.width = Some(width);
    }

    /// Whether text selection is currently suppressed
    pub fn is_selection_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Host selection hook
    pub fn control_mut(&mut self) -> &mut C {
        &mut self.control
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    fn sync_suppression(&mut self) {
        let wanted = self.settings.tool.suppresses_text_selection();
        if wanted != self.suppressed {
            self.control.set_selection_suppressed(wanted);
            self.suppressed = wanted;
        }
    }
}

impl<C: SelectionControl> Drop for ToolController<C> {
    fn drop(&mut self) {
        if self.suppressed {
            self.control.set_selection_suppressed(false);
            self.suppressed = false;
        }
    }
}
