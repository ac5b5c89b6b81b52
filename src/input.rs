//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! This module defines the types consumed by the editor. `Tool` and
//! `Modifiers` capture the user's intent at the time of a pointer event.
//! `InputState` is the active gesture being tracked between pointer-down and
//! pointer-up, carrying all context needed to compute incremental deltas and
//! record exactly one history entry on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::hit::ResizeAnchor;
use crate::model::{Annotation, AnnotationId, BBox, Point};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Place a text box (created on press).
    Text,
    /// Drag out a text highlight.
    Highlight,
    Rectangle,
    RoundedRectangle,
    Ellipse,
    Arrow,
    Line,
    Star,
    /// Freehand pen stroke.
    Freehand,
    /// Wide translucent marker stroke.
    Highlighter,
    Stamp,
    /// A tool contributed through [`crate::factory::AnnotationFactory::register`].
    Custom(&'static str),
}

impl Tool {
    /// Every built-in tool, in toolbar order.
    pub const BUILT_IN: [Tool; 12] = [
        Self::Select,
        Self::Text,
        Self::Highlight,
        Self::Rectangle,
        Self::RoundedRectangle,
        Self::Ellipse,
        Self::Arrow,
        Self::Line,
        Self::Star,
        Self::Freehand,
        Self::Highlighter,
        Self::Stamp,
    ];

    /// Stable lowercase name, as used by scripts and toolbars.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Text => "text",
            Self::Highlight => "highlight",
            Self::Rectangle => "rectangle",
            Self::RoundedRectangle => "rounded-rectangle",
            Self::Ellipse => "ellipse",
            Self::Arrow => "arrow",
            Self::Line => "line",
            Self::Star => "star",
            Self::Freehand => "freehand",
            Self::Highlighter => "highlighter",
            Self::Stamp => "stamp",
            Self::Custom(name) => name,
        }
    }

    /// Look up a built-in tool by [`Tool::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::BUILT_IN.into_iter().find(|t| t.name() == name)
    }

    /// Whether this tool creates annotations (everything except select).
    #[must_use]
    pub fn is_drawing(self) -> bool {
        !matches!(self, Self::Select)
    }

    /// Whether the drawn shape is the box spanned by the start and current points.
    #[must_use]
    pub fn is_box(self) -> bool {
        matches!(
            self,
            Self::Highlight | Self::Rectangle | Self::RoundedRectangle | Self::Ellipse | Self::Star | Self::Stamp
        )
    }

    /// Whether the tool drags out a start/end segment.
    #[must_use]
    pub fn is_segment(self) -> bool {
        matches!(self, Self::Arrow | Self::Line)
    }

    /// Whether the tool records a running point list.
    #[must_use]
    pub fn is_stroke(self) -> bool {
        matches!(self, Self::Freehand | Self::Highlighter)
    }

    /// Whether the tool creates its annotation on press, without a drag.
    #[must_use]
    pub fn creates_on_press(self) -> bool {
        matches!(self, Self::Text)
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Toggle membership instead of replacing the selection.
    #[must_use]
    pub fn multi_select(self) -> bool {
        self.shift || self.ctrl || self.meta
    }

    /// Constrain drag motion to the dominant axis.
    #[must_use]
    pub fn axis_lock(self) -> bool {
        self.shift
    }

    /// The platform command modifier (Ctrl or Cmd).
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    /// Whether this is the key named `name`, ignoring ASCII case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// record the gesture's history entry on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Rubber-band selection on empty canvas with the select tool.
    Selecting {
        /// Page-space corner where the press happened.
        start: Point,
        /// Page-space position of the latest pointer event.
        current: Point,
        /// Extend the existing selection instead of replacing it.
        additive: bool,
    },
    /// A drawing tool was pressed but the pointer has not yet moved past the threshold.
    PendingDraw {
        tool: Tool,
        /// Screen-space press position, for the pixel threshold.
        start_screen: Point,
        /// Page-space press position, the anchor of the new shape.
        start_page: Point,
    },
    /// A new annotation exists and is being shaped by the pointer.
    Drawing {
        /// Id of the provisional annotation.
        id: AnnotationId,
        tool: Tool,
        /// Page-space anchor of the drag.
        start_page: Point,
    },
    /// The selection is being moved.
    Dragging {
        /// Page-space position of the previous pointer event.
        last_page: Point,
        /// Pre-drag state of every selected annotation.
        snapshot: Vec<Annotation>,
    },
    /// A single annotation is being resized by one of its handles.
    Resizing {
        id: AnnotationId,
        /// Which corner/edge handle is being dragged.
        anchor: ResizeAnchor,
        /// Page-space pointer position at the start of the resize.
        start_page: Point,
        /// Bounding box at the start of the resize.
        orig: BBox,
        /// Pre-resize state of the annotation.
        snapshot: Box<Annotation>,
    },
}

impl InputState {
    /// Whether no gesture is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
