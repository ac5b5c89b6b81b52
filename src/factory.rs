//! Annotation factory: turns a tool and a drag into a new annotation.
//!
//! DESIGN
//! ======
//! Built-in tools map to shapes through one closed `match`, so adding a kind
//! is a compile-time change that the compiler checks for exhaustiveness.
//! Tools that live outside the crate plug in through [`AnnotationFactory::register`]
//! under a [`Tool::Custom`] name. Every result, built-in or custom, passes
//! [`validate`] before it is handed out.

#[cfg(test)]
#[path = "factory_test.rs"]
mod factory_test;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::consts::{
    CORNER_RADIUS, MIN_SHAPE_SIZE, STAMP_LABEL, STAR_INNER_RATIO, STAR_POINTS, TEXT_DEFAULT_HEIGHT,
    TEXT_DEFAULT_WIDTH,
};
use crate::input::Tool;
use crate::model::{Annotation, AnnotationKind, BBox, PageId, Point, Shape, Style};

/// Everything a constructor needs: where the gesture started, where it is now, and the style to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRequest {
    pub page_id: PageId,
    /// Page-space press position.
    pub start: Point,
    /// Page-space current pointer position.
    pub current: Point,
    /// Overrides merged on top of the kind defaults.
    pub style: Style,
}

impl DrawRequest {
    #[must_use]
    pub fn new(page_id: PageId, start: Point, current: Point) -> Self {
        Self { page_id, start, current, style: Style::default() }
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

/// Constructor for a registered custom tool.
pub type Constructor = fn(&DrawRequest) -> Option<Annotation>;

/// Builds annotations for built-in and registered tools.
#[derive(Debug, Clone)]
pub struct AnnotationFactory {
    text_width: f64,
    text_height: f64,
    custom: HashMap<&'static str, Constructor>,
}

impl Default for AnnotationFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::with_text_size(TEXT_DEFAULT_WIDTH, TEXT_DEFAULT_HEIGHT)
    }

    /// A factory whose press-to-place text boxes have the given size.
    #[must_use]
    pub fn with_text_size(text_width: f64, text_height: f64) -> Self {
        Self { text_width, text_height, custom: HashMap::new() }
    }

    /// Register `constructor` for `Tool::Custom(name)`, replacing any earlier one.
    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        if self.custom.insert(name, constructor).is_some() {
            warn!(name, "custom tool constructor replaced");
        }
    }

    /// Whether `tool` can produce annotations through this factory.
    #[must_use]
    pub fn supports(&self, tool: Tool) -> bool {
        match tool {
            Tool::Select => false,
            Tool::Custom(name) => self.custom.contains_key(name),
            _ => true,
        }
    }

    /// Build the annotation `tool` would draw for `request`.
    ///
    /// Returns `None` for the select tool, unregistered custom tools,
    /// geometry smaller than the minimum on both axes, and anything that
    /// fails [`validate`].
    #[must_use]
    pub fn create(&self, tool: Tool, request: &DrawRequest) -> Option<Annotation> {
        let built = match tool {
            Tool::Select => None,
            Tool::Custom(name) => self.custom.get(name).and_then(|ctor| ctor(request)),
            _ => self.build(tool, request),
        };
        let annotation = built.filter(validate);
        if annotation.is_none() {
            debug!(tool = tool.name(), "factory produced nothing");
        }
        annotation
    }

    fn build(&self, tool: Tool, request: &DrawRequest) -> Option<Annotation> {
        let (start, current) = (request.start, request.current);
        let spanned = BBox::from_corners(start, current);

        let (bbox, shape) = match tool {
            Tool::Text => (
                BBox::new(start.x, start.y, self.text_width, self.text_height),
                Shape::Text { content: String::new() },
            ),
            Tool::Highlight => (spanned, Shape::Highlight),
            Tool::Rectangle => (spanned, Shape::Rectangle),
            Tool::RoundedRectangle => (spanned, Shape::RoundedRectangle { corner_radius: CORNER_RADIUS }),
            Tool::Ellipse => (spanned, Shape::Ellipse),
            Tool::Star => (spanned, Shape::Star { points: STAR_POINTS, inner_ratio: STAR_INNER_RATIO }),
            Tool::Stamp => (spanned, Shape::Stamp { label: STAMP_LABEL.to_owned() }),
            Tool::Arrow => (spanned, Shape::Arrow { start, end: current }),
            Tool::Line => (spanned, Shape::Line { start, end: current }),
            Tool::Freehand => (spanned, Shape::Freehand { path: stroke_path(start, current) }),
            Tool::Highlighter => (spanned, Shape::HighlighterStroke { path: stroke_path(start, current) }),
            Tool::Select | Tool::Custom(_) => return None,
        };

        if !tool.creates_on_press() && bbox.width < MIN_SHAPE_SIZE && bbox.height < MIN_SHAPE_SIZE {
            return None;
        }

        let mut annotation = Annotation::new(request.page_id, bbox, shape);
        annotation.style = annotation.kind().default_style().merged(&request.style);
        Some(annotation)
    }
}

fn stroke_path(start: Point, current: Point) -> Vec<Point> {
    if start == current { vec![start] } else { vec![start, current] }
}

// =============================================================================
// VALIDATION AND CAPABILITIES
// =============================================================================

/// Whether `a` is internally consistent.
///
/// Checks the bounding box, that every geometry value is finite, and the
/// per-kind ranges (star vertex count and ratio, machine confidence).
#[must_use]
pub fn validate(a: &Annotation) -> bool {
    if !a.bbox.is_well_formed() {
        return false;
    }
    let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
    match &a.shape {
        Shape::Arrow { start, end } | Shape::Line { start, end } => finite(start) && finite(end),
        Shape::Freehand { path } | Shape::HighlighterStroke { path } => !path.is_empty() && path.iter().all(finite),
        Shape::Star { points, inner_ratio } => *points >= 3 && *inner_ratio > 0.0 && *inner_ratio < 1.0,
        Shape::RoundedRectangle { corner_radius } => corner_radius.is_finite() && *corner_radius >= 0.0,
        Shape::Image { natural_width, natural_height, .. } => *natural_width >= 0.0 && *natural_height >= 0.0,
        Shape::MachineNote { confidence, .. } | Shape::MachineRegion { confidence, .. } => {
            (0.0..=1.0).contains(confidence)
        }
        Shape::Text { .. } | Shape::Highlight | Shape::Rectangle | Shape::Ellipse | Shape::Stamp { .. } => true,
    }
}

/// What a renderer needs to know about a kind before drawing it.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderCapabilities {
    /// Has a fillable interior.
    pub fill: bool,
    /// Draws an outline or stroke.
    pub stroke: bool,
    /// Renders text content or a label.
    pub text: bool,
    /// Geometry is a start/end pair.
    pub endpoints: bool,
    /// Geometry is a point list.
    pub path: bool,
    /// Users can draw it with a toolbar tool.
    pub user_creatable: bool,
}

/// Render capabilities for `kind`.
#[must_use]
pub fn capabilities(kind: AnnotationKind) -> RenderCapabilities {
    let base = RenderCapabilities { user_creatable: true, ..RenderCapabilities::default() };
    match kind {
        AnnotationKind::Text => RenderCapabilities { text: true, ..base },
        AnnotationKind::Highlight => RenderCapabilities { fill: true, ..base },
        AnnotationKind::Rectangle
        | AnnotationKind::RoundedRectangle
        | AnnotationKind::Ellipse
        | AnnotationKind::Star => RenderCapabilities { fill: true, stroke: true, ..base },
        AnnotationKind::Arrow | AnnotationKind::Line => RenderCapabilities { stroke: true, endpoints: true, ..base },
        AnnotationKind::Freehand | AnnotationKind::HighlighterStroke => {
            RenderCapabilities { stroke: true, path: true, ..base }
        }
        AnnotationKind::Image => RenderCapabilities { user_creatable: false, ..base },
        AnnotationKind::Stamp => RenderCapabilities { stroke: true, text: true, ..base },
        AnnotationKind::MachineNote => RenderCapabilities { stroke: true, text: true, user_creatable: false, ..base },
        AnnotationKind::MachineRegion => RenderCapabilities { stroke: true, user_creatable: false, ..base },
    }
}
