//! Annotation model: ids, geometry primitives, styles and the tagged shape variants.
//!
//! An [`Annotation`] is a set of common attributes (identity, owning page,
//! bounding box, style, timestamps, group membership) plus a [`Shape`] that
//! carries the kind-specific geometry. The shape variant is the discriminant;
//! it is fixed at creation and [`Annotation::kind`] derives the tag from it.
//!
//! Geometry that duplicates information held by the bounding box (line
//! endpoints, freehand point lists) is always moved through
//! [`Annotation::translate`] and [`Annotation::reshape`] so the two never
//! drift apart.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::consts::GEOMETRY_EPSILON;

/// Unique identifier for an annotation.
pub type AnnotationId = Uuid;

/// Opaque reference to a page supplied by the document provider.
pub type PageId = Uuid;

/// Identifier shared by every member of a group.
pub type GroupId = Uuid;

/// Current wall-clock time in unix milliseconds. Returns 0 if the clock is before the epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in page space (or screen space, depending on context).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This point shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Shortest distance from this point to the segment `a`–`b`.
    #[must_use]
    pub fn distance_to_segment(self, a: Point, b: Point) -> f64 {
        let (vx, vy) = (b.x - a.x, b.y - a.y);
        let len_sq = vx * vx + vy * vy;
        if len_sq <= GEOMETRY_EPSILON {
            return self.distance(a);
        }
        let t = (((self.x - a.x) * vx + (self.y - a.y) * vy) / len_sq).clamp(0.0, 1.0);
        self.distance(Point::new(a.x + t * vx, a.y + t * vy))
    }
}

/// Axis-aligned bounding box in page-space units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// The box spanned by two opposite corners, in any order.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self { x, y, width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
    }

    /// The smallest box enclosing every point, or `None` for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y })
    }

    /// The smallest box enclosing every box, or `None` for an empty iterator.
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a BBox>) -> Option<Self> {
        let mut iter = boxes.into_iter();
        let first = *iter.next()?;
        let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.right(), first.bottom());
        for b in iter {
            left = left.min(b.x);
            top = top.min(b.y);
            right = right.max(b.right());
            bottom = bottom.max(b.bottom());
        }
        Some(Self { x: left, y: top, width: right - left, height: bottom - top })
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    #[must_use]
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Whether `p` lies inside or on the edge of this box.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether the two boxes overlap or touch.
    #[must_use]
    pub fn intersects(&self, other: &BBox) -> bool {
        self.x <= other.right() && other.x <= self.right() && self.y <= other.bottom() && other.y <= self.bottom()
    }

    /// This box grown by `d` on every side.
    #[must_use]
    pub fn inflated(&self, d: f64) -> Self {
        Self { x: self.x - d, y: self.y - d, width: self.width + 2.0 * d, height: self.height + 2.0 * d }
    }

    /// This box shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Map `p` from this box into `target`, keeping its relative position.
    ///
    /// A degenerate axis (zero extent) keeps the point's offset from the origin.
    #[must_use]
    pub fn map_point(&self, p: Point, target: &BBox) -> Point {
        let x = if self.width > GEOMETRY_EPSILON {
            target.x + (p.x - self.x) * target.width / self.width
        } else {
            target.x + (p.x - self.x)
        };
        let y = if self.height > GEOMETRY_EPSILON {
            target.y + (p.y - self.y) * target.height / self.height
        } else {
            target.y + (p.y - self.y)
        };
        Point { x, y }
    }

    /// Whether every component is finite and both extents are non-negative.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

// =============================================================================
// KINDS AND SHAPES
// =============================================================================

/// The discriminant of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationKind {
    Text,
    Highlight,
    Rectangle,
    RoundedRectangle,
    Ellipse,
    Arrow,
    Line,
    Star,
    Freehand,
    HighlighterStroke,
    Image,
    Stamp,
    /// Reserved for machine-generated notes.
    MachineNote,
    /// Reserved for machine-detected regions.
    MachineRegion,
}

impl AnnotationKind {
    /// Every kind, in declaration order.
    pub const ALL: [AnnotationKind; 14] = [
        Self::Text,
        Self::Highlight,
        Self::Rectangle,
        Self::RoundedRectangle,
        Self::Ellipse,
        Self::Arrow,
        Self::Line,
        Self::Star,
        Self::Freehand,
        Self::HighlighterStroke,
        Self::Image,
        Self::Stamp,
        Self::MachineNote,
        Self::MachineRegion,
    ];

    /// Human-readable name used in history descriptions.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Highlight => "highlight",
            Self::Rectangle => "rectangle",
            Self::RoundedRectangle => "rounded rectangle",
            Self::Ellipse => "ellipse",
            Self::Arrow => "arrow",
            Self::Line => "line",
            Self::Star => "star",
            Self::Freehand => "freehand stroke",
            Self::HighlighterStroke => "highlighter stroke",
            Self::Image => "image",
            Self::Stamp => "stamp",
            Self::MachineNote => "machine note",
            Self::MachineRegion => "machine region",
        }
    }

    /// Fully populated default style for this kind.
    #[must_use]
    pub fn default_style(self) -> Style {
        match self {
            Self::Text => Style {
                text_color: Some("#000000".into()),
                font_family: Some("Helvetica".into()),
                font_size: Some(16.0),
                opacity: Some(1.0),
                ..Style::default()
            },
            Self::Highlight => Style {
                fill_color: Some("#FFEB3B".into()),
                opacity: Some(0.4),
                ..Style::default()
            },
            Self::Rectangle | Self::RoundedRectangle | Self::Ellipse | Self::Star => Style {
                stroke_color: Some("#E53935".into()),
                fill_color: Some("transparent".into()),
                stroke_width: Some(2.0),
                opacity: Some(1.0),
                ..Style::default()
            },
            Self::Arrow | Self::Line => Style {
                stroke_color: Some("#E53935".into()),
                stroke_width: Some(2.0),
                opacity: Some(1.0),
                ..Style::default()
            },
            Self::Freehand => Style {
                stroke_color: Some("#1E88E5".into()),
                stroke_width: Some(3.0),
                opacity: Some(1.0),
                ..Style::default()
            },
            Self::HighlighterStroke => Style {
                stroke_color: Some("#FFEB3B".into()),
                stroke_width: Some(16.0),
                opacity: Some(0.4),
                ..Style::default()
            },
            Self::Image => Style { opacity: Some(1.0), ..Style::default() },
            Self::Stamp => Style {
                stroke_color: Some("#2E7D32".into()),
                stroke_width: Some(3.0),
                text_color: Some("#2E7D32".into()),
                font_family: Some("Helvetica".into()),
                font_size: Some(24.0),
                opacity: Some(1.0),
                ..Style::default()
            },
            Self::MachineNote | Self::MachineRegion => Style {
                stroke_color: Some("#8E24AA".into()),
                stroke_width: Some(1.5),
                dash: Some(vec![4.0, 4.0]),
                opacity: Some(0.8),
                ..Style::default()
            },
        }
    }
}

/// Kind-specific geometry and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Shape {
    Text {
        #[serde(default)]
        content: String,
    },
    Highlight,
    Rectangle,
    RoundedRectangle {
        corner_radius: f64,
    },
    Ellipse,
    Arrow {
        start: Point,
        end: Point,
    },
    Line {
        start: Point,
        end: Point,
    },
    Star {
        /// Number of outer vertices.
        points: u32,
        /// Inner radius as a fraction of the outer radius.
        inner_ratio: f64,
    },
    Freehand {
        path: Vec<Point>,
    },
    HighlighterStroke {
        path: Vec<Point>,
    },
    Image {
        /// Opaque reference to the decoded image, owned by the host.
        source: String,
        natural_width: f64,
        natural_height: f64,
    },
    Stamp {
        label: String,
    },
    MachineNote {
        label: String,
        confidence: f64,
    },
    MachineRegion {
        label: String,
        confidence: f64,
    },
}

impl Shape {
    /// The discriminant for this variant.
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Text { .. } => AnnotationKind::Text,
            Self::Highlight => AnnotationKind::Highlight,
            Self::Rectangle => AnnotationKind::Rectangle,
            Self::RoundedRectangle { .. } => AnnotationKind::RoundedRectangle,
            Self::Ellipse => AnnotationKind::Ellipse,
            Self::Arrow { .. } => AnnotationKind::Arrow,
            Self::Line { .. } => AnnotationKind::Line,
            Self::Star { .. } => AnnotationKind::Star,
            Self::Freehand { .. } => AnnotationKind::Freehand,
            Self::HighlighterStroke { .. } => AnnotationKind::HighlighterStroke,
            Self::Image { .. } => AnnotationKind::Image,
            Self::Stamp { .. } => AnnotationKind::Stamp,
            Self::MachineNote { .. } => AnnotationKind::MachineNote,
            Self::MachineRegion { .. } => AnnotationKind::MachineRegion,
        }
    }

    /// Geometry points that must track the bounding box, if this variant has any.
    #[must_use]
    pub fn tracked_points(&self) -> Option<Vec<Point>> {
        match self {
            Self::Arrow { start, end } | Self::Line { start, end } => Some(vec![*start, *end]),
            Self::Freehand { path } | Self::HighlighterStroke { path } => Some(path.clone()),
            _ => None,
        }
    }

    fn for_each_point(&mut self, mut f: impl FnMut(&mut Point)) {
        match self {
            Self::Arrow { start, end } | Self::Line { start, end } => {
                f(start);
                f(end);
            }
            Self::Freehand { path } | Self::HighlighterStroke { path } => path.iter_mut().for_each(f),
            _ => {}
        }
    }

    /// Shift every tracked point by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.for_each_point(|p| *p = p.translated(dx, dy));
    }

    /// Map every tracked point from box `from` into box `to`.
    pub fn remap(&mut self, from: &BBox, to: &BBox) {
        self.for_each_point(|p| *p = from.map_point(*p, to));
    }
}

// =============================================================================
// STYLE
// =============================================================================

/// Visual attributes. Absent fields fall back to [`AnnotationKind::default_style`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Dash pattern as alternating on/off lengths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

impl Style {
    /// Overwrite every field that is set in `other`, leaving the rest untouched.
    pub fn merge(&mut self, other: &Style) {
        if other.stroke_color.is_some() {
            self.stroke_color.clone_from(&other.stroke_color);
        }
        if other.fill_color.is_some() {
            self.fill_color.clone_from(&other.fill_color);
        }
        if other.stroke_width.is_some() {
            self.stroke_width = other.stroke_width;
        }
        if other.dash.is_some() {
            self.dash.clone_from(&other.dash);
        }
        if other.opacity.is_some() {
            self.opacity = other.opacity;
        }
        if other.font_family.is_some() {
            self.font_family.clone_from(&other.font_family);
        }
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.text_color.is_some() {
            self.text_color.clone_from(&other.text_color);
        }
    }

    /// A copy of `self` with `other` merged on top.
    #[must_use]
    pub fn merged(&self, other: &Style) -> Style {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// Returns `true` when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Style::default()
    }
}

// =============================================================================
// ANNOTATION
// =============================================================================

/// A typed, positioned object drawn over a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier, assigned at creation.
    pub id: AnnotationId,
    /// The page this annotation is drawn on.
    pub page_id: PageId,
    /// Bounding box in page units.
    pub bbox: BBox,
    /// Visual attributes overriding the kind defaults.
    #[serde(default)]
    pub style: Style,
    /// Creation time, unix milliseconds.
    pub created_at: i64,
    /// Time of the last mutation, unix milliseconds.
    pub modified_at: i64,
    /// Group this annotation moves and selects with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    /// Kind-specific geometry; its variant is the annotation's type.
    #[serde(flatten)]
    pub shape: Shape,
}

impl Annotation {
    /// Create an annotation with a fresh id and both timestamps set to now.
    #[must_use]
    pub fn new(page_id: PageId, bbox: BBox, shape: Shape) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            page_id,
            bbox,
            style: Style::default(),
            created_at: now,
            modified_at: now,
            group_id: None,
            shape,
        }
    }

    /// The annotation's type tag.
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        self.shape.kind()
    }

    /// Kind defaults with this annotation's own style merged on top.
    #[must_use]
    pub fn effective_style(&self) -> Style {
        self.kind().default_style().merged(&self.style)
    }

    /// Equality that ignores `modified_at`.
    #[must_use]
    pub fn same_content(&self, other: &Annotation) -> bool {
        self.id == other.id
            && self.page_id == other.page_id
            && self.bbox == other.bbox
            && self.style == other.style
            && self.created_at == other.created_at
            && self.group_id == other.group_id
            && self.shape == other.shape
    }

    /// Bump `modified_at` to now, never moving it backwards.
    pub fn touch(&mut self) {
        self.modified_at = now_ms().max(self.modified_at);
    }

    /// Move the bounding box and every tracked point by the same delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.bbox = self.bbox.translated(dx, dy);
        self.shape.translate(dx, dy);
    }

    /// Replace the bounding box, mapping tracked points from the old box into the new one.
    pub fn reshape(&mut self, bbox: BBox) {
        let old = self.bbox;
        self.shape.remap(&old, &bbox);
        self.bbox = bbox;
    }

    /// Recompute the bounding box from tracked points. No-op for box-only kinds.
    pub fn fit_bbox_to_geometry(&mut self) {
        if let Some(bbox) = self.shape.tracked_points().as_deref().and_then(BBox::from_points) {
            self.bbox = bbox;
        }
    }

    /// Shallow-merge `patch` into this annotation. `style` merges one level deep.
    ///
    /// Geometry fields that do not apply to this annotation's kind are ignored,
    /// so the type tag can never change through a patch.
    pub fn apply_patch(&mut self, patch: &AnnotationPatch) {
        if let Some(bbox) = patch.bbox {
            self.bbox = bbox;
        }
        if let Some(ref style) = patch.style {
            self.style.merge(style);
        }
        if let Some(group_id) = patch.group_id {
            self.group_id = group_id;
        }
        match &mut self.shape {
            Shape::Text { content } => {
                if let Some(ref text) = patch.content {
                    content.clone_from(text);
                }
            }
            Shape::RoundedRectangle { corner_radius } => {
                if let Some(r) = patch.corner_radius {
                    *corner_radius = r;
                }
            }
            Shape::Arrow { start, end } | Shape::Line { start, end } => {
                if let Some(p) = patch.start {
                    *start = p;
                }
                if let Some(p) = patch.end {
                    *end = p;
                }
            }
            Shape::Star { points, inner_ratio } => {
                if let Some(n) = patch.star_points {
                    *points = n;
                }
                if let Some(r) = patch.inner_ratio {
                    *inner_ratio = r;
                }
            }
            Shape::Freehand { path } | Shape::HighlighterStroke { path } => {
                if let Some(ref p) = patch.path {
                    path.clone_from(p);
                }
            }
            Shape::Stamp { label } | Shape::MachineNote { label, .. } | Shape::MachineRegion { label, .. } => {
                if let Some(ref l) = patch.label {
                    label.clone_from(l);
                }
            }
            Shape::Highlight | Shape::Rectangle | Shape::Ellipse | Shape::Image { .. } => {}
        }
    }
}

/// Sparse update for an annotation. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    /// Style fields to merge over the existing style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    /// `Some(None)` clears the group, `Some(Some(g))` assigns it.
    /// An explicit JSON `null` decodes as `Some(None)`.
    #[serde(default, deserialize_with = "present_field", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Option<GroupId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_ratio: Option<f64>,
}

/// Wraps any value that is present in the input, `null` included; a missing
/// field falls back to `#[serde(default)]`.
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Page reference and dimensions supplied by the document provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: PageId,
    pub width: f64,
    pub height: f64,
}

impl PageInfo {
    #[must_use]
    pub fn new(id: PageId, width: f64, height: f64) -> Self {
        Self { id, width, height }
    }

    /// The page rectangle in page space.
    #[must_use]
    pub fn bounds(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }
}
