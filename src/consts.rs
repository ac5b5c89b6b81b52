//! Shared numeric constants for the annotation core.

// ── History ─────────────────────────────────────────────────────

/// Number of history entries retained before the oldest is evicted.
pub const DEFAULT_HISTORY_SIZE: usize = 50;

// ── Gestures ────────────────────────────────────────────────────

/// Screen-space distance in pixels the pointer must travel before a drawing
/// gesture materialises an annotation.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

/// Screen-space hit slop in pixels for resize handles and thin strokes.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── Creation defaults ───────────────────────────────────────────

/// Page-space offset applied to both axes when duplicating an annotation.
pub const CLONE_OFFSET: f64 = 10.0;

/// Width of a freshly placed text annotation, in page units.
pub const TEXT_DEFAULT_WIDTH: f64 = 200.0;

/// Height of a freshly placed text annotation, in page units.
pub const TEXT_DEFAULT_HEIGHT: f64 = 40.0;

/// Below this extent on both axes a drawn shape is considered degenerate.
pub const MIN_SHAPE_SIZE: f64 = 1.0;

/// Inner-to-outer radius ratio for the default star.
pub const STAR_INNER_RATIO: f64 = 0.5;

/// Vertex count of the default star.
pub const STAR_POINTS: u32 = 5;

/// Corner radius of a default rounded rectangle, in page units.
pub const CORNER_RADIUS: f64 = 8.0;

/// Label printed on a default stamp.
pub const STAMP_LABEL: &str = "APPROVED";

// ── Math ────────────────────────────────────────────────────────

/// Extents at or below this are treated as zero when rescaling geometry.
pub const GEOMETRY_EPSILON: f64 = 1e-9;
