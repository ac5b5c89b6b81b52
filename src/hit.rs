//! Hit-testing: which annotation, and which part of it, lies under a page-space point.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Camera;
use crate::model::{Annotation, AnnotationId, BBox, PageId, Point, Shape};
use crate::store::AnnotationStore;

/// Which part of an annotation was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    /// Every handle, clockwise from the top edge.
    pub const ALL: [ResizeAnchor; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    /// Page-space position of this handle on `bbox`.
    #[must_use]
    pub fn position(self, bbox: &BBox) -> Point {
        let x = match self {
            Self::Nw | Self::W | Self::Sw => bbox.x,
            Self::N | Self::S => bbox.center_x(),
            Self::Ne | Self::E | Self::Se => bbox.right(),
        };
        let y = match self {
            Self::Nw | Self::N | Self::Ne => bbox.y,
            Self::W | Self::E => bbox.center_y(),
            Self::Sw | Self::S | Self::Se => bbox.bottom(),
        };
        Point::new(x, y)
    }

    /// The box that results from dragging this handle of `orig` by `(dx, dy)`.
    ///
    /// Edges not attached to the handle stay put. Dragging past the opposite
    /// edge flips the box instead of producing a negative extent.
    #[must_use]
    pub fn apply(self, orig: &BBox, dx: f64, dy: f64) -> BBox {
        let (mut left, mut top, mut right, mut bottom) = (orig.x, orig.y, orig.right(), orig.bottom());
        match self {
            Self::Nw | Self::W | Self::Sw => left += dx,
            Self::Ne | Self::E | Self::Se => right += dx,
            Self::N | Self::S => {}
        }
        match self {
            Self::Nw | Self::N | Self::Ne => top += dy,
            Self::Sw | Self::S | Self::Se => bottom += dy,
            Self::W | Self::E => {}
        }
        BBox::from_corners(Point::new(left, top), Point::new(right, bottom))
    }

    /// CSS cursor name shown while hovering or dragging this handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::N | Self::S => "ns-resize",
            Self::E | Self::W => "ew-resize",
            Self::Ne | Self::Sw => "nesw-resize",
            Self::Nw | Self::Se => "nwse-resize",
        }
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub annotation_id: AnnotationId,
    pub part: HitPart,
}

/// Find what lies under `page_pt` on `page`.
///
/// Resize handles of a lone selected annotation win over everything. After
/// that annotations are tested front to back. `slop_px` is a screen-space
/// tolerance converted through `camera`, so thin strokes stay clickable at
/// any zoom.
#[must_use]
pub fn hit_test(page_pt: Point, store: &AnnotationStore, camera: &Camera, page: PageId, slop_px: f64) -> Option<Hit> {
    let slop = camera.screen_dist_to_page(slop_px);

    if let [selected] = store.selected_ids() {
        if let Some(a) = store.get(selected).filter(|a| a.page_id == page) {
            let handle = ResizeAnchor::ALL
                .into_iter()
                .find(|anchor| anchor.position(&a.bbox).distance(page_pt) <= slop);
            if let Some(anchor) = handle {
                return Some(Hit { annotation_id: a.id, part: HitPart::ResizeHandle(anchor) });
            }
        }
    }

    store
        .annotations()
        .iter()
        .rev()
        .filter(|a| a.page_id == page)
        .find(|a| hits_body(a, page_pt, slop))
        .map(|a| Hit { annotation_id: a.id, part: HitPart::Body })
}

/// Whether `pt` touches the visible body of `a`, within `slop` page units.
#[must_use]
pub fn hits_body(a: &Annotation, pt: Point, slop: f64) -> bool {
    let half_stroke = a.effective_style().stroke_width.unwrap_or(0.0) / 2.0;
    match &a.shape {
        Shape::Arrow { start, end } | Shape::Line { start, end } => {
            pt.distance_to_segment(*start, *end) <= slop + half_stroke
        }
        Shape::Freehand { path } | Shape::HighlighterStroke { path } => match path.as_slice() {
            [] => false,
            [only] => pt.distance(*only) <= slop + half_stroke,
            _ => path
                .windows(2)
                .any(|w| pt.distance_to_segment(w[0], w[1]) <= slop + half_stroke),
        },
        _ => a.bbox.inflated(slop).contains(pt),
    }
}
