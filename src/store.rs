//! Annotation store: the authoritative collection, its paint order, and the selection.
//!
//! DESIGN
//! ======
//! Annotations live in a `Vec` whose order is the paint order (back to
//! front). All reads and writes go through `AnnotationStore`. Every operation
//! addressed at a missing id is a silent no-op, because the editing surface
//! can race ahead of confirmed state (a click landing on something that was
//! just deleted, a replayed delete of something already gone).
//!
//! Mutations here do not record history. The editor snapshots the affected
//! annotations before calling into the store and turns the difference into
//! history actions with [`AnnotationStore::changes_since`]. Undo and redo come
//! back in through the [`ReplayTarget`] implementation at the bottom.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::consts::CLONE_OFFSET;
use crate::history::{Action, ReplayError, ReplayTarget};
use crate::input::Tool;
use crate::model::{Annotation, AnnotationId, AnnotationPatch, BBox, GroupId, PageId, Point, Shape, Style};

// =============================================================================
// TYPES
// =============================================================================

/// Edge or center line used by [`AnnotationStore::align`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignEdge {
    Left,
    /// Horizontal center.
    Center,
    Right,
    Top,
    /// Vertical middle.
    Middle,
    Bottom,
}

/// Axis used by [`AnnotationStore::distribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// The selected ids plus the active tool and its per-tool style defaults.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: Vec<AnnotationId>,
    tool: Tool,
    tool_styles: HashMap<Tool, Style>,
}

impl Selection {
    /// Selected ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[AnnotationId] {
        &self.ids
    }

    #[must_use]
    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The active tool.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Style overrides the user picked for `tool`; empty if none.
    #[must_use]
    pub fn tool_style(&self, tool: Tool) -> Style {
        self.tool_styles.get(&tool).cloned().unwrap_or_default()
    }

    fn push(&mut self, id: AnnotationId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// In-memory store of annotations in paint order.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    selection: Selection,
    clone_offset: f64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clone_offset(CLONE_OFFSET)
    }

    /// Create an empty store whose duplicates are offset by `clone_offset` on both axes.
    #[must_use]
    pub fn with_clone_offset(clone_offset: f64) -> Self {
        Self { annotations: Vec::new(), selection: Selection::default(), clone_offset }
    }

    // --- Queries ---

    #[must_use]
    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == *id)
    }

    #[must_use]
    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.index_of(id).is_some()
    }

    /// Paint-order position of `id`.
    #[must_use]
    pub fn index_of(&self, id: &AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| a.id == *id)
    }

    /// Every annotation, back to front.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Annotations on `page`, back to front.
    pub fn annotations_on_page(&self, page: PageId) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.page_id == page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn selected_ids(&self) -> &[AnnotationId] {
        self.selection.ids()
    }

    /// Ids of every annotation in `group`, in paint order.
    #[must_use]
    pub fn group_members(&self, group: GroupId) -> Vec<AnnotationId> {
        self.annotations
            .iter()
            .filter(|a| a.group_id == Some(group))
            .map(|a| a.id)
            .collect()
    }

    /// Clones of the annotations in `ids` that exist, in the order given.
    #[must_use]
    pub fn snapshot(&self, ids: &[AnnotationId]) -> Vec<Annotation> {
        ids.iter().filter_map(|id| self.get(id)).cloned().collect()
    }

    /// Compare `before` snapshots with live state.
    ///
    /// Yields an update action for each annotation that changed and a remove
    /// action for each one that no longer exists. Annotations whose only
    /// difference is `modified_at` count as unchanged.
    #[must_use]
    pub fn changes_since(&self, before: &[Annotation]) -> Vec<Action> {
        before
            .iter()
            .filter_map(|old| match self.get(&old.id) {
                Some(now) if !now.same_content(old) => Some(Action::update(old.clone(), now.clone())),
                Some(_) => None,
                None => Some(Action::remove(old.clone(), None)),
            })
            .collect()
    }

    // --- CRUD ---

    /// Append `annotation` at the top of the paint order.
    ///
    /// Returns `false` and leaves the store unchanged if the id already exists.
    pub fn add(&mut self, annotation: Annotation) -> bool {
        if self.contains(&annotation.id) {
            warn!(id = %annotation.id, "duplicate annotation id ignored");
            return false;
        }
        self.annotations.push(annotation);
        true
    }

    /// Merge `patch` into the annotation with `id`. Returns false if it doesn't exist.
    pub fn update(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> bool {
        let Some(a) = self.get_mut(id) else {
            return false;
        };
        a.apply_patch(patch);
        a.touch();
        true
    }

    /// Overwrite the annotation with the same id, keeping its paint position.
    ///
    /// Returns false if no annotation has that id.
    pub fn replace(&mut self, annotation: Annotation) -> bool {
        let Some(slot) = self.get_mut(&annotation.id) else {
            return false;
        };
        *slot = annotation;
        true
    }

    /// Remove an annotation and evict it from the selection, returning it if it was present.
    pub fn remove(&mut self, id: &AnnotationId) -> Option<Annotation> {
        let pos = self.index_of(id)?;
        self.selection.ids.retain(|s| s != id);
        Some(self.annotations.remove(pos))
    }

    /// Copy an annotation under a fresh id, offset so it doesn't sit exactly on the source.
    ///
    /// The copy is appended at the top of the paint order and is not grouped.
    pub fn duplicate(&mut self, id: &AnnotationId) -> Option<AnnotationId> {
        let mut copy = self.get(id)?.clone();
        copy.id = Uuid::new_v4();
        copy.group_id = None;
        copy.translate(self.clone_offset, self.clone_offset);
        copy.touch();
        copy.created_at = copy.modified_at;
        let new_id = copy.id;
        self.annotations.push(copy);
        Some(new_id)
    }

    // --- Geometry ---

    /// Move one annotation, its endpoints and its points by `(dx, dy)`.
    pub fn translate(&mut self, id: &AnnotationId, dx: f64, dy: f64) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        let Some(a) = self.get_mut(id) else {
            return false;
        };
        a.translate(dx, dy);
        a.touch();
        true
    }

    /// Move every selected annotation by the same delta. Returns how many moved.
    pub fn translate_selection(&mut self, dx: f64, dy: f64) -> usize {
        let ids = self.selection.ids.clone();
        ids.iter().filter(|id| self.translate(id, dx, dy)).count()
    }

    /// Set the bounding box dimensions only; endpoints and point lists are not rescaled.
    pub fn resize(&mut self, id: &AnnotationId, width: f64, height: f64) -> bool {
        let Some(a) = self.get_mut(id) else {
            return false;
        };
        a.bbox.width = width.max(0.0);
        a.bbox.height = height.max(0.0);
        a.touch();
        true
    }

    /// Replace the bounding box and map endpoints and point lists into it.
    pub fn reshape(&mut self, id: &AnnotationId, bbox: BBox) -> bool {
        let Some(a) = self.get_mut(id) else {
            return false;
        };
        a.reshape(BBox::from_corners(Point::new(bbox.x, bbox.y), Point::new(bbox.right(), bbox.bottom())));
        a.touch();
        true
    }

    /// Append `point` to a stroke's path and grow its bounding box to fit.
    ///
    /// No-op for kinds without a point list and for a repeat of the last point.
    pub fn append_point(&mut self, id: &AnnotationId, point: Point) -> bool {
        let Some(a) = self.get_mut(id) else {
            return false;
        };
        match &mut a.shape {
            Shape::Freehand { path } | Shape::HighlighterStroke { path } => {
                if path.last() == Some(&point) {
                    return false;
                }
                path.push(point);
            }
            _ => return false,
        }
        a.fit_bbox_to_geometry();
        a.touch();
        true
    }

    /// Align every target's `edge` with the shared extent of all targets.
    ///
    /// Needs at least two existing targets; returns false otherwise.
    pub fn align(&mut self, ids: &[AnnotationId], edge: AlignEdge) -> bool {
        let targets = self.existing(ids);
        if targets.len() < 2 {
            return false;
        }
        let Some(extent) = BBox::union_all(targets.iter().map(|&i| &self.annotations[i].bbox)) else {
            return false;
        };

        for i in targets {
            let b = self.annotations[i].bbox;
            let (dx, dy) = match edge {
                AlignEdge::Left => (extent.x - b.x, 0.0),
                AlignEdge::Center => (extent.center_x() - b.center_x(), 0.0),
                AlignEdge::Right => (extent.right() - b.right(), 0.0),
                AlignEdge::Top => (0.0, extent.y - b.y),
                AlignEdge::Middle => (0.0, extent.center_y() - b.center_y()),
                AlignEdge::Bottom => (0.0, extent.bottom() - b.bottom()),
            };
            self.translate_at(i, dx, dy);
        }
        true
    }

    /// Space targets so the gaps between consecutive outer edges are equal.
    ///
    /// The first and last targets along `axis` stay put. Needs at least three
    /// existing targets; returns false otherwise.
    pub fn distribute(&mut self, ids: &[AnnotationId], axis: Axis) -> bool {
        let mut targets = self.existing(ids);
        if targets.len() < 3 {
            return false;
        }
        let span = |b: &BBox| match axis {
            Axis::Horizontal => (b.x, b.width),
            Axis::Vertical => (b.y, b.height),
        };
        targets.sort_by(|&a, &b| {
            span(&self.annotations[a].bbox)
                .0
                .total_cmp(&span(&self.annotations[b].bbox).0)
        });

        let (first_start, first_len) = span(&self.annotations[targets[0]].bbox);
        let (last_start, last_len) = span(&self.annotations[targets[targets.len() - 1]].bbox);
        let total_len: f64 = targets.iter().map(|&i| span(&self.annotations[i].bbox).1).sum();
        #[allow(clippy::cast_precision_loss)]
        let gap = (last_start + last_len - first_start - total_len) / (targets.len() - 1) as f64;

        let mut cursor = first_start + first_len + gap;
        for &i in &targets[1..targets.len() - 1] {
            let (start, len) = span(&self.annotations[i].bbox);
            let delta = cursor - start;
            match axis {
                Axis::Horizontal => self.translate_at(i, delta, 0.0),
                Axis::Vertical => self.translate_at(i, 0.0, delta),
            }
            cursor += len + gap;
        }
        true
    }

    // --- Groups ---

    /// Put every target into one new group. Needs at least two existing targets.
    pub fn group(&mut self, ids: &[AnnotationId]) -> Option<GroupId> {
        let targets = self.existing(ids);
        if targets.len() < 2 {
            return None;
        }
        let group = Uuid::new_v4();
        for i in targets {
            let a = &mut self.annotations[i];
            a.group_id = Some(group);
            a.touch();
        }
        Some(group)
    }

    /// Clear the group of every target. Returns false if none was grouped.
    pub fn ungroup(&mut self, ids: &[AnnotationId]) -> bool {
        let mut changed = false;
        for i in self.existing(ids) {
            let a = &mut self.annotations[i];
            if a.group_id.take().is_some() {
                a.touch();
                changed = true;
            }
        }
        changed
    }

    // --- Selection ---

    /// Select `id`.
    ///
    /// A single select replaces the selection, expanding to the whole group
    /// when `id` is grouped. A multi select toggles only `id`.
    pub fn select(&mut self, id: &AnnotationId, multi: bool) -> bool {
        let Some(a) = self.get(id) else {
            return false;
        };
        if multi {
            if self.selection.contains(id) {
                self.selection.ids.retain(|s| s != id);
            } else {
                self.selection.ids.push(*id);
            }
            return true;
        }
        self.selection.ids = match a.group_id {
            Some(group) => self.group_members(group),
            None => vec![*id],
        };
        true
    }

    /// Replace the selection with the existing ids in `ids`.
    pub fn select_many(&mut self, ids: &[AnnotationId]) {
        self.selection.ids.clear();
        for id in ids {
            if self.contains(id) {
                self.selection.push(*id);
            }
        }
    }

    /// Select everything on `page` whose bounding box intersects `rect`.
    ///
    /// Grouped annotations pull in their whole group. With `additive` the
    /// hits are added to the current selection.
    pub fn select_in_rect(&mut self, page: PageId, rect: &BBox, additive: bool) {
        if !additive {
            self.selection.ids.clear();
        }
        let hits: Vec<(AnnotationId, Option<GroupId>)> = self
            .annotations_on_page(page)
            .filter(|a| a.bbox.intersects(rect))
            .map(|a| (a.id, a.group_id))
            .collect();
        for (id, group) in hits {
            match group {
                Some(g) => self.group_members(g).into_iter().for_each(|m| self.selection.push(m)),
                None => self.selection.push(id),
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.ids.clear();
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.selection.tool = tool;
    }

    /// Remember style overrides for annotations created with `tool`.
    pub fn set_tool_style(&mut self, tool: Tool, style: Style) {
        self.selection.tool_styles.insert(tool, style);
    }

    // --- Layer order ---

    /// Move `id` to the top of the paint order.
    pub fn bring_to_front(&mut self, id: &AnnotationId) -> bool {
        let last = self.annotations.len().saturating_sub(1);
        self.move_to_index(id, last)
    }

    /// Move `id` to the bottom of the paint order.
    pub fn send_to_back(&mut self, id: &AnnotationId) -> bool {
        self.move_to_index(id, 0)
    }

    /// Swap `id` with the annotation painted just above it.
    pub fn bring_forward(&mut self, id: &AnnotationId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos + 1 < self.annotations.len() => self.move_to_index(id, pos + 1),
            _ => false,
        }
    }

    /// Swap `id` with the annotation painted just below it.
    pub fn send_backward(&mut self, id: &AnnotationId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => self.move_to_index(id, pos - 1),
            _ => false,
        }
    }

    /// Move `id` to paint position `index` (clamped). Returns false if nothing moved.
    pub fn move_to_index(&mut self, id: &AnnotationId, index: usize) -> bool {
        let Some(pos) = self.index_of(id) else {
            return false;
        };
        let index = index.min(self.annotations.len() - 1);
        if pos == index {
            return false;
        }
        let mut a = self.annotations.remove(pos);
        a.touch();
        self.annotations.insert(index, a);
        true
    }

    // --- Internals ---

    fn get_mut(&mut self, id: &AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == *id)
    }

    /// Positions of the existing, distinct ids in `ids`.
    fn existing(&self, ids: &[AnnotationId]) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(i) = self.index_of(id) {
                if !out.contains(&i) {
                    out.push(i);
                }
            }
        }
        out
    }

    fn translate_at(&mut self, index: usize, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let a = &mut self.annotations[index];
        a.translate(dx, dy);
        a.touch();
    }
}

// =============================================================================
// REPLAY
// =============================================================================

impl ReplayTarget for AnnotationStore {
    fn apply_add(&mut self, annotation: &Annotation, index: Option<usize>) -> Result<(), ReplayError> {
        if self.contains(&annotation.id) {
            return Err(ReplayError::DuplicateId(annotation.id));
        }
        let at = index.map_or(self.annotations.len(), |i| i.min(self.annotations.len()));
        self.annotations.insert(at, annotation.clone());
        Ok(())
    }

    fn apply_remove(&mut self, id: &AnnotationId) -> Result<(), ReplayError> {
        self.remove(id);
        Ok(())
    }

    fn apply_update(&mut self, annotation: &Annotation, index: Option<usize>) -> Result<(), ReplayError> {
        let Some(pos) = self.index_of(&annotation.id) else {
            return Err(ReplayError::NotFound(annotation.id));
        };
        match index {
            Some(i) if i != pos => {
                self.annotations.remove(pos);
                let at = i.min(self.annotations.len());
                self.annotations.insert(at, annotation.clone());
            }
            _ => {
                self.replace(annotation.clone());
            }
        }
        Ok(())
    }
}
