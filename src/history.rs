//! Undo/redo history built from reversible per-annotation actions.
//!
//! DESIGN
//! ======
//! Every logical edit is recorded as one [`HistoryEntry`] holding a list of
//! [`Action`]s with full before/after snapshots. Entries sit in a bounded
//! ring buffer addressed by a single cursor: entries after the cursor have
//! been undone and are kept until the next push discards them.
//!
//! The history never touches annotations itself. Undo and redo replay the
//! recorded snapshots through a [`ReplayTarget`], which the store implements,
//! so this module has no dependency on the concrete store type.
//!
//! Redo applies an entry's actions in array order; undo applies their
//! inverses in reverse order. A failed replay rolls back the actions of that
//! entry that were already applied and leaves the cursor where it was.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::consts::DEFAULT_HISTORY_SIZE;
use crate::model::{Annotation, AnnotationId, PageId, now_ms};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("annotation already exists: {0}")]
    DuplicateId(AnnotationId),
    #[error("annotation not found: {0}")]
    NotFound(AnnotationId),
    #[error("{kind:?} action for {id} has no snapshot to restore")]
    MissingSnapshot { kind: ActionKind, id: AnnotationId },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistoryError {
    #[error("undo of \"{description}\" failed: {source}")]
    Undo { description: String, source: ReplayError },
    #[error("redo of \"{description}\" failed: {source}")]
    Redo { description: String, source: ReplayError },
}

// =============================================================================
// REPLAY TARGET
// =============================================================================

/// The mutation entry points history replays through.
///
/// `index` is a paint-order position; `None` means "leave ordering alone"
/// (append for inserts).
pub trait ReplayTarget {
    /// Insert `annotation`. Fails if its id already exists.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` when the id is already present.
    fn apply_add(&mut self, annotation: &Annotation, index: Option<usize>) -> Result<(), ReplayError>;

    /// Remove the annotation with `id`. Removing a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Implementations may reject removals they cannot perform.
    fn apply_remove(&mut self, id: &AnnotationId) -> Result<(), ReplayError>;

    /// Overwrite an existing annotation with `annotation` verbatim.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no annotation has that id.
    fn apply_update(&mut self, annotation: &Annotation, index: Option<usize>) -> Result<(), ReplayError>;
}

// =============================================================================
// ACTIONS AND ENTRIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Remove,
    Update,
}

/// One reversible change to one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub annotation_id: AnnotationId,
    pub page_id: PageId,
    /// State before the change. Absent only for `add`.
    pub before: Option<Annotation>,
    /// State after the change. Absent only for `remove`.
    pub after: Option<Annotation>,
    /// Paint-order position before the change, when it matters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_index: Option<usize>,
    /// Paint-order position after the change, when it matters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_index: Option<usize>,
}

impl Action {
    /// An insertion of `after` at paint position `index`.
    #[must_use]
    pub fn add(after: Annotation, index: Option<usize>) -> Self {
        Self {
            kind: ActionKind::Add,
            annotation_id: after.id,
            page_id: after.page_id,
            before: None,
            after: Some(after),
            before_index: None,
            after_index: index,
        }
    }

    /// A removal of `before`, which sat at paint position `index`.
    #[must_use]
    pub fn remove(before: Annotation, index: Option<usize>) -> Self {
        Self {
            kind: ActionKind::Remove,
            annotation_id: before.id,
            page_id: before.page_id,
            before: Some(before),
            after: None,
            before_index: index,
            after_index: None,
        }
    }

    /// An in-place change from `before` to `after`.
    #[must_use]
    pub fn update(before: Annotation, after: Annotation) -> Self {
        Self {
            kind: ActionKind::Update,
            annotation_id: after.id,
            page_id: after.page_id,
            before: Some(before),
            after: Some(after),
            before_index: None,
            after_index: None,
        }
    }

    /// Attach paint-order positions, for changes that reorder.
    #[must_use]
    pub fn with_indices(mut self, before_index: Option<usize>, after_index: Option<usize>) -> Self {
        self.before_index = before_index;
        self.after_index = after_index;
        self
    }

    fn snapshot<'a>(&self, snapshot: Option<&'a Annotation>) -> Result<&'a Annotation, ReplayError> {
        snapshot.ok_or(ReplayError::MissingSnapshot { kind: self.kind, id: self.annotation_id })
    }

    fn undo(&self, target: &mut dyn ReplayTarget) -> Result<(), ReplayError> {
        match self.kind {
            ActionKind::Add => target.apply_remove(&self.annotation_id),
            ActionKind::Remove => target.apply_add(self.snapshot(self.before.as_ref())?, self.before_index),
            ActionKind::Update => target.apply_update(self.snapshot(self.before.as_ref())?, self.before_index),
        }
    }

    fn redo(&self, target: &mut dyn ReplayTarget) -> Result<(), ReplayError> {
        match self.kind {
            ActionKind::Add => target.apply_add(self.snapshot(self.after.as_ref())?, self.after_index),
            ActionKind::Remove => target.apply_remove(&self.annotation_id),
            ActionKind::Update => target.apply_update(self.snapshot(self.after.as_ref())?, self.after_index),
        }
    }
}

/// One logical edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Human-readable label, e.g. "Move 2 annotations".
    pub description: String,
    /// When the entry was recorded, unix milliseconds.
    pub timestamp: i64,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn apply(self, action: &Action, target: &mut dyn ReplayTarget) -> Result<(), ReplayError> {
        match self {
            Self::Undo => action.undo(target),
            Self::Redo => action.redo(target),
        }
    }

    fn inverse(self) -> Self {
        match self {
            Self::Undo => Self::Redo,
            Self::Redo => Self::Undo,
        }
    }
}

/// Apply `actions` in `direction`; on failure undo the ones already applied.
fn replay(actions: &[Action], direction: Direction, target: &mut dyn ReplayTarget) -> Result<(), ReplayError> {
    let ordered: Vec<&Action> = match direction {
        Direction::Redo => actions.iter().collect(),
        Direction::Undo => actions.iter().rev().collect(),
    };
    for (done, action) in ordered.iter().enumerate() {
        if let Err(e) = direction.apply(action, target) {
            for applied in ordered[..done].iter().rev() {
                if let Err(rollback) = direction.inverse().apply(applied, target) {
                    error!(error = %rollback, id = %applied.annotation_id, "history rollback failed");
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

// =============================================================================
// HISTORY
// =============================================================================

/// Bounded undo/redo log.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    /// Index of the most recently applied entry; `None` before the first.
    cursor: Option<usize>,
    max_size: usize,
    can_undo: bool,
    can_redo: bool,
    last_error: Option<HistoryError>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    /// Create an empty history retaining at most `max_size` entries (minimum 1).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            max_size: max_size.max(1),
            can_undo: false,
            can_redo: false,
            last_error: None,
        }
    }

    /// Record a new entry, discarding any undone entries after the cursor.
    ///
    /// An empty action list records nothing.
    pub fn push(&mut self, description: impl Into<String>, actions: Vec<Action>) {
        let description = description.into();
        if actions.is_empty() {
            debug!(%description, "history push skipped: no actions");
            return;
        }

        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push_back(HistoryEntry { description, timestamp: now_ms(), actions });

        while self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len().checked_sub(1);
        self.last_error = None;
        self.refresh_flags();

        debug!(depth = self.entries.len(), cursor = ?self.cursor, "history entry pushed");
    }

    /// Revert the entry at the cursor and step the cursor back.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Undo` if replay fails; the cursor is unchanged
    /// and the error is also kept in [`History::last_error`].
    pub fn undo(&mut self, target: &mut dyn ReplayTarget) -> Result<bool, HistoryError> {
        let Some(cursor) = self.cursor else {
            return Ok(false);
        };
        let Some(entry) = self.entries.get(cursor) else {
            return Ok(false);
        };

        if let Err(source) = replay(&entry.actions, Direction::Undo, target) {
            let err = HistoryError::Undo { description: entry.description.clone(), source };
            warn!(error = %err, "undo failed");
            self.last_error = Some(err.clone());
            return Err(err);
        }

        debug!(description = %entry.description, cursor, "undo");
        self.cursor = cursor.checked_sub(1);
        self.last_error = None;
        self.refresh_flags();
        Ok(true)
    }

    /// Re-apply the entry after the cursor and advance the cursor.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Redo` if replay fails; the cursor is unchanged
    /// and the error is also kept in [`History::last_error`].
    pub fn redo(&mut self, target: &mut dyn ReplayTarget) -> Result<bool, HistoryError> {
        let next = self.cursor.map_or(0, |c| c + 1);
        let Some(entry) = self.entries.get(next) else {
            return Ok(false);
        };

        if let Err(source) = replay(&entry.actions, Direction::Redo, target) {
            let err = HistoryError::Redo { description: entry.description.clone(), source };
            warn!(error = %err, "redo failed");
            self.last_error = Some(err.clone());
            return Err(err);
        }

        debug!(description = %entry.description, cursor = next, "redo");
        self.cursor = Some(next);
        self.last_error = None;
        self.refresh_flags();
        Ok(true)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.last_error = None;
        self.refresh_flags();
    }

    fn refresh_flags(&mut self) {
        self.can_undo = self.cursor.is_some();
        self.can_redo = self.cursor.map_or(0, |c| c + 1) < self.entries.len();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.can_undo
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.can_redo
    }

    /// Index of the most recently applied entry, or `None` if everything is undone.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.cursor
    }

    /// The error from the most recent failed undo/redo, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&HistoryError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of retained entries, including undone ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Label of the entry the next undo would revert.
    #[must_use]
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .and_then(|c| self.entries.get(c))
            .map(|e| e.description.as_str())
    }

    /// Label of the entry the next redo would re-apply.
    #[must_use]
    pub fn redo_description(&self) -> Option<&str> {
        self.entries
            .get(self.cursor.map_or(0, |c| c + 1))
            .map(|e| e.description.as_str())
    }
}
