//! Editor: the pointer/keyboard state machine over one page.
//!
//! DESIGN
//! ======
//! The editor owns the store, the history and the factory for one page and
//! turns raw input into store mutations. Every handler returns a list of
//! [`Effect`]s for the host to act on (redraw, update toolbars, open a text
//! field); the editor never calls back into the host.
//!
//! A gesture mutates the store incrementally while it runs, so the host can
//! redraw live, but records exactly one history entry when it ends. The
//! before-state of everything a gesture can touch is captured on press,
//! before the first mutation, and the entry is built on release by diffing
//! that snapshot against live state.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::consts::MIN_SHAPE_SIZE;
use crate::factory::{AnnotationFactory, DrawRequest, validate};
use crate::hit::{Hit, HitPart, hit_test};
use crate::history::{Action, History, HistoryError};
use crate::input::{Button, InputState, Key, Modifiers, Tool};
use crate::model::{Annotation, AnnotationId, AnnotationKind, AnnotationPatch, BBox, PageInfo, Point, Style};
use crate::store::{AlignEdge, AnnotationStore, Axis};

/// Effects returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RenderNeeded,
    SelectionChanged(Vec<AnnotationId>),
    ToolChanged(Tool),
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// Open an inline text editor over the annotation.
    EditTextRequested { id: AnnotationId },
    SetCursor(String),
}

/// Paint-order change applied to every selected annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerMove {
    ToFront,
    ToBack,
    Forward,
    Backward,
}

/// Editing state for one page.
pub struct Editor {
    store: AnnotationStore,
    history: History,
    factory: AnnotationFactory,
    pub camera: Camera,
    input: InputState,
    page: PageInfo,
    config: EditorConfig,
    text_editing: bool,
    cursor: String,
}

impl Editor {
    #[must_use]
    pub fn new(page: PageInfo, config: EditorConfig) -> Self {
        Self {
            store: AnnotationStore::with_clone_offset(config.clone_offset),
            history: History::new(config.history_size),
            factory: AnnotationFactory::with_text_size(config.text_width, config.text_height),
            camera: Camera::default(),
            input: InputState::Idle,
            page,
            config,
            text_editing: false,
            cursor: "default".to_owned(),
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn page(&self) -> &PageInfo {
        &self.page
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The gesture in progress.
    #[must_use]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.store.selection().tool()
    }

    #[must_use]
    pub fn selected_ids(&self) -> &[AnnotationId] {
        self.store.selected_ids()
    }

    #[must_use]
    pub fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.store.get(id)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The error from the last failed undo or redo, for a "could not undo" indicator.
    #[must_use]
    pub fn replay_failed(&self) -> Option<&HistoryError> {
        self.history.last_error()
    }

    /// CSS cursor name most recently requested through [`Effect::SetCursor`].
    #[must_use]
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Whether a text field owns the keyboard.
    #[must_use]
    pub fn is_text_editing(&self) -> bool {
        self.text_editing
    }

    /// Mutable access to the factory, for registering custom tools.
    pub fn factory_mut(&mut self) -> &mut AnnotationFactory {
        &mut self.factory
    }

    // --- Tool / text ---

    /// Set the active tool. Any gesture in progress is committed first.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        if self.store.selection().tool() != tool {
            self.store.set_tool(tool);
            effects.push(Effect::ToolChanged(tool));
        }
        effects
    }

    /// Remember style overrides for annotations drawn with `tool`.
    pub fn set_tool_style(&mut self, tool: Tool, style: Style) {
        self.store.set_tool_style(tool, style);
    }

    /// Tell the editor whether the host's text field has keyboard focus.
    pub fn set_text_editing(&mut self, editing: bool) {
        self.text_editing = editing;
    }

    /// Commit text from the host editor into a text annotation.
    pub fn set_text(&mut self, id: &AnnotationId, content: String) -> Vec<Effect> {
        self.text_editing = false;
        let mut effects = self.finish_gesture();
        let patch = AnnotationPatch { content: Some(content), ..AnnotationPatch::default() };
        effects.extend(self.edit("Edit text", &[*id], |store, ids| store.update(&ids[0], &patch)));
        effects
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Effect> {
        if button != Button::Primary {
            return Vec::new();
        }
        let mut effects = self.finish_gesture();
        let page_pt = self.camera.screen_to_page(screen_pt);
        let tool = self.tool();

        if !tool.is_drawing() {
            effects.extend(self.press_select(page_pt, modifiers));
            return effects;
        }
        if !self.page.bounds().contains(page_pt) {
            debug!(x = page_pt.x, y = page_pt.y, "press outside page ignored");
            return effects;
        }
        if tool.creates_on_press() {
            effects.extend(self.create_on_press(tool, page_pt));
        } else {
            self.input = InputState::PendingDraw { tool, start_screen: screen_pt, start_page: page_pt };
        }
        effects
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Effect> {
        let page_pt = self.camera.screen_to_page(screen_pt);
        match std::mem::take(&mut self.input) {
            InputState::Idle => self.hover(page_pt),
            InputState::PendingDraw { tool, start_screen, start_page } => {
                if start_screen.distance(screen_pt) <= self.config.drag_threshold_px {
                    self.input = InputState::PendingDraw { tool, start_screen, start_page };
                    return Vec::new();
                }
                self.begin_drawing(tool, start_screen, start_page, page_pt)
            }
            InputState::Drawing { id, tool, start_page } => {
                self.shape_drawing(&id, tool, start_page, page_pt);
                self.input = InputState::Drawing { id, tool, start_page };
                vec![Effect::RenderNeeded]
            }
            InputState::Dragging { last_page, snapshot } => {
                let (mut dx, mut dy) = (page_pt.x - last_page.x, page_pt.y - last_page.y);
                if modifiers.axis_lock() {
                    if dx.abs() >= dy.abs() {
                        dy = 0.0;
                    } else {
                        dx = 0.0;
                    }
                }
                let moved = self.store.translate_selection(dx, dy);
                self.input = InputState::Dragging { last_page: page_pt, snapshot };
                if moved > 0 { vec![Effect::RenderNeeded] } else { Vec::new() }
            }
            InputState::Resizing { id, anchor, start_page, orig, snapshot } => {
                let bbox = anchor.apply(&orig, page_pt.x - start_page.x, page_pt.y - start_page.y);
                let mut resized = (*snapshot).clone();
                if bbox != orig {
                    resized.reshape(bbox);
                    resized.touch();
                }
                self.store.replace(resized);
                self.input = InputState::Resizing { id, anchor, start_page, orig, snapshot };
                vec![Effect::RenderNeeded]
            }
            InputState::Selecting { start, additive, .. } => {
                self.input = InputState::Selecting { start, current: page_pt, additive };
                vec![Effect::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Effect> {
        if button != Button::Primary {
            return Vec::new();
        }
        let mut effects = if self.input.is_idle() { Vec::new() } else { self.on_pointer_move(screen_pt, modifiers) };
        effects.extend(self.finish_gesture());
        effects
    }

    /// The pointer left the surface: end the gesture, keeping what was already applied.
    pub fn on_pointer_leave(&mut self) -> Vec<Effect> {
        self.finish_gesture()
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Effect> {
        if key.is("Escape") {
            return self.escape();
        }
        if self.text_editing {
            return Vec::new();
        }
        if key.is("Delete") || key.is("Backspace") {
            return self.delete_selected();
        }
        if !modifiers.command() {
            return Vec::new();
        }
        if key.is("z") {
            return if modifiers.shift { self.redo() } else { self.undo() };
        }
        if key.is("y") {
            return self.redo();
        }
        if key.is("d") {
            return self.duplicate_selected();
        }
        if key.is("g") {
            return if modifiers.shift { self.ungroup_selected() } else { self.group_selected() };
        }
        if key.is("a") {
            return self.select_all();
        }
        Vec::new()
    }

    // --- Commands ---
    //
    // Each command first commits any gesture in progress, so it lands after
    // that gesture in the history.

    pub fn undo(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let before = self.store.selected_ids().to_vec();
        match self.history.undo(&mut self.store) {
            Ok(false) => {}
            Ok(true) => {
                effects.push(Effect::RenderNeeded);
                effects.push(self.history_changed());
                effects.extend(self.selection_changed(&before));
            }
            Err(e) => {
                warn!(error = %e, "undo left the document unchanged");
                effects.push(self.history_changed());
            }
        }
        effects
    }

    pub fn redo(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let before = self.store.selected_ids().to_vec();
        match self.history.redo(&mut self.store) {
            Ok(false) => {}
            Ok(true) => {
                effects.push(Effect::RenderNeeded);
                effects.push(self.history_changed());
                effects.extend(self.selection_changed(&before));
            }
            Err(e) => {
                warn!(error = %e, "redo left the document unchanged");
                effects.push(self.history_changed());
            }
        }
        effects
    }

    /// Remove every selected annotation as one history entry.
    pub fn delete_selected(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let ids = self.store.selected_ids().to_vec();
        let before = ids.clone();
        let mut actions = Vec::with_capacity(ids.len());
        for id in &ids {
            let index = self.store.index_of(id);
            if let Some(removed) = self.store.remove(id) {
                actions.push(Action::remove(removed, index));
            }
        }
        let description = format!("Delete {}", count_label(actions.len()));
        effects.extend(self.record(description, actions));
        effects.extend(self.selection_changed(&before));
        effects
    }

    /// Copy every selected annotation and select the copies.
    pub fn duplicate_selected(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let ids = self.store.selected_ids().to_vec();
        let mut copies = Vec::with_capacity(ids.len());
        let mut actions = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(copy_id) = self.store.duplicate(id) else { continue };
            if let Some(copy) = self.store.get(&copy_id) {
                actions.push(Action::add(copy.clone(), self.store.index_of(&copy_id)));
            }
            copies.push(copy_id);
        }
        let description = format!("Duplicate {}", count_label(actions.len()));
        effects.extend(self.record(description, actions));
        self.store.select_many(&copies);
        effects.extend(self.selection_changed(&ids));
        effects
    }

    pub fn group_selected(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let ids = self.store.selected_ids().to_vec();
        let description = format!("Group {}", count_label(ids.len()));
        effects.extend(self.edit(&description, &ids, |store, ids| store.group(ids).is_some()));
        effects
    }

    pub fn ungroup_selected(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let ids = self.store.selected_ids().to_vec();
        let description = format!("Ungroup {}", count_label(ids.len()));
        effects.extend(self.edit(&description, &ids, AnnotationStore::ungroup));
        effects
    }

    pub fn align_selected(&mut self, edge: AlignEdge) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let ids = self.store.selected_ids().to_vec();
        let description = format!("Align {edge:?}").to_lowercase();
        effects.extend(self.edit(&description, &ids, |store, ids| store.align(ids, edge)));
        effects
    }

    pub fn distribute_selected(&mut self, axis: Axis) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let ids = self.store.selected_ids().to_vec();
        let description = format!("Distribute {axis:?}").to_lowercase();
        effects.extend(self.edit(&description, &ids, |store, ids| store.distribute(ids, axis)));
        effects
    }

    /// Merge `style` into every selected annotation.
    pub fn update_style(&mut self, style: Style) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let ids = self.store.selected_ids().to_vec();
        let patch = AnnotationPatch { style: Some(style), ..AnnotationPatch::default() };
        effects.extend(self.edit("Change style", &ids, |store, ids| {
            ids.iter().fold(false, |changed, id| store.update(id, &patch) || changed)
        }));
        effects
    }

    /// Set one annotation's dimensions, leaving its origin and geometry alone.
    pub fn resize_annotation(&mut self, id: &AnnotationId, width: f64, height: f64) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let label = self.store.get(id).map_or("annotation", |a| a.kind().label());
        let description = format!("Resize {label}");
        effects.extend(self.edit(&description, &[*id], |store, ids| store.resize(&ids[0], width, height)));
        effects
    }

    /// Change the paint order of the selection.
    pub fn reorder_selected(&mut self, layer: LayerMove) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let mut ids = self.store.selected_ids().to_vec();
        ids.sort_by_key(|id| self.store.index_of(id));
        // Members keep their relative order.
        if matches!(layer, LayerMove::ToBack | LayerMove::Forward) {
            ids.reverse();
        }

        let mut actions = Vec::with_capacity(ids.len());
        for id in &ids {
            let (Some(before), Some(before_index)) = (self.store.get(id).cloned(), self.store.index_of(id)) else {
                continue;
            };
            let moved = match layer {
                LayerMove::ToFront => self.store.bring_to_front(id),
                LayerMove::ToBack => self.store.send_to_back(id),
                LayerMove::Forward => self.store.bring_forward(id),
                LayerMove::Backward => self.store.send_backward(id),
            };
            if !moved {
                continue;
            }
            if let (Some(after), Some(after_index)) = (self.store.get(id).cloned(), self.store.index_of(id)) {
                actions.push(Action::update(before, after).with_indices(Some(before_index), Some(after_index)));
            }
        }
        let description = match layer {
            LayerMove::ToFront => "Bring to front",
            LayerMove::ToBack => "Send to back",
            LayerMove::Forward => "Bring forward",
            LayerMove::Backward => "Send backward",
        };
        effects.extend(self.record(description, actions));
        effects
    }

    /// Insert a fully formed annotation handed over by a collaborator (e.g. a decoded image).
    pub fn insert_annotation(&mut self, annotation: Annotation) -> Vec<Effect> {
        if !validate(&annotation) {
            warn!(id = %annotation.id, kind = annotation.kind().label(), "rejected invalid annotation");
            return Vec::new();
        }
        let mut effects = self.finish_gesture();
        let id = annotation.id;
        let description = format!("Add {}", annotation.kind().label());
        if !self.store.add(annotation.clone()) {
            return effects;
        }
        let before = self.store.selected_ids().to_vec();
        effects.extend(self.record(description, vec![Action::add(annotation, self.store.index_of(&id))]));
        self.store.select(&id, false);
        effects.extend(self.selection_changed(&before));
        effects
    }

    /// Select every annotation on the page.
    pub fn select_all(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let before = self.store.selected_ids().to_vec();
        let ids: Vec<AnnotationId> = self.store.annotations_on_page(self.page.id).map(|a| a.id).collect();
        self.store.select_many(&ids);
        effects.extend(self.selection_changed(&before));
        effects
    }

    pub fn clear_selection(&mut self) -> Vec<Effect> {
        let mut effects = self.finish_gesture();
        let before = self.store.selected_ids().to_vec();
        self.store.clear_selection();
        effects.extend(self.selection_changed(&before));
        effects
    }

    // --- Gesture internals ---

    fn press_select(&mut self, page_pt: Point, modifiers: Modifiers) -> Vec<Effect> {
        let before = self.store.selected_ids().to_vec();
        match hit_test(page_pt, &self.store, &self.camera, self.page.id, self.config.hit_slop_px) {
            Some(Hit { annotation_id, part: HitPart::ResizeHandle(anchor) }) => {
                if let Some(a) = self.store.get(&annotation_id) {
                    self.input = InputState::Resizing {
                        id: annotation_id,
                        anchor,
                        start_page: page_pt,
                        orig: a.bbox,
                        snapshot: Box::new(a.clone()),
                    };
                }
                self.set_cursor(anchor.cursor())
            }
            Some(Hit { annotation_id, part: HitPart::Body }) => {
                if modifiers.multi_select() {
                    self.store.select(&annotation_id, true);
                } else if !self.store.selection().contains(&annotation_id) {
                    self.store.select(&annotation_id, false);
                }
                if self.store.selection().contains(&annotation_id) {
                    let snapshot = self.store.snapshot(self.store.selected_ids());
                    self.input = InputState::Dragging { last_page: page_pt, snapshot };
                }
                self.selection_changed(&before)
            }
            None => {
                let additive = modifiers.multi_select();
                if !additive {
                    self.store.clear_selection();
                }
                self.input = InputState::Selecting { start: page_pt, current: page_pt, additive };
                self.selection_changed(&before)
            }
        }
    }

    fn create_on_press(&mut self, tool: Tool, page_pt: Point) -> Vec<Effect> {
        let request = self.draw_request(tool, page_pt, page_pt);
        let Some(annotation) = self.factory.create(tool, &request) else {
            return Vec::new();
        };
        let id = annotation.id;
        self.store.add(annotation);
        let mut effects = self.commit_drawing(&id);
        self.text_editing = true;
        effects.push(Effect::EditTextRequested { id });
        effects
    }

    fn begin_drawing(&mut self, tool: Tool, start_screen: Point, start_page: Point, page_pt: Point) -> Vec<Effect> {
        let request = self.draw_request(tool, start_page, page_pt);
        match self.factory.create(tool, &request) {
            Some(annotation) => {
                let id = annotation.id;
                self.store.add(annotation);
                self.input = InputState::Drawing { id, tool, start_page };
                vec![Effect::RenderNeeded]
            }
            None => {
                self.input = InputState::PendingDraw { tool, start_screen, start_page };
                Vec::new()
            }
        }
    }

    fn draw_request(&self, tool: Tool, start: Point, current: Point) -> DrawRequest {
        DrawRequest::new(self.page.id, start, current).with_style(self.store.selection().tool_style(tool))
    }

    fn shape_drawing(&mut self, id: &AnnotationId, tool: Tool, start: Point, current: Point) {
        let spanned = BBox::from_corners(start, current);
        if tool.is_stroke() {
            self.store.append_point(id, current);
        } else if tool.is_segment() {
            let patch = AnnotationPatch { bbox: Some(spanned), end: Some(current), ..AnnotationPatch::default() };
            self.store.update(id, &patch);
        } else if tool.is_box() {
            let patch = AnnotationPatch { bbox: Some(spanned), ..AnnotationPatch::default() };
            self.store.update(id, &patch);
        } else {
            self.store.reshape(id, spanned);
        }
    }

    /// End the gesture in progress, recording its history entry if it changed anything.
    fn finish_gesture(&mut self) -> Vec<Effect> {
        match std::mem::take(&mut self.input) {
            InputState::Idle | InputState::PendingDraw { .. } => Vec::new(),
            InputState::Drawing { id, .. } => self.commit_drawing(&id),
            InputState::Dragging { snapshot, .. } => {
                let actions = self.store.changes_since(&snapshot);
                if actions.is_empty() {
                    for a in snapshot {
                        self.store.replace(a);
                    }
                    return Vec::new();
                }
                let description = format!("Move {}", count_label(actions.len()));
                self.record(description, actions)
            }
            InputState::Resizing { snapshot, .. } => {
                let description = format!("Resize {}", snapshot.kind().label());
                let actions = self.store.changes_since(std::slice::from_ref(&*snapshot));
                let mut effects = self.record(description, actions);
                effects.extend(self.set_cursor("default"));
                effects
            }
            InputState::Selecting { start, current, additive } => {
                let rect = BBox::from_corners(start, current);
                let min = self.camera.screen_dist_to_page(self.config.drag_threshold_px);
                if rect.width < min && rect.height < min {
                    return Vec::new();
                }
                let before = self.store.selected_ids().to_vec();
                self.store.select_in_rect(self.page.id, &rect, additive);
                let mut effects = vec![Effect::RenderNeeded];
                effects.extend(self.selection_changed(&before));
                effects
            }
        }
    }

    /// Record the just-drawn annotation, revert to the select tool and select it.
    ///
    /// A drawing that ended up smaller than the minimum on both axes is
    /// discarded without a history entry.
    fn commit_drawing(&mut self, id: &AnnotationId) -> Vec<Effect> {
        let Some(a) = self.store.get(id) else {
            return vec![Effect::RenderNeeded];
        };
        if a.kind() != AnnotationKind::Text && a.bbox.width < MIN_SHAPE_SIZE && a.bbox.height < MIN_SHAPE_SIZE {
            debug!(%id, "degenerate drawing discarded");
            self.store.remove(id);
            return vec![Effect::RenderNeeded];
        }
        let description = format!("Add {}", a.kind().label());
        let action = Action::add(a.clone(), self.store.index_of(id));

        let before = self.store.selected_ids().to_vec();
        let mut effects = self.record(description, vec![action]);
        if self.store.selection().tool() != Tool::Select {
            self.store.set_tool(Tool::Select);
            effects.push(Effect::ToolChanged(Tool::Select));
        }
        self.store.select(id, false);
        effects.extend(self.selection_changed(&before));
        effects
    }

    fn escape(&mut self) -> Vec<Effect> {
        if self.text_editing {
            self.text_editing = false;
            return Vec::new();
        }
        match std::mem::take(&mut self.input) {
            InputState::Idle => {
                let mut effects = self.clear_selection();
                if self.tool() != Tool::Select {
                    self.store.set_tool(Tool::Select);
                    effects.push(Effect::ToolChanged(Tool::Select));
                }
                effects
            }
            InputState::PendingDraw { .. } | InputState::Selecting { .. } => vec![Effect::RenderNeeded],
            InputState::Drawing { id, .. } => {
                self.store.remove(&id);
                vec![Effect::RenderNeeded]
            }
            InputState::Dragging { snapshot, .. } => {
                for a in snapshot {
                    self.store.replace(a);
                }
                vec![Effect::RenderNeeded]
            }
            InputState::Resizing { snapshot, .. } => {
                self.store.replace(*snapshot);
                let mut effects = vec![Effect::RenderNeeded];
                effects.extend(self.set_cursor("default"));
                effects
            }
        }
    }

    fn hover(&mut self, page_pt: Point) -> Vec<Effect> {
        let cursor = if self.tool().is_drawing() {
            "crosshair"
        } else {
            match hit_test(page_pt, &self.store, &self.camera, self.page.id, self.config.hit_slop_px) {
                Some(Hit { part: HitPart::ResizeHandle(anchor), .. }) => anchor.cursor(),
                Some(Hit { part: HitPart::Body, .. }) => "move",
                None => "default",
            }
        };
        self.set_cursor(cursor)
    }

    // --- Helpers ---

    /// Snapshot `ids`, run `op`, and record whatever it changed as one entry.
    fn edit(
        &mut self,
        description: &str,
        ids: &[AnnotationId],
        op: impl FnOnce(&mut AnnotationStore, &[AnnotationId]) -> bool,
    ) -> Vec<Effect> {
        if ids.is_empty() {
            return Vec::new();
        }
        let before = self.store.snapshot(ids);
        if !op(&mut self.store, ids) {
            return Vec::new();
        }
        let actions = self.store.changes_since(&before);
        if actions.is_empty() {
            // Drop timestamp-only changes so the store matches history.
            for a in before {
                self.store.replace(a);
            }
            return Vec::new();
        }
        self.record(description, actions)
    }

    fn record(&mut self, description: impl Into<String>, actions: Vec<Action>) -> Vec<Effect> {
        if actions.is_empty() {
            return Vec::new();
        }
        let description = description.into();
        debug!(%description, actions = actions.len(), "gesture committed");
        self.history.push(description, actions);
        vec![Effect::RenderNeeded, self.history_changed()]
    }

    fn history_changed(&self) -> Effect {
        Effect::HistoryChanged { can_undo: self.history.can_undo(), can_redo: self.history.can_redo() }
    }

    fn selection_changed(&self, before: &[AnnotationId]) -> Vec<Effect> {
        let now = self.store.selected_ids();
        if now == before {
            return Vec::new();
        }
        vec![Effect::SelectionChanged(now.to_vec())]
    }

    fn set_cursor(&mut self, cursor: &str) -> Vec<Effect> {
        if self.cursor == cursor {
            return Vec::new();
        }
        cursor.clone_into(&mut self.cursor);
        vec![Effect::SetCursor(cursor.to_owned())]
    }
}

/// "1 annotation", "3 annotations".
fn count_label(n: usize) -> String {
    if n == 1 { "1 annotation".to_owned() } else { format!("{n} annotations") }
}
