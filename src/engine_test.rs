#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use super::*;
use crate::history::ActionKind;
use crate::input::{Button, InputState, Key, Modifiers, Tool};
use crate::model::Shape;

// =============================================================
// Helpers
// =============================================================

fn page_info() -> PageInfo {
    PageInfo::new(Uuid::from_u128(1), 1000.0, 1000.0)
}

fn editor() -> Editor {
    Editor::new(page_info(), EditorConfig::default())
}

fn no_modifiers() -> Modifiers {
    Modifiers::default()
}

fn shift_modifier() -> Modifiers {
    Modifiers { shift: true, ..Default::default() }
}

fn ctrl_modifier() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

fn ctrl_shift_modifier() -> Modifiers {
    Modifiers { ctrl: true, shift: true, ..Default::default() }
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn key(name: &str) -> Key {
    Key(name.to_owned())
}

fn press(ed: &mut Editor, x: f64, y: f64, modifiers: Modifiers) -> Vec<Effect> {
    ed.on_pointer_down(pt(x, y), Button::Primary, modifiers)
}

fn release(ed: &mut Editor, x: f64, y: f64, modifiers: Modifiers) -> Vec<Effect> {
    ed.on_pointer_up(pt(x, y), Button::Primary, modifiers)
}

/// Press at `from`, move through the midpoint to `to`, release at `to`.
fn drag(ed: &mut Editor, from: (f64, f64), to: (f64, f64)) -> Vec<Effect> {
    press(ed, from.0, from.1, no_modifiers());
    ed.on_pointer_move(pt((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0), no_modifiers());
    ed.on_pointer_move(pt(to.0, to.1), no_modifiers());
    release(ed, to.0, to.1, no_modifiers())
}

fn draw(ed: &mut Editor, tool: Tool, from: (f64, f64), to: (f64, f64)) -> AnnotationId {
    ed.set_tool(tool);
    drag(ed, from, to);
    ed.selected_ids()[0]
}

fn rect_at(x: f64, y: f64, w: f64, h: f64) -> Annotation {
    Annotation::new(page_info().id, BBox::new(x, y, w, h), Shape::Rectangle)
}

fn insert(ed: &mut Editor, a: Annotation) -> AnnotationId {
    let id = a.id;
    ed.insert_annotation(a);
    id
}

fn bbox(ed: &Editor, id: &AnnotationId) -> BBox {
    ed.annotation(id).unwrap().bbox
}

fn last_entry(ed: &Editor) -> &crate::history::HistoryEntry {
    ed.history().entries().last().unwrap()
}

// =============================================================
// Draw-to-create
// =============================================================

#[test]
fn rectangle_drag_records_one_add() {
    let mut ed = editor();
    ed.set_tool(Tool::Rectangle);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    ed.on_pointer_move(pt(110.0, 60.0), no_modifiers());
    let effects = release(&mut ed, 110.0, 60.0, no_modifiers());

    assert_eq!(ed.store().len(), 1);
    let a = &ed.store().annotations()[0];
    assert_eq!(a.kind(), AnnotationKind::Rectangle);
    assert_eq!(a.bbox, BBox::new(10.0, 10.0, 100.0, 50.0));

    assert_eq!(ed.history().len(), 1);
    let entry = last_entry(&ed);
    assert_eq!(entry.actions.len(), 1);
    assert_eq!(entry.actions[0].kind, ActionKind::Add);
    assert_eq!(entry.description, "Add rectangle");

    assert_eq!(ed.tool(), Tool::Select);
    assert_eq!(ed.selected_ids(), &[a.id]);
    assert!(effects.contains(&Effect::ToolChanged(Tool::Select)));
    assert!(effects.contains(&Effect::HistoryChanged { can_undo: true, can_redo: false }));
    assert!(ed.input().is_idle());
}

#[test]
fn rectangle_undo_redo_round_trip() {
    let mut ed = editor();
    let id = draw(&mut ed, Tool::Rectangle, (10.0, 10.0), (110.0, 60.0));
    let created = ed.annotation(&id).unwrap().clone();

    let effects = ed.undo();
    assert!(ed.store().is_empty());
    assert!(ed.selected_ids().is_empty());
    assert!(effects.contains(&Effect::SelectionChanged(Vec::new())));
    assert!(ed.can_redo());

    ed.redo();
    assert_eq!(ed.store().annotations(), &[created]);
    assert!(ed.can_undo());
    assert!(!ed.can_redo());
}

#[test]
fn movement_below_threshold_creates_nothing() {
    let mut ed = editor();
    ed.set_tool(Tool::Rectangle);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    ed.on_pointer_move(pt(13.0, 13.0), no_modifiers());
    assert!(matches!(ed.input(), InputState::PendingDraw { .. }));
    release(&mut ed, 13.0, 13.0, no_modifiers());

    assert!(ed.store().is_empty());
    assert!(ed.history().is_empty());
    assert_eq!(ed.tool(), Tool::Rectangle);
}

#[test]
fn release_without_moves_still_draws() {
    let mut ed = editor();
    ed.set_tool(Tool::Ellipse);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    release(&mut ed, 60.0, 40.0, no_modifiers());
    assert_eq!(ed.store().annotations()[0].bbox, BBox::new(10.0, 10.0, 50.0, 30.0));
}

#[test]
fn threshold_is_measured_in_screen_pixels() {
    let mut ed = editor();
    ed.camera.zoom = 0.1;
    ed.set_tool(Tool::Rectangle);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    ed.on_pointer_move(pt(14.0, 10.0), no_modifiers());
    assert!(matches!(ed.input(), InputState::PendingDraw { .. }));
    ed.on_pointer_move(pt(20.0, 20.0), no_modifiers());
    assert!(matches!(ed.input(), InputState::Drawing { .. }));
}

#[test]
fn press_outside_page_is_ignored_for_drawing_tools() {
    let mut ed = editor();
    ed.set_tool(Tool::Rectangle);
    press(&mut ed, -5.0, 10.0, no_modifiers());
    assert!(ed.input().is_idle());
    release(&mut ed, 50.0, 50.0, no_modifiers());
    assert!(ed.store().is_empty());
}

#[test]
fn text_creates_on_press() {
    let mut ed = editor();
    ed.set_tool(Tool::Text);
    let effects = press(&mut ed, 30.0, 40.0, no_modifiers());

    let a = ed.store().annotations()[0].clone();
    assert_eq!(a.bbox, BBox::new(30.0, 40.0, 200.0, 40.0));
    assert!(effects.contains(&Effect::EditTextRequested { id: a.id }));
    assert!(ed.is_text_editing());
    assert_eq!(ed.history().len(), 1);
    assert_eq!(ed.tool(), Tool::Select);
    release(&mut ed, 30.0, 40.0, no_modifiers());
    assert_eq!(ed.history().len(), 1);
}

#[test]
fn text_editing_blocks_delete_and_set_text_commits() {
    let mut ed = editor();
    ed.set_tool(Tool::Text);
    press(&mut ed, 30.0, 40.0, no_modifiers());
    release(&mut ed, 30.0, 40.0, no_modifiers());
    let id = ed.selected_ids()[0];

    ed.on_key_down(&key("Backspace"), no_modifiers());
    assert_eq!(ed.store().len(), 1);

    ed.set_text(&id, "hello".into());
    assert!(!ed.is_text_editing());
    assert_eq!(ed.annotation(&id).unwrap().shape, Shape::Text { content: "hello".into() });
    assert_eq!(last_entry(&ed).description, "Edit text");

    ed.undo();
    assert_eq!(ed.annotation(&id).unwrap().shape, Shape::Text { content: String::new() });
}

#[test]
fn arrow_end_follows_pointer() {
    let mut ed = editor();
    ed.set_tool(Tool::Arrow);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    ed.on_pointer_move(pt(50.0, 60.0), no_modifiers());
    ed.on_pointer_move(pt(80.0, 30.0), no_modifiers());
    release(&mut ed, 80.0, 30.0, no_modifiers());

    let a = &ed.store().annotations()[0];
    assert_eq!(a.shape, Shape::Arrow { start: pt(10.0, 10.0), end: pt(80.0, 30.0) });
    assert_eq!(a.bbox, BBox::new(10.0, 10.0, 70.0, 20.0));
}

#[test]
fn freehand_appends_points() {
    let mut ed = editor();
    ed.set_tool(Tool::Freehand);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    for (x, y) in [(20.0, 10.0), (30.0, 20.0), (40.0, 15.0)] {
        ed.on_pointer_move(pt(x, y), no_modifiers());
    }
    release(&mut ed, 40.0, 15.0, no_modifiers());

    let a = &ed.store().annotations()[0];
    let Shape::Freehand { path } = &a.shape else { panic!("expected freehand") };
    assert_eq!(path, &vec![pt(10.0, 10.0), pt(20.0, 10.0), pt(30.0, 20.0), pt(40.0, 15.0)]);
    assert_eq!(a.bbox, BBox::new(10.0, 10.0, 30.0, 10.0));
}

#[test]
fn degenerate_drawing_is_discarded() {
    let mut ed = editor();
    ed.set_tool(Tool::Rectangle);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    ed.on_pointer_move(pt(30.0, 30.0), no_modifiers());
    assert_eq!(ed.store().len(), 1);
    ed.on_pointer_move(pt(10.2, 10.2), no_modifiers());
    release(&mut ed, 10.2, 10.2, no_modifiers());

    assert!(ed.store().is_empty());
    assert!(ed.history().is_empty());
}

#[test]
fn tool_style_applies_to_new_annotations() {
    let mut ed = editor();
    ed.set_tool_style(Tool::Rectangle, Style { stroke_color: Some("#00AA00".into()), ..Style::default() });
    let id = draw(&mut ed, Tool::Rectangle, (10.0, 10.0), (60.0, 60.0));
    assert_eq!(ed.annotation(&id).unwrap().style.stroke_color.as_deref(), Some("#00AA00"));
}

#[test]
fn custom_tool_draws_through_registry() {
    fn callout(r: &DrawRequest) -> Option<Annotation> {
        let bbox = BBox::from_corners(r.start, r.current);
        Some(Annotation::new(r.page_id, bbox, Shape::Stamp { label: "NOTE".into() }))
    }
    let mut ed = editor();
    ed.factory_mut().register("callout", callout);
    let id = draw(&mut ed, Tool::Custom("callout"), (10.0, 10.0), (60.0, 40.0));
    let a = ed.annotation(&id).unwrap();
    assert_eq!(a.shape, Shape::Stamp { label: "NOTE".into() });
    assert_eq!(a.bbox, BBox::new(10.0, 10.0, 50.0, 30.0));
}

// =============================================================
// Selection
// =============================================================

#[test]
fn click_selects_and_empty_click_clears() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    ed.clear_selection();

    let effects = press(&mut ed, 120.0, 120.0, no_modifiers());
    release(&mut ed, 120.0, 120.0, no_modifiers());
    assert_eq!(ed.selected_ids(), &[a]);
    assert!(effects.contains(&Effect::SelectionChanged(vec![a])));

    press(&mut ed, 500.0, 500.0, no_modifiers());
    release(&mut ed, 500.0, 500.0, no_modifiers());
    assert!(ed.selected_ids().is_empty());
}

#[test]
fn shift_click_toggles_membership() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    let b = insert(&mut ed, rect_at(300.0, 100.0, 50.0, 50.0));

    press(&mut ed, 120.0, 120.0, no_modifiers());
    release(&mut ed, 120.0, 120.0, no_modifiers());
    press(&mut ed, 320.0, 120.0, shift_modifier());
    release(&mut ed, 320.0, 120.0, shift_modifier());
    assert_eq!(ed.selected_ids(), &[a, b]);

    press(&mut ed, 120.0, 120.0, shift_modifier());
    release(&mut ed, 120.0, 120.0, shift_modifier());
    assert_eq!(ed.selected_ids(), &[b]);
}

#[test]
fn group_then_select_one_expands_to_both() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    let b = insert(&mut ed, rect_at(300.0, 100.0, 50.0, 50.0));
    ed.select_all();
    ed.group_selected();
    ed.clear_selection();

    press(&mut ed, 320.0, 120.0, no_modifiers());
    release(&mut ed, 320.0, 120.0, no_modifiers());
    assert_eq!(ed.selected_ids(), &[a, b]);
}

#[test]
fn marquee_selects_intersecting() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(10.0, 10.0, 20.0, 20.0));
    let b = insert(&mut ed, rect_at(100.0, 100.0, 20.0, 20.0));
    insert(&mut ed, rect_at(400.0, 400.0, 20.0, 20.0));
    ed.clear_selection();

    press(&mut ed, 0.0, 0.0, no_modifiers());
    assert!(matches!(ed.input(), InputState::Selecting { .. }));
    ed.on_pointer_move(pt(150.0, 150.0), no_modifiers());
    release(&mut ed, 150.0, 150.0, no_modifiers());
    assert_eq!(ed.selected_ids(), &[a, b]);
}

#[test]
fn non_primary_button_is_ignored() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    ed.clear_selection();
    assert!(ed.on_pointer_down(pt(120.0, 120.0), Button::Secondary, no_modifiers()).is_empty());
    assert!(ed.selected_ids().is_empty());
    assert!(ed.input().is_idle());
}

#[test]
fn hover_sets_cursor_once() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    ed.clear_selection();
    assert_eq!(ed.on_pointer_move(pt(120.0, 120.0), no_modifiers()), vec![Effect::SetCursor("move".into())]);
    assert!(ed.on_pointer_move(pt(121.0, 121.0), no_modifiers()).is_empty());
    assert_eq!(ed.on_pointer_move(pt(500.0, 500.0), no_modifiers()), vec![Effect::SetCursor("default".into())]);
}

// =============================================================
// Drag-to-move
// =============================================================

#[test]
fn drag_moves_and_records_one_update() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    drag(&mut ed, (120.0, 120.0), (140.0, 140.0));

    assert_eq!(bbox(&ed, &a), BBox::new(120.0, 120.0, 50.0, 50.0));
    assert_eq!(ed.history().len(), 2);
    let entry = last_entry(&ed);
    assert_eq!(entry.description, "Move 1 annotation");
    assert_eq!(entry.actions.len(), 1);
    assert_eq!(entry.actions[0].kind, ActionKind::Update);

    ed.undo();
    assert_eq!(bbox(&ed, &a), BBox::new(100.0, 100.0, 50.0, 50.0));
}

#[test]
fn click_without_movement_records_nothing() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    press(&mut ed, 120.0, 120.0, no_modifiers());
    release(&mut ed, 120.0, 120.0, no_modifiers());
    assert_eq!(ed.history().len(), 1);
}

#[test]
fn drag_back_to_start_records_nothing() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    press(&mut ed, 120.0, 120.0, no_modifiers());
    ed.on_pointer_move(pt(140.0, 140.0), no_modifiers());
    ed.on_pointer_move(pt(120.0, 120.0), no_modifiers());
    release(&mut ed, 120.0, 120.0, no_modifiers());
    assert_eq!(ed.history().len(), 1);
}

#[test]
fn axis_lock_zeroes_smaller_component() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    press(&mut ed, 120.0, 120.0, no_modifiers());
    ed.on_pointer_move(pt(130.0, 125.0), shift_modifier());
    release(&mut ed, 130.0, 125.0, shift_modifier());
    assert_eq!(bbox(&ed, &a), BBox::new(110.0, 100.0, 50.0, 50.0));
}

#[test]
fn group_move_preserves_relative_geometry() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    let start = pt(300.0, 300.0);
    let end = pt(360.0, 340.0);
    let line = Annotation::new(page_info().id, BBox::from_corners(start, end), Shape::Line { start, end });
    let b = insert(&mut ed, line);
    ed.select_all();
    ed.group_selected();
    ed.clear_selection();

    drag(&mut ed, (120.0, 120.0), (135.0, 115.0));

    assert_eq!(bbox(&ed, &a), BBox::new(115.0, 95.0, 50.0, 50.0));
    assert_eq!(bbox(&ed, &b), BBox::new(315.0, 295.0, 60.0, 40.0));
    assert_eq!(ed.annotation(&b).unwrap().shape, Shape::Line { start: pt(315.0, 295.0), end: pt(375.0, 335.0) });
    let entry = last_entry(&ed);
    assert_eq!(entry.description, "Move 2 annotations");
    assert_eq!(entry.actions.len(), 2);
}

#[test]
fn pointer_leave_ends_drag_and_records_it() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    press(&mut ed, 120.0, 120.0, no_modifiers());
    ed.on_pointer_move(pt(150.0, 120.0), no_modifiers());
    ed.on_pointer_leave();

    assert!(ed.input().is_idle());
    assert_eq!(bbox(&ed, &a).x, 130.0);
    assert_eq!(ed.history().len(), 2);
}

#[test]
fn escape_during_drag_restores_snapshot() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    press(&mut ed, 120.0, 120.0, no_modifiers());
    ed.on_pointer_move(pt(150.0, 160.0), no_modifiers());
    ed.on_key_down(&key("Escape"), no_modifiers());

    assert!(ed.input().is_idle());
    assert_eq!(bbox(&ed, &a), BBox::new(100.0, 100.0, 50.0, 50.0));
    assert_eq!(ed.history().len(), 1);
}

// =============================================================
// Resize
// =============================================================

#[test]
fn handle_drag_resizes() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 100.0, 100.0));
    let effects = press(&mut ed, 200.0, 200.0, no_modifiers());
    assert!(matches!(ed.input(), InputState::Resizing { .. }));
    assert!(effects.contains(&Effect::SetCursor("nwse-resize".into())));

    ed.on_pointer_move(pt(250.0, 220.0), no_modifiers());
    release(&mut ed, 250.0, 220.0, no_modifiers());
    assert_eq!(bbox(&ed, &a), BBox::new(100.0, 100.0, 150.0, 120.0));
    assert_eq!(last_entry(&ed).description, "Resize rectangle");

    ed.undo();
    assert_eq!(bbox(&ed, &a), BBox::new(100.0, 100.0, 100.0, 100.0));
}

#[test]
fn handle_drag_scales_line_endpoints() {
    let mut ed = editor();
    let start = pt(100.0, 100.0);
    let end = pt(200.0, 200.0);
    let line = Annotation::new(page_info().id, BBox::from_corners(start, end), Shape::Line { start, end });
    let id = insert(&mut ed, line);

    press(&mut ed, 200.0, 200.0, no_modifiers());
    ed.on_pointer_move(pt(300.0, 300.0), no_modifiers());
    release(&mut ed, 300.0, 300.0, no_modifiers());

    assert_eq!(ed.annotation(&id).unwrap().shape, Shape::Line { start, end: pt(300.0, 300.0) });
}

#[test]
fn resize_annotation_sets_dimensions_only() {
    let mut ed = editor();
    let start = pt(0.0, 0.0);
    let end = pt(10.0, 10.0);
    let line = Annotation::new(page_info().id, BBox::from_corners(start, end), Shape::Line { start, end });
    let id = insert(&mut ed, line);
    ed.resize_annotation(&id, 40.0, 20.0);
    let a = ed.annotation(&id).unwrap();
    assert_eq!(a.bbox, BBox::new(0.0, 0.0, 40.0, 20.0));
    assert_eq!(a.shape, Shape::Line { start, end });
    assert_eq!(last_entry(&ed).description, "Resize line");
}

// =============================================================
// Deletion
// =============================================================

#[test]
fn delete_two_records_one_entry_and_undo_restores_style() {
    let mut ed = editor();
    let mut styled = rect_at(100.0, 100.0, 50.0, 50.0);
    styled.style.stroke_color = Some("#123456".into());
    let a = insert(&mut ed, styled.clone());
    let b = insert(&mut ed, rect_at(300.0, 100.0, 50.0, 50.0));
    ed.select_all();

    ed.on_key_down(&key("Delete"), no_modifiers());
    assert!(ed.store().is_empty());
    assert!(ed.selected_ids().is_empty());
    let entry = last_entry(&ed);
    assert_eq!(entry.description, "Delete 2 annotations");
    assert_eq!(entry.actions.len(), 2);
    assert!(entry.actions.iter().all(|a| a.kind == ActionKind::Remove));

    ed.undo();
    let ids: Vec<_> = ed.store().annotations().iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![a, b]);
    assert_eq!(ed.annotation(&a).unwrap().style.stroke_color.as_deref(), Some("#123456"));

    ed.redo();
    assert!(ed.store().is_empty());
}

#[test]
fn delete_with_empty_selection_is_noop() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    ed.clear_selection();
    assert!(ed.on_key_down(&key("Delete"), no_modifiers()).is_empty());
    assert_eq!(ed.history().len(), 1);
}

// =============================================================
// Keyboard shortcuts
// =============================================================

#[test]
fn ctrl_z_and_redo_shortcuts() {
    let mut ed = editor();
    draw(&mut ed, Tool::Rectangle, (10.0, 10.0), (110.0, 60.0));
    ed.on_key_down(&key("z"), ctrl_modifier());
    assert!(ed.store().is_empty());
    ed.on_key_down(&key("Z"), ctrl_shift_modifier());
    assert_eq!(ed.store().len(), 1);
    ed.on_key_down(&key("z"), ctrl_modifier());
    ed.on_key_down(&key("y"), ctrl_modifier());
    assert_eq!(ed.store().len(), 1);
}

#[test]
fn plain_z_does_nothing() {
    let mut ed = editor();
    draw(&mut ed, Tool::Rectangle, (10.0, 10.0), (110.0, 60.0));
    assert!(ed.on_key_down(&key("z"), no_modifiers()).is_empty());
    assert_eq!(ed.store().len(), 1);
}

#[test]
fn ctrl_d_duplicates_and_selects_copy() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    ed.on_key_down(&key("d"), ctrl_modifier());

    assert_eq!(ed.store().len(), 2);
    let copy = ed.selected_ids()[0];
    assert_ne!(copy, a);
    assert_eq!(bbox(&ed, &copy), BBox::new(110.0, 110.0, 50.0, 50.0));
    assert_eq!(last_entry(&ed).description, "Duplicate 1 annotation");

    ed.undo();
    assert_eq!(ed.store().len(), 1);
    assert!(ed.selected_ids().is_empty());
}

#[test]
fn ctrl_g_groups_and_ctrl_shift_g_ungroups() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    insert(&mut ed, rect_at(300.0, 100.0, 50.0, 50.0));
    ed.on_key_down(&key("a"), ctrl_modifier());
    assert_eq!(ed.selected_ids().len(), 2);

    ed.on_key_down(&key("g"), ctrl_modifier());
    let g = ed.store().annotations()[0].group_id;
    assert!(g.is_some());
    assert!(ed.store().annotations().iter().all(|a| a.group_id == g));

    ed.on_key_down(&key("G"), ctrl_shift_modifier());
    assert!(ed.store().annotations().iter().all(|a| a.group_id.is_none()));

    ed.undo();
    assert!(ed.store().annotations().iter().all(|a| a.group_id == g));
}

#[test]
fn group_needs_two_selected() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    assert!(ed.group_selected().is_empty());
    assert_eq!(ed.history().len(), 1);
}

#[test]
fn escape_when_idle_clears_selection_and_tool() {
    let mut ed = editor();
    insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    ed.set_tool(Tool::Line);
    let effects = ed.on_key_down(&key("Escape"), no_modifiers());
    assert!(ed.selected_ids().is_empty());
    assert_eq!(ed.tool(), Tool::Select);
    assert!(effects.contains(&Effect::ToolChanged(Tool::Select)));
}

#[test]
fn escape_during_drawing_discards_it() {
    let mut ed = editor();
    ed.set_tool(Tool::Rectangle);
    press(&mut ed, 10.0, 10.0, no_modifiers());
    ed.on_pointer_move(pt(60.0, 60.0), no_modifiers());
    ed.on_key_down(&key("Escape"), no_modifiers());
    assert!(ed.store().is_empty());
    assert!(ed.history().is_empty());
}

// =============================================================
// Multi-object commands
// =============================================================

#[test]
fn align_left_and_center() {
    let mut ed = editor();
    let ids = [
        insert(&mut ed, rect_at(30.0, 0.0, 10.0, 10.0)),
        insert(&mut ed, rect_at(10.0, 20.0, 50.0, 10.0)),
        insert(&mut ed, rect_at(70.0, 40.0, 25.0, 10.0)),
    ];
    ed.select_all();

    ed.align_selected(AlignEdge::Left);
    assert!(ids.iter().all(|id| bbox(&ed, id).x == 10.0));
    assert_eq!(last_entry(&ed).description, "align left");

    ed.undo();
    assert_eq!(bbox(&ed, &ids[0]).x, 30.0);
    assert_eq!(bbox(&ed, &ids[2]).x, 70.0);

    ed.align_selected(AlignEdge::Center);
    for id in &ids {
        assert!((bbox(&ed, id).center_x() - 52.5).abs() < 1e-9);
    }
}

#[test]
fn distribute_records_interior_moves_only() {
    let mut ed = editor();
    insert(&mut ed, rect_at(0.0, 0.0, 10.0, 10.0));
    let mid = insert(&mut ed, rect_at(15.0, 0.0, 10.0, 10.0));
    insert(&mut ed, rect_at(100.0, 0.0, 10.0, 10.0));
    ed.select_all();

    ed.distribute_selected(Axis::Horizontal);
    assert_eq!(bbox(&ed, &mid).x, 50.0);
    let entry = last_entry(&ed);
    assert_eq!(entry.actions.len(), 1);
    assert_eq!(entry.actions[0].annotation_id, mid);
}

#[test]
fn reorder_to_front_and_undo() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(0.0, 0.0, 10.0, 10.0));
    let b = insert(&mut ed, rect_at(20.0, 0.0, 10.0, 10.0));
    let c = insert(&mut ed, rect_at(40.0, 0.0, 10.0, 10.0));
    let order = |ed: &Editor| ed.store().annotations().iter().map(|x| x.id).collect::<Vec<_>>();

    ed.store.select_many(&[a, b]);
    ed.reorder_selected(LayerMove::ToFront);
    assert_eq!(order(&ed), vec![c, a, b]);

    ed.undo();
    assert_eq!(order(&ed), vec![a, b, c]);
    ed.redo();
    assert_eq!(order(&ed), vec![c, a, b]);

    ed.reorder_selected(LayerMove::ToBack);
    assert_eq!(order(&ed), vec![a, b, c]);
}

#[test]
fn reorder_forward_and_backward() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(0.0, 0.0, 10.0, 10.0));
    let b = insert(&mut ed, rect_at(20.0, 0.0, 10.0, 10.0));
    let order = |ed: &Editor| ed.store().annotations().iter().map(|x| x.id).collect::<Vec<_>>();

    ed.store.select_many(&[a]);
    ed.reorder_selected(LayerMove::Forward);
    assert_eq!(order(&ed), vec![b, a]);
    ed.reorder_selected(LayerMove::Backward);
    assert_eq!(order(&ed), vec![a, b]);
    let before = ed.history().len();
    assert!(ed.reorder_selected(LayerMove::Backward).is_empty());
    assert_eq!(ed.history().len(), before);
}

#[test]
fn update_style_merges_and_undoes() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(0.0, 0.0, 10.0, 10.0));
    ed.update_style(Style { fill_color: Some("#FF0000".into()), ..Style::default() });
    assert_eq!(ed.annotation(&a).unwrap().style.fill_color.as_deref(), Some("#FF0000"));
    ed.undo();
    assert!(ed.annotation(&a).unwrap().style.fill_color.is_none());
}

#[test]
fn insert_rejects_invalid_annotation() {
    let mut ed = editor();
    let bad = rect_at(0.0, 0.0, -5.0, 10.0);
    assert!(ed.insert_annotation(bad).is_empty());
    assert!(ed.store().is_empty());
}

#[test]
fn insert_duplicate_id_is_ignored() {
    let mut ed = editor();
    let a = rect_at(0.0, 0.0, 10.0, 10.0);
    insert(&mut ed, a.clone());
    assert!(ed.insert_annotation(a).is_empty());
    assert_eq!(ed.history().len(), 1);
}

#[test]
fn bounded_history_from_config() {
    let config = EditorConfig { history_size: 3, ..EditorConfig::default() };
    let mut ed = Editor::new(page_info(), config);
    for i in 0..6 {
        insert(&mut ed, rect_at(f64::from(i) * 20.0, 0.0, 10.0, 10.0));
    }
    assert_eq!(ed.history().len(), 3);
    while ed.can_undo() {
        ed.undo();
    }
    assert_eq!(ed.store().len(), 3);
}

// =============================================================
// Commands during a gesture
// =============================================================

#[test]
fn delete_mid_drag_records_move_then_delete() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    press(&mut ed, 120.0, 120.0, no_modifiers());
    ed.on_pointer_move(pt(150.0, 150.0), no_modifiers());
    ed.on_key_down(&key("Delete"), no_modifiers());
    assert!(ed.input().is_idle());
    release(&mut ed, 150.0, 150.0, no_modifiers());

    let descriptions: Vec<&str> = ed.history().entries().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, ["Add rectangle", "Move 1 annotation", "Delete 1 annotation"]);
    assert!(ed.store().is_empty());

    ed.undo();
    assert_eq!(bbox(&ed, &a), BBox::new(130.0, 130.0, 50.0, 50.0));
    ed.undo();
    assert_eq!(bbox(&ed, &a), BBox::new(100.0, 100.0, 50.0, 50.0));
    assert!(ed.replay_failed().is_none());
}

#[test]
fn group_mid_drag_undoes_back_to_original_positions() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    let b = insert(&mut ed, rect_at(300.0, 100.0, 50.0, 50.0));
    ed.select_all();
    press(&mut ed, 120.0, 120.0, no_modifiers());
    ed.on_pointer_move(pt(150.0, 120.0), no_modifiers());
    ed.on_key_down(&key("g"), ctrl_modifier());
    release(&mut ed, 150.0, 120.0, no_modifiers());

    assert_eq!(bbox(&ed, &a).x, 130.0);
    assert_eq!(bbox(&ed, &b).x, 330.0);
    assert!(ed.annotation(&a).unwrap().group_id.is_some());
    assert_eq!(ed.history().len(), 4);

    ed.undo();
    assert!(ed.store().annotations().iter().all(|x| x.group_id.is_none()));
    assert_eq!(bbox(&ed, &a).x, 130.0);
    ed.undo();
    assert_eq!(bbox(&ed, &a).x, 100.0);
    assert_eq!(bbox(&ed, &b).x, 300.0);
    assert!(ed.replay_failed().is_none());
}

#[test]
fn style_change_mid_resize_lands_after_the_resize() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 100.0, 100.0));
    let original = ed.annotation(&a).unwrap().clone();
    press(&mut ed, 200.0, 200.0, no_modifiers());
    ed.on_pointer_move(pt(250.0, 220.0), no_modifiers());
    let effects = ed.update_style(Style { stroke_width: Some(4.0), ..Style::default() });
    assert!(effects.contains(&Effect::SetCursor("default".into())));
    assert!(ed.input().is_idle());
    release(&mut ed, 250.0, 220.0, no_modifiers());

    assert_eq!(last_entry(&ed).description, "Change style");
    assert_eq!(ed.history().len(), 3);
    assert_eq!(bbox(&ed, &a), BBox::new(100.0, 100.0, 150.0, 120.0));

    ed.undo();
    assert_eq!(last_entry(&ed).description, "Resize rectangle");
    ed.undo();
    assert_eq!(ed.annotation(&a), Some(&original));
    assert!(ed.replay_failed().is_none());
}

#[test]
fn duplicate_mid_drag_keeps_every_entry_undoable() {
    let mut ed = editor();
    let a = insert(&mut ed, rect_at(100.0, 100.0, 50.0, 50.0));
    press(&mut ed, 120.0, 120.0, no_modifiers());
    ed.on_pointer_move(pt(140.0, 120.0), no_modifiers());
    ed.on_key_down(&key("d"), ctrl_modifier());
    release(&mut ed, 140.0, 120.0, no_modifiers());
    assert_eq!(ed.store().len(), 2);

    while ed.can_undo() {
        ed.undo();
    }
    assert!(ed.store().is_empty());
    assert!(ed.replay_failed().is_none());

    ed.redo();
    assert_eq!(bbox(&ed, &a), BBox::new(100.0, 100.0, 50.0, 50.0));
}

// =============================================================
// Randomised round-trip
// =============================================================

fn random_center(ed: &Editor, rng: &mut StdRng) -> Option<Point> {
    let all = ed.store().annotations();
    if all.is_empty() {
        return None;
    }
    let b = all[rng.random_range(0..all.len())].bbox;
    Some(pt(b.center_x(), b.center_y()))
}

fn random_step(ed: &mut Editor, rng: &mut StdRng) {
    match rng.random_range(0..10) {
        0 | 1 => {
            let (x, y) = (rng.random_range(50.0..800.0), rng.random_range(50.0..800.0));
            let (w, h) = (rng.random_range(20.0..100.0), rng.random_range(20.0..100.0));
            insert(ed, rect_at(x, y, w, h));
        }
        2 => {
            if let Some(c) = random_center(ed, rng) {
                let multi = if rng.random_bool(0.5) { shift_modifier() } else { no_modifiers() };
                press(ed, c.x, c.y, multi);
                release(ed, c.x, c.y, multi);
            }
        }
        3 => {
            if let Some(c) = random_center(ed, rng) {
                let to = (c.x + rng.random_range(-40.0..40.0), c.y + rng.random_range(-40.0..40.0));
                drag(ed, (c.x, c.y), to);
            }
        }
        4 => {
            ed.on_key_down(&key("Delete"), no_modifiers());
        }
        5 => {
            ed.duplicate_selected();
        }
        6 => {
            let edges = [AlignEdge::Left, AlignEdge::Center, AlignEdge::Right, AlignEdge::Top, AlignEdge::Middle];
            ed.align_selected(edges[rng.random_range(0..edges.len())]);
        }
        7 => {
            if rng.random_bool(0.5) {
                ed.group_selected();
            } else {
                ed.ungroup_selected();
            }
        }
        8 => {
            let moves = [LayerMove::ToFront, LayerMove::ToBack, LayerMove::Forward, LayerMove::Backward];
            ed.reorder_selected(moves[rng.random_range(0..moves.len())]);
        }
        _ => {
            if rng.random_bool(0.5) {
                ed.distribute_selected(Axis::Vertical);
            } else {
                ed.update_style(Style { stroke_width: Some(rng.random_range(1.0..6.0)), ..Style::default() });
            }
        }
    }
}

#[test]
fn random_edit_sequences_round_trip_through_history() {
    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let config = EditorConfig { history_size: 500, ..EditorConfig::default() };
        let mut ed = Editor::new(page_info(), config);
        let mut states = vec![ed.store().annotations().to_vec()];

        for _ in 0..60 {
            let depth = ed.history().len();
            random_step(&mut ed, &mut rng);
            if ed.history().len() != depth {
                states.push(ed.store().annotations().to_vec());
            }
        }
        assert_eq!(states.len(), ed.history().len() + 1, "seed {seed}");

        let mut cursor = states.len() - 1;
        while ed.can_undo() {
            ed.undo();
            cursor -= 1;
            assert_eq!(ed.store().annotations(), states[cursor].as_slice(), "seed {seed} undo to {cursor}");
        }
        assert!(ed.replay_failed().is_none());

        while ed.can_redo() {
            ed.redo();
            cursor += 1;
            assert_eq!(ed.store().annotations(), states[cursor].as_slice(), "seed {seed} redo to {cursor}");
        }
        assert_eq!(cursor, states.len() - 1);
    }
}
