//! Gesture scripts: a JSON list of input events replayed against a fresh editor.
//!
//! Scripts drive the same [`Editor`] entry points a host would, so a recorded
//! session can be reproduced from the command line and its outcome inspected
//! as JSON.
//!
//! ```json
//! {
//!   "page": { "id": "00000000-0000-0000-0000-000000000001", "width": 612, "height": 792 },
//!   "events": [
//!     { "event": "tool", "name": "rectangle" },
//!     { "event": "down", "x": 10, "y": 10 },
//!     { "event": "move", "x": 110, "y": 60 },
//!     { "event": "up", "x": 110, "y": 60 },
//!     { "event": "key", "key": "z", "modifiers": { "ctrl": true } }
//!   ]
//! }
//! ```

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{ConfigError, EditorConfig};
use crate::engine::{Editor, Effect, LayerMove};
use crate::input::{Button, Key, Modifiers, Tool};
use crate::model::{Annotation, AnnotationId, PageInfo, Point, Style};
use crate::store::{AlignEdge, Axis};

/// US Letter in points, used when a script names no page.
const DEFAULT_PAGE_WIDTH: f64 = 612.0;
const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("invalid script JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event {index}: unknown tool `{name}`")]
    UnknownTool { index: usize, name: String },
    #[error("event {index}: no text annotation is selected")]
    NoTextTarget { index: usize },
    #[error("event {index}: camera needs finite pan and a positive zoom, got pan ({pan_x}, {pan_y}) zoom {zoom}")]
    InvalidCamera { index: usize, pan_x: f64, pan_y: f64, zoom: f64 },
    #[error("script config: {0}")]
    Config(#[from] ConfigError),
}

/// One recorded input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Tool {
        name: String,
    },
    /// Set the camera before the following pointer events.
    Camera {
        pan_x: f64,
        pan_y: f64,
        zoom: f64,
    },
    Down {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Move {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Up {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Leave,
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Commit text into the first selected annotation.
    Text {
        content: String,
    },
    Undo,
    Redo,
    Delete,
    Duplicate,
    Group,
    Ungroup,
    SelectAll,
    ClearSelection,
    Align {
        edge: AlignEdge,
    },
    Distribute {
        axis: Axis,
    },
    Layer {
        layer: LayerMove,
    },
    Style {
        style: Style,
    },
}

/// A page plus the events to replay on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default = "default_page")]
    pub page: PageInfo,
    /// Overrides the environment-derived configuration when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EditorConfig>,
    pub events: Vec<ScriptEvent>,
}

fn default_page() -> PageInfo {
    PageInfo::new(Uuid::nil(), DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)
}

/// Editor state after a script has run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptReport {
    /// Annotations in paint order.
    pub annotations: Vec<Annotation>,
    pub selection: Vec<AnnotationId>,
    pub tool: String,
    pub cursor: String,
    /// Descriptions of every retained history entry, oldest first.
    pub history: Vec<String>,
    pub undo: Option<String>,
    pub redo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Number of effects the editor emitted.
    pub effects: usize,
}

impl Script {
    pub fn parse(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replay every event against a new editor built with `config`
    /// (or the script's own config when it carries one).
    pub fn run(&self, config: EditorConfig) -> Result<ScriptReport, ScriptError> {
        let config = match &self.config {
            Some(own) => {
                own.validate()?;
                own.clone()
            }
            None => config,
        };
        let mut editor = Editor::new(self.page, config);
        let mut effects = 0;

        for (index, event) in self.events.iter().enumerate() {
            let emitted = apply(&mut editor, index, event)?;
            debug!(index, effects = emitted.len(), "script event applied");
            effects += emitted.len();
        }

        let history = editor.history();
        let report = ScriptReport {
            annotations: editor.store().annotations().to_vec(),
            selection: editor.selected_ids().to_vec(),
            tool: editor.tool().name().to_owned(),
            cursor: editor.cursor().to_owned(),
            history: history.entries().map(|e| e.description.clone()).collect(),
            undo: history.undo_description().map(str::to_owned),
            redo: history.redo_description().map(str::to_owned),
            last_error: editor.replay_failed().map(ToString::to_string),
            effects,
        };
        info!(
            events = self.events.len(),
            annotations = report.annotations.len(),
            depth = report.history.len(),
            "script finished"
        );
        Ok(report)
    }
}

fn apply(editor: &mut Editor, index: usize, event: &ScriptEvent) -> Result<Vec<Effect>, ScriptError> {
    let effects = match event {
        ScriptEvent::Tool { name } => {
            let tool = Tool::from_name(name).ok_or_else(|| ScriptError::UnknownTool { index, name: name.clone() })?;
            editor.set_tool(tool)
        }
        ScriptEvent::Camera { pan_x, pan_y, zoom } => {
            if !(pan_x.is_finite() && pan_y.is_finite() && zoom.is_finite() && *zoom > 0.0) {
                return Err(ScriptError::InvalidCamera { index, pan_x: *pan_x, pan_y: *pan_y, zoom: *zoom });
            }
            editor.camera.pan_x = *pan_x;
            editor.camera.pan_y = *pan_y;
            editor.camera.zoom = *zoom;
            Vec::new()
        }
        ScriptEvent::Down { x, y, button, modifiers } => editor.on_pointer_down(Point::new(*x, *y), *button, *modifiers),
        ScriptEvent::Move { x, y, modifiers } => editor.on_pointer_move(Point::new(*x, *y), *modifiers),
        ScriptEvent::Up { x, y, button, modifiers } => editor.on_pointer_up(Point::new(*x, *y), *button, *modifiers),
        ScriptEvent::Leave => editor.on_pointer_leave(),
        ScriptEvent::Key { key, modifiers } => editor.on_key_down(&Key(key.clone()), *modifiers),
        ScriptEvent::Text { content } => {
            let id = *editor.selected_ids().first().ok_or(ScriptError::NoTextTarget { index })?;
            editor.set_text(&id, content.clone())
        }
        ScriptEvent::Undo => editor.undo(),
        ScriptEvent::Redo => editor.redo(),
        ScriptEvent::Delete => editor.delete_selected(),
        ScriptEvent::Duplicate => editor.duplicate_selected(),
        ScriptEvent::Group => editor.group_selected(),
        ScriptEvent::Ungroup => editor.ungroup_selected(),
        ScriptEvent::SelectAll => editor.select_all(),
        ScriptEvent::ClearSelection => editor.clear_selection(),
        ScriptEvent::Align { edge } => editor.align_selected(*edge),
        ScriptEvent::Distribute { axis } => editor.distribute_selected(*axis),
        ScriptEvent::Layer { layer } => editor.reorder_selected(*layer),
        ScriptEvent::Style { style } => editor.update_style(style.clone()),
    };
    Ok(effects)
}
