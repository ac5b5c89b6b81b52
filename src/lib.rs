//! Annotation editing engine for paged documents.
//!
//! The crate owns everything between raw pointer/keyboard input and the
//! annotation list of a page: a keyed store with selection and paint order,
//! an undo/redo history of invertible actions, a tool-to-annotation factory
//! with a registration seam for custom tools, and the gesture state machine
//! that ties them together. Rendering and persistence stay with the host,
//! which reacts to the [`engine::Effect`]s every handler returns.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::Editor`]: input state machine and editing commands |
//! | [`store`] | Annotation list, selection, layer order, align/distribute/group |
//! | [`history`] | Bounded undo/redo stack and the [`history::ReplayTarget`] seam |
//! | [`factory`] | Tool-to-annotation construction, validation, capabilities |
//! | [`model`] | Annotation, shape, style and geometry types |
//! | [`input`] | Tools, modifiers, keys and the gesture states |
//! | [`hit`] | Hit-testing bodies and resize handles |
//! | [`camera`] | Screen/page coordinate conversion |
//! | [`config`] | [`config::EditorConfig`] with environment overrides |
//! | [`script`] | JSON gesture scripts replayed against an editor |
//! | [`consts`] | Shared numeric defaults |

pub mod camera;
pub mod config;
pub mod consts;
pub mod engine;
pub mod factory;
pub mod hit;
pub mod history;
pub mod input;
pub mod model;
pub mod script;
pub mod store;
