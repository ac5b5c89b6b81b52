//! Editor configuration.
//!
//! Defaults come from [`crate::consts`]; each knob can be overridden from an
//! `ANNOTATOR_*` environment variable. Unparseable values fall back to the
//! default, then [`EditorConfig::validate`] rejects values that parse but make
//! no sense.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    CLONE_OFFSET, DEFAULT_HISTORY_SIZE, DRAG_THRESHOLD_PX, HANDLE_RADIUS_PX, TEXT_DEFAULT_HEIGHT, TEXT_DEFAULT_WIDTH,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall { field: &'static str, min: f64, value: f64 },
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

/// Tunables for one [`crate::engine::Editor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// History entries retained before eviction.
    pub history_size: usize,
    /// Screen pixels the pointer travels before a draw gesture creates anything.
    pub drag_threshold_px: f64,
    /// Page-space offset for duplicates.
    pub clone_offset: f64,
    /// Size of a text box placed with a single press.
    pub text_width: f64,
    pub text_height: f64,
    /// Screen-pixel tolerance for handles and thin strokes.
    pub hit_slop_px: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            drag_threshold_px: DRAG_THRESHOLD_PX,
            clone_offset: CLONE_OFFSET,
            text_width: TEXT_DEFAULT_WIDTH,
            text_height: TEXT_DEFAULT_HEIGHT,
            hit_slop_px: HANDLE_RADIUS_PX,
        }
    }
}

impl EditorConfig {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(v) => Some(v),
            Err(_) => None,
        })
    }

    /// Read overrides through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            history_size: lookup_parse(&lookup, "ANNOTATOR_HISTORY_SIZE", d.history_size),
            drag_threshold_px: lookup_parse(&lookup, "ANNOTATOR_DRAG_THRESHOLD_PX", d.drag_threshold_px),
            clone_offset: lookup_parse(&lookup, "ANNOTATOR_CLONE_OFFSET", d.clone_offset),
            text_width: lookup_parse(&lookup, "ANNOTATOR_TEXT_WIDTH", d.text_width),
            text_height: lookup_parse(&lookup, "ANNOTATOR_TEXT_HEIGHT", d.text_height),
            hit_slop_px: lookup_parse(&lookup, "ANNOTATOR_HIT_SLOP_PX", d.hit_slop_px),
        }
    }

    /// Check every field is usable.
    ///
    /// # Errors
    ///
    /// Returns the first field that is non-finite or below its minimum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        #[allow(clippy::cast_precision_loss)]
        let history_size = self.history_size as f64;
        check_min("history_size", history_size, 1.0)?;
        check_min("drag_threshold_px", self.drag_threshold_px, 0.0)?;
        check_finite("clone_offset", self.clone_offset)?;
        check_min("text_width", self.text_width, 1.0)?;
        check_min("text_height", self.text_height, 1.0)?;
        check_min("hit_slop_px", self.hit_slop_px, 0.0)?;
        Ok(())
    }
}

fn lookup_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match lookup(key).map(|v| v.trim().parse::<T>()) {
        Some(Ok(v)) => v,
        _ => default,
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() { Ok(()) } else { Err(ConfigError::NotFinite { field, value }) }
}

fn check_min(field: &'static str, value: f64, min: f64) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value < min {
        return Err(ConfigError::TooSmall { field, min, value });
    }
    Ok(())
}
