//! Configuration types for diagram models.
//!
//! All types implement [`serde::Deserialize`] so a diagram can be configured
//! from TOML. Every field is optional in the source; omitted fields take the
//! defaults documented on each accessor.
//!
//! # Overview
//!
//! - [`DiagramConfig`] - Canvas, zoom and link policy of a diagram.
//! - [`KeyBindings`] - Keyboard shortcuts understood by the editor.
//! - [`DeleteBinding`] - The key codes and modifiers that delete the selection.
//!
//! # Example
//!
//! ```
//! # use weft::config::DiagramConfig;
//! let config = DiagramConfig::from_toml_str(
//!     r#"
//!     zoom = 1.5
//!     allow_loose_links = false
//!
//!     [key_bindings.delete]
//!     key_codes = [46]
//!     modifiers = { ctrl = true }
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.zoom(), 1.5);
//! assert!(!config.allow_loose_links());
//! assert_eq!(config.grid_size(), 20.0);
//! ```

use serde::Deserialize;

use crate::error::ModelError;

/// Canvas and policy configuration of a [`DiagramModel`](crate::DiagramModel).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    offset_x: f32,
    offset_y: f32,
    zoom: f32,
    max_zoom_out: f32,
    max_zoom_in: f32,
    grid_size: f32,
    allow_canvas_zoom: bool,
    allow_canvas_translation: bool,
    inverse_zoom: bool,
    allow_loose_links: bool,
    port_magnetic_radius: f32,
    key_bindings: KeyBindings,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
            max_zoom_out: 0.1,
            max_zoom_in: 3.0,
            grid_size: 20.0,
            allow_canvas_zoom: true,
            allow_canvas_translation: true,
            inverse_zoom: false,
            allow_loose_links: true,
            port_magnetic_radius: 100.0,
            key_bindings: KeyBindings::default(),
        }
    }
}

impl DiagramConfig {
    /// Parses a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the source is not valid TOML or a
    /// field has the wrong type.
    pub fn from_toml_str(source: &str) -> Result<Self, ModelError> {
        toml::from_str(source).map_err(|err| ModelError::Config(err.to_string()))
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_zoom_limits(mut self, max_zoom_out: f32, max_zoom_in: f32) -> Self {
        self.max_zoom_out = max_zoom_out;
        self.max_zoom_in = max_zoom_in;
        self
    }

    pub fn with_grid_size(mut self, grid_size: f32) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_allow_canvas_zoom(mut self, allow: bool) -> Self {
        self.allow_canvas_zoom = allow;
        self
    }

    pub fn with_allow_canvas_translation(mut self, allow: bool) -> Self {
        self.allow_canvas_translation = allow;
        self
    }

    pub fn with_allow_loose_links(mut self, allow: bool) -> Self {
        self.allow_loose_links = allow;
        self
    }

    /// Initial horizontal canvas offset. Default `0`.
    pub fn offset_x(&self) -> f32 {
        self.offset_x
    }

    /// Initial vertical canvas offset. Default `0`.
    pub fn offset_y(&self) -> f32 {
        self.offset_y
    }

    /// Initial zoom factor. Default `1`.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Smallest zoom factor. Default `0.1`.
    pub fn max_zoom_out(&self) -> f32 {
        self.max_zoom_out
    }

    /// Largest zoom factor. Default `3`.
    pub fn max_zoom_in(&self) -> f32 {
        self.max_zoom_in
    }

    /// Clamps `zoom` into the configured range.
    ///
    /// An inverted range (`max_zoom_out > max_zoom_in`) is treated as if its
    /// bounds were swapped.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        let low = self.max_zoom_out.min(self.max_zoom_in);
        let high = self.max_zoom_out.max(self.max_zoom_in);
        zoom.clamp(low, high)
    }

    /// Grid step, also used as the offset of duplicated nodes. Default `20`.
    pub fn grid_size(&self) -> f32 {
        self.grid_size
    }

    /// Default `true`.
    pub fn allow_canvas_zoom(&self) -> bool {
        self.allow_canvas_zoom
    }

    /// Default `true`.
    pub fn allow_canvas_translation(&self) -> bool {
        self.allow_canvas_translation
    }

    /// Whether wheel direction is inverted when zooming. Default `false`.
    pub fn inverse_zoom(&self) -> bool {
        self.inverse_zoom
    }

    /// Whether links may exist with a missing end. Default `true`.
    ///
    /// When `false`, removing a node also removes the links it leaves
    /// dangling.
    pub fn allow_loose_links(&self) -> bool {
        self.allow_loose_links
    }

    /// Distance within which a magnetic port captures a dragged link end.
    /// Default `100`.
    pub fn port_magnetic_radius(&self) -> f32 {
        self.port_magnetic_radius
    }

    pub fn key_bindings(&self) -> &KeyBindings {
        &self.key_bindings
    }
}

/// Keyboard shortcuts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeyBindings {
    #[serde(default)]
    delete: DeleteBinding,
}

impl KeyBindings {
    pub fn delete(&self) -> &DeleteBinding {
        &self.delete
    }
}

/// Shortcut that deletes the current selection.
///
/// Defaults to Backspace (8) and Delete (46) without modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeleteBinding {
    key_codes: Vec<u32>,
    modifiers: Modifiers,
}

impl Default for DeleteBinding {
    fn default() -> Self {
        Self {
            key_codes: vec![8, 46],
            modifiers: Modifiers::default(),
        }
    }
}

impl DeleteBinding {
    pub fn key_codes(&self) -> &[u32] {
        &self.key_codes
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Returns `true` if a key press with `key_code` and exactly `modifiers`
    /// held triggers deletion.
    pub fn matches(&self, key_code: u32, modifiers: Modifiers) -> bool {
        self.key_codes.contains(&key_code) && self.modifiers == modifiers
    }
}

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    ctrl: bool,
    shift: bool,
    alt: bool,
    meta: bool,
}

impl Modifiers {
    pub fn new(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        Self {
            ctrl,
            shift,
            alt,
            meta,
        }
    }

    pub fn ctrl(self) -> bool {
        self.ctrl
    }

    pub fn shift(self) -> bool {
        self.shift
    }

    pub fn alt(self) -> bool {
        self.alt
    }

    pub fn meta(self) -> bool {
        self.meta
    }
}
