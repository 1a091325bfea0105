//! Boundary to the rendering engine.
//!
//! The model never computes screen geometry itself. When a painted port
//! needs its coordinates refreshed, [`NodeModel::update_port_coords`]
//! asks a [`CanvasGeometry`] implementation for the port's rendered
//! rectangle and center.
//!
//! [`NodeModel::update_port_coords`]: crate::NodeModel::update_port_coords

use weft_core::geometry::{Coords, Rect};

use crate::model::PortModel;

/// Supplies the rendered geometry of ports.
pub trait CanvasGeometry {
    /// The rendered rectangle of `port`, or `None` if it is not on the canvas.
    fn port_rect(&self, port: &PortModel) -> Option<Rect>;

    /// The rendered center of `port` in canvas coordinates.
    fn port_center(&self, port: &PortModel) -> Option<Coords>;
}
