//! Weft - an observable node-link diagram model.
//!
//! A diagram is a small in-memory graph: [`DiagramModel`] owns nodes and
//! links, every [`NodeModel`] owns its ports, and every [`LinkModel`] owns an
//! ordered sequence of points and an optional label. Links are anchored at
//! ports, and the port/link references are kept consistent in both
//! directions by the mutators.
//!
//! Every piece of model state is an observable container from
//! [`weft_core::state`]: mutators notify subscribers synchronously, new
//! subscribers receive the current value, and destroying an entity revokes
//! every subscription made on it.
//!
//! # Example
//!
//! ```
//! use weft::{
//!     Entity, LinkModel, LinkOptions, NodeModel, NodeOptions, PortOptions,
//!     geometry::Coords,
//! };
//!
//! let node = NodeModel::new(
//!     NodeOptions::default()
//!         .with_port(PortOptions::default())
//!         .with_port(PortOptions::default()),
//! );
//! let ports = node.ports();
//!
//! let link = LinkModel::new(
//!     LinkOptions::default()
//!         .with_source_port(ports[0].clone())
//!         .with_target_port(ports[1].clone()),
//! );
//! assert!(ports[0].has_link(link.id()));
//!
//! // Moving the node drags the link endpoints along.
//! node.set_coords(Coords::new(10.0, 5.0));
//! assert_eq!(link.first_point().coords(), Coords::new(10.0, 5.0));
//! ```

pub mod canvas;
pub mod clone;
pub mod config;

mod diagram;
mod error;
mod model;

pub use weft_core::{entity, geometry, identifier, path, state};

pub use diagram::DiagramModel;
pub use entity::{Entity, EntityKind, EntityOptions};
pub use error::ModelError;
pub use model::{
    BaseModel, Extras, LabelModel, LabelOptions, LinkEnd, LinkModel, LinkOptions, Model, ModelRef,
    NodeModel, NodeOptions, PaintedEvent, ParentChangeEvent, PathStyle, PointModel, PointOptions,
    PortModel, PortOptions, SelectionEvent,
};
