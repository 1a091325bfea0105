//! The root of a diagram: nodes, links and canvas state.

use std::{
    fmt, ptr,
    rc::{Rc, Weak},
};

use log::{debug, info, warn};

use weft_core::{
    entity::{BaseEntity, Entity, EntityKind, EntityOptions},
    geometry::Coords,
    identifier::Id,
    state::{EntityState, Subscription, ValueState},
};

use crate::{
    clone::{CloneLookup, DeepClone},
    config::DiagramConfig,
    error::{ModelError, ensure_unlocked},
    model::{LinkModel, Model, ModelRef, NodeModel, PointModel, PortModel},
};

/// Owns the nodes and links of a diagram along with its zoom and offset.
pub struct DiagramModel {
    this: Weak<Self>,
    entity: BaseEntity,
    config: DiagramConfig,
    nodes: EntityState<NodeModel>,
    links: EntityState<LinkModel>,
    zoom: ValueState<f32>,
    offset: ValueState<Coords>,
}

impl DiagramModel {
    pub fn new(config: DiagramConfig, options: EntityOptions) -> Rc<Self> {
        let diagram = Rc::new_cyclic(|this: &Weak<Self>| {
            let entity = BaseEntity::new(EntityKind::Diagram, &options);
            let zoom = config.clamp_zoom(config.zoom());
            let offset = Coords::new(config.offset_x(), config.offset_y());
            Self {
                this: this.clone(),
                nodes: EntityState::new(&entity.entity_pipe("nodes")),
                links: EntityState::new(&entity.entity_pipe("links")),
                zoom: ValueState::new(zoom, &entity.entity_pipe("zoom")),
                offset: ValueState::new(offset, &entity.entity_pipe("offset")),
                entity,
                config,
            }
        });

        debug!(id:% = diagram.id(), zoom = diagram.zoom(); "Diagram created");
        diagram
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    // ==== Nodes ====

    /// Adds `node` and makes this diagram its parent.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Locked`] if the diagram is locked.
    /// - [`ModelError::InvalidReference`] if `node` belongs to another diagram.
    /// - [`ModelError::State`] if a node with the same id is already present.
    pub fn add_node(&self, node: Rc<NodeModel>) -> Result<Rc<NodeModel>, ModelError> {
        ensure_unlocked(self, "add node")?;
        if let Some(owner) = node.parent() {
            if !ptr::eq(owner.as_ref(), self) && owner.node(node.id()).is_some() {
                warn!(node:% = node.id(), owner:% = owner.id(); "Node belongs to another diagram");
                return Err(ModelError::InvalidReference {
                    id: node.id(),
                    reason: format!("node belongs to diagram `{}`", owner.id()),
                });
            }
        }

        let node = self.nodes.add(node)?;
        node.model().set_parent_weak(self.this.clone());
        Ok(node)
    }

    /// Removes and destroys the node with `id`.
    ///
    /// Links anchored at its ports lose that end. Unless loose links are
    /// allowed, those links are removed from the diagram as well.
    pub fn remove_node(&self, id: Id) -> Result<Id, ModelError> {
        ensure_unlocked(self, "remove node")?;
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| ModelError::not_found(EntityKind::Node, id))?;

        let affected: Vec<Id> = node
            .ports()
            .iter()
            .flat_map(|port| port.links())
            .map(|link| link.id())
            .collect();
        node.destroy();

        if !self.config.allow_loose_links() {
            for link_id in affected {
                if let Some(link) = self.links.remove(link_id) {
                    debug!(link:% = link_id, node:% = id; "Removing loose link");
                    link.destroy();
                }
            }
        }
        Ok(id)
    }

    pub fn node(&self, id: Id) -> Option<Rc<NodeModel>> {
        self.nodes.get(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> Vec<Rc<NodeModel>> {
        self.nodes.array()
    }

    pub fn select_nodes(&self, next: impl FnMut(&[Rc<NodeModel>]) + 'static) -> Subscription {
        self.nodes.subscribe_array(next)
    }

    // ==== Links ====

    /// Adds `link` and makes this diagram its parent.
    pub fn add_link(&self, link: Rc<LinkModel>) -> Result<Rc<LinkModel>, ModelError> {
        ensure_unlocked(self, "add link")?;
        let link = self.links.add(link)?;
        link.model().set_parent_weak(self.this.clone());
        Ok(link)
    }

    /// Removes and destroys the link with `id`.
    pub fn remove_link(&self, id: Id) -> Result<Id, ModelError> {
        ensure_unlocked(self, "remove link")?;
        let link = self
            .links
            .remove(id)
            .ok_or_else(|| ModelError::not_found(EntityKind::Link, id))?;
        link.destroy();
        Ok(id)
    }

    pub fn link(&self, id: Id) -> Option<Rc<LinkModel>> {
        self.links.get(id)
    }

    /// Links in insertion order.
    pub fn links(&self) -> Vec<Rc<LinkModel>> {
        self.links.array()
    }

    pub fn select_links(&self, next: impl FnMut(&[Rc<LinkModel>]) + 'static) -> Subscription {
        self.links.subscribe_array(next)
    }

    // ==== Selection ====

    /// Everything currently selected: nodes with the endpoints of their
    /// links, then links.
    pub fn selected_entities(&self) -> Vec<ModelRef> {
        let nodes = self.nodes().into_iter().flat_map(|node| node.selected_entities());
        let links = self.links().into_iter().flat_map(|link| link.selected_entities());
        nodes.chain(links).collect()
    }

    pub fn clear_selection(&self) {
        for entity in self.selected_entities() {
            entity.set_selected(false);
        }
    }

    // ==== Duplication ====

    /// Clones the nodes with `ids` and adds the clones, offset by one grid
    /// step, to the diagram.
    ///
    /// All nodes go through one lookup, so a link between two duplicated
    /// nodes is cloned once and joins the cloned ports. Links reaching a
    /// node outside `ids` are not duplicated.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Locked`] if the diagram is locked.
    /// - [`ModelError::NotFound`] if an id is not a node of this diagram.
    pub fn duplicate_nodes(&self, ids: &[Id]) -> Result<Vec<Rc<NodeModel>>, ModelError> {
        ensure_unlocked(self, "duplicate nodes")?;
        let originals = ids
            .iter()
            .map(|&id| {
                self.node(id)
                    .ok_or_else(|| ModelError::not_found(EntityKind::Node, id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut lookup = CloneLookup::new();
        let clones: Vec<_> = originals
            .iter()
            .map(|node| node.clone_with(&mut lookup))
            .collect();

        let step = Coords::new(self.config.grid_size(), self.config.grid_size());
        let mut links = Vec::new();
        for link in lookup.clones::<LinkModel>() {
            if is_internal(&link, &clones) {
                for point in interior_points(&link) {
                    point.translate(step);
                }
                links.push(link);
            } else {
                link.destroy();
            }
        }
        for port in lookup.clones::<PortModel>() {
            if !is_member(&port) {
                port.destroy();
            }
        }

        for node in &clones {
            node.set_coords(node.coords().add(step));
            self.add_node(Rc::clone(node))?;
        }
        for link in links {
            self.add_link(link)?;
        }

        info!(
            diagram:% = self.id(),
            nodes = clones.len(),
            cloned = lookup.len();
            "Nodes duplicated"
        );
        Ok(clones)
    }

    // ==== Canvas ====

    pub fn zoom(&self) -> f32 {
        self.zoom.get()
    }

    /// Sets the zoom factor, clamped to the configured limits. Returns
    /// `false` if canvas zoom is disabled.
    pub fn set_zoom(&self, zoom: f32) -> bool {
        if !self.config.allow_canvas_zoom() {
            warn!(diagram:% = self.id(); "Canvas zoom is disabled");
            return false;
        }
        self.zoom.set(self.config.clamp_zoom(zoom));
        true
    }

    pub fn select_zoom(&self, next: impl FnMut(&f32) + 'static) -> Subscription {
        self.zoom.subscribe(next)
    }

    pub fn offset(&self) -> Coords {
        self.offset.get()
    }

    /// Moves the canvas. Returns `false` if canvas translation is disabled.
    pub fn set_offset(&self, offset: Coords) -> bool {
        if !self.config.allow_canvas_translation() {
            warn!(diagram:% = self.id(); "Canvas translation is disabled");
            return false;
        }
        self.offset.set(offset);
        true
    }

    pub fn select_offset(&self, next: impl FnMut(&Coords) + 'static) -> Subscription {
        self.offset.subscribe(next)
    }
}

/// Both ends of `link` are anchored at ports of `nodes`.
fn is_internal(link: &LinkModel, nodes: &[Rc<NodeModel>]) -> bool {
    let anchored = |port: Option<Rc<PortModel>>| {
        port.and_then(|port| port.parent())
            .is_some_and(|parent| nodes.iter().any(|node| Rc::ptr_eq(node, &parent)))
    };
    anchored(link.source_port()) && anchored(link.target_port())
}

/// The port is held by the node it names as parent.
fn is_member(port: &PortModel) -> bool {
    port.parent()
        .is_some_and(|node| node.port(port.id()).is_some())
}

fn interior_points(link: &LinkModel) -> Vec<Rc<PointModel>> {
    let points = link.points();
    points[1..points.len() - 1].to_vec()
}

impl Entity for DiagramModel {
    fn base(&self) -> &BaseEntity {
        &self.entity
    }

    /// Destroys every link, then every node.
    fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }

        self.links.destroy();
        self.nodes.destroy();
        self.entity.destroy();
        debug!(id:% = self.id(); "Diagram destroyed");
    }
}

impl fmt::Debug for DiagramModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramModel")
            .field("id", &self.id())
            .field("nodes", &self.nodes.ids())
            .field("links", &self.links.ids())
            .field("zoom", &self.zoom())
            .finish()
    }
}
