use std::{
    fmt,
    rc::{Rc, Weak},
};

use log::{debug, warn};

use weft_core::{
    entity::{BaseEntity, Entity, EntityKind, EntityOptions},
    geometry::{Coords, Dimensions, DimensionsPatch},
    identifier::Id,
    state::{EntityState, Subscription, ValueState},
};

use super::{BaseModel, Extras, Model, ModelRef, PortModel, PortOptions};
use crate::{
    canvas::CanvasGeometry,
    clone::{CloneLookup, DeepClone},
    diagram::DiagramModel,
    error::{ModelError, ensure_unlocked},
};

/// Construction options of a [`NodeModel`].
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    entity: EntityOptions,
    coords: Coords,
    dimensions: Dimensions,
    ports: Vec<PortOptions>,
    extras: Extras,
    parent: Weak<DiagramModel>,
}

impl NodeOptions {
    pub fn with_entity(mut self, entity: EntityOptions) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_coords(mut self, coords: Coords) -> Self {
        self.coords = coords;
        self
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Adds a port built from `port` when the node is constructed.
    pub fn with_port(mut self, port: PortOptions) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }

    pub fn with_parent(mut self, diagram: &Rc<DiagramModel>) -> Self {
        self.parent = Rc::downgrade(diagram);
        self
    }
}

/// A vertex of the diagram. Owns its ports.
///
/// Moving a node translates the endpoint of every link anchored at one of
/// its ports by the same delta, so link ends follow the node.
pub struct NodeModel {
    this: Weak<Self>,
    model: BaseModel<DiagramModel>,
    coords: ValueState<Coords>,
    dimensions: ValueState<Dimensions>,
    extras: ValueState<Extras>,
    ports: EntityState<PortModel>,
}

impl NodeModel {
    pub fn new(options: NodeOptions) -> Rc<Self> {
        let NodeOptions {
            entity,
            coords,
            dimensions,
            ports,
            extras,
            parent,
        } = options;

        let node = Rc::new_cyclic(|this: &Weak<Self>| {
            let model = BaseModel::new(EntityKind::Node, &entity, parent);
            Self {
                this: this.clone(),
                coords: ValueState::new(coords, &model.pipe("coords")),
                dimensions: ValueState::new(dimensions, &model.pipe("dimensions")),
                extras: ValueState::new(extras, &model.pipe("extras")),
                ports: EntityState::new(&model.pipe("ports")),
                model,
            }
        });

        for port in ports {
            if let Err(err) = node.insert_port(PortModel::new(port)) {
                warn!(node:% = node.id(), err:% = err; "Skipping constructor port");
            }
        }

        debug!(id:% = node.id(), ports = node.ports.len(); "Node created");
        node
    }

    // ==== Geometry ====

    pub fn coords(&self) -> Coords {
        self.coords.get()
    }

    /// Moves the node, dragging the endpoints of its links along. Both ends
    /// of a link looping back to the same port move.
    pub fn set_coords(&self, coords: Coords) {
        let delta = coords.sub(self.coords());
        if !delta.is_zero() {
            for port in self.ports() {
                for link in port.links() {
                    for point in link.endpoints_for_port(&port) {
                        point.translate(delta);
                    }
                }
            }
        }
        self.coords.set(coords);
    }

    pub fn select_coords(&self, next: impl FnMut(&Coords) + 'static) -> Subscription {
        self.coords.subscribe(next)
    }

    pub fn select_x(&self, next: impl FnMut(&f32) + 'static) -> Subscription {
        self.coords.select(|coords| coords.x(), next)
    }

    pub fn select_y(&self, next: impl FnMut(&f32) + 'static) -> Subscription {
        self.coords.select(|coords| coords.y(), next)
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions.get()
    }

    /// Merges `patch` over the current dimensions.
    pub fn set_dimensions(&self, patch: impl Into<DimensionsPatch>) {
        let patch = patch.into();
        self.dimensions.update(|current| patch.apply(*current));
    }

    pub fn width(&self) -> f32 {
        self.dimensions().width()
    }

    pub fn set_width(&self, width: f32) {
        self.set_dimensions(DimensionsPatch::width(width));
    }

    pub fn height(&self) -> f32 {
        self.dimensions().height()
    }

    pub fn set_height(&self, height: f32) {
        self.set_dimensions(DimensionsPatch::height(height));
    }

    pub fn select_dimensions(&self, next: impl FnMut(&Dimensions) + 'static) -> Subscription {
        self.dimensions.subscribe(next)
    }

    pub fn select_width(&self, next: impl FnMut(&f32) + 'static) -> Subscription {
        self.dimensions.select(|dimensions| dimensions.width(), next)
    }

    pub fn select_height(&self, next: impl FnMut(&f32) + 'static) -> Subscription {
        self.dimensions.select(|dimensions| dimensions.height(), next)
    }

    /// Refreshes `port` from its rendered geometry.
    ///
    /// Does nothing unless the port has been painted and the node belongs
    /// to a diagram. Returns whether the port was updated.
    pub fn update_port_coords(&self, port: &PortModel, canvas: &dyn CanvasGeometry) -> bool {
        if !port.is_painted() || self.parent().is_none() {
            return false;
        }

        let rect = canvas.port_rect(port).unwrap_or_default();
        let rect = match canvas.port_center(port) {
            Some(center) => rect.with_origin(center),
            None => rect,
        };
        port.update_coords(rect);
        true
    }

    // ==== Ports ====

    /// Adds `port` and makes this node its parent.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Locked`] if the node is locked.
    /// - [`ModelError::InvalidReference`] if `port` belongs to another node.
    /// - [`ModelError::State`] if a port with the same id is already present.
    pub fn add_port(&self, port: Rc<PortModel>) -> Result<Rc<PortModel>, ModelError> {
        ensure_unlocked(self, "add port")?;
        if let Some(owner) = port.parent() {
            if !ptr_eq_node(&owner, self) && owner.port(port.id()).is_some() {
                warn!(port:% = port.id(), owner:% = owner.id(); "Port belongs to another node");
                return Err(ModelError::InvalidReference {
                    id: port.id(),
                    reason: format!("port belongs to node `{}`", owner.id()),
                });
            }
        }
        self.insert_port(port)
    }

    /// Removes the port with `id` and destroys it, which detaches it from
    /// every link anchored at it. Returns the removed id.
    pub fn remove_port(&self, id: Id) -> Result<Id, ModelError> {
        ensure_unlocked(self, "remove port")?;
        let port = self
            .ports
            .remove(id)
            .ok_or_else(|| ModelError::not_found(EntityKind::Port, id))?;
        port.destroy();
        Ok(id)
    }

    /// Destroys every port.
    pub fn remove_all_ports(&self) -> Result<(), ModelError> {
        ensure_unlocked(self, "remove ports")?;
        self.ports.destroy();
        Ok(())
    }

    pub fn port(&self, id: Id) -> Option<Rc<PortModel>> {
        self.ports.get(id)
    }

    /// Ports in insertion order.
    pub fn ports(&self) -> Vec<Rc<PortModel>> {
        self.ports.array()
    }

    pub fn select_ports(&self, next: impl FnMut(&[Rc<PortModel>]) + 'static) -> Subscription {
        self.ports.subscribe_array(next)
    }

    fn insert_port(&self, port: Rc<PortModel>) -> Result<Rc<PortModel>, ModelError> {
        let port = self.ports.add(port)?;
        port.set_node(self.this.clone());
        port.set_locked(self.is_locked());
        debug!(node:% = self.id(), port:% = port.id(); "Port added");
        Ok(port)
    }

    // ==== Extras ====

    pub fn extras(&self) -> Extras {
        self.extras.get()
    }

    pub fn set_extras(&self, extras: Extras) {
        self.extras.set(extras);
    }

    /// Subscribes to a projection of the extras; repeats are suppressed.
    pub fn select_extras<R, P, F>(&self, project: P, next: F) -> Subscription
    where
        R: PartialEq + 'static,
        P: Fn(&Extras) -> R + 'static,
        F: FnMut(&R) + 'static,
    {
        self.extras.select(project, next)
    }
}

fn ptr_eq_node(a: &Rc<NodeModel>, b: &NodeModel) -> bool {
    std::ptr::eq(a.as_ref(), b)
}

impl Entity for NodeModel {
    fn base(&self) -> &BaseEntity {
        self.model.entity()
    }

    /// Locks or unlocks the node together with its ports.
    fn set_locked(&self, locked: bool) {
        self.model.entity().set_locked(locked);
        for port in self.ports() {
            port.set_locked(locked);
        }
    }

    /// Destroys every port, then tears the node down.
    fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }

        self.ports.destroy();
        self.model.destroy();
    }
}

impl Model for NodeModel {
    type Parent = DiagramModel;

    fn model(&self) -> &BaseModel<DiagramModel> {
        &self.model
    }

    fn handle(&self) -> Option<ModelRef> {
        self.this.upgrade().map(ModelRef::Node)
    }

    /// A selected node also selects the endpoint of every link anchored at
    /// its ports, without selecting the links themselves.
    fn selected_entities(&self) -> Vec<ModelRef> {
        if !self.is_selected() {
            return Vec::new();
        }

        let mut entities: Vec<ModelRef> = self.handle().into_iter().collect();
        for port in self.ports() {
            entities.extend(
                port.links()
                    .iter()
                    .flat_map(|link| link.endpoints_for_port(&port))
                    .map(ModelRef::Point),
            );
        }
        entities
    }
}

impl DeepClone for NodeModel {
    fn create_clone(&self) -> Rc<Self> {
        let options = NodeOptions {
            entity: EntityOptions::default().with_namespace(self.namespace()),
            coords: self.coords(),
            dimensions: self.dimensions(),
            extras: self.extras(),
            parent: self.model.parent_weak(),
            ..NodeOptions::default()
        };
        Self::new(options)
    }

    /// Clones every port and adds it to `clone`. Links between the ports are
    /// cloned along the way and converge on the cloned ports.
    fn do_clone(&self, lookup: &mut CloneLookup, clone: &Rc<Self>) {
        let ports = self.ports();
        for port in &ports {
            let port = port.clone_with(lookup);
            if let Err(err) = clone.insert_port(port) {
                warn!(node:% = clone.id(), err:% = err; "Cloned port not added");
            }
        }
        // A port first reached through a link of an earlier node was cloned
        // without its links.
        for port in &ports {
            port.clone_links(lookup);
        }
    }
}

impl fmt::Debug for NodeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeModel")
            .field("id", &self.id())
            .field("coords", &self.coords())
            .field("dimensions", &self.dimensions())
            .field("ports", &self.ports.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::{
        config::DiagramConfig,
        geometry::Rect,
        model::{LinkModel, LinkOptions, PointOptions},
    };

    fn two_port_node() -> Rc<NodeModel> {
        NodeModel::new(
            NodeOptions::default()
                .with_port(PortOptions::default())
                .with_port(PortOptions::default()),
        )
    }

    struct FixedCanvas;

    impl CanvasGeometry for FixedCanvas {
        fn port_rect(&self, _port: &PortModel) -> Option<Rect> {
            Some(Rect::new(0.0, 0.0, 10.0, 6.0))
        }

        fn port_center(&self, _port: &PortModel) -> Option<Coords> {
            Some(Coords::new(105.0, 53.0))
        }
    }

    #[test]
    fn test_constructor_ports_are_owned() {
        let node = two_port_node();

        assert_eq!(node.ports().len(), 2);
        assert!(node.ports().iter().all(|port| {
            port.parent().is_some_and(|parent| Rc::ptr_eq(&parent, &node))
        }));
    }

    #[test]
    fn test_move_translates_only_attached_endpoints() {
        let node = two_port_node();
        let other = two_port_node();
        let link = LinkModel::new(
            LinkOptions::default()
                .with_point(PointOptions::default().with_coords(Coords::new(0.0, 0.0)))
                .with_point(PointOptions::default().with_coords(Coords::new(50.0, 50.0)))
                .with_point(PointOptions::default().with_coords(Coords::new(100.0, 100.0)))
                .with_source_port(node.ports()[0].clone())
                .with_target_port(other.ports()[0].clone()),
        );

        node.set_coords(Coords::new(10.0, -5.0));

        let coords: Vec<Coords> = link.points().iter().map(|point| point.coords()).collect();
        assert_eq!(
            coords,
            vec![
                Coords::new(10.0, -5.0),
                Coords::new(50.0, 50.0),
                Coords::new(100.0, 100.0),
            ]
        );
        assert_eq!(node.coords(), Coords::new(10.0, -5.0));
    }

    #[test]
    fn test_move_translates_both_ends_of_loop() {
        let node = two_port_node();
        let port = node.ports()[0].clone();
        let link = LinkModel::new(
            LinkOptions::default()
                .with_point(PointOptions::default().with_coords(Coords::new(0.0, 0.0)))
                .with_point(PointOptions::default().with_coords(Coords::new(30.0, 30.0)))
                .with_point(PointOptions::default().with_coords(Coords::new(0.0, 10.0)))
                .with_source_port(Rc::clone(&port))
                .with_target_port(port),
        );

        node.set_coords(Coords::new(5.0, 5.0));

        let coords: Vec<Coords> = link.points().iter().map(|point| point.coords()).collect();
        assert_eq!(
            coords,
            vec![
                Coords::new(5.0, 5.0),
                Coords::new(30.0, 30.0),
                Coords::new(5.0, 15.0),
            ]
        );
    }

    #[test]
    fn test_dimensions_patch() {
        let node = NodeModel::new(NodeOptions::default().with_dimensions(Dimensions::new(80.0, 40.0)));
        let widths = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&widths);
        let _subscription = node.select_width(move |width| sink.borrow_mut().push(*width));

        node.set_height(60.0);
        node.set_width(120.0);

        assert_approx_eq!(f32, node.width(), 120.0);
        assert_approx_eq!(f32, node.height(), 60.0);
        assert_eq!(*widths.borrow(), vec![80.0, 120.0]);
    }

    #[test]
    fn test_select_x_skips_y_only_moves() {
        let node = NodeModel::new(NodeOptions::default());
        let xs = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&xs);
        let _subscription = node.select_x(move |x| sink.borrow_mut().push(*x));

        node.set_coords(Coords::new(0.0, 10.0));
        node.set_coords(Coords::new(4.0, 10.0));

        assert_eq!(*xs.borrow(), vec![0.0, 4.0]);
    }

    #[test]
    fn test_remove_port_destroys_and_detaches() {
        let node = two_port_node();
        let port = node.ports()[0].clone();
        let link = LinkModel::new(LinkOptions::default().with_source_port(Rc::clone(&port)));

        let removed = node.remove_port(port.id()).unwrap();

        assert_eq!(removed, port.id());
        assert!(port.is_destroyed());
        assert!(link.source_port().is_none());
        assert!(node.port(port.id()).is_none());
        assert!(matches!(
            node.remove_port(port.id()),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_add_port_rejects_foreign_port() {
        let owner = two_port_node();
        let node = NodeModel::new(NodeOptions::default());
        let foreign = owner.ports()[0].clone();

        assert!(matches!(
            node.add_port(foreign),
            Err(ModelError::InvalidReference { .. })
        ));

        let free = node.add_port(PortModel::new(PortOptions::default())).unwrap();
        assert!(free.parent().is_some_and(|parent| Rc::ptr_eq(&parent, &node)));
        assert!(matches!(node.add_port(free), Err(ModelError::State(_))));
    }

    #[test]
    fn test_locked_node() {
        let node = NodeModel::new(
            NodeOptions::default()
                .with_entity(EntityOptions::default().with_locked(true))
                .with_port(PortOptions::default()),
        );

        assert!(node.ports()[0].is_locked());
        assert!(matches!(
            node.add_port(PortModel::new(PortOptions::default())),
            Err(ModelError::Locked { .. })
        ));
        assert!(node.remove_all_ports().is_err());

        // Moving is a value change and is never refused.
        node.set_coords(Coords::new(1.0, 1.0));
        assert_eq!(node.coords(), Coords::new(1.0, 1.0));

        node.set_locked(false);
        assert!(!node.ports()[0].is_locked());
    }

    #[test]
    fn test_selected_entities_include_link_endpoints() {
        let node = two_port_node();
        let ports = node.ports();
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(ports[0].clone())
                .with_target_port(ports[1].clone()),
        );

        assert!(node.selected_entities().is_empty());
        node.set_selected(true);

        let selected = node.selected_entities();
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0], ModelRef::Node(Rc::clone(&node)));
        assert_eq!(selected[1], ModelRef::Point(link.first_point()));
        assert_eq!(selected[2], ModelRef::Point(link.last_point()));
        assert!(!link.is_selected());
    }

    #[test]
    fn test_update_port_coords_requires_paint_and_parent() {
        let diagram = DiagramModel::new(DiagramConfig::default(), EntityOptions::default());
        let node = two_port_node();
        let port = node.ports()[0].clone();
        let link = LinkModel::new(LinkOptions::default().with_target_port(Rc::clone(&port)));

        assert!(!node.update_port_coords(&port, &FixedCanvas));

        port.set_painted(true);
        assert!(!node.update_port_coords(&port, &FixedCanvas));

        diagram.add_node(Rc::clone(&node)).unwrap();
        assert!(node.update_port_coords(&port, &FixedCanvas));

        assert_eq!(port.coords(), Coords::new(105.0, 53.0));
        assert_eq!(port.dimensions(), Dimensions::new(10.0, 6.0));
        assert_eq!(link.last_point().coords(), Coords::new(105.0, 53.0));
    }

    #[test]
    fn test_destroy_cascades_into_ports() {
        let node = two_port_node();
        let ports = node.ports();
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(ports[0].clone())
                .with_target_port(ports[1].clone()),
        );

        node.destroy();

        assert!(node.is_destroyed());
        assert!(node.ports().is_empty());
        assert!(ports.iter().all(|port| port.is_destroyed()));
        assert!(link.source_port().is_none());
        assert!(link.target_port().is_none());
        assert!(!link.is_destroyed());
    }

    #[test]
    fn test_deep_clone_converges_on_cloned_ports() {
        let node = two_port_node();
        let ports = node.ports();
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(ports[0].clone())
                .with_target_port(ports[1].clone()),
        );

        let clone = node.deep_clone();
        let cloned_ports = clone.ports();

        assert_eq!(cloned_ports.len(), 2);
        assert!(cloned_ports.iter().all(|port| !ports.iter().any(|p| Rc::ptr_eq(p, port))));
        assert_eq!(clone.cloned_links().len(), 1);
        assert_eq!(cloned_ports[0].links().len(), 1);

        let cloned_link = cloned_ports[0].links()[0].clone();
        assert!(!Rc::ptr_eq(&cloned_link, &link));
        assert!(Rc::ptr_eq(&cloned_link.source_port().unwrap(), &cloned_ports[0]));
        assert!(Rc::ptr_eq(&cloned_link.target_port().unwrap(), &cloned_ports[1]));
        assert!(Rc::ptr_eq(&cloned_ports[1].links()[0], &cloned_link));
        assert_eq!(ports[0].link_count(), 1);
    }
}
