use std::{
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;
use log::debug;

use weft_core::{
    entity::{BaseEntity, DEFAULT_NAMESPACE, Entity, EntityKind, EntityOptions},
    geometry::{Coords, Dimensions, Rect},
    identifier::Id,
    state::{Subscription, ValueState},
};

use super::{BaseModel, LinkModel, Model, ModelRef, NodeModel};
use crate::clone::{CloneLookup, DeepClone};

/// Construction options of a [`PortModel`].
#[derive(Debug, Clone)]
pub struct PortOptions {
    entity: EntityOptions,
    coords: Coords,
    dimensions: Dimensions,
    link_namespace: String,
    max_links: Option<usize>,
    magnetic: bool,
    can_create_links: bool,
}

impl Default for PortOptions {
    fn default() -> Self {
        Self {
            entity: EntityOptions::default(),
            coords: Coords::default(),
            dimensions: Dimensions::default(),
            link_namespace: DEFAULT_NAMESPACE.to_string(),
            max_links: None,
            magnetic: true,
            can_create_links: true,
        }
    }
}

impl PortOptions {
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

    /// Namespace given to links drawn from this port.
    pub fn with_link_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.link_namespace = namespace.into();
        self
    }

    /// Caps the number of attached links. Unlimited by default.
    pub fn with_max_links(mut self, max_links: usize) -> Self {
        self.max_links = Some(max_links);
        self
    }

    pub fn with_magnetic(mut self, magnetic: bool) -> Self {
        self.magnetic = magnetic;
        self
    }

    pub fn with_can_create_links(mut self, can_create_links: bool) -> Self {
        self.can_create_links = can_create_links;
        self
    }
}

type LinkMap = IndexMap<Id, Weak<LinkModel>>;

/// A connection point of a node.
///
/// A port does not own its links. It tracks the links anchored at it so
/// that moving or destroying the owning node can reach them.
pub struct PortModel {
    this: Weak<Self>,
    model: BaseModel<NodeModel>,
    coords: ValueState<Coords>,
    dimensions: ValueState<Dimensions>,
    links: ValueState<LinkMap>,
    link_namespace: String,
    max_links: Option<usize>,
    magnetic: bool,
    can_create_links: bool,
}

impl PortModel {
    pub fn new(options: PortOptions) -> Rc<Self> {
        Self::with_parent(options, Weak::new())
    }

    fn with_parent(options: PortOptions, parent: Weak<NodeModel>) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            let model = BaseModel::new(EntityKind::Port, &options.entity, parent);
            Self {
                this: this.clone(),
                coords: ValueState::new(options.coords, &model.pipe("coords")),
                dimensions: ValueState::new(options.dimensions, &model.pipe("dimensions")),
                links: ValueState::keyed(LinkMap::new(), &model.pipe("links")),
                link_namespace: options.link_namespace,
                max_links: options.max_links,
                magnetic: options.magnetic,
                can_create_links: options.can_create_links,
                model,
            }
        })
    }

    /// Records `link` as attached. Attaching twice keeps a single entry.
    ///
    /// [`LinkModel::set_source_port`] and [`LinkModel::set_target_port`] call
    /// this; use them to keep both directions consistent.
    pub fn add_link(&self, link: &LinkModel) {
        let (id, weak) = (link.id(), link.downgrade());
        self.links.update(|links| {
            let mut links = live(links);
            links.insert(id, weak);
            links
        });
        debug!(port:% = self.id(), link:% = id; "Link attached to port");
    }

    /// Forgets the link with `id`. Returns `false` if it was not attached.
    pub fn remove_link(&self, id: Id) -> bool {
        if !self.has_link(id) {
            return false;
        }
        self.links.update(|links| {
            let mut links = live(links);
            links.shift_remove(&id);
            links
        });
        debug!(port:% = self.id(), link:% = id; "Link detached from port");
        true
    }

    /// Attached links in attach order.
    pub fn links(&self) -> Vec<Rc<LinkModel>> {
        self.links.with(|links| links.values().filter_map(Weak::upgrade).collect())
    }

    pub fn link_count(&self) -> usize {
        self.links
            .with(|links| links.values().filter(|link| link.strong_count() > 0).count())
    }

    pub fn has_link(&self, id: Id) -> bool {
        self.links
            .with(|links| links.get(&id).is_some_and(|link| link.strong_count() > 0))
    }

    /// Subscribes to the attached links; the current set is replayed.
    pub fn select_links(&self, mut next: impl FnMut(&[Rc<LinkModel>]) + 'static) -> Subscription {
        self.links.subscribe(move |links| {
            let links: Vec<_> = links.values().filter_map(Weak::upgrade).collect();
            next(links.as_slice())
        })
    }

    /// Returns `true` if no further link may be attached.
    pub fn is_full(&self) -> bool {
        self.max_links.is_some_and(|max| self.link_count() >= max)
    }

    pub fn max_links(&self) -> Option<usize> {
        self.max_links
    }

    pub fn is_magnetic(&self) -> bool {
        self.magnetic
    }

    pub fn can_create_links(&self) -> bool {
        self.can_create_links
    }

    pub fn link_namespace(&self) -> &str {
        &self.link_namespace
    }

    pub fn coords(&self) -> Coords {
        self.coords.get()
    }

    pub fn set_coords(&self, coords: Coords) {
        self.coords.set(coords);
    }

    pub fn select_coords(&self, next: impl FnMut(&Coords) + 'static) -> Subscription {
        self.coords.subscribe(next)
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions.get()
    }

    pub fn set_dimensions(&self, dimensions: Dimensions) {
        self.dimensions.set(dimensions);
    }

    /// Applies rendered geometry: stores the size, moves the port to
    /// `rect.origin()`, and drags the endpoint of every attached link onto
    /// it.
    pub fn update_coords(&self, rect: Rect) {
        let center = rect.origin();
        self.dimensions.set(rect.dimensions());
        self.coords.set(center);

        for link in self.links() {
            for point in link.endpoints_for_port(self) {
                point.set_coords(center);
            }
        }
    }

    pub(crate) fn set_node(&self, node: Weak<NodeModel>) {
        self.model.set_parent_weak(node);
    }

    /// Clones the attached links through `lookup`; each cloned link attaches
    /// itself to the cloned ports.
    pub(crate) fn clone_links(&self, lookup: &mut CloneLookup) {
        for link in self.links() {
            link.clone_with(lookup);
        }
    }
}

/// Copy of `links` without the entries of dropped links.
fn live(links: &LinkMap) -> LinkMap {
    links
        .iter()
        .filter(|(_, link)| link.strong_count() > 0)
        .map(|(&id, link)| (id, Weak::clone(link)))
        .collect()
}

impl Entity for PortModel {
    fn base(&self) -> &BaseEntity {
        self.model.entity()
    }

    /// Detaches the port from every link anchored at it, then tears it down.
    fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }

        for link in self.links() {
            link.detach_port(self);
        }
        self.links.set(LinkMap::new());
        self.model.destroy();
    }
}

impl Model for PortModel {
    type Parent = NodeModel;

    fn model(&self) -> &BaseModel<NodeModel> {
        &self.model
    }

    fn handle(&self) -> Option<ModelRef> {
        self.this.upgrade().map(ModelRef::Port)
    }
}

impl DeepClone for PortModel {
    fn create_clone(&self) -> Rc<Self> {
        let mut options = PortOptions::default()
            .with_entity(EntityOptions::default().with_namespace(self.namespace()))
            .with_coords(self.coords())
            .with_dimensions(self.dimensions())
            .with_link_namespace(self.link_namespace.clone())
            .with_magnetic(self.magnetic)
            .with_can_create_links(self.can_create_links);
        options.max_links = self.max_links;
        Self::with_parent(options, self.model.parent_weak())
    }

    /// Follows the attached links only while the owning node is being
    /// cloned. A port reached through a link from outside the cloned nodes
    /// becomes an orphan clone without links.
    fn do_clone(&self, lookup: &mut CloneLookup, _clone: &Rc<Self>) {
        if self.parent().is_some_and(|node| lookup.contains(node.id())) {
            self.clone_links(lookup);
        }
    }
}

impl fmt::Debug for PortModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortModel")
            .field("id", &self.id())
            .field("coords", &self.coords())
            .field("links", &self.links.with(|links| links.keys().copied().collect::<Vec<_>>()))
            .finish()
    }
}
