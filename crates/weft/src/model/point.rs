use std::{
    fmt,
    rc::{Rc, Weak},
};

use weft_core::{
    entity::{BaseEntity, Entity, EntityKind, EntityOptions},
    geometry::{Coords, CoordsPatch},
    state::{Subscription, ValueState},
};

use super::{BaseModel, LinkModel, Model, ModelRef};
use crate::clone::{CloneLookup, DeepClone};

/// Construction options of a [`PointModel`].
#[derive(Debug, Clone, Default)]
pub struct PointOptions {
    entity: EntityOptions,
    coords: Coords,
}

impl PointOptions {
    pub fn with_entity(mut self, entity: EntityOptions) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_coords(mut self, coords: Coords) -> Self {
        self.coords = coords;
        self
    }
}

/// A waypoint of a link. The first and last points of a link are its
/// endpoints.
pub struct PointModel {
    this: Weak<Self>,
    model: BaseModel<LinkModel>,
    coords: ValueState<Coords>,
}

impl PointModel {
    pub fn new(options: PointOptions) -> Rc<Self> {
        Self::with_parent(options, Weak::new())
    }

    pub(crate) fn with_parent(options: PointOptions, parent: Weak<LinkModel>) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            let model = BaseModel::new(EntityKind::Point, &options.entity, parent);
            let coords = ValueState::new(options.coords, &model.pipe("coords"));
            Self {
                this: this.clone(),
                model,
                coords,
            }
        })
    }

    pub fn coords(&self) -> Coords {
        self.coords.get()
    }

    /// Merges `patch` over the current coordinates.
    pub fn set_coords(&self, patch: impl Into<CoordsPatch>) {
        let patch = patch.into();
        self.coords.update(|current| patch.apply(*current));
    }

    /// Moves the point by `delta`.
    pub fn translate(&self, delta: Coords) {
        self.coords.update(|current| current.add(delta));
    }

    pub fn select_coords(&self, next: impl FnMut(&Coords) + 'static) -> Subscription {
        self.coords.subscribe(next)
    }
}

impl Entity for PointModel {
    fn base(&self) -> &BaseEntity {
        self.model.entity()
    }

    fn destroy(&self) {
        self.model.destroy();
    }
}

impl Model for PointModel {
    type Parent = LinkModel;

    fn model(&self) -> &BaseModel<LinkModel> {
        &self.model
    }

    fn handle(&self) -> Option<ModelRef> {
        self.this.upgrade().map(ModelRef::Point)
    }
}

impl DeepClone for PointModel {
    fn create_clone(&self) -> Rc<Self> {
        let options = PointOptions::default()
            .with_entity(EntityOptions::default().with_namespace(self.namespace()))
            .with_coords(self.coords());
        Self::with_parent(options, self.model.parent_weak())
    }

    fn do_clone(&self, _lookup: &mut CloneLookup, _clone: &Rc<Self>) {}
}

impl fmt::Debug for PointModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointModel")
            .field("id", &self.id())
            .field("coords", &self.coords())
            .finish()
    }
}
