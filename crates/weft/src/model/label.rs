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

/// Construction options of a [`LabelModel`].
#[derive(Debug, Clone, Default)]
pub struct LabelOptions {
    entity: EntityOptions,
    coords: Coords,
    rotation: f32,
    text: String,
}

impl LabelOptions {
    pub fn with_entity(mut self, entity: EntityOptions) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_coords(mut self, coords: Coords) -> Self {
        self.coords = coords;
        self
    }

    /// Rotation in degrees.
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Text attached to a link.
pub struct LabelModel {
    this: Weak<Self>,
    model: BaseModel<LinkModel>,
    coords: ValueState<Coords>,
    rotation: ValueState<f32>,
    text: ValueState<String>,
}

impl LabelModel {
    pub fn new(options: LabelOptions) -> Rc<Self> {
        Self::with_parent(options, Weak::new())
    }

    fn with_parent(options: LabelOptions, parent: Weak<LinkModel>) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            let model = BaseModel::new(EntityKind::Label, &options.entity, parent);
            Self {
                this: this.clone(),
                coords: ValueState::new(options.coords, &model.pipe("coords")),
                rotation: ValueState::new(options.rotation, &model.pipe("rotation")),
                text: ValueState::new(options.text, &model.pipe("text")),
                model,
            }
        })
    }

    pub fn coords(&self) -> Coords {
        self.coords.get()
    }

    pub fn set_coords(&self, patch: impl Into<CoordsPatch>) {
        let patch = patch.into();
        self.coords.update(|current| patch.apply(*current));
    }

    pub fn select_coords(&self, next: impl FnMut(&Coords) + 'static) -> Subscription {
        self.coords.subscribe(next)
    }

    pub fn rotation(&self) -> f32 {
        self.rotation.get()
    }

    pub fn set_rotation(&self, rotation: f32) {
        self.rotation.set(rotation);
    }

    pub fn select_rotation(&self, next: impl FnMut(&f32) + 'static) -> Subscription {
        self.rotation.subscribe(next)
    }

    pub fn text(&self) -> String {
        self.text.get()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.text.set(text.into());
    }

    pub fn select_text(&self, next: impl FnMut(&String) + 'static) -> Subscription {
        self.text.subscribe(next)
    }
}

impl Entity for LabelModel {
    fn base(&self) -> &BaseEntity {
        self.model.entity()
    }

    fn destroy(&self) {
        self.model.destroy();
    }
}

impl Model for LabelModel {
    type Parent = LinkModel;

    fn model(&self) -> &BaseModel<LinkModel> {
        &self.model
    }

    fn handle(&self) -> Option<ModelRef> {
        self.this.upgrade().map(ModelRef::Label)
    }
}

impl DeepClone for LabelModel {
    fn create_clone(&self) -> Rc<Self> {
        let options = LabelOptions::default()
            .with_entity(EntityOptions::default().with_namespace(self.namespace()))
            .with_coords(self.coords())
            .with_rotation(self.rotation())
            .with_text(self.text());
        Self::with_parent(options, self.model.parent_weak())
    }

    fn do_clone(&self, _lookup: &mut CloneLookup, _clone: &Rc<Self>) {}
}

impl fmt::Debug for LabelModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelModel")
            .field("id", &self.id())
            .field("text", &self.text())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_values_and_patches() {
        let label = LabelModel::new(
            LabelOptions::default()
                .with_text("yes")
                .with_rotation(90.0)
                .with_coords(Coords::new(4.0, 4.0)),
        );

        label.set_coords(CoordsPatch::y(-4.0));
        label.set_text("no");

        assert_eq!(label.text(), "no");
        assert_approx_eq!(f32, label.rotation(), 90.0);
        assert_eq!(label.coords(), Coords::new(4.0, -4.0));
    }

    #[test]
    fn test_select_text() {
        let label = LabelModel::new(LabelOptions::default().with_text("a"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _subscription = label.select_text(move |text| sink.borrow_mut().push(text.clone()));

        label.set_text("a");
        label.set_text("b");

        assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_clone_keeps_text_and_rotation() {
        let label = LabelModel::new(LabelOptions::default().with_text("cost: 3").with_rotation(45.0));

        let clone = label.deep_clone();

        assert_ne!(clone.id(), label.id());
        assert_eq!(clone.text(), "cost: 3");
        assert_approx_eq!(f32, clone.rotation(), 45.0);
    }
}
