//! Graph models.
//!
//! Every model embeds a [`BaseModel`], which adds parent, selection, hover
//! and paint state to the entity identity of [`BaseEntity`]. The concrete
//! models form an ownership tree:
//!
//! ```text
//! DiagramModel ─┬─► NodeModel ──► PortModel ◄─┐ (anchor)
//!               └─► LinkModel ────────────────┘
//!                       ├──► PointModel (ordered)
//!                       └──► LabelModel
//! ```
//!
//! Arrows are strong references. Parents and the port-to-link direction are
//! weak: a model never keeps its parent alive and a port never keeps a link
//! alive.

mod label;
mod link;
mod node;
mod point;
mod port;

pub use label::{LabelModel, LabelOptions};
pub use link::{LinkEnd, LinkModel, LinkOptions, PathStyle};
pub use node::{NodeModel, NodeOptions};
pub use point::{PointModel, PointOptions};
pub use port::{PortModel, PortOptions};

use std::{
    any::Any,
    fmt,
    rc::{Rc, Weak},
};

use weft_core::{
    entity::{BaseEntity, Entity, EntityKind, EntityOptions},
    identifier::Id,
    state::{Pipe, Subscription, ValueState},
};

/// Emitted when the selected flag of a model changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub id: Id,
    pub kind: EntityKind,
    pub selected: bool,
}

/// Emitted on every [`Model::set_painted`] call, even if the flag is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintedEvent {
    pub id: Id,
    pub kind: EntityKind,
    pub is_painted: bool,
}

/// Emitted when a model is attached to a different parent.
#[derive(Debug, Clone)]
pub struct ParentChangeEvent<E> {
    pub child: Id,
    pub parent: Option<Rc<E>>,
}

/// Opaque user payload attached to nodes and links.
///
/// Two payloads are equal only if they are the same allocation, so setting a
/// freshly built payload always notifies.
#[derive(Clone, Default)]
pub struct Extras(Option<Rc<dyn Any>>);

impl Extras {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Rc::new(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the payload if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref::<T>()
    }

    /// Shares the payload if it is a `T`.
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        self.0.clone()?.downcast::<T>().ok()
    }
}

impl PartialEq for Extras {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Extras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Extras(..)"),
            None => f.write_str("Extras(empty)"),
        }
    }
}

/// A shared handle to any concrete model.
#[derive(Clone)]
pub enum ModelRef {
    Node(Rc<NodeModel>),
    Link(Rc<LinkModel>),
    Port(Rc<PortModel>),
    Point(Rc<PointModel>),
    Label(Rc<LabelModel>),
}

impl ModelRef {
    fn entity(&self) -> &dyn Entity {
        match self {
            Self::Node(node) => node.as_ref(),
            Self::Link(link) => link.as_ref(),
            Self::Port(port) => port.as_ref(),
            Self::Point(point) => point.as_ref(),
            Self::Label(label) => label.as_ref(),
        }
    }

    pub fn id(&self) -> Id {
        self.entity().id()
    }

    pub fn kind(&self) -> EntityKind {
        self.entity().kind()
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Self::Node(node) => node.is_selected(),
            Self::Link(link) => link.is_selected(),
            Self::Port(port) => port.is_selected(),
            Self::Point(point) => point.is_selected(),
            Self::Label(label) => label.is_selected(),
        }
    }

    pub fn set_selected(&self, selected: bool) {
        match self {
            Self::Node(node) => node.set_selected(selected),
            Self::Link(link) => link.set_selected(selected),
            Self::Port(port) => port.set_selected(selected),
            Self::Point(point) => point.set_selected(selected),
            Self::Label(label) => label.set_selected(selected),
        }
    }

    pub fn as_node(&self) -> Option<&Rc<NodeModel>> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Rc<LinkModel>> {
        match self {
            Self::Link(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<&Rc<PointModel>> {
        match self {
            Self::Point(point) => Some(point),
            _ => None,
        }
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => Rc::ptr_eq(a, b),
            (Self::Link(a), Self::Link(b)) => Rc::ptr_eq(a, b),
            (Self::Port(a), Self::Port(b)) => Rc::ptr_eq(a, b),
            (Self::Point(a), Self::Point(b)) => Rc::ptr_eq(a, b),
            (Self::Label(a), Self::Label(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.id())
    }
}

/// Parent, selection, hover and paint state shared by all models.
///
/// `E` is the parent type. The parent is held weakly.
pub struct BaseModel<E: 'static> {
    entity: BaseEntity,
    parent: ValueState<Weak<E>>,
    selected: ValueState<bool>,
    hovered: ValueState<bool>,
    painted: ValueState<bool>,
}

impl<E: 'static> BaseModel<E> {
    pub fn new(kind: EntityKind, options: &EntityOptions, parent: Weak<E>) -> Self {
        let entity = BaseEntity::new(kind, options);
        let parent = ValueState::with_eq(parent, &entity.entity_pipe("parent"), Weak::ptr_eq);
        let selected = ValueState::new(false, &entity.entity_pipe("selected"));
        let hovered = ValueState::new(false, &entity.entity_pipe("hovered"));
        let painted = ValueState::keyed(false, &entity.entity_pipe("painted"));

        Self {
            entity,
            parent,
            selected,
            hovered,
            painted,
        }
    }

    pub fn entity(&self) -> &BaseEntity {
        &self.entity
    }

    /// Shorthand for [`BaseEntity::entity_pipe`].
    pub fn pipe(&self, event: &str) -> Pipe {
        self.entity.entity_pipe(event)
    }

    pub fn parent(&self) -> Option<Rc<E>> {
        self.parent.with(Weak::upgrade)
    }

    /// The raw parent reference; does not require the parent to be alive.
    pub(crate) fn parent_weak(&self) -> Weak<E> {
        self.parent.get()
    }

    pub(crate) fn set_parent_weak(&self, parent: Weak<E>) {
        self.parent.set(parent);
    }

    fn destroy(&self) -> bool {
        self.entity.destroy()
    }
}

impl<E: 'static> fmt::Debug for BaseModel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseModel")
            .field("entity", &self.entity)
            .field("has_parent", &self.parent().is_some())
            .field("selected", &self.selected.get())
            .field("hovered", &self.hovered.get())
            .field("painted", &self.painted.get())
            .finish()
    }
}

/// An entity with parent, selection, hover and paint state.
///
/// Implementors only provide [`Model::model`] and [`Model::handle`]; the
/// state accessors forward to the embedded [`BaseModel`].
pub trait Model: Entity {
    type Parent: 'static;

    fn model(&self) -> &BaseModel<Self::Parent>;

    /// A shared handle to this model, or `None` while it is being dropped.
    fn handle(&self) -> Option<ModelRef>;

    fn parent(&self) -> Option<Rc<Self::Parent>> {
        self.model().parent()
    }

    fn set_parent(&self, parent: &Rc<Self::Parent>) {
        self.model().set_parent_weak(Rc::downgrade(parent));
    }

    fn clear_parent(&self) {
        self.model().set_parent_weak(Weak::new());
    }

    fn subscribe_parent(
        &self,
        mut next: impl FnMut(&ParentChangeEvent<Self::Parent>) + 'static,
    ) -> Subscription {
        let child = self.id();
        self.model().parent.subscribe(move |parent| {
            next(&ParentChangeEvent {
                child,
                parent: parent.upgrade(),
            })
        })
    }

    fn is_selected(&self) -> bool {
        self.model().selected.get()
    }

    fn set_selected(&self, selected: bool) {
        self.model().selected.set(selected);
    }

    fn select_selected(&self, next: impl FnMut(&bool) + 'static) -> Subscription {
        self.model().selected.subscribe(next)
    }

    fn selection_changes(&self, next: impl FnMut(&SelectionEvent) + 'static) -> Subscription {
        let (id, kind) = (self.id(), self.kind());
        self.model().selected.select(
            move |selected| SelectionEvent {
                id,
                kind,
                selected: *selected,
            },
            next,
        )
    }

    fn is_hovered(&self) -> bool {
        self.model().hovered.get()
    }

    fn set_hovered(&self, hovered: bool) {
        self.model().hovered.set(hovered);
    }

    fn select_hovered(&self, next: impl FnMut(&bool) + 'static) -> Subscription {
        self.model().hovered.subscribe(next)
    }

    fn is_painted(&self) -> bool {
        self.model().painted.get()
    }

    fn painted(&self) -> PaintedEvent {
        PaintedEvent {
            id: self.id(),
            kind: self.kind(),
            is_painted: self.is_painted(),
        }
    }

    /// Records whether the entity has been rendered. Every call notifies.
    fn set_painted(&self, painted: bool) {
        self.model().painted.set(painted);
    }

    fn paint_changes(&self, mut next: impl FnMut(&PaintedEvent) + 'static) -> Subscription {
        let (id, kind) = (self.id(), self.kind());
        self.model().painted.subscribe(move |painted| {
            next(&PaintedEvent {
                id,
                kind,
                is_painted: *painted,
            })
        })
    }

    /// Entities to treat as selected when this model is part of a selection.
    fn selected_entities(&self) -> Vec<ModelRef> {
        if !self.is_selected() {
            return Vec::new();
        }
        self.handle().into_iter().collect()
    }
}

/// Compares optional shared handles by identity.
pub(crate) fn same_rc<T>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Compares sequences of shared handles element-wise by identity.
pub(crate) fn same_rcs<T>(a: &Vec<Rc<T>>, b: &Vec<Rc<T>>) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| Rc::ptr_eq(a, b))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn test_extras_identity_equality() {
        let a = Extras::new(3_u8);
        let b = Extras::new(3_u8);

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(Extras::default(), Extras::default());
        assert_eq!(a.downcast_ref::<u8>(), Some(&3));
        assert!(a.downcast::<String>().is_none());
    }

    #[test]
    fn test_painted_notifies_every_set() {
        let point = PointModel::new(PointOptions::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let _subscription = point.paint_changes(move |event| sink.borrow_mut().push(event.is_painted));

        point.set_painted(true);
        point.set_painted(true);

        assert_eq!(*events.borrow(), vec![false, true, true]);
        assert!(point.painted().is_painted);
    }

    #[test]
    fn test_selection_changes_deduplicate() {
        let point = PointModel::new(PointOptions::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let _subscription = point.selection_changes(move |event| sink.borrow_mut().push(*event));

        point.set_selected(true);
        point.set_selected(true);
        point.set_selected(false);

        let flags: Vec<bool> = events.borrow().iter().map(|event| event.selected).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert!(events.borrow().iter().all(|event| event.id == point.id()));
    }

    #[test]
    fn test_base_selected_entities() {
        let point = PointModel::new(PointOptions::default());
        assert!(point.selected_entities().is_empty());

        point.set_selected(true);
        assert_eq!(point.selected_entities(), vec![ModelRef::Point(Rc::clone(&point))]);
    }

    #[test]
    fn test_parent_is_weak() {
        let link = LinkModel::new(LinkOptions::default());
        let label = LabelModel::new(LabelOptions::default());
        label.set_parent(&link);
        assert!(label.parent().is_some_and(|parent| Rc::ptr_eq(&parent, &link)));

        drop(link);
        assert!(label.parent().is_none());
    }

    #[test]
    fn test_subscribe_parent_reports_changes() {
        let first = LinkModel::new(LinkOptions::default());
        let second = LinkModel::new(LinkOptions::default());
        let label = LabelModel::new(LabelOptions::default());
        let parents = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&parents);
        let _subscription = label.subscribe_parent(move |event| {
            sink.borrow_mut().push(event.parent.as_ref().map(|parent| parent.id()))
        });

        label.set_parent(&first);
        label.set_parent(&first);
        label.set_parent(&second);
        label.clear_parent();

        assert_eq!(
            *parents.borrow(),
            vec![None, Some(first.id()), Some(second.id()), None]
        );
    }
}
