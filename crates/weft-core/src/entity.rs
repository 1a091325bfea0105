//! Entity identity and lifecycle.
//!
//! Every graph object embeds a [`BaseEntity`] and implements [`Entity`].
//! The base entity owns the lifecycle that all of the object's state
//! containers are attached to: containers are built from
//! [`BaseEntity::entity_pipe`], and [`BaseEntity::destroy`] completes all
//! of them at once.

use std::{fmt, rc::Rc};

use log::debug;

use crate::{
    identifier::Id,
    state::{Lifecycle, Pipe, Subscription, ValueState},
};

/// Namespace assigned to entities that do not specify one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The concrete kind of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Link,
    Port,
    Point,
    Label,
    Diagram,
}

impl EntityKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Link => "link",
            Self::Port => "port",
            Self::Point => "point",
            Self::Label => "label",
            Self::Diagram => "diagram",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options shared by every entity constructor.
///
/// # Examples
///
/// ```
/// # use weft_core::{entity::EntityOptions, identifier::Id};
/// let options = EntityOptions::default()
///     .with_namespace("flow")
///     .with_locked(true)
///     .with_id(Id::new("start"));
///
/// assert_eq!(options.namespace(), "flow");
/// assert!(options.locked());
/// assert_eq!(options.id(), Some(Id::new("start")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOptions {
    id: Option<Id>,
    namespace: String,
    locked: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            id: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            locked: false,
        }
    }
}

impl EntityOptions {
    /// Uses a caller-supplied id instead of a generated one.
    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn id(&self) -> Option<Id> {
        self.id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn locked(&self) -> bool {
        self.locked
    }
}

/// Identity, lock state, and lifecycle of an entity.
pub struct BaseEntity {
    id: Id,
    kind: EntityKind,
    namespace: String,
    lifecycle: Rc<Lifecycle>,
    locked: ValueState<bool>,
}

impl BaseEntity {
    /// Creates a base entity. A fresh id is generated unless the options
    /// carry one.
    pub fn new(kind: EntityKind, options: &EntityOptions) -> Self {
        let id = options.id.unwrap_or_else(Id::generate);
        let lifecycle = Rc::new(Lifecycle::default());
        let locked = ValueState::new(
            options.locked,
            &Pipe::new(format!("{kind}.locked"), Rc::clone(&lifecycle)),
        );

        Self {
            id,
            kind,
            namespace: options.namespace.clone(),
            lifecycle,
            locked,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns a pipe for building state containers scoped to this entity.
    ///
    /// `event` names the container in log output (`"node.coords"`).
    pub fn entity_pipe(&self, event: &str) -> Pipe {
        Pipe::new(format!("{}.{event}", self.kind), Rc::clone(&self.lifecycle))
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.set(locked);
    }

    /// Subscribes to lock changes; the current state is replayed.
    pub fn subscribe_locked(&self, next: impl FnMut(&bool) + 'static) -> Subscription {
        self.locked.subscribe(next)
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.is_ended()
    }

    /// Marks the entity destroyed and completes every channel built from its
    /// pipes.
    ///
    /// Returns `false` if the entity was already destroyed.
    pub fn destroy(&self) -> bool {
        if !self.lifecycle.end() {
            return false;
        }
        debug!(kind:% = self.kind, id:% = self.id; "Entity destroyed");
        true
    }
}

impl fmt::Debug for BaseEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseEntity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .field("locked", &self.is_locked())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Common interface of identity-bearing, destroyable objects.
pub trait Entity {
    fn base(&self) -> &BaseEntity;

    /// Tears the entity down, cascading into everything it owns.
    fn destroy(&self);

    fn id(&self) -> Id {
        self.base().id()
    }

    fn kind(&self) -> EntityKind {
        self.base().kind()
    }

    fn namespace(&self) -> &str {
        self.base().namespace()
    }

    fn is_locked(&self) -> bool {
        self.base().is_locked()
    }

    /// Sets the lock flag. Entities that own children propagate it.
    fn set_locked(&self, locked: bool) {
        self.base().set_locked(locked);
    }

    fn is_destroyed(&self) -> bool {
        self.base().is_destroyed()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn test_defaults() {
        let base = BaseEntity::new(EntityKind::Node, &EntityOptions::default());

        assert_eq!(base.kind(), EntityKind::Node);
        assert_eq!(base.namespace(), DEFAULT_NAMESPACE);
        assert!(!base.is_locked());
        assert!(!base.is_destroyed());
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = BaseEntity::new(EntityKind::Port, &EntityOptions::default());
        let b = BaseEntity::new(EntityKind::Port, &EntityOptions::default());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_caller_supplied_id() {
        let options = EntityOptions::default().with_id(Id::new("n1"));
        let base = BaseEntity::new(EntityKind::Node, &options);
        assert_eq!(base.id(), "n1");
    }

    #[test]
    fn test_entity_pipe_label() {
        let base = BaseEntity::new(EntityKind::Link, &EntityOptions::default());
        assert_eq!(base.entity_pipe("points").label(), "link.points");
    }

    #[test]
    fn test_destroy_completes_scoped_state() {
        let base = BaseEntity::new(EntityKind::Node, &EntityOptions::default());
        let coords = ValueState::new((0, 0), &base.entity_pipe("coords"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = coords.subscribe(move |value| sink.borrow_mut().push(*value));

        assert!(base.destroy());
        assert!(!base.destroy());

        assert!(base.is_destroyed());
        assert!(coords.is_completed());
        assert!(!subscription.is_active());
        coords.set((1, 1));
        assert_eq!(*seen.borrow(), vec![(0, 0)]);
    }

    #[test]
    fn test_state_built_after_destroy_is_completed() {
        let base = BaseEntity::new(EntityKind::Label, &EntityOptions::default());
        base.destroy();

        let text = ValueState::new(String::new(), &base.entity_pipe("text"));
        assert!(text.is_completed());
    }

    #[test]
    fn test_locked_notifies_changes_only() {
        let base = BaseEntity::new(EntityKind::Point, &EntityOptions::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _subscription = base.subscribe_locked(move |locked| sink.borrow_mut().push(*locked));

        base.set_locked(true);
        base.set_locked(true);
        base.set_locked(false);

        assert_eq!(*seen.borrow(), vec![false, true, false]);
    }
}
