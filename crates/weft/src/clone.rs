//! Identity-preserving deep cloning.
//!
//! Cloning a sub-graph must not duplicate entities that are reachable along
//! more than one path. A link between two ports of the same node is reached
//! once through each port, and both ports are reached again through the
//! link. A single [`CloneLookup`] is threaded through the whole traversal so
//! every original resolves to exactly one clone.
//!
//! # Protocol
//!
//! [`DeepClone::clone_with`] drives every clone:
//!
//! 1. Return the registered clone if the original was already visited.
//! 2. Create an unwired copy with a fresh id ([`DeepClone::create_clone`]).
//! 3. Register it before touching any children.
//! 4. Clone the children through the same lookup and wire them into the copy
//!    ([`DeepClone::do_clone`]).
//! 5. Copy the lock flag last, so locked originals clone cleanly.
//!
//! Ports hold their links weakly, so a cloned link is owned only by the
//! lookup until it joins a diagram. [`DeepClone::deep_clone`] therefore
//! returns a [`DeepCloned`] that keeps the lookup alongside the root clone.

use std::{any::Any, fmt, ops::Deref, rc::Rc};

use indexmap::IndexMap;
use log::{debug, info};

use weft_core::{entity::Entity, identifier::Id};

use crate::model::LinkModel;

/// Map from original entity id to its clone.
#[derive(Default)]
pub struct CloneLookup {
    clones: IndexMap<Id, Rc<dyn Any>>,
}

impl CloneLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the clone registered for `original`, if it is a `T`.
    pub fn get<T: Any>(&self, original: Id) -> Option<Rc<T>> {
        let clone = Rc::clone(self.clones.get(&original)?);
        clone.downcast::<T>().ok()
    }

    /// Registers `clone` as the copy of `original`.
    pub fn insert<T: Any>(&mut self, original: Id, clone: Rc<T>) {
        self.clones.insert(original, clone);
    }

    pub fn contains(&self, original: Id) -> bool {
        self.clones.contains_key(&original)
    }

    /// All registered clones of type `T`, in registration order.
    pub fn clones<T: Any>(&self) -> Vec<Rc<T>> {
        self.clones
            .values()
            .filter_map(|clone| Rc::clone(clone).downcast::<T>().ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }
}

impl fmt::Debug for CloneLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneLookup")
            .field("originals", &self.clones.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The result of [`DeepClone::deep_clone`]: the root clone together with
/// every entity cloned alongside it.
///
/// Dereferences to the root clone. Dropping it drops the cloned links that
/// nothing else owns; keep it, or take the links with
/// [`DeepCloned::into_parts`], until they are added to a diagram.
pub struct DeepCloned<T> {
    root: Rc<T>,
    lookup: CloneLookup,
}

impl<T> DeepCloned<T> {
    pub fn root(&self) -> &Rc<T> {
        &self.root
    }

    pub fn lookup(&self) -> &CloneLookup {
        &self.lookup
    }

    /// Links cloned within the sub-graph, in clone order.
    pub fn cloned_links(&self) -> Vec<Rc<LinkModel>> {
        self.lookup.clones::<LinkModel>()
    }

    pub fn into_parts(self) -> (Rc<T>, Vec<Rc<LinkModel>>) {
        let links = self.cloned_links();
        (self.root, links)
    }
}

impl<T> Deref for DeepCloned<T> {
    type Target = Rc<T>;

    fn deref(&self) -> &Rc<T> {
        &self.root
    }
}

impl<T: fmt::Debug> fmt::Debug for DeepCloned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepCloned")
            .field("root", &self.root)
            .field("lookup", &self.lookup)
            .finish()
    }
}

/// Deep cloning through a shared [`CloneLookup`].
pub trait DeepClone: Entity + Sized + 'static {
    /// Creates an unwired copy: fresh id, same values, no children.
    fn create_clone(&self) -> Rc<Self>;

    /// Clones the children of `self` through `lookup` and wires them into
    /// `clone`.
    fn do_clone(&self, lookup: &mut CloneLookup, clone: &Rc<Self>);

    /// Returns the clone of `self` within the traversal described by
    /// `lookup`, creating it on first visit.
    fn clone_with(&self, lookup: &mut CloneLookup) -> Rc<Self> {
        if let Some(existing) = lookup.get::<Self>(self.id()) {
            return existing;
        }

        let clone = self.create_clone();
        debug!(kind:% = self.kind(), original:% = self.id(), clone:% = clone.id(); "Cloning entity");
        lookup.insert(self.id(), Rc::clone(&clone));
        self.do_clone(lookup, &clone);
        clone.set_locked(self.is_locked());
        clone
    }

    /// Clones `self` and everything reachable from it with a fresh lookup.
    fn deep_clone(&self) -> DeepCloned<Self> {
        let mut lookup = CloneLookup::new();
        let root = self.clone_with(&mut lookup);
        info!(kind:% = self.kind(), original:% = self.id(), entities = lookup.len(); "Deep clone finished");
        DeepCloned { root, lookup }
    }
}
