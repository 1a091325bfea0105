//! Keyed, insertion-ordered collection of entities.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;
use log::{debug, warn};

use super::channel::{Channel, Pipe, Subscription};
use crate::{entity::Entity, error::StateError, identifier::Id};

/// A mapping from [`Id`] to entity with an insertion-ordered array view.
///
/// Every structural change (add, remove, destroy) recomputes the array and
/// delivers it to the subscribers of [`EntityState::subscribe_array`].
pub struct EntityState<T: Entity + 'static> {
    label: String,
    entities: RefCell<IndexMap<Id, Rc<T>>>,
    channel: Rc<Channel<Vec<Rc<T>>>>,
}

impl<T: Entity + 'static> EntityState<T> {
    pub fn new(pipe: &Pipe) -> Self {
        Self {
            label: pipe.label().to_string(),
            entities: RefCell::new(IndexMap::new()),
            channel: Channel::open(pipe),
        }
    }

    /// Inserts `entity` keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateId`] if an entity with the same id is
    /// already present. The collection is left unchanged.
    pub fn add(&self, entity: Rc<T>) -> Result<Rc<T>, StateError> {
        let id = entity.id();
        {
            let mut entities = self.entities.borrow_mut();
            if entities.contains_key(&id) {
                warn!(collection = self.label.as_str(), id:% = id; "Entity already exists, ignoring add");
                return Err(StateError::DuplicateId {
                    id,
                    collection: self.label.clone(),
                });
            }
            entities.insert(id, Rc::clone(&entity));
        }

        debug!(collection = self.label.as_str(), id:% = id; "Entity added");
        self.notify();
        Ok(entity)
    }

    /// Removes the entity with `id`. Returns `None` if it was absent.
    ///
    /// The removed entity is not destroyed.
    pub fn remove(&self, id: Id) -> Option<Rc<T>> {
        let removed = self.entities.borrow_mut().shift_remove(&id)?;
        debug!(collection = self.label.as_str(), id:% = id; "Entity removed");
        self.notify();
        Some(removed)
    }

    pub fn get(&self, id: Id) -> Option<Rc<T>> {
        self.entities.borrow().get(&id).cloned()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entities.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.borrow().is_empty()
    }

    /// Snapshot of the members in insertion order.
    pub fn array(&self) -> Vec<Rc<T>> {
        self.entities.borrow().values().cloned().collect()
    }

    /// Ids of the members in insertion order.
    pub fn ids(&self) -> Vec<Id> {
        self.entities.borrow().keys().copied().collect()
    }

    /// Subscribes to the array view. The current array is replayed
    /// immediately.
    pub fn subscribe_array(&self, mut next: impl FnMut(&[Rc<T>]) + 'static) -> Subscription {
        let current = self.array();
        self.channel.subscribe(&current, move |array: &Vec<Rc<T>>| next(array.as_slice()))
    }

    /// Destroys every member in insertion order, then empties the collection.
    pub fn destroy(&self) {
        let members = self.array();
        if members.is_empty() {
            return;
        }

        debug!(collection = self.label.as_str(), count = members.len(); "Destroying all entities");
        for entity in &members {
            entity.destroy();
        }
        self.entities.borrow_mut().clear();
        self.notify();
    }

    fn notify(&self) {
        let array = self.array();
        self.channel.emit(&array);
    }
}

impl<T: Entity + 'static> fmt::Debug for EntityState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityState")
            .field("label", &self.label)
            .field("ids", &self.ids())
            .finish()
    }
}
