//! Single-value observable container.

use std::{cell::RefCell, fmt, rc::Rc};

use log::trace;

use super::channel::{Channel, Pipe, Subscription};

/// A single mutable value with change notification.
///
/// # Equality
///
/// [`ValueState::set`] only notifies when the new value differs from the
/// current one. The comparison is chosen at construction:
///
/// - [`ValueState::new`] uses `PartialEq`
/// - [`ValueState::with_eq`] takes a custom comparator (e.g. identity of
///   entity handles)
/// - [`ValueState::keyed`] never considers two values equal, so every `set`
///   notifies. Use it for map-like values whose contents change without the
///   container being replaced.
///
/// # Re-entrancy
///
/// Subscribers may read the state while being notified. A subscriber that
/// synchronously sets the same state again is a hazard: the nested
/// notification is not delivered to callbacks that are still running.
pub struct ValueState<T: 'static> {
    value: RefCell<T>,
    eq: fn(&T, &T) -> bool,
    channel: Rc<Channel<T>>,
}

fn never_equal<T>(_: &T, _: &T) -> bool {
    false
}

impl<T: Clone + 'static> ValueState<T> {
    /// Creates a state that compares values with `PartialEq`.
    pub fn new(value: T, pipe: &Pipe) -> Self
    where
        T: PartialEq,
    {
        Self::with_eq(value, pipe, <T as PartialEq>::eq)
    }

    /// Creates a state with a custom equality.
    pub fn with_eq(value: T, pipe: &Pipe, eq: fn(&T, &T) -> bool) -> Self {
        Self {
            value: RefCell::new(value),
            eq,
            channel: Channel::open(pipe),
        }
    }

    /// Creates a state whose every `set` notifies.
    pub fn keyed(value: T, pipe: &Pipe) -> Self {
        Self::with_eq(value, pipe, never_equal::<T>)
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Runs `f` with a reference to the current value.
    ///
    /// The state must not be set from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Stores `value` and notifies subscribers if it changed.
    ///
    /// Returns whether a notification was emitted. After the owning entity is
    /// destroyed the value is still stored but nobody is notified.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let current = self.value.borrow();
            !(self.eq)(&current, &value)
        };
        if !changed {
            return false;
        }

        *self.value.borrow_mut() = value.clone();
        if self.channel.is_closed() {
            trace!(channel = self.label(); "Value stored on completed channel");
            return false;
        }
        self.channel.emit(&value);
        true
    }

    /// Sets the value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.with(f);
        self.set(next)
    }

    /// Subscribes to the raw stream: the current value is replayed
    /// immediately, then every change is delivered.
    pub fn subscribe(&self, next: impl FnMut(&T) + 'static) -> Subscription {
        let current = self.get();
        self.channel.subscribe(&current, next)
    }

    /// Subscribes to a projection of the value.
    ///
    /// The projected value is replayed immediately, and afterwards only
    /// delivered when it differs from the previously delivered projection.
    pub fn select<R, P, F>(&self, project: P, mut next: F) -> Subscription
    where
        R: PartialEq + 'static,
        P: Fn(&T) -> R + 'static,
        F: FnMut(&R) + 'static,
    {
        let mut last: Option<R> = None;
        self.subscribe(move |value| {
            let projected = project(value);
            if last.as_ref() != Some(&projected) {
                next(&projected);
                last = Some(projected);
            }
        })
    }

    /// Registers a hook that runs once when the owning entity is destroyed.
    pub fn on_complete(&self, hook: impl FnOnce() + 'static) -> Subscription {
        self.channel.on_complete(hook)
    }

    /// Returns `true` once the owning entity has been destroyed.
    pub fn is_completed(&self) -> bool {
        self.channel.is_closed()
    }

    fn label(&self) -> &str {
        self.channel.label()
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ValueState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueState")
            .field("value", &*self.value.borrow())
            .field("completed", &self.channel.is_closed())
            .finish()
    }
}
