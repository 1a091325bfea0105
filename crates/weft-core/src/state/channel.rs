//! Notification channels, subscriptions and entity-scoped pipes.

use std::{
    cell::{Cell, RefCell},
    fmt, mem,
    rc::{Rc, Weak},
};

use log::{trace, warn};

type Listener<T> = Rc<RefCell<dyn FnMut(&T)>>;
type CompleteHook = Box<dyn FnOnce()>;

/// Type-erased view of a channel, used by subscriptions and lifecycles.
pub(crate) trait ChannelHandle {
    fn detach(&self, key: u64);
    fn is_listening(&self, key: u64) -> bool;
    fn complete(&self);
}

/// Tracks the channels of one entity so they can be completed together.
#[derive(Default)]
pub(crate) struct Lifecycle {
    ended: Cell<bool>,
    channels: RefCell<Vec<Weak<dyn ChannelHandle>>>,
}

impl Lifecycle {
    fn register(&self, handle: Weak<dyn ChannelHandle>) {
        if self.ended.get() {
            if let Some(channel) = handle.upgrade() {
                channel.complete();
            }
            return;
        }

        let mut channels = self.channels.borrow_mut();
        channels.retain(|channel| channel.strong_count() > 0);
        channels.push(handle);
    }

    /// Completes every registered channel. Returns `false` if already ended.
    pub(crate) fn end(&self) -> bool {
        if self.ended.replace(true) {
            return false;
        }

        let channels = mem::take(&mut *self.channels.borrow_mut());
        for channel in channels.iter().filter_map(Weak::upgrade) {
            channel.complete();
        }
        true
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.ended.get()
    }
}

/// Factory for entity-scoped channels.
///
/// A pipe is obtained from [`BaseEntity::entity_pipe`](crate::entity::BaseEntity::entity_pipe);
/// every container built from it completes when that entity is destroyed.
/// [`Pipe::detached`] creates a pipe that is not owned by any entity.
#[derive(Clone)]
pub struct Pipe {
    label: String,
    lifecycle: Rc<Lifecycle>,
}

impl Pipe {
    pub(crate) fn new(label: String, lifecycle: Rc<Lifecycle>) -> Self {
        Self { label, lifecycle }
    }

    /// Creates a pipe whose channels only complete when they are dropped.
    pub fn detached(label: impl Into<String>) -> Self {
        Self::new(label.into(), Rc::default())
    }

    /// Label used when logging notifications of channels built from this pipe.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` once the owning entity has been destroyed.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_ended()
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Synchronous multicast channel with completion.
pub(crate) struct Channel<T: 'static> {
    label: String,
    listeners: RefCell<Vec<(u64, Listener<T>)>>,
    hooks: RefCell<Vec<(u64, CompleteHook)>>,
    closed: Cell<bool>,
    next_key: Cell<u64>,
}

impl<T: 'static> Channel<T> {
    pub(crate) fn open(pipe: &Pipe) -> Rc<Self> {
        let channel = Rc::new(Self {
            label: pipe.label.clone(),
            listeners: RefCell::new(Vec::new()),
            hooks: RefCell::new(Vec::new()),
            closed: Cell::new(false),
            next_key: Cell::new(0),
        });
        let handle: Rc<dyn ChannelHandle> = channel.clone();
        pipe.lifecycle.register(Rc::downgrade(&handle));
        channel
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    /// Registers `next` and immediately replays `current` to it.
    pub(crate) fn subscribe(
        self: &Rc<Self>,
        current: &T,
        next: impl FnMut(&T) + 'static,
    ) -> Subscription {
        if self.closed.get() {
            trace!(channel = self.label.as_str(); "Subscribe on completed channel ignored");
            return Subscription::inert();
        }

        let key = self.allocate_key();
        let listener: Listener<T> = Rc::new(RefCell::new(next));
        self.listeners.borrow_mut().push((key, Rc::clone(&listener)));
        self.deliver(&listener, current);
        self.subscription(key)
    }

    /// Registers a hook that runs once when the channel completes.
    ///
    /// If the channel has already completed the hook runs immediately.
    pub(crate) fn on_complete(self: &Rc<Self>, hook: impl FnOnce() + 'static) -> Subscription {
        if self.closed.get() {
            hook();
            return Subscription::inert();
        }

        let key = self.allocate_key();
        self.hooks.borrow_mut().push((key, Box::new(hook)));
        self.subscription(key)
    }

    /// Delivers `value` to every current listener, in subscription order.
    pub(crate) fn emit(&self, value: &T) {
        if self.closed.get() {
            return;
        }

        let listeners: Vec<Listener<T>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        trace!(channel = self.label.as_str(), listeners = listeners.len(); "Notifying subscribers");
        for listener in &listeners {
            self.deliver(listener, value);
        }
    }

    fn deliver(&self, listener: &Listener<T>, value: &T) {
        match listener.try_borrow_mut() {
            Ok(mut callback) => (&mut *callback)(value),
            Err(_) => {
                warn!(channel = self.label.as_str(); "Dropping re-entrant notification");
            }
        }
    }

    fn allocate_key(&self) -> u64 {
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        key
    }

    fn subscription(self: &Rc<Self>, key: u64) -> Subscription {
        let handle: Rc<dyn ChannelHandle> = self.clone();
        Subscription {
            target: Some((Rc::downgrade(&handle), key)),
        }
    }
}

impl<T: 'static> ChannelHandle for Channel<T> {
    fn detach(&self, key: u64) {
        self.listeners.borrow_mut().retain(|(k, _)| *k != key);
        self.hooks.borrow_mut().retain(|(k, _)| *k != key);
    }

    fn is_listening(&self, key: u64) -> bool {
        !self.closed.get()
            && (self.listeners.borrow().iter().any(|(k, _)| *k == key)
                || self.hooks.borrow().iter().any(|(k, _)| *k == key))
    }

    fn complete(&self) {
        if self.closed.replace(true) {
            return;
        }

        trace!(channel = self.label.as_str(); "Channel completed");
        let listeners = mem::take(&mut *self.listeners.borrow_mut());
        drop(listeners);

        let hooks = mem::take(&mut *self.hooks.borrow_mut());
        for (_, hook) in hooks {
            hook();
        }
    }
}

/// Handle to a registered callback.
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) removes the
/// callback. Use [`Subscription::detach`] to keep the callback for as long as
/// the channel lives. When the owning entity is destroyed every subscription
/// becomes inactive.
#[must_use = "dropping a `Subscription` unsubscribes its callback"]
pub struct Subscription {
    target: Option<(Weak<dyn ChannelHandle>, u64)>,
}

impl Subscription {
    pub(crate) fn inert() -> Self {
        Self { target: None }
    }

    /// Returns `true` while the callback is registered on an open channel.
    pub fn is_active(&self) -> bool {
        self.target
            .as_ref()
            .and_then(|(channel, key)| channel.upgrade().map(|channel| channel.is_listening(*key)))
            .unwrap_or(false)
    }

    /// Removes the callback.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Releases the handle without removing the callback.
    pub fn detach(mut self) {
        self.target = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some((channel, key)) = self.target.take() {
            if let Some(channel) = channel.upgrade() {
                channel.detach(key);
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
