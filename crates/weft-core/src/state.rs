//! Observable state containers.
//!
//! All model state lives in two container kinds:
//!
//! - [`ValueState`] - a single value with change notification
//! - [`EntityState`] - an insertion-ordered, id-keyed collection of entities
//!
//! Both deliver notifications synchronously: a mutator returns only after
//! every subscriber callback has run. Subscribers receive the current value
//! as soon as they subscribe (replay-of-one). Containers are built from a
//! [`Pipe`], which ties their channel to the owning entity: when the entity
//! is destroyed every channel completes and all subscriptions are revoked.
//!
//! # Example
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use weft_core::state::{Pipe, ValueState};
//!
//! let pipe = Pipe::detached("example.count");
//! let count = ValueState::new(1, &pipe);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let _subscription = count.subscribe(move |value| sink.borrow_mut().push(*value));
//!
//! count.set(2);
//! count.set(2); // unchanged, no notification
//! assert_eq!(*seen.borrow(), vec![1, 2]);
//! ```

mod channel;
mod entity_state;
mod value_state;

pub use channel::{Pipe, Subscription};
pub use entity_state::EntityState;
pub use value_state::ValueState;

pub(crate) use channel::Lifecycle;
