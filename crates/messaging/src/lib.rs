// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Component-oriented message-passing runtime.
//!
//! Applications are built as a set of long-lived *components*, each owning a
//! private FIFO message queue and, in async mode, a dedicated OS thread.
//! Components communicate exclusively by posting messages; time-driven work
//! is scheduled through per-component timers whose expirations are delivered
//! back into the owning component's queue.
//!
//! # Execution Model
//!
//! - Each component runs a single-consumer message loop, either on its own
//!   OS thread ([`LaunchMode::Async`]) or on the caller's thread
//!   ([`LaunchMode::Sync`]).
//! - Messages are dispatched by an explicit [`MessageType`] token looked up
//!   in a per-component handler registry. Handler execution is strictly
//!   serial per component.
//! - A handler panic is caught and logged; the loop continues with the next
//!   message. A single misbehaving handler cannot kill its component.
//! - [`Timer`] callbacks always execute on the thread of the component that
//!   started the timer, never on the timer manager's scheduler thread.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use reifydb_messaging::{Component, LaunchMode, define_message};
//!
//! define_message! {
//! 	pub struct Greet {
//! 		pub name: String,
//! 	}
//! }
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let component = Component::create();
//!
//! let sink = seen.clone();
//! component.handle::<Greet, _>(move |greet| {
//! 	sink.lock().unwrap().push(greet.name.clone());
//! });
//!
//! component.run(LaunchMode::Async);
//! component.post(Greet::new("world".into()));
//! component.stop();
//!
//! assert_eq!(*seen.lock().unwrap(), ["world"]);
//! ```

pub mod component;
pub mod message;
pub mod queue;
pub mod registry;
pub mod timer;

pub use component::{Component, ComponentConfig, ComponentRef, LaunchMode};
pub use message::{Callback, CallbackMessage, Message, MessagePtr, MessageType, TimeoutMessage, TypedMessage};
pub use queue::{MessageQueue, QueueError};
pub use registry::{HandlerFn, HandlerRegistry, MessageHandler};
pub use timer::{
	Timer,
	manager::{TimerJobId, TimerManager},
};
