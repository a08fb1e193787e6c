// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Mapping from message type identity to handler.
//!
//! Writers may be any thread; the reader is the component loop. The lookup
//! path clones the handler out under the read lock and releases it before
//! invocation, so a running handler never blocks re-registration and a
//! handler that re-registers itself cannot deadlock on the registry.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::message::{MessagePtr, MessageType};

/// A callable invoked by a component's loop for messages of one type.
pub type HandlerFn = Arc<dyn Fn(MessagePtr) + Send + Sync>;

/// Object form of a message handler.
///
/// Registered via [`HandlerRegistry::register_handler`]; the registry wraps
/// the object in a closure deferring to [`MessageHandler::on_message`].
pub trait MessageHandler: Send + Sync + 'static {
	/// Handle one message on the component thread.
	fn on_message(&self, msg: MessagePtr);
}

/// Registry of message handlers, keyed by [`MessageType`].
///
/// Keys are unique; registering twice for the same type keeps the latest
/// handler.
pub struct HandlerRegistry {
	handlers: RwLock<HashMap<MessageType, HandlerFn>>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self {
			handlers: RwLock::new(HashMap::new()),
		}
	}

	/// Install or replace the handler for `msg_type`.
	pub fn register<F>(&self, msg_type: MessageType, handler: F)
	where
		F: Fn(MessagePtr) + Send + Sync + 'static,
	{
		self.handlers.write().insert(msg_type, Arc::new(handler));
	}

	/// Install or replace the handler for `msg_type`, object form.
	pub fn register_handler(&self, msg_type: MessageType, handler: Arc<dyn MessageHandler>) {
		self.register(msg_type, move |msg| handler.on_message(msg));
	}

	/// The current handler for `msg_type`, if any.
	///
	/// Returns a clone so the lock is released before the call.
	pub fn lookup(&self, msg_type: MessageType) -> Option<HandlerFn> {
		self.handlers.read().get(&msg_type).cloned()
	}
}

impl Default for HandlerRegistry {
	fn default() -> Self {
		Self::new()
	}
}
