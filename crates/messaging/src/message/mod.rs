// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Typed message identity and the message carrier.
//!
//! Dispatch is keyed by an explicit [`MessageType`] token rather than
//! language RTTI: every message variant carries a process-stable
//! `&'static str` derived from its module path and type name. The
//! [`define_message!`](crate::define_message) macro generates the token
//! together with the [`Message`] and [`TypedMessage`] implementations.
//!
//! Messages travel as [`MessagePtr`] (`Arc<dyn Message>`): producers
//! create, the queue holds one strong reference, the handler sees one
//! strong reference. `Any` is used only for payload downcast inside
//! handlers, never for dispatch.

use std::{
	any::Any,
	fmt::{self, Display, Formatter},
	sync::Arc,
};

mod builtin;
pub mod r#macro;

pub use builtin::{CallbackMessage, TimeoutMessage};

/// A shared callable marshalled between threads inside a message.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Process-stable identifier distinguishing concrete message variants.
///
/// Two messages of the same concrete variant share the same `MessageType`.
/// Obtainable statically via [`MessageType::of`] and from a live message
/// via [`Message::message_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType(&'static str);

impl MessageType {
	/// Create a message type from a stable token.
	///
	/// The token must be unique within the process; `define_message!`
	/// guarantees this by deriving it from the declaring module path.
	pub const fn named(name: &'static str) -> Self {
		Self(name)
	}

	/// The message type of a concrete variant.
	pub fn of<M: TypedMessage>() -> Self {
		M::TYPE
	}

	/// The stable token backing this type.
	pub const fn name(&self) -> &'static str {
		self.0
	}
}

impl Display for MessageType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.0)
	}
}

/// An immutable, type-tagged data carrier delivered between components.
pub trait Message: Any + Send + Sync + 'static {
	/// The type identity of this message instance.
	fn message_type(&self) -> MessageType;

	/// For downcasting to the concrete variant.
	fn as_any(&self) -> &dyn Any;
}

/// Shared ownership handle to a posted message.
pub type MessagePtr = Arc<dyn Message>;

/// Static descriptor of a concrete message variant.
pub trait TypedMessage: Message {
	/// The variant's process-stable type identity.
	const TYPE: MessageType;
}

impl dyn Message {
	/// Downcast to a concrete message variant.
	pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
		self.as_any().downcast_ref::<M>()
	}

	/// Whether this message is of the given concrete variant.
	pub fn is<M: TypedMessage>(&self) -> bool {
		self.message_type() == MessageType::of::<M>()
	}
}
