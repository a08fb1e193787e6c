// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Declaration macro for message variants.

/// Declares a message struct together with its type identity.
///
/// Generates the struct, a field-order `new` constructor, and the
/// [`Message`](crate::message::Message) / [`TypedMessage`](crate::message::TypedMessage)
/// implementations. The [`MessageType`](crate::message::MessageType) token is
/// derived from the declaring module path and the type name, which keeps it
/// process-stable and unique without relying on runtime type ids.
///
/// # Example
///
/// ```
/// reifydb_messaging::define_message! {
/// 	pub struct OrderPlaced {
/// 		pub order_id: u64,
/// 	}
/// }
///
/// let placed = OrderPlaced::new(42);
/// assert_eq!(placed.order_id, 42);
/// ```
#[macro_export]
macro_rules! define_message {
	(
		$(#[$meta:meta])*
		$vis:vis struct $name:ident {
			$(
				$(#[$field_meta:meta])*
				$field_vis:vis $field:ident : $field_ty:ty
			),* $(,)?
		}
	) => {
		$(#[$meta])*
		$vis struct $name {
			$(
				$(#[$field_meta])*
				$field_vis $field: $field_ty,
			)*
		}

		impl $name {
			$vis fn new($($field: $field_ty),*) -> Self {
				Self {
					$($field,)*
				}
			}
		}

		impl $crate::message::TypedMessage for $name {
			const TYPE: $crate::message::MessageType = $crate::message::MessageType::named(concat!(
				module_path!(),
				"::",
				stringify!($name)
			));
		}

		impl $crate::message::Message for $name {
			fn message_type(&self) -> $crate::message::MessageType {
				<Self as $crate::message::TypedMessage>::TYPE
			}

			fn as_any(&self) -> &dyn ::std::any::Any {
				self
			}
		}
	};
}
