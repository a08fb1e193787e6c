// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Message variants the runtime itself relies on.
//!
//! Every component pre-registers handlers for both of these at creation
//! time, so they are deliverable to any component without user setup.

use crate::{message::Callback, timer::manager::TimerJobId};

crate::define_message! {
	/// Marshals a timer expiration onto the owning component's thread.
	///
	/// Posted by the timer facade's scheduler-side callback; the built-in
	/// handler invokes `callback` on the component's loop.
	pub struct TimeoutMessage {
		/// Id of the timer job that fired.
		pub timer_id: TimerJobId,
		/// User callback to run on the component thread.
		pub callback: Callback,
	}
}

crate::define_message! {
	/// Marshals an arbitrary callable onto a component's thread.
	///
	/// The "run this on component X" vehicle; see
	/// [`Component::post_callback`](crate::component::Component::post_callback).
	pub struct CallbackMessage {
		/// Callable to run on the component thread.
		pub callback: Callback,
	}
}
