// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Components and their message loops.
//!
//! A [`Component`] is a named, long-lived actor owning a private FIFO
//! queue, a handler registry, and a lazily created timer manager. In
//! [`LaunchMode::Async`] the loop runs on a dedicated OS thread named
//! after the component; in [`LaunchMode::Sync`] it runs on the caller's
//! thread until the queue closes.
//!
//! # Loop Contract
//!
//! - The thread-local *active component* binding is installed before the
//!   entry hook runs and restored when the loop returns.
//! - Handlers execute strictly serially; a handler panic is caught and
//!   logged and the loop continues with the next message.
//! - [`Component::stop`] shuts down the timer manager, closes the queue,
//!   and joins the worker thread -- unless called from the worker thread
//!   itself, in which case the loop simply drains and exits.

use std::{
	any::Any,
	cell::RefCell,
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc, Weak,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::{
	message::{CallbackMessage, Message, MessagePtr, MessageType, TimeoutMessage, TypedMessage},
	queue::{MessageQueue, QueueError},
	registry::{HandlerFn, HandlerRegistry, MessageHandler},
	timer::manager::TimerManager,
};

thread_local! {
	static ACTIVE_COMPONENT: RefCell<Weak<Component>> = RefCell::new(Weak::new());
}

/// How [`Component::run`] executes the message loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
	/// Run the loop on the calling thread until the queue closes.
	Sync,
	/// Spawn a dedicated worker thread for the loop.
	Async,
}

/// Weak ownership handle to a component.
///
/// Lets callbacks reference a component without extending its life.
pub type ComponentRef = Weak<Component>;

/// Construction-time settings for a component.
#[derive(Debug, Clone)]
pub struct ComponentConfig {
	/// Human-readable name; informational, also used as the worker thread name.
	pub name: String,
	/// Pending-message limit; `None` means unbounded.
	pub queue_capacity: Option<usize>,
}

impl Default for ComponentConfig {
	fn default() -> Self {
		Self {
			name: "component".into(),
			queue_capacity: None,
		}
	}
}

impl ComponentConfig {
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn queue_capacity(mut self, capacity: usize) -> Self {
		self.queue_capacity = Some(capacity);
		self
	}
}

/// State shared between the component handle and its message loop.
///
/// The loop holds this strongly but the component itself only weakly, so
/// dropping the last `Arc<Component>` can trigger `stop` while the loop
/// keeps a live queue to drain.
struct Shared {
	name: Mutex<String>,
	queue: MessageQueue,
	handlers: HandlerRegistry,
	timer_manager: Mutex<Option<Arc<TimerManager>>>,
}

/// A named, long-lived actor with a private FIFO and message loop.
pub struct Component {
	shared: Arc<Shared>,
	worker: Mutex<Option<JoinHandle<()>>>,
	launched: AtomicBool,
	self_ref: ComponentRef,
}

impl Component {
	/// Create a component with default configuration.
	pub fn create() -> Arc<Self> {
		Self::with_config(ComponentConfig::default())
	}

	/// Create a component with the given configuration.
	///
	/// Handlers for [`TimeoutMessage`] and [`CallbackMessage`] are
	/// pre-registered so timers and cross-thread callbacks work without
	/// user setup.
	pub fn with_config(config: ComponentConfig) -> Arc<Self> {
		let queue = match config.queue_capacity {
			Some(capacity) => MessageQueue::bounded(capacity),
			None => MessageQueue::unbounded(),
		};

		let component = Arc::new_cyclic(|self_ref: &ComponentRef| Self {
			shared: Arc::new(Shared {
				name: Mutex::new(config.name),
				queue,
				handlers: HandlerRegistry::new(),
				timer_manager: Mutex::new(None),
			}),
			worker: Mutex::new(None),
			launched: AtomicBool::new(false),
			self_ref: self_ref.clone(),
		});

		component.shared.handlers.register(MessageType::of::<TimeoutMessage>(), |msg| {
			if let Some(timeout) = msg.downcast_ref::<TimeoutMessage>() {
				(timeout.callback)();
			}
		});
		component.shared.handlers.register(MessageType::of::<CallbackMessage>(), |msg| {
			if let Some(exec) = msg.downcast_ref::<CallbackMessage>() {
				(exec.callback)();
			}
		});

		component
	}

	/// The component's name.
	pub fn name(&self) -> String {
		self.shared.name.lock().clone()
	}

	/// Rename the component. Informational only.
	pub fn set_name(&self, name: impl Into<String>) {
		*self.shared.name.lock() = name.into();
	}

	/// Start the message loop without entry/exit hooks.
	pub fn run(&self, mode: LaunchMode) {
		self.run_with(mode, || {}, || {});
	}

	/// Start the message loop.
	///
	/// `on_entry` runs inside the loop context after the active-component
	/// binding is installed; `on_exit` runs after the loop terminates.
	/// Both only run if the component still exists at that point, and both
	/// are confined like handlers: a panic is logged, never propagated.
	///
	/// Launching an already-launched component is a logged no-op; a second
	/// consumer would break serial dispatch.
	pub fn run_with<E, X>(&self, mode: LaunchMode, on_entry: E, on_exit: X)
	where
		E: FnOnce() + Send + 'static,
		X: FnOnce() + Send + 'static,
	{
		if self.launched.swap(true, Ordering::SeqCst) {
			warn!(component = %self.name(), "component already launched, ignoring run");
			return;
		}

		match mode {
			LaunchMode::Async => {
				let shared = self.shared.clone();
				let compref = self.self_ref.clone();
				let name = self.name();
				let handle = thread::Builder::new()
					.name(name.clone())
					.spawn(move || {
						debug!(component = %name, "component worker starting");
						run_message_loop(&shared, &compref, on_entry, on_exit);
						debug!(component = %name, "component worker stopped");
					})
					.expect("failed to spawn component worker thread");
				*self.worker.lock() = Some(handle);
			}
			LaunchMode::Sync => {
				run_message_loop(&self.shared, &self.self_ref, on_entry, on_exit);
			}
		}
	}

	/// Stop the component.
	///
	/// Shuts down the timer manager (quiescing its scheduler thread),
	/// closes the queue so the loop exits once the backlog is drained,
	/// and joins the worker thread. Calling `stop` from the worker thread
	/// itself skips the join; the loop exits naturally after the current
	/// handler returns. Idempotent.
	pub fn stop(&self) {
		if let Some(manager) = self.shared.timer_manager.lock().take() {
			manager.shutdown();
		}
		self.shared.queue.close();

		let worker = self.worker.lock().take();
		if let Some(handle) = worker {
			if handle.thread().id() == thread::current().id() {
				// Self-stop from inside a handler: joining here would
				// deadlock. Keep the handle so a later outside stop
				// (or drop) can still join.
				*self.worker.lock() = Some(handle);
			} else if let Err(payload) = handle.join() {
				error!(component = %self.name(), panic = panic_message(payload.as_ref()), "component worker panicked");
			}
		}
	}

	/// Post a message to this component.
	pub fn post<M: Message>(&self, msg: M) {
		self.post_ptr(Arc::new(msg));
	}

	/// Post an already-shared message to this component.
	///
	/// Failures never reach the caller: a full queue drops the message
	/// with an error log, a closed queue drops it quietly.
	pub fn post_ptr(&self, msg: MessagePtr) {
		match self.shared.queue.push(msg) {
			Ok(()) => {}
			Err(err @ QueueError::Full { .. }) => {
				error!(component = %self.name(), %err, "dropping message");
			}
			Err(QueueError::Closed) => {
				debug!(component = %self.name(), "message posted to stopped component, dropping");
			}
		}
	}

	/// Run `callback` on this component's thread.
	pub fn post_callback<F>(&self, callback: F)
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.post(CallbackMessage::new(Arc::new(callback)));
	}

	/// Install or replace the handler for `msg_type`.
	pub fn register_message_handler<F>(&self, msg_type: MessageType, handler: F)
	where
		F: Fn(MessagePtr) + Send + Sync + 'static,
	{
		self.shared.handlers.register(msg_type, handler);
	}

	/// Install or replace the handler for `msg_type`, object form.
	pub fn register_handler(&self, msg_type: MessageType, handler: Arc<dyn MessageHandler>) {
		self.shared.handlers.register_handler(msg_type, handler);
	}

	/// Typed registration: `handler` receives the downcast payload.
	///
	/// ```
	/// # use reifydb_messaging::{Component, define_message};
	/// # define_message! {
	/// # 	pub struct Tick {}
	/// # }
	/// let component = Component::create();
	/// component.handle::<Tick, _>(|_tick| println!("tick"));
	/// ```
	pub fn handle<M, F>(&self, handler: F)
	where
		M: TypedMessage,
		F: Fn(&M) + Send + Sync + 'static,
	{
		self.shared.handlers.register(MessageType::of::<M>(), move |msg| {
			if let Some(typed) = msg.downcast_ref::<M>() {
				handler(typed);
			}
		});
	}

	/// The component whose loop is executing on the calling thread.
	pub fn active() -> Option<Arc<Component>> {
		Self::active_weak().upgrade()
	}

	/// Weak handle to the component active on the calling thread.
	///
	/// Empty on threads that are not component loops.
	pub fn active_weak() -> ComponentRef {
		ACTIVE_COMPONENT.with(|active| active.borrow().clone())
	}

	/// Timer manager of the active component, created lazily on first use.
	///
	/// `None` outside a component thread. The manager is reference-counted:
	/// timers that outlive their component keep it alive until they release
	/// their handle.
	pub fn timer_manager() -> Option<Arc<TimerManager>> {
		Self::active().map(|component| component.get_or_create_timer_manager())
	}

	fn get_or_create_timer_manager(&self) -> Arc<TimerManager> {
		self.shared.timer_manager.lock().get_or_insert_with(|| Arc::new(TimerManager::new())).clone()
	}
}

impl Drop for Component {
	fn drop(&mut self) {
		self.stop();
	}
}

fn run_message_loop<E, X>(shared: &Shared, compref: &ComponentRef, on_entry: E, on_exit: X)
where
	E: FnOnce(),
	X: FnOnce(),
{
	let previous = ACTIVE_COMPONENT.with(|active| active.replace(compref.clone()));

	if compref.upgrade().is_some() {
		run_hook("entry", on_entry);
	}

	while let Some(msg) = shared.queue.wait() {
		let msg_type = msg.message_type();
		match shared.handlers.lookup(msg_type) {
			Some(handler) => dispatch(handler, msg),
			None => warn!(message_type = %msg_type, "no handler registered for message, dropping"),
		}
	}

	if compref.upgrade().is_some() {
		run_hook("exit", on_exit);
	}

	ACTIVE_COMPONENT.with(|active| active.replace(previous));
}

/// Invoke one handler, confining any panic to this dispatch.
fn dispatch(handler: HandlerFn, msg: MessagePtr) {
	let msg_type = msg.message_type();
	if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(msg))) {
		error!(message_type = %msg_type, panic = panic_message(payload.as_ref()), "message handler panicked");
	}
}

fn run_hook(stage: &'static str, hook: impl FnOnce()) {
	if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(hook)) {
		error!(stage, panic = panic_message(payload.as_ref()), "component hook panicked");
	}
}

/// Best-effort rendering of a panic payload for the log.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message
	} else {
		"<non-string panic payload>"
	}
}
