// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Component-facing timer facade.
//!
//! A [`Timer`] binds a [`TimerManager`] job to the component that is
//! *active* when [`Timer::start`] is called: the expiry callback runs on
//! the manager's scheduler thread only long enough to post a
//! [`TimeoutMessage`] back to that component, so the user callback always
//! executes on the component's own loop.
//!
//! The facade keeps a strong handle to the manager (a timer may outlive
//! its component, and orderly cancellation needs the manager alive) but
//! only a weak handle to the component, so a pending or cyclic timer never
//! extends a component's life.

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
	component::Component,
	message::{Callback, TimeoutMessage},
};

pub mod manager;

use manager::TimerManager;

/// Schedules future or periodic work onto the starting component's thread.
///
/// Dropping the timer stops the underlying job.
pub struct Timer {
	inner: Arc<TimerInner>,
}

struct TimerInner {
	id: AtomicU64,
	cyclic: AtomicBool,
	manager: Mutex<Option<Arc<TimerManager>>>,
}

impl Timer {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(TimerInner {
				id: AtomicU64::new(TimerManager::INVALID_JOB_ID),
				cyclic: AtomicBool::new(false),
				manager: Mutex::new(None),
			}),
		}
	}

	/// Schedule `callback` to run on the active component after `duration`
	/// (and every `duration` if the timer is cyclic).
	///
	/// Must be called from a component thread; elsewhere the timer silently
	/// does nothing and [`running`](Self::running) stays false. A timer
	/// that is already running is stopped and re-armed.
	pub fn start<F>(&self, duration: Duration, callback: F)
	where
		F: Fn() + Send + Sync + 'static,
	{
		let Some(manager) = Component::timer_manager() else {
			warn!("timer started outside a component thread, ignoring");
			return;
		};
		*self.inner.manager.lock() = Some(manager.clone());

		if self.running() {
			info!("timer is still running, stopping before re-arm");
			self.stop();
		}

		let compref = Component::active_weak();
		let user_callback: Callback = Arc::new(callback);
		let weak_inner = Arc::downgrade(&self.inner);

		let on_timeout = move || {
			let Some(inner) = weak_inner.upgrade() else {
				return;
			};
			let id = inner.id.load(Ordering::SeqCst);

			match compref.upgrade() {
				Some(component) => {
					component.post(TimeoutMessage::new(id, user_callback.clone()));
				}
				None => {
					// Component is gone: a cyclic job must cancel itself
					// through the retained manager handle.
					if inner.cyclic.load(Ordering::SeqCst) {
						let manager = inner.manager.lock().clone();
						if let Some(manager) = manager {
							manager.stop(id);
						}
					}
					inner.id.store(TimerManager::INVALID_JOB_ID, Ordering::SeqCst);
					return;
				}
			}

			if !inner.cyclic.load(Ordering::SeqCst) {
				inner.id.store(TimerManager::INVALID_JOB_ID, Ordering::SeqCst);
			}
		};

		let cyclic = self.inner.cyclic.load(Ordering::SeqCst);
		let id = manager.start(duration, on_timeout, cyclic);
		self.inner.id.store(id, Ordering::SeqCst);
		debug!(timer_id = id, "timer started");
	}

	/// Cancel the underlying job, if any.
	pub fn stop(&self) {
		let manager = self.inner.manager.lock().clone();
		if let Some(manager) = manager {
			manager.stop(self.inner.id.load(Ordering::SeqCst));
		}
	}

	/// Re-arm the underlying job with its original duration, from now.
	pub fn restart(&self) {
		let manager = self.inner.manager.lock().clone();
		if let Some(manager) = manager {
			manager.restart(self.inner.id.load(Ordering::SeqCst));
		}
	}

	/// Toggle cyclicity, propagating to a live job.
	pub fn set_cyclic(&self, cyclic: bool) {
		if cyclic != self.inner.cyclic.swap(cyclic, Ordering::SeqCst) {
			let manager = self.inner.manager.lock().clone();
			if let Some(manager) = manager {
				manager.set_cyclic(self.inner.id.load(Ordering::SeqCst), cyclic);
			}
		}
	}

	/// Whether the underlying job is currently scheduled.
	pub fn running(&self) -> bool {
		let manager = self.inner.manager.lock().clone();
		manager.is_some_and(|manager| manager.is_running(self.inner.id.load(Ordering::SeqCst)))
	}
}

impl Default for Timer {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for TimerInner {
	fn drop(&mut self) {
		if let Some(manager) = self.manager.get_mut().take() {
			manager.stop(*self.id.get_mut());
		}
	}
}
