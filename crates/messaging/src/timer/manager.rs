// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Scheduler of one-shot and cyclic timer jobs.
//!
//! Jobs live in a map keyed by id; due times live in a min-heap of
//! `(deadline, generation, id)` entries driven by a dedicated scheduler
//! thread. Cancelling or re-arming a job bumps its generation, which
//! invalidates any entry still sitting in the heap -- stale entries are
//! simply discarded when popped.
//!
//! Callbacks run on the scheduler thread with the state lock released, so
//! a callback may freely call back into the manager (including stopping
//! its own job). Component-facing code should not register callbacks here
//! directly; the [`Timer`](crate::timer::Timer) facade marshals expirations
//! onto the owning component's thread.

use std::{
	cmp::Reverse,
	collections::{BinaryHeap, HashMap},
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use crate::{component::panic_message, message::Callback};

/// Identifier of a scheduled timer job.
pub type TimerJobId = u64;

struct TimerJob {
	duration: Duration,
	cyclic: bool,
	callback: Callback,
	deadline: Instant,
	generation: u64,
}

/// Heap entry ordered by deadline; ties broken by generation then id.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
	deadline: Instant,
	generation: u64,
	id: TimerJobId,
}

struct SchedulerState {
	jobs: HashMap<TimerJobId, TimerJob>,
	heap: BinaryHeap<Reverse<HeapEntry>>,
	shutdown: bool,
}

struct SchedulerShared {
	state: Mutex<SchedulerState>,
	signal: Condvar,
}

/// Schedules `(duration, callback, cyclic)` jobs on a dedicated thread.
///
/// Shared among all timers started on the same component. Callbacks
/// execute on the scheduler thread, never on a component thread.
pub struct TimerManager {
	shared: Arc<SchedulerShared>,
	next_id: AtomicU64,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl TimerManager {
	/// Sentinel id meaning "no job".
	pub const INVALID_JOB_ID: TimerJobId = 0;

	/// Create a manager and spawn its scheduler thread.
	pub fn new() -> Self {
		let shared = Arc::new(SchedulerShared {
			state: Mutex::new(SchedulerState {
				jobs: HashMap::new(),
				heap: BinaryHeap::new(),
				shutdown: false,
			}),
			signal: Condvar::new(),
		});

		let worker = {
			let shared = shared.clone();
			thread::Builder::new()
				.name("timer-manager".into())
				.spawn(move || run_scheduler(&shared))
				.expect("failed to spawn timer manager thread")
		};

		Self {
			shared,
			next_id: AtomicU64::new(1),
			worker: Mutex::new(Some(worker)),
		}
	}

	/// Register a new job and return its id.
	///
	/// A cyclic job fires every `duration` until stopped; otherwise once.
	/// After [`shutdown`](Self::shutdown) this is a no-op returning
	/// [`INVALID_JOB_ID`](Self::INVALID_JOB_ID).
	pub fn start<F>(&self, duration: Duration, callback: F, cyclic: bool) -> TimerJobId
	where
		F: Fn() + Send + Sync + 'static,
	{
		let mut state = self.shared.state.lock();
		if state.shutdown {
			debug!("timer manager is stopped, ignoring start");
			return Self::INVALID_JOB_ID;
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let deadline = Instant::now() + duration;
		state.jobs.insert(
			id,
			TimerJob {
				duration,
				cyclic,
				callback: Arc::new(callback),
				deadline,
				generation: 0,
			},
		);
		state.heap.push(Reverse(HeapEntry {
			deadline,
			generation: 0,
			id,
		}));
		drop(state);

		self.shared.signal.notify_all();
		id
	}

	/// Cancel a job. No-op for unknown, completed, or invalid ids.
	///
	/// Safe to call from inside the job's own callback.
	pub fn stop(&self, id: TimerJobId) {
		let mut state = self.shared.state.lock();
		if state.jobs.remove(&id).is_some() {
			drop(state);
			self.shared.signal.notify_all();
		}
	}

	/// Re-arm a job with its original duration, from now.
	pub fn restart(&self, id: TimerJobId) {
		let mut guard = self.shared.state.lock();
		let state = &mut *guard;
		if let Some(job) = state.jobs.get_mut(&id) {
			job.generation += 1;
			job.deadline = Instant::now() + job.duration;
			state.heap.push(Reverse(HeapEntry {
				deadline: job.deadline,
				generation: job.generation,
				id,
			}));
			drop(guard);
			self.shared.signal.notify_all();
		}
	}

	/// Flip the cyclicity of a live job.
	pub fn set_cyclic(&self, id: TimerJobId, cyclic: bool) {
		let mut state = self.shared.state.lock();
		if let Some(job) = state.jobs.get_mut(&id) {
			job.cyclic = cyclic;
		}
	}

	/// Whether a job with this id is currently scheduled.
	pub fn is_running(&self, id: TimerJobId) -> bool {
		id != Self::INVALID_JOB_ID && self.shared.state.lock().jobs.contains_key(&id)
	}

	/// Terminate the manager: cancel all jobs and quiesce the scheduler.
	///
	/// Joins the scheduler thread (skipped when called from a callback on
	/// that thread). Subsequent operations are no-ops. Idempotent.
	pub fn shutdown(&self) {
		{
			let mut state = self.shared.state.lock();
			state.shutdown = true;
			state.jobs.clear();
			state.heap.clear();
		}
		self.shared.signal.notify_all();

		let worker = self.worker.lock().take();
		if let Some(handle) = worker {
			if handle.thread().id() != thread::current().id() {
				let _ = handle.join();
			}
		}
	}
}

impl Default for TimerManager {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for TimerManager {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn run_scheduler(shared: &SchedulerShared) {
	debug!("timer manager scheduler starting");
	let mut guard = shared.state.lock();
	loop {
		if guard.shutdown {
			break;
		}

		let now = Instant::now();
		let next_deadline = match guard.heap.peek() {
			None => None,
			Some(Reverse(entry)) => Some(entry.deadline),
		};

		match next_deadline {
			None => shared.signal.wait(&mut guard),
			Some(deadline) if deadline > now => {
				let _ = shared.signal.wait_until(&mut guard, deadline);
			}
			Some(_) => {
				if let Some(callback) = pop_due_job(&mut guard) {
					// Release the lock while the callback runs so it can
					// call back into the manager without deadlocking.
					drop(guard);
					invoke(&callback);
					guard = shared.state.lock();
				}
			}
		}
	}
	debug!("timer manager scheduler stopped");
}

/// Pop the top heap entry and resolve it against the live jobs.
///
/// Returns the callback to fire, or `None` for a stale entry. Cyclic jobs
/// are re-armed at `now + duration`; one-shot jobs are removed.
fn pop_due_job(guard: &mut parking_lot::MutexGuard<'_, SchedulerState>) -> Option<Callback> {
	let state = &mut **guard;
	let Reverse(entry) = state.heap.pop()?;

	let mut fire = None;
	let mut rearmed = None;
	let mut finished = false;

	if let Some(job) = state.jobs.get_mut(&entry.id) {
		if job.generation == entry.generation {
			fire = Some(job.callback.clone());
			if job.cyclic {
				job.generation += 1;
				job.deadline = Instant::now() + job.duration;
				rearmed = Some(HeapEntry {
					deadline: job.deadline,
					generation: job.generation,
					id: entry.id,
				});
			} else {
				finished = true;
			}
		}
	}

	if let Some(next) = rearmed {
		state.heap.push(Reverse(next));
	}
	if finished {
		state.jobs.remove(&entry.id);
	}
	fire
}

fn invoke(callback: &Callback) {
	if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback())) {
		error!(panic = panic_message(payload.as_ref()), "timer callback panicked");
	}
}
