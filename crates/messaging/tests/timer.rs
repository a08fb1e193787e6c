// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! End-to-end tests for the component-facing timer facade.

use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};

use reifydb_messaging::{Component, LaunchMode, Timer};

type TimerSlot = Arc<Mutex<Option<Timer>>>;

#[test]
fn test_one_shot_timer_runs_on_component() {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let timer_slot: TimerSlot = Arc::new(Mutex::new(None));
	let (done_tx, done_rx) = crossbeam_channel::bounded(1);

	let component = Component::create();
	component.set_name("timed");

	let sink = seen.clone();
	let entry_slot = timer_slot.clone();
	component.run_with(
		LaunchMode::Async,
		move || {
			let timer = Timer::new();
			let sink = sink.clone();
			let done = done_tx.clone();
			timer.start(Duration::from_millis(20), move || {
				sink.lock().unwrap().push("t".to_string());
				let on_component = Component::active().is_some();
				if let Some(component) = Component::active() {
					component.stop();
				}
				done.send(on_component).unwrap();
			});
			*entry_slot.lock().unwrap() = Some(timer);
		},
		|| {},
	);

	assert!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), "callback ran off the component thread");
	component.stop();

	assert_eq!(*seen.lock().unwrap(), ["t"]);
	let timer = timer_slot.lock().unwrap().take().unwrap();
	assert!(!timer.running());
}

#[test]
fn test_cyclic_timer_stops_after_third_tick() {
	let count = Arc::new(AtomicUsize::new(0));
	let timer_slot: TimerSlot = Arc::new(Mutex::new(None));
	let (done_tx, done_rx) = crossbeam_channel::bounded(1);

	let component = Component::create();

	let ticks = count.clone();
	let callback_slot = timer_slot.clone();
	let entry_slot = timer_slot.clone();
	component.run_with(
		LaunchMode::Async,
		move || {
			let timer = Timer::new();
			timer.set_cyclic(true);
			let ticks = ticks.clone();
			let slot = callback_slot.clone();
			let done = done_tx.clone();
			timer.start(Duration::from_millis(25), move || {
				let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
				if tick == 3 {
					if let Some(timer) = slot.lock().unwrap().as_ref() {
						timer.stop();
					}
					done.send(()).unwrap();
				}
			});
			*entry_slot.lock().unwrap() = Some(timer);
		},
		|| {},
	);

	done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
	// Several periods of quiet prove the cycle really stopped.
	thread::sleep(Duration::from_millis(150));
	component.stop();

	assert_eq!(count.load(Ordering::SeqCst), 3);
	assert!(!timer_slot.lock().unwrap().as_ref().unwrap().running());
}

#[test]
fn test_timer_outside_component_does_nothing() {
	let timer = Timer::new();
	timer.start(Duration::from_millis(5), || panic!("must not run"));
	assert!(!timer.running());
	thread::sleep(Duration::from_millis(30));
	assert!(!timer.running());
}

#[test]
fn test_dropping_timer_cancels_job() {
	let fired = Arc::new(AtomicBool::new(false));
	let timer_slot: TimerSlot = Arc::new(Mutex::new(None));
	let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

	let component = Component::create();

	let flag = fired.clone();
	let entry_slot = timer_slot.clone();
	component.run_with(
		LaunchMode::Async,
		move || {
			let timer = Timer::new();
			let flag = flag.clone();
			timer.start(Duration::from_millis(100), move || {
				flag.store(true, Ordering::SeqCst);
			});
			*entry_slot.lock().unwrap() = Some(timer);
			ready_tx.send(()).unwrap();
		},
		|| {},
	);

	ready_rx.recv_timeout(Duration::from_secs(5)).unwrap();
	timer_slot.lock().unwrap().take();

	thread::sleep(Duration::from_millis(200));
	assert!(!fired.load(Ordering::SeqCst));
	component.stop();
}

#[test]
fn test_restart_keeps_timer_scheduled() {
	let timer_slot: TimerSlot = Arc::new(Mutex::new(None));
	let (tx, rx) = crossbeam_channel::bounded(1);

	let component = Component::create();

	let entry_slot = timer_slot.clone();
	component.run_with(
		LaunchMode::Async,
		move || {
			let timer = Timer::new();
			timer.start(Duration::from_secs(5), || {});
			timer.restart();
			tx.send(timer.running()).unwrap();
			*entry_slot.lock().unwrap() = Some(timer);
		},
		|| {},
	);

	assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
	component.stop();
}

#[test]
fn test_timer_manager_available_inside_component() {
	let (tx, rx) = crossbeam_channel::bounded(1);

	let component = Component::create();
	component.run_with(
		LaunchMode::Async,
		move || {
			tx.send(Component::timer_manager().is_some()).unwrap();
		},
		|| {},
	);

	assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
	component.stop();
}
