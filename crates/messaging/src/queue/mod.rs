// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Multi-producer single-consumer message queue with terminal close.
//!
//! The queue has two states. While **open**, `push` appends at the tail and
//! the consumer blocks in `wait` until a message arrives. Once **closed**,
//! further pushes are rejected, but the consumer keeps draining the backlog;
//! only when the queue is closed *and* empty does `wait` report the end.
//!
//! Built on a crossbeam channel: closing drops the sender, and the receiver
//! side then yields the remaining backlog before disconnecting, which is
//! exactly the close-then-drain contract the message loop needs.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::message::MessagePtr;

/// Why a push was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
	/// The queue is in its terminal state.
	#[error("queue is closed")]
	Closed,
	/// A bounded queue is at capacity.
	#[error("queue is full: {depth} messages pending")]
	Full {
		depth: usize,
	},
}

/// FIFO queue carrying messages into a component's loop.
///
/// Thread-safe for any number of producers and a single consumer.
pub struct MessageQueue {
	tx: Mutex<Option<Sender<MessagePtr>>>,
	rx: Receiver<MessagePtr>,
}

impl MessageQueue {
	/// Create a queue without a capacity limit.
	pub fn unbounded() -> Self {
		let (tx, rx) = crossbeam_channel::unbounded();
		Self {
			tx: Mutex::new(Some(tx)),
			rx,
		}
	}

	/// Create a queue that rejects pushes beyond `capacity` pending messages.
	pub fn bounded(capacity: usize) -> Self {
		debug_assert!(capacity > 0, "capacity must be positive");
		let (tx, rx) = crossbeam_channel::bounded(capacity);
		Self {
			tx: Mutex::new(Some(tx)),
			rx,
		}
	}

	/// Enqueue a message at the tail.
	///
	/// Never blocks: a bounded queue at capacity rejects the message with
	/// [`QueueError::Full`] instead of applying back-pressure.
	pub fn push(&self, msg: MessagePtr) -> Result<(), QueueError> {
		let guard = self.tx.lock();
		let tx = guard.as_ref().ok_or(QueueError::Closed)?;
		match tx.try_send(msg) {
			Ok(()) => Ok(()),
			Err(TrySendError::Full(_)) => Err(QueueError::Full {
				depth: self.rx.len(),
			}),
			Err(TrySendError::Disconnected(_)) => Err(QueueError::Closed),
		}
	}

	/// Block until a message is available or the queue is closed and drained.
	///
	/// Returns `None` only in the terminal case; spurious wakeups are
	/// absorbed by the channel. Intended for a single consumer.
	pub fn wait(&self) -> Option<MessagePtr> {
		self.rx.recv().ok()
	}

	/// Transition to the terminal state, waking all waiters.
	///
	/// Idempotent. Messages already enqueued remain poppable until drained.
	pub fn close(&self) {
		self.tx.lock().take();
	}

	/// Whether the queue has been closed.
	pub fn is_closed(&self) -> bool {
		self.tx.lock().is_none()
	}

	/// Number of pending messages.
	pub fn len(&self) -> usize {
		self.rx.len()
	}

	/// Whether no messages are pending.
	pub fn is_empty(&self) -> bool {
		self.rx.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use std::{sync::Arc, thread, time::Duration};

	use super::{MessageQueue, QueueError};
	use crate::message::MessagePtr;

	crate::define_message! {
		pub struct Numbered {
			pub producer: usize,
			pub seq: usize,
		}
	}

	fn numbered(producer: usize, seq: usize) -> MessagePtr {
		Arc::new(Numbered::new(producer, seq))
	}

	#[test]
	fn test_push_wait_fifo() {
		let queue = MessageQueue::unbounded();
		for seq in 0..10 {
			queue.push(numbered(0, seq)).unwrap();
		}
		for seq in 0..10 {
			let msg = queue.wait().unwrap();
			assert_eq!(msg.downcast_ref::<Numbered>().unwrap().seq, seq);
		}
		assert!(queue.is_empty());
	}

	#[test]
	fn test_push_after_close_rejected() {
		let queue = MessageQueue::unbounded();
		queue.close();
		assert!(queue.is_closed());
		assert_eq!(queue.push(numbered(0, 0)), Err(QueueError::Closed));
	}

	#[test]
	fn test_close_is_idempotent() {
		let queue = MessageQueue::unbounded();
		queue.close();
		queue.close();
		assert!(queue.is_closed());
	}

	#[test]
	fn test_backlog_drains_after_close() {
		let queue = MessageQueue::unbounded();
		queue.push(numbered(0, 0)).unwrap();
		queue.push(numbered(0, 1)).unwrap();
		queue.close();

		assert_eq!(queue.wait().unwrap().downcast_ref::<Numbered>().unwrap().seq, 0);
		assert_eq!(queue.wait().unwrap().downcast_ref::<Numbered>().unwrap().seq, 1);
		assert!(queue.wait().is_none());
	}

	#[test]
	fn test_close_wakes_blocked_waiter() {
		let queue = Arc::new(MessageQueue::unbounded());
		let waiter = {
			let queue = queue.clone();
			thread::spawn(move || queue.wait())
		};
		// Give the waiter a moment to block.
		thread::sleep(Duration::from_millis(20));
		queue.close();
		assert!(waiter.join().unwrap().is_none());
	}

	#[test]
	fn test_bounded_rejects_when_full() {
		let queue = MessageQueue::bounded(2);
		queue.push(numbered(0, 0)).unwrap();
		queue.push(numbered(0, 1)).unwrap();
		assert_eq!(
			queue.push(numbered(0, 2)),
			Err(QueueError::Full {
				depth: 2
			})
		);
		// Draining frees capacity again.
		queue.wait().unwrap();
		queue.push(numbered(0, 2)).unwrap();
	}

	#[test]
	fn test_per_producer_order_survives_interleaving() {
		let queue = Arc::new(MessageQueue::unbounded());
		let producers: Vec<_> = (0..4)
			.map(|producer| {
				let queue = queue.clone();
				thread::spawn(move || {
					for seq in 0..100 {
						queue.push(numbered(producer, seq)).unwrap();
					}
				})
			})
			.collect();
		for producer in producers {
			producer.join().unwrap();
		}
		queue.close();

		let mut next_seq = [0usize; 4];
		while let Some(msg) = queue.wait() {
			let msg = msg.downcast_ref::<Numbered>().unwrap();
			assert_eq!(msg.seq, next_seq[msg.producer]);
			next_seq[msg.producer] += 1;
		}
		assert_eq!(next_seq, [100; 4]);
	}
}
