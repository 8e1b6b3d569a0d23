// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use sluice::{Block, Error, Result};
use sluice::pool::{self, Pool, PoolError};
use sluice::streams::{Sink, Source};

/// Produces `len` bytes of the repeating `0, 1, ..., 255, 0, 1, ...` pattern.
pub fn pattern(len: usize) -> Vec<u8> {
	(0..len).map(|i| i as u8).collect()
}

/// A source that serves an in-memory byte sequence in fills of at most
/// `chunk` bytes, so multi-fill behavior can be pinned down.
pub struct ChunkedSource {
	data: Vec<u8>,
	offset: usize,
	chunk: usize,
	closed: Rc<Cell<bool>>,
}

impl ChunkedSource {
	pub fn new(data: Vec<u8>, chunk: usize) -> Self {
		assert!(chunk > 0, "chunk size must be nonzero");
		Self { data, offset: 0, chunk, closed: Rc::default() }
	}

	/// A handle that observes [`Source::close`] after the source is moved
	/// into a wrapper.
	pub fn closed_flag(&self) -> Rc<Cell<bool>> {
		self.closed.clone()
	}
}

impl Source for ChunkedSource {
	fn fill(&mut self, block: &mut Block, start: usize, end: usize) -> Result<usize> {
		let remaining = self.data.len() - self.offset;
		let count = remaining.min(self.chunk).min(end - start);
		block.data_mut()[start..start + count]
			.copy_from_slice(&self.data[self.offset..self.offset + count]);
		self.offset += count;
		Ok(count)
	}

	fn close(&mut self) -> Result {
		self.closed.set(true);
		Ok(())
	}
}

#[derive(Default)]
pub struct SinkState {
	pub bytes: Vec<u8>,
	/// One entry per drain call: block identity and the drained range.
	pub drains: Vec<(u64, usize, usize)>,
	pub flushes: usize,
	pub closed: bool,
}

/// A sink that records everything drained into it, observable through a
/// shared state handle while the sink itself is owned by a `BufferedSink`.
#[derive(Clone, Default)]
pub struct RecordingSink {
	pub state: Rc<RefCell<SinkState>>,
}

impl RecordingSink {
	pub fn new() -> (Self, Rc<RefCell<SinkState>>) {
		let sink = Self::default();
		let state = sink.state.clone();
		(sink, state)
	}
}

impl Sink for RecordingSink {
	fn drain(&mut self, block: &Block, start: usize, end: usize) -> Result {
		let mut state = self.state.borrow_mut();
		state.bytes.extend_from_slice(&block.data()[start..end]);
		state.drains.push((block.id(), start, end));
		Ok(())
	}

	fn flush(&mut self) -> Result {
		self.state.borrow_mut().flushes += 1;
		Ok(())
	}

	fn close(&mut self) -> Result {
		self.state.borrow_mut().closed = true;
		Ok(())
	}
}

/// A source whose every fill fails with the same error message.
pub struct FaultySource;

impl Source for FaultySource {
	fn fill(&mut self, _block: &mut Block, _start: usize, _end: usize) -> Result<usize> {
		Err(Error::other("x"))
	}
}

struct SingleShotState {
	block: Option<Block>,
	expected: u64,
	collected: bool,
}

/// A pool that yields one pre-constructed block exactly once and verifies
/// identity when it comes back. Once its block is home, any further
/// collection is a double return and fails.
#[derive(Clone)]
pub struct SingleShotPool {
	state: Rc<RefCell<SingleShotState>>,
}

impl SingleShotPool {
	pub fn new(block: Block) -> Self {
		Self {
			state: Rc::new(RefCell::new(SingleShotState {
				expected: block.id(),
				block: Some(block),
				collected: false,
			})),
		}
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self::new(Block::with_capacity(capacity))
	}

	/// The identity of the block this pool serves.
	pub fn expected_id(&self) -> u64 {
		self.state.borrow().expected
	}

	pub fn is_claimed(&self) -> bool {
		self.state.borrow().block.is_none()
	}

	pub fn is_collected(&self) -> bool {
		self.state.borrow().collected
	}
}

impl Pool for SingleShotPool {
	fn claim(&self) -> pool::Result<Block> {
		self.state.borrow_mut().block.take().ok_or(PoolError::Exhausted)
	}

	fn collect(&self, block: Block) -> pool::Result {
		let mut state = self.state.borrow_mut();
		if state.collected {
			return Err(PoolError::Recollected)
		}
		if block.id() != state.expected {
			return Err(PoolError::Foreign)
		}
		state.collected = true;
		Ok(())
	}

	fn close(&self) -> pool::Result {
		let state = self.state.borrow();
		if state.block.is_none() && !state.collected {
			Err(PoolError::Leaked(1))
		} else {
			Ok(())
		}
	}
}
