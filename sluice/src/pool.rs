// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::result;
use crate::block::Block;

/// The default capacity of pooled blocks, in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
/// The default bound on simultaneously claimed blocks per pool.
pub const DEFAULT_POOL_BLOCKS: usize = 64;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
	/// The pool is closed.
	#[error("pool closed")]
	Closed,
	/// Every block the pool is allowed to keep live is already claimed.
	#[error("all pool blocks are claimed")]
	Exhausted,
	/// The block was already collected. [`SharedPool`] never reports this:
	/// its `collect` consumes the block, so a second collection cannot be
	/// written in safe code. Pools that know their blocks out of band
	/// report it on a duplicate return.
	#[error("block collected twice")]
	Recollected,
	/// The block was not claimed from this pool.
	#[error("block not claimed from this pool")]
	Foreign,
	/// The pool was closed while blocks were still claimed.
	#[error("pool closed with {0} block(s) still claimed")]
	Leaked(usize),
}

pub type Result<T = ()> = result::Result<T, PoolError>;

/// A bounded producer and recycler of [`Block`]s. Implementations are
/// cheap-to-clone shared handles.
///
/// A pool bounds the number of *simultaneously claimed* blocks, not total
/// lifetime allocations; collected blocks are reused by later claims. Every
/// claimed block must be collected exactly once, into the pool it came
/// from. Violations fail at the violating call: a foreign or re-collected
/// block fails `collect`, and closing with blocks still claimed reports the
/// leak.
pub trait Pool: Clone {
	/// Claims a block. Its contents are unspecified.
	///
	/// # Errors
	///
	/// Fails if the pool is closed, or if claiming would exceed the bound
	/// on live blocks.
	fn claim(&self) -> Result<Block>;

	/// Collects a block back into the pool.
	///
	/// # Errors
	///
	/// Fails if the block was not claimed from this pool, or was already
	/// collected.
	fn collect(&self, block: Block) -> Result;

	/// Closes the pool, disallowing further claims. Closing twice is a
	/// no-op. Collecting outstanding blocks stays permitted so streams
	/// shutting down late can still return them.
	///
	/// # Errors
	///
	/// Fails with [`PoolError::Leaked`] if blocks are still claimed.
	fn close(&self) -> Result;
}

/// The default pool: a bounded free list behind an `Rc<RefCell<...>>`
/// container. Claims are tracked by block identity, which is how foreign
/// and duplicate collections are caught.
#[derive(Clone)]
pub struct SharedPool(Rc<RefCell<PoolState>>);

struct PoolState {
	block_size: usize,
	max_live: usize,
	free: Vec<Block>,
	live: HashSet<u64>,
	closed: bool,
}

impl SharedPool {
	/// Creates a pool producing blocks of `block_size` bytes, with at most
	/// `max_live` blocks claimed at once.
	pub fn new(block_size: usize, max_live: usize) -> Self {
		Self(Rc::new(RefCell::new(PoolState {
			block_size,
			max_live,
			free: Vec::new(),
			live: HashSet::new(),
			closed: false,
		})))
	}

	/// Returns the number of currently claimed blocks.
	pub fn live_count(&self) -> usize {
		self.0.borrow().live.len()
	}
}

impl Default for SharedPool {
	fn default() -> Self {
		Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_POOL_BLOCKS)
	}
}

impl Pool for SharedPool {
	fn claim(&self) -> Result<Block> {
		let mut state = self.0.borrow_mut();
		if state.closed {
			return Err(PoolError::Closed)
		}
		if state.live.len() == state.max_live {
			return Err(PoolError::Exhausted)
		}
		let block = state.free
			.pop()
			.unwrap_or_else(|| Block::with_capacity(state.block_size));
		state.live.insert(block.id());
		Ok(block)
	}

	fn collect(&self, block: Block) -> Result {
		let mut state = self.0.borrow_mut();
		// `collect` consumes the block, so a second collection of the same
		// block cannot be written; an unknown token is a foreign block.
		if !state.live.remove(&block.id()) {
			return Err(PoolError::Foreign)
		}
		if !state.closed {
			state.free.push(block);
		}
		Ok(())
	}

	fn close(&self) -> Result {
		let mut state = self.0.borrow_mut();
		if state.closed {
			return Ok(())
		}
		state.closed = true;
		state.free.clear();
		match state.live.len() {
			0 => Ok(()),
			leaked => Err(PoolError::Leaked(leaked)),
		}
	}
}

thread_local! {
	static POOL: SharedPool = SharedPool::default();
}

/// Clones a shared reference to the thread-local default block pool.
pub fn pool() -> SharedPool { POOL.with(SharedPool::clone) }
