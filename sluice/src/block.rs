// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 { NEXT_ID.fetch_add(1, Ordering::Relaxed) }

/// A fixed-capacity chunk of memory, the unit of exchange between pools,
/// sources and sinks.
///
/// Blocks are identity-significant: each block carries a unique token for
/// its whole lifetime, and [`PartialEq`] compares tokens, never contents.
/// Two distinct blocks are never equal even when their bytes match, which
/// is what lets callers observe that a transfer really was zero-copy. The
/// token doubles as the pool's claim ledger key, surviving moves between
/// owners where a raw address would not.
pub struct Block {
	id: u64,
	data: Box<[u8]>,
}

impl Block {
	/// Creates a block of `capacity` zeroed bytes.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			id: next_id(),
			data: vec![0; capacity].into_boxed_slice(),
		}
	}

	/// Creates a capacity-0 placeholder block. Only identity comparison is
	/// meaningful on it; every indexed access panics.
	pub fn empty() -> Self {
		Self::with_capacity(0)
	}

	/// Returns the block's capacity, constant for its lifetime.
	pub fn capacity(&self) -> usize { self.data.len() }

	/// Returns the block's identity token.
	pub fn id(&self) -> u64 { self.id }

	/// Returns the byte at `index`.
	///
	/// # Panics
	///
	/// Panics if `index` is outside the block's capacity.
	pub fn get(&self, index: usize) -> u8 { self.data[index] }

	/// Sets the byte at `index`.
	///
	/// # Panics
	///
	/// Panics if `index` is outside the block's capacity.
	pub fn set(&mut self, index: usize, value: u8) { self.data[index] = value }

	/// Borrows the block's bytes.
	pub fn data(&self) -> &[u8] { &self.data }

	/// Borrows the block's bytes mutably.
	pub fn data_mut(&mut self) -> &mut [u8] { &mut self.data }

	/// Copies `self[src_start..src_end]` into `dest` at `dest_start`.
	///
	/// # Panics
	///
	/// Panics if either range falls outside its block's capacity.
	pub fn copy_to(&self, dest: &mut Block, src_start: usize, src_end: usize, dest_start: usize) {
		let src = &self.data[src_start..src_end];
		dest.data[dest_start..dest_start + src.len()].copy_from_slice(src);
	}
}

impl Default for Block {
	fn default() -> Self { Self::empty() }
}

impl From<Vec<u8>> for Block {
	fn from(value: Vec<u8>) -> Self {
		Self {
			id: next_id(),
			data: value.into_boxed_slice(),
		}
	}
}

impl PartialEq for Block {
	fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for Block { }

impl Debug for Block {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Block")
			.field("id", &self.id)
			.field("capacity", &self.capacity())
			.finish_non_exhaustive()
	}
}
