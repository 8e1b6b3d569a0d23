// SPDX-License-Identifier: Apache-2.0

mod void;

pub use void::*;

use crate::{BufferedSink, BufferedSource, Result};
use crate::block::Block;
use crate::pool::{pool, SharedPool};

/// A producer of bytes: the pull side of the IO boundary.
///
/// Implementations only have to fill block ranges; buffering, typed reads
/// and read-ahead live in [`BufferedSource`].
pub trait Source {
	/// Fills `block[start..end]` with up to `end - start` bytes, returning
	/// the number of bytes written. Returning `0` signals end-of-stream for
	/// this attempt. The filled prefix `block[start..start + count]` must
	/// be valid on return.
	///
	/// # Errors
	///
	/// Errors propagate unchanged to whichever read triggered the fill; no
	/// bytes from the failing attempt become visible.
	fn fill(&mut self, block: &mut Block, start: usize, end: usize) -> Result<usize>;

	/// Closes the underlying source. Called once by
	/// [`BufferedSource::close`](BufferedSource::close).
	fn close(&mut self) -> Result { Ok(()) }
}

/// A consumer of bytes: the push side of the IO boundary.
pub trait Sink {
	/// Consumes `block[start..end]`. The block is only borrowed; the sink
	/// cannot retain it past return.
	///
	/// # Errors
	///
	/// Errors propagate unchanged to whichever write triggered the drain.
	fn drain(&mut self, block: &Block, start: usize, end: usize) -> Result;

	/// Writes any data the sink itself buffers to its final target.
	fn flush(&mut self) -> Result { Ok(()) }

	/// Closes the underlying sink. Called once by
	/// [`BufferedSink::close`](BufferedSink::close), after a final flush.
	fn close(&mut self) -> Result { Ok(()) }
}

pub trait SourceExt: Source + Sized {
	/// Wraps the source in a [`BufferedSource`] backed by the thread-local
	/// default pool.
	fn buffered(self) -> BufferedSource<Self, SharedPool> {
		BufferedSource::new(self, pool())
	}
}

impl<S: Source> SourceExt for S { }

pub trait SinkExt: Sink + Sized {
	/// Wraps the sink in a [`BufferedSink`] backed by the thread-local
	/// default pool.
	fn buffered(self) -> BufferedSink<Self, SharedPool> {
		BufferedSink::new(self, pool())
	}
}

impl<S: Sink> SinkExt for S { }
