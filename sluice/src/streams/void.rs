// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use crate::block::Block;
use super::{Sink, Source};

/// Returns a [`Sink`] that writes to nowhere, dropping any data written to it.
pub fn void_sink() -> VoidSink { VoidSink }

/// Returns a [`Source`] that reads from nowhere, producing no data.
pub fn void_source() -> VoidSource { VoidSource }

/// A [`Sink`] that writes to nowhere, dropping any data written to it.
#[derive(Copy, Clone, Debug, Default)]
pub struct VoidSink;

impl Sink for VoidSink {
	/// Drops the block range.
	fn drain(&mut self, _block: &Block, _start: usize, _end: usize) -> Result {
		Ok(())
	}
}

/// A [`Source`] that reads from nowhere, producing no data.
#[derive(Copy, Clone, Debug, Default)]
pub struct VoidSource;

impl Source for VoidSource {
	/// Reads nothing, returning `0`.
	fn fill(&mut self, _block: &mut Block, _start: usize, _end: usize) -> Result<usize> {
		Ok(0)
	}
}
