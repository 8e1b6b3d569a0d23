// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;
use std::mem;
use crate::{Error, Result};
use crate::Context::{self, Close, Drain, Fill, Flush, Preview, Read, Skip, Write};
use crate::block::Block;
use crate::error::ResultExt;
use crate::pool::Pool;
use crate::streams::{Sink, Source};

pub fn buffer_source<S: Source, P: Pool>(source: S, pool: P) -> BufferedSource<S, P> {
	BufferedSource::new(source, pool)
}

pub fn buffer_sink<S: Sink, P: Pool>(sink: S, pool: P) -> BufferedSink<S, P> {
	BufferedSink::new(sink, pool)
}

/// A filled block queued for reading. `read..end` is the unconsumed range.
struct Laden {
	block: Block,
	read: usize,
	end: usize,
}

impl Laden {
	fn len(&self) -> usize { self.end - self.read }
	fn is_consumed(&self) -> bool { self.read == self.end }
}

/// A preview checkpoint: the FIFO position and the read index of the entry
/// at that position when the preview began.
struct Mark {
	pos: usize,
	read: usize,
}

/// A pull-based reader that lazily fills pooled blocks from a [`Source`].
///
/// Filled blocks sit in a FIFO; reads consume from the front, and each
/// block returns to the pool as soon as its last byte is consumed. While a
/// [`preview`](Self::preview) is active, consumed blocks are retained and
/// rewound instead, so every byte delivered inside the preview is replayed
/// to later reads.
pub struct BufferedSource<S: Source, P: Pool> {
	source: S,
	pool: P,
	fifo: VecDeque<Laden>,
	/// Index of the first unconsumed FIFO entry. Nonzero only while a
	/// preview retains consumed entries in front of it.
	pos: usize,
	marks: Vec<Mark>,
	source_eof: bool,
	closed: bool,
}

impl<S: Source, P: Pool> BufferedSource<S, P> {
	pub fn new(source: S, pool: P) -> Self {
		Self {
			source,
			pool,
			fifo: VecDeque::new(),
			pos: 0,
			marks: Vec::new(),
			source_eof: false,
			closed: false,
		}
	}

	/// Returns whether the source is closed.
	pub fn is_closed(&self) -> bool { self.closed }

	/// Returns the number of bytes available for reading without a fill.
	pub fn available(&self) -> usize {
		self.fifo.iter().skip(self.pos).map(Laden::len).sum()
	}

	#[inline]
	fn check_open(&self, context: Context) -> Result {
		if self.closed {
			Err(Error::closed(context))
		} else {
			Ok(())
		}
	}

	/// Claims one block and runs a single fill attempt on it, returning
	/// whether any bytes were buffered. A zero-length fill records
	/// end-of-stream; the state is sticky, so later attempts short-circuit.
	fn fill_next(&mut self) -> Result<bool> {
		if self.source_eof {
			return Ok(false)
		}
		let mut block = self.pool.claim().context(Fill)?;
		let end = block.capacity();
		let count = match self.source.fill(&mut block, 0, end) {
			Ok(count) => count,
			Err(error) => {
				// The block still goes back; the source error wins.
				let _ = self.pool.collect(block);
				return Err(error)
			}
		};
		if count == 0 {
			self.source_eof = true;
			self.pool.collect(block).context(Fill)?;
			Ok(false)
		} else {
			self.fifo.push_back(Laden { block, read: 0, end: count });
			Ok(true)
		}
	}

	/// Retires the entry at the cursor: collected when no preview is
	/// active, retained (cursor advance) when one is.
	fn retire_head(&mut self) -> Result {
		if self.marks.is_empty() {
			debug_assert_eq!(self.pos, 0);
			if let Some(laden) = self.fifo.pop_front() {
				self.pool.collect(laden.block).context(Read)?;
			}
		} else {
			self.pos += 1;
		}
		Ok(())
	}

	/// Retires consumed entries at the cursor.
	fn trim(&mut self) -> Result {
		while self.fifo.get(self.pos).is_some_and(Laden::is_consumed) {
			self.retire_head()?;
		}
		Ok(())
	}

	/// Returns the first entry with unconsumed bytes, if any is buffered.
	fn head(&mut self) -> Result<Option<&mut Laden>> {
		self.trim()?;
		Ok(self.fifo.get_mut(self.pos))
	}

	/// Consumes `count` already-buffered bytes.
	fn advance(&mut self, mut count: usize) -> Result {
		while count > 0 {
			let Some(laden) = self.head()? else {
				return Err(Error::eos(Skip))
			};
			let take = laden.len().min(count);
			laden.read += take;
			count -= take;
		}
		self.trim()
	}

	/// Returns `true` iff no buffered bytes remain and the source reported
	/// end-of-stream. Probes with one fill attempt when undecided.
	///
	/// # Errors
	///
	/// Fails if the source is closed; fill errors propagate unchanged.
	pub fn eof(&mut self) -> Result<bool> {
		self.check_open(Read)?;
		if self.head()?.is_some() {
			return Ok(false)
		}
		Ok(!self.fill_next()?)
	}

	/// Fills until at least `count` bytes are buffered, returning whether
	/// enough are available. Reaching end-of-stream first returns `false`
	/// rather than an error; for the erroring version use
	/// [`require`](Self::require).
	pub fn request(&mut self, count: usize) -> Result<bool> {
		self.check_open(Read)?;
		while self.available() < count {
			if !self.fill_next()? {
				return Ok(false)
			}
		}
		Ok(true)
	}

	/// Fills until at least `count` bytes are buffered.
	///
	/// # Errors
	///
	/// Fails with an end-of-stream error if the source ends first.
	pub fn require(&mut self, count: usize) -> Result {
		if !self.request(count)? {
			return Err(Error::end_of_stream(count, Read))
		}
		Ok(())
	}

	/// Reads one byte.
	///
	/// # Errors
	///
	/// Fails at end-of-stream or if the source is closed.
	pub fn read_u8(&mut self) -> Result<u8> {
		self.require(1)?;
		let Some(laden) = self.head()? else {
			return Err(Error::eos(Read))
		};
		let value = laden.block.get(laden.read);
		laden.read += 1;
		self.trim()?;
		Ok(value)
	}

	/// Reads an [`i8`].
	#[inline]
	pub fn read_i8(&mut self) -> Result<i8> {
		self.read_u8().map(|v| v as i8)
	}

	/// Reads a big-endian [`u16`].
	#[inline]
	pub fn read_u16(&mut self) -> Result<u16> { self.read_int() }

	/// Reads a little-endian [`u16`].
	#[inline]
	pub fn read_u16_le(&mut self) -> Result<u16> { self.read_int_le() }

	/// Reads a big-endian [`u32`].
	#[inline]
	pub fn read_u32(&mut self) -> Result<u32> { self.read_int() }

	/// Reads a little-endian [`u32`].
	#[inline]
	pub fn read_u32_le(&mut self) -> Result<u32> { self.read_int_le() }

	/// Reads a big-endian [`u64`].
	#[inline]
	pub fn read_u64(&mut self) -> Result<u64> { self.read_int() }

	/// Reads a little-endian [`u64`].
	#[inline]
	pub fn read_u64_le(&mut self) -> Result<u64> { self.read_int_le() }

	/// Reads a big-endian integer.
	#[inline]
	pub fn read_int<T: num_traits::PrimInt + bytemuck::Pod>(&mut self) -> Result<T> {
		self.read_pod().map(T::to_be)
	}

	/// Reads a little-endian integer.
	#[inline]
	pub fn read_int_le<T: num_traits::PrimInt + bytemuck::Pod>(&mut self) -> Result<T> {
		self.read_pod().map(T::to_le)
	}

	/// Reads an arbitrary [`Pod`] data type.
	///
	/// [`Pod`]: bytemuck::Pod
	#[inline]
	pub fn read_pod<T: bytemuck::Pod>(&mut self) -> Result<T> {
		let mut value = T::zeroed();
		self.read_slice_exact(bytemuck::bytes_of_mut(&mut value))?;
		Ok(value)
	}

	/// Reads the exact length of bytes into a slice, returning the number
	/// of bytes read. Nothing is consumed if an end-of-stream error is
	/// returned.
	pub fn read_slice_exact(&mut self, buf: &mut [u8]) -> Result<usize> {
		self.require(buf.len())?;
		let mut read = 0;
		while read < buf.len() {
			let Some(laden) = self.head()? else {
				return Err(Error::eos(Read))
			};
			let take = laden.len().min(buf.len() - read);
			buf[read..read + take]
				.copy_from_slice(&laden.block.data()[laden.read..laden.read + take]);
			laden.read += take;
			read += take;
		}
		self.trim()?;
		Ok(read)
	}

	/// Reads exactly `count` bytes, filling as many times as it takes.
	///
	/// # Errors
	///
	/// Fails with an end-of-stream error if the source ends first; nothing
	/// is consumed in that case.
	pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
		let mut bytes = vec![0; count];
		self.read_slice_exact(&mut bytes)?;
		Ok(bytes)
	}

	/// Reads all remaining bytes until end-of-stream.
	pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
		self.check_open(Read)?;
		let mut bytes = Vec::new();
		loop {
			self.trim()?;
			for laden in self.fifo.iter_mut().skip(self.pos) {
				bytes.extend_from_slice(&laden.block.data()[laden.read..laden.end]);
				laden.read = laden.end;
			}
			self.trim()?;
			if !self.fill_next()? {
				break Ok(bytes)
			}
		}
	}

	/// Consumes exactly `count` bytes.
	///
	/// # Errors
	///
	/// Fails with an end-of-stream error if fewer are available; nothing is
	/// consumed in that case.
	pub fn skip(&mut self, count: usize) -> Result {
		self.check_open(Skip)?;
		if !self.request(count)? {
			return Err(Error::end_of_stream(count, Skip))
		}
		self.advance(count)
	}

	/// Consumes bytes up to, but not including, the first byte for which
	/// `predicate` returns `true`, returning the number of bytes consumed.
	/// At end-of-stream the count seen so far is returned without error.
	/// The matching byte stays next in the stream.
	pub fn read_until(&mut self, mut predicate: impl FnMut(u8) -> bool) -> Result<usize> {
		self.check_open(Read)?;
		let mut count = 0;
		loop {
			if self.head()?.is_none() && !self.fill_next()? {
				return Ok(count)
			}
			let Some(laden) = self.head()? else {
				return Ok(count)
			};
			while laden.read < laden.end {
				if predicate(laden.block.get(laden.read)) {
					return Ok(count)
				}
				laden.read += 1;
				count += 1;
			}
		}
	}

	/// Runs `body` with reads that do not consume from the outer stream:
	/// when it returns, normally or with an error, every block read during
	/// the preview is rewound and replayed to later reads. Blocks filled
	/// during the preview stay buffered. Previews nest; each rewinds to its
	/// own checkpoint.
	///
	/// # Errors
	///
	/// Fails if the source is closed, or with an end-of-stream error when
	/// no byte is buffered and the first fill attempt yields none. If
	/// `body` closes the source, the preview still returns `body`'s result;
	/// the terminal state surfaces on the next operation instead.
	pub fn preview<T>(
		&mut self,
		body: impl FnOnce(&mut Self) -> Result<T>
	) -> Result<T> {
		self.check_open(Preview)?;
		if self.head()?.is_none() && !self.fill_next()? {
			return Err(Error::eos(Preview))
		}
		self.trim()?;
		let mark = Mark { pos: self.pos, read: self.fifo[self.pos].read };
		self.marks.push(mark);
		let result = body(self);
		// close() inside the preview clears the mark stack; nothing is
		// rewound then, the stream is terminal.
		if let Some(mark) = self.marks.pop() {
			self.rewind(mark);
		}
		result
	}

	/// Rewinds the FIFO to `mark`. Entries past the mark position were
	/// either consumed during the preview or freshly filled; both rewind to
	/// their start.
	fn rewind(&mut self, mark: Mark) {
		if self.closed {
			return
		}
		for (i, laden) in self.fifo.iter_mut().enumerate().skip(mark.pos) {
			laden.read = if i == mark.pos { mark.read } else { 0 };
		}
		self.pos = mark.pos;
	}

	/// Hands the current filled block to `sink`'s flush path without
	/// copying, returning the number of bytes transferred. The sink's drain
	/// hook observes the very block this source's fill wrote into. With
	/// nothing buffered, one fill attempt is made first; `0` is returned at
	/// end-of-stream.
	///
	/// The block never changes owner: once drained it is collected into
	/// this source's pool, which need not be the sink's.
	pub fn read_available_to<S2: Sink, P2: Pool>(
		&mut self,
		sink: &mut BufferedSink<S2, P2>
	) -> Result<usize> {
		self.check_open(Read)?;
		if self.head()?.is_none() && !self.fill_next()? {
			return Ok(0)
		}
		self.trim()?;
		let laden = &mut self.fifo[self.pos];
		let count = laden.len();
		sink.forward(&laden.block, laden.read, laden.end)?;
		laden.read = laden.end;
		self.trim()?;
		Ok(count)
	}

	/// Reads available bytes into the caller's block starting at `start`,
	/// returning the new write index. Buffered bytes are copied out first;
	/// with nothing buffered, the source fills `block[start..capacity]`
	/// directly, bypassing the pool.
	pub fn read_available_into(&mut self, block: &mut Block, start: usize) -> Result<usize> {
		self.check_open(Read)?;
		let capacity = block.capacity();
		if start >= capacity {
			return Ok(start)
		}
		if self.head()?.is_some() {
			let mut at = start;
			while at < capacity {
				let Some(laden) = self.head()? else { break };
				let take = laden.len().min(capacity - at);
				laden.block.copy_to(block, laden.read, laden.read + take, at);
				laden.read += take;
				at += take;
			}
			self.trim()?;
			Ok(at)
		} else if self.source_eof {
			Ok(start)
		} else {
			let count = self.source.fill(block, start, capacity)?;
			if count == 0 {
				self.source_eof = true;
			}
			Ok(start + count)
		}
	}

	/// Streams everything to `sink` with [`read_available_to`] transfers
	/// until end-of-stream, returning the total. On a closed source this
	/// returns `0` rather than failing, so shutdown paths can drain
	/// unconditionally.
	///
	/// [`read_available_to`]: Self::read_available_to
	pub fn copy_all_to<S2: Sink, P2: Pool>(
		&mut self,
		sink: &mut BufferedSink<S2, P2>
	) -> Result<usize> {
		if self.closed {
			return Ok(0)
		}
		let mut total = 0;
		loop {
			match self.read_available_to(sink)? {
				0 => break Ok(total),
				count => total += count,
			}
		}
	}

	/// Streams exactly `count` bytes to `sink`, returning `count`. Whole
	/// blocks transfer zero-copy; a final partial block is copied so its
	/// remainder stays buffered for later reads. On a closed source this
	/// returns `0` rather than failing, like [`copy_all_to`].
	///
	/// # Errors
	///
	/// Fails with an end-of-stream error if the source ends first.
	///
	/// [`copy_all_to`]: Self::copy_all_to
	pub fn copy_to<S2: Sink, P2: Pool>(
		&mut self,
		sink: &mut BufferedSink<S2, P2>,
		count: usize
	) -> Result<usize> {
		if self.closed {
			return Ok(0)
		}
		let mut remaining = count;
		while remaining > 0 {
			if self.head()?.is_none() && !self.fill_next()? {
				return Err(Error::end_of_stream(remaining, Context::Copy))
			}
			self.trim()?;
			let laden = &mut self.fifo[self.pos];
			let len = laden.len();
			if len <= remaining {
				sink.forward(&laden.block, laden.read, laden.end)?;
				laden.read = laden.end;
				remaining -= len;
				self.trim()?;
			} else {
				let start = laden.read;
				sink.write_from_slice(&self.fifo[self.pos].block.data()[start..start + remaining])?;
				self.fifo[self.pos].read += remaining;
				remaining = 0;
			}
		}
		Ok(count)
	}

	/// Collects every buffered block, closes the source and marks this
	/// reader closed. Closing again is a no-op; any other operation fails
	/// once closed. Inside a preview this is terminal: nothing is rewound.
	pub fn close(&mut self) -> Result {
		if !self.closed {
			self.closed = true;
			self.marks.clear();
			self.pos = 0;
			let mut collected = Ok(());
			while let Some(laden) = self.fifo.pop_front() {
				let result = self.pool.collect(laden.block).context(Close);
				if collected.is_ok() {
					collected = result;
				}
			}
			let closed = self.source.close();
			collected?;
			closed
		} else {
			Ok(())
		}
	}
}

impl<S: Source, P: Pool> Drop for BufferedSource<S, P> {
	fn drop(&mut self) {
		let _ = self.close();
	}
}

/// A push-based writer that accumulates typed writes into a pooled block
/// and drains it into a [`Sink`] when it fills or on flush.
pub struct BufferedSink<S: Sink, P: Pool> {
	sink: S,
	pool: P,
	block: Option<Block>,
	filled: usize,
	closed: bool,
}

impl<S: Sink, P: Pool> BufferedSink<S, P> {
	pub fn new(sink: S, pool: P) -> Self {
		Self {
			sink,
			pool,
			block: None,
			filled: 0,
			closed: false,
		}
	}

	/// Returns whether the sink is closed.
	pub fn is_closed(&self) -> bool { self.closed }

	#[inline]
	fn check_open(&self, context: Context) -> Result {
		if self.closed {
			Err(Error::closed(context))
		} else {
			Ok(())
		}
	}

	/// Returns the pending block and its fill index, claiming a fresh block
	/// when none is pending.
	fn pending(&mut self) -> Result<(&mut Block, &mut usize)> {
		let Self { block, pool, filled, .. } = self;
		if block.is_none() {
			*block = Some(pool.claim().context(Write)?);
			*filled = 0;
		}
		let block = block.as_mut().expect("pending block was just claimed");
		Ok((block, filled))
	}

	/// Drains the pending block into the sink and collects it. The block
	/// is collected even when the sink's drain fails.
	fn drain_pending(&mut self) -> Result {
		let Self { block, filled, sink, pool, .. } = self;
		if let Some(block) = block.take() {
			let filled = mem::replace(filled, 0);
			let drained = if filled > 0 {
				sink.drain(&block, 0, filled)
			} else {
				Ok(())
			};
			let collected = pool.collect(block).context(Drain);
			drained?;
			collected?;
		}
		Ok(())
	}

	/// Appends one byte.
	pub fn write_u8(&mut self, value: u8) -> Result {
		self.check_open(Write)?;
		let (block, filled) = self.pending()?;
		block.set(*filled, value);
		*filled += 1;
		if *filled == block.capacity() {
			self.drain_pending()?;
		}
		Ok(())
	}

	/// Writes an [`i8`].
	#[inline]
	pub fn write_i8(&mut self, value: i8) -> Result {
		self.write_u8(value as u8)
	}

	/// Writes a big-endian [`u16`].
	#[inline]
	pub fn write_u16(&mut self, value: u16) -> Result { self.write_int(value) }

	/// Writes a little-endian [`u16`].
	#[inline]
	pub fn write_u16_le(&mut self, value: u16) -> Result { self.write_int_le(value) }

	/// Writes a big-endian [`u32`].
	#[inline]
	pub fn write_u32(&mut self, value: u32) -> Result { self.write_int(value) }

	/// Writes a little-endian [`u32`].
	#[inline]
	pub fn write_u32_le(&mut self, value: u32) -> Result { self.write_int_le(value) }

	/// Writes a big-endian [`u64`].
	#[inline]
	pub fn write_u64(&mut self, value: u64) -> Result { self.write_int(value) }

	/// Writes a little-endian [`u64`].
	#[inline]
	pub fn write_u64_le(&mut self, value: u64) -> Result { self.write_int_le(value) }

	/// Writes a big-endian integer.
	#[inline]
	pub fn write_int<T: num_traits::PrimInt + bytemuck::Pod>(&mut self, value: T) -> Result {
		self.write_pod(value.to_be())
	}

	/// Writes a little-endian integer.
	#[inline]
	pub fn write_int_le<T: num_traits::PrimInt + bytemuck::Pod>(&mut self, value: T) -> Result {
		self.write_pod(value.to_le())
	}

	/// Writes an arbitrary [`Pod`] data type.
	///
	/// [`Pod`]: bytemuck::Pod
	#[inline]
	pub fn write_pod<T: bytemuck::Pod>(&mut self, value: T) -> Result {
		self.write_from_slice(bytemuck::bytes_of(&value))?;
		Ok(())
	}

	/// Writes bytes from a slice through pooled blocks, returning the
	/// number of bytes written.
	pub fn write_from_slice(&mut self, mut buf: &[u8]) -> Result<usize> {
		self.check_open(Write)?;
		let count = buf.len();
		while !buf.is_empty() {
			let (block, filled) = self.pending()?;
			let take = (block.capacity() - *filled).min(buf.len());
			block.data_mut()[*filled..*filled + take].copy_from_slice(&buf[..take]);
			*filled += take;
			buf = &buf[take..];
			if *filled == block.capacity() {
				self.drain_pending()?;
			}
		}
		Ok(count)
	}

	/// Appends a whole block of bytes. When the block fits the pending
	/// block's remaining space it is copied; otherwise pending bytes are
	/// drained first and the caller's block goes to the sink's drain hook
	/// in a single call, never copied into a pooled block.
	pub fn write_block(&mut self, block: &Block) -> Result {
		self.check_open(Write)?;
		let count = block.capacity();
		if count == 0 {
			return Ok(())
		}
		let (pending, filled) = self.pending()?;
		if *filled + count <= pending.capacity() {
			block.copy_to(pending, 0, count, *filled);
			*filled += count;
			if *filled == pending.capacity() {
				self.drain_pending()?;
			}
			Ok(())
		} else {
			self.drain_pending()?;
			self.sink.drain(block, 0, count)
		}
	}

	/// Forwards a borrowed block range straight to the sink, draining any
	/// pending bytes first to preserve write order. This is the receiving
	/// end of [`BufferedSource::read_available_to`]; the caller keeps
	/// ownership of the block.
	pub fn forward(&mut self, block: &Block, start: usize, end: usize) -> Result {
		self.check_open(Drain)?;
		self.drain_pending()?;
		self.sink.drain(block, start, end)
	}

	/// Drains the pending block, then flushes the sink.
	pub fn flush(&mut self) -> Result {
		self.check_open(Flush)?;
		self.drain_pending()?;
		self.sink.flush()
	}

	/// Flushes, then closes the sink. Closing again is a no-op; any other
	/// operation fails once closed. Every step runs even if an earlier one
	/// fails; the first error wins.
	pub fn close(&mut self) -> Result {
		if !self.closed {
			self.closed = true;
			let drained = self.drain_pending();
			let flushed = self.sink.flush();
			let closed = self.sink.close();
			drained?;
			flushed?;
			closed
		} else {
			Ok(())
		}
	}
}

impl<S: Sink, P: Pool> Drop for BufferedSink<S, P> {
	fn drop(&mut self) {
		let _ = self.close();
	}
}
