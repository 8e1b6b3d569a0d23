// SPDX-License-Identifier: Apache-2.0

mod common;

use pretty_assertions::assert_eq;
use sluice::{buffer_sink, buffer_source, Block, ErrorSource, Result};
use sluice::pool::SharedPool;
use sluice::streams::{void_sink, SinkExt, SourceExt};
use crate::common::{pattern, ChunkedSource, FaultySource, RecordingSink, SingleShotPool};

#[test]
fn zero_copy_identity() -> Result {
	let source_pool = SingleShotPool::with_capacity(1024);
	let fill_id = source_pool.expected_id();
	let mut source = buffer_source(ChunkedSource::new(pattern(100), 100), source_pool.clone());

	let sink_pool = SingleShotPool::with_capacity(1024);
	let (sink, state) = RecordingSink::new();
	let mut sink = buffer_sink(sink, sink_pool.clone());

	assert_eq!(source.read_available_to(&mut sink)?, 100);

	// The sink's drain saw the very block the source's fill wrote into.
	assert_eq!(state.borrow().drains, vec![(fill_id, 0, 100)]);
	// The block went back to the source's pool; the sink's was never touched.
	assert!(source_pool.is_collected());
	assert!(!sink_pool.is_claimed());
	source.close()?;
	Ok(())
}

#[test]
fn transfer_fills_when_nothing_is_buffered() -> Result {
	let mut source = ChunkedSource::new(pattern(10), 10).buffered();
	let (sink, state) = RecordingSink::new();
	let mut sink = sink.buffered();

	assert_eq!(source.read_available_to(&mut sink)?, 10);
	assert_eq!(source.read_available_to(&mut sink)?, 0);
	assert_eq!(state.borrow().bytes, pattern(10));
	Ok(())
}

#[test]
fn transfer_preserves_write_order() -> Result {
	let mut source = ChunkedSource::new(pattern(100), 100).buffered();
	let (sink, state) = RecordingSink::new();
	let mut sink = sink.buffered();

	// Pending bytes drain before the forwarded block.
	sink.write_u8(0xEE)?;
	source.read_available_to(&mut sink)?;
	let mut expected = vec![0xEE];
	expected.extend(pattern(100));
	assert_eq!(state.borrow().bytes, expected);
	Ok(())
}

#[test]
fn direct_large_write() -> Result {
	let (sink, state) = RecordingSink::new();
	let mut sink = sink.buffered();

	let large = Block::from(vec![0; 4097]);
	let large_id = large.id();
	sink.write_u8(42)?;
	sink.write_block(&large)?;
	sink.close()?;

	let state = state.borrow();
	let mut expected = vec![42];
	expected.extend(vec![0; 4097]);
	assert_eq!(state.bytes, expected);
	// Two drains: the pending byte, then the whole large block in one call.
	assert_eq!(state.drains.len(), 2);
	assert_eq!(state.drains[1], (large_id, 0, 4097));
	Ok(())
}

#[test]
fn small_block_writes_coalesce() -> Result {
	let (sink, state) = RecordingSink::new();
	let mut sink = sink.buffered();

	sink.write_block(&Block::from(vec![1, 2, 3]))?;
	sink.write_block(&Block::from(vec![4, 5]))?;
	sink.flush()?;

	let state = state.borrow();
	assert_eq!(state.bytes, vec![1, 2, 3, 4, 5]);
	// Both fit one pooled block: a single drain on flush.
	assert_eq!(state.drains.len(), 1);
	Ok(())
}

#[test]
fn fill_into_offset() -> Result {
	let mut source = ChunkedSource::new(vec![7; 1023], 2048).buffered();
	let mut block = Block::with_capacity(1024);

	assert_eq!(source.read_available_into(&mut block, 1)?, 1024);
	assert_eq!(block.data()[0], 0);
	assert_eq!(&block.data()[1..], &[7; 1023][..]);
	assert!(source.eof()?);
	Ok(())
}

#[test]
fn buffered_bytes_copy_into_caller_block() -> Result {
	let data = pattern(10);
	let mut source = ChunkedSource::new(data.clone(), 4).buffered();
	source.request(10)?;

	let mut block = Block::with_capacity(8);
	assert_eq!(source.read_available_into(&mut block, 0)?, 8);
	assert_eq!(block.data(), &data[..8]);
	assert_eq!(source.read_u8()?, 8);
	Ok(())
}

#[test]
fn fill_errors_propagate_verbatim() -> Result {
	let pool = SharedPool::default();
	let mut source = buffer_source(FaultySource, pool.clone());
	let mut sink = void_sink().buffered();
	let mut block = Block::with_capacity(16);

	let errors = [
		source.read_u8().unwrap_err(),
		source.preview(|_| Ok(())).unwrap_err(),
		source.request(1).unwrap_err(),
		source.skip(1).unwrap_err(),
		source.eof().unwrap_err(),
		source.read_available_to(&mut sink).unwrap_err(),
		source.read_available_into(&mut block, 0).unwrap_err(),
	];
	for error in errors {
		assert_eq!(error.to_string(), "x");
		assert!(matches!(error.source, ErrorSource::Other(_)));
	}
	// No block leaked from any failing fill, and close still works.
	assert_eq!(pool.live_count(), 0);
	source.close()?;
	Ok(())
}
