// SPDX-License-Identifier: Apache-2.0

//! ## How it works
//!
//! Data moves through reusable fixed-size chunks of memory called *blocks*.
//! Blocks are claimed from a *pool*, filled by a source or a writer, and
//! collected back into the pool once their bytes are consumed. The default
//! pool instance is an `Rc<RefCell<...>>` container, so it's cheap to share
//! but must stay thread-local; each thread gets its own via [`pool::pool`].
//!
//! ### Reading
//!
//! [`BufferedSource`] wraps a [`Source`](streams::Source) and pulls data on
//! demand: each fill attempt claims one block, hands it to the source, and
//! appends it to an internal FIFO. Typed reads, skips and copies consume
//! from the front of that FIFO, returning each block to the pool as soon as
//! its last byte is read. [`BufferedSource::preview`] checkpoints the FIFO
//! so a closure can read ahead freely; when it returns, consumed blocks are
//! rewound instead of collected and every byte is replayed to later reads.
//!
//! ### Writing
//!
//! [`BufferedSink`] wraps a [`Sink`](streams::Sink) and accumulates writes
//! into a single pending block, draining it downstream whenever it fills or
//! the caller flushes. Whole-block writes that would not fit the pending
//! block skip the copy entirely and go straight to the sink.
//!
//! ### Zero-copy transfer
//!
//! [`BufferedSource::read_available_to`] lends the source's current filled
//! block to a [`BufferedSink`], which drains it downstream without an
//! intermediate copy. The block never changes owner: after the sink's drain
//! returns, it is collected into the pool it was claimed from, even when
//! the source and sink use different pools.

mod block;
mod buffered_wrappers;
mod error;
pub mod pool;
pub mod streams;

pub use block::*;
pub use buffered_wrappers::*;
pub use error::*;
