// SPDX-License-Identifier: Apache-2.0

use std::{fmt, io, result};
use crate::pool::PoolError;

/// A boxed error of any kind, for sources and sinks with their own failure
/// modes.
pub type ErrorBox = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T = (), E = Error> = result::Result<T, E>;

/// The error type for `Block` streams, `BufferedSource` and `BufferedSink`.
///
/// Errors raised by a [`Source`](crate::streams::Source) or
/// [`Sink`](crate::streams::Sink) hook travel through the buffered wrappers
/// unmodified; only errors the wrappers raise themselves carry a wrapper
/// [`Context`].
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct Error {
	pub context: Context,
	pub source: ErrorSource,
}

/// An end-of-stream error.
#[derive(Copy, Clone, Debug, Default, thiserror::Error)]
#[error("premature end-of-stream{}", self.format_req())]
pub struct EndOfStream {
	/// The number of bytes required for reading.
	pub required_count: Option<usize>,
}

impl EndOfStream {
	fn format_req(&self) -> String {
		self.required_count.map_or_else(
			Default::default,
			|n| format!(" (required {n} bytes)")
		)
	}
}

impl From<usize> for EndOfStream {
	fn from(value: usize) -> Self {
		Self { required_count: Some(value) }
	}
}

/// The source error encountered.
#[derive(Debug, thiserror::Error, strum::EnumIs)]
#[non_exhaustive]
pub enum ErrorSource {
	/// The stream is closed.
	#[error("stream closed")]
	Closed,
	/// End-of-stream was reached prematurely.
	#[error(transparent)]
	Eos(EndOfStream),
	/// A block pool error.
	#[error(transparent)]
	Pool(#[from] PoolError),
	/// An IO error.
	#[error(transparent)]
	Io(io::Error),
	/// An unknown error.
	#[error(transparent)]
	Other(#[from] ErrorBox),
}

/// The operation attempted when the error was encountered.
#[derive(Copy, Clone, Debug, Default, strum::EnumIs)]
#[non_exhaustive]
pub enum Context {
	/// Unknown operation.
	#[default]
	Unknown,
	/// Reading from the stream.
	Read,
	/// Skipping buffered bytes.
	Skip,
	/// Filling from the source.
	Fill,
	/// Draining into the sink.
	Drain,
	/// Writing to the stream.
	Write,
	/// Flushing the sink.
	Flush,
	/// Copying between streams.
	Copy,
	/// Previewing the stream.
	Preview,
	/// Closing the stream.
	Close,
}

impl Error {
	pub fn new(context: Context, source: ErrorSource) -> Self {
		Self { context, source }
	}

	pub fn closed(context: Context) -> Self {
		Self::new(context, ErrorSource::Closed)
	}

	pub fn eos(context: Context) -> Self {
		Self::new(context, ErrorSource::Eos(EndOfStream::default()))
	}

	pub fn end_of_stream(required_count: usize, context: Context) -> Self {
		Self::new(context, ErrorSource::Eos(required_count.into()))
	}

	/// Wraps an arbitrary error, for use by source and sink implementations.
	pub fn other(error: impl Into<ErrorBox>) -> Self {
		Self::new(Context::Unknown, ErrorSource::Other(error.into()))
	}

	pub fn is_closed(&self) -> bool { self.source.is_closed() }
	pub fn is_eos(&self) -> bool { self.source.is_eos() }
}

impl From<ErrorSource> for Error {
	fn from(value: ErrorSource) -> Self {
		Self::new(Context::Unknown, value)
	}
}

impl From<PoolError> for Error {
	fn from(value: PoolError) -> Self {
		<Self as From<ErrorSource>>::from(value.into())
	}
}

impl From<io::Error> for Error {
	fn from(value: io::Error) -> Self {
		<Self as From<ErrorSource>>::from(value.into())
	}
}

impl From<io::Error> for ErrorSource {
	fn from(value: io::Error) -> Self {
		if let io::ErrorKind::UnexpectedEof = value.kind() {
			Self::Eos(EndOfStream::default())
		} else {
			Self::Io(value)
		}
	}
}

impl Context {
	pub fn as_str(&self) -> &'static str {
		match self {
			Context::Unknown => "unknown operation",
			Context::Read    => "read from stream",
			Context::Skip    => "skip buffered bytes",
			Context::Fill    => "fill from source",
			Context::Drain   => "drain into sink",
			Context::Write   => "write to stream",
			Context::Flush   => "flush sink",
			Context::Copy    => "copy between streams",
			Context::Preview => "preview stream",
			Context::Close   => "close stream",
		}
	}
}

impl fmt::Display for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

pub(crate) trait ResultExt<T> {
	fn context(self, context: Context) -> crate::Result<T>;
}

impl<T, E: Into<ErrorSource>> ResultExt<T> for Result<T, E> {
	fn context(self, context: Context) -> crate::Result<T> {
		self.map_err(|err| Error::new(context, err.into()))
	}
}
