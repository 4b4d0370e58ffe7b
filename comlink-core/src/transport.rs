//! The external byte-stream seam the framed channel depends on.
//!
//! A narrow required surface: errors are reported through the crate's
//! own error type rather than a foreign one, and the channel builds its
//! own convenience (`request`) on top of the required primitives
//! (`send` + `poll`).

use bytes::Bytes;
use comlink_types::ComError;

use crate::channel::ChannelSettings;

/// A minimal, non-blocking byte-stream adapter.
///
/// Out of scope for this crate: implementing this trait for a real
/// serial/USB-CDC port, enumerating host OS ports, and any
/// process-level transport configuration are all external collaborators'
/// responsibility. `comlink-core` only consumes this contract.
pub trait Transport {
    /// Open the underlying stream using `settings`. Implementations may
    /// treat a second `open` while already open as either a no-op or an
    /// error; `Channel` itself never calls `open` on an already-open
    /// transport.
    fn open(&mut self, settings: &ChannelSettings) -> Result<(), ComError>;

    /// Close the underlying stream. Must not panic if already closed.
    fn close(&mut self);

    /// Whether the stream is currently open.
    fn is_open(&self) -> bool;

    /// Bytes currently known to be available to read. May be a lower
    /// bound: callers must tolerate this under-reporting and re-poll.
    fn bytes_waiting_in(&self) -> usize;

    /// Bytes currently queued to write but not yet flushed.
    fn bytes_waiting_out(&self) -> usize;

    /// Read up to `max_n` bytes without blocking. May return fewer bytes
    /// than requested, including zero; a zero-byte result is not an
    /// error.
    fn read_available(&mut self, max_n: usize) -> Bytes;

    /// Enqueue `bytes` for writing. Must either accept the whole slice or
    /// fail; the channel treats this as fire-and-forget.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ComError>;
}
