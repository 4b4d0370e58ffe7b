//! The framed, sequenced I/O channel: `open`/`close`/`send`/`poll` over a
//! narrow required `Transport`, with synchronous `request` built as a
//! convenience layer over `send` + `poll`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use comlink_types::ComError;
use log::{debug, trace, warn};

use crate::cobs;
use crate::transport::Transport;

/// How long `request`'s busy-poll loop sleeps between polls, to avoid
/// spinning the CPU while waiting for a response.
const POLL_BACKOFF: Duration = Duration::from_millis(5);

/// How many bytes `Channel::poll` asks the transport for per
/// `read_available` call while draining. Transports are free to return
/// fewer; the drain loop keeps calling until it gets an empty result.
const READ_CHUNK: usize = 4096;

/// Connection parameters captured once at construction.
///
/// Read-accessible via [`Channel::settings`], never mutated after
/// construction: the only way to change settings is to close the
/// channel and build a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    port_name: String,
    baud_rate: u32,
}

impl ChannelSettings {
    /// Build settings for a named port at a given baud rate. Both are
    /// forwarded to the `Transport` verbatim at `open` time; `comlink-core`
    /// assigns no meaning to either value itself.
    #[must_use]
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
        }
    }

    /// The configured port name (or other transport-specific address).
    #[must_use]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// The configured baud rate.
    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

/// A COBS-framed, sequence-tracked channel over a [`Transport`].
///
/// Holds the transport, its settings, the two monotonic sequence
/// counters, an incoming accumulation buffer, and a FIFO of completed
/// inbound frames each tagged with its `recv_idx`. Operates on
/// already-serialized byte payloads: pairing a `Channel` with the
/// compound serializer (`binary`/`json`) is the caller's job, kept as a
/// separate stage rather than threading a descriptor through every
/// channel method.
///
/// Not `Send`/`Sync`-bound away explicitly, but never required to be
/// either: a `Channel` is used from the one thread that owns it.
pub struct Channel<T: Transport> {
    transport: T,
    settings: ChannelSettings,
    sent_idx: u64,
    recv_idx: u64,
    incoming_buffer: BytesMut,
    completed: VecDeque<(u64, Bytes)>,
}

impl<T: Transport> Channel<T> {
    /// Build a channel over `transport` with `settings`. Does not open the
    /// transport; call [`Channel::open`] explicitly.
    pub fn new(transport: T, settings: ChannelSettings) -> Self {
        Self {
            transport,
            settings,
            sent_idx: 0,
            recv_idx: 0,
            incoming_buffer: BytesMut::new(),
            completed: VecDeque::new(),
        }
    }

    /// The settings this channel was constructed with.
    #[must_use]
    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Whether the underlying transport reports itself open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Open the transport. Idempotent: opening an already-open channel is
    /// a silent no-op.
    pub fn open(&mut self) -> Result<(), ComError> {
        if self.transport.is_open() {
            return Ok(());
        }
        self.transport.open(&self.settings)?;
        debug!("channel opened on {}", self.settings.port_name());
        Ok(())
    }

    /// Close the transport and reset all channel-owned state: the
    /// incoming buffer, the completed-frame queue, and both sequence
    /// counters return to their construction-time values.
    pub fn close(&mut self) {
        self.transport.close();
        self.incoming_buffer.clear();
        self.completed.clear();
        self.sent_idx = 0;
        self.recv_idx = 0;
        debug!("channel closed");
    }

    fn ensure_open(&mut self) -> Result<(), ComError> {
        if self.transport.is_open() {
            Ok(())
        } else {
            self.open()
        }
    }

    /// Frame `payload` with COBS plus a terminator and write it through
    /// the transport, non-blocking. Reopens the channel first if it is
    /// not already open. Returns the new `sent_idx`.
    ///
    /// A `TransportError` from the underlying write closes the channel
    /// before propagating.
    pub fn send(&mut self, payload: &[u8]) -> Result<u64, ComError> {
        self.ensure_open()?;
        let mut frame = cobs::encode(payload);
        frame.push(0);
        if let Err(err) = self.transport.write_all(&frame) {
            warn!("transport error during send, closing channel: {err}");
            self.close();
            return Err(err);
        }
        self.sent_idx += 1;
        trace!("sent frame sent_idx={}", self.sent_idx);
        Ok(self.sent_idx)
    }

    /// Drain whatever bytes are immediately available from the transport,
    /// splitting on every `0x00` into completed frames tagged with the
    /// next `recv_idx` in arrival order. The incoming buffer never itself
    /// contains a `0x00`.
    fn drain(&mut self) {
        loop {
            let chunk = self.transport.read_available(READ_CHUNK);
            if chunk.is_empty() {
                break;
            }
            for byte in chunk.iter().copied() {
                if byte == 0 {
                    self.recv_idx += 1;
                    let frame = std::mem::replace(&mut self.incoming_buffer, BytesMut::new()).freeze();
                    trace!("drained frame recv_idx={}", self.recv_idx);
                    self.completed.push_back((self.recv_idx, frame));
                } else {
                    self.incoming_buffer.extend_from_slice(&[byte]);
                }
            }
        }
    }

    /// Pop and decode the earliest completed frame, if any. Never
    /// suspends: it only consults the transport's current state and
    /// returns immediately, whether or not a frame was ready.
    pub fn poll(&mut self) -> Result<Option<(Vec<u8>, u64)>, ComError> {
        self.drain();
        match self.completed.pop_front() {
            Some((idx, frame)) => {
                let payload = cobs::decode(&frame)?;
                Ok(Some((payload, idx)))
            }
            None => Ok(None),
        }
    }

    /// Send `payload` and busy-poll until the response tagged with the
    /// just-incremented `sent_idx` arrives. Frames received with an
    /// earlier index are discarded as responses to async `send` calls
    /// the application chose not to collect.
    ///
    /// `timeout == Duration::ZERO` blocks indefinitely; otherwise the call
    /// fails with `Timeout` once the deadline passes, and the channel is
    /// closed as a documented side effect; the caller must reopen
    /// explicitly before trying again.
    pub fn request(&mut self, payload: &[u8], timeout: Duration) -> Result<(Vec<u8>, u64), ComError> {
        let target_idx = self.send(payload)?;
        let deadline = if timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + timeout)
        };

        loop {
            self.drain();
            while let Some(&(idx, _)) = self.completed.front() {
                if idx >= target_idx {
                    break;
                }
                let (idx, _stale) = self.completed.pop_front().expect("front just peeked");
                trace!("discarding stale frame recv_idx={idx} before awaited {target_idx}");
            }
            if let Some(&(idx, _)) = self.completed.front() {
                if idx == target_idx {
                    let (idx, frame) = self.completed.pop_front().expect("front just peeked");
                    let decoded = cobs::decode(&frame)?;
                    return Ok((decoded, idx));
                }
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!("request timed out awaiting recv_idx={target_idx}, closing channel");
                    self.close();
                    return Err(ComError::Timeout);
                }
            }
            std::thread::sleep(POLL_BACKOFF);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An in-memory loopback transport: everything written becomes
    /// immediately readable, so `send`/`poll` exercise real framing
    /// without a real echo device.
    struct LoopbackTransport {
        open: bool,
        inbox: VecDeque<u8>,
    }

    impl LoopbackTransport {
        fn new() -> Self {
            Self {
                open: false,
                inbox: VecDeque::new(),
            }
        }
    }

    impl Transport for LoopbackTransport {
        fn open(&mut self, _settings: &ChannelSettings) -> Result<(), ComError> {
            self.open = true;
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
            self.inbox.clear();
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn bytes_waiting_in(&self) -> usize {
            self.inbox.len()
        }

        fn bytes_waiting_out(&self) -> usize {
            0
        }

        fn read_available(&mut self, max_n: usize) -> Bytes {
            let bytes: Vec<u8> = (0..max_n.min(self.inbox.len())).filter_map(|_| self.inbox.pop_front()).collect();
            Bytes::from(bytes)
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<(), ComError> {
            self.inbox.extend(bytes);
            Ok(())
        }
    }

    #[test]
    fn open_is_idempotent() {
        let mut ch = Channel::new(LoopbackTransport::new(), ChannelSettings::new("loop0", 115_200));
        ch.open().unwrap();
        ch.open().unwrap();
        assert!(ch.is_open());
    }

    #[test]
    fn close_resets_counters_and_buffers() {
        let mut ch = Channel::new(LoopbackTransport::new(), ChannelSettings::new("loop0", 9600));
        ch.send(b"a").unwrap();
        ch.close();
        assert!(!ch.is_open());
        ch.open().unwrap();
        let idx = ch.send(b"b").unwrap();
        assert_eq!(idx, 1, "sent_idx resets to 0 on close");
    }

    #[test]
    fn send_then_poll_echoes_in_order() {
        let mut ch = Channel::new(LoopbackTransport::new(), ChannelSettings::new("loop0", 9600));
        let idx_a = ch.send(b"a").unwrap();
        let idx_b = ch.send(b"b").unwrap();
        assert_eq!((idx_a, idx_b), (1, 2));

        let (payload, recv_idx) = ch.poll().unwrap().unwrap();
        assert_eq!((payload.as_slice(), recv_idx), (b"a".as_slice(), 1));
        let (payload, recv_idx) = ch.poll().unwrap().unwrap();
        assert_eq!((payload.as_slice(), recv_idx), (b"b".as_slice(), 2));
        assert!(ch.poll().unwrap().is_none());
    }

    #[test]
    fn echo_transport_sequencing_scenario() {
        let mut ch = Channel::new(LoopbackTransport::new(), ChannelSettings::new("loop0", 9600));
        ch.open().unwrap();

        assert_eq!(ch.send(b"a").unwrap(), 1);
        assert_eq!(ch.send(b"b").unwrap(), 2);

        assert_eq!(ch.poll().unwrap(), Some((b"a".to_vec(), 1)));
        assert_eq!(ch.poll().unwrap(), Some((b"b".to_vec(), 2)));

        let (value, recv_idx) = ch.request(b"c", Duration::from_secs(1)).unwrap();
        assert_eq!(value, b"c".to_vec());
        assert_eq!(recv_idx, 3);
    }

    #[test]
    fn request_times_out_and_closes_channel_when_no_response_arrives() {
        let mut ch = Channel::new(NeverRespondsTransport::default(), ChannelSettings::new("loop0", 9600));
        let err = ch.request(b"ping", Duration::from_millis(20));
        assert!(matches!(err, Err(ComError::Timeout)));
        assert!(!ch.is_open());
    }

    #[derive(Default)]
    struct NeverRespondsTransport {
        open: bool,
    }

    impl Transport for NeverRespondsTransport {
        fn open(&mut self, _settings: &ChannelSettings) -> Result<(), ComError> {
            self.open = true;
            Ok(())
        }
        fn close(&mut self) {
            self.open = false;
        }
        fn is_open(&self) -> bool {
            self.open
        }
        fn bytes_waiting_in(&self) -> usize {
            0
        }
        fn bytes_waiting_out(&self) -> usize {
            0
        }
        fn read_available(&mut self, _max_n: usize) -> Bytes {
            Bytes::new()
        }
        fn write_all(&mut self, _bytes: &[u8]) -> Result<(), ComError> {
            Ok(())
        }
    }
}
