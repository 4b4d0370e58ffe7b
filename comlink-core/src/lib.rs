//! `comlink-core`: the declarative compound-type serializer, the COBS
//! framer, and the sequenced `Channel` built on top of a narrow
//! `Transport` seam.
//!
//! Built on [`comlink_types`]: this crate owns every algorithm, the
//! foundation crate owns only the primitive vocabulary (`ScalarKind`,
//! `Endian`, `ComError`).

mod binary;
mod channel;
mod cobs;
mod descriptor;
mod instance;
mod json;
mod transport;

pub use binary::{pack_bytes, unpack_bytes};
pub use channel::{Channel, ChannelSettings};
pub use descriptor::{min_size, size, StructField, TypeDescriptor, ValidDescriptor};
pub use instance::{Instance, Native};
pub use json::{pack_json, unpack_json};
pub use transport::Transport;

pub use comlink_types::{ComError, Endian, NativeValue, ScalarKind, ScalarValue};

/// Re-exported so callers writing their own `Transport` impls for
/// real-world byte streams can reuse it directly: the channel itself
/// depends only on this stateless free-function pair plus the trait.
pub mod framing {
    pub use crate::cobs::{decode, encode};
}
