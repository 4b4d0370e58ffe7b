//! Foundation types for `comlink`: the scalar numeric kinds, the
//! three-way endianness selector, and the shared error taxonomy.
//!
//! This crate has no notion of compound types, COBS framing, or channels —
//! those live in `comlink-core`, which depends on this crate for its
//! primitive vocabulary.

mod endian;
mod error;
mod scalar;

pub use endian::{Endian, ResolvedEndian};
pub use error::ComError;
pub use scalar::{NativeValue, ScalarKind, ScalarValue};
