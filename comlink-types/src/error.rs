use thiserror::Error;

/// The complete error taxonomy shared by the serializer and the framed
/// channel.
///
/// Every fallible operation in `comlink-types`/`comlink-core` returns one of
/// these variants; none of them are swallowed or logged away by the core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComError {
    /// A `TypeDescriptor` violates a declaration rule (unnamed/duplicate
    /// field, variable-length member not last, zero-length fixed array, …).
    #[error("bad declaration: {0}")]
    BadDeclaration(String),

    /// An input value has the wrong shape for the target descriptor (e.g. a
    /// JSON array where an object was expected).
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Structural mismatch: unknown key, missing key, or wrong array length.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A numeric value does not fit the target `ScalarKind`.
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    /// A byte buffer's length does not match (or, for a dynamic array, is
    /// not a multiple of) the expected element/record size.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// What the decoder required, described for a human.
        expected: String,
        /// How many bytes were actually supplied.
        actual: usize,
    },

    /// Read/write of a name or index that is not declared, not permitted,
    /// or not mutable.
    #[error("access error: {0}")]
    AccessError(String),

    /// Malformed COBS frame.
    #[error("framing error: {0}")]
    FramingError(String),

    /// Input is not valid JSON.
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// The underlying byte stream failed, including an unexpected
    /// disconnect.
    #[error("transport error: {0}")]
    TransportError(String),

    /// A synchronous `request`'s deadline expired.
    #[error("request timed out")]
    Timeout,
}
