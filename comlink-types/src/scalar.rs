use crate::endian::{Endian, ResolvedEndian};
use crate::error::ComError;

/// The C primitive numeric kinds a `Scalar`/`Number` descriptor can wrap.
///
/// `Char` is a single unsigned byte with C `char` semantics: it encodes to
/// one wire byte like `U8`, but decodes to a one-character JSON string
/// rather than a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
}

/// A concrete value conforming to a `ScalarKind`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(u8),
}

/// A native source value to be cast into a `ScalarValue` via
/// `ScalarKind::try_cast`. Used both for `from_native` construction and for
/// decoding JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeValue {
    /// A signed source value (JSON integers, Rust integer literals).
    Int(i128),
    /// An unsigned source value, for magnitudes `i128` cannot hold.
    UInt(u128),
    /// A floating-point source value.
    Float(f64),
}

impl ScalarKind {
    /// The fixed byte width of this kind. Every `ScalarKind` is fixed-size;
    /// there is no variable-length scalar.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 | Self::Char => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// The zero-like default value used when an `Instance` is constructed
    /// without an explicit source.
    #[must_use]
    pub const fn default_value(self) -> ScalarValue {
        match self {
            Self::I8 => ScalarValue::I8(0),
            Self::U8 => ScalarValue::U8(0),
            Self::I16 => ScalarValue::I16(0),
            Self::U16 => ScalarValue::U16(0),
            Self::I32 => ScalarValue::I32(0),
            Self::U32 => ScalarValue::U32(0),
            Self::I64 => ScalarValue::I64(0),
            Self::U64 => ScalarValue::U64(0),
            Self::F32 => ScalarValue::F32(0.0),
            Self::F64 => ScalarValue::F64(0.0),
            Self::Char => ScalarValue::Char(0),
        }
    }

    /// Cast a native source value into this kind, rejecting values that do
    /// not fit rather than wrapping or saturating.
    ///
    /// Floats accept integer sources via exact widening: an integer that
    /// cannot be represented exactly by the target float is rejected.
    pub fn try_cast(self, value: NativeValue) -> Result<ScalarValue, ComError> {
        macro_rules! int_cast {
            ($variant:ident, $ty:ty) => {{
                let as_i128 = match value {
                    NativeValue::Int(i) => i,
                    NativeValue::UInt(u) => i128::try_from(u).map_err(|_| out_of_range(self, value))?,
                    NativeValue::Float(_) => return Err(out_of_range(self, value)),
                };
                let narrowed = <$ty>::try_from(as_i128).map_err(|_| out_of_range(self, value))?;
                Ok(ScalarValue::$variant(narrowed))
            }};
        }

        match self {
            Self::I8 => int_cast!(I8, i8),
            Self::U8 => int_cast!(U8, u8),
            Self::I16 => int_cast!(I16, i16),
            Self::U16 => int_cast!(U16, u16),
            Self::I32 => int_cast!(I32, i32),
            Self::U32 => int_cast!(U32, u32),
            Self::I64 => int_cast!(I64, i64),
            Self::U64 => int_cast!(U64, u64),
            Self::Char => int_cast!(Char, u8),
            Self::F32 => {
                let f = match value {
                    NativeValue::Float(f) => f,
                    NativeValue::Int(i) => {
                        let f = i as f32;
                        if f as i128 != i {
                            return Err(out_of_range(self, value));
                        }
                        f as f64
                    }
                    NativeValue::UInt(u) => {
                        let f = u as f32;
                        if f as u128 != u {
                            return Err(out_of_range(self, value));
                        }
                        f as f64
                    }
                };
                #[allow(clippy::cast_possible_truncation)]
                Ok(ScalarValue::F32(f as f32))
            }
            Self::F64 => {
                let f = match value {
                    NativeValue::Float(f) => f,
                    NativeValue::Int(i) => {
                        let f = i as f64;
                        if f as i128 != i {
                            return Err(out_of_range(self, value));
                        }
                        f
                    }
                    NativeValue::UInt(u) => {
                        let f = u as f64;
                        if f as u128 != u {
                            return Err(out_of_range(self, value));
                        }
                        f
                    }
                };
                Ok(ScalarValue::F64(f))
            }
        }
    }

    /// Decode a byte slice of exactly `self.width()` bytes into a value,
    /// honoring `endian`. Fails with `LengthMismatch` if the slice is the
    /// wrong length.
    pub fn from_bytes(self, bytes: &[u8], endian: Endian) -> Result<ScalarValue, ComError> {
        if bytes.len() != self.width() {
            return Err(ComError::LengthMismatch {
                expected: format!("{} byte(s) for {self:?}", self.width()),
                actual: bytes.len(),
            });
        }
        let resolved = endian.resolve();
        macro_rules! decode {
            ($variant:ident, $ty:ty, $n:literal) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(bytes);
                let v = match resolved {
                    ResolvedEndian::Little => <$ty>::from_le_bytes(buf),
                    ResolvedEndian::Big => <$ty>::from_be_bytes(buf),
                };
                ScalarValue::$variant(v)
            }};
        }
        Ok(match self {
            Self::I8 => ScalarValue::I8(bytes[0] as i8),
            Self::U8 => ScalarValue::U8(bytes[0]),
            Self::Char => ScalarValue::Char(bytes[0]),
            Self::I16 => decode!(I16, i16, 2),
            Self::U16 => decode!(U16, u16, 2),
            Self::I32 => decode!(I32, i32, 4),
            Self::U32 => decode!(U32, u32, 4),
            Self::I64 => decode!(I64, i64, 8),
            Self::U64 => decode!(U64, u64, 8),
            Self::F32 => decode!(F32, f32, 4),
            Self::F64 => decode!(F64, f64, 8),
        })
    }
}

fn out_of_range(kind: ScalarKind, value: NativeValue) -> ComError {
    ComError::ValueOutOfRange(format!("{value:?} does not fit {kind:?}"))
}

impl ScalarValue {
    /// The kind this value conforms to.
    #[must_use]
    pub const fn kind(self) -> ScalarKind {
        match self {
            Self::I8(_) => ScalarKind::I8,
            Self::U8(_) => ScalarKind::U8,
            Self::I16(_) => ScalarKind::I16,
            Self::U16(_) => ScalarKind::U16,
            Self::I32(_) => ScalarKind::I32,
            Self::U32(_) => ScalarKind::U32,
            Self::I64(_) => ScalarKind::I64,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Char(_) => ScalarKind::Char,
        }
    }

    /// Encode this value to bytes, honoring `endian`. One-byte kinds ignore
    /// `endian` entirely.
    #[must_use]
    pub fn to_bytes(self, endian: Endian) -> Vec<u8> {
        let resolved = endian.resolve();
        macro_rules! encode {
            ($v:expr) => {
                match resolved {
                    ResolvedEndian::Little => $v.to_le_bytes().to_vec(),
                    ResolvedEndian::Big => $v.to_be_bytes().to_vec(),
                }
            };
        }
        match self {
            Self::I8(v) => vec![v as u8],
            Self::U8(v) => vec![v],
            Self::Char(v) => vec![v],
            Self::I16(v) => encode!(v),
            Self::U16(v) => encode!(v),
            Self::I32(v) => encode!(v),
            Self::U32(v) => encode!(v),
            Self::I64(v) => encode!(v),
            Self::U64(v) => encode!(v),
            Self::F32(v) => encode!(v),
            Self::F64(v) => encode!(v),
        }
    }

    /// View this value as a `NativeValue`, for round-tripping through
    /// `try_cast` (e.g. the Struct/Array "copy from compatible source"
    /// constructors in `comlink-core`).
    #[must_use]
    pub fn as_native(self) -> NativeValue {
        match self {
            Self::I8(v) => NativeValue::Int(v.into()),
            Self::I16(v) => NativeValue::Int(v.into()),
            Self::I32(v) => NativeValue::Int(v.into()),
            Self::I64(v) => NativeValue::Int(v.into()),
            Self::U8(v) => NativeValue::UInt(v.into()),
            Self::U16(v) => NativeValue::UInt(v.into()),
            Self::U32(v) => NativeValue::UInt(v.into()),
            Self::U64(v) => NativeValue::UInt(v.into()),
            Self::Char(v) => NativeValue::UInt(v.into()),
            Self::F32(v) => NativeValue::Float(v.into()),
            Self::F64(v) => NativeValue::Float(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_matches_c_primitive_size() {
        assert_eq!(ScalarKind::U16.width(), 2);
        assert_eq!(ScalarKind::F64.width(), 8);
        assert_eq!(ScalarKind::Char.width(), 1);
    }

    #[test]
    fn scalar_round_trip_little_endian() {
        let v = ScalarKind::U16.try_cast(NativeValue::Int(1)).unwrap();
        let bytes = v.to_bytes(Endian::Little);
        assert_eq!(bytes, vec![0x01, 0x00]);
        let back = ScalarKind::U16.from_bytes(&bytes, Endian::Little).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn scalar_round_trip_big_endian() {
        let v = ScalarKind::I32.try_cast(NativeValue::Int(-5)).unwrap();
        let bytes = v.to_bytes(Endian::Big);
        let back = ScalarKind::I32.from_bytes(&bytes, Endian::Big).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = ScalarKind::U32.from_bytes(&[0, 0, 0], Endian::Little);
        assert!(matches!(err, Err(ComError::LengthMismatch { .. })));
    }

    #[test]
    fn try_cast_rejects_out_of_range_unsigned() {
        let err = ScalarKind::U8.try_cast(NativeValue::Int(256));
        assert!(matches!(err, Err(ComError::ValueOutOfRange(_))));
    }

    #[test]
    fn try_cast_rejects_negative_into_unsigned() {
        let err = ScalarKind::U16.try_cast(NativeValue::Int(-1));
        assert!(matches!(err, Err(ComError::ValueOutOfRange(_))));
    }

    #[test]
    fn try_cast_widens_integer_into_float_exactly() {
        let v = ScalarKind::F64.try_cast(NativeValue::Int(7)).unwrap();
        assert_eq!(v, ScalarValue::F64(7.0));
    }

    #[test]
    fn try_cast_rejects_float_losing_precision_into_f32() {
        // 2^24 + 1 cannot be represented exactly as f32.
        let err = ScalarKind::F32.try_cast(NativeValue::Int(16_777_217));
        assert!(matches!(err, Err(ComError::ValueOutOfRange(_))));
    }

    #[test]
    fn try_cast_rejects_integer_losing_precision_into_f64() {
        // 2^53 + 1 cannot be represented exactly as f64.
        let err = ScalarKind::F64.try_cast(NativeValue::Int(9_007_199_254_740_993));
        assert!(matches!(err, Err(ComError::ValueOutOfRange(_))));
    }

    #[test]
    fn char_is_one_byte_regardless_of_endian() {
        let v = ScalarValue::Char(b'A');
        assert_eq!(v.to_bytes(Endian::Little), vec![b'A']);
        assert_eq!(v.to_bytes(Endian::Big), vec![b'A']);
    }
}
