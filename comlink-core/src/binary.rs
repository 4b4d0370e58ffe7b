//! Binary encode/decode for `Instance`s: concatenation of fields/elements
//! at fixed offsets, with a single optional variable-length tail handled
//! by slicing the remainder of the enclosing container.

use comlink_types::{ComError, Endian};

use crate::descriptor::{self, TypeDescriptor, ValidDescriptor};
use crate::instance::Instance;

/// Encode `instance` to bytes per `desc`'s layout, honoring `endian`.
///
/// Fields/elements are concatenated in declared order with no padding and
/// no length prefixes. The caller is responsible for ensuring
/// `instance` actually conforms to `desc`; this function trusts its input
/// the way the rest of the recursive encoder does.
#[must_use]
pub fn pack_bytes(desc: &ValidDescriptor, instance: &Instance, endian: Endian) -> Vec<u8> {
    let mut out = Vec::with_capacity(instance.current_size());
    encode(desc.descriptor(), instance, endian, &mut out);
    out
}

fn encode(desc: &TypeDescriptor, instance: &Instance, endian: Endian, out: &mut Vec<u8>) {
    match (desc, instance) {
        (TypeDescriptor::Null, Instance::Null) => {}
        (TypeDescriptor::Scalar(_) | TypeDescriptor::Number(_), Instance::Scalar(v)) => {
            out.extend_from_slice(&v.to_bytes(endian));
        }
        (TypeDescriptor::Struct(fields), Instance::Struct(values)) => {
            for field in fields {
                let (_, child) = values
                    .iter()
                    .find(|(k, _)| k == &field.name)
                    .expect("instance shape matches descriptor");
                encode(&field.ty, child, endian, out);
            }
        }
        (TypeDescriptor::FixedArray { element, .. } | TypeDescriptor::DynamicArray { element }, Instance::Array(items)) => {
            for item in items {
                encode(element, item, endian, out);
            }
        }
        _ => unreachable!("instance shape does not match descriptor"),
    }
}

/// Decode `bytes` into an instance of `desc`, honoring `endian`.
pub fn unpack_bytes(desc: &ValidDescriptor, bytes: &[u8], endian: Endian) -> Result<Instance, ComError> {
    decode(desc.descriptor(), bytes, endian)
}

fn decode(desc: &TypeDescriptor, bytes: &[u8], endian: Endian) -> Result<Instance, ComError> {
    match desc {
        TypeDescriptor::Null => {
            if !bytes.is_empty() {
                return Err(ComError::LengthMismatch {
                    expected: "0 bytes for Null".into(),
                    actual: bytes.len(),
                });
            }
            Ok(Instance::Null)
        }
        TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k) => Ok(Instance::Scalar(k.from_bytes(bytes, endian)?)),
        TypeDescriptor::Struct(fields) => {
            let known_size = descriptor::size(desc);
            if let Some(total) = known_size {
                if bytes.len() != total {
                    return Err(ComError::LengthMismatch {
                        expected: format!("{total} bytes for struct"),
                        actual: bytes.len(),
                    });
                }
            } else {
                let min = descriptor::min_size(desc);
                if bytes.len() < min {
                    return Err(ComError::LengthMismatch {
                        expected: format!("at least {min} bytes for struct"),
                        actual: bytes.len(),
                    });
                }
            }
            let mut offset = 0usize;
            let mut out = Vec::with_capacity(fields.len());
            for (idx, field) in fields.iter().enumerate() {
                let is_last = idx + 1 == fields.len();
                let field_bytes = match descriptor::size(&field.ty) {
                    Some(width) => {
                        let slice = &bytes[offset..offset + width];
                        offset += width;
                        slice
                    }
                    None => {
                        debug_assert!(is_last, "only the last field may be variable-length");
                        &bytes[offset..]
                    }
                };
                out.push((field.name.clone(), decode(&field.ty, field_bytes, endian)?));
            }
            Ok(Instance::Struct(out))
        }
        TypeDescriptor::FixedArray { element, length } => {
            let elem_size = descriptor::size(element).expect("validated fixed-size element");
            let total = elem_size * length;
            if bytes.len() != total {
                return Err(ComError::LengthMismatch {
                    expected: format!("{total} bytes for [{length}] array"),
                    actual: bytes.len(),
                });
            }
            let out = if elem_size == 0 {
                (0..*length)
                    .map(|_| decode(element, &[], endian))
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                bytes
                    .chunks(elem_size)
                    .map(|chunk| decode(element, chunk, endian))
                    .collect::<Result<Vec<_>, _>>()?
            };
            Ok(Instance::Array(out))
        }
        TypeDescriptor::DynamicArray { element } => {
            let elem_size = descriptor::size(element).expect("validated fixed-size element");
            if elem_size == 0 {
                return Err(ComError::BadDeclaration(
                    "DynamicArray element must have non-zero size".into(),
                ));
            }
            if bytes.len() % elem_size != 0 {
                return Err(ComError::LengthMismatch {
                    expected: format!("a multiple of {elem_size} bytes"),
                    actual: bytes.len(),
                });
            }
            let count = bytes.len() / elem_size;
            let mut out = Vec::with_capacity(count);
            for chunk in bytes.chunks(elem_size) {
                out.push(decode(element, chunk, endian)?);
            }
            Ok(Instance::Array(out))
        }
    }
}
