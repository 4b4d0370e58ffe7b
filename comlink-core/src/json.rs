//! JSON encode/decode for `Instance`s.
//!
//! Uses `serde_json::Value` as a schema-free intermediate form: the
//! parsed value is walked and validated against the descriptor before
//! any `Instance` is built.

use comlink_types::{ComError, NativeValue, ScalarKind, ScalarValue};
use serde_json::Value;

use crate::descriptor::{TypeDescriptor, ValidDescriptor};
use crate::instance::Instance;

/// Render `instance` as JSON text. Struct keys are
/// emitted in declared order so output is deterministic; decoding does
/// not require any particular key order. Relies on the `preserve_order`
/// feature on `serde_json`; without it `Map` is a `BTreeMap` and silently
/// re-sorts keys alphabetically instead of preserving insertion order.
#[must_use]
pub fn pack_json(desc: &ValidDescriptor, instance: &Instance) -> String {
    to_value(desc.descriptor(), instance).to_string()
}

fn to_value(desc: &TypeDescriptor, instance: &Instance) -> Value {
    match (desc, instance) {
        (TypeDescriptor::Null, Instance::Null) => Value::Null,
        (TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k), Instance::Scalar(v)) => scalar_to_value(*k, *v),
        (TypeDescriptor::Struct(fields), Instance::Struct(values)) => {
            let mut map = serde_json::Map::with_capacity(fields.len());
            for field in fields {
                let (_, child) = values
                    .iter()
                    .find(|(k, _)| k == &field.name)
                    .expect("instance shape matches descriptor");
                map.insert(field.name.clone(), to_value(&field.ty, child));
            }
            Value::Object(map)
        }
        (TypeDescriptor::FixedArray { element, .. } | TypeDescriptor::DynamicArray { element }, Instance::Array(items)) => {
            Value::Array(items.iter().map(|item| to_value(element, item)).collect())
        }
        _ => unreachable!("instance shape does not match descriptor"),
    }
}

fn scalar_to_value(kind: ScalarKind, value: ScalarValue) -> Value {
    if matches!(kind, ScalarKind::Char) {
        let ScalarValue::Char(byte) = value else {
            unreachable!("Char kind always carries a Char value")
        };
        return Value::String((byte as char).to_string());
    }
    match value.as_native() {
        // ScalarKind never exceeds 8 bytes, so these always fit i64/u64.
        NativeValue::Int(i) => Value::Number(i64::try_from(i).expect("scalar value fits i64").into()),
        NativeValue::UInt(u) => Value::Number(u64::try_from(u).expect("scalar value fits u64").into()),
        NativeValue::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
    }
}

/// Parse `text` and decode it into an instance of `desc`, validating the
/// parsed shape against `desc` before any `Instance` is constructed: this
/// is the strict sibling of
/// [`Instance::from_native`][crate::instance::Instance::from_native]; an
/// extra JSON array element is a `ShapeMismatch` here (fixed length is
/// exact), where `from_native`'s array constructor is forgiving.
pub fn unpack_json(desc: &ValidDescriptor, text: &str) -> Result<Instance, ComError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ComError::JsonParseError(e.to_string()))?;
    from_value(desc.descriptor(), &value)
}

fn from_value(desc: &TypeDescriptor, value: &Value) -> Result<Instance, ComError> {
    match desc {
        TypeDescriptor::Null => match value {
            Value::Null => Ok(Instance::Null),
            _ => Err(ComError::TypeMismatch("expected JSON null".into())),
        },
        TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k) => scalar_from_value(*k, value),
        TypeDescriptor::Struct(fields) => {
            let Value::Object(map) = value else {
                return Err(ComError::TypeMismatch("expected a JSON object".into()));
            };
            for key in map.keys() {
                if !fields.iter().any(|f| &f.name == key) {
                    return Err(ComError::ShapeMismatch(format!("unknown key {key:?}")));
                }
            }
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                let child_value = map
                    .get(&field.name)
                    .ok_or_else(|| ComError::ShapeMismatch(format!("missing key {:?}", field.name)))?;
                out.push((field.name.clone(), from_value(&field.ty, child_value)?));
            }
            Ok(Instance::Struct(out))
        }
        TypeDescriptor::FixedArray { element, length } => {
            let Value::Array(items) = value else {
                return Err(ComError::TypeMismatch("expected a JSON array".into()));
            };
            if items.len() != *length {
                return Err(ComError::ShapeMismatch(format!(
                    "expected {length} elements, got {}",
                    items.len()
                )));
            }
            let out = items
                .iter()
                .map(|v| from_value(element, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instance::Array(out))
        }
        TypeDescriptor::DynamicArray { element } => {
            let Value::Array(items) = value else {
                return Err(ComError::TypeMismatch("expected a JSON array".into()));
            };
            let out = items
                .iter()
                .map(|v| from_value(element, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instance::Array(out))
        }
    }
}

fn scalar_from_value(kind: ScalarKind, value: &Value) -> Result<Instance, ComError> {
    if matches!(kind, ScalarKind::Char) {
        let Value::String(s) = value else {
            return Err(ComError::TypeMismatch("expected a one-character JSON string".into()));
        };
        let mut chars = s.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(ComError::ShapeMismatch("char string must be exactly one character".into()));
        };
        let code_point = c as u32;
        if code_point > 0xFF {
            return Err(ComError::ValueOutOfRange(format!("{c:?} is not a single byte")));
        }
        #[allow(clippy::cast_possible_truncation)]
        return Ok(Instance::Scalar(ScalarValue::Char(code_point as u8)));
    }

    let native = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                NativeValue::Int(i.into())
            } else if let Some(u) = n.as_u64() {
                NativeValue::UInt(u.into())
            } else if let Some(f) = n.as_f64() {
                NativeValue::Float(f)
            } else {
                return Err(ComError::TypeMismatch("unrepresentable JSON number".into()));
            }
        }
        _ => return Err(ComError::TypeMismatch("expected a JSON number".into())),
    };
    Ok(Instance::Scalar(kind.try_cast(native)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::StructField;
    use comlink_types::NativeValue;
    use crate::instance::Native;

    fn point_desc() -> ValidDescriptor {
        TypeDescriptor::Struct(vec![
            StructField::new("x", TypeDescriptor::Scalar(ScalarKind::I16)),
            StructField::new("y", TypeDescriptor::Scalar(ScalarKind::I16)),
        ])
        .into_valid()
        .unwrap()
    }

    #[test]
    fn struct_encodes_as_object_in_declared_order() {
        let desc = point_desc();
        let i = Instance::from_native(
            &desc,
            &Native::Struct(vec![
                ("x".into(), Native::Scalar(NativeValue::Int(1))),
                ("y".into(), Native::Scalar(NativeValue::Int(2))),
            ]),
        )
        .unwrap();
        assert_eq!(pack_json(&desc, &i), r#"{"x":1,"y":2}"#);
    }

    #[test]
    fn struct_key_order_follows_declaration_not_alphabetical_order() {
        let desc = TypeDescriptor::Struct(vec![
            StructField::new("z", TypeDescriptor::Scalar(ScalarKind::I16)),
            StructField::new("a", TypeDescriptor::Scalar(ScalarKind::I16)),
        ])
        .into_valid()
        .unwrap();
        let i = Instance::from_native(
            &desc,
            &Native::Struct(vec![
                ("z".into(), Native::Scalar(NativeValue::Int(1))),
                ("a".into(), Native::Scalar(NativeValue::Int(2))),
            ]),
        )
        .unwrap();
        assert_eq!(pack_json(&desc, &i), r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn round_trips_through_json() {
        let desc = point_desc();
        let i = Instance::from_native(
            &desc,
            &Native::Struct(vec![
                ("x".into(), Native::Scalar(NativeValue::Int(-3))),
                ("y".into(), Native::Scalar(NativeValue::Int(4))),
            ]),
        )
        .unwrap();
        let text = pack_json(&desc, &i);
        let back = unpack_json(&desc, &text).unwrap();
        assert_eq!(back.to_native(), i.to_native());
    }

    #[test]
    fn unknown_key_is_shape_mismatch() {
        let desc = point_desc();
        let err = unpack_json(&desc, r#"{"x":1,"y":2,"z":3}"#);
        assert!(matches!(err, Err(ComError::ShapeMismatch(_))));
    }

    #[test]
    fn missing_key_is_shape_mismatch() {
        let desc = point_desc();
        let err = unpack_json(&desc, r#"{"x":1}"#);
        assert!(matches!(err, Err(ComError::ShapeMismatch(_))));
    }

    #[test]
    fn fixed_array_wrong_length_is_shape_mismatch() {
        let desc = TypeDescriptor::fixed_array(TypeDescriptor::Scalar(ScalarKind::U8), 3)
            .into_valid()
            .unwrap();
        let err = unpack_json(&desc, "[1,2]");
        assert!(matches!(err, Err(ComError::ShapeMismatch(_))));
    }

    #[test]
    fn char_encodes_as_one_character_string() {
        let desc = TypeDescriptor::Scalar(ScalarKind::Char).into_valid().unwrap();
        let i = Instance::from_native(&desc, &Native::Scalar(NativeValue::UInt(b'A' as u128))).unwrap();
        assert_eq!(pack_json(&desc, &i), "\"A\"");
        let back = unpack_json(&desc, "\"A\"").unwrap();
        assert_eq!(back.to_native(), i.to_native());
    }

    #[test]
    fn char_round_trips_for_bytes_above_ascii_range() {
        let desc = TypeDescriptor::Scalar(ScalarKind::Char).into_valid().unwrap();
        let i = Instance::from_native(&desc, &Native::Scalar(NativeValue::UInt(200))).unwrap();
        let text = pack_json(&desc, &i);
        let back = unpack_json(&desc, &text).unwrap();
        assert_eq!(back.to_native(), i.to_native());
    }

    #[test]
    fn out_of_range_number_is_value_out_of_range() {
        let desc = TypeDescriptor::Scalar(ScalarKind::U8).into_valid().unwrap();
        let err = unpack_json(&desc, "1000");
        assert!(matches!(err, Err(ComError::ValueOutOfRange(_))));
    }

    #[test]
    fn malformed_json_is_json_parse_error() {
        let desc = point_desc();
        let err = unpack_json(&desc, "{not json");
        assert!(matches!(err, Err(ComError::JsonParseError(_))));
    }
}
