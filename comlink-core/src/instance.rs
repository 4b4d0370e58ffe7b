//! `Instance`: a concrete value conforming to a `TypeDescriptor`, and its
//! plain-data counterpart `Native` used by `from_native`/`to_native`.
//!
//! `TypeDescriptor` is the static shape, an `Instance` the materialized,
//! owned value — both runtime data rather than distinct generated Rust
//! types.

use std::collections::HashSet;

use comlink_types::{ComError, NativeValue, ScalarValue};

use crate::descriptor::{TypeDescriptor, ValidDescriptor};

/// A plain-data source/sink value, shaped like an `Instance` but carrying
/// no descriptor of its own: the native mapping/sequence/scalar that is
/// the input to `from_native` and the output of `to_native`.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Null,
    Scalar(NativeValue),
    Struct(Vec<(String, Native)>),
    Array(Vec<Native>),
}

/// A concrete value conforming to a `TypeDescriptor`.
///
/// A `Struct` Instance owns an ordered `(name, child)` list rather than a
/// `HashMap`, preserving declaration order for JSON encoding.
/// `FixedArray` and `DynamicArray` both materialize to the same `Array`
/// shape; their difference is entirely in the descriptor, not the value.
#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    Null,
    Scalar(ScalarValue),
    Struct(Vec<(String, Instance)>),
    Array(Vec<Instance>),
}

impl Instance {
    /// Build a default-valued instance of `desc`: scalars are 0, arrays
    /// have the declared length filled with
    /// defaults, dynamic arrays are empty, struct fields default
    /// recursively.
    #[must_use]
    pub fn default_for(desc: &ValidDescriptor) -> Self {
        default_for(desc.descriptor())
    }

    /// Construct an instance from a native mapping/sequence/scalar,
    /// validated strictly against `desc`: every declared field with a
    /// matching source key is converted with `try_cast`; every declared
    /// field without one takes its default; any key in the source not
    /// declared on `desc` is rejected with `ShapeMismatch`.
    pub fn from_native(desc: &ValidDescriptor, native: &Native) -> Result<Self, ComError> {
        from_native(desc.descriptor(), native)
    }

    /// Construct an instance of `desc` by copying fields from a
    /// compatible, already-built instance: unknown keys in `source` are
    /// ignored silently, declared
    /// fields missing from `source` take their default, and shared fields
    /// are converted with `try_cast` (so differing scalar kinds between
    /// the two descriptors are still a `ValueOutOfRange` failure rather
    /// than silently truncated).
    pub fn from_instance(desc: &ValidDescriptor, source: &Self) -> Result<Self, ComError> {
        copy_from_instance(desc.descriptor(), source)
    }

    /// Convert this instance back to its plain-data `Native` view.
    /// Infallible: every `Instance` is already well-formed.
    #[must_use]
    pub fn to_native(&self) -> Native {
        match self {
            Self::Null => Native::Null,
            Self::Scalar(v) => Native::Scalar(v.as_native()),
            Self::Struct(fields) => {
                Native::Struct(fields.iter().map(|(k, v)| (k.clone(), v.to_native())).collect())
            }
            Self::Array(items) => Native::Array(items.iter().map(Self::to_native).collect()),
        }
    }

    /// The exact byte size this instance would encode to; unlike
    /// `ValidDescriptor::size`, this never returns "unknown" since an
    /// instance's shape is always concrete.
    #[must_use]
    pub fn current_size(&self) -> usize {
        match self {
            Self::Null => 0,
            Self::Scalar(v) => v.kind().width(),
            Self::Struct(fields) => fields.iter().map(|(_, v)| v.current_size()).sum(),
            Self::Array(items) => items.iter().map(Self::current_size).sum(),
        }
    }

    /// Read a struct field by name. Fails with `AccessError` if this is
    /// not a struct, or the name is not declared.
    pub fn field(&self, name: &str) -> Result<&Self, ComError> {
        match self {
            Self::Struct(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v)
                .ok_or_else(|| ComError::AccessError(format!("unknown field {name:?}"))),
            _ => Err(ComError::AccessError("not a struct".into())),
        }
    }

    /// Write a struct field by name. Only scalar fields are mutable this
    /// way: writing to a compound field fails with `AccessError`
    /// ("immutable field"), as does writing an unknown name. The new
    /// value is converted through the field's own `ScalarKind::try_cast`,
    /// so an out-of-range write is rejected and the field left unchanged.
    pub fn set_field(&mut self, name: &str, value: NativeValue) -> Result<(), ComError> {
        match self {
            Self::Struct(fields) => {
                let (_, child) = fields
                    .iter_mut()
                    .find(|(k, _)| k == name)
                    .ok_or_else(|| ComError::AccessError(format!("unknown field {name:?}")))?;
                match child {
                    Self::Scalar(existing) => {
                        *existing = existing.kind().try_cast(value)?;
                        Ok(())
                    }
                    _ => Err(ComError::AccessError(format!(
                        "field {name:?} is immutable (compound)"
                    ))),
                }
            }
            _ => Err(ComError::AccessError("not a struct".into())),
        }
    }

    /// Read an array element by index.
    pub fn get(&self, index: usize) -> Result<&Self, ComError> {
        match self {
            Self::Array(items) => items
                .get(index)
                .ok_or_else(|| ComError::AccessError(format!("index {index} out of bounds"))),
            _ => Err(ComError::AccessError("not an array".into())),
        }
    }

    /// Write an array element by index; requires the element type to be
    /// scalar, like `set_field`.
    pub fn set(&mut self, index: usize, value: NativeValue) -> Result<(), ComError> {
        match self {
            Self::Array(items) => {
                let slot = items
                    .get_mut(index)
                    .ok_or_else(|| ComError::AccessError(format!("index {index} out of bounds")))?;
                match slot {
                    Self::Scalar(existing) => {
                        *existing = existing.kind().try_cast(value)?;
                        Ok(())
                    }
                    _ => Err(ComError::AccessError(format!(
                        "index {index} is immutable (compound)"
                    ))),
                }
            }
            _ => Err(ComError::AccessError("not an array".into())),
        }
    }

    /// The number of elements, for `FixedArray`/`DynamicArray` instances.
    pub fn len(&self) -> Result<usize, ComError> {
        match self {
            Self::Array(items) => Ok(items.len()),
            _ => Err(ComError::AccessError("not an array".into())),
        }
    }

    /// Whether an array instance has no elements. Mirrors `len`'s error
    /// behavior for non-array instances.
    pub fn is_empty(&self) -> Result<bool, ComError> {
        self.len().map(|n| n == 0)
    }

    /// Read the wrapped scalar value. This is the `.Value` accessor a
    /// `Number` exposes; plain `Scalar` instances support the same read
    /// since the two are structurally identical.
    pub fn value(&self) -> Result<ScalarValue, ComError> {
        match self {
            Self::Scalar(v) => Ok(*v),
            _ => Err(ComError::AccessError("not a scalar".into())),
        }
    }

    /// Write the wrapped scalar value, range-checked against its kind.
    pub fn set_value(&mut self, value: NativeValue) -> Result<(), ComError> {
        match self {
            Self::Scalar(existing) => {
                *existing = existing.kind().try_cast(value)?;
                Ok(())
            }
            _ => Err(ComError::AccessError("not a scalar".into())),
        }
    }
}

fn default_for(desc: &TypeDescriptor) -> Instance {
    match desc {
        TypeDescriptor::Null => Instance::Null,
        TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k) => Instance::Scalar(k.default_value()),
        TypeDescriptor::Struct(fields) => Instance::Struct(
            fields
                .iter()
                .map(|f| (f.name.clone(), default_for(&f.ty)))
                .collect(),
        ),
        TypeDescriptor::FixedArray { element, length } => {
            Instance::Array((0..*length).map(|_| default_for(element)).collect())
        }
        TypeDescriptor::DynamicArray { .. } => Instance::Array(Vec::new()),
    }
}

fn from_native(desc: &TypeDescriptor, native: &Native) -> Result<Instance, ComError> {
    match (desc, native) {
        (TypeDescriptor::Null, Native::Null) => Ok(Instance::Null),
        (TypeDescriptor::Null, _) => Err(ComError::TypeMismatch("expected null".into())),

        (TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k), Native::Scalar(v)) => {
            Ok(Instance::Scalar(k.try_cast(*v)?))
        }
        (TypeDescriptor::Scalar(_) | TypeDescriptor::Number(_), _) => {
            Err(ComError::TypeMismatch("expected a scalar value".into()))
        }

        (TypeDescriptor::Struct(fields), Native::Struct(items)) => {
            let declared: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            for (key, _) in items {
                if !declared.contains(key.as_str()) {
                    return Err(ComError::ShapeMismatch(format!("unknown field {key:?}")));
                }
            }
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                let child = match items.iter().find(|(k, _)| k == &field.name) {
                    Some((_, v)) => from_native(&field.ty, v)?,
                    None => default_for(&field.ty),
                };
                out.push((field.name.clone(), child));
            }
            Ok(Instance::Struct(out))
        }
        (TypeDescriptor::Struct(_), _) => Err(ComError::TypeMismatch("expected a struct".into())),

        (TypeDescriptor::FixedArray { element, length }, Native::Array(items)) => {
            // Forgiving constructor: no error on length mismatch. Short
            // input is padded with defaults; long input is truncated.
            let mut out = Vec::with_capacity(*length);
            for i in 0..*length {
                out.push(match items.get(i) {
                    Some(v) => from_native(element, v)?,
                    None => default_for(element),
                });
            }
            Ok(Instance::Array(out))
        }
        (TypeDescriptor::FixedArray { .. }, _) => Err(ComError::TypeMismatch("expected an array".into())),

        (TypeDescriptor::DynamicArray { element }, Native::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for v in items {
                out.push(from_native(element, v)?);
            }
            Ok(Instance::Array(out))
        }
        (TypeDescriptor::DynamicArray { .. }, _) => Err(ComError::TypeMismatch("expected an array".into())),
    }
}

fn copy_from_instance(desc: &TypeDescriptor, source: &Instance) -> Result<Instance, ComError> {
    match desc {
        TypeDescriptor::Null => Ok(Instance::Null),
        TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k) => match source {
            Instance::Scalar(v) => Ok(Instance::Scalar(k.try_cast(v.as_native())?)),
            _ => Ok(Instance::Scalar(k.default_value())),
        },
        TypeDescriptor::Struct(fields) => {
            let src_fields = match source {
                Instance::Struct(sf) => Some(sf.as_slice()),
                _ => None,
            };
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                let child = match src_fields.and_then(|sf| sf.iter().find(|(k, _)| k == &field.name)) {
                    Some((_, v)) => copy_from_instance(&field.ty, v)?,
                    None => default_for(&field.ty),
                };
                out.push((field.name.clone(), child));
            }
            Ok(Instance::Struct(out))
        }
        TypeDescriptor::FixedArray { element, length } => {
            let src_items: &[Instance] = match source {
                Instance::Array(a) => a.as_slice(),
                _ => &[],
            };
            let mut out = Vec::with_capacity(*length);
            for i in 0..*length {
                out.push(match src_items.get(i) {
                    Some(v) => copy_from_instance(element, v)?,
                    None => default_for(element),
                });
            }
            Ok(Instance::Array(out))
        }
        TypeDescriptor::DynamicArray { element } => {
            let src_items: &[Instance] = match source {
                Instance::Array(a) => a.as_slice(),
                _ => &[],
            };
            let mut out = Vec::with_capacity(src_items.len());
            for v in src_items {
                out.push(copy_from_instance(element, v)?);
            }
            Ok(Instance::Array(out))
        }
    }
}
