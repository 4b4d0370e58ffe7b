//! The declarative compound type model and its validator.
//!
//! A `TypeDescriptor` is a recursive runtime enum rather than a
//! compile-time generated type, so a declaration can be built, combined,
//! and validated entirely at runtime.

use std::sync::Arc;

use comlink_types::{ComError, ScalarKind};

/// A single named field of a `Struct` descriptor, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// The field's name. Must be unique within its enclosing struct.
    pub name: String,
    /// The field's declared type.
    pub ty: TypeDescriptor,
}

impl StructField {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A declarative description of a compound type.
///
/// A `TypeDescriptor` is plain, immutable data; declaring one does not
/// validate it. Validation happens once, explicitly, via
/// [`TypeDescriptor::into_valid`], which is the only way to obtain a
/// [`ValidDescriptor`] and therefore the only way to reach any serializer
/// operation in `comlink-core`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// Zero-byte payload; JSON value is `null`.
    Null,
    /// A single primitive, nested inside a `Struct`/`Array`.
    Scalar(ScalarKind),
    /// A free-standing scalar wrapper with a `.Value` accessor.
    Number(ScalarKind),
    /// A C-like struct: named fields in declaration order.
    Struct(Vec<StructField>),
    /// A fixed-length homogeneous array. `length` must be greater than
    /// zero and `element` must be fixed-size.
    FixedArray {
        /// The element type. Must have a known, fixed byte size.
        element: Box<TypeDescriptor>,
        /// The declared element count.
        length: usize,
    },
    /// A variable-length homogeneous array. `element` must be fixed-size;
    /// the array itself is the variable-length part.
    DynamicArray {
        /// The element type. Must have a known, fixed byte size.
        element: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Convenience constructor for `FixedArray`.
    pub fn fixed_array(element: TypeDescriptor, length: usize) -> Self {
        Self::FixedArray {
            element: Box::new(element),
            length,
        }
    }

    /// Convenience constructor for `DynamicArray`.
    pub fn dynamic_array(element: TypeDescriptor) -> Self {
        Self::DynamicArray {
            element: Box::new(element),
        }
    }

    /// Validate this descriptor once and wrap it for use by the serializer.
    ///
    /// Every declaration rule is enforced recursively. On success the
    /// descriptor is immutable and reusable for the remainder of the
    /// process; on failure, the caller holds no `ValidDescriptor` and thus
    /// cannot reach any serializer operation — a descriptor is either
    /// valid for the rest of the process or unreachable, with no interior
    /// mutability needed on the data itself.
    pub fn into_valid(self) -> Result<ValidDescriptor, ComError> {
        validate(&self)?;
        Ok(ValidDescriptor(Arc::new(self)))
    }
}

fn validate(desc: &TypeDescriptor) -> Result<(), ComError> {
    match desc {
        TypeDescriptor::Null | TypeDescriptor::Scalar(_) | TypeDescriptor::Number(_) => Ok(()),
        TypeDescriptor::Struct(fields) => {
            let mut seen = std::collections::HashSet::with_capacity(fields.len());
            for (idx, field) in fields.iter().enumerate() {
                if field.name.is_empty() {
                    return Err(ComError::BadDeclaration(
                        "struct field name must not be empty".into(),
                    ));
                }
                if !seen.insert(field.name.as_str()) {
                    return Err(ComError::BadDeclaration(format!(
                        "duplicate struct field name {:?}",
                        field.name
                    )));
                }
                validate(&field.ty)?;
                let is_last = idx + 1 == fields.len();
                if size(&field.ty).is_none() && !is_last {
                    return Err(ComError::BadDeclaration(format!(
                        "field {:?} has unknown size but is not the last field",
                        field.name
                    )));
                }
            }
            Ok(())
        }
        TypeDescriptor::FixedArray { element, length } => {
            if *length == 0 {
                return Err(ComError::BadDeclaration(
                    "FixedArray length must be greater than zero".into(),
                ));
            }
            validate(element)?;
            if size(element).is_none() {
                return Err(ComError::BadDeclaration(
                    "FixedArray element must have a known fixed size".into(),
                ));
            }
            Ok(())
        }
        TypeDescriptor::DynamicArray { element } => {
            validate(element)?;
            if size(element).is_none() {
                return Err(ComError::BadDeclaration(
                    "DynamicArray element must have a known fixed size".into(),
                ));
            }
            Ok(())
        }
    }
}

/// The statically-known byte size of a descriptor, or `None` if it is
/// variable-length. Pure function of the descriptor's shape.
#[must_use]
pub fn size(desc: &TypeDescriptor) -> Option<usize> {
    match desc {
        TypeDescriptor::Null => Some(0),
        TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k) => Some(k.width()),
        TypeDescriptor::FixedArray { element, length } => size(element).map(|s| s * length),
        TypeDescriptor::DynamicArray { .. } => None,
        TypeDescriptor::Struct(fields) => {
            let mut total = 0usize;
            for field in fields {
                total += size(&field.ty)?;
            }
            Some(total)
        }
    }
}

/// The minimum byte size of any instance of this descriptor (0 for an
/// empty struct or an empty dynamic array).
#[must_use]
pub fn min_size(desc: &TypeDescriptor) -> usize {
    match desc {
        TypeDescriptor::Null => 0,
        TypeDescriptor::Scalar(k) | TypeDescriptor::Number(k) => k.width(),
        TypeDescriptor::FixedArray { element, length } => min_size(element) * length,
        TypeDescriptor::DynamicArray { .. } => 0,
        TypeDescriptor::Struct(fields) => fields.iter().map(|f| min_size(&f.ty)).sum(),
    }
}

/// A `TypeDescriptor` that has passed validation.
///
/// Cheaply cloneable (an `Arc` handle); every serializer entry point in
/// `comlink-core` takes a `&ValidDescriptor`, so a `BadDeclaration` can only
/// ever be observed once, at construction time.
#[derive(Debug, Clone)]
pub struct ValidDescriptor(Arc<TypeDescriptor>);

impl ValidDescriptor {
    /// The underlying descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.0
    }

    /// The statically-known byte size, or `None` if variable-length.
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        size(&self.0)
    }

    /// The minimum byte size of any instance of this descriptor.
    #[must_use]
    pub fn min_size(&self) -> usize {
        min_size(&self.0)
    }
}

impl PartialEq for ValidDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_struct_is_valid_and_zero_sized() {
        let d = TypeDescriptor::Struct(vec![]).into_valid().unwrap();
        assert_eq!(d.size(), Some(0));
        assert_eq!(d.min_size(), 0);
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let d = TypeDescriptor::Struct(vec![
            StructField::new("a", TypeDescriptor::Scalar(ScalarKind::U8)),
            StructField::new("a", TypeDescriptor::Scalar(ScalarKind::U8)),
        ]);
        assert!(matches!(d.into_valid(), Err(ComError::BadDeclaration(_))));
    }

    #[test]
    fn dynamic_array_only_allowed_as_last_field() {
        let d = TypeDescriptor::Struct(vec![
            StructField::new(
                "a",
                TypeDescriptor::dynamic_array(TypeDescriptor::Scalar(ScalarKind::U8)),
            ),
            StructField::new("b", TypeDescriptor::Scalar(ScalarKind::U8)),
        ]);
        assert!(matches!(d.into_valid(), Err(ComError::BadDeclaration(_))));
    }

    #[test]
    fn dynamic_array_as_last_field_is_valid() {
        let d = TypeDescriptor::Struct(vec![
            StructField::new("a", TypeDescriptor::Scalar(ScalarKind::U8)),
            StructField::new(
                "b",
                TypeDescriptor::dynamic_array(TypeDescriptor::Scalar(ScalarKind::U16)),
            ),
        ])
        .into_valid()
        .unwrap();
        assert_eq!(d.size(), None);
        assert_eq!(d.min_size(), 1);
    }

    #[test]
    fn fixed_array_of_zero_length_is_rejected() {
        let d = TypeDescriptor::fixed_array(TypeDescriptor::Scalar(ScalarKind::U8), 0);
        assert!(matches!(d.into_valid(), Err(ComError::BadDeclaration(_))));
    }

    #[test]
    fn fixed_array_of_dynamic_array_is_rejected() {
        let d = TypeDescriptor::fixed_array(
            TypeDescriptor::dynamic_array(TypeDescriptor::Scalar(ScalarKind::U8)),
            4,
        );
        assert!(matches!(d.into_valid(), Err(ComError::BadDeclaration(_))));
    }

    #[test]
    fn nested_struct_with_fixed_prefix_then_dynamic_tail_min_size() {
        // Struct{a: i16, b: f32, c: Struct{a: i16, b: f32, c: DynamicArray<i16>}}
        let inner = TypeDescriptor::Struct(vec![
            StructField::new("a", TypeDescriptor::Scalar(ScalarKind::I16)),
            StructField::new("b", TypeDescriptor::Scalar(ScalarKind::F32)),
            StructField::new(
                "c",
                TypeDescriptor::dynamic_array(TypeDescriptor::Scalar(ScalarKind::I16)),
            ),
        ]);
        let outer = TypeDescriptor::Struct(vec![
            StructField::new("a", TypeDescriptor::Scalar(ScalarKind::I16)),
            StructField::new("b", TypeDescriptor::Scalar(ScalarKind::F32)),
            StructField::new("c", inner),
        ])
        .into_valid()
        .unwrap();
        assert_eq!(outer.size(), None);
        assert_eq!(outer.min_size(), 12);
    }
}
