//! Type descriptors
//!
//! Backend-independent description of a stored type, plus the record layout
//! calculator and the indirection record used for variable-length fields.
//!
//! ## Indirection Record (16 bytes, host byte order)
//! ```text
//! ┌──────────────────┬──────────────────┐
//! │ Length: u64 (8)  │  Slot: u64 (8)   │
//! └──────────────────┴──────────────────┘
//! ```
//! `length` counts elements of the variable-length type's inner type and
//! `slot` indexes the heap that travels next to the record bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarshalError, Result};

use super::ElementType;

/// Size of an indirection record in bytes
pub const INDIRECTION_SIZE: usize = 16;

/// Alignment of an indirection record
pub const INDIRECTION_ALIGN: usize = 8;

/// Coarse classification of a stored type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Array,
    Record,
    VariableLength,
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeClass::Array => f.write_str("array"),
            TypeClass::Record => f.write_str("record"),
            TypeClass::VariableLength => f.write_str("variable-length"),
        }
    }
}

/// Description of a stored type
///
/// Array dimensions are kept in store order (first dimension varies
/// fastest). Use [`TypeDescriptor::native_dims`] for the caller's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// Fixed-dimension array of one element type; scalars are `[1]`
    Array {
        element: ElementType,
        dims: Vec<usize>,
    },

    /// Compound type with fields at byte offsets
    Record {
        size: usize,
        fields: Vec<FieldDescriptor>,
    },

    /// Variable-length sequence of the inner type, stored as an indirection
    VarLen(Box<TypeDescriptor>),
}

/// One member of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Byte offset from the record base
    pub offset: usize,
    pub ty: TypeDescriptor,
}

impl TypeDescriptor {
    pub fn class(&self) -> TypeClass {
        match self {
            TypeDescriptor::Array { .. } => TypeClass::Array,
            TypeDescriptor::Record { .. } => TypeClass::Record,
            TypeDescriptor::VarLen(_) => TypeClass::VariableLength,
        }
    }

    /// Size in bytes of one value of this type
    ///
    /// Saturates at `usize::MAX` when the size is not representable; such a
    /// type never passes [`TypeDescriptor::validate`].
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Size in bytes, or `None` on overflow
    pub fn checked_size(&self) -> Option<usize> {
        match self {
            TypeDescriptor::Array { element, dims } => {
                element_count(dims)?.checked_mul(element.size())
            }
            TypeDescriptor::Record { size, .. } => Some(*size),
            TypeDescriptor::VarLen(_) => Some(INDIRECTION_SIZE),
        }
    }

    /// Alignment of this type when embedded in a record
    pub fn align(&self) -> usize {
        match self {
            TypeDescriptor::Array { element, .. } => element.align(),
            TypeDescriptor::Record { fields, .. } => {
                fields.iter().map(|f| f.ty.align()).max().unwrap_or(1)
            }
            TypeDescriptor::VarLen(_) => INDIRECTION_ALIGN,
        }
    }

    /// Element type and total element count of an array type
    pub fn as_array(&self) -> Option<(ElementType, usize)> {
        match self {
            TypeDescriptor::Array { element, dims } => Some((*element, element_count(dims)?)),
            _ => None,
        }
    }

    /// Dimensions in native order (last varies fastest)
    pub fn native_dims(&self) -> Option<Vec<usize>> {
        match self {
            TypeDescriptor::Array { dims, .. } => Some(dims.iter().rev().copied().collect()),
            _ => None,
        }
    }

    /// Look up a record member by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        match self {
            TypeDescriptor::Record { fields, .. } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Whether a variable-length type appears anywhere in this type
    pub fn contains_var_len(&self) -> bool {
        match self {
            TypeDescriptor::Array { .. } => false,
            TypeDescriptor::Record { fields, .. } => fields.iter().any(|f| f.ty.contains_var_len()),
            TypeDescriptor::VarLen(_) => true,
        }
    }

    /// Check that a type read from outside is well formed
    ///
    /// Arrays need at least one dimension and a representable size, record
    /// fields must lie inside their record, variable-length types must not
    /// nest.
    pub fn validate(&self) -> Result<()> {
        match self {
            TypeDescriptor::Array { dims, .. } => {
                if dims.is_empty() {
                    return Err(MarshalError::Corruption(
                        "array type without dimensions".to_string(),
                    ));
                }
                self.checked_size().map(|_| ()).ok_or_else(|| {
                    MarshalError::Corruption(format!("array type of dimensions {:?} overflows", dims))
                })
            }
            TypeDescriptor::Record { size, fields } => {
                for field in fields {
                    field.ty.validate()?;
                    let end = field
                        .ty
                        .checked_size()
                        .and_then(|s| field.offset.checked_add(s));
                    if !matches!(end, Some(end) if end <= *size) {
                        return Err(MarshalError::Corruption(format!(
                            "field '{}' at offset {} does not fit a record of {} bytes",
                            field.name, field.offset, size
                        )));
                    }
                }
                Ok(())
            }
            TypeDescriptor::VarLen(inner) => {
                if inner.contains_var_len() {
                    return Err(MarshalError::Corruption(
                        "nested variable-length type".to_string(),
                    ));
                }
                inner.validate()
            }
        }
    }

    /// Byte offsets of every indirection record inside one value of this
    /// type, paired with the inner type each one points to
    pub fn indirections(&self) -> Vec<(usize, &TypeDescriptor)> {
        let mut found = Vec::new();
        self.collect_indirections(0, &mut found);
        found
    }

    fn collect_indirections<'a>(&'a self, base: usize, found: &mut Vec<(usize, &'a TypeDescriptor)>) {
        match self {
            TypeDescriptor::Array { .. } => {}
            TypeDescriptor::Record { fields, .. } => {
                for field in fields {
                    field.ty.collect_indirections(base + field.offset, found);
                }
            }
            TypeDescriptor::VarLen(inner) => found.push((base, inner.as_ref())),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Array { element, .. } => {
                let dims = self.native_dims().unwrap_or_default();
                let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "{}[{}]", element, dims.join(", "))
            }
            TypeDescriptor::Record { size, fields } => {
                write!(f, "record({}) {{", size)?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {}@{}: {}", field.name, field.offset, field.ty)?;
                }
                f.write_str(" }")
            }
            TypeDescriptor::VarLen(inner) => write!(f, "vlen<{}>", inner),
        }
    }
}

/// Product of array dimensions, `None` on overflow
fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

// =============================================================================
// Indirection Record
// =============================================================================

/// Fixed-size stand-in for a variable-length payload inside a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indirection {
    /// Number of inner-type elements behind this indirection
    pub length: u64,
    /// Index into the heap of the buffer carrying the record
    pub slot: u64,
}

impl Indirection {
    pub fn encode(&self) -> [u8; INDIRECTION_SIZE] {
        let mut bytes = [0u8; INDIRECTION_SIZE];
        bytes[0..8].copy_from_slice(&self.length.to_ne_bytes());
        bytes[8..16].copy_from_slice(&self.slot.to_ne_bytes());
        bytes
    }

    /// Decode from the first 16 bytes; `None` when too short
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let length = u64::from_ne_bytes(bytes.get(0..8)?.try_into().ok()?);
        let slot = u64::from_ne_bytes(bytes.get(8..16)?.try_into().ok()?);
        Some(Self { length, slot })
    }
}

// =============================================================================
// Record Layout
// =============================================================================

/// Places record fields with C layout rules
///
/// Fields go in declaration order, each aligned to its own alignment; the
/// final size is rounded up to the largest alignment seen.
#[derive(Debug)]
pub struct RecordLayout {
    cursor: usize,
    align: usize,
}

impl RecordLayout {
    pub fn new() -> Self {
        Self { cursor: 0, align: 1 }
    }

    /// Reserve space for a field and return its offset
    pub fn place(&mut self, size: usize, align: usize) -> usize {
        let align = align.max(1);
        let offset = align_up(self.cursor, align);
        self.cursor = offset + size;
        self.align = self.align.max(align);
        offset
    }

    /// Total record size
    pub fn finish(self) -> usize {
        align_up(self.cursor, self.align)
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self::new()
    }
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}
