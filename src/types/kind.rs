//! Semantic kinds and the kind → element type map

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{MarshalError, Result};

/// Semantic kind of a native primitive value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    /// Platform word sized signed integer (`isize`)
    Int,
    /// Platform word sized unsigned integer (`usize`)
    Uint,
    Float32,
    Float64,
    /// Recognized but not storable
    Bool,
    /// Recognized but not storable
    Char,
}

/// Binary element type understood by the backing store
///
/// Elements are stored in host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ElementType {
    U8 = 0x01,
    I8 = 0x02,
    U16 = 0x03,
    I16 = 0x04,
    U32 = 0x05,
    I32 = 0x06,
    U64 = 0x07,
    I64 = 0x08,
    F32 = 0x09,
    F64 = 0x0A,
}

impl ElementType {
    /// Size in bytes of a single element
    pub fn size(self) -> usize {
        match self {
            ElementType::U8 | ElementType::I8 => 1,
            ElementType::U16 | ElementType::I16 => 2,
            ElementType::U32 | ElementType::I32 | ElementType::F32 => 4,
            ElementType::U64 | ElementType::I64 | ElementType::F64 => 8,
        }
    }

    /// Alignment of a single element (same as its size for every element type)
    pub fn align(self) -> usize {
        self.size()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I8 => "i8",
            ElementType::U16 => "u16",
            ElementType::I16 => "i16",
            ElementType::U32 => "u32",
            ElementType::I32 => "i32",
            ElementType::U64 => "u64",
            ElementType::I64 => "i64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Process-wide table mapping semantic kinds to element types
///
/// Built once on first use and read-only afterwards. The platform word kinds
/// are resolved against the host pointer width at that point.
#[derive(Debug)]
pub struct TypeMap {
    entries: HashMap<Kind, ElementType>,
}

static TYPE_MAP: OnceLock<TypeMap> = OnceLock::new();

/// Get the process-wide type map
pub fn type_map() -> &'static TypeMap {
    TYPE_MAP.get_or_init(TypeMap::build)
}

impl TypeMap {
    fn build() -> Self {
        let (int, uint) = if cfg!(target_pointer_width = "64") {
            (ElementType::I64, ElementType::U64)
        } else {
            (ElementType::I32, ElementType::U32)
        };

        let entries = HashMap::from([
            (Kind::Int8, ElementType::I8),
            (Kind::Uint8, ElementType::U8),
            (Kind::Int16, ElementType::I16),
            (Kind::Uint16, ElementType::U16),
            (Kind::Int32, ElementType::I32),
            (Kind::Uint32, ElementType::U32),
            (Kind::Int64, ElementType::I64),
            (Kind::Uint64, ElementType::U64),
            (Kind::Int, int),
            (Kind::Uint, uint),
            (Kind::Float32, ElementType::F32),
            (Kind::Float64, ElementType::F64),
        ]);

        Self { entries }
    }

    /// Resolve a kind to its element type
    pub fn lookup(&self, kind: Kind) -> Result<ElementType> {
        self.entries
            .get(&kind)
            .copied()
            .ok_or(MarshalError::UnsupportedType(kind))
    }

    /// Whether a kind can be stored
    pub fn supports(&self, kind: Kind) -> bool {
        self.entries.contains_key(&kind)
    }
}
