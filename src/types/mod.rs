//! Types Module
//!
//! The engine's type vocabulary.
//!
//! ## Responsibilities
//! - Semantic kinds of native values and the process-wide kind → element map
//! - Backend-independent type descriptors (array, record, variable-length)
//! - Record layout and the indirection record codec

mod descriptor;
mod kind;

pub use descriptor::{
    FieldDescriptor, Indirection, RecordLayout, TypeClass, TypeDescriptor, INDIRECTION_ALIGN,
    INDIRECTION_SIZE,
};
pub use kind::{type_map, ElementType, Kind, TypeMap};
