//! Store Module
//!
//! The backing store contract the marshaling engine talks to, and the
//! in-memory implementation shipped with the crate.
//!
//! ## Responsibilities
//! - Named typed arrays: create, open, read, write, delete
//! - A handle-based type system: array, record and variable-length types
//! - Container file persistence (see [`container`])
//!
//! ## Buffers
//! A write hands the store a [`Payload`]: the top-level bytes plus a heap of
//! variable-length payloads addressed by the indirection records embedded in
//! those bytes. A read fills a [`ReadBuffer`] the same way.
//! ```text
//! bytes: ┌─────────┬──────────────────────┬─────────┐
//!        │ field a │ Indirection{1, slot} │ field c │
//!        └─────────┴──────────┬───────────┴─────────┘
//!                             │
//! heap:  [ ..., slot ──► payload bytes, ... ]
//! ```

pub mod container;
mod memory;

pub use memory::{MemoryStore, StoredArray};

use crate::error::Result;
use crate::types::{ElementType, TypeDescriptor};

/// Handle to a type registered with a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(pub u64);

/// Handle to an open named array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayHandle(pub u64);

/// Source buffer of a write
#[derive(Debug, Default)]
pub struct Payload<'a> {
    pub bytes: &'a [u8],
    /// Variable-length payloads, indexed by indirection slot
    pub heap: Vec<&'a [u8]>,
}

/// Destination buffer of a read
///
/// `bytes` must already be sized to the stored type; the store fills the
/// heap with owned copies of every variable-length payload.
#[derive(Debug)]
pub struct ReadBuffer<'a> {
    pub bytes: &'a mut [u8],
    pub heap: Vec<Vec<u8>>,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self {
            bytes,
            heap: Vec::new(),
        }
    }
}

/// Contract of a hierarchical array store
///
/// All methods take `&self`; implementations synchronize internally. Every
/// [`TypeHandle`] handed out (including by [`ArrayStore::stored_type`]) must
/// be released with [`ArrayStore::close_type`], every [`ArrayHandle`] with
/// [`ArrayStore::close_array`].
pub trait ArrayStore {
    // -------------------------------------------------------------------------
    // Arrays
    // -------------------------------------------------------------------------

    /// Create a named array of `shape` values of type `ty`
    fn create_array(&self, name: &str, ty: TypeHandle, shape: &[usize]) -> Result<ArrayHandle>;

    fn open_array(&self, name: &str) -> Result<ArrayHandle>;

    /// Type of an open array, as a new handle owned by the caller
    fn stored_type(&self, array: ArrayHandle) -> Result<TypeHandle>;

    fn read_array(&self, array: ArrayHandle, buffer: &mut ReadBuffer<'_>) -> Result<()>;

    fn write_array(&self, array: ArrayHandle, payload: &Payload<'_>) -> Result<()>;

    fn close_array(&self, array: ArrayHandle) -> Result<()>;

    fn array_exists(&self, name: &str) -> bool;

    fn delete_array(&self, name: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn make_array_type(&self, element: ElementType, dims: &[usize]) -> Result<TypeHandle>;

    /// Start an empty record type of `size` bytes
    fn make_record_type(&self, size: usize) -> Result<TypeHandle>;

    /// Add a copy of `field`'s type to `record` at `offset`
    fn insert_field(
        &self,
        record: TypeHandle,
        name: &str,
        offset: usize,
        field: TypeHandle,
    ) -> Result<()>;

    fn make_variable_length_type(&self, inner: TypeHandle) -> Result<TypeHandle>;

    fn describe_type(&self, ty: TypeHandle) -> Result<TypeDescriptor>;

    fn close_type(&self, ty: TypeHandle) -> Result<()>;
}
