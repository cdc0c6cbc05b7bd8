//! In-memory store
//!
//! `BTreeMap`-backed implementation of [`ArrayStore`]. Arrays keep owned
//! copies of everything written to them; variable-length payloads are
//! re-homed into the array's own heap on write.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{MarshalError, Result};
use crate::types::{ElementType, FieldDescriptor, Indirection, TypeDescriptor};

use super::{ArrayHandle, ArrayStore, Payload, ReadBuffer, TypeHandle};

/// A named array as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArray {
    pub ty: TypeDescriptor,
    /// Outer shape (number of values of `ty`)
    pub shape: Vec<usize>,
    pub bytes: Vec<u8>,
    /// Variable-length payloads referenced from `bytes`
    pub heap: Vec<Vec<u8>>,
}

impl StoredArray {
    fn value_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Check an array loaded from outside the store
    ///
    /// The type must be well formed, `bytes` must hold exactly one value of
    /// the type per shape element, and every indirection must name a heap
    /// buffer of the size its length implies.
    pub fn validate(&self) -> Result<()> {
        self.ty.validate()?;
        if self.shape.is_empty() {
            return Err(MarshalError::Corruption("empty shape".to_string()));
        }

        let value_size = self.ty.size();
        let count = self.value_count().ok_or_else(|| {
            MarshalError::Corruption(format!("shape {:?} overflows", self.shape))
        })?;
        let expected = count.checked_mul(value_size).ok_or_else(|| {
            MarshalError::Corruption(format!("{} values of {} bytes overflow", count, value_size))
        })?;
        if self.bytes.len() != expected {
            return Err(MarshalError::Corruption(format!(
                "array carries {} bytes, its type and shape need {}",
                self.bytes.len(),
                expected
            )));
        }

        let indirections = self.ty.indirections();
        if indirections.is_empty() {
            return Ok(());
        }

        for value in 0..count {
            for (offset, inner) in &indirections {
                let at = value * value_size + offset;
                let ind = self
                    .bytes
                    .get(at..)
                    .and_then(Indirection::decode)
                    .ok_or_else(|| {
                        MarshalError::Corruption(format!("truncated indirection at byte {}", at))
                    })?;

                let data = usize::try_from(ind.slot)
                    .ok()
                    .and_then(|slot| self.heap.get(slot))
                    .ok_or_else(|| {
                        MarshalError::Corruption(format!(
                            "indirection slot {} outside a heap of {}",
                            ind.slot,
                            self.heap.len()
                        ))
                    })?;

                let want = usize::try_from(ind.length)
                    .ok()
                    .and_then(|n| n.checked_mul(inner.size()));
                if want != Some(data.len()) {
                    return Err(MarshalError::Corruption(format!(
                        "heap buffer {} is {} bytes, indirection of length {} needs {:?}",
                        ind.slot,
                        data.len(),
                        ind.length,
                        want
                    )));
                }
            }
        }

        Ok(())
    }
}

/// In-memory hierarchical array store
///
/// ## Concurrency:
/// - `arrays`: RwLock (many concurrent readers, exclusive writer)
/// - `types`, `open`: Mutex, held only for the duration of one lookup
/// - `next_handle`: atomic counter shared by type and array handles
pub struct MemoryStore {
    /// Named arrays, ordered by name
    arrays: RwLock<BTreeMap<String, StoredArray>>,

    /// Live type handles
    types: Mutex<HashMap<u64, TypeDescriptor>>,

    /// Live array handles → array name
    open: Mutex<HashMap<u64, String>>,

    next_handle: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_arrays(BTreeMap::new())
    }

    /// Build a store over existing arrays (used when loading a container)
    pub fn from_arrays(arrays: BTreeMap<String, StoredArray>) -> Self {
        Self {
            arrays: RwLock::new(arrays),
            types: Mutex::new(HashMap::new()),
            open: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Copy of every array, ordered by name
    pub fn snapshot(&self) -> BTreeMap<String, StoredArray> {
        self.arrays.read().clone()
    }

    /// Names of all arrays, sorted
    pub fn names(&self) -> Vec<String> {
        self.arrays.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.arrays.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.read().is_empty()
    }

    /// Stored type of a named array, without taking a handle
    pub fn descriptor(&self, name: &str) -> Option<TypeDescriptor> {
        self.arrays.read().get(name).map(|a| a.ty.clone())
    }

    /// Number of type handles not yet closed
    pub fn open_type_count(&self) -> usize {
        self.types.lock().len()
    }

    /// Number of array handles not yet closed
    pub fn open_array_count(&self) -> usize {
        self.open.lock().len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn next_id(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    fn register_type(&self, ty: TypeDescriptor) -> TypeHandle {
        let id = self.next_id();
        self.types.lock().insert(id, ty);
        TypeHandle(id)
    }

    fn type_of(&self, ty: TypeHandle, operation: &'static str) -> Result<TypeDescriptor> {
        self.types
            .lock()
            .get(&ty.0)
            .cloned()
            .ok_or_else(|| MarshalError::store(operation, format!("invalid type handle {}", ty.0)))
    }

    fn name_of(&self, array: ArrayHandle, operation: &'static str) -> Result<String> {
        self.open
            .lock()
            .get(&array.0)
            .cloned()
            .ok_or_else(|| {
                MarshalError::store(operation, format!("invalid array handle {}", array.0))
            })
    }

    /// Copy a payload into owned storage, re-homing every indirection into a
    /// fresh heap
    fn rehome(target: &StoredArray, payload: &Payload<'_>) -> Result<(Vec<u8>, Vec<Vec<u8>>)> {
        let value_size = target.ty.size();
        let count = target
            .value_count()
            .ok_or_else(|| MarshalError::store("write array", "array shape overflows"))?;
        let expected = count
            .checked_mul(value_size)
            .ok_or_else(|| MarshalError::store("write array", "array size overflows"))?;
        if payload.bytes.len() != expected {
            return Err(MarshalError::store(
                "write array",
                format!(
                    "payload is {} bytes, array holds {}",
                    payload.bytes.len(),
                    expected
                ),
            ));
        }

        let mut bytes = payload.bytes.to_vec();
        let mut heap = Vec::new();
        let indirections = target.ty.indirections();

        if indirections.is_empty() {
            return Ok((bytes, heap));
        }

        for value in 0..count {
            for (offset, inner) in &indirections {
                let at = value * value_size + offset;
                let ind = Indirection::decode(&bytes[at..]).ok_or_else(|| {
                    MarshalError::store("write array", "truncated indirection record")
                })?;

                let data = usize::try_from(ind.slot)
                    .ok()
                    .and_then(|slot| payload.heap.get(slot))
                    .ok_or(MarshalError::InvalidIndirection {
                        slot: ind.slot,
                        available: payload.heap.len(),
                    })?;

                let want = usize::try_from(ind.length)
                    .ok()
                    .and_then(|n| n.checked_mul(inner.size()));
                if want != Some(data.len()) {
                    return Err(MarshalError::store(
                        "write array",
                        format!(
                            "variable-length payload is {} bytes, expected {:?}",
                            data.len(),
                            want
                        ),
                    ));
                }

                let rehomed = Indirection {
                    length: ind.length,
                    slot: heap.len() as u64,
                };
                heap.push(data.to_vec());
                bytes[at..at + rehomed.encode().len()].copy_from_slice(&rehomed.encode());
            }
        }

        Ok((bytes, heap))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayStore for MemoryStore {
    fn create_array(&self, name: &str, ty: TypeHandle, shape: &[usize]) -> Result<ArrayHandle> {
        if name.is_empty() {
            return Err(MarshalError::store("create array", "empty array name"));
        }
        if shape.is_empty() {
            return Err(MarshalError::store("create array", "empty shape"));
        }

        let ty = self.type_of(ty, "create array")?;

        let mut arrays = self.arrays.write();
        if arrays.contains_key(name) {
            return Err(MarshalError::store(
                "create array",
                format!("cannot create array '{}': name exists", name),
            ));
        }

        let size = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .and_then(|count| count.checked_mul(ty.size()))
            .ok_or_else(|| {
                MarshalError::store("create array", format!("shape {:?} of {} overflows", shape, ty))
            })?;
        let stored = StoredArray {
            bytes: vec![0u8; size],
            ty,
            shape: shape.to_vec(),
            heap: Vec::new(),
        };
        arrays.insert(name.to_string(), stored);
        drop(arrays);

        let id = self.next_id();
        self.open.lock().insert(id, name.to_string());
        tracing::trace!(array = name, handle = id, "created array");

        Ok(ArrayHandle(id))
    }

    fn open_array(&self, name: &str) -> Result<ArrayHandle> {
        if !self.arrays.read().contains_key(name) {
            return Err(MarshalError::store(
                "open array",
                format!("array not found: '{}'", name),
            ));
        }

        let id = self.next_id();
        self.open.lock().insert(id, name.to_string());
        Ok(ArrayHandle(id))
    }

    fn stored_type(&self, array: ArrayHandle) -> Result<TypeHandle> {
        let name = self.name_of(array, "get stored type")?;
        let ty = self
            .arrays
            .read()
            .get(&name)
            .map(|a| a.ty.clone())
            .ok_or_else(|| MarshalError::store("get stored type", format!("array '{}' was deleted", name)))?;

        Ok(self.register_type(ty))
    }

    fn read_array(&self, array: ArrayHandle, buffer: &mut ReadBuffer<'_>) -> Result<()> {
        let name = self.name_of(array, "read array")?;
        let arrays = self.arrays.read();
        let stored = arrays
            .get(&name)
            .ok_or_else(|| MarshalError::store("read array", format!("array '{}' was deleted", name)))?;

        if buffer.bytes.len() != stored.bytes.len() {
            return Err(MarshalError::store(
                "read array",
                format!(
                    "destination is {} bytes, array holds {}",
                    buffer.bytes.len(),
                    stored.bytes.len()
                ),
            ));
        }

        buffer.bytes.copy_from_slice(&stored.bytes);
        buffer.heap = stored.heap.clone();
        Ok(())
    }

    fn write_array(&self, array: ArrayHandle, payload: &Payload<'_>) -> Result<()> {
        let name = self.name_of(array, "write array")?;
        let mut arrays = self.arrays.write();
        let stored = arrays
            .get_mut(&name)
            .ok_or_else(|| MarshalError::store("write array", format!("array '{}' was deleted", name)))?;

        let (bytes, heap) = Self::rehome(stored, payload)?;
        stored.bytes = bytes;
        stored.heap = heap;

        tracing::trace!(array = %name, bytes = stored.bytes.len(), heap = stored.heap.len(), "wrote array");
        Ok(())
    }

    fn close_array(&self, array: ArrayHandle) -> Result<()> {
        self.open
            .lock()
            .remove(&array.0)
            .map(|_| ())
            .ok_or_else(|| {
                MarshalError::store("close array", format!("invalid array handle {}", array.0))
            })
    }

    fn array_exists(&self, name: &str) -> bool {
        self.arrays.read().contains_key(name)
    }

    fn delete_array(&self, name: &str) -> Result<()> {
        match self.arrays.write().remove(name) {
            Some(_) => {
                tracing::trace!(array = name, "deleted array");
                Ok(())
            }
            None => Err(MarshalError::store(
                "delete array",
                format!("array not found: '{}'", name),
            )),
        }
    }

    fn make_array_type(&self, element: ElementType, dims: &[usize]) -> Result<TypeHandle> {
        if dims.is_empty() {
            return Err(MarshalError::TypeConstructionFailure(
                "array type needs at least one dimension".to_string(),
            ));
        }

        Ok(self.register_type(TypeDescriptor::Array {
            element,
            dims: dims.to_vec(),
        }))
    }

    fn make_record_type(&self, size: usize) -> Result<TypeHandle> {
        Ok(self.register_type(TypeDescriptor::Record {
            size,
            fields: Vec::new(),
        }))
    }

    fn insert_field(
        &self,
        record: TypeHandle,
        name: &str,
        offset: usize,
        field: TypeHandle,
    ) -> Result<()> {
        let field_ty = self
            .type_of(field, "insert field")
            .map_err(|e| MarshalError::TypeConstructionFailure(e.to_string()))?;

        let mut types = self.types.lock();
        let Some(TypeDescriptor::Record { size, fields }) = types.get_mut(&record.0) else {
            return Err(MarshalError::TypeConstructionFailure(format!(
                "type handle {} is not a record",
                record.0
            )));
        };

        let end = offset.checked_add(field_ty.size());
        if !matches!(end, Some(end) if end <= *size) {
            return Err(MarshalError::TypeConstructionFailure(format!(
                "field '{}' at offset {} ({} bytes) overflows record of {} bytes",
                name,
                offset,
                field_ty.size(),
                size
            )));
        }
        if fields.iter().any(|f| f.name == name) {
            return Err(MarshalError::TypeConstructionFailure(format!(
                "duplicate field '{}'",
                name
            )));
        }

        fields.push(FieldDescriptor {
            name: name.to_string(),
            offset,
            ty: field_ty,
        });
        Ok(())
    }

    fn make_variable_length_type(&self, inner: TypeHandle) -> Result<TypeHandle> {
        let inner = self
            .type_of(inner, "make variable-length type")
            .map_err(|e| MarshalError::TypeConstructionFailure(e.to_string()))?;

        if inner.contains_var_len() {
            return Err(MarshalError::TypeConstructionFailure(
                "variable-length types cannot nest".to_string(),
            ));
        }

        Ok(self.register_type(TypeDescriptor::VarLen(Box::new(inner))))
    }

    fn describe_type(&self, ty: TypeHandle) -> Result<TypeDescriptor> {
        self.type_of(ty, "describe type")
    }

    fn close_type(&self, ty: TypeHandle) -> Result<()> {
        self.types
            .lock()
            .remove(&ty.0)
            .map(|_| ())
            .ok_or_else(|| MarshalError::store("close type", format!("invalid type handle {}", ty.0)))
    }
}
