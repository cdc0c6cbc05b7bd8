//! Read path
//!
//! A get opens the named array and walks the destination against the stored
//! type before anything is read. Only then is the destination sized and the
//! array read once. Sequences and fixed arrays are read straight into
//! destination storage; scalars and records go through a scratch buffer
//! owned by the root node, whose stored fields are all resolved before the
//! first one is copied out.
//!
//! ```text
//! Uninitialized ──check──► TypeChecked ──size──► Allocated ──copy──► Populated
//! ```
//! A root node that never reached `TypeChecked` left its destination
//! untouched.

use std::borrow::Cow;

use crate::error::{MarshalError, Result};
use crate::object::{NodeState, ObjectNode};
use crate::store::{ArrayStore, ReadBuffer};
use crate::types::{type_map, FieldDescriptor, Indirection, Kind, TypeDescriptor};
use crate::value::{Target, Unmarshal};

use super::ArrayGuard;

/// Where a record field's bytes live
#[derive(Debug, PartialEq, Eq)]
pub enum FieldStorage<'b> {
    /// Inline at the field's offset
    Direct(&'b [u8]),
    /// Behind an indirection record, in the heap
    Indirect {
        length: u64,
        inner: &'b TypeDescriptor,
        bytes: &'b [u8],
    },
}

/// Locate the bytes of `field` inside one record value
pub fn resolve_field<'b>(
    field: &'b FieldDescriptor,
    record: &'b [u8],
    heap: &'b [Vec<u8>],
) -> Result<FieldStorage<'b>> {
    let end = field
        .ty
        .checked_size()
        .and_then(|size| field.offset.checked_add(size));
    let slot = end
        .and_then(|end| record.get(field.offset..end))
        .ok_or_else(|| {
            MarshalError::Corruption(format!(
                "field '{}' at offset {} lies outside a record of {} bytes",
                field.name,
                field.offset,
                record.len()
            ))
        })?;

    let TypeDescriptor::VarLen(inner) = &field.ty else {
        return Ok(FieldStorage::Direct(slot));
    };

    let ind = Indirection::decode(slot)
        .ok_or_else(|| MarshalError::Corruption(format!("truncated indirection in '{}'", field.name)))?;
    if ind.length != 1 {
        return Err(MarshalError::UnexpectedLength(ind.length));
    }

    let bytes = usize::try_from(ind.slot)
        .ok()
        .and_then(|s| heap.get(s))
        .ok_or(MarshalError::InvalidIndirection {
            slot: ind.slot,
            available: heap.len(),
        })?;

    Ok(FieldStorage::Indirect {
        length: ind.length,
        inner: inner.as_ref(),
        bytes,
    })
}

/// Reads named arrays of a store into native destinations
pub struct Unmarshaler<'s> {
    store: &'s dyn ArrayStore,
}

impl<'s> Unmarshaler<'s> {
    pub fn new(store: &'s dyn ArrayStore) -> Self {
        Self { store }
    }

    /// Load the array `name` into `destination`
    ///
    /// Sequences are replaced by freshly allocated storage of the stored
    /// length. Record fields absent from the stored type keep their values.
    /// A type mismatch anywhere in the destination leaves it untouched.
    pub fn get<T: Unmarshal + ?Sized>(&self, name: &str, destination: &mut T) -> Result<()> {
        let mut node = ObjectNode::new(self.store);
        let result = self.load(name, destination, &mut node);
        if let Err(e) = &result {
            tracing::debug!(array = name, state = ?node.state(), error = %e, "get failed");
        }
        result
    }

    /// [`get`](Self::get) through a caller-owned root node
    ///
    /// The node keeps the stored type handle and the scratch buffer until it
    /// is dropped. After an error its [`state`](ObjectNode::state) shows how
    /// far the read got.
    pub fn load<T: Unmarshal + ?Sized>(
        &self,
        name: &str,
        destination: &mut T,
        node: &mut ObjectNode<'s, '_>,
    ) -> Result<()> {
        let target = destination.target();
        if matches!(target, Target::Shared) {
            return Err(MarshalError::NotAddressable);
        }
        let expected = target.expectation();
        tracing::debug!(array = name, expected = %expected, "get");

        let array = ArrayGuard::open(self.store, name)?;
        let handle = self.store.stored_type(array.handle())?;
        node.set_type_handle(handle);
        let ty = self.store.describe_type(handle)?;

        check(&target, &ty, name)?;
        node.advance(NodeState::TypeChecked);

        match target {
            Target::Sequence(slot) => {
                let count = element_count(&ty, slot.kind(), name, &expected)?;
                let bytes = slot.reallocate(count)?;
                node.advance(NodeState::Allocated);

                self.store.read_array(array.handle(), &mut ReadBuffer::new(bytes))?;
            }
            Target::Array { bytes, .. } => {
                node.advance(NodeState::Allocated);

                self.store.read_array(array.handle(), &mut ReadBuffer::new(bytes))?;
            }
            target => {
                let size = ty.size();
                let mut scratch = Vec::new();
                scratch.try_reserve_exact(size).map_err(|e| {
                    MarshalError::AllocationFailure(format!("read buffer of {} bytes: {}", size, e))
                })?;
                scratch.resize(size, 0);
                node.set_data(Cow::Owned(scratch));

                let mut buffer = ReadBuffer::new(node.data_mut());
                self.store.read_array(array.handle(), &mut buffer)?;
                let heap = std::mem::take(&mut buffer.heap);

                verify_storage(&target, &ty, node.data(), &heap, name)?;
                node.advance(NodeState::Allocated);

                populate(target, &ty, node.data(), &heap, name)?;
            }
        }

        node.advance(NodeState::Populated);
        tracing::debug!(array = name, class = %ty.class(), "get complete");
        Ok(())
    }
}

// =============================================================================
// Type Checks
// =============================================================================

fn mismatch(path: &str, expected: String, found: &TypeDescriptor) -> MarshalError {
    MarshalError::TypeMismatch {
        field: path.to_string(),
        expected,
        found: found.to_string(),
    }
}

fn field_path(path: &str, name: &str) -> String {
    format!("{}.{}", path, name)
}

/// Element count of a stored array whose element type matches `kind`
fn element_count(ty: &TypeDescriptor, kind: Kind, path: &str, expected: &str) -> Result<usize> {
    let element = type_map().lookup(kind)?;
    match ty.as_array() {
        Some((stored, count)) if stored == element => Ok(count),
        _ => Err(mismatch(path, expected.to_string(), ty)),
    }
}

/// Match a whole destination against a stored type without touching either
///
/// Variable-length fields are matched through to their inner type. Fields
/// the stored type lacks are not checked.
fn check(target: &Target<'_>, ty: &TypeDescriptor, path: &str) -> Result<()> {
    match target {
        Target::Shared => Err(MarshalError::NotAddressable),
        Target::Scalar(slot) => {
            let count = element_count(ty, slot.kind(), path, &target.expectation())?;
            if count != 1 {
                return Err(MarshalError::DimensionMismatch(format!(
                    "'{}' holds {} elements, destination is a scalar",
                    path, count
                )));
            }
            Ok(())
        }
        Target::Sequence(slot) => {
            element_count(ty, slot.kind(), path, &target.expectation()).map(|_| ())
        }
        Target::Array { kind, len, .. } => {
            let count = element_count(ty, *kind, path, &target.expectation())?;
            if count != *len {
                return Err(MarshalError::DimensionMismatch(format!(
                    "'{}' holds {} elements, destination holds {}",
                    path, count, len
                )));
            }
            Ok(())
        }
        Target::Record(fields) => {
            if !matches!(ty, TypeDescriptor::Record { .. }) {
                return Err(mismatch(path, target.expectation(), ty));
            }
            for (name, field_target) in fields {
                let Some(field) = ty.field(name) else {
                    continue;
                };
                let stored = match &field.ty {
                    TypeDescriptor::VarLen(inner) => inner.as_ref(),
                    other => other,
                };
                check(field_target, stored, &field_path(path, name))?;
            }
            Ok(())
        }
    }
}

/// Resolve every stored field the destination will read and check that each
/// leaf carries exactly the bytes its type implies
fn verify_storage(
    target: &Target<'_>,
    ty: &TypeDescriptor,
    bytes: &[u8],
    heap: &[Vec<u8>],
    path: &str,
) -> Result<()> {
    let Target::Record(fields) = target else {
        if bytes.len() != ty.size() {
            return Err(MarshalError::Corruption(format!(
                "'{}' carries {} bytes, its type needs {}",
                path,
                bytes.len(),
                ty.size()
            )));
        }
        return Ok(());
    };

    for (name, field_target) in fields {
        let Some(field) = ty.field(name) else {
            continue;
        };
        let path = field_path(path, name);
        match resolve_field(field, bytes, heap)? {
            FieldStorage::Direct(inline) => {
                verify_storage(field_target, &field.ty, inline, heap, &path)?
            }
            FieldStorage::Indirect { inner, bytes, .. } => {
                verify_storage(field_target, inner, bytes, heap, &path)?
            }
        }
    }
    Ok(())
}

// =============================================================================
// Copy Out
// =============================================================================

fn copy_exact(destination: &mut [u8], source: &[u8], path: &str) -> Result<()> {
    if destination.len() != source.len() {
        return Err(MarshalError::Corruption(format!(
            "'{}' carries {} bytes, destination needs {}",
            path,
            source.len(),
            destination.len()
        )));
    }
    destination.copy_from_slice(source);
    Ok(())
}

/// Copy one checked and verified stored value into a destination
fn populate(
    target: Target<'_>,
    ty: &TypeDescriptor,
    bytes: &[u8],
    heap: &[Vec<u8>],
    path: &str,
) -> Result<()> {
    match target {
        Target::Shared => Err(MarshalError::NotAddressable),
        Target::Scalar(slot) => slot.load(bytes),
        Target::Array { bytes: destination, .. } => copy_exact(destination, bytes, path),
        Target::Sequence(slot) => {
            let expected = format!("sequence of {:?}", slot.kind());
            let count = element_count(ty, slot.kind(), path, &expected)?;
            let destination = slot.reallocate(count)?;
            copy_exact(destination, bytes, path)
        }
        Target::Record(fields) => {
            for (name, field_target) in fields {
                let path = field_path(path, name);
                let Some(field) = ty.field(name) else {
                    tracing::trace!(field = %path, "field not stored, skipping");
                    continue;
                };

                match resolve_field(field, bytes, heap)? {
                    FieldStorage::Direct(inline) => {
                        populate(field_target, &field.ty, inline, heap, &path)?
                    }
                    FieldStorage::Indirect { inner, bytes, .. } => {
                        populate(field_target, inner, bytes, heap, &path)?
                    }
                }
            }
            Ok(())
        }
    }
}
