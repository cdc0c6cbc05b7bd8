//! Descriptor builder
//!
//! Turns a value [`View`] into an [`ObjectNode`] tree whose nodes hold the
//! store type handle and the bytes of each value.
//!
//! - Scalars and arrays borrow the caller's bytes.
//! - Records own a freshly allocated buffer laid out by [`RecordLayout`].
//!   Sequence fields are replaced in that buffer by an [`Indirection`]; the
//!   sequence itself hangs below a wrapper node that carries the
//!   variable-length type handle and the indirection's heap slot.

use std::borrow::Cow;

use crate::error::{MarshalError, Result};
use crate::object::ObjectNode;
use crate::store::ArrayStore;
use crate::types::{type_map, Indirection, Kind, RecordLayout, INDIRECTION_ALIGN, INDIRECTION_SIZE};
use crate::value::{FieldViews, View};

/// Size and alignment of a described value when embedded in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    pub size: usize,
    pub align: usize,
}

/// Builds node trees for one put
///
/// Heap slots are numbered across the whole tree, so nested records can be
/// copied into their parent verbatim.
pub struct DescriptorBuilder<'s> {
    store: &'s dyn ArrayStore,
    next_slot: u64,
}

impl<'s> DescriptorBuilder<'s> {
    pub fn new(store: &'s dyn ArrayStore) -> Self {
        Self {
            store,
            next_slot: 0,
        }
    }

    /// Describe a value; `dims` applies only when the value is a sequence or
    /// array
    ///
    /// Every kind in the value is looked up before the first store call, so
    /// an unsupported kind anywhere in a record builds no types at all.
    pub fn describe<'v>(&mut self, view: View<'v>, dims: &[usize]) -> Result<ObjectNode<'s, 'v>> {
        check_supported(&view)?;

        let mut node = ObjectNode::new(self.store);
        self.fill(&mut node, view, dims)?;
        Ok(node)
    }

    fn fill<'v>(
        &mut self,
        node: &mut ObjectNode<'s, 'v>,
        view: View<'v>,
        dims: &[usize],
    ) -> Result<Footprint> {
        match view {
            View::Scalar { kind, bytes } => {
                if !dims.is_empty() {
                    return Err(MarshalError::DimensionMismatch(format!(
                        "explicit dimensions {:?} given for a scalar",
                        dims
                    )));
                }
                self.fill_array(node, kind, 1, bytes, &[])
            }
            View::Sequence { kind, len, bytes } | View::Array { kind, len, bytes } => {
                self.fill_array(node, kind, len, bytes, dims)
            }
            View::Record(fields) => {
                if !dims.is_empty() {
                    return Err(MarshalError::DimensionMismatch(format!(
                        "explicit dimensions {:?} given for a record",
                        dims
                    )));
                }
                self.fill_record(node, fields)
            }
        }
    }

    fn fill_array<'v>(
        &mut self,
        node: &mut ObjectNode<'s, 'v>,
        kind: Kind,
        len: usize,
        bytes: Cow<'v, [u8]>,
        dims: &[usize],
    ) -> Result<Footprint> {
        let element = type_map().lookup(kind)?;
        let dims = stored_dims(len, dims)?;

        let size = element.size() * len;
        if bytes.len() != size {
            return Err(MarshalError::TypeConstructionFailure(format!(
                "{} elements of {:?} carry {} bytes, expected {}",
                len,
                kind,
                bytes.len(),
                size
            )));
        }

        node.set_type_handle(self.store.make_array_type(element, &dims)?);
        node.set_data(bytes);

        Ok(Footprint {
            size,
            align: element.align(),
        })
    }

    fn fill_record<'v>(
        &mut self,
        node: &mut ObjectNode<'s, 'v>,
        fields: FieldViews<'v>,
    ) -> Result<Footprint> {
        let mut layout = RecordLayout::new();
        let mut placed = Vec::with_capacity(fields.len());
        let mut align = 1;

        for (name, view) in fields {
            let child = node.allocate_child();

            let footprint = if matches!(view, View::Sequence { .. }) {
                self.wrap_variable_length(child, view)?
            } else {
                self.fill(child, view, &[])?
            };

            align = align.max(footprint.align);
            placed.push((name, layout.place(footprint.size, footprint.align)));
        }

        let size = layout.finish();
        let record = self.store.make_record_type(size)?;
        node.set_type_handle(record);

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).map_err(|e| {
            MarshalError::AllocationFailure(format!("record buffer of {} bytes: {}", size, e))
        })?;
        buffer.resize(size, 0);

        for ((name, offset), child) in placed.iter().zip(node.children()) {
            let field_ty = child.type_handle().ok_or_else(|| {
                MarshalError::TypeConstructionFailure(format!("field '{}' has no type", name))
            })?;
            self.store.insert_field(record, name, *offset, field_ty)?;

            let data = child.data();
            buffer[*offset..*offset + data.len()].copy_from_slice(data);
        }

        node.set_data(Cow::Owned(buffer));
        Ok(Footprint { size, align })
    }

    /// Describe a sequence field below `wrapper` and turn `wrapper` into its
    /// indirection
    fn wrap_variable_length<'v>(
        &mut self,
        wrapper: &mut ObjectNode<'s, 'v>,
        view: View<'v>,
    ) -> Result<Footprint> {
        let inner = wrapper.allocate_child();
        self.fill(inner, view, &[])?;
        let inner_ty = inner.type_handle().ok_or_else(|| {
            MarshalError::TypeConstructionFailure("sequence field has no type".to_string())
        })?;

        wrapper.set_type_handle(self.store.make_variable_length_type(inner_ty)?);

        let slot = self.next_slot;
        self.next_slot += 1;
        wrapper.mark_variable_length(slot);
        wrapper.set_data(Cow::Owned(Indirection { length: 1, slot }.encode().to_vec()));

        Ok(Footprint {
            size: INDIRECTION_SIZE,
            align: INDIRECTION_ALIGN,
        })
    }
}

/// Fail with `UnsupportedType` on the first kind without a stored
/// representation
pub fn check_supported(view: &View<'_>) -> Result<()> {
    match view {
        View::Scalar { kind, .. } | View::Sequence { kind, .. } | View::Array { kind, .. } => {
            type_map().lookup(*kind).map(|_| ())
        }
        View::Record(fields) => fields.iter().try_for_each(|(_, field)| check_supported(field)),
    }
}

/// Validate explicit dimensions against a sequence length and convert them
/// to store order
///
/// Without explicit dimensions a sequence is one-dimensional. Supplied
/// dimensions are native order (last varies fastest) and come back
/// reversed, since the store's first dimension varies fastest.
pub fn stored_dims(len: usize, explicit: &[usize]) -> Result<Vec<usize>> {
    if explicit.is_empty() {
        return Ok(vec![len]);
    }

    if explicit.contains(&0) {
        return Err(MarshalError::DimensionMismatch(format!(
            "dimensions {:?} must be positive",
            explicit
        )));
    }

    let product = explicit
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            MarshalError::DimensionMismatch(format!("dimensions {:?} overflow", explicit))
        })?;

    if product != len {
        return Err(MarshalError::DimensionMismatch(format!(
            "dimensions {:?} hold {} elements, sequence has {}",
            explicit, product, len
        )));
    }

    Ok(explicit.iter().rev().copied().collect())
}
