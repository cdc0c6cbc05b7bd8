//! Write path

use crate::error::{MarshalError, Result};
use crate::store::ArrayStore;
use crate::value::Marshal;

use super::{ArrayGuard, DescriptorBuilder};

/// Writes values into named arrays of a store
pub struct Marshaler<'s> {
    store: &'s dyn ArrayStore,
}

impl<'s> Marshaler<'s> {
    pub fn new(store: &'s dyn ArrayStore) -> Self {
        Self { store }
    }

    /// Store `value` under `name`, replacing any existing array
    ///
    /// `dims` reshapes a top-level sequence and is given in native order;
    /// pass an empty slice to store it one-dimensional.
    pub fn put<T: Marshal + ?Sized>(&self, name: &str, value: &T, dims: &[usize]) -> Result<()> {
        let view = value.view();
        let shape = view.shape();
        tracing::debug!(array = name, shape, dims = ?dims, "put");

        // All validation happens here, before the array is touched
        let node = DescriptorBuilder::new(self.store).describe(view, dims)?;
        let ty = node.type_handle().ok_or_else(|| {
            MarshalError::TypeConstructionFailure(format!("no type built for '{}'", name))
        })?;

        if self.store.array_exists(name) {
            tracing::trace!(array = name, "replacing existing array");
            self.store.delete_array(name)?;
        }

        let array = ArrayGuard::create(self.store, name, ty, &[1])?;
        self.store.write_array(array.handle(), &node.payload())?;

        tracing::debug!(
            array = name,
            shape,
            bytes = node.data().len(),
            "put complete"
        );
        Ok(())
    }
}
