//! Marshal Module
//!
//! Write and read paths between native values and store arrays.
//!
//! ## Write path
//! ```text
//! value ──view──► DescriptorBuilder ──► ObjectNode tree ──payload──► write_array
//! ```
//!
//! ## Read path
//! ```text
//! open_array ──stored_type──► TypeDescriptor ──► Target checks ──► read_array ──► copy
//! ```
//!
//! Every handle taken during a call is owned by a guard or an [`ObjectNode`],
//! so all of them are released on every exit path.
//!
//! [`ObjectNode`]: crate::object::ObjectNode

mod builder;
mod get;
mod put;

pub use builder::{check_supported, stored_dims, DescriptorBuilder, Footprint};
pub use get::{resolve_field, FieldStorage, Unmarshaler};
pub use put::Marshaler;

use crate::error::Result;
use crate::store::{ArrayHandle, ArrayStore, TypeHandle};

/// Closes an array handle when dropped
pub(crate) struct ArrayGuard<'s> {
    store: &'s dyn ArrayStore,
    handle: ArrayHandle,
}

impl<'s> ArrayGuard<'s> {
    pub(crate) fn create(
        store: &'s dyn ArrayStore,
        name: &str,
        ty: TypeHandle,
        shape: &[usize],
    ) -> Result<Self> {
        let handle = store.create_array(name, ty, shape)?;
        Ok(Self { store, handle })
    }

    pub(crate) fn open(store: &'s dyn ArrayStore, name: &str) -> Result<Self> {
        let handle = store.open_array(name)?;
        Ok(Self { store, handle })
    }

    pub(crate) fn handle(&self) -> ArrayHandle {
        self.handle
    }
}

impl Drop for ArrayGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.store.close_array(self.handle) {
            tracing::warn!(handle = self.handle.0, error = %e, "failed to close array handle");
        }
    }
}
