//! Object nodes
//!
//! One node per marshaled value. A node holds a store type handle, its data
//! (borrowed from the caller or owned by the node) and exclusively-owned
//! children. Dropping a node releases, in order: all children, its type
//! handle, its buffer. Children never outlive the buffer they describe.

use std::borrow::Cow;
use std::fmt;

use crate::store::{ArrayStore, Payload, TypeHandle};

/// Progress of a node through a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeState {
    Uninitialized,
    TypeChecked,
    Allocated,
    Populated,
}

/// Resource-tracking unit of a single put or get
pub struct ObjectNode<'s, 'v> {
    store: &'s dyn ArrayStore,
    data: Cow<'v, [u8]>,
    type_handle: Option<TypeHandle>,
    /// Heap slot of the indirection this node wraps, if any
    slot: Option<u64>,
    state: NodeState,
    children: Vec<ObjectNode<'s, 'v>>,
}

impl<'s, 'v> ObjectNode<'s, 'v> {
    pub fn new(store: &'s dyn ArrayStore) -> Self {
        Self {
            store,
            data: Cow::Borrowed(&[]),
            type_handle: None,
            slot: None,
            state: NodeState::Uninitialized,
            children: Vec::new(),
        }
    }

    /// Register a new empty child and return it for the caller to fill
    pub fn allocate_child(&mut self) -> &mut ObjectNode<'s, 'v> {
        let child = ObjectNode::new(self.store);
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn children(&self) -> &[ObjectNode<'s, 'v>] {
        &self.children
    }

    pub fn type_handle(&self) -> Option<TypeHandle> {
        self.type_handle
    }

    /// Take ownership of a type handle; a previously held handle is closed
    pub fn set_type_handle(&mut self, handle: TypeHandle) {
        if let Some(previous) = self.type_handle.replace(handle) {
            self.close_handle(previous);
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Cow<'v, [u8]>) {
        self.data = data;
    }

    /// Whether the node's buffer is owned rather than borrowed
    pub fn is_owned(&self) -> bool {
        matches!(self.data, Cow::Owned(_))
    }

    /// Mutable access to the node's buffer, copying borrowed data first
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        self.data.to_mut()
    }

    /// Mark this node as the wrapper of a variable-length payload
    ///
    /// The payload itself is the node's first child.
    pub fn mark_variable_length(&mut self, slot: u64) {
        self.slot = Some(slot);
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Move to a later read state; states only move forward
    pub fn advance(&mut self, state: NodeState) {
        debug_assert!(state >= self.state, "node state {:?} after {:?}", state, self.state);
        tracing::trace!(from = ?self.state, to = ?state, "node state");
        self.state = state;
    }

    /// Linear view of the tree for a store write
    ///
    /// The node's own bytes are the top-level buffer; every variable-length
    /// wrapper in the tree contributes its payload at its slot.
    pub fn payload(&self) -> Payload<'_> {
        let mut slots = Vec::new();
        self.collect_heap(&mut slots);
        slots.sort_by_key(|(slot, _)| *slot);

        Payload {
            bytes: &self.data,
            heap: slots.into_iter().map(|(_, data)| data).collect(),
        }
    }

    fn collect_heap<'a>(&'a self, out: &mut Vec<(u64, &'a [u8])>) {
        if let (Some(slot), Some(payload)) = (self.slot, self.children.first()) {
            out.push((slot, payload.data()));
        }
        for child in &self.children {
            child.collect_heap(out);
        }
    }

    fn close_handle(&self, handle: TypeHandle) {
        if let Err(e) = self.store.close_type(handle) {
            tracing::warn!(handle = handle.0, error = %e, "failed to close type handle");
        }
    }
}

impl Drop for ObjectNode<'_, '_> {
    fn drop(&mut self) {
        // Children first: they may describe bytes inside this node's buffer
        self.children.clear();

        if let Some(handle) = self.type_handle.take() {
            self.close_handle(handle);
        }
        // `data` is released after this body returns
    }
}

impl fmt::Debug for ObjectNode<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectNode")
            .field("bytes", &self.data.len())
            .field("owned", &self.is_owned())
            .field("type_handle", &self.type_handle)
            .field("slot", &self.slot)
            .field("state", &self.state)
            .field("children", &self.children)
            .finish()
    }
}
