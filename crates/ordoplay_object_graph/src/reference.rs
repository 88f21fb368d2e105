// SPDX-License-Identifier: MIT OR Apache-2.0
//! References from content to the nodes of the values it holds.

use crate::index::Index;
use crate::node::NodeId;
use crate::value::Value;

/// Link from a content slot (or one collection item) to the node of the
/// value it holds
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectReference {
    target: Option<NodeId>,
    index: Index,
    object_value: Value,
}

impl ObjectReference {
    pub(crate) fn new(target: Option<NodeId>, index: Index, object_value: Value) -> Self {
        Self { target, index, object_value }
    }

    /// Node of the referenced value, `None` when it is null or a primitive item
    pub fn target_node(&self) -> Option<NodeId> {
        self.target
    }

    /// Index of the item inside its collection, empty for single references
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Value the reference was last resolved for
    pub fn object_value(&self) -> &Value {
        &self.object_value
    }

    pub(crate) fn set_object_value(&mut self, value: Value) {
        self.object_value = value;
    }
}

/// One [`ObjectReference`] per item of a collection, in collection order
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEnumerable {
    collection: Value,
    items: Vec<ObjectReference>,
}

impl ReferenceEnumerable {
    pub(crate) fn new(collection: Value, items: Vec<ObjectReference>) -> Self {
        Self { collection, items }
    }

    /// Collection the references were built for
    pub fn collection(&self) -> &Value {
        &self.collection
    }

    /// Number of item references
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item references in order
    pub fn iter(&self) -> impl Iterator<Item = &ObjectReference> {
        self.items.iter()
    }

    /// Indices of the items in order
    pub fn indices(&self) -> impl Iterator<Item = &Index> {
        self.items.iter().map(ObjectReference::index)
    }

    /// Reference for the item at `index`
    pub fn get(&self, index: &Index) -> Option<&ObjectReference> {
        self.items.iter().find(|item| item.index == *index)
    }

    pub(crate) fn get_mut(&mut self, index: &Index) -> Option<&mut ObjectReference> {
        self.items.iter_mut().find(|item| item.index == *index)
    }

    pub(crate) fn into_items(self) -> Vec<ObjectReference> {
        self.items
    }
}

/// Reference held by non-primitive content
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// Single object reference
    Object(ObjectReference),
    /// Collection of item references
    Enumerable(ReferenceEnumerable),
}

impl Reference {
    /// The single object reference, if this is one
    pub fn as_object(&self) -> Option<&ObjectReference> {
        match self {
            Reference::Object(reference) => Some(reference),
            Reference::Enumerable(_) => None,
        }
    }

    /// The enumerable reference, if this is one
    pub fn as_enumerable(&self) -> Option<&ReferenceEnumerable> {
        match self {
            Reference::Enumerable(reference) => Some(reference),
            Reference::Object(_) => None,
        }
    }

    /// Every non-null target node
    pub fn target_nodes(&self) -> Vec<NodeId> {
        match self {
            Reference::Object(reference) => reference.target.into_iter().collect(),
            Reference::Enumerable(reference) => reference.items.iter().filter_map(|r| r.target).collect(),
        }
    }

    /// Reference for `index`: the object reference for the empty index,
    /// an item reference otherwise
    pub fn get(&self, index: &Index) -> Option<&ObjectReference> {
        match (self, index.is_empty()) {
            (Reference::Object(reference), true) => Some(reference),
            (Reference::Enumerable(reference), false) => reference.get(index),
            _ => None,
        }
    }
}
