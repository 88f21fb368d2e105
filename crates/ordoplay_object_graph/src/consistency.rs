// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural validation of a node graph against the values it wraps.
//!
//! [`ConsistencyCheck`] walks a node, its members and (optionally) every
//! node it references, and reports the first place where the graph no longer
//! mirrors the underlying values. Values edited behind the container's back
//! are the usual culprit.

use crate::container::NodeContainer;
use crate::error::GraphError;
use crate::index::Index;
use crate::node::{GraphNode, NodeId};
use crate::reference::{ObjectReference, Reference};
use crate::value::Value;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Shape of a node's reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceShape {
    /// No reference
    None,
    /// Single object reference
    Object,
    /// One reference per collection item
    Enumerable,
}

impl ReferenceShape {
    fn of(reference: Option<&Reference>) -> Self {
        match reference {
            None => ReferenceShape::None,
            Some(Reference::Object(_)) => ReferenceShape::Object,
            Some(Reference::Enumerable(_)) => ReferenceShape::Enumerable,
        }
    }
}

/// Inconsistency found by [`ConsistencyCheck`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    /// A checked node is not in the container
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The node's value differs from the expected value
    #[error("Node {node:?} holds {actual}, expected {expected}")]
    ValueMismatch {
        /// Checked node
        node: NodeId,
        /// Value the node should hold
        expected: Value,
        /// Value the node holds
        actual: Value,
    },

    /// A root node has a parent
    #[error("Root node {node:?} has parent {parent:?}")]
    RootHasParent {
        /// Checked node
        node: NodeId,
        /// Unexpected parent
        parent: NodeId,
    },

    /// A member node does not point back to its owner
    #[error("Member node {node:?} has parent {actual:?}, expected {expected:?}")]
    ParentMismatch {
        /// Member node
        node: NodeId,
        /// Owner node
        expected: NodeId,
        /// Recorded parent
        actual: Option<NodeId>,
    },

    /// The node has a different number of members than its type describes
    #[error("Node {node:?} has {actual} members, expected {expected}")]
    ChildCount {
        /// Checked node
        node: NodeId,
        /// Described member count
        expected: usize,
        /// Actual child count
        actual: usize,
    },

    /// The reference does not match the shape of the value
    #[error("Node {node:?} has a {actual:?} reference, expected {expected:?}")]
    ReferenceShape {
        /// Checked node
        node: NodeId,
        /// Shape implied by the value
        expected: ReferenceShape,
        /// Shape found
        actual: ReferenceShape,
    },

    /// An enumerable reference has a different length than its collection
    #[error("Node {node:?} has {actual} item references, collection has {expected} items")]
    ItemCount {
        /// Checked node
        node: NodeId,
        /// Collection length
        expected: usize,
        /// Reference count
        actual: usize,
    },

    /// A reference records a different value than the slot holds
    #[error("Reference of node {node:?} at {index} records {actual}, slot holds {expected}")]
    ReferenceValue {
        /// Referencing node
        node: NodeId,
        /// Item index, empty for object references
        index: Index,
        /// Value in the slot
        expected: Value,
        /// Value recorded by the reference
        actual: Value,
    },

    /// A reference has a target where none is allowed, or lacks one
    #[error("Reference of node {node:?} at {index}: target {actual:?}, expected a target: {expected}")]
    Target {
        /// Referencing node
        node: NodeId,
        /// Item index, empty for object references
        index: Index,
        /// Whether a target is expected
        expected: bool,
        /// Target found
        actual: Option<NodeId>,
    },

    /// Reading a node failed
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Validator over a node and everything reachable from it
pub struct ConsistencyCheck<'a> {
    container: &'a NodeContainer,
    checked: HashSet<NodeId>,
    queue: VecDeque<(NodeId, Value)>,
}

impl<'a> ConsistencyCheck<'a> {
    /// Create a check over `container`
    pub fn new(container: &'a NodeContainer) -> Self {
        Self {
            container,
            checked: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    /// Check `node` against `expected`, then its members.
    ///
    /// With `check_references`, reference targets are checked too, each node
    /// at most once per check instance.
    pub fn check(&mut self, node: NodeId, expected: &Value, check_references: bool) -> Result<(), ConsistencyError> {
        self.queue.push_back((node, expected.clone()));
        while let Some((node, expected)) = self.queue.pop_front() {
            if !self.checked.insert(node) {
                continue;
            }
            if let Err(err) = self.check_node(node, &expected, check_references) {
                self.queue.clear();
                return Err(err);
            }
        }
        tracing::trace!(checked = self.checked.len(), "graph is consistent");
        Ok(())
    }

    /// Check every root node of the container against its own value
    pub fn check_all(&mut self) -> Result<(), ConsistencyError> {
        let roots: Vec<NodeId> = self
            .container
            .nodes()
            .filter(|node| !node.content().is_member())
            .map(GraphNode::id)
            .collect();
        for root in roots {
            let value = self.container.retrieve(root, &Index::Empty)?;
            self.check(root, &value, true)?;
        }
        Ok(())
    }

    /// Number of nodes checked so far
    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }

    fn check_node(&mut self, id: NodeId, expected: &Value, check_references: bool) -> Result<(), ConsistencyError> {
        let node = self.container.node(id).ok_or(ConsistencyError::NodeNotFound(id))?;
        let value = self.container.retrieve(id, &Index::Empty)?;
        if value != *expected {
            return Err(ConsistencyError::ValueMismatch {
                node: id,
                expected: expected.clone(),
                actual: value,
            });
        }

        let content = node.content();
        if !content.is_member() {
            if let Some(parent) = node.parent() {
                return Err(ConsistencyError::RootHasParent { node: id, parent });
            }
        }

        let expected_children = self.described_member_count(node, &value);
        if node.child_count() != expected_children {
            return Err(ConsistencyError::ChildCount {
                node: id,
                expected: expected_children,
                actual: node.child_count(),
            });
        }

        let expected_shape = self.expected_shape(node, &value);
        let actual_shape = ReferenceShape::of(content.reference());
        if expected_shape != actual_shape {
            return Err(ConsistencyError::ReferenceShape {
                node: id,
                expected: expected_shape,
                actual: actual_shape,
            });
        }

        for (name, child) in node.children() {
            let child_parent = self.container.node(child).and_then(GraphNode::parent);
            if child_parent != Some(id) {
                return Err(ConsistencyError::ParentMismatch {
                    node: child,
                    expected: id,
                    actual: child_parent,
                });
            }
            self.queue.push_back((child, value.member(name).unwrap_or_default()));
        }

        match content.reference() {
            Some(Reference::Object(reference)) => {
                self.check_reference(id, reference, &value, !value.is_null(), check_references)?;
            }
            Some(Reference::Enumerable(reference)) => {
                if *reference.collection() != value {
                    return Err(ConsistencyError::ReferenceValue {
                        node: id,
                        index: Index::Empty,
                        expected: value,
                        actual: reference.collection().clone(),
                    });
                }
                let items = value.items();
                if reference.len() != items.len() {
                    return Err(ConsistencyError::ItemCount {
                        node: id,
                        expected: items.len(),
                        actual: reference.len(),
                    });
                }
                for ((index, item), item_reference) in items.iter().zip(reference.iter()) {
                    if item_reference.index() != index {
                        return Err(ConsistencyError::Target {
                            node: id,
                            index: index.clone(),
                            expected: true,
                            actual: None,
                        });
                    }
                    let has_target = matches!(
                        item,
                        Value::Object(_) | Value::Struct(_) | Value::List(_) | Value::Map(_)
                    );
                    self.check_reference(id, item_reference, item, has_target, check_references)?;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn check_reference(
        &mut self,
        node: NodeId,
        reference: &ObjectReference,
        slot: &Value,
        has_target: bool,
        check_references: bool,
    ) -> Result<(), ConsistencyError> {
        if reference.object_value() != slot {
            return Err(ConsistencyError::ReferenceValue {
                node,
                index: reference.index().clone(),
                expected: slot.clone(),
                actual: reference.object_value().clone(),
            });
        }
        match reference.target_node() {
            Some(target) if has_target => {
                if check_references {
                    self.queue.push_back((target, slot.clone()));
                }
                Ok(())
            }
            None if !has_target => Ok(()),
            actual => Err(ConsistencyError::Target {
                node,
                index: reference.index().clone(),
                expected: has_target,
                actual,
            }),
        }
    }

    fn described_member_count(&self, node: &GraphNode, value: &Value) -> usize {
        let content = node.content();
        if content.is_primitive() {
            return 0;
        }
        let described = if content.is_member() {
            self.container.struct_descriptor(content.ty())
        } else {
            match value {
                Value::Object(object) => self.container.types().describe(&object.type_name()).cloned(),
                Value::Struct(value) => self.container.types().describe(value.type_name()).cloned(),
                _ => None,
            }
        };
        described.map_or(0, |descriptor| descriptor.members.len())
    }

    fn expected_shape(&self, node: &GraphNode, value: &Value) -> ReferenceShape {
        let content = node.content();
        if content.is_primitive() {
            ReferenceShape::None
        } else if value.is_collection() {
            ReferenceShape::Enumerable
        } else if content.is_member() && self.container.struct_descriptor(content.ty()).is_none() {
            ReferenceShape::Object
        } else {
            ReferenceShape::None
        }
    }
}
