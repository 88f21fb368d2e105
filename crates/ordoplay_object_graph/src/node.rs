// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph nodes.

use crate::content::{Content, ContentObserver};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Handle returned when attaching an observer to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A node of the graph: one content slot plus named member children
pub struct GraphNode {
    id: NodeId,
    name: String,
    pub(crate) content: Content,
    pub(crate) children: IndexMap<String, NodeId>,
    parent: Option<NodeId>,
    pub(crate) observers: Vec<(SubscriptionId, ContentObserver)>,
}

impl GraphNode {
    pub(crate) fn new(id: NodeId, name: impl Into<String>, content: Content, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name: name.into(),
            content,
            children: IndexMap::new(),
            parent,
            observers: Vec::new(),
        }
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Member name for member nodes, type name for root nodes
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wrapped content
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Member child by name
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Member children in declaration order
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Number of member children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Owning node for member nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the node is a root (not a member of another node)
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of attached observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("content", &self.content)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("observers", &self.observers.len())
            .finish()
    }
}
