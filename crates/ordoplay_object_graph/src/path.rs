// SPDX-License-Identifier: MIT OR Apache-2.0
//! Paths addressing nodes relative to a root node.
//!
//! A path is a root plus a list of steps. Steps are never validated when
//! the path is built, only when it is resolved against a container, so a
//! path that outlives a structural change simply stops resolving.

use crate::container::NodeContainer;
use crate::index::Index;
use crate::node::NodeId;
use crate::reference::Reference;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a [`GraphNodePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStep {
    /// Member child with the given name
    Member(String),
    /// Target of an object reference
    Target,
    /// Target of one item of an enumerable reference
    Index(Index),
}

/// Error resolving a [`GraphNodePath`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    /// A node on the path is not in the container
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Member step on a node without that member
    #[error("Node {node:?} has no member `{member}`")]
    MemberNotFound {
        /// Node the step started from
        node: NodeId,
        /// Requested member
        member: String,
    },

    /// Target step on a node without an object reference
    #[error("Node {0:?} does not hold an object reference")]
    NotAnObjectReference(NodeId),

    /// Index step on a node without an enumerable reference
    #[error("Node {node:?} is not a collection, cannot use index {index}")]
    NotACollection {
        /// Node the step started from
        node: NodeId,
        /// Requested index
        index: Index,
    },

    /// Index step with the empty index
    #[error("Index step on node {0:?} requires an index")]
    EmptyIndex(NodeId),

    /// Index step past the end of the collection
    #[error("Node {node:?} has no item at {index}")]
    IndexNotFound {
        /// Node the step started from
        node: NodeId,
        /// Requested index
        index: Index,
    },

    /// A step before the last one reached a null reference
    #[error("Reference of node {0:?} is null")]
    NullTarget(NodeId),
}

/// Root node plus a sequence of member, target and index steps
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphNodePath {
    root: NodeId,
    steps: Vec<PathStep>,
}

impl GraphNodePath {
    /// Create the empty path of a root node
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            steps: Vec::new(),
        }
    }

    /// Root node
    pub fn root_node(&self) -> NodeId {
        self.root
    }

    /// Steps from the root
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Whether the path addresses the root itself
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(&self, step: PathStep) -> Self {
        let mut path = self.clone();
        path.steps.push(step);
        path
    }

    /// Path extended with a member step
    pub fn push_member(&self, name: impl Into<String>) -> Self {
        self.push(PathStep::Member(name.into()))
    }

    /// Path extended with a target step
    pub fn push_target(&self) -> Self {
        self.push(PathStep::Target)
    }

    /// Path extended with an index step
    pub fn push_index(&self, index: Index) -> Self {
        self.push(PathStep::Index(index))
    }

    /// Path without its last step; `None` for the empty path
    pub fn parent(&self) -> Option<Self> {
        let (_, steps) = self.steps.split_last()?;
        Some(Self {
            root: self.root,
            steps: steps.to_vec(),
        })
    }

    /// Same steps from another root
    pub fn clone_with_root(&self, root: NodeId) -> Self {
        Self {
            root,
            steps: self.steps.clone(),
        }
    }

    /// Resolve the path.
    ///
    /// Returns `Ok(None)` when the last step is a null reference.
    pub fn get_node(&self, container: &NodeContainer) -> Result<Option<NodeId>, PathError> {
        let mut nodes = self.nodes(container);
        let mut last = None;
        for node in nodes.by_ref() {
            last = Some(node);
        }
        match nodes.error {
            Some(PathError::NullTarget(_)) if nodes.consumed == self.steps.len() => Ok(None),
            Some(err) => Err(err),
            None => Ok(last),
        }
    }

    /// Whether the path resolves to a node
    pub fn is_valid(&self, container: &NodeContainer) -> bool {
        matches!(self.get_node(container), Ok(Some(_)))
    }

    /// The root followed by the node reached after each step, stopping at
    /// the first step that does not resolve
    pub fn nodes<'a>(&'a self, container: &'a NodeContainer) -> PathNodes<'a> {
        PathNodes {
            container,
            path: self,
            current: None,
            consumed: 0,
            started: false,
            error: None,
        }
    }
}

impl fmt::Display for GraphNodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for step in &self.steps {
            match step {
                PathStep::Member(name) => write!(f, ".{name}")?,
                PathStep::Target => write!(f, "->")?,
                PathStep::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

/// Iterator over the nodes a path passes through
pub struct PathNodes<'a> {
    container: &'a NodeContainer,
    path: &'a GraphNodePath,
    current: Option<NodeId>,
    consumed: usize,
    started: bool,
    error: Option<PathError>,
}

impl PathNodes<'_> {
    /// Why iteration stopped early, if it did
    pub fn error(&self) -> Option<&PathError> {
        self.error.as_ref()
    }

    fn step(&self, node: NodeId, step: &PathStep) -> Result<NodeId, PathError> {
        let graph_node = self
            .container
            .node(node)
            .ok_or(PathError::NodeNotFound(node))?;
        let reference = graph_node.content().reference();
        match step {
            PathStep::Member(name) => graph_node.child(name).ok_or_else(|| PathError::MemberNotFound {
                node,
                member: name.clone(),
            }),
            PathStep::Target => match reference {
                Some(Reference::Object(reference)) => {
                    reference.target_node().ok_or(PathError::NullTarget(node))
                }
                _ => Err(PathError::NotAnObjectReference(node)),
            },
            PathStep::Index(index) if index.is_empty() => Err(PathError::EmptyIndex(node)),
            PathStep::Index(index) => match reference {
                Some(Reference::Enumerable(reference)) => {
                    let item = reference.get(index).ok_or_else(|| PathError::IndexNotFound {
                        node,
                        index: index.clone(),
                    })?;
                    item.target_node().ok_or(PathError::NullTarget(node))
                }
                _ => Err(PathError::NotACollection {
                    node,
                    index: index.clone(),
                }),
            },
        }
    }
}

impl Iterator for PathNodes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.error.is_some() {
            return None;
        }
        if !self.started {
            self.started = true;
            let root = self.path.root;
            if !self.container.contains(root) {
                self.error = Some(PathError::NodeNotFound(root));
                return None;
            }
            self.current = Some(root);
            return self.current;
        }
        let current = self.current?;
        let step = self.path.steps.get(self.consumed)?;
        self.consumed += 1;
        match self.step(current, step) {
            Ok(next) => {
                self.current = Some(next);
                Some(next)
            }
            Err(err) => {
                self.error = Some(err);
                self.current = None;
                None
            }
        }
    }
}
