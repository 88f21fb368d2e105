// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised by node construction and content mutation.

use crate::index::Index;
use crate::node::NodeId;

/// Error from a container operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node is not part of the container
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// No descriptor available for a type that needs one
    #[error("No type description for `{0}`")]
    UnknownType(String),

    /// Value does not fit the declared type of its slot
    #[error("Expected a value of type `{expected}`, got `{actual}`")]
    TypeMismatch {
        /// Declared type
        expected: String,
        /// Runtime type of the rejected value
        actual: String,
    },

    /// An index was given for content that is not a collection
    #[error("Node {node:?} is not a collection, cannot use index {index}")]
    NotACollection {
        /// Node that was addressed
        node: NodeId,
        /// Offending index
        index: Index,
    },

    /// A collection operation was given the empty index
    #[error("Collection operation on node {0:?} requires an index")]
    IndexRequired(NodeId),

    /// Index kind does not match the collection, or the item is missing
    #[error("Index {index} is not valid for node {node:?}")]
    InvalidIndex {
        /// Node that was addressed
        node: NodeId,
        /// Offending index
        index: Index,
    },

    /// A dictionary entry already exists for this key
    #[error("Node {node:?} already has an entry at {index}")]
    DuplicateKey {
        /// Node that was addressed
        node: NodeId,
        /// Offending index
        index: Index,
    },

    /// The value of object content is its identity and cannot be replaced
    #[error("Node {0:?} wraps an object; update the member that references it instead")]
    ObjectContentIsImmutable(NodeId),

    /// Operation needs a reference target that is null
    #[error("Node {0:?} has no reference target")]
    NoTarget(NodeId),

    /// Member is not declared on the node's type
    #[error("Node {node:?} has no member `{member}`")]
    MemberNotFound {
        /// Node that was addressed
        node: NodeId,
        /// Requested member
        member: String,
    },

    /// Identity lookups were requested from a container that does not track identities
    #[error("Identity tracking is disabled for this container")]
    IdentityTrackingDisabled,
}

impl GraphError {
    pub(crate) fn type_mismatch(expected: &impl ToString, actual: &crate::value::Value) -> Self {
        GraphError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual
                .runtime_type()
                .map_or_else(|| "null".to_string(), |ty| ty.to_string()),
        }
    }
}

/// Result alias for container operations
pub type GraphResult<T> = Result<T, GraphError>;
