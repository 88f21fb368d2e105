// SPDX-License-Identifier: MIT OR Apache-2.0
//! Object graph content model for `OrdoPlay` Editor.
//!
//! This crate mirrors an in-memory object model as a graph of nodes, and
//! powers:
//! - Property grids (members, collections, dictionaries)
//! - Undo-friendly change tracking
//! - Prefab and asset linking between two object graphs
//!
//! ## Architecture
//!
//! A [`NodeContainer`] owns every node and maps each object, list or
//! dictionary identity to exactly one root node. Nodes wrap a [`Content`]
//! slot with:
//! - Named member children built from registered type descriptions
//! - Object or enumerable references to target nodes
//! - Four-phase change notifications for every mutation
//!
//! On top of the container sit [`GraphNodePath`] addressing,
//! [`GraphVisitor`] traversal, the [`GraphNodeChangeListener`] that
//! republishes every change under a root, the [`GraphNodeLinker`] pairing
//! two graphs, [`DynamicNode`] member access by name and the
//! [`ConsistencyCheck`] validator.

pub mod consistency;
pub mod container;
pub mod content;
pub mod descriptor;
pub mod dynamic;
pub mod error;
pub mod index;
pub mod linker;
pub mod listener;
pub mod node;
pub mod path;
pub mod reference;
pub mod settings;
pub mod value;
pub mod visitor;

mod builder;
mod mutation;

#[cfg(test)]
mod test_support;

pub use consistency::{ConsistencyCheck, ConsistencyError};
pub use container::NodeContainer;
pub use content::{ChangePhase, Content, ContentChangeArgs, ContentChangeType, ContentObserver};
pub use descriptor::{ObjectDescriptor, ObjectKind, TypeDescriber, TypeRef, TypeRegistry};
pub use dynamic::DynamicNode;
pub use error::{GraphError, GraphResult};
pub use index::{Index, MapKey};
pub use linker::{GraphNodeLinker, LinkMap, NodeLinker};
pub use listener::{GraphContentChangeEventArgs, GraphNodeChangeListener};
pub use node::{GraphNode, NodeId, SubscriptionId};
pub use path::{GraphNodePath, PathError, PathStep};
pub use reference::{ObjectReference, Reference, ReferenceEnumerable};
pub use settings::{ContainerSettings, SettingsError};
pub use value::{ListRef, MapRef, ObjectRef, StructValue, Value};
pub use visitor::{GraphVisitor, VisitContext};
