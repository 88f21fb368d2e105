// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node container: owns every node and maps object identities to root nodes.
//!
//! Node construction and content mutation live in their own modules, both
//! as further `impl NodeContainer` blocks.

use crate::content::{Content, ContentObserver, ContentStorage};
use crate::descriptor::{ObjectDescriptor, ObjectKind, TypeDescriber, TypeRef};
use crate::error::{GraphError, GraphResult};
use crate::index::Index;
use crate::node::{GraphNode, NodeId, SubscriptionId};
use crate::reference::Reference;
use crate::settings::ContainerSettings;
use crate::value::{Identity, Value};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Owner of all graph nodes
pub struct NodeContainer {
    pub(crate) nodes: IndexMap<NodeId, GraphNode>,
    pub(crate) identities: HashMap<Identity, NodeId>,
    types: Box<dyn TypeDescriber>,
    primitive_types: HashSet<String>,
    settings: ContainerSettings,
    pub(crate) build_depth: usize,
}

impl NodeContainer {
    /// Create a container with default settings
    pub fn new(types: impl TypeDescriber + 'static) -> Self {
        Self::with_settings(types, ContainerSettings::default())
    }

    /// Create a container with the given settings
    pub fn with_settings(types: impl TypeDescriber + 'static, settings: ContainerSettings) -> Self {
        Self {
            nodes: IndexMap::new(),
            identities: HashMap::new(),
            types: Box::new(types),
            primitive_types: settings.primitive_types.iter().cloned().collect(),
            settings,
            build_depth: 0,
        }
    }

    /// Settings the container was created with
    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Type describer used to build nodes
    pub fn types(&self) -> &dyn TypeDescriber {
        self.types.as_ref()
    }

    /// Treat a named type as a leaf. Affects nodes built afterwards.
    pub fn register_primitive_type(&mut self, type_name: impl Into<String>) {
        self.primitive_types.insert(type_name.into());
    }

    /// Whether values of `ty` are leaves
    pub fn is_primitive_type(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Named(name) => self.primitive_types.contains(name),
            _ => ty.is_builtin_primitive(),
        }
    }

    pub(crate) fn describe(&self, type_name: &str) -> GraphResult<ObjectDescriptor> {
        self.types
            .describe(type_name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownType(type_name.to_string()))
    }

    /// Descriptor of `ty` when it names a described struct
    pub(crate) fn struct_descriptor(&self, ty: &TypeRef) -> Option<ObjectDescriptor> {
        match ty {
            TypeRef::Named(name) => self
                .types
                .describe(name)
                .filter(|d| d.kind == ObjectKind::Struct)
                .cloned(),
            _ => None,
        }
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> GraphResult<&GraphNode> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut GraphNode> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Get a node's content
    pub fn content(&self, id: NodeId) -> Option<&Content> {
        self.nodes.get(&id).map(GraphNode::content)
    }

    /// Whether the node belongs to this container
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the container holds no node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node and identity
    pub fn clear(&mut self) {
        tracing::debug!(nodes = self.nodes.len(), "clearing node container");
        self.nodes.clear();
        self.identities.clear();
    }

    /// Member child of a node by name
    pub fn get_child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(&node)?.child(name)
    }

    /// Member children of a node in declaration order
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.values().copied().collect())
            .unwrap_or_default()
    }

    /// Target node of a node's reference at `index`
    pub fn get_target(&self, node: NodeId, index: &Index) -> Option<NodeId> {
        self.nodes
            .get(&node)?
            .content
            .reference()?
            .get(index)?
            .target_node()
    }

    /// Root node registered for an identity-bearing value.
    ///
    /// Structs and primitives have no identity and always yield `None`.
    pub fn get_node(&self, value: &Value) -> GraphResult<Option<NodeId>> {
        if !self.settings.track_identity {
            return Err(GraphError::IdentityTrackingDisabled);
        }
        Ok(value
            .identity()
            .and_then(|identity| self.identities.get(&identity).copied()))
    }

    /// Read a node's value, or one item of it
    pub fn retrieve(&self, node: NodeId, index: &Index) -> GraphResult<Value> {
        let value = self.value_of(node)?;
        if index.is_empty() {
            Ok(value)
        } else {
            self.item_at(node, &value, index)
        }
    }

    /// Valid indices of a node's collection value; empty for other content
    pub fn indices(&self, node: NodeId) -> GraphResult<Vec<Index>> {
        Ok(self.value_of(node)?.indices())
    }

    pub(crate) fn value_of(&self, id: NodeId) -> GraphResult<Value> {
        match &self.node_ref(id)?.content.storage {
            ContentStorage::Object(value) | ContentStorage::Boxed { value, .. } => Ok(value.clone()),
            ContentStorage::Member { owner, name } => {
                Ok(self.value_of(*owner)?.member(name).unwrap_or_default())
            }
        }
    }

    pub(crate) fn item_at(&self, node: NodeId, collection: &Value, index: &Index) -> GraphResult<Value> {
        if !collection.is_collection() {
            return Err(GraphError::NotACollection { node, index: index.clone() });
        }
        if index.is_empty() {
            return Err(GraphError::IndexRequired(node));
        }
        collection.item(index).ok_or_else(|| GraphError::InvalidIndex {
            node,
            index: index.clone(),
        })
    }

    /// Attach an observer to a node's content
    pub fn subscribe(&mut self, node: NodeId, observer: ContentObserver) -> GraphResult<SubscriptionId> {
        let id = SubscriptionId::new();
        self.node_mut(node)?.observers.push((id, observer));
        Ok(id)
    }

    /// Detach an observer. Returns false when it was not attached.
    pub fn unsubscribe(&mut self, node: NodeId, subscription: SubscriptionId) -> bool {
        let Some(graph_node) = self.nodes.get_mut(&node) else {
            return false;
        };
        let before = graph_node.observers.len();
        graph_node.observers.retain(|(id, _)| *id != subscription);
        graph_node.observers.len() != before
    }

    /// Render the node tree below `node`, following references once per node
    pub fn print_hierarchy(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut printed = HashSet::new();
        self.print_node(node, 0, &mut printed, &mut out);
        out
    }

    fn print_node(&self, id: NodeId, depth: usize, printed: &mut HashSet<NodeId>, out: &mut String) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.nodes.get(&id) else {
            out.push_str(&format!("{indent}<missing {id}>\n"));
            return;
        };
        if !printed.insert(id) {
            out.push_str(&format!("{indent}{} (see above)\n", node.name()));
            return;
        }
        let value = self.value_of(id).unwrap_or_default();
        out.push_str(&format!("{indent}{}: {} = {value}\n", node.name(), node.content.ty()));
        for child in node.children.values() {
            self.print_node(*child, depth + 1, printed, out);
        }
        match node.content.reference() {
            Some(Reference::Object(reference)) => {
                if let Some(target) = reference.target_node() {
                    out.push_str(&format!("{indent}  ->\n"));
                    self.print_node(target, depth + 2, printed, out);
                }
            }
            Some(Reference::Enumerable(reference)) => {
                for item in reference.iter() {
                    match item.target_node() {
                        Some(target) => {
                            out.push_str(&format!("{indent}  {} ->\n", item.index()));
                            self.print_node(target, depth + 2, printed, out);
                        }
                        None => out.push_str(&format!("{indent}  {} = {}\n", item.index(), item.object_value())),
                    }
                }
            }
            None => {}
        }
    }
}

impl fmt::Debug for NodeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContainer")
            .field("nodes", &self.nodes.len())
            .field("identities", &self.identities.len())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ChangePhase, ContentChangeArgs};
    use crate::test_support::{container, fixture_types, simple};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_retrieve_and_children() {
        let mut container = container();
        let instance = simple(3, Value::Null);
        let root = container.get_or_create_node(&instance.clone().into()).unwrap().unwrap();

        let member1 = container.get_child(root, "Member1").unwrap();
        assert_eq!(container.retrieve(member1, &Index::Empty).unwrap(), Value::Int(3));
        assert_eq!(container.children(root), vec![member1, container.get_child(root, "Member2").unwrap()]);
        assert_eq!(container.retrieve(root, &Index::Empty).unwrap(), Value::Object(instance));
        assert!(container.get_child(root, "Missing").is_none());
        assert!(matches!(
            container.retrieve(member1, &Index::Int(0)),
            Err(GraphError::NotACollection { .. })
        ));
    }

    #[test]
    fn test_get_node_without_identity_tracking() {
        let settings = ContainerSettings {
            track_identity: false,
            ..ContainerSettings::default()
        };
        let mut container = NodeContainer::with_settings(fixture_types(), settings);
        let value = Value::from(simple(1, Value::Null));
        let first = container.get_or_create_node(&value).unwrap();
        let second = container.get_or_create_node(&value).unwrap();
        assert_ne!(first, second);
        assert!(matches!(container.get_node(&value), Err(GraphError::IdentityTrackingDisabled)));
    }

    #[test]
    fn test_struct_and_primitive_have_no_registered_node() {
        let container = container();
        let value = Value::from(crate::test_support::fixture_struct("a", Value::Null));
        assert_eq!(container.get_node(&value).unwrap(), None);
        assert_eq!(container.get_node(&Value::Int(1)).unwrap(), None);
        assert_eq!(container.get_node(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let mut container = container();
        let root = container
            .get_or_create_node(&simple(0, Value::Null).into())
            .unwrap()
            .unwrap();
        let member1 = container.get_child(root, "Member1").unwrap();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let subscription = container
            .subscribe(
                member1,
                Rc::new(move |_: &mut NodeContainer, _: ChangePhase, _: &ContentChangeArgs| {
                    *counter.borrow_mut() += 1;
                }),
            )
            .unwrap();

        container.update(member1, 2, Index::Empty).unwrap();
        assert_eq!(*calls.borrow(), 4);

        assert!(container.unsubscribe(member1, subscription));
        assert!(!container.unsubscribe(member1, subscription));
        container.update(member1, 3, Index::Empty).unwrap();
        assert_eq!(*calls.borrow(), 4);
    }

    #[test]
    fn test_clear() {
        let mut container = container();
        let value = Value::from(simple(0, Value::Null));
        container.get_or_create_node(&value).unwrap();
        assert!(!container.is_empty());
        container.clear();
        assert!(container.is_empty());
        assert_eq!(container.get_node(&value).unwrap(), None);
    }

    #[test]
    fn test_print_hierarchy_terminates_on_cycles() {
        let mut container = container();
        let instance = simple(1, Value::Null);
        instance.set("Member2", instance.clone());
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();
        let printed = container.print_hierarchy(root);
        assert!(printed.starts_with("SimpleClass: SimpleClass"));
        assert!(printed.contains("Member1: int = 1"));
        assert!(printed.contains("(see above)"));
    }
}
