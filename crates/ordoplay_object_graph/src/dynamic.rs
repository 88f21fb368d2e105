// SPDX-License-Identifier: MIT OR Apache-2.0
//! Name- and index-based navigation over nodes.

use crate::container::NodeContainer;
use crate::error::{GraphError, GraphResult};
use crate::index::Index;
use crate::node::NodeId;
use crate::reference::Reference;
use crate::value::Value;

/// Cursor over a node, or over one item of a node's collection.
///
/// Member access follows object references transparently, so
/// `root.member("Member2")?.member("Member1")` reaches the `Member1` of the
/// object referenced by `Member2`.
pub struct DynamicNode<'a> {
    container: &'a mut NodeContainer,
    node: NodeId,
    index: Index,
}

impl<'a> DynamicNode<'a> {
    /// Cursor over a whole node
    pub fn new(container: &'a mut NodeContainer, node: NodeId) -> Self {
        Self {
            container,
            node,
            index: Index::Empty,
        }
    }

    /// Node under the cursor
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Item index under the cursor, empty for a whole node
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Underlying container
    pub fn container(&self) -> &NodeContainer {
        &*self.container
    }

    /// Node whose members and items this cursor exposes
    fn target_node(&self) -> Option<NodeId> {
        if !self.index.is_empty() {
            return self.container.get_target(self.node, &self.index);
        }
        match self.container.content(self.node)?.reference() {
            Some(Reference::Object(reference)) => reference.target_node(),
            _ => Some(self.node),
        }
    }

    fn collection_node(&self) -> GraphResult<NodeId> {
        if self.index.is_empty() {
            Ok(self.node)
        } else {
            self.target_node().ok_or(GraphError::NoTarget(self.node))
        }
    }

    /// Read the value under the cursor
    pub fn retrieve(&self) -> GraphResult<Value> {
        self.container.retrieve(self.node, &self.index)
    }

    /// Replace the value under the cursor
    pub fn update(&mut self, value: impl Into<Value>) -> GraphResult<()> {
        self.container.update(self.node, value, self.index.clone())
    }

    /// Cursor over a member
    pub fn member(&mut self, name: &str) -> GraphResult<DynamicNode<'_>> {
        let target = self.target_node().ok_or(GraphError::NoTarget(self.node))?;
        let child = self
            .container
            .get_child(target, name)
            .ok_or_else(|| GraphError::MemberNotFound {
                node: target,
                member: name.to_string(),
            })?;
        Ok(DynamicNode {
            container: &mut *self.container,
            node: child,
            index: Index::Empty,
        })
    }

    /// Replace a member's value
    pub fn set_member(&mut self, name: &str, value: impl Into<Value>) -> GraphResult<()> {
        self.member(name)?.update(value)
    }

    /// Names of the members reachable from the cursor
    pub fn member_names(&self) -> Vec<String> {
        self.target_node()
            .and_then(|target| self.container.node(target))
            .map(|node| node.children().map(|(name, _)| name.to_string()).collect())
            .unwrap_or_default()
    }

    /// Cursor over an item of the collection under the cursor
    pub fn item(&mut self, index: impl Into<Index>) -> GraphResult<DynamicNode<'_>> {
        let index = index.into();
        let node = self.collection_node()?;
        if !self.container.indices(node)?.contains(&index) {
            return Err(GraphError::InvalidIndex { node, index });
        }
        Ok(DynamicNode {
            container: &mut *self.container,
            node,
            index,
        })
    }

    /// Replace the item at `index`, or insert it when the index is free
    pub fn set_item(&mut self, index: impl Into<Index>, value: impl Into<Value>) -> GraphResult<()> {
        let index = index.into();
        let node = self.collection_node()?;
        if self.container.indices(node)?.contains(&index) {
            self.container.update(node, value, index)
        } else {
            self.container.add(node, value, index)
        }
    }

    /// Indices of the collection under the cursor
    pub fn indices(&self) -> GraphResult<Vec<Index>> {
        self.container.indices(self.collection_node()?)
    }

    /// Append an item to the list under the cursor
    pub fn add(&mut self, item: impl Into<Value>) -> GraphResult<()> {
        let node = self.collection_node()?;
        self.container.add_item(node, item)
    }

    /// Insert an item at `index`
    pub fn insert(&mut self, item: impl Into<Value>, index: impl Into<Index>) -> GraphResult<()> {
        let node = self.collection_node()?;
        self.container.add(node, item, index.into())
    }

    /// Remove the item at `index`
    pub fn remove(&mut self, item: impl Into<Value>, index: impl Into<Index>) -> GraphResult<()> {
        let node = self.collection_node()?;
        self.container.remove(node, item, index.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{TypeRef, TypeRegistry};
    use crate::test_support::{container, fixture_struct, fixture_types, simple, simple_list};
    use crate::value::{ListRef, ObjectRef};

    fn setup(configure: impl FnOnce(&TypeRegistry, &ObjectRef)) -> (NodeContainer, NodeId, ObjectRef) {
        let types = fixture_types();
        let instance = types.new_object("ComplexClass").unwrap();
        configure(&types, &instance);
        let mut container = container();
        let root = container.get_or_create_node(&instance.clone().into()).unwrap().unwrap();
        (container, root, instance)
    }

    #[test]
    fn test_change_primitive_member() {
        let (mut container, root, instance) = setup(|_, i| {
            i.set("Member1", 3);
        });
        let mut node = DynamicNode::new(&mut container, root);
        assert_eq!(node.member("Member1").unwrap().retrieve().unwrap(), Value::Int(3));
        node.set_member("Member1", 4).unwrap();
        assert_eq!(instance.get("Member1"), Some(Value::Int(4)));

        let member1 = container.get_child(root, "Member1").unwrap();
        container.update(member1, 5, Index::Empty).unwrap();
        let mut node = DynamicNode::new(&mut container, root);
        assert_eq!(node.member("Member1").unwrap().retrieve().unwrap(), Value::Int(5));
    }

    #[test]
    fn test_change_reference_member() {
        let first = simple(0, Value::Null);
        let (mut container, root, instance) = setup(|_, i| {
            i.set("Member2", first.clone());
        });
        let mut node = DynamicNode::new(&mut container, root);
        assert_eq!(node.member("Member2").unwrap().retrieve().unwrap(), Value::from(first));

        let second = simple(7, Value::Null);
        node.set_member("Member2", second.clone()).unwrap();
        assert_eq!(instance.get("Member2"), Some(Value::from(second)));
        assert_eq!(
            node.member("Member2").unwrap().member("Member1").unwrap().retrieve().unwrap(),
            Value::Int(7)
        );

        node.set_member("Member2", Value::Null).unwrap();
        assert!(matches!(
            node.member("Member2").unwrap().member("Member1"),
            Err(GraphError::NoTarget(_))
        ));
    }

    #[test]
    fn test_change_boxed_primitive_member() {
        let (mut container, root, instance) = setup(|_, i| {
            i.set("Member3", 3);
        });
        let mut node = DynamicNode::new(&mut container, root);
        assert_eq!(node.member("Member3").unwrap().retrieve().unwrap(), Value::Int(3));
        node.set_member("Member3", 4).unwrap();
        assert_eq!(instance.get("Member3"), Some(Value::Int(4)));
        let member3 = container.get_child(root, "Member3").unwrap();
        let boxed = container.get_target(member3, &Index::Empty).unwrap();
        assert_eq!(container.retrieve(boxed, &Index::Empty).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_change_struct_member() {
        let (mut container, root, instance) = setup(|_, i| {
            i.set("Member4", fixture_struct("aa", Value::Null));
        });
        let mut node = DynamicNode::new(&mut container, root);
        let mut member4 = node.member("Member4").unwrap();
        assert_eq!(member4.member("Member1").unwrap().retrieve().unwrap(), Value::from("aa"));
        member4.set_member("Member1", "bb").unwrap();
        assert_eq!(
            instance.get("Member4").and_then(|s| s.member("Member1")),
            Some(Value::from("bb"))
        );

        node.set_member("Member4", fixture_struct("cc", Value::Null)).unwrap();
        assert_eq!(
            node.member("Member4").unwrap().member("Member1").unwrap().retrieve().unwrap(),
            Value::from("cc")
        );
        assert_eq!(node.member_names().len(), 7);
    }

    #[test]
    fn test_primitive_list_items() {
        let list = ListRef::from_items(TypeRef::String, ["aa"]);
        let (mut container, root, _) = setup(|_, i| {
            i.set("Member5", list.clone());
        });
        let mut node = DynamicNode::new(&mut container, root);
        let mut member5 = node.member("Member5").unwrap();
        assert_eq!(member5.item(0).unwrap().retrieve().unwrap(), Value::from("aa"));

        member5.set_item(0, "bb").unwrap();
        member5.set_item(1, "cc").unwrap();
        member5.add("dd").unwrap();
        member5.insert("zz", 0).unwrap();
        assert_eq!(
            list.items(),
            vec![Value::from("zz"), Value::from("bb"), Value::from("cc"), Value::from("dd")]
        );
        member5.remove("bb", 1).unwrap();
        assert_eq!(member5.indices().unwrap().len(), 3);
        assert!(matches!(member5.set_item(7, "x"), Err(GraphError::InvalidIndex { .. })));
        assert!(matches!(member5.item(9), Err(GraphError::InvalidIndex { .. })));
    }

    #[test]
    fn test_object_list_item_members() {
        let (mut container, root, _) = setup(|_, i| {
            i.set("Member6", simple_list([simple(1, Value::Null), simple(2, Value::Null)]));
        });
        let mut node = DynamicNode::new(&mut container, root);
        let mut member6 = node.member("Member6").unwrap();
        let mut item = member6.item(1).unwrap();
        assert_eq!(item.member("Member1").unwrap().retrieve().unwrap(), Value::Int(2));
        item.set_member("Member1", 20).unwrap();
        assert_eq!(item.member_names(), vec!["Member1".to_string(), "Member2".to_string()]);
        assert_eq!(
            member6.item(1).unwrap().member("Member1").unwrap().retrieve().unwrap(),
            Value::Int(20)
        );
    }

    #[test]
    fn test_struct_list_item_members() {
        let (mut container, root, instance) = setup(|_, i| {
            i.set(
                "Member7",
                ListRef::from_items(TypeRef::named("Struct"), [fixture_struct("aa", Value::Null)]),
            );
        });
        let mut node = DynamicNode::new(&mut container, root);
        node.member("Member7")
            .unwrap()
            .item(0)
            .unwrap()
            .set_member("Member1", "bb")
            .unwrap();
        let stored = instance
            .get("Member7")
            .and_then(|list| list.item(&Index::Int(0)))
            .and_then(|item| item.member("Member1"));
        assert_eq!(stored, Some(Value::from("bb")));
    }

    #[test]
    fn test_unknown_member() {
        let (mut container, root, _) = setup(|_, _| {});
        let mut node = DynamicNode::new(&mut container, root);
        assert!(matches!(node.member("Missing"), Err(GraphError::MemberNotFound { .. })));
    }
}
