// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node construction and reference resolution.
//!
//! Root nodes are registered before anything below them is built, so a
//! value that (directly or indirectly) references itself resolves to the
//! node already under construction.

use crate::container::NodeContainer;
use crate::content::{BoxOwner, Content, ContentStorage};
use crate::descriptor::{ObjectDescriptor, TypeRef};
use crate::error::GraphResult;
use crate::index::Index;
use crate::node::{GraphNode, NodeId};
use crate::reference::{ObjectReference, Reference, ReferenceEnumerable};
use crate::value::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceKind {
    Object,
    Enumerable,
}

impl NodeContainer {
    /// Root node for `value`, created on first request.
    ///
    /// Objects, lists and maps get one node per identity. Structs and
    /// primitives get a fresh node on every call. Null yields `None`.
    pub fn get_or_create_node(&mut self, value: &Value) -> GraphResult<Option<NodeId>> {
        self.scoped(|this| this.resolve_target(value, None, true))
    }

    /// Run a build step. Identities registered during the outermost step are
    /// dropped afterwards when the container does not track identities.
    pub(crate) fn scoped<T>(&mut self, build: impl FnOnce(&mut Self) -> GraphResult<T>) -> GraphResult<T> {
        self.build_depth += 1;
        let result = build(self);
        self.build_depth -= 1;
        if self.build_depth == 0 && !self.settings().track_identity {
            self.identities.clear();
        }
        result
    }

    fn resolve_target(
        &mut self,
        value: &Value,
        owner: Option<BoxOwner>,
        box_primitives: bool,
    ) -> GraphResult<Option<NodeId>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(_) | Value::List(_) | Value::Map(_) => {
                let known = value
                    .identity()
                    .and_then(|identity| self.identities.get(&identity).copied());
                match known {
                    Some(id) => Ok(Some(id)),
                    None => self.create_root(value, None).map(Some),
                }
            }
            Value::Struct(_) => self.create_root(value, owner).map(Some),
            _ if box_primitives => self.create_root(value, owner).map(Some),
            _ => Ok(None),
        }
    }

    /// Build the identity roots `value` will be wired to, and check that
    /// every struct it carries is described. Runs before a mutation touches
    /// anything, so construction errors leave the content as it was.
    pub(crate) fn prepare_targets(&mut self, value: &Value) -> GraphResult<()> {
        match value {
            Value::Object(_) | Value::List(_) | Value::Map(_) => {
                self.resolve_target(value, None, true)?;
                Ok(())
            }
            Value::Struct(data) => {
                if self.is_primitive_type(&TypeRef::named(data.type_name())) {
                    return Ok(());
                }
                let descriptor = self.describe(data.type_name())?;
                for member in &descriptor.members {
                    if let Some(member_value) = data.get(&member.name) {
                        self.prepare_targets(member_value)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn create_root(&mut self, value: &Value, owner: Option<BoxOwner>) -> GraphResult<NodeId> {
        let ty = value.runtime_type().unwrap_or(TypeRef::Any);
        let is_primitive = self.is_primitive_type(&ty);
        let descriptor = match (&ty, is_primitive) {
            (TypeRef::Named(name), false) => Some(self.describe(name)?),
            _ => None,
        };
        let identity = value.identity();
        let storage = match identity {
            Some(_) => ContentStorage::Object(value.clone()),
            None => ContentStorage::Boxed {
                value: value.clone(),
                owner,
            },
        };

        let id = NodeId::new();
        let name = ty.to_string();
        self.nodes
            .insert(id, GraphNode::new(id, name, Content::new(ty, is_primitive, storage), None));
        if let Some(identity) = identity {
            self.identities.insert(identity, id);
        }
        tracing::trace!(node = %id, value = %value, "created root node");

        let built = match &descriptor {
            Some(descriptor) => self.build_members(id, descriptor),
            None => Ok(()),
        }
        .and_then(|()| self.refresh_node(id));
        if let Err(err) = built {
            tracing::warn!(node = %id, error = %err, "discarding partially built node");
            self.discard_tree(id);
            return Err(err);
        }
        Ok(id)
    }

    fn build_members(&mut self, owner: NodeId, descriptor: &ObjectDescriptor) -> GraphResult<()> {
        for member in &descriptor.members {
            let id = NodeId::new();
            let is_primitive = self.is_primitive_type(&member.ty);
            let storage = ContentStorage::Member {
                owner,
                name: member.name.clone(),
            };
            let content = Content::new(member.ty.clone(), is_primitive, storage);
            self.nodes
                .insert(id, GraphNode::new(id, member.name.as_str(), content, Some(owner)));
            self.node_mut(owner)?.children.insert(member.name.clone(), id);

            if !is_primitive {
                if let Some(struct_descriptor) = self.struct_descriptor(&member.ty) {
                    self.build_members(id, &struct_descriptor)?;
                }
            }
        }
        Ok(())
    }

    /// Refresh the reference of `id`, then those of its member children
    pub(crate) fn refresh_node(&mut self, id: NodeId) -> GraphResult<()> {
        self.refresh_reference(id)?;
        let children: Vec<NodeId> = self.node_ref(id)?.children.values().copied().collect();
        for child in children {
            self.refresh_node(child)?;
        }
        Ok(())
    }

    fn reference_kind(&self, content: &Content, value: &Value) -> Option<ReferenceKind> {
        if content.is_primitive() {
            return None;
        }
        match content.storage {
            ContentStorage::Member { .. } => {
                if self.struct_descriptor(content.ty()).is_some() {
                    None
                } else if value.is_collection() {
                    Some(ReferenceKind::Enumerable)
                } else {
                    Some(ReferenceKind::Object)
                }
            }
            _ => value.is_collection().then_some(ReferenceKind::Enumerable),
        }
    }

    fn refresh_reference(&mut self, id: NodeId) -> GraphResult<()> {
        let value = self.value_of(id)?;
        let content = &self.node_ref(id)?.content;
        let kind = self.reference_kind(content, &value);
        let previous = content.reference.clone();

        let reference = match kind {
            None => None,
            Some(ReferenceKind::Object) => {
                Some(Reference::Object(self.resolve_object_reference(id, previous.as_ref(), value)?))
            }
            Some(ReferenceKind::Enumerable) => {
                Some(Reference::Enumerable(self.resolve_enumerable(id, previous.as_ref(), value)?))
            }
        };

        if let Some(previous) = &previous {
            let retained: HashSet<NodeId> = reference
                .as_ref()
                .map(|r| r.target_nodes().into_iter().collect())
                .unwrap_or_default();
            for target in previous.target_nodes() {
                if !retained.contains(&target) {
                    self.discard_boxed(target, id);
                }
            }
        }
        self.node_mut(id)?.content.reference = reference;
        Ok(())
    }

    fn is_reusable(&self, reference: &ObjectReference, index: &Index, value: &Value) -> bool {
        reference.index() == index
            && reference.object_value() == value
            && reference.target_node().map_or(true, |t| self.nodes.contains_key(&t))
    }

    fn resolve_object_reference(
        &mut self,
        id: NodeId,
        previous: Option<&Reference>,
        value: Value,
    ) -> GraphResult<ObjectReference> {
        if let Some(Reference::Object(reference)) = previous {
            if self.is_reusable(reference, &Index::Empty, &value) {
                return Ok(reference.clone());
            }
        }
        let owner = BoxOwner {
            node: id,
            index: Index::Empty,
        };
        let target = self.resolve_target(&value, Some(owner), true)?;
        Ok(ObjectReference::new(target, Index::Empty, value))
    }

    fn resolve_enumerable(
        &mut self,
        id: NodeId,
        previous: Option<&Reference>,
        collection: Value,
    ) -> GraphResult<ReferenceEnumerable> {
        let previous_items = match previous {
            Some(Reference::Enumerable(reference)) if *reference.collection() == collection => {
                reference.clone().into_items()
            }
            _ => Vec::new(),
        };

        let mut items = Vec::new();
        for (index, item) in collection.items() {
            let reused = previous_items
                .iter()
                .find(|r| self.is_reusable(r, &index, &item))
                .cloned();
            let reference = match reused {
                Some(reference) => reference,
                None => {
                    let owner = BoxOwner {
                        node: id,
                        index: index.clone(),
                    };
                    let target = self.resolve_target(&item, Some(owner), false)?;
                    ObjectReference::new(target, index, item)
                }
            };
            items.push(reference);
        }
        Ok(ReferenceEnumerable::new(collection, items))
    }

    /// Drop `target` if it is a boxed node owned by `referencer`
    fn discard_boxed(&mut self, target: NodeId, referencer: NodeId) {
        let owned = self
            .nodes
            .get(&target)
            .and_then(|node| node.content.box_owner())
            .is_some_and(|owner| owner.node == referencer);
        if owned {
            self.discard_tree(target);
        }
    }

    /// Remove a node, its member children and the boxed nodes they own
    pub(crate) fn discard_tree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.shift_remove(&id) else {
            return;
        };
        if let ContentStorage::Object(value) = &node.content.storage {
            if let Some(identity) = value.identity() {
                if self.identities.get(&identity) == Some(&id) {
                    self.identities.remove(&identity);
                }
            }
        }
        if let Some(reference) = &node.content.reference {
            for target in reference.target_nodes() {
                self.discard_boxed(target, id);
            }
        }
        for child in node.children.values() {
            self.discard_tree(*child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeRegistry;
    use crate::error::GraphError;
    use crate::test_support::{complex, container, fixture_struct, fixture_types, simple, simple_list};
    use crate::value::{ListRef, MapRef, ObjectRef};

    fn object_target(container: &NodeContainer, node: NodeId) -> Option<NodeId> {
        container.get_target(node, &Index::Empty)
    }

    #[test]
    fn test_member_nodes_follow_declaration_order() {
        let mut container = container();
        let root = container
            .get_or_create_node(&simple(1, Value::Null).into())
            .unwrap()
            .unwrap();
        let node = container.node(root).unwrap();
        let names: Vec<&str> = node.children().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Member1", "Member2"]);
        assert!(node.is_root());
        assert!(!node.content().is_reference());

        let member1 = node.child("Member1").unwrap();
        assert!(container.content(member1).unwrap().is_primitive());
        assert_eq!(container.node(member1).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_null_object_member_has_reference_without_target() {
        let mut container = container();
        let root = container
            .get_or_create_node(&simple(1, Value::Null).into())
            .unwrap()
            .unwrap();
        let member2 = container.get_child(root, "Member2").unwrap();
        let reference = container.content(member2).unwrap().reference().unwrap();
        let reference = reference.as_object().unwrap();
        assert_eq!(reference.target_node(), None);
        assert!(reference.object_value().is_null());
    }

    #[test]
    fn test_shared_object_gets_one_node() {
        let mut container = container();
        let shared = simple(5, Value::Null);
        let instance = ObjectRef::new("SimpleClass2")
            .with("Member1", 0)
            .with("Member2", shared.clone())
            .with("Member3", shared.clone());
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();

        let member2 = container.get_child(root, "Member2").unwrap();
        let member3 = container.get_child(root, "Member3").unwrap();
        let target = object_target(&container, member2).unwrap();
        assert_eq!(object_target(&container, member3), Some(target));
        assert_eq!(container.get_node(&shared.into()).unwrap(), Some(target));
    }

    #[test]
    fn test_build_order_does_not_change_graph() {
        let build = |target_first: bool| {
            let mut container = container();
            let target = simple(1, Value::Null);
            let owner = simple(2, target.clone());
            let (target_node, owner_node) = if target_first {
                let t = container.get_or_create_node(&target.clone().into()).unwrap().unwrap();
                let o = container.get_or_create_node(&owner.clone().into()).unwrap().unwrap();
                (t, o)
            } else {
                let o = container.get_or_create_node(&owner.clone().into()).unwrap().unwrap();
                let t = container.get_or_create_node(&target.clone().into()).unwrap().unwrap();
                (t, o)
            };
            let member2 = container.get_child(owner_node, "Member2").unwrap();
            assert!(container.content(member2).unwrap().is_reference());
            assert_eq!(object_target(&container, member2), Some(target_node));
            assert_eq!(container.get_node(&target.into()).unwrap(), Some(target_node));
            container.len()
        };
        assert_eq!(build(true), build(false));
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut container = container();
        let instance = simple(1, Value::Null);
        instance.set("Member2", instance.clone());
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();
        let member2 = container.get_child(root, "Member2").unwrap();
        assert_eq!(object_target(&container, member2), Some(root));
        assert_eq!(container.len(), 3);
    }

    #[test]
    fn test_struct_member_children_are_eager() {
        let mut container = container();
        let instance = ObjectRef::new("StructClass")
            .with("Member1", 1)
            .with("Member2", fixture_struct("a", simple(2, Value::Null)));
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();

        let member2 = container.get_child(root, "Member2").unwrap();
        assert!(!container.content(member2).unwrap().is_reference());
        let inner1 = container.get_child(member2, "Member1").unwrap();
        assert_eq!(container.retrieve(inner1, &Index::Empty).unwrap(), Value::from("a"));
        let inner2 = container.get_child(member2, "Member2").unwrap();
        let target = object_target(&container, inner2).unwrap();
        let target_member1 = container.get_child(target, "Member1").unwrap();
        assert_eq!(container.retrieve(target_member1, &Index::Empty).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_primitive_list_items_have_no_targets() {
        let mut container = container();
        let instance = ObjectRef::new("PrimitiveListClass")
            .with("Member1", 0)
            .with("Member2", ListRef::from_items(TypeRef::String, ["a", "b"]));
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();
        let member2 = container.get_child(root, "Member2").unwrap();
        let reference = container.content(member2).unwrap().reference().unwrap();
        let enumerable = reference.as_enumerable().unwrap();
        assert_eq!(enumerable.len(), 2);
        assert!(enumerable.iter().all(|r| r.target_node().is_none()));
        assert_eq!(enumerable.get(&Index::Int(1)).unwrap().object_value(), &Value::from("b"));
    }

    #[test]
    fn test_object_list_items_reference_roots() {
        let mut container = container();
        let first = simple(1, Value::Null);
        let instance = ObjectRef::new("ObjectListClass")
            .with("Member1", 0)
            .with("Member2", simple_list([first.clone(), simple(2, Value::Null)]));
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();
        let member2 = container.get_child(root, "Member2").unwrap();
        let target = container.get_target(member2, &Index::Int(0)).unwrap();
        assert_eq!(container.get_node(&first.into()).unwrap(), Some(target));
        assert!(container.get_target(member2, &Index::Int(1)).is_some());
        assert!(container.get_target(member2, &Index::Int(2)).is_none());
    }

    #[test]
    fn test_struct_list_items_are_boxed() {
        let mut container = container();
        let instance = ObjectRef::new("StructListClass").with("Member1", 0).with(
            "Member2",
            ListRef::from_items(TypeRef::named("Struct"), [fixture_struct("a", Value::Null)]),
        );
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();
        let member2 = container.get_child(root, "Member2").unwrap();
        let boxed = container.get_target(member2, &Index::Int(0)).unwrap();
        let content = container.content(boxed).unwrap();
        assert!(content.is_boxed());
        assert_eq!(container.node(boxed).unwrap().child_count(), 2);
    }

    #[test]
    fn test_primitive_in_any_slot_is_boxed_leaf() {
        let mut container = container();
        let types = fixture_types();
        let instance = types.new_object("ComplexClass").unwrap();
        instance.set("Member3", 42);
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();
        let member3 = container.get_child(root, "Member3").unwrap();
        let boxed = object_target(&container, member3).unwrap();
        assert!(container.content(boxed).unwrap().is_primitive());
        assert_eq!(container.retrieve(boxed, &Index::Empty).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_list_of_lists_gets_root_nodes() {
        let mut container = container();
        let inner = ListRef::from_items(TypeRef::Int, [1, 2]);
        let outer = ListRef::from_items(TypeRef::list(TypeRef::Int), [inner.clone()]);
        let root = container.get_or_create_node(&outer.into()).unwrap().unwrap();
        let inner_node = container.get_target(root, &Index::Int(0)).unwrap();
        assert_eq!(container.get_node(&inner.into()).unwrap(), Some(inner_node));
        let reference = container.content(inner_node).unwrap().reference().unwrap();
        assert_eq!(reference.as_enumerable().unwrap().len(), 2);
    }

    #[test]
    fn test_dictionary_entries_reference_roots() {
        let mut container = container();
        let value = simple(1, Value::Null);
        let map = MapRef::new(TypeRef::String, TypeRef::named("SimpleClass")).with("a", value.clone());
        let instance = ObjectRef::new("DictionaryClass").with("Member1", map);
        let root = container.get_or_create_node(&instance.into()).unwrap().unwrap();
        let member1 = container.get_child(root, "Member1").unwrap();
        let target = container.get_target(member1, &Index::key("a")).unwrap();
        assert_eq!(container.get_node(&value.into()).unwrap(), Some(target));
        assert_eq!(container.indices(member1).unwrap(), vec![Index::key("a")]);
    }

    #[test]
    fn test_registered_primitive_type_is_leaf() {
        let mut container = container();
        container.register_primitive_type("SimpleClass");
        let root = container
            .get_or_create_node(&simple(1, Value::Null).into())
            .unwrap()
            .unwrap();
        assert_eq!(container.node(root).unwrap().child_count(), 0);
        assert!(container.content(root).unwrap().is_primitive());
    }

    #[test]
    fn test_unknown_type_is_fatal_and_leaves_nothing_behind() {
        let mut container = NodeContainer::new(TypeRegistry::new());
        let value = Value::from(simple(1, Value::Null));
        assert!(matches!(
            container.get_or_create_node(&value),
            Err(GraphError::UnknownType(name)) if name == "SimpleClass"
        ));
        assert!(container.is_empty());
        assert_eq!(container.get_node(&value).unwrap(), None);
    }

    #[test]
    fn test_complex_graph_builds() {
        let types = fixture_types();
        let mut container = container();
        let root = container
            .get_or_create_node(&complex(&types).into())
            .unwrap()
            .unwrap();
        assert_eq!(container.node(root).unwrap().child_count(), 7);
        let member7 = container.get_child(root, "Member7").unwrap();
        let second = container.get_target(member7, &Index::Int(1)).unwrap();
        let struct_member2 = container.get_child(second, "Member2").unwrap();
        assert!(object_target(&container, struct_member2).is_some());
    }
}
