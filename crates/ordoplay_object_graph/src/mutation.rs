// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content mutation and change notification.
//!
//! Every successful mutation notifies the observers of the mutated node
//! with `PrepareChange`, `Changing`, `Changed` and `FinalizeChange`, in
//! that order. References are refreshed between `Changing` and `Changed`.
//! Nodes for the new value are built before `PrepareChange`; a value that
//! cannot be built fails the mutation before any observer runs.

use crate::container::NodeContainer;
use crate::content::{BoxOwner, ChangePhase, ContentChangeArgs, ContentChangeType, ContentObserver, ContentStorage};
use crate::error::{GraphError, GraphResult};
use crate::index::Index;
use crate::node::NodeId;
use crate::reference::Reference;
use crate::value::Value;
use std::rc::Rc;

impl NodeContainer {
    /// Replace a node's value, or one item of its collection
    pub fn update(&mut self, node: NodeId, value: impl Into<Value>, index: Index) -> GraphResult<()> {
        let value = value.into();
        let current = self.value_of(node)?;
        let old_value = if index.is_empty() {
            let content = &self.node_ref(node)?.content;
            if matches!(content.storage, ContentStorage::Object(_)) {
                return Err(GraphError::ObjectContentIsImmutable(node));
            }
            if !content.ty().accepts(&value) {
                return Err(GraphError::type_mismatch(content.ty(), &value));
            }
            current
        } else {
            let old_value = self.item_at(node, &current, &index)?;
            check_item_type(&current, &value)?;
            old_value
        };

        let args = ContentChangeArgs {
            node,
            change_type: ContentChangeType::ValueChange,
            index,
            old_value,
            new_value: value,
        };
        self.apply_change(args, |this, args| {
            if args.index.is_empty() {
                this.write_value(args.node, args.new_value.clone())
            } else {
                let collection = this.value_of(args.node)?;
                store_item(args.node, &collection, &args.index, args.new_value.clone())
            }
        })
    }

    /// Insert an item into a node's collection.
    ///
    /// The empty index appends to a list. Dictionaries need a key that is
    /// not present yet.
    pub fn add(&mut self, node: NodeId, value: impl Into<Value>, index: Index) -> GraphResult<()> {
        let value = value.into();
        let collection = self.value_of(node)?;
        let index = match (&collection, index) {
            (Value::List(list), Index::Empty) => Index::Int(list.len()),
            (Value::List(list), Index::Int(position)) if position <= list.len() => Index::Int(position),
            (Value::Map(map), Index::Key(key)) if !map.contains_key(&key) => Index::Key(key),
            (Value::Map(_), Index::Key(key)) => {
                return Err(GraphError::DuplicateKey {
                    node,
                    index: Index::Key(key),
                })
            }
            (Value::Map(_), Index::Empty) => return Err(GraphError::IndexRequired(node)),
            (Value::List(_) | Value::Map(_), index) => return Err(GraphError::InvalidIndex { node, index }),
            (_, index) => return Err(GraphError::NotACollection { node, index }),
        };
        check_item_type(&collection, &value)?;

        let args = ContentChangeArgs {
            node,
            change_type: ContentChangeType::CollectionAdd,
            index,
            old_value: Value::Null,
            new_value: value,
        };
        self.apply_change(args, |this, args| {
            let collection = this.value_of(args.node)?;
            insert_item(args.node, &collection, &args.index, args.new_value.clone())
        })
    }

    /// Append an item to a node's list
    pub fn add_item(&mut self, node: NodeId, value: impl Into<Value>) -> GraphResult<()> {
        self.add(node, value, Index::Empty)
    }

    /// Remove the item at `index` from a node's collection.
    ///
    /// `item` is only compared with the stored item: on a mismatch a warning
    /// is logged and the stored item is removed anyway, and reported as the
    /// event's `old_value`.
    pub fn remove(&mut self, node: NodeId, item: impl Into<Value>, index: Index) -> GraphResult<()> {
        let item = item.into();
        let collection = self.value_of(node)?;
        let old_value = self.item_at(node, &collection, &index)?;
        if old_value != item {
            tracing::warn!(node = %node, index = %index, "removed item differs from the expected value");
        }

        let args = ContentChangeArgs {
            node,
            change_type: ContentChangeType::CollectionRemove,
            index,
            old_value,
            new_value: Value::Null,
        };
        self.apply_change(args, |this, args| {
            let collection = this.value_of(args.node)?;
            remove_item(args.node, &collection, &args.index)
        })
    }

    fn apply_change(
        &mut self,
        args: ContentChangeArgs,
        write: impl FnOnce(&mut Self, &ContentChangeArgs) -> GraphResult<()>,
    ) -> GraphResult<()> {
        self.scoped(|this| {
            this.prepare_targets(&args.new_value)?;
            tracing::debug!(
                node = %args.node,
                change = ?args.change_type,
                index = %args.index,
                "content change"
            );
            this.notify(ChangePhase::PrepareChange, &args);
            this.notify(ChangePhase::Changing, &args);
            write(this, &args)?;
            this.refresh_node(args.node)?;
            this.notify(ChangePhase::Changed, &args);
            this.notify(ChangePhase::FinalizeChange, &args);
            Ok(())
        })
    }

    fn notify(&mut self, phase: ChangePhase, args: &ContentChangeArgs) {
        let observers: Vec<ContentObserver> = match self.nodes.get(&args.node) {
            Some(node) => node.observers.iter().map(|(_, o)| Rc::clone(o)).collect(),
            None => return,
        };
        for observer in observers {
            observer(self, phase, args);
        }
    }

    /// Store a whole value. Members write into their owner; boxed values
    /// write back into the slot they were created for. No notification.
    pub(crate) fn write_value(&mut self, node: NodeId, value: Value) -> GraphResult<()> {
        match self.node_ref(node)?.content.storage.clone() {
            ContentStorage::Object(_) => Err(GraphError::ObjectContentIsImmutable(node)),
            ContentStorage::Boxed { owner, .. } => {
                if let ContentStorage::Boxed { value: slot, .. } = &mut self.node_mut(node)?.content.storage {
                    *slot = value.clone();
                }
                match owner {
                    Some(owner) => self.write_back(&owner, value),
                    None => Ok(()),
                }
            }
            ContentStorage::Member { owner, name } => match self.value_of(owner)? {
                Value::Object(object) => {
                    object.set(&name, value);
                    Ok(())
                }
                Value::Struct(mut parent) => {
                    parent.set(&name, value);
                    self.write_value(owner, Value::Struct(parent))
                }
                other => Err(GraphError::type_mismatch(&"object or struct", &other)),
            },
        }
    }

    fn write_back(&mut self, owner: &BoxOwner, value: Value) -> GraphResult<()> {
        if owner.index.is_empty() {
            self.write_value(owner.node, value.clone())?;
        } else {
            let collection = self.value_of(owner.node)?;
            store_item(owner.node, &collection, &owner.index, value.clone())?;
        }
        match self.node_mut(owner.node)?.content.reference.as_mut() {
            Some(Reference::Object(reference)) => reference.set_object_value(value),
            Some(Reference::Enumerable(reference)) => {
                if let Some(item) = reference.get_mut(&owner.index) {
                    item.set_object_value(value);
                }
            }
            None => {}
        }
        Ok(())
    }
}

fn check_item_type(collection: &Value, value: &Value) -> GraphResult<()> {
    let item_type = collection.runtime_type().and_then(|ty| ty.item_type().cloned());
    match item_type {
        Some(item_type) if !item_type.accepts(value) => Err(GraphError::type_mismatch(&item_type, value)),
        _ => Ok(()),
    }
}

fn store_item(node: NodeId, collection: &Value, index: &Index, value: Value) -> GraphResult<()> {
    let stored = match (collection, index) {
        (Value::List(list), Index::Int(position)) => list.set(*position, value).is_some(),
        (Value::Map(map), Index::Key(key)) if map.contains_key(key) => {
            map.insert(key.clone(), value);
            true
        }
        (Value::List(_) | Value::Map(_), _) => false,
        _ => return Err(GraphError::NotACollection { node, index: index.clone() }),
    };
    if stored {
        Ok(())
    } else {
        Err(GraphError::InvalidIndex { node, index: index.clone() })
    }
}

fn insert_item(node: NodeId, collection: &Value, index: &Index, value: Value) -> GraphResult<()> {
    let inserted = match (collection, index) {
        (Value::List(list), Index::Int(position)) => list.insert(*position, value),
        (Value::Map(map), Index::Key(key)) => map.insert(key.clone(), value).is_none(),
        (Value::List(_) | Value::Map(_), _) => false,
        _ => return Err(GraphError::NotACollection { node, index: index.clone() }),
    };
    if inserted {
        Ok(())
    } else {
        Err(GraphError::InvalidIndex { node, index: index.clone() })
    }
}

fn remove_item(node: NodeId, collection: &Value, index: &Index) -> GraphResult<()> {
    let removed = match (collection, index) {
        (Value::List(list), Index::Int(position)) => list.remove(*position).is_some(),
        (Value::Map(map), Index::Key(key)) => map.remove(key).is_some(),
        (Value::List(_) | Value::Map(_), _) => false,
        _ => return Err(GraphError::NotACollection { node, index: index.clone() }),
    };
    if removed {
        Ok(())
    } else {
        Err(GraphError::InvalidIndex { node, index: index.clone() })
    }
}
