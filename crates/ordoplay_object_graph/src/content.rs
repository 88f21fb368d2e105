// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node content: the value slot a node wraps, and its change notifications.

use crate::container::NodeContainer;
use crate::descriptor::TypeRef;
use crate::index::Index;
use crate::node::NodeId;
use crate::reference::Reference;
use crate::value::Value;
use std::rc::Rc;

/// Kind of content change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChangeType {
    /// A value was replaced
    ValueChange,
    /// An item was inserted into a collection
    CollectionAdd,
    /// An item was removed from a collection
    CollectionRemove,
}

/// Notification phase, in delivery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangePhase {
    /// Before anything is touched
    PrepareChange,
    /// Right before the write
    Changing,
    /// After the write and the reference refresh
    Changed,
    /// Last notification of the mutation
    FinalizeChange,
}

/// Arguments shared by the four notifications of one mutation
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChangeArgs {
    /// Node whose content changed
    pub node: NodeId,
    /// Kind of change
    pub change_type: ContentChangeType,
    /// Affected index, empty for whole-value updates
    pub index: Index,
    /// Value before the change, null for additions
    pub old_value: Value,
    /// Value after the change, null for removals
    pub new_value: Value,
}

/// Callback attached to a node's content
pub type ContentObserver = Rc<dyn Fn(&mut NodeContainer, ChangePhase, &ContentChangeArgs)>;

/// Where the item a boxed node was created for lives
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoxOwner {
    pub node: NodeId,
    pub index: Index,
}

/// Where the content reads and writes its value
#[derive(Debug, Clone)]
pub(crate) enum ContentStorage {
    /// Identity-bearing value owned by a root node; never replaced
    Object(Value),
    /// Struct or primitive held as a reference target, written back to its owner
    Boxed { value: Value, owner: Option<BoxOwner> },
    /// Member of the value of the owner node
    Member { owner: NodeId, name: String },
}

/// Value slot wrapped by a node
#[derive(Debug, Clone)]
pub struct Content {
    ty: TypeRef,
    is_primitive: bool,
    pub(crate) reference: Option<Reference>,
    pub(crate) storage: ContentStorage,
}

impl Content {
    pub(crate) fn new(ty: TypeRef, is_primitive: bool, storage: ContentStorage) -> Self {
        Self {
            ty,
            is_primitive,
            reference: None,
            storage,
        }
    }

    /// Declared type of the slot
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Whether the value is a leaf the graph never descends into
    pub fn is_primitive(&self) -> bool {
        self.is_primitive
    }

    /// Whether the content holds a reference
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// The reference, if any
    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    /// Whether the content is a member of another node's value
    pub fn is_member(&self) -> bool {
        matches!(self.storage, ContentStorage::Member { .. })
    }

    /// Whether the content is a boxed struct or primitive
    pub fn is_boxed(&self) -> bool {
        matches!(self.storage, ContentStorage::Boxed { .. })
    }

    pub(crate) fn box_owner(&self) -> Option<&BoxOwner> {
        match &self.storage {
            ContentStorage::Boxed { owner, .. } => owner.as_ref(),
            _ => None,
        }
    }
}
