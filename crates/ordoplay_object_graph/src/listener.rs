// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change events for a whole subgraph.
//!
//! [`GraphNodeChangeListener`] subscribes to every node reachable from a
//! root and re-raises their content notifications with the path from the
//! root. After a structural change the set of subscriptions is synchronized
//! with the graph before `Changed` handlers run, so nodes that are no longer
//! reachable stop reporting and newly reachable nodes start reporting.

use crate::container::NodeContainer;
use crate::content::{ChangePhase, ContentChangeArgs, ContentChangeType, ContentObserver};
use crate::index::Index;
use crate::node::{NodeId, SubscriptionId};
use crate::path::GraphNodePath;
use crate::value::Value;
use crate::visitor::{visit, walk_node, GraphVisitor, VisitContext};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Content change seen by a listener
#[derive(Debug, Clone, PartialEq)]
pub struct GraphContentChangeEventArgs {
    /// Node whose content changed
    pub node: NodeId,
    /// Kind of change
    pub change_type: ContentChangeType,
    /// Affected index
    pub index: Index,
    /// Value before the change
    pub old_value: Value,
    /// Value after the change
    pub new_value: Value,
    /// Path from the listener root to the node. A node reachable through
    /// several paths is reported under the first one in depth-first order.
    pub path: GraphNodePath,
}

impl GraphContentChangeEventArgs {
    fn new(args: &ContentChangeArgs, path: GraphNodePath) -> Self {
        Self {
            node: args.node,
            change_type: args.change_type,
            index: args.index.clone(),
            old_value: args.old_value.clone(),
            new_value: args.new_value.clone(),
            path,
        }
    }
}

/// Listener event handler
pub type ChangeHandler = Rc<dyn Fn(&mut NodeContainer, &GraphContentChangeEventArgs)>;

/// Filter deciding whether the listener follows a reference from the first
/// node to the second
pub type TargetFilter = Box<dyn Fn(&NodeContainer, NodeId, NodeId) -> bool>;

/// Handle returned when registering a listener handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

struct ListenerState {
    root: NodeId,
    filter: Option<TargetFilter>,
    registered: RefCell<IndexMap<NodeId, (SubscriptionId, GraphNodePath)>>,
    handlers: RefCell<Vec<(HandlerId, ChangePhase, ChangeHandler)>>,
}

impl ListenerState {
    fn observer(state: &Rc<Self>) -> ContentObserver {
        let weak: Weak<Self> = Rc::downgrade(state);
        Rc::new(move |container: &mut NodeContainer, phase: ChangePhase, args: &ContentChangeArgs| {
            if let Some(state) = weak.upgrade() {
                Self::dispatch(&state, container, phase, args);
            }
        })
    }

    fn dispatch(state: &Rc<Self>, container: &mut NodeContainer, phase: ChangePhase, args: &ContentChangeArgs) {
        let path = state.registered.borrow().get(&args.node).map(|(_, path)| path.clone());
        let Some(path) = path else {
            return;
        };
        if phase == ChangePhase::Changed && is_structural(container, args.node) {
            Self::resync(state, container);
        }
        let handlers: Vec<ChangeHandler> = state
            .handlers
            .borrow()
            .iter()
            .filter(|(_, handler_phase, _)| *handler_phase == phase)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect();
        if handlers.is_empty() {
            return;
        }
        let event = GraphContentChangeEventArgs::new(args, path);
        for handler in handlers {
            handler(container, &event);
        }
    }

    fn resync(state: &Rc<Self>, container: &mut NodeContainer) {
        let mut reachable = ReachableNodes {
            filter: state.filter.as_ref(),
            found: IndexMap::new(),
        };
        if container.contains(state.root) {
            visit(&mut reachable, container, state.root, None);
        }
        let found = reachable.found;

        let mut registered = state.registered.borrow_mut();
        let stale: Vec<NodeId> = registered
            .keys()
            .filter(|node| !found.contains_key(*node))
            .copied()
            .collect();
        for node in stale {
            if let Some((subscription, _)) = registered.shift_remove(&node) {
                container.unsubscribe(node, subscription);
            }
        }
        for (node, path) in found {
            if let Some(entry) = registered.get_mut(&node) {
                entry.1 = path;
                continue;
            }
            match container.subscribe(node, Self::observer(state)) {
                Ok(subscription) => {
                    registered.insert(node, (subscription, path));
                }
                Err(err) => tracing::warn!(node = %node, error = %err, "cannot listen to node"),
            }
        }
        tracing::trace!(root = %state.root, nodes = registered.len(), "listener subscriptions synchronized");
    }
}

fn is_structural(container: &NodeContainer, node: NodeId) -> bool {
    container
        .node(node)
        .is_some_and(|n| n.content().is_reference() || n.child_count() > 0)
}

struct ReachableNodes<'f> {
    filter: Option<&'f TargetFilter>,
    found: IndexMap<NodeId, GraphNodePath>,
}

impl GraphVisitor for ReachableNodes<'_> {
    fn visit_node(&mut self, cx: &mut VisitContext<'_>, node: NodeId, path: &GraphNodePath) {
        if self.found.contains_key(&node) {
            return;
        }
        self.found.insert(node, path.clone());
        walk_node(self, cx, node, path);
    }

    fn should_visit_target(&self, cx: &VisitContext<'_>, referencer: NodeId, target: NodeId) -> bool {
        self.filter
            .map_or(true, |filter| filter(cx.container(), referencer, target))
    }
}

/// Re-raises content notifications of every node reachable from a root
pub struct GraphNodeChangeListener {
    state: Rc<ListenerState>,
}

impl GraphNodeChangeListener {
    /// Listen to every node reachable from `root`
    pub fn new(container: &mut NodeContainer, root: NodeId) -> Self {
        Self::build(container, root, None)
    }

    /// Listen to the nodes reachable from `root` through references the
    /// filter accepts
    pub fn with_target_filter(
        container: &mut NodeContainer,
        root: NodeId,
        filter: impl Fn(&NodeContainer, NodeId, NodeId) -> bool + 'static,
    ) -> Self {
        Self::build(container, root, Some(Box::new(filter)))
    }

    fn build(container: &mut NodeContainer, root: NodeId, filter: Option<TargetFilter>) -> Self {
        let state = Rc::new(ListenerState {
            root,
            filter,
            registered: RefCell::new(IndexMap::new()),
            handlers: RefCell::new(Vec::new()),
        });
        ListenerState::resync(&state, container);
        tracing::debug!(root = %root, "graph change listener attached");
        Self { state }
    }

    /// Root node
    pub fn root(&self) -> NodeId {
        self.state.root
    }

    /// Register a handler for one phase
    pub fn subscribe(
        &self,
        phase: ChangePhase,
        handler: impl Fn(&mut NodeContainer, &GraphContentChangeEventArgs) + 'static,
    ) -> HandlerId {
        let id = HandlerId(Uuid::new_v4());
        self.state.handlers.borrow_mut().push((id, phase, Rc::new(handler)));
        id
    }

    /// Register a `PrepareChange` handler
    pub fn on_prepare_change(
        &self,
        handler: impl Fn(&mut NodeContainer, &GraphContentChangeEventArgs) + 'static,
    ) -> HandlerId {
        self.subscribe(ChangePhase::PrepareChange, handler)
    }

    /// Register a `Changing` handler
    pub fn on_changing(&self, handler: impl Fn(&mut NodeContainer, &GraphContentChangeEventArgs) + 'static) -> HandlerId {
        self.subscribe(ChangePhase::Changing, handler)
    }

    /// Register a `Changed` handler
    pub fn on_changed(&self, handler: impl Fn(&mut NodeContainer, &GraphContentChangeEventArgs) + 'static) -> HandlerId {
        self.subscribe(ChangePhase::Changed, handler)
    }

    /// Register a `FinalizeChange` handler
    pub fn on_finalize_change(
        &self,
        handler: impl Fn(&mut NodeContainer, &GraphContentChangeEventArgs) + 'static,
    ) -> HandlerId {
        self.subscribe(ChangePhase::FinalizeChange, handler)
    }

    /// Remove a handler. Returns false when it was not registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.state.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Whether the listener currently receives notifications from `node`
    pub fn is_listening(&self, node: NodeId) -> bool {
        self.state.registered.borrow().contains_key(&node)
    }

    /// Path the listener reports for `node`: the first depth-first path
    /// from the root when several paths reach it
    pub fn path_of(&self, node: NodeId) -> Option<GraphNodePath> {
        self.state.registered.borrow().get(&node).map(|(_, path)| path.clone())
    }

    /// Number of nodes listened to
    pub fn len(&self) -> usize {
        self.state.registered.borrow().len()
    }

    /// Whether no node is listened to
    pub fn is_empty(&self) -> bool {
        self.state.registered.borrow().is_empty()
    }

    /// Stop listening and drop every subscription
    pub fn detach(self, container: &mut NodeContainer) {
        let registered = std::mem::take(&mut *self.state.registered.borrow_mut());
        for (node, (subscription, _)) in registered {
            container.unsubscribe(node, subscription);
        }
        tracing::debug!(root = %self.state.root, "graph change listener detached");
    }
}
