// SPDX-License-Identifier: MIT OR Apache-2.0
//! Depth-first traversal of the node graph.
//!
//! Implement [`GraphVisitor`] and override the hooks you need. Each default
//! hook calls the matching `walk_*` function, so an override can run its own
//! logic and still continue the traversal.
//!
//! A reference target that is already on the current traversal stack is not
//! entered again. A node reachable through two distinct paths is visited
//! once per path.

use crate::container::NodeContainer;
use crate::node::NodeId;
use crate::path::GraphNodePath;
use crate::reference::{ObjectReference, Reference};

/// State of one traversal
pub struct VisitContext<'a> {
    container: &'a NodeContainer,
    stack: Vec<NodeId>,
}

impl<'a> VisitContext<'a> {
    /// Container being traversed
    pub fn container(&self) -> &'a NodeContainer {
        self.container
    }

    /// Whether `node` is on the current traversal stack
    pub fn is_on_stack(&self, node: NodeId) -> bool {
        self.stack.contains(&node)
    }

    /// Current traversal depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Hooks invoked during a traversal
pub trait GraphVisitor {
    /// Visit a node, then its children and reference targets
    fn visit_node(&mut self, cx: &mut VisitContext<'_>, node: NodeId, path: &GraphNodePath) {
        walk_node(self, cx, node, path);
    }

    /// Visit the member children of a node
    fn visit_children(&mut self, cx: &mut VisitContext<'_>, node: NodeId, path: &GraphNodePath) {
        walk_children(self, cx, node, path);
    }

    /// Visit one object reference (or one enumerable item) of `referencer`
    fn visit_reference(
        &mut self,
        cx: &mut VisitContext<'_>,
        referencer: NodeId,
        reference: &ObjectReference,
        path: &GraphNodePath,
    ) {
        walk_reference(self, cx, referencer, reference, path);
    }

    /// Whether the traversal should enter `target` from `referencer`
    fn should_visit_target(&self, _cx: &VisitContext<'_>, _referencer: NodeId, _target: NodeId) -> bool {
        true
    }
}

/// Traverse from `root`.
///
/// `initial_path` is reported as the path of `root`; it defaults to the
/// empty path rooted at `root`.
pub fn visit<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    container: &NodeContainer,
    root: NodeId,
    initial_path: Option<GraphNodePath>,
) {
    let path = initial_path.unwrap_or_else(|| GraphNodePath::new(root));
    let mut cx = VisitContext {
        container,
        stack: Vec::new(),
    };
    visitor.visit_node(&mut cx, root, &path);
}

/// Default body of [`GraphVisitor::visit_node`]
pub fn walk_node<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'_>,
    node: NodeId,
    path: &GraphNodePath,
) {
    let container = cx.container;
    let Some(graph_node) = container.node(node) else {
        tracing::warn!(node = %node, "visited node is not in the container");
        return;
    };
    cx.stack.push(node);
    visitor.visit_children(cx, node, path);
    match graph_node.content().reference() {
        Some(Reference::Object(reference)) => {
            visitor.visit_reference(cx, node, reference, &path.push_target());
        }
        Some(Reference::Enumerable(reference)) => {
            for item in reference.iter() {
                visitor.visit_reference(cx, node, item, &path.push_index(item.index().clone()));
            }
        }
        None => {}
    }
    cx.stack.pop();
}

/// Default body of [`GraphVisitor::visit_children`]
pub fn walk_children<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'_>,
    node: NodeId,
    path: &GraphNodePath,
) {
    let container = cx.container;
    let Some(graph_node) = container.node(node) else {
        return;
    };
    for (name, child) in graph_node.children() {
        visitor.visit_node(cx, child, &path.push_member(name));
    }
}

/// Default body of [`GraphVisitor::visit_reference`]
pub fn walk_reference<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    cx: &mut VisitContext<'_>,
    referencer: NodeId,
    reference: &ObjectReference,
    path: &GraphNodePath,
) {
    let Some(target) = reference.target_node() else {
        return;
    };
    if cx.is_on_stack(target) || !visitor.should_visit_target(cx, referencer, target) {
        return;
    }
    visitor.visit_node(cx, target, path);
}

/// Visitor calling a closure for every visited node
pub struct NodeCallback<F>(pub F);

impl<F: FnMut(&NodeContainer, NodeId, &GraphNodePath)> GraphVisitor for NodeCallback<F> {
    fn visit_node(&mut self, cx: &mut VisitContext<'_>, node: NodeId, path: &GraphNodePath) {
        (self.0)(cx.container(), node, path);
        walk_node(self, cx, node, path);
    }
}

/// Every node reachable from `root` with the path it was visited by, in
/// traversal order
pub fn collect_nodes(container: &NodeContainer, root: NodeId) -> Vec<(NodeId, GraphNodePath)> {
    let mut visited = Vec::new();
    let mut callback = NodeCallback(|_: &NodeContainer, node: NodeId, path: &GraphNodePath| {
        visited.push((node, path.clone()));
    });
    visit(&mut callback, container, root, None);
    visited
}
