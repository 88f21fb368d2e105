// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pairing the nodes of two structurally similar graphs.
//!
//! The linker walks the source graph and, for every source node, finds the
//! corresponding node in the target graph: members are matched by name and
//! reference targets by index. Each hook of [`NodeLinker`] can be overridden
//! to customize the matching, for instance to pair collection items by a key
//! member instead of by position.

use crate::container::NodeContainer;
use crate::index::Index;
use crate::node::NodeId;
use crate::path::GraphNodePath;
use crate::reference::ObjectReference;
use crate::visitor::{visit, walk_children, walk_node, walk_reference, GraphVisitor, VisitContext};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Source node to matching target node, `None` where the graphs diverge
pub type LinkMap = IndexMap<NodeId, Option<NodeId>>;

/// Matching hooks used by [`link_graph`]
pub trait NodeLinker {
    /// Target node for `source`. `candidate` is the node found by walking
    /// the same member and reference steps in the target graph.
    fn find_target(&mut self, _container: &NodeContainer, _source: NodeId, candidate: Option<NodeId>) -> Option<NodeId> {
        candidate
    }

    /// Reference of `target` matching `source_reference`, a reference held
    /// by the source counterpart of `target`
    fn find_target_reference(
        &mut self,
        container: &NodeContainer,
        target: NodeId,
        source_reference: &ObjectReference,
    ) -> Option<ObjectReference> {
        default_target_reference(container, target, source_reference)
    }

    /// Called once for every source node with its target
    fn link_nodes(&mut self, _container: &NodeContainer, _source: NodeId, _target: Option<NodeId>) {}
}

/// Reference of `target` at the same index as `source_reference`
pub fn default_target_reference(
    container: &NodeContainer,
    target: NodeId,
    source_reference: &ObjectReference,
) -> Option<ObjectReference> {
    container
        .content(target)?
        .reference()?
        .get(source_reference.index())
        .cloned()
}

/// [`NodeLinker`] with the default matching and an optional link action
#[derive(Default)]
pub struct GraphNodeLinker {
    link_action: Option<Box<dyn FnMut(NodeId, Option<NodeId>)>>,
}

impl GraphNodeLinker {
    /// Create a linker with the default matching
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a linker calling `action` for every linked pair
    pub fn with_link_action(action: impl FnMut(NodeId, Option<NodeId>) + 'static) -> Self {
        Self {
            link_action: Some(Box::new(action)),
        }
    }

    /// Link the graph rooted at `source` to the graph rooted at `target`
    pub fn link_graph(&mut self, container: &NodeContainer, source: NodeId, target: NodeId) -> LinkMap {
        link_graph(self, container, source, target)
    }
}

impl NodeLinker for GraphNodeLinker {
    fn link_nodes(&mut self, _container: &NodeContainer, source: NodeId, target: Option<NodeId>) {
        if let Some(action) = self.link_action.as_mut() {
            action(source, target);
        }
    }
}

/// Link the graph rooted at `source` to the graph rooted at `target`.
///
/// Every reachable source node is linked exactly once. Recursion stops
/// below a source node without a target, and below a pair whose runtime
/// types differ.
pub fn link_graph<L: NodeLinker + ?Sized>(
    linker: &mut L,
    container: &NodeContainer,
    source: NodeId,
    target: NodeId,
) -> LinkMap {
    let mut visitor = LinkVisitor {
        linker,
        links: LinkMap::new(),
        candidates: HashMap::from([(source, Some(target))]),
        processed: HashSet::new(),
    };
    visit(&mut visitor, container, source, None);
    tracing::debug!(source = %source, target = %target, links = visitor.links.len(), "linked graphs");
    visitor.links
}

struct LinkVisitor<'l, L: NodeLinker + ?Sized> {
    linker: &'l mut L,
    links: LinkMap,
    candidates: HashMap<NodeId, Option<NodeId>>,
    processed: HashSet<NodeId>,
}

impl<L: NodeLinker + ?Sized> LinkVisitor<'_, L> {
    fn target_of(&self, source: NodeId) -> Option<NodeId> {
        self.links.get(&source).copied().flatten()
    }
}

fn same_shape(container: &NodeContainer, source: NodeId, target: NodeId) -> bool {
    let (Some(source_content), Some(target_content)) = (container.content(source), container.content(target)) else {
        return false;
    };
    if source_content.ty() != target_content.ty() {
        return false;
    }
    let source_type = container.retrieve(source, &Index::Empty).ok().and_then(|v| v.runtime_type());
    let target_type = container.retrieve(target, &Index::Empty).ok().and_then(|v| v.runtime_type());
    match (source_type, target_type) {
        (Some(source_type), Some(target_type)) => source_type == target_type,
        _ => true,
    }
}

impl<L: NodeLinker + ?Sized> GraphVisitor for LinkVisitor<'_, L> {
    fn visit_node(&mut self, cx: &mut VisitContext<'_>, node: NodeId, path: &GraphNodePath) {
        if !self.processed.insert(node) {
            return;
        }
        let container = cx.container();
        let candidate = self.candidates.remove(&node).flatten();
        let target = self.linker.find_target(container, node, candidate);
        self.links.insert(node, target);
        self.linker.link_nodes(container, node, target);

        match target {
            Some(target) if same_shape(container, node, target) => walk_node(self, cx, node, path),
            Some(target) => {
                tracing::debug!(source = %node, target = %target, "type mismatch, not linking below");
            }
            None => {}
        }
    }

    fn visit_children(&mut self, cx: &mut VisitContext<'_>, node: NodeId, path: &GraphNodePath) {
        let container = cx.container();
        let target = self.target_of(node);
        for child in container.children(node) {
            let name = container.node(child).map(|n| n.name().to_string()).unwrap_or_default();
            let candidate = target.and_then(|t| container.get_child(t, &name));
            self.candidates.entry(child).or_insert(candidate);
        }
        walk_children(self, cx, node, path);
    }

    fn visit_reference(
        &mut self,
        cx: &mut VisitContext<'_>,
        referencer: NodeId,
        reference: &ObjectReference,
        path: &GraphNodePath,
    ) {
        if let Some(source_target) = reference.target_node() {
            if !self.processed.contains(&source_target) {
                let container = cx.container();
                let candidate = self
                    .target_of(referencer)
                    .and_then(|t| self.linker.find_target_reference(container, t, reference))
                    .and_then(|r| r.target_node());
                self.candidates.insert(source_target, candidate);
            }
        }
        walk_reference(self, cx, referencer, reference, path);
    }
}
