//! DOM queries: by id, by selector, scoped to a subtree.

use super::node::{NodeData, NodeId};
use super::tree::Dom;
use crate::selector::{matches_list, SelectorList};

impl Dom {
    /// Find the first connected element whose `id` attribute matches.
    pub fn query_by_id(&self, id: &str) -> Option<NodeId> {
        self.walk_depth_first(self.body())
            .into_iter()
            .find(|&node| self.get(node).and_then(NodeData::id) == Some(id))
    }

    /// All descendants of `scope` (excluding `scope`) matching `selector`,
    /// in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.walk_depth_first(scope)
            .into_iter()
            .skip(1)
            .filter(|&node| matches_list(selector, node, self))
            .collect()
    }

    /// First descendant of `scope` matching `selector`.
    pub fn query_selector(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.walk_depth_first(scope)
            .into_iter()
            .skip(1)
            .find(|&node| matches_list(selector, node, self))
    }

    /// The innermost node on the path from `start` up to `boundary` (exclusive)
    /// matching `selector`.
    ///
    /// Returns `None` when `start` is not inside `boundary`'s subtree.
    pub fn closest_within(
        &self,
        start: NodeId,
        boundary: NodeId,
        selector: &SelectorList,
    ) -> Option<NodeId> {
        if start == boundary || !self.is_inclusive_descendant(start, boundary) {
            return None;
        }
        std::iter::once(start)
            .chain(self.ancestors(start))
            .take_while(|&node| node != boundary)
            .find(|&node| matches_list(selector, node, self))
    }

    /// Find all nodes matching an arbitrary predicate, anywhere in the arena.
    pub fn query_all(&self, predicate: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, data)| predicate(data))
            .map(|(node_id, _)| node_id)
            .collect()
    }
}
