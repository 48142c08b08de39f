//! Tree operations: create, insert, move, detach, remove, walk.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{NodeData, NodeId};
use crate::error::{Error, Result};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// The document tree, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
/// The tree always has a `body` root; nodes that are not reachable from it are
/// detached (created but not inserted, or removed with [`Dom::detach`]).
#[derive(Debug)]
pub struct Dom {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    body: NodeId,
}

impl Dom {
    /// Create a document holding an empty `body`.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(NodeData::element("body"));
        let mut children = SecondaryMap::new();
        children.insert(body, Vec::new());
        Self {
            nodes,
            children,
            parent: SecondaryMap::new(),
            body,
        }
    }

    /// The document root every connected node descends from.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    /// Create a node as the last child of `parent`.
    ///
    /// Fails with [`Error::MissingNode`] if `parent` does not exist; nothing
    /// is created in that case.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(Error::MissingNode);
        }
        let id = self.create(data);
        self.link(id, parent, None);
        Ok(id)
    }

    /// Move `node` (with its subtree) to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<()> {
        self.check_move(node, parent)?;
        self.detach(node);
        self.link(node, parent, None);
        Ok(())
    }

    /// Move `node` so it becomes the previous sibling of `reference`.
    pub fn insert_before(&mut self, node: NodeId, reference: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or(Error::MissingNode)?;
        self.check_move(node, parent)?;
        if node == reference {
            return Err(Error::HierarchyRequest);
        }
        self.detach(node);
        let idx = self.index_in_parent(reference).ok_or(Error::MissingNode)?;
        self.link(node, parent, Some(idx));
        Ok(())
    }

    /// Move `node` so it becomes the next sibling of `reference`.
    pub fn insert_after(&mut self, node: NodeId, reference: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or(Error::MissingNode)?;
        self.check_move(node, parent)?;
        if node == reference {
            return Err(Error::HierarchyRequest);
        }
        self.detach(node);
        let idx = self.index_in_parent(reference).ok_or(Error::MissingNode)?;
        self.link(node, parent, Some(idx + 1));
        Ok(())
    }

    /// Unlink `node` from its parent, keeping it (and its subtree) alive.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent_id) = self.parent.remove(node) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != node);
            }
        }
    }

    /// Remove a node and all its descendants from the arena.
    ///
    /// Returns the `NodeData` for the removed node, or `None` if it didn't exist.
    /// The body cannot be removed; use [`Dom::clear_children`] instead.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        if !self.nodes.contains_key(id) || id == self.body {
            return None;
        }

        self.detach(id);

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed_root_data = None;

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            let data = self.nodes.remove(current);
            if current == id {
                removed_root_data = data;
            }
        }

        removed_root_data
    }

    /// Discard every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let kids = self.children(node).to_vec();
        for child in kids {
            self.remove(child);
        }
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Element children of `node`'s parent (or `[node]` for a parentless node).
    pub fn element_siblings(&self, node: NodeId) -> Vec<NodeId> {
        match self.parent(node) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|&c| self.get(c).is_some_and(NodeData::is_element))
                .collect(),
            None => vec![node],
        }
    }

    /// Walk from `id` up to the top of its tree, collecting ancestor node ids.
    ///
    /// The returned vec does **not** include `id` itself; it starts with the
    /// immediate parent.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Whether `node` is `container` or lies inside its subtree.
    pub fn is_inclusive_descendant(&self, node: NodeId, container: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if id == container {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether `node` is reachable from the body.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_descendant(node, self.body)
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Mutable access to a node's data.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds nothing but the body.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether the arena contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start` (inclusive).
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Concatenated text of all text nodes under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.walk_depth_first(node)
            .into_iter()
            .filter_map(|id| self.get(id).and_then(|d| d.text.clone()))
            .collect()
    }

    fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    fn check_move(&self, node: NodeId, new_parent: NodeId) -> Result<()> {
        if !self.contains(node) || !self.contains(new_parent) {
            return Err(Error::MissingNode);
        }
        if node == self.body || self.is_inclusive_descendant(new_parent, node) {
            return Err(Error::HierarchyRequest);
        }
        Ok(())
    }

    fn link(&mut self, node: NodeId, parent: NodeId, at: Option<usize>) {
        self.parent.insert(node, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            match at {
                Some(idx) if idx <= siblings.len() => siblings.insert(idx, node),
                _ => siblings.push(node),
            }
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
