//! Root-listener bookkeeping and chain computation.
//!
//! [`EventDispatcher`] records the single root subscription per distinct event
//! name and holds events deferred while a render is swapping descendants. The
//! `bubble_path` static method computes the chain from an origin node up to the
//! document root.

use std::collections::{BTreeSet, VecDeque};

use super::object::Event;
use crate::dom::node::NodeId;
use crate::dom::tree::Dom;

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

/// Subscription set plus a queue of deferred events.
///
/// The dispatcher does not itself route events; `Runtime` resolves the
/// instance chain with `bubble_path` and invokes handlers.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    subscriptions: BTreeSet<String>,
    deferred: VecDeque<Event>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe the root listener to `event`.
    ///
    /// Returns `true` the first time a name is seen; later calls are no-ops.
    pub fn subscribe(&mut self, event: &str) -> bool {
        if self.subscriptions.contains(event) {
            return false;
        }
        self.subscriptions.insert(event.to_owned())
    }

    /// Whether the root listener receives `event`.
    pub fn is_subscribed(&self, event: &str) -> bool {
        self.subscriptions.contains(event)
    }

    /// Subscribed names in sorted order.
    pub fn subscriptions(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(String::as_str)
    }

    /// Queue an event for dispatch once the current render completes.
    pub fn defer(&mut self, event: Event) {
        self.deferred.push_back(event);
    }

    /// Take the oldest deferred event.
    pub fn next_deferred(&mut self) -> Option<Event> {
        self.deferred.pop_front()
    }

    /// Number of deferred events.
    pub fn pending_count(&self) -> usize {
        self.deferred.len()
    }

    /// Drop every subscription and deferred event.
    pub fn reset(&mut self) {
        self.subscriptions.clear();
        self.deferred.clear();
    }

    /// Compute the chain from `start` up to the root (inclusive).
    ///
    /// Returns `[start, parent, grandparent, ..., root]`.
    /// If `start` does not exist in the DOM, returns an empty vec.
    pub fn bubble_path(dom: &Dom, start: NodeId) -> Vec<NodeId> {
        if !dom.contains(start) {
            return Vec::new();
        }
        let mut path = vec![start];
        path.extend(dom.ancestors(start));
        path
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::NodeData;
    use crate::event::object::NativeEvent;

    /// Build a small test tree:
    /// ```text
    ///       body
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   d
    /// ```
    fn build_tree() -> (Dom, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.body();
        let a = dom.insert_child(root, NodeData::element("section")).unwrap();
        let b = dom.insert_child(root, NodeData::element("section")).unwrap();
        let c = dom.insert_child(a, NodeData::element("button")).unwrap();
        let d = dom.insert_child(a, NodeData::element("label")).unwrap();
        (dom, root, a, b, c, d)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    #[test]
    fn new_dispatcher_is_empty() {
        let disp = EventDispatcher::new();
        assert_eq!(disp.subscriptions().count(), 0);
        assert_eq!(disp.pending_count(), 0);
    }

    #[test]
    fn subscribe_once_per_name() {
        let mut disp = EventDispatcher::new();
        assert!(disp.subscribe("click"));
        assert!(!disp.subscribe("click"));
        assert!(disp.subscribe("input"));
        assert_eq!(disp.subscriptions().collect::<Vec<_>>(), vec!["click", "input"]);
        assert!(disp.is_subscribed("click"));
        assert!(!disp.is_subscribed("keyup"));
    }

    // ── Deferral ─────────────────────────────────────────────────────

    #[test]
    fn deferred_events_keep_order() {
        let (_, _, a, b, ..) = build_tree();
        let mut disp = EventDispatcher::new();
        disp.defer(Event::native(NativeEvent::new("first", a)));
        disp.defer(Event::native(NativeEvent::new("second", b)));
        assert_eq!(disp.pending_count(), 2);
        assert_eq!(disp.next_deferred().unwrap().event_type(), "first");
        assert_eq!(disp.next_deferred().unwrap().event_type(), "second");
        assert!(disp.next_deferred().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let (_, _, a, ..) = build_tree();
        let mut disp = EventDispatcher::new();
        disp.subscribe("click");
        disp.defer(Event::native(NativeEvent::new("click", a)));
        disp.reset();
        assert!(!disp.is_subscribed("click"));
        assert_eq!(disp.pending_count(), 0);
    }

    // ── Bubble path ──────────────────────────────────────────────────

    #[test]
    fn bubble_path_from_leaf() {
        let (dom, root, a, _, c, _) = build_tree();
        assert_eq!(EventDispatcher::bubble_path(&dom, c), vec![c, a, root]);
    }

    #[test]
    fn bubble_path_from_root() {
        let (dom, root, ..) = build_tree();
        assert_eq!(EventDispatcher::bubble_path(&dom, root), vec![root]);
    }

    #[test]
    fn bubble_path_sibling() {
        let (dom, root, _, b, ..) = build_tree();
        assert_eq!(EventDispatcher::bubble_path(&dom, b), vec![b, root]);
    }

    #[test]
    fn bubble_path_of_detached_subtree_stops_at_its_root() {
        let mut dom = Dom::new();
        let top = dom.create(NodeData::element("div"));
        let leaf = dom.insert_child(top, NodeData::element("span")).unwrap();
        assert_eq!(EventDispatcher::bubble_path(&dom, leaf), vec![leaf, top]);
    }

    #[test]
    fn bubble_path_nonexistent_node() {
        let (mut dom, _, _, _, c, _) = build_tree();
        dom.remove(c);
        assert!(EventDispatcher::bubble_path(&dom, c).is_empty());
    }
}
