//! Declarative parsing: instantiate components for marked elements.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::Runtime;
use crate::component::ComponentId;
use crate::dom::node::NodeId;
use crate::error::Result;

impl Runtime {
    /// Walk `root` (default: the body) depth-first and construct an instance
    /// for every marked element that has none yet.
    ///
    /// Returns the newly created instances that are not nested inside
    /// another instance created by this call, in document order. With
    /// `ignore_root`, `root` itself is never instantiated. Unknown names are
    /// skipped with a warning; a failing constructor aborts the walk.
    pub fn parse(&mut self, root: Option<NodeId>, ignore_root: bool) -> Result<Vec<ComponentId>> {
        let root = root.unwrap_or_else(|| self.dom.body());
        let mut created = Vec::new();

        for node in self.dom.walk_depth_first(root) {
            if ignore_root && node == root {
                continue;
            }
            // Hooks of earlier instances may have rewritten the subtree.
            if !self.dom.is_inclusive_descendant(node, root) || self.component_of(node).is_some() {
                continue;
            }
            let Some(name) = self.marker_of(node) else {
                continue;
            };
            if !self.is_registered(&name) {
                warn!(name = %name, "unknown component name, element skipped");
                continue;
            }
            if let Some(id) = self.from_element(node)? {
                created.push(id);
            }
        }

        let elements: HashSet<NodeId> = created
            .iter()
            .filter_map(|&id| self.instances.get(id).map(|i| i.element))
            .collect();
        let top_level: Vec<ComponentId> = created
            .into_iter()
            .filter(|&id| self.is_component(id))
            .filter(|&id| {
                let element = self.instances[id].element;
                !self
                    .dom
                    .ancestors(element)
                    .iter()
                    .any(|a| elements.contains(a))
            })
            .collect();
        debug!(created = top_level.len(), "parse complete");
        Ok(top_level)
    }
}
