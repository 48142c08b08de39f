//! Instance lifecycle: construction, options, attachment, queries, destroy.

use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{debug, error, trace};

use super::{Runtime, Selection};
use crate::component::instance::{Instance, PendingHook};
use crate::component::{options, ComponentDef, ComponentId, Lifecycle, LifecycleEvent};
use crate::dom::node::NodeId;
use crate::error::{Error, Result};

impl Runtime {
    /// Bind a new instance to `element` and run setup, first render
    /// (programmatic path only) and `init`.
    pub(crate) fn construct(
        &mut self,
        name: &str,
        def: Rc<ComponentDef>,
        element: NodeId,
        options: Map<String, Value>,
        programmatic: bool,
    ) -> Result<ComponentId> {
        if let Some(existing) = self.component_of(element) {
            return Err(Error::DuplicateElementBinding {
                existing: self.instances[existing].name.clone(),
            });
        }
        let id = self
            .instances
            .insert(Instance::new(name, def, element, options));
        self.by_element.insert(element, id);
        debug!(name, ?id, programmatic, "component constructed");

        if let Err(err) = self.finish_construction(id, programmatic) {
            self.destroy(id);
            return Err(err);
        }
        Ok(id)
    }

    fn finish_construction(&mut self, id: ComponentId, programmatic: bool) -> Result<()> {
        self.with_behavior(id, |b, rt| b.setup(rt, id))?;
        if programmatic && self.is_component(id) {
            self.render(id)?;
        }
        self.with_behavior(id, |b, rt| b.init(rt, id))?;
        let Some(inst) = self.instances.get_mut(id) else {
            return Ok(());
        };
        if inst.state == Lifecycle::Constructing {
            inst.state = Lifecycle::Initialized;
        }
        let element = inst.element;
        self.sync_attachment(element)
    }

    // ── Options & context ────────────────────────────────────────────

    /// Merge `update` into the options.
    ///
    /// Fires `on_options_changed` with the previous snapshot when the
    /// effective options differ. Returns whether they did. Never renders.
    pub fn update_options(&mut self, id: ComponentId, update: &Map<String, Value>) -> Result<bool> {
        let inst = self.live_mut(id)?;
        let next = options::merged(&inst.options, update);
        if next == inst.options {
            return Ok(false);
        }
        let previous = std::mem::replace(&mut inst.options, next);
        self.run_hook(id, PendingHook::OptionsChanged(previous))?;
        Ok(true)
    }

    /// Shallow-merge `partial` into the render context; renders if it changed.
    pub fn set_render_context(&mut self, id: ComponentId, partial: &Map<String, Value>) -> Result<bool> {
        let inst = self.live_mut(id)?;
        let next = options::merged(&inst.context, partial);
        self.apply_context(id, next)
    }

    /// Replace the render context wholesale; renders if it changed.
    pub fn replace_render_context(&mut self, id: ComponentId, full: Map<String, Value>) -> Result<bool> {
        self.live_mut(id)?;
        self.apply_context(id, full)
    }

    fn apply_context(&mut self, id: ComponentId, next: Map<String, Value>) -> Result<bool> {
        let inst = self.live_mut(id)?;
        if inst.context == next {
            trace!(?id, "render context unchanged");
            return Ok(false);
        }
        inst.context = next;
        self.render(id)?;
        Ok(true)
    }

    // ── Attachment ───────────────────────────────────────────────────

    /// Move the element before `reference`, then fire attachment hooks.
    pub fn insert_before(&mut self, id: ComponentId, reference: NodeId) -> Result<()> {
        let element = self.live_mut(id)?.element;
        self.dom.insert_before(element, reference)?;
        self.sync_attachment(element)
    }

    /// Move the element after `reference`, then fire attachment hooks.
    pub fn insert_after(&mut self, id: ComponentId, reference: NodeId) -> Result<()> {
        let element = self.live_mut(id)?.element;
        self.dom.insert_after(element, reference)?;
        self.sync_attachment(element)
    }

    /// Append the element to `parent`, then fire attachment hooks.
    pub fn append_to(&mut self, id: ComponentId, parent: NodeId) -> Result<()> {
        let element = self.live_mut(id)?.element;
        self.dom.append_child(parent, element)?;
        self.sync_attachment(element)
    }

    /// Detach the element from the document, then fire attachment hooks.
    pub fn remove(&mut self, id: ComponentId) -> Result<()> {
        let element = self.live_mut(id)?.element;
        self.dom.detach(element);
        self.sync_attachment(element)
    }

    /// Whether `on_insert` fired most recently for the instance, without a
    /// later `on_remove`.
    ///
    /// Matches document connectedness after every runtime-driven move;
    /// changes made through [`Runtime::dom_mut`] show up after
    /// [`Runtime::sync_attachment`].
    pub fn is_attached(&self, id: ComponentId) -> Result<bool> {
        self.record(id)?;
        Ok(self.attachment.is_attached(id))
    }

    pub fn is_detached(&self, id: ComponentId) -> Result<bool> {
        self.is_attached(id).map(|attached| !attached)
    }

    /// Fire `on_insert` / `on_remove` for every instance in `node`'s subtree
    /// whose connectedness changed since it was last reported, outermost first.
    ///
    /// Every transition is delivered; the first hook error is returned.
    pub fn sync_attachment(&mut self, node: NodeId) -> Result<()> {
        for n in self.dom.walk_depth_first(node) {
            if let Some(id) = self.component_of(n) {
                if self.instances[id].state.is_alive() {
                    let connected = self.dom.is_connected(n);
                    self.attachment.observe(id, connected);
                }
            }
        }
        if !self.attachment.has_pending() {
            return Ok(());
        }
        let mut first_error = None;
        for transition in self.attachment.drain() {
            let result = match transition {
                LifecycleEvent::Inserted { component } => {
                    trace!(?component, "on_insert");
                    self.run_hook(component, PendingHook::Inserted)
                }
                LifecycleEvent::Removed { component } => {
                    trace!(?component, "on_remove");
                    self.run_hook(component, PendingHook::Removed)
                }
            };
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Run the configured query inside the element and wrap the result.
    pub fn find(&self, id: ComponentId, selector: &str) -> Result<Selection> {
        let element = self.record(id)?.element;
        let nodes = (self.config.query)(&self.dom, element, selector)?;
        Ok((self.config.wrap)(&self.dom, nodes))
    }

    /// First component among the query matches.
    pub fn find_component(&mut self, id: ComponentId, selector: &str) -> Result<Option<ComponentId>> {
        let element = self.record(id)?.element;
        for node in (self.config.query)(&self.dom, element, selector)? {
            if let Some(found) = self.from_element(node)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Every component among the query matches, in query order.
    pub fn find_components(&mut self, id: ComponentId, selector: &str) -> Result<Vec<ComponentId>> {
        let element = self.record(id)?.element;
        let mut found = Vec::new();
        for node in (self.config.query)(&self.dom, element, selector)? {
            if let Some(component) = self.from_element(node)? {
                found.push(component);
            }
        }
        Ok(found)
    }

    /// Call `method` on each instance that provides it.
    ///
    /// Instances lacking the method, and stale handles, are skipped, as is an
    /// instance asked from inside one of its own hooks. Results are returned
    /// in input order.
    pub fn invoke(
        &mut self,
        components: impl IntoIterator<Item = ComponentId>,
        method: &str,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        let mut results = Vec::new();
        for id in components {
            if !self.is_component(id) {
                trace!(?id, method, "invoke skipped stale component");
                continue;
            }
            let outcome = self.with_behavior(id, |b, rt| Ok(b.call(rt, id, method, args)))?;
            if let Some(Some(result)) = outcome {
                results.push(result?);
            }
        }
        Ok(results)
    }

    // ── Destruction ──────────────────────────────────────────────────

    /// Tear the instance down. Idempotent; always returns `None`.
    ///
    /// Order: `on_destroy`, release bindings and owned global handlers,
    /// destroy descendant instances, drop the cache entry, remove the element
    /// from the document. Hook errors are logged, never propagated.
    ///
    /// Called from inside one of the instance's own hooks, the instance stops
    /// accepting calls at once and the teardown runs when that hook returns.
    pub fn destroy(&mut self, id: ComponentId) -> Option<ComponentId> {
        let inst = self.instances.get_mut(id)?;
        if inst.state == Lifecycle::Destroying {
            return None;
        }
        inst.state = Lifecycle::Destroying;
        debug!(name = %inst.name, ?id, "destroying component");
        if inst.behavior.is_none() {
            trace!(?id, "destroy requested from own hook, postponed");
            inst.pending_hooks.push_back(PendingHook::Destroy);
            return None;
        }
        self.teardown(id);
        None
    }

    pub(super) fn teardown(&mut self, id: ComponentId) {
        let Some(name) = self.instances.get(id).map(|inst| inst.name.clone()) else {
            return;
        };
        if let Err(err) = self.with_behavior(id, |b, rt| b.on_destroy(rt, id)) {
            error!(name = %name, error = %err, "on_destroy failed");
        }

        let (element, released) = match self.instances.get_mut(id) {
            Some(inst) => {
                inst.bindings.clear();
                (inst.element, std::mem::take(&mut inst.globals))
            }
            None => return,
        };
        for (event, handler) in released {
            self.globals.remove(&event, Some(handler));
        }
        self.globals.remove_owned(id, None);

        for child in self.descendant_components(element) {
            self.destroy(child);
        }

        if self.by_element.get(element) == Some(&id) {
            self.by_element.remove(element);
        }
        self.attachment.forget(id);
        self.dom.remove(element);
        self.instances.remove(id);
    }

    /// Destroy the instances inside `node`'s subtree, then discard it.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if !self.dom.contains(node) {
            return Err(Error::MissingNode);
        }
        let doomed: Vec<ComponentId> = self
            .dom
            .walk_depth_first(node)
            .into_iter()
            .filter_map(|n| self.component_of(n))
            .collect();
        for id in doomed {
            self.destroy(id);
        }
        self.dom.remove(node);
        Ok(())
    }

    /// Destroy instances whose element was discarded behind the runtime's back.
    pub fn prune(&mut self) -> usize {
        let orphans: Vec<ComponentId> = self
            .instances
            .iter()
            .filter(|(_, inst)| !self.dom.contains(inst.element))
            .map(|(id, _)| id)
            .collect();
        let count = orphans.len();
        for id in orphans {
            self.destroy(id);
        }
        count
    }
}
