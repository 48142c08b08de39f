//! The runtime context: registry, element cache, dispatch engine, parser, renderer.
//!
//! All process-wide state of the framework lives in one [`Runtime`] value
//! instead of ambient globals. Operations are split across submodules by
//! concern; each adds an `impl Runtime` block.

pub mod config;
mod dispatch;
mod lifecycle;
mod parse;
mod registry;
mod render;

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use slotmap::{SecondaryMap, SlotMap};
use tracing::trace;

use crate::component::instance::{Instance, PendingHook};
use crate::component::{AttachmentTracker, Behavior, ComponentDef, ComponentId, Lifecycle};
use crate::dom::markup::parse_fragment;
use crate::dom::node::NodeId;
use crate::dom::tree::Dom;
use crate::error::{Error, Result};
use crate::event::{EventDispatcher, GlobalHandlers, HandlerId};

pub use config::{RuntimeConfig, Selection};

/// Owner of the document, the component registry and all event state.
///
/// Single-threaded: every operation runs to completion before returning.
pub struct Runtime {
    dom: Dom,
    config: RuntimeConfig,
    definitions: HashMap<String, Rc<ComponentDef>>,
    instances: SlotMap<ComponentId, Instance>,
    /// Element -> instance cache. Keys of discarded nodes never resolve again.
    by_element: SecondaryMap<NodeId, ComponentId>,
    globals: GlobalHandlers,
    dispatcher: EventDispatcher,
    attachment: AttachmentTracker,
    next_handler: u64,
    /// Non-zero while a render is swapping an instance's descendants.
    swap_depth: usize,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("instances", &self.instances.len())
            .field("globals", &self.globals)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime over an empty document with the default configuration.
    pub fn new() -> Self {
        Self::with_dom(Dom::new())
    }

    /// A runtime over an existing document.
    pub fn with_dom(dom: Dom) -> Self {
        Self {
            dom,
            config: RuntimeConfig::default(),
            definitions: HashMap::new(),
            instances: SlotMap::with_key(),
            by_element: SecondaryMap::new(),
            globals: GlobalHandlers::new(),
            dispatcher: EventDispatcher::new(),
            attachment: AttachmentTracker::new(),
            next_handler: 0,
            swap_depth: 0,
        }
    }

    /// Apply configuration.
    pub fn init(&mut self, config: RuntimeConfig) {
        self.config = config;
    }

    /// Return to a freshly loaded state.
    ///
    /// Drops every instance record without running hooks or touching the
    /// document, clears definitions, global handlers and root subscriptions,
    /// and restores the default configuration.
    pub fn reset(&mut self) {
        self.instances.clear();
        self.by_element.clear();
        self.definitions.clear();
        self.globals.clear();
        self.dispatcher.reset();
        self.attachment.clear();
        self.config = RuntimeConfig::default();
        self.swap_depth = 0;
        trace!("runtime reset");
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Direct document access. Mutations made here bypass attachment hooks
    /// until [`Runtime::sync_attachment`] is called.
    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    /// Parse `markup` and append the resulting nodes to `parent`.
    ///
    /// No components are created; call [`Runtime::parse`] afterwards.
    pub fn append_markup(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>> {
        if !self.dom.contains(parent) {
            return Err(Error::MissingNode);
        }
        let roots = parse_fragment(&mut self.dom, markup)?;
        for &node in &roots {
            self.dom.append_child(parent, node)?;
        }
        Ok(roots)
    }

    // ── Instance accessors ───────────────────────────────────────────

    /// Whether `id` refers to a live (not destroying, not destroyed) instance.
    pub fn is_component(&self, id: ComponentId) -> bool {
        self.instances.get(id).is_some_and(|i| i.state.is_alive())
    }

    /// The cached instance bound to `node`, without constructing one.
    pub fn component_of(&self, node: NodeId) -> Option<ComponentId> {
        self.by_element
            .get(node)
            .copied()
            .filter(|&id| self.instances.contains_key(id))
    }

    pub fn state(&self, id: ComponentId) -> Lifecycle {
        self.instances
            .get(id)
            .map_or(Lifecycle::Destroyed, |i| i.state)
    }

    pub fn element(&self, id: ComponentId) -> Result<NodeId> {
        Ok(self.record(id)?.element)
    }

    /// Name the instance was registered under.
    pub fn name(&self, id: ComponentId) -> Result<&str> {
        Ok(&self.record(id)?.name)
    }

    pub fn options(&self, id: ComponentId) -> Result<&Map<String, Value>> {
        Ok(&self.record(id)?.options)
    }

    pub fn context(&self, id: ComponentId) -> Result<&Map<String, Value>> {
        Ok(&self.record(id)?.context)
    }

    /// Number of template invocations so far.
    pub fn render_count(&self, id: ComponentId) -> Result<usize> {
        Ok(self.record(id)?.render_count)
    }

    /// Number of bindings currently registered on the instance.
    pub fn binding_count(&self, id: ComponentId) -> Result<usize> {
        Ok(self.record(id)?.bindings.len())
    }

    /// Typed shared access to an instance's behavior.
    pub fn behavior<T: 'static>(&self, id: ComponentId) -> Option<&T> {
        self.instances
            .get(id)?
            .behavior
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Typed mutable access to an instance's behavior.
    ///
    /// `None` while one of the instance's own hooks is running.
    pub fn behavior_mut<T: 'static>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.instances
            .get_mut(id)?
            .behavior
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Number of instance records, including ones being destroyed.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    // ── Internal helpers ─────────────────────────────────────────────

    /// Any existing record, including one being destroyed.
    fn record(&self, id: ComponentId) -> Result<&Instance> {
        self.instances.get(id).ok_or(Error::UseAfterDestroy)
    }

    /// A record that still accepts mutation.
    fn live_mut(&mut self, id: ComponentId) -> Result<&mut Instance> {
        match self.instances.get_mut(id) {
            Some(inst) if inst.state.is_alive() => Ok(inst),
            _ => Err(Error::UseAfterDestroy),
        }
    }

    /// Whether handlers of `id` may still run.
    fn dispatchable(&self, id: ComponentId) -> bool {
        self.instances
            .get(id)
            .is_some_and(|i| i.state.is_alive() && !i.retired)
    }

    fn next_handler_id(&mut self) -> HandlerId {
        self.next_handler += 1;
        HandlerId(self.next_handler)
    }

    /// Lend the behavior of `id` to `f`, putting it back afterwards.
    ///
    /// Returns `Ok(None)` when the instance is gone or its behavior is
    /// already lent out to an outer hook. Hooks queued for `id` while `f` ran
    /// are delivered once the behavior is back; the first error wins.
    fn with_behavior<T>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut Box<dyn Behavior>, &mut Runtime) -> Result<T>,
    ) -> Result<Option<T>> {
        let Some(mut behavior) = self.instances.get_mut(id).and_then(|i| i.behavior.take()) else {
            trace!(?id, "behavior unavailable, call skipped");
            return Ok(None);
        };
        let result = f(&mut behavior, self);
        let Some(inst) = self.instances.get_mut(id) else {
            return result.map(Some);
        };
        inst.behavior = Some(behavior);
        let queued = self.flush_hooks(id);
        let value = result?;
        queued?;
        Ok(Some(value))
    }

    /// Deliver a hook now, or queue it if the behavior is lent out.
    fn run_hook(&mut self, id: ComponentId, hook: PendingHook) -> Result<()> {
        match self.instances.get_mut(id) {
            None => return Ok(()),
            Some(inst) if inst.behavior.is_none() => {
                trace!(?id, ?hook, "behavior lent out, hook queued");
                inst.pending_hooks.push_back(hook);
                return Ok(());
            }
            Some(_) => {}
        }
        match hook {
            PendingHook::OptionsChanged(previous) => self
                .with_behavior(id, |b, rt| b.on_options_changed(rt, id, &previous))
                .map(drop),
            PendingHook::Inserted => self.with_behavior(id, |b, rt| b.on_insert(rt, id)).map(drop),
            PendingHook::Removed => self.with_behavior(id, |b, rt| b.on_remove(rt, id)).map(drop),
            PendingHook::Destroy => {
                self.teardown(id);
                Ok(())
            }
        }
    }

    /// Deliver every hook queued for `id`, in arrival order.
    fn flush_hooks(&mut self, id: ComponentId) -> Result<()> {
        let mut first_error = None;
        while let Some(hook) = self
            .instances
            .get_mut(id)
            .and_then(|inst| inst.pending_hooks.pop_front())
        {
            if let Err(err) = self.run_hook(id, hook) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Instances bound to strict descendants of `node`, outermost first.
    fn descendant_components(&self, node: NodeId) -> Vec<ComponentId> {
        self.dom
            .walk_depth_first(node)
            .into_iter()
            .skip(1)
            .filter_map(|n| self.component_of(n))
            .collect()
    }
}
