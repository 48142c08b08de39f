//! Per-instance record held by the runtime.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::definition::{Behavior, ComponentDef};
use super::lifecycle::Lifecycle;
use crate::dom::node::NodeId;
use crate::event::binding::{BindingTable, HandlerId};

/// A hook that arrived while the behavior was lent out to another hook of
/// the same instance. Delivered once the behavior is back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingHook {
    OptionsChanged(Map<String, Value>),
    Inserted,
    Removed,
    /// Teardown requested from inside one of the instance's own hooks.
    Destroy,
}

/// State of one live component instance.
pub(crate) struct Instance {
    pub name: String,
    /// Definition captured at construction; later re-registrations do not affect it.
    pub def: Rc<ComponentDef>,
    pub element: NodeId,
    pub options: Map<String, Value>,
    pub context: Map<String, Value>,
    pub state: Lifecycle,
    /// `None` while lent out to a running hook.
    pub behavior: Option<Box<dyn Behavior>>,
    pub pending_hooks: VecDeque<PendingHook>,
    pub bindings: BindingTable,
    /// Global handlers registered through this instance.
    pub globals: Vec<(String, HandlerId)>,
    /// Set when the definition is being unregistered; handlers stop firing.
    pub retired: bool,
    pub rendering: bool,
    pub render_pending: bool,
    pub render_count: usize,
}

impl Instance {
    pub fn new(
        name: &str,
        def: Rc<ComponentDef>,
        element: NodeId,
        options: Map<String, Value>,
    ) -> Self {
        let behavior = def.instantiate();
        let context = behavior.initial_context(&options);
        Self {
            name: name.to_owned(),
            def,
            element,
            options,
            context,
            state: Lifecycle::Constructing,
            behavior: Some(behavior),
            pending_hooks: VecDeque::new(),
            bindings: BindingTable::new(),
            globals: Vec::new(),
            retired: false,
            rendering: false,
            render_pending: false,
            render_count: 0,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("element", &self.element)
            .field("state", &self.state)
            .field("options", &self.options)
            .field("context", &self.context)
            .field("pending_hooks", &self.pending_hooks)
            .field("bindings", &self.bindings.len())
            .field("render_count", &self.render_count)
            .finish()
    }
}
