//! Event objects: native and synthetic variants behind one interface.
//!
//! [`Event`] is what every handler receives. Its [`EventKind`] records whether
//! it came from the DOM substrate ([`NativeEvent`]) or was emitted by a
//! component ([`SyntheticEvent`]); the kind is fixed when dispatch starts and
//! handlers use the shared accessors instead of inspecting it.

use serde_json::{Map, Value};

use crate::component::ComponentId;
use crate::dom::node::NodeId;

// ---------------------------------------------------------------------------
// NativeEvent
// ---------------------------------------------------------------------------

/// An event delivered by the DOM substrate to the root listener.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    /// Event type, e.g. `"click"`.
    pub event_type: String,
    /// The element the event originated on.
    pub target: NodeId,
    /// Extra payload (key codes, pointer positions, ...).
    pub detail: Map<String, Value>,
    default_prevented: bool,
}

impl NativeEvent {
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            detail: Map::new(),
            default_prevented: false,
        }
    }

    /// Attach a detail entry (builder).
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }

    /// The substrate's own default-action suppression.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

// ---------------------------------------------------------------------------
// SyntheticEvent
// ---------------------------------------------------------------------------

/// An event emitted by a component through `Runtime::emit`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticEvent {
    /// The emitting component.
    pub source: ComponentId,
    /// Payload merged in by the emitter.
    pub data: Map<String, Value>,
}

/// Where an event came from.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Native(NativeEvent),
    Synthetic(SyntheticEvent),
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// The event object handed to every handler during one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    origin: NodeId,
    kind: EventKind,
    current_target: Option<NodeId>,
    current_component: Option<ComponentId>,
    propagation_stopped: bool,
    immediate_stopped: bool,
    default_prevented: bool,
    deferred: bool,
}

impl Event {
    /// Wrap a native event.
    pub fn native(native: NativeEvent) -> Self {
        Self {
            name: native.event_type.clone(),
            origin: native.target,
            kind: EventKind::Native(native),
            current_target: None,
            current_component: None,
            propagation_stopped: false,
            immediate_stopped: false,
            default_prevented: false,
            deferred: false,
        }
    }

    /// Build a component-emitted event originating at `element`.
    pub fn synthetic(
        name: impl Into<String>,
        source: ComponentId,
        element: NodeId,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            origin: element,
            kind: EventKind::Synthetic(SyntheticEvent { source, data }),
            current_target: None,
            current_component: None,
            propagation_stopped: false,
            immediate_stopped: false,
            default_prevented: false,
            deferred: false,
        }
    }

    /// The firing event name used for binding lookup.
    pub fn event_type(&self) -> &str {
        &self.name
    }

    /// The element dispatch started from: the native target, or the emitting
    /// component's element.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// `true` for component-emitted events.
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, EventKind::Synthetic(_))
    }

    /// The emitting component of a synthetic event.
    pub fn source_component(&self) -> Option<ComponentId> {
        match &self.kind {
            EventKind::Synthetic(synthetic) => Some(synthetic.source),
            EventKind::Native(_) => None,
        }
    }

    /// Synthetic payload or native detail.
    pub fn data(&self) -> &Map<String, Value> {
        match &self.kind {
            EventKind::Synthetic(synthetic) => &synthetic.data,
            EventKind::Native(native) => &native.detail,
        }
    }

    /// Look up one payload entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data().get(key)
    }

    /// The element the running handler matched: the selector match for scoped
    /// bindings, the component root otherwise. `None` for global handlers.
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    /// The component whose binding is running. `None` for global handlers.
    pub fn current_component(&self) -> Option<ComponentId> {
        self.current_component
    }

    /// Stop delivery to components further up the chain.
    ///
    /// Global handlers are unaffected.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Like [`stop_propagation`](Self::stop_propagation), and also skip the
    /// remaining bindings of the current component.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_stopped
    }

    /// Mark the default action as prevented; forwarded to the native event.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
        if let EventKind::Native(native) = &mut self.kind {
            native.prevent_default();
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// `true` when the event was queued because a render was swapping
    /// components, instead of being dispatched.
    ///
    /// A deferred event returned to its sender has not reached any handler
    /// yet, so its propagation and default flags say nothing. The queued copy
    /// is dispatched as soon as the render completes.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Unwrap the native event, if this is one.
    pub fn into_native(self) -> Option<NativeEvent> {
        match self.kind {
            EventKind::Native(native) => Some(native),
            EventKind::Synthetic(_) => None,
        }
    }

    pub(crate) fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    pub(crate) fn enter(&mut self, target: Option<NodeId>, component: Option<ComponentId>) {
        self.current_target = target;
        self.current_component = component;
    }
}

// ===========================================================================
// Tests
// ===========================================================================
