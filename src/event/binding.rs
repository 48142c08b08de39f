//! Event binding tables.
//!
//! [`BindingTable`] is owned by one component instance and maps an event name
//! to its ordered bindings, each optionally scoped by a selector.
//! [`GlobalHandlers`] is the process-wide table of handlers keyed by event
//! name only.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::object::Event;
use crate::component::ComponentId;
use crate::error::Result;
use crate::runtime::Runtime;
use crate::selector::SelectorList;

/// A handler callback. Receives the runtime so it may emit, render, or destroy.
pub type Handler = Rc<dyn Fn(&mut Runtime, &mut Event) -> Result<()>>;

/// Identity of a registered binding or global handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// A single `(event, selector?) -> handler` association.
#[derive(Clone)]
pub struct Binding {
    pub id: HandlerId,
    /// `None` binds to the component root itself.
    pub selector: Option<SelectorList>,
    pub handler: Handler,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("selector", &self.selector.as_ref().map(SelectorList::as_str))
            .field("handler", &"<fn>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingTable
// ---------------------------------------------------------------------------

/// Per-instance table: event name -> bindings in registration order.
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: HashMap<String, Vec<Binding>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding.
    pub fn bind(
        &mut self,
        event: &str,
        selector: Option<SelectorList>,
        id: HandlerId,
        handler: Handler,
    ) {
        self.bindings.entry(event.to_owned()).or_default().push(Binding {
            id,
            selector,
            handler,
        });
    }

    /// Remove the subset selected by the filters, from most to least specific:
    /// handler (+ selector), selector only, event only, or everything when
    /// `event` is `None`.
    ///
    /// Returns the number of bindings removed.
    pub fn release(
        &mut self,
        event: Option<&str>,
        selector: Option<&str>,
        handler: Option<HandlerId>,
    ) -> usize {
        let keep = |binding: &Binding| {
            let selector_hit = selector.map_or(true, |s| {
                binding.selector.as_ref().map(SelectorList::as_str) == Some(s.trim())
            });
            let handler_hit = handler.map_or(true, |h| binding.id == h);
            !(selector_hit && handler_hit)
        };

        let mut removed = 0;
        match event {
            Some(name) => {
                if let Some(list) = self.bindings.get_mut(name) {
                    let before = list.len();
                    list.retain(keep);
                    removed = before - list.len();
                    if list.is_empty() {
                        self.bindings.remove(name);
                    }
                }
            }
            None => {
                for list in self.bindings.values_mut() {
                    let before = list.len();
                    list.retain(keep);
                    removed += before - list.len();
                }
                self.bindings.retain(|_, list| !list.is_empty());
            }
        }
        removed
    }

    /// Snapshot of the bindings for `event`: selector-scoped ones first, then
    /// root bindings, each group in registration order.
    pub fn matching(&self, event: &str) -> Vec<Binding> {
        let Some(list) = self.bindings.get(event) else {
            return Vec::new();
        };
        let (scoped, root): (Vec<&Binding>, Vec<&Binding>) =
            list.iter().partition(|b| b.selector.is_some());
        scoped.into_iter().chain(root).cloned().collect()
    }

    /// Whether a binding is still registered.
    pub fn contains(&self, id: HandlerId) -> bool {
        self.bindings.values().flatten().any(|b| b.id == id)
    }

    /// Event names with at least one binding.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Total number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

// ---------------------------------------------------------------------------
// GlobalHandlers
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct GlobalEntry {
    id: HandlerId,
    owner: Option<ComponentId>,
    handler: Handler,
}

/// Process-wide handlers keyed by event name, independent of containment.
#[derive(Default)]
pub struct GlobalHandlers {
    handlers: HashMap<String, Vec<GlobalEntry>>,
}

impl fmt::Debug for GlobalHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("GlobalHandlers").field("handlers", &counts).finish()
    }
}

impl GlobalHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, optionally on behalf of a component.
    pub fn add(
        &mut self,
        event: &str,
        id: HandlerId,
        owner: Option<ComponentId>,
        handler: Handler,
    ) {
        self.handlers
            .entry(event.to_owned())
            .or_default()
            .push(GlobalEntry { id, owner, handler });
    }

    /// Remove one handler (`Some(id)`) or every handler for `event`.
    pub fn remove(&mut self, event: &str, id: Option<HandlerId>) -> usize {
        let Some(list) = self.handlers.get_mut(event) else {
            return 0;
        };
        let before = list.len();
        match id {
            Some(id) => list.retain(|entry| entry.id != id),
            None => list.clear(),
        }
        let removed = before - list.len();
        if list.is_empty() {
            self.handlers.remove(event);
        }
        removed
    }

    /// Remove every handler registered by `owner`, optionally limited to one event.
    pub fn remove_owned(&mut self, owner: ComponentId, event: Option<&str>) -> usize {
        let mut removed = 0;
        for (name, list) in self.handlers.iter_mut() {
            if event.is_some_and(|e| e != name) {
                continue;
            }
            let before = list.len();
            list.retain(|entry| entry.owner != Some(owner));
            removed += before - list.len();
        }
        self.handlers.retain(|_, list| !list.is_empty());
        removed
    }

    /// Snapshot of the handlers for `event` in registration order.
    pub fn snapshot(&self, event: &str) -> Vec<(HandlerId, Handler)> {
        self.handlers
            .get(event)
            .map(|list| {
                list.iter()
                    .map(|entry| (entry.id, Rc::clone(&entry.handler)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, event: &str, id: HandlerId) -> bool {
        self.handlers
            .get(event)
            .is_some_and(|list| list.iter().any(|entry| entry.id == id))
    }

    /// Number of handlers for `event`.
    pub fn count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
