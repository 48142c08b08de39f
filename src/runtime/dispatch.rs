//! Dispatch engine: bindings, global handlers, and the delegated dispatch walk.
//!
//! One root subscription exists per distinct event name. When an event
//! arrives, the chain from its origin up to the root is resolved to the
//! owning instances, innermost first, and each instance's bindings run in
//! order: selector-scoped bindings first, root bindings after. Global handlers
//! for the name run once at the end, whatever the instance handlers did.
//!
//! Dispatch is synchronous. A handler that emits runs the nested dispatch to
//! completion before its own call returns.

use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{error, trace};

use super::Runtime;
use crate::component::ComponentId;
use crate::dom::node::NodeId;
use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, Handler, HandlerId, NativeEvent};
use crate::selector::parse_selector_list;

impl Runtime {
    // ── Instance bindings ────────────────────────────────────────────

    /// Bind `handler` to `event` on the instance, optionally scoped to
    /// descendants matching `selector`.
    pub fn register_event(
        &mut self,
        id: ComponentId,
        event: &str,
        selector: Option<&str>,
        handler: impl Fn(&mut Runtime, &mut Event) -> Result<()> + 'static,
    ) -> Result<HandlerId> {
        self.live_mut(id)?;
        let selector = selector
            .map(|s| {
                parse_selector_list(s).map_err(|source| Error::Selector {
                    selector: s.to_owned(),
                    source,
                })
            })
            .transpose()?;
        let handler_id = self.next_handler_id();
        self.live_mut(id)?
            .bindings
            .bind(event, selector, handler_id, Rc::new(handler));
        self.subscribe(event);
        Ok(handler_id)
    }

    /// Remove the bindings selected by the filters (see
    /// [`BindingTable::release`](crate::event::BindingTable::release)).
    /// Returns how many were removed.
    pub fn release_event(
        &mut self,
        id: ComponentId,
        event: Option<&str>,
        selector: Option<&str>,
        handler: Option<HandlerId>,
    ) -> Result<usize> {
        Ok(self.live_mut(id)?.bindings.release(event, selector, handler))
    }

    // ── Global handlers ──────────────────────────────────────────────

    /// Register a global handler not owned by any instance.
    pub fn on_global(
        &mut self,
        event: &str,
        handler: impl Fn(&mut Runtime, &mut Event) -> Result<()> + 'static,
    ) -> HandlerId {
        let handler_id = self.next_handler_id();
        self.globals.add(event, handler_id, None, Rc::new(handler));
        self.subscribe(event);
        handler_id
    }

    /// Remove one global handler, or all of them for `event`.
    pub fn off_global(&mut self, event: &str, handler: Option<HandlerId>) -> usize {
        self.globals.remove(event, handler)
    }

    /// Register a global handler on behalf of an instance; released by `destroy`.
    pub fn register_global(
        &mut self,
        id: ComponentId,
        event: &str,
        handler: impl Fn(&mut Runtime, &mut Event) -> Result<()> + 'static,
    ) -> Result<HandlerId> {
        self.live_mut(id)?;
        let handler_id = self.next_handler_id();
        self.globals.add(event, handler_id, Some(id), Rc::new(handler));
        self.live_mut(id)?.globals.push((event.to_owned(), handler_id));
        self.subscribe(event);
        Ok(handler_id)
    }

    /// Release global handlers the instance registered for `event`.
    pub fn release_global(
        &mut self,
        id: ComponentId,
        event: &str,
        handler: Option<HandlerId>,
    ) -> Result<usize> {
        let inst = self.live_mut(id)?;
        let owned: Vec<HandlerId> = inst
            .globals
            .iter()
            .filter(|(name, h)| name == event && handler.map_or(true, |want| want == *h))
            .map(|(_, h)| *h)
            .collect();
        inst.globals
            .retain(|(name, h)| !(name == event && owned.contains(h)));
        Ok(owned
            .into_iter()
            .map(|h| self.globals.remove(event, Some(h)))
            .sum())
    }

    /// Number of global handlers registered for `event`.
    pub fn global_count(&self, event: &str) -> usize {
        self.globals.count(event)
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Emit a synthetic event from the instance's element and dispatch it.
    ///
    /// Returns the event after every handler has run. While a render is
    /// swapping components the event is queued instead, and the returned copy
    /// has [`Event::is_deferred`] set; the queued one is dispatched when the
    /// render completes.
    pub fn emit(&mut self, id: ComponentId, name: &str, data: Map<String, Value>) -> Result<Event> {
        let element = self.live_mut(id)?.element;
        self.dispatch(Event::synthetic(name, id, element, data))
    }

    /// A native event arriving at the root listener.
    ///
    /// Dropped (returns `Ok(None)`) when nothing ever subscribed to its type.
    pub fn fire_native(&mut self, native: NativeEvent) -> Result<Option<Event>> {
        if !self.dispatcher.is_subscribed(&native.event_type) {
            trace!(event = %native.event_type, "no root subscription, event dropped");
            return Ok(None);
        }
        self.dispatch(Event::native(native)).map(Some)
    }

    /// Shorthand for [`Runtime::fire_native`] with an empty detail.
    pub fn fire(&mut self, origin: NodeId, event: &str) -> Result<Option<Event>> {
        self.fire_native(NativeEvent::new(event, origin))
    }

    /// Manual dispatch entry point; dispatches regardless of subscriptions.
    ///
    /// Deferred during a render swap, like [`Runtime::emit`].
    pub fn handle_event(&mut self, event: Event) -> Result<Event> {
        self.dispatch(event)
    }

    /// Whether the root listener is subscribed to `event`.
    pub fn is_subscribed(&self, event: &str) -> bool {
        self.dispatcher.is_subscribed(event)
    }

    /// Event names the root listener is subscribed to, sorted.
    pub fn subscriptions(&self) -> Vec<&str> {
        self.dispatcher.subscriptions().collect()
    }

    /// Events waiting for an in-flight render to complete.
    pub fn deferred_count(&self) -> usize {
        self.dispatcher.pending_count()
    }

    /// Event names the instance has bindings for, sorted.
    pub fn bound_events(&self, id: ComponentId) -> Result<Vec<&str>> {
        let mut names: Vec<&str> = self.record(id)?.bindings.event_names().collect();
        names.sort_unstable();
        Ok(names)
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn subscribe(&mut self, event: &str) {
        if self.dispatcher.subscribe(event) {
            trace!(event, "root listener subscribed");
        }
    }

    fn dispatch(&mut self, mut event: Event) -> Result<Event> {
        if self.swap_depth > 0 {
            trace!(event = %event.event_type(), "render in flight, event deferred");
            event.set_deferred(true);
            self.dispatcher.defer(event.clone());
            return Ok(event);
        }
        event.set_deferred(false);
        let name = event.event_type().to_owned();
        let origin = event.origin();
        let mut failures = Vec::new();

        let chain = self.resolve_chain(origin, &mut failures);
        trace!(event = %name, instances = chain.len(), "dispatching");

        'chain: for (root, id) in chain {
            if event.is_propagation_stopped() {
                break;
            }
            let Some(inst) = self.instances.get(id).filter(|_| self.dispatchable(id)) else {
                continue;
            };
            for binding in inst.bindings.matching(&name) {
                if !self.dispatchable(id) || !self.instances[id].bindings.contains(binding.id) {
                    continue;
                }
                let target = match &binding.selector {
                    Some(selector) => match self.dom.closest_within(origin, root, selector) {
                        Some(target) => target,
                        None => continue,
                    },
                    None => root,
                };
                event.enter(Some(target), Some(id));
                self.invoke_handler(&binding.handler, &mut event, &mut failures);
                if event.is_immediate_propagation_stopped() {
                    break 'chain;
                }
            }
        }

        event.enter(None, None);
        for (handler_id, handler) in self.globals.snapshot(&name) {
            if self.globals.contains(&name, handler_id) {
                self.invoke_handler(&handler, &mut event, &mut failures);
            }
        }

        if failures.is_empty() {
            Ok(event)
        } else {
            Err(Error::HandlersFailed {
                event: name,
                failures,
            })
        }
    }

    /// `(instance root, instance)` pairs from the origin upward, innermost first.
    fn resolve_chain(
        &mut self,
        origin: NodeId,
        failures: &mut Vec<String>,
    ) -> Vec<(NodeId, ComponentId)> {
        let mut chain = Vec::new();
        for node in EventDispatcher::bubble_path(&self.dom, origin) {
            match self.from_element(node) {
                Ok(Some(id)) => chain.push((node, id)),
                Ok(None) => {}
                Err(err) => {
                    error!(error = %err, "component construction failed during dispatch");
                    failures.push(err.to_string());
                }
            }
        }
        chain
    }

    fn invoke_handler(&mut self, handler: &Handler, event: &mut Event, failures: &mut Vec<String>) {
        if let Err(err) = handler(self, event) {
            let component = event
                .current_component()
                .and_then(|id| self.instances.get(id))
                .map_or("<global>", |inst| inst.name.as_str());
            error!(event = %event.event_type(), component, error = %err, "event handler failed");
            failures.push(format!("{component}: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentDef;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(log: &Log, entry: &str) -> impl Fn(&mut Runtime, &mut Event) -> Result<()> + 'static {
        let log = Rc::clone(log);
        let entry = entry.to_owned();
        move |_, _| {
            log.borrow_mut().push(entry.clone());
            Ok(())
        }
    }

    /// body > div[outer] > div[inner] > button.btn > span
    fn nested() -> (Runtime, ComponentId, ComponentId, NodeId) {
        let mut rt = Runtime::new();
        rt.register("box", ComponentDef::plain());
        let body = rt.dom().body();
        rt.append_markup(
            body,
            r#"<div id="outer" data-component="box"><div id="inner" data-component="box"><button class="btn"><span></span></button></div></div>"#,
        )
        .unwrap();
        rt.parse(None, false).unwrap();
        let outer = rt.component_of(rt.dom().query_by_id("outer").unwrap()).unwrap();
        let inner = rt.component_of(rt.dom().query_by_id("inner").unwrap()).unwrap();
        let span = rt.dom().query_all(|d| d.tag == "span")[0];
        (rt, outer, inner, span)
    }

    #[test]
    fn bubbles_innermost_first_then_globals() {
        let (mut rt, outer, inner, span) = nested();
        let log: Log = Rc::default();
        rt.register_event(outer, "click", None, recorder(&log, "outer")).unwrap();
        rt.register_event(inner, "click", None, recorder(&log, "inner")).unwrap();
        rt.on_global("click", recorder(&log, "global"));
        rt.fire(span, "click").unwrap();
        assert_eq!(*log.borrow(), vec!["inner", "outer", "global"]);
    }

    #[test]
    fn scoped_bindings_run_before_root_bindings() {
        let (mut rt, _, inner, span) = nested();
        let log: Log = Rc::default();
        rt.register_event(inner, "click", None, recorder(&log, "root")).unwrap();
        rt.register_event(inner, "click", Some(".btn"), recorder(&log, "btn")).unwrap();
        rt.fire(span, "click").unwrap();
        assert_eq!(*log.borrow(), vec!["btn", "root"]);
    }

    #[test]
    fn scoped_binding_sees_matching_target() {
        let (mut rt, _, inner, span) = nested();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        rt.register_event(inner, "click", Some(".btn"), move |_, ev| {
            *sink.borrow_mut() = ev.current_target();
            Ok(())
        })
        .unwrap();
        rt.fire(span, "click").unwrap();
        let button = rt.dom().query_all(|d| d.tag == "button")[0];
        assert_eq!(*seen.borrow(), Some(button));
    }

    #[test]
    fn scoped_binding_does_not_match_outside_its_root() {
        let (mut rt, outer, _, _) = nested();
        let log: Log = Rc::default();
        rt.register_event(outer, "click", Some("div"), recorder(&log, "div")).unwrap();
        let outer_el = rt.element(outer).unwrap();
        rt.fire(outer_el, "click").unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stop_propagation_spares_globals() {
        let (mut rt, outer, inner, span) = nested();
        let log: Log = Rc::default();
        rt.register_event(outer, "click", None, recorder(&log, "outer")).unwrap();
        rt.register_event(inner, "click", None, |_, ev| {
            ev.stop_propagation();
            Ok(())
        })
        .unwrap();
        rt.register_event(inner, "click", None, recorder(&log, "inner-2")).unwrap();
        rt.on_global("click", recorder(&log, "global"));
        let event = rt.fire(span, "click").unwrap().unwrap();
        assert!(event.is_propagation_stopped());
        assert_eq!(*log.borrow(), vec!["inner-2", "global"]);
    }

    #[test]
    fn stop_immediate_propagation_skips_siblings() {
        let (mut rt, _, inner, span) = nested();
        let log: Log = Rc::default();
        rt.register_event(inner, "click", None, |_, ev| {
            ev.stop_immediate_propagation();
            Ok(())
        })
        .unwrap();
        rt.register_event(inner, "click", None, recorder(&log, "skipped")).unwrap();
        rt.on_global("click", recorder(&log, "global"));
        rt.fire(span, "click").unwrap();
        assert_eq!(*log.borrow(), vec!["global"]);
    }

    #[test]
    fn prevent_default_reaches_native_event() {
        let (mut rt, _, inner, span) = nested();
        rt.register_event(inner, "submit", None, |_, ev| {
            ev.prevent_default();
            Ok(())
        })
        .unwrap();
        let event = rt.fire(span, "submit").unwrap().unwrap();
        assert!(event.default_prevented());
        assert!(event.into_native().unwrap().default_prevented());
    }

    #[test]
    fn unsubscribed_native_events_are_dropped() {
        let (mut rt, _, _, span) = nested();
        assert!(rt.fire(span, "keyup").unwrap().is_none());
        assert!(!rt.is_subscribed("keyup"));
    }

    #[test]
    fn emit_bubbles_to_ancestors_and_globals() {
        let (mut rt, outer, inner, _) = nested();
        let log: Log = Rc::default();
        rt.register_event(outer, "changed", None, recorder(&log, "outer")).unwrap();
        rt.on_global("changed", recorder(&log, "global"));
        let mut data = Map::new();
        data.insert("value".into(), Value::from(3));
        let event = rt.emit(inner, "changed", data).unwrap();
        assert!(event.is_custom());
        assert_eq!(event.source_component(), Some(inner));
        assert_eq!(event.get("value"), Some(&Value::from(3)));
        assert_eq!(*log.borrow(), vec!["outer", "global"]);
    }

    #[test]
    fn nested_emit_runs_depth_first() {
        let (mut rt, outer, inner, span) = nested();
        let log: Log = Rc::default();
        let inner_log = Rc::clone(&log);
        rt.register_event(inner, "click", None, move |rt, _| {
            inner_log.borrow_mut().push("inner-before".into());
            rt.emit(inner, "ping", Map::new())?;
            inner_log.borrow_mut().push("inner-after".into());
            Ok(())
        })
        .unwrap();
        rt.register_event(outer, "ping", None, recorder(&log, "outer-ping")).unwrap();
        rt.register_event(outer, "click", None, recorder(&log, "outer-click")).unwrap();
        rt.fire(span, "click").unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["inner-before", "outer-ping", "inner-after", "outer-click"]
        );
    }

    #[test]
    fn handler_errors_are_isolated_and_reported() {
        let (mut rt, outer, inner, span) = nested();
        let log: Log = Rc::default();
        rt.register_event(inner, "click", None, |_, _| Err(Error::handler("boom"))).unwrap();
        rt.register_event(outer, "click", None, recorder(&log, "outer")).unwrap();
        let err = rt.fire(span, "click").unwrap_err();
        assert_eq!(*log.borrow(), vec!["outer"]);
        match err {
            Error::HandlersFailed { event, failures } => {
                assert_eq!(event, "click");
                assert_eq!(failures, vec!["box: boom".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn destroyed_mid_dispatch_is_skipped() {
        let (mut rt, outer, inner, span) = nested();
        let log: Log = Rc::default();
        rt.register_event(inner, "click", None, move |rt, _| {
            rt.destroy(outer);
            Ok(())
        })
        .unwrap();
        rt.register_event(outer, "click", None, recorder(&log, "outer")).unwrap();
        rt.fire(span, "click").unwrap();
        assert!(log.borrow().is_empty());
        assert!(!rt.is_component(outer));
    }

    #[test]
    fn release_during_dispatch_is_respected() {
        let (mut rt, _, inner, span) = nested();
        let log: Log = Rc::default();
        let second = Rc::new(RefCell::new(None::<HandlerId>));
        let target = Rc::clone(&second);
        rt.register_event(inner, "click", None, move |rt, _| {
            let id = (*target.borrow()).unwrap();
            rt.release_event(inner, Some("click"), None, Some(id))?;
            Ok(())
        })
        .unwrap();
        let id = rt.register_event(inner, "click", None, recorder(&log, "second")).unwrap();
        *second.borrow_mut() = Some(id);
        rt.fire(span, "click").unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn owned_globals_released_on_destroy() {
        let (mut rt, _, inner, _) = nested();
        let log: Log = Rc::default();
        rt.register_global(inner, "resize", recorder(&log, "owned")).unwrap();
        rt.on_global("resize", recorder(&log, "free"));
        assert_eq!(rt.global_count("resize"), 2);
        rt.destroy(inner);
        assert_eq!(rt.global_count("resize"), 1);
        let body = rt.dom().body();
        rt.fire(body, "resize").unwrap();
        assert_eq!(*log.borrow(), vec!["free"]);
    }

    #[test]
    fn release_global_only_touches_own_handlers() {
        let (mut rt, outer, inner, _) = nested();
        let mine = rt.register_global(inner, "scroll", |_, _| Ok(())).unwrap();
        rt.register_global(outer, "scroll", |_, _| Ok(())).unwrap();
        assert_eq!(rt.release_global(outer, "scroll", Some(mine)).unwrap(), 0);
        assert_eq!(rt.release_global(inner, "scroll", None).unwrap(), 1);
        assert_eq!(rt.global_count("scroll"), 1);
    }

    #[test]
    fn subscriptions_and_bound_events_are_listed() {
        let (mut rt, outer, inner, _) = nested();
        rt.register_event(inner, "input", None, |_, _| Ok(())).unwrap();
        rt.register_event(inner, "click", Some(".btn"), |_, _| Ok(())).unwrap();
        rt.on_global("resize", |_, _| Ok(()));
        assert_eq!(rt.subscriptions(), vec!["click", "input", "resize"]);
        assert_eq!(rt.bound_events(inner).unwrap(), vec!["click", "input"]);
        assert!(rt.bound_events(outer).unwrap().is_empty());
        rt.release_event(inner, Some("input"), None, None).unwrap();
        assert_eq!(rt.bound_events(inner).unwrap(), vec!["click"]);
    }

    #[test]
    fn events_outside_a_render_are_never_deferred() {
        let (mut rt, _, inner, span) = nested();
        rt.register_event(inner, "click", None, |_, _| Ok(())).unwrap();
        let event = rt.fire(span, "click").unwrap().unwrap();
        assert!(!event.is_deferred());
        assert!(!rt.emit(inner, "changed", Map::new()).unwrap().is_deferred());
        assert_eq!(rt.deferred_count(), 0);
    }

    #[test]
    fn bad_selector_is_rejected() {
        let (mut rt, outer, ..) = nested();
        let err = rt.register_event(outer, "click", Some("[x"), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, Error::Selector { ref selector, .. } if selector == "[x"));
    }

    #[test]
    fn origin_outside_any_component_reaches_globals_only() {
        let (mut rt, outer, ..) = nested();
        let log: Log = Rc::default();
        rt.register_event(outer, "click", None, recorder(&log, "outer")).unwrap();
        rt.on_global("click", recorder(&log, "global"));
        let body = rt.dom().body();
        rt.fire(body, "click").unwrap();
        assert_eq!(*log.borrow(), vec!["global"]);
    }
}
