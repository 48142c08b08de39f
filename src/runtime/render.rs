//! Destructive re-render of an instance's contents from its template.

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::Runtime;
use crate::component::{ComponentId, Template};
use crate::dom::markup::parse_fragment;
use crate::dom::node::NodeId;
use crate::error::{Error, Result};

/// Upper bound on renders chained by context changes made during a render.
const MAX_RENDER_PASSES: usize = 16;

impl Runtime {
    /// Re-create the element's contents from the template and current context.
    ///
    /// Descendant instances are destroyed before the template runs; the new
    /// markup is then parsed for components. A render requested while this
    /// instance is already rendering runs once after the in-flight one.
    /// Events emitted while descendants are being swapped are dispatched
    /// after the outermost render finishes. Without a template this is a no-op.
    pub fn render(&mut self, id: ComponentId) -> Result<()> {
        let inst = self.live_mut(id)?;
        if inst.rendering {
            trace!(?id, "render requested during render, deferred");
            inst.render_pending = true;
            return Ok(());
        }
        inst.rendering = true;

        let mut result;
        let mut passes = 0;
        loop {
            passes += 1;
            result = self.render_once(id);
            let Some(inst) = self.instances.get_mut(id) else {
                break;
            };
            if result.is_err() || !inst.render_pending || !inst.state.is_alive() {
                inst.render_pending = false;
                break;
            }
            inst.render_pending = false;
            if passes >= MAX_RENDER_PASSES {
                warn!(name = %inst.name, passes, "render keeps re-triggering itself, giving up");
                break;
            }
        }
        if let Some(inst) = self.instances.get_mut(id) {
            inst.rendering = false;
        }

        let flushed = self.flush_deferred();
        result.and(flushed)
    }

    fn render_once(&mut self, id: ComponentId) -> Result<()> {
        let inst = self.live_mut(id)?;
        let Some(template) = inst.def.template().cloned() else {
            trace!(?id, "no template, nothing to render");
            return Ok(());
        };
        let element = inst.element;

        self.swap_depth += 1;
        let result = self.swap_contents(id, element, &template);
        self.swap_depth -= 1;
        result
    }

    /// Two-phase swap: destroy the descendant snapshot, then build and parse
    /// the new contents.
    fn swap_contents(&mut self, id: ComponentId, element: NodeId, template: &Template) -> Result<()> {
        for child in self.descendant_components(element) {
            self.destroy(child);
        }
        // A descendant's destroy hook may have taken this instance down too.
        let Some(inst) = self.instances.get_mut(id).filter(|i| i.state.is_alive()) else {
            return Ok(());
        };
        inst.render_count += 1;
        let context: Map<String, Value> = inst.context.clone();
        let name = inst.name.clone();

        let markup = template(&context);
        let fresh = self.template_root(&name, &markup)?;

        self.dom.clear_children(element);
        let kids = self.dom.children(fresh).to_vec();
        for kid in kids {
            self.dom.append_child(element, kid)?;
        }
        let marker = self.config.marker_attribute.clone();
        let attributes = self
            .dom
            .get(fresh)
            .map(|d| d.attributes.clone())
            .unwrap_or_default();
        if let Some(data) = self.dom.get_mut(element) {
            for (attr, value) in attributes {
                if attr != marker {
                    data.set_attr(&attr, value);
                }
            }
        }
        self.dom.remove(fresh);
        debug!(name = %name, ?id, "rendered");

        self.parse(Some(element), true)?;
        Ok(())
    }

    /// Parse template output and check it has exactly one root element.
    fn template_root(&mut self, name: &str, markup: &str) -> Result<NodeId> {
        let roots = parse_fragment(&mut self.dom, markup)?;
        let mut elements = Vec::new();
        let mut stray_text = false;
        for &node in &roots {
            match self.dom.get(node) {
                Some(data) if data.is_element() => elements.push(node),
                Some(data) => {
                    if data.text.as_deref().is_some_and(|t| !t.trim().is_empty()) {
                        stray_text = true;
                    }
                }
                None => {}
            }
        }
        if elements.len() == 1 && !stray_text {
            let root = elements[0];
            for node in roots.into_iter().filter(|&n| n != root) {
                self.dom.remove(node);
            }
            return Ok(root);
        }
        for node in roots {
            self.dom.remove(node);
        }
        Err(Error::MalformedTemplateOutput {
            component: name.to_owned(),
            roots: elements.len(),
        })
    }

    /// Dispatch events deferred during a swap, once no swap is in flight.
    fn flush_deferred(&mut self) -> Result<()> {
        if self.swap_depth > 0 {
            return Ok(());
        }
        let mut first_error = None;
        while let Some(event) = self.dispatcher.next_deferred() {
            if let Err(err) = self.handle_event(event) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Behavior, ComponentDef};
    use crate::dom::markup::{inner_html, outer_html};
    use serde_json::json;
    use std::any::Any;
    use std::cell::RefCell;

    thread_local! {
        static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn log(entry: impl Into<String>) {
        LOG.with(|l| l.borrow_mut().push(entry.into()));
    }

    fn take_log() -> Vec<String> {
        LOG.with(|l| std::mem::take(&mut *l.borrow_mut()))
    }

    macro_rules! any_impls {
        () => {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        };
    }

    /// Component whose element is a direct child of `this`'s element.
    fn parent_of(rt: &Runtime, this: ComponentId) -> Option<ComponentId> {
        let element = rt.element(this).ok()?;
        rt.dom().parent(element).and_then(|p| rt.component_of(p))
    }

    /// Marks its parent's context once.
    #[derive(Default)]
    struct Bump;

    impl Behavior for Bump {
        fn init(&mut self, rt: &mut Runtime, this: ComponentId) -> Result<()> {
            if let Some(parent) = parent_of(rt, this) {
                rt.set_render_context(parent, &ctx(json!({"bumped": true})))?;
            }
            Ok(())
        }

        any_impls!();
    }

    /// Increments its parent's counter every time it is created.
    #[derive(Default)]
    struct Spin;

    impl Behavior for Spin {
        fn init(&mut self, rt: &mut Runtime, this: ComponentId) -> Result<()> {
            if let Some(parent) = parent_of(rt, this) {
                let n = rt.context(parent)?.get("n").and_then(Value::as_u64).unwrap_or(0);
                rt.set_render_context(parent, &ctx(json!({"n": n + 1})))?;
            }
            Ok(())
        }

        any_impls!();
    }

    /// Announces itself from `init`.
    #[derive(Default)]
    struct Herald;

    impl Behavior for Herald {
        fn init(&mut self, rt: &mut Runtime, this: ComponentId) -> Result<()> {
            let event = rt.emit(this, "ready", Map::new())?;
            log(format!(
                "emit deferred={} prevented={}",
                event.is_deferred(),
                event.default_prevented()
            ));
            Ok(())
        }

        any_impls!();
    }

    /// Cancels every "ready" announcement from inside it.
    #[derive(Default)]
    struct Gate;

    impl Behavior for Gate {
        fn setup(&mut self, rt: &mut Runtime, this: ComponentId) -> Result<()> {
            rt.register_event(this, "ready", None, |rt, ev| {
                ev.prevent_default();
                log(format!("gate handler, queued {}", rt.deferred_count()));
                Ok(())
            })?;
            Ok(())
        }

        any_impls!();
    }

    fn host(child: &'static str) -> ComponentDef {
        ComponentDef::plain()
            .with_template(move |_| format!(r#"<div><b data-component="{child}"></b></div>"#))
    }

    fn ctx(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[derive(Default)]
    struct Count;

    impl Behavior for Count {
        fn initial_context(&self, _options: &Map<String, Value>) -> Map<String, Value> {
            ctx(json!({"count": 0}))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn counter() -> ComponentDef {
        ComponentDef::of::<Count>().with_template(|c| format!("<div>{}</div>", c["count"]))
    }

    #[test]
    fn set_render_context_renders_once_per_change() {
        let mut rt = Runtime::new();
        rt.register("counter", counter());
        let id = rt.create("counter", Map::new()).unwrap();
        assert_eq!(rt.render_count(id).unwrap(), 1);

        assert!(rt.set_render_context(id, &ctx(json!({"count": 1}))).unwrap());
        assert!(!rt.set_render_context(id, &ctx(json!({"count": 1}))).unwrap());
        assert_eq!(rt.render_count(id).unwrap(), 2);
        let el = rt.element(id).unwrap();
        assert_eq!(inner_html(rt.dom(), el), "1");
    }

    #[test]
    fn replace_render_context_drops_missing_keys() {
        let mut rt = Runtime::new();
        rt.register("counter", counter());
        let id = rt.create("counter", Map::new()).unwrap();
        rt.set_render_context(id, &ctx(json!({"extra": true}))).unwrap();
        rt.replace_render_context(id, ctx(json!({"count": 5}))).unwrap();
        assert_eq!(Value::Object(rt.context(id).unwrap().clone()), json!({"count": 5}));
    }

    #[test]
    fn template_attributes_are_copied_marker_kept() {
        let mut rt = Runtime::new();
        rt.register(
            "tag",
            ComponentDef::plain()
                .with_template(|_| r#"<span class="t" data-component="other">x</span>"#.into()),
        );
        let id = rt.create("tag", Map::new()).unwrap();
        let el = rt.element(id).unwrap();
        insta::assert_snapshot!(
            outer_html(rt.dom(), el),
            @r#"<div data-component="tag" class="t">x</div>"#
        );
    }

    #[test]
    fn whitespace_around_root_is_tolerated() {
        let mut rt = Runtime::new();
        rt.register("ws", ComponentDef::plain().with_template(|_| "\n  <p>ok</p>\n".into()));
        let id = rt.create("ws", Map::new()).unwrap();
        assert_eq!(rt.dom().text_content(rt.element(id).unwrap()), "ok");
    }

    #[test]
    fn two_roots_are_rejected() {
        let mut rt = Runtime::new();
        rt.register("bad", ComponentDef::plain().with_template(|_| "<a></a><b></b>".into()));
        let nodes_before = rt.dom().len();
        let err = rt.create("bad", Map::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedTemplateOutput { ref component, roots: 2 } if component == "bad"
        ));
        assert_eq!(rt.dom().len(), nodes_before);
        assert_eq!(rt.instance_count(), 0);
    }

    #[test]
    fn stray_text_is_rejected() {
        let mut rt = Runtime::new();
        rt.register("bad", ComponentDef::plain().with_template(|_| "hi <a></a>".into()));
        assert!(matches!(
            rt.create("bad", Map::new()),
            Err(Error::MalformedTemplateOutput { roots: 1, .. })
        ));
    }

    #[test]
    fn render_without_template_is_noop() {
        let mut rt = Runtime::new();
        rt.register("plain", ComponentDef::plain());
        let id = rt.create("plain", Map::new()).unwrap();
        rt.render(id).unwrap();
        assert_eq!(rt.render_count(id).unwrap(), 0);
    }

    #[test]
    fn render_recreates_children() {
        let mut rt = Runtime::new();
        rt.register("leaf", ComponentDef::plain());
        rt.register(
            "parent",
            ComponentDef::plain().with_template(|_| r#"<div><i data-component="leaf"></i></div>"#.into()),
        );
        let id = rt.create("parent", Map::new()).unwrap();
        let first = rt.instance_of("leaf").unwrap();
        rt.render(id).unwrap();
        let second = rt.instance_of("leaf").unwrap();
        assert_ne!(first, second);
        assert!(!rt.is_component(first));
        assert_eq!(rt.instances_of("leaf").len(), 1);
    }

    #[test]
    fn render_requested_during_render_runs_once_afterwards() {
        let mut rt = Runtime::new();
        rt.register("bump", ComponentDef::of::<Bump>());
        rt.register("host", host("bump"));
        let id = rt.create("host", Map::new()).unwrap();
        assert_eq!(rt.render_count(id).unwrap(), 2);
        assert_eq!(rt.context(id).unwrap().get("bumped"), Some(&json!(true)));
        assert_eq!(rt.instances_of("bump").len(), 1);
    }

    #[test]
    fn self_retriggering_render_stops_at_the_pass_limit() {
        let mut rt = Runtime::new();
        rt.register("spin", ComponentDef::of::<Spin>());
        rt.register("host", host("spin"));
        let id = rt.create("host", Map::new()).unwrap();
        assert_eq!(rt.render_count(id).unwrap(), MAX_RENDER_PASSES);
        assert_eq!(rt.context(id).unwrap()["n"], json!(MAX_RENDER_PASSES));
        assert_eq!(rt.instances_of("spin").len(), 1);
    }

    #[test]
    fn events_emitted_during_a_swap_are_flushed_after_it() {
        take_log();
        let mut rt = Runtime::new();
        rt.register("herald", ComponentDef::of::<Herald>());
        rt.register("gate", ComponentDef::of::<Gate>().with_template(|_| {
            r#"<div><i data-component="herald"></i></div>"#.into()
        }));
        rt.create("gate", Map::new()).unwrap();
        assert_eq!(
            take_log(),
            vec!["emit deferred=true prevented=false", "gate handler, queued 0"]
        );
        assert_eq!(rt.deferred_count(), 0);

        let herald = rt.instance_of("herald").unwrap();
        let event = rt.emit(herald, "ready", Map::new()).unwrap();
        assert!(!event.is_deferred());
        assert!(event.default_prevented());
    }

    #[test]
    fn malformed_render_leaves_no_stale_components_behind() {
        let mut rt = Runtime::new();
        rt.register("leaf", ComponentDef::plain());
        rt.register(
            "flaky",
            ComponentDef::plain().with_template(|c| {
                if c.get("broken").and_then(Value::as_bool).unwrap_or(false) {
                    "<a></a><b></b>".into()
                } else {
                    r#"<div><p>kept</p><i data-component="leaf"></i></div>"#.into()
                }
            }),
        );
        let id = rt.create("flaky", Map::new()).unwrap();
        let el = rt.element(id).unwrap();
        let leaf = rt.instance_of("leaf").unwrap();
        let leaf_el = rt.element(leaf).unwrap();

        let err = rt.set_render_context(id, &ctx(json!({"broken": true}))).unwrap_err();
        assert!(matches!(err, Error::MalformedTemplateOutput { roots: 2, .. }));
        assert!(!rt.is_component(leaf));
        assert!(!rt.dom().contains(leaf_el));
        assert_eq!(inner_html(rt.dom(), el), "<p>kept</p>");

        rt.register_event(id, "click", None, |_, _| Ok(())).unwrap();
        rt.fire(el, "click").unwrap();
        assert!(rt.instance_of("leaf").is_none());
        assert!(rt.is_component(id));
    }
}
