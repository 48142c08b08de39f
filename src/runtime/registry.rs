//! Registry: name -> definition, element -> instance.

use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::Runtime;
use crate::component::{options, ComponentDef, ComponentId};
use crate::dom::node::{NodeData, NodeId};
use crate::error::{Error, Result};

impl Runtime {
    /// Store a definition under `name`.
    ///
    /// Re-registering overwrites with a warning and returns the previous
    /// definition. Live instances keep the definition they were built from
    /// until destroyed.
    pub fn register(&mut self, name: &str, def: ComponentDef) -> Option<Rc<ComponentDef>> {
        let previous = self.definitions.insert(name.to_owned(), Rc::new(def));
        if previous.is_some() {
            warn!(name, "component definition overwritten");
        } else {
            debug!(name, "component registered");
        }
        previous
    }

    /// Destroy every live instance of `name`, then forget the definition.
    ///
    /// The definition is removed first and all instances are retired before
    /// any is destroyed, so no handler of `name` fires once this starts.
    /// Returns the number of instances destroyed; unknown names are a no-op.
    pub fn unregister(&mut self, name: &str) -> usize {
        if self.definitions.remove(name).is_none() {
            return 0;
        }
        let doomed = self.retire(name);
        let count = doomed.len();
        for id in doomed {
            self.destroy(id);
        }
        debug!(name, destroyed = count, "component unregistered");
        count
    }

    /// Destroy every live instance of `name`, keeping the definition.
    pub fn destroy_all(&mut self, name: &str) -> usize {
        let doomed = self.retire(name);
        let count = doomed.len();
        for id in doomed {
            self.destroy(id);
        }
        count
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The instance bound to `node`, constructing one if the element carries
    /// a registered marker.
    ///
    /// Returns `Ok(None)` for unmarked elements, unknown names, and elements
    /// whose instance is being destroyed.
    pub fn from_element(&mut self, node: NodeId) -> Result<Option<ComponentId>> {
        if let Some(id) = self.component_of(node) {
            return Ok(self.is_component(id).then_some(id));
        }
        let Some(name) = self.marker_of(node) else {
            return Ok(None);
        };
        let Some(def) = self.definitions.get(&name).cloned() else {
            warn!(name = %name, "unknown component name, element skipped");
            return Ok(None);
        };
        let options = self.element_options(node, &def);
        self.construct(&name, def, node, options, false).map(Some)
    }

    /// One live instance of `name`, if any.
    pub fn instance_of(&self, name: &str) -> Option<ComponentId> {
        self.instances
            .iter()
            .find(|(_, inst)| inst.name == name && inst.state.is_alive())
            .map(|(id, _)| id)
    }

    /// All live instances of `name`, in document order where connected.
    pub fn instances_of(&self, name: &str) -> Vec<ComponentId> {
        let connected: Vec<ComponentId> = self
            .dom
            .walk_depth_first(self.dom.body())
            .into_iter()
            .filter_map(|n| self.component_of(n))
            .filter(|&id| self.instances[id].name == name && self.is_component(id))
            .collect();
        let detached = self.instances.iter().filter(|(id, inst)| {
            inst.name == name && inst.state.is_alive() && !connected.contains(id)
        });
        let detached: Vec<ComponentId> = detached.map(|(id, _)| id).collect();
        connected.into_iter().chain(detached).collect()
    }

    /// Programmatic construction: synthesize a detached root element and
    /// render it once if the definition has a template.
    pub fn create(&mut self, name: &str, options: Map<String, Value>) -> Result<ComponentId> {
        let def = self
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownComponentName(name.to_owned()))?;
        let element = self.dom.create(
            NodeData::element(def.root_tag()).with_attr(&self.config.marker_attribute, name),
        );
        let merged = options::merged(def.defaults(), &options);
        match self.construct(name, def, element, merged, true) {
            Ok(id) => Ok(id),
            Err(err) => {
                self.dom.remove(element);
                Err(err)
            }
        }
    }

    /// Marker attribute value of an element node.
    pub(crate) fn marker_of(&self, node: NodeId) -> Option<String> {
        let data = self.dom.get(node)?;
        if !data.is_element() {
            return None;
        }
        data.attr(&self.config.marker_attribute)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
    }

    /// Defaults overlaid with the element's options attribute.
    fn element_options(&self, node: NodeId, def: &ComponentDef) -> Map<String, Value> {
        let raw = self
            .dom
            .get(node)
            .and_then(|d| d.attr(&self.config.options_attribute));
        let Some(raw) = raw else {
            return def.defaults().clone();
        };
        match options::parse_object(raw) {
            Ok(overlay) => options::merged(def.defaults(), &overlay),
            Err(reason) => {
                warn!(%reason, "ignoring malformed options attribute");
                def.defaults().clone()
            }
        }
    }

    /// Mark every live instance of `name` as no longer dispatchable.
    fn retire(&mut self, name: &str) -> Vec<ComponentId> {
        let ids = self.instances_of(name);
        for &id in &ids {
            if let Some(inst) = self.instances.get_mut(id) {
                inst.retired = true;
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Behavior;
    use pretty_assertions::assert_eq;
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

    /// Listens for clicks, and clicks every element of its kind on destroy.
    #[derive(Default)]
    struct Noisy;

    impl Behavior for Noisy {
        fn setup(&mut self, rt: &mut Runtime, this: ComponentId) -> Result<()> {
            rt.register_event(this, "click", None, |_, _| {
                log("noisy click");
                Ok(())
            })?;
            Ok(())
        }

        fn on_destroy(&mut self, rt: &mut Runtime, _this: ComponentId) -> Result<()> {
            let marked = rt
                .dom()
                .query_all(|d| d.attr("data-component") == Some("noisy"));
            for node in marked {
                rt.fire(node, "click")?;
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn runtime(markup: &str) -> Runtime {
        let mut rt = Runtime::new();
        let body = rt.dom().body();
        rt.append_markup(body, markup).unwrap();
        rt
    }

    fn first(rt: &Runtime, tag: &str) -> NodeId {
        rt.dom().query_all(|d| d.tag == tag)[0]
    }

    #[test]
    fn register_overwrite_returns_previous() {
        let mut rt = Runtime::new();
        assert!(rt.register("a", ComponentDef::plain()).is_none());
        assert!(rt.register("a", ComponentDef::plain()).is_some());
        assert_eq!(rt.registered_names(), vec!["a"]);
    }

    #[test]
    fn from_element_memoizes() {
        let mut rt = runtime(r#"<section data-component="panel"></section>"#);
        rt.register("panel", ComponentDef::plain());
        let el = first(&rt, "section");
        let a = rt.from_element(el).unwrap().unwrap();
        let b = rt.from_element(el).unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(rt.instance_count(), 1);
    }

    #[test]
    fn from_element_unmarked_or_unknown() {
        let mut rt = runtime(r#"<p></p><div data-component="nope"></div>"#);
        assert_eq!(rt.from_element(first(&rt, "p")).unwrap(), None);
        assert_eq!(rt.from_element(first(&rt, "div")).unwrap(), None);
    }

    #[test]
    fn options_attribute_overlays_defaults() {
        let mut rt = runtime(r#"<div data-component="box" data-options='{"size": 3}'></div>"#);
        rt.register(
            "box",
            ComponentDef::plain().with_default("size", 1).with_default("color", "red"),
        );
        let id = rt.from_element(first(&rt, "div")).unwrap().unwrap();
        assert_eq!(
            Value::Object(rt.options(id).unwrap().clone()),
            json!({"size": 3, "color": "red"})
        );
    }

    #[test]
    fn malformed_options_attribute_falls_back_to_defaults() {
        let mut rt = runtime(r#"<div data-component="box" data-options="{bad"></div>"#);
        rt.register("box", ComponentDef::plain().with_default("size", 1));
        let id = rt.from_element(first(&rt, "div")).unwrap().unwrap();
        assert_eq!(rt.options(id).unwrap()["size"], json!(1));
    }

    #[test]
    fn instances_of_is_a_snapshot() {
        let mut rt = runtime(r#"<i data-component="x"></i><i data-component="x"></i>"#);
        rt.register("x", ComponentDef::plain());
        rt.parse(None, false).unwrap();
        let mut all = rt.instances_of("x");
        assert_eq!(all.len(), 2);
        all.clear();
        assert_eq!(rt.instances_of("x").len(), 2);
        assert!(rt.instance_of("x").is_some());
        assert!(rt.instance_of("y").is_none());
    }

    #[test]
    fn unregister_destroys_and_forgets() {
        let mut rt = runtime(r#"<i data-component="x"></i>"#);
        rt.register("x", ComponentDef::plain());
        let created = rt.parse(None, false).unwrap();
        assert_eq!(rt.unregister("x"), 1);
        assert!(!rt.is_component(created[0]));
        assert!(!rt.is_registered("x"));
        assert_eq!(rt.unregister("x"), 0);
    }

    #[test]
    fn unregister_silences_every_instance_before_destroying_any() {
        take_log();
        let mut rt = runtime(r#"<i data-component="noisy"></i><i data-component="noisy"></i>"#);
        rt.register("noisy", ComponentDef::of::<Noisy>());
        rt.parse(None, false).unwrap();
        rt.on_global("click", |_, _| {
            log("global");
            Ok(())
        });

        let el = first(&rt, "i");
        rt.fire(el, "click").unwrap();
        assert_eq!(take_log(), vec!["noisy click", "global"]);

        assert_eq!(rt.unregister("noisy"), 2);
        assert_eq!(take_log(), vec!["global", "global", "global"]);
        assert_eq!(rt.instance_count(), 0);
    }

    #[test]
    fn destroy_all_keeps_definition() {
        let mut rt = runtime(r#"<i data-component="x"></i>"#);
        rt.register("x", ComponentDef::plain());
        rt.parse(None, false).unwrap();
        assert_eq!(rt.destroy_all("x"), 1);
        assert!(rt.is_registered("x"));
        assert!(rt.instance_of("x").is_none());
    }

    #[test]
    fn create_synthesizes_detached_root() {
        let mut rt = Runtime::new();
        rt.register(
            "card",
            ComponentDef::plain()
                .with_root_tag("article")
                .with_template(|_| "<article class=\"card\"><h1>hi</h1></article>".into()),
        );
        let id = rt.create("card", Map::new()).unwrap();
        let el = rt.element(id).unwrap();
        assert!(!rt.dom().is_connected(el));
        let data = rt.dom().get(el).unwrap();
        assert_eq!(data.tag, "article");
        assert_eq!(data.attr("data-component"), Some("card"));
        assert!(data.has_class("card"));
        assert_eq!(rt.render_count(id).unwrap(), 1);
    }

    #[test]
    fn create_unknown_name_is_an_error() {
        let mut rt = Runtime::new();
        assert!(matches!(
            rt.create("ghost", Map::new()),
            Err(Error::UnknownComponentName(name)) if name == "ghost"
        ));
    }
}
