//! Behavior trait and component definitions.
//!
//! A [`ComponentDef`] is what gets registered under a name: a factory that
//! produces a fresh [`Behavior`] per instance, default options, an optional
//! template, and the tag used when a root element has to be synthesized.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::ComponentId;
use crate::error::Result;
use crate::runtime::Runtime;

// ---------------------------------------------------------------------------
// Behavior trait
// ---------------------------------------------------------------------------

/// Per-instance behavior object. Every hook has a no-op default.
///
/// While a hook runs, the behavior is lent out of its instance, so
/// [`Runtime::behavior_mut`] for `this` returns `None` inside the hook (and
/// inside handlers the hook triggers synchronously). Use `self` instead.
/// Hooks that a running hook triggers on `this` (through `update_options`,
/// `append_to`, `destroy` and the like) are delivered right after it returns.
pub trait Behavior {
    /// Register the component's own event bindings.
    fn setup(&mut self, _rt: &mut Runtime, _this: ComponentId) -> Result<()> {
        Ok(())
    }

    /// Initial render context computed from the merged options.
    fn initial_context(&self, _options: &Map<String, Value>) -> Map<String, Value> {
        Map::new()
    }

    /// Called once after setup (and after the first render on the
    /// programmatic path).
    fn init(&mut self, _rt: &mut Runtime, _this: ComponentId) -> Result<()> {
        Ok(())
    }

    /// The element became connected to the document.
    fn on_insert(&mut self, _rt: &mut Runtime, _this: ComponentId) -> Result<()> {
        Ok(())
    }

    /// The element was disconnected from the document.
    fn on_remove(&mut self, _rt: &mut Runtime, _this: ComponentId) -> Result<()> {
        Ok(())
    }

    /// First step of `destroy`; bindings are still registered.
    fn on_destroy(&mut self, _rt: &mut Runtime, _this: ComponentId) -> Result<()> {
        Ok(())
    }

    /// Effective options changed; `previous` is the snapshot before the update.
    fn on_options_changed(
        &mut self,
        _rt: &mut Runtime,
        _this: ComponentId,
        _previous: &Map<String, Value>,
    ) -> Result<()> {
        Ok(())
    }

    /// Dynamic method table used by `Runtime::invoke`.
    ///
    /// Return `None` when `method` is not provided by this behavior.
    fn call(
        &mut self,
        _rt: &mut Runtime,
        _this: ComponentId,
        _method: &str,
        _args: &[Value],
    ) -> Option<Result<Value>> {
        None
    }

    /// Downcast to `&dyn Any` for typed access from handlers.
    fn as_any(&self) -> &dyn Any;

    /// Downcast to `&mut dyn Any` for typed access from handlers.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Behavior with no hooks, for components that are only templates and bindings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Plain;

impl Behavior for Plain {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// ComponentDef
// ---------------------------------------------------------------------------

/// Produces a fresh behavior for each new instance.
pub type Factory = Rc<dyn Fn() -> Box<dyn Behavior>>;

/// Opaque `context -> markup` function.
pub type Template = Rc<dyn Fn(&Map<String, Value>) -> String>;

/// Default tag for synthesized root elements.
pub const DEFAULT_ROOT_TAG: &str = "div";

/// A registrable component definition.
#[derive(Clone)]
pub struct ComponentDef {
    factory: Factory,
    defaults: Map<String, Value>,
    template: Option<Template>,
    root_tag: String,
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("defaults", &self.defaults)
            .field("template", &self.template.is_some())
            .field("root_tag", &self.root_tag)
            .finish()
    }
}

impl ComponentDef {
    /// Definition whose behavior is built by `factory`.
    pub fn new(factory: impl Fn() -> Box<dyn Behavior> + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            defaults: Map::new(),
            template: None,
            root_tag: DEFAULT_ROOT_TAG.to_owned(),
        }
    }

    /// Definition whose behavior is `B::default()`.
    pub fn of<B: Behavior + Default + 'static>() -> Self {
        Self::new(|| Box::new(B::default()))
    }

    /// Definition with the hook-less [`Plain`] behavior.
    pub fn plain() -> Self {
        Self::of::<Plain>()
    }

    /// Replace the default options (builder).
    pub fn with_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set one default option (builder).
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Attach a template (builder).
    pub fn with_template(
        mut self,
        template: impl Fn(&Map<String, Value>) -> String + 'static,
    ) -> Self {
        self.template = Some(Rc::new(template));
        self
    }

    /// Tag of the synthesized root element (builder).
    pub fn with_root_tag(mut self, tag: impl Into<String>) -> Self {
        self.root_tag = tag.into().to_ascii_lowercase();
        self
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn root_tag(&self) -> &str {
        &self.root_tag
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Behavior> {
        (self.factory)()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
