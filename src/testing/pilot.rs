//! Pilot: programmatic interaction with a headless runtime.
//!
//! The `Pilot` owns a [`Runtime`], loads markup into its document, and
//! provides methods to simulate native events on elements picked by selector
//! and to inspect the resulting document.

use crate::component::{ComponentDef, ComponentId};
use crate::dom::markup::inner_html;
use crate::dom::node::NodeId;
use crate::error::{Error, Result};
use crate::event::{Event, NativeEvent};
use crate::runtime::{Runtime, RuntimeConfig};
use crate::selector::parse_selector_list;

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

/// A headless driver for testing components.
///
/// # Examples
///
/// ```
/// use rivet::component::ComponentDef;
/// use rivet::testing::Pilot;
///
/// let mut pilot = Pilot::new().with_component("panel", ComponentDef::plain());
/// let created = pilot.load(r#"<div data-component="panel"><button>go</button></div>"#).unwrap();
/// assert_eq!(created.len(), 1);
/// assert!(pilot.click("button").unwrap().is_none()); // nothing subscribed yet
/// ```
#[derive(Debug, Default)]
pub struct Pilot {
    runtime: Runtime,
}

impl Pilot {
    /// A pilot over an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pilot whose runtime is initialized with `config`.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut runtime = Runtime::new();
        runtime.init(config);
        Self { runtime }
    }

    /// Register a component definition (builder).
    pub fn with_component(mut self, name: &str, def: ComponentDef) -> Self {
        self.runtime.register(name, def);
        self
    }

    /// Append `markup` to the body and parse it for components.
    pub fn load(&mut self, markup: &str) -> Result<Vec<ComponentId>> {
        let body = self.runtime.dom().body();
        let roots = self.runtime.append_markup(body, markup)?;
        let mut created = Vec::new();
        for root in roots {
            created.extend(self.runtime.parse(Some(root), false)?);
        }
        Ok(created)
    }

    // ── Event simulation ─────────────────────────────────────────────

    /// Fire a native `click` on the first element matching `selector`.
    pub fn click(&mut self, selector: &str) -> Result<Option<Event>> {
        self.fire(selector, "click")
    }

    /// Fire a native event on the first element matching `selector`.
    ///
    /// Returns `Ok(None)` when the root listener is not subscribed to `event`.
    pub fn fire(&mut self, selector: &str, event: &str) -> Result<Option<Event>> {
        let node = self.node(selector)?;
        self.runtime.fire_native(NativeEvent::new(event, node))
    }

    // ── Query ────────────────────────────────────────────────────────

    /// First connected element matching `selector`.
    pub fn node(&self, selector: &str) -> Result<NodeId> {
        let list = parse_selector_list(selector).map_err(|source| Error::Selector {
            selector: selector.to_owned(),
            source,
        })?;
        let dom = self.runtime.dom();
        dom.query_selector(dom.body(), &list).ok_or(Error::MissingNode)
    }

    /// The component bound to the first element matching `selector`.
    pub fn component(&mut self, selector: &str) -> Result<Option<ComponentId>> {
        let node = self.node(selector)?;
        self.runtime.from_element(node)
    }

    /// Serialized contents of the body.
    pub fn html(&self) -> String {
        let dom = self.runtime.dom();
        inner_html(dom, dom.body())
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }
}

// ===========================================================================
// Tests
// ===========================================================================
