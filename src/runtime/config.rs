//! Runtime configuration: marker attributes and the host query/wrap collaborators.

use std::fmt;
use std::rc::Rc;

use crate::dom::node::NodeId;
use crate::dom::tree::Dom;
use crate::error::{Error, Result};
use crate::selector::parse_selector_list;

/// `(dom, scope, selector) -> matches`, used by `find` and friends.
pub type QueryFn = Rc<dyn Fn(&Dom, NodeId, &str) -> Result<Vec<NodeId>>>;

/// `(dom, matches) -> selection`, applied to `find` results.
pub type WrapFn = Rc<dyn Fn(&Dom, Vec<NodeId>) -> Selection>;

/// Default attribute naming an element's component.
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-component";

/// Default attribute carrying a JSON options object.
pub const DEFAULT_OPTIONS_ATTRIBUTE: &str = "data-options";

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Wrapped result of [`Runtime::find`](crate::runtime::Runtime::find).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(pub Vec<NodeId>);

impl Selection {
    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn first(&self) -> Option<NodeId> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Selection {
    type Item = NodeId;
    type IntoIter = std::vec::IntoIter<NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Built-in query: descendants of `scope` matching `selector`, document order.
pub fn default_query(dom: &Dom, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
    let list = parse_selector_list(selector).map_err(|source| Error::Selector {
        selector: selector.to_owned(),
        source,
    })?;
    Ok(dom.query_selector_all(scope, &list))
}

/// Built-in wrap: identity.
pub fn default_wrap(_dom: &Dom, nodes: Vec<NodeId>) -> Selection {
    Selection(nodes)
}

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Options accepted by [`Runtime::init`](crate::runtime::Runtime::init).
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Attribute whose value names the component bound to an element.
    pub marker_attribute: String,
    /// Attribute holding a JSON object merged over the definition's defaults.
    pub options_attribute: String,
    pub query: QueryFn,
    pub wrap: WrapFn,
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("marker_attribute", &self.marker_attribute)
            .field("options_attribute", &self.options_attribute)
            .finish_non_exhaustive()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_owned(),
            options_attribute: DEFAULT_OPTIONS_ATTRIBUTE.to_owned(),
            query: Rc::new(default_query),
            wrap: Rc::new(default_wrap),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the marker attribute (builder).
    pub fn with_marker_attribute(mut self, name: impl Into<String>) -> Self {
        self.marker_attribute = name.into().to_ascii_lowercase();
        self
    }

    /// Set the options attribute (builder).
    pub fn with_options_attribute(mut self, name: impl Into<String>) -> Self {
        self.options_attribute = name.into().to_ascii_lowercase();
        self
    }

    /// Replace the query collaborator (builder).
    pub fn with_query(
        mut self,
        query: impl Fn(&Dom, NodeId, &str) -> Result<Vec<NodeId>> + 'static,
    ) -> Self {
        self.query = Rc::new(query);
        self
    }

    /// Replace the wrap collaborator (builder).
    pub fn with_wrap(mut self, wrap: impl Fn(&Dom, Vec<NodeId>) -> Selection + 'static) -> Self {
        self.wrap = Rc::new(wrap);
        self
    }
}
