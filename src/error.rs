//! Crate-wide error type.

use crate::dom::markup::MarkupError;
use crate::selector::parser::ParseError;

/// Errors surfaced by the runtime.
///
/// Unknown component names met while parsing are recovered locally (the
/// element is skipped and a warning is logged); they only surface from
/// [`Runtime::create`](crate::runtime::Runtime::create), where the caller asked
/// for a specific name.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no component registered under `{0}`")]
    UnknownComponentName(String),

    #[error("component instance is destroyed or was never created")]
    UseAfterDestroy,

    #[error("element is already bound to a live `{existing}` instance")]
    DuplicateElementBinding { existing: String },

    #[error("template for `{component}` must produce exactly one root element, got {roots}")]
    MalformedTemplateOutput { component: String, roots: usize },

    #[error("invalid selector `{selector}`: {source}")]
    Selector {
        selector: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("node does not exist in the document")]
    MissingNode,

    #[error("cannot insert a node relative to itself or inside its own subtree")]
    HierarchyRequest,

    #[error("{} handler(s) failed while dispatching `{event}`: {}", .failures.len(), .failures.join("; "))]
    HandlersFailed { event: String, failures: Vec<String> },

    /// Free-form failure raised by user handlers and hooks.
    #[error("{0}")]
    Handler(String),
}

impl Error {
    /// Convenience constructor for handler code.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
