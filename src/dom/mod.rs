//! DOM substrate: slotmap-backed element tree, selector queries, markup.

pub mod node;
pub mod tree;
pub mod query;
pub mod markup;

pub use markup::{inner_html, outer_html, parse_fragment, MarkupError};
pub use node::{NodeData, NodeId};
pub use tree::Dom;
