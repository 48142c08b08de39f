//! Selector engine: tokenizer, parser, and matcher for the CSS-like selectors
//! used to scope event bindings and component queries.

pub mod tokenizer;
pub mod model;
pub mod parser;
pub mod matcher;

pub use matcher::{matches, matches_list};
pub use model::{Selector, SelectorList};
pub use parser::{parse_selector_list, ParseError};
