//! Selector AST: SelectorList, Selector, CompoundSelector, SelectorComponent.

/// A single simple selector.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Type selector: matches the element tag name (e.g. `button`).
    Type(String),
    /// Universal selector: `*`.
    Universal,
    /// Class selector: `.classname`.
    Class(String),
    /// ID selector: `#id`.
    Id(String),
    /// Attribute presence `[name]` or equality `[name=value]`.
    Attribute { name: String, value: Option<String> },
    /// Pseudo-class: `:first-child`, `:last-child`.
    PseudoClass(String),
}

/// A combinator between compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (whitespace): `A B`.
    Descendant,
    /// Child combinator: `A > B`.
    Child,
}

/// A sequence of simple selectors without combinators, e.g. `li.item:first-child`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

impl CompoundSelector {
    /// Create an empty compound selector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component to this compound selector.
    pub fn push(&mut self, component: SelectorComponent) {
        self.components.push(component);
    }
}

/// One element in a selector chain: either a compound selector or a combinator.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorPart {
    Compound(CompoundSelector),
    Combinator(Combinator),
}

/// A complex selector: compound selectors joined by combinators.
///
/// `ul > li.item` has parts
/// `[Compound(ul), Combinator(Child), Compound(li.item)]`.
/// Always starts and ends with a [`SelectorPart::Compound`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector {
    pub parts: Vec<SelectorPart>,
}

/// Comma-separated selectors. Matches when any member matches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
    /// The source text, kept for release-by-selector and diagnostics.
    pub source: String,
}

impl SelectorList {
    /// The selector text as written at registration.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
