//! Selector matching against the DOM arena.

use crate::dom::node::{NodeData, NodeId};
use crate::dom::tree::Dom;
use crate::selector::model::{
    Combinator, CompoundSelector, Selector, SelectorComponent, SelectorList, SelectorPart,
};

/// Whether any selector in `list` matches `node_id`.
pub fn matches_list(list: &SelectorList, node_id: NodeId, dom: &Dom) -> bool {
    list.selectors.iter().any(|sel| matches(sel, node_id, dom))
}

/// Check whether a full selector matches a given node.
///
/// Walks the selector parts from right to left, matching compound selectors
/// and navigating the DOM tree via combinators. Text nodes never match.
pub fn matches(selector: &Selector, node_id: NodeId, dom: &Dom) -> bool {
    match selector.parts.last() {
        Some(SelectorPart::Compound(_)) => matches_from(&selector.parts, node_id, dom),
        _ => false,
    }
}

/// Match `parts` (ending in a compound) with its last compound at `node_id`.
///
/// Descendant combinators try every ancestor, so `div > p span` finds the
/// right `p` even when a nearer ancestor matches `p` alone.
fn matches_from(parts: &[SelectorPart], node_id: NodeId, dom: &Dom) -> bool {
    let Some((SelectorPart::Compound(last), rest)) = parts.split_last() else {
        return false;
    };
    if !matches_compound_at(last, node_id, dom) {
        return false;
    }
    let Some((combinator, rest)) = rest.split_last() else {
        return true;
    };
    let SelectorPart::Combinator(combinator) = combinator else {
        return false;
    };
    match combinator {
        Combinator::Child => dom
            .parent(node_id)
            .is_some_and(|parent| matches_from(rest, parent, dom)),
        Combinator::Descendant => dom
            .ancestors(node_id)
            .into_iter()
            .any(|ancestor| matches_from(rest, ancestor, dom)),
    }
}

fn matches_compound_at(compound: &CompoundSelector, node_id: NodeId, dom: &Dom) -> bool {
    match dom.get(node_id) {
        Some(node) if node.is_element() => compound
            .components
            .iter()
            .all(|component| matches_component(component, node_id, node, dom)),
        _ => false,
    }
}

fn matches_component(
    component: &SelectorComponent,
    node_id: NodeId,
    node: &NodeData,
    dom: &Dom,
) -> bool {
    match component {
        SelectorComponent::Type(name) => node.tag.eq_ignore_ascii_case(name),
        SelectorComponent::Universal => true,
        SelectorComponent::Class(name) => node.has_class(name),
        SelectorComponent::Id(name) => node.id() == Some(name.as_str()),
        SelectorComponent::Attribute { name, value } => match (node.attr(name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        },
        SelectorComponent::PseudoClass(name) => match name.as_str() {
            "first-child" => dom.element_siblings(node_id).first() == Some(&node_id),
            "last-child" => dom.element_siblings(node_id).last() == Some(&node_id),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::NodeData;
    use crate::selector::parser::parse_selector_list;

    /// ```text
    /// body
    ///  └─ ul#menu.nav
    ///      ├─ li.item (first)  ── a[href="/x"]
    ///      └─ li.item.active
    /// ```
    fn build() -> (Dom, NodeId, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let body = dom.body();
        let ul = dom.insert_child(body, NodeData::element("ul").with_id("menu").with_class("nav")).unwrap();
        let li1 = dom.insert_child(ul, NodeData::element("li").with_class("item")).unwrap();
        let link = dom.insert_child(li1, NodeData::element("a").with_attr("href", "/x")).unwrap();
        let li2 = dom.insert_child(
            ul,
            NodeData::element("li").with_class("item").with_class("active"),
        ).unwrap();
        (dom, ul, li1, link, li2)
    }

    fn is(sel: &str, node: NodeId, dom: &Dom) -> bool {
        matches_list(&parse_selector_list(sel).unwrap(), node, dom)
    }

    #[test]
    fn simple_components() {
        let (dom, ul, li1, link, li2) = build();
        assert!(is("ul", ul, &dom));
        assert!(is("UL", ul, &dom));
        assert!(is("#menu", ul, &dom));
        assert!(is(".nav", ul, &dom));
        assert!(is("*", li1, &dom));
        assert!(is("[href]", link, &dom));
        assert!(is("[href='/x']", link, &dom));
        assert!(!is("[href=y]", link, &dom));
        assert!(is("li.item.active", li2, &dom));
        assert!(!is("li.item.active", li1, &dom));
    }

    #[test]
    fn combinator_matching() {
        let (dom, _ul, _li1, link, li2) = build();
        assert!(is("ul a", link, &dom));
        assert!(is("li > a", link, &dom));
        assert!(!is("ul > a", link, &dom));
        assert!(is("#menu > li.active", li2, &dom));
        assert!(!is("ol li", li2, &dom));
    }

    #[test]
    fn descendant_backtracks_past_nearest_candidate() {
        let mut dom = Dom::new();
        let div = dom.insert_child(dom.body(), NodeData::element("div")).unwrap();
        let outer_p = dom.insert_child(div, NodeData::element("p")).unwrap();
        let inner_p = dom.insert_child(outer_p, NodeData::element("p")).unwrap();
        let span = dom.insert_child(inner_p, NodeData::element("span")).unwrap();
        assert!(is("div > p span", span, &dom));
        assert!(!is("section > p span", span, &dom));
    }

    #[test]
    fn structural_pseudo_classes() {
        let (dom, _ul, li1, _link, li2) = build();
        assert!(is("li:first-child", li1, &dom));
        assert!(!is("li:first-child", li2, &dom));
        assert!(is("li:last-child", li2, &dom));
        assert!(!is("li:hover", li1, &dom));
    }

    #[test]
    fn list_matches_any() {
        let (dom, ul, ..) = build();
        assert!(is("ol, .nav", ul, &dom));
    }

    #[test]
    fn text_nodes_never_match() {
        let (mut dom, ul, ..) = build();
        let text = dom.insert_child(ul, NodeData::text("hi")).unwrap();
        assert!(!is("*", text, &dom));
    }
}
