// src/extractors/accessor.rs
//! Path-based field access over a parsed notice.
//!
//! A path is a short list of [`Step`]s walked from a starting element.
//! Repeated siblings fan out, missing elements end that branch quietly, and
//! the walk is lazy: nothing is collected until the caller asks.

use crate::ted::models::{OneOrMany, RawFields};
use roxmltree::Node;

/// One hop of a field path. Elements are matched on their local name, so
/// the TED export namespace never has to be spelled out.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Direct children with this tag.
    Child(&'static str),
    /// Direct children whose tag starts with any of these prefixes.
    ChildWithPrefix(&'static [&'static str]),
    /// Any element below the current one with this tag.
    Descendant(&'static str),
    /// Attribute of the current element; ends the path.
    Attr(&'static str),
    /// Trimmed text of the current element; ends the path.
    Text,
}

/// How many values a field is allowed to carry once sanitized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one value; an empty field fails the document.
    Compulsory,
    /// Zero or one value; an empty field is dropped.
    Optional,
    /// Zero or more values, kept in document order.
    Repeated,
}

/// A declarative extraction rule: where a field lives and how many values it may have.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub key: &'static str,
    pub path: &'static [Step],
    pub cardinality: Cardinality,
}

impl FieldRule {
    pub const fn new(key: &'static str, path: &'static [Step], cardinality: Cardinality) -> Self {
        Self { key, path, cardinality }
    }
}

/// Looks up the rule for `key` in a rule table.
#[cfg(test)]
pub fn rule_for<'r>(rules: &'r [FieldRule], key: &str) -> Option<&'r FieldRule> {
    rules.iter().find(|rule| rule.key == key)
}

pub fn is_named(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn has_prefix(node: &Node, prefixes: &[&str]) -> bool {
    node.is_element() && prefixes.iter().any(|p| node.tag_name().name().starts_with(p))
}

/// Trimmed text directly held by an element, if any.
pub fn node_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.text().map(str::trim).filter(|text| !text.is_empty())
}

/// Elements reached by following the element steps of `path`.
/// Terminal steps (`Attr`, `Text`) are ignored here.
pub fn select<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    path: &'static [Step],
) -> Box<dyn Iterator<Item = Node<'a, 'input>> + 'a> {
    match path.split_first() {
        None => Box::new(std::iter::once(node)),
        Some((step, rest)) => match *step {
            Step::Child(name) => Box::new(
                node.children()
                    .filter(move |child| is_named(child, name))
                    .flat_map(move |child| select(child, rest)),
            ),
            Step::ChildWithPrefix(prefixes) => Box::new(
                node.children()
                    .filter(move |child| has_prefix(child, prefixes))
                    .flat_map(move |child| select(child, rest)),
            ),
            Step::Descendant(name) => Box::new(
                node.descendants()
                    .skip(1)
                    .filter(move |d| is_named(d, name))
                    .flat_map(move |d| select(d, rest)),
            ),
            Step::Attr(_) | Step::Text => Box::new(std::iter::once(node)),
        },
    }
}

/// First element reached by `path`, if any.
pub fn select_first<'a, 'input: 'a>(node: Node<'a, 'input>, path: &'static [Step]) -> Option<Node<'a, 'input>> {
    select(node, path).next()
}

/// Scalar leaves reachable from `node` along `path`, flattened across repeated
/// elements in document order. A path without a terminal step yields element text.
pub fn retrieve<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    path: &'static [Step],
) -> Box<dyn Iterator<Item = &'a str> + 'a> {
    match path.split_first() {
        None => Box::new(node_text(node).into_iter()),
        Some((Step::Attr(name), _)) => Box::new(node.attribute(*name).into_iter()),
        Some((Step::Text, _)) => Box::new(node_text(node).into_iter()),
        Some((_, _)) => {
            let (elements, leaf) = split_leaf(path);
            Box::new(select(node, elements).flat_map(move |el| retrieve(el, leaf)))
        }
    }
}

/// Splits a path into its element steps and the (possibly empty) terminal tail.
fn split_leaf(path: &'static [Step]) -> (&'static [Step], &'static [Step]) {
    let at = path
        .iter()
        .position(|step| matches!(step, Step::Attr(_) | Step::Text))
        .unwrap_or(path.len());
    path.split_at(at)
}

/// Arity-collapsed lookup: nothing → `None`, one hit → `One`, several → `Many`.
pub fn get_value<'a, 'input: 'a>(node: Node<'a, 'input>, path: &'static [Step]) -> Option<OneOrMany<&'a str>> {
    OneOrMany::from_vec(retrieve(node, path).collect())
}

/// All values for `path`, owned, in document order.
pub fn values(node: Node, path: &'static [Step]) -> Vec<String> {
    retrieve(node, path).map(str::to_string).collect()
}

/// Runs every rule of a table against `node`, flattening each arity-collapsed
/// lookup back into the raw list shape.
pub fn extract_fields(node: Node, rules: &[FieldRule]) -> RawFields {
    let mut fields = RawFields::new();
    for rule in rules {
        let found = get_value(node, rule.path).map(OneOrMany::into_vec).unwrap_or_default();
        fields.insert(rule.key, found.into_iter().map(str::to_string).collect());
    }
    fields
}
