//! CSS Syntax Module Level 3 — component value trees for single property values.
//! Spec: <https://www.w3.org/TR/css-syntax-3/#component-value>
//!
//! A value string such as `1px env(--gap, 2px) / auto` is tokenized with
//! `cssparser` and stored as an ordered tree of functions, blocks and leaves.
//! Whitespace is kept on the nodes themselves, so serializing an unmodified
//! tree reproduces the input exactly and edits keep the surrounding spacing.

#![forbid(unsafe_code)]

mod node;
mod parser;
mod tree;

pub use indextree::NodeId;
pub use node::{BlockDelimiter, Raws, ValueKind, ValueNode};
pub use parser::{ParseError, ParseErrorKind};
pub use tree::ValueTree;

/// Parse `text` into a [`ValueTree`].
///
/// # Errors
/// See [`ValueTree::parse`].
#[inline]
pub fn parse(text: &str) -> Result<ValueTree, ParseError> {
    ValueTree::parse(text)
}

/// Serialize a tree back to text.
#[inline]
#[must_use]
pub fn stringify(tree: &ValueTree) -> String {
    tree.to_string()
}
