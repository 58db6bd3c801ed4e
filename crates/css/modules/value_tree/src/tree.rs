//! Arena-backed value tree: navigation, serialization and splicing.

use core::fmt::{Display, Formatter, Result as FmtResult};

use indextree::{Arena, Node, NodeId};

use crate::node::ValueNode;
use crate::parser::{ParseError, parse_into};

/// A parsed value string.
///
/// Nodes live in an [`Arena`] and are addressed by [`NodeId`]; the arena keeps
/// every parent link pointing at the structural parent, so splicing is a
/// matter of inserting and detaching ids.
#[derive(Clone, Debug)]
pub struct ValueTree {
    arena: Arena<ValueNode>,
    root: NodeId,
}

impl ValueTree {
    /// Parse a value string.
    ///
    /// # Errors
    /// Returns [`ParseError`] when the text has an unclosed function, block or
    /// string, a malformed url, or an unmatched closing bracket.
    #[inline]
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut arena = Arena::new();
        let root = parse_into(text, &mut arena)?;
        Ok(Self { arena, root })
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ValueNode> {
        if !self.contains(id) {
            return None;
        }
        self.arena.get(id).map(Node::get)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ValueNode> {
        if !self.contains(id) {
            return None;
        }
        self.arena.get_mut(id).map(Node::get_mut)
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(Node::parent)
    }

    /// Snapshot of the children of `id`, in order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    #[inline]
    #[must_use]
    pub fn has_children(&self, id: NodeId) -> bool {
        id.children(&self.arena).next().is_some()
    }

    /// Top-level nodes, i.e. the parsed sequence.
    #[must_use]
    pub fn top_level(&self) -> Vec<NodeId> {
        self.children(self.root)
    }

    /// Whether `id` refers to a node still attached to this tree.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some() && !id.is_removed(&self.arena)
    }

    /// Serialize a single node with its leading whitespace and descendants.
    #[must_use]
    pub fn node_to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serialize the children of `id` (each with its leading whitespace),
    /// excluding the container's own trailing whitespace.
    #[must_use]
    pub fn children_to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in id.children(&self.arena) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        out.push_str(&node.raws.before);
        node.write_opening(out);
        for child in id.children(&self.arena) {
            self.write_node(child, out);
        }
        out.push_str(&node.raws.after);
        out.push_str(node.closing_text());
    }

    /// Copy the top-level sequence of `source` in front of `anchor`.
    ///
    /// Every copied node gets a fresh id in this arena; nothing is shared with
    /// `source`. Returns the ids of the inserted top-level copies.
    pub fn clone_sequence_before(&mut self, source: &Self, anchor: NodeId) -> Vec<NodeId> {
        let mut inserted = Vec::new();
        for child in source.root.children(&source.arena) {
            if let Some(copy) = self.copy_subtree(source, child) {
                anchor.insert_before(copy, &mut self.arena);
                inserted.push(copy);
            }
        }
        inserted
    }

    /// Recursively copy `id` from `source` into this arena as a detached subtree.
    fn copy_subtree(&mut self, source: &Self, id: NodeId) -> Option<NodeId> {
        let payload = source.node(id)?.duplicate();
        let is_container = payload.kind.is_container();
        let copy = self.arena.new_node(payload);
        if is_container {
            for child in id.children(&source.arena) {
                if let Some(child_copy) = self.copy_subtree(source, child) {
                    copy.append(child_copy, &mut self.arena);
                }
            }
        }
        Some(copy)
    }

    /// Replace `target` with a private copy of `replacement`'s top-level sequence.
    ///
    /// The first inserted node takes over `target`'s leading whitespace so the
    /// replacement occupies the same position. An empty replacement simply
    /// removes `target`. Returns the inserted ids.
    pub fn replace_with(&mut self, target: NodeId, replacement: &Self) -> Vec<NodeId> {
        if !self.contains(target) || target == self.root {
            return Vec::new();
        }
        let before = self
            .node(target)
            .map(|node| node.raws.before.clone())
            .unwrap_or_default();
        let inserted = self.clone_sequence_before(replacement, target);
        if let Some(first) = inserted.first().copied()
            && let Some(node) = self.node_mut(first)
        {
            node.raws.before = before;
        }
        target.remove_subtree(&mut self.arena);
        inserted
    }
}

impl Display for ValueTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.node_to_string(self.root))
    }
}

impl PartialEq for ValueTree {
    /// Trees compare by the text they serialize to.
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for ValueTree {}
