//! Node payloads stored in a value tree arena.

/// Opening character of a simple block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockDelimiter {
    /// `( ... )`
    Parenthesis,
    /// `[ ... ]`
    SquareBracket,
    /// `{ ... }`
    CurlyBracket,
}

impl BlockDelimiter {
    /// Text that opens the block.
    #[inline]
    #[must_use]
    pub const fn open(self) -> &'static str {
        match self {
            Self::Parenthesis => "(",
            Self::SquareBracket => "[",
            Self::CurlyBracket => "{",
        }
    }

    /// Text that closes the block.
    #[inline]
    #[must_use]
    pub const fn close(self) -> &'static str {
        match self {
            Self::Parenthesis => ")",
            Self::SquareBracket => "]",
            Self::CurlyBracket => "}",
        }
    }
}

/// What a node represents. Leaves keep their exact source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// The tree root; owns the top-level sequence.
    Root,
    /// A function call such as `env(...)`. `name` is spelled as in the source.
    Function { name: String },
    /// A parenthesis, square or curly block.
    Block(BlockDelimiter),
    /// Identifiers, numbers, dimensions, hashes, unquoted urls and similar.
    Word(String),
    /// A quoted string including its quotes.
    Quoted(String),
    /// A `,` separator.
    Comma,
    /// Delimiters like `/`, `+`, `*`, `:` or `;`.
    Operator(String),
    /// A `/* ... */` comment.
    Comment(String),
}

impl ValueKind {
    /// Whether nodes of this kind own an ordered child sequence.
    #[inline]
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Root | Self::Function { .. } | Self::Block(_))
    }
}

/// Formatting record attached to every node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Raws {
    /// Whitespace preceding the node.
    pub before: String,
    /// Whitespace after the last child of a container, before its closing text.
    pub after: String,
}

/// A single node of a value tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueNode {
    pub kind: ValueKind,
    pub raws: Raws,
}

impl ValueNode {
    #[inline]
    #[must_use]
    pub fn new(kind: ValueKind, before: String) -> Self {
        Self {
            kind,
            raws: Raws {
                before,
                after: String::new(),
            },
        }
    }

    /// Function name if this node is a function call.
    #[inline]
    #[must_use]
    pub fn function_name(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Function { name } => Some(name),
            ValueKind::Root
            | ValueKind::Block(_)
            | ValueKind::Word(_)
            | ValueKind::Quoted(_)
            | ValueKind::Comma
            | ValueKind::Operator(_)
            | ValueKind::Comment(_) => None,
        }
    }

    /// Copy this node's payload with its own formatting record.
    ///
    /// Children are not part of the payload; the caller rebuilds them in the
    /// destination arena.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let kind = match &self.kind {
            ValueKind::Root => ValueKind::Root,
            ValueKind::Function { name } => ValueKind::Function { name: name.clone() },
            ValueKind::Block(delimiter) => ValueKind::Block(*delimiter),
            ValueKind::Word(text) => ValueKind::Word(text.clone()),
            ValueKind::Quoted(text) => ValueKind::Quoted(text.clone()),
            ValueKind::Comma => ValueKind::Comma,
            ValueKind::Operator(text) => ValueKind::Operator(text.clone()),
            ValueKind::Comment(text) => ValueKind::Comment(text.clone()),
        };
        Self {
            kind,
            raws: Raws {
                before: self.raws.before.clone(),
                after: self.raws.after.clone(),
            },
        }
    }

    /// Append the text that precedes the node's children (the whole text of a leaf).
    pub fn write_opening(&self, out: &mut String) {
        match &self.kind {
            ValueKind::Root => {}
            ValueKind::Function { name } => {
                out.push_str(name);
                out.push('(');
            }
            ValueKind::Block(delimiter) => out.push_str(delimiter.open()),
            ValueKind::Word(text)
            | ValueKind::Quoted(text)
            | ValueKind::Operator(text)
            | ValueKind::Comment(text) => out.push_str(text),
            ValueKind::Comma => out.push(','),
        }
    }

    /// Text written after the node's children; empty for leaves.
    #[must_use]
    pub const fn closing_text(&self) -> &'static str {
        match &self.kind {
            ValueKind::Function { .. } => ")",
            ValueKind::Block(delimiter) => delimiter.close(),
            ValueKind::Root
            | ValueKind::Word(_)
            | ValueKind::Quoted(_)
            | ValueKind::Comma
            | ValueKind::Operator(_)
            | ValueKind::Comment(_) => "",
        }
    }
}
