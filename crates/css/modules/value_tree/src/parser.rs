//! Builds a value tree from `cssparser` tokens.

use core::fmt::{Display, Formatter, Result as FmtResult};
use core::mem::take;
use std::error::Error;

use cssparser::ParseError as CssParseError;
use cssparser::ParseErrorKind as CssParseErrorKind;
use cssparser::{Parser, ParserInput, Token};
use indextree::{Arena, NodeId};

use crate::node::{BlockDelimiter, ValueKind, ValueNode};

/// Why a value string was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A function or block was still open at the end of input.
    UnclosedBlock,
    /// A quoted string ran into a newline or the end of input.
    UnclosedString,
    /// An unquoted `url(` contained invalid characters.
    BadUrl,
    /// A `)`, `]` or `}` had no matching opener.
    UnexpectedCloser,
    /// The tokenizer reported an error we do not classify further.
    Unexpected,
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::UnclosedBlock => f.write_str("unclosed function or block"),
            Self::UnclosedString => f.write_str("unclosed string"),
            Self::BadUrl => f.write_str("malformed url"),
            Self::UnexpectedCloser => f.write_str("unexpected closing bracket"),
            Self::Unexpected => f.write_str("unexpected token"),
        }
    }
}

/// A value string could not be turned into a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line of the offending token.
    pub line: u32,
    /// 1-based column of the offending token.
    pub column: u32,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} at {}:{}", self.kind, self.line, self.column)
    }
}

impl Error for ParseError {}

type TokenResult<'input, T> = Result<T, CssParseError<'input, ParseErrorKind>>;

/// Parse `text` into `arena` under a fresh root node and return that root.
pub(crate) fn parse_into(text: &str, arena: &mut Arena<ValueNode>) -> Result<NodeId, ParseError> {
    let root = arena.new_node(ValueNode::new(ValueKind::Root, String::new()));
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    match parse_sequence(&mut parser, arena, root) {
        Ok(trailing) => {
            if let Some(node) = arena.get_mut(root) {
                node.get_mut().raws.after = trailing;
            }
            Ok(root)
        }
        Err(error) => Err(convert_error(&error)),
    }
}

fn convert_error(error: &CssParseError<'_, ParseErrorKind>) -> ParseError {
    let kind = match &error.kind {
        CssParseErrorKind::Custom(kind) => *kind,
        CssParseErrorKind::Basic(_) => ParseErrorKind::Unexpected,
    };
    ParseError {
        kind,
        line: error.location.line.saturating_add(1),
        column: error.location.column,
    }
}

/// Append every token of `input` as children of `parent`.
///
/// Returns the whitespace left over after the last child.
fn parse_sequence<'input>(
    input: &mut Parser<'input, '_>,
    arena: &mut Arena<ValueNode>,
    parent: NodeId,
) -> TokenResult<'input, String> {
    let mut before = String::new();
    loop {
        let start = input.position();
        let location = input.current_source_location();
        let Ok(token) = input.next_including_whitespace_and_comments().cloned() else {
            break;
        };
        let raw = input.slice_from(start);
        let kind = match token {
            Token::WhiteSpace(_) => {
                before.push_str(raw);
                continue;
            }
            Token::Comment(_) => ValueKind::Comment(raw.to_owned()),
            Token::Function(_) => ValueKind::Function {
                name: raw.strip_suffix('(').unwrap_or(raw).to_owned(),
            },
            Token::ParenthesisBlock => ValueKind::Block(BlockDelimiter::Parenthesis),
            Token::SquareBracketBlock => ValueKind::Block(BlockDelimiter::SquareBracket),
            Token::CurlyBracketBlock => ValueKind::Block(BlockDelimiter::CurlyBracket),
            Token::QuotedString(_) => ValueKind::Quoted(raw.to_owned()),
            Token::Comma => ValueKind::Comma,
            Token::Delim(_)
            | Token::Colon
            | Token::Semicolon
            | Token::IncludeMatch
            | Token::DashMatch
            | Token::PrefixMatch
            | Token::SuffixMatch
            | Token::SubstringMatch
            | Token::CDO
            | Token::CDC => ValueKind::Operator(raw.to_owned()),
            Token::Ident(_)
            | Token::AtKeyword(_)
            | Token::Hash(_)
            | Token::IDHash(_)
            | Token::UnquotedUrl(_)
            | Token::Number { .. }
            | Token::Percentage { .. }
            | Token::Dimension { .. } => ValueKind::Word(raw.to_owned()),
            Token::BadString(_) => {
                return Err(location.new_custom_error(ParseErrorKind::UnclosedString));
            }
            Token::BadUrl(_) => return Err(location.new_custom_error(ParseErrorKind::BadUrl)),
            Token::CloseParenthesis | Token::CloseSquareBracket | Token::CloseCurlyBracket => {
                return Err(location.new_custom_error(ParseErrorKind::UnexpectedCloser));
            }
        };
        let is_container = kind.is_container();
        let node = arena.new_node(ValueNode::new(kind, take(&mut before)));
        parent.append(node, arena);
        if is_container {
            let inner_end = input.parse_nested_block(|nested| {
                let trailing = parse_sequence(nested, arena, node)?;
                if let Some(entry) = arena.get_mut(node) {
                    entry.get_mut().raws.after = trailing;
                }
                Ok(nested.position())
            })?;
            // cssparser closes blocks implicitly at end of input; we do not.
            if input.slice(inner_end..input.position()).is_empty() {
                return Err(location.new_custom_error(ParseErrorKind::UnclosedBlock));
            }
        }
    }
    Ok(before)
}
