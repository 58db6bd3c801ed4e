//! CSS Syntax Module Level 3 — Locating declaration values and at-rule preludes.
//! Spec: <https://www.w3.org/TR/css-syntax-3/>
//!
//! The scanner does not build a stylesheet model. It records byte ranges of the
//! text that value rewriters care about so callers can splice replacements into
//! the scanned text without disturbing anything else.
use core::ops::Range;

use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::SourcePosition;
use cssparser::StyleSheetParser;
use cssparser::Token;

/// What kind of text a [`ValueSite`] covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueSiteKind {
    /// The value of a declaration; `property` is lowercased.
    DeclarationValue { property: String },
    /// The prelude of an at-rule, e.g. `(min-width: 600px)` in `@media`.
    AtRulePrelude { name: String },
}

/// A rewritable range of a stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueSite {
    pub kind: ValueSiteKind,
    /// Byte range in the scanned stylesheet, trimmed of surrounding whitespace
    /// and, for declarations, of a trailing `!important`.
    pub span: Range<usize>,
}

impl ValueSite {
    /// The text of this site within `css`.
    #[inline]
    #[must_use]
    pub fn text<'css>(&self, css: &'css str) -> &'css str {
        css.get(self.span.clone()).unwrap_or_default()
    }
}

/// Trim `start..end` of `css` and drop a trailing `!important` when asked.
fn trimmed_span(css: &str, start: usize, end: usize, strip_important: bool) -> Range<usize> {
    let raw = css.get(start..end).unwrap_or_default();
    let mut text = raw.trim_end();
    if strip_important {
        let lowered = text.to_ascii_lowercase();
        if let Some(head) = lowered
            .strip_suffix("important")
            .map(str::trim_end)
            .and_then(|head| head.strip_suffix('!'))
        {
            text = text.get(..head.len()).unwrap_or(text).trim_end();
        }
    }
    let leading = text.len() - text.trim_start().len();
    (start + leading)..(start + text.len())
}

/// Consume the rest of `input` and return where it ended.
fn consume_all(input: &mut Parser) -> SourcePosition {
    while input.next_including_whitespace_and_comments().is_ok() {}
    input.position()
}

/// Collects value sites for every rule level it is handed.
struct SiteCollector<'css> {
    css: &'css str,
    sites: Vec<ValueSite>,
}

impl SiteCollector<'_> {
    /// Walk a rule body (declarations and nested rules) with this collector.
    fn collect_body(&mut self, input: &mut Parser) {
        let body = CssRuleBodyParser::new(input, self);
        for item in body {
            if let Err((error, slice)) = item {
                log::debug!(target: "css_syntax", "skipping invalid rule body item {slice:?}: {error:?}");
            }
        }
    }
}

impl CssDeclarationParser<'_> for SiteCollector<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let start = input.position().byte_index();
        let custom_property = name.starts_with("--");
        while let Ok(token) = input.next_including_whitespace_and_comments() {
            // `a:hover { ... }` in a rule body is a nested rule, not a declaration.
            // Custom properties may hold `{}` blocks.
            if !custom_property && matches!(token, Token::CurlyBracketBlock) {
                return Err(input.new_custom_error(()));
            }
        }
        let end = input.position().byte_index();
        self.sites.push(ValueSite {
            kind: ValueSiteKind::DeclarationValue {
                property: name.to_ascii_lowercase(),
            },
            span: trimmed_span(self.css, start, end, true),
        });
        Ok(())
    }
}

impl CssAtRuleParser<'_> for SiteCollector<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let start = input.position().byte_index();
        let end = consume_all(input).byte_index();
        let span = trimmed_span(self.css, start, end, false);
        if !span.is_empty() {
            self.sites.push(ValueSite {
                kind: ValueSiteKind::AtRulePrelude {
                    name: name.to_ascii_lowercase(),
                },
                span,
            });
        }
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        self.collect_body(input);
        Ok(())
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Ok(())
    }
}

impl CssQualifiedRuleParser<'_> for SiteCollector<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        // Selectors are not value sites.
        consume_all(input);
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        self.collect_body(input);
        Ok(())
    }
}

impl CssRuleBodyItemParser<'_, (), ()> for SiteCollector<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        true
    }
}

/// Find every declaration value and at-rule prelude in `css`, in source order.
///
/// Nested rules inside at-rule blocks (and nested style rules) are included.
/// Invalid constructs are skipped the way a CSS parser would skip them.
pub fn collect_value_sites(css: &str) -> Vec<ValueSite> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut collector = SiteCollector {
        css,
        sites: Vec::new(),
    };
    for rule in StyleSheetParser::new(&mut parser, &mut collector) {
        if let Err((error, slice)) = rule {
            log::debug!(target: "css_syntax", "skipping invalid rule {slice:?}: {error:?}");
        }
    }
    let mut sites = collector.sites;
    sites.sort_by_key(|site| site.span.start);
    sites
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(css: &str) -> Vec<&str> {
        collect_value_sites(css)
            .iter()
            .map(|site| site.text(css))
            .collect()
    }

    #[test]
    fn declaration_values_are_trimmed() {
        let css = "a { color :  red ; margin: 0 auto !important }";
        assert_eq!(texts(css), vec!["red", "0 auto"]);
    }

    #[test]
    fn at_rule_preludes_and_nested_rules() {
        let css = "@media (min-width: env(--bp)) { p { gap: env(--gap) } }\n@import url(x.css) screen;";
        let sites = collect_value_sites(css);
        let found: Vec<(&ValueSiteKind, &str)> =
            sites.iter().map(|site| (&site.kind, site.text(css))).collect();
        assert_eq!(
            found,
            vec![
                (
                    &ValueSiteKind::AtRulePrelude { name: "media".into() },
                    "(min-width: env(--bp))"
                ),
                (
                    &ValueSiteKind::DeclarationValue { property: "gap".into() },
                    "env(--gap)"
                ),
                (
                    &ValueSiteKind::AtRulePrelude { name: "import".into() },
                    "url(x.css) screen"
                ),
            ]
        );
    }

    #[test]
    fn custom_properties_keep_curly_blocks() {
        let css = "a { --x: {env(--y)}; color: red } b { a:hover { gap: 1px } }";
        assert_eq!(texts(css), vec!["{env(--y)}", "red", "1px"]);
    }

    #[test]
    fn selectors_are_not_sites() {
        assert!(texts("env(--a) { }").is_empty());
    }
}
