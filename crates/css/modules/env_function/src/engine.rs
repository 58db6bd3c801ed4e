//! Entry points that rewrite a single value string.

use css_value_tree::{ParseError, ValueTree};
use log::trace;

use crate::LOG_TARGET;
use crate::matcher::env_reference;
use crate::table::EnvironmentVariables;
use crate::walker::walk_tree;

/// Replace every resolvable `env()` call in `tree`, innermost first.
///
/// `lookup` maps a referenced name to the tree to splice in; `None` leaves the
/// call untouched. Returns the number of calls replaced.
pub(crate) fn replace_with_lookup<'vars, L>(tree: &mut ValueTree, mut lookup: L) -> usize
where
    L: FnMut(&str) -> Option<&'vars ValueTree>,
{
    let mut replaced = 0_usize;
    walk_tree(tree, &mut |tree, id| {
        let Some(name) = env_reference(tree, id) else {
            return;
        };
        if let Some(value) = lookup(&name) {
            trace!(target: LOG_TARGET, "env({name}) -> {value}");
            tree.replace_with(id, value);
            replaced += 1;
        }
    });
    replaced
}

/// Replace `env()` calls in a parsed tree using `variables`.
///
/// Unknown names are left as written. Returns the number of replacements.
#[inline]
pub fn replace_env_functions(tree: &mut ValueTree, variables: &EnvironmentVariables) -> usize {
    replace_with_lookup(tree, |name| variables.get(name))
}

/// Rewrite `raw`, returning `None` when nothing changed.
///
/// # Errors
/// Returns [`ParseError`] when `raw` is not valid value syntax.
pub fn substitute_if_changed(
    raw: &str,
    variables: &EnvironmentVariables,
) -> Result<Option<String>, ParseError> {
    let mut tree = ValueTree::parse(raw)?;
    if replace_env_functions(&mut tree, variables) == 0 {
        return Ok(None);
    }
    let replaced = tree.to_string();
    Ok((replaced != raw).then_some(replaced))
}

/// Rewrite `raw`, returning it unchanged when no substitution applies.
///
/// # Errors
/// Returns [`ParseError`] when `raw` is not valid value syntax.
#[inline]
pub fn substitute(raw: &str, variables: &EnvironmentVariables) -> Result<String, ParseError> {
    Ok(substitute_if_changed(raw, variables)?.unwrap_or_else(|| raw.to_owned()))
}
