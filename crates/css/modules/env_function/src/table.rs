//! The resolved variable table.

use core::mem::take;
use std::collections::{HashMap, HashSet};

use css_value_tree::ValueTree;
use log::{debug, warn};

use crate::LOG_TARGET;
use crate::engine::replace_with_lookup;
use crate::error::EnvFnError;
use crate::matcher::env_reference;
use crate::sources::VariableMap;
use crate::walker::walk_tree;

/// Parsed environment variables keyed by dashed identifier (`--name`).
///
/// Each entry is an independent tree; substitution copies out of it and never
/// mutates it, so a table can be shared by reference between callers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentVariables {
    entries: HashMap<String, ValueTree>,
}

impl EnvironmentVariables {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every value of `map` into a table. References between entries are
    /// left as written; see [`Self::expand_references`].
    ///
    /// # Errors
    /// Returns [`EnvFnError::VariableParse`] for the first value (in name order)
    /// that is not valid value syntax.
    pub fn from_map(map: &VariableMap) -> Result<Self, EnvFnError> {
        let mut table = Self::new();
        // Sorted so the reported error does not depend on hash order.
        let mut names: Vec<&String> = map.keys().collect();
        names.sort();
        for name in names {
            if let Some(value) = map.get(name) {
                table.define(name.clone(), value)?;
            }
        }
        Ok(table)
    }

    /// Merge `maps` left to right (later maps win) and expand references.
    ///
    /// # Errors
    /// Returns [`EnvFnError::VariableParse`] if any value fails to parse.
    pub fn from_ordered_maps<I>(maps: I) -> Result<Self, EnvFnError>
    where
        I: IntoIterator<Item = VariableMap>,
    {
        let mut table = Self::new();
        for map in maps {
            table.extend(Self::from_map(&map)?);
        }
        table.expand_references();
        debug!(target: LOG_TARGET, "resolved {} environment variables", table.len());
        Ok(table)
    }

    /// Parse `value` and store it under `name`, replacing any previous entry.
    ///
    /// # Errors
    /// Returns [`EnvFnError::VariableParse`] if `value` is not valid value syntax.
    pub fn define(&mut self, name: impl Into<String>, value: &str) -> Result<(), EnvFnError> {
        let name = name.into();
        match ValueTree::parse(value) {
            Ok(tree) => {
                self.entries.insert(name, tree);
                Ok(())
            }
            Err(error) => Err(EnvFnError::VariableParse { name, error }),
        }
    }

    /// Take every entry of `other`, overriding entries with the same name.
    #[inline]
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ValueTree> {
        self.entries.get(name)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variable names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Replace `env()` references inside stored values with the values they
    /// name, so `--a: env(--b)` and `--b: blue` leave `--a` holding `blue`.
    ///
    /// References that take part in a cycle stay as written.
    pub fn expand_references(&mut self) {
        let mut expander = Expander {
            pending: take(&mut self.entries),
            ..Expander::default()
        };
        let mut names: Vec<String> = expander.pending.keys().cloned().collect();
        names.sort();
        for name in &names {
            expander.resolve(name);
        }
        if !expander.cyclic.is_empty() {
            let mut cyclic: Vec<&String> = expander.cyclic.iter().collect();
            cyclic.sort();
            warn!(target: LOG_TARGET, "cyclic environment variables left unexpanded: {cyclic:?}");
        }
        self.entries = expander.done;
    }
}

/// Work state for [`EnvironmentVariables::expand_references`].
#[derive(Default)]
struct Expander {
    /// Entries not yet visited.
    pending: HashMap<String, ValueTree>,
    /// Fully expanded entries.
    done: HashMap<String, ValueTree>,
    /// Names currently being expanded, outermost first.
    stack: Vec<String>,
    /// Names found on a reference cycle; never substituted.
    cyclic: HashSet<String>,
}

impl Expander {
    fn resolve(&mut self, name: &str) {
        let Some(mut tree) = self.pending.remove(name) else {
            return;
        };
        self.stack.push(name.to_owned());
        loop {
            for reference in references(&mut tree) {
                if let Some(start) = self.stack.iter().position(|entry| *entry == reference) {
                    if let Some(members) = self.stack.get(start..) {
                        self.cyclic.extend(members.iter().cloned());
                    }
                } else {
                    self.resolve(&reference);
                }
            }
            let done = &self.done;
            let cyclic = &self.cyclic;
            let stack = &self.stack;
            let replaced = replace_with_lookup(&mut tree, |reference| {
                if cyclic.contains(reference) || stack.iter().any(|entry| entry == reference) {
                    None
                } else {
                    done.get(reference)
                }
            });
            if replaced == 0 {
                break;
            }
        }
        self.stack.pop();
        self.done.insert(name.to_owned(), tree);
    }
}

/// Names referenced by `env()` calls in `tree`, in walk order.
fn references(tree: &mut ValueTree) -> Vec<String> {
    let mut found = Vec::new();
    walk_tree(tree, &mut |tree, id| {
        if let Some(name) = env_reference(tree, id) {
            found.push(name);
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> EnvironmentVariables {
        let map: VariableMap = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        EnvironmentVariables::from_ordered_maps([map]).unwrap()
    }

    fn text(table: &EnvironmentVariables, name: &str) -> String {
        table.get(name).unwrap().to_string()
    }

    #[test]
    fn chains_are_expanded() {
        let vars = table(&[("--a", "env(--b)"), ("--b", "env(--c) solid"), ("--c", "1px")]);
        assert_eq!(text(&vars, "--a"), "1px solid");
        assert_eq!(text(&vars, "--b"), "1px solid");
    }

    #[test]
    fn cycles_stay_as_written() {
        let vars = table(&[("--x", "env(--y)"), ("--y", "env(--x)"), ("--z", "env(--z) env(--z)")]);
        assert_eq!(text(&vars, "--x"), "env(--y)");
        assert_eq!(text(&vars, "--y"), "env(--x)");
        assert_eq!(text(&vars, "--z"), "env(--z) env(--z)");
    }

    #[test]
    fn reference_built_from_inner_call_is_expanded() {
        let vars = table(&[("--a", "env(env(--name))"), ("--name", "--b"), ("--b", "blue")]);
        assert_eq!(text(&vars, "--a"), "blue");
    }

    #[test]
    fn later_maps_override_earlier_ones() {
        let first: VariableMap = [("--a".to_owned(), "1".to_owned())].into();
        let second: VariableMap = [("--a".to_owned(), "2".to_owned())].into();
        let vars = EnvironmentVariables::from_ordered_maps([first, second]).unwrap();
        assert_eq!(text(&vars, "--a"), "2");
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let map: VariableMap = [("--bad".to_owned(), "f(".to_owned())].into();
        let error = EnvironmentVariables::from_map(&map).unwrap_err();
        assert!(matches!(error, EnvFnError::VariableParse { ref name, .. } if name == "--bad"));
    }
}
