//! Depth-first traversal over `env()` calls, innermost first.

use css_value_tree::{NodeId, ValueTree};

use crate::matcher::is_env_function;

/// Visit every `env()` call below `parent`.
///
/// Children are snapshotted before the loop, so `visit` may replace the node
/// it is handed without disturbing the iteration. A child that has children of
/// its own is walked before it is tested, which resolves `env(env(--a))` from
/// the inside out. Nodes spliced in by `visit` are not walked again.
pub fn walk_env_functions<F>(tree: &mut ValueTree, parent: NodeId, visit: &mut F)
where
    F: FnMut(&mut ValueTree, NodeId),
{
    for child in tree.children(parent) {
        if !tree.contains(child) {
            continue;
        }
        if tree.has_children(child) {
            walk_env_functions(tree, child, visit);
        }
        if tree.node(child).is_some_and(is_env_function) {
            visit(tree, child);
        }
    }
}

/// Walk the whole tree.
#[inline]
pub fn walk_tree<F>(tree: &mut ValueTree, visit: &mut F)
where
    F: FnMut(&mut ValueTree, NodeId),
{
    let root = tree.root();
    walk_env_functions(tree, root, visit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_calls_are_visited_first() {
        let mut tree = ValueTree::parse("env(env(--a)) calc(env(--b))").unwrap();
        let mut seen = Vec::new();
        walk_tree(&mut tree, &mut |tree, id| {
            seen.push(tree.children_to_string(id));
        });
        assert_eq!(seen, vec!["--a", "env(--a)", "--b"]);
    }

    #[test]
    fn replacing_the_visited_node_keeps_walking_siblings() {
        let mut tree = ValueTree::parse("env(--a) env(--b)").unwrap();
        let replacement = ValueTree::parse("x").unwrap();
        let mut visits = 0_usize;
        walk_tree(&mut tree, &mut |tree, id| {
            visits += 1;
            tree.replace_with(id, &replacement);
        });
        assert_eq!(visits, 2);
        assert_eq!(tree.to_string(), "x x");
    }
}
