//! Recognizes `env(--name)` calls.

use css_value_tree::{NodeId, ValueNode, ValueTree};

use crate::{DASHED_PREFIX, ENV_FUNCTION_NAME};

/// Whether `node` is a call of the `env` function. The name is compared exactly.
#[inline]
#[must_use]
pub fn is_env_function(node: &ValueNode) -> bool {
    node.function_name() == Some(ENV_FUNCTION_NAME)
}

/// The variable name referenced by the `env()` call at `id`.
///
/// The argument list is serialized as written (leading whitespace of each
/// argument included, trailing whitespace of the call excluded). Returns
/// `None` when `id` is not an `env()` call or the argument text does not start
/// with `--`, which leaves calls like `env(safe-area-inset-top)` alone.
#[must_use]
pub fn env_reference(tree: &ValueTree, id: NodeId) -> Option<String> {
    if !is_env_function(tree.node(id)?) {
        return None;
    }
    let argument = tree.children_to_string(id);
    argument.starts_with(DASHED_PREFIX).then_some(argument)
}
