//! CSS Environment Variables Module Level 1 — `env()` substitution.
//! Spec: <https://drafts.csswg.org/css-env-1/>
//!
//! Author-defined environment variables (`--name`) are collected from inline
//! maps, JSON files, script modules or deferred producers, parsed once into
//! value trees, and spliced into property values wherever `env(--name)`
//! appears. Calls with unknown names, or with arguments that are not dashed
//! identifiers, are left exactly as written.

#![forbid(unsafe_code)]

mod engine;
mod error;
mod matcher;
mod options;
mod plugin;
mod sources;
mod table;
mod walker;

pub use engine::{replace_env_functions, substitute, substitute_if_changed};
pub use error::EnvFnError;
pub use matcher::{env_reference, is_env_function};
pub use options::{IMPORT_FROM_ENV, IMPORT_FROM_KEY, PluginOptions};
pub use plugin::{EnvFunctionPlugin, PLUGIN_NAME};
pub use sources::{
    ModuleLoader, SourceDescriptor, SourceFormat, VARIABLES_KEY, VARIABLES_KEY_HYPHENATED,
    VariableMap, load_environment_variables, variables_from_object,
};
pub use table::EnvironmentVariables;
pub use walker::{walk_env_functions, walk_tree};

/// Name of the function this crate substitutes. Matched exactly.
pub const ENV_FUNCTION_NAME: &str = "env";

/// Prefix an `env()` argument must carry to be looked up.
pub const DASHED_PREFIX: &str = "--";

/// `log` target for everything this crate emits.
pub const LOG_TARGET: &str = "css_env_function";
