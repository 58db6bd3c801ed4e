//! Plugin configuration.
//!
//! The only setting that changes results is the ordered source list: later
//! sources override earlier ones for the same variable name. Options can be
//! built programmatically, read from a JSON options object, or taken from the
//! environment.

use core::fmt::{Debug, Formatter, Result as FmtResult};
use std::env;
use std::ffi::OsStr;
use std::sync::Arc;

use serde_json::Value;

use crate::error::EnvFnError;
use crate::sources::{ModuleLoader, SourceDescriptor};

/// Environment variable holding a path list of variable files.
pub const IMPORT_FROM_ENV: &str = "CSS_ENV_FN_IMPORT_FROM";

/// Key of the source list in a JSON options object.
pub const IMPORT_FROM_KEY: &str = "importFrom";

/// Options accepted by [`crate::EnvFunctionPlugin`].
#[derive(Default)]
pub struct PluginOptions {
    /// Variable sources in precedence order (last wins).
    pub import_from: Vec<SourceDescriptor>,
    /// Loader used for `js` file sources.
    pub module_loader: Option<Arc<dyn ModuleLoader>>,
}

impl PluginOptions {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; it takes precedence over the ones already added.
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: SourceDescriptor) -> Self {
        self.import_from.push(source);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.module_loader = Some(loader);
        self
    }

    /// Read options from a JSON object such as
    /// `{ "importFrom": ["vars.json", { "environmentVariables": { "--a": "1px" } }] }`.
    ///
    /// `importFrom` may be a single entry or an array. Anything that is not an
    /// object, or lacks the key, yields no sources.
    ///
    /// # Errors
    /// Returns an error if an entry cannot be interpreted as a source.
    pub fn from_json(value: &Value) -> Result<Self, EnvFnError> {
        let entries = match value.get(IMPORT_FROM_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single) => vec![single],
        };
        let import_from = entries
            .into_iter()
            .map(SourceDescriptor::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            import_from,
            module_loader: None,
        })
    }

    /// Read file sources from [`IMPORT_FROM_ENV`]; no sources when it is unset.
    #[must_use]
    pub fn from_env() -> Self {
        env::var_os(IMPORT_FROM_ENV)
            .map(|paths| Self::from_path_list(&paths))
            .unwrap_or_default()
    }

    /// File sources from a platform path list (`:`-separated on Unix).
    ///
    /// Each path's format follows its extension. Empty segments are skipped.
    #[must_use]
    pub fn from_path_list(paths: &OsStr) -> Self {
        let import_from = env::split_paths(paths)
            .filter(|path| !path.as_os_str().is_empty())
            .map(SourceDescriptor::file)
            .collect();
        Self {
            import_from,
            module_loader: None,
        }
    }
}

impl Debug for PluginOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PluginOptions")
            .field("import_from", &self.import_from)
            .field("module_loader", &self.module_loader.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceFormat;
    use serde_json::json;

    #[test]
    fn import_from_accepts_a_single_entry() {
        let options = PluginOptions::from_json(&json!({ "importFrom": "vars.json" })).unwrap();
        assert_eq!(options.import_from.len(), 1);
        assert!(matches!(
            options.import_from[0],
            SourceDescriptor::File { format: SourceFormat::Json, .. }
        ));
    }

    #[test]
    fn import_from_keeps_declared_order() {
        let options = PluginOptions::from_json(&json!({
            "importFrom": [
                { "environmentVariables": { "--a": "1" } },
                "b.js",
            ]
        }))
        .unwrap();
        assert!(matches!(options.import_from[0], SourceDescriptor::Inline(_)));
        assert!(matches!(
            options.import_from[1],
            SourceDescriptor::File { format: SourceFormat::Js, .. }
        ));
    }

    #[test]
    fn missing_options_mean_no_sources() {
        assert!(PluginOptions::from_json(&json!(null)).unwrap().import_from.is_empty());
        assert!(PluginOptions::from_json(&json!({})).unwrap().import_from.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn path_lists_become_file_sources() {
        let options = PluginOptions::from_path_list(OsStr::new("a.json::b.js"));
        assert_eq!(options.import_from.len(), 2);
        assert!(matches!(
            options.import_from[1],
            SourceDescriptor::File { format: SourceFormat::Js, .. }
        ));
    }

    #[test]
    fn invalid_entries_are_reported() {
        let error = PluginOptions::from_json(&json!({ "importFrom": [true] })).unwrap_err();
        assert!(matches!(error, EnvFnError::InvalidOptions { .. }));
    }
}
