//! Host-facing hooks: rewrite declaration values, at-rule preludes or whole
//! stylesheets against a lazily resolved variable table.

use core::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use css_syntax::collect_value_sites;
use futures::future::{BoxFuture, FutureExt as _, Shared, ready};
use log::{debug, warn};
use tokio::sync::OnceCell;

use crate::LOG_TARGET;
use crate::engine::substitute_if_changed;
use crate::error::EnvFnError;
use crate::options::PluginOptions;
use crate::sources::load_environment_variables;
use crate::table::EnvironmentVariables;

/// Name under which hosts register the plugin.
pub const PLUGIN_NAME: &str = "postcss-env-fn";

type TableResult = Result<Arc<EnvironmentVariables>, EnvFnError>;

/// The one load of the configured sources, awaited by every caller.
type TableLoad = Shared<BoxFuture<'static, TableResult>>;

/// Substitutes `env(--name)` calls using variables from the configured sources.
///
/// The table is built on first use and shared by every later call. Concurrent
/// first callers wait on the same resolution, and a caller that gives up
/// early leaves the load in place for the next one. A failed resolution is
/// kept and returned to all callers; it is not retried.
pub struct EnvFunctionPlugin {
    load: TableLoad,
    variables: OnceCell<TableResult>,
}

impl EnvFunctionPlugin {
    #[must_use]
    pub fn new(options: PluginOptions) -> Self {
        let load = load_environment_variables(options.import_from, options.module_loader)
            .map(|result| {
                if let Err(error) = &result {
                    debug!(target: LOG_TARGET, "variable table resolution failed: {error}");
                }
                result.map(Arc::new)
            })
            .boxed()
            .shared();
        Self {
            load,
            variables: OnceCell::new(),
        }
    }

    /// A plugin over an already built table; no sources are loaded.
    #[must_use]
    pub fn with_variables(variables: EnvironmentVariables) -> Self {
        Self {
            load: ready(Ok(Arc::new(variables))).boxed().shared(),
            variables: OnceCell::new(),
        }
    }

    /// The resolved variable table.
    ///
    /// # Errors
    /// Returns the error the one-time resolution failed with.
    pub async fn variables(&self) -> Result<&EnvironmentVariables, EnvFnError> {
        let resolved = self
            .variables
            .get_or_init(|| self.load.clone())
            .await;
        match resolved {
            Ok(variables) => Ok(&**variables),
            Err(error) => Err(error.clone()),
        }
    }

    /// Rewrite one declaration value; `Ok(None)` when it is unchanged.
    ///
    /// # Errors
    /// Fails when the table cannot be resolved or `value` does not parse.
    pub async fn declaration_value(&self, value: &str) -> Result<Option<String>, EnvFnError> {
        let variables = self.variables().await?;
        Ok(substitute_if_changed(value, variables)?)
    }

    /// Rewrite the prelude of an at-rule such as `@media`; `Ok(None)` when it
    /// is unchanged.
    ///
    /// # Errors
    /// Fails when the table cannot be resolved or `params` does not parse.
    pub async fn at_rule_params(&self, params: &str) -> Result<Option<String>, EnvFnError> {
        let variables = self.variables().await?;
        Ok(substitute_if_changed(params, variables)?)
    }

    /// Rewrite every declaration value and at-rule prelude of `css`.
    ///
    /// Text outside those sites is copied through untouched. A site that does
    /// not parse as a value is logged and left as written.
    ///
    /// # Errors
    /// Fails when the table cannot be resolved.
    pub async fn process_stylesheet(&self, css: &str) -> Result<String, EnvFnError> {
        let variables = self.variables().await?;
        let mut out = String::with_capacity(css.len());
        let mut copied = 0_usize;
        let mut rewritten = 0_usize;
        for site in collect_value_sites(css) {
            if site.span.start < copied {
                continue;
            }
            let text = site.text(css);
            let replacement = match substitute_if_changed(text, variables) {
                Ok(Some(replacement)) => replacement,
                Ok(None) => continue,
                Err(error) => {
                    warn!(target: LOG_TARGET, "leaving unparsable value {text:?}: {error}");
                    continue;
                }
            };
            out.push_str(css.get(copied..site.span.start).unwrap_or_default());
            out.push_str(&replacement);
            copied = site.span.end;
            rewritten += 1;
        }
        out.push_str(css.get(copied..).unwrap_or_default());
        debug!(target: LOG_TARGET, "rewrote {rewritten} value sites");
        Ok(out)
    }
}

impl Debug for EnvFunctionPlugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("EnvFunctionPlugin")
            .field("variables", &self.variables.get())
            .finish_non_exhaustive()
    }
}
