//! Variable sources and the table builder.
//!
//! A source is one place environment variables come from: an inline map, a
//! JSON or module file, or a future that produces another source. Sources are
//! resolved concurrently and merged in declaration order.

use core::fmt::{Debug, Formatter, Result as FmtResult};
use core::future::Future;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result as AnyResult;
use futures::future::{BoxFuture, FutureExt as _, try_join_all};
use log::{debug, warn};
use serde_json::Value;
use tokio::fs;

use crate::LOG_TARGET;
use crate::error::EnvFnError;
use crate::table::EnvironmentVariables;

/// Raw variable definitions: dashed name to unparsed value text.
pub type VariableMap = HashMap<String, String>;

/// Key holding the variable map in a source object.
pub const VARIABLES_KEY: &str = "environmentVariables";
/// Alternative key consulted when [`VARIABLES_KEY`] is absent.
pub const VARIABLES_KEY_HYPHENATED: &str = "environment-variables";

/// How a file source is read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    /// A script module; needs a [`ModuleLoader`].
    Js,
    /// Anything else. Such sources contribute no variables.
    Other(String),
}

impl SourceFormat {
    /// Format named by `name`, compared case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "js" => Self::Js,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Format implied by the extension of `path`.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        Self::from_name(
            path.extension()
                .and_then(|extension| extension.to_str())
                .unwrap_or_default(),
        )
    }
}

/// Loads script modules on behalf of the table builder.
///
/// The host decides how modules are evaluated; the returned value stands for
/// the module's exports and is searched for a variable map like a JSON file.
pub trait ModuleLoader: Send + Sync {
    fn load<'load>(&'load self, path: &'load Path) -> BoxFuture<'load, AnyResult<Value>>;
}

/// One configured origin of environment variables.
pub enum SourceDescriptor {
    /// Variables given directly.
    Inline(VariableMap),
    /// Variables read from a file.
    File { path: PathBuf, format: SourceFormat },
    /// A source that becomes available later.
    Deferred(BoxFuture<'static, AnyResult<SourceDescriptor>>),
}

impl SourceDescriptor {
    /// Inline variables from `(name, value)` pairs.
    pub fn inline<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Inline(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// A file source whose format follows its extension.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SourceFormat::from_path(&path);
        Self::File { path, format }
    }

    /// A file source with an explicit format name.
    pub fn file_with_format(path: impl Into<PathBuf>, format: &str) -> Self {
        Self::File {
            path: path.into(),
            format: SourceFormat::from_name(format),
        }
    }

    /// A source produced by `future`.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = AnyResult<Self>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    /// A source produced by calling `produce` when sources are resolved.
    pub fn producer<F>(produce: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::Deferred(async move { Ok::<Self, anyhow::Error>(produce()) }.boxed())
    }

    /// Interpret a caller-supplied JSON source entry.
    ///
    /// - a string is a file path;
    /// - an object carrying `environmentVariables` (or `environment-variables`)
    ///   is an inline source;
    /// - any other object names a file through `from`, with `type` defaulting
    ///   to the file extension.
    ///
    /// # Errors
    /// Returns [`EnvFnError::InvalidVariable`] for inline values that are not
    /// strings, numbers or booleans, and [`EnvFnError::InvalidOptions`] for
    /// entries that are neither strings nor objects.
    pub fn from_json(value: &Value) -> Result<Self, EnvFnError> {
        match value {
            Value::String(path) => Ok(Self::file(path)),
            Value::Object(object) => {
                if variables_field(value).is_some() {
                    return Ok(Self::Inline(variables_from_object(value)?));
                }
                let from = object.get("from").map(json_text).unwrap_or_default();
                Ok(match object.get("type").and_then(Value::as_str) {
                    Some(format) => Self::file_with_format(from, format),
                    None => Self::file(from),
                })
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => {
                Err(EnvFnError::InvalidOptions {
                    message: format!("unsupported variable source {value}"),
                })
            }
        }
    }
}

impl Debug for SourceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Inline(map) => f.debug_tuple("Inline").field(map).finish(),
            Self::File { path, format } => f
                .debug_struct("File")
                .field("path", path)
                .field("format", format)
                .finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<VariableMap> for SourceDescriptor {
    #[inline]
    fn from(map: VariableMap) -> Self {
        Self::Inline(map)
    }
}

/// Text of a JSON scalar as JavaScript's `String()` would print it.
fn json_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn variables_field(value: &Value) -> Option<&Value> {
    let object = value.as_object()?;
    object
        .get(VARIABLES_KEY)
        .filter(|field| !field.is_null())
        .or_else(|| object.get(VARIABLES_KEY_HYPHENATED))
        .filter(|field| !field.is_null())
}

/// Extract the variable map from a source object.
///
/// Objects without a variable map (or non-objects) yield an empty map.
///
/// # Errors
/// Returns [`EnvFnError::InvalidVariable`] when a value is not a string,
/// number or boolean.
pub fn variables_from_object(value: &Value) -> Result<VariableMap, EnvFnError> {
    let Some(Value::Object(entries)) = variables_field(value) else {
        return Ok(VariableMap::new());
    };
    let mut map = VariableMap::with_capacity(entries.len());
    for (name, entry) in entries {
        let text = match entry {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Null => return Err(invalid_variable(name, "null")),
            Value::Array(_) => return Err(invalid_variable(name, "an array")),
            Value::Object(_) => return Err(invalid_variable(name, "an object")),
        };
        map.insert(name.clone(), text);
    }
    Ok(map)
}

fn invalid_variable(name: &str, found: &'static str) -> EnvFnError {
    EnvFnError::InvalidVariable {
        name: name.to_owned(),
        found,
    }
}

async fn read_json_source(path: &Path) -> Result<VariableMap, EnvFnError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|error| EnvFnError::FileAccess {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
    let value: Value = serde_json::from_str(&text).map_err(|error| EnvFnError::Json {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    variables_from_object(&value)
}

async fn load_module_source(
    path: &Path,
    loader: Option<&dyn ModuleLoader>,
) -> Result<VariableMap, EnvFnError> {
    let Some(loader) = loader else {
        return Err(EnvFnError::ModuleLoad {
            path: path.to_path_buf(),
            message: "no module loader configured".to_owned(),
        });
    };
    let exports = loader
        .load(path)
        .await
        .map_err(|error| EnvFnError::ModuleLoad {
            path: path.to_path_buf(),
            message: format!("{error:#}"),
        })?;
    variables_from_object(&exports)
}

/// Resolve one source to its raw variable map.
fn resolve_source(
    source: SourceDescriptor,
    loader: Option<Arc<dyn ModuleLoader>>,
) -> BoxFuture<'static, Result<VariableMap, EnvFnError>> {
    async move {
        match source {
            SourceDescriptor::Inline(map) => Ok(map),
            SourceDescriptor::File { path, format } => match format {
                SourceFormat::Json => {
                    debug!(target: LOG_TARGET, "reading JSON variables from {}", path.display());
                    read_json_source(&path).await
                }
                SourceFormat::Js => {
                    debug!(target: LOG_TARGET, "loading module variables from {}", path.display());
                    load_module_source(&path, loader.as_deref()).await
                }
                SourceFormat::Other(name) => {
                    warn!(
                        target: LOG_TARGET,
                        "ignoring variable source {} with unsupported type {name:?}",
                        path.display()
                    );
                    Ok(VariableMap::new())
                }
            },
            SourceDescriptor::Deferred(future) => {
                let produced = future.await.map_err(|error| EnvFnError::Source {
                    message: format!("{error:#}"),
                })?;
                resolve_source(produced, loader).await
            }
        }
    }
    .boxed()
}

/// Build the variable table from `sources`.
///
/// Sources are resolved concurrently; the resulting maps are merged in the
/// order the sources were given, so a later source overrides an earlier one no
/// matter which finished loading first.
///
/// # Errors
/// Fails with the first source error (unreadable file, malformed JSON, module
/// or deferred failure, invalid variable). No partial table is returned.
pub async fn load_environment_variables(
    sources: Vec<SourceDescriptor>,
    loader: Option<Arc<dyn ModuleLoader>>,
) -> Result<EnvironmentVariables, EnvFnError> {
    debug!(target: LOG_TARGET, "resolving {} variable sources", sources.len());
    let maps = try_join_all(
        sources
            .into_iter()
            .map(|source| resolve_source(source, loader.clone())),
    )
    .await?;
    EnvironmentVariables::from_ordered_maps(maps)
}
