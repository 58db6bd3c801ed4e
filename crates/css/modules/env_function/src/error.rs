//! Error type shared by table loading, substitution and the plugin hooks.

use core::fmt::{Display, Formatter, Result as FmtResult};
use std::error::Error;
use std::path::PathBuf;

use css_value_tree::ParseError;

/// Failures surfaced by this crate.
///
/// The type is `Clone` so a failed variable table can be reported to every
/// caller waiting on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvFnError {
    /// A raw value handed to the engine is not valid value syntax.
    Parse(ParseError),
    /// The replacement text of a variable is not valid value syntax.
    VariableParse { name: String, error: ParseError },
    /// A variable maps to something other than a string, number or boolean.
    InvalidVariable { name: String, found: &'static str },
    /// A source file could not be read.
    FileAccess { path: PathBuf, message: String },
    /// A JSON source file is malformed.
    Json { path: PathBuf, message: String },
    /// A module source could not be loaded.
    ModuleLoad { path: PathBuf, message: String },
    /// A deferred source failed to produce a descriptor.
    Source { message: String },
    /// Plugin options are malformed.
    InvalidOptions { message: String },
}

impl Display for EnvFnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Parse(error) => write!(f, "invalid value: {error}"),
            Self::VariableParse { name, error } => {
                write!(f, "invalid value for environment variable {name}: {error}")
            }
            Self::InvalidVariable { name, found } => {
                write!(f, "environment variable {name} must be a string, found {found}")
            }
            Self::FileAccess { path, message } => {
                write!(f, "cannot read {}: {message}", path.display())
            }
            Self::Json { path, message } => {
                write!(f, "invalid JSON in {}: {message}", path.display())
            }
            Self::ModuleLoad { path, message } => {
                write!(f, "cannot load module {}: {message}", path.display())
            }
            Self::Source { message } => write!(f, "variable source failed: {message}"),
            Self::InvalidOptions { message } => write!(f, "invalid plugin options: {message}"),
        }
    }
}

impl Error for EnvFnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(error) | Self::VariableParse { error, .. } => Some(error),
            Self::InvalidVariable { .. }
            | Self::FileAccess { .. }
            | Self::Json { .. }
            | Self::ModuleLoad { .. }
            | Self::Source { .. }
            | Self::InvalidOptions { .. } => None,
        }
    }
}

impl From<ParseError> for EnvFnError {
    #[inline]
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}
