//! Run configuration resolver for graph-transform multi-label training runs.
//!
//! Raw arguments (from a command line, via [`tokenize`], or assembled directly
//! as a [`RawArgs`] map) are resolved by [`parse`] into an immutable
//! [`RunConfig`], or rejected with a [`ConfigError`] naming the failing field.

pub mod aliases;
pub mod config;
pub mod error;
pub mod parse;
pub mod raw;
pub mod types;

pub use aliases::{keys, tokenize, Arity, FlagSpec, ALIASES};
pub use config::{describe, RunConfig};
pub use error::{ConfigError, ConfigErrorKind, ConfigResult};
pub use parse::parse;
pub use raw::{RawArgs, RawValue};
pub use types::{allowed_values, Architecture, Dataset, Method};

/// Tokenize an argv-style list and resolve it in one step.
pub fn resolve_argv<I, S>(argv: I) -> ConfigResult<RunConfig>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parse(&tokenize(argv)?)
}
