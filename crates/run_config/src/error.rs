//! Error types for run configuration resolution.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Coarse classification of a [`ConfigError`], reported on the launcher's
/// diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigErrorKind {
    MissingField,
    CoercionError,
    UnknownEnumValue,
    InvariantViolation,
    PathNotFound,
}

impl ConfigErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorKind::MissingField => "MissingField",
            ConfigErrorKind::CoercionError => "CoercionError",
            ConfigErrorKind::UnknownEnumValue => "UnknownEnumValue",
            ConfigErrorKind::InvariantViolation => "InvariantViolation",
            ConfigErrorKind::PathNotFound => "PathNotFound",
        }
    }
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required field `{key}`")]
    Missing { key: String },
    #[error("cannot read `{raw}` as {expected} for `{key}`")]
    Coercion {
        key: String,
        raw: String,
        expected: &'static str,
    },
    #[error("unknown parameter `{key}`")]
    UnknownKey { key: String },
    #[error("unknown flag `{flag}`")]
    UnknownFlag { flag: String },
    #[error("flag `{flag}` expects a value")]
    MissingValue { flag: String },
    #[error("unsupported value `{raw}` for `{key}` (expected one of: {})", .allowed.join(", "))]
    UnknownEnumValue {
        key: String,
        raw: String,
        allowed: Vec<String>,
    },
    #[error("invariant failed for `{key}`: {invariant}")]
    InvariantViolation { key: String, invariant: String },
    #[error("path for `{key}` does not exist or is unreadable: {}", .path.display())]
    PathNotFound { key: String, path: PathBuf },
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::Missing { .. } => ConfigErrorKind::MissingField,
            ConfigError::Coercion { .. }
            | ConfigError::UnknownKey { .. }
            | ConfigError::UnknownFlag { .. }
            | ConfigError::MissingValue { .. } => ConfigErrorKind::CoercionError,
            ConfigError::UnknownEnumValue { .. } => ConfigErrorKind::UnknownEnumValue,
            ConfigError::InvariantViolation { .. } => ConfigErrorKind::InvariantViolation,
            ConfigError::PathNotFound { .. } => ConfigErrorKind::PathNotFound,
        }
    }

    /// Canonical key (or surface flag, for tokenizer errors) the failure refers to.
    pub fn key(&self) -> &str {
        match self {
            ConfigError::Missing { key }
            | ConfigError::Coercion { key, .. }
            | ConfigError::UnknownKey { key }
            | ConfigError::UnknownEnumValue { key, .. }
            | ConfigError::InvariantViolation { key, .. }
            | ConfigError::PathNotFound { key, .. } => key,
            ConfigError::UnknownFlag { flag } | ConfigError::MissingValue { flag } => flag,
        }
    }

    pub(crate) fn invariant(key: &str, invariant: impl Into<String>) -> Self {
        ConfigError::InvariantViolation {
            key: key.to_string(),
            invariant: invariant.into(),
        }
    }

    pub(crate) fn coercion(key: &str, raw: &str, expected: &'static str) -> Self {
        ConfigError::Coercion {
            key: key.to_string(),
            raw: raw.to_string(),
            expected,
        }
    }
}
