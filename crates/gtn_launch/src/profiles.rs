//! Named launch profiles loaded from a TOML file.
//!
//! ```toml
//! [defaults]
//! program = "python"
//! profile = "coco"
//!
//! [[profile]]
//! name = "coco"
//! script = "main_coco.py"
//! args = ["--dataset", "coco", "-gtn"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PROFILES_NAME: &str = "launch-profiles.toml";
pub const PROFILES_ENV: &str = "GTN_LAUNCH_PROFILES";
pub const DEFAULT_PROGRAM: &str = "python";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("toml parse error at {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("profile `{0}` is defined more than once")]
    Duplicate(String),
    #[error("profile `{name}` has an empty script")]
    EmptyScript { name: String },
    #[error("unknown profile `{name}` (available: {})", .available.join(", "))]
    Unknown { name: String, available: Vec<String> },
}

/// One stored launch descriptor: the interpreter, the training entry point,
/// and the argument list applied before any command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchProfile {
    pub name: String,
    pub program: PathBuf,
    pub script: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct LaunchProfiles {
    pub default_profile: Option<String>,
    default_program: Option<PathBuf>,
    profiles: Vec<LaunchProfile>,
}

#[derive(Debug, Deserialize, Default)]
struct ProfilesFile {
    defaults: Option<DefaultsSection>,
    #[serde(default)]
    profile: Vec<ProfileSection>,
}

#[derive(Debug, Deserialize, Default)]
struct DefaultsSection {
    program: Option<String>,
    profile: Option<String>,
    env: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ProfileSection {
    name: String,
    program: Option<String>,
    script: String,
    cwd: Option<String>,
    args: Option<Vec<String>>,
    env: Option<BTreeMap<String, String>>,
}

impl LaunchProfiles {
    /// Profile file location: explicit path, then `$GTN_LAUNCH_PROFILES`, then
    /// `launch-profiles.toml` in the working directory.
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(PROFILES_ENV) {
            if !path.trim().is_empty() {
                return expand_path(&path);
            }
        }
        PathBuf::from(DEFAULT_PROFILES_NAME)
    }

    pub fn from_path(path: &Path) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ProfilesFile = toml::from_str(&raw).map_err(|source| ProfileError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        let profiles = Self::from_file(file)?;
        tracing::debug!(
            path = %path.display(),
            count = profiles.profiles.len(),
            "loaded launch profiles"
        );
        Ok(profiles)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ProfileError> {
        let file: ProfilesFile = toml::from_str(raw).map_err(|source| ProfileError::Toml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: ProfilesFile) -> Result<Self, ProfileError> {
        let defaults = file.defaults.unwrap_or_default();
        let default_program = defaults
            .program
            .filter(|p| !p.trim().is_empty())
            .map(|p| expand_path(&p));
        let shared_env = defaults.env.unwrap_or_default();

        let mut profiles: Vec<LaunchProfile> = Vec::with_capacity(file.profile.len());
        for section in file.profile {
            if profiles.iter().any(|p| p.name == section.name) {
                return Err(ProfileError::Duplicate(section.name));
            }
            if section.script.trim().is_empty() {
                return Err(ProfileError::EmptyScript { name: section.name });
            }
            let mut env = shared_env.clone();
            env.extend(section.env.unwrap_or_default());
            profiles.push(LaunchProfile {
                program: match &section.program {
                    Some(program) => expand_path(program),
                    None => default_program
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
                },
                script: expand_path(&section.script),
                working_dir: section.cwd.map(|c| expand_path(&c)),
                args: section
                    .args
                    .unwrap_or_default()
                    .iter()
                    .map(|a| expand_env(a))
                    .collect(),
                env: env.into_iter().map(|(k, v)| (k, expand_env(&v))).collect(),
                name: section.name,
            });
        }

        let cfg = LaunchProfiles {
            default_profile: defaults.profile.filter(|p| !p.trim().is_empty()),
            default_program,
            profiles,
        };
        cfg.warn_if_invalid();
        Ok(cfg)
    }

    fn warn_if_invalid(&self) {
        if self.is_empty() {
            tracing::warn!("launch profiles: no [[profile]] entries defined");
        }
        if let Some(name) = &self.default_profile {
            if self.get(name).is_none() {
                tracing::warn!(profile = %name, "launch profiles: default profile is not defined");
            }
        }
    }

    /// Interpreter for runs without a profile: `[defaults] program`, else `python`.
    pub fn default_program(&self) -> &Path {
        self.default_program
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PROGRAM))
    }

    pub fn get(&self, name: &str) -> Option<&LaunchProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Named profile, or an error listing what is available.
    pub fn profile(&self, name: &str) -> Result<&LaunchProfile, ProfileError> {
        self.get(name).ok_or_else(|| ProfileError::Unknown {
            name: name.to_string(),
            available: self.names().map(str::to_string).collect(),
        })
    }

    /// Explicit selection if given, otherwise the file's default profile.
    pub fn select(&self, name: Option<&str>) -> Result<Option<&LaunchProfile>, ProfileError> {
        match name.or(self.default_profile.as_deref()) {
            Some(name) => self.profile(name).map(Some),
            None => Ok(None),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Expand a leading `~` and `${VAR}` references.
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = expand_env(raw);
    if let Some(rest) = expanded.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(format!("{home}{rest}"));
        }
    }
    PathBuf::from(expanded)
}

/// Replace `${VAR}` with the variable's value; unset variables are left as written.
pub fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
