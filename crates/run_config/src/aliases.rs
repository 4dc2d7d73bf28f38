//! Surface flag table and argv tokenizer.
//!
//! Each concept has exactly one canonical key (see [`keys`]). Every command-line
//! spelling of that concept lives in [`ALIASES`]; nothing else in the crate
//! refers to flag literals. The first spelling of each entry is the one the
//! training scripts were launched with and is used when rendering a config back
//! into arguments.

use crate::error::{ConfigError, ConfigResult};
use crate::raw::{RawArgs, RawValue};

pub mod keys {
    pub const DATA_DIR: &str = "data_dir";
    pub const METADATA_DIR: &str = "metadata_dir";
    pub const DATASET: &str = "dataset";
    pub const IMAGE_SIZE: &str = "image_size";
    pub const WORKERS: &str = "workers";
    pub const BATCH_SIZE: &str = "batch_size";
    pub const LEARNING_RATE: &str = "learning_rate";
    pub const LEARNING_RATE_DECAY: &str = "learning_rate_decay";
    pub const EPOCH_STEP: &str = "epoch_step";
    pub const EMBEDDING_PATH: &str = "embedding_path";
    pub const ADJACENCY_PATHS: &str = "adjacency_paths";
    pub const ARCHITECTURE: &str = "architecture";
    pub const USE_GRAPH: &str = "use_graph";
    pub const USE_GRAPH_TRANSFORM: &str = "use_graph_transform";
    pub const DEVICE_IDS: &str = "device_ids";
    pub const RUN_NAME: &str = "run_name";
    pub const TRACKING_ENABLED: &str = "tracking_enabled";
    pub const METHOD: &str = "method";
    pub const ADJACENCY_THRESHOLD: &str = "adjacency_threshold";
    pub const PRETRAINED: &str = "pretrained";
    pub const PRETRAINED_PATH: &str = "pretrained_path";
    pub const LARGE_FEATURE_MAP: &str = "large_feature_map";
    pub const ACOL_DROP_THRESHOLD: &str = "acol_drop_threshold";
    pub const ADL_DROP_RATE: &str = "adl_drop_rate";
    pub const ADL_DROP_THRESHOLD: &str = "adl_drop_threshold";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Takes exactly one value.
    Value,
    /// Takes every following token up to the next flag-shaped token.
    Values,
    /// Boolean toggle; present means `true`.
    Switch,
}

#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub key: &'static str,
    pub flags: &'static [&'static str],
    pub arity: Arity,
}

impl FlagSpec {
    /// Spelling used when rendering arguments.
    pub fn primary(&self) -> &'static str {
        self.flags[0]
    }

    /// First `--` spelling, the one that accepts `--flag=value`.
    pub fn inline_spelling(&self) -> Option<&'static str> {
        self.flags.iter().copied().find(|f| f.starts_with("--"))
    }
}

pub const ALIASES: &[FlagSpec] = &[
    FlagSpec {
        key: keys::DATA_DIR,
        flags: &["--data-dir", "--data_dir"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::METADATA_DIR,
        flags: &["--metadata-dir", "--metadata_dir"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::DATASET,
        flags: &["--dataset"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::IMAGE_SIZE,
        flags: &["--image-size", "--image_size"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::WORKERS,
        flags: &["--workers", "-j"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::BATCH_SIZE,
        flags: &["--batch-size", "--batch_size", "-b"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::LEARNING_RATE,
        flags: &["--lr", "--learning-rate"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::LEARNING_RATE_DECAY,
        flags: &["--learning-rate-decay", "--lrd"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::EPOCH_STEP,
        flags: &["--epoch_step", "--epoch-step"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::EMBEDDING_PATH,
        flags: &["--embedding"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::ADJACENCY_PATHS,
        flags: &["--adj-files", "--adj_files"],
        arity: Arity::Values,
    },
    FlagSpec {
        key: keys::ARCHITECTURE,
        flags: &["-a", "--arch"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::USE_GRAPH,
        flags: &["-g", "--graph"],
        arity: Arity::Switch,
    },
    FlagSpec {
        key: keys::USE_GRAPH_TRANSFORM,
        flags: &["-gtn", "--gtn"],
        arity: Arity::Switch,
    },
    FlagSpec {
        key: keys::DEVICE_IDS,
        flags: &["--device_ids", "--device-ids"],
        arity: Arity::Values,
    },
    FlagSpec {
        key: keys::RUN_NAME,
        flags: &["-n", "--name"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::TRACKING_ENABLED,
        flags: &["--neptune"],
        arity: Arity::Switch,
    },
    FlagSpec {
        key: keys::METHOD,
        flags: &["--method", "--wsol-method"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::ADJACENCY_THRESHOLD,
        flags: &["--adj-threshold", "--adj-dd-threshold"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::PRETRAINED,
        flags: &["--pretrained"],
        arity: Arity::Switch,
    },
    FlagSpec {
        key: keys::PRETRAINED_PATH,
        flags: &["--pretrained-path", "--pretrained_path"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::LARGE_FEATURE_MAP,
        flags: &["--large-feature-map", "--large_feature_map"],
        arity: Arity::Switch,
    },
    FlagSpec {
        key: keys::ACOL_DROP_THRESHOLD,
        flags: &["--acol-drop-threshold", "--acol_drop_threshold"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::ADL_DROP_RATE,
        flags: &["--adl-drop-rate", "--adl_drop_rate"],
        arity: Arity::Value,
    },
    FlagSpec {
        key: keys::ADL_DROP_THRESHOLD,
        flags: &["--adl-drop-threshold", "--adl_drop_threshold"],
        arity: Arity::Value,
    },
];

/// Look up a surface flag by exact spelling.
pub fn lookup_flag(flag: &str) -> Option<&'static FlagSpec> {
    ALIASES.iter().find(|spec| spec.flags.contains(&flag))
}

pub fn lookup_key(key: &str) -> Option<&'static FlagSpec> {
    ALIASES.iter().find(|spec| spec.key == key)
}

pub fn is_known_key(key: &str) -> bool {
    lookup_key(key).is_some()
}

fn split_inline(token: &str) -> (&str, Option<&str>) {
    if token.starts_with("--") {
        if let Some((flag, value)) = token.split_once('=') {
            return (flag, Some(value));
        }
    }
    (token, None)
}

/// Whether a token reads as a flag rather than a value.
///
/// Anything starting with `--`, or with `-` and not a number, ends a value
/// list; whether the flag is actually known is decided afterwards.
pub fn looks_like_flag(token: &str) -> bool {
    if token.starts_with("--") {
        return true;
    }
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

fn is_known_flag(token: &str) -> bool {
    lookup_flag(split_inline(token).0).is_some()
}

fn unknown_flag(token: &str) -> ConfigError {
    ConfigError::UnknownFlag {
        flag: split_inline(token).0.to_string(),
    }
}

/// Turn an argv-style token list into canonical raw arguments.
///
/// Flags are matched whole, so `-gtn` is its own switch rather than a cluster
/// of `-g -t -n`. A flag given twice keeps its last value. Values that begin
/// with `-` (other than numbers) must use the `--flag=value` form.
pub fn tokenize<I, S>(argv: I) -> ConfigResult<RawArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let tokens: Vec<String> = argv.into_iter().map(Into::into).collect();
    let mut raw = RawArgs::new();
    let mut idx = 0;

    while idx < tokens.len() {
        let token = &tokens[idx];
        idx += 1;
        let (flag, inline) = split_inline(token);
        let spec = lookup_flag(flag).ok_or_else(|| ConfigError::UnknownFlag {
            flag: flag.to_string(),
        })?;

        match spec.arity {
            Arity::Switch => {
                let value = inline.unwrap_or("true");
                raw.insert(spec.key, value);
            }
            Arity::Value => {
                let value = match inline {
                    Some(v) => v.to_string(),
                    None => match tokens.get(idx) {
                        Some(next) if !looks_like_flag(next) => {
                            idx += 1;
                            next.clone()
                        }
                        Some(next) if !is_known_flag(next) => return Err(unknown_flag(next)),
                        _ => {
                            return Err(ConfigError::MissingValue {
                                flag: flag.to_string(),
                            })
                        }
                    },
                };
                raw.insert(spec.key, value);
            }
            Arity::Values => {
                let mut values: Vec<String> = inline
                    .map(|v| v.split(',').map(str::to_string).collect())
                    .unwrap_or_default();
                while let Some(next) = tokens.get(idx) {
                    if looks_like_flag(next) {
                        break;
                    }
                    values.push(next.clone());
                    idx += 1;
                }
                raw.insert(spec.key, RawValue::List(values));
            }
        }
    }

    tracing::trace!(keys = raw.len(), "tokenized run arguments");
    Ok(raw)
}
