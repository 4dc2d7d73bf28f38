use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::aliases::{is_known_key, keys};
use crate::config::RunConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::raw::{RawArgs, RawValue};
use crate::types::{parse_enum, Method};

pub const DEFAULT_WORKERS: u32 = 0;
pub const DEFAULT_LEARNING_RATE_DECAY: f64 = 0.1;
pub const DEFAULT_EPOCH_STEP: u32 = 30;
pub const DEFAULT_ADJACENCY_THRESHOLD: f64 = 0.4;

/// Resolve raw arguments into a validated [`RunConfig`].
///
/// Checks run cheapest first: unknown keys, per-field coercion, enum
/// membership, cross-field invariants, and finally filesystem existence.
/// The first failure is returned and nothing is partially applied.
pub fn parse(raw: &RawArgs) -> ConfigResult<RunConfig> {
    if let Some(key) = raw.keys().find(|k| !is_known_key(k)) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
        });
    }

    let fields = CoercedFields::from_raw(raw)?;
    let config = fields.resolve_enums()?;
    check_invariants(&config)?;
    check_paths(&config)?;

    tracing::debug!(
        run = %config.run_name,
        dataset = %config.dataset,
        architecture = %config.architecture,
        "resolved run configuration"
    );
    Ok(config)
}

/// Field values after type coercion; enum identifiers are still raw text.
struct CoercedFields {
    data_dir: PathBuf,
    metadata_dir: PathBuf,
    dataset: String,
    image_size: u32,
    workers: u32,
    batch_size: u32,
    learning_rate: f64,
    learning_rate_decay: f64,
    epoch_step: u32,
    embedding_path: PathBuf,
    adjacency_paths: Vec<PathBuf>,
    architecture: String,
    use_graph: bool,
    use_graph_transform: bool,
    device_ids: Vec<u32>,
    run_name: String,
    tracking_enabled: bool,
    method: Option<String>,
    adjacency_threshold: f64,
    pretrained: bool,
    pretrained_path: Option<PathBuf>,
    large_feature_map: bool,
    acol_drop_threshold: Option<f64>,
    adl_drop_rate: Option<f64>,
    adl_drop_threshold: Option<f64>,
}

impl CoercedFields {
    fn from_raw(raw: &RawArgs) -> ConfigResult<Self> {
        Ok(Self {
            data_dir: required(raw, keys::DATA_DIR)?.into(),
            metadata_dir: required(raw, keys::METADATA_DIR)?.into(),
            dataset: required(raw, keys::DATASET)?.to_string(),
            image_size: number(keys::IMAGE_SIZE, required(raw, keys::IMAGE_SIZE)?)?,
            workers: optional_number(raw, keys::WORKERS)?.unwrap_or(DEFAULT_WORKERS),
            batch_size: number(keys::BATCH_SIZE, required(raw, keys::BATCH_SIZE)?)?,
            learning_rate: number(keys::LEARNING_RATE, required(raw, keys::LEARNING_RATE)?)?,
            learning_rate_decay: optional_number(raw, keys::LEARNING_RATE_DECAY)?
                .unwrap_or(DEFAULT_LEARNING_RATE_DECAY),
            epoch_step: optional_number(raw, keys::EPOCH_STEP)?.unwrap_or(DEFAULT_EPOCH_STEP),
            embedding_path: required(raw, keys::EMBEDDING_PATH)?.into(),
            adjacency_paths: list(raw, keys::ADJACENCY_PATHS)
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            architecture: required(raw, keys::ARCHITECTURE)?.to_string(),
            use_graph: switch(raw, keys::USE_GRAPH)?,
            use_graph_transform: switch(raw, keys::USE_GRAPH_TRANSFORM)?,
            device_ids: device_ids(raw)?,
            run_name: required(raw, keys::RUN_NAME)?.to_string(),
            tracking_enabled: switch(raw, keys::TRACKING_ENABLED)?,
            method: single(raw, keys::METHOD)?.map(str::to_string),
            adjacency_threshold: optional_number(raw, keys::ADJACENCY_THRESHOLD)?
                .unwrap_or(DEFAULT_ADJACENCY_THRESHOLD),
            pretrained: switch(raw, keys::PRETRAINED)?,
            pretrained_path: single(raw, keys::PRETRAINED_PATH)?.map(PathBuf::from),
            large_feature_map: switch(raw, keys::LARGE_FEATURE_MAP)?,
            acol_drop_threshold: optional_number(raw, keys::ACOL_DROP_THRESHOLD)?,
            adl_drop_rate: optional_number(raw, keys::ADL_DROP_RATE)?,
            adl_drop_threshold: optional_number(raw, keys::ADL_DROP_THRESHOLD)?,
        })
    }

    fn resolve_enums(self) -> ConfigResult<RunConfig> {
        let dataset = parse_enum(keys::DATASET, &self.dataset)?;
        let architecture = parse_enum(keys::ARCHITECTURE, &self.architecture)?;
        let method = match &self.method {
            Some(raw) => parse_enum(keys::METHOD, raw)?,
            None => Method::default(),
        };

        Ok(RunConfig {
            data_dir: self.data_dir,
            metadata_dir: self.metadata_dir,
            dataset,
            image_size: self.image_size,
            workers: self.workers,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            learning_rate_decay: self.learning_rate_decay,
            epoch_step: self.epoch_step,
            embedding_path: self.embedding_path,
            adjacency_paths: self.adjacency_paths,
            architecture,
            use_graph: self.use_graph,
            use_graph_transform: self.use_graph_transform,
            device_ids: self.device_ids,
            run_name: self.run_name,
            tracking_enabled: self.tracking_enabled,
            method,
            adjacency_threshold: self.adjacency_threshold,
            pretrained: self.pretrained,
            pretrained_path: self.pretrained_path,
            large_feature_map: self.large_feature_map,
            acol_drop_threshold: self.acol_drop_threshold,
            adl_drop_rate: self.adl_drop_rate,
            adl_drop_threshold: self.adl_drop_threshold,
        })
    }
}

fn single<'a>(raw: &'a RawArgs, key: &str) -> ConfigResult<Option<&'a str>> {
    match raw.get(key) {
        None => Ok(None),
        Some(RawValue::Single(value)) => Ok(Some(value.as_str())),
        Some(RawValue::List(values)) => Err(ConfigError::coercion(
            key,
            &values.join(" "),
            "a single value",
        )),
    }
}

fn required<'a>(raw: &'a RawArgs, key: &str) -> ConfigResult<&'a str> {
    single(raw, key)?.ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

trait Expected {
    const EXPECTED: &'static str;
}

impl Expected for u32 {
    const EXPECTED: &'static str = "a non-negative integer";
}

impl Expected for f64 {
    const EXPECTED: &'static str = "a number";
}

fn number<T: FromStr + Expected>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::coercion(key, value, T::EXPECTED))
}

fn optional_number<T: FromStr + Expected>(raw: &RawArgs, key: &str) -> ConfigResult<Option<T>> {
    single(raw, key)?.map(|v| number(key, v)).transpose()
}

fn switch(raw: &RawArgs, key: &str) -> ConfigResult<bool> {
    let Some(value) = single(raw, key)? else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::coercion(key, value, "a boolean")),
    }
}

fn list(raw: &RawArgs, key: &str) -> Vec<String> {
    match raw.get(key) {
        None => Vec::new(),
        Some(RawValue::Single(value)) => vec![value.clone()],
        Some(RawValue::List(values)) => values.clone(),
    }
}

fn device_ids(raw: &RawArgs) -> ConfigResult<Vec<u32>> {
    if !raw.contains_key(keys::DEVICE_IDS) {
        return Err(ConfigError::Missing {
            key: keys::DEVICE_IDS.to_string(),
        });
    }
    list(raw, keys::DEVICE_IDS)
        .iter()
        .map(|id| number(keys::DEVICE_IDS, id))
        .collect()
}

fn check_invariants(config: &RunConfig) -> ConfigResult<()> {
    if config.adjacency_paths.is_empty() {
        if config.use_graph_transform {
            return Err(ConfigError::invariant(
                keys::ADJACENCY_PATHS,
                "graph transform branch requires at least one adjacency file",
            ));
        }
        if config.use_graph {
            return Err(ConfigError::invariant(
                keys::ADJACENCY_PATHS,
                "label graph requires at least one adjacency file",
            ));
        }
        if config.method.uses_label_graph() {
            return Err(ConfigError::invariant(
                keys::ADJACENCY_PATHS,
                format!("method {} requires at least one adjacency file", config.method),
            ));
        }
    }

    for (key, value) in [
        (keys::IMAGE_SIZE, config.image_size),
        (keys::BATCH_SIZE, config.batch_size),
        (keys::EPOCH_STEP, config.epoch_step),
    ] {
        if value == 0 {
            return Err(ConfigError::invariant(key, "must be strictly positive"));
        }
    }

    if !(config.learning_rate.is_finite() && config.learning_rate > 0.0) {
        return Err(ConfigError::invariant(
            keys::LEARNING_RATE,
            "must be a positive finite number",
        ));
    }
    if !in_unit_interval(config.learning_rate_decay) {
        return Err(ConfigError::invariant(
            keys::LEARNING_RATE_DECAY,
            "must lie in (0, 1]",
        ));
    }
    for (key, value) in [
        (keys::ADJACENCY_THRESHOLD, Some(config.adjacency_threshold)),
        (keys::ACOL_DROP_THRESHOLD, config.acol_drop_threshold),
        (keys::ADL_DROP_RATE, config.adl_drop_rate),
        (keys::ADL_DROP_THRESHOLD, config.adl_drop_threshold),
    ] {
        if value.is_some_and(|v| !in_unit_interval(v)) {
            return Err(ConfigError::invariant(key, "must lie in (0, 1]"));
        }
    }

    if config.device_ids.is_empty() {
        return Err(ConfigError::invariant(
            keys::DEVICE_IDS,
            "at least one device id is required",
        ));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = config.device_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(ConfigError::invariant(
            keys::DEVICE_IDS,
            format!("duplicate device id {dup}"),
        ));
    }

    if config.run_name.trim().is_empty() {
        return Err(ConfigError::invariant(keys::RUN_NAME, "must not be blank"));
    }

    if !config.architecture.supports(config.method) {
        return Err(ConfigError::invariant(
            keys::METHOD,
            format!(
                "method {} is not available for architecture {}",
                config.method, config.architecture
            ),
        ));
    }
    if let Some(key) = missing_method_param(config) {
        return Err(ConfigError::invariant(
            key,
            format!("required by method {}", config.method),
        ));
    }

    if config.pretrained_path.is_some() && !config.pretrained {
        return Err(ConfigError::invariant(
            keys::PRETRAINED_PATH,
            "weights path given but pretrained loading is off",
        ));
    }

    Ok(())
}

/// First hyper-parameter the backbone factory reads for the method that is unset.
fn missing_method_param(config: &RunConfig) -> Option<&'static str> {
    let required = match config.method {
        Method::Acol => vec![(keys::ACOL_DROP_THRESHOLD, config.acol_drop_threshold)],
        Method::Adl => vec![
            (keys::ADL_DROP_RATE, config.adl_drop_rate),
            (keys::ADL_DROP_THRESHOLD, config.adl_drop_threshold),
        ],
        _ => Vec::new(),
    };
    required
        .into_iter()
        .find(|(_, value)| value.is_none())
        .map(|(key, _)| key)
}

fn in_unit_interval(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

fn check_paths(config: &RunConfig) -> ConfigResult<()> {
    check_dir(keys::DATA_DIR, &config.data_dir)?;
    check_dir(keys::METADATA_DIR, &config.metadata_dir)?;
    check_file(keys::EMBEDDING_PATH, &config.embedding_path)?;
    for path in &config.adjacency_paths {
        check_file(keys::ADJACENCY_PATHS, path)?;
    }
    if let Some(path) = &config.pretrained_path {
        check_file(keys::PRETRAINED_PATH, path)?;
    }
    Ok(())
}

fn not_found(key: &str, path: &Path) -> ConfigError {
    ConfigError::PathNotFound {
        key: key.to_string(),
        path: path.to_path_buf(),
    }
}

fn check_dir(key: &str, path: &Path) -> ConfigResult<()> {
    match fs::read_dir(path) {
        Ok(_) => Ok(()),
        Err(_) => Err(not_found(key, path)),
    }
}

fn check_file(key: &str, path: &Path) -> ConfigResult<()> {
    let meta = fs::metadata(path).map_err(|_| not_found(key, path))?;
    if meta.is_dir() {
        return check_dir(key, path);
    }
    fs::File::open(path)
        .map(|_| ())
        .map_err(|_| not_found(key, path))
}
