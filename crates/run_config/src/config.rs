use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aliases::{keys, looks_like_flag, lookup_key, Arity};
use crate::types::{Architecture, Dataset, Method};

/// Fully validated configuration for one training run.
///
/// Only [`crate::parse`] builds a `RunConfig`; once built it cannot be
/// changed, so every accessor reflects what was validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) metadata_dir: PathBuf,
    pub(crate) dataset: Dataset,
    pub(crate) image_size: u32,
    pub(crate) workers: u32,
    pub(crate) batch_size: u32,
    pub(crate) learning_rate: f64,
    pub(crate) learning_rate_decay: f64,
    pub(crate) epoch_step: u32,
    pub(crate) embedding_path: PathBuf,
    pub(crate) adjacency_paths: Vec<PathBuf>,
    pub(crate) architecture: Architecture,
    pub(crate) use_graph: bool,
    pub(crate) use_graph_transform: bool,
    pub(crate) device_ids: Vec<u32>,
    pub(crate) run_name: String,
    pub(crate) tracking_enabled: bool,
    pub(crate) method: Method,
    pub(crate) adjacency_threshold: f64,
    pub(crate) pretrained: bool,
    pub(crate) pretrained_path: Option<PathBuf>,
    pub(crate) large_feature_map: bool,
    pub(crate) acol_drop_threshold: Option<f64>,
    pub(crate) adl_drop_rate: Option<f64>,
    pub(crate) adl_drop_threshold: Option<f64>,
}

impl RunConfig {
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Edge length in pixels of the square input resize.
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Data-loading worker count; zero means loading on the training thread.
    pub fn workers(&self) -> u32 {
        self.workers
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Multiplicative factor applied to the learning rate every `epoch_step` epochs.
    pub fn learning_rate_decay(&self) -> f64 {
        self.learning_rate_decay
    }

    pub fn epoch_step(&self) -> u32 {
        self.epoch_step
    }

    pub fn embedding_path(&self) -> &Path {
        &self.embedding_path
    }

    /// Adjacency files ordered by relational order (1-hop first).
    pub fn adjacency_paths(&self) -> &[PathBuf] {
        &self.adjacency_paths
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn use_graph(&self) -> bool {
        self.use_graph
    }

    pub fn use_graph_transform(&self) -> bool {
        self.use_graph_transform
    }

    pub fn device_ids(&self) -> &[u32] {
        &self.device_ids
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn adjacency_threshold(&self) -> f64 {
        self.adjacency_threshold
    }

    /// Start from published weights; `pretrained_path` overrides the download.
    pub fn pretrained(&self) -> bool {
        self.pretrained
    }

    pub fn pretrained_path(&self) -> Option<&Path> {
        self.pretrained_path.as_deref()
    }

    /// Keep layer3 at stride 1 for a 2x larger final feature map.
    pub fn large_feature_map(&self) -> bool {
        self.large_feature_map
    }

    pub fn acol_drop_threshold(&self) -> Option<f64> {
        self.acol_drop_threshold
    }

    pub fn adl_drop_rate(&self) -> Option<f64> {
        self.adl_drop_rate
    }

    pub fn adl_drop_threshold(&self) -> Option<f64> {
        self.adl_drop_threshold
    }

    pub fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }

    /// Render the config as surface flags the training scripts accept.
    ///
    /// Switches are emitted only when set. Values that would read as a flag
    /// use the `--flag=value` form. Feeding the result back through
    /// [`crate::tokenize`] and [`crate::parse`] yields an equal config.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |key: &str, values: Vec<String>| {
            let Some(spec) = lookup_key(key) else {
                return;
            };
            let inline = spec.inline_spelling().filter(|_| match spec.arity {
                Arity::Values => values.iter().any(|v| looks_like_flag(v)),
                _ => values.first().is_some_and(|v| looks_like_flag(v)),
            });
            match inline {
                Some(flag) => args.push(format!("{flag}={}", values.join(","))),
                None => {
                    args.push(spec.primary().to_string());
                    args.extend(values);
                }
            }
        };

        push(keys::DATA_DIR, vec![path_str(&self.data_dir)]);
        push(keys::METADATA_DIR, vec![path_str(&self.metadata_dir)]);
        push(keys::DATASET, vec![self.dataset.to_string()]);
        push(keys::IMAGE_SIZE, vec![self.image_size.to_string()]);
        push(keys::WORKERS, vec![self.workers.to_string()]);
        push(keys::BATCH_SIZE, vec![self.batch_size.to_string()]);
        push(keys::LEARNING_RATE, vec![self.learning_rate.to_string()]);
        push(
            keys::LEARNING_RATE_DECAY,
            vec![self.learning_rate_decay.to_string()],
        );
        push(keys::EPOCH_STEP, vec![self.epoch_step.to_string()]);
        push(keys::EMBEDDING_PATH, vec![path_str(&self.embedding_path)]);
        if !self.adjacency_paths.is_empty() {
            push(
                keys::ADJACENCY_PATHS,
                self.adjacency_paths.iter().map(|p| path_str(p)).collect(),
            );
        }
        push(keys::ARCHITECTURE, vec![self.architecture.to_string()]);
        if self.use_graph {
            push(keys::USE_GRAPH, Vec::new());
        }
        if self.use_graph_transform {
            push(keys::USE_GRAPH_TRANSFORM, Vec::new());
        }
        push(
            keys::DEVICE_IDS,
            self.device_ids.iter().map(u32::to_string).collect(),
        );
        push(keys::RUN_NAME, vec![self.run_name.clone()]);
        if self.tracking_enabled {
            push(keys::TRACKING_ENABLED, Vec::new());
        }
        push(keys::METHOD, vec![self.method.to_string()]);
        push(
            keys::ADJACENCY_THRESHOLD,
            vec![self.adjacency_threshold.to_string()],
        );
        if self.pretrained {
            push(keys::PRETRAINED, Vec::new());
        }
        if let Some(path) = &self.pretrained_path {
            push(keys::PRETRAINED_PATH, vec![path_str(path)]);
        }
        if self.large_feature_map {
            push(keys::LARGE_FEATURE_MAP, Vec::new());
        }
        for (key, value) in [
            (keys::ACOL_DROP_THRESHOLD, self.acol_drop_threshold),
            (keys::ADL_DROP_RATE, self.adl_drop_rate),
            (keys::ADL_DROP_THRESHOLD, self.adl_drop_threshold),
        ] {
            if let Some(value) = value {
                push(key, vec![value.to_string()]);
            }
        }
        args
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

fn list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let rendered: Vec<String> = items.into_iter().map(|i| i.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}

const NONE: &str = "none";

fn optional<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| NONE.to_string(), |v| v.to_string())
}

/// Human-readable rendering for logs and audit trails.
///
/// One `key = value` line per field in a fixed order; equal configs always
/// render to identical bytes.
pub fn describe(config: &RunConfig) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| {
        let _ = writeln!(out, "{key} = {value}");
    };

    line(keys::DATA_DIR, path_str(&config.data_dir));
    line(keys::METADATA_DIR, path_str(&config.metadata_dir));
    line(keys::DATASET, config.dataset.to_string());
    line(keys::IMAGE_SIZE, config.image_size.to_string());
    line(keys::WORKERS, config.workers.to_string());
    line(keys::BATCH_SIZE, config.batch_size.to_string());
    line(keys::LEARNING_RATE, config.learning_rate.to_string());
    line(
        keys::LEARNING_RATE_DECAY,
        config.learning_rate_decay.to_string(),
    );
    line(keys::EPOCH_STEP, config.epoch_step.to_string());
    line(keys::EMBEDDING_PATH, path_str(&config.embedding_path));
    line(
        keys::ADJACENCY_PATHS,
        list(config.adjacency_paths.iter().map(|p| p.display())),
    );
    line(keys::ARCHITECTURE, config.architecture.to_string());
    line(keys::USE_GRAPH, config.use_graph.to_string());
    line(
        keys::USE_GRAPH_TRANSFORM,
        config.use_graph_transform.to_string(),
    );
    line(keys::DEVICE_IDS, list(&config.device_ids));
    line(keys::RUN_NAME, config.run_name.clone());
    line(keys::TRACKING_ENABLED, config.tracking_enabled.to_string());
    line(keys::METHOD, config.method.to_string());
    line(
        keys::ADJACENCY_THRESHOLD,
        config.adjacency_threshold.to_string(),
    );
    line(keys::PRETRAINED, config.pretrained.to_string());
    line(
        keys::PRETRAINED_PATH,
        config
            .pretrained_path
            .as_deref()
            .map(path_str)
            .unwrap_or_else(|| NONE.to_string()),
    );
    line(keys::LARGE_FEATURE_MAP, config.large_feature_map.to_string());
    line(keys::ACOL_DROP_THRESHOLD, optional(config.acol_drop_threshold));
    line(keys::ADL_DROP_RATE, optional(config.adl_drop_rate));
    line(keys::ADL_DROP_THRESHOLD, optional(config.adl_drop_threshold));
    out
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self))
    }
}
