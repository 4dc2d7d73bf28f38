//! Closed identifier sets: datasets, backbones, and localization methods.

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::ConfigError;

/// Dataset whose loader and label graph the training engine uses.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Coco,
    Voc,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Coco => "coco",
            Dataset::Voc => "voc",
        }
    }

    /// Number of label nodes in the dataset's co-occurrence graph.
    pub fn num_classes(&self) -> usize {
        match self {
            Dataset::Coco => 80,
            Dataset::Voc => 20,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Architecture {
    #[value(name = "resnet50")]
    #[serde(rename = "resnet50")]
    Resnet50,
    #[value(name = "resnet101")]
    #[serde(rename = "resnet101")]
    Resnet101,
    #[value(name = "resnext50_32x4d", alias = "resnext50")]
    #[serde(rename = "resnext50_32x4d")]
    Resnext50,
    /// Semi-weakly supervised ImageNet weights for the 32x4d variant.
    #[value(name = "resnext50_32x4d_swsl")]
    #[serde(rename = "resnext50_32x4d_swsl")]
    Resnext50Swsl,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Resnet50 => "resnet50",
            Architecture::Resnet101 => "resnet101",
            Architecture::Resnext50 => "resnext50_32x4d",
            Architecture::Resnext50Swsl => "resnext50_32x4d_swsl",
        }
    }

    /// Localization methods the backbone factory can build for this architecture.
    pub fn supported_methods(&self) -> &'static [Method] {
        match self {
            Architecture::Resnet50 => &[
                Method::Cam,
                Method::GradCam,
                Method::Acol,
                Method::Spg,
                Method::Adl,
            ],
            Architecture::Resnet101 => &[Method::GradCam, Method::GraphCam, Method::AddGraphCam],
            Architecture::Resnext50 | Architecture::Resnext50Swsl => {
                &[Method::GradCam, Method::GraphCam]
            }
        }
    }

    pub fn supports(&self, method: Method) -> bool {
        self.supported_methods().contains(&method)
    }
}

/// Class-activation / weakly-supervised localization variant.
#[derive(ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Cam,
    #[default]
    #[value(name = "grad_cam")]
    GradCam,
    Acol,
    Spg,
    Adl,
    #[value(name = "graph_cam")]
    GraphCam,
    #[value(name = "addgraph_cam")]
    #[serde(rename = "addgraph_cam")]
    AddGraphCam,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Cam => "cam",
            Method::GradCam => "grad_cam",
            Method::Acol => "acol",
            Method::Spg => "spg",
            Method::Adl => "adl",
            Method::GraphCam => "graph_cam",
            Method::AddGraphCam => "addgraph_cam",
        }
    }

    /// Methods that propagate over the label graph and so need adjacency input.
    pub fn uses_label_graph(&self) -> bool {
        matches!(self, Method::GraphCam | Method::AddGraphCam)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Dataset, Architecture, Method);

/// Match `raw` against the closed set of `T`, accepting aliases and any casing.
pub(crate) fn parse_enum<T: ValueEnum>(key: &str, raw: &str) -> Result<T, ConfigError> {
    T::from_str(raw.trim(), true).map_err(|_| ConfigError::UnknownEnumValue {
        key: key.to_string(),
        raw: raw.to_string(),
        allowed: allowed_values::<T>(),
    })
}

pub fn allowed_values<T: ValueEnum>() -> Vec<String> {
    T::value_variants()
        .iter()
        .filter_map(|v| v.to_possible_value())
        .map(|p| p.get_name().to_string())
        .collect()
}
