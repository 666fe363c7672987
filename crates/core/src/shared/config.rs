//! Immutable detector configuration.
//!
//! Built once (defaults, then an optional JSON file, then `KEY VALUE`
//! overrides), validated, and handed by value to the pipeline. Nothing
//! mutates it after construction.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    BACKGROUND_CLASS, COCO_CLASSES, DEFAULT_BBOX_NORMALIZE_MEANS, DEFAULT_BBOX_NORMALIZE_STDS,
    DEFAULT_NMS_THRESH, DEFAULT_PIXEL_MEANS, DEFAULT_TEST_MAX_SIZE, DEFAULT_TEST_SCALE,
    PASCAL_VOC_CLASSES, VEHICLE_CLASSES,
};
use crate::shared::error::ConfigError;

/// Backbone network a checkpoint was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetType {
    Vgg16,
    Res50,
    Res101,
    Res152,
}

impl NetType {
    pub const ALL: &'static [NetType] = &[
        NetType::Vgg16,
        NetType::Res50,
        NetType::Res101,
        NetType::Res152,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetType::Vgg16 => "vgg16",
            NetType::Res50 => "res50",
            NetType::Res101 => "res101",
            NetType::Res152 => "res152",
        }
    }
}

impl fmt::Display for NetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetType::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownBackbone(s.to_string()))
    }
}

/// Built-in class list by name. Every list starts with the background class.
pub fn class_preset(name: &str) -> Result<Vec<String>, ConfigError> {
    let list = match name {
        "vehicles" => VEHICLE_CLASSES,
        "pascal_voc" => PASCAL_VOC_CLASSES,
        "coco" => COCO_CLASSES,
        other => return Err(ConfigError::UnknownClassPreset(other.to_string())),
    };
    Ok(list.iter().map(|c| c.to_string()).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    /// Target length of the shorter image side. Exactly one entry is supported.
    pub scales: Vec<u32>,
    /// Upper bound on the longer image side after scaling.
    pub max_size: u32,
    /// IoU above which a lower-scoring box of the same class is suppressed.
    pub nms: f32,
    /// Apply the regression head; when off, proposals are used as-is.
    pub bbox_reg: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            scales: vec![DEFAULT_TEST_SCALE],
            max_size: DEFAULT_TEST_MAX_SIZE,
            nms: DEFAULT_NMS_THRESH,
            bbox_reg: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BboxNormalizeConfig {
    /// Deltas were normalized during training and must be un-normalized.
    pub precomputed: bool,
    pub means: [f32; 4],
    pub stds: [f32; 4],
}

impl Default for BboxNormalizeConfig {
    fn default() -> Self {
        Self {
            precomputed: true,
            means: DEFAULT_BBOX_NORMALIZE_MEANS,
            stds: DEFAULT_BBOX_NORMALIZE_STDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    pub net: NetType,
    /// Class names indexed by score column; column 0 is background.
    pub classes: Vec<String>,
    pub class_agnostic: bool,
    /// Subtracted from every pixel before scaling, BGR order.
    pub pixel_means: [f32; 3],
    pub test: TestConfig,
    pub bbox_normalize: BboxNormalizeConfig,
    pub use_gpu: bool,
    pub visualize: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            net: NetType::Res101,
            classes: VEHICLE_CLASSES.iter().map(|c| c.to_string()).collect(),
            class_agnostic: false,
            pixel_means: DEFAULT_PIXEL_MEANS,
            test: TestConfig::default(),
            bbox_normalize: BboxNormalizeConfig::default(),
            use_gpu: false,
            visualize: false,
        }
    }
}

impl ExtractorConfig {
    /// Loads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Applies a flat `[KEY, VALUE, KEY, VALUE, ...]` override list.
    pub fn apply_overrides<S: AsRef<str>>(&mut self, pairs: &[S]) -> Result<(), ConfigError> {
        for chunk in pairs.chunks(2) {
            match chunk {
                [key, value] => self.set(key.as_ref(), value.as_ref())?,
                [key] => return Err(ConfigError::DanglingKey(key.as_ref().to_string())),
                _ => unreachable!("chunks(2) yields one or two items"),
            }
        }
        Ok(())
    }

    /// Sets one option by its dotted key, e.g. `TEST.NMS 0.45`.
    ///
    /// Values use JSON syntax (`[600]`, `0.3`, `true`); Python-style
    /// `True`/`False` are accepted as well.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "TEST.SCALES" => self.test.scales = parse_value(key, value)?,
            "TEST.MAX_SIZE" => self.test.max_size = parse_value(key, value)?,
            "TEST.NMS" => self.test.nms = parse_value(key, value)?,
            "TEST.BBOX_REG" => self.test.bbox_reg = parse_value(key, value)?,
            "PIXEL_MEANS" => self.pixel_means = parse_value(key, value)?,
            "TRAIN.BBOX_NORMALIZE_TARGETS_PRECOMPUTED" => {
                self.bbox_normalize.precomputed = parse_value(key, value)?
            }
            "TRAIN.BBOX_NORMALIZE_MEANS" => self.bbox_normalize.means = parse_value(key, value)?,
            "TRAIN.BBOX_NORMALIZE_STDS" => self.bbox_normalize.stds = parse_value(key, value)?,
            "CLASS_AGNOSTIC" => self.class_agnostic = parse_value(key, value)?,
            "USE_GPU" => self.use_gpu = parse_value(key, value)?,
            "VIS" => self.visualize = parse_value(key, value)?,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.test.scales.as_slice() {
            [] => return Err(ConfigError::EmptyScales),
            [scale] if *scale == 0 => {
                return Err(ConfigError::NonPositive {
                    name: "TEST.SCALES",
                    value: 0.0,
                })
            }
            [_] => {}
            many => return Err(ConfigError::MultiScale(many.len())),
        }
        if self.test.max_size == 0 {
            return Err(ConfigError::NonPositive {
                name: "TEST.MAX_SIZE",
                value: 0.0,
            });
        }
        if !(self.test.nms > 0.0 && self.test.nms <= 1.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "TEST.NMS",
                value: self.test.nms,
            });
        }
        if self.pixel_means.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite {
                name: "PIXEL_MEANS",
            });
        }
        let norm = &self.bbox_normalize;
        if norm.means.iter().chain(norm.stds.iter()).any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite {
                name: "TRAIN.BBOX_NORMALIZE_MEANS/STDS",
            });
        }
        if self.classes.len() < 2 || self.classes[0] != BACKGROUND_CLASS {
            return Err(ConfigError::InvalidClassList);
        }
        Ok(())
    }

    /// Number of score columns, background included.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Name of the class at score column `column` (0 is background).
    pub fn class_name(&self, column: usize) -> Option<&str> {
        self.classes.get(column).map(String::as_str)
    }

    /// `(means, stds)` to un-normalize deltas with, if training normalized them.
    pub fn delta_normalization(&self) -> Option<([f32; 4], [f32; 4])> {
        self.bbox_normalize
            .precomputed
            .then_some((self.bbox_normalize.means, self.bbox_normalize.stds))
    }
}

fn parse_value<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConfigError> {
    let normalized = match raw.trim() {
        "True" => "true",
        "False" => "false",
        other => other,
    };
    serde_json::from_str(normalized).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        source: e,
    })
}
