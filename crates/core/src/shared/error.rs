use std::path::PathBuf;

use thiserror::Error;

/// Invalid configuration, detected before any inference runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no test scales configured")]
    EmptyScales,
    #[error("only single-scale testing is supported, got {0} scales")]
    MultiScale(usize),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be in (0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f32 },
    #[error("{name} contains a non-finite value")]
    NonFinite { name: &'static str },
    #[error("unknown backbone '{0}', expected one of: vgg16, res50, res101, res152")]
    UnknownBackbone(String),
    #[error("unknown class list '{0}', expected one of: vehicles, pascal_voc, coco")]
    UnknownClassPreset(String),
    #[error("class list must start with '__background__' and name at least one foreground class")]
    InvalidClassList,
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown config key '{0}'")]
    UnknownKey(String),
    #[error("invalid value '{value}' for {key}: {source}")]
    InvalidValue {
        key: String,
        value: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config overrides must come in KEY VALUE pairs, '{0}' has no value")]
    DanglingKey(String),
    #[error("label font could not be loaded: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
}

/// A tensor reached a stage with an unexpected rank or dimension.
///
/// The pipeline assumes a single image per batch; anything else is a
/// programming or export defect and aborts the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("{tensor}: expected rank {expected}, got {actual}")]
    Rank {
        tensor: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{tensor}: expected batch size 1, got {actual}")]
    Batch { tensor: &'static str, actual: usize },
    #[error("{tensor}: expected {expected} rows, got {actual}")]
    Rows {
        tensor: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{tensor}: expected {expected} columns, got {actual}")]
    Columns {
        tensor: &'static str,
        expected: String,
        actual: usize,
    },
    #[error("{tensor}: expected {expected} channels, got {actual}")]
    Channels {
        tensor: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("frame has zero width or height")]
    EmptyFrame,
    #[error("frame buffer holds {actual} bytes, dimensions need {expected}")]
    FrameBuffer { expected: usize, actual: usize },
    #[error("expected a single-scale image pyramid, got {0} levels")]
    PyramidLevels(usize),
}

/// Failure while processing one frame.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("inference failed: {0}")]
    Inference(Box<dyn std::error::Error + Send + Sync>),
    #[error("visualization sink failed: {0}")]
    Visualization(Box<dyn std::error::Error + Send + Sync>),
}
