use std::path::PathBuf;

use thiserror::Error;

/// Failure to locate or open a detector checkpoint.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("checkpoint directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("checkpoint {0} does not exist")]
    MissingCheckpoint(PathBuf),
    #[error("failed to load model {path}: {source}")]
    Session {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("model has no input named '{0}'")]
    MissingInput(&'static str),
    #[error("model has no output named '{0}'")]
    MissingOutput(&'static str),
    #[error("output '{output}' dimension {axis} is {actual}, expected {expected}")]
    ArchitectureMismatch {
        output: &'static str,
        axis: usize,
        expected: String,
        actual: i64,
    },
}
