use std::path::{Path, PathBuf};

use crate::shared::config::NetType;
use crate::shared::constants::{DEFAULT_CHECKEPOCH, DEFAULT_CHECKPOINT, DEFAULT_CHECKSESSION};

use super::load_error::LoadError;

/// Training session, epoch and iteration that name a checkpoint file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointId {
    pub session: u32,
    pub epoch: u32,
    pub step: u32,
}

impl Default for CheckpointId {
    fn default() -> Self {
        Self {
            session: DEFAULT_CHECKSESSION,
            epoch: DEFAULT_CHECKEPOCH,
            step: DEFAULT_CHECKPOINT,
        }
    }
}

impl CheckpointId {
    /// `faster_rcnn_{session}_{epoch}_{step}.onnx`
    pub fn file_name(&self) -> String {
        format!(
            "faster_rcnn_{}_{}_{}.onnx",
            self.session, self.epoch, self.step
        )
    }
}

/// Locates `{load_dir}/{net}/{dataset}/faster_rcnn_{s}_{e}_{c}.onnx`.
///
/// The directory is checked first so a wrong `--load-dir` or dataset is
/// reported as such rather than as a missing file.
pub fn resolve(
    load_dir: &Path,
    net: NetType,
    dataset: &str,
    id: CheckpointId,
) -> Result<PathBuf, LoadError> {
    let dir = load_dir.join(net.as_str()).join(dataset);
    if !dir.is_dir() {
        return Err(LoadError::MissingDirectory(dir));
    }

    let path = dir.join(id.file_name());
    if !path.is_file() {
        return Err(LoadError::MissingCheckpoint(path));
    }
    log::debug!("resolved checkpoint {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_file_name() {
        assert_eq!(
            CheckpointId::default().file_name(),
            "faster_rcnn_1_6_18197.onnx"
        );
    }

    #[test]
    fn test_resolve_finds_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("res101").join("pascal_voc");
        fs::create_dir_all(&dir).unwrap();
        let expected = dir.join("faster_rcnn_2_3_400.onnx");
        fs::write(&expected, b"graph").unwrap();

        let id = CheckpointId {
            session: 2,
            epoch: 3,
            step: 400,
        };
        let path = resolve(tmp.path(), NetType::Res101, "pascal_voc", id).unwrap();
        assert_eq!(path, expected);
    }

    #[test]
    fn test_missing_directory_names_the_directory() {
        let tmp = TempDir::new().unwrap();
        let err = resolve(tmp.path(), NetType::Vgg16, "coco", CheckpointId::default()).unwrap_err();
        match err {
            LoadError::MissingDirectory(dir) => {
                assert_eq!(dir, tmp.path().join("vgg16").join("coco"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("res50").join("vehicles");
        fs::create_dir_all(&dir).unwrap();

        let err = resolve(tmp.path(), NetType::Res50, "vehicles", CheckpointId::default())
            .unwrap_err();
        assert!(
            matches!(err, LoadError::MissingCheckpoint(ref p) if p == &dir.join("faster_rcnn_1_6_18197.onnx")),
            "{err}"
        );
    }
}
