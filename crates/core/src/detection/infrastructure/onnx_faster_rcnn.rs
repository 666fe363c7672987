/// Faster R-CNN exported to ONNX, run through `ort`.
///
/// The graph takes the NCHW image blob plus `im_info = [[H, W, scale]]` and
/// returns proposals, class probabilities, regression deltas and the two
/// feature maps. Everything after that lives in the domain layer.
use std::path::Path;

use ndarray::{s, Array2, Array4, ArrayView4, ArrayViewD, Axis, Ix2};
use ort::session::Session;
use ort::value::{DynValue, Tensor, ValueType};

use crate::detection::domain::backbone::{backbone_for, Backbone};
use crate::detection::domain::region_network::{ImageInfo, NetworkOutput, RegionNetwork};
use crate::shared::config::NetType;
use crate::shared::error::ShapeError;

use super::execution_provider::execution_providers;
use super::load_error::LoadError;

pub const IM_DATA: &str = "im_data";
pub const IM_INFO: &str = "im_info";
pub const ROIS: &str = "rois";
pub const CLS_PROB: &str = "cls_prob";
pub const BBOX_PRED: &str = "bbox_pred";
pub const POOLED_FEAT: &str = "pooled_feat";
pub const BASE_FEAT: &str = "base_feat";

const INPUTS: [&str; 2] = [IM_DATA, IM_INFO];
const OUTPUTS: [&str; 5] = [ROIS, CLS_PROB, BBOX_PRED, POOLED_FEAT, BASE_FEAT];

/// `rois` rows are `[batch_index, x1, y1, x2, y2]`.
const ROI_COLUMNS: usize = 5;

pub struct OnnxFasterRcnn {
    session: Session,
    backbone: Box<dyn Backbone>,
}

impl OnnxFasterRcnn {
    /// Opens the checkpoint and checks its graph against the declared
    /// backbone, class count and regression mode.
    pub fn load(
        net: NetType,
        classes: &[String],
        class_agnostic: bool,
        checkpoint: &Path,
        use_gpu: bool,
    ) -> Result<Self, LoadError> {
        let session = build_session(checkpoint, use_gpu).map_err(|source| LoadError::Session {
            path: checkpoint.to_path_buf(),
            source,
        })?;
        let backbone = backbone_for(net);

        for name in INPUTS {
            if !session.inputs().iter().any(|i| i.name() == name) {
                return Err(LoadError::MissingInput(name));
            }
        }
        for name in OUTPUTS {
            let shape = session
                .outputs()
                .iter()
                .find(|o| o.name() == name)
                .ok_or(LoadError::MissingOutput(name))
                .map(|o| match o.dtype() {
                    ValueType::Tensor { shape, .. } => shape.to_vec(),
                    _ => Vec::new(),
                })?;
            check_output(name, &shape, classes.len(), class_agnostic, backbone.as_ref())?;
        }

        log::info!(
            "loaded {} detector ({} classes{}) from {}",
            net,
            classes.len(),
            if class_agnostic { ", class-agnostic" } else { "" },
            checkpoint.display()
        );
        Ok(Self { session, backbone })
    }
}

fn build_session(
    path: &Path,
    use_gpu: bool,
) -> Result<Session, Box<dyn std::error::Error + Send + Sync>> {
    let session = Session::builder()?
        .with_execution_providers(execution_providers(use_gpu))?
        .commit_from_file(path)?;
    Ok(session)
}

/// Compares the statically known dimensions of one output with what the
/// post-processing expects. Dynamic dimensions (`-1`) always pass.
fn check_output(
    name: &'static str,
    shape: &[i64],
    num_classes: usize,
    class_agnostic: bool,
    backbone: &dyn Backbone,
) -> Result<(), LoadError> {
    let last = shape.len().saturating_sub(1);
    match name {
        CLS_PROB => expect_dim(name, shape, last, &[num_classes]),
        BBOX_PRED if class_agnostic => expect_dim(name, shape, last, &[4]),
        BBOX_PRED => expect_dim(name, shape, last, &[4 * num_classes]),
        ROIS => expect_dim(name, shape, last, &[ROI_COLUMNS]),
        POOLED_FEAT if shape.len() == 4 => {
            expect_dim(name, shape, 1, &[backbone.pooled_channels()])
        }
        _ => Ok(()),
    }
}

fn expect_dim(
    output: &'static str,
    shape: &[i64],
    axis: usize,
    allowed: &[usize],
) -> Result<(), LoadError> {
    match shape.get(axis) {
        Some(&d) if d >= 0 && !allowed.iter().any(|&a| a as i64 == d) => {
            Err(LoadError::ArchitectureMismatch {
                output,
                axis,
                expected: allowed
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(" or "),
                actual: d,
            })
        }
        _ => Ok(()),
    }
}

impl RegionNetwork for OnnxFasterRcnn {
    fn infer(
        &mut self,
        blob: ArrayView4<'_, f32>,
        info: ImageInfo,
    ) -> Result<NetworkOutput, Box<dyn std::error::Error + Send + Sync>> {
        // (1, H, W, 3) -> (1, 3, H, W)
        let im_data: Array4<f32> = blob
            .permuted_axes([0, 3, 1, 2])
            .as_standard_layout()
            .into_owned();
        let im_info = Array2::from_shape_vec(
            (1, 3),
            vec![info.height as f32, info.width as f32, info.scale],
        )?;

        let outputs = self.session.run(ort::inputs![
            IM_DATA => Tensor::from_array(im_data)?,
            IM_INFO => Tensor::from_array(im_info)?
        ])?;

        let rois = single_batch(tensor(outputs.get(ROIS), ROIS)?, ROIS)?;
        if rois.ncols() != ROI_COLUMNS {
            return Err(ShapeError::Columns {
                tensor: ROIS,
                expected: ROI_COLUMNS.to_string(),
                actual: rois.ncols(),
            }
            .into());
        }

        Ok(NetworkOutput {
            region_boxes: rois.slice(s![.., 1..]).to_owned(),
            class_scores: single_batch(tensor(outputs.get(CLS_PROB), CLS_PROB)?, CLS_PROB)?,
            box_deltas: single_batch(tensor(outputs.get(BBOX_PRED), BBOX_PRED)?, BBOX_PRED)?,
            pooled_features: self
                .backbone
                .embed_regions(tensor(outputs.get(POOLED_FEAT), POOLED_FEAT)?)?,
            frame_feature: self
                .backbone
                .embed_frame(tensor(outputs.get(BASE_FEAT), BASE_FEAT)?)?,
        })
    }
}

fn tensor<'v>(
    value: Option<&'v DynValue>,
    name: &str,
) -> Result<ArrayViewD<'v, f32>, Box<dyn std::error::Error + Send + Sync>> {
    let value = value.ok_or_else(|| format!("model produced no '{name}' output"))?;
    Ok(value.try_extract_array::<f32>()?)
}

/// Drops the leading batch axis of a `(1, R, K)` output.
fn single_batch(view: ArrayViewD<'_, f32>, tensor: &'static str) -> Result<Array2<f32>, ShapeError> {
    if view.ndim() != 3 {
        return Err(ShapeError::Rank {
            tensor,
            expected: 3,
            actual: view.ndim(),
        });
    }
    if view.shape()[0] != 1 {
        return Err(ShapeError::Batch {
            tensor,
            actual: view.shape()[0],
        });
    }
    view.index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map(|rows| rows.to_owned())
        .map_err(|_| ShapeError::Rank {
            tensor,
            expected: 3,
            actual: view.ndim(),
        })
}
