use ndarray::{Array1, Array2, ArrayView4};

use crate::shared::error::ShapeError;

/// Size of the network input and the factor it was scaled by.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageInfo {
    pub height: usize,
    pub width: usize,
    pub scale: f32,
}

/// Raw per-region outputs of the two-stage detector for one image.
///
/// All row counts equal the number of region proposals `R`.
#[derive(Clone, Debug)]
pub struct NetworkOutput {
    /// `R x 4` proposals in scaled-image coordinates.
    pub region_boxes: Array2<f32>,
    /// `R x C` class probabilities, column 0 is background.
    pub class_scores: Array2<f32>,
    /// `R x 4` (class-agnostic) or `R x 4C` regression deltas.
    pub box_deltas: Array2<f32>,
    /// `R x D` pooled embedding per region.
    pub pooled_features: Array2<f32>,
    /// Embedding of the whole frame.
    pub frame_feature: Array1<f32>,
}

impl NetworkOutput {
    pub fn num_regions(&self) -> usize {
        self.region_boxes.nrows()
    }

    pub fn feature_dim(&self) -> usize {
        self.pooled_features.ncols()
    }

    /// Checks every tensor against the region count and class layout.
    pub fn validate(&self, num_classes: usize, class_agnostic: bool) -> Result<(), ShapeError> {
        let r = self.num_regions();
        if self.region_boxes.ncols() != 4 {
            return Err(ShapeError::Columns {
                tensor: "region_boxes",
                expected: "4".into(),
                actual: self.region_boxes.ncols(),
            });
        }
        for (tensor, rows) in [
            ("class_scores", self.class_scores.nrows()),
            ("box_deltas", self.box_deltas.nrows()),
            ("pooled_features", self.pooled_features.nrows()),
        ] {
            if rows != r {
                return Err(ShapeError::Rows {
                    tensor,
                    expected: r,
                    actual: rows,
                });
            }
        }
        if self.class_scores.ncols() != num_classes {
            return Err(ShapeError::Columns {
                tensor: "class_scores",
                expected: num_classes.to_string(),
                actual: self.class_scores.ncols(),
            });
        }
        let delta_cols = if class_agnostic { 4 } else { 4 * num_classes };
        if self.box_deltas.ncols() != delta_cols {
            return Err(ShapeError::Columns {
                tensor: "box_deltas",
                expected: delta_cols.to_string(),
                actual: self.box_deltas.ncols(),
            });
        }
        Ok(())
    }
}

/// Opaque two-stage detector: backbone, region proposals and heads.
///
/// `blob` is the mean-subtracted, scaled image in `(1, H, W, 3)` layout.
/// Implementations own device placement; the post-processing pipeline
/// only sees host arrays.
pub trait RegionNetwork: Send {
    fn infer(
        &mut self,
        blob: ArrayView4<'_, f32>,
        info: ImageInfo,
    ) -> Result<NetworkOutput, Box<dyn std::error::Error + Send + Sync>>;
}
