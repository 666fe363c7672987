use ndarray::{Array1, Array2, ArrayView1};
use serde::Serialize;

use crate::shared::bbox::BoundingBox;
use crate::shared::error::ShapeError;

/// One detected object in source-frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f32,
    /// Foreground class id (score column minus one) in per-class NMS mode;
    /// the raw argmax column, background included, in top-class mode.
    pub class_id: usize,
}

/// Detections of one frame paired by position with their region features.
///
/// `features.row(i)` is the pooled embedding of the region that produced
/// `detections[i]`. The constructor refuses anything else.
#[derive(Clone, Debug)]
pub struct DetectionSet {
    detections: Vec<Detection>,
    features: Array2<f32>,
    frame_feature: Array1<f32>,
}

impl DetectionSet {
    pub fn new(
        detections: Vec<Detection>,
        features: Array2<f32>,
        frame_feature: Array1<f32>,
    ) -> Result<Self, ShapeError> {
        if detections.len() != features.nrows() {
            return Err(ShapeError::Rows {
                tensor: "result_features",
                expected: detections.len(),
                actual: features.nrows(),
            });
        }
        Ok(Self {
            detections,
            features,
            frame_feature,
        })
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    pub fn frame_feature(&self) -> &Array1<f32> {
        &self.frame_feature
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Detection, ArrayView1<'_, f32>)> {
        self.detections.iter().zip(self.features.outer_iter())
    }

    /// `(features, detections, frame_feature)`.
    pub fn into_parts(self) -> (Array2<f32>, Vec<Detection>, Array1<f32>) {
        (self.features, self.detections, self.frame_feature)
    }
}
