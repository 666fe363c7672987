use ndarray::{Array2, ArrayView2};

use crate::detection::domain::suppressor::SurvivorIndex;
use crate::shared::error::ShapeError;

/// Gathers the pooled feature row of every survivor, in survivor order.
///
/// Row `i` of the result belongs to `survivors.entries()[i]`. An empty
/// index yields a `0 x D` matrix.
pub fn align_features(
    features: ArrayView2<'_, f32>,
    survivors: &SurvivorIndex,
) -> Result<Array2<f32>, ShapeError> {
    let regions: Vec<usize> = survivors.regions().collect();
    if let Some(&max) = regions.iter().max() {
        if max >= features.nrows() {
            return Err(ShapeError::Rows {
                tensor: "pooled_features",
                expected: max + 1,
                actual: features.nrows(),
            });
        }
    }

    let dim = features.ncols();
    Ok(Array2::from_shape_fn((regions.len(), dim), |(i, j)| {
        features[[regions[i], j]]
    }))
}
