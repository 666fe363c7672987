use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::detection::domain::region_network::ImageInfo;
use crate::shared::bbox::BoundingBox;
use crate::shared::config::ExtractorConfig;
use crate::shared::error::ShapeError;

/// Decoded boxes in source-frame coordinates, `R x 4` or `R x 4C`.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictedBoxes {
    boxes: Array2<f32>,
    class_agnostic: bool,
}

impl PredictedBoxes {
    pub fn num_regions(&self) -> usize {
        self.boxes.nrows()
    }

    /// Box of `region` for the class at score column `class_column`.
    pub fn class_box(&self, region: usize, class_column: usize) -> BoundingBox {
        let start = if self.class_agnostic {
            0
        } else {
            class_column * 4
        };
        let row = self.boxes.row(region);
        BoundingBox::new(row[start], row[start + 1], row[start + 2], row[start + 3])
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.boxes
    }
}

/// Turns proposals plus regression deltas into clipped source-frame boxes.
pub struct BoxDecoder {
    num_classes: usize,
    class_agnostic: bool,
    regression_enabled: bool,
    normalization: Option<([f32; 4], [f32; 4])>,
}

impl BoxDecoder {
    pub fn new(
        num_classes: usize,
        class_agnostic: bool,
        regression_enabled: bool,
        normalization: Option<([f32; 4], [f32; 4])>,
    ) -> Self {
        Self {
            num_classes,
            class_agnostic,
            regression_enabled,
            normalization,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(
            config.num_classes(),
            config.class_agnostic,
            config.test.bbox_reg,
            config.delta_normalization(),
        )
    }

    /// Decodes one image's proposals.
    ///
    /// `region_boxes` are in the scaled image described by `info`. With
    /// regression enabled, each predicted box is clipped to that image
    /// before being divided by `info.scale`. With regression disabled the
    /// proposals are repeated once per class and only rescaled.
    pub fn decode(
        &self,
        region_boxes: ArrayView2<'_, f32>,
        box_deltas: ArrayView2<'_, f32>,
        info: ImageInfo,
    ) -> Result<PredictedBoxes, ShapeError> {
        if region_boxes.ncols() != 4 {
            return Err(ShapeError::Columns {
                tensor: "region_boxes",
                expected: "4".into(),
                actual: region_boxes.ncols(),
            });
        }
        if !self.regression_enabled {
            return Ok(self.tile_proposals(region_boxes, info.scale));
        }

        let delta_cols = if self.class_agnostic {
            4
        } else {
            4 * self.num_classes
        };
        if box_deltas.ncols() != delta_cols {
            return Err(ShapeError::Columns {
                tensor: "box_deltas",
                expected: delta_cols.to_string(),
                actual: box_deltas.ncols(),
            });
        }
        if box_deltas.nrows() != region_boxes.nrows() {
            return Err(ShapeError::Rows {
                tensor: "box_deltas",
                expected: region_boxes.nrows(),
                actual: box_deltas.nrows(),
            });
        }

        let (width, height) = (info.width as f32, info.height as f32);
        let mut boxes = Array2::<f32>::zeros((region_boxes.nrows(), delta_cols));
        for (i, (proposal, deltas)) in region_boxes
            .outer_iter()
            .zip(box_deltas.outer_iter())
            .enumerate()
        {
            let anchor = row_box(proposal, 0);
            for k in 0..delta_cols / 4 {
                let delta = self.unnormalize([
                    deltas[4 * k],
                    deltas[4 * k + 1],
                    deltas[4 * k + 2],
                    deltas[4 * k + 3],
                ]);
                let decoded = bbox_transform_inv(&anchor, delta)
                    .clip(width, height)
                    .unscale(info.scale);
                for (j, v) in decoded.to_array().into_iter().enumerate() {
                    boxes[[i, 4 * k + j]] = v;
                }
            }
        }

        Ok(PredictedBoxes {
            boxes,
            class_agnostic: self.class_agnostic,
        })
    }

    fn unnormalize(&self, delta: [f32; 4]) -> [f32; 4] {
        match self.normalization {
            Some((means, stds)) => [
                delta[0] * stds[0] + means[0],
                delta[1] * stds[1] + means[1],
                delta[2] * stds[2] + means[2],
                delta[3] * stds[3] + means[3],
            ],
            None => delta,
        }
    }

    fn tile_proposals(&self, region_boxes: ArrayView2<'_, f32>, scale: f32) -> PredictedBoxes {
        let cols = 4 * self.num_classes;
        let boxes = Array2::from_shape_fn((region_boxes.nrows(), cols), |(i, c)| {
            region_boxes[[i, c % 4]] / scale
        });
        PredictedBoxes {
            boxes,
            class_agnostic: self.class_agnostic,
        }
    }
}

/// Applies `(dx, dy, dw, dh)` to `anchor`: the center shifts by
/// `d{x,y}` widths/heights and each side grows by `exp(d{w,h})`.
pub fn bbox_transform_inv(anchor: &BoundingBox, delta: [f32; 4]) -> BoundingBox {
    let [dx, dy, dw, dh] = delta;
    let (w, h) = (anchor.width(), anchor.height());
    let (cx, cy) = anchor.center();

    let pred_cx = dx * w + cx;
    let pred_cy = dy * h + cy;
    let pred_w = dw.exp() * w;
    let pred_h = dh.exp() * h;

    BoundingBox::new(
        pred_cx - 0.5 * pred_w,
        pred_cy - 0.5 * pred_h,
        pred_cx + 0.5 * pred_w,
        pred_cy + 0.5 * pred_h,
    )
}

fn row_box(row: ArrayView1<'_, f32>, start: usize) -> BoundingBox {
    BoundingBox::new(row[start], row[start + 1], row[start + 2], row[start + 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};
    use rstest::rstest;

    fn info(width: usize, height: usize, scale: f32) -> ImageInfo {
        ImageInfo {
            height,
            width,
            scale,
        }
    }

    #[test]
    fn test_regression_disabled_at_unit_scale_returns_proposals() {
        let proposals = array![[10.5, 20.25, 30.0, 40.0], [0.0, 0.0, 599.0, 799.0]];
        let decoder = BoxDecoder::new(3, false, false, None);
        let pred = decoder
            .decode(proposals.view(), Array2::zeros((2, 0)).view(), info(800, 600, 1.0))
            .unwrap();

        assert_eq!(pred.as_array().dim(), (2, 12));
        for region in 0..2 {
            for class in 0..3 {
                assert_eq!(
                    pred.class_box(region, class).to_array(),
                    [
                        proposals[[region, 0]],
                        proposals[[region, 1]],
                        proposals[[region, 2]],
                        proposals[[region, 3]]
                    ]
                );
            }
        }
    }

    #[test]
    fn test_regression_disabled_still_rescales() {
        let proposals = array![[10.0, 20.0, 30.0, 40.0]];
        let decoder = BoxDecoder::new(2, false, false, None);
        let pred = decoder
            .decode(proposals.view(), Array2::zeros((1, 8)).view(), info(100, 100, 2.0))
            .unwrap();
        assert_eq!(pred.class_box(0, 1).to_array(), [5.0, 10.0, 15.0, 20.0]);
    }

    #[test]
    fn test_zero_delta_keeps_left_top_and_extends_by_one_pixel() {
        // w = h = 20, center (20, 30): x1 = 20 - 10, x2 = 20 + 10
        let anchor = BoundingBox::new(10.0, 20.0, 29.0, 39.0);
        let out = bbox_transform_inv(&anchor, [0.0; 4]);
        assert_eq!(out.to_array(), [10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_shift_and_scale_delta() {
        let anchor = BoundingBox::new(0.0, 0.0, 9.0, 19.0); // w=10, h=20, c=(5, 10)
        let out = bbox_transform_inv(&anchor, [0.5, -0.25, 2f32.ln(), 0.0]);
        // center (10, 5), size (20, 20)
        assert_relative_eq!(out.x1, 0.0, epsilon = 1e-5);
        assert_relative_eq!(out.x2, 20.0, epsilon = 1e-5);
        assert_relative_eq!(out.y1, -5.0, epsilon = 1e-5);
        assert_relative_eq!(out.y2, 15.0, epsilon = 1e-5);
    }

    #[test]
    fn test_deltas_are_unnormalized_before_decoding() {
        let proposals = array![[10.0, 10.0, 29.0, 29.0]]; // w = 20
        let deltas = array![[1.0, 0.0, 0.0, 0.0]];
        let decoder = BoxDecoder::new(
            2,
            true,
            true,
            Some(([0.0; 4], [0.1, 0.1, 0.2, 0.2])),
        );
        let pred = decoder
            .decode(proposals.view(), deltas.view(), info(100, 100, 1.0))
            .unwrap();
        // dx = 0.1 → shift by 2 px
        let b = pred.class_box(0, 1);
        assert_relative_eq!(b.x1, 12.0, epsilon = 1e-5);
        assert_relative_eq!(b.x2, 32.0, epsilon = 1e-5);
    }

    #[test]
    fn test_class_specific_deltas_select_their_block() {
        let proposals = array![[10.0, 10.0, 29.0, 29.0]];
        let deltas = array![[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0]];
        let decoder = BoxDecoder::new(3, false, true, None);
        let pred = decoder
            .decode(proposals.view(), deltas.view(), info(100, 100, 1.0))
            .unwrap();
        assert_relative_eq!(pred.class_box(0, 1).x1, 10.0);
        assert_relative_eq!(pred.class_box(0, 2).x1, 20.0);
    }

    #[test]
    fn test_clip_happens_before_rescale() {
        let proposals = array![[0.0, 0.0, 199.0, 99.0]];
        let deltas = array![[0.0, 0.0, 1.0, 1.0]];
        let decoder = BoxDecoder::new(2, true, true, None);
        let pred = decoder
            .decode(proposals.view(), deltas.view(), info(200, 100, 2.0))
            .unwrap();
        let b = pred.class_box(0, 1);
        assert_eq!(b.to_array(), [0.0, 0.0, 99.5, 49.5]);
    }

    #[rstest]
    #[case([0.0, 0.0, 100.0, 100.0])]
    #[case([0.0, 0.0, -100.0, -100.0])]
    #[case([50.0, -50.0, 3.0, 3.0])]
    #[case([-1e6, 1e6, 100.0, 0.0])]
    #[case([f32::NAN, 0.0, f32::INFINITY, 0.0])]
    fn test_adversarial_deltas_stay_inside_image(#[case] delta: [f32; 4]) {
        let proposals = array![[40.0, 30.0, 80.0, 60.0], [0.0, 0.0, 0.0, 0.0]];
        let deltas = Array2::from_shape_fn((2, 4), |(_, j)| delta[j]);
        let decoder = BoxDecoder::new(2, true, true, None);
        let pred = decoder
            .decode(proposals.view(), deltas.view(), info(160, 120, 1.0))
            .unwrap();
        for region in 0..2 {
            let b = pred.class_box(region, 1);
            assert!(0.0 <= b.x1 && b.x1 <= b.x2 && b.x2 <= 159.0, "{b:?}");
            assert!(0.0 <= b.y1 && b.y1 <= b.y2 && b.y2 <= 119.0, "{b:?}");
        }
    }

    #[test]
    fn test_wrong_delta_width_is_shape_error() {
        let decoder = BoxDecoder::new(3, false, true, None);
        let err = decoder
            .decode(
                Array2::zeros((2, 4)).view(),
                Array2::zeros((2, 4)).view(),
                info(10, 10, 1.0),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ShapeError::Columns {
                tensor: "box_deltas",
                expected: "12".into(),
                actual: 4,
            }
        );
    }

    #[test]
    fn test_mismatched_rows_is_shape_error() {
        let decoder = BoxDecoder::new(2, true, true, None);
        assert!(matches!(
            decoder.decode(
                Array2::zeros((3, 4)).view(),
                Array2::zeros((2, 4)).view(),
                info(10, 10, 1.0),
            ),
            Err(ShapeError::Rows { .. })
        ));
    }

    #[test]
    fn test_no_regions_decodes_to_empty() {
        let decoder = BoxDecoder::new(2, false, true, None);
        let pred = decoder
            .decode(
                Array2::zeros((0, 4)).view(),
                Array2::zeros((0, 8)).view(),
                info(10, 10, 1.0),
            )
            .unwrap();
        assert_eq!(pred.num_regions(), 0);
    }
}
