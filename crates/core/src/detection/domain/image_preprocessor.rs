/// Image pyramid construction: mean subtraction plus shorter-side scaling.
///
/// Each pyramid level scales the shorter image side to a target length,
/// unless that would push the longer side past `max_size`, in which case
/// the longer side is pinned to `max_size` instead.
use ndarray::{Array3, Array4, ArrayView4, Axis};

use crate::detection::domain::region_network::ImageInfo;
use crate::shared::config::ExtractorConfig;
use crate::shared::error::{ConfigError, ShapeError};
use crate::shared::frame::Frame;

/// Mean-subtracted, scaled image with a batch dimension of 1: `(1, H, W, 3)`.
#[derive(Clone, Debug)]
pub struct ScaledBlob {
    data: Array4<f32>,
    scale: f32,
}

impl ScaledBlob {
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    /// Factor applied to the source frame, `height() / frame height`.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            height: self.height(),
            width: self.width(),
            scale: self.scale,
        }
    }
}

pub struct ImagePreprocessor {
    pixel_means: [f32; 3],
    target_sizes: Vec<u32>,
    max_size: u32,
}

impl ImagePreprocessor {
    pub fn new(
        pixel_means: [f32; 3],
        target_sizes: Vec<u32>,
        max_size: u32,
    ) -> Result<Self, ConfigError> {
        if target_sizes.is_empty() {
            return Err(ConfigError::EmptyScales);
        }
        Ok(Self {
            pixel_means,
            target_sizes,
            max_size,
        })
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.pixel_means,
            config.test.scales.clone(),
            config.test.max_size,
        )
    }

    /// Builds one blob per target size.
    ///
    /// The pipeline runs single-scale: callers require exactly one level.
    pub fn preprocess(&self, frame: &Frame) -> Result<Vec<ScaledBlob>, ShapeError> {
        if frame.channels() != 3 {
            return Err(ShapeError::Channels {
                tensor: "frame",
                expected: 3,
                actual: frame.channels() as usize,
            });
        }
        if frame.width() == 0 || frame.height() == 0 {
            return Err(ShapeError::EmptyFrame);
        }
        let expected = frame.width() as usize * frame.height() as usize * 3;
        if frame.data().len() != expected {
            return Err(ShapeError::FrameBuffer {
                expected,
                actual: frame.data().len(),
            });
        }

        let centered = self.subtract_means(frame);
        Ok(self
            .target_sizes
            .iter()
            .map(|&target| {
                let scale = pyramid_scale(target, self.max_size, frame.height(), frame.width());
                let resized = resize_linear(&centered, scale);
                ScaledBlob {
                    data: resized.insert_axis(Axis(0)),
                    scale: scale as f32,
                }
            })
            .collect())
    }

    fn subtract_means(&self, frame: &Frame) -> Array3<f32> {
        let pixels = frame.as_ndarray();
        Array3::from_shape_fn(pixels.dim(), |(y, x, c)| {
            pixels[[y, x, c]] as f32 - self.pixel_means[c]
        })
    }
}

/// Scale factor for one pyramid level.
pub fn pyramid_scale(target_size: u32, max_size: u32, height: u32, width: u32) -> f64 {
    let size_min = height.min(width) as f64;
    let size_max = height.max(width) as f64;
    let scale = target_size as f64 / size_min;
    if (scale * size_max).round() > max_size as f64 {
        max_size as f64 / size_max
    } else {
        scale
    }
}

/// Bilinear resize by `scale` on both axes, sampling at pixel centers.
fn resize_linear(src: &Array3<f32>, scale: f64) -> Array3<f32> {
    let (h, w, channels) = src.dim();
    let out_h = ((h as f64 * scale).round() as usize).max(1);
    let out_w = ((w as f64 * scale).round() as usize).max(1);

    let rows: Vec<Tap> = (0..out_h).map(|y| Tap::new(y, scale, h)).collect();
    let cols: Vec<Tap> = (0..out_w).map(|x| Tap::new(x, scale, w)).collect();

    let mut out = Array3::<f32>::zeros((out_h, out_w, channels));
    for (oy, ty) in rows.iter().enumerate() {
        for (ox, tx) in cols.iter().enumerate() {
            for c in 0..channels {
                let top = src[[ty.lo, tx.lo, c]] * (1.0 - tx.frac) + src[[ty.lo, tx.hi, c]] * tx.frac;
                let bottom =
                    src[[ty.hi, tx.lo, c]] * (1.0 - tx.frac) + src[[ty.hi, tx.hi, c]] * tx.frac;
                out[[oy, ox, c]] = top * (1.0 - ty.frac) + bottom * ty.frac;
            }
        }
    }
    out
}

/// Two neighbouring source samples and the weight of the second.
struct Tap {
    lo: usize,
    hi: usize,
    frac: f32,
}

impl Tap {
    fn new(dst: usize, scale: f64, len: usize) -> Self {
        let src = ((dst as f64 + 0.5) / scale - 0.5).max(0.0);
        let lo = (src.floor() as usize).min(len - 1);
        let hi = (lo + 1).min(len - 1);
        let frac = (src - lo as f64).clamp(0.0, 1.0) as f32;
        Self { lo, hi, frac }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn gray_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(
            vec![value; (width * height * 3) as usize],
            width,
            height,
            3,
            0,
        )
    }

    #[rstest]
    // Shorter side scaled to the target.
    #[case(600, 1000, 480, 640, 1.25)]
    // Longer side would exceed max_size: pinned instead.
    #[case(600, 1000, 300, 1200, 1000.0 / 1200.0)]
    // Downscaling works the same way.
    #[case(600, 1000, 1200, 1600, 0.5)]
    // Exactly at the limit is allowed.
    #[case(500, 1000, 500, 1000, 1.0)]
    fn test_pyramid_scale(
        #[case] target: u32,
        #[case] max_size: u32,
        #[case] height: u32,
        #[case] width: u32,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(pyramid_scale(target, max_size, height, width), expected);
    }

    #[test]
    fn test_empty_target_sizes_is_config_error() {
        assert!(matches!(
            ImagePreprocessor::new([0.0; 3], vec![], 1000),
            Err(ConfigError::EmptyScales)
        ));
    }

    #[test]
    fn test_blob_shape_and_scale() {
        let pre = ImagePreprocessor::new([0.0; 3], vec![600], 1000).unwrap();
        let blobs = pre.preprocess(&gray_frame(640, 480, 0)).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].view().shape(), &[1, 600, 800, 3]);
        assert_relative_eq!(blobs[0].scale(), 1.25);
        assert_eq!(
            blobs[0].info(),
            ImageInfo {
                height: 600,
                width: 800,
                scale: 1.25
            }
        );
    }

    #[test]
    fn test_means_are_subtracted_per_channel() {
        let pre = ImagePreprocessor::new([10.0, 20.0, 30.0], vec![4], 100).unwrap();
        let blobs = pre.preprocess(&gray_frame(4, 4, 100)).unwrap();
        let blob = blobs[0].view();
        assert_relative_eq!(blob[[0, 1, 1, 0]], 90.0);
        assert_relative_eq!(blob[[0, 1, 1, 1]], 80.0);
        assert_relative_eq!(blob[[0, 1, 1, 2]], 70.0);
    }

    #[test]
    fn test_unit_scale_is_identity() {
        let mut data = Vec::new();
        for i in 0..(5 * 3) {
            data.extend_from_slice(&[i as u8, (2 * i) as u8, (3 * i) as u8]);
        }
        let frame = Frame::new(data, 5, 3, 3, 0);
        let pre = ImagePreprocessor::new([0.0; 3], vec![3], 1000).unwrap();
        let blobs = pre.preprocess(&frame).unwrap();
        let blob = blobs[0].view();
        assert_eq!(blob.shape(), &[1, 3, 5, 3]);
        for y in 0..3 {
            for x in 0..5 {
                let i = (y * 5 + x) as f32;
                assert_relative_eq!(blob[[0, y, x, 0]], i);
                assert_relative_eq!(blob[[0, y, x, 2]], 3.0 * i);
            }
        }
    }

    #[test]
    fn test_linear_upsampling_interpolates_between_centers() {
        // One row [0, 10] scaled 2x → [0, 2.5, 7.5, 10]
        let src = Array3::from_shape_vec((1, 2, 1), vec![0.0, 10.0]).unwrap();
        let out = resize_linear(&src, 2.0);
        assert_eq!(out.dim(), (2, 4, 1));
        let row: Vec<f32> = (0..4).map(|x| out[[0, x, 0]]).collect();
        assert_eq!(row, vec![0.0, 2.5, 7.5, 10.0]);
    }

    #[test]
    fn test_pyramid_has_one_level_per_target() {
        let pre = ImagePreprocessor::new([0.0; 3], vec![100, 200], 1000).unwrap();
        let blobs = pre.preprocess(&gray_frame(50, 50, 0)).unwrap();
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].height(), 100);
        assert_eq!(blobs[1].height(), 200);
    }

    #[test]
    fn test_non_bgr_frame_rejected() {
        let frame = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        let pre = ImagePreprocessor::new([0.0; 3], vec![600], 1000).unwrap();
        assert!(matches!(
            pre.preprocess(&frame),
            Err(ShapeError::Channels { actual: 1, .. })
        ));
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        let pre = ImagePreprocessor::new([0.0; 3], vec![600], 1000).unwrap();
        assert_eq!(pre.preprocess(&frame).unwrap_err(), ShapeError::EmptyFrame);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let frame = Frame::new(vec![0u8; 4 * 4 * 3 - 1], 4, 4, 3, 0);
        let pre = ImagePreprocessor::new([0.0; 3], vec![600], 1000).unwrap();
        assert_eq!(
            pre.preprocess(&frame).unwrap_err(),
            ShapeError::FrameBuffer {
                expected: 48,
                actual: 47
            }
        );
    }
}
