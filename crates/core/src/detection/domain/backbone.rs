use ndarray::{s, Array1, Array2, ArrayView4, ArrayViewD, Ix1, Ix2, Ix4};

use crate::shared::config::NetType;
use crate::shared::error::ShapeError;

/// Channels of VGG16's ROI-pooled conv5 map.
pub const VGG16_POOLED_CHANNELS: usize = 512;
/// Channels of the ResNet conv4 map that feeds ROI pooling.
pub const RESNET_POOLED_CHANNELS: usize = 1024;

/// Per-architecture knowledge needed to turn raw pooled maps into embeddings.
pub trait Backbone: Send + Sync {
    fn net_type(&self) -> NetType;

    /// Channel count of the ROI-pooled feature map.
    fn pooled_channels(&self) -> usize;

    /// Reduces `(R, C, h, w)` ROI-pooled maps to one embedding row per region.
    fn reduce(&self, maps: ArrayView4<'_, f32>) -> Array2<f32>;

    /// Embeds ROI-pooled features, accepting either raw maps or flat rows.
    fn embed_regions(&self, pooled: ArrayViewD<'_, f32>) -> Result<Array2<f32>, ShapeError> {
        match pooled.ndim() {
            2 => Ok(to_rank2(pooled, "pooled_feat")?.to_owned()),
            4 => {
                let maps = to_rank4(pooled, "pooled_feat")?;
                check_channels(maps.shape()[1], self.pooled_channels(), "pooled_feat")?;
                Ok(self.reduce(maps))
            }
            other => Err(ShapeError::Rank {
                tensor: "pooled_feat",
                expected: 4,
                actual: other,
            }),
        }
    }

    /// Summarizes the frame-level map `(1, C, H, W)` as per-channel means.
    ///
    /// A flat `(1, D)` or `(D,)` feature passes through.
    fn embed_frame(&self, feature: ArrayViewD<'_, f32>) -> Result<Array1<f32>, ShapeError> {
        let shape = feature.shape().to_vec();
        match shape.len() {
            1 => Ok(feature
                .into_dimensionality::<Ix1>()
                .map_err(|_| rank_error("base_feat", 1, 1))?
                .to_owned()),
            2 | 4 if shape[0] != 1 => Err(ShapeError::Batch {
                tensor: "base_feat",
                actual: shape[0],
            }),
            2 => Ok(to_rank2(feature, "base_feat")?.row(0).to_owned()),
            4 => {
                let maps = to_rank4(feature, "base_feat")?;
                Ok(channel_means(maps).row(0).to_owned())
            }
            other => Err(rank_error("base_feat", 4, other)),
        }
    }
}

/// VGG16: the embedding is the flattened pool5 map (`C * h * w` values).
pub struct Vgg16;

impl Backbone for Vgg16 {
    fn net_type(&self) -> NetType {
        NetType::Vgg16
    }

    fn pooled_channels(&self) -> usize {
        VGG16_POOLED_CHANNELS
    }

    fn reduce(&self, maps: ArrayView4<'_, f32>) -> Array2<f32> {
        let (r, c, h, w) = maps.dim();
        let plane = h * w;
        Array2::from_shape_fn((r, c * plane), |(i, k)| {
            maps[[i, k / plane, (k % plane) / w, k % w]]
        })
    }
}

/// ResNet-50/101/152: the embedding is the spatial mean of each channel.
pub struct ResNet {
    depth: u32,
}

impl ResNet {
    pub fn new(depth: u32) -> Self {
        Self { depth }
    }
}

impl Backbone for ResNet {
    fn net_type(&self) -> NetType {
        match self.depth {
            50 => NetType::Res50,
            152 => NetType::Res152,
            _ => NetType::Res101,
        }
    }

    fn pooled_channels(&self) -> usize {
        RESNET_POOLED_CHANNELS
    }

    fn reduce(&self, maps: ArrayView4<'_, f32>) -> Array2<f32> {
        channel_means(maps)
    }
}

pub fn backbone_for(net: NetType) -> Box<dyn Backbone> {
    match net {
        NetType::Vgg16 => Box::new(Vgg16),
        NetType::Res50 => Box::new(ResNet::new(50)),
        NetType::Res101 => Box::new(ResNet::new(101)),
        NetType::Res152 => Box::new(ResNet::new(152)),
    }
}

fn channel_means(maps: ArrayView4<'_, f32>) -> Array2<f32> {
    let (r, c, _, _) = maps.dim();
    Array2::from_shape_fn((r, c), |(i, ch)| {
        maps.slice(s![i, ch, .., ..]).mean().unwrap_or(0.0)
    })
}

fn check_channels(actual: usize, expected: usize, tensor: &'static str) -> Result<(), ShapeError> {
    if actual != expected {
        return Err(ShapeError::Channels {
            tensor,
            expected,
            actual,
        });
    }
    Ok(())
}

fn to_rank2<'a>(
    view: ArrayViewD<'a, f32>,
    tensor: &'static str,
) -> Result<ndarray::ArrayView2<'a, f32>, ShapeError> {
    let ndim = view.ndim();
    view.into_dimensionality::<Ix2>()
        .map_err(|_| rank_error(tensor, 2, ndim))
}

fn to_rank4<'a>(
    view: ArrayViewD<'a, f32>,
    tensor: &'static str,
) -> Result<ArrayView4<'a, f32>, ShapeError> {
    let ndim = view.ndim();
    view.into_dimensionality::<Ix4>()
        .map_err(|_| rank_error(tensor, 4, ndim))
}

fn rank_error(tensor: &'static str, expected: usize, actual: usize) -> ShapeError {
    ShapeError::Rank {
        tensor,
        expected,
        actual,
    }
}
