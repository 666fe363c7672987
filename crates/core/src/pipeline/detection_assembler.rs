use std::time::Instant;

use crate::detection::domain::box_decoder::BoxDecoder;
use crate::detection::domain::detection::DetectionSet;
use crate::detection::domain::feature_aligner::align_features;
use crate::detection::domain::image_preprocessor::ImagePreprocessor;
use crate::detection::domain::region_network::RegionNetwork;
use crate::detection::domain::suppressor::{PerClassSuppressor, SuppressionMode};
use crate::pipeline::frame_annotator::FrameAnnotator;
use crate::shared::config::ExtractorConfig;
use crate::shared::error::{ConfigError, ExtractError, ShapeError};
use crate::shared::frame::Frame;
use crate::video::domain::frame_sink::FrameSink;

/// Per-frame pipeline: preprocess → infer → decode → suppress → align.
///
/// Owns the network and a validated configuration. Each call to
/// [`run`](Self::run) is independent; no state carries between frames.
pub struct DetectionAssembler {
    network: Box<dyn RegionNetwork>,
    config: ExtractorConfig,
    preprocessor: ImagePreprocessor,
    decoder: BoxDecoder,
    suppressor: PerClassSuppressor,
    annotator: FrameAnnotator,
}

impl DetectionAssembler {
    pub fn new(network: Box<dyn RegionNetwork>, config: ExtractorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            preprocessor: ImagePreprocessor::from_config(&config)?,
            decoder: BoxDecoder::from_config(&config),
            suppressor: PerClassSuppressor::new(config.test.nms),
            annotator: FrameAnnotator::new(config.classes.clone())?,
            network,
            config,
        })
    }

    /// Detects objects in `frame` and pairs each detection with its
    /// region feature.
    ///
    /// When visualization is enabled and `sink` is given, an annotated
    /// copy of the frame is written to it.
    pub fn run(
        &mut self,
        frame: &Frame,
        mode: SuppressionMode,
        sink: Option<&mut dyn FrameSink>,
    ) -> Result<DetectionSet, ExtractError> {
        let start = Instant::now();

        let mut blobs = self.preprocessor.preprocess(frame)?;
        let blob = match blobs.len() {
            1 => blobs.remove(0),
            n => return Err(ShapeError::PyramidLevels(n).into()),
        };
        let info = blob.info();

        let output = self
            .network
            .infer(blob.view(), info)
            .map_err(ExtractError::Inference)?;
        output.validate(self.config.num_classes(), self.config.class_agnostic)?;
        let detect_time = start.elapsed();

        let post_start = Instant::now();
        let boxes = self
            .decoder
            .decode(output.region_boxes.view(), output.box_deltas.view(), info)?;
        let survivors = self
            .suppressor
            .suppress(output.class_scores.view(), &boxes, mode);
        let detections = survivors.detections(&boxes, output.class_scores.view());
        let features = align_features(output.pooled_features.view(), &survivors)?;
        let result = DetectionSet::new(detections, features, output.frame_feature)?;
        let post_time = post_start.elapsed();

        if self.config.visualize {
            if let Some(sink) = sink {
                let annotated = self.annotator.annotate(frame, result.detections(), mode);
                sink.write(&annotated).map_err(ExtractError::Visualization)?;
            }
            let total = start.elapsed().as_secs_f64();
            if total > 0.0 {
                log::debug!("frame rate: {:.2} fps", 1.0 / total);
            }
        }

        log::debug!(
            "frame {}: {} regions -> {} detections, detect {:.3}s, post {:.3}s",
            frame.index(),
            boxes.num_regions(),
            result.len(),
            detect_time.as_secs_f64(),
            post_time.as_secs_f64()
        );
        Ok(result)
    }
}
