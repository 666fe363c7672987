use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::suppressor::SuppressionMode;
use crate::shared::bbox::BoundingBox;
use crate::shared::constants::{
    CONF_THRESH, VIS_COLOR, VIS_LABEL_COLOR, VIS_LABEL_OFFSET, VIS_LABEL_SCALE, VIS_MAX_PER_CLASS,
    VIS_THICKNESS,
};
use crate::shared::error::ConfigError;
use crate::shared::frame::Frame;

const FONT_DATA: &[u8] = include_bytes!("../../assets/font.ttf");

/// Draws detection rectangles and `name: score` labels onto a copy of
/// the frame.
///
/// Detections are grouped by class id (or kept as one group under the
/// first class name in [`SuppressionMode::TopClass`]); within a group only
/// the first `max_per_class` entries are considered, and of those only the
/// ones scoring above `score_thresh` are drawn.
pub struct FrameAnnotator {
    classes: Vec<String>,
    font: FontRef<'static>,
    score_thresh: f32,
    max_per_class: usize,
    thickness: u32,
}

impl FrameAnnotator {
    pub fn new(classes: Vec<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            classes,
            font: FontRef::try_from_slice(FONT_DATA)?,
            score_thresh: CONF_THRESH,
            max_per_class: VIS_MAX_PER_CLASS,
            thickness: VIS_THICKNESS,
        })
    }

    pub fn annotate(&self, frame: &Frame, detections: &[Detection], mode: SuppressionMode) -> Frame {
        if frame.channels() != 3 || frame.width() == 0 || frame.height() == 0 {
            return frame.clone();
        }
        // Pixels stay in BGR order; the colours are BGR too.
        let Some(mut canvas) =
            RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        else {
            return frame.clone();
        };

        for (name, group) in self.group_detections(detections, mode) {
            for det in group
                .iter()
                .take(self.max_per_class)
                .filter(|d| d.score > self.score_thresh)
            {
                self.draw_detection(&mut canvas, &det.bbox, &label(name, det.score));
            }
        }
        Frame::new(
            canvas.into_raw(),
            frame.width(),
            frame.height(),
            3,
            frame.index(),
        )
    }

    /// Per-class groups in order of first appearance, each with its label name.
    fn group_detections<'a>(
        &'a self,
        detections: &[Detection],
        mode: SuppressionMode,
    ) -> Vec<(&'a str, Vec<Detection>)> {
        match mode {
            SuppressionMode::TopClass => vec![(self.name(0), detections.to_vec())],
            SuppressionMode::PerClassNms => {
                let mut groups: Vec<(usize, Vec<Detection>)> = Vec::new();
                for det in detections {
                    match groups.iter_mut().find(|(id, _)| *id == det.class_id) {
                        Some((_, group)) => group.push(*det),
                        None => groups.push((det.class_id, vec![*det])),
                    }
                }
                groups
                    .into_iter()
                    .map(|(id, group)| (self.name(mode.score_column(id)), group))
                    .collect()
            }
        }
    }

    fn name(&self, column: usize) -> &str {
        self.classes.get(column).map(String::as_str).unwrap_or("unknown")
    }

    /// Outline of `bbox` (rounded, clamped to the canvas), `thickness`
    /// pixels wide on the inside of the edges, with the label inside the
    /// top-left corner.
    fn draw_detection(&self, canvas: &mut RgbImage, bbox: &BoundingBox, text: &str) {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        let x1 = (bbox.x1.round() as i32).clamp(0, w - 1);
        let y1 = (bbox.y1.round() as i32).clamp(0, h - 1);
        let x2 = (bbox.x2.round() as i32).clamp(x1, w - 1);
        let y2 = (bbox.y2.round() as i32).clamp(y1, h - 1);

        for t in 0..self.thickness.max(1) as i32 {
            let (rw, rh) = (x2 - x1 + 1 - 2 * t, y2 - y1 + 1 - 2 * t);
            if rw <= 0 || rh <= 0 {
                break;
            }
            let rect = Rect::at(x1 + t, y1 + t).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(canvas, rect, Rgb(VIS_COLOR));
        }

        draw_text_mut(
            canvas,
            Rgb(VIS_LABEL_COLOR),
            x1,
            y1 + VIS_LABEL_OFFSET,
            PxScale::from(VIS_LABEL_SCALE),
            &self.font,
            text,
        );
    }
}

fn label(name: &str, score: f32) -> String {
    format!("{name}: {score:.3}")
}
