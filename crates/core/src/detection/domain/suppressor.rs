/// Score thresholding, ordering and suppression of decoded regions.
///
/// The output is a single ordered list of `(region, class)` indices. The
/// same list is used to gather boxes and scores here and pooled features
/// in `feature_aligner`, so the two outputs cannot drift apart.
use std::cmp::Ordering;

use ndarray::{ArrayView1, ArrayView2};

use crate::detection::domain::box_decoder::PredictedBoxes;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::nms::nms;
use crate::shared::bbox::BoundingBox;
use crate::shared::constants::CONF_THRESH;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuppressionMode {
    /// Threshold, sort and NMS each foreground class independently.
    #[default]
    PerClassNms,
    /// One detection per region from its highest-scoring column, no NMS.
    TopClass,
}

impl SuppressionMode {
    /// Score column a detection's `class_id` refers to.
    pub fn score_column(self, class_id: usize) -> usize {
        match self {
            SuppressionMode::PerClassNms => class_id + 1,
            SuppressionMode::TopClass => class_id,
        }
    }
}

impl From<bool> for SuppressionMode {
    fn from(use_nms: bool) -> Self {
        if use_nms {
            SuppressionMode::PerClassNms
        } else {
            SuppressionMode::TopClass
        }
    }
}

/// Where one output detection comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Survivor {
    /// Row in the network output (proposal index).
    pub region: usize,
    /// Column in the class score matrix.
    pub class_column: usize,
    /// Id reported on the detection.
    pub class_id: usize,
}

/// Surviving `(region, class)` pairs in output order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SurvivorIndex {
    entries: Vec<Survivor>,
}

impl SurvivorIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Survivor] {
        &self.entries
    }

    pub fn regions(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|s| s.region)
    }

    /// Gathers box and score for every survivor, in order.
    pub fn detections(&self, boxes: &PredictedBoxes, scores: ArrayView2<'_, f32>) -> Vec<Detection> {
        self.entries
            .iter()
            .map(|s| Detection {
                bbox: boxes.class_box(s.region, s.class_column),
                score: scores[[s.region, s.class_column]],
                class_id: s.class_id,
            })
            .collect()
    }
}

pub struct PerClassSuppressor {
    score_thresh: f32,
    nms_thresh: f32,
}

impl PerClassSuppressor {
    pub fn new(nms_thresh: f32) -> Self {
        Self {
            score_thresh: CONF_THRESH,
            nms_thresh,
        }
    }

    pub fn suppress(
        &self,
        scores: ArrayView2<'_, f32>,
        boxes: &PredictedBoxes,
        mode: SuppressionMode,
    ) -> SurvivorIndex {
        match mode {
            SuppressionMode::PerClassNms => self.per_class_nms(scores, boxes),
            SuppressionMode::TopClass => top_class(scores),
        }
    }

    /// Classes are visited in ascending column order; background (column 0)
    /// is skipped and a class with no region above threshold adds nothing.
    fn per_class_nms(&self, scores: ArrayView2<'_, f32>, boxes: &PredictedBoxes) -> SurvivorIndex {
        let mut entries = Vec::new();
        for column in 1..scores.ncols() {
            let class_scores = scores.column(column);

            let mut order = select_above(class_scores, self.score_thresh);
            if order.is_empty() {
                continue;
            }
            sort_by_score_desc(&mut order, class_scores);

            let candidates: Vec<BoundingBox> = order
                .iter()
                .map(|&region| boxes.class_box(region, column))
                .collect();
            let keep = nms(&candidates, self.nms_thresh);

            entries.extend(keep.into_iter().map(|k| Survivor {
                region: order[k],
                class_column: column,
                class_id: column - 1,
            }));
        }
        SurvivorIndex { entries }
    }
}

/// Regions whose score strictly exceeds `thresh`, in region order.
fn select_above(class_scores: ArrayView1<'_, f32>, thresh: f32) -> Vec<usize> {
    class_scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s > thresh)
        .map(|(i, _)| i)
        .collect()
}

/// Stable: equal scores keep region order.
fn sort_by_score_desc(order: &mut [usize], class_scores: ArrayView1<'_, f32>) {
    order.sort_by(|&a, &b| {
        class_scores[b]
            .partial_cmp(&class_scores[a])
            .unwrap_or(Ordering::Equal)
    });
}

/// Every region, labelled with its argmax column (background included).
fn top_class(scores: ArrayView2<'_, f32>) -> SurvivorIndex {
    let entries = scores
        .outer_iter()
        .enumerate()
        .map(|(region, row)| {
            let column = argmax(row);
            Survivor {
                region,
                class_column: column,
                class_id: column,
            }
        })
        .collect();
    SurvivorIndex { entries }
}

/// First index of the maximum; NaN never wins.
fn argmax(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] || row[best].is_nan() {
            best = i;
        }
    }
    best
}
