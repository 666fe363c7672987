use crate::shared::bbox::BoundingBox;

/// Greedy non-maximum suppression over boxes already ordered by
/// descending score.
///
/// Walks the boxes in order, keeps each one not yet suppressed, and
/// suppresses every later box whose IoU with it exceeds `iou_thresh`.
/// Returns the kept positions, ascending, so callers can index any
/// array that shares the input order.
pub fn nms(boxes: &[BoundingBox], iou_thresh: f32) -> Vec<usize> {
    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for j in (i + 1)..boxes.len() {
            if !suppressed[j] && boxes[i].iou(&boxes[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}
