//! Greedy non-maximum suppression over float corner boxes.

/// A scored detection in frame coordinates, before clamping.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
}

/// Sort by score descending and drop boxes overlapping a kept box by more
/// than `iou_thresh`.
pub fn nms(dets: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| corner_iou(k, det) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

pub fn corner_iou(a: &Candidate, b: &Candidate) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}
