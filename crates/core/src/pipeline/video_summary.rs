use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::emotion::domain::emotion::Emotion;

/// Rounds to 4 decimal places, the precision scores are reported at.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Average scores for one frame that contained at least one face.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineEntry {
    /// One-based frame number.
    pub frame: u64,
    /// Seconds from the start, 0 when the source has no usable fps.
    pub timestamp: f64,
    /// Per-label mean over the faces in the frame, all labels present.
    pub emotions: BTreeMap<Emotion, f64>,
}

/// Outcome of a completed video analysis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoSummary {
    /// Share of face detections whose top label was each emotion. Only
    /// labels that won at least once are present; values sum to 1.
    #[serde(serialize_with = "serialize_rounded")]
    pub main_emotions: BTreeMap<Emotion, f64>,
    /// File name of the annotated video inside the output directory.
    pub output_video: String,
    pub timeline: Vec<TimelineEntry>,
}

fn serialize_rounded<S: Serializer>(
    map: &BTreeMap<Emotion, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(map.iter().map(|(k, v)| (k, round4(*v))))
}
