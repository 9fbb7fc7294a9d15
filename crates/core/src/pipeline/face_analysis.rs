use crate::detection::domain::face_detector::FaceDetector;
use crate::emotion::domain::emotion_classifier::EmotionClassifier;
use crate::emotion::domain::emotion_scores::EmotionScores;
use crate::emotion::domain::face_patch::FacePatch;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::analysis_error::AnalysisError;

/// One detected face and its classifier scores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceResult {
    pub bbox: BoundingBox,
    pub scores: EmotionScores,
}

/// Detects faces in an RGB frame and classifies each one.
///
/// The grayscale conversion happens once per frame and only when at least
/// one face was found. Results keep detector order.
pub fn analyze_faces(
    frame: &Frame,
    detector: &dyn FaceDetector,
    classifier: &dyn EmotionClassifier,
) -> Result<Vec<FaceResult>, AnalysisError> {
    let boxes = detector.detect(frame)?;
    if boxes.is_empty() {
        return Ok(Vec::new());
    }

    let gray = frame.to_grayscale();
    let size = classifier.input_size();
    boxes
        .into_iter()
        .map(|bbox| {
            let patch = FacePatch::extract(&gray, &bbox, size)?;
            let scores = classifier.classify(&patch)?;
            Ok(FaceResult { bbox, scores })
        })
        .collect()
}
