use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::detection::domain::face_detector::FaceDetector;
use crate::emotion::domain::emotion::Emotion;
use crate::emotion::domain::emotion_classifier::EmotionClassifier;
use crate::shared::frame::Frame;
use crate::video::infrastructure::image_decoder::decode_image;

use super::analysis_error::AnalysisError;
use super::face_analysis::analyze_faces;
use super::video_summary::round4;

/// All seven scores for one face, highest first.
///
/// Serialises as a JSON object whose keys keep that order, with values
/// rounded to 4 decimals.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedEmotions(pub Vec<(Emotion, f32)>);

impl RankedEmotions {
    pub fn top(&self) -> Option<(Emotion, f32)> {
        self.0.first().copied()
    }
}

impl Serialize for RankedEmotions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (emotion, score) in &self.0 {
            map.serialize_entry(emotion, &round4(*score as f64))?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageFaceResult {
    /// `[x, y, width, height]` in pixels.
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    pub emotions: RankedEmotions,
}

/// Synchronous analysis of a single still image.
pub struct AnalyzeImageUseCase {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn EmotionClassifier>,
}

impl AnalyzeImageUseCase {
    pub fn new(detector: Arc<dyn FaceDetector>, classifier: Arc<dyn EmotionClassifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    /// Decodes `bytes` (any format the `image` crate reads) and analyses it.
    pub fn execute(&self, bytes: &[u8]) -> Result<Vec<ImageFaceResult>, AnalysisError> {
        let frame = decode_image(bytes)?;
        self.execute_frame(&frame)
    }

    /// One entry per detected face, in detector order.
    pub fn execute_frame(&self, frame: &Frame) -> Result<Vec<ImageFaceResult>, AnalysisError> {
        let faces = analyze_faces(frame, self.detector.as_ref(), self.classifier.as_ref())?;
        Ok(faces
            .into_iter()
            .map(|face| ImageFaceResult {
                bbox: face.bbox.as_array(),
                emotions: RankedEmotions(face.scores.ranked()),
            })
            .collect())
    }
}
