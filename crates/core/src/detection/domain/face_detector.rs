use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectionError {
    /// The model could not be loaded; fatal at startup.
    #[error("failed to load face detection model: {0}")]
    ModelLoad(String),
    #[error("face detection failed: {0}")]
    Inference(String),
}

/// Domain interface for face detection.
///
/// Detectors are stateless between calls and shared across worker
/// threads, hence `&self`. Returned boxes are confidence-filtered, clamped
/// to the frame and never degenerate.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectionError>;
}
