use thiserror::Error;

use crate::detection::domain::face_detector::DetectionError;
use crate::emotion::domain::emotion_classifier::ClassifyError;
use crate::video::domain::video_error::VideoError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Undecodable image or otherwise unusable upload.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cannot open video: {0}")]
    CannotOpenVideo(String),
    #[error("no faces detected in video")]
    NoFacesDetected,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Video(#[from] VideoError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Classification(#[from] ClassifyError),
}

impl AnalysisError {
    /// Whether the failure was caused by what the caller sent rather than
    /// by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidInput(_)
                | AnalysisError::CannotOpenVideo(_)
                | AnalysisError::Video(VideoError::InvalidImage(_))
        )
    }
}
