use thiserror::Error;

use crate::shared::constants::FACE_PATCH_SIZE;

use super::emotion_scores::EmotionScores;
use super::face_patch::FacePatch;

#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Weights missing or unreadable; fatal at startup.
    #[error("failed to load emotion model: {0}")]
    ModelLoad(String),
    #[error("invalid face patch: {0}")]
    InvalidInput(String),
    #[error("emotion classification failed: {0}")]
    Inference(String),
}

/// Domain interface for emotion classification of a single face.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, patch: &FacePatch) -> Result<EmotionScores, ClassifyError>;

    /// Side length of the square patch `classify` expects.
    fn input_size(&self) -> u32 {
        FACE_PATCH_SIZE
    }
}
