pub mod emotion;
pub mod emotion_classifier;
pub mod emotion_scores;
pub mod face_patch;
