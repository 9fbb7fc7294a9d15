use std::path::PathBuf;

/// Stream properties read when a video is opened.
///
/// `fps` may be zero or negative for containers that do not declare a
/// frame rate; consumers decide how to treat that.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Seconds elapsed at a one-based frame index, or 0 when fps is unusable.
    pub fn timestamp_at(&self, frame_number: u64) -> f64 {
        if self.fps > 0.0 {
            frame_number as f64 / self.fps
        } else {
            0.0
        }
    }
}
