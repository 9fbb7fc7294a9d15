use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

use super::video_error::VideoError;

/// Reads frames sequentially from a video source.
///
/// Implementations handle codec and container details while the pipeline
/// works with the abstract `Frame` and `VideoMetadata` types.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, VideoError>;

    /// Returns an iterator over RGB frames in decode order.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, VideoError>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
