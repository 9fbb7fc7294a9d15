use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

use super::video_error::VideoError;

/// Abstracts video encoding so the pipeline can write output without
/// depending on a specific codec library.
pub trait VideoWriter: Send {
    /// Creates the output at `path` with the dimensions and frame rate
    /// from `metadata`.
    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> Result<(), VideoError>;

    fn write(&mut self, frame: &Frame) -> Result<(), VideoError>;

    /// Flushes pending packets and finalizes the container.
    fn close(&mut self) -> Result<(), VideoError>;
}
