use super::video_reader::VideoReader;
use super::video_writer::VideoWriter;

/// Hands out fresh reader/writer pairs, one per job.
pub trait VideoBackend: Send + Sync {
    fn reader(&self) -> Box<dyn VideoReader>;
    fn writer(&self) -> Box<dyn VideoWriter>;
}
