use crate::video::domain::video_backend::VideoBackend;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::ffmpeg_reader::FfmpegReader;
use super::ffmpeg_writer::FfmpegWriter;

#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegBackend;

impl VideoBackend for FfmpegBackend {
    fn reader(&self) -> Box<dyn VideoReader> {
        Box::new(FfmpegReader::new())
    }

    fn writer(&self) -> Box<dyn VideoWriter> {
        Box::new(FfmpegWriter::new())
    }
}
