pub mod video_backend;
pub mod video_error;
pub mod video_reader;
pub mod video_writer;
