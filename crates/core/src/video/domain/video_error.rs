use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("cannot open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("no video stream found")]
    NoVideoStream,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("stream not opened")]
    NotOpened,
    #[error("invalid image: {0}")]
    InvalidImage(String),
}
