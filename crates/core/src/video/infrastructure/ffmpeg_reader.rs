use std::path::Path;

use ffmpeg_next::format::{context::Input, Pixel};
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_error::VideoError;
use crate::video::domain::video_reader::VideoReader;

/// Decodes the best video stream of a container into RGB24 [`Frame`]s.
pub struct FfmpegReader {
    input: Option<Input>,
    stream_index: usize,
}

// Safety: a reader is owned by one job and only touched from that job's
// worker thread; the ffmpeg pointers inside never cross threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input: None,
            stream_index: 0,
        }
    }

    fn decoded_frames(&mut self) -> Result<DecodedFrames<'_>, VideoError> {
        let stream_index = self.stream_index;
        let input = self.input.as_mut().ok_or(VideoError::NotOpened)?;
        let stream = input
            .stream(stream_index)
            .ok_or(VideoError::NoVideoStream)?;
        let decoder =
            open_decoder(&stream).map_err(|e| VideoError::Decode(e.to_string()))?;
        let (width, height) = (decoder.width(), decoder.height());
        let to_rgb = scaling::Context::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| VideoError::Decode(e.to_string()))?;

        Ok(DecodedFrames {
            input,
            decoder,
            to_rgb,
            width,
            height,
            stream_index,
            next_index: 0,
            draining: false,
            finished: false,
        })
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, VideoError> {
        let open_err = |reason: String| VideoError::Open {
            path: path.display().to_string(),
            reason,
        };
        ffmpeg_next::init().map_err(|e| open_err(e.to_string()))?;
        let input = ffmpeg_next::format::input(path).map_err(|e| open_err(e.to_string()))?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(VideoError::NoVideoStream)?;
        let decoder = open_decoder(&stream).map_err(|e| open_err(e.to_string()))?;
        if decoder.width() == 0 || decoder.height() == 0 {
            return Err(open_err("video stream has no dimensions".into()));
        }

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps: frame_rate(stream.avg_frame_rate(), stream.rate()),
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "Opened {}: {}x{} @ {:.2} fps, {} frames ({})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.codec
        );

        self.stream_index = stream.index();
        self.input = Some(input);
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, VideoError>> + '_> {
        match self.decoded_frames() {
            Ok(frames) => Box::new(frames),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input = None;
    }
}

fn open_decoder(
    stream: &ffmpeg_next::format::stream::Stream<'_>,
) -> Result<ffmpeg_next::decoder::Video, ffmpeg_next::Error> {
    ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
        .decoder()
        .video()
}

/// Average rate, falling back to the stream's base rate when the container
/// does not report one. 0 when neither is usable. The base rate of
/// variable-rate phone clips is often a timescale like 90000, not a frame rate.
fn frame_rate(average: Rational, base: Rational) -> f64 {
    [average, base]
        .into_iter()
        .filter(|r| r.numerator() > 0 && r.denominator() > 0)
        .map(|r| r.numerator() as f64 / r.denominator() as f64)
        .next()
        .unwrap_or(0.0)
}

/// Pulls packets on demand so only one decoded frame is alive at a time.
struct DecodedFrames<'a> {
    input: &'a mut Input,
    decoder: ffmpeg_next::decoder::Video,
    to_rgb: scaling::Context,
    width: u32,
    height: u32,
    stream_index: usize,
    next_index: usize,
    draining: bool,
    finished: bool,
}

impl DecodedFrames<'_> {
    fn receive(&mut self) -> Option<Result<Frame, VideoError>> {
        let mut decoded = Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = Video::empty();
        if let Err(e) = self.to_rgb.run(&decoded, &mut rgb) {
            self.finished = true;
            return Some(Err(VideoError::Decode(e.to_string())));
        }
        let frame = Frame::new(
            packed_rgb(&rgb, self.width, self.height),
            self.width,
            self.height,
            3,
            self.next_index,
        );
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = Result<Frame, VideoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(frame) = self.receive() {
            return Some(frame);
        }
        if self.draining {
            self.finished = true;
            return None;
        }

        while let Some((stream, packet)) = self.input.packets().next() {
            if stream.index() != self.stream_index {
                continue;
            }
            // a corrupt packet is dropped; decoding resumes at the next keyframe
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if let Some(frame) = self.receive() {
                return Some(frame);
            }
        }

        let _ = self.decoder.send_eof();
        self.draining = true;
        let last = self.receive();
        if last.is_none() {
            self.finished = true;
        }
        last
    }
}

/// Row-by-row copy that strips ffmpeg's line padding.
fn packed_rgb(rgb: &Video, width: u32, height: u32) -> Vec<u8> {
    let row_len = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in rgb.data(0).chunks(rgb.stride(0)).take(height as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }
    pixels
}
