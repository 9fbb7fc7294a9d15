use std::path::Path;

use crate::shared::constants::FALLBACK_FPS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_error::VideoError;
use crate::video::domain::video_writer::VideoWriter;

/// Encodes RGB frames to MPEG-4 Part 2 (YUV420P) via ffmpeg-next.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps: 0,
            frame_count: 0,
        }
    }

    /// Number of frames accepted since `open`.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Drains every packet the encoder has ready into the container.
    fn drain(&mut self) -> Result<(), VideoError> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err(VideoError::NotOpened);
        };
        let ost_time_base = octx
            .stream(0)
            .map(|s| s.time_base())
            .ok_or(VideoError::NotOpened)?;

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), ost_time_base);
            encoded
                .write_interleaved(octx)
                .map_err(|e| VideoError::Encode(e.to_string()))?;
        }
        Ok(())
    }

    /// Flushes the encoder and writes the trailer; no-op when never opened.
    fn finish(&mut self) -> Result<(), VideoError> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        encoder
            .send_eof()
            .map_err(|e| VideoError::Encode(e.to_string()))?;
        self.drain()?;
        if let Some(octx) = self.octx.as_mut() {
            octx.write_trailer()
                .map_err(|e| VideoError::Encode(e.to_string()))?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole frames per second for the encoder time base; non-positive or
/// missing rates become the fallback.
fn encoder_fps(fps: f64) -> i32 {
    let rounded = fps.round();
    if rounded.is_finite() && rounded >= 1.0 {
        rounded as i32
    } else {
        FALLBACK_FPS as i32
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> Result<(), VideoError> {
        let open_err = |reason: String| VideoError::Open {
            path: path.display().to_string(),
            reason,
        };
        ffmpeg_next::init().map_err(|e| open_err(e.to_string()))?;

        let fps = encoder_fps(metadata.fps);
        if fps as f64 != metadata.fps {
            log::debug!("Writing at {fps} fps (source reports {:.3})", metadata.fps);
        }

        let mut octx = ffmpeg_next::format::output(path).map_err(|e| open_err(e.to_string()))?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or_else(|| VideoError::Encode("MPEG4 encoder not found".into()))?;

        let mut ost = octx
            .add_stream(Some(codec))
            .map_err(|e| VideoError::Encode(e.to_string()))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| VideoError::Encode(e.to_string()))?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .map_err(|e| VideoError::Encode(e.to_string()))?;
        ost.set_parameters(&encoder);

        octx.write_header()
            .map_err(|e| VideoError::Encode(e.to_string()))?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| VideoError::Encode(e.to_string()))?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.width = metadata.width;
        self.height = metadata.height;
        self.fps = fps;
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), VideoError> {
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3 {
            if self.encoder.is_none() {
                return Err(VideoError::NotOpened);
            }
            return Err(VideoError::Encode(format!(
                "frame is {}x{}x{}, writer expects {}x{}x3",
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )));
        }
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err(VideoError::NotOpened);
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let row_bytes = self.width as usize * 3;
        let stride = rgb_frame.stride(0);
        let data = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler
            .run(&rgb_frame, &mut yuv_frame)
            .map_err(|e| VideoError::Encode(e.to_string()))?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder
            .send_frame(&yuv_frame)
            .map_err(|e| VideoError::Encode(e.to_string()))?;
        self.drain()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        let result = self.finish();

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        result
    }
}
