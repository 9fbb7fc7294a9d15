use image::RgbImage;
use ndarray::ArrayView3;

/// A single decoded video frame or still image.
///
/// Pixels are interleaved in row-major order. Colour frames carry RGB
/// (`channels == 3`); grayscale frames carry a single luma channel.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn from_rgb_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Zero-based position of the frame in decode order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .ok()
    }

    /// Single-channel copy using BT.601 luma weights.
    ///
    /// Grayscale frames are returned as a plain clone.
    pub fn to_grayscale(&self) -> Frame {
        if self.channels == 1 {
            return self.clone();
        }
        let stride = self.channels as usize;
        let luma = self
            .data
            .chunks_exact(stride)
            .map(|px| {
                let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Frame::new(luma, self.width, self.height, 1, self.index)
    }

    fn is_consistent(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * self.channels as usize
    }

    /// Runs `f` over the frame's pixels viewed as an RGB image buffer.
    ///
    /// Returns `None` without calling `f` when the frame is not RGB.
    pub fn with_rgb_image<R>(&mut self, f: impl FnOnce(&mut RgbImage) -> R) -> Option<R> {
        if self.channels != 3 || !self.is_consistent() {
            return None;
        }
        let raw = std::mem::take(&mut self.data);
        let mut image = RgbImage::from_raw(self.width, self.height, raw)?;
        let out = f(&mut image);
        self.data = image.into_raw();
        Some(out)
    }
}
