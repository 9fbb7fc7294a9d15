use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::emotion_classifier::ClassifyError;

/// Square single-channel face crop with intensities scaled to `[0, 1]`,
/// row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FacePatch {
    pixels: Vec<f32>,
    size: u32,
}

impl FacePatch {
    pub fn new(pixels: Vec<f32>, size: u32) -> Result<Self, ClassifyError> {
        if size == 0 || pixels.len() != (size as usize) * (size as usize) {
            return Err(ClassifyError::InvalidInput(format!(
                "expected {size}x{size} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self { pixels, size })
    }

    /// Crops `bbox` out of a grayscale frame, resizes it to `size × size`
    /// (bilinear) and scales to `[0, 1]`.
    pub fn extract(gray: &Frame, bbox: &BoundingBox, size: u32) -> Result<Self, ClassifyError> {
        if gray.channels() != 1 {
            return Err(ClassifyError::InvalidInput(format!(
                "expected a grayscale frame, got {} channels",
                gray.channels()
            )));
        }
        let b = bbox.clamped_to(gray.width(), gray.height()).ok_or_else(|| {
            ClassifyError::InvalidInput(format!("empty crop for box {:?}", bbox.as_array()))
        })?;

        let stride = gray.width() as usize;
        let (x, w) = (b.x as usize, b.width as usize);
        let mut crop = Vec::with_capacity(w * b.height as usize);
        for row in b.y as usize..b.bottom() as usize {
            let start = row * stride + x;
            crop.extend_from_slice(&gray.data()[start..start + w]);
        }
        let crop = GrayImage::from_raw(b.width as u32, b.height as u32, crop)
            .ok_or_else(|| ClassifyError::InvalidInput("crop buffer size mismatch".into()))?;

        let resized = imageops::resize(&crop, size, size, FilterType::Triangle);
        let pixels = resized.into_raw().into_iter().map(|p| p as f32 / 255.0).collect();
        Self::new(pixels, size)
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gray_frame(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Frame {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Frame::new(data, width, height, 1, 0)
    }

    #[test]
    fn test_extract_resizes_and_normalizes() {
        let frame = gray_frame(200, 100, |_, _| 255);
        let patch = FacePatch::extract(&frame, &BoundingBox::new(10, 10, 30, 50), 64).unwrap();
        assert_eq!(patch.size(), 64);
        assert_eq!(patch.pixels().len(), 64 * 64);
        assert!(patch.pixels().iter().all(|&p| (p - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_extract_only_reads_inside_box() {
        // left half black, right half white; crop the white half only
        let frame = gray_frame(100, 50, |x, _| if x >= 50 { 255 } else { 0 });
        let patch = FacePatch::extract(&frame, &BoundingBox::new(60, 0, 30, 40), 16).unwrap();
        assert_relative_eq!(patch.pixels().iter().sum::<f32>(), 256.0, epsilon = 1e-3);
    }

    #[test]
    fn test_extract_clamps_overhanging_box() {
        let frame = gray_frame(50, 50, |_, _| 128);
        let patch = FacePatch::extract(&frame, &BoundingBox::new(40, 40, 100, 100), 8).unwrap();
        assert_relative_eq!(patch.pixels()[0], 128.0 / 255.0, epsilon = 1e-6);
    }

    #[test]
    fn test_extract_empty_crop_is_invalid_input() {
        let frame = gray_frame(50, 50, |_, _| 0);
        let result = FacePatch::extract(&frame, &BoundingBox::new(80, 80, 10, 10), 64);
        assert!(matches!(result, Err(ClassifyError::InvalidInput(_))));
    }

    #[test]
    fn test_extract_rejects_color_frame() {
        let frame = Frame::new(vec![0; 12], 2, 2, 3, 0);
        let result = FacePatch::extract(&frame, &BoundingBox::new(0, 0, 1, 1), 64);
        assert!(matches!(result, Err(ClassifyError::InvalidInput(_))));
    }

    #[test]
    fn test_new_checks_length() {
        assert!(FacePatch::new(vec![0.0; 16], 4).is_ok());
        assert!(FacePatch::new(vec![0.0; 15], 4).is_err());
        assert!(FacePatch::new(Vec::new(), 0).is_err());
    }
}
