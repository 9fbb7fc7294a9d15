use crate::shared::frame::Frame;
use crate::video::domain::video_error::VideoError;

/// Decodes an encoded still image (JPEG, PNG, ...) into an RGB frame.
pub fn decode_image(bytes: &[u8]) -> Result<Frame, VideoError> {
    if bytes.is_empty() {
        return Err(VideoError::InvalidImage("empty image data".into()));
    }
    let image =
        image::load_from_memory(bytes).map_err(|e| VideoError::InvalidImage(e.to_string()))?;
    let rgb = image.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(VideoError::InvalidImage("image has no pixels".into()));
    }
    Ok(Frame::from_rgb_image(rgb, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let mut img = RgbImage::new(4, 3);
        img.put_pixel(1, 2, Rgb([200, 100, 50]));
        let frame = decode_image(&encode(&img, ImageFormat::Png)).unwrap();

        assert_eq!((frame.width(), frame.height(), frame.channels()), (4, 3, 3));
        let i = (2 * 4 + 1) * 3;
        assert_eq!(&frame.data()[i..i + 3], &[200, 100, 50]);
    }

    #[test]
    fn test_decode_jpeg() {
        let img = RgbImage::from_pixel(16, 16, Rgb([90, 90, 90]));
        let frame = decode_image(&encode(&img, ImageFormat::Jpeg)).unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 16));
    }

    #[test]
    fn test_garbage_is_invalid_image() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(VideoError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_empty_is_invalid_image() {
        assert!(matches!(decode_image(&[]), Err(VideoError::InvalidImage(_))));
    }
}
