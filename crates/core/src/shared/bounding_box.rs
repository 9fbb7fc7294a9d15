use serde::{Deserialize, Serialize};

/// Axis-aligned face box in pixel coordinates.
///
/// Boxes produced by detectors always satisfy `width > 0 && height > 0`
/// and lie inside the frame they were detected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from float corners, clamping both corners to
    /// `[0, frame_w - 1] × [0, frame_h - 1]`.
    ///
    /// Returns `None` for boxes that are empty after clamping.
    pub fn from_corners(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        frame_w: u32,
        frame_h: u32,
    ) -> Option<Self> {
        if frame_w == 0 || frame_h == 0 || !(x1.is_finite() && y1.is_finite()) {
            return None;
        }
        if !(x2.is_finite() && y2.is_finite()) {
            return None;
        }
        let max_x = (frame_w - 1) as f64;
        let max_y = (frame_h - 1) as f64;
        let left = x1.clamp(0.0, max_x).round() as i32;
        let top = y1.clamp(0.0, max_y).round() as i32;
        let right = x2.clamp(0.0, max_x).round() as i32;
        let bottom = y2.clamp(0.0, max_y).round() as i32;

        let width = right - left;
        let height = bottom - top;
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Self::new(left, top, width, height))
    }

    /// Re-clamps an arbitrary box into a frame; `None` if nothing is left.
    pub fn clamped_to(&self, frame_w: u32, frame_h: u32) -> Option<Self> {
        Self::from_corners(
            self.x as f64,
            self.y as f64,
            self.x as f64 + self.width as f64,
            self.y as f64 + self.height as f64,
            frame_w,
            frame_h,
        )
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// `[x, y, w, h]`, the wire form used by the image endpoints.
    pub fn as_array(&self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}
