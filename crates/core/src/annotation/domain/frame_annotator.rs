use crate::emotion::domain::emotion::Emotion;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// What gets drawn for one face: its box and top emotion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceAnnotation {
    pub bbox: BoundingBox,
    pub emotion: Emotion,
    pub score: f32,
}

impl FaceAnnotation {
    /// Caption text, e.g. `Happy (93.2%)`.
    pub fn label(&self) -> String {
        format!("{} ({:.1}%)", self.emotion, self.score * 100.0)
    }
}

/// Draws face boxes and labels onto a frame in place.
///
/// Infallible: boxes outside the frame are clamped or skipped.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, frame: &mut Frame, faces: &[FaceAnnotation]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_format() {
        let a = FaceAnnotation {
            bbox: BoundingBox::new(0, 0, 10, 10),
            emotion: Emotion::Happy,
            score: 0.9321,
        };
        assert_eq!(a.label(), "Happy (93.2%)");
    }

    #[test]
    fn test_label_full_confidence() {
        let a = FaceAnnotation {
            bbox: BoundingBox::new(0, 0, 10, 10),
            emotion: Emotion::Surprise,
            score: 1.0,
        };
        assert_eq!(a.label(), "Surprise (100.0%)");
    }
}
