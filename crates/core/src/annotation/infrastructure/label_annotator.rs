/// Box-and-caption annotator drawn with `imageproc`.
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::annotation::domain::frame_annotator::{FaceAnnotation, FrameAnnotator};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 18.0;
/// Gap between the caption baseline area and the top of the box.
const LABEL_OFFSET: i32 = 10;
const STRIP_HEIGHT: i32 = 6;

/// Common bold sans fonts, checked in order by [`LabelAnnotator::with_system_font`].
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a usable TrueType/OpenType font")]
    Invalid(PathBuf),
}

/// Draws a magenta box per face with `Emotion (xx.x%)` above it.
///
/// Without a font the caption is replaced by a filled strip whose length is
/// proportional to the confidence.
pub struct LabelAnnotator {
    font: Option<FontVec>,
}

impl LabelAnnotator {
    pub fn from_font_file(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let font =
            FontVec::try_from_vec(bytes).map_err(|_| FontError::Invalid(path.to_path_buf()))?;
        Ok(Self { font: Some(font) })
    }

    /// Uses the first loadable font from a list of usual system locations.
    pub fn with_system_font() -> Self {
        for candidate in SYSTEM_FONTS {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match Self::from_font_file(path) {
                Ok(annotator) => {
                    log::debug!("Annotation font: {}", path.display());
                    return annotator;
                }
                Err(e) => log::debug!("Skipping font: {e}"),
            }
        }
        log::warn!("No system font found; annotations will use confidence strips instead of text");
        Self::without_font()
    }

    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_face(&self, img: &mut RgbImage, face: &FaceAnnotation) {
        let Some(b) = face.bbox.clamped_to(img.width(), img.height()) else {
            return;
        };
        draw_box(img, &b);

        match &self.font {
            Some(font) => {
                let scale = PxScale::from(LABEL_SCALE);
                let text = face.label();
                let (_, text_h) = text_size(scale, font, &text);
                let above = b.y - LABEL_OFFSET - text_h as i32;
                let y = if above >= 0 { above } else { b.y + BOX_THICKNESS + 2 };
                draw_text_mut(img, BOX_COLOR, b.x, y, scale, font, &text);
            }
            None => {
                let len = ((b.width as f32 * face.score.clamp(0.0, 1.0)).round() as u32).max(1);
                let above = b.y - LABEL_OFFSET;
                let y = if above >= 0 { above } else { b.y + BOX_THICKNESS + 1 };
                draw_filled_rect_mut(
                    img,
                    Rect::at(b.x, y).of_size(len, STRIP_HEIGHT as u32),
                    BOX_COLOR,
                );
            }
        }
    }
}

impl Default for LabelAnnotator {
    fn default() -> Self {
        Self::with_system_font()
    }
}

impl FrameAnnotator for LabelAnnotator {
    fn annotate(&self, frame: &mut Frame, faces: &[FaceAnnotation]) {
        if faces.is_empty() {
            return;
        }
        let drawn = frame.with_rgb_image(|img| {
            for face in faces {
                self.draw_face(img, face);
            }
        });
        if drawn.is_none() {
            log::debug!(
                "Frame {} is not RGB, skipping annotation",
                frame.index()
            );
        }
    }
}

/// Hollow rectangle `BOX_THICKNESS` pixels wide, growing inwards.
fn draw_box(img: &mut RgbImage, b: &BoundingBox) {
    for i in 0..BOX_THICKNESS {
        let w = b.width - 2 * i;
        let h = b.height - 2 * i;
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            img,
            Rect::at(b.x + i, b.y + i).of_size(w as u32, h as u32),
            BOX_COLOR,
        );
    }
}
