use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::constants::{BLAZEFACE_MODEL_NAME, YOLO_MODEL_NAME, YOLO_MODEL_URL};

use super::onnx_blazeface_detector::OnnxBlazefaceDetector;
use super::onnx_yolo_detector::OnnxYoloDetector;

/// Face detection backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectorKind {
    #[default]
    Yolo,
    Blazeface,
}

impl DetectorKind {
    /// File name the model for this backend is stored under.
    pub fn model_name(self) -> &'static str {
        match self {
            DetectorKind::Yolo => YOLO_MODEL_NAME,
            DetectorKind::Blazeface => BLAZEFACE_MODEL_NAME,
        }
    }

    /// Where the model can be downloaded from, if anywhere.
    pub fn model_url(self) -> Option<&'static str> {
        match self {
            DetectorKind::Yolo => Some(YOLO_MODEL_URL),
            DetectorKind::Blazeface => None,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Yolo => f.write_str("yolo"),
            DetectorKind::Blazeface => f.write_str("blazeface"),
        }
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yolo" => Ok(DetectorKind::Yolo),
            "blazeface" => Ok(DetectorKind::Blazeface),
            other => Err(format!(
                "unknown detector '{other}', expected 'yolo' or 'blazeface'"
            )),
        }
    }
}

/// Load the detector for `kind`. A failure here is fatal for the caller.
pub fn create_detector(
    kind: DetectorKind,
    model_path: &Path,
    confidence: f64,
) -> Result<Arc<dyn FaceDetector>, DetectionError> {
    log::info!(
        "Loading {kind} face detector from {} (confidence {confidence})",
        model_path.display()
    );
    let detector: Arc<dyn FaceDetector> = match kind {
        DetectorKind::Yolo => Arc::new(OnnxYoloDetector::new(model_path, confidence)?),
        DetectorKind::Blazeface => Arc::new(OnnxBlazefaceDetector::new(model_path, confidence)?),
    };
    Ok(detector)
}
