/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, confidence filtering and NMS,
/// then maps boxes back to frame coordinates and clamps them.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{first_input_shape, load_session};

use super::nms::{nms, Candidate};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, DetectionError> {
        let session = load_session(model_path).map_err(DetectionError::ModelLoad)?;

        let input_size = first_input_shape(&session)
            .and_then(|shape| match shape.get(2) {
                Some(&h) if shape.len() >= 4 && h > 0 => Some(h as u32),
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("YOLO input size {input_size}, confidence {confidence}");

        Ok(Self {
            session: Mutex::new(session),
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectionError> {
        // 1. Preprocess: letterbox + normalize → NCHW float32
        let lb = letterbox(frame, self.input_size)?;

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(lb.tensor)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detector session poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectionError::Inference(
                "YOLO model produced no outputs".into(),
            ));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| DetectionError::Inference("non-contiguous YOLO output".into()))?;

        // 3. Parse, filter, suppress
        let mut candidates = parse_output(data, &shape, self.confidence)?;
        for c in candidates.iter_mut() {
            lb.unmap(c);
        }
        let kept = nms(&mut candidates, NMS_IOU_THRESH);

        // 4. Clamp to the frame, dropping anything degenerate
        Ok(kept
            .iter()
            .filter_map(|c| {
                BoundingBox::from_corners(c.x1, c.y1, c.x2, c.y2, frame.width(), frame.height())
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

struct Letterbox {
    tensor: ndarray::Array4<f32>,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Map a candidate from letterbox space back to frame space.
    fn unmap(&self, c: &mut Candidate) {
        c.x1 = (c.x1 - self.pad_x as f64) / self.scale;
        c.y1 = (c.y1 - self.pad_y as f64) / self.scale;
        c.x2 = (c.x2 - self.pad_x as f64) / self.scale;
        c.y2 = (c.y2 - self.pad_y as f64) / self.scale;
    }
}

/// Letterbox-resize an RGB frame to `target_size` × `target_size`.
fn letterbox(frame: &Frame, target_size: u32) -> Result<Letterbox, DetectionError> {
    let src = match frame.as_ndarray() {
        Some(src) if frame.channels() == 3 && frame.width() > 0 && frame.height() > 0 => src,
        _ => {
            return Err(DetectionError::Inference(format!(
                "expected a non-empty RGB frame, got {}x{}x{}",
                frame.width(),
                frame.height(),
                frame.channels()
            )))
        }
    };

    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padded with 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Ok(Letterbox {
        tensor,
        scale,
        pad_x,
        pad_y,
    })
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Decode `[1, features, detections]` or `[1, detections, features]` output
/// rows of `[cx, cy, w, h, conf, ...]` into letterbox-space candidates.
fn parse_output(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
) -> Result<Vec<Candidate>, DetectionError> {
    if shape.len() != 3 {
        return Err(DetectionError::Inference(format!(
            "unexpected YOLO output shape: {shape:?}"
        )));
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(DetectionError::Inference(format!(
            "YOLO output too small for shape {shape:?}"
        )));
    }

    let at = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    Ok((0..num_dets)
        .filter_map(|i| {
            let conf = at(i, 4);
            if conf < confidence {
                return None;
            }
            let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
            Some(Candidate {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
                score: conf,
            })
        })
        .collect())
}
