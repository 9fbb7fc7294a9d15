/// BlazeFace face detector using ONNX Runtime via `ort`.
///
/// A lightweight short-range detector. Cheaper than YOLO, less accurate on
/// small or distant faces.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::load_session;

use super::nms::{nms, Candidate};

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output (box + 6 keypoints).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, DetectionError> {
        let session = load_session(model_path).map_err(DetectionError::ModelLoad)?;
        Ok(Self {
            session: Mutex::new(session),
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectionError> {
        let fw = frame.width();
        let fh = frame.height();

        let input_tensor = preprocess(frame, INPUT_SIZE)?;
        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detector session poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(DetectionError::Inference(format!(
                "BlazeFace model expected 2 outputs, got {}",
                outputs.len()
            )));
        }
        let regressors = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let scores = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let reg_data = regressors
            .as_slice()
            .ok_or_else(|| DetectionError::Inference("non-contiguous regressor output".into()))?;
        let score_data = scores
            .as_slice()
            .ok_or_else(|| DetectionError::Inference("non-contiguous score output".into()))?;

        let mut candidates = decode(
            &self.anchors,
            reg_data,
            score_data,
            self.confidence,
            fw as f32,
            fh as f32,
        );
        let kept = nms(&mut candidates, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .filter_map(|c| BoundingBox::from_corners(c.x1, c.y1, c.x2, c.y2, fw, fh))
            .collect())
    }
}

/// Resize an RGB frame to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> Result<ndarray::Array4<f32>, DetectionError> {
    let src = match frame.as_ndarray() {
        Some(src) if frame.channels() == 3 && frame.width() > 0 && frame.height() > 0 => src,
        _ => {
            return Err(DetectionError::Inference(
                "expected a non-empty RGB frame".into(),
            ))
        }
    };
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Ok(tensor)
}

/// Decode anchor-relative boxes above the confidence threshold into frame
/// coordinates. Scores are raw logits.
fn decode(
    anchors: &[[f32; 2]],
    reg_data: &[f32],
    score_data: &[f32],
    confidence: f64,
    fw: f32,
    fh: f32,
) -> Vec<Candidate> {
    let size = INPUT_SIZE as f32;
    score_data
        .iter()
        .zip(anchors)
        .enumerate()
        .filter_map(|(i, (&raw, anchor))| {
            let score = sigmoid(raw);
            if (score as f64) < confidence {
                return None;
            }
            let reg = reg_data.get(i * REGRESSOR_STRIDE..i * REGRESSOR_STRIDE + 4)?;
            let cx = anchor[0] + reg[0] / size;
            let cy = anchor[1] + reg[1] / size;
            let w = reg[2] / size;
            let h = reg[3] / size;
            Some(Candidate {
                x1: ((cx - w / 2.0) * fw) as f64,
                y1: ((cy - h / 2.0) * fh) as f64,
                x2: ((cx + w / 2.0) * fw) as f64,
                y2: ((cy + h / 2.0) * fh) as f64,
                score: score as f64,
            })
        })
        .collect()
}

/// Short-range anchors: a 16×16 grid with 2 anchors per cell and an 8×8
/// grid with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
