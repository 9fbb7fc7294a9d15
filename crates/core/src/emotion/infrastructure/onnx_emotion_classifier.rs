/// Emotion classifier backed by an ONNX export of the Keras model.
use std::path::Path;
use std::sync::Mutex;

use crate::shared::onnx_session::{first_input_shape, load_session};
use crate::emotion::domain::emotion::Emotion;
use crate::emotion::domain::emotion_classifier::{ClassifyError, EmotionClassifier};
use crate::emotion::domain::emotion_scores::EmotionScores;
use crate::emotion::domain::face_patch::FacePatch;
use crate::shared::constants::FACE_PATCH_SIZE;

/// Tensor layout of the model's single image input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputLayout {
    /// `[1, H, W, 1]`, the Keras default.
    Nhwc,
    /// `[1, 1, H, W]`
    Nchw,
}

pub struct OnnxEmotionClassifier {
    session: Mutex<ort::session::Session>,
    layout: InputLayout,
    input_size: u32,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, ClassifyError> {
        let session = load_session(model_path).map_err(ClassifyError::ModelLoad)?;
        let (layout, input_size) = first_input_shape(&session)
            .map(|shape| layout_from_shape(&shape))
            .unwrap_or((InputLayout::Nhwc, FACE_PATCH_SIZE));
        log::debug!("Emotion model input {layout:?} {input_size}x{input_size}");

        Ok(Self {
            session: Mutex::new(session),
            layout,
            input_size,
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, patch: &FacePatch) -> Result<EmotionScores, ClassifyError> {
        if patch.size() != self.input_size {
            return Err(ClassifyError::InvalidInput(format!(
                "patch is {0}x{0}, model expects {1}x{1}",
                patch.size(),
                self.input_size
            )));
        }
        let s = self.input_size as usize;
        let shape = match self.layout {
            InputLayout::Nhwc => (1, s, s, 1),
            InputLayout::Nchw => (1, 1, s, s),
        };
        let tensor = ndarray::Array4::from_shape_vec(shape, patch.pixels().to_vec())
            .map_err(|e| ClassifyError::InvalidInput(e.to_string()))?;

        let input_value = ort::value::Tensor::from_array(tensor)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifyError::Inference("classifier session poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(ClassifyError::Inference(
                "emotion model produced no outputs".into(),
            ));
        }
        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        let values: Vec<f32> = output.iter().copied().collect();

        scores_from_output(&values)
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }
}

/// Reads layout and side length from a 4-d input shape. Dynamic or
/// missing spatial dims fall back to the default patch size.
fn layout_from_shape(shape: &[i64]) -> (InputLayout, u32) {
    if shape.len() != 4 {
        return (InputLayout::Nhwc, FACE_PATCH_SIZE);
    }
    let (layout, h) = if shape[1] == 1 && shape[3] != 1 {
        (InputLayout::Nchw, shape[2])
    } else {
        (InputLayout::Nhwc, shape[1])
    };
    let size = if h > 0 { h as u32 } else { FACE_PATCH_SIZE };
    (layout, size)
}

/// Turns the raw output vector into scores, applying softmax when the
/// model emits logits instead of a distribution.
fn scores_from_output(values: &[f32]) -> Result<EmotionScores, ClassifyError> {
    if values.len() != Emotion::COUNT {
        return Err(ClassifyError::Inference(format!(
            "expected {} scores, got {}",
            Emotion::COUNT,
            values.len()
        )));
    }
    let mut raw = [0.0f32; Emotion::COUNT];
    raw.copy_from_slice(values);

    let is_distribution = raw.iter().all(|v| (0.0..=1.0).contains(v))
        && (raw.iter().sum::<f32>() - 1.0).abs() < 1e-3;
    if !is_distribution {
        raw = softmax(raw);
    }
    Ok(EmotionScores::new(raw))
}

fn softmax(logits: [f32; Emotion::COUNT]) -> [f32; Emotion::COUNT] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.map(|v| (v - max).exp());
    let sum: f32 = exp.iter().sum();
    exp.map(|v| v / sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::keras(&[-1, 64, 64, 1], InputLayout::Nhwc, 64)]
    #[case::torch(&[1, 1, 48, 48], InputLayout::Nchw, 48)]
    #[case::dynamic(&[-1, -1, -1, 1], InputLayout::Nhwc, 64)]
    #[case::not_image(&[1, 4096], InputLayout::Nhwc, 64)]
    fn test_layout_from_shape(
        #[case] shape: &[i64],
        #[case] layout: InputLayout,
        #[case] size: u32,
    ) {
        assert_eq!(layout_from_shape(shape), (layout, size));
    }

    #[test]
    fn test_distribution_passes_through() {
        let out = [0.0, 0.0, 0.0, 0.9, 0.1, 0.0, 0.0];
        let scores = scores_from_output(&out).unwrap();
        assert_relative_eq!(scores.get(Emotion::Happy), 0.9);
        assert_relative_eq!(scores.get(Emotion::Neutral), 0.1);
    }

    #[test]
    fn test_logits_are_softmaxed() {
        let out = [0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0];
        let scores = scores_from_output(&out).unwrap();
        let total: f32 = scores.iter().map(|(_, s)| s).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-5);
        assert_eq!(scores.top().0, Emotion::Happy);
        assert!(scores.get(Emotion::Happy) > 0.9);
    }

    #[test]
    fn test_wrong_output_length_is_inference_error() {
        let result = scores_from_output(&[0.5, 0.5]);
        assert!(matches!(result, Err(ClassifyError::Inference(_))));
    }

    #[test]
    fn test_softmax_is_shift_invariant() {
        let a = softmax([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let b = softmax([101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0]);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_new_fails_for_missing_model() {
        let result = OnnxEmotionClassifier::new(Path::new("/nonexistent/emotion.onnx"));
        assert!(matches!(result, Err(ClassifyError::ModelLoad(_))));
    }
}
