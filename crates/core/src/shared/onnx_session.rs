use std::path::Path;

use ort::session::Session;

/// Return the preferred ONNX execution providers for the current platform.
///
/// ONNX Runtime falls back to CPU if the platform-specific provider is
/// unavailable.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Build a session for `model_path` with the platform's execution providers.
///
/// Errors are flattened to strings; callers wrap them in their own
/// `ModelLoad` variant.
pub fn load_session(model_path: &Path) -> Result<Session, String> {
    if !model_path.is_file() {
        return Err(format!("model file not found: {}", model_path.display()));
    }
    Session::builder()
        .map_err(|e| e.to_string())?
        .with_execution_providers(preferred_execution_providers())
        .map_err(|e| e.to_string())?
        .commit_from_file(model_path)
        .map_err(|e| e.to_string())
}

/// Input dimensions declared by the model's first input, if it is a tensor.
/// Dynamic axes are reported as `-1`.
pub fn first_input_shape(session: &Session) -> Option<Vec<i64>> {
    session.inputs().first().and_then(|input| {
        if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
            Some(shape.iter().copied().collect())
        } else {
            None
        }
    })
}
