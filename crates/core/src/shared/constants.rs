pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Short-range BlazeFace export. Not published for download; place it in
/// the model directory.
pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Emotion classifier exported to ONNX (64x64 grayscale input, 7 outputs).
/// Trained in-house, so it is only looked up locally.
pub const EMOTION_MODEL_NAME: &str = "emotion_model.onnx";

/// Side length of the square grayscale patch the classifier consumes.
pub const FACE_PATCH_SIZE: u32 = 64;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

pub const ANNOTATED_PREFIX: &str = "annotated_";
pub const ANNOTATED_EXTENSION: &str = "mp4";
pub const DEFAULT_OUTPUT_DIR: &str = "annotated_videos";

/// Public URL prefix the annotated videos are served under.
pub const VIDEO_ROUTE_PREFIX: &str = "/videos";

/// fps written when the source does not declare a usable frame rate.
pub const FALLBACK_FPS: f64 = 30.0;
