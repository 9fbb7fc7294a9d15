pub mod detector_factory;
pub mod nms;
pub mod onnx_blazeface_detector;
pub mod onnx_yolo_detector;
