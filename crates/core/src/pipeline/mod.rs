pub mod analysis_error;
pub mod analyze_image_use_case;
pub mod analyze_video_use_case;
pub mod emotion_tally;
pub mod face_analysis;
pub mod pipeline_logger;
pub mod video_summary;
