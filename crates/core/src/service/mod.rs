pub mod emotion_service;
pub mod service_config;
