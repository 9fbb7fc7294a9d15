use std::sync::Arc;

use vymo_core::service::emotion_service::EmotionService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EmotionService>,
}

impl AppState {
    pub fn new(service: EmotionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
