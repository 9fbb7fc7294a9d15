use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use vymo_core::shared::constants::VIDEO_ROUTE_PREFIX;

use crate::handlers::{
    analyze_image, analyze_image_base64, analyze_image_comparison, health, root, serve_video,
    start_video_analysis, video_status,
};
use crate::state::AppState;

pub fn create_router(state: AppState, cors_origins: &[String], max_upload_bytes: usize) -> Router {
    let analysis = Router::new()
        .route("/analyze/image", post(analyze_image))
        .route("/analyze/image_base64", post(analyze_image_base64))
        .route("/analyze/image-comparison", post(analyze_image_comparison))
        .route("/analyze/video", post(start_video_analysis))
        .route("/analyze/video/status/{job_id}", get(video_status))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(&format!("{VIDEO_ROUTE_PREFIX}/{{file_name}}"), get(serve_video))
        .merge(analysis)
        .layer(cors_layer(cors_origins))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    let response = next.run(request).await;
    log::info!(
        "{method} {uri} -> {} ({:.1}ms)",
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin '{o}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
