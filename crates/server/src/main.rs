use std::process;
use std::sync::Arc;

use axum::Router;
use clap::Parser;

use vymo_core::annotation::infrastructure::label_annotator::LabelAnnotator;
use vymo_core::detection::infrastructure::detector_factory::create_detector;
use vymo_core::emotion::domain::emotion_classifier::EmotionClassifier;
use vymo_core::emotion::infrastructure::onnx_emotion_classifier::OnnxEmotionClassifier;
use vymo_core::service::emotion_service::EmotionService;
use vymo_core::shared::constants::EMOTION_MODEL_NAME;
use vymo_core::shared::model_resolver;
use vymo_core::video::infrastructure::ffmpeg_backend::FfmpegBackend;
use vymo_server::{create_router, AppState, ServerConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    config.validate()?;

    let state = AppState::new(build_service(&config)?);
    let app = create_router(state.clone(), &config.cors_origins, config.max_upload_bytes());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(app, &config.bind_address()))?;
    drop(runtime);

    // let queued and running videos finish
    match Arc::try_unwrap(state.service) {
        Ok(mut service) => service.shutdown(),
        Err(_) => log::warn!("Service still referenced at exit; not waiting for running jobs"),
    }
    Ok(())
}

/// Loads both models and wires the service. Any failure here is fatal.
fn build_service(config: &ServerConfig) -> Result<EmotionService, Box<dyn std::error::Error>> {
    let model_dir = config.model_dir.as_deref();
    let kind = config.detector;

    log::info!("Resolving model: {}", kind.model_name());
    let detector_path = model_resolver::resolve(
        kind.model_name(),
        kind.model_url(),
        model_dir,
        Some(Box::new(download_progress)),
    )?;
    let detector = create_detector(kind, &detector_path, config.confidence)?;

    log::info!("Resolving model: {EMOTION_MODEL_NAME}");
    let classifier_path = model_resolver::resolve(EMOTION_MODEL_NAME, None, model_dir, None)?;
    let classifier: Arc<dyn EmotionClassifier> =
        Arc::new(OnnxEmotionClassifier::new(&classifier_path)?);

    let annotator = match &config.font {
        Some(path) => LabelAnnotator::from_font_file(path)?,
        None => LabelAnnotator::with_system_font(),
    };

    Ok(EmotionService::new(
        config.service_config(),
        detector,
        classifier,
        Arc::new(annotator),
        Arc::new(FfmpegBackend),
    )?)
}

async fn serve(app: Router, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    log::info!("Shutting down");
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
