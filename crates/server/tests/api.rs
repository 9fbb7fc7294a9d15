//! End-to-end tests of the HTTP API with stub models and an in-memory
//! video backend.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use vymo_core::annotation::domain::frame_annotator::{FaceAnnotation, FrameAnnotator};
use vymo_core::detection::domain::face_detector::{DetectionError, FaceDetector};
use vymo_core::emotion::domain::emotion::Emotion;
use vymo_core::emotion::domain::emotion_classifier::{ClassifyError, EmotionClassifier};
use vymo_core::emotion::domain::emotion_scores::EmotionScores;
use vymo_core::emotion::domain::face_patch::FacePatch;
use vymo_core::service::emotion_service::EmotionService;
use vymo_core::service::service_config::ServiceConfig;
use vymo_core::shared::bounding_box::BoundingBox;
use vymo_core::shared::frame::Frame;
use vymo_core::shared::video_metadata::VideoMetadata;
use vymo_core::video::domain::video_backend::VideoBackend;
use vymo_core::video::domain::video_error::VideoError;
use vymo_core::video::domain::video_reader::VideoReader;
use vymo_core::video::domain::video_writer::VideoWriter;
use vymo_server::{create_router, AppState};

const BOUNDARY: &str = "vymo-test-boundary";

// --- Stubs ---

/// One face in the top-left quarter of every frame, or none.
struct QuarterDetector {
    faces: bool,
}

impl FaceDetector for QuarterDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectionError> {
        if !self.faces {
            return Ok(Vec::new());
        }
        let w = (frame.width() / 2) as i32;
        let h = (frame.height() / 2) as i32;
        Ok(vec![BoundingBox::new(0, 0, w, h)])
    }
}

struct SurprisedClassifier;

impl EmotionClassifier for SurprisedClassifier {
    fn classify(&self, _patch: &FacePatch) -> Result<EmotionScores, ClassifyError> {
        Ok(EmotionScores::from_pairs(&[
            (Emotion::Surprise, 0.7),
            (Emotion::Happy, 0.2),
            (Emotion::Fear, 0.1),
        ]))
    }
}

struct NoopAnnotator;

impl FrameAnnotator for NoopAnnotator {
    fn annotate(&self, _frame: &mut Frame, _faces: &[FaceAnnotation]) {}
}

/// Treats any upload starting with "VIDEO" as a 3-frame clip.
struct MemoryBackend;

struct MemoryReader {
    frames: Vec<Frame>,
}

impl VideoReader for MemoryReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, VideoError> {
        let bytes = std::fs::read(path).map_err(|e| VideoError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if !bytes.starts_with(b"VIDEO") {
            return Err(VideoError::Open {
                path: path.display().to_string(),
                reason: "unrecognised container".into(),
            });
        }
        self.frames = (0..3)
            .map(|i| Frame::new(vec![50; 32 * 32 * 3], 32, 32, 3, i))
            .collect();
        Ok(VideoMetadata {
            width: 32,
            height: 32,
            fps: 10.0,
            total_frames: 3,
            codec: "memory".into(),
            source_path: Some(path.to_path_buf()),
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, VideoError>> + '_> {
        Box::new(self.frames.drain(..).map(Ok))
    }

    fn close(&mut self) {}
}

struct FileWriter;

impl VideoWriter for FileWriter {
    fn open(&mut self, path: &Path, _metadata: &VideoMetadata) -> Result<(), VideoError> {
        std::fs::write(path, b"annotated").map_err(|e| VideoError::Encode(e.to_string()))
    }

    fn write(&mut self, _frame: &Frame) -> Result<(), VideoError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        Ok(())
    }
}

impl VideoBackend for MemoryBackend {
    fn reader(&self) -> Box<dyn VideoReader> {
        Box::new(MemoryReader { frames: Vec::new() })
    }

    fn writer(&self) -> Box<dyn VideoWriter> {
        Box::new(FileWriter)
    }
}

// --- Helpers ---

struct TestApp {
    router: Router,
    _out: tempfile::TempDir,
}

fn app_with(faces: bool, max_upload: usize) -> TestApp {
    let out = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        output_dir: out.path().to_path_buf(),
        temp_dir: None,
        workers: 1,
        queue_capacity: 4,
        job_ttl: None,
    };
    let service = EmotionService::new(
        config,
        Arc::new(QuarterDetector { faces }),
        Arc::new(SurprisedClassifier),
        Arc::new(NoopAnnotator),
        Arc::new(MemoryBackend),
    )
    .unwrap();
    let router = create_router(
        AppState::new(service),
        &["http://localhost:5173".to_string()],
        max_upload,
    );
    TestApp { router, _out: out }
}

fn app() -> TestApp {
    app_with(true, 10 * 1024 * 1024)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 180, 160]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn multipart(fields: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_form(app: &TestApp, uri: &str, fields: &[(&str, &[u8])]) -> (StatusCode, Value) {
    let body = multipart(fields);
    let request = Request::post(uri)
        .header("content-length", body.len())
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn wait_for_job(app: &TestApp, job_id: &str) -> Value {
    for _ in 0..500 {
        let (status, body) = get(app, &format!("/analyze/video/status/{job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] != "processing" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

fn assert_ranked(emotions: &Value) {
    let map = emotions.as_object().unwrap();
    assert_eq!(map.len(), 7);
    let scores: Vec<f64> = map.values().map(|v| v.as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

// --- Tests ---

#[tokio::test]
async fn root_returns_welcome() {
    let app = app();
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to VYMO Emotion Recognition API");
}

#[tokio::test]
async fn health_reports_job_count() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["jobs"], 0);
}

#[tokio::test]
async fn analyze_image_returns_ranked_emotions() {
    let app = app();
    let (status, body) = post_form(&app, "/analyze/image", &[("file", &png(80, 60))]).await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["box"], serde_json::json!([0, 0, 40, 30]));
    assert_ranked(&results[0]["emotions"]);
    let first = results[0]["emotions"].as_object().unwrap().keys().next().unwrap().clone();
    assert_eq!(first, "Surprise");
}

#[tokio::test]
async fn analyze_image_rejects_garbage() {
    let app = app();
    let (status, body) = post_form(&app, "/analyze/image", &[("file", b"not an image")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("invalid image"));
}

#[tokio::test]
async fn analyze_image_requires_file_field() {
    let app = app();
    let (status, body) = post_form(&app, "/analyze/image", &[("other", b"x")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "missing form field 'file'");
}

#[tokio::test]
async fn analyze_image_base64_accepts_data_url() {
    let app = app();
    let encoded = base64::engine::general_purpose::STANDARD.encode(png(40, 40));
    let payload = serde_json::json!({ "image_base64": format!("data:image/png;base64,{encoded}") });
    let request = Request::post("/analyze/image_base64")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn image_comparison_returns_both_sides() {
    let app = app();
    let (status, body) = post_form(
        &app,
        "/analyze/image-comparison",
        &[("file1", &png(40, 40)), ("file2", &png(60, 20))],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results_image1"].as_array().unwrap().len(), 1);
    assert_eq!(body["results_image2"][0]["box"], serde_json::json!([0, 0, 30, 10]));
}

#[tokio::test]
async fn video_job_completes_and_video_is_served() {
    let app = app();
    let (status, body) = post_form(&app, "/analyze/video", &[("file", b"VIDEO clip")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video analysis started.");
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = wait_for_job(&app, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert!(job["error"].is_null());
    let result = &job["result"];
    assert_eq!(result["main_emotions"], serde_json::json!({ "Surprise": 1.0 }));
    let timeline = result["emotion_timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline[0]["frame"], 1);
    assert_eq!(timeline[2]["timestamp"], 0.3);

    let url = result["analyzed_video_url"].as_str().unwrap();
    assert!(url.starts_with(&format!("/videos/annotated_{job_id}_")));
    let (status, bytes) = send(&app, Request::get(url).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"annotated");
}

#[tokio::test]
async fn video_without_faces_fails() {
    let app = app_with(false, 1024 * 1024);
    let (_, body) = post_form(&app, "/analyze/video", &[("file", b"VIDEO clip")]).await;
    let job = wait_for_job(&app, body["job_id"].as_str().unwrap()).await;

    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"], "no faces detected in video");
    assert!(job["result"].is_null());
}

#[tokio::test]
async fn corrupt_video_fails_asynchronously() {
    let app = app();
    let (status, body) = post_form(&app, "/analyze/video", &[("file", b"garbage")]).await;
    assert_eq!(status, StatusCode::OK);

    let job = wait_for_job(&app, body["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");
    assert!(job["error"].as_str().unwrap().starts_with("cannot open video"));
}

#[tokio::test]
async fn unknown_job_is_404() {
    let app = app();
    let (status, body) = get(&app, "/analyze/video/status/67e55044-10b1-426f-9247-bb680e5fe0c8").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Job not found");

    let (status, _) = get(&app, "/analyze/video/status/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_video_is_404() {
    let app = app();
    let (status, body) = get(&app, "/videos/annotated_missing.mp4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Video not found");

    let (status, _) = get(&app, "/videos/..%2FCargo.toml").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = app_with(true, 1024);
    let big = vec![0u8; 4096];
    let (status, _) = post_form(&app, "/analyze/video", &[("file", &big)]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let app = app();
    let request = Request::get("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
}
