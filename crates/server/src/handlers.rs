use std::collections::{BTreeMap, HashMap};

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path, Request, State};
use axum::response::Response;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use vymo_core::emotion::domain::emotion::Emotion;
use vymo_core::jobs::video_job::{JobId, JobStatus, VideoJob};
use vymo_core::pipeline::analyze_image_use_case::ImageFaceResult;
use vymo_core::pipeline::video_summary::{round4, TimelineEntry, VideoSummary};
use vymo_core::shared::constants::VIDEO_ROUTE_PREFIX;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ImageAnalysisResponse {
    pub results: Vec<ImageFaceResult>,
}

#[derive(Serialize)]
pub struct ImageComparisonResponse {
    pub results_image1: Vec<ImageFaceResult>,
    pub results_image2: Vec<ImageFaceResult>,
}

#[derive(Deserialize)]
pub struct Base64ImageRequest {
    pub image_base64: String,
}

#[derive(Serialize)]
pub struct JobCreationResponse {
    pub job_id: JobId,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct VideoAnalysisResult {
    pub main_emotions: BTreeMap<Emotion, f64>,
    pub analyzed_video_url: String,
    pub emotion_timeline: Vec<TimelineEntry>,
}

impl From<VideoSummary> for VideoAnalysisResult {
    fn from(summary: VideoSummary) -> Self {
        Self {
            main_emotions: summary
                .main_emotions
                .into_iter()
                .map(|(emotion, share)| (emotion, round4(share)))
                .collect(),
            analyzed_video_url: format!("{VIDEO_ROUTE_PREFIX}/{}", summary.output_video),
            emotion_timeline: summary.timeline,
        }
    }
}

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    pub result: Option<VideoAnalysisResult>,
    pub error: Option<String>,
}

impl From<VideoJob> for JobStatusResponse {
    fn from(job: VideoJob) -> Self {
        Self {
            status: job.status,
            result: job.result.map(VideoAnalysisResult::from),
            error: job.error,
        }
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to VYMO Emotion Recognition API" }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "jobs": state.service.job_count() }))
}

pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageAnalysisResponse>, ApiError> {
    let mut files = read_files(multipart, &["file"]).await?;
    let bytes = take_file(&mut files, "file")?;

    let service = state.service.clone();
    let results = tokio::task::spawn_blocking(move || service.analyze_image(&bytes)).await??;
    Ok(Json(ImageAnalysisResponse { results }))
}

pub async fn analyze_image_base64(
    State(state): State<AppState>,
    Json(request): Json<Base64ImageRequest>,
) -> Result<Json<ImageAnalysisResponse>, ApiError> {
    let bytes = decode_base64_image(&request.image_base64)?;

    let service = state.service.clone();
    let results = tokio::task::spawn_blocking(move || service.analyze_image(&bytes)).await??;
    Ok(Json(ImageAnalysisResponse { results }))
}

pub async fn analyze_image_comparison(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageComparisonResponse>, ApiError> {
    let mut files = read_files(multipart, &["file1", "file2"]).await?;
    let first = take_file(&mut files, "file1")?;
    let second = take_file(&mut files, "file2")?;

    let service = state.service.clone();
    let (results_image1, results_image2) =
        tokio::task::spawn_blocking(move || service.compare_images(&first, &second)).await??;
    Ok(Json(ImageComparisonResponse {
        results_image1,
        results_image2,
    }))
}

pub async fn start_video_analysis(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<JobCreationResponse>, ApiError> {
    let mut files = read_files(multipart, &["file"]).await?;
    let bytes = take_file(&mut files, "file")?;

    // writes the upload to disk
    let service = state.service.clone();
    let job_id = tokio::task::spawn_blocking(move || service.submit_video_job(&bytes)).await??;
    Ok(Json(JobCreationResponse {
        job_id,
        message: "Video analysis started.",
    }))
}

pub async fn video_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id: JobId = job_id.parse().map_err(|_| ApiError::JobNotFound)?;
    let job = state.service.get_job(job_id).ok_or(ApiError::JobNotFound)?;
    Ok(Json(job.into()))
}

/// Annotated video by file name, with range request support.
pub async fn serve_video(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = state
        .service
        .resolve_output(&file_name)
        .ok_or(ApiError::VideoNotFound)?;
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    Ok(response.map(Body::new))
}

/// Collects the named file fields; other fields are ignored.
async fn read_files(
    mut multipart: Multipart,
    wanted: &[&str],
) -> Result<HashMap<String, Bytes>, ApiError> {
    let mut files = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if !wanted.contains(&name.as_str()) {
            continue;
        }
        files.insert(name, field.bytes().await?);
    }
    Ok(files)
}

fn take_file(files: &mut HashMap<String, Bytes>, name: &str) -> Result<Bytes, ApiError> {
    files
        .remove(name)
        .ok_or_else(|| ApiError::BadRequest(format!("missing form field '{name}'")))
}

/// Accepts raw base64 or a data URL; everything up to the first comma is
/// treated as a prefix.
pub fn decode_base64_image(input: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match input.split_once(',') {
        Some((_, data)) => data,
        None => input,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("invalid base64 image: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_and_data_url() {
        assert_eq!(decode_base64_image("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64_image("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert!(matches!(
            decode_base64_image("data:image/png;base64,@@@"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_video_result_rounds_and_builds_url() {
        let summary = VideoSummary {
            main_emotions: BTreeMap::from([(Emotion::Happy, 2.0 / 3.0), (Emotion::Sad, 1.0 / 3.0)]),
            output_video: "annotated_x.mp4".into(),
            timeline: Vec::new(),
        };
        let result = VideoAnalysisResult::from(summary);
        assert_eq!(result.analyzed_video_url, "/videos/annotated_x.mp4");
        assert_eq!(result.main_emotions[&Emotion::Happy], 0.6667);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["emotion_timeline"].as_array().unwrap().is_empty());
    }
}
