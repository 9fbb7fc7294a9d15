use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::face_detector::FaceDetector;
use crate::emotion::domain::emotion_classifier::EmotionClassifier;
use crate::jobs::job_queue::{JobQueue, QueueError};
use crate::jobs::job_registry::JobRegistry;
use crate::jobs::video_job::{JobId, JobOutcome, VideoJob};
use crate::pipeline::analysis_error::AnalysisError;
use crate::pipeline::analyze_image_use_case::{AnalyzeImageUseCase, ImageFaceResult};
use crate::pipeline::analyze_video_use_case::AnalyzeVideoUseCase;
use crate::pipeline::pipeline_logger::LogPipelineLogger;
use crate::shared::constants::{ANNOTATED_EXTENSION, ANNOTATED_PREFIX};
use crate::video::domain::video_backend::VideoBackend;

use super::service_config::ServiceConfig;

const PROGRESS_EVERY: usize = 50;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("uploaded file is empty")]
    EmptyUpload,
    #[error("too many videos in progress, try again later")]
    Busy,
    #[error("service is shutting down")]
    ShuttingDown,
    #[error("could not store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Entry point for the API layer: image analysis runs inline, video
/// analysis runs on the worker pool and is observed through job polling.
pub struct EmotionService {
    config: ServiceConfig,
    registry: Arc<JobRegistry>,
    queue: JobQueue,
    video: Arc<AnalyzeVideoUseCase>,
    image: AnalyzeImageUseCase,
}

impl EmotionService {
    pub fn new(
        config: ServiceConfig,
        detector: Arc<dyn FaceDetector>,
        classifier: Arc<dyn EmotionClassifier>,
        annotator: Arc<dyn FrameAnnotator>,
        backend: Arc<dyn VideoBackend>,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        if let Some(dir) = &config.temp_dir {
            std::fs::create_dir_all(dir)?;
        }
        let queue = JobQueue::new(config.workers, config.queue_capacity)?;
        log::info!(
            "Video queue: {} workers, capacity {}, output {}",
            queue.worker_count(),
            config.queue_capacity,
            config.output_dir.display()
        );

        Ok(Self {
            video: Arc::new(AnalyzeVideoUseCase::new(
                Arc::clone(&detector),
                Arc::clone(&classifier),
                annotator,
                backend,
            )),
            image: AnalyzeImageUseCase::new(detector, classifier),
            registry: Arc::new(JobRegistry::new()),
            queue,
            config,
        })
    }

    /// Stores the upload, registers a processing job and queues it.
    ///
    /// The job is visible through [`get_job`](Self::get_job) before this
    /// returns. When the queue is full the record is dropped again, since
    /// the caller never learns its id, and `Busy` is returned.
    pub fn submit_video_job(&self, bytes: &[u8]) -> Result<JobId, SubmitError> {
        if bytes.is_empty() {
            return Err(SubmitError::EmptyUpload);
        }
        self.evict_expired();

        let mut input = self.upload_file()?;
        input.write_all(bytes)?;
        input.flush()?;

        let job_id = JobId::new();
        let output = self
            .config
            .output_dir
            .join(output_file_name(job_id, Utc::now()));

        self.registry.create(job_id);
        log::info!("Job {job_id}: queued {} bytes", bytes.len());

        let registry = Arc::clone(&self.registry);
        let video = Arc::clone(&self.video);
        let submitted = self
            .queue
            .try_submit(move || run_job(job_id, input, &output, &video, &registry));

        if let Err(e) = submitted {
            log::warn!("Job {job_id}: rejected, {e}");
            self.registry.remove(job_id);
            return Err(match e {
                QueueError::Full => SubmitError::Busy,
                QueueError::Closed => SubmitError::ShuttingDown,
            });
        }
        Ok(job_id)
    }

    pub fn get_job(&self, job_id: JobId) -> Option<VideoJob> {
        self.registry.get(job_id)
    }

    pub fn job_count(&self) -> usize {
        self.registry.len()
    }

    /// Videos waiting for a free worker.
    pub fn queued_jobs(&self) -> usize {
        self.queue.pending()
    }

    pub fn analyze_image(&self, bytes: &[u8]) -> Result<Vec<ImageFaceResult>, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::InvalidInput("uploaded file is empty".into()));
        }
        self.image.execute(bytes)
    }

    pub fn compare_images(
        &self,
        first: &[u8],
        second: &[u8],
    ) -> Result<(Vec<ImageFaceResult>, Vec<ImageFaceResult>), AnalysisError> {
        Ok((self.analyze_image(first)?, self.analyze_image(second)?))
    }

    /// Path of an annotated video by file name. Anything that is not a
    /// plain file name inside the output directory resolves to `None`.
    pub fn resolve_output(&self, file_name: &str) -> Option<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return None,
        }
        let path = self.config.output_dir.join(file_name);
        path.is_file().then_some(path)
    }

    /// Applies the job TTL, if any. Returns how many jobs were dropped.
    pub fn evict_expired(&self) -> usize {
        let Some(ttl) = self.config.job_ttl else {
            return 0;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let output_dir = &self.config.output_dir;
        let evicted = self.registry.evict_expired(ttl, |job| {
            let Some(summary) = &job.result else {
                return;
            };
            let path = output_dir.join(&summary.output_video);
            if let Err(e) = std::fs::remove_file(&path) {
                log::debug!("Could not remove {}: {e}", path.display());
            }
        });
        if evicted > 0 {
            log::info!("Evicted {evicted} expired jobs");
        }
        evicted
    }

    /// Stops accepting videos and waits for running ones to finish.
    pub fn shutdown(&mut self) {
        self.queue.shutdown();
    }

    fn upload_file(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vymo_upload_").suffix(".mp4");
        match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

/// `annotated_{job_id}_{YYYYmmdd_HHMMSS}.mp4`
pub fn output_file_name(job_id: JobId, at: DateTime<Utc>) -> String {
    format!(
        "{ANNOTATED_PREFIX}{job_id}_{}.{ANNOTATED_EXTENSION}",
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Worker body. The uploaded input is removed before the outcome is
/// recorded, whatever the outcome.
fn run_job(
    job_id: JobId,
    input: NamedTempFile,
    output: &Path,
    video: &AnalyzeVideoUseCase,
    registry: &JobRegistry,
) {
    let mut logger = LogPipelineLogger::new(format!("job {job_id}"), PROGRESS_EVERY);
    let result = catch_unwind(AssertUnwindSafe(|| {
        video.execute(input.path(), output, &mut logger)
    }));

    let outcome = match result {
        Ok(Ok(summary)) => JobOutcome::Completed(summary),
        Ok(Err(e)) => {
            log::warn!("Job {job_id} failed: {e}");
            JobOutcome::Failed(e.to_string())
        }
        Err(_) => {
            log::error!("Job {job_id} panicked");
            JobOutcome::Failed("internal error during video analysis".into())
        }
    };

    if let Err(e) = input.close() {
        log::warn!("Job {job_id}: could not remove upload: {e}");
    }
    if let Err(e) = registry.set_terminal(job_id, outcome) {
        log::error!("Job {job_id}: outcome not recorded: {e}");
    }
}
