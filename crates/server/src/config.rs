use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use vymo_core::detection::infrastructure::detector_factory::DetectorKind;
use vymo_core::service::service_config::ServiceConfig;
use vymo_core::shared::constants::{DEFAULT_CONFIDENCE, DEFAULT_OUTPUT_DIR};

/// Face emotion recognition API server.
#[derive(Parser, Debug, Clone)]
#[command(name = "vymo-server", version)]
pub struct ServerConfig {
    #[arg(long, env = "VYMO_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "VYMO_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory annotated videos are written to and served from.
    #[arg(long, env = "VYMO_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Face detector backend: yolo or blazeface.
    #[arg(long, env = "VYMO_DETECTOR", default_value_t = DetectorKind::Yolo)]
    pub detector: DetectorKind,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, env = "VYMO_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE)]
    pub confidence: f64,

    /// Videos analysed in parallel.
    #[arg(long, env = "VYMO_WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// Videos allowed to wait for a worker before uploads get 503.
    #[arg(long, env = "VYMO_QUEUE_CAPACITY", default_value_t = 16)]
    pub queue_capacity: usize,

    /// Forget finished jobs (and delete their videos) after this many
    /// seconds. Unset keeps them until restart.
    #[arg(long, env = "VYMO_JOB_TTL_SECS")]
    pub job_ttl_secs: Option<u64>,

    #[arg(long, env = "VYMO_MAX_UPLOAD_MB", default_value_t = 200)]
    pub max_upload_mb: usize,

    /// Allowed CORS origins, comma-separated.
    #[arg(
        long,
        env = "VYMO_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:5173"
    )]
    pub cors_origins: Vec<String>,

    /// TrueType font for video captions. A system font is used if unset.
    #[arg(long, env = "VYMO_FONT")]
    pub font: Option<PathBuf>,

    /// Directory searched for model files before the user cache.
    #[arg(long, env = "VYMO_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            ));
        }
        if self.workers == 0 {
            return Err("At least one worker is required".into());
        }
        if self.queue_capacity == 0 {
            return Err("Queue capacity must be at least 1".into());
        }
        if self.max_upload_mb == 0 {
            return Err("Max upload size must be at least 1 MB".into());
        }
        Ok(())
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            output_dir: self.output_dir.clone(),
            temp_dir: None,
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            job_ttl: self.job_ttl_secs.map(Duration::from_secs),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
