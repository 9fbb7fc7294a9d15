use std::path::PathBuf;
use std::time::Duration;

use crate::shared::constants::DEFAULT_OUTPUT_DIR;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Where annotated videos are written and served from.
    pub output_dir: PathBuf,
    /// Directory for uploaded inputs; the system temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Videos analysed concurrently.
    pub workers: usize,
    /// Videos allowed to wait for a worker before uploads are refused.
    pub queue_capacity: usize,
    /// Finished jobs older than this are forgotten and their videos
    /// deleted. `None` keeps everything for the life of the process.
    pub job_ttl: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            temp_dir: None,
            workers: 2,
            queue_capacity: 16,
            job_ttl: None,
        }
    }
}
