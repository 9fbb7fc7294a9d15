use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::video_job::{JobId, JobOutcome, VideoJob};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("job {0} not found")]
    UnknownJob(JobId),
    #[error("job {0} already finished")]
    AlreadyTerminal(JobId),
}

/// In-memory job table shared between request handlers and workers.
///
/// Records are replaced whole under the write lock, so a reader sees either
/// the processing record or the finished one, never a mix.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, VideoJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `job_id` as processing and returns the new record.
    pub fn create(&self, job_id: JobId) -> VideoJob {
        let job = VideoJob::processing(job_id);
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id, job.clone());
        job
    }

    /// Moves a processing job to its terminal state. A job finishes once;
    /// later calls are rejected and leave the record untouched.
    pub fn set_terminal(&self, job_id: JobId, outcome: JobOutcome) -> Result<(), RegistryError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let current = jobs
            .get(&job_id)
            .ok_or(RegistryError::UnknownJob(job_id))?;
        if current.status.is_terminal() {
            log::warn!("Ignoring second terminal update for job {job_id}");
            return Err(RegistryError::AlreadyTerminal(job_id));
        }
        let finished = current.finished(outcome);
        log::info!("Job {job_id} is {:?}", finished.status);
        jobs.insert(job_id, finished);
        Ok(())
    }

    pub fn get(&self, job_id: JobId) -> Option<VideoJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops finished jobs older than `ttl`, then calls `on_evict` for each
    /// one removed. Processing jobs are never evicted. The callback runs
    /// after the lock is released, so it may touch the registry or do slow
    /// I/O without stalling pollers.
    pub fn evict_expired(&self, ttl: Duration, on_evict: impl FnMut(&VideoJob)) -> usize {
        self.evict_finished_before(Utc::now() - ttl, on_evict)
    }

    fn evict_finished_before(
        &self,
        cutoff: DateTime<Utc>,
        mut on_evict: impl FnMut(&VideoJob),
    ) -> usize {
        let evicted: Vec<VideoJob> = {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            let expired: Vec<JobId> = jobs
                .values()
                .filter(|job| job.finished_at.is_some_and(|at| at < cutoff))
                .map(|job| job.job_id)
                .collect();
            expired.iter().filter_map(|id| jobs.remove(id)).collect()
        };
        for job in &evicted {
            on_evict(job);
        }
        evicted.len()
    }

    /// Forgets a job outright, whatever its state.
    pub fn remove(&self, job_id: JobId) -> Option<VideoJob> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id)
    }
}
