pub mod job_queue;
pub mod job_registry;
pub mod video_job;
