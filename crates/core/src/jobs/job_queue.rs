use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};
use thiserror::Error;

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("job queue is full")]
    Full,
    #[error("job queue is shut down")]
    Closed,
}

/// Fixed pool of worker threads fed by a bounded channel.
///
/// At most `workers` tasks run at once and at most `capacity` wait; further
/// submissions are refused instead of queued.
pub struct JobQueue {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    pub fn new(workers: usize, capacity: usize) -> std::io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded::<Task>(capacity.max(1));

        let workers = (0..workers.max(1))
            .map(|i| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("video-worker-{i}"))
                    .spawn(move || {
                        for task in receiver {
                            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                                log::error!("Worker {i}: task panicked");
                            }
                        }
                        log::debug!("Worker {i} stopped");
                    })
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn try_submit(&self, task: impl FnOnce() + Send + 'static) -> Result<(), QueueError> {
        let sender = self.sender.as_ref().ok_or(QueueError::Closed)?;
        sender.try_send(Box::new(task)).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Disconnected(_) => QueueError::Closed,
        })
    }

    /// Tasks waiting for a worker.
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting work, lets queued tasks finish and joins the workers.
    pub fn shutdown(&mut self) {
        self.sender = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
