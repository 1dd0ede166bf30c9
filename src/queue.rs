use crate::{
    domain::RenderQueue,
    errors::{QueueError, WorkerError},
    models::{Meme, RenderJob},
    worker::Worker,
};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use std::time::Duration;
use tokio::sync::mpsc;

/// In-process render queue backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    sender: mpsc::UnboundedSender<RenderJob>,
}

pub fn channel() -> (ChannelQueue, mpsc::UnboundedReceiver<RenderJob>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelQueue { sender }, receiver)
}

#[async_trait]
impl RenderQueue for ChannelQueue {
    async fn enqueue(&self, job: RenderJob) -> Result<(), QueueError> {
        self.sender.send(job).map_err(|_| QueueError::Closed)?;
        tracing::debug!(meme_id = %job.meme_id, "Queue: Render job enqueued");
        Ok(())
    }
}

/// Delivers queued jobs to the worker, at least once.
///
/// Transient worker failures are redelivered with exponential backoff until the
/// policy's elapsed-time budget runs out; terminal failures are dropped at once.
#[derive(Clone)]
pub struct Dispatcher {
    worker: Worker,
    policy: ExponentialBackoff,
}

impl Dispatcher {
    pub fn new(worker: Worker, policy: ExponentialBackoff) -> Self {
        Self { worker, policy }
    }

    pub fn with_max_elapsed(worker: Worker, max_elapsed: Duration) -> Self {
        Self::new(
            worker,
            ExponentialBackoff {
                max_elapsed_time: Some(max_elapsed),
                ..ExponentialBackoff::default()
            },
        )
    }

    /// Runs until every sender is dropped. Each job is delivered on its own task.
    pub async fn run(self, mut jobs: mpsc::UnboundedReceiver<RenderJob>) {
        tracing::info!("Dispatcher: Waiting for render jobs");
        while let Some(job) = jobs.recv().await {
            let dispatcher = self.clone();
            tokio::spawn(async move {
                // outcome is already logged by deliver
                let _ = dispatcher.deliver(job).await;
            });
        }
        tracing::info!("Dispatcher: Queue closed, stopping");
    }

    pub async fn deliver(&self, job: RenderJob) -> Result<Meme, WorkerError> {
        let worker = &self.worker;
        let result = backoff::future::retry(self.policy.clone(), move || async move {
            worker.run(job).await.map_err(|e| {
                if e.is_terminal() {
                    backoff::Error::permanent(e)
                } else {
                    tracing::warn!(meme_id = %job.meme_id, error = %e, "Dispatcher: Render attempt failed, will redeliver");
                    backoff::Error::transient(e)
                }
            })
        })
        .await;

        match &result {
            Ok(_) => tracing::debug!(meme_id = %job.meme_id, "Dispatcher: Job acknowledged"),
            Err(e) if e.is_terminal() => {
                tracing::warn!(meme_id = %job.meme_id, error = %e, "Dispatcher: Dropping job after terminal failure")
            }
            Err(e) => {
                tracing::error!(meme_id = %job.meme_id, error = %e, "Dispatcher: Giving up on job, retry budget exhausted")
            }
        }
        result
    }
}
