use crate::{
    domain::{MemeRepository, RenderQueue},
    errors::SubmitError,
    models::{CreateMemeCommand, Meme, NewMeme, RenderJob},
};
use std::sync::Arc;
use uuid::Uuid;

/// Submission side of the render pipeline.
#[derive(Clone)]
pub struct Pipeline {
    memes: Arc<dyn MemeRepository>,
    queue: Arc<dyn RenderQueue>,
}

impl Pipeline {
    pub fn new(memes: Arc<dyn MemeRepository>, queue: Arc<dyn RenderQueue>) -> Self {
        Self { memes, queue }
    }

    /// Persists the meme in status `created`, then enqueues exactly one render job.
    ///
    /// The template reference is only checked for shape here; a dangling id
    /// surfaces later as a terminal worker error. If the enqueue fails the record
    /// stays in `created` with nothing pending for it.
    pub async fn submit(&self, cmd: CreateMemeCommand) -> Result<Meme, SubmitError> {
        let template_id = Uuid::parse_str(cmd.template_id.trim()).map_err(SubmitError::InvalidTemplateId)?;

        let meme = self
            .memes
            .insert(NewMeme {
                template_id,
                top: cmd.top,
                bottom: cmd.bottom,
            })
            .await
            .map_err(SubmitError::Store)?;

        self.queue
            .enqueue(RenderJob { meme_id: meme.id })
            .await
            .map_err(|source| {
                tracing::error!(meme_id = %meme.id, "Pipeline: Meme stored but render job was not enqueued");
                SubmitError::Queue {
                    meme_id: meme.id,
                    source,
                }
            })?;

        tracing::info!(meme_id = %meme.id, %template_id, "Pipeline: Meme submitted");
        Ok(meme)
    }
}
