use crate::{
    domain::{FileStorage, MemeRepository, TemplateRepository},
    errors::WorkerError,
    models::{Meme, MemeStatus, RenderJob},
    render::Renderer,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Consumes render jobs: load records, composite the captions, publish, mark done.
///
/// A run never retries on its own. Publishing and the status flip both key off
/// the meme id, so a redelivered job overwrites the same object with the same
/// bytes and lands in the same state.
#[derive(Clone)]
pub struct Worker {
    memes: Arc<dyn MemeRepository>,
    templates: Arc<dyn TemplateRepository>,
    file_storage: Arc<dyn FileStorage>,
    renderer: Arc<Renderer>,
}

impl Worker {
    pub fn new(
        memes: Arc<dyn MemeRepository>,
        templates: Arc<dyn TemplateRepository>,
        file_storage: Arc<dyn FileStorage>,
        renderer: Arc<Renderer>,
    ) -> Self {
        Self {
            memes,
            templates,
            file_storage,
            renderer,
        }
    }

    #[tracing::instrument(skip(self), fields(meme_id = %job.meme_id))]
    pub async fn run(&self, job: RenderJob) -> Result<Meme, WorkerError> {
        let mut meme = self
            .memes
            .get_by_id(job.meme_id)
            .await?
            .ok_or(WorkerError::MemeNotFound(job.meme_id))?;

        let template = self
            .templates
            .get_by_id(meme.template_id)
            .await?
            .ok_or(WorkerError::TemplateNotFound(meme.template_id))?;

        debug!(template_id = %template.id, filename = %template.filename, "Worker: Fetching template image");
        let template_bytes = self.file_storage.download(&template.filename).await?;

        let renderer = Arc::clone(&self.renderer);
        let (top, bottom) = (meme.top.clone(), meme.bottom.clone());
        let png = tokio::task::spawn_blocking(move || renderer.render_png(&template_bytes, &top, &bottom))
            .await
            .map_err(|e| WorkerError::Aborted(e.to_string()))??;

        let key = meme.output_key();
        debug!(output_key = %key, bytes = png.len(), "Worker: Publishing rendered meme");
        self.file_storage
            .upload(&key, png, Some("image/png".to_string()))
            .await?;
        self.file_storage.set_public_read(&key).await?;

        meme.status = MemeStatus::Done;
        self.memes.save(&meme).await?;

        info!(output_key = %key, "Worker: Meme rendered");
        Ok(meme)
    }
}
