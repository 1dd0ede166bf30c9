use crate::errors::{QueueError, RepoError, StorageError};
use crate::models::{Meme, NewMeme, NewTemplate, RenderJob, Template};
use async_trait::async_trait;
use uuid::Uuid;

/// Trait defining operations for storing and retrieving Template metadata.
#[async_trait]
pub trait TemplateRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Assigns an id and creation time, then persists the template.
    async fn insert(&self, template: NewTemplate) -> Result<Template, RepoError>;

    /// Returns Ok(None) if the template is not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Template>, RepoError>;

    /// Newest first, at most `limit` records when given.
    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Template>, RepoError>;
}

/// Trait defining operations for storing and retrieving Meme metadata.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static {
    /// Assigns an id and creation time, then persists the meme in status `created`.
    async fn insert(&self, meme: NewMeme) -> Result<Meme, RepoError>;

    /// Overwrites the stored record with `meme`.
    async fn save(&self, meme: &Meme) -> Result<(), RepoError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError>;

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Meme>, RepoError>;
}

/// Trait defining operations for storing and retrieving image blobs.
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError>;

    /// Fails with `StorageError::NotFound` when no object exists under `key`.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn set_public_read(&self, key: &str) -> Result<(), StorageError>;
}

/// Hands render jobs to the dispatcher. Delivery is at-least-once.
#[async_trait]
pub trait RenderQueue: Send + Sync + 'static {
    async fn enqueue(&self, job: RenderJob) -> Result<(), QueueError>;
}
