#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use axum::Router;
use meme_creator::{
    config::MAX_TEMPLATE_BYTES,
    domain::{FileStorage, MemeRepository, RenderQueue, TemplateRepository},
    errors::{QueueError, RepoError, StorageError},
    font::EMBEDDED_FONT,
    models::{Meme, MemeStatus, NewMeme, NewTemplate, RenderJob, Template},
    pipeline::Pipeline,
    render::{RenderLayout, Renderer},
    routes::create_router,
    worker::Worker,
    AppState,
};
use std::{
    collections::{HashMap, HashSet},
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryTemplates {
    records: Mutex<HashMap<Uuid, Template>>,
}

#[async_trait]
impl TemplateRepository for InMemoryTemplates {
    async fn insert(&self, new: NewTemplate) -> Result<Template, RepoError> {
        let template = Template {
            id: Uuid::new_v4(),
            created: Utc::now(),
            filename: new.filename,
        };
        self.records.lock().unwrap().insert(template.id, template.clone());
        Ok(template)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Template>, RepoError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Template>, RepoError> {
        let mut all: Vec<Template> = self.records.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created.cmp(&a.created));
        all.truncate(limit.unwrap_or(usize::MAX));
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryMemes {
    records: Mutex<HashMap<Uuid, Meme>>,
    /// Number of `save` calls that fail before saves start succeeding.
    failing_saves: AtomicUsize,
}

impl InMemoryMemes {
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl MemeRepository for InMemoryMemes {
    async fn insert(&self, new: NewMeme) -> Result<Meme, RepoError> {
        let meme = Meme {
            id: Uuid::new_v4(),
            created: Utc::now(),
            status: MemeStatus::Created,
            template_id: new.template_id,
            top: new.top,
            bottom: new.bottom,
        };
        self.records.lock().unwrap().insert(meme.id, meme.clone());
        Ok(meme)
    }

    async fn save(&self, meme: &Meme) -> Result<(), RepoError> {
        let remaining = self.failing_saves.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_saves.store(remaining - 1, Ordering::SeqCst);
            return Err(RepoError::BackendError(anyhow::anyhow!("simulated throttling")));
        }
        self.records.lock().unwrap().insert(meme.id, meme.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Meme>, RepoError> {
        let mut all: Vec<Meme> = self.records.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created.cmp(&a.created));
        all.truncate(limit.unwrap_or(usize::MAX));
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    public: Mutex<HashSet<String>>,
    pub uploads: AtomicUsize,
}

impl InMemoryStorage {
    pub fn put(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn is_public(&self, key: &str) -> bool {
        self.public.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl FileStorage for InMemoryStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: Option<String>) -> Result<(), StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.put(key, data);
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(key).ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn set_public_read(&self, key: &str) -> Result<(), StorageError> {
        if self.get(key).is_none() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        self.public.lock().unwrap().insert(key.to_string());
        Ok(())
    }
}

/// Records jobs instead of delivering them.
#[derive(Default)]
pub struct RecordingQueue {
    pub jobs: Mutex<Vec<RenderJob>>,
    pub closed: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl RenderQueue for RecordingQueue {
    async fn enqueue(&self, job: RenderJob) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

pub const PUBLIC_URL_PREFIX: &str = "https://memes.example.test/published";

pub struct Harness {
    pub templates: Arc<InMemoryTemplates>,
    pub memes: Arc<InMemoryMemes>,
    pub storage: Arc<InMemoryStorage>,
    pub queue: Arc<RecordingQueue>,
    pub pipeline: Pipeline,
    pub worker: Worker,
}

impl Harness {
    pub fn new() -> Self {
        let templates = Arc::new(InMemoryTemplates::default());
        let memes = Arc::new(InMemoryMemes::default());
        let storage = Arc::new(InMemoryStorage::default());
        let queue = Arc::new(RecordingQueue::default());
        let renderer = Renderer::from_font_bytes(EMBEDDED_FONT, RenderLayout::default()).unwrap();

        let pipeline = Pipeline::new(memes.clone(), queue.clone());
        let worker = Worker::new(memes.clone(), templates.clone(), storage.clone(), Arc::new(renderer));

        Self {
            templates,
            memes,
            storage,
            queue,
            pipeline,
            worker,
        }
    }

    /// Stores a solid-color PNG template and its record.
    pub async fn add_template(&self, filename: &str, width: u32, height: u32) -> Template {
        self.storage.put(filename, png_bytes(width, height));
        self.templates
            .insert(NewTemplate { filename: filename.to_string() })
            .await
            .unwrap()
    }

    /// The HTTP surface over the same in-memory collaborators.
    pub fn router(&self) -> Router {
        self.router_with_template_limit(MAX_TEMPLATE_BYTES)
    }

    pub fn router_with_template_limit(&self, max_template_bytes: usize) -> Router {
        create_router(Arc::new(AppState {
            templates: self.templates.clone(),
            memes: self.memes.clone(),
            file_storage: self.storage.clone(),
            pipeline: self.pipeline.clone(),
            worker: self.worker.clone(),
            public_url_prefix: PUBLIC_URL_PREFIX.to_string(),
            max_template_bytes,
        }))
    }

    pub fn enqueued(&self) -> Vec<RenderJob> {
        self.queue.jobs.lock().unwrap().clone()
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    colored_png_bytes(width, height, [30, 60, 90])
}

pub fn colored_png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image: RgbImage = ImageBuffer::from_pixel(width, height, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
