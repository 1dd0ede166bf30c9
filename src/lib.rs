pub mod aws_clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod font;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod render;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod storage;
pub mod worker;

use crate::{
    domain::{FileStorage, MemeRepository, TemplateRepository},
    pipeline::Pipeline,
    worker::Worker,
};
use std::sync::Arc;

/// AppState holds shared resources for the web server.
#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<dyn TemplateRepository>,
    pub memes: Arc<dyn MemeRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub pipeline: Pipeline,
    pub worker: Worker,
    pub public_url_prefix: String,
    pub max_template_bytes: usize,
}
