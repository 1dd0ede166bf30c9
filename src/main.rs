use meme_creator::{
    aws_clients::{create_dynamodb_client, create_s3_client, create_sdk_config},
    config::{Config, MAX_TEMPLATE_BYTES},
    domain::{FileStorage, MemeRepository, TemplateRepository},
    errors::AppError,
    font::EMBEDDED_FONT,
    pipeline::Pipeline,
    queue::{self, Dispatcher},
    render::Renderer,
    repositories::{DynamoDbMemeRepository, DynamoDbTemplateRepository},
    routes::create_router,
    startup::init_resources,
    storage::S3FileStorage,
    worker::Worker,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "meme_creator=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load()?;
    tracing::info!(?config, "Configuration loaded");

    // --- AWS Client Initialization ---
    let sdk_config = create_sdk_config(&config).await;
    let db_client = create_dynamodb_client(&sdk_config);
    let s3_client = create_s3_client(&sdk_config);

    init_resources(
        &db_client,
        &s3_client,
        &[config.templates_table.as_str(), config.memes_table.as_str()],
        &config.meme_bucket_name,
        &config.aws_region,
    )
    .await?;

    // --- Caption engine ---
    // A corrupt embedded font would fail every job, so refuse to start.
    let renderer = Renderer::from_font_bytes(EMBEDDED_FONT, config.render_layout.clone())
        .map_err(|e| AppError::InitError(format!("Failed to load embedded font: {}", e)))?;
    tracing::info!(layout = ?renderer.layout(), "Caption renderer ready");

    // --- Collaborators ---
    let templates: Arc<dyn TemplateRepository> =
        Arc::new(DynamoDbTemplateRepository::new(db_client.clone(), config.templates_table.clone()));
    let memes: Arc<dyn MemeRepository> =
        Arc::new(DynamoDbMemeRepository::new(db_client, config.memes_table.clone()));
    let file_storage: Arc<dyn FileStorage> =
        Arc::new(S3FileStorage::new(s3_client, config.meme_bucket_name.clone()));

    // --- Render pipeline ---
    let (render_queue, jobs) = queue::channel();
    let worker = Worker::new(memes.clone(), templates.clone(), file_storage.clone(), Arc::new(renderer));
    let dispatcher = Dispatcher::with_max_elapsed(worker.clone(), config.render_retry_max_elapsed);
    tokio::spawn(dispatcher.run(jobs));

    // --- Application State ---
    let state = Arc::new(AppState {
        templates,
        memes: memes.clone(),
        file_storage,
        pipeline: Pipeline::new(memes, Arc::new(render_queue)),
        worker,
        public_url_prefix: config.public_url_prefix.clone(),
        max_template_bytes: MAX_TEMPLATE_BYTES,
    });

    let app = create_router(state);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
