use crate::{
    config::MEMES_LIST_LIMIT,
    errors::AppError,
    models::{template_key, CreateMemeCommand, MemeResponse, NewTemplate, RenderJob},
    render,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// GET /templates: every template, newest first.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let templates = state.templates.list_recent(None).await?;
    tracing::debug!("Handler retrieved {} templates", templates.len());
    Ok(Json(json!({ "templates": templates })))
}

/// POST /templates: multipart upload with a single `template` file field.
pub async fn upload_template(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut template_data: Option<Vec<u8>> = None;
    let mut template_filename: Option<String> = None;
    let mut template_content_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "template" => {
                template_filename = field.file_name().map(|s| s.to_string());
                template_content_type = field.content_type().map(|m| m.to_string());
                template_data = Some(field.bytes().await?.to_vec());
            }
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    let data = template_data.ok_or_else(|| AppError::MissingFormField("template".to_string()))?;
    if data.is_empty() {
        return Err(AppError::InvalidInput("template data cannot be empty".to_string()));
    }
    if data.len() > state.max_template_bytes {
        return Err(AppError::InvalidInput("template is too large".to_string()));
    }
    render::detect_format(&data).map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let upload_name = template_filename
        .filter(|name| !name.trim().is_empty() && !name.contains('/'))
        .ok_or_else(|| AppError::InvalidInput("template file name is missing or invalid".to_string()))?;

    let content_type = template_content_type
        .or_else(|| mime_guess::from_path(&upload_name).first_raw().map(|s| s.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let filename = template_key(&upload_name);
    state.file_storage.upload(&filename, data, Some(content_type)).await?;
    state.file_storage.set_public_read(&filename).await?;

    let template = state.templates.insert(NewTemplate { filename }).await?;

    tracing::info!(template_id = %template.id, filename = %template.filename, "Template created successfully via handler");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/templates/{}", template.id))],
        Json(json!({ "template": template })),
    ))
}

/// GET /templates/{id}
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let template_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%template_id, "Fetching template details via handler");
    match state.templates.get_by_id(template_id).await? {
        Some(template) => Ok(Json(json!({ "template": template }))),
        None => Err(AppError::TemplateNotFound(template_id)),
    }
}

/// GET /memes: the newest memes with their public image URLs.
pub async fn list_memes(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let memes: Vec<MemeResponse> = state
        .memes
        .list_recent(Some(MEMES_LIST_LIMIT))
        .await?
        .into_iter()
        .map(|meme| MemeResponse::new(meme, &state.public_url_prefix))
        .collect();
    tracing::debug!("Handler retrieved {} memes", memes.len());
    Ok(Json(json!({ "memes": memes })))
}

/// POST /memes: JSON body, answered once the record is stored and the render job queued.
pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateMemeCommand>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(cmd) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;

    let meme = state.pipeline.submit(cmd).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/memes/{}", meme.id))],
        Json(json!({ "meme": MemeResponse::new(meme, &state.public_url_prefix) })),
    ))
}

/// GET /memes/{id}
pub async fn get_meme(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%meme_id, "Fetching meme details via handler");
    match state.memes.get_by_id(meme_id).await? {
        Some(meme) => Ok(Json(json!({ "meme": MemeResponse::new(meme, &state.public_url_prefix) }))),
        None => Err(AppError::MemeNotFound(meme_id)),
    }
}

/// POST /worker: render trigger for external dispatchers. Runs the job to completion.
pub async fn run_worker(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RenderJob>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(job) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;

    let meme = state.worker.run(job).await?;
    Ok(Json(json!({ "meme": MemeResponse::new(meme, &state.public_url_prefix) })))
}
