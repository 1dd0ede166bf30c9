use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use aws_smithy_types::error::operation::BuildError as SmithyBuildError;
use thiserror::Error;
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Stored record is corrupt: {0}")]
    DataCorruption(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String),

    #[error("File not found with key: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Render queue is closed")]
    Closed,
}

/// Failures of the caption engine. None of them leave a partial image behind.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to load font: {0}")]
    FontLoad(String),
    #[error("Failed to decode template image: {0}")]
    Decode(String),
    #[error("Failed to draw caption: {0}")]
    GlyphDraw(String),
    #[error("Failed to encode rendered image: {0}")]
    Encode(String),
}

// --- Pipeline Errors ---

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Invalid template ID: {0}")]
    InvalidTemplateId(#[source] uuid::Error),
    #[error("Could not save meme record")]
    Store(#[source] RepoError),
    #[error("Could not enqueue render job for meme {meme_id}")]
    Queue {
        meme_id: Uuid,
        #[source]
        source: QueueError,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Meme not found with ID: {0}")]
    MemeNotFound(Uuid),
    #[error("Template not found with ID: {0}")]
    TemplateNotFound(Uuid),
    #[error("Rendering failed")]
    Render(#[from] RenderError),
    #[error("Record store operation failed")]
    Store(#[from] RepoError),
    #[error("File storage operation failed")]
    Storage(#[from] StorageError),
    #[error("Render task aborted: {0}")]
    Aborted(String),
}

impl WorkerError {
    /// Terminal errors are acknowledged and dropped by the dispatcher; everything
    /// else is handed back for redelivery.
    pub fn is_terminal(&self) -> bool {
        match self {
            WorkerError::MemeNotFound(_) | WorkerError::TemplateNotFound(_) => true,
            WorkerError::Render(RenderError::Encode(_)) => false,
            WorkerError::Render(_) => true,
            WorkerError::Store(RepoError::DataCorruption(_)) => true,
            WorkerError::Storage(StorageError::NotFound(_)) => true,
            WorkerError::Store(_) | WorkerError::Storage(_) | WorkerError::Aborted(_) => false,
        }
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing form field: {0}")]
    MissingFormField(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("Invalid ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),

    // Domain/Service level errors
    #[error("Meme not found with ID: {0}")]
    MemeNotFound(Uuid),
    #[error("Template not found with ID: {0}")]
    TemplateNotFound(Uuid),
    #[error("Could not access record store")]
    RepositoryError(#[source] RepoError),
    #[error("Could not perform file storage operation")]
    StorageError(#[source] StorageError),
    #[error("Could not submit meme")]
    SubmitError(#[source] SubmitError),
    #[error("Could not render meme")]
    RenderFailed(#[source] WorkerError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        AppError::RepositoryError(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::StorageError(err)
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::InvalidTemplateId(e) => AppError::InvalidInput(format!("template_id: {}", e)),
            e => AppError::SubmitError(e),
        }
    }
}

impl From<WorkerError> for AppError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::MemeNotFound(id) => AppError::MemeNotFound(id),
            WorkerError::TemplateNotFound(id) => AppError::TemplateNotFound(id),
            e => AppError::RenderFailed(e),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<SmithyBuildError> for AppError {
    fn from(err: SmithyBuildError) -> Self {
        AppError::InitError(format!("Failed to build AWS request: {}", err))
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFormField(field) => (StatusCode::BAD_REQUEST, format!("Missing form field: {}", field)),
            AppError::MultipartError(e) => (StatusCode::BAD_REQUEST, format!("Invalid multipart form data: {}", e)),
            AppError::InvalidUuid(e) => (StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", e)),
            AppError::MemeNotFound(id) => (StatusCode::NOT_FOUND, format!("Meme not found with ID: {}", id)),
            AppError::TemplateNotFound(id) => (StatusCode::NOT_FOUND, format!("Template not found with ID: {}", id)),

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong ;(".to_string())
            }
            AppError::StorageError(e) => {
                tracing::error!(error.source = ?e, "Storage error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong ;(".to_string())
            }
            AppError::SubmitError(e) => {
                tracing::error!(error.source = ?e, "Meme submission failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong ;(".to_string())
            }
            AppError::RenderFailed(e) => {
                tracing::error!(error.source = ?e, "Render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong ;(".to_string())
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server initialization error".to_string())
            }
            AppError::IoError(e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        tracing::error!(error.message = %error_message, error.detail = %self, "Responding with error");

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
