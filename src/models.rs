use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// An uploaded base image. Never mutated after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Template {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub filename: String,
}

/// Fields supplied by the caller; the repository assigns `id` and `created`.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub filename: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemeStatus {
    Created,
    Done,
}

impl MemeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemeStatus::Created => "created",
            MemeStatus::Done => "done",
        }
    }
}

impl fmt::Display for MemeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MemeStatus::Created),
            "done" => Ok(MemeStatus::Done),
            other => Err(format!("unknown meme status '{}'", other)),
        }
    }
}

/// One captioning job and its outcome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Meme {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub status: MemeStatus,
    pub template_id: Uuid,
    pub top: String,
    pub bottom: String,
}

impl Meme {
    /// Object key of the rendered image. Every render of this meme writes here.
    pub fn output_key(&self) -> String {
        output_key(self.id)
    }

    pub fn public_url(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.output_key())
    }
}

pub fn output_key(meme_id: Uuid) -> String {
    format!("{}.png", meme_id)
}

/// Template blobs live under their own prefix, apart from rendered output.
pub const TEMPLATE_KEY_PREFIX: &str = "templates/";

/// Fresh blob key for an uploaded template: `templates/<uuid>-<name>`.
///
/// Every upload gets a new key, so a template never replaces another template
/// or a published meme. Characters outside `[A-Za-z0-9._-]` become `_`.
pub fn template_key(upload_name: &str) -> String {
    let name: String = upload_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    format!("{}{}-{}", TEMPLATE_KEY_PREFIX, Uuid::new_v4(), name)
}

#[derive(Debug, Clone)]
pub struct NewMeme {
    pub template_id: Uuid,
    pub top: String,
    pub bottom: String,
}

/// Request body of `POST /memes`. Missing captions decode as empty strings.
#[derive(Deserialize, Debug, Clone)]
pub struct CreateMemeCommand {
    pub template_id: String,
    #[serde(default)]
    pub top: String,
    #[serde(default)]
    pub bottom: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct MemeResponse {
    #[serde(flatten)]
    pub meme: Meme,
    pub public_url: String,
}

impl MemeResponse {
    pub fn new(meme: Meme, public_url_prefix: &str) -> Self {
        let public_url = meme.public_url(public_url_prefix);
        Self { meme, public_url }
    }
}

/// Message handed from submission to the worker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderJob {
    pub meme_id: Uuid,
}
