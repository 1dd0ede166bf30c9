use crate::render::RenderLayout;
use std::{env, net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

/// Uploaded templates larger than this are rejected.
pub const MAX_TEMPLATE_BYTES: usize = 5 * 1024 * 1024;

/// Upper bound on `GET /memes`.
pub const MEMES_LIST_LIMIT: usize = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
    #[error(transparent)]
    DotEnvError(#[from] dotenvy::Error),
}

#[derive(Clone, Debug)] // Clone needed if passed around, Debug for logging
pub struct Config {
    pub bind_address: SocketAddr,
    pub meme_bucket_name: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub templates_table: String,
    pub memes_table: String,
    /// Published memes are served from `<prefix>/<meme_id>.png`.
    pub public_url_prefix: String,
    pub render_layout: RenderLayout,
    pub render_retry_max_elapsed: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        let bind_address_str = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let meme_bucket_name = env::var("MEME_BUCKET_NAME")
            .map_err(|_| ConfigError::MissingVar("MEME_BUCKET_NAME".into()))?;

        let aws_region = env::var("AWS_DEFAULT_REGION")
            .unwrap_or_else(|_| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = env::var("AWS_ENDPOINT_URL").ok();

        let templates_table = env::var("TEMPLATES_TABLE").unwrap_or_else(|_| "templates".to_string());
        let memes_table = env::var("MEMES_TABLE").unwrap_or_else(|_| "memes".to_string());

        let public_url_prefix = env::var("MEME_PUBLIC_URL_PREFIX")
            .unwrap_or_else(|_| default_public_url_prefix(&meme_bucket_name, &aws_region));

        let defaults = RenderLayout::default();
        let render_layout = RenderLayout {
            top_margin: parse_var("CAPTION_TOP_MARGIN", env::var("CAPTION_TOP_MARGIN").ok(), defaults.top_margin)?,
            bottom_band: parse_var("CAPTION_BOTTOM_BAND", env::var("CAPTION_BOTTOM_BAND").ok(), defaults.bottom_band)?,
            ..defaults
        };

        let retry_secs: u64 = parse_var(
            "RENDER_RETRY_MAX_ELAPSED_SECS",
            env::var("RENDER_RETRY_MAX_ELAPSED_SECS").ok(),
            300,
        )?;

        Ok(Config {
            bind_address,
            meme_bucket_name,
            aws_region,
            localstack_endpoint,
            templates_table,
            memes_table,
            public_url_prefix,
            render_layout,
            render_retry_max_elapsed: Duration::from_secs(retry_secs),
        })
    }
}

fn default_public_url_prefix(bucket: &str, region: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com", bucket, region)
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidVar(name.into(), e.to_string())),
    }
}
