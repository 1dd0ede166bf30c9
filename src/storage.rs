use crate::{
    domain::FileStorage,
    errors::StorageError,
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{
    primitives::ByteStream,
    types::ObjectCannedAcl,
    Client as S3Client,
};
use tracing;

#[derive(Debug, Clone)]
pub struct S3FileStorage {
    client: S3Client,
    bucket_name: String,
}

impl S3FileStorage {
    pub fn new(client: S3Client, bucket_name: String) -> Self {
        Self { client, bucket_name }
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    /// Uploads data to S3 using PutObject. Sets Content-Type.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError> {
        let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, "S3: Uploading file");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to upload object with key '{}'", key))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Upload successful");
        Ok(())
    }

    /// Downloads the whole object into memory using GetObject.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Downloading file");

        let output = self.client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|sdk_err| {
                if sdk_err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    tracing::warn!(s3_key = %key, bucket = %self.bucket_name, "S3: NoSuchKey error downloading file");
                    return StorageError::NotFound(key.to_string());
                }
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %sdk_err, "S3: Error downloading file");
                StorageError::BackendError(anyhow::Error::new(sdk_err).context(format!("S3: Failed to download object with key '{}'", key)))
            })?;

        let data = output
            .body
            .collect()
            .await
            .context(format!("S3: Failed to read body of object with key '{}'", key))?
            .into_bytes();

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, bytes = data.len(), "S3: Download successful");
        Ok(data.to_vec())
    }

    /// Grants anonymous read access with the `public-read` canned ACL.
    async fn set_public_read(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .put_object_acl()
            .bucket(&self.bucket_name)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .context(format!("S3: Failed to set public-read ACL on object with key '{}'", key))?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Object is public-read");
        Ok(())
    }
}
