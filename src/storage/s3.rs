//! S3 artifact store

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::error::display::DisplayErrorContext;

use crate::error::{CbrError, CbrResult};

use super::ArtifactStore;

/// Stores artifacts as objects under a bucket and key prefix
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    /// Connect using the default AWS credential chain
    pub async fn connect(bucket: String, prefix: String) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket,
            prefix: prefix.trim_start_matches('/').to_string(),
        }
    }

    fn key(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.prefix, path)
        }
    }
}

#[async_trait]
impl ArtifactStore for S3Store {
    fn object_path(&self, filename: &str) -> String {
        // The bucket and prefix are applied at save/load time
        filename.to_string()
    }

    async fn save(&self, data: &[u8], path: &str) -> CbrResult<()> {
        let key = self.key(path);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| {
                CbrError::Storage(format!(
                    "Failed to upload s3://{}/{}: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }

    async fn load(&self, path: &str) -> CbrResult<Vec<u8>> {
        let key = self.key(path);

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                CbrError::Storage(format!(
                    "Failed to download s3://{}/{}: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let bytes = output.body.collect().await.map_err(|e| {
            CbrError::Storage(format!(
                "Failed to read s3://{}/{}: {}",
                self.bucket, key, e
            ))
        })?;

        Ok(bytes.into_bytes().to_vec())
    }
}
