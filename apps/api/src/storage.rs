use anyhow::anyhow;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use bytes::Bytes;

use crate::config::Config;
use crate::errors::AppError;

/// Document storage collaborator. The pipeline fetches resume bytes by opaque
/// key and checks existence; it never manages object lifecycle.
#[derive(Clone)]
pub struct DocumentStore {
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl DocumentStore {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { s3, bucket }
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.s3
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .is_ok()
    }

    pub async fn fetch(&self, key: &str) -> Result<Bytes, AppError> {
        let out = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("get_object {key}: {e}")))?;
        let data = out
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("read body {key}: {e}")))?;
        Ok(data.into_bytes())
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(config: &Config) -> anyhow::Result<aws_sdk_s3::Client> {
    if config.aws_access_key_id.is_empty() {
        return Err(anyhow!("AWS_ACCESS_KEY_ID is empty"));
    }
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "pipeline-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    Ok(aws_sdk_s3::Client::new(&s3_config))
}
