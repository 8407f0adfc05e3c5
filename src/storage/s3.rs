use crate::storage::traits::{validate_key, ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Region, primitives::ByteStream, Client};
use tracing::{debug, info, instrument};

/// Connection settings for an S3-compatible endpoint
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    /// Custom endpoint, e.g. a local MinIO
    pub endpoint: Option<String>,
    /// Region override; the default provider chain is used otherwise
    pub region: Option<String>,
    pub path_style: bool,
}

/// Amazon S3 (or compatible) object store
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Builds a client from the ambient AWS configuration plus `settings`
    pub async fn new(settings: S3Settings) -> Self {
        debug!("Initializing S3 store with settings: {:?}", settings);

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(settings.path_style);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            "S3 store initialized (endpoint: {})",
            settings.endpoint.as_deref().unwrap_or("default")
        );

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Wraps an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self, body))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        validate_key(key)?;
        debug!("Uploading {} bytes to s3://{}/{}", body.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;

        info!("Successfully uploaded to s3://{}/{}", bucket, key);
        Ok(())
    }
}
