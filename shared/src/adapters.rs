use crate::{
    core::BlobStore,
    error::{BoxError, ProcessorError},
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::{primitives::ByteStream, Client};

#[derive(Debug, Clone)]
pub struct S3BlobStore {
    s3_client: Client,
}

impl S3BlobStore {
    pub fn new(s3_client: Client) -> Self {
        Self { s3_client }
    }

    /// Builds a store from the ambient AWS environment (region, credential
    /// chain). Credentials are resolved once here so a broken environment
    /// fails at cold start instead of on the first write.
    pub async fn from_env() -> Result<Self, ProcessorError> {
        let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        check_ambient_config(&aws_config).await?;

        Ok(Self::new(Client::new(&aws_config)))
    }
}

async fn check_ambient_config(aws_config: &SdkConfig) -> Result<(), ProcessorError> {
    if aws_config.region().is_none() {
        return Err(ProcessorError::config_load("no AWS region configured"));
    }

    let provider = aws_config
        .credentials_provider()
        .ok_or_else(|| ProcessorError::config_load("no AWS credentials provider configured"))?;

    provider
        .provide_credentials()
        .await
        .map(|_| ())
        .map_err(ProcessorError::config_load)
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[tracing::instrument("put_object", skip(self, body), fields(
        aws.s3.bucket = %container,
        aws.s3.key = %key,
    ))]
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<(), BoxError> {
        self.s3_client
            .put_object()
            .bucket(container)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|output| {
                tracing::debug!("Stored object with ETag {:?}", output.e_tag());
            })
            .map_err(BoxError::from)
    }
}
