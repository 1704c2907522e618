use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::{BucketError, BucketStore, ContainerState};

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "landing".to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

#[derive(Clone)]
pub struct S3BucketStore {
    client: Client,
    bucket: String,
    region: String,
}

impl S3BucketStore {
    pub async fn new(config: S3Config) -> Result<Self, BucketError> {
        if config.bucket.is_empty() {
            return Err(BucketError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket,
            region: config.region,
        })
    }

    async fn create_bucket(&self) -> Result<ContainerState, BucketError> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        // us-east-1 rejects an explicit location constraint.
        if self.region != DEFAULT_REGION {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        match request.send().await {
            Ok(_) => Ok(ContainerState::Created),
            Err(SdkError::ServiceError(service_err))
                if service_err.err().is_bucket_already_owned_by_you() =>
            {
                Ok(ContainerState::Existing)
            }
            Err(err) => Err(BucketError::from_sdk(err)),
        }
    }
}

#[async_trait]
impl BucketStore for S3BucketStore {
    fn container(&self) -> &str {
        &self.bucket
    }

    async fn ensure_container(&self) -> Result<ContainerState, BucketError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(ContainerState::Existing),
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_not_found() => {
                self.create_bucket().await
            }
            Err(err) => Err(BucketError::from_sdk(err)),
        }
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(BucketError::from_sdk)?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err {
                SdkError::ServiceError(service_err) if service_err.err().is_no_such_key() => {
                    BucketError::NotFound(key.to_string())
                }
                other => BucketError::from_sdk(other),
            })?;

        let data = output.body.collect().await.map_err(BucketError::from_sdk)?;
        Ok(data.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(BucketError::from_sdk)?;
        Ok(())
    }
}
