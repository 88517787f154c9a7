use crate::domain::{DestinationReference, ImageBytes};
use crate::repository::{ObjectRepository, StorageError};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, error, instrument};

#[derive(Debug, Clone)]
pub struct BucketRepository {
    client: Client,
}

impl BucketRepository {
    pub fn new(client: Client) -> BucketRepository {
        BucketRepository { client }
    }
}

impl ObjectRepository for BucketRepository {
    #[instrument(skip(self))]
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ImageBytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let err = err.into_service_error();
                if err.is_no_such_key() {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    error!("Could not get {bucket}/{key}");
                    StorageError::Request(DisplayErrorContext(&err).to_string())
                }
            })?;

        let content_type = output.content_type().map(str::to_owned);
        let body = output
            .body
            .collect()
            .await
            .map_err(|err| {
                error!("Could not read body of {bucket}/{key}");
                StorageError::Body(err.to_string())
            })?
            .into_bytes()
            .to_vec();

        debug!("Fetched {} bytes from {bucket}/{key}", body.len());
        Ok(ImageBytes { body, content_type })
    }

    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn store(
        &self,
        destination: &DestinationReference,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| {
                error!("Could not put {destination}");
                StorageError::Request(DisplayErrorContext(&err).to_string())
            })?;
        debug!("Stored {destination}");
        Ok(())
    }
}
