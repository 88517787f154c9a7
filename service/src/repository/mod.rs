use crate::domain::{DestinationReference, ImageBytes};
use std::future::Future;
use thiserror::Error;

pub(crate) mod bucket_repository;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("storage request failed: {0}")]
    Request(String),

    #[error("object body could not be read: {0}")]
    Body(String),
}

/// Byte-level access to object storage.
pub trait ObjectRepository {
    fn fetch(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<ImageBytes, StorageError>> + Send;

    fn store(
        &self,
        destination: &DestinationReference,
        body: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
