use crate::domain::DestinationReference;
use crate::repository::StorageError;
use thiserror::Error;

pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
pub const EMPTY_IMAGE_BUFFER: &str = "Empty image buffer";

/// Everything that can stop a derivation. Callers only ever see
/// [`PipelineError::public_message`]; the rest is for the logs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed notification: {0}")]
    MalformedNotification(String),

    #[error("could not fetch {bucket}/{key}: {source}")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("empty image buffer for {bucket}/{key}")]
    EmptySource { bucket: String, key: String },

    #[error("image could not be decoded: {0}")]
    Decode(String),

    #[error("{variant} target {width}x{height} exceeds the output limits")]
    TooLarge {
        variant: &'static str,
        width: u32,
        height: u32,
    },

    #[error("{variant} could not be resized: {source}")]
    Resize {
        variant: &'static str,
        #[source]
        source: fast_image_resize::ResizeError,
    },

    #[error("{variant} could not be encoded: {source}")]
    Encode {
        variant: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("{variant} could not be uploaded to {destination}: {source}")]
    Upload {
        variant: &'static str,
        destination: DestinationReference,
        #[source]
        source: StorageError,
    },
}

impl PipelineError {
    pub fn public_message(&self) -> &'static str {
        match self {
            PipelineError::EmptySource { .. } => EMPTY_IMAGE_BUFFER,
            _ => INTERNAL_SERVER_ERROR,
        }
    }
}
