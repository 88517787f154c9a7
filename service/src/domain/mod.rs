use image::ImageFormat;
use std::fmt::{Display, Formatter};

pub mod dimension;
pub mod error;
pub mod notification;
pub mod outcome;
pub mod variant;

/// Raw object content as returned by the source bucket.
#[derive(Debug, Clone)]
pub struct ImageBytes {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationReference {
    pub bucket: String,
    pub key: String,
}

impl Display for DestinationReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

pub trait ContentTypeProvider {
    fn get_content_type(&self) -> String;
}

impl ContentTypeProvider for ImageFormat {
    /// A little Pimp My Library pattern
    fn get_content_type(&self) -> String {
        self.to_mime_type().to_owned()
    }
}
