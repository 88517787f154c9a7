use crate::domain::error::PipelineError;
use crate::domain::error::PipelineError::MalformedNotification;
use image::ImageFormat;
use serde::Deserialize;

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Records stay raw until picked: only the first one has to make sense.
#[derive(Debug, Deserialize)]
pub struct S3Notification {
    #[serde(rename = "Records", default)]
    pub records: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct S3Record {
    #[serde(rename = "eventTime", default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub s3: S3Entity,
}

#[derive(Debug, Default, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: S3Bucket,
    #[serde(default)]
    pub object: S3Object,
}

#[derive(Debug, Default, Deserialize)]
pub struct S3Bucket {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct S3Object {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl S3Notification {
    /// Only the first record is ever processed.
    pub fn first_record(&self) -> Result<S3Record, PipelineError> {
        let first = self
            .records
            .as_array()
            .and_then(|records| records.first())
            .ok_or_else(|| MalformedNotification("no records".to_string()))?;
        S3Record::deserialize(first)
            .map_err(|err| MalformedNotification(format!("unreadable first record: {err}")))
    }
}

impl S3Record {
    pub fn source_reference(&self) -> Result<SourceReference, PipelineError> {
        let bucket = self
            .s3
            .bucket
            .name
            .as_deref()
            .ok_or_else(|| MalformedNotification("missing bucket name".to_string()))?;
        let raw_key = self
            .s3
            .object
            .key
            .as_deref()
            .ok_or_else(|| MalformedNotification("missing object key".to_string()))?;
        Ok(SourceReference::new(bucket, decode_key(raw_key)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub bucket: String,
    pub key: String,
    pub extension: String,
}

impl SourceReference {
    pub fn new(bucket: &str, key: String) -> SourceReference {
        let extension = extension_of(&key);
        SourceReference {
            bucket: bucket.to_string(),
            key,
            extension,
        }
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_EXTENSIONS.contains(&self.extension.as_str())
    }

    /// Format implied by the extension, used when the bytes are inconclusive.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_extension(&self.extension)
    }
}

/// Object keys arrive form-encoded: `+` is a space, the rest is percent-encoded.
pub fn decode_key(raw: &str) -> Result<String, PipelineError> {
    if let Some(position) = invalid_escape(raw) {
        return Err(MalformedNotification(format!(
            "object key {raw} has a malformed escape at byte {position}"
        )));
    }
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| MalformedNotification(format!("object key {raw} is not valid UTF-8: {err}")))
}

/// Position of the first `%` not followed by two hex digits.
fn invalid_escape(raw: &str) -> Option<usize> {
    let bytes = raw.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'%')
        .map(|(position, _)| position)
        .find(|position| {
            !matches!(
                bytes.get(position + 1..position + 3),
                Some([high, low]) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit()
            )
        })
}

/// Everything after the last `.`, lowercased. A key without a dot is its own extension.
pub fn extension_of(key: &str) -> String {
    key.rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or(key)
        .to_lowercase()
}
