use crate::domain::notification::SourceReference;
use crate::domain::DestinationReference;
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Result of one invocation as handed back to the Lambda runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn ok(message: String) -> InvocationResponse {
        InvocationResponse {
            status_code: STATUS_OK,
            body: message,
        }
    }

    pub fn error(message: &str) -> InvocationResponse {
        InvocationResponse {
            status_code: STATUS_INTERNAL_SERVER_ERROR,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(InvocationResponse),
    /// The object's extension is not one we derive variants for.
    Skipped { extension: String },
}

impl Outcome {
    /// Skipped invocations return nothing to the runtime.
    pub fn into_response(self) -> Option<InvocationResponse> {
        match self {
            Outcome::Completed(response) => Some(response),
            Outcome::Skipped { .. } => None,
        }
    }
}

/// Where a source image's variants ended up.
#[derive(Debug, Clone)]
pub struct Derivatives {
    pub source: SourceReference,
    pub destinations: Vec<DestinationReference>,
}

impl Display for Derivatives {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Successfully resized {}/{} and uploaded thumbnails, covers, and passport-size images to ",
            self.source.bucket, self.source.key
        )?;
        let last = self.destinations.len().saturating_sub(1);
        for (index, destination) in self.destinations.iter().enumerate() {
            match index {
                0 => write!(f, "{destination}")?,
                i if i == last => write!(f, ", and {destination}")?,
                _ => write!(f, ", {destination}")?,
            }
        }
        Ok(())
    }
}
