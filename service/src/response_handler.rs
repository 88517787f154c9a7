use crate::domain::error::PipelineError;
use crate::domain::outcome::{Derivatives, InvocationResponse};
use tracing::{error, info, instrument};

pub type PipelineResult = Result<Derivatives, PipelineError>;

/// Turn a finished derivation into what the caller sees. Failure detail is
/// logged here and nowhere else leaves the process.
#[instrument(skip_all)]
pub fn transform(result: PipelineResult) -> InvocationResponse {
    match result {
        Ok(derivatives) => {
            let message = derivatives.to_string();
            info!("{message}");
            InvocationResponse::ok(message)
        }
        Err(err) => {
            error!(detail = ?err, "ERROR: {err}");
            InvocationResponse::error(err.public_message())
        }
    }
}
