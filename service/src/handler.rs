use crate::domain::notification::S3Notification;
use crate::domain::outcome::InvocationResponse;
use crate::repository::ObjectRepository;
use crate::service::TransformPipeline;
use lambda_runtime::{Error, LambdaEvent};
use tracing::instrument;

/// Entry point for one Lambda invocation. Never fails: every pipeline
/// error is already folded into the response.
#[instrument(skip(event, pipeline), fields(request_id = %event.context.request_id))]
pub async fn handler<R: ObjectRepository + Sync>(
    event: LambdaEvent<S3Notification>,
    pipeline: &TransformPipeline<R>,
) -> Result<Option<InvocationResponse>, Error> {
    let (notification, _context) = event.into_parts();
    Ok(pipeline.process(&notification).await.into_response())
}
