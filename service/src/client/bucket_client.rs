use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use tracing::info;

/// S3 client from the ambient AWS configuration (region, credentials).
pub async fn bucket_client() -> Client {
    info!("Initializing bucket client.");
    let shared_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    Client::new(&shared_config)
}
