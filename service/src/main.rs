use crate::client::bucket_client::bucket_client;
use crate::config::Config;
use crate::handler::handler;
use crate::logging::logger_setup;
use crate::repository::bucket_repository::BucketRepository;
use crate::service::TransformPipeline;
use anyhow::anyhow;
use lambda_runtime::{run, service_fn};
use tracing::info;

mod client;
mod config;
mod domain;
mod handler;
mod image_service;
mod logging;
mod repository;
mod response_handler;
mod service;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logger_setup(config.log_format)?;

    info!(
        "Deriving thumbnails, covers and passports into {}",
        config.destination_bucket
    );
    let repository = BucketRepository::new(bucket_client().await);
    let pipeline = TransformPipeline::new(repository, config.destination_bucket);

    run(service_fn(|event| handler(event, &pipeline)))
        .await
        .map_err(|err| anyhow!(err))
}
