use crate::domain::error::PipelineError;
use crate::domain::error::PipelineError::{EmptySource, Fetch, Upload};
use crate::domain::notification::{S3Notification, SourceReference};
use crate::domain::outcome::{Derivatives, Outcome};
use crate::domain::variant::VARIANTS;
use crate::domain::ContentTypeProvider;
use crate::image_service::{decode_image, render_variant};
use crate::repository::ObjectRepository;
use crate::response_handler::{transform, PipelineResult};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Derives the thumbnail, cover and passport variants of one uploaded image.
pub struct TransformPipeline<R> {
    repository: R,
    destination_bucket: String,
}

impl<R: ObjectRepository + Sync> TransformPipeline<R> {
    pub fn new(repository: R, destination_bucket: impl Into<String>) -> TransformPipeline<R> {
        TransformPipeline {
            repository,
            destination_bucket: destination_bucket.into(),
        }
    }

    #[instrument(skip_all)]
    pub async fn process(&self, notification: &S3Notification) -> Outcome {
        let source = match source_of(notification) {
            Ok(source) => source,
            Err(err) => return Outcome::Completed(transform(Err(err))),
        };

        if !source.is_supported() {
            warn!("ERROR: Unsupported file type ({})", source.extension);
            return Outcome::Skipped {
                extension: source.extension,
            };
        }

        Outcome::Completed(transform(self.derive(&source).await))
    }

    /// Fetch, render every variant, then upload them in order. An upload
    /// failure leaves earlier uploads in place.
    async fn derive(&self, source: &SourceReference) -> PipelineResult {
        let process_timer = Instant::now();

        let image_bytes = self
            .repository
            .fetch(&source.bucket, &source.key)
            .await
            .map_err(|err| Fetch {
                bucket: source.bucket.clone(),
                key: source.key.clone(),
                source: err,
            })?;

        if image_bytes.body.is_empty() {
            return Err(EmptySource {
                bucket: source.bucket.clone(),
                key: source.key.clone(),
            });
        }

        let (image, format) = decode_image(&image_bytes.body, source.format())?;
        let content_type = image_bytes
            .content_type
            .unwrap_or_else(|| format.get_content_type());

        let rendered = VARIANTS
            .iter()
            .map(|variant| render_variant(&image, format, variant).map(|body| (variant, body)))
            .collect::<Result<Vec<_>, PipelineError>>()?;
        debug!("Variants rendered in {} ms", process_timer.elapsed().as_millis());

        let mut destinations = Vec::with_capacity(rendered.len());
        for (variant, body) in rendered {
            let destination = variant.destination(&self.destination_bucket, &source.key);
            if let Err(err) = self.repository.store(&destination, body, &content_type).await {
                error!(
                    "Uploaded {} of {} variants before failing",
                    destinations.len(),
                    VARIANTS.len()
                );
                return Err(Upload {
                    variant: variant.name,
                    destination,
                    source: err,
                });
            }
            destinations.push(destination);
        }

        debug!(
            "Success {} ms: {}/{}",
            process_timer.elapsed().as_millis(),
            source.bucket,
            source.key
        );
        Ok(Derivatives {
            source: source.clone(),
            destinations,
        })
    }
}

fn source_of(notification: &S3Notification) -> Result<SourceReference, PipelineError> {
    let record = notification.first_record()?;
    let source = record.source_reference()?;
    let event_time = record.event_time.unwrap_or_default();
    info!(size = ?record.s3.object.size, "{event_time} - {}/{}", source.bucket, source.key);
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{EMPTY_IMAGE_BUFFER, INTERNAL_SERVER_ERROR};
    use crate::domain::outcome::{InvocationResponse, STATUS_INTERNAL_SERVER_ERROR, STATUS_OK};
    use crate::domain::{DestinationReference, ImageBytes};
    use crate::repository::StorageError;
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::Mutex;

    const SOURCE_BUCKET: &str = "uploads";
    const DEST_BUCKET: &str = "derived";

    #[derive(Debug, Clone)]
    struct StoredObject {
        key: String,
        bucket: String,
        body: Vec<u8>,
        content_type: String,
    }

    /// In-memory repository recording every call.
    #[derive(Default)]
    struct FakeRepository {
        body: Vec<u8>,
        content_type: Option<String>,
        fail_fetch: bool,
        fail_store_at: Option<usize>,
        fetches: Mutex<Vec<(String, String)>>,
        store_attempts: Mutex<Vec<String>>,
        stored: Mutex<Vec<StoredObject>>,
    }

    impl FakeRepository {
        fn serving(body: Vec<u8>, content_type: &str) -> FakeRepository {
            FakeRepository {
                body,
                content_type: Some(content_type.to_string()),
                ..FakeRepository::default()
            }
        }

        fn fetches(&self) -> Vec<(String, String)> {
            self.fetches.lock().unwrap().clone()
        }

        fn stored(&self) -> Vec<StoredObject> {
            self.stored.lock().unwrap().clone()
        }

        fn stored_keys(&self) -> Vec<String> {
            self.stored().into_iter().map(|object| object.key).collect()
        }
    }

    impl ObjectRepository for FakeRepository {
        async fn fetch(&self, bucket: &str, key: &str) -> Result<ImageBytes, StorageError> {
            self.fetches
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string()));
            if self.fail_fetch {
                return Err(StorageError::Request("connection reset".to_string()));
            }
            Ok(ImageBytes {
                body: self.body.clone(),
                content_type: self.content_type.clone(),
            })
        }

        async fn store(
            &self,
            destination: &DestinationReference,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<(), StorageError> {
            let attempt = {
                let mut attempts = self.store_attempts.lock().unwrap();
                attempts.push(destination.key.clone());
                attempts.len()
            };
            if self.fail_store_at == Some(attempt) {
                return Err(StorageError::Request("access denied".to_string()));
            }
            self.stored.lock().unwrap().push(StoredObject {
                key: destination.key.clone(),
                bucket: destination.bucket.clone(),
                body,
                content_type: content_type.to_string(),
            });
            Ok(())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let pixel = Rgba([9, 8, 7, 255]);
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, pixel));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 80, 70])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
        buffer.into_inner()
    }

    fn notification(key: &str) -> S3Notification {
        serde_json::from_value(json!({
            "Records": [{
                "eventTime": "2024-03-01T12:00:00.000Z",
                "s3": {
                    "bucket": { "name": SOURCE_BUCKET },
                    "object": { "key": key, "size": 1 }
                }
            }]
        }))
        .unwrap()
    }

    async fn run(repository: FakeRepository, key: &str) -> (Outcome, FakeRepository) {
        let pipeline = TransformPipeline::new(repository, DEST_BUCKET);
        let outcome = pipeline.process(&notification(key)).await;
        (outcome, pipeline.repository)
    }

    fn completed(outcome: Outcome) -> InvocationResponse {
        match outcome {
            Outcome::Completed(response) => response,
            Outcome::Skipped { extension } => panic!("unexpected skip of {extension}"),
        }
    }

    fn error_of(response: &InvocationResponse) -> String {
        let value: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn uploads_three_variants() {
        let repository = FakeRepository::serving(png(400, 300), "image/png");
        let (outcome, repository) = run(repository, "cat.png").await;
        let response = completed(outcome);

        assert_eq!(response.status_code, STATUS_OK);
        assert_eq!(
            repository.stored_keys(),
            vec!["thumbnails/cat.png", "covers/cat.png", "passports/cat.png"]
        );
        for object in repository.stored() {
            assert_eq!(object.bucket, DEST_BUCKET);
            assert_eq!(object.content_type, "image/png");
        }
        for expected in [
            "uploads/cat.png",
            "derived/thumbnails/cat.png",
            "derived/covers/cat.png",
            "derived/passports/cat.png",
        ] {
            assert!(response.body.contains(expected), "{expected} missing from {}", response.body);
        }
    }

    #[tokio::test]
    async fn variants_have_expected_dimensions() {
        let repository = FakeRepository::serving(png(400, 300), "image/png");
        let (outcome, repository) = run(repository, "cat.png").await;
        completed(outcome);

        let dimensions: Vec<(u32, u32)> = repository
            .stored()
            .iter()
            .map(|object| image::load_from_memory(&object.body).unwrap().dimensions())
            .collect();
        assert_eq!(dimensions, vec![(200, 150), (800, 600), (150, 200)]);
    }

    #[tokio::test]
    async fn jpeg_variants_stay_jpeg() {
        let repository = FakeRepository::serving(jpeg(640, 480), "image/jpeg");
        let (outcome, repository) = run(repository, "photo.JPG").await;
        let response = completed(outcome);

        assert_eq!(response.status_code, STATUS_OK);
        for object in repository.stored() {
            assert_eq!(object.content_type, "image/jpeg");
            assert_eq!(
                image::guess_format(&object.body).unwrap(),
                ImageFormat::Jpeg
            );
        }
    }

    #[tokio::test]
    async fn decodes_encoded_keys() {
        let repository = FakeRepository::serving(png(40, 30), "image/png");
        let (outcome, repository) = run(repository, "albums%2Fsummer+caf%C3%A9+%2B1.png").await;
        completed(outcome);

        let key = "albums/summer café +1.png";
        assert_eq!(
            repository.fetches(),
            vec![(SOURCE_BUCKET.to_string(), key.to_string())]
        );
        assert_eq!(
            repository.stored_keys(),
            vec![
                format!("thumbnails/{key}"),
                format!("covers/{key}"),
                format!("passports/{key}"),
            ]
        );
    }

    #[tokio::test]
    async fn skips_unsupported_extensions() {
        for (key, extension) in [
            ("anim.gif", "gif"),
            ("old.bmp", "bmp"),
            ("notes.txt", "txt"),
            ("nodot", "nodot"),
        ] {
            let repository = FakeRepository::serving(png(4, 4), "image/png");
            let (outcome, repository) = run(repository, key).await;
            assert_eq!(
                outcome,
                Outcome::Skipped {
                    extension: extension.to_string()
                }
            );
            assert!(outcome.into_response().is_none());
            assert!(repository.fetches().is_empty());
            assert!(repository.stored().is_empty());
        }
    }

    #[tokio::test]
    async fn empty_buffer_is_reported() {
        let repository = FakeRepository::serving(Vec::new(), "image/png");
        let (outcome, repository) = run(repository, "cat.png").await;
        let response = completed(outcome);

        assert_eq!(response.status_code, STATUS_INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&response), EMPTY_IMAGE_BUFFER);
        assert!(repository.stored().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_is_generic() {
        let repository = FakeRepository {
            fail_fetch: true,
            ..FakeRepository::default()
        };
        let (outcome, repository) = run(repository, "cat.png").await;
        let response = completed(outcome);

        assert_eq!(response.status_code, STATUS_INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&response), INTERNAL_SERVER_ERROR);
        assert_eq!(repository.fetches().len(), 1);
        assert!(repository.store_attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_source_uploads_nothing() {
        let repository = FakeRepository::serving(b"not really a png".to_vec(), "image/png");
        let (outcome, repository) = run(repository, "cat.png").await;
        let response = completed(outcome);

        assert_eq!(response.status_code, STATUS_INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&response), INTERNAL_SERVER_ERROR);
        assert!(repository.store_attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn passport_upload_failure_keeps_earlier_uploads() {
        let repository = FakeRepository {
            fail_store_at: Some(3),
            ..FakeRepository::serving(png(400, 300), "image/png")
        };
        let (outcome, repository) = run(repository, "cat.png").await;
        let response = completed(outcome);

        assert_eq!(response.status_code, STATUS_INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&response), INTERNAL_SERVER_ERROR);
        assert_eq!(
            repository.stored_keys(),
            vec!["thumbnails/cat.png", "covers/cat.png"]
        );
        assert_eq!(
            *repository.store_attempts.lock().unwrap(),
            vec!["thumbnails/cat.png", "covers/cat.png", "passports/cat.png"]
        );
    }

    #[tokio::test]
    async fn missing_content_type_follows_format() {
        let repository = FakeRepository {
            body: png(20, 10),
            ..FakeRepository::default()
        };
        let (outcome, repository) = run(repository, "cat.jpeg").await;
        completed(outcome);

        for object in repository.stored() {
            assert_eq!(object.content_type, "image/png");
        }
    }

    #[tokio::test]
    async fn empty_notification_is_an_error() {
        let repository = FakeRepository::serving(png(4, 4), "image/png");
        let pipeline = TransformPipeline::new(repository, DEST_BUCKET);
        let notification: S3Notification =
            serde_json::from_value(json!({ "Records": [] })).unwrap();

        let response = completed(pipeline.process(&notification).await);
        assert_eq!(response.status_code, STATUS_INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&response), INTERNAL_SERVER_ERROR);
        assert!(pipeline.repository.fetches().is_empty());
    }

    async fn process_raw(
        repository: FakeRepository,
        event: serde_json::Value,
    ) -> (Outcome, FakeRepository) {
        let pipeline = TransformPipeline::new(repository, DEST_BUCKET);
        let notification: S3Notification = serde_json::from_value(event).unwrap();
        let outcome = pipeline.process(&notification).await;
        (outcome, pipeline.repository)
    }

    #[tokio::test]
    async fn oversized_target_uploads_nothing() {
        let repository = FakeRepository::serving(png(1, 60_000), "image/png");
        let (outcome, repository) = run(repository, "strip.png").await;
        let response = completed(outcome);

        assert_eq!(response.status_code, STATUS_INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&response), INTERNAL_SERVER_ERROR);
        assert_eq!(repository.fetches().len(), 1);
        assert!(repository.store_attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn later_records_and_event_time_do_not_matter() {
        let event = json!({
            "Records": [
                {
                    "eventTime": "yesterday",
                    "s3": {
                        "bucket": { "name": SOURCE_BUCKET },
                        "object": { "key": "cat.png" }
                    }
                },
                { "eventTime": "2024-03-01T12:00:01.000Z" }
            ]
        });
        let repository = FakeRepository::serving(png(40, 30), "image/png");
        let (outcome, repository) = process_raw(repository, event).await;

        assert_eq!(completed(outcome).status_code, STATUS_OK);
        assert_eq!(
            repository.fetches(),
            vec![(SOURCE_BUCKET.to_string(), "cat.png".to_string())]
        );
        assert_eq!(repository.stored().len(), 3);
    }

    #[tokio::test]
    async fn malformed_first_record_is_an_error() {
        for event in [
            json!({ "Records": [{ "s3": { "bucket": { "name": SOURCE_BUCKET } } }] }),
            json!({ "Records": [{ "s3": { "object": { "key": 7 } } }] }),
            json!({ "Records": "cat.png" }),
            json!({
                "Records": [{
                    "s3": {
                        "bucket": { "name": SOURCE_BUCKET },
                        "object": { "key": "100%.png" }
                    }
                }]
            }),
        ] {
            let repository = FakeRepository::serving(png(4, 4), "image/png");
            let (outcome, repository) = process_raw(repository, event).await;
            let response = completed(outcome);

            assert_eq!(response.status_code, STATUS_INTERNAL_SERVER_ERROR);
            assert_eq!(error_of(&response), INTERNAL_SERVER_ERROR);
            assert!(repository.fetches().is_empty());
        }
    }
}
