// Dispatch outcomes against a real temporary media tree

use super::test_harness::{read, DeliveryTestHarness, RecordingGenerator};
use async_trait::async_trait;
use http::StatusCode;
use kagami::generator::{GenerationJob, GeneratorError, VariantGenerator};
use kagami::resource::{FocalPoint, StaticResource};
use kagami::{DeliveryError, DispatchRequest, FileServer, FormatKey, UrlOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Writes half a file, then fails
struct BrokenGenerator;

#[async_trait]
impl VariantGenerator for BrokenGenerator {
    async fn generate(&self, job: &GenerationJob) -> Result<(), GeneratorError> {
        tokio::fs::write(&job.cache_path, b"partial").await?;
        Err(GeneratorError::Failed {
            code: Some(1),
            stderr: "corrupt input".to_string(),
        })
    }
}

/// Never finishes in time
struct StuckGenerator;

#[async_trait]
impl VariantGenerator for StuckGenerator {
    async fn generate(&self, job: &GenerationJob) -> Result<(), GeneratorError> {
        tokio::fs::write(&job.cache_path, b"partial").await?;
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// Writes the output in two steps with a pause in between
struct TwoStepGenerator;

#[async_trait]
impl VariantGenerator for TwoStepGenerator {
    async fn generate(&self, job: &GenerationJob) -> Result<(), GeneratorError> {
        tokio::fs::write(&job.cache_path, b"partial").await?;
        tokio::time::sleep(Duration::from_millis(300)).await;
        tokio::fs::write(&job.cache_path, b"complete-image").await?;
        Ok(())
    }
}

/// Records what it was asked to serve
struct PathServer;

#[async_trait]
impl FileServer for PathServer {
    type Response = (PathBuf, StatusCode);

    async fn serve(
        &self,
        path: &Path,
        status: StatusCode,
    ) -> Result<Self::Response, DeliveryError> {
        Ok((path.to_path_buf(), status))
    }
}

#[tokio::test]
async fn test_missing_query_serves_412_of_default_format() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let generator = RecordingGenerator::new();
    let dispatcher = harness.dispatcher(generator.clone());

    let request = DispatchRequest::new("preview-retina", "1", "cat.jpg");
    let delivery = assert_ok!(dispatcher.dispatch(&request).await);

    assert_eq!(delivery.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(delivery.cache_path, harness.cache_file("thumb/412.jpg"));
    assert_eq!(read(&delivery.cache_path), "fallback-412");

    let jobs = generator.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].original_path, harness.fallback(412));
    assert!(jobs[0].resource_id.is_none());
    assert_eq!(jobs[0].settings.arguments.format, "thumb");
    assert!(!jobs[0].settings.arguments.retina);
}

#[tokio::test]
async fn test_malformed_requests_are_412() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let dispatcher = harness.dispatcher(RecordingGenerator::new());

    let requests = [
        DispatchRequest::new("poster", "1", "cat.jpg"),
        DispatchRequest::new("full", "", "cat.jpg"),
        DispatchRequest::new("full", "1", "../../etc/passwd"),
        DispatchRequest::new("thumb", "1", "cat.jpg")
            .with_query("sig", "00")
            .with_query("ts", "yesterday")
            .with_query("sec", "600")
            .with_query("client", "web"),
    ];
    for request in requests {
        let delivery = assert_ok!(dispatcher.resolve(&request).await);
        assert_eq!(
            delivery.status,
            StatusCode::PRECONDITION_FAILED,
            "{:?}",
            request
        );
        assert_eq!(delivery.key, FormatKey::new("thumb"));
    }
}

#[tokio::test]
async fn test_missing_original_serves_404_of_requested_format() {
    let harness = DeliveryTestHarness::new();
    let dispatcher = harness.dispatcher(RecordingGenerator::new());
    let builder = harness.url_builder();
    let ghost = StaticResource::new("5", "gone/ghost.jpg");

    let url = assert_ok!(builder.build_simple(&ghost, Some("thumb")));
    let delivery = assert_ok!(dispatcher.dispatch(&harness.request(&url)).await);
    assert_eq!(delivery.status, StatusCode::NOT_FOUND);
    assert_eq!(delivery.cache_path, harness.cache_file("thumb/404.jpg"));
    assert_eq!(read(&delivery.cache_path), "fallback-404");

    let url = assert_ok!(builder.build(
        &ghost,
        None,
        &UrlOptions {
            retina: true,
            ..Default::default()
        },
    ));
    let delivery = assert_ok!(dispatcher.dispatch(&harness.request(&url)).await);
    assert_eq!(delivery.status, StatusCode::NOT_FOUND);
    assert_eq!(
        delivery.cache_path,
        harness.cache_file("thumb_retina/404.jpg")
    );
}

#[tokio::test]
async fn test_fallback_variant_is_generated_once() {
    let harness = DeliveryTestHarness::new();
    let generator = RecordingGenerator::new();
    let dispatcher = harness.dispatcher(generator.clone());

    for id in ["1", "2", "3"] {
        let request = DispatchRequest::new("thumb", id, "cat.jpg");
        let delivery = assert_ok!(dispatcher.dispatch(&request).await);
        assert_eq!(delivery.status, StatusCode::PRECONDITION_FAILED);
    }
    assert_eq!(generator.count(), 1);
}

#[tokio::test]
async fn test_missing_fallback_is_an_error() {
    let harness = DeliveryTestHarness::new();
    std::fs::remove_file(harness.fallback(412)).unwrap();
    let dispatcher = harness.dispatcher(RecordingGenerator::new());

    let request = DispatchRequest::new("thumb", "1", "cat.jpg");
    let err = assert_err!(dispatcher.dispatch(&request).await);
    assert!(matches!(
        err,
        DeliveryError::FallbackMissing { status: 412, .. }
    ));
    assert_eq!(err.to_http_status(), 500);
}

#[tokio::test]
async fn test_failed_generation_leaves_no_partial_file() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let dispatcher = harness.dispatcher(Arc::new(BrokenGenerator));

    let request = DispatchRequest::new("full", "1", "cat.jpg");
    let err = assert_err!(dispatcher.dispatch(&request).await);
    assert!(matches!(err, DeliveryError::GenerationFailed(_)));
    assert!(!harness.cache_file("full/cat.png").exists());
}

#[tokio::test]
async fn test_generation_timeout_leaves_no_partial_file() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let dispatcher = harness
        .dispatcher(Arc::new(StuckGenerator))
        .with_generation_timeout(Duration::from_millis(100));

    let request = DispatchRequest::new("full", "1", "cat.jpg");
    let err = assert_err!(dispatcher.dispatch(&request).await);
    assert!(matches!(err, DeliveryError::GenerationTimeout { .. }));
    assert_eq!(err.to_http_status(), 504);
    assert!(!harness.cache_file("full/cat.png").exists());
}

#[tokio::test]
async fn test_serve_hands_cache_file_to_server() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("docs/cat.jpg");
    let dispatcher = harness.dispatcher(RecordingGenerator::new());

    let request = DispatchRequest::new("full", "1", "docs/cat.jpg");
    let (path, status) = assert_ok!(dispatcher.serve(&request, &PathServer).await);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(path, harness.cache_file("full/docs/cat.png"));
    assert!(path.exists());
}

#[tokio::test]
async fn test_prewarm_then_dispatch_hits_cache() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let generator = RecordingGenerator::new();
    let dispatcher = harness.dispatcher(generator.clone());

    let mut resource = StaticResource::new("1", "cat.jpg");
    resource.focal_point = Some(FocalPoint { x: 0.25, y: 0.75 });

    let delivery = assert_ok!(dispatcher.prewarm(&resource, &FormatKey::new("thumb")).await);
    assert!(delivery.generated);
    assert_eq!(
        generator.jobs()[0].settings.focal,
        Some(FocalPoint { x: 0.25, y: 0.75 })
    );

    let url = assert_ok!(harness.url_builder().build_simple(&resource, None));
    let delivery = assert_ok!(dispatcher.dispatch(&harness.request(&url)).await);
    assert_eq!(delivery.status, StatusCode::OK);
    assert!(!delivery.generated);
    assert_eq!(generator.count(), 1);

    let ghost = StaticResource::new("2", "ghost.jpg");
    let err = assert_err!(dispatcher.prewarm(&ghost, &FormatKey::new("thumb")).await);
    assert!(matches!(err, DeliveryError::AssetNotFound(_)));
}

#[tokio::test]
async fn test_invalidate_removes_every_variant() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("a/cat.jpg");
    harness.add_original("a/dog.jpg");
    let dispatcher = harness.dispatcher(RecordingGenerator::new());

    for format in ["full", "full-watermarked", "preview-blurred-retina"] {
        let request = DispatchRequest::new(format, "1", "a/cat.jpg");
        // preview is restricted; an unsigned request gets the 412 fallback instead
        assert_ok!(dispatcher.dispatch(&request).await);
    }
    assert_ok!(
        dispatcher
            .dispatch(&DispatchRequest::new("full", "2", "a/dog.jpg"))
            .await
    );

    assert!(harness.cache_file("full/a/cat.png").exists());
    assert!(harness.cache_file("full_watermarked/a/cat.png").exists());

    let removed = assert_ok!(dispatcher.invalidate("a/cat.jpg", Some("full")).await);
    assert_eq!(removed, 2);
    assert!(!harness.cache_file("full/a/cat.png").exists());
    assert!(!harness.cache_file("full_watermarked/a/cat.png").exists());
    assert!(harness.cache_file("full/a/dog.png").exists());
    assert!(harness.cache_file("thumb/412.jpg").exists());

    let removed = assert_ok!(dispatcher.invalidate("a/cat.jpg", None).await);
    assert_eq!(removed, 0);

    let err = assert_err!(dispatcher.invalidate("a/cat.jpg", Some("poster")).await);
    assert!(matches!(err, DeliveryError::UnknownFormat(_)));
}

#[tokio::test]
async fn test_request_during_generation_never_sees_partial_output() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let dispatcher = Arc::new(harness.dispatcher(Arc::new(TwoStepGenerator)));
    let request = DispatchRequest::new("full", "1", "cat.jpg");

    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let request = request.clone();
        tokio::spawn(async move { dispatcher.dispatch(&request).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // the cache path must not exist while the generator is still writing
    assert!(!harness.cache_file("full/cat.png").exists());

    let second = assert_ok!(dispatcher.dispatch(&request).await);
    assert!(!second.generated);
    assert_eq!(read(&second.cache_path), "complete-image");

    let first = assert_ok!(first.await.unwrap());
    assert!(first.generated);
    assert_eq!(read(&first.cache_path), "complete-image");

    let names: Vec<String> = std::fs::read_dir(harness.cache_file("full"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["cat.png"]);
}
