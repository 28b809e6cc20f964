// Concurrent dispatches of the same missing variant
//
// Only one generator run per cache file; every other request waits for it
// and then serves the finished file.

use super::test_harness::{read, DeliveryTestHarness, RecordingGenerator};
use http::StatusCode;
use kagami::resource::StaticResource;
use kagami::UrlOptions;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_concurrent_requests_generate_once() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let generator = RecordingGenerator::slow(Duration::from_millis(200));
    let dispatcher = Arc::new(harness.dispatcher(generator.clone()));

    let url = harness
        .url_builder()
        .build_simple(&StaticResource::new("1", "cat.jpg"), None)
        .unwrap();
    let request = harness.request(&url);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let dispatcher = Arc::clone(&dispatcher);
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            dispatcher.dispatch(&request).await
        }));
    }

    let mut generated = 0;
    for handle in handles {
        let delivery = handle.await.unwrap().unwrap();
        assert_eq!(delivery.status, StatusCode::OK);
        assert_eq!(read(&delivery.cache_path), "original:cat.jpg");
        if delivery.generated {
            generated += 1;
        }
    }

    assert_eq!(generated, 1);
    assert_eq!(generator.count(), 1);
}

#[tokio::test]
async fn test_distinct_variants_generate_independently() {
    let harness = DeliveryTestHarness::new();
    harness.add_original("cat.jpg");
    let generator = RecordingGenerator::slow(Duration::from_millis(100));
    let dispatcher = Arc::new(harness.dispatcher(generator.clone()));
    let builder = harness.url_builder();
    let resource = StaticResource::new("1", "cat.jpg");

    let plain = builder.build_simple(&resource, None).unwrap();
    let retina = builder
        .build(
            &resource,
            None,
            &UrlOptions {
                retina: true,
                ..Default::default()
            },
        )
        .unwrap();

    let mut handles = Vec::new();
    for url in [&plain, &retina].repeat(8) {
        let dispatcher = Arc::clone(&dispatcher);
        let request = harness.request(url);
        handles.push(tokio::spawn(async move {
            dispatcher.dispatch(&request).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().status, StatusCode::OK);
    }

    assert_eq!(generator.count(), 2);
    assert!(harness.cache_file("thumb/cat.jpg").exists());
    assert!(harness.cache_file("thumb_retina/cat.jpg").exists());
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_fallback_run() {
    let harness = DeliveryTestHarness::new();
    let generator = RecordingGenerator::slow(Duration::from_millis(100));
    let dispatcher = Arc::new(harness.dispatcher(generator.clone()));

    let mut handles = Vec::new();
    for id in 0..10 {
        let dispatcher = Arc::clone(&dispatcher);
        let request = kagami::DispatchRequest::new("thumb", id.to_string(), "cat.jpg");
        handles.push(tokio::spawn(async move {
            dispatcher.dispatch(&request).await
        }));
    }
    for handle in handles {
        let delivery = handle.await.unwrap().unwrap();
        assert_eq!(delivery.status, StatusCode::PRECONDITION_FAILED);
    }
    assert_eq!(generator.count(), 1);
}
