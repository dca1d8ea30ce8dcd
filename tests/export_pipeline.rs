//! End-to-end: requests through the HTTP stack, exported to a mock collector.

mod common;

use std::time::Duration;

use axum::body::Body;
use pizza_telemetry::config::{shared, ServiceConfig};
use pizza_telemetry::metrics::ExportOutcome;
use pizza_telemetry::{HttpServer, Telemetry};
use tower::ServiceExt;

use common::{point_value, start_collector};

fn configured(url: Option<String>) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.metrics.url = url;
    config.metrics.api_key = "metrics-key".into();
    config.metrics.source = "pizza-test".into();
    config
}

async fn send(router: &axum::Router, method: &str, uri: &str) {
    let request = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap();
}

#[tokio::test]
async fn counts_reach_the_collector() {
    let collector = start_collector().await;
    let config = configured(Some(collector.url()));
    let telemetry = Telemetry::new(shared(config.clone()));
    let router = HttpServer::new(&config, &telemetry).router();

    for _ in 0..3 {
        send(&router, "GET", "/").await;
    }
    send(&router, "PUT", "/api/order").await;

    let outcome = telemetry.exporter().tick().await;
    assert!(matches!(outcome, ExportOutcome::Delivered { .. }), "{outcome:?}");

    let received = collector.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].authorization.as_deref(), Some("Bearer metrics-key"));

    let batch = &received[0].body;
    assert_eq!(point_value(batch, "http_requests_total", "method", "ALL"), Some(4.0));
    assert_eq!(point_value(batch, "http_get_total", "method", "GET"), Some(3.0));
    assert_eq!(point_value(batch, "http_put_total", "method", "PUT"), Some(1.0));
    assert_eq!(point_value(batch, "http_post_total", "method", "POST"), Some(0.0));
    assert_eq!(point_value(batch, "http_delete_total", "method", "DELETE"), Some(0.0));
    assert_eq!(
        point_value(batch, "http_requests_total", "source", "pizza-test"),
        Some(4.0)
    );
}

#[tokio::test]
async fn rejected_batch_is_dropped_and_totals_survive() {
    let collector = start_collector().await;
    let config = configured(Some(collector.url()));
    let telemetry = Telemetry::new(shared(config.clone()));
    let router = HttpServer::new(&config, &telemetry).router();
    let exporter = telemetry.exporter();

    send(&router, "GET", "/").await;
    send(&router, "POST", "/api/order").await;

    collector.respond_with(503);
    assert_eq!(exporter.tick().await, ExportOutcome::Failed);

    collector.respond_with(200);
    assert!(matches!(exporter.tick().await, ExportOutcome::Delivered { .. }));

    let received = collector.received();
    assert_eq!(received.len(), 2);
    for push in &received {
        assert_eq!(point_value(&push.body, "http_requests_total", "method", "ALL"), Some(2.0));
        assert_eq!(point_value(&push.body, "http_post_total", "method", "POST"), Some(1.0));
    }
}

#[tokio::test]
async fn missing_endpoint_sends_nothing() {
    let collector = start_collector().await;
    let config = configured(None);
    let telemetry = Telemetry::new(shared(config.clone()));
    let router = HttpServer::new(&config, &telemetry).router();

    send(&router, "GET", "/").await;

    let exporter = telemetry.exporter();
    assert_eq!(exporter.tick().await, ExportOutcome::Disabled);
    assert_eq!(exporter.tick().await, ExportOutcome::Disabled);
    assert!(collector.wait_for(1, Duration::from_millis(100)).await.is_empty());
}

#[tokio::test]
async fn reloaded_endpoint_takes_effect_on_next_tick() {
    let collector = start_collector().await;
    let config = shared(configured(None));
    let telemetry = Telemetry::new(config.clone());
    let exporter = telemetry.exporter();

    assert_eq!(exporter.tick().await, ExportOutcome::Disabled);

    config.store(std::sync::Arc::new(configured(Some(collector.url()))));
    assert!(matches!(exporter.tick().await, ExportOutcome::Delivered { .. }));
    assert_eq!(collector.received().len(), 1);
}
