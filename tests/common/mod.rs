//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

/// One request received by the collector.
#[derive(Debug, Clone)]
pub struct Received {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
struct CollectorState {
    received: Arc<Mutex<Vec<Received>>>,
    status: Arc<AtomicU16>,
}

/// Mock metrics/log collector listening on an ephemeral port.
pub struct Collector {
    pub addr: SocketAddr,
    state: CollectorState,
}

impl Collector {
    pub fn url(&self) -> String {
        format!("http://{}/push", self.addr)
    }

    /// Status returned for subsequent pushes.
    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().unwrap().clone()
    }

    /// Poll until at least `count` pushes arrived or `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Received> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let received = self.received();
            if received.len() >= count || tokio::time::Instant::now() >= deadline {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn record(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .received
        .lock()
        .unwrap()
        .push(Received { authorization, body });
    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

/// Start a collector that accepts JSON POSTs on `/push`.
pub async fn start_collector() -> Collector {
    let state = CollectorState::default();
    state.status.store(200, Ordering::SeqCst);

    let app = Router::new()
        .route("/push", post(record))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Collector { addr, state }
}

/// Find the first data point value of `name` whose attributes include
/// `key=value`, as f64.
pub fn point_value(batch: &Value, name: &str, key: &str, value: &str) -> Option<f64> {
    let metrics = batch["resourceMetrics"][0]["scopeMetrics"][0]["metrics"].as_array()?;
    let metric = metrics.iter().find(|m| m["name"] == name)?;
    let data = if metric.get("sum").is_some() {
        &metric["sum"]
    } else {
        &metric["gauge"]
    };
    data["dataPoints"].as_array()?.iter().find_map(|point| {
        let matches = point["attributes"].as_array()?.iter().any(|attr| {
            attr["key"] == key && attr["value"]["stringValue"] == value
        });
        if !matches {
            return None;
        }
        point
            .get("asInt")
            .and_then(Value::as_f64)
            .or_else(|| point.get("asDouble").and_then(Value::as_f64))
    })
}
