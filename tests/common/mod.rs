//! Shared test utilities and fixtures
//!
//! A mock oracle speaking the real wire format (integer `is_basic`, naive
//! timestamps, `{"detail": ...}` errors) plus store/orchestrator wiring.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alchemist_engine::alchemist_oracle::retry::RetryConfig;
use alchemist_engine::{
    DiscoveryLedger, FallbackPolicy, HttpOracle, OracleSettings, Orchestrator, Store,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn element_json(id: i64, name: &str, emoji: &str, is_basic: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "emoji": emoji,
        "description": null,
        "is_basic": i32::from(is_basic),
        "created_at": "2024-05-01T12:00:00.123456"
    })
}

pub fn water() -> Value {
    element_json(1, "Water", "💧", true)
}

pub fn fire() -> Value {
    element_json(2, "Fire", "🔥", true)
}

pub fn steam() -> Value {
    element_json(9, "Steam", "☁️", false)
}

/// Serve `elements` as a single listing page for `language`.
pub async fn mount_listing(server: &MockServer, language: &str, elements: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/api/elements/"))
        .and(query_param("language", language))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": elements })))
        .mount(server)
        .await;
}

/// Answer every combine request with `result`.
pub async fn mount_combine_result(server: &MockServer, result: Value, is_first_discovery: bool) {
    let body = json!({
        "element1_id": 1,
        "element2_id": 2,
        "result_id": result["id"],
        "result": result,
        "is_new_discovery": true,
        "is_first_discovery": is_first_discovery
    });
    Mock::given(method("POST"))
        .and(path("/api/elements/combine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Decline every combine request with `error`.
pub async fn mount_combine_declined(server: &MockServer, error: &str) {
    Mock::given(method("POST"))
        .and(path("/api/elements/combine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "element1_id": 1,
            "element2_id": 2,
            "result": null,
            "error": error
        })))
        .mount(server)
        .await;
}

pub fn fast_settings(base_url: String) -> OracleSettings {
    OracleSettings {
        base_url,
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(5),
        read_retry: RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
        },
    }
}

pub fn http_orchestrator(base_url: String, store: &Arc<Store>) -> Orchestrator<HttpOracle> {
    let oracle = HttpOracle::new(fast_settings(base_url)).unwrap();
    Orchestrator::new(Arc::new(oracle), Arc::clone(store))
}

pub fn mock_orchestrator(server: &MockServer, store: &Arc<Store>) -> Orchestrator<HttpOracle> {
    http_orchestrator(format!("{}/api", server.uri()), store)
}

/// An oracle address nothing listens on.
pub fn unreachable_orchestrator(store: &Arc<Store>) -> Orchestrator<HttpOracle> {
    let settings = OracleSettings {
        read_retry: RetryConfig::single_attempt(),
        ..fast_settings("http://127.0.0.1:9/api".to_string())
    };
    let oracle = HttpOracle::new(settings).unwrap();
    Orchestrator::new(Arc::new(oracle), Arc::clone(store))
}

pub fn persistent_store(dir: &Path) -> Arc<Store> {
    let ledger = DiscoveryLedger::open_in(dir).unwrap();
    Arc::new(Store::new(ledger, FallbackPolicy::new()))
}
