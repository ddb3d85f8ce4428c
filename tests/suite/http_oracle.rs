//! Orchestration against a mock oracle speaking the real wire format

use std::sync::Arc;

use alchemist_engine::{Element, ElementId, Language, SessionContext, Store, WarningKind};
use chrono::Datelike;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    element_json, fire, mock_orchestrator, mount_combine_declined, mount_combine_result,
    mount_listing, steam, water,
};

fn en() -> Language {
    Language::english()
}

#[tokio::test]
async fn catalog_decodes_integer_flags_and_naive_timestamps() {
    let server = MockServer::start().await;
    mount_listing(&server, "en", vec![water(), fire(), steam()]).await;
    let store = Arc::new(Store::in_memory());
    let orchestrator = mock_orchestrator(&server, &store);

    let elements = orchestrator.fetch_catalog(&en()).await;

    assert_eq!(elements.len(), 3);
    assert!(elements[0].is_basic());
    assert!(!elements[2].is_basic());
    assert_eq!(elements[0].created_at().year(), 2024);
    assert_eq!(store.seed_basics(&en()), 2);
    assert!(store.status().warning().is_none());
}

#[tokio::test]
async fn combine_records_discovery_once() {
    let server = MockServer::start().await;
    mount_listing(&server, "en", vec![water(), fire()]).await;
    mount_combine_result(&server, steam(), true).await;
    let store = Arc::new(Store::in_memory());
    let orchestrator = mock_orchestrator(&server, &store);
    orchestrator.fetch_catalog(&en()).await;
    store.seed_basics(&en());
    let session = SessionContext::anonymous(en());

    let first = orchestrator
        .combine(&session, ElementId::new(1), ElementId::new(2))
        .await;
    assert_eq!(first.element().map(Element::name), Some("Steam"));
    assert!(first.is_new_discovery);
    assert!(first.is_first_discovery);

    // The oracle keeps saying "new"; the ledger decides.
    let second = orchestrator
        .combine(&session, ElementId::new(1), ElementId::new(2))
        .await;
    assert!(!second.is_new_discovery);
    assert_eq!(store.ledger().len(&en()), 3);
    assert_eq!(store.catalog().len(&en()), 3);
}

#[tokio::test]
async fn declined_pair_passes_error_through() {
    let server = MockServer::start().await;
    mount_listing(&server, "en", vec![water(), fire()]).await;
    mount_combine_declined(&server, "Nothing happens").await;
    let store = Arc::new(Store::in_memory());
    let orchestrator = mock_orchestrator(&server, &store);
    orchestrator.fetch_catalog(&en()).await;
    store.seed_basics(&en());

    let result = orchestrator
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(1))
        .await;

    assert!(result.result.is_none());
    assert_eq!(result.error.as_deref(), Some("Nothing happens"));
    assert_eq!(store.ledger().len(&en()), 2);
}

#[tokio::test]
async fn server_error_on_combine_yields_placeholder() {
    let server = MockServer::start().await;
    mount_listing(&server, "en", vec![water(), fire()]).await;
    Mock::given(method("POST"))
        .and(path("/api/elements/combine"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "Internal Server Error"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let store = Arc::new(Store::in_memory());
    let orchestrator = mock_orchestrator(&server, &store);
    orchestrator.fetch_catalog(&en()).await;
    store.seed_basics(&en());

    let result = orchestrator
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;

    assert!(result.is_fallback());
    assert_eq!(result.element().map(Element::id), Some(ElementId::UNRESOLVED));
    assert_eq!(store.ledger().len(&en()), 2);
    assert_eq!(
        store.status().warning().map(|w| w.kind),
        Some(WarningKind::CombineOffline)
    );
}

#[tokio::test]
async fn refetch_keeps_ledger_referenced_elements() {
    let server = MockServer::start().await;
    mount_listing(&server, "en", vec![water(), fire()]).await;
    let store = Arc::new(Store::in_memory());
    let orchestrator = mock_orchestrator(&server, &store);
    store.record(&en(), Element::new(ElementId::new(42), "Lava"));

    orchestrator.fetch_catalog(&en()).await;
    orchestrator.fetch_catalog(&en()).await;

    assert!(store.lookup(&en(), ElementId::new(42)).is_some());
    assert_eq!(store.catalog().len(&en()), 3);
}

#[tokio::test]
async fn unknown_input_is_fetched_before_combining() {
    let server = MockServer::start().await;
    mount_listing(&server, "en", vec![water(), fire()]).await;
    Mock::given(method("GET"))
        .and(path("/api/elements/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(steam()))
        .expect(1)
        .mount(&server)
        .await;
    mount_combine_result(&server, element_json(10, "Cloud", "☁️", false), false).await;
    let store = Arc::new(Store::in_memory());
    let orchestrator = mock_orchestrator(&server, &store);
    orchestrator.fetch_catalog(&en()).await;

    let result = orchestrator
        .combine(&SessionContext::anonymous(en()), ElementId::new(9), ElementId::new(1))
        .await;

    assert_eq!(result.element().map(Element::name), Some("Cloud"));
    assert!(store.lookup(&en(), ElementId::new(9)).is_some());
}
