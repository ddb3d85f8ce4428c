//! Degraded operation and persistence across restarts

use std::sync::Arc;

use alchemist_engine::{
    Element, ElementId, LEDGER_FILE_NAME, Language, SessionContext, Store, WarningKind,
};
use wiremock::MockServer;

use crate::common::{
    fire, mock_orchestrator, mount_combine_result, mount_listing, persistent_store, steam,
    unreachable_orchestrator, water,
};

fn en() -> Language {
    Language::english()
}

#[tokio::test]
async fn unreachable_oracle_falls_back_everywhere() {
    let store = Arc::new(Store::in_memory());
    let orchestrator = unreachable_orchestrator(&store);

    let elements = orchestrator.fetch_catalog(&en()).await;
    assert_eq!(elements.len(), 4);
    assert_eq!(
        store.status().warning().map(|w| w.kind),
        Some(WarningKind::CatalogOffline)
    );
    assert_eq!(store.seed_basics(&en()), 4);

    let result = orchestrator
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;

    assert!(result.element().is_some());
    assert!(result.is_new_discovery);
    assert!(result.is_fallback());
    assert_eq!(store.ledger().len(&en()), 4);
    assert!(!store.ledger().contains(&en(), ElementId::UNRESOLVED));
}

#[tokio::test]
async fn offline_languages_get_their_own_seed() {
    let store = Arc::new(Store::in_memory());
    let orchestrator = unreachable_orchestrator(&store);
    let russian = Language::parse("ru").unwrap();

    orchestrator.fetch_catalog(&russian).await;
    store.seed_basics(&russian);

    let names: Vec<String> = store
        .discoveries(&russian)
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    assert!(names.contains(&"Вода".to_string()));
    assert!(store.discoveries(&en()).is_empty());
}

#[tokio::test]
async fn discoveries_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_listing(&server, "en", vec![water(), fire()]).await;
    mount_combine_result(&server, steam(), false).await;

    {
        let store = persistent_store(dir.path());
        let orchestrator = mock_orchestrator(&server, &store);
        orchestrator.fetch_catalog(&en()).await;
        store.seed_basics(&en());
        orchestrator
            .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
            .await;
    }
    assert!(dir.path().join(LEDGER_FILE_NAME).exists());

    let store = persistent_store(dir.path());
    let ids: Vec<i64> = store
        .discoveries(&en())
        .iter()
        .map(|e| e.id().value())
        .collect();
    assert_eq!(ids, vec![1, 2, 9]);

    // Offline restart: ledger entries are still resolvable.
    let orchestrator = unreachable_orchestrator(&store);
    orchestrator.fetch_catalog(&en()).await;
    assert_eq!(store.seed_basics(&en()), 0);
    assert_eq!(
        store.lookup(&en(), ElementId::new(9)).as_ref().map(Element::name),
        Some("Steam")
    );
}

#[tokio::test]
async fn reset_restores_basics_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = persistent_store(dir.path());
        store.seed_basics(&en());
        store.record(&en(), Element::new(ElementId::new(9), "Steam"));
        store.reset(&en());
    }

    let store = persistent_store(dir.path());
    let list = store.discoveries(&en());
    assert_eq!(list.len(), 4);
    assert!(list.iter().all(Element::is_basic));
}
