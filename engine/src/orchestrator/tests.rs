use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alchemist_oracle::{CombineReply, CombineRequest, Oracle, OracleError};
use alchemist_types::{Element, ElementId, Language, PlayerName, ResultOrigin};
use tokio::sync::Notify;

use super::Orchestrator;
use crate::fallback::FallbackPolicy;
use crate::ledger::DiscoveryLedger;
use crate::session::SessionContext;
use crate::status::WarningKind;
use crate::store::Store;

#[derive(Default)]
struct ScriptedOracle {
    elements: Vec<Element>,
    recipes: HashMap<(i64, i64), Element>,
    first_discovery: bool,
    empty_replies: bool,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    requests: Mutex<Vec<CombineRequest>>,
}

impl ScriptedOracle {
    fn with_elements(elements: Vec<Element>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    fn recipe(mut self, a: i64, b: i64, result: Element) -> Self {
        self.recipes.insert((a.min(b), a.max(b)), result);
        self
    }

    fn combine_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Oracle for ScriptedOracle {
    async fn list_elements(
        &self,
        _language: &Language,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Element>, OracleError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .elements
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_element(&self, _language: &Language, id: ElementId) -> Result<Element, OracleError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.elements
            .iter()
            .chain(self.recipes.values())
            .find(|e| e.id() == id)
            .cloned()
            .ok_or(OracleError::Status {
                status: 404,
                detail: "Element not found".to_string(),
            })
    }

    async fn combine(&self, request: &CombineRequest) -> Result<CombineReply, OracleError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.empty_replies {
            return Ok(CombineReply {
                error: None,
                ..CombineReply::with_error("")
            });
        }
        let (a, b) = (request.element1_id.value(), request.element2_id.value());
        Ok(match self.recipes.get(&(a.min(b), a.max(b))) {
            Some(result) => {
                let mut reply = CombineReply::with_result(result.clone());
                reply.is_first_discovery = self.first_discovery;
                reply
            }
            None => CombineReply::with_error("These elements cannot be combined"),
        })
    }
}

struct OfflineOracle;

fn unavailable() -> OracleError {
    OracleError::Status {
        status: 503,
        detail: "Service Unavailable".to_string(),
    }
}

impl Oracle for OfflineOracle {
    async fn list_elements(
        &self,
        _language: &Language,
        _skip: u32,
        _limit: u32,
    ) -> Result<Vec<Element>, OracleError> {
        Err(unavailable())
    }

    async fn get_element(&self, _language: &Language, _id: ElementId) -> Result<Element, OracleError> {
        Err(unavailable())
    }

    async fn combine(&self, _request: &CombineRequest) -> Result<CombineReply, OracleError> {
        Err(unavailable())
    }
}

/// Holds every listing until released, to interleave writes with a fetch.
struct GatedOracle {
    elements: Vec<Element>,
    entered: Notify,
    release: Notify,
}

impl Oracle for GatedOracle {
    async fn list_elements(
        &self,
        _language: &Language,
        _skip: u32,
        _limit: u32,
    ) -> Result<Vec<Element>, OracleError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.elements.clone())
    }

    async fn get_element(&self, _language: &Language, _id: ElementId) -> Result<Element, OracleError> {
        Err(unavailable())
    }

    async fn combine(&self, _request: &CombineRequest) -> Result<CombineReply, OracleError> {
        Err(unavailable())
    }
}

fn en() -> Language {
    Language::english()
}

fn water() -> Element {
    Element::basic(ElementId::new(1), "Water", "💧")
}

fn fire() -> Element {
    Element::basic(ElementId::new(2), "Fire", "🔥")
}

fn steam() -> Element {
    Element::new(ElementId::new(3), "Steam").with_emoji("☁️")
}

fn basic_oracle() -> ScriptedOracle {
    ScriptedOracle::with_elements(vec![water(), fire()]).recipe(1, 2, steam())
}

fn orchestrator<O: Oracle>(oracle: O) -> (Orchestrator<O>, Arc<O>, Arc<Store>) {
    let oracle = Arc::new(oracle);
    let store = Arc::new(Store::in_memory());
    (
        Orchestrator::new(Arc::clone(&oracle), Arc::clone(&store)),
        oracle,
        store,
    )
}

#[tokio::test]
async fn water_and_fire_make_steam_once() {
    let (orch, _oracle, store) = orchestrator(basic_oracle());
    let session = SessionContext::anonymous(en());

    assert_eq!(orch.fetch_catalog(&en()).await.len(), 2);
    assert_eq!(store.seed_basics(&en()), 2);

    let first = orch.combine(&session, ElementId::new(1), ElementId::new(2)).await;
    assert_eq!(first.element().map(Element::name), Some("Steam"));
    assert!(first.is_new_discovery);
    assert_eq!(first.origin, ResultOrigin::Oracle);
    assert_eq!(store.catalog().len(&en()), 3);
    assert_eq!(store.ledger().len(&en()), 3);

    let again = orch.combine(&session, ElementId::new(2), ElementId::new(1)).await;
    assert_eq!(again.element().map(|e| e.id().value()), Some(3));
    assert!(!again.is_new_discovery);
    assert_eq!(store.ledger().len(&en()), 3);
    assert!(!store.status().is_busy());
}

#[tokio::test]
async fn first_discovery_flag_passes_through() {
    let oracle = ScriptedOracle {
        first_discovery: true,
        ..basic_oracle()
    };
    let (orch, _oracle, store) = orchestrator(oracle);
    orch.fetch_catalog(&en()).await;
    store.seed_basics(&en());

    let result = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;
    assert!(result.is_first_discovery);
}

#[tokio::test]
async fn declined_pair_carries_error_and_mutates_nothing() {
    let (orch, _oracle, store) = orchestrator(basic_oracle());
    orch.fetch_catalog(&en()).await;
    store.seed_basics(&en());

    let result = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(1))
        .await;

    assert!(result.is_declined());
    assert_eq!(result.error.as_deref(), Some("These elements cannot be combined"));
    assert!(!result.is_new_discovery);
    assert_eq!(store.catalog().len(&en()), 2);
    assert_eq!(store.ledger().len(&en()), 2);
}

#[tokio::test]
async fn empty_reply_is_a_soft_failure() {
    let oracle = ScriptedOracle {
        empty_replies: true,
        ..basic_oracle()
    };
    let (orch, _oracle, store) = orchestrator(oracle);
    orch.fetch_catalog(&en()).await;
    store.seed_basics(&en());

    let result = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;
    assert!(result.is_declined());
    assert!(result.error.is_some());
    assert_eq!(store.ledger().len(&en()), 2);
}

#[tokio::test]
async fn offline_combine_returns_unrecorded_placeholder() {
    let (orch, _oracle, store) = orchestrator(OfflineOracle);
    orch.fetch_catalog(&en()).await;
    store.seed_basics(&en());
    let before = store.discoveries(&en());

    let result = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;

    let element = result.element().unwrap();
    assert_eq!(element.id(), ElementId::UNRESOLVED);
    assert_eq!(element.name(), "Unknown");
    assert!(result.is_new_discovery);
    assert!(result.is_fallback());
    assert_eq!(store.discoveries(&en()), before);
    assert_eq!(
        store.status().warning().map(|w| w.kind),
        Some(WarningKind::CombineOffline)
    );
}

#[tokio::test]
async fn offline_catalog_falls_back_to_builtin_seed() {
    let (orch, _oracle, store) = orchestrator(OfflineOracle);

    let elements = orch.fetch_catalog(&en()).await;

    assert_eq!(elements.len(), 4);
    assert!(elements.iter().all(Element::is_basic));
    assert_eq!(
        store.status().warning().map(|w| w.kind),
        Some(WarningKind::CatalogOffline)
    );
    assert_eq!(store.seed_basics(&en()), 4);
}

#[tokio::test]
async fn placeholders_are_recorded_when_configured() {
    let oracle = Arc::new(OfflineOracle);
    let store = Arc::new(Store::new(
        DiscoveryLedger::in_memory(),
        FallbackPolicy::new().with_persist_placeholders(true),
    ));
    let orch = Orchestrator::new(oracle, Arc::clone(&store));
    orch.fetch_catalog(&en()).await;
    store.seed_basics(&en());

    let first = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;
    let second = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(3), ElementId::new(4))
        .await;

    assert!(first.is_new_discovery);
    assert!(!second.is_new_discovery);
    assert!(store.ledger().contains(&en(), ElementId::UNRESOLVED));
}

#[tokio::test]
async fn catalog_fetch_follows_pages_and_retains_ledger_entries() {
    let elements: Vec<Element> = (1..=5)
        .map(|id| Element::new(ElementId::new(id), format!("E{id}")))
        .collect();
    let (orch, oracle, store) = orchestrator(ScriptedOracle::with_elements(elements));
    let orch = orch.with_page_size(2);
    store.record(&en(), Element::new(ElementId::new(77), "Lava"));

    let fetched = orch.fetch_catalog(&en()).await;

    assert_eq!(oracle.list_calls.load(Ordering::SeqCst), 3);
    assert_eq!(fetched.len(), 6);
    assert!(store.lookup(&en(), ElementId::new(77)).is_some());
}

#[tokio::test]
async fn unknown_ids_are_fetched_once_before_combining() {
    let (orch, oracle, store) = orchestrator(basic_oracle());

    let result = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;

    assert_eq!(oracle.get_calls.load(Ordering::SeqCst), 2);
    assert_eq!(oracle.combine_calls(), 1);
    assert_eq!(result.element().map(Element::name), Some("Steam"));
    assert!(store.catalog().contains(&en(), ElementId::new(1)));
}

#[tokio::test]
async fn unresolvable_id_yields_placeholder_without_combine() {
    let (orch, oracle, store) = orchestrator(basic_oracle());
    orch.fetch_catalog(&en()).await;

    let result = orch
        .combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(999))
        .await;

    assert!(result.is_fallback());
    assert_eq!(oracle.combine_calls(), 0);
    assert_eq!(oracle.get_calls.load(Ordering::SeqCst), 1);
    let warning = store.status().warning().unwrap();
    assert_eq!(warning.kind, WarningKind::Unresolved);
    assert!(warning.message.contains("999"));
}

#[tokio::test]
async fn placeholder_ids_never_reach_the_oracle() {
    let (orch, oracle, _store) = orchestrator(basic_oracle());

    assert!(orch.fetch_element(&en(), ElementId::UNRESOLVED).await.is_none());
    assert_eq!(oracle.get_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn combine_sends_player_and_language() {
    let (orch, oracle, _store) = orchestrator(basic_oracle());
    let russian = Language::parse("ru").unwrap();
    let session = SessionContext::new(russian.clone(), PlayerName::new("Ada"));
    orch.store().catalog().replace_partition(&russian, [water(), fire()], []);

    orch.combine(&session, ElementId::new(1), ElementId::new(2)).await;

    let requests = oracle.requests.lock().unwrap();
    assert_eq!(requests[0].player_name.as_deref(), Some("Ada"));
    assert_eq!(requests[0].language, russian);
}

#[tokio::test]
async fn languages_are_partitioned() {
    let (orch, _oracle, store) = orchestrator(basic_oracle());
    let russian = Language::parse("ru").unwrap();
    orch.fetch_catalog(&en()).await;
    store.seed_basics(&en());
    orch.combine(&SessionContext::anonymous(en()), ElementId::new(1), ElementId::new(2))
        .await;

    assert!(store.lookup(&russian, ElementId::new(3)).is_none());
    assert!(store.discoveries(&russian).is_empty());
}

#[tokio::test]
async fn discovery_recorded_during_catalog_fetch_stays_resolvable() {
    let (orch, oracle, store) = orchestrator(GatedOracle {
        elements: vec![water(), fire()],
        entered: Notify::new(),
        release: Notify::new(),
    });

    let record_mid_fetch = async {
        oracle.entered.notified().await;
        store.record(&en(), steam());
        oracle.release.notify_one();
    };
    let language = en();
    let (elements, ()) = tokio::join!(orch.fetch_catalog(&language), record_mid_fetch);

    assert!(store.ledger().contains(&en(), ElementId::new(3)));
    assert!(store.lookup(&en(), ElementId::new(3)).is_some());
    assert!(elements.iter().any(|e| e.id() == ElementId::new(3)));
}
