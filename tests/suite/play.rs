//! Workbench driven end to end over HTTP

use std::sync::Arc;
use std::time::Duration;

use alchemist_engine::{ElementId, HttpOracle, Language, SessionContext, Store};
use alchemist_types::Position;
use alchemist_workbench::{Workbench, WorkbenchNotice, WorkbenchSettings};
use wiremock::MockServer;

use crate::common::{fire, mock_orchestrator, mount_combine_result, mount_listing, steam, water};

fn en() -> Language {
    Language::english()
}

async fn setup(server: &MockServer) -> (Workbench<HttpOracle>, Arc<Store>) {
    mount_listing(server, "en", vec![water(), fire()]).await;
    mount_combine_result(server, steam(), false).await;
    let store = Arc::new(Store::in_memory());
    let orchestrator = mock_orchestrator(server, &store);
    orchestrator.fetch_catalog(&en()).await;
    store.seed_basics(&en());

    let settings = WorkbenchSettings {
        display_interval: Duration::from_millis(20),
        ..WorkbenchSettings::default()
    };
    let workbench = Workbench::new(orchestrator, SessionContext::anonymous(en()), settings);
    (workbench, store)
}

async fn run_until_idle(workbench: &mut Workbench<HttpOracle>) -> Vec<WorkbenchNotice> {
    let mut notices = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            notices.extend(workbench.tick());
            if workbench.is_idle() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("workbench did not settle");
    notices
}

#[tokio::test]
async fn dropping_fire_on_water_produces_steam() {
    let server = MockServer::start().await;
    let (mut workbench, store) = setup(&server).await;

    workbench.drop_element(ElementId::new(1), Position::new(10.0, 10.0));
    let dropped = workbench.drop_element(ElementId::new(2), Position::new(12.0, 11.0));
    assert!(dropped.pair.is_some());

    let notices = run_until_idle(&mut workbench).await;

    assert!(
        notices
            .iter()
            .any(|n| matches!(n, WorkbenchNotice::Materialized { .. }))
    );
    let [steam] = workbench.instances() else {
        panic!("expected exactly one instance");
    };
    assert_eq!(steam.element().id(), ElementId::new(9));
    assert_eq!(steam.position(), Position::new(12.0, 11.0));
    assert_eq!(store.ledger().len(&en()), 3);
}

#[tokio::test]
async fn clearing_mid_flight_still_records_discovery() {
    let server = MockServer::start().await;
    let (mut workbench, store) = setup(&server).await;

    workbench.drop_element(ElementId::new(1), Position::new(10.0, 10.0));
    workbench.drop_element(ElementId::new(2), Position::new(12.0, 11.0));
    workbench.clear();

    let notices = run_until_idle(&mut workbench).await;

    assert!(
        notices
            .iter()
            .all(|n| !matches!(n, WorkbenchNotice::Materialized { .. }))
    );
    assert!(workbench.is_empty());
    assert!(store.ledger().contains(&en(), ElementId::new(9)));
}
