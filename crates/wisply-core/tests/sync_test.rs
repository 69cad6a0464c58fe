// Scanner, health monitor, profile sync, and audit tests: reconciliation
// counts, dry-run behavior, snapshot persistence, and isolation of
// per-router failures in batch runs.

use secrecy::SecretString;

use wisply_core::audit::MismatchKind;
use wisply_core::store::{customers, profiles, routers};
use wisply_core::{
    CoreConfig, CustomerStatus, HealthMonitor, NetworkAudit, NetworkScanner, NewCustomer,
    NewRouter, ProfileSync, Store,
};
use wisply_ros::testing::{MockRouter, MockState};

async fn store() -> Store {
    Store::in_memory().await.unwrap()
}

async fn register_router(store: &Store, name: &str, host: &str, port: u16) -> i64 {
    routers::create(
        store.pool(),
        &NewRouter {
            name: name.into(),
            address: host.into(),
            port,
            username: "api".into(),
            password: SecretString::from("s3cret".to_owned()),
            isolation_profile: Some("ISOLIR".into()),
        },
    )
    .await
    .unwrap()
    .id
}

async fn register_customer(store: &Store, pppoe_user: &str, status: CustomerStatus) -> i64 {
    customers::create(
        store.pool(),
        &NewCustomer {
            name: pppoe_user.to_uppercase(),
            pppoe_user: pppoe_user.into(),
            pppoe_pass: None,
            status,
            router_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn dead_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

// ── Scanner ─────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_matches_known_customers_and_counts_orphans() {
    let mut state = MockState::default();
    state.add_secret("alice", "Paket-10M");
    state.add_secret("bob", "Paket-20M");
    let mock = MockRouter::start(state).await;

    let store = store().await;
    let router_id = register_router(&store, "core-01", &mock.host(), mock.port()).await;
    let alice_id = register_customer(&store, "alice", CustomerStatus::Active).await;
    let carol_id = register_customer(&store, "carol", CustomerStatus::Active).await;

    let scanner = NetworkScanner::new(store.clone(), CoreConfig::default());
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    let report = scanner.scan_router(&router, false).await.unwrap();

    assert_eq!(report.secrets_total, 2);
    assert_eq!(report.matched, 1); // alice
    assert_eq!(report.orphaned, 1); // bob

    let alice = customers::find_by_id(store.pool(), alice_id).await.unwrap().unwrap();
    assert_eq!(alice.router_id, Some(router_id));
    // carol has no secret on this router; she is not touched.
    let carol = customers::find_by_id(store.pool(), carol_id).await.unwrap().unwrap();
    assert_eq!(carol.router_id, None);

    // Scan snapshot recorded, router adopted as reachable.
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    assert!(router.is_active);
    assert!(router.last_scanned_at.is_some());
    assert_eq!(router.last_scan_customers_count, Some(1));
    assert_eq!(router.total_pppoe_count, Some(2));
}

#[tokio::test]
async fn dry_run_scan_reports_without_persisting() {
    let mut state = MockState::default();
    state.add_secret("alice", "Paket-10M");
    let mock = MockRouter::start(state).await;

    let store = store().await;
    let router_id = register_router(&store, "core-01", &mock.host(), mock.port()).await;
    let alice_id = register_customer(&store, "alice", CustomerStatus::Active).await;

    let scanner = NetworkScanner::new(store.clone(), CoreConfig::default());
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    let report = scanner.scan_router(&router, true).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.matched, 1);

    let alice = customers::find_by_id(store.pool(), alice_id).await.unwrap().unwrap();
    assert_eq!(alice.router_id, None);
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    assert!(router.last_scanned_at.is_none());
}

#[tokio::test]
async fn one_unreachable_router_does_not_abort_the_batch() {
    let mut state_a = MockState::default();
    state_a.add_secret("alice", "Paket-10M");
    let mock_a = MockRouter::start(state_a).await;
    let mut state_c = MockState::default();
    state_c.add_secret("carol", "Paket-20M");
    let mock_c = MockRouter::start(state_c).await;

    let store = store().await;
    register_router(&store, "a-core", &mock_a.host(), mock_a.port()).await;
    let dead_id = register_router(&store, "b-dead", "127.0.0.1", dead_port().await).await;
    register_router(&store, "c-core", &mock_c.host(), mock_c.port()).await;
    register_customer(&store, "alice", CustomerStatus::Active).await;
    register_customer(&store, "carol", CustomerStatus::Active).await;

    let scanner = NetworkScanner::new(store.clone(), CoreConfig::default());
    let outcomes = scanner.scan_all(false).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].result.is_ok());
    assert!(outcomes[1].result.is_err());
    assert!(outcomes[2].result.is_ok());

    let dead = routers::find_by_id(store.pool(), dead_id).await.unwrap().unwrap();
    assert!(!dead.is_active);
}

// ── Health monitor ──────────────────────────────────────────────────

#[tokio::test]
async fn health_check_persists_the_vitals_snapshot() {
    let mut state = MockState::default();
    state.add_active("alice", "10.20.0.2");
    state.add_active("bob", "10.20.0.3");
    let mock = MockRouter::start(state).await;

    let store = store().await;
    let router_id = register_router(&store, "core-01", &mock.host(), mock.port()).await;

    let monitor = HealthMonitor::new(store.clone(), CoreConfig::default());
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    let report = monitor.check(&router).await.unwrap();

    assert_eq!(report.online_count, 2);
    assert_eq!(report.identity.as_deref(), Some("mock-router"));

    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    assert!(router.is_active);
    assert_eq!(router.cpu_load, Some(4));
    assert_eq!(router.current_online_count, Some(2));
    assert_eq!(router.board_name.as_deref(), Some("RB5009UG+S+"));
    assert!(router.last_health_check_at.is_some());
}

#[tokio::test]
async fn failed_health_check_still_stamps_the_timestamp() {
    let store = store().await;
    let router_id = register_router(&store, "b-dead", "127.0.0.1", dead_port().await).await;
    // Pretend it was reachable once.
    sqlx::query("UPDATE routers SET is_active = 1 WHERE id = ?")
        .bind(router_id)
        .execute(store.pool())
        .await
        .unwrap();

    let monitor = HealthMonitor::new(store.clone(), CoreConfig::default());
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    assert!(monitor.check(&router).await.is_err());

    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    assert!(!router.is_active);
    // "Checked and failed", not "never checked".
    assert!(router.last_health_check_at.is_some());
}

// ── Profile sync ────────────────────────────────────────────────────

#[tokio::test]
async fn profile_sync_filters_and_derives_bandwidth() {
    let mut state = MockState::default();
    state.add_profile("default", None);
    state.add_profile("default-encryption", None);
    state.add_profile("ISOLIRBILLING", Some("64k/64k"));
    state.add_profile("SpeedTest-100M", Some("100M/100M"));
    state.add_profile("Paket-20M", Some("2560k/15M 5120k/20M"));
    state.add_profile("Paket-Flat", None);
    let mock = MockRouter::start(state).await;

    let store = store().await;
    let router_id = register_router(&store, "core-01", &mock.host(), mock.port()).await;

    let sync = ProfileSync::new(store.clone(), CoreConfig::default());
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    let report = sync.sync_router(&router).await.unwrap();

    assert_eq!(report.discovered, 6);
    assert_eq!(report.skipped, 4);
    assert_eq!(report.synced, 2);
    assert_eq!(report.pruned, 0);

    let cached = profiles::list_by_router(store.pool(), router_id).await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[0].name, "Paket-20M");
    assert_eq!(cached[0].bandwidth.as_deref(), Some("20M"));
    assert_eq!(cached[1].name, "Paket-Flat");
    assert_eq!(cached[1].bandwidth, None);
}

#[tokio::test]
async fn profile_sync_prunes_rows_gone_from_the_device() {
    let mut state = MockState::default();
    state.add_profile("Paket-10M", Some("1M/5M 2M/10M"));
    state.add_profile("Paket-20M", Some("2560k/15M 5120k/20M"));
    let mock = MockRouter::start(state).await;

    let store = store().await;
    let router_id = register_router(&store, "core-01", &mock.host(), mock.port()).await;
    let sync = ProfileSync::new(store.clone(), CoreConfig::default());
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();

    sync.sync_router(&router).await.unwrap();
    assert_eq!(
        profiles::list_by_router(store.pool(), router_id).await.unwrap().len(),
        2
    );

    // The operator deletes one profile on the device.
    mock.state().lock().await.profiles.retain(|p| p.name != "Paket-10M");
    let report = sync.sync_router(&router).await.unwrap();
    assert_eq!(report.pruned, 1);

    let cached = profiles::list_by_router(store.pool(), router_id).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].name, "Paket-20M");
}

// ── Audit ───────────────────────────────────────────────────────────

#[tokio::test]
async fn audit_surfaces_enforcement_mismatches_without_healing_them() {
    let mut state = MockState::default();
    state.add_secret("alice", "Paket-10M"); // DB will say isolated
    state.add_secret("bob", "ISOLIR"); // DB will say active
    state.add_secret("mallory", "Paket-20M"); // no DB record
    let mock = MockRouter::start(state).await;

    let store = store().await;
    let router_id = register_router(&store, "core-01", &mock.host(), mock.port()).await;
    let alice_id = register_customer(&store, "alice", CustomerStatus::Active).await;
    customers::record_isolated(store.pool(), alice_id, Some("Paket-10M"))
        .await
        .unwrap();
    register_customer(&store, "bob", CustomerStatus::Active).await;

    // The audit only walks reachable routers; adopt this one first.
    let monitor = HealthMonitor::new(store.clone(), CoreConfig::default());
    let router = routers::find_by_id(store.pool(), router_id).await.unwrap().unwrap();
    monitor.check(&router).await.unwrap();

    let audit = NetworkAudit::new(store.clone(), CoreConfig::default());
    let report = audit.run().await.unwrap();

    assert_eq!(report.total_customers, 2);
    assert_eq!(report.found, 2);
    assert_eq!(report.missing, 0);
    assert_eq!(report.routers.len(), 1);

    let router_audit = report.routers[0].result.as_ref().unwrap();
    assert_eq!(router_audit.secrets_total, 3);
    assert_eq!(router_audit.matched, 2);
    assert_eq!(router_audit.orphaned, 1);
    assert_eq!(router_audit.mismatches.len(), 2);

    let alice = router_audit
        .mismatches
        .iter()
        .find(|m| m.pppoe_user == "alice")
        .unwrap();
    assert_eq!(alice.kind, MismatchKind::IsolatedInDbOnly);

    let bob = router_audit
        .mismatches
        .iter()
        .find(|m| m.pppoe_user == "bob")
        .unwrap();
    assert_eq!(bob.kind, MismatchKind::IsolatedOnDeviceOnly);

    // Audit is read-only: statuses are untouched.
    let alice_row = customers::find_by_id(store.pool(), alice_id).await.unwrap().unwrap();
    assert_eq!(alice_row.status, CustomerStatus::Isolated);
}
