//! Unit tests for the reconciliation pass, run against MockPceClient

use crate::error::{SyncError, WorkloadError};
use crate::reconciler::{ReconcileOptions, Reconciler};
use pce_client::{Interface, MockPceClient, PceClientTrait, PceError, Workload};

const MAP: &str = "LocationMap";

/// Mock with `10.0.0.0/24 -> NYC`, `10.1.0.0/24 -> SFO` and one label per location
fn setup() -> MockPceClient {
    let mock = MockPceClient::new("https://pce.test:8443/api/v2");
    mock.add_ip_list(MAP, &[("10.0.0.0/24", "NYC"), ("10.1.0.0/24", "SFO")]);
    mock
}

fn reconciler(mock: &MockPceClient) -> Reconciler {
    Reconciler::new(mock.clone(), ReconcileOptions::default())
}

#[tokio::test]
async fn test_corrects_drifted_location() {
    let mock = setup();
    let _nyc = mock.add_label("loc", "NYC");
    let sfo = mock.add_label("loc", "SFO");
    let env = mock.add_label("env", "prod");
    let web = mock.add_workload("web01", "10.0.0.5", vec![env.clone(), sfo]);

    let report = reconciler(&mock).reconcile(MAP).await.unwrap();

    assert_eq!(report.evaluated, 1);
    assert_eq!(report.corrected(), 1);
    assert!(report.errors.is_empty());
    let correction = &report.corrections[0];
    assert_eq!(correction.workload, web);
    assert_eq!(correction.old_value, "SFO");
    assert_eq!(correction.new_value, "NYC");
    assert_eq!(correction.address, "10.0.0.5");
    assert!(correction.applied);

    assert_eq!(mock.label_value(&web, "loc").as_deref(), Some("NYC"));
    // Other labels survive the update
    assert!(mock.workload(&web).unwrap().labels.contains(&env));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let mock = setup();
    let nyc = mock.add_label("loc", "NYC");
    let sfo = mock.add_label("loc", "SFO");
    mock.add_workload("web01", "10.0.0.5", vec![sfo]);
    mock.add_workload("web02", "10.1.0.9", vec![nyc]);
    mock.add_workload("web03", "10.0.0.7", vec![mock.add_label("loc", "NYC-old")]);

    let first = reconciler(&mock).reconcile(MAP).await.unwrap();
    assert_eq!(first.corrected(), 3);

    let second = reconciler(&mock).reconcile(MAP).await.unwrap();
    assert_eq!(second.evaluated, 3);
    assert_eq!(second.corrected(), 0);
    assert!(second.corrections.is_empty());
    assert_eq!(mock.update_calls().len(), 3);
}

#[tokio::test]
async fn test_creates_missing_target_label() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    let web = mock.add_workload("web01", "10.0.0.5", vec![sfo]);

    let report = reconciler(&mock).reconcile(MAP).await.unwrap();

    assert_eq!(report.corrected(), 1);
    assert_eq!(mock.label_value(&web, "loc").as_deref(), Some("NYC"));
}

#[tokio::test]
async fn test_new_label_is_created_once_for_concurrent_updates() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    let a = mock.add_workload("a", "10.0.0.5", vec![sfo.clone()]);
    let b = mock.add_workload("b", "10.0.0.6", vec![sfo.clone()]);
    let c = mock.add_workload("c", "10.0.0.7", vec![sfo]);

    let options = ReconcileOptions { dry_run: false, concurrency: 3 };
    let report = Reconciler::new(mock.clone(), options).reconcile(MAP).await.unwrap();

    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(report.corrected(), 3);
    assert_eq!(mock.label_creations(), 1);
    for host in [&a, &b, &c] {
        assert_eq!(mock.label_value(host, "loc").as_deref(), Some("NYC"));
    }
}

#[tokio::test]
async fn test_concurrent_label_creation_is_rejected() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    let a = mock.add_workload("a", "10.0.0.5", vec![sfo.clone()]);
    let b = mock.add_workload("b", "10.0.0.6", vec![sfo]);
    let (a, b) = (mock.workload(&a).unwrap(), mock.workload(&b).unwrap());

    // Two uncoordinated find-or-create calls for the same new label
    let (first, second) = tokio::join!(
        mock.update_workload_label(&a, "loc", "NYC"),
        mock.update_workload_label(&b, "loc", "NYC"),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(PceError::Api(_))));
    assert_eq!(mock.label_creations(), 1);
}

#[tokio::test]
async fn test_label_resolution_failure_fails_its_corrections_only() {
    let mock = setup();
    let _sfo = mock.add_label("loc", "SFO");
    let lax = mock.add_label("loc", "LAX");
    let a = mock.add_workload("a", "10.0.0.5", vec![lax.clone()]);
    let b = mock.add_workload("b", "10.0.0.6", vec![lax.clone()]);
    let c = mock.add_workload("c", "10.1.0.6", vec![lax]);
    mock.fail_label_creation("NYC");

    let options = ReconcileOptions { dry_run: false, concurrency: 2 };
    let report = Reconciler::new(mock.clone(), options).reconcile(MAP).await.unwrap();

    assert_eq!(report.apply_errors().count(), 2);
    assert!(report.errors.iter().all(|e| matches!(
        e,
        WorkloadError::Apply { new_value, .. } if new_value == "NYC"
    )));
    assert_eq!(report.corrected(), 1);
    assert_eq!(report.corrections[0].workload, c);
    assert_eq!(mock.update_calls().len(), 1);
    assert_eq!(mock.label_value(&a, "loc").as_deref(), Some("LAX"));
    assert_eq!(mock.label_value(&b, "loc").as_deref(), Some("LAX"));
    assert_eq!(mock.label_value(&c, "loc").as_deref(), Some("SFO"));
}

#[tokio::test]
async fn test_update_workload_label_creates_and_sets() {
    let mock = setup();
    let env = mock.add_label("env", "prod");
    let sfo = mock.add_label("loc", "SFO");
    let web = mock.add_workload("web01", "10.0.0.5", vec![sfo, env.clone()]);
    let workload = mock.workload(&web).unwrap();

    let updated = mock.update_workload_label(&workload, "loc", "NYC").await.unwrap();

    assert_eq!(updated.labels.len(), 2);
    assert_eq!(updated.labels[1], env);
    assert_eq!(mock.label_value(&web, "loc").as_deref(), Some("NYC"));
    assert_eq!(mock.label_creations(), 1);
}

#[tokio::test]
async fn test_unmapped_address_is_untouched() {
    let mock = setup();
    let bogus = mock.add_label("loc", "Atlantis");
    mock.add_workload("far-away", "172.16.0.1", vec![bogus]);

    let report = reconciler(&mock).reconcile(MAP).await.unwrap();

    assert_eq!(report.evaluated, 1);
    assert!(report.corrections.is_empty());
    assert!(mock.update_calls().is_empty());
}

#[tokio::test]
async fn test_missing_location_label_is_not_created() {
    let mock = setup();
    let env = mock.add_label("env", "prod");
    let web = mock.add_workload("web01", "10.0.0.5", vec![env]);

    let report = reconciler(&mock).reconcile(MAP).await.unwrap();

    assert!(report.corrections.is_empty());
    assert!(mock.update_calls().is_empty());
    assert_eq!(mock.label_value(&web, "loc"), None);
}

#[tokio::test]
async fn test_first_subnet_wins_on_overlap() {
    let mock = MockPceClient::new("https://pce.test:8443/api/v2");
    mock.add_ip_list(MAP, &[("10.0.0.0/16", "CAMPUS"), ("10.0.1.0/24", "LAB")]);
    let lab = mock.add_label("loc", "LAB");
    let host = mock.add_workload("lab01", "10.0.1.20", vec![lab]);

    let report = reconciler(&mock).reconcile(MAP).await.unwrap();

    assert_eq!(report.corrections.len(), 1);
    assert_eq!(report.corrections[0].new_value, "CAMPUS");
    assert_eq!(mock.label_value(&host, "loc").as_deref(), Some("CAMPUS"));
}

#[tokio::test]
async fn test_apply_failure_is_isolated() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    let a = mock.add_workload("a", "10.0.0.5", vec![sfo.clone()]);
    let b = mock.add_workload("b", "10.0.0.6", vec![sfo]);
    mock.fail_updates_for(&a);

    let report = reconciler(&mock).reconcile(MAP).await.unwrap();

    assert_eq!(report.corrected(), 1);
    assert_eq!(report.corrections[0].workload, b);
    assert_eq!(report.apply_errors().count(), 1);
    assert_eq!(report.address_errors().count(), 0);
    assert!(matches!(
        &report.errors[0],
        WorkloadError::Apply { workload, new_value, .. } if *workload == a && new_value == "NYC"
    ));
    assert_eq!(mock.label_value(&a, "loc").as_deref(), Some("SFO"));
    assert_eq!(mock.label_value(&b, "loc").as_deref(), Some("NYC"));
}

#[tokio::test]
async fn test_bad_address_is_isolated() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    let broken = mock.add_workload("broken", "10.0.0.999", vec![sfo.clone()]);
    mock.add_raw_workload(Workload {
        href: "/orgs/1/workloads/no-nic".to_string(),
        hostname: "no-nic".to_string(),
        name: None,
        interfaces: Vec::<Interface>::new(),
        labels: vec![sfo.clone()],
    });
    let good = mock.add_workload("good", "10.0.0.8", vec![sfo]);

    let report = reconciler(&mock).reconcile(MAP).await.unwrap();

    assert_eq!(report.evaluated, 3);
    assert_eq!(report.address_errors().count(), 2);
    assert_eq!(report.apply_errors().count(), 0);
    assert!(matches!(
        &report.errors[0],
        WorkloadError::Address { workload, address, .. }
            if *workload == broken && address == "10.0.0.999"
    ));
    assert_eq!(report.corrected(), 1);
    assert_eq!(mock.label_value(&good, "loc").as_deref(), Some("NYC"));
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    let web = mock.add_workload("web01", "10.0.0.5", vec![sfo]);

    let options = ReconcileOptions { dry_run: true, concurrency: 1 };
    let report = Reconciler::new(mock.clone(), options).reconcile(MAP).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.corrections.len(), 1);
    assert!(!report.corrections[0].applied);
    assert_eq!(report.corrected(), 0);
    assert!(mock.update_calls().is_empty());
    assert_eq!(mock.label_value(&web, "loc").as_deref(), Some("SFO"));
}

#[tokio::test]
async fn test_concurrent_updates_keep_fetch_order() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    let hosts: Vec<String> = (1..=6)
        .map(|i| {
            let address = format!("10.0.0.{}", i);
            mock.add_workload(&format!("web{:02}", i), &address, vec![sfo.clone()])
        })
        .collect();
    mock.fail_updates_for(&hosts[2]);

    let options = ReconcileOptions { dry_run: false, concurrency: 3 };
    let report = Reconciler::new(mock.clone(), options).reconcile(MAP).await.unwrap();

    assert_eq!(report.corrected(), 5);
    let order: Vec<&str> = report.corrections.iter().map(|c| c.workload.as_str()).collect();
    let expected: Vec<&str> = hosts
        .iter()
        .filter(|h| **h != hosts[2])
        .map(String::as_str)
        .collect();
    assert_eq!(order, expected);
    assert_eq!(report.errors.len(), 1);
}

#[tokio::test]
async fn test_missing_ip_list_is_fatal() {
    let mock = setup();
    let sfo = mock.add_label("loc", "SFO");
    mock.add_workload("web01", "10.0.0.5", vec![sfo]);

    let result = reconciler(&mock).reconcile("NoSuchList").await;

    assert!(matches!(
        result,
        Err(SyncError::Fetch { source: PceError::NotFound(_), .. })
    ));
    assert!(mock.update_calls().is_empty());
}

#[tokio::test]
async fn test_fetch_failures_are_fatal() {
    for fetch in [
        MockPceClient::FETCH_IP_LIST,
        MockPceClient::FETCH_LABELS,
        MockPceClient::FETCH_WORKLOADS,
    ] {
        let mock = setup();
        let sfo = mock.add_label("loc", "SFO");
        mock.add_workload("web01", "10.0.0.5", vec![sfo]);
        mock.fail_fetch(fetch);

        let result = reconciler(&mock).reconcile(MAP).await;

        assert!(matches!(result, Err(SyncError::Fetch { .. })), "fetch {}", fetch);
        assert!(mock.update_calls().is_empty());
    }
}

#[tokio::test]
async fn test_malformed_subnet_is_fatal() {
    let mock = MockPceClient::new("https://pce.test:8443/api/v2");
    mock.add_ip_list(MAP, &[("10.0.0.0/24", "NYC"), ("garbage", "SFO")]);
    let sfo = mock.add_label("loc", "SFO");
    mock.add_workload("web01", "10.0.0.5", vec![sfo]);

    let result = reconciler(&mock).reconcile(MAP).await;

    assert!(matches!(result, Err(SyncError::SubnetParse { index: 1, .. })));
    assert!(mock.update_calls().is_empty());
}
