use super::*;
use k8s_openapi::api::core::v1 as corev1;
use kube::api::{ObjectMeta, WatchEvent};
use std::net::IpAddr;

#[test]
fn last_applied_record_wins_per_address() {
    let index = Index::shared();
    let metrics = Metrics::default();

    Watcher::process(&index, &metrics, WatchEvent::Added(mk_pod("ns-0", "pod-0", "10.0.0.1")))
        .unwrap();
    Watcher::process(&index, &metrics, WatchEvent::Added(mk_pod("ns-0", "pod-1", "10.0.0.2")))
        .unwrap();

    // The address is reassigned to a new pod without an intervening delete;
    // the newer record supersedes the old one.
    Watcher::process(
        &index,
        &metrics,
        WatchEvent::Modified(mk_pod("ns-0", "pod-2", "10.0.0.1")),
    )
    .unwrap();

    let meta = index.read().lookup(&ip("10.0.0.1")).expect("address must resolve");
    assert_eq!(meta.name, "pod-2");
    assert_eq!(index.read().lookup(&ip("10.0.0.2")).unwrap().name, "pod-1");
    assert_eq!(index.read().len(), 2);
}

#[test]
fn delete_of_absent_address_is_a_noop() {
    let index = Index::shared();
    let metrics = Metrics::default();

    Watcher::process(
        &index,
        &metrics,
        WatchEvent::Deleted(mk_pod("ns-0", "pod-0", "10.0.0.9")),
    )
    .unwrap();

    assert_eq!(index.read().lookup(&ip("10.0.0.9")), None);
    assert_eq!(index.read().len(), 0);
}

#[test]
fn count_tracks_live_entries() {
    let index = Index::shared();
    let metrics = Metrics::default();

    for i in 0..5 {
        let addr = format!("10.0.0.{i}");
        Watcher::process(
            &index,
            &metrics,
            WatchEvent::Added(mk_pod("ns-0", &format!("pod-{i}"), &addr)),
        )
        .unwrap();
    }
    assert_eq!(index.read().len(), 5);

    for i in 0..2 {
        let addr = format!("10.0.0.{i}");
        Watcher::process(
            &index,
            &metrics,
            WatchEvent::Deleted(mk_pod("ns-0", &format!("pod-{i}"), &addr)),
        )
        .unwrap();
    }
    assert_eq!(index.read().len(), 3);
}

#[test]
fn namespace_filter_selects_exact_subset() {
    let index = Index::shared();
    let metrics = Metrics::default();

    Watcher::populate(
        &index,
        &metrics,
        vec![
            mk_pod("default", "pod-0", "10.0.0.1"),
            mk_pod("default", "pod-1", "10.0.0.2"),
            mk_pod("kube-system", "pod-2", "10.0.0.3"),
        ],
    );

    let all = index.read().pods(None);
    assert_eq!(all.len(), 3);

    let filtered = index.read().pods(Some("default"));
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|meta| meta.namespace == "default"));
    assert!(filtered.iter().all(|meta| all.contains(meta)));

    assert!(index.read().pods(Some("no-such-namespace")).is_empty());
}

#[test]
fn resnapshot_is_idempotent() {
    let index = Index::shared();
    let metrics = Metrics::default();
    let pods = vec![
        mk_pod("default", "pod-0", "10.0.0.1"),
        mk_pod("kube-system", "pod-1", "10.0.0.2"),
    ];

    Watcher::populate(&index, &metrics, pods.clone());
    let mut before = index.read().pods(None);
    before.sort_by(|a, b| a.pod_ip.cmp(&b.pod_ip));

    Watcher::populate(&index, &metrics, pods);
    let mut after = index.read().pods(None);
    after.sort_by(|a, b| a.pod_ip.cmp(&b.pod_ip));

    assert_eq!(before, after);
}

#[test]
fn addressless_pods_cause_no_mutation() {
    let index = Index::shared();
    let metrics = Metrics::default();

    Watcher::populate(
        &index,
        &metrics,
        vec![mk_pod("default", "pod-0", "10.0.0.1"), mk_pending_pod("default", "pod-1")],
    );
    assert_eq!(index.read().len(), 1);

    Watcher::process(
        &index,
        &metrics,
        WatchEvent::Added(mk_pending_pod("default", "pod-2")),
    )
    .unwrap();
    Watcher::process(
        &index,
        &metrics,
        WatchEvent::Deleted(mk_pending_pod("default", "pod-3")),
    )
    .unwrap();
    assert_eq!(index.read().len(), 1);
}

/// Snapshots two pods, queries them, then deletes one: the scenario a fresh
/// process runs through on its first cycle.
#[test]
fn snapshot_then_delete_round_trip() {
    let index = Index::shared();
    let metrics = Metrics::default();

    Watcher::populate(
        &index,
        &metrics,
        vec![
            mk_pod("default", "a", "10.0.0.1"),
            mk_pod("kube-system", "b", "10.0.0.2"),
        ],
    );
    assert_eq!(index.read().len(), 2);

    let filtered = index.read().pods(Some("default"));
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "a");

    let meta = index.read().lookup(&ip("10.0.0.2")).expect("address must resolve");
    assert_eq!(meta.name, "b");
    assert_eq!(meta.namespace, "kube-system");

    Watcher::process(
        &index,
        &metrics,
        WatchEvent::Deleted(mk_pod("default", "a", "10.0.0.1")),
    )
    .unwrap();
    assert_eq!(index.read().len(), 1);
    assert_eq!(index.read().lookup(&ip("10.0.0.1")), None);
}

#[test]
fn watch_error_ends_the_stream() {
    let index = Index::shared();
    let metrics = Metrics::default();

    let error = kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: "too old resource version".to_string(),
        reason: "Expired".to_string(),
        code: 410,
    };
    assert!(Watcher::process(&index, &metrics, WatchEvent::Error(error)).is_err());
}

fn ip(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}

fn mk_pod(ns: &str, name: &str, addr: &str) -> corev1::Pod {
    corev1::Pod {
        metadata: ObjectMeta {
            namespace: Some(ns.to_string()),
            name: Some(name.to_string()),
            uid: Some(format!("{ns}/{name}")),
            ..Default::default()
        },
        spec: Some(corev1::PodSpec {
            containers: vec![corev1::Container {
                name: "main".to_string(),
                image: Some("example.com/app:v1".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: Some(corev1::PodStatus {
            pod_ip: Some(addr.to_string()),
            phase: Some("Running".to_string()),
            ..Default::default()
        }),
    }
}

fn mk_pending_pod(ns: &str, name: &str) -> corev1::Pod {
    let mut pod = mk_pod(ns, name, "");
    pod.status = Some(corev1::PodStatus {
        phase: Some("Pending".to_string()),
        ..Default::default()
    });
    pod
}
