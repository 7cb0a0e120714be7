//! Architectural Contract Test: Idempotency
//!
//! Reconciling the same mapping twice must leave the table exactly as the
//! first pass did, and a second update run must not rewrite the store.
//!
//! Constraints verified:
//! - reconcile(m, reconcile(m, t)) == reconcile(m, t)
//! - An unchanged table is never saved
//! - File round-trips do not drift
//! - Names the hosts file cannot hold never reach it, so a second run over
//!   the same snapshot changes nothing

mod common;

use common::*;
use hosts_core::{
    Entry, FileTableStore, HardwareAddr, Host, Mapping, NamePolicy, Table, TableStore, Updater,
    UpdaterConfig, reconcile,
};

fn tables() -> Vec<Table> {
    vec![
        Table::new(),
        Table::from_entries(vec![Entry::new("localhost", ip("127.0.0.1"))]),
        Table::from_entries(vec![
            Entry::disabled("TV", ip("192.168.1.30")),
            Entry::new("a", ip("192.168.1.31")),
            Entry::new("b", ip("192.168.1.31")),
            Entry::new("B", ip("192.168.1.31")),
        ]),
    ]
}

fn mappings() -> Vec<Mapping> {
    vec![
        Mapping::new(),
        [("tv", ip("192.168.1.30"))].into_iter().collect(),
        [
            ("b", ip("192.168.1.31")),
            ("laptop", ip("192.168.1.32")),
            ("", ip("192.168.1.33")),
        ]
        .into_iter()
        .collect(),
        [("same-ip-1", ip("10.1.1.1")), ("same-ip-2", ip("10.1.1.1"))]
            .into_iter()
            .collect(),
    ]
}

#[test]
fn second_reconcile_is_a_no_op() {
    for table in tables() {
        for mapping in mappings() {
            let mut once = table.clone();
            reconcile(&mapping, &mut once);

            let mut twice = once.clone();
            reconcile(&mapping, &mut twice);

            assert_eq!(once, twice, "mapping {:?} over {:?}", mapping, table);
        }
    }
}

#[tokio::test]
async fn repeated_update_saves_once() {
    let (registry, calls) = scripted_registry(Script::Hosts(vec![
        Host::new("laptop", ip("192.168.1.32")),
        Host::new("phone", ip("192.168.1.33")),
    ]));
    let store = RecordingStore::new(vec![Entry::new("localhost", ip("127.0.0.1"))]);
    let updater = Updater::new(&registry, Box::new(store.clone()), UpdaterConfig::new());

    let first = updater.update(&scripted_config()).await.expect("first run");
    let second = updater.update(&scripted_config()).await.expect("second run");

    assert!(first.saved);
    assert_eq!(first.changes.len(), 2);
    assert!(!second.saved);
    assert!(second.is_unchanged());
    assert_eq!(store.save_count(), 1);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(first.table, second.table);
}

#[tokio::test]
async fn file_round_trip_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hosts");
    std::fs::write(
        &path,
        "# managed by hand\n127.0.0.1\tlocalhost\n# 192.168.1.30\ttv\n192.168.1.31 phone\n",
    )
    .expect("write hosts");

    let store = FileTableStore::new(&path);
    let mut table = store.load().await.expect("load");
    let mapping: Mapping = [("tv", ip("192.168.1.30"))].into_iter().collect();
    reconcile(&mapping, &mut table);
    store.save(&table).await.expect("save");
    let written = std::fs::read_to_string(&path).expect("read back");

    let reloaded = FileTableStore::new(&path);
    let table_again = reloaded.load().await.expect("reload");
    assert_eq!(table, table_again);
    reloaded.save(&table_again).await.expect("save again");

    assert_eq!(std::fs::read_to_string(&path).expect("read back"), written);
    assert!(written.starts_with("# managed by hand\n"));
    assert!(written.contains("192.168.1.30\ttv\n"));
    assert!(!written.contains("# 192.168.1.30"));
}

#[tokio::test]
async fn second_update_through_hosts_file_changes_nothing() {
    let media: HardwareAddr = "aa:bb:cc:dd:ee:07".parse().expect("mac");
    let hosts = vec![
        Host::new("Living Room TV", ip("10.0.0.5")),
        Host::new("tv#2", ip("10.0.0.6")),
        Host::new("android-1234", ip("10.0.0.7")).with_hardware(media),
        Host::new("nas", ip("10.0.0.8")),
    ];

    let cases = [
        (
            NamePolicy::new().with_override(media, "Media Box"),
            "127.0.0.1\tlocalhost\n10.0.0.5\tLiving-Room-TV\n10.0.0.7\tMedia-Box\n10.0.0.8\tnas\n",
        ),
        (
            NamePolicy::new()
                .with_override(media, "Media Box")
                .with_replace_whitespace(false),
            "127.0.0.1\tlocalhost\n10.0.0.8\tnas\n",
        ),
    ];

    for (policy, expected) in cases {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hosts");
        std::fs::write(&path, "127.0.0.1\tlocalhost\n").expect("write hosts");

        let (registry, _) = scripted_registry(Script::Hosts(hosts.clone()));
        let updater = Updater::new(
            &registry,
            Box::new(FileTableStore::new(&path)),
            UpdaterConfig::new().with_name_policy(policy.clone()),
        );

        let first = updater.update(&scripted_config()).await.expect("first run");
        let written = std::fs::read_to_string(&path).expect("read back");
        assert!(first.saved);
        assert_eq!(written, expected, "policy {:?}", policy);

        let second = updater.update(&scripted_config()).await.expect("second run");
        assert!(
            second.is_unchanged(),
            "policy {:?} drifted: {:?}",
            policy,
            second.changes
        );
        assert!(!second.saved);
        assert_eq!(second.table, first.table);
        assert_eq!(std::fs::read_to_string(&path).expect("read back"), written);
    }
}
