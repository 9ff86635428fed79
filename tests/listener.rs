//! Listener integration tests: handshakes, stream merging, failure policy.

#![cfg(unix)]

mod common;

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use devgate::{
    Bus, FailurePolicy, GatewayConfig, GatewayError, Listener, Record, WorkerRoster,
};

const WAIT: Duration = Duration::from_secs(5);

struct Rig {
    listener: Listener,
    token: CancellationToken,
    records: mpsc::Receiver<Record>,
    faults: mpsc::Receiver<GatewayError>,
    attach: Result<(), GatewayError>,
}

async fn attach(cfg: &GatewayConfig) -> Rig {
    let bus = Bus::new(cfg.bus_capacity);
    let roster = WorkerRoster::new();
    roster.spawn_listener(bus.subscribe());

    let mut listener = Listener::new(cfg, bus, roster);
    let token = CancellationToken::new();
    let (records_tx, records_rx) = mpsc::channel(cfg.channel_capacity);
    let (faults_tx, faults_rx) = mpsc::channel(16);
    let attach = listener.attach_all(&token, records_tx, faults_tx).await;

    Rig {
        listener,
        token,
        records: records_rx,
        faults: faults_rx,
        attach,
    }
}

async fn teardown(mut rig: Rig) {
    rig.token.cancel();
    let _ = rig.listener.close(Duration::from_secs(3)).await;
}

#[tokio::test]
async fn test_records_preserve_emission_order() {
    let dir = tempfile::tempdir().unwrap();
    let module = common::worker_script(
        &dir,
        "worker",
        &common::ready_worker(&[r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#]),
    );
    let cfg = common::test_config(vec![common::device("tmr:///dev/ttyACM1", &module)]);

    let mut rig = attach(&cfg).await;
    rig.attach.as_ref().unwrap();

    for expected in 1..=3 {
        let record = timeout(WAIT, rig.records.recv()).await.unwrap().unwrap();
        assert_eq!(record.payload, json!({"n": expected}));
        assert_eq!(&*record.device, "tmr:///dev/ttyACM1");
    }

    teardown(rig).await;
}

#[tokio::test]
async fn test_merges_all_ready_workers() {
    let dir = tempfile::tempdir().unwrap();
    let body = common::ready_worker(&[r#"{"value":1}"#]);
    let devices = (1..=3)
        .map(|i| {
            let module = common::worker_script(&dir, &format!("worker{i}"), &body);
            common::device(&format!("tmr:///dev/ttyACM{i}"), &module)
        })
        .collect();
    let cfg = common::test_config(devices);

    let mut rig = attach(&cfg).await;
    rig.attach.as_ref().unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let record = timeout(WAIT, rig.records.recv()).await.unwrap().unwrap();
        assert_eq!(record.payload, json!({"value": 1}));
        seen.push(record.device.to_string());
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 3, "each worker contributes exactly once");

    teardown(rig).await;
}

#[tokio::test]
async fn test_error_reply_fails_attach() {
    let dir = tempfile::tempdir().unwrap();
    let module = common::worker_script(&dir, "worker", &common::error_worker("no such device"));
    let cfg = common::test_config(vec![common::device("tmr:///dev/ttyACM1", &module)]);

    let rig = attach(&cfg).await;
    match &rig.attach {
        Err(GatewayError::Handshake { device, reason }) => {
            assert_eq!(device, "tmr:///dev/ttyACM1");
            assert!(reason.contains("no such device"), "reason: {reason}");
        }
        other => panic!("expected handshake error, got {other:?}"),
    }

    teardown(rig).await;
}

#[tokio::test]
async fn test_missing_ready_hits_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let module = common::worker_script(&dir, "worker", &common::silent_worker());
    let mut cfg = common::test_config(vec![common::device("tmr:///dev/ttyACM1", &module)]);
    cfg.handshake_timeout_ms = 300;

    let rig = attach(&cfg).await;
    match &rig.attach {
        Err(GatewayError::Handshake { reason, .. }) => {
            assert!(reason.contains("no ready"), "reason: {reason}");
        }
        other => panic!("expected handshake deadline, got {other:?}"),
    }

    teardown(rig).await;
}

#[tokio::test]
async fn test_exit_before_reply_fails_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let module = common::worker_script(&dir, "worker", &common::eof_worker());
    let cfg = common::test_config(vec![common::device("tmr:///dev/ttyACM1", &module)]);

    let rig = attach(&cfg).await;
    match &rig.attach {
        Err(GatewayError::Handshake { device, reason }) => {
            assert_eq!(device, "tmr:///dev/ttyACM1");
            assert!(reason.contains("closed"), "reason: {reason}");
        }
        other => panic!("expected handshake error, got {other:?}"),
    }

    teardown(rig).await;
}

#[tokio::test]
async fn test_unknown_replies_skipped_before_ready() {
    let dir = tempfile::tempdir().unwrap();
    let module =
        common::worker_script(&dir, "worker", &common::chatty_worker(&[r#"{"value":1}"#]));
    let cfg = common::test_config(vec![common::device("tmr:///dev/ttyACM1", &module)]);

    let mut rig = attach(&cfg).await;
    rig.attach.as_ref().unwrap();

    let record = timeout(WAIT, rig.records.recv()).await.unwrap().unwrap();
    assert_eq!(record.payload, json!({"value": 1}));

    teardown(rig).await;
}

#[tokio::test]
async fn test_spawn_failure_is_reported() {
    let cfg = common::test_config(vec![common::device(
        "tmr:///dev/ttyACM1",
        std::path::Path::new("/nonexistent/devgate-no-such-module"),
    )]);

    let rig = attach(&cfg).await;
    assert!(matches!(rig.attach, Err(GatewayError::Spawn { .. })));

    teardown(rig).await;
}

#[tokio::test]
async fn test_decode_failure_fails_fast_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let module =
        common::worker_script(&dir, "worker", &common::ready_worker(&["this is not json"]));
    let cfg = common::test_config(vec![common::device("tmr:///dev/ttyACM1", &module)]);
    assert_eq!(cfg.on_failure, FailurePolicy::FailFast);

    let mut rig = attach(&cfg).await;
    rig.attach.as_ref().unwrap();

    let fault = timeout(WAIT, rig.faults.recv()).await.unwrap().unwrap();
    match fault {
        GatewayError::Decode { device, .. } => assert_eq!(device, "tmr:///dev/ttyACM1"),
        other => panic!("expected decode fault, got {other:?}"),
    }

    teardown(rig).await;
}

#[tokio::test]
async fn test_decode_failure_isolated_keeps_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let bad = common::worker_script(&dir, "bad", &common::ready_worker(&["not json"]));
    let good = common::worker_script(&dir, "good", &common::ready_worker(&[r#"{"ok":1}"#]));
    let mut cfg = common::test_config(vec![
        common::device("tmr:///dev/ttyACM1", &bad),
        common::device("tmr:///dev/ttyACM2", &good),
    ]);
    cfg.on_failure = FailurePolicy::Isolate;

    let mut rig = attach(&cfg).await;
    rig.attach.as_ref().unwrap();

    // the sibling still streams
    loop {
        let record = timeout(WAIT, rig.records.recv()).await.unwrap().unwrap();
        if &*record.device == "tmr:///dev/ttyACM2" {
            assert_eq!(record.payload, json!({"ok": 1}));
            break;
        }
    }

    // and no fault reaches the gateway
    assert!(
        timeout(Duration::from_millis(500), rig.faults.recv())
            .await
            .is_err(),
        "isolated failure must not produce a gateway fault"
    );

    teardown(rig).await;
}

#[tokio::test]
async fn test_close_joins_all_workers() {
    let dir = tempfile::tempdir().unwrap();
    let body = common::ready_worker(&[]);
    let devices = (1..=2)
        .map(|i| {
            let module = common::worker_script(&dir, &format!("worker{i}"), &body);
            common::device(&format!("tmr:///dev/ttyACM{i}"), &module)
        })
        .collect();
    let cfg = common::test_config(devices);

    let mut rig = attach(&cfg).await;
    rig.attach.as_ref().unwrap();

    rig.token.cancel();
    rig.listener
        .close(Duration::from_secs(3))
        .await
        .expect("workers must close within grace");
}
