//! Facade behaviour against the in-memory ledger

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use aema_buffer::{AlgorandBuffer, BufferConfig, CancelSource, CancelToken};
use aema_core::{fulfills_schema, AemaError, ReconcileEvent, RejectReason, StateSchema};
use aema_crypto::generate_private_key_64;
use aema_client::LedgerClient;
use aema_test::{LedgerOp, MockLedger};
use aema_wire::TransactionKind;

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> BufferConfig {
    BufferConfig {
        min_sleep: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

async fn unmanaged(ledger: &Arc<MockLedger>) -> AlgorandBuffer<MockLedger> {
    let (buffer, probe) =
        AlgorandBuffer::with_config(ledger.clone(), &generate_private_key_64(), fast_config())
            .await
            .unwrap();
    assert!(probe.is_none());
    buffer
}

async fn managed(ledger: &Arc<MockLedger>) -> AlgorandBuffer<MockLedger> {
    let buffer = unmanaged(ledger).await;
    buffer.manage().unwrap();
    tokio::time::timeout(WAIT, buffer.wait_for_target())
        .await
        .unwrap();
    buffer
}

async fn wait_until_ready(buffer: &AlgorandBuffer<MockLedger>) {
    tokio::time::timeout(WAIT, async {
        while !buffer.is_ready() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

fn entries(n: usize) -> BTreeMap<String, String> {
    (0..n).map(|i| (format!("key{i:02}"), format!("value{i}"))).collect()
}

#[tokio::test]
async fn test_health_failure_still_builds() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_error(LedgerOp::HealthCheck, true);

    let (buffer, probe) = AlgorandBuffer::create(ledger, &generate_private_key_64())
        .await
        .unwrap();
    assert!(matches!(probe, Some(AemaError::HealthCheckFailed(_))));
    assert_ne!(buffer.address(), aema_core::Address::ZERO);
}

#[tokio::test]
async fn test_status_failure_still_builds() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_error(LedgerOp::Status, true);

    let (buffer, probe) = AlgorandBuffer::create(ledger, &generate_private_key_64())
        .await
        .unwrap();
    assert!(matches!(probe, Some(AemaError::StatusCheckFailed(_))));
    assert_ne!(buffer.address(), aema_core::Address::ZERO);
}

#[tokio::test]
async fn test_invalid_private_key() {
    let ledger = Arc::new(MockLedger::new());
    let result = AlgorandBuffer::create(ledger, "not a key").await;
    assert!(matches!(result, Err(AemaError::InvalidPrivateKey(_))));
}

#[tokio::test]
async fn test_blank_key_generates_account() {
    let ledger = Arc::new(MockLedger::new());
    let (buffer, probe) = AlgorandBuffer::create(ledger, "").await.unwrap();
    assert!(probe.is_none());
    assert_ne!(buffer.address(), aema_core::Address::ZERO);
}

#[tokio::test]
#[should_panic(expected = "before manage()")]
async fn test_get_storage_requires_manage() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    let _ = buffer.get_storage().await;
}

#[tokio::test]
#[should_panic(expected = "before manage()")]
async fn test_put_requires_manage() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    let _ = buffer.put_elements(entries(3)).await;
}

#[tokio::test]
#[should_panic(expected = "before manage()")]
async fn test_delete_requires_manage() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    let _ = buffer.delete_elements(["a"]).await;
}

#[tokio::test]
async fn test_manage_twice() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    assert!(matches!(buffer.manage(), Err(AemaError::AlreadyManaged)));
}

#[tokio::test]
async fn test_invalid_apps_replaced_by_one_oracle() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    let address = buffer.address();
    ledger.create_dummy_apps(&address, 6, 18, 32);

    let mut events = buffer.subscribe_events().unwrap();
    assert!(buffer.subscribe_events().is_none());
    buffer.manage().unwrap();

    let mut received = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .unwrap()
            .unwrap();
        received.push(event);
        if event.is_creation() {
            break;
        }
    }

    assert!(received.len() >= 2);
    assert_eq!(received.iter().filter(|e| e.is_creation()).count(), 1);
    assert_eq!(ledger.count(TransactionKind::Delete), 6);
    assert_eq!(ledger.count(TransactionKind::Create), 1);

    let info = ledger.account_information(&address).await.unwrap();
    assert_eq!(info.created_apps.len(), 1);
    assert!(fulfills_schema(&info.created_apps[0]));
    assert_eq!(
        tokio::time::timeout(WAIT, buffer.wait_for_target()).await.unwrap(),
        info.created_apps[0].id
    );
}

#[tokio::test]
async fn test_earliest_valid_app_survives() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    let address = buffer.address();
    let ids = ledger.create_dummy_apps(&address, 4, 0, 64);

    let mut events = buffer.subscribe_events().unwrap();
    buffer.manage().unwrap();
    let target = tokio::time::timeout(WAIT, buffer.wait_for_target())
        .await
        .unwrap();

    assert_eq!(target, ids[0]);
    assert_eq!(ledger.apps_of(&address), vec![ids[0]]);
    assert_eq!(ledger.count(TransactionKind::Create), 0);

    for _ in 0..3 {
        let event = events.try_recv().unwrap();
        assert!(matches!(event, ReconcileEvent::Deleted { app, .. } if app != ids[0]));
    }
}

#[tokio::test]
async fn test_mixed_apps_converge_to_earliest_valid() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    let address = buffer.address();
    let valid = ledger.create_dummy_apps(&address, 2, 0, 64);
    let invalid = ledger.create_dummy_apps(&address, 2, 0, 32);

    let mut events = buffer.subscribe_events().unwrap();
    buffer.manage().unwrap();
    let target = tokio::time::timeout(WAIT, buffer.wait_for_target())
        .await
        .unwrap();

    assert_eq!(target, valid[0]);
    assert_eq!(ledger.apps_of(&address), vec![valid[0]]);
    assert_eq!(ledger.count(TransactionKind::Delete), 3);
    assert_eq!(ledger.count(TransactionKind::Create), 0);

    // Foreign schemas go first, then the newer duplicate
    let deleted: Vec<_> = (0..3).map(|_| events.try_recv().unwrap().app()).collect();
    assert!(deleted[..2].contains(&invalid[0]));
    assert!(deleted[..2].contains(&invalid[1]));
    assert_eq!(deleted[2], valid[1]);
}

#[tokio::test]
async fn test_single_valid_app_kept_untouched() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    let address = buffer.address();
    let existing = ledger.seed_application(&address, StateSchema::new(0, 64));

    let mut events = buffer.subscribe_events().unwrap();
    buffer.manage().unwrap();
    let target = tokio::time::timeout(WAIT, buffer.wait_for_target())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(target, existing);
    assert_eq!(ledger.apps_of(&address), vec![existing]);
    assert!(ledger.transactions().is_empty());
    assert!(events.try_recv().is_err());

    let stats = buffer.stats();
    assert!(stats.passes >= 2);
    assert_eq!(stats.apps_created, 0);
    assert_eq!(stats.apps_deleted, 0);
    assert_eq!(stats.events_emitted, 0);
}

#[tokio::test]
async fn test_failing_delete_emits_nothing_and_keeps_running() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = unmanaged(&ledger).await;
    ledger.create_dummy_apps(&buffer.address(), 2, 1, 1);
    ledger.set_error(LedgerOp::DeleteApplication, true);

    let mut events = buffer.subscribe_events().unwrap();
    buffer.manage().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(events.try_recv().is_err());
    let stats = buffer.stats();
    assert!(stats.passes >= 2);
    assert_eq!(stats.failed_passes, stats.passes);
    assert!(buffer.is_ready());
    assert_eq!(buffer.target(), None);

    // The loop survived every failure and finishes the job once deletes work
    ledger.set_error(LedgerOp::DeleteApplication, false);
    tokio::time::timeout(WAIT, buffer.wait_for_target())
        .await
        .unwrap();
    assert!(events.try_recv().is_ok());
}

#[tokio::test]
async fn test_eighteen_entries_take_three_calls() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    let before = ledger.app_calls();

    buffer.put_elements(entries(18)).await.unwrap();

    assert_eq!(ledger.app_calls() - before, 3);
    let arg_counts: Vec<usize> = ledger
        .transactions()
        .iter()
        .filter(|txn| txn.kind() == TransactionKind::Call)
        .map(|txn| txn.app_args.len())
        .collect();
    assert_eq!(arg_counts[arg_counts.len() - 3..], [16, 16, 4]);
    assert_eq!(buffer.get_storage().await.unwrap().len(), 18);
    assert_eq!(buffer.stats().chunks_sent, 3);
}

#[tokio::test]
async fn test_put_then_get_round_trip() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;

    buffer
        .put_elements([("a", "1"), ("b", "2")])
        .await
        .unwrap();

    let storage = buffer.get_storage().await.unwrap();
    let expected: BTreeMap<Vec<u8>, Vec<u8>> = [
        (b"a".to_vec(), b"1".to_vec()),
        (b"b".to_vec(), b"2".to_vec()),
    ]
    .into_iter()
    .collect();
    assert_eq!(storage, expected);
}

#[tokio::test]
async fn test_delete_elements() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;

    buffer.put_elements(entries(20)).await.unwrap();
    let doomed: Vec<String> = (0..17).map(|i| format!("key{i:02}")).collect();
    let before = ledger.app_calls();
    buffer.delete_elements(&doomed).await.unwrap();

    assert_eq!(ledger.app_calls() - before, 2);
    let storage = buffer.get_storage().await.unwrap();
    assert_eq!(storage.len(), 3);
    assert!(storage.contains_key(b"key19".as_slice()));
    assert!(!storage.contains_key(b"key00".as_slice()));
}

#[tokio::test]
async fn test_failed_chunk_keeps_earlier_chunks() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    let before = ledger.app_calls();
    let attempts = ledger.attempts(LedgerOp::CallApplication);

    // 70 entries against 64 slots: the ninth chunk overflows
    let result = buffer.put_elements(entries(70)).await;

    assert!(matches!(
        result,
        Err(AemaError::ProgramRejected(RejectReason::SchemaExceeded))
    ));
    assert_eq!(ledger.app_calls() - before, 8);
    assert_eq!(ledger.attempts(LedgerOp::CallApplication) - attempts, 9);
    assert_eq!(buffer.stats().chunks_sent, 8);

    let storage = buffer.get_storage().await.unwrap();
    assert_eq!(storage.len(), 64);
    assert!(storage.contains_key(b"key63".as_slice()));
    assert!(!storage.contains_key(b"key64".as_slice()));
}

#[tokio::test]
async fn test_failed_delete_chunk_keeps_earlier_chunks() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    buffer.put_elements(entries(40)).await.unwrap();
    assert_eq!(buffer.stats().chunks_sent, 5);

    let keys: Vec<String> = entries(40).into_keys().collect();
    let before = ledger.app_calls();
    let attempts = ledger.attempts(LedgerOp::CallApplication);
    ledger.fail_after(LedgerOp::CallApplication, 1);

    let result = buffer.delete_elements(&keys).await;

    assert!(matches!(result, Err(AemaError::Client(_))));
    assert_eq!(ledger.app_calls() - before, 1);
    // The third chunk is never attempted
    assert_eq!(ledger.attempts(LedgerOp::CallApplication) - attempts, 2);
    assert_eq!(buffer.stats().chunks_sent, 6);

    ledger.clear_errors();
    let storage = buffer.get_storage().await.unwrap();
    assert_eq!(storage.len(), 24);
    assert!(!storage.contains_key(b"key15".as_slice()));
    assert!(storage.contains_key(b"key16".as_slice()));
}

#[tokio::test]
async fn test_oversize_entry_sends_nothing() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    let before = ledger.app_calls();

    let long_key = "k".repeat(65);
    let result = buffer.put_elements([(long_key.as_str(), "v")]).await;

    assert!(matches!(result, Err(AemaError::EntryTooLarge(_))));
    assert_eq!(ledger.app_calls(), before);
}

#[tokio::test]
async fn test_no_target_resource() {
    let ledger = Arc::new(MockLedger::new());
    ledger.set_error(LedgerOp::CreateApplication, true);
    let buffer = unmanaged(&ledger).await;
    buffer.manage().unwrap();
    wait_until_ready(&buffer).await;

    let result = buffer.put_elements(entries(1)).await;
    assert!(matches!(result, Err(AemaError::NoTargetResource)));
    assert!(matches!(
        buffer.get_storage().await,
        Err(AemaError::NoTargetResource)
    ));
}

#[tokio::test]
async fn test_precancelled_write_sends_nothing() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    let before = ledger.app_calls();

    let source = CancelSource::new();
    source.cancel();
    let result = buffer.put_elements_until(entries(4), &source.token()).await;

    assert!(matches!(result, Err(AemaError::Cancelled)));
    assert_eq!(ledger.app_calls(), before);
}

#[tokio::test]
async fn test_cancel_aborts_chunk_in_flight() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    let before = ledger.app_calls();
    ledger.set_latency(Duration::from_millis(500));

    let source = CancelSource::new();
    source.cancel_after(Duration::from_millis(50));
    let result = buffer
        .delete_elements_until(["a", "b"], &source.token())
        .await;

    assert!(matches!(result, Err(AemaError::Cancelled)));
    assert_eq!(ledger.app_calls(), before);
}

#[tokio::test]
async fn test_chunk_timeout() {
    let ledger = Arc::new(MockLedger::new());
    let config = BufferConfig {
        min_sleep: Duration::from_secs(60),
        timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let (buffer, _) = AlgorandBuffer::with_config(ledger.clone(), "", config)
        .await
        .unwrap();
    buffer.manage().unwrap();
    tokio::time::timeout(WAIT, buffer.wait_for_target())
        .await
        .unwrap();

    ledger.set_latency(Duration::from_millis(400));
    let result = buffer.put_elements_until(entries(2), &CancelToken::never()).await;
    assert!(matches!(result, Err(AemaError::Timeout)));
}

#[tokio::test]
async fn test_shutdown_stops_loop() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;

    tokio::time::timeout(WAIT, buffer.join()).await.unwrap();
    let passes = buffer.stats().passes;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(buffer.stats().passes, passes);
}

#[tokio::test]
async fn test_foreign_app_removed_while_managed() {
    let ledger = Arc::new(MockLedger::new());
    let buffer = managed(&ledger).await;
    let target = buffer.target().unwrap();
    let mut events = buffer.subscribe_events().unwrap();
    while events.try_recv().is_ok() {}

    let foreign = ledger.seed_application(&buffer.address(), StateSchema::new(2, 2));
    let event = tokio::time::timeout(WAIT, events.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(event.app(), foreign);
    assert_eq!(
        tokio::time::timeout(WAIT, buffer.wait_for_target()).await.unwrap(),
        target
    );
}
