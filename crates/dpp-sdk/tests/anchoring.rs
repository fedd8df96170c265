use std::sync::Arc;
use std::time::Duration;

use dpp_sdk::{
    Anchor, Attributes, ConfirmationPolicy, Digest, DynamicHashScheme, HashEngine, IntegrityStatus,
    InMemoryLedger, LedgerClient, LedgerError, Passport, RecordBook, RecordId, SdkError,
    SigningKey, Timestamp, Verdict, VerifyError,
};
use serde_json::{json, Value};

const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

async fn setup(scheme: DynamicHashScheme) -> (Arc<InMemoryLedger>, Anchor) {
    let ledger = Arc::new(InMemoryLedger::new(CONTRACT));
    ledger.set_confirm_after(2);
    let signer = SigningKey::generate();
    ledger.authorize(signer.verifying_key());
    let policy = ConfirmationPolicy {
        poll_interval: Duration::from_millis(1),
        timeout: Duration::from_secs(2),
    };
    let client = LedgerClient::open(ledger.clone(), signer, CONTRACT, policy)
        .await
        .unwrap();
    (ledger, Anchor::new(Arc::new(client), HashEngine::new(scheme)))
}

#[tokio::test]
async fn widget_end_to_end() {
    let (_, anchor) = setup(DynamicHashScheme::default()).await;
    let record = Passport::create(
        RecordId::encode("507f1f77bcf86cd799439011").unwrap(),
        "Widget",
        None,
        attrs(json!({"Origin": {"country": "ES"}})),
        vec![],
        Timestamp::from_unix_seconds(1_700_000_000).unwrap(),
    );

    let claim = anchor.save_master_hash(&record).await.unwrap();
    assert_eq!(
        claim,
        anchor
            .hasher()
            .master_hash("Widget", &record.current_attributes, 1_700_000_000)
    );

    let report = anchor.verify_master_hash(&record, claim).await.unwrap();
    assert!(report.is_valid());
    assert_eq!(report.computed, claim);
    assert_eq!(report.on_chain, claim);
    assert_eq!(report.claimed, claim);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["onChain"], claim.to_hex());
}

#[tokio::test]
async fn tamper_detection() {
    let (_, anchor) = setup(DynamicHashScheme::default()).await;
    let book = RecordBook::new();
    let origin = attrs(json!({"Origin": {"country": "ES"}}));
    let mut record = book.create("Widget", Some("SN-7".into()), origin, vec![]);
    anchor.anchor_created(&mut record).await.unwrap();
    let claim = record.master_hash.unwrap();

    let mut tampered = record.clone();
    tampered.current_attributes["Origin"]["country"] = json!("FR");
    let report = anchor.verify_master_hash(&tampered, claim).await.unwrap();
    assert_eq!(report.verdict, Verdict::Mismatch);
    assert_ne!(report.computed, claim);
    assert_eq!(report.on_chain, claim);
    assert_eq!(report.claimed, claim);
    assert_eq!(IntegrityStatus::of(&Ok(report)), IntegrityStatus::Mismatch);
}

#[tokio::test]
async fn full_lifecycle_through_record_book() {
    let (ledger, anchor) = setup(DynamicHashScheme::default()).await;
    let book = RecordBook::new();

    let chemistry = attrs(json!({"Chemistry": {"type": "LFP"}}));
    let mut record = book.create("Battery", None, chemistry, vec![]);
    let created = anchor.anchor_created(&mut record).await.unwrap();
    book.put(record.clone()).unwrap();

    let mut record = book
        .append_version(&record.id, attrs(json!({"Chemistry": {"type": "NMC"}})), vec![])
        .unwrap();
    assert!(record.dynamic_hash.is_none());
    let updated = anchor.anchor_new_version(&mut record).await.unwrap();
    book.put(record.clone()).unwrap();

    assert_eq!(updated.version, 2);
    assert_ne!(updated.dynamic_hash, created.dynamic_hash);
    assert_eq!(ledger.pending_count(), 0);

    let all = anchor.get_version_hashes(&record.id).await.unwrap();
    assert_eq!(all.versions, vec![1, 2]);
    assert_eq!(all.hashes, vec![created.version_hash, updated.version_hash]);

    let stored = book.get(&record.id).unwrap();
    for n in 1..=2 {
        let claim = stored.version(n).and_then(|v| v.version_hash).unwrap();
        assert!(anchor.verify_version_hash(&stored, claim, n).await.unwrap().is_valid());
    }
    let dynamic = stored.dynamic_hash.unwrap();
    assert!(anchor.verify_dynamic_hash(&stored.id, dynamic).await.unwrap().is_valid());
    assert!(anchor
        .verify_master_hash(&stored, stored.master_hash.unwrap())
        .await
        .unwrap()
        .is_valid());
}

#[tokio::test]
async fn version_sequencing() {
    let (_, anchor) = setup(DynamicHashScheme::default()).await;
    let book = RecordBook::new();
    let mut record = book.create("Widget", None, Attributes::new(), vec![]);
    anchor.anchor_created(&mut record).await.unwrap();

    let err = anchor.get_version_hash(&record.id, 3).await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::Ledger(LedgerError::RecordNotFound { version: Some(3), .. })
    ));
}

#[tokio::test]
async fn dynamic_with_timestamp_round_trip() {
    let (_, anchor) = setup(DynamicHashScheme::WithTimestamp).await;
    let book = RecordBook::new();
    let mut record = book.create("Widget", None, attrs(json!({"A": {"b": 1.5}})), vec![]);
    let summary = anchor.anchor_created(&mut record).await.unwrap();

    let stored = anchor.get_dynamic_hash(&record.id).await.unwrap();
    assert_eq!(stored.hash, summary.dynamic_hash);
    assert_eq!(stored.timestamp, record.updated_at.unix_seconds().unwrap());
    assert!(anchor
        .verify_dynamic_hash(&record.id, summary.dynamic_hash)
        .await
        .unwrap()
        .is_valid());
}

#[tokio::test]
async fn ledger_inconsistency_detected() {
    let (ledger, anchor) = setup(DynamicHashScheme::default()).await;
    let book = RecordBook::new();
    let mut record = book.create("Widget", None, Attributes::new(), vec![]);
    let summary = anchor.anchor_created(&mut record).await.unwrap();

    ledger.inject_master_hash(record.id, 1, Digest::from_hash([0x42; 32]));
    let result = anchor.verify_dynamic_hash(&record.id, summary.dynamic_hash).await;
    assert_eq!(IntegrityStatus::of(&result), IntegrityStatus::Mismatch);
}

#[tokio::test]
async fn undetermined_integrity_is_error() {
    let (_, anchor) = setup(DynamicHashScheme::default()).await;
    let record = RecordBook::new().create("Ghost", None, Attributes::new(), vec![]);
    let result = anchor.verify_master_hash(&record, Digest::zero()).await;
    assert!(matches!(
        result,
        Err(VerifyError::Ledger(LedgerError::RecordNotFound { .. }))
    ));
    assert!(matches!(IntegrityStatus::of(&result), IntegrityStatus::Error(_)));
}

#[tokio::test]
async fn concurrent_updates_to_different_records() {
    let (_, anchor) = setup(DynamicHashScheme::default()).await;
    let anchor = Arc::new(anchor);
    let book = RecordBook::new();

    let mut handles = Vec::new();
    for i in 0..4 {
        let content = attrs(json!({"n": {"i": i}}));
        let mut record = book.create(format!("Item {i}"), None, content, vec![]);
        let anchor = anchor.clone();
        handles.push(tokio::spawn(async move {
            anchor.anchor_created(&mut record).await.map(|s| (record, s))
        }));
    }
    for handle in handles {
        let (record, summary) = handle.await.unwrap().unwrap();
        assert!(anchor
            .verify_dynamic_hash(&record.id, summary.dynamic_hash)
            .await
            .unwrap()
            .is_valid());
    }
}

#[tokio::test]
async fn confirmation_timeout_surfaces() {
    let ledger = Arc::new(InMemoryLedger::new(CONTRACT));
    ledger.set_stalled(true);
    let policy = ConfirmationPolicy {
        poll_interval: Duration::from_millis(2),
        timeout: Duration::from_millis(50),
    };
    let client = LedgerClient::open(ledger, SigningKey::generate(), CONTRACT, policy)
        .await
        .unwrap();
    let anchor = Anchor::new(Arc::new(client), HashEngine::default());
    let mut record = RecordBook::new().create("Widget", None, Attributes::new(), vec![]);

    let err = anchor.anchor_created(&mut record).await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::Ledger(LedgerError::ConfirmationTimeout { .. })
    ));
    assert!(record.master_hash.is_none());
}
