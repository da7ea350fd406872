use std::sync::Arc;

use acp_ledger::{Database, LedgerError, LedgerSigner, MemoryChain, TxStatus};
use acp_types::JobStatus;

const CHR_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const BUYER: &str = "0x1234567890abcdef1234567890abcdef12345678";

fn database() -> (Database, MemoryChain) {
    let chain = MemoryChain::new();
    let signer = LedgerSigner::from_hex(CHR_KEY).unwrap();
    (Database::new(Arc::new(chain.clone()), signer), chain)
}

#[tokio::test]
async fn test_create_job_starts_pending() {
    let (db, _chain) = database();
    let result = serde_json::json!({"response": "ok", "is_success": true}).to_string();

    let receipt = db.create_job("1001", BUYER, &result).await.unwrap();
    assert_eq!(receipt.status, TxStatus::Confirmed);

    let record = db.get_job("1001").await.unwrap().unwrap();
    assert_eq!(record.id, "1001");
    assert_eq!(record.evm_address, BUYER);
    assert_eq!(record.result, result);
    assert_eq!(record.status, JobStatus::Pending);
    assert_eq!(db.total_jobs().await.unwrap(), 1);
}

#[tokio::test]
async fn test_get_missing_job_is_none() {
    let (db, _chain) = database();
    assert!(db.get_job("404").await.unwrap().is_none());
    assert!(db.get_all_jobs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_strings_map_to_codes() {
    let (db, _chain) = database();
    db.create_job("7", BUYER, "{}").await.unwrap();

    for (name, expected) in [
        ("COMPLETED", JobStatus::Completed),
        ("REJECTED", JobStatus::Rejected),
        ("PENDING", JobStatus::Pending),
    ] {
        db.update_job_status("7", name).await.unwrap();
        let record = db.get_job("7").await.unwrap().unwrap();
        assert_eq!(record.status, expected);
        assert_eq!(record.status.code(), expected.code());
    }
}

#[tokio::test]
async fn test_invalid_status_never_reaches_chain() {
    let (db, chain) = database();
    db.create_job("7", BUYER, "{}").await.unwrap();
    let sent_before = chain.transaction_count();
    let queried_before = chain.query_count();

    let err = db.update_job_status("7", "archived").await.unwrap_err();
    assert_eq!(
        err,
        LedgerError::InvalidStatus {
            status: "archived".to_string()
        }
    );
    assert_eq!(chain.transaction_count(), sent_before);
    assert_eq!(chain.query_count(), queried_before);
    assert_eq!(
        db.get_job("7").await.unwrap().unwrap().status,
        JobStatus::Pending
    );
}

#[tokio::test]
async fn test_repeated_status_update_overwrites() {
    let (db, _chain) = database();
    db.create_job("9", BUYER, "{}").await.unwrap();

    db.update_job_status("9", "COMPLETED").await.unwrap();
    db.update_job_status("9", "COMPLETED").await.unwrap();

    let jobs = db.get_all_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Completed);
    assert_eq!(db.total_jobs().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_of_unknown_job_is_rejected() {
    let (db, _chain) = database();
    let err = db.update_job_status("missing", "COMPLETED").await.unwrap_err();
    assert!(matches!(err, LedgerError::Rejected { .. }));
}

#[tokio::test]
async fn test_duplicate_create_is_rejected() {
    let (db, _chain) = database();
    db.create_job("5", BUYER, "{}").await.unwrap();
    let err = db.create_job("5", BUYER, "{}").await.unwrap_err();
    assert!(matches!(err, LedgerError::Rejected { .. }));
    assert_eq!(db.total_jobs().await.unwrap(), 1);
}

#[tokio::test]
async fn test_transport_failure_surfaces() {
    let (db, chain) = database();
    chain.fail_next(1);

    let err = db.create_job("3", BUYER, "{}").await.unwrap_err();
    assert!(matches!(err, LedgerError::Transport { .. }));

    // next call goes through
    db.create_job("3", BUYER, "{}").await.unwrap();
    assert_eq!(chain.applied_transactions().await.len(), 1);
}
