//! Audit chain business logic - Tamper-evident, append-only log of mutations.
//!
//! Every entry stores the hash of the entry before it, and its own hash is computed
//! over that previous hash plus the entry's data. Editing any stored entry therefore
//! breaks either its own hash or the link from its successor, which `verify_chain`
//! detects.
//!
//! The tail hash is re-read from the database on every append; nothing is cached in
//! process memory. The read-tail-then-insert sequence is serialised by a process-wide
//! lock, and the unique `prev_hash` column (plus a single-genesis index) rejects a
//! second writer that raced on the same tail, including the empty tail.

use crate::{
    entities::{AuditLog, audit_log},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

static CHAIN_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Outcome of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    /// True when every link and every hash checks out
    pub valid: bool,
    /// Number of entries confirmed before the first break (all of them when valid)
    pub entries_verified: usize,
    /// ID of the first entry that failed verification
    pub first_break: Option<i64>,
}

/// Acquires the chain lock.
///
/// Hold the guard from before the tail is read until the transaction that inserts
/// the new entry has committed.
pub async fn lock_chain() -> MutexGuard<'static, ()> {
    CHAIN_LOCK.lock().await
}

/// SHA-256 over `prev_hash ‖ data`, hex encoded. An absent `prev_hash` hashes as
/// the empty string.
#[must_use]
pub fn compute_hash(prev_hash: Option<&str>, data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.unwrap_or_default().as_bytes());
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Returns the `record_hash` of the most recently inserted entry, or `None` for an
/// empty log.
pub async fn last_hash<C>(db: &C) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let last = AuditLog::find()
        .order_by_desc(audit_log::Column::Id)
        .one(db)
        .await?;
    Ok(last.map(|entry| entry.record_hash))
}

/// Appends an entry using the caller's connection or transaction.
///
/// The caller must hold [`lock_chain`] until its transaction commits; this is how
/// product and movement creation make the mutation and its audit entry atomic.
pub async fn append_in<C>(db: &C, data: &str) -> Result<audit_log::Model>
where
    C: ConnectionTrait,
{
    let prev_hash = last_hash(db).await?;
    let record_hash = compute_hash(prev_hash.as_deref(), data);

    let entry = audit_log::ActiveModel {
        prev_hash: Set(prev_hash),
        record_hash: Set(record_hash),
        data: Set(data.to_string()),
        timestamp: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let entry = entry.insert(db).await?;
    debug!(id = entry.id, hash = %entry.record_hash, "audit entry appended");
    Ok(entry)
}

/// Appends a standalone entry describing `data` and returns it.
///
/// # Errors
/// Returns an error if the audit store cannot be read or written. Nothing is
/// appended in that case.
pub async fn append(db: &DatabaseConnection, data: &str) -> Result<audit_log::Model> {
    let _guard = lock_chain().await;
    let txn = db.begin().await?;
    let entry = append_in(&txn, data).await?;
    txn.commit().await?;
    Ok(entry)
}

/// Retrieves every entry in insertion order.
pub async fn list_entries(db: &DatabaseConnection) -> Result<Vec<audit_log::Model>> {
    AuditLog::find()
        .order_by_asc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Walks `entries` (in insertion order) and stops at the first broken link or hash.
#[must_use]
pub fn verify_entries(entries: &[audit_log::Model]) -> ChainVerification {
    let mut expected_prev: Option<&str> = None;

    for (index, entry) in entries.iter().enumerate() {
        let linked = entry.prev_hash.as_deref() == expected_prev;
        let sealed = compute_hash(entry.prev_hash.as_deref(), &entry.data) == entry.record_hash;

        if !linked || !sealed {
            return ChainVerification {
                valid: false,
                entries_verified: index,
                first_break: Some(entry.id),
            };
        }

        expected_prev = Some(entry.record_hash.as_str());
    }

    ChainVerification {
        valid: true,
        entries_verified: entries.len(),
        first_break: None,
    }
}

/// Verifies the stored chain. An empty chain is valid.
pub async fn verify_chain(db: &DatabaseConnection) -> Result<bool> {
    let entries = list_entries(db).await?;
    let verification = verify_entries(&entries);

    if let Some(id) = verification.first_break {
        warn!(
            entry_id = id,
            verified = verification.entries_verified,
            "audit chain verification failed"
        );
    }

    Ok(verification.valid)
}
