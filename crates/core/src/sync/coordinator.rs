//! Synchronization coordinator: single owner of the canonical collection.
//!
//! The remote store is the preferred source of truth when reachable; the
//! local cache is a write-behind mirror and offline fallback. There are no
//! cross-sink transactions: a failed remote write degrades to pending-local
//! state and the operation still succeeds from the local point of view.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, error, warn};

use crate::cycles::{self, CycleId, CycleInput, CycleRecord, CycleStatistics};
use crate::errors::{Error, RemoteStoreError, Result};

use super::ConnectivityMonitor;

/// Remote persistence contract. Implementations translate between the
/// canonical record shape and the remote schema, perform the network call,
/// and report success or failure only; they never retry internally.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the full collection, ordered by start date ascending.
    async fn fetch_all(&self) -> std::result::Result<Vec<CycleRecord>, RemoteStoreError>;

    /// Insert a record; the returned record carries the remote-assigned id.
    async fn create(&self, record: &CycleRecord)
        -> std::result::Result<CycleRecord, RemoteStoreError>;

    /// Replace the fields of the record with the given remote id.
    async fn update(
        &self,
        id: &str,
        record: &CycleRecord,
    ) -> std::result::Result<(), RemoteStoreError>;

    /// Remove the record with the given remote id.
    async fn delete(&self, id: &str) -> std::result::Result<(), RemoteStoreError>;
}

/// Local snapshot persistence contract. One serialized copy of the whole
/// collection; unreadable data degrades to "no data", never to an error.
pub trait LocalCache: Send + Sync {
    fn read_snapshot(&self) -> Vec<CycleRecord>;
    fn write_snapshot(&self, records: &[CycleRecord]) -> Result<()>;
}

/// Filename for an export produced on the given date.
pub fn export_filename(date: NaiveDate) -> String {
    format!("cycles-{}.json", date.format("%Y-%m-%d"))
}

/// Owns the canonical, start-date-ordered record collection and arbitrates
/// between remote and local persistence.
///
/// Callers serialize mutations themselves: each operation runs to completion
/// before the next command is issued, so no internal locking or queuing is
/// needed.
pub struct SyncCoordinator {
    remote: Option<Arc<dyn RemoteStore>>,
    cache: Arc<dyn LocalCache>,
    monitor: ConnectivityMonitor,
    records: Vec<CycleRecord>,
}

impl SyncCoordinator {
    /// Starts with an empty collection; call [`load`](Self::load) to pull the
    /// authoritative content.
    pub fn new(
        remote: Option<Arc<dyn RemoteStore>>,
        cache: Arc<dyn LocalCache>,
        monitor: ConnectivityMonitor,
    ) -> Self {
        Self {
            remote,
            cache,
            monitor,
            records: Vec::new(),
        }
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Read-only view of the canonical collection.
    pub fn records(&self) -> &[CycleRecord] {
        &self.records
    }

    /// Number of records awaiting a remote write.
    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| r.pending_sync).count()
    }

    /// Statistics for the current collection; `None` when empty.
    pub fn statistics(&self) -> Option<CycleStatistics> {
        cycles::compute(&self.records)
    }

    fn usable_remote(&self) -> Option<Arc<dyn RemoteStore>> {
        if self.monitor.remote_usable() {
            self.remote.clone()
        } else {
            None
        }
    }

    fn sort_records(&mut self) {
        // Stable: records sharing a start date keep insertion order.
        self.records.sort_by_key(|r| r.start_date);
    }

    fn mirror(&self) {
        if let Err(err) = self.cache.write_snapshot(&self.records) {
            error!("failed to mirror collection to local cache: {}", err);
        }
    }

    fn next_local_id(&self) -> CycleId {
        let mut millis = Utc::now().timestamp_millis();
        while self.records.iter().any(|r| r.id == CycleId::Local(millis)) {
            millis += 1;
        }
        CycleId::Local(millis)
    }

    /// Replace the canonical collection from the remote store, falling back
    /// to the local snapshot on any remote failure. Idempotent; an empty
    /// result is not an error.
    pub async fn load(&mut self) -> &[CycleRecord] {
        if let Some(remote) = self.usable_remote() {
            match remote.fetch_all().await {
                Ok(mut records) => {
                    for record in &mut records {
                        record.pending_sync = false;
                    }
                    self.records = records;
                    self.sort_records();
                    self.mirror();
                    debug!("loaded {} records from remote store", self.records.len());
                    return &self.records;
                }
                Err(err) => {
                    warn!("remote fetch failed, falling back to local snapshot: {}", err);
                }
            }
        }
        self.records = self.cache.read_snapshot();
        self.sort_records();
        debug!("loaded {} records from local snapshot", self.records.len());
        &self.records
    }

    /// Create a record. Writes through to the remote store when usable; on
    /// remote failure (or an unusable remote) the record keeps a local id
    /// and is marked pending. Returns the finalized record.
    pub async fn create(&mut self, input: CycleInput) -> Result<CycleRecord> {
        input.validated_dates()?;
        let mut record = input.into_record(self.next_local_id(), true)?;

        if let Some(remote) = self.usable_remote() {
            match remote.create(&record).await {
                Ok(created) => record = created,
                Err(err) => {
                    warn!("remote create failed, keeping record as pending: {}", err);
                }
            }
        } else {
            debug!("remote not usable, record {} created as pending", record.id);
        }

        self.records.push(record.clone());
        self.sort_records();
        self.mirror();
        Ok(record)
    }

    /// Replace a record's fields wholesale. Never-synced records skip the
    /// remote write; a failed remote write applies the update locally and
    /// marks the record pending.
    pub async fn update(&mut self, id: &CycleId, input: CycleInput) -> Result<CycleRecord> {
        input.validated_dates()?;
        let position = self
            .records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;

        let mut updated = input.into_record(id.clone(), true)?;
        match id {
            CycleId::Local(_) => {
                debug!("record {} never synced, skipping remote update", id);
            }
            CycleId::Remote(remote_id) => {
                if let Some(remote) = self.usable_remote() {
                    match remote.update(remote_id, &updated).await {
                        Ok(()) => updated.pending_sync = false,
                        Err(err) => {
                            warn!("remote update failed for {}, marking pending: {}", id, err);
                        }
                    }
                } else {
                    debug!("remote not usable, update of {} stays pending", id);
                }
            }
        }

        self.records[position] = updated.clone();
        self.sort_records();
        self.mirror();
        Ok(updated)
    }

    /// Remove a record. A remote-origin record is deleted remotely first;
    /// the local copy is removed regardless of the remote outcome. Deleting
    /// an unknown id is a no-op.
    pub async fn delete(&mut self, id: &CycleId) -> Result<()> {
        let Some(position) = self.records.iter().position(|r| &r.id == id) else {
            debug!("delete of unknown record {}, nothing to do", id);
            return Ok(());
        };

        if let CycleId::Remote(remote_id) = id {
            if let Some(remote) = self.usable_remote() {
                if let Err(err) = remote.delete(remote_id).await {
                    warn!(
                        "remote delete failed for {}, removing local copy anyway: {}",
                        id, err
                    );
                }
            }
        }

        self.records.remove(position);
        self.mirror();
        Ok(())
    }

    /// Serialize the canonical collection as pretty-printed JSON. Pure.
    pub fn export(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.records)?)
    }
}
