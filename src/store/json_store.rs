use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::{normalize_date, DiagnosticNotes, NewRecord, RecordStore, Snapshot, StoreError, StoreEvent};
use crate::emissions::OperationalRecord;

/// File-backed record store persisting the collection as pretty JSON
pub struct JsonRecordStore {
    path: PathBuf,
    records: RwLock<Snapshot>,
    tx: broadcast::Sender<StoreEvent>,
}

impl JsonRecordStore {
    /// Opens the store, loading the file when it exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = Self::load(&path).await?;
        info!("Record store opened at {:?} with {} records", path, records.len());

        let (tx, _) = broadcast::channel(64);
        Ok(Self {
            path,
            records: RwLock::new(Arc::new(records)),
            tx,
        })
    }

    async fn load(path: &Path) -> Result<Vec<OperationalRecord>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(path).await?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut records: Vec<OperationalRecord> = serde_json::from_str(&json)?;
        for record in records.iter_mut() {
            record.date = normalize_date(&record.date);
        }
        Ok(records)
    }

    async fn save(&self, records: &[OperationalRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Persist, swap in and publish a new collection
    async fn commit(&self, guard: &mut Snapshot, records: Vec<OperationalRecord>) -> Result<(), StoreError> {
        self.save(&records).await?;
        let snapshot = Arc::new(records);
        *guard = snapshot.clone();
        if self.tx.send(StoreEvent::Snapshot(snapshot)).is_err() {
            debug!("Snapshot published with no subscribers");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn snapshot(&self) -> Snapshot {
        self.records.read().await.clone()
    }

    async fn add(&self, entry: NewRecord) -> Result<OperationalRecord, StoreError> {
        let entry = entry.validated()?;
        let record = entry.into_record(uuid::Uuid::new_v4().to_string());

        let mut guard = self.records.write().await;
        let mut records = guard.as_ref().clone();
        records.push(record.clone());
        self.commit(&mut guard, records).await?;

        info!("Added record {} for {}", record.id, record.date);
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.records.write().await;
        if !guard.iter().any(|r| r.id == id) {
            warn!("Delete requested for unknown record {}", id);
            return Ok(false);
        }

        let records = guard.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(&mut guard, records).await?;

        info!("Deleted record {}", id);
        Ok(true)
    }

    async fn annotate(&self, id: &str, notes: DiagnosticNotes) -> Result<Option<OperationalRecord>, StoreError> {
        let mut guard = self.records.write().await;
        let mut records = guard.as_ref().clone();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        notes.apply_to(record);
        let updated = record.clone();
        self.commit(&mut guard, records).await?;

        info!("Updated diagnostics for record {}", id);
        Ok(Some(updated))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }
}
