//! # YAML Breeding Record Repository
//!
//! File-based document store for breeding records. Each farm's records
//! live in `{farm_directory}/breeding_records.yaml` as a single YAML list,
//! rewritten atomically on every change.
//!
//! ## Features
//!
//! - Per-farm YAML documents
//! - Atomic file writes with temp files
//! - Equality-filter queries across farms
//! - Live subscription: every successful write publishes the farm's new
//!   contents on a broadcast channel

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use shared::BreedingRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::backend::storage::connection::FileConnection;
use crate::backend::storage::traits::{
    BreedingRecordStorage, FarmSnapshot, RecordField, RecordFilter, StorageError,
};

const RECORDS_FILE: &str = "breeding_records.yaml";
const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct YamlBreedingRepository {
    connection: FileConnection,
    write_lock: Arc<Mutex<()>>,
    changes: broadcast::Sender<FarmSnapshot>,
}

impl YamlBreedingRepository {
    pub fn new(connection: FileConnection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            connection,
            write_lock: Arc::new(Mutex::new(())),
            changes,
        }
    }

    fn records_file(&self, farm_id: &str) -> PathBuf {
        self.connection.farm_directory(farm_id).join(RECORDS_FILE)
    }

    fn read_file(path: &Path) -> Result<Vec<BreedingRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let yaml_content = fs::read_to_string(path)?;
        if yaml_content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<BreedingRecord> = serde_yaml::from_str(&yaml_content)
            .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;
        Ok(records)
    }

    fn read_farm(&self, farm_id: &str) -> Result<Vec<BreedingRecord>> {
        Self::read_file(&self.records_file(farm_id))
    }

    fn write_farm(&self, farm_id: &str, records: &[BreedingRecord]) -> Result<()> {
        self.connection.ensure_farm_directory(farm_id)?;
        let yaml_content = serde_yaml::to_string(records)?;
        self.connection
            .write_atomically(&self.records_file(farm_id), yaml_content.as_bytes())?;
        debug!("Wrote {} breeding records for farm {}", records.len(), farm_id);

        // No subscribers is not an error
        let _ = self.changes.send(FarmSnapshot {
            farm_id: farm_id.to_string(),
            records: records.to_vec(),
        });
        Ok(())
    }

    /// Every record on disk, across farms
    fn read_all(&self) -> Result<Vec<BreedingRecord>> {
        let mut records = Vec::new();
        for farm_dir in self.connection.farm_directories()? {
            records.extend(Self::read_file(&farm_dir.join(RECORDS_FILE))?);
        }
        Ok(records)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BreedingRecordStorage for YamlBreedingRepository {
    async fn create_record(&self, record: &BreedingRecord) -> Result<BreedingRecord> {
        let _guard = self.lock();
        let mut records = self.read_farm(&record.farm_id)?;

        if records.iter().any(|existing| existing.id == record.id) {
            return Err(anyhow!("Breeding record already exists: {}", record.id));
        }

        records.insert(0, record.clone());
        self.write_farm(&record.farm_id, &records)?;
        info!("Stored breeding record {} ({})", record.id, record.breeding_id);
        Ok(record.clone())
    }

    async fn get_record(&self, record_id: &str) -> Result<Option<BreedingRecord>> {
        Ok(self.read_all()?.into_iter().find(|record| record.id == record_id))
    }

    async fn update_record(&self, record: &BreedingRecord) -> Result<BreedingRecord> {
        let _guard = self.lock();
        let mut records = self.read_farm(&record.farm_id)?;

        let existing = records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| StorageError::NotFound(format!("Breeding record not found: {}", record.id)))?;
        *existing = record.clone();

        self.write_farm(&record.farm_id, &records)?;
        Ok(record.clone())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let _guard = self.lock();

        for farm_dir in self.connection.farm_directories()? {
            let mut records = Self::read_file(&farm_dir.join(RECORDS_FILE))?;
            let Some(index) = records.iter().position(|record| record.id == record_id) else {
                continue;
            };

            let removed = records.remove(index);
            self.write_farm(&removed.farm_id, &records)?;
            info!("Deleted breeding record {}", record_id);
            return Ok(());
        }

        Err(StorageError::NotFound(format!("Breeding record not found: {}", record_id)).into())
    }

    async fn query_records(&self, filter: &RecordFilter) -> Result<Vec<BreedingRecord>> {
        let mut records: Vec<BreedingRecord> = match filter.field {
            RecordField::FarmId => self.read_farm(&filter.value)?,
            _ => self.read_all()?,
        }
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn subscribe(&self) -> broadcast::Receiver<FarmSnapshot> {
        self.changes.subscribe()
    }
}
