//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use async_trait::async_trait;
use shared::{Animal, BreedingRecord, NewAnimal};
use tokio::sync::broadcast;

use super::yaml::GlobalConfig;

/// Typed failures a store may report inside an `anyhow::Error`
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),
}

/// Field a breeding record query filters on by equality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    FarmId,
    MaleId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub field: RecordField,
    pub value: String,
}

impl RecordFilter {
    pub fn farm(farm_id: &str) -> Self {
        Self {
            field: RecordField::FarmId,
            value: farm_id.to_string(),
        }
    }

    pub fn male(male_id: &str) -> Self {
        Self {
            field: RecordField::MaleId,
            value: male_id.to_string(),
        }
    }

    pub fn matches(&self, record: &BreedingRecord) -> bool {
        let field = match self.field {
            RecordField::FarmId => &record.farm_id,
            RecordField::MaleId => &record.male_id,
        };
        *field == self.value
    }
}

/// Full contents of one farm's records after a change was written
#[derive(Debug, Clone, PartialEq)]
pub struct FarmSnapshot {
    pub farm_id: String,
    pub records: Vec<BreedingRecord>,
}

/// Document store for breeding records
///
/// Writes return the store's authoritative copy of the record so callers can
/// replace, not merge, their local state.
#[async_trait]
pub trait BreedingRecordStorage: Send + Sync {
    async fn create_record(&self, record: &BreedingRecord) -> Result<BreedingRecord>;

    async fn get_record(&self, record_id: &str) -> Result<Option<BreedingRecord>>;

    /// Fails with `StorageError::NotFound` when no record has this id
    async fn update_record(&self, record: &BreedingRecord) -> Result<BreedingRecord>;

    /// Fails with `StorageError::NotFound` when no record has this id
    async fn delete_record(&self, record_id: &str) -> Result<()>;

    /// Records matching the filter, most recently created first
    async fn query_records(&self, filter: &RecordFilter) -> Result<Vec<BreedingRecord>>;

    /// Live feed of farm snapshots, one per successful write
    fn subscribe(&self) -> broadcast::Receiver<FarmSnapshot>;
}

/// Animal registry collaborator
#[async_trait]
pub trait AnimalStorage: Send + Sync {
    /// Register a new animal and return its id
    async fn create_animal(&self, animal: &NewAnimal) -> Result<String>;

    async fn get_animal(&self, animal_id: &str) -> Result<Option<Animal>>;

    /// Fails with `StorageError::NotFound` when no animal has this id
    async fn delete_animal(&self, animal_id: &str) -> Result<()>;

    async fn list_animals(&self, farm_id: &str) -> Result<Vec<Animal>>;
}

/// Persistence for the active farm and actor
pub trait GlobalConfigStorage: Send + Sync {
    fn get_global_config(&self) -> Result<GlobalConfig>;

    fn set_active_farm(&self, farm_id: Option<String>) -> Result<()>;

    fn set_active_actor(&self, actor_id: Option<String>) -> Result<()>;
}
