//! In-memory storage backends.
//!
//! Used when embedding the engine without a data directory and throughout the
//! test suite. Both stores can be told to fail so callers' error paths can be
//! exercised.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{Animal, BreedingRecord, NewAnimal};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::backend::storage::traits::{
    AnimalStorage, BreedingRecordStorage, FarmSnapshot, RecordFilter, StorageError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
pub struct InMemoryBreedingStore {
    records: Arc<Mutex<Vec<BreedingRecord>>>,
    fail_writes: Arc<AtomicBool>,
    changes: broadcast::Sender<FarmSnapshot>,
}

impl InMemoryBreedingStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
            changes,
        }
    }

    /// While set, every create/update/delete fails with a persistence error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn stored_records(&self) -> Vec<BreedingRecord> {
        lock(&self.records).clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("Store unavailable"));
        }
        Ok(())
    }

    fn publish(&self, records: &[BreedingRecord], farm_id: &str) {
        let farm_records = records
            .iter()
            .filter(|record| record.farm_id == farm_id)
            .cloned()
            .collect();
        let _ = self.changes.send(FarmSnapshot {
            farm_id: farm_id.to_string(),
            records: farm_records,
        });
    }
}

impl Default for InMemoryBreedingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BreedingRecordStorage for InMemoryBreedingStore {
    async fn create_record(&self, record: &BreedingRecord) -> Result<BreedingRecord> {
        self.check_writable()?;
        let mut records = lock(&self.records);
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(anyhow!("Breeding record already exists: {}", record.id));
        }
        records.insert(0, record.clone());
        self.publish(&records, &record.farm_id);
        Ok(record.clone())
    }

    async fn get_record(&self, record_id: &str) -> Result<Option<BreedingRecord>> {
        Ok(lock(&self.records).iter().find(|record| record.id == record_id).cloned())
    }

    async fn update_record(&self, record: &BreedingRecord) -> Result<BreedingRecord> {
        self.check_writable()?;
        let mut records = lock(&self.records);
        let existing = records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| StorageError::NotFound(format!("Breeding record not found: {}", record.id)))?;
        *existing = record.clone();
        self.publish(&records, &record.farm_id);
        Ok(record.clone())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        self.check_writable()?;
        let mut records = lock(&self.records);
        let index = records
            .iter()
            .position(|record| record.id == record_id)
            .ok_or_else(|| StorageError::NotFound(format!("Breeding record not found: {}", record_id)))?;
        let removed = records.remove(index);
        self.publish(&records, &removed.farm_id);
        Ok(())
    }

    async fn query_records(&self, filter: &RecordFilter) -> Result<Vec<BreedingRecord>> {
        let mut matching: Vec<BreedingRecord> = lock(&self.records)
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    fn subscribe(&self) -> broadcast::Receiver<FarmSnapshot> {
        self.changes.subscribe()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAnimalRegistry {
    animals: Arc<Mutex<Vec<Animal>>>,
    create_calls: Arc<AtomicUsize>,
    fail_on_create_call: Arc<Mutex<Option<usize>>>,
}

impl InMemoryAnimalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `call`-th (1-based) future `create_animal` call fail
    pub fn fail_on_create_call(&self, call: usize) {
        let already_made = self.create_calls.load(Ordering::SeqCst);
        *lock(&self.fail_on_create_call) = Some(already_made + call);
    }

    /// Add an existing animal directly, bypassing id generation
    pub fn insert(&self, animal: Animal) {
        lock(&self.animals).push(animal);
    }

    pub fn animals(&self) -> Vec<Animal> {
        lock(&self.animals).clone()
    }
}

#[async_trait]
impl AnimalStorage for InMemoryAnimalRegistry {
    async fn create_animal(&self, new_animal: &NewAnimal) -> Result<String> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *lock(&self.fail_on_create_call) == Some(call) {
            return Err(anyhow!("Animal registry rejected tag {}", new_animal.tag_number));
        }

        let animal = new_animal.register(Utc::now());
        let id = animal.id.clone();
        lock(&self.animals).push(animal);
        Ok(id)
    }

    async fn get_animal(&self, animal_id: &str) -> Result<Option<Animal>> {
        Ok(lock(&self.animals).iter().find(|animal| animal.id == animal_id).cloned())
    }

    async fn delete_animal(&self, animal_id: &str) -> Result<()> {
        let mut animals = lock(&self.animals);
        let index = animals
            .iter()
            .position(|animal| animal.id == animal_id)
            .ok_or_else(|| StorageError::NotFound(format!("Animal not found: {}", animal_id)))?;
        animals.remove(index);
        Ok(())
    }

    async fn list_animals(&self, farm_id: &str) -> Result<Vec<Animal>> {
        Ok(lock(&self.animals)
            .iter()
            .filter(|animal| animal.farm_id == farm_id)
            .cloned()
            .collect())
    }
}
