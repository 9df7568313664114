//! In-memory working set of the active farm's breeding records.
//!
//! Every mutation bumps a monotonically increasing revision, stamps it on
//! the touched record, and publishes the new list to subscribers. Derived
//! views (birth windows, summaries) key their caches on that revision.

use shared::BreedingRecord;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Position and contents of a record before a command touched it
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    id: String,
    previous: Option<(usize, BreedingRecord)>,
}

pub struct WorkingSet {
    records: Vec<BreedingRecord>,
    revision: u64,
    updates: watch::Sender<Vec<BreedingRecord>>,
}

impl WorkingSet {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            records: Vec::new(),
            revision: 0,
            updates,
        }
    }

    pub fn records(&self) -> &[BreedingRecord] {
        &self.records
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &str) -> Option<&BreedingRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<BreedingRecord>> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self, id: &str) -> RecordSnapshot {
        RecordSnapshot {
            id: id.to_string(),
            previous: self
                .records
                .iter()
                .position(|record| record.id == id)
                .map(|index| (index, self.records[index].clone())),
        }
    }

    /// Replaces the record with the same id in place, or inserts it first
    pub fn upsert(&mut self, mut record: BreedingRecord) {
        record.revision = self.next_revision();
        match self.records.iter().position(|existing| existing.id == record.id) {
            Some(index) => self.records[index] = record,
            None => self.records.insert(0, record),
        }
        self.publish();
    }

    pub fn remove(&mut self, id: &str) -> Option<BreedingRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;
        let removed = self.records.remove(index);
        self.next_revision();
        self.publish();
        Some(removed)
    }

    /// Puts a record back exactly as it was when the snapshot was taken
    pub fn restore(&mut self, snapshot: RecordSnapshot) {
        self.records.retain(|record| record.id != snapshot.id);
        if let Some((index, mut record)) = snapshot.previous {
            record.revision = self.next_revision();
            let index = index.min(self.records.len());
            self.records.insert(index, record);
        } else {
            self.next_revision();
        }
        self.publish();
    }

    pub fn replace_all(&mut self, records: Vec<BreedingRecord>) {
        let revision = self.next_revision();
        self.records = records
            .into_iter()
            .map(|mut record| {
                record.revision = revision;
                record
            })
            .collect();
        self.publish();
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn publish(&self) {
        self.updates.send_replace(self.records.clone());
    }
}

impl Default for WorkingSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to a working set shared between services
#[derive(Clone, Default)]
pub struct SharedWorkingSet {
    inner: Arc<Mutex<WorkingSet>>,
}

impl SharedWorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The guard must not be held across an `.await`
    pub fn lock(&self) -> MutexGuard<'_, WorkingSet> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
