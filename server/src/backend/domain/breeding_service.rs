//! Breeding record domain logic.
//!
//! This module contains the breeding record manager: creating, updating and
//! deleting records, generating their human-readable ids, classifying them by
//! what they are waiting for, and deriving the pregnancy and birth views the
//! rest of the application reads.
//!
//! ## Business Rules
//!
//! - A record needs an active farm, an authenticated actor, one male and at
//!   least one female
//! - Every date on a female entry is stored at the start of its local day
//! - An expected birth date may not precede the breeding date
//! - Offspring can only be listed for a female whose birth is recorded
//! - Removing the male, or the last female, deletes the whole record
//!
//! ## Write discipline
//!
//! Local changes are applied to the working set straight away so readers see
//! them, then the store write is awaited. The store's copy replaces the local
//! entry on success; on failure the entry is restored to its pre-command
//! state and the error is returned.

use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use shared::{
    ActivePregnancy, BirthsWindow, BirthsWindowSummary, BreedingRecord, BreedingStats,
    ClassifiedRecords, FemaleBreedingInfo,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::backend::domain::birth_window::BirthWindowCalculator;
use crate::backend::domain::commands::breeding::{
    ConfirmPregnancyCommand, CreateBreedingRecordCommand, RemoveFromBreedingResult,
    UpdateBreedingRecordCommand,
};
use crate::backend::domain::errors::BreedingError;
use crate::backend::domain::gestation::{expected_birth_date, local_date, local_day_start, local_today};
use crate::backend::domain::session::{require_active, ActiveSession, SessionContext};
use crate::backend::domain::working_set::SharedWorkingSet;
use crate::backend::storage::{BreedingRecordStorage, FarmSnapshot, RecordFilter};

/// Window used by `get_stats` for "upcoming births"
pub const DEFAULT_UPCOMING_DAYS: u32 = 30;

/// Service for managing breeding records
#[derive(Clone)]
pub struct BreedingService {
    storage: Arc<dyn BreedingRecordStorage>,
    session: Arc<dyn SessionContext>,
    working_set: SharedWorkingSet,
    birth_windows: BirthWindowCalculator,
    upcoming_days: u32,
}

impl BreedingService {
    pub fn new(storage: Arc<dyn BreedingRecordStorage>, session: Arc<dyn SessionContext>) -> Self {
        Self {
            storage,
            session,
            working_set: SharedWorkingSet::new(),
            birth_windows: BirthWindowCalculator::new(),
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }

    pub fn with_upcoming_days(mut self, days: u32) -> Self {
        self.upcoming_days = days;
        self
    }

    pub fn session(&self) -> &Arc<dyn SessionContext> {
        &self.session
    }

    /// Reactive list of the active farm's records
    pub fn subscribe(&self) -> watch::Receiver<Vec<BreedingRecord>> {
        self.working_set.lock().subscribe()
    }

    pub fn records(&self) -> Vec<BreedingRecord> {
        self.working_set.lock().records().to_vec()
    }

    /// Replace the working set with the active farm's records from the store
    pub async fn load_farm(&self) -> Result<usize, BreedingError> {
        let farm_id = self
            .session
            .current_farm_id()
            .ok_or_else(|| BreedingError::validation("No active farm selected"))?;

        info!("Loading breeding records for farm {}", farm_id);
        let records = self
            .storage
            .query_records(&RecordFilter::farm(&farm_id))
            .await
            .map_err(|e| log_failure("load breeding records", e.into()))?;

        let count = records.len();
        self.working_set.lock().replace_all(records);
        info!("Loaded {} breeding records for farm {}", count, farm_id);
        Ok(count)
    }

    /// Apply a live-subscription event; snapshots for other farms are ignored
    pub fn apply_remote_snapshot(&self, snapshot: FarmSnapshot) -> bool {
        if self.session.current_farm_id().as_deref() != Some(snapshot.farm_id.as_str()) {
            return false;
        }
        self.working_set.lock().replace_all(snapshot.records);
        true
    }

    /// Follow the store's change feed until it closes
    pub fn spawn_change_listener(&self) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        let mut feed = self.storage.subscribe();
        tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(snapshot) => {
                        service.apply_remote_snapshot(snapshot);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Breeding change feed lagged by {} events, reloading", skipped);
                        if let Err(e) = service.load_farm().await {
                            error!("Reload after lag failed: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Actor and farm for a mutating operation; logs and fails when either is missing
    pub(crate) fn require_session(&self, action: &str) -> Result<ActiveSession, BreedingError> {
        require_active(self.session.as_ref()).map_err(|e| {
            error!("Cannot {}: {}", action, e);
            e
        })
    }

    /// Look up a record of the active farm, falling back to the store when it
    /// is not in the working set. Records of other farms are reported missing.
    pub async fn find_record(&self, record_id: &str) -> Result<BreedingRecord, BreedingError> {
        let farm_id = self.session.current_farm_id();
        let cached = self.working_set.lock().get(record_id).cloned();
        let record = match cached {
            Some(record) => Some(record),
            None => self
                .storage
                .get_record(record_id)
                .await
                .map_err(|e| log_failure("read breeding record", e.into()))?,
        };

        match record {
            Some(record) if farm_id.as_deref() == Some(record.farm_id.as_str()) => Ok(record),
            Some(record) => {
                warn!(
                    "Breeding record {} belongs to farm {}, not the active farm {:?}",
                    record_id, record.farm_id, farm_id
                );
                Err(BreedingError::not_found(format!("Breeding record not found: {}", record_id)))
            }
            None => Err(BreedingError::not_found(format!("Breeding record not found: {}", record_id))),
        }
    }

    pub async fn create_record(&self, command: CreateBreedingRecordCommand) -> Result<BreedingRecord, BreedingError> {
        let active = self.require_session("create breeding record")?;

        let male_id = command.male_id.trim().to_string();
        if male_id.is_empty() {
            return Err(log_failure(
                "create breeding record",
                BreedingError::validation("A breeding record needs a male"),
            ));
        }
        if command.female_breeding_info.is_empty() {
            return Err(log_failure(
                "create breeding record",
                BreedingError::validation("A breeding record needs at least one female"),
            ));
        }

        let now = Utc::now();
        let breeding_date = local_day_start(command.breeding_date.unwrap_or(now));
        let females: Vec<FemaleBreedingInfo> = command
            .female_breeding_info
            .into_iter()
            .map(normalize_female)
            .collect();
        validate_females(breeding_date, &females).map_err(|e| log_failure("create breeding record", e))?;

        let breeding_id = self.next_breeding_id(&active.farm_id, local_date(breeding_date)).await?;

        let record = BreedingRecord {
            id: BreedingRecord::generate_id(),
            breeding_id,
            farm_id: active.farm_id,
            male_id,
            female_breeding_info: females,
            breeding_date: Some(breeding_date),
            notes: command.notes.map(|n| n.trim().to_string()).unwrap_or_default(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        };

        info!(
            "Creating breeding record {} for male {} with {} females",
            record.breeding_id,
            record.male_id,
            record.female_breeding_info.len()
        );

        let stored = self
            .storage
            .create_record(&record)
            .await
            .map_err(|e| log_failure("create breeding record", e.into()))?;

        self.working_set.lock().upsert(stored.clone());
        Ok(stored)
    }

    /// Merge the fields present in `command` into the record
    pub async fn update_record(
        &self,
        record_id: &str,
        command: UpdateBreedingRecordCommand,
    ) -> Result<BreedingRecord, BreedingError> {
        info!("Updating breeding record {}", record_id);
        self.require_session("update breeding record")?;
        let mut record = self.find_record(record_id).await?;

        if let Some(male_id) = command.male_id {
            let male_id = male_id.trim().to_string();
            if male_id.is_empty() {
                return Err(log_failure(
                    "update breeding record",
                    BreedingError::validation("A breeding record needs a male"),
                ));
            }
            record.male_id = male_id;
        }
        if let Some(breeding_date) = command.breeding_date {
            record.breeding_date = Some(local_day_start(breeding_date));
        }
        if let Some(females) = command.female_breeding_info {
            record.female_breeding_info = females.into_iter().map(normalize_female).collect();
        }
        if let Some(notes) = command.notes {
            record.notes = notes.trim().to_string();
        }

        if let Some(breeding_date) = record.breeding_date {
            validate_females(breeding_date, &record.female_breeding_info)
                .map_err(|e| log_failure("update breeding record", e))?;
        }

        self.commit(record).await
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<(), BreedingError> {
        info!("Deleting breeding record {}", record_id);
        self.require_session("delete breeding record")?;
        self.find_record(record_id).await?;

        let snapshot = {
            let mut set = self.working_set.lock();
            let snapshot = set.snapshot(record_id);
            set.remove(record_id);
            snapshot
        };

        if let Err(e) = self.storage.delete_record(record_id).await {
            self.working_set.lock().restore(snapshot);
            return Err(log_failure("delete breeding record", e.into()));
        }
        Ok(())
    }

    /// Persist a full record through the optimistic write path
    pub(crate) async fn commit(&self, mut record: BreedingRecord) -> Result<BreedingRecord, BreedingError> {
        record.updated_at = Utc::now();

        let snapshot = {
            let mut set = self.working_set.lock();
            let snapshot = set.snapshot(&record.id);
            set.upsert(record.clone());
            snapshot
        };

        match self.storage.update_record(&record).await {
            Ok(authoritative) => {
                self.working_set.lock().upsert(authoritative.clone());
                Ok(authoritative)
            }
            Err(e) => {
                self.working_set.lock().restore(snapshot);
                Err(log_failure("update breeding record", e.into()))
            }
        }
    }

    pub async fn confirm_pregnancy(&self, command: ConfirmPregnancyCommand) -> Result<BreedingRecord, BreedingError> {
        info!(
            "Confirming pregnancy of {} in record {}",
            command.female_id, command.record_id
        );
        self.require_session("confirm pregnancy")?;
        let record = self.find_record(&command.record_id).await?;
        let base = record.breeding_date.unwrap_or(command.confirmed_date);
        let expected = command
            .expected_birth_date
            .unwrap_or_else(|| expected_birth_date(base, command.species));

        let mut females = record.female_breeding_info.clone();
        let female = females
            .iter_mut()
            .find(|info| info.female_id == command.female_id)
            .ok_or_else(|| female_not_in_record(&command.female_id, &record))?;
        female.pregnancy_confirmed_date = Some(command.confirmed_date);
        female.expected_birth_date = Some(expected);

        self.update_record(
            &record.id,
            UpdateBreedingRecordCommand {
                female_breeding_info: Some(females),
                ..Default::default()
            },
        )
        .await
    }

    /// Clears the female's confirmation and expected birth dates, nothing else
    pub async fn unconfirm_pregnancy(&self, record_id: &str, female_id: &str) -> Result<BreedingRecord, BreedingError> {
        info!("Unconfirming pregnancy of {} in record {}", female_id, record_id);
        self.require_session("unconfirm pregnancy")?;
        let mut record = self.find_record(record_id).await?;

        let female = record
            .female_mut(female_id)
            .ok_or_else(|| BreedingError::validation(format!("Animal {} is not a female of this breeding", female_id)))?;
        female.pregnancy_confirmed_date = None;
        female.expected_birth_date = None;

        self.commit(record).await
    }

    pub async fn remove_from_breeding(
        &self,
        record_id: &str,
        animal_id: &str,
    ) -> Result<RemoveFromBreedingResult, BreedingError> {
        info!("Removing {} from breeding record {}", animal_id, record_id);
        self.require_session("remove animal from breeding")?;
        let mut record = self.find_record(record_id).await?;

        if record.male_id == animal_id {
            self.delete_record(record_id).await?;
            return Ok(RemoveFromBreedingResult::RecordDeleted);
        }

        let before = record.female_breeding_info.len();
        record.female_breeding_info.retain(|info| info.female_id != animal_id);
        if record.female_breeding_info.len() == before {
            return Err(female_not_in_record(animal_id, &record));
        }

        if record.female_breeding_info.is_empty() {
            self.delete_record(record_id).await?;
            return Ok(RemoveFromBreedingResult::RecordDeleted);
        }

        let updated = self.commit(record).await?;
        Ok(RemoveFromBreedingResult::FemaleRemoved(updated))
    }

    /// Records in which the animal is the male or one of the females
    pub fn get_records_by_animal(&self, animal_id: &str) -> Vec<BreedingRecord> {
        self.working_set
            .lock()
            .records()
            .iter()
            .filter(|record| record.involves_animal(animal_id))
            .cloned()
            .collect()
    }

    pub fn get_active_pregnancies(&self) -> Vec<ActivePregnancy> {
        let set = self.working_set.lock();
        let pregnancies = set
            .records()
            .iter()
            .flat_map(|record| {
                record
                    .female_breeding_info
                    .iter()
                    .filter(|info| info.is_active_pregnancy())
                    .map(move |info| ActivePregnancy {
                        record: record.clone(),
                        female: info.clone(),
                    })
            })
            .collect();
        pregnancies
    }

    pub fn classified(&self) -> ClassifiedRecords {
        classify(self.working_set.lock().records())
    }

    pub fn get_births_window(&self, days: u32) -> Arc<BirthsWindow> {
        self.get_births_window_on(days, local_today())
    }

    pub fn get_births_window_on(&self, days: u32, today: NaiveDate) -> Arc<BirthsWindow> {
        let set = self.working_set.lock();
        self.birth_windows.births_window(&set, days, today)
    }

    pub fn get_births_window_summary(&self, days: u32) -> BirthsWindowSummary {
        self.get_births_window_summary_on(days, local_today())
    }

    pub fn get_births_window_summary_on(&self, days: u32, today: NaiveDate) -> BirthsWindowSummary {
        let set = self.working_set.lock();
        self.birth_windows.births_window_summary(&set, days, today)
    }

    pub fn get_stats(&self) -> BreedingStats {
        self.get_stats_on(local_today())
    }

    pub fn get_stats_on(&self, today: NaiveDate) -> BreedingStats {
        let upcoming_births = self.get_births_window_summary_on(self.upcoming_days, today).upcoming;
        let set = self.working_set.lock();
        let records = set.records();

        BreedingStats {
            total_records: records.len(),
            active_pregnancies: records
                .iter()
                .flat_map(|record| &record.female_breeding_info)
                .filter(|info| info.is_active_pregnancy())
                .count(),
            upcoming_births,
            total_offspring: records.iter().map(BreedingRecord::offspring_count).sum(),
        }
    }

    /// `dd-mm-yy-NN`, where NN counts the farm's records bred on the same local day
    async fn next_breeding_id(&self, farm_id: &str, breeding_day: NaiveDate) -> Result<String, BreedingError> {
        let existing = self
            .storage
            .query_records(&RecordFilter::farm(farm_id))
            .await
            .map_err(|e| log_failure("count breeding records", e.into()))?;

        let same_day = existing
            .iter()
            .filter_map(|record| record.breeding_date)
            .filter(|date| local_date(*date) == breeding_day)
            .count();

        Ok(format!("{}-{:02}", breeding_day.format("%d-%m-%y"), same_day + 1))
    }
}

/// Partition records by what they are waiting for.
///
/// Precedence per record: any female still awaiting pregnancy confirmation
/// puts it in `needs_pregnancy_confirmation`; otherwise any confirmed female
/// without a birth puts it in `needs_birth_confirmation`; otherwise it is
/// `finished`. Each bucket is newest breeding date first, undated last.
pub fn classify(records: &[BreedingRecord]) -> ClassifiedRecords {
    let mut classified = ClassifiedRecords::default();

    for record in records {
        let females = &record.female_breeding_info;
        if females.iter().any(FemaleBreedingInfo::awaits_pregnancy_confirmation) {
            classified.needs_pregnancy_confirmation.push(record.clone());
        } else if females.iter().any(FemaleBreedingInfo::is_active_pregnancy) {
            classified.needs_birth_confirmation.push(record.clone());
        } else {
            classified.finished.push(record.clone());
        }
    }

    for bucket in [
        &mut classified.needs_pregnancy_confirmation,
        &mut classified.needs_birth_confirmation,
        &mut classified.finished,
    ] {
        bucket.sort_by(|a, b| match (a.breeding_date, b.breeding_date) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }

    classified
}

fn normalize_female(mut info: FemaleBreedingInfo) -> FemaleBreedingInfo {
    info.female_id = info.female_id.trim().to_string();
    info.pregnancy_confirmed_date = info.pregnancy_confirmed_date.map(local_day_start);
    info.expected_birth_date = info.expected_birth_date.map(local_day_start);
    info.actual_birth_date = info.actual_birth_date.map(local_day_start);
    info
}

fn validate_females(breeding_date: chrono::DateTime<Utc>, females: &[FemaleBreedingInfo]) -> Result<(), BreedingError> {
    for info in females {
        if info.female_id.is_empty() {
            return Err(BreedingError::validation("Female id cannot be empty"));
        }
        if matches!(info.expected_birth_date, Some(expected) if expected < breeding_date) {
            return Err(BreedingError::validation(format!(
                "Expected birth date of {} is before the breeding date",
                info.female_id
            )));
        }
        if !info.offspring_ids.is_empty() && info.actual_birth_date.is_none() {
            return Err(BreedingError::validation(format!(
                "Female {} has offspring but no recorded birth",
                info.female_id
            )));
        }
    }
    Ok(())
}

fn female_not_in_record(animal_id: &str, record: &BreedingRecord) -> BreedingError {
    BreedingError::validation(format!(
        "Animal {} is not part of breeding {}",
        animal_id, record.breeding_id
    ))
}

fn log_failure(action: &str, err: BreedingError) -> BreedingError {
    error!("Failed to {}: {}", action, err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::gestation::day_start_of;
    use crate::backend::domain::session::SessionService;
    use crate::backend::storage::InMemoryBreedingStore;
    use chrono::{DateTime, Duration};
    use shared::Species;

    struct Fixture {
        service: BreedingService,
        store: InMemoryBreedingStore,
        session: SessionService,
    }

    fn fixture() -> Fixture {
        let store = InMemoryBreedingStore::new();
        let session = SessionService::new();
        session.set_active_farm(Some("hill-farm")).unwrap();
        session.sign_in("user-1").unwrap();
        let service = BreedingService::new(Arc::new(store.clone()), Arc::new(session.clone()));
        Fixture { service, store, session }
    }

    fn day(year: i32, month: u32, d: u32) -> DateTime<Utc> {
        day_start_of(NaiveDate::from_ymd_opt(year, month, d).unwrap())
    }

    fn create_command(male: &str, females: &[&str], bred: DateTime<Utc>) -> CreateBreedingRecordCommand {
        CreateBreedingRecordCommand {
            male_id: male.to_string(),
            female_breeding_info: females.iter().map(|f| FemaleBreedingInfo::new(*f)).collect(),
            breeding_date: Some(bred),
            notes: None,
        }
    }

    fn record_with(id: &str, bred: Option<DateTime<Utc>>, females: Vec<FemaleBreedingInfo>) -> BreedingRecord {
        let now = Utc::now();
        BreedingRecord {
            id: id.to_string(),
            breeding_id: format!("{}-01", id),
            farm_id: "hill-farm".to_string(),
            male_id: "ram".to_string(),
            female_breeding_info: females,
            breeding_date: bred,
            notes: String::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    fn confirmed(id: &str) -> FemaleBreedingInfo {
        let mut info = FemaleBreedingInfo::new(id);
        info.pregnancy_confirmed_date = Some(day(2025, 10, 1));
        info
    }

    fn born(id: &str) -> FemaleBreedingInfo {
        let mut info = confirmed(id);
        info.actual_birth_date = Some(day(2026, 2, 1));
        info
    }

    #[tokio::test]
    async fn test_create_requires_farm_and_actor() {
        let f = fixture();
        f.session.sign_out().unwrap();

        let result = f.service.create_record(create_command("ram", &["ewe"], day(2025, 9, 1))).await;
        assert!(matches!(result, Err(BreedingError::Validation(_))));

        f.session.sign_in("user-1").unwrap();
        f.session.set_active_farm(None).unwrap();
        let result = f.service.create_record(create_command("ram", &["ewe"], day(2025, 9, 1))).await;
        assert!(matches!(result, Err(BreedingError::Validation(_))));
        assert!(f.store.stored_records().is_empty());
    }

    #[tokio::test]
    async fn test_sequence_ids_count_same_day_records() {
        let f = fixture();

        let first = f.service.create_record(create_command("ram", &["ewe-1"], day(2025, 9, 1))).await.unwrap();
        let second = f.service.create_record(create_command("ram", &["ewe-2"], day(2025, 9, 1))).await.unwrap();
        let other_day = f.service.create_record(create_command("ram", &["ewe-3"], day(2025, 9, 2))).await.unwrap();

        assert_eq!(first.breeding_id, "01-09-25-01");
        assert_eq!(second.breeding_id, "01-09-25-02");
        assert_eq!(other_day.breeding_id, "02-09-25-01");
    }

    #[tokio::test]
    async fn test_create_normalizes_dates_to_local_day_start() {
        let f = fixture();
        let bred_at = day(2025, 9, 1) + Duration::hours(15);
        let mut info = FemaleBreedingInfo::new("ewe");
        info.pregnancy_confirmed_date = Some(day(2025, 10, 1) + Duration::hours(9) + Duration::minutes(30));

        let record = f
            .service
            .create_record(CreateBreedingRecordCommand {
                male_id: "ram".to_string(),
                female_breeding_info: vec![info],
                breeding_date: Some(bred_at),
                notes: Some("  scanned twice ".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(record.breeding_date, Some(day(2025, 9, 1)));
        assert_eq!(record.female_breeding_info[0].pregnancy_confirmed_date, Some(day(2025, 10, 1)));
        assert_eq!(record.notes, "scanned twice");
        assert_eq!(f.service.records().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_expected_before_breeding() {
        let f = fixture();
        let mut info = FemaleBreedingInfo::new("ewe");
        info.expected_birth_date = Some(day(2025, 8, 1));

        let result = f
            .service
            .create_record(CreateBreedingRecordCommand {
                male_id: "ram".to_string(),
                female_breeding_info: vec![info],
                breeding_date: Some(day(2025, 9, 1)),
                notes: None,
            })
            .await;

        assert!(matches!(result, Err(BreedingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_male_or_females() {
        let f = fixture();

        let no_male = f.service.create_record(create_command("  ", &["ewe"], day(2025, 9, 1))).await;
        assert!(matches!(no_male, Err(BreedingError::Validation(_))));

        let no_females = f.service.create_record(create_command("ram", &[], day(2025, 9, 1))).await;
        assert!(matches!(no_females, Err(BreedingError::Validation(_))));

        let created = f.service.create_record(create_command("ram", &["ewe"], day(2025, 9, 1))).await.unwrap();
        let blank_male = f
            .service
            .update_record(
                &created.id,
                UpdateBreedingRecordCommand {
                    male_id: Some(String::new()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(blank_male, Err(BreedingError::Validation(_))));
        assert_eq!(f.store.stored_records()[0].male_id, "ram");
    }

    #[tokio::test]
    async fn test_update_merges_only_present_fields() {
        let f = fixture();
        let created = f
            .service
            .create_record(CreateBreedingRecordCommand {
                notes: Some("original".to_string()),
                ..create_command("ram", &["ewe"], day(2025, 9, 1))
            })
            .await
            .unwrap();

        let mut females = created.female_breeding_info.clone();
        females[0].expected_birth_date = Some(day(2026, 1, 26) + Duration::hours(13));

        let updated = f
            .service
            .update_record(
                &created.id,
                UpdateBreedingRecordCommand {
                    female_breeding_info: Some(females),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.notes, "original");
        assert_eq!(updated.male_id, "ram");
        assert_eq!(updated.female_breeding_info[0].expected_birth_date, Some(day(2026, 1, 26)));
        assert_eq!(f.store.stored_records()[0], updated);
    }

    #[tokio::test]
    async fn test_failed_update_restores_previous_state() {
        let f = fixture();
        let created = f.service.create_record(create_command("ram", &["ewe"], day(2025, 9, 1))).await.unwrap();
        let revision_before = f.service.records()[0].revision;

        f.store.set_fail_writes(true);
        let result = f
            .service
            .update_record(
                &created.id,
                UpdateBreedingRecordCommand {
                    notes: Some("changed".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(BreedingError::Persistence(_))));
        let local = f.service.records();
        assert_eq!(local[0].notes, "");
        assert!(local[0].revision > revision_before);
    }

    #[tokio::test]
    async fn test_failed_delete_restores_record() {
        let f = fixture();
        let created = f.service.create_record(create_command("ram", &["ewe"], day(2025, 9, 1))).await.unwrap();

        f.store.set_fail_writes(true);
        assert!(f.service.delete_record(&created.id).await.is_err());
        assert_eq!(f.service.records().len(), 1);

        f.store.set_fail_writes(false);
        f.service.delete_record(&created.id).await.unwrap();
        assert!(f.service.records().is_empty());
        assert!(f.store.stored_records().is_empty());
    }

    #[tokio::test]
    async fn test_update_of_unknown_record_is_not_found() {
        let f = fixture();
        let result = f.service.update_record("breeding::nope", UpdateBreedingRecordCommand::default()).await;
        assert!(matches!(result, Err(BreedingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unconfirm_clears_only_that_female() {
        let f = fixture();
        let created = f.service.create_record(create_command("ram", &["ewe-1", "ewe-2"], day(2025, 9, 1))).await.unwrap();

        for female in ["ewe-1", "ewe-2"] {
            f.service
                .confirm_pregnancy(ConfirmPregnancyCommand {
                    record_id: created.id.clone(),
                    female_id: female.to_string(),
                    confirmed_date: day(2025, 10, 15),
                    species: Species::Sheep,
                    expected_birth_date: None,
                })
                .await
                .unwrap();
        }

        let updated = f.service.unconfirm_pregnancy(&created.id, "ewe-1").await.unwrap();

        let ewe_1 = updated.female("ewe-1").unwrap();
        assert_eq!(ewe_1.pregnancy_confirmed_date, None);
        assert_eq!(ewe_1.expected_birth_date, None);

        let ewe_2 = updated.female("ewe-2").unwrap();
        assert_eq!(ewe_2.pregnancy_confirmed_date, Some(day(2025, 10, 15)));
        assert_eq!(ewe_2.expected_birth_date, Some(expected_birth_date(day(2025, 9, 1), Species::Sheep)));
    }

    #[tokio::test]
    async fn test_remove_male_deletes_record() {
        let f = fixture();
        let created = f.service.create_record(create_command("ram", &["ewe-1", "ewe-2"], day(2025, 9, 1))).await.unwrap();

        let result = f.service.remove_from_breeding(&created.id, "ram").await.unwrap();
        assert_eq!(result, RemoveFromBreedingResult::RecordDeleted);
        assert!(f.store.stored_records().is_empty());
    }

    #[tokio::test]
    async fn test_remove_last_female_deletes_record() {
        let f = fixture();
        let created = f.service.create_record(create_command("ram", &["ewe-1", "ewe-2"], day(2025, 9, 1))).await.unwrap();

        match f.service.remove_from_breeding(&created.id, "ewe-1").await.unwrap() {
            RemoveFromBreedingResult::FemaleRemoved(record) => {
                assert_eq!(record.female_breeding_info.len(), 1);
                assert_eq!(record.female_breeding_info[0].female_id, "ewe-2");
            }
            other => panic!("expected female removal, got {:?}", other),
        }

        let result = f.service.remove_from_breeding(&created.id, "ewe-2").await.unwrap();
        assert_eq!(result, RemoveFromBreedingResult::RecordDeleted);
        assert!(f.service.records().is_empty());
    }

    #[test]
    fn test_classify_precedence_and_ordering() {
        let records = vec![
            // Mixed: one awaiting confirmation, one confirmed; pregnancy confirmation wins
            record_with("mixed", Some(day(2025, 9, 1)), vec![FemaleBreedingInfo::new("a"), confirmed("b")]),
            record_with("waiting-birth", Some(day(2025, 9, 5)), vec![confirmed("c"), born("d")]),
            record_with("done-old", Some(day(2025, 8, 1)), vec![born("e")]),
            record_with("done-undated", None, vec![born("f")]),
            record_with("done-new", Some(day(2025, 9, 10)), vec![born("g")]),
            record_with("fresh", Some(day(2025, 9, 20)), vec![FemaleBreedingInfo::new("h")]),
        ];

        let classified = classify(&records);

        let ids = |bucket: &[BreedingRecord]| bucket.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&classified.needs_pregnancy_confirmation), vec!["fresh", "mixed"]);
        assert_eq!(ids(&classified.needs_birth_confirmation), vec!["waiting-birth"]);
        assert_eq!(ids(&classified.finished), vec!["done-new", "done-old", "done-undated"]);

        let total = classified.needs_pregnancy_confirmation.len()
            + classified.needs_birth_confirmation.len()
            + classified.finished.len();
        assert_eq!(total, records.len());
    }

    #[tokio::test]
    async fn test_queries_and_stats() {
        let f = fixture();
        let today = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();

        let mut due_soon = confirmed("ewe-1");
        due_soon.expected_birth_date = Some(day(2026, 1, 26));
        let mut lambed = born("ewe-2");
        lambed.offspring_ids = vec!["animal::l1".to_string(), "animal::l2".to_string()];

        let created = f
            .service
            .create_record(CreateBreedingRecordCommand {
                male_id: "ram".to_string(),
                female_breeding_info: vec![due_soon, lambed, FemaleBreedingInfo::new("ewe-3")],
                breeding_date: Some(day(2025, 9, 1)),
                notes: None,
            })
            .await
            .unwrap();
        f.service.create_record(create_command("ram-2", &["ewe-4"], day(2025, 9, 3))).await.unwrap();

        assert_eq!(f.service.get_records_by_animal("ewe-2").len(), 1);
        assert_eq!(f.service.get_records_by_animal("ram-2").len(), 1);
        assert!(f.service.get_records_by_animal("nobody").is_empty());

        let pregnancies = f.service.get_active_pregnancies();
        assert_eq!(pregnancies.len(), 1);
        assert_eq!(pregnancies[0].record.id, created.id);
        assert_eq!(pregnancies[0].female.female_id, "ewe-1");

        let stats = f.service.get_stats_on(today);
        assert_eq!(
            stats,
            BreedingStats {
                total_records: 2,
                active_pregnancies: 1,
                upcoming_births: 1,
                total_offspring: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_births_window_cache_follows_mutations() {
        let f = fixture();
        let today = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();

        let mut info = confirmed("ewe");
        info.expected_birth_date = Some(day(2026, 1, 25));
        let created = f
            .service
            .create_record(CreateBreedingRecordCommand {
                male_id: "ram".to_string(),
                female_breeding_info: vec![info],
                breeding_date: Some(day(2025, 9, 1)),
                notes: None,
            })
            .await
            .unwrap();

        let first = f.service.get_births_window_on(7, today);
        let second = f.service.get_births_window_on(7, today);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.upcoming[0].days_diff, 5);

        let mut females = created.female_breeding_info.clone();
        females[0].expected_birth_date = Some(day(2026, 1, 17));
        f.service
            .update_record(
                &created.id,
                UpdateBreedingRecordCommand {
                    female_breeding_info: Some(females),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let third = f.service.get_births_window_on(7, today);
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(third.upcoming.is_empty());
        assert_eq!(third.past_due[0].days_diff, -3);

        let summary = f.service.get_births_window_summary_on(7, today);
        assert_eq!(summary, BirthsWindowSummary { past_due: 1, upcoming: 0, window_days: 7 });
    }

    #[tokio::test]
    async fn test_load_farm_and_remote_snapshots() {
        let f = fixture();
        let mut other_farm = record_with("r-other", Some(day(2025, 9, 1)), vec![FemaleBreedingInfo::new("x")]);
        other_farm.farm_id = "valley-farm".to_string();
        f.store.create_record(&record_with("r-1", Some(day(2025, 9, 1)), vec![FemaleBreedingInfo::new("a")])).await.unwrap();
        f.store.create_record(&other_farm).await.unwrap();

        assert_eq!(f.service.load_farm().await.unwrap(), 1);
        let mut watcher = f.service.subscribe();
        assert_eq!(watcher.borrow_and_update().len(), 1);

        let ignored = f.service.apply_remote_snapshot(FarmSnapshot {
            farm_id: "valley-farm".to_string(),
            records: Vec::new(),
        });
        assert!(!ignored);
        assert_eq!(f.service.records().len(), 1);

        let applied = f.service.apply_remote_snapshot(FarmSnapshot {
            farm_id: "hill-farm".to_string(),
            records: Vec::new(),
        });
        assert!(applied);
        assert!(f.service.records().is_empty());
        assert!(watcher.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_change_listener_applies_store_events() {
        let f = fixture();
        let handle = f.service.spawn_change_listener();
        let mut watcher = f.service.subscribe();

        f.store
            .create_record(&record_with("r-remote", Some(day(2025, 9, 1)), vec![FemaleBreedingInfo::new("a")]))
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), watcher.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(f.service.records()[0].id, "r-remote");
        handle.abort();
    }

    #[test]
    fn test_breeding_id_format_uses_two_digit_year() {
        let date = day(2025, 3, 7);
        assert_eq!(local_date(date).format("%d-%m-%y").to_string(), "07-03-25");
    }

    #[tokio::test]
    async fn test_offspring_without_birth_is_rejected() {
        let f = fixture();
        let mut info = FemaleBreedingInfo::new("ewe");
        info.offspring_ids = vec!["animal::lamb".to_string()];

        let result = f
            .service
            .create_record(CreateBreedingRecordCommand {
                male_id: "ram".to_string(),
                female_breeding_info: vec![info.clone()],
                breeding_date: Some(day(2025, 9, 1)),
                notes: None,
            })
            .await;
        assert!(matches!(result, Err(BreedingError::Validation(_))));
        assert!(f.store.stored_records().is_empty());

        let created = f.service.create_record(create_command("ram", &["ewe"], day(2025, 9, 1))).await.unwrap();
        let result = f
            .service
            .update_record(
                &created.id,
                UpdateBreedingRecordCommand {
                    female_breeding_info: Some(vec![info]),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(BreedingError::Validation(_))));
        assert!(f.store.stored_records()[0].female_breeding_info[0].offspring_ids.is_empty());
        assert!(f.service.records()[0].female_breeding_info[0].offspring_ids.is_empty());
    }

    #[tokio::test]
    async fn test_other_farms_records_are_not_reachable() {
        let f = fixture();
        let mut foreign = record_with("r-valley", Some(day(2025, 9, 1)), vec![FemaleBreedingInfo::new("x")]);
        foreign.farm_id = "valley-farm".to_string();
        f.store.create_record(&foreign).await.unwrap();
        f.service.load_farm().await.unwrap();

        let found = f.service.find_record("r-valley").await;
        assert!(matches!(found, Err(BreedingError::NotFound(_))));

        let updated = f
            .service
            .update_record(
                "r-valley",
                UpdateBreedingRecordCommand {
                    notes: Some("not mine".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(updated, Err(BreedingError::NotFound(_))));

        let deleted = f.service.delete_record("r-valley").await;
        assert!(matches!(deleted, Err(BreedingError::NotFound(_))));

        assert!(f.service.records().is_empty());
        assert_eq!(f.service.get_stats().total_records, 0);
        assert_eq!(f.store.stored_records(), vec![foreign]);
    }

    #[tokio::test]
    async fn test_mutations_require_signed_in_actor() {
        let f = fixture();
        let created = f.service.create_record(create_command("ram", &["ewe-1", "ewe-2"], day(2025, 9, 1))).await.unwrap();
        f.session.sign_out().unwrap();

        let updated = f
            .service
            .update_record(
                &created.id,
                UpdateBreedingRecordCommand {
                    notes: Some("signed out".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(updated, Err(BreedingError::Validation(_))));

        let unconfirmed = f.service.unconfirm_pregnancy(&created.id, "ewe-1").await;
        assert!(matches!(unconfirmed, Err(BreedingError::Validation(_))));

        let removed = f.service.remove_from_breeding(&created.id, "ewe-2").await;
        assert!(matches!(removed, Err(BreedingError::Validation(_))));

        let deleted = f.service.delete_record(&created.id).await;
        assert!(matches!(deleted, Err(BreedingError::Validation(_))));

        let stored = f.store.stored_records();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].female_breeding_info.len(), 2);
        assert!(stored[0].notes.is_empty());
    }
}
