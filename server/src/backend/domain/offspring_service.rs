//! Offspring linkage.
//!
//! Recording a birth registers every offspring in the animal registry and
//! then links them back to the mother's entry in the breeding record. The
//! registry writes happen one by one; if any of them fails the record is left
//! untouched and the ids already created are handed back so the caller can
//! retract them.

use log::{error, info, warn};
use shared::{Animal, AnimalStage, NewAnimal};
use std::sync::Arc;

use crate::backend::domain::breeding_service::BreedingService;
use crate::backend::domain::commands::breeding::UpdateBreedingRecordCommand;
use crate::backend::domain::commands::offspring::{RecordBirthCommand, RecordBirthResult};
use crate::backend::domain::errors::BreedingError;
use crate::backend::domain::gestation::local_day_start;
use crate::backend::storage::AnimalStorage;

#[derive(Clone)]
pub struct OffspringService {
    breeding_service: BreedingService,
    animal_storage: Arc<dyn AnimalStorage>,
}

impl OffspringService {
    pub fn new(breeding_service: BreedingService, animal_storage: Arc<dyn AnimalStorage>) -> Self {
        Self {
            breeding_service,
            animal_storage,
        }
    }

    pub async fn record_birth(&self, command: RecordBirthCommand) -> Result<RecordBirthResult, BreedingError> {
        info!(
            "Recording birth of {} offspring for {} in record {}",
            command.offspring.len(),
            command.female_id,
            command.record_id
        );
        self.breeding_service.require_session("record birth")?;

        let record = self.breeding_service.find_record(&command.record_id).await?;
        if record.female(&command.female_id).is_none() {
            return Err(BreedingError::validation(format!(
                "Animal {} is not part of breeding {}",
                command.female_id, record.breeding_id
            )));
        }

        let species = match self.animal_storage.get_animal(&command.female_id).await {
            Ok(Some(mother)) => Some(mother.species),
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read mother {}: {}", command.female_id, e);
                None
            }
        }
        .or(command.fallback_species)
        .ok_or_else(|| {
            BreedingError::validation(format!("Species of {} is unknown", command.female_id))
        })?;

        let birth_date = local_day_start(command.actual_birth_date);
        let mut created_ids = Vec::with_capacity(command.offspring.len());

        for (index, spec) in command.offspring.iter().enumerate() {
            let new_animal = NewAnimal {
                farm_id: record.farm_id.clone(),
                tag_number: spec.tag_number.clone(),
                species,
                gender: spec.gender,
                stage: AnimalStage::Newborn,
                status: spec.status,
                color: spec.color.clone(),
                weight_kg: spec.weight_kg,
                health_notes: spec.health_notes.clone(),
                mother_id: Some(command.female_id.clone()),
                father_id: Some(record.male_id.clone()),
                breeding_record_id: Some(record.id.clone()),
                birth_date: Some(birth_date),
            };

            match self.animal_storage.create_animal(&new_animal).await {
                Ok(id) => created_ids.push(id),
                Err(source) => {
                    error!(
                        "Offspring {} of {} failed after {} were created: {}",
                        index + 1,
                        command.offspring.len(),
                        created_ids.len(),
                        source
                    );
                    return Err(BreedingError::PartialBatchFailure {
                        created_ids,
                        failed_index: index,
                        source,
                    });
                }
            }
        }

        let mut females = record.female_breeding_info.clone();
        if let Some(female) = females.iter_mut().find(|info| info.female_id == command.female_id) {
            female.actual_birth_date = Some(birth_date);
            female.offspring_ids.extend(created_ids.iter().cloned());
        }

        let updated = self
            .breeding_service
            .update_record(
                &record.id,
                UpdateBreedingRecordCommand {
                    female_breeding_info: Some(females),
                    ..Default::default()
                },
            )
            .await?;

        info!("Linked {} offspring to record {}", created_ids.len(), updated.breeding_id);
        Ok(RecordBirthResult {
            record: updated,
            offspring_ids: created_ids,
        })
    }

    /// Deletes animals created by a failed `record_birth`; returns how many were removed
    pub async fn retract_offspring(&self, offspring_ids: &[String]) -> Result<usize, BreedingError> {
        info!("Retracting {} offspring", offspring_ids.len());
        self.breeding_service.require_session("retract offspring")?;
        for id in offspring_ids {
            self.animal_storage.delete_animal(id).await.map_err(|e| {
                error!("Failed to retract offspring {}: {}", id, e);
                BreedingError::from(e)
            })?;
        }
        Ok(offspring_ids.len())
    }

    /// Registered animals born from this breeding record
    pub async fn offspring_of(&self, record_id: &str) -> Result<Vec<Animal>, BreedingError> {
        let record = self.breeding_service.find_record(record_id).await?;
        let animals = self.animal_storage.list_animals(&record.farm_id).await.map_err(|e| {
            error!("Failed to list animals of farm {}: {}", record.farm_id, e);
            BreedingError::from(e)
        })?;
        Ok(animals
            .into_iter()
            .filter(|animal| animal.breeding_record_id.as_deref() == Some(record.id.as_str()))
            .collect())
    }
}
