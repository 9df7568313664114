//! # CSV Animal Repository
//!
//! File-based animal registry. Each farm's animals are stored in
//! `{farm_directory}/animals.csv`.
//!
//! ## CSV Format
//!
//! ```csv
//! id,farm_id,tag_number,species,gender,stage,status,color,weight_kg,health_notes,mother_id,father_id,breeding_record_id,birth_date,created_at
//! animal::9f0c...,hill-farm,UK0123,sheep,female,newborn,active,white,4.2,,animal::ewe,animal::ram,breeding::1a2b...,2025-03-02T00:00:00Z,2025-03-02T08:15:00Z
//! ```

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use shared::{Animal, NewAnimal};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::backend::storage::connection::FileConnection;
use crate::backend::storage::traits::{AnimalStorage, StorageError};

const ANIMALS_FILE: &str = "animals.csv";

/// CSV record structure for animals
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnimalRow {
    id: String,
    farm_id: String,
    tag_number: String,
    species: String,
    gender: String,
    stage: String,
    status: String,
    color: Option<String>,
    weight_kg: Option<f64>,
    health_notes: Option<String>,
    mother_id: Option<String>,
    father_id: Option<String>,
    breeding_record_id: Option<String>,
    birth_date: Option<String>,
    created_at: String,
}

impl From<&Animal> for AnimalRow {
    fn from(animal: &Animal) -> Self {
        AnimalRow {
            id: animal.id.clone(),
            farm_id: animal.farm_id.clone(),
            tag_number: animal.tag_number.clone(),
            species: animal.species.to_string(),
            gender: animal.gender.to_string(),
            stage: animal.stage.to_string(),
            status: animal.status.to_string(),
            color: animal.color.clone(),
            weight_kg: animal.weight_kg,
            health_notes: animal.health_notes.clone(),
            mother_id: animal.mother_id.clone(),
            father_id: animal.father_id.clone(),
            breeding_record_id: animal.breeding_record_id.clone(),
            birth_date: animal.birth_date.map(|date| date.to_rfc3339()),
            created_at: animal.created_at.to_rfc3339(),
        }
    }
}

impl TryFrom<AnimalRow> for Animal {
    type Error = anyhow::Error;

    fn try_from(row: AnimalRow) -> Result<Self> {
        let parse_date = |value: &str| -> Result<DateTime<Utc>> {
            Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
        };

        Ok(Animal {
            id: row.id,
            farm_id: row.farm_id,
            tag_number: row.tag_number,
            species: row.species.parse()?,
            gender: row.gender.parse()?,
            stage: row.stage.parse()?,
            status: row.status.parse()?,
            color: row.color,
            weight_kg: row.weight_kg,
            health_notes: row.health_notes,
            mother_id: row.mother_id,
            father_id: row.father_id,
            breeding_record_id: row.breeding_record_id,
            birth_date: row.birth_date.as_deref().map(parse_date).transpose()?,
            created_at: parse_date(&row.created_at)?,
        })
    }
}

#[derive(Clone)]
pub struct AnimalRepository {
    connection: FileConnection,
    write_lock: Arc<Mutex<()>>,
}

impl AnimalRepository {
    pub fn new(connection: FileConnection) -> Self {
        Self {
            connection,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn animals_file(&self, farm_id: &str) -> PathBuf {
        self.connection.farm_directory(farm_id).join(ANIMALS_FILE)
    }

    fn read_file(path: &Path) -> Result<Vec<Animal>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = Reader::from_path(path)?;
        let mut animals = Vec::new();
        for result in reader.deserialize::<AnimalRow>() {
            match result.map_err(anyhow::Error::from).and_then(Animal::try_from) {
                Ok(animal) => animals.push(animal),
                Err(e) => {
                    warn!("Failed to parse animal row in {}: {}. Skipping.", path.display(), e);
                    continue;
                }
            }
        }
        Ok(animals)
    }

    fn write_farm(&self, farm_id: &str, animals: &[Animal]) -> Result<()> {
        self.connection.ensure_farm_directory(farm_id)?;

        let mut writer = Writer::from_writer(Vec::new());
        for animal in animals {
            writer.serialize(AnimalRow::from(animal))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush animal CSV: {}", e))?;

        self.connection.write_atomically(&self.animals_file(farm_id), &bytes)
    }

    fn read_all(&self) -> Result<Vec<Animal>> {
        let mut animals = Vec::new();
        for farm_dir in self.connection.farm_directories()? {
            animals.extend(Self::read_file(&farm_dir.join(ANIMALS_FILE))?);
        }
        Ok(animals)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AnimalStorage for AnimalRepository {
    async fn create_animal(&self, new_animal: &NewAnimal) -> Result<String> {
        let _guard = self.lock();
        let mut animals = Self::read_file(&self.animals_file(&new_animal.farm_id))?;

        let animal = new_animal.register(Utc::now());

        let id = animal.id.clone();
        animals.push(animal);
        self.write_farm(&new_animal.farm_id, &animals)?;
        info!("Registered animal {} (tag {})", id, new_animal.tag_number);
        Ok(id)
    }

    async fn get_animal(&self, animal_id: &str) -> Result<Option<Animal>> {
        Ok(self.read_all()?.into_iter().find(|animal| animal.id == animal_id))
    }

    async fn delete_animal(&self, animal_id: &str) -> Result<()> {
        let _guard = self.lock();

        for farm_dir in self.connection.farm_directories()? {
            let mut animals = Self::read_file(&farm_dir.join(ANIMALS_FILE))?;
            let Some(index) = animals.iter().position(|animal| animal.id == animal_id) else {
                continue;
            };

            let removed = animals.remove(index);
            self.write_farm(&removed.farm_id, &animals)?;
            info!("Deleted animal {}", animal_id);
            return Ok(());
        }

        Err(StorageError::NotFound(format!("Animal not found: {}", animal_id)).into())
    }

    async fn list_animals(&self, farm_id: &str) -> Result<Vec<Animal>> {
        Self::read_file(&self.animals_file(farm_id))
    }
}
