//! Test utilities for file-backed storage tests.
//!
//! `TestEnvironment` owns a temporary directory that is removed when the
//! environment is dropped, even if the test panics.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use shared::{AnimalStage, AnimalStatus, BreedingRecord, FemaleBreedingInfo, Gender, NewAnimal, Species};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::connection::FileConnection;

pub struct TestEnvironment {
    /// Kept alive so the directory survives until drop
    _temp_dir: TempDir,
    pub connection: FileConnection,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("herdbook_test_").tempdir()?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = FileConnection::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_path
    }
}

pub fn sample_record(id: &str, farm_id: &str, male_id: &str) -> BreedingRecord {
    let bred = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    BreedingRecord {
        id: id.to_string(),
        breeding_id: "01-09-25-01".to_string(),
        farm_id: farm_id.to_string(),
        male_id: male_id.to_string(),
        female_breeding_info: vec![FemaleBreedingInfo::new("ewe-1")],
        breeding_date: Some(bred),
        notes: "first tupping".to_string(),
        comments: Vec::new(),
        created_at: bred,
        updated_at: bred,
        revision: 0,
    }
}

pub fn sample_new_animal(farm_id: &str, tag_number: &str) -> NewAnimal {
    NewAnimal {
        farm_id: farm_id.to_string(),
        tag_number: tag_number.to_string(),
        species: Species::Sheep,
        gender: Gender::Female,
        stage: AnimalStage::Newborn,
        status: AnimalStatus::Active,
        color: None,
        weight_kg: None,
        health_notes: None,
        mother_id: Some("animal::ewe".to_string()),
        father_id: Some("animal::ram".to_string()),
        breeding_record_id: Some("breeding::1".to_string()),
        birth_date: Some(Utc.with_ymd_and_hms(2026, 1, 26, 0, 0, 0).unwrap()),
    }
}
