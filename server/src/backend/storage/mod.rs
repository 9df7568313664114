//! # Storage Module
//!
//! Handles all data persistence for the breeding engine.
//!
//! The domain layer only sees the traits in [`traits`]; concrete backends are:
//!
//! - **YAML document store**: breeding records, one document per farm, with a
//!   live change feed
//! - **CSV animal registry**: one `animals.csv` per farm
//! - **YAML global config**: active farm and actor
//! - **In-memory stores**: embedding and tests

pub mod connection;
pub mod csv;
pub mod memory;
pub mod traits;
pub mod yaml;

#[cfg(test)]
pub mod test_utils;

pub use connection::FileConnection;
pub use self::csv::AnimalRepository;
pub use memory::{InMemoryAnimalRegistry, InMemoryBreedingStore};
pub use traits::{
    AnimalStorage, BreedingRecordStorage, FarmSnapshot, GlobalConfigStorage, RecordField,
    RecordFilter, StorageError,
};
pub use yaml::{GlobalConfig, GlobalConfigRepository, YamlBreedingRepository};
