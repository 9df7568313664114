pub mod breeding_repository;
pub mod global_config_repository;

pub use breeding_repository::YamlBreedingRepository;
pub use global_config_repository::{GlobalConfig, GlobalConfigRepository};
