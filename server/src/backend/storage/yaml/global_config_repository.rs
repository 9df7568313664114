//! # YAML Global Config Repository
//!
//! Stores the active farm and actor in `global_config.yaml` at the root of
//! the data directory.
//!
//! ```yaml
//! active_farm_id: "hill-farm"
//! active_actor_id: "user-42"
//! data_format_version: "1.0"
//! created_at: "2025-01-21T19:30:00Z"
//! updated_at: "2025-01-21T19:35:00Z"
//! ```

use anyhow::Result;
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::backend::storage::connection::FileConnection;
use crate::backend::storage::traits::GlobalConfigStorage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Farm whose records mutating operations act on
    pub active_farm_id: Option<String>,
    /// Authenticated user performing changes
    pub active_actor_id: Option<String>,
    pub data_format_version: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            active_farm_id: None,
            active_actor_id: None,
            data_format_version: "1.0".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Clone)]
pub struct GlobalConfigRepository {
    connection: FileConnection,
}

impl GlobalConfigRepository {
    pub fn new(connection: FileConnection) -> Self {
        Self { connection }
    }

    fn config_path(&self) -> PathBuf {
        self.connection.base_directory().join("global_config.yaml")
    }

    fn load_or_create(&self) -> Result<GlobalConfig> {
        let config_path = self.config_path();

        if config_path.exists() {
            let yaml_content = fs::read_to_string(&config_path)?;
            let config: GlobalConfig = serde_yaml::from_str(&yaml_content)?;
            debug!("Loaded global config from {:?}", config_path);
            Ok(config)
        } else {
            let config = GlobalConfig::default();
            self.save(&config)?;
            info!("Created default global config at {:?}", config_path);
            Ok(config)
        }
    }

    fn save(&self, config: &GlobalConfig) -> Result<()> {
        let yaml_content = serde_yaml::to_string(config)?;
        self.connection
            .write_atomically(&self.config_path(), yaml_content.as_bytes())
    }

    fn modify(&self, change: impl FnOnce(&mut GlobalConfig)) -> Result<()> {
        let mut config = self.load_or_create()?;
        change(&mut config);
        config.updated_at = Utc::now().to_rfc3339();
        self.save(&config)
    }
}

impl GlobalConfigStorage for GlobalConfigRepository {
    fn get_global_config(&self) -> Result<GlobalConfig> {
        self.load_or_create()
    }

    fn set_active_farm(&self, farm_id: Option<String>) -> Result<()> {
        info!("Setting active farm: {:?}", farm_id);
        self.modify(|config| config.active_farm_id = farm_id)
    }

    fn set_active_actor(&self, actor_id: Option<String>) -> Result<()> {
        info!("Setting active actor: {:?}", actor_id);
        self.modify(|config| config.active_actor_id = actor_id)
    }
}
