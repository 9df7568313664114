//! Identity and session context.
//!
//! Mutating breeding operations need to know who is acting and on which
//! farm. `SessionService` keeps both in memory and, when backed by a
//! [`GlobalConfigStorage`], persists them across restarts.

use anyhow::Result;
use log::info;
use std::sync::{Arc, RwLock};

use crate::backend::domain::errors::BreedingError;
use crate::backend::storage::GlobalConfigStorage;

pub trait SessionContext: Send + Sync {
    fn current_actor_id(&self) -> Option<String>;
    fn current_farm_id(&self) -> Option<String>;
}

/// Actor and farm, both present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub actor_id: String,
    pub farm_id: String,
}

/// Fails with `BreedingError::Validation` unless both an actor and a farm are set
pub fn require_active(session: &dyn SessionContext) -> Result<ActiveSession, BreedingError> {
    let farm_id = session
        .current_farm_id()
        .ok_or_else(|| BreedingError::validation("No active farm selected"))?;
    let actor_id = session
        .current_actor_id()
        .ok_or_else(|| BreedingError::validation("No authenticated user"))?;
    Ok(ActiveSession { actor_id, farm_id })
}

#[derive(Debug, Clone, Default)]
struct Session {
    actor_id: Option<String>,
    farm_id: Option<String>,
}

#[derive(Clone, Default)]
pub struct SessionService {
    state: Arc<RwLock<Session>>,
    config_storage: Option<Arc<dyn GlobalConfigStorage>>,
}

impl SessionService {
    /// In-memory session with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Session restored from, and written back to, the global config
    pub fn with_storage(config_storage: Arc<dyn GlobalConfigStorage>) -> Result<Self> {
        let config = config_storage.get_global_config()?;
        info!(
            "Restored session: farm={:?}, actor={:?}",
            config.active_farm_id, config.active_actor_id
        );
        Ok(Self {
            state: Arc::new(RwLock::new(Session {
                actor_id: config.active_actor_id,
                farm_id: config.active_farm_id,
            })),
            config_storage: Some(config_storage),
        })
    }

    pub fn sign_in(&self, actor_id: &str) -> Result<()> {
        info!("Signing in actor {}", actor_id);
        if let Some(storage) = &self.config_storage {
            storage.set_active_actor(Some(actor_id.to_string()))?;
        }
        self.write().actor_id = Some(actor_id.to_string());
        Ok(())
    }

    pub fn sign_out(&self) -> Result<()> {
        if let Some(storage) = &self.config_storage {
            storage.set_active_actor(None)?;
        }
        self.write().actor_id = None;
        Ok(())
    }

    pub fn set_active_farm(&self, farm_id: Option<&str>) -> Result<()> {
        info!("Switching active farm to {:?}", farm_id);
        if let Some(storage) = &self.config_storage {
            storage.set_active_farm(farm_id.map(str::to_string))?;
        }
        self.write().farm_id = farm_id.map(str::to_string);
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionContext for SessionService {
    fn current_actor_id(&self) -> Option<String> {
        self.read().actor_id.clone()
    }

    fn current_farm_id(&self) -> Option<String> {
        self.read().farm_id.clone()
    }
}
