//! # Backend Module
//!
//! Contains all non-transport logic for the herdbook breeding engine.
//!
//! This module is the orchestration layer that brings together:
//! - **Domain**: Breeding, pregnancy, birth and comment rules
//! - **Storage**: YAML/CSV file stores and in-memory stores
//! - **IO**: REST endpoints exposing the domain
//!
//! ## Architecture
//!
//! ```text
//! HTTP clients
//!     ↓
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (services, working set, caches)
//!     ↓
//! Storage Layer (breeding store, animal registry, global config)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::backend::config::AppConfig;
use crate::backend::domain::{
    BreedingService, CommentService, OffspringService, SessionContext, SessionService,
};
use crate::backend::storage::{
    AnimalRepository, AnimalStorage, BreedingRecordStorage, FileConnection, GlobalConfigRepository,
    YamlBreedingRepository,
};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
    pub breeding_service: BreedingService,
    pub offspring_service: OffspringService,
    pub comment_service: CommentService,
    /// Default window for births-window requests without `days`
    pub upcoming_days: u32,
}

/// Wire the services on top of the given stores
pub fn build_state(
    breeding_storage: Arc<dyn BreedingRecordStorage>,
    animal_storage: Arc<dyn AnimalStorage>,
    session_service: SessionService,
    upcoming_days: u32,
) -> AppState {
    let breeding_service = BreedingService::new(breeding_storage, Arc::new(session_service.clone()))
        .with_upcoming_days(upcoming_days);
    let offspring_service = OffspringService::new(breeding_service.clone(), animal_storage);
    let comment_service = CommentService::new(breeding_service.clone());

    AppState {
        session_service,
        breeding_service,
        offspring_service,
        comment_service,
        upcoming_days,
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up data directory {}", config.data_dir.display());
    let connection = FileConnection::open_with_redirect(&config.data_dir)?;

    info!("Restoring session");
    let session_service =
        SessionService::with_storage(Arc::new(GlobalConfigRepository::new(connection.clone())))?;
    if let Some(farm_id) = &config.farm_id {
        session_service.set_active_farm(Some(farm_id))?;
    }
    if let Some(actor_id) = &config.actor_id {
        session_service.sign_in(actor_id)?;
    }

    info!("Setting up domain model");
    let app_state = build_state(
        Arc::new(YamlBreedingRepository::new(connection.clone())),
        Arc::new(AnimalRepository::new(connection)),
        session_service,
        config.upcoming_days,
    );

    if app_state.session_service.current_farm_id().is_some() {
        app_state.breeding_service.load_farm().await?;
    } else {
        info!("No active farm selected; starting with an empty working set");
    }

    Ok(app_state)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("http://localhost:8080"))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api/breeding", io::rest::breeding_apis::router())
        .layer(cors)
        .with_state(app_state)
}
