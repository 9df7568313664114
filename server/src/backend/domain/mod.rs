//! # Domain Module
//!
//! Contains the business logic of the breeding lifecycle engine.
//!
//! It knows how breedings, pregnancies and births of a farm's animals are
//! tracked, independently of any storage backend or transport.
//!
//! ## Module Organization
//!
//! - **gestation**: Species gestation table, local-day date helpers and breeding advice
//! - **working_set**: The active farm's records held in memory with a revision counter
//! - **birth_window**: Past-due and upcoming births, cached per revision
//! - **breeding_service**: Breeding record CRUD, classification and derived views
//! - **offspring_service**: Recording births and linking offspring to the mother
//! - **comment_service**: Comments and urgency levels on records
//! - **session**: Who is acting and on which farm
//! - **commands**: Internal command/result types used by the services
//! - **errors**: The `BreedingError` taxonomy
//!
//! ## Core Concepts
//!
//! - **Breeding record**: One male bred with one or more females on a date
//! - **Female entry**: Per-female progress: confirmation, expected and actual birth, offspring
//! - **Classification**: Which step a record is waiting for
//! - **Births window**: Females due within, or overdue by at most, N days

pub mod birth_window;
pub mod breeding_service;
pub mod comment_service;
pub mod commands;
pub mod errors;
pub mod gestation;
pub mod offspring_service;
pub mod session;
pub mod working_set;

pub use birth_window::BirthWindowCalculator;
pub use breeding_service::{classify, BreedingService, DEFAULT_UPCOMING_DAYS};
pub use comment_service::CommentService;
pub use errors::BreedingError;
pub use gestation::GestationConfig;
pub use offspring_service::OffspringService;
pub use session::{require_active, ActiveSession, SessionContext, SessionService};
pub use working_set::{SharedWorkingSet, WorkingSet};
