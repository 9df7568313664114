//! Error taxonomy for the breeding domain.

use crate::backend::storage::StorageError;

/// Errors surfaced by breeding services to their callers
#[derive(Debug, thiserror::Error)]
pub enum BreedingError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),
    /// Offspring creation stopped partway; `created_ids` exist in the
    /// animal registry but are not linked to the breeding record
    #[error("Offspring {failed_index} of batch failed after {} were created: {source}", .created_ids.len())]
    PartialBatchFailure {
        created_ids: Vec<String>,
        failed_index: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl BreedingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BreedingError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BreedingError::NotFound(message.into())
    }
}

impl From<anyhow::Error> for BreedingError {
    /// Storage layers speak `anyhow`; a typed `StorageError::NotFound`
    /// inside is lifted to `BreedingError::NotFound`
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<StorageError>() {
            Some(StorageError::NotFound(id)) => BreedingError::NotFound(id.clone()),
            _ => BreedingError::Persistence(err),
        }
    }
}
