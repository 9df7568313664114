//! Domain-level command and result types.
//!
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the DTOs defined in the
//! `shared` crate to these internal types.

pub mod breeding {
    use chrono::{DateTime, Utc};
    use shared::{BreedingRecord, FemaleBreedingInfo, Species};

    /// Input for creating a new breeding record.
    #[derive(Debug, Clone)]
    pub struct CreateBreedingRecordCommand {
        pub male_id: String,
        pub female_breeding_info: Vec<FemaleBreedingInfo>,
        /// Defaults to now
        pub breeding_date: Option<DateTime<Utc>>,
        pub notes: Option<String>,
    }

    /// Partial update; `None` fields are left untouched.
    #[derive(Debug, Clone, Default)]
    pub struct UpdateBreedingRecordCommand {
        pub male_id: Option<String>,
        pub female_breeding_info: Option<Vec<FemaleBreedingInfo>>,
        pub breeding_date: Option<DateTime<Utc>>,
        pub notes: Option<String>,
    }

    /// Input for confirming one female's pregnancy.
    #[derive(Debug, Clone)]
    pub struct ConfirmPregnancyCommand {
        pub record_id: String,
        pub female_id: String,
        pub confirmed_date: DateTime<Utc>,
        pub species: Species,
        /// Derived from the gestation table when absent
        pub expected_birth_date: Option<DateTime<Utc>>,
    }

    /// Outcome of removing an animal from a breeding.
    #[derive(Debug, Clone, PartialEq)]
    pub enum RemoveFromBreedingResult {
        /// The male was removed, or the last female left
        RecordDeleted,
        FemaleRemoved(BreedingRecord),
    }
}

pub mod offspring {
    use chrono::{DateTime, Utc};
    use shared::{BreedingRecord, OffspringSpec, Species};

    /// Input for recording a birth and registering the offspring.
    #[derive(Debug, Clone)]
    pub struct RecordBirthCommand {
        pub record_id: String,
        pub female_id: String,
        pub actual_birth_date: DateTime<Utc>,
        pub offspring: Vec<OffspringSpec>,
        /// Used when the mother is not in the animal registry
        pub fallback_species: Option<Species>,
    }

    /// Result of a completed birth recording.
    #[derive(Debug, Clone)]
    pub struct RecordBirthResult {
        pub record: BreedingRecord,
        pub offspring_ids: Vec<String>,
    }
}

pub mod comments {
    use shared::UrgencyLevel;

    #[derive(Debug, Clone)]
    pub struct AddCommentCommand {
        pub record_id: String,
        pub content: String,
        pub urgency: UrgencyLevel,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateCommentUrgencyCommand {
        pub record_id: String,
        pub comment_id: String,
        pub urgency: UrgencyLevel,
    }
}
