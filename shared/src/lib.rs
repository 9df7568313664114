use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Livestock species with a known gestation profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Sheep,
    Goat,
    Cattle,
    Pig,
    Rabbit,
    Horse,
}

impl Species {
    pub const ALL: [Species; 6] = [
        Species::Sheep,
        Species::Goat,
        Species::Cattle,
        Species::Pig,
        Species::Rabbit,
        Species::Horse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Sheep => "sheep",
            Species::Goat => "goat",
            Species::Cattle => "cattle",
            Species::Pig => "pig",
            Species::Rabbit => "rabbit",
            Species::Horse => "horse",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Species {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .iter()
            .copied()
            .find(|species| species.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariantError {
                kind: "species",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(UnknownVariantError {
                kind: "gender",
                value: s.to_string(),
            }),
        }
    }
}

/// Life stage of an animal; offspring are always registered as newborns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalStage {
    Newborn,
    Juvenile,
    Adult,
}

impl fmt::Display for AnimalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimalStage::Newborn => write!(f, "newborn"),
            AnimalStage::Juvenile => write!(f, "juvenile"),
            AnimalStage::Adult => write!(f, "adult"),
        }
    }
}

impl FromStr for AnimalStage {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newborn" => Ok(AnimalStage::Newborn),
            "juvenile" => Ok(AnimalStage::Juvenile),
            "adult" => Ok(AnimalStage::Adult),
            _ => Err(UnknownVariantError {
                kind: "stage",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalStatus {
    #[default]
    Active,
    Sold,
    Deceased,
}

impl fmt::Display for AnimalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimalStatus::Active => write!(f, "active"),
            AnimalStatus::Sold => write!(f, "sold"),
            AnimalStatus::Deceased => write!(f, "deceased"),
        }
    }
}

impl FromStr for AnimalStatus {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AnimalStatus::Active),
            "sold" => Ok(AnimalStatus::Sold),
            "deceased" => Ok(AnimalStatus::Deceased),
            _ => Err(UnknownVariantError {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Urgency tag attached to a breeding record comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrgencyLevel::None => write!(f, "none"),
            UrgencyLevel::Low => write!(f, "low"),
            UrgencyLevel::Medium => write!(f, "medium"),
            UrgencyLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariantError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariantError {}

/// A discussion entry on a breeding record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author_id: String,
    #[serde(default)]
    pub urgency: UrgencyLevel,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Comment ID in format: "comment::<uuid v4>"
    pub fn generate_id() -> String {
        format!("comment::{}", Uuid::new_v4())
    }
}

/// Pregnancy and birth sub-state for one female within a breeding record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FemaleBreedingInfo {
    pub female_id: String,
    #[serde(default)]
    pub pregnancy_confirmed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_birth_date: Option<DateTime<Utc>>,
    /// Animals registered from this female's birth
    #[serde(default)]
    pub offspring_ids: Vec<String>,
}

impl FemaleBreedingInfo {
    pub fn new(female_id: impl Into<String>) -> Self {
        Self {
            female_id: female_id.into(),
            pregnancy_confirmed_date: None,
            expected_birth_date: None,
            actual_birth_date: None,
            offspring_ids: Vec::new(),
        }
    }

    /// A birth has been recorded for this female
    pub fn is_finished(&self) -> bool {
        self.actual_birth_date.is_some()
    }

    /// Confirmed pregnant and not yet given birth
    pub fn is_active_pregnancy(&self) -> bool {
        self.pregnancy_confirmed_date.is_some() && self.actual_birth_date.is_none()
    }

    /// Neither confirmed pregnant nor given birth
    pub fn awaits_pregnancy_confirmation(&self) -> bool {
        self.pregnancy_confirmed_date.is_none() && self.actual_birth_date.is_none()
    }
}

/// One mating event: a single male with one or more females
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingRecord {
    pub id: String,
    /// Human-readable sequence id, `dd-mm-yy-NN`
    pub breeding_id: String,
    pub farm_id: String,
    pub male_id: String,
    pub female_breeding_info: Vec<FemaleBreedingInfo>,
    #[serde(default)]
    pub breeding_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    /// Newest first
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Local change counter stamped by the working set
    #[serde(default, skip_serializing)]
    pub revision: u64,
}

impl BreedingRecord {
    /// Breeding record ID in format: "breeding::<uuid v4>"
    pub fn generate_id() -> String {
        format!("breeding::{}", Uuid::new_v4())
    }

    pub fn female(&self, female_id: &str) -> Option<&FemaleBreedingInfo> {
        self.female_breeding_info
            .iter()
            .find(|info| info.female_id == female_id)
    }

    pub fn female_mut(&mut self, female_id: &str) -> Option<&mut FemaleBreedingInfo> {
        self.female_breeding_info
            .iter_mut()
            .find(|info| info.female_id == female_id)
    }

    /// True when the animal is the male or one of the females
    pub fn involves_animal(&self, animal_id: &str) -> bool {
        self.male_id == animal_id || self.female(animal_id).is_some()
    }

    pub fn offspring_count(&self) -> usize {
        self.female_breeding_info
            .iter()
            .map(|info| info.offspring_ids.len())
            .sum()
    }
}

/// A registered animal as seen by the animal registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: String,
    pub farm_id: String,
    pub tag_number: String,
    pub species: Species,
    pub gender: Gender,
    pub stage: AnimalStage,
    #[serde(default)]
    pub status: AnimalStatus,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub health_notes: Option<String>,
    #[serde(default)]
    pub mother_id: Option<String>,
    #[serde(default)]
    pub father_id: Option<String>,
    #[serde(default)]
    pub breeding_record_id: Option<String>,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Animal {
    /// Animal ID in format: "animal::<uuid v4>"
    pub fn generate_id() -> String {
        format!("animal::{}", Uuid::new_v4())
    }
}

/// Input for registering a new animal; the registry assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnimal {
    pub farm_id: String,
    pub tag_number: String,
    pub species: Species,
    pub gender: Gender,
    pub stage: AnimalStage,
    pub status: AnimalStatus,
    pub color: Option<String>,
    pub weight_kg: Option<f64>,
    pub health_notes: Option<String>,
    pub mother_id: Option<String>,
    pub father_id: Option<String>,
    pub breeding_record_id: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
}

impl NewAnimal {
    /// Materialize the animal under a freshly generated id
    pub fn register(&self, created_at: DateTime<Utc>) -> Animal {
        Animal {
            id: Animal::generate_id(),
            farm_id: self.farm_id.clone(),
            tag_number: self.tag_number.clone(),
            species: self.species,
            gender: self.gender,
            stage: self.stage,
            status: self.status,
            color: self.color.clone(),
            weight_kg: self.weight_kg,
            health_notes: self.health_notes.clone(),
            mother_id: self.mother_id.clone(),
            father_id: self.father_id.clone(),
            breeding_record_id: self.breeding_record_id.clone(),
            birth_date: self.birth_date,
            created_at,
        }
    }
}

/// Per-offspring details captured when a birth is recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffspringSpec {
    pub tag_number: String,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    pub gender: Gender,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub status: AnimalStatus,
    #[serde(default)]
    pub health_notes: Option<String>,
}

/// A female whose expected birth falls inside the requested window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthWindowEntry {
    pub record: BreedingRecord,
    pub female: FemaleBreedingInfo,
    /// Expected birth day minus today, in whole local days
    pub days_diff: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthsWindow {
    /// Most overdue first
    pub past_due: Vec<BirthWindowEntry>,
    /// Soonest first
    pub upcoming: Vec<BirthWindowEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthsWindowSummary {
    pub past_due: usize,
    pub upcoming: usize,
    pub window_days: u32,
}

/// A confirmed pregnancy that has not yet ended in a recorded birth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePregnancy {
    pub record: BreedingRecord,
    pub female: FemaleBreedingInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingStats {
    pub total_records: usize,
    pub active_pregnancies: usize,
    pub upcoming_births: usize,
    pub total_offspring: usize,
}

/// Records partitioned by what they are waiting for
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedRecords {
    pub needs_pregnancy_confirmation: Vec<BreedingRecord>,
    pub needs_birth_confirmation: Vec<BreedingRecord>,
    pub finished: Vec<BreedingRecord>,
}

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBreedingRecordRequest {
    pub male_id: String,
    pub female_breeding_info: Vec<FemaleBreedingInfo>,
    #[serde(default)]
    pub breeding_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update: only fields that are present are merged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBreedingRecordRequest {
    #[serde(default)]
    pub male_id: Option<String>,
    #[serde(default)]
    pub female_breeding_info: Option<Vec<FemaleBreedingInfo>>,
    #[serde(default)]
    pub breeding_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingRecordResponse {
    pub record: BreedingRecord,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingRecordListResponse {
    pub records: Vec<BreedingRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPregnancyRequest {
    pub female_id: String,
    pub confirmed_date: DateTime<Utc>,
    pub species: Species,
    #[serde(default)]
    pub expected_birth_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnconfirmPregnancyRequest {
    pub female_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromBreedingRequest {
    pub animal_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromBreedingResponse {
    /// None when the whole record was deleted
    pub record: Option<BreedingRecord>,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBirthRequest {
    pub female_id: String,
    pub actual_birth_date: DateTime<Utc>,
    pub offspring: Vec<OffspringSpec>,
    /// Used when the mother is not known to the animal registry
    #[serde(default)]
    pub species: Option<Species>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBirthResponse {
    pub record: BreedingRecord,
    pub offspring_ids: Vec<String>,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffspringListResponse {
    pub animals: Vec<Animal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetractOffspringRequest {
    pub offspring_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub content: String,
    #[serde(default)]
    pub urgency: UrgencyLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentUrgencyRequest {
    pub urgency: UrgencyLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthsWindowRequest {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingAdviceRequest {
    pub breeding_date: DateTime<Utc>,
    pub species: Species,
    #[serde(default)]
    pub female_age_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingAdviceResponse {
    pub expected_birth_date: DateTime<Utc>,
    pub in_season: bool,
    pub advice: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_parse_and_display() {
        assert_eq!("Sheep".parse::<Species>().unwrap(), Species::Sheep);
        assert_eq!(" goat ".parse::<Species>().unwrap(), Species::Goat);
        assert!("llama".parse::<Species>().is_err());
        assert_eq!(Species::Cattle.to_string(), "cattle");
    }

    #[test]
    fn test_female_state_helpers() {
        let mut info = FemaleBreedingInfo::new("ewe-1");
        assert!(info.awaits_pregnancy_confirmation());
        assert!(!info.is_active_pregnancy());

        info.pregnancy_confirmed_date = Some(Utc::now());
        assert!(info.is_active_pregnancy());
        assert!(!info.awaits_pregnancy_confirmation());

        info.actual_birth_date = Some(Utc::now());
        assert!(info.is_finished());
        assert!(!info.is_active_pregnancy());
    }

    #[test]
    fn test_record_serializes_with_camel_case_field_names() {
        let now = Utc::now();
        let record = BreedingRecord {
            id: "breeding::1".to_string(),
            breeding_id: "01-03-25-01".to_string(),
            farm_id: "farm-1".to_string(),
            male_id: "ram-1".to_string(),
            female_breeding_info: vec![FemaleBreedingInfo::new("ewe-1")],
            breeding_date: Some(now),
            notes: String::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 7,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("breedingId").is_some());
        assert!(json.get("maleId").is_some());
        assert!(json["femaleBreedingInfo"][0].get("expectedBirthDate").is_some());
        assert!(json.get("revision").is_none());

        let parsed: BreedingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.revision, 0);
        assert_eq!(parsed.breeding_id, "01-03-25-01");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(Comment::generate_id(), Comment::generate_id());
        assert!(BreedingRecord::generate_id().starts_with("breeding::"));
        assert!(Animal::generate_id().starts_with("animal::"));
    }
}
