//! Gestation config registry and breeding date arithmetic.
//!
//! Holds the static per-species gestation table plus the pure date and
//! season helpers the rest of the breeding domain relies on. Every date the
//! breeding engine persists is an instant at the start of a local calendar
//! day; the helpers here do all of their arithmetic in local calendar days so
//! daylight-saving transitions never shift a date by one.

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use shared::{BreedingRecord, Species};

/// Reproductive profile of a species
#[derive(Debug, Clone, PartialEq)]
pub struct GestationConfig {
    pub gestation_days: i64,
    /// Month (1-12) the breeding season opens; the range may wrap the year end
    pub breeding_season_start: Option<u32>,
    pub breeding_season_end: Option<u32>,
    pub average_litter_size: f32,
    pub min_breeding_age_months: u32,
    pub max_breeding_age_months: u32,
    pub breeding_cycle_days: u32,
    pub description: &'static str,
}

static SHEEP: GestationConfig = GestationConfig {
    gestation_days: 147,
    breeding_season_start: Some(8),
    breeding_season_end: Some(1),
    average_litter_size: 1.5,
    min_breeding_age_months: 7,
    max_breeding_age_months: 96,
    breeding_cycle_days: 17,
    description: "Sheep are seasonal breeders, cycling in autumn as days shorten.",
};

static GOAT: GestationConfig = GestationConfig {
    gestation_days: 150,
    breeding_season_start: Some(9),
    breeding_season_end: Some(2),
    average_litter_size: 2.0,
    min_breeding_age_months: 7,
    max_breeding_age_months: 96,
    breeding_cycle_days: 21,
    description: "Goats are seasonal breeders; twins are common.",
};

static CATTLE: GestationConfig = GestationConfig {
    gestation_days: 283,
    breeding_season_start: None,
    breeding_season_end: None,
    average_litter_size: 1.0,
    min_breeding_age_months: 15,
    max_breeding_age_months: 144,
    breeding_cycle_days: 21,
    description: "Cattle breed year-round; heifers should reach about 65% of mature weight first.",
};

static PIG: GestationConfig = GestationConfig {
    gestation_days: 114,
    breeding_season_start: None,
    breeding_season_end: None,
    average_litter_size: 10.0,
    min_breeding_age_months: 8,
    max_breeding_age_months: 72,
    breeding_cycle_days: 21,
    description: "Pigs breed year-round; gestation is roughly three months, three weeks and three days.",
};

static RABBIT: GestationConfig = GestationConfig {
    gestation_days: 31,
    breeding_season_start: None,
    breeding_season_end: None,
    average_litter_size: 6.0,
    min_breeding_age_months: 5,
    max_breeding_age_months: 48,
    breeding_cycle_days: 16,
    description: "Rabbits are induced ovulators and can be bred year-round.",
};

static HORSE: GestationConfig = GestationConfig {
    gestation_days: 340,
    breeding_season_start: Some(4),
    breeding_season_end: Some(9),
    average_litter_size: 1.0,
    min_breeding_age_months: 36,
    max_breeding_age_months: 240,
    breeding_cycle_days: 21,
    description: "Horses are long-day breeders, cycling from spring through late summer.",
};

impl GestationConfig {
    pub fn for_species(species: Species) -> &'static GestationConfig {
        match species {
            Species::Sheep => &SHEEP,
            Species::Goat => &GOAT,
            Species::Cattle => &CATTLE,
            Species::Pig => &PIG,
            Species::Rabbit => &RABBIT,
            Species::Horse => &HORSE,
        }
    }
}

/// Local calendar date of an instant
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

/// Today's local calendar date
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Start of the local day containing `instant`
pub fn local_day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    day_start_of(local_date(instant))
}

/// Instant at which the local calendar `date` begins
pub fn day_start_of(date: NaiveDate) -> DateTime<Utc> {
    from_local_naive(date.and_time(NaiveTime::default()))
}

/// Adds whole local calendar days, keeping the local time of day
pub fn add_local_days(instant: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    from_local_naive(instant.with_timezone(&Local).naive_local() + Duration::days(days))
}

fn from_local_naive(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Skipped by a DST jump; the hour after the gap is the day's first instant
        LocalResult::None => Local
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

/// Signed whole local days from `today` to the day of `instant`
pub fn days_until(instant: DateTime<Utc>, today: NaiveDate) -> i64 {
    local_date(instant).signed_duration_since(today).num_days()
}

pub fn expected_birth_date(breeding_date: DateTime<Utc>, species: Species) -> DateTime<Utc> {
    add_local_days(breeding_date, GestationConfig::for_species(species).gestation_days)
}

/// Earliest future birth date among the record's confirmed pregnancies.
///
/// A stored expected date wins; otherwise it is derived from the
/// confirmation date (or the breeding date) plus gestation. When no candidate
/// lies after `now`, falls back to the breeding date plus gestation.
pub fn next_expected_birth_date(
    record: &BreedingRecord,
    species: Species,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let next = record
        .female_breeding_info
        .iter()
        .filter(|info| info.is_active_pregnancy())
        .filter_map(|info| {
            info.expected_birth_date.or_else(|| {
                info.pregnancy_confirmed_date
                    .or(record.breeding_date)
                    .map(|base| expected_birth_date(base, species))
            })
        })
        .filter(|date| *date > now)
        .min();

    next.or_else(|| record.breeding_date.map(|date| expected_birth_date(date, species)))
}

pub fn is_in_breeding_season(date: DateTime<Utc>, species: Species) -> bool {
    let config = GestationConfig::for_species(species);
    let (start, end) = match (config.breeding_season_start, config.breeding_season_end) {
        (Some(start), Some(end)) => (start, end),
        _ => return true,
    };

    let month = date.with_timezone(&Local).month();
    if start <= end {
        month >= start && month <= end
    } else {
        month >= start || month <= end
    }
}

/// Advisory notes for a planned breeding, most important first
pub fn breeding_advice(
    breeding_date: DateTime<Utc>,
    species: Species,
    female_age_months: Option<u32>,
) -> Vec<String> {
    let config = GestationConfig::for_species(species);
    let mut advice = Vec::new();

    if !is_in_breeding_season(breeding_date, species) {
        if let (Some(start), Some(end)) = (config.breeding_season_start, config.breeding_season_end) {
            advice.push(format!(
                "Breeding date is outside the typical {} breeding season ({} to {})",
                species,
                month_name(start),
                month_name(end)
            ));
        }
    }

    if let Some(age) = female_age_months {
        if age < config.min_breeding_age_months {
            advice.push(format!(
                "Female may be too young for breeding (minimum {} months, is {} months)",
                config.min_breeding_age_months, age
            ));
        } else if age > config.max_breeding_age_months {
            advice.push(format!(
                "Female may be too old for breeding (maximum {} months, is {} months)",
                config.max_breeding_age_months, age
            ));
        }
    }

    advice.push(config.description.to_string());
    advice.push(format!("Average litter size: {:.1}", config.average_litter_size));
    advice
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January", 2 => "February", 3 => "March", 4 => "April",
        5 => "May", 6 => "June", 7 => "July", 8 => "August",
        9 => "September", 10 => "October", 11 => "November", 12 => "December",
        _ => "Invalid Month",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FemaleBreedingInfo;

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn record_bred_on(date: DateTime<Utc>, females: Vec<FemaleBreedingInfo>) -> BreedingRecord {
        BreedingRecord {
            id: "breeding::test".to_string(),
            breeding_id: "01-01-25-01".to_string(),
            farm_id: "farm-1".to_string(),
            male_id: "ram-1".to_string(),
            female_breeding_info: females,
            breeding_date: Some(date),
            notes: String::new(),
            comments: Vec::new(),
            created_at: date,
            updated_at: date,
            revision: 0,
        }
    }

    #[test]
    fn test_expected_birth_date_adds_exact_gestation() {
        let bred = day_start_of(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        let expected = expected_birth_date(bred, Species::Sheep);

        assert_eq!(
            local_date(expected),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap() + Duration::days(147)
        );
        assert_eq!(local_date(expected).signed_duration_since(local_date(bred)).num_days(), 147);
        assert_eq!(expected, day_start_of(local_date(expected)));
    }

    #[test]
    fn test_season_wraps_year_end() {
        assert!(is_in_breeding_season(noon(2025, 12, 15), Species::Sheep));
        assert!(is_in_breeding_season(noon(2026, 1, 15), Species::Sheep));
        assert!(is_in_breeding_season(noon(2025, 8, 15), Species::Sheep));
        assert!(!is_in_breeding_season(noon(2025, 4, 15), Species::Sheep));
    }

    #[test]
    fn test_season_non_wrapping_and_unconfigured() {
        assert!(is_in_breeding_season(noon(2025, 6, 15), Species::Horse));
        assert!(!is_in_breeding_season(noon(2025, 11, 15), Species::Horse));
        assert!(is_in_breeding_season(noon(2025, 4, 15), Species::Cattle));
    }

    #[test]
    fn test_breeding_advice_order() {
        let advice = breeding_advice(noon(2025, 4, 15), Species::Sheep, Some(4));

        assert_eq!(advice.len(), 4);
        assert!(advice[0].contains("outside the typical sheep breeding season"));
        assert!(advice[1].contains("too young"));
        assert_eq!(advice[2], SHEEP.description);
        assert_eq!(advice[3], "Average litter size: 1.5");
    }

    #[test]
    fn test_breeding_advice_in_season_adult() {
        let advice = breeding_advice(noon(2025, 10, 1), Species::Sheep, Some(30));
        assert_eq!(advice.len(), 2);

        let advice = breeding_advice(noon(2025, 10, 1), Species::Sheep, Some(120));
        assert!(advice[0].contains("too old"));
    }

    #[test]
    fn test_next_expected_prefers_stored_and_earliest_future() {
        let now = noon(2025, 10, 1);
        let mut stored = FemaleBreedingInfo::new("ewe-1");
        stored.pregnancy_confirmed_date = Some(noon(2025, 9, 1));
        stored.expected_birth_date = Some(noon(2026, 1, 10));

        let mut derived = FemaleBreedingInfo::new("ewe-2");
        derived.pregnancy_confirmed_date = Some(noon(2025, 8, 1));

        let record = record_bred_on(noon(2025, 7, 20), vec![stored, derived]);
        let next = next_expected_birth_date(&record, Species::Sheep, now).unwrap();

        assert_eq!(next, expected_birth_date(noon(2025, 8, 1), Species::Sheep));
    }

    #[test]
    fn test_next_expected_falls_back_to_breeding_date() {
        let now = noon(2026, 6, 1);
        let mut past = FemaleBreedingInfo::new("ewe-1");
        past.pregnancy_confirmed_date = Some(noon(2025, 9, 1));
        past.expected_birth_date = Some(noon(2026, 1, 20));

        let record = record_bred_on(noon(2025, 8, 20), vec![past]);
        let next = next_expected_birth_date(&record, Species::Sheep, now).unwrap();

        assert_eq!(next, expected_birth_date(noon(2025, 8, 20), Species::Sheep));
    }

    #[test]
    fn test_days_until_is_signed() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        assert_eq!(days_until(day_start_of(NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()), today), -3);
        assert_eq!(days_until(day_start_of(NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()), today), 5);
        assert_eq!(days_until(day_start_of(today), today), 0);
    }
}
