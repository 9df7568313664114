//! Birth window calculations.
//!
//! Surfaces females whose expected birth is overdue ("past due") or coming
//! up within a window of days. Results are cached per window length and
//! reused until the working set's revision or the local day changes.

use chrono::NaiveDate;
use log::debug;
use shared::{BirthWindowEntry, BirthsWindow, BirthsWindowSummary, BreedingRecord};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};

use crate::backend::domain::gestation::days_until;
use crate::backend::domain::working_set::WorkingSet;

/// Content fingerprint of a record list: record ids plus each female's id
/// and date timestamps in epoch millis (0 when absent)
pub fn signature(records: &[BreedingRecord]) -> String {
    let mut signature = String::new();
    for record in records {
        signature.push_str(&record.id);
        for info in &record.female_breeding_info {
            let millis = |date: Option<chrono::DateTime<chrono::Utc>>| {
                date.map(|d| d.timestamp_millis()).unwrap_or(0)
            };
            let _ = write!(
                signature,
                "|{}:{}:{}:{}",
                info.female_id,
                millis(info.pregnancy_confirmed_date),
                millis(info.expected_birth_date),
                millis(info.actual_birth_date)
            );
        }
        signature.push(';');
    }
    signature
}

/// Splits pending births into past-due and upcoming relative to `today`
pub fn compute_births_window(records: &[BreedingRecord], days: u32, today: NaiveDate) -> BirthsWindow {
    let window = i64::from(days);
    let mut past_due = Vec::new();
    let mut upcoming = Vec::new();

    for record in records {
        for info in &record.female_breeding_info {
            if info.is_finished() {
                continue;
            }
            let Some(expected) = info.expected_birth_date else {
                continue;
            };

            let days_diff = days_until(expected, today);
            let entry = || BirthWindowEntry {
                record: record.clone(),
                female: info.clone(),
                days_diff,
            };

            if days_diff < 0 && -days_diff <= window {
                past_due.push(entry());
            } else if (0..=window).contains(&days_diff) {
                upcoming.push(entry());
            }
        }
    }

    past_due.sort_by_key(|entry| entry.days_diff);
    upcoming.sort_by_key(|entry| entry.days_diff);

    BirthsWindow { past_due, upcoming }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    revision: u64,
    today: NaiveDate,
}

#[derive(Default)]
struct WindowCache {
    windows: HashMap<u32, (CacheKey, Arc<BirthsWindow>)>,
    summaries: HashMap<u32, (CacheKey, BirthsWindowSummary)>,
}

/// Birth window calculator with a per-window-length cache
#[derive(Clone, Default)]
pub struct BirthWindowCalculator {
    cache: Arc<Mutex<WindowCache>>,
}

impl BirthWindowCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the same `Arc` for repeated calls while nothing has changed
    pub fn births_window(&self, set: &WorkingSet, days: u32, today: NaiveDate) -> Arc<BirthsWindow> {
        let key = CacheKey {
            revision: set.revision(),
            today,
        };

        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((cached_key, window)) = cache.windows.get(&days) {
            if *cached_key == key {
                return Arc::clone(window);
            }
        }

        debug!("Recomputing {}-day birth window at revision {}", days, key.revision);
        let window = Arc::new(compute_births_window(set.records(), days, today));
        cache.windows.insert(days, (key, Arc::clone(&window)));
        window
    }

    pub fn births_window_summary(&self, set: &WorkingSet, days: u32, today: NaiveDate) -> BirthsWindowSummary {
        let key = CacheKey {
            revision: set.revision(),
            today,
        };

        {
            let cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some((cached_key, summary)) = cache.summaries.get(&days) {
                if *cached_key == key {
                    return *summary;
                }
            }
        }

        let window = self.births_window(set, days, today);
        let summary = BirthsWindowSummary {
            past_due: window.past_due.len(),
            upcoming: window.upcoming.len(),
            window_days: days,
        };

        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.summaries.insert(days, (key, summary));
        summary
    }
}
