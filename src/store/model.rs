//! Persisted user records and the document that holds them.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// `DD.MM.YYYY`
pub const DATE_FORMAT: &str = "%d.%m.%Y";
/// `HH:MM`
pub const TIME_FORMAT: &str = "%H:%M";
/// `DD.MM.YYYY HH:MM`
pub const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// The whole persisted state: user id → record.
pub type Document = BTreeMap<String, UserRecord>;

/// One remembered taste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasteEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    /// Exactly what the user typed.
    #[serde(default)]
    pub taste: String,
}

impl TasteEntry {
    /// Build an entry stamped with `at`.
    pub fn recorded_at(taste: &str, at: NaiveDateTime) -> Self {
        Self {
            date: at.format(DATE_FORMAT).to_string(),
            time: at.format(TIME_FORMAT).to_string(),
            taste: taste.to_string(),
        }
    }
}

/// Everything stored about one chat user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name; empty until the user picks one.
    #[serde(default)]
    pub name: String,
    /// Append-only, oldest first.
    #[serde(default)]
    pub tastes: Vec<TasteEntry>,
    /// Rewritten every time the name is set.
    #[serde(default)]
    pub registration_date: String,
}

impl UserRecord {
    /// A fresh, unnamed record registered at `at`.
    pub fn new_at(at: NaiveDateTime) -> Self {
        Self {
            name: String::new(),
            tastes: Vec::new(),
            registration_date: at.format(DATE_TIME_FORMAT).to_string(),
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn rename(&mut self, name: &str, at: NaiveDateTime) {
        self.name = name.to_string();
        self.registration_date = at.format(DATE_TIME_FORMAT).to_string();
    }
}

/// Source of wall-clock time for timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, 42)
            .unwrap()
    }

    #[test]
    fn taste_entry_uses_day_month_year() {
        let entry = TasteEntry::recorded_at("mango", at(9, 5));
        assert_eq!(entry.date, "07.03.2024");
        assert_eq!(entry.time, "09:05");
        assert_eq!(entry.taste, "mango");
    }

    #[test]
    fn taste_text_is_kept_verbatim() {
        let entry = TasteEntry::recorded_at("  Double Apple \n", at(0, 0));
        assert_eq!(entry.taste, "  Double Apple \n");
    }

    #[test]
    fn new_record_is_unnamed() {
        let record = UserRecord::new_at(at(21, 30));
        assert!(!record.has_name());
        assert!(record.tastes.is_empty());
        assert_eq!(record.registration_date, "07.03.2024 21:30");
    }

    #[test]
    fn rename_overwrites_registration_date() {
        let mut record = UserRecord::new_at(at(8, 0));
        record.rename("Alex", at(18, 45));
        assert_eq!(record.name, "Alex");
        assert_eq!(record.registration_date, "07.03.2024 18:45");
    }

    #[test]
    fn serialized_layout_matches_file_format() {
        let mut record = UserRecord::new_at(at(10, 0));
        record.rename("Jay", at(10, 1));
        record.tastes.push(TasteEntry::recorded_at("mint", at(10, 2)));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Jay",
                "tastes": [{"date": "07.03.2024", "time": "10:02", "taste": "mint"}],
                "registration_date": "07.03.2024 10:01"
            })
        );
    }

    #[test]
    fn missing_fields_default() {
        let record: UserRecord = serde_json::from_str(r#"{"name": "Old"}"#).unwrap();
        assert_eq!(record.name, "Old");
        assert!(record.tastes.is_empty());
        assert!(record.registration_date.is_empty());
    }

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock(at(1, 2));
        assert_eq!(clock.now(), clock.now());
    }
}
