use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Server-issued identifier. The habit service hands out integers, but the
/// client treats ids as opaque and round-trips whatever it was given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

pub type HabitId = RecordId;

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Text(raw.to_string()),
        }
    }
}

pub const DEFAULT_HABIT_COLOR: &str = "#2f7cff";
pub const DEFAULT_TARGET_PER_WEEK: i64 = 7;

/// A habit exactly as the server reports it. Aggregates are optional on the
/// wire and are never recomputed locally; see `habits::derive` for the
/// display fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub target_per_week: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub streak: Option<i64>,
    #[serde(default)]
    pub best_streak: Option<i64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub completed_days: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_completed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHabit {
    pub name: String,
    pub color: String,
    pub target_per_week: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HabitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_per_week: Option<u8>,
}

impl HabitPatch {
    pub fn completion(completed: bool) -> Self {
        HabitPatch {
            completed: Some(completed),
            ..HabitPatch::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.color.is_none() && self.target_per_week.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitSnapshot {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub target_per_week: Option<i64>,
}

/// Ideal vs actual cumulative completions for one habit over one range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSeries {
    pub dates: Vec<String>,
    pub ideal: Vec<f64>,
    pub actual: Vec<f64>,
    pub habit: HabitSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: RecordId,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewJournalEntry<'a> {
    pub content: &'a str,
}

impl JournalEntry {
    /// Accepts RFC 3339 instants as well as the naive local timestamps the
    /// habit service emits (`2024-03-01T08:15:02.123456`). Both come back as
    /// local wall-clock time so mixed feeds compare on one clock.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Local).naive_local());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }

    pub fn display_timestamp(&self) -> String {
        self.parsed_timestamp()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| self.timestamp.clone())
    }
}

/// Newest first. Entries whose timestamp cannot be parsed sink to the end.
pub fn newest_first(a: &JournalEntry, b: &JournalEntry) -> Ordering {
    match (a.parsed_timestamp(), b.parsed_timestamp()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.timestamp.cmp(&a.timestamp),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdealSelf {
    #[serde(default)]
    pub vision: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

impl IdealSelf {
    pub fn from_input(vision: &str, focus_input: &str) -> Self {
        IdealSelf {
            vision: vision.trim().to_string(),
            focus_areas: parse_focus_areas(focus_input),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.vision.trim().is_empty() && self.focus_areas.is_empty()
    }

    pub fn focus_areas_text(&self) -> String {
        self.focus_areas.join(", ")
    }
}

pub fn parse_focus_areas(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, ts: &str) -> JournalEntry {
        JournalEntry {
            id: RecordId::Int(id),
            content: format!("entry {}", id),
            timestamp: ts.to_string(),
        }
    }

    #[test]
    fn habit_tolerates_missing_aggregates() {
        let habit: Habit = serde_json::from_str(r#"{"id": 4, "name": "Read"}"#).unwrap();
        assert_eq!(habit.id, RecordId::Int(4));
        assert!(habit.target_per_week.is_none());
        assert!(habit.streak.is_none());
        assert!(!habit.completed);
    }

    #[test]
    fn record_id_accepts_strings_and_numbers() {
        let ids: Vec<RecordId> = serde_json::from_str(r#"[7, "abc"]"#).unwrap();
        assert_eq!(ids[0], RecordId::Int(7));
        assert_eq!(ids[1], RecordId::Text("abc".into()));
        assert_eq!(RecordId::from("12"), RecordId::Int(12));
        assert_eq!(RecordId::from("x9").to_string(), "x9");
    }

    #[test]
    fn focus_areas_parse_and_rejoin() {
        let record = IdealSelf::from_input("  Be consistent ", "health, focus,, ");
        assert_eq!(record.vision, "Be consistent");
        assert_eq!(record.focus_areas, vec!["health", "focus"]);
        assert_eq!(record.focus_areas_text(), "health, focus");
    }

    #[test]
    fn blank_ideal_self() {
        assert!(IdealSelf::from_input("   ", "").is_blank());
        assert!(!IdealSelf::from_input("", "sleep").is_blank());
    }

    #[test]
    fn journal_sorting_handles_naive_and_zoned_timestamps() {
        let mut entries = vec![
            entry(1, "2024-03-01T08:00:00.000001"),
            entry(2, "garbage"),
            entry(3, "2024-03-02T08:00:00Z"),
            entry(4, "2024-03-01T09:30:00"),
        ];
        entries.sort_by(newest_first);
        let order: Vec<String> = entries.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(order, vec!["3", "4", "1", "2"]);
    }

    #[test]
    fn zoned_timestamps_compare_in_local_time() {
        let instant = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z").unwrap();
        let local = instant.with_timezone(&Local).naive_local();
        assert_eq!(
            entry(1, "2024-03-01T12:00:00Z").parsed_timestamp(),
            Some(local)
        );

        let later = (local + chrono::Duration::minutes(1))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        let mut entries = vec![entry(1, "2024-03-01T12:00:00Z"), entry(2, &later)];
        entries.sort_by(newest_first);
        assert_eq!(entries[0].id, RecordId::Int(2));
    }

    #[test]
    fn patch_skips_unset_fields() {
        let body = serde_json::to_value(HabitPatch::completion(true)).unwrap();
        assert_eq!(body, serde_json::json!({"completed": true}));
        assert!(HabitPatch::default().is_empty());
    }
}
