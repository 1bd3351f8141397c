//! Recorded training rows and the "latest values" wire format.
//!
//! The latest-values endpoint answers, for each requested exercise name,
//! with the most recently recorded row. Values travel as strings and are
//! only trusted on the client once they parse to a positive number.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::{ItemInput, RemoteLatest, Selection};
use crate::input::parse_recorded_value;

/// One saved exercise line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRow {
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub reps: f64,
    pub sets: f64,
    pub created_at: DateTime<Utc>,
}

/// Latest-values response entry, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestEntry {
    pub weight: String,
    pub reps: String,
    pub sets: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
}

impl LatestEntry {
    pub fn from_row(row: &RecordedRow) -> Self {
        Self {
            weight: row.weight.to_string(),
            reps: row.reps.to_string(),
            sets: row.sets.to_string(),
            created_at: row.created_at.to_rfc3339(),
        }
    }

    /// Non-positive or unparsable values become unset.
    pub fn to_input(&self) -> ItemInput {
        ItemInput::new(
            parse_recorded_value(&self.weight),
            parse_recorded_value(&self.reps),
            parse_recorded_value(&self.sets),
        )
    }
}

/// Pick the most recent row per requested name.
///
/// Rows are ranked by `created_at` descending, then `id` descending; the
/// first row seen for a name wins. An empty request yields an empty map.
pub fn latest_by_name(rows: &[RecordedRow], names: &[String]) -> BTreeMap<String, LatestEntry> {
    let mut map = BTreeMap::new();
    if names.is_empty() {
        return map;
    }

    let mut candidates: Vec<&RecordedRow> = rows
        .iter()
        .filter(|r| names.iter().any(|n| n == &r.name))
        .collect();
    candidates.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    for row in candidates {
        map.entry(row.name.clone())
            .or_insert_with(|| LatestEntry::from_row(row));
    }
    map
}

/// Convert a wire response into reconciliation data for `selection`.
///
/// Names outside the selection are ignored. Returns `None` when nothing
/// usable remains, which callers treat the same as "no prior record".
pub fn remote_latest_from_wire(
    wire: &BTreeMap<String, LatestEntry>,
    selection: &Selection,
) -> Option<RemoteLatest> {
    let latest: RemoteLatest = selection
        .iter()
        .filter_map(|name| wire.get(name).map(|e| (name.to_string(), e.to_input())))
        .collect();
    if latest.is_empty() { None } else { Some(latest) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: &str, name: &str, weight: f64, ts: i64) -> RecordedRow {
        RecordedRow {
            id: id.into(),
            name: name.into(),
            weight,
            reps: 5.0,
            sets: 3.0,
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn newest_row_wins() {
        let rows = vec![
            row("1", "squat", 90.0, 1_000),
            row("2", "squat", 100.0, 2_000),
            row("3", "bench", 60.0, 1_500),
        ];
        let map = latest_by_name(&rows, &names(&["squat", "bench"]));
        assert_eq!(map.len(), 2);
        assert_eq!(map["squat"].weight, "100");
        assert_eq!(map["bench"].weight, "60");
    }

    #[test]
    fn id_breaks_timestamp_ties() {
        let rows = vec![row("a", "squat", 90.0, 1_000), row("b", "squat", 95.0, 1_000)];
        let map = latest_by_name(&rows, &names(&["squat"]));
        assert_eq!(map["squat"].weight, "95");
    }

    #[test]
    fn unrequested_names_are_skipped() {
        let rows = vec![row("1", "deadlift", 140.0, 1_000)];
        assert!(latest_by_name(&rows, &names(&["squat"])).is_empty());
    }

    #[test]
    fn empty_request_is_empty() {
        let rows = vec![row("1", "squat", 100.0, 1_000)];
        assert!(latest_by_name(&rows, &[]).is_empty());
    }

    #[test]
    fn wire_entry_parses_created_at_key() {
        let json = r#"{"weight":"100","reps":"5","sets":"3","createdAt":"2026-01-01T00:00:00Z"}"#;
        let entry: LatestEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.created_at, "2026-01-01T00:00:00Z");
        assert_eq!(
            entry.to_input(),
            ItemInput::new(Some(100.0), Some(5.0), Some(3.0))
        );
    }

    #[test]
    fn zero_and_garbage_become_unset() {
        let entry = LatestEntry {
            weight: "0".into(),
            reps: "x".into(),
            sets: "3".into(),
            created_at: String::new(),
        };
        assert_eq!(entry.to_input(), ItemInput::new(None, None, Some(3.0)));
    }

    #[test]
    fn wire_conversion_restricted_to_selection() {
        let rows = vec![row("1", "squat", 100.0, 1_000), row("2", "deadlift", 140.0, 1_000)];
        let wire = latest_by_name(&rows, &names(&["squat", "deadlift"]));
        let sel = Selection::new(["squat", "bench"]);
        let latest = remote_latest_from_wire(&wire, &sel).unwrap();
        assert_eq!(latest.len(), 1);
        assert!(latest.get("squat").is_some());
        assert!(latest.get("deadlift").is_none());
    }

    #[test]
    fn wire_conversion_without_matches_is_none() {
        let sel = Selection::new(["squat"]);
        assert!(remote_latest_from_wire(&BTreeMap::new(), &sel).is_none());
    }
}
