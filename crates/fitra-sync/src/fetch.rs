//! Remote latest-values sources.

use std::path::Path;

use async_trait::async_trait;
use fitra_core::{RecordedRow, RemoteLatest, Selection, latest_by_name, remote_latest_from_wire};
use tracing::debug;

use crate::SyncError;

/// Returns the last-known values for the selected items.
///
/// `Ok(None)` means no prior record exists for any of them. Callers treat
/// an error exactly like `Ok(None)`; implementations should not retry.
#[async_trait]
pub trait LatestFetcher: Send + Sync {
    async fn fetch_latest(&self, selection: &Selection) -> Result<Option<RemoteLatest>, SyncError>;
}

/// A remote that never has data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemote;

#[async_trait]
impl LatestFetcher for NoRemote {
    async fn fetch_latest(&self, _selection: &Selection) -> Result<Option<RemoteLatest>, SyncError> {
        Ok(None)
    }
}

/// Serves latest values from recorded rows held in memory.
#[derive(Debug, Default, Clone)]
pub struct HistoryFetcher {
    rows: Vec<RecordedRow>,
}

impl HistoryFetcher {
    pub fn new(rows: Vec<RecordedRow>) -> Self {
        Self { rows }
    }

    /// Load a JSON array of recorded rows.
    pub fn from_path(path: &Path) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rows: Vec<RecordedRow> = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), rows = rows.len(), "loaded training history");
        Ok(Self::new(rows))
    }
}

#[async_trait]
impl LatestFetcher for HistoryFetcher {
    async fn fetch_latest(&self, selection: &Selection) -> Result<Option<RemoteLatest>, SyncError> {
        let wire = latest_by_name(&self.rows, selection.as_slice());
        Ok(remote_latest_from_wire(&wire, selection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fitra_core::ItemInput;
    use tempfile::TempDir;

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

    #[tokio::test]
    async fn no_remote_has_nothing() {
        let sel = Selection::new(["squat"]);
        assert!(NoRemote.fetch_latest(&sel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_returns_latest_per_item() {
        let fetcher = HistoryFetcher::new(vec![
            row("1", "squat", 90.0, 1_000),
            row("2", "squat", 100.0, 2_000),
        ]);
        let sel = Selection::new(["squat", "bench"]);
        let latest = fetcher.fetch_latest(&sel).await.unwrap().unwrap();
        assert_eq!(
            latest.get("squat"),
            Some(&ItemInput::new(Some(100.0), Some(5.0), Some(3.0)))
        );
        assert!(latest.get("bench").is_none());
    }

    #[tokio::test]
    async fn history_without_matches_is_none() {
        let fetcher = HistoryFetcher::new(vec![row("1", "deadlift", 140.0, 1_000)]);
        let sel = Selection::new(["squat"]);
        assert!(fetcher.fetch_latest(&sel).await.unwrap().is_none());
    }

    #[test]
    fn history_loads_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let rows = vec![row("1", "squat", 100.0, 1_000)];
        std::fs::write(&path, serde_json::to_string(&rows).unwrap()).unwrap();

        let fetcher = HistoryFetcher::from_path(&path).unwrap();
        assert_eq!(fetcher.rows, rows);
    }

    #[test]
    fn missing_history_file_errors() {
        let result = HistoryFetcher::from_path(Path::new("/nonexistent/history.json"));
        assert!(matches!(result, Err(SyncError::Io { .. })));
    }
}
