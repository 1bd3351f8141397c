//! HTTP client for the training latest-values endpoint.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fitra_core::{LatestEntry, RemoteLatest, Selection, remote_latest_from_wire};
use serde::Serialize;
use tracing::info;

use crate::{LatestFetcher, SyncError};

/// Client for `POST /api/training/latest`.
pub struct LatestClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct LatestRequest<'a> {
    names: &'a [String],
}

impl LatestClient {
    /// Create a client for the given base URL.
    ///
    /// `base_url` should be like `http://localhost:3000` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn latest_url(&self) -> String {
        format!("{}/api/training/latest", self.base_url)
    }
}

#[async_trait]
impl LatestFetcher for LatestClient {
    async fn fetch_latest(&self, selection: &Selection) -> Result<Option<RemoteLatest>, SyncError> {
        if selection.is_empty() {
            return Ok(None);
        }

        let url = self.latest_url();
        info!(url = %url, items = selection.len(), "fetching latest training values");
        let resp = self
            .client
            .post(&url)
            .json(&LatestRequest {
                names: selection.as_slice(),
            })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let wire: BTreeMap<String, LatestEntry> = resp.json().await?;
        let latest = remote_latest_from_wire(&wire, selection);
        info!(
            returned = wire.len(),
            usable = latest.as_ref().map_or(0, |l| l.len()),
            "fetched latest training values"
        );
        Ok(latest)
    }
}
