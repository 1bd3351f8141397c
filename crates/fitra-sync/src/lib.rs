//! Sync layer: remote latest-values fetch and training draft reconciliation.

mod error;
pub use error::SyncError;

mod fetch;
pub use fetch::{HistoryFetcher, LatestFetcher, NoRemote};

mod controller;
pub use controller::{DraftController, Phase};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::LatestClient;
