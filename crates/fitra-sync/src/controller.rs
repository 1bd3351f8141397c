//! Draft reconciliation controller.
//!
//! One [`DraftController`] serves one consumer (a form). Each call to
//! [`activate`](DraftController::activate) starts a new activation for a
//! `(key, selection)` pair and spawns a one-shot reconciliation task:
//!
//! ```text
//! Initializing ──restore──▶ Reconciling ──empty──▶ Fetching ──settle──▶ Merged
//!                                │
//!                                └──non-empty──▶ Skipped
//!
//! any ──key change / deactivate──▶ Disposed
//! ```
//!
//! Field edits, reset and removal apply immediately in every phase; only
//! the reconciliation step waits on the remote.
//!
//! Disposal sets a per-activation cancellation flag under the activation
//! lock. The reconciliation task re-checks that flag under the same lock
//! after the fetch settles, so a late result is dropped before it can reach
//! the draft or the shared store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fitra_core::{DraftKey, DraftState, Field, Selection, TrainingSummary};
use fitra_store::{DraftStore, RestoredSlot};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::LatestFetcher;

/// Reconciliation phase of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Local store not yet restored.
    Initializing,
    /// Restored; checking the draft against the canonical-empty draft.
    Reconciling,
    /// Draft was empty; remote fetch in flight.
    Fetching,
    /// Fetch settled (with data, without data, or failed).
    Merged,
    /// Draft already had input; no fetch was issued.
    Skipped,
    /// Activation torn down.
    Disposed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Reconciling => "reconciling",
            Self::Fetching => "fetching",
            Self::Merged => "merged",
            Self::Skipped => "skipped",
            Self::Disposed => "disposed",
        }
    }

    /// No further automatic transition will happen.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Merged | Self::Skipped | Self::Disposed)
    }
}

/// State owned by one activation.
struct ActivationState {
    slot: RestoredSlot<DraftState>,
    selection: Selection,
}

/// Everything the reconciliation task captures at spawn time.
struct ReconcileTask {
    state: Arc<Mutex<ActivationState>>,
    cancelled: Arc<AtomicBool>,
    phase: Arc<watch::Sender<Phase>>,
    fetcher: Arc<dyn LatestFetcher>,
    key: DraftKey,
}

struct Activation {
    key: DraftKey,
    state: Arc<Mutex<ActivationState>>,
    cancelled: Arc<AtomicBool>,
    phase_tx: Arc<watch::Sender<Phase>>,
    phase_rx: watch::Receiver<Phase>,
    /// Supervisor of the reconciliation task. Detached on disposal; the
    /// task observes `cancelled` instead of being aborted.
    _task: JoinHandle<()>,
}

fn lock(state: &Mutex<ActivationState>) -> MutexGuard<'_, ActivationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the current draft activation for one consumer.
pub struct DraftController {
    store: DraftStore,
    fetcher: Arc<dyn LatestFetcher>,
    current: Option<Activation>,
}

impl DraftController {
    pub fn new(store: DraftStore, fetcher: Arc<dyn LatestFetcher>) -> Self {
        Self {
            store,
            fetcher,
            current: None,
        }
    }

    /// Make `(key, selection)` current, disposing any previous activation.
    ///
    /// Spawns the reconciliation task on the ambient Tokio runtime.
    pub fn activate(&mut self, key: DraftKey, selection: Selection) {
        self.deactivate();

        let slot = RestoredSlot::new(self.store.clone(), key.clone(), DraftState::empty(&selection));
        let state = Arc::new(Mutex::new(ActivationState { slot, selection }));
        let cancelled = Arc::new(AtomicBool::new(false));
        let (phase_tx, phase_rx) = watch::channel(Phase::Initializing);
        let phase_tx = Arc::new(phase_tx);

        let task = ReconcileTask {
            state: state.clone(),
            cancelled: cancelled.clone(),
            phase: phase_tx.clone(),
            fetcher: self.fetcher.clone(),
            key: key.clone(),
        };
        let handle = task.spawn();

        info!(key = %key, "draft activated");
        self.current = Some(Activation {
            key,
            state,
            cancelled,
            phase_tx,
            phase_rx,
            _task: handle,
        });
    }

    /// Tear down the current activation, if any.
    pub fn deactivate(&mut self) {
        let Some(activation) = self.current.take() else {
            return;
        };
        let _guard = lock(&activation.state);
        activation.cancelled.store(true, Ordering::SeqCst);
        activation.phase_tx.send_replace(Phase::Disposed);
        debug!(key = %activation.key, "draft activation disposed");
    }

    pub fn key(&self) -> Option<&DraftKey> {
        self.current.as_ref().map(|a| &a.key)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.current
            .as_ref()
            .map(|a| lock(&a.state).selection.clone())
    }

    pub fn phase(&self) -> Option<Phase> {
        self.current.as_ref().map(|a| *a.phase_rx.borrow())
    }

    /// True once the local store has been read for the current activation.
    pub fn is_restored(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|a| lock(&a.state).slot.is_restored())
    }

    /// Wait until the current activation stops transitioning on its own.
    pub async fn settled(&self) -> Option<Phase> {
        let mut rx = self.current.as_ref()?.phase_rx.clone();
        let phase = *rx.wait_for(Phase::is_settled).await.ok()?;
        Some(phase)
    }

    /// Snapshot of the current draft.
    pub fn draft(&self) -> Option<DraftState> {
        self.current
            .as_ref()
            .map(|a| lock(&a.state).slot.value().clone())
    }

    /// Replace one field of one selected item.
    ///
    /// Returns `false` (and changes nothing) when there is no activation or
    /// the item is not selected. Non-finite values are stored as unset.
    pub fn update_field(&self, item: &str, field: Field, value: Option<f64>) -> bool {
        let Some(activation) = &self.current else {
            return false;
        };
        let mut state = lock(&activation.state);
        if !state.selection.contains(item) {
            warn!(key = %activation.key, item, "ignoring edit for unselected item");
            return false;
        }
        state.slot.update(|draft| {
            draft.set_field(item, field, value);
        });
        debug!(key = %activation.key, item, field = %field, "draft field updated");
        true
    }

    /// Replace the draft with the canonical-empty draft and persist it.
    pub fn reset(&self) {
        let Some(activation) = &self.current else {
            return;
        };
        let mut state = lock(&activation.state);
        let empty = DraftState::empty(&state.selection);
        state.slot.set(empty);
        info!(key = %activation.key, "draft reset");
    }

    /// Delete the stored draft and return to the canonical-empty draft.
    pub fn remove(&self) {
        let Some(activation) = &self.current else {
            return;
        };
        lock(&activation.state).slot.remove();
        info!(key = %activation.key, "draft removed");
    }

    /// True when some selected item has at least one set field.
    pub fn has_any_input(&self) -> bool {
        self.current.as_ref().is_some_and(|a| {
            let state = lock(&a.state);
            state.slot.value().has_any_input(&state.selection)
        })
    }

    pub fn summary(&self) -> Option<TrainingSummary> {
        self.current.as_ref().map(|a| {
            let state = lock(&a.state);
            TrainingSummary::from_draft(state.slot.value(), &state.selection)
        })
    }
}

impl Drop for DraftController {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl ReconcileTask {
    /// Spawn the task under a supervisor that settles the phase if the
    /// task dies without doing so (for instance a panicking fetcher).
    fn spawn(self) -> JoinHandle<()> {
        let phase = self.phase.clone();
        let key = self.key.clone();
        let inner = tokio::spawn(self.run());
        tokio::spawn(async move {
            if let Err(e) = inner.await {
                warn!(key = %key, error = %e, "reconciliation task failed, treating as no latest values");
                phase.send_if_modified(|p| {
                    if p.is_settled() {
                        false
                    } else {
                        *p = Phase::Merged;
                        true
                    }
                });
            }
        })
    }

    async fn run(self) {
        let Some(selection) = self.restore_and_check() else {
            return;
        };

        let result = self.fetcher.fetch_latest(&selection).await;

        let mut state = lock(&self.state);
        if self.cancelled.load(Ordering::SeqCst) {
            debug!(key = %self.key, "discarding latest values for disposed activation");
            return;
        }

        let latest = match result {
            Ok(latest) => latest,
            Err(e) => {
                warn!(key = %self.key, error = %e, "latest-values fetch failed, keeping empty draft");
                None
            }
        };

        match latest {
            Some(latest) if state.slot.value().is_canonical_empty(&state.selection) => {
                let next = DraftState::from_latest(&state.selection, &latest);
                state.slot.set(next);
                info!(key = %self.key, items = latest.len(), "draft filled from latest values");
            }
            Some(_) => {
                debug!(key = %self.key, "draft edited while fetching, keeping edits");
            }
            None => {
                debug!(key = %self.key, "no latest values");
            }
        }
        self.phase.send_replace(Phase::Merged);
    }

    /// Restore the slot and decide whether a fetch is needed.
    ///
    /// Returns the selection to fetch for, or `None` when reconciliation
    /// already finished (skipped, nothing selected, or disposed).
    fn restore_and_check(&self) -> Option<Selection> {
        let mut state = lock(&self.state);
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }

        state.slot.restore();
        self.phase.send_replace(Phase::Reconciling);

        let selection = state.selection.clone();
        let empty = state.slot.value().is_canonical_empty(&selection);
        state.slot.normalize(|draft| draft.conform(&selection));

        if !empty {
            info!(key = %self.key, "draft has input, skipping latest values");
            self.phase.send_replace(Phase::Skipped);
            return None;
        }
        if selection.is_empty() {
            self.phase.send_replace(Phase::Merged);
            return None;
        }

        self.phase.send_replace(Phase::Fetching);
        Some(selection)
    }
}
