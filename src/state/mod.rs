// State management module
//
// This module provides the FlagProvider which owns the process-wide FlagState,
// runs the fetch-merge-cancel lifecycle and emits change events for consumers.

use crate::metrics::FlagMetrics;
use crate::models::{FeatureFlagSet, FlagState};
use crate::services::{CancelHandle, CancelSignal, FetchError, FlagSource, cancel_pair};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Change events emitted when flag state is modified
///
/// Consumers subscribe to these to re-render instead of polling. Events of a
/// superseded attempt are never emitted past its `LoadingStarted`.
#[derive(Clone, Debug, PartialEq)]
pub enum FlagChange {
    /// A load attempt started; `is_loading` is now true and `error` cleared
    LoadingStarted { attempt: u64 },

    /// A successful load changed these flag values
    FlagsUpdated { changed: Vec<String> },

    /// A load attempt completed and its flags were merged
    LoadSucceeded {
        attempt: u64,
        updated_at: DateTime<Utc>,
    },

    /// A load attempt failed; previous flags are kept
    LoadFailed { attempt: u64, message: String },
}

/// What became of a single load attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Remote flags were merged into the state
    Applied,

    /// The attempt failed and set this error message
    Failed(String),

    /// A newer attempt took over; this one left the state untouched
    Superseded,
}

/// The attempt currently allowed to mutate state
struct ActiveAttempt {
    id: u64,
    cancel: CancelHandle,
}

struct Inner {
    state: FlagState,
    active: Option<ActiveAttempt>,
    last_attempt: u64,
    initialized: bool,
}

/// Ticket for an attempt that has been started but not yet run
struct PendingAttempt {
    id: u64,
    signal: CancelSignal,
}

/// Read-only flag access for consumers
///
/// Implemented by the live [`FlagProvider`] and by [`FlagState`] snapshots, so
/// rendering code can be written once and tested against a plain snapshot.
pub trait FlagReader {
    fn is_enabled(&self, name: &str) -> bool;
}

impl FlagReader for FlagState {
    fn is_enabled(&self, name: &str) -> bool {
        FlagState::is_enabled(self, name)
    }
}

/// Snapshot access that does not keep the provider alive
///
/// Returned by [`FlagProvider::state_handle`] for background listeners. Reads
/// yield `None` once every provider clone has been dropped.
#[derive(Clone)]
pub struct StateHandle {
    inner: Weak<RwLock<Inner>>,
}

impl StateHandle {
    pub fn get_state(&self) -> Option<FlagState> {
        let inner = self.inner.upgrade()?;
        let state = inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone();
        Some(state)
    }
}

/// Process-wide feature flag state with a single mutation path
///
/// This is the central flag component that:
/// - Owns the one [`FlagState`] instance behind `Arc<RwLock<T>>`
/// - Starts fetch attempts through a [`FlagSource`] and merges their results
/// - Lets only the most recently started attempt mutate state ("last reload wins")
/// - Broadcasts [`FlagChange`] events via a tokio broadcast channel
///
/// # Usage
///
/// Construct once, call [`initialize()`](Self::initialize), and hand clones to
/// consumers. Clones share the same state.
/// - [`is_enabled()`](Self::is_enabled) for single flag reads, once per render
/// - [`get_state()`](Self::get_state) for the banner (loading, error, last update)
/// - [`reload()`](Self::reload) for the retry control
/// - [`subscribe()`](Self::subscribe) for listening to changes
///
/// # Supersede rule
///
/// Every attempt gets an increasing id and its own cancellation signal. Starting
/// an attempt cancels the previous one, and a completing attempt checks under the
/// write lock that its id is still the active one before it touches anything. A
/// slow stale response therefore can never overwrite a newer result, whatever the
/// completion order.
pub struct FlagProvider {
    inner: Arc<RwLock<Inner>>,
    source: Arc<dyn FlagSource>,
    defaults: FeatureFlagSet,
    change_tx: broadcast::Sender<FlagChange>,
    metrics: Arc<FlagMetrics>,
    runtime: Handle,
}

impl FlagProvider {
    /// Create a provider holding `defaults` and idle
    ///
    /// # Arguments
    /// * `source` - Where remote flags come from
    /// * `defaults` - Initial flags, kept for anything the remote never mentions
    /// * `runtime` - Runtime that [`reload()`](Self::reload) spawns attempts on
    pub fn new(source: Arc<dyn FlagSource>, defaults: FeatureFlagSet, runtime: Handle) -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: FlagState::new(defaults.clone()),
                active: None,
                last_attempt: 0,
                initialized: false,
            })),
            source,
            defaults,
            change_tx,
            metrics: Arc::new(FlagMetrics::new()),
            runtime,
        }
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset flags to the defaults and start the first load
    ///
    /// Meant to be called exactly once per application instance. A repeated call
    /// is logged and only starts another load.
    pub fn initialize(&self) -> JoinHandle<LoadOutcome> {
        {
            let mut inner = self.write_inner();
            if inner.initialized {
                tracing::warn!("FlagProvider initialized twice; treating as reload");
            } else {
                inner.initialized = true;
                inner.state.flags = self.defaults.clone();
                tracing::info!(
                    "Feature flags initialized with {} defaults",
                    self.defaults.len()
                );
            }
        }

        self.reload()
    }

    /// Start a new load attempt in the background, superseding any in-flight one
    ///
    /// The state flips to loading before this returns. The handle resolves to the
    /// attempt's [`LoadOutcome`]; dropping it does not cancel the attempt.
    pub fn reload(&self) -> JoinHandle<LoadOutcome> {
        let attempt = self.begin_attempt();
        let provider = self.clone();
        self.runtime
            .spawn(async move { provider.run_attempt(attempt).await })
    }

    /// Start a new load attempt and drive it to completion on the current task
    pub async fn reload_and_wait(&self) -> LoadOutcome {
        let attempt = self.begin_attempt();
        self.run_attempt(attempt).await
    }

    /// Cancel the in-flight attempt, if any, and mark the state idle
    pub fn shutdown(&self) {
        let mut inner = self.write_inner();
        if let Some(active) = inner.active.take() {
            tracing::debug!("Cancelling feature flag attempt {} on shutdown", active.id);
            active.cancel.cancel();
            inner.state.is_loading = false;
        }
    }

    /// Steps 1-2 of a reload: supersede the previous attempt, flip to loading
    fn begin_attempt(&self) -> PendingAttempt {
        let (cancel, signal) = cancel_pair();

        let mut inner = self.write_inner();
        inner.last_attempt += 1;
        let id = inner.last_attempt;

        if let Some(previous) = inner.active.replace(ActiveAttempt { id, cancel }) {
            tracing::debug!(
                "Feature flag attempt {} superseded by attempt {}",
                previous.id,
                id
            );
            previous.cancel.cancel();
            self.metrics.record_superseded();
        }

        inner.state.is_loading = true;
        inner.state.error = None;
        self.metrics.record_attempt();
        self.emit(FlagChange::LoadingStarted { attempt: id });

        PendingAttempt { id, signal }
    }

    async fn run_attempt(&self, attempt: PendingAttempt) -> LoadOutcome {
        let result = self.source.fetch_flags(Some(attempt.signal)).await;
        self.complete_attempt(attempt.id, result)
    }

    /// Steps 4-6 of a reload, applied only if `id` is still the active attempt
    fn complete_attempt(&self, id: u64, result: Result<FeatureFlagSet, FetchError>) -> LoadOutcome {
        let mut inner = self.write_inner();

        let is_active = inner.active.as_ref().is_some_and(|active| active.id == id);
        if !is_active || result.as_ref().is_err_and(FetchError::is_cancelled) {
            tracing::debug!("Discarding result of superseded feature flag attempt {}", id);
            self.metrics.record_discarded();
            return LoadOutcome::Superseded;
        }

        inner.active = None;
        inner.state.is_loading = false;

        match result {
            Ok(remote) => {
                let changed = inner.state.flags.apply(&remote);
                let updated_at = Utc::now();
                inner.state.last_updated = Some(updated_at);
                inner.state.error = None;
                self.metrics.record_applied();

                tracing::info!(
                    "Feature flags updated: {} received, {} changed",
                    remote.len(),
                    changed.len()
                );

                if !changed.is_empty() {
                    self.emit(FlagChange::FlagsUpdated { changed });
                }
                self.emit(FlagChange::LoadSucceeded {
                    attempt: id,
                    updated_at,
                });

                LoadOutcome::Applied
            }
            Err(e) => {
                let message = e.user_message();
                inner.state.error = Some(message.clone());
                self.metrics.record_failed();

                tracing::warn!("Feature flags fallback to previous values: {}", e);

                self.emit(FlagChange::LoadFailed {
                    attempt: id,
                    message: message.clone(),
                });

                LoadOutcome::Failed(message)
            }
        }
    }

    fn emit(&self, change: FlagChange) {
        // No subscribers is fine
        if self.change_tx.send(change).is_ok() {
            self.metrics.record_broadcast();
        } else {
            self.metrics.record_broadcast_unheard();
        }
    }

    /// Whether a flag is on right now; unknown names are off
    pub fn is_enabled(&self, name: &str) -> bool {
        self.read(|state| state.is_enabled(name))
    }

    /// Get a read-only snapshot of the current state
    pub fn get_state(&self) -> FlagState {
        self.read_inner().state.clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let loading = provider.read(|state| state.is_loading);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&FlagState) -> R,
    {
        let inner = self.read_inner();
        f(&inner.state)
    }

    /// Subscribe to flag change events
    ///
    /// The receiver sees `Closed` once every provider clone has been dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<FlagChange> {
        self.change_tx.subscribe()
    }

    /// Weak read access for listeners that must not outlive the provider
    pub fn state_handle(&self) -> StateHandle {
        StateHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The defaults this provider was created with
    pub fn defaults(&self) -> &FeatureFlagSet {
        &self.defaults
    }

    pub fn is_initialized(&self) -> bool {
        self.read_inner().initialized
    }

    pub fn metrics(&self) -> &FlagMetrics {
        &self.metrics
    }
}

impl FlagReader for FlagProvider {
    fn is_enabled(&self, name: &str) -> bool {
        FlagProvider::is_enabled(self, name)
    }
}

// Clones share state, channel and metrics
impl Clone for FlagProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            source: Arc::clone(&self.source),
            defaults: self.defaults.clone(),
            change_tx: self.change_tx.clone(),
            metrics: Arc::clone(&self.metrics),
            runtime: self.runtime.clone(),
        }
    }
}
