//! Integration tests for FlagProvider with overlapping load attempts
//!
//! These tests verify that the FlagProvider correctly:
//! - Serves defaults immediately while the first load is in flight
//! - Lets only the most recently started attempt mutate state
//! - Keeps previous flags when a load fails
//! - Emits change events in order and only for the winning attempt

use async_trait::async_trait;
use prostokit_flags::models::flags::{BETA_TOOLS_BANNER, FEEDBACK_FORM, NEWSLETTER_FORM};
use prostokit_flags::services::{CancelSignal, FetchError, FlagSource, cancel_pair};
use prostokit_flags::ui::{StatusBanner, reload_every, spawn_banner_watcher};
use prostokit_flags::{FeatureFlagSet, FlagChange, FlagProvider, LoadOutcome};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, timeout};

type FetchResult = Result<FeatureFlagSet, FetchError>;

/// Flag source whose responses are released by the test, one gate per call
struct GatedSource {
    gates: Mutex<VecDeque<oneshot::Receiver<FetchResult>>>,
    calls: AtomicUsize,
    honor_cancel: bool,
}

impl GatedSource {
    fn new(count: usize, honor_cancel: bool) -> (Arc<Self>, Vec<oneshot::Sender<FetchResult>>) {
        let mut senders = Vec::new();
        let mut gates = VecDeque::new();
        for _ in 0..count {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            gates.push_back(rx);
        }

        let source = Arc::new(Self {
            gates: Mutex::new(gates),
            calls: AtomicUsize::new(0),
            honor_cancel,
        });
        (source, senders)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlagSource for GatedSource {
    async fn fetch_flags(&self, cancel: Option<CancelSignal>) -> FetchResult {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .pop_front()
            .expect("more fetches than gates");
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut cancel = cancel.unwrap_or_else(CancelSignal::never);
        if self.honor_cancel {
            tokio::select! {
                result = gate => result.unwrap_or(Err(FetchError::Cancelled)),
                _ = cancel.cancelled() => Err(FetchError::Cancelled),
            }
        } else {
            gate.await.unwrap_or(Err(FetchError::Cancelled))
        }
    }
}

/// Flag source that answers immediately with the same set
struct StaticSource(FeatureFlagSet);

#[async_trait]
impl FlagSource for StaticSource {
    async fn fetch_flags(&self, _cancel: Option<CancelSignal>) -> FetchResult {
        tokio::task::yield_now().await;
        Ok(self.0.clone())
    }
}

/// Flag source that answers after a fixed delay
struct DelayedSource(Duration, FeatureFlagSet);

#[async_trait]
impl FlagSource for DelayedSource {
    async fn fetch_flags(&self, _cancel: Option<CancelSignal>) -> FetchResult {
        tokio::time::sleep(self.0).await;
        Ok(self.1.clone())
    }
}

fn remote(pairs: &[(&str, bool)]) -> FeatureFlagSet {
    pairs.iter().map(|(name, enabled)| (*name, *enabled)).collect()
}

fn provider_over(source: Arc<dyn FlagSource>) -> FlagProvider {
    FlagProvider::new(source, FeatureFlagSet::defaults(), Handle::current())
}

/// Yield until the source has been called `n` times
async fn wait_for_calls(source: &GatedSource, n: usize) {
    timeout(Duration::from_secs(1), async {
        while source.calls() < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("Timeout waiting for fetch calls");
}

#[tokio::test]
async fn test_defaults_served_while_first_load_in_flight() {
    let (source, mut gates) = GatedSource::new(1, false);
    let provider = provider_over(source.clone());

    let handle = provider.initialize();

    let state = provider.get_state();
    assert!(state.is_loading);
    assert!(state.error.is_none());
    assert!(provider.is_enabled(NEWSLETTER_FORM));
    assert!(provider.is_enabled(FEEDBACK_FORM));
    assert!(!provider.is_enabled(BETA_TOOLS_BANNER));
    assert_eq!(StatusBanner::from_state(&state), StatusBanner::Loading);

    wait_for_calls(&source, 1).await;
    gates
        .remove(0)
        .send(Ok(remote(&[(FEEDBACK_FORM, false)])))
        .unwrap();

    assert_eq!(handle.await.unwrap(), LoadOutcome::Applied);
    let state = provider.get_state();
    assert!(!state.is_loading);
    assert!(!state.is_enabled(FEEDBACK_FORM));
    assert!(state.is_enabled(NEWSLETTER_FORM));
    assert!(state.last_updated.is_some());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_last_reload_wins_when_first_resolves_late() {
    let (source, mut gates) = GatedSource::new(2, false);
    let provider = provider_over(source.clone());

    let first = provider.initialize();
    wait_for_calls(&source, 1).await;
    let second = provider.reload();
    wait_for_calls(&source, 2).await;

    let second_gate = gates.pop().unwrap();
    let first_gate = gates.pop().unwrap();

    second_gate
        .send(Ok(remote(&[(FEEDBACK_FORM, false)])))
        .unwrap();
    assert_eq!(second.await.unwrap(), LoadOutcome::Applied);
    let after_second = provider.get_state();

    // The stale response disagrees on every flag
    first_gate
        .send(Ok(remote(&[
            (FEEDBACK_FORM, true),
            (NEWSLETTER_FORM, false),
            (BETA_TOOLS_BANNER, true),
        ])))
        .unwrap();
    assert_eq!(first.await.unwrap(), LoadOutcome::Superseded);

    assert_eq!(provider.get_state(), after_second);
    assert!(!provider.is_enabled(FEEDBACK_FORM));
    assert!(provider.is_enabled(NEWSLETTER_FORM));
    assert!(!provider.is_enabled(BETA_TOOLS_BANNER));
}

#[tokio::test]
async fn test_stale_failure_cannot_override_newer_success() {
    let (source, mut gates) = GatedSource::new(2, false);
    let provider = provider_over(source.clone());

    let first = provider.initialize();
    wait_for_calls(&source, 1).await;
    let second = provider.reload();
    wait_for_calls(&source, 2).await;

    let second_gate = gates.pop().unwrap();
    let first_gate = gates.pop().unwrap();

    second_gate
        .send(Ok(remote(&[(BETA_TOOLS_BANNER, true)])))
        .unwrap();
    second.await.unwrap();

    first_gate.send(Err(FetchError::Http { status: 500 })).unwrap();
    assert_eq!(first.await.unwrap(), LoadOutcome::Superseded);

    let state = provider.get_state();
    assert!(state.error.is_none());
    assert!(state.is_enabled(BETA_TOOLS_BANNER));
}

#[tokio::test]
async fn test_superseded_attempt_is_cancelled() {
    let (source, mut gates) = GatedSource::new(2, true);
    let provider = provider_over(source.clone());

    let first = provider.initialize();
    wait_for_calls(&source, 1).await;
    let second = provider.reload();

    // Resolves without its gate ever firing
    assert_eq!(first.await.unwrap(), LoadOutcome::Superseded);
    assert!(provider.get_state().is_loading);

    wait_for_calls(&source, 2).await;
    gates
        .pop()
        .unwrap()
        .send(Ok(remote(&[(NEWSLETTER_FORM, false)])))
        .unwrap();
    assert_eq!(second.await.unwrap(), LoadOutcome::Applied);
    assert!(!provider.is_enabled(NEWSLETTER_FORM));

    let snapshot = provider.metrics().snapshot();
    assert_eq!(snapshot.attempts, 2);
    assert_eq!(snapshot.superseded, 1);
    assert_eq!(snapshot.applied, 1);
}

#[tokio::test]
async fn test_failure_keeps_defaults_and_reports_error() {
    let (source, mut gates) = GatedSource::new(1, false);
    let provider = provider_over(source.clone());

    let handle = provider.initialize();
    wait_for_calls(&source, 1).await;
    gates
        .remove(0)
        .send(Err(FetchError::Transport("connection refused".to_string())))
        .unwrap();

    assert!(matches!(handle.await.unwrap(), LoadOutcome::Failed(_)));
    let state = provider.get_state();
    assert_eq!(state.flags, FeatureFlagSet::defaults());
    assert!(!state.is_loading);
    assert!(state.last_updated.is_none());
    assert!(state.error.as_deref().is_some_and(|message| !message.is_empty()));

    let banner = StatusBanner::from_state(&state);
    assert!(banner.shows_retry());
}

#[tokio::test]
async fn test_retry_after_failure_clears_error() {
    let (source, mut gates) = GatedSource::new(2, false);
    let provider = provider_over(source.clone());

    let first = provider.initialize();
    wait_for_calls(&source, 1).await;
    gates
        .remove(0)
        .send(Err(FetchError::Http { status: 503 }))
        .unwrap();
    first.await.unwrap();
    assert!(provider.get_state().error.is_some());

    // Retry control
    let retry = provider.reload();
    assert!(provider.get_state().error.is_none());
    assert!(provider.get_state().is_loading);

    wait_for_calls(&source, 2).await;
    gates.remove(0).send(Ok(FeatureFlagSet::new())).unwrap();
    assert_eq!(retry.await.unwrap(), LoadOutcome::Applied);

    let state = provider.get_state();
    assert!(state.error.is_none());
    assert!(state.last_updated.is_some());
    assert_eq!(state.flags, FeatureFlagSet::defaults());
}

#[tokio::test]
async fn test_events_only_for_winning_attempt() {
    let (source, mut gates) = GatedSource::new(2, false);
    let provider = provider_over(source.clone());
    let mut rx = provider.subscribe();

    let first = provider.initialize();
    wait_for_calls(&source, 1).await;
    let second = provider.reload();
    wait_for_calls(&source, 2).await;

    let second_gate = gates.pop().unwrap();
    let first_gate = gates.pop().unwrap();
    second_gate
        .send(Ok(remote(&[(FEEDBACK_FORM, false)])))
        .unwrap();
    second.await.unwrap();
    first_gate.send(Ok(remote(&[(FEEDBACK_FORM, true)]))).unwrap();
    first.await.unwrap();

    assert_eq!(rx.try_recv().unwrap(), FlagChange::LoadingStarted { attempt: 1 });
    assert_eq!(rx.try_recv().unwrap(), FlagChange::LoadingStarted { attempt: 2 });
    assert_eq!(
        rx.try_recv().unwrap(),
        FlagChange::FlagsUpdated {
            changed: vec![FEEDBACK_FORM.to_string()]
        }
    );
    assert!(matches!(
        rx.try_recv().unwrap(),
        FlagChange::LoadSucceeded { attempt: 2, .. }
    ));
    assert!(rx.try_recv().is_err(), "stale attempt must stay silent");
}

#[tokio::test]
async fn test_shutdown_cancels_pending_load() {
    let (source, _gates) = GatedSource::new(1, true);
    let provider = provider_over(source.clone());

    let handle = provider.initialize();
    wait_for_calls(&source, 1).await;

    provider.shutdown();

    assert_eq!(handle.await.unwrap(), LoadOutcome::Superseded);
    let state = provider.get_state();
    assert!(!state.is_loading);
    assert!(state.last_updated.is_none());
    assert_eq!(state.flags, FeatureFlagSet::defaults());
}

#[tokio::test]
async fn test_initialize_twice_behaves_as_reload() {
    let provider = provider_over(Arc::new(StaticSource(remote(&[(BETA_TOOLS_BANNER, true)]))));

    provider.initialize().await.unwrap();
    assert!(provider.is_initialized());
    assert!(provider.is_enabled(BETA_TOOLS_BANNER));

    // Does not reset to defaults
    provider.initialize();
    assert!(provider.is_enabled(BETA_TOOLS_BANNER));
}

#[tokio::test]
async fn test_watcher_sees_banner_transitions() {
    let provider = provider_over(Arc::new(StaticSource(FeatureFlagSet::new())));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let watcher = spawn_banner_watcher(&provider, move |change, banner| {
        let _ = tx.send((change.clone(), banner));
    });

    provider.reload_and_wait().await;

    let (change, _) = timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("Timeout waiting for first change")
        .expect("Watcher closed");
    assert_eq!(change, FlagChange::LoadingStarted { attempt: 1 });

    let (change, banner) = timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("Timeout waiting for second change")
        .expect("Watcher closed");
    assert!(matches!(change, FlagChange::LoadSucceeded { attempt: 1, .. }));
    assert!(matches!(banner, StatusBanner::Updated { at: Some(_) }));

    watcher.abort();
}

#[tokio::test]
async fn test_watcher_stops_when_provider_dropped() {
    let provider = provider_over(Arc::new(StaticSource(FeatureFlagSet::new())));
    let watcher = spawn_banner_watcher(&provider, |_, _| {});

    provider.reload_and_wait().await;
    drop(provider);

    timeout(Duration::from_millis(500), watcher)
        .await
        .expect("Watcher kept running after the provider was dropped")
        .unwrap();
}

#[tokio::test]
async fn test_reload_every_waits_for_last_reload() {
    let source = DelayedSource(Duration::from_millis(300), remote(&[(FEEDBACK_FORM, false)]));
    let provider = provider_over(Arc::new(source));

    let outcome = reload_every(
        &provider,
        Duration::from_millis(10),
        Some(1),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, Some(LoadOutcome::Applied));
    let state = provider.get_state();
    assert!(!state.is_loading);
    assert!(!state.is_enabled(FEEDBACK_FORM));
    assert_eq!(provider.metrics().snapshot().superseded, 0);
}

#[tokio::test]
async fn test_reload_every_stops_on_signal() {
    let provider = provider_over(Arc::new(StaticSource(FeatureFlagSet::new())));
    let (stop, signal) = cancel_pair();
    stop.cancel();

    let outcome = reload_every(&provider, Duration::from_secs(3600), None, signal)
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert_eq!(provider.metrics().snapshot().attempts, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reloads_settle() {
    let provider = provider_over(Arc::new(StaticSource(remote(&[(FEEDBACK_FORM, false)]))));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move { provider.reload().await.unwrap() }));
    }

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            LoadOutcome::Applied => applied += 1,
            LoadOutcome::Superseded => {}
            LoadOutcome::Failed(message) => panic!("unexpected failure: {}", message),
        }
    }

    assert!(applied >= 1);
    let state = provider.get_state();
    assert!(!state.is_loading);
    assert!(!state.is_enabled(FEEDBACK_FORM));

    let snapshot = provider.metrics().snapshot();
    assert_eq!(snapshot.attempts, 10);
    assert_eq!(snapshot.applied + snapshot.discarded, 10);
}
