use crate::services::CancelSignal;
use crate::state::{FlagChange, FlagProvider, LoadOutcome};
use crate::ui::banner::StatusBanner;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Re-render the status banner on every flag change
///
/// Spawns a task that listens for [`FlagChange`] events and calls `on_change`
/// with the event and a banner built from a fresh snapshot. The task holds only
/// a weak handle to the state, so it ends on its own once every provider clone
/// is dropped. It can also be aborted through the returned handle.
pub fn spawn_banner_watcher<F>(provider: &FlagProvider, mut on_change: F) -> JoinHandle<()>
where
    F: FnMut(&FlagChange, StatusBanner) + Send + 'static,
{
    let state = provider.state_handle();
    let mut rx = provider.subscribe();

    tokio::spawn(async move {
        tracing::debug!("Flag change watcher started");

        loop {
            match rx.recv().await {
                Ok(change) => {
                    tracing::trace!("Flag change received: {:?}", change);
                    let Some(snapshot) = state.get_state() else {
                        break;
                    };
                    on_change(&change, StatusBanner::from_state(&snapshot));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Flag change watcher lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::debug!("Flag change watcher terminated");
    })
}

/// Reload every `period` until `count` reloads have started or `stop` fires
///
/// Waits for the last started reload to finish and returns its outcome, or
/// `None` when no reload was started.
pub async fn reload_every(
    provider: &FlagProvider,
    period: Duration,
    count: Option<u32>,
    mut stop: CancelSignal,
) -> Result<Option<LoadOutcome>> {
    let mut ticker = tokio::time::interval(period);
    // First tick completes immediately
    ticker.tick().await;

    let mut last = None;
    let mut reloads = 0u32;
    while count.is_none_or(|limit| reloads < limit) {
        tokio::select! {
            _ = ticker.tick() => {
                reloads += 1;
                last = Some(provider.reload());
            }
            _ = stop.cancelled() => {
                tracing::info!("Periodic reload stopped after {} reloads", reloads);
                break;
            }
        }
    }

    match last {
        Some(handle) => {
            let outcome = handle.await.context("Flag reload task failed")?;
            Ok(Some(outcome))
        }
        None => Ok(None),
    }
}
