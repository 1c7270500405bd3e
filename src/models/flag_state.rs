use crate::models::FeatureFlagSet;
use chrono::{DateTime, Utc};

/// Snapshot of the process-wide feature flag state.
///
/// The live instance is owned by [`crate::state::FlagProvider`]; everything else
/// only ever sees clones of it obtained through
/// [`get_state()`](crate::state::FlagProvider::get_state).
///
/// # Invariants
///
/// - `flags` always holds at least the defaults the provider was created with
/// - `is_loading` is true exactly while the active fetch attempt is in flight
/// - `last_updated` only moves on a successful fetch
/// - `error` is cleared when an attempt starts and when one succeeds
#[derive(Clone, Debug, PartialEq)]
pub struct FlagState {
    pub flags: FeatureFlagSet,
    pub is_loading: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl FlagState {
    /// Initial state: the given defaults, idle, never updated, no error
    pub fn new(defaults: FeatureFlagSet) -> Self {
        Self {
            flags: defaults,
            is_loading: false,
            last_updated: None,
            error: None,
        }
    }

    /// Pure read of a single flag; unknown names are off
    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.is_enabled(name)
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Flags came from a past successful fetch but the latest attempt failed
    pub fn is_stale(&self) -> bool {
        self.error.is_some() && self.last_updated.is_some()
    }

    /// No remote data has ever been applied
    pub fn is_using_defaults(&self) -> bool {
        self.last_updated.is_none()
    }
}

impl Default for FlagState {
    fn default() -> Self {
        Self::new(FeatureFlagSet::defaults())
    }
}
