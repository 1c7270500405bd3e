use crate::models::FlagState;
use chrono::{DateTime, Utc};
use std::fmt;

/// What the flag status line next to the beta banner shows
///
/// Built from one [`FlagState`] snapshot per render. Loading wins over an error
/// still held from a previous attempt, so the two are never shown together.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusBanner {
    /// Neutral placeholder while an attempt is in flight
    Loading,

    /// Latest attempt failed; flags are defaults or the last known good set
    Failed {
        message: String,
        last_good: Option<DateTime<Utc>>,
    },

    /// `at` is `None` while running on defaults only
    Updated { at: Option<DateTime<Utc>> },
}

impl StatusBanner {
    pub fn from_state(state: &FlagState) -> Self {
        if state.is_loading {
            return StatusBanner::Loading;
        }

        match &state.error {
            Some(message) => StatusBanner::Failed {
                message: message.clone(),
                last_good: state.last_updated,
            },
            None => StatusBanner::Updated {
                at: state.last_updated,
            },
        }
    }

    /// Whether to offer the retry control (which calls `reload()`)
    pub fn shows_retry(&self) -> bool {
        matches!(self, StatusBanner::Failed { .. })
    }
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl fmt::Display for StatusBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusBanner::Loading => write!(f, "Loading feature flags..."),
            StatusBanner::Failed {
                message,
                last_good: Some(at),
            } => write!(f, "{} Last successful update: {}", message, format_time(at)),
            StatusBanner::Failed {
                message,
                last_good: None,
            } => write!(f, "{}", message),
            StatusBanner::Updated { at: Some(at) } => {
                write!(f, "Flags updated: {}", format_time(at))
            }
            StatusBanner::Updated { at: None } => write!(f, "Using default flags"),
        }
    }
}
