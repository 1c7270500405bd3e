// ProstoKit flags - remote feature flags and lead capture for the landing page
//
// This is the library crate containing the flag lifecycle, the API clients and
// the consumer-side rendering decisions. The binary crate (main.rs) provides a
// CLI over the same pieces.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use crate::config::ConfigManager;
pub use models::{AppConfig, FeatureFlagSet, FlagState, FormStatus};
pub use state::{FlagChange, FlagProvider, FlagReader, LoadOutcome, StateHandle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
