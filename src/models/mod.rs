//! Data models for the ProstoKit landing page logic.
//!
//! - [`FeatureFlagSet`]: Flag name to enabled mapping, with the built-in defaults and [`merge`]
//! - [`FlagState`]: Snapshot of flags plus loading, last-updated and error status
//! - [`AppConfig`]: API host, flag default overrides and logging settings from `prostokit.yaml`
//! - [`NewsletterForm`] / [`FeedbackForm`]: Lead-capture form fields and client-side validation
//!
//! The live [`FlagState`] is owned by [`FlagProvider`](crate::state::FlagProvider);
//! these types carry no synchronization of their own.

pub mod config;
pub mod flag_state;
pub mod flags;
pub mod forms;

pub use self::config::{AppConfig, ApiSettings, FlagSettings, LoggingSettings};
pub use flag_state::FlagState;
pub use flags::{FeatureFlagSet, merge};
pub use forms::{FeedbackForm, FormError, FormStatus, NewsletterForm};
