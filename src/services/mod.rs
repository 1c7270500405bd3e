//! Services module - network-facing logic with no UI or shared state.
//!
//! # Components
//!
//! - [`FlagSource`] / [`HttpFlagFetcher`]: One retrieval of the remote flag list
//!   (`GET {base_url}/feature-flags`) reduced into a [`FeatureFlagSet`](crate::models::FeatureFlagSet).
//!   Failures are split into transport, HTTP status, parse and cancellation ([`FetchError`]).
//! - [`CancelSignal`] / [`CancelHandle`]: Per-attempt cooperative cancellation over a
//!   `tokio::sync::watch` channel.
//! - [`LeadClient`]: Newsletter and feedback submissions, turning rejections into
//!   inline messages ([`SubmitError`]).
//!
//! Nothing here mutates flag state. [`crate::state::FlagProvider`] decides what a
//! fetch result means for the application.

pub mod flag_fetcher;
pub mod lead_capture;

pub use flag_fetcher::{
    CancelHandle, CancelSignal, FetchError, FlagSource, HttpFlagFetcher, RemoteFlag, cancel_pair,
    parse_flag_list,
};
pub use lead_capture::{LeadClient, LeadForm, SubmitError, extract_error_message};
