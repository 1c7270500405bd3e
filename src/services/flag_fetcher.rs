use crate::models::{ApiSettings, FeatureFlagSet};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;

/// Path of the flag list endpoint, relative to the API base URL
pub const FEATURE_FLAGS_PATH: &str = "/feature-flags";

/// Errors from a single flag list retrieval
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No response at all: refused connection, DNS, transport timeout
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to load feature flags: {status}")]
    Http { status: u16 },

    /// The body was not a JSON array of `{name, enabled}` records
    #[error("Failed to parse feature flag list: {0}")]
    Parse(String),

    #[error("Feature flag fetch was cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    /// Message for the status banner. The flags themselves fall back the same way
    /// for every variant.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Transport(_) => {
                "Feature flag service is unavailable. Using default values.".to_string()
            }
            FetchError::Http { status } => format!(
                "Could not load feature flags (status {}). Using default values.",
                status
            ),
            FetchError::Parse(_) => {
                "Feature flag service returned an unexpected response. Using default values."
                    .to_string()
            }
            FetchError::Cancelled => "Feature flag update was cancelled.".to_string(),
        }
    }
}

/// One remote flag record as served by the API
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFlag {
    pub name: String,
    pub enabled: bool,
}

/// Receiving side of a per-attempt cancellation channel
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

/// Sending side of a per-attempt cancellation channel
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

/// Create a linked cancellation handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Source of the remote flag list
///
/// Implementations hold no flag state. [`crate::state::FlagProvider`] calls
/// [`fetch_flags`](FlagSource::fetch_flags) once per load attempt and owns
/// everything that happens with the result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlagSource: Send + Sync {
    /// Retrieve the remote flag list once.
    ///
    /// When `cancel` fires before completion, implementations should stop
    /// promptly and return [`FetchError::Cancelled`].
    async fn fetch_flags(&self, cancel: Option<CancelSignal>) -> Result<FeatureFlagSet, FetchError>;
}

/// Reduce a JSON flag list into a flag set; later duplicates win
pub fn parse_flag_list(body: &[u8]) -> Result<FeatureFlagSet, FetchError> {
    let records: Vec<RemoteFlag> =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(records
        .into_iter()
        .map(|record| (record.name, record.enabled))
        .collect())
}

/// Flag source backed by `GET {base_url}/feature-flags`
#[derive(Debug, Clone)]
pub struct HttpFlagFetcher {
    client: Client,
    url: String,
}

impl HttpFlagFetcher {
    /// Build a fetcher with its own HTTP client using the configured timeout
    pub fn new(api: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(api.request_timeout())
            .build()
            .context("Failed to build HTTP client for feature flags")?;

        Ok(Self::with_client(client, api))
    }

    /// Build a fetcher around an existing client
    pub fn with_client(client: Client, api: &ApiSettings) -> Self {
        Self {
            client,
            url: api.endpoint(FEATURE_FLAGS_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self) -> Result<FeatureFlagSet, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let flags = parse_flag_list(&body)?;
        tracing::debug!("Fetched {} feature flags from {}", flags.len(), self.url);
        Ok(flags)
    }
}

#[async_trait]
impl FlagSource for HttpFlagFetcher {
    async fn fetch_flags(
        &self,
        cancel: Option<CancelSignal>,
    ) -> Result<FeatureFlagSet, FetchError> {
        let Some(mut cancel) = cancel else {
            return self.request().await;
        };

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            result = self.request() => result,
            _ = cancel.cancelled() => {
                tracing::debug!("Feature flag request to {} cancelled", self.url);
                Err(FetchError::Cancelled)
            }
        }
    }
}
