use crate::models::forms::{FeedbackForm, FormError, NewsletterForm};
use crate::models::ApiSettings;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// The two lead-capture endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadForm {
    Newsletter,
    Feedback,
}

impl LeadForm {
    pub fn path(&self) -> &'static str {
        match self {
            LeadForm::Newsletter => "/newsletter",
            LeadForm::Feedback => "/feedback",
        }
    }

    /// Shown when the server rejects without a usable message
    fn rejected_fallback(&self) -> &'static str {
        match self {
            LeadForm::Newsletter => "Could not subscribe. Please try again.",
            LeadForm::Feedback => "Could not send your request. Please try again.",
        }
    }

    /// Shown when the rejection body cannot be read at all
    fn unavailable_message(&self) -> &'static str {
        match self {
            LeadForm::Newsletter => {
                "Service is temporarily unavailable. Please try submitting the form later."
            }
            LeadForm::Feedback => {
                "Service is temporarily unavailable. Try again later or email support@prostokit.io."
            }
        }
    }

    fn network_message(&self) -> &'static str {
        match self {
            LeadForm::Newsletter => "Network failure. Check your connection and try again.",
            LeadForm::Feedback => "Network failure. Check your connection and resend the form.",
        }
    }
}

/// Why a lead-capture submission did not go through.
///
/// `Display` is the message to show inline under the form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Caught client-side; no request was made
    #[error("{0}")]
    Invalid(#[from] FormError),

    #[error("{message}")]
    Transport { message: String },

    /// The server answered with a non-success status and a readable body
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The server answered with a non-success status and an unreadable body
    #[error("{message}")]
    Unavailable { status: u16, message: String },
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SubmitError::Rejected { status, .. } | SubmitError::Unavailable { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

fn first_issue_message(issues: &Value) -> Option<&str> {
    issues.get(0)?.get("msg")?.as_str()
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"detail": "..."}`, `{"detail": [{"msg": "..."}]}` and the
/// `{"code", "message", "details": [{"msg": "..."}]}` envelope, preferring the
/// first field-level issue over the envelope's summary message.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let detail = body.get("detail");

    detail
        .and_then(Value::as_str)
        .or_else(|| detail.and_then(first_issue_message))
        .or_else(|| body.get("details").and_then(first_issue_message))
        .or_else(|| body.get("message").and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

/// Client for the newsletter and feedback endpoints
#[derive(Debug, Clone)]
pub struct LeadClient {
    client: Client,
    api: ApiSettings,
}

impl LeadClient {
    pub fn new(api: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(api.request_timeout())
            .build()
            .context("Failed to build HTTP client for lead capture")?;

        Ok(Self::with_client(client, api))
    }

    pub fn with_client(client: Client, api: &ApiSettings) -> Self {
        Self {
            client,
            api: api.clone(),
        }
    }

    /// Subscribe to the newsletter. Invalid input is rejected before any request.
    pub async fn subscribe_newsletter(&self, form: &NewsletterForm) -> Result<(), SubmitError> {
        form.validate()?;
        self.post(LeadForm::Newsletter, &form.payload()).await
    }

    /// Send a feedback request. Invalid input is rejected before any request.
    pub async fn submit_feedback(&self, form: &FeedbackForm) -> Result<(), SubmitError> {
        form.validate()?;
        self.post(LeadForm::Feedback, form).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        kind: LeadForm,
        body: &T,
    ) -> Result<(), SubmitError> {
        let url = self.api.endpoint(kind.path());

        let response = match self.client.post(&url).json(body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("{:?} submit to {} failed: {}", kind, url, e);
                return Err(SubmitError::Transport {
                    message: kind.network_message().to_string(),
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::info!("{:?} submission accepted with status {}", kind, status);
            return Ok(());
        }

        let status = status.as_u16();
        match response.json::<Value>().await {
            Ok(body) => {
                let message = extract_error_message(&body)
                    .unwrap_or_else(|| kind.rejected_fallback().to_string());
                tracing::warn!("{:?} submission rejected ({}): {}", kind, status, message);
                Err(SubmitError::Rejected { status, message })
            }
            Err(e) => {
                tracing::warn!("{:?} submission failed ({}), unreadable body: {}", kind, status, e);
                Err(SubmitError::Unavailable {
                    status,
                    message: kind.unavailable_message().to_string(),
                })
            }
        }
    }
}
