use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

/// Minimum length of a contact name, after trimming
pub const MIN_NAME_LEN: usize = 2;

/// Minimum length of a feedback message, after trimming
pub const MIN_MESSAGE_LEN: usize = 10;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("Invalid email regex"));

/// Client-side reasons a form cannot be submitted yet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Name must be at least {min} characters")]
    NameTooShort { min: usize },

    #[error("Message must be at least {min} characters")]
    MessageTooShort { min: usize },
}

/// Lifecycle of a single form on the page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    Submitting,
    Success,
    Error(String),
}

impl FormStatus {
    pub fn is_submitting(&self) -> bool {
        matches!(self, FormStatus::Submitting)
    }

    /// Inline error text to show under the form, if any
    pub fn error_message(&self) -> Option<&str> {
        match self {
            FormStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Newsletter subscription form: email plus an optional name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsletterForm {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsletterPayload {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NewsletterForm {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }

    /// The name is optional, but once something is typed it must be long enough
    pub fn validate(&self) -> Result<(), FormError> {
        if !is_valid_email(&self.email) {
            return Err(FormError::InvalidEmail);
        }
        if !self.name.trim().is_empty() && char_len(&self.name) < MIN_NAME_LEN {
            return Err(FormError::NameTooShort { min: MIN_NAME_LEN });
        }
        Ok(())
    }

    /// Whether the submit control is enabled for the given status
    pub fn can_submit(&self, status: &FormStatus) -> bool {
        !status.is_submitting() && self.validate().is_ok()
    }

    pub fn payload(&self) -> NewsletterPayload {
        NewsletterPayload {
            email: self.email.clone(),
            name: Some(self.name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }
}

/// Feedback form: a lead describing the task they need solved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl FeedbackForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if char_len(&self.name) < MIN_NAME_LEN {
            return Err(FormError::NameTooShort { min: MIN_NAME_LEN });
        }
        if !is_valid_email(&self.email) {
            return Err(FormError::InvalidEmail);
        }
        if char_len(&self.message) < MIN_MESSAGE_LEN {
            return Err(FormError::MessageTooShort {
                min: MIN_MESSAGE_LEN,
            });
        }
        Ok(())
    }

    pub fn can_submit(&self, status: &FormStatus) -> bool {
        !status.is_submitting() && self.validate().is_ok()
    }
}
