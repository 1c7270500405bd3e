use crate::models::forms::{FeedbackForm, FormStatus, NewsletterForm};
use crate::services::{LeadClient, SubmitError};

fn finish(result: Result<(), SubmitError>) -> FormStatus {
    match result {
        Ok(()) => FormStatus::Success,
        Err(e) => FormStatus::Error(e.user_message()),
    }
}

/// Editing a field clears a previous inline error
fn clear_error(status: &mut FormStatus) {
    if matches!(status, FormStatus::Error(_)) {
        *status = FormStatus::Idle;
    }
}

/// Newsletter form with its submission status
#[derive(Debug, Clone, Default)]
pub struct NewsletterController {
    form: NewsletterForm,
    status: FormStatus,
}

impl NewsletterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &NewsletterForm {
        &self.form
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.form.email = email.into();
        clear_error(&mut self.status);
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
        clear_error(&mut self.status);
    }

    /// State of the submit control
    pub fn can_submit(&self) -> bool {
        self.form.can_submit(&self.status)
    }

    /// Submit if the submit control is enabled; otherwise nothing is sent
    pub async fn submit(&mut self, client: &LeadClient) -> &FormStatus {
        if !self.can_submit() {
            tracing::debug!("Newsletter submit ignored: form not submittable");
            return &self.status;
        }

        self.status = FormStatus::Submitting;
        self.status = finish(client.subscribe_newsletter(&self.form).await);
        &self.status
    }
}

/// Feedback form with its submission status
#[derive(Debug, Clone, Default)]
pub struct FeedbackController {
    form: FeedbackForm,
    status: FormStatus,
}

impl FeedbackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &FeedbackForm {
        &self.form
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
        clear_error(&mut self.status);
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.form.email = email.into();
        clear_error(&mut self.status);
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.form.message = message.into();
        clear_error(&mut self.status);
    }

    pub fn can_submit(&self) -> bool {
        self.form.can_submit(&self.status)
    }

    pub async fn submit(&mut self, client: &LeadClient) -> &FormStatus {
        if !self.can_submit() {
            tracing::debug!("Feedback submit ignored: form not submittable");
            return &self.status;
        }

        self.status = FormStatus::Submitting;
        self.status = finish(client.submit_feedback(&self.form).await);
        &self.status
    }
}
