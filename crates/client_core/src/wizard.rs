//! The multi-step registration wizard: an accumulating draft, per-step
//! validators, and a controller that only submits from the terminal step.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use shared::domain::Gender;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{error::ApiClientError, Session};

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{10}$").expect("phone regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email regex"));

/// Binary photo payload attached to a draft. Replacing it drops the previous
/// payload, which is what releases the preview buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// A placeholder is not a photo: the upload needs a name and content.
    pub fn is_valid(&self) -> bool {
        !self.filename.is_empty() && !self.bytes.is_empty()
    }
}

/// The in-progress registration record accumulated across wizard steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationDraft {
    pub name: String,
    pub phone_number: String,
    pub gender: Option<Gender>,
    pub country: String,
    pub state: String,
    pub skills: Vec<String>,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub photo: Option<PhotoUpload>,
}

/// Partial update merged into a draft. Each step only populates the fields
/// it owns, so merging patches from different steps never clobbers another
/// step's data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftPatch {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub skills: Option<Vec<String>>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub photo: Option<PhotoUpload>,
}

impl RegistrationDraft {
    /// Merges a partial update into the draft. Absent fields are left alone,
    /// so patches over disjoint fields commute.
    pub fn merge(&mut self, patch: DraftPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(gender) = patch.gender {
            self.gender = Some(gender);
        }
        if let Some(country) = patch.country {
            self.country = country;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(skills) = patch.skills {
            self.skills = skills;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(confirm_password) = patch.confirm_password {
            self.confirm_password = confirm_password;
        }
        if let Some(photo) = patch.photo {
            self.photo = Some(photo);
        }
    }

    /// The comma-joined form of the skills list, exactly as the register
    /// endpoint expects it.
    pub fn skills_field(&self) -> String {
        self.skills.join(",")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Personal,
    Country,
    Skills,
    Credentials,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Personal,
        WizardStep::Country,
        WizardStep::Skills,
        WizardStep::Credentials,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WizardStep::Personal => "Personal Information",
            WizardStep::Country => "Details",
            WizardStep::Skills => "Skills Details",
            WizardStep::Credentials => "Credential Details",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            WizardStep::Personal => Some(WizardStep::Country),
            WizardStep::Country => Some(WizardStep::Skills),
            WizardStep::Skills => Some(WizardStep::Credentials),
            WizardStep::Credentials => None,
        }
    }

    fn prev(self) -> Option<Self> {
        match self {
            WizardStep::Personal => None,
            WizardStep::Country => Some(WizardStep::Personal),
            WizardStep::Skills => Some(WizardStep::Country),
            WizardStep::Credentials => Some(WizardStep::Skills),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required.")]
    NameRequired,
    #[error("Phone number must be exactly 10 digits.")]
    PhoneFormat,
    #[error("Please select a country.")]
    CountryRequired,
    #[error("Please select a state.")]
    StateRequired,
    #[error("Please add at least one skill.")]
    SkillsRequired,
    #[error("Please enter a valid email address.")]
    EmailFormat,
    #[error("Please fill in all required fields.")]
    PasswordRequired,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Please upload a valid photo.")]
    PhotoRequired,
}

/// Pure predicate gating advancement past `step`. Each step only looks at
/// the fields it owns.
pub fn validate_step(step: WizardStep, draft: &RegistrationDraft) -> Result<(), ValidationError> {
    match step {
        WizardStep::Personal => {
            if !PHONE_RE.is_match(&draft.phone_number) {
                return Err(ValidationError::PhoneFormat);
            }
            if draft.name.is_empty() {
                return Err(ValidationError::NameRequired);
            }
        }
        WizardStep::Country => {
            if draft.country.is_empty() {
                return Err(ValidationError::CountryRequired);
            }
            if draft.state.is_empty() {
                return Err(ValidationError::StateRequired);
            }
        }
        WizardStep::Skills => {
            // Blank entries count: the listing is "present" even when empty.
            if draft.skills.is_empty() {
                return Err(ValidationError::SkillsRequired);
            }
        }
        WizardStep::Credentials => {
            if !EMAIL_RE.is_match(&draft.email) {
                return Err(ValidationError::EmailFormat);
            }
            if draft.password.is_empty() || draft.confirm_password.is_empty() {
                return Err(ValidationError::PasswordRequired);
            }
            if draft.password != draft.confirm_password {
                return Err(ValidationError::PasswordMismatch);
            }
            match &draft.photo {
                Some(photo) if photo.is_valid() => {}
                _ => return Err(ValidationError::PhotoRequired),
            }
        }
    }
    Ok(())
}

/// Runs every step's validator over the full draft, the same check the
/// submission path performs right before sending.
pub fn validate_draft(draft: &RegistrationDraft) -> Result<(), ValidationError> {
    for step in WizardStep::ALL {
        validate_step(step, draft)?;
    }
    Ok(())
}

/// Seam between the wizard and the register endpoint. `AdminApi` is the
/// production implementation; tests plug in fakes.
#[async_trait]
pub trait RegistrationGateway: Send + Sync {
    async fn register(
        &self,
        session: &Session,
        draft: &RegistrationDraft,
    ) -> Result<(), ApiClientError>;
}

#[async_trait]
impl<G: RegistrationGateway + ?Sized> RegistrationGateway for Arc<G> {
    async fn register(
        &self,
        session: &Session,
        draft: &RegistrationDraft,
    ) -> Result<(), ApiClientError> {
        (**self).register(session, draft).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Validation or submission failed; the active step did not move and
    /// `last_error` carries the reason.
    Rejected,
    /// The step's validator passed and the wizard moved forward.
    Advanced(WizardStep),
    /// The terminal step validated and the draft was submitted successfully.
    Submitted,
}

/// Owns the draft for its lifetime and walks it through the ordered steps.
/// Submission only ever happens from the terminal step.
pub struct StepFormController<G: RegistrationGateway> {
    gateway: G,
    session: Session,
    step: WizardStep,
    completed: bool,
    draft: RegistrationDraft,
    last_error: Option<String>,
}

impl<G: RegistrationGateway> StepFormController<G> {
    pub fn new(gateway: G, session: Session) -> Self {
        Self {
            gateway,
            session,
            step: WizardStep::Personal,
            completed: false,
            draft: RegistrationDraft::default(),
            last_error: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Merges a step's partial input into the draft.
    pub fn apply(&mut self, patch: DraftPatch) {
        self.draft.merge(patch);
    }

    /// Validates the active step and moves forward; from the terminal step a
    /// pass triggers submission instead. On success the draft is discarded.
    /// On any failure the step stays put and the draft survives so the user
    /// can correct and retry without re-entering earlier steps.
    pub async fn advance(&mut self) -> AdvanceOutcome {
        if self.completed {
            // Completed is terminal; there is nothing left to submit.
            return AdvanceOutcome::Submitted;
        }

        if let Err(err) = validate_step(self.step, &self.draft) {
            debug!(step = self.step.label(), error = %err, "wizard step rejected");
            self.last_error = Some(err.to_string());
            return AdvanceOutcome::Rejected;
        }

        match self.step.next() {
            Some(next) => {
                self.step = next;
                self.last_error = None;
                AdvanceOutcome::Advanced(next)
            }
            None => match self.gateway.register(&self.session, &self.draft).await {
                Ok(()) => {
                    info!("registration submitted");
                    self.completed = true;
                    self.last_error = None;
                    self.draft = RegistrationDraft::default();
                    AdvanceOutcome::Submitted
                }
                Err(err) => {
                    warn!(error = %err, "registration submission failed");
                    self.last_error = Some(err.to_string());
                    AdvanceOutcome::Rejected
                }
            },
        }
    }

    /// Moves one step back, clamped at the first step. Backward navigation
    /// never validates and always clears the error banner.
    pub fn retreat(&mut self) {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.last_error = None;
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
