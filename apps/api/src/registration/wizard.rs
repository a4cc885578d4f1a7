//! Registration wizard state machine.
//!
//! `WizardState` is a tagged union over the four form steps plus the two
//! terminal phases. Each step variant owns its own draft and its own field
//! errors, so no two steps ever share validation state. `Wizard::apply` is the
//! single reducer; it performs no I/O. Network work (email availability,
//! registration, login) is driven by `submit::RegistrationFlow`, which feeds
//! its outcomes back in as events.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::errors::{AppError, FieldErrors};
use crate::registration::schemas::{
    normalize_email, validate_contact, validate_education, validate_personal,
    validate_work_experience, ContactInfo, EducationInfo, PersonalInfo, WorkExperience,
};

pub const EMAIL_TAKEN_MESSAGE: &str =
    "This email is already registered. Please use a different email address.";
pub const EMAIL_UNVERIFIED_MESSAGE: &str = "Unable to verify email";

/// Confirmed values for each step. `None` until the step has been saved once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFormData {
    pub personal: Option<PersonalInfo>,
    pub education: Option<EducationInfo>,
    pub contact: Option<ContactInfo>,
    pub work_experience: Option<WorkExperience>,
}

impl RegistrationFormData {
    /// The body posted to the registration endpoint. Education and work
    /// experience travel as single-element arrays.
    /// The email is normalized here because a skipped contact step is stored unvalidated.
    pub fn to_payload(&self) -> Value {
        let mut contact = self.contact.clone().unwrap_or_default();
        contact.email = normalize_email(&contact.email);
        json!({
            "email": contact.email,
            "password": contact.password,
            "userType": "applicant",
            "userData": {
                "personal": self.personal.clone().unwrap_or_default(),
                "education": [self.education.clone().unwrap_or_default()],
                "contact": contact,
                "workExperience": [self.work_experience.clone().unwrap_or_default()],
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum WizardState {
    Personal {
        draft: PersonalInfo,
        errors: FieldErrors,
    },
    Education {
        draft: EducationInfo,
        errors: FieldErrors,
    },
    Contact {
        draft: ContactInfo,
        errors: FieldErrors,
    },
    WorkExperience {
        draft: WorkExperience,
        errors: FieldErrors,
    },
    Submitting,
    #[serde(rename_all = "camelCase")]
    Completed {
        user_id: Option<String>,
        logged_in: bool,
    },
}

/// Where the applicant lands once registration completes.
pub const COMPLETED_REDIRECT: &str = "/dashboard/applicant";

impl WizardState {
    pub fn name(&self) -> &'static str {
        match self {
            WizardState::Personal { .. } => "personal",
            WizardState::Education { .. } => "education",
            WizardState::Contact { .. } => "contact",
            WizardState::WorkExperience { .. } => "workExperience",
            WizardState::Submitting => "submitting",
            WizardState::Completed { .. } => "completed",
        }
    }

    /// Ordinal of the form step; `None` for the terminal phases.
    pub fn step_index(&self) -> Option<u8> {
        match self {
            WizardState::Personal { .. } => Some(0),
            WizardState::Education { .. } => Some(1),
            WizardState::Contact { .. } => Some(2),
            WizardState::WorkExperience { .. } => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "camelCase")]
pub enum WizardEvent {
    /// Continue with the current step's values.
    Next(Value),
    /// Go back, keeping the current step's live values.
    Back(Value),
    /// Skip an optional step.
    Skip(Value),
    /// Submit from the last step using its current draft.
    Submit,
    EmailTaken,
    /// The availability check itself failed.
    EmailUnverified,
    SubmissionFailed(String),
    Submitted {
        user_id: Option<String>,
        logged_in: bool,
    },
}

impl WizardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WizardEvent::Next(_) => "next",
            WizardEvent::Back(_) => "back",
            WizardEvent::Skip(_) => "skip",
            WizardEvent::Submit => "submit",
            WizardEvent::EmailTaken => "emailTaken",
            WizardEvent::EmailUnverified => "emailUnverified",
            WizardEvent::SubmissionFailed(_) => "submissionFailed",
            WizardEvent::Submitted { .. } => "submitted",
        }
    }

    /// Events a client may send; the rest are produced by the submission flow.
    pub fn is_client_event(&self) -> bool {
        matches!(
            self,
            WizardEvent::Next(_) | WizardEvent::Back(_) | WizardEvent::Skip(_) | WizardEvent::Submit
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("'{event}' is not allowed on the {state} step")]
    InvalidTransition {
        event: &'static str,
        state: &'static str,
    },

    #[error("Malformed step values: {0}")]
    Malformed(String),
}

impl From<WizardError> for AppError {
    fn from(e: WizardError) -> Self {
        match e {
            WizardError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            WizardError::Malformed(msg) => AppError::Validation(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wizard {
    pub state: WizardState,
    pub data: RegistrationFormData,
    /// Set when a network step fails; cleared by the next accepted event.
    pub blocking_error: Option<String>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

fn email_message(event: &WizardEvent) -> &'static str {
    match event {
        WizardEvent::EmailUnverified => EMAIL_UNVERIFIED_MESSAGE,
        _ => EMAIL_TAKEN_MESSAGE,
    }
}

fn parse_values<T: serde::de::DeserializeOwned>(values: Value) -> Result<T, WizardError> {
    let values = if values.is_null() { json!({}) } else { values };
    serde_json::from_value(values).map_err(|e| WizardError::Malformed(e.to_string()))
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            state: WizardState::Personal {
                draft: PersonalInfo::default(),
                errors: FieldErrors::new(),
            },
            data: RegistrationFormData::default(),
            blocking_error: None,
        }
    }

    // Entering a step always resets its form from the cache or the defaults.

    fn personal_step(&self) -> WizardState {
        WizardState::Personal {
            draft: self.data.personal.clone().unwrap_or_default(),
            errors: FieldErrors::new(),
        }
    }

    fn education_step(&self) -> WizardState {
        WizardState::Education {
            draft: self.data.education.clone().unwrap_or_default(),
            errors: FieldErrors::new(),
        }
    }

    fn contact_step(&self) -> WizardState {
        WizardState::Contact {
            draft: self.data.contact.clone().unwrap_or_default(),
            errors: FieldErrors::new(),
        }
    }

    fn work_experience_step(&self) -> WizardState {
        WizardState::WorkExperience {
            draft: self.data.work_experience.clone().unwrap_or_default(),
            errors: FieldErrors::new(),
        }
    }

    fn invalid(&self, event: &WizardEvent) -> WizardError {
        WizardError::InvalidTransition {
            event: event.name(),
            state: self.state.name(),
        }
    }

    /// Applies one event. Validation failures are not errors: the wizard stays
    /// on the step with the submitted values as draft and the field errors set.
    pub fn apply(&mut self, event: WizardEvent) -> Result<(), WizardError> {
        let keeps_error = matches!(event, WizardEvent::SubmissionFailed(_));
        let next = self.transition(self.state.clone(), event)?;
        if !keeps_error {
            self.blocking_error = None;
        }
        self.state = next;
        Ok(())
    }

    fn transition(
        &mut self,
        state: WizardState,
        event: WizardEvent,
    ) -> Result<WizardState, WizardError> {
        let next = match (state, event) {
            // ── Continue ──────────────────────────────────────────────────
            (WizardState::Personal { .. }, WizardEvent::Next(values)) => {
                let draft: PersonalInfo = parse_values(values)?;
                match validate_personal(&draft) {
                    Ok(valid) => {
                        self.data.personal = Some(valid);
                        self.education_step()
                    }
                    Err(errors) => WizardState::Personal { draft, errors },
                }
            }
            (WizardState::Education { .. }, WizardEvent::Next(values)) => {
                let draft: EducationInfo = parse_values(values)?;
                match validate_education(&draft) {
                    Ok(valid) => {
                        self.data.education = Some(valid);
                        self.contact_step()
                    }
                    Err(errors) => WizardState::Education { draft, errors },
                }
            }
            (WizardState::Contact { .. }, WizardEvent::Next(values)) => {
                let draft: ContactInfo = parse_values(values)?;
                match validate_contact(&draft) {
                    Ok(valid) => {
                        self.data.contact = Some(valid);
                        self.work_experience_step()
                    }
                    Err(errors) => WizardState::Contact { draft, errors },
                }
            }
            (WizardState::WorkExperience { .. }, WizardEvent::Next(values)) => {
                let draft: WorkExperience = parse_values(values)?;
                self.confirm_work_experience(draft)
            }
            (WizardState::WorkExperience { draft, .. }, WizardEvent::Submit) => {
                self.confirm_work_experience(draft)
            }

            // ── Back ──────────────────────────────────────────────────────
            (WizardState::Education { .. }, WizardEvent::Back(values)) => {
                self.data.education = Some(parse_values(values)?);
                self.personal_step()
            }
            (WizardState::Contact { .. }, WizardEvent::Back(values)) => {
                self.data.contact = Some(parse_values(values)?);
                self.education_step()
            }
            (WizardState::WorkExperience { .. }, WizardEvent::Back(values)) => {
                self.data.work_experience = Some(parse_values(values)?);
                self.contact_step()
            }

            // ── Skip (optional steps only) ────────────────────────────────
            (WizardState::Contact { .. }, WizardEvent::Skip(values)) => {
                if self.data.contact.is_none() {
                    self.data.contact = Some(parse_values(values)?);
                }
                self.work_experience_step()
            }
            (WizardState::WorkExperience { .. }, WizardEvent::Skip(values)) => {
                if self.data.work_experience.is_none() {
                    self.data.work_experience = Some(parse_values(values)?);
                }
                WizardState::Submitting
            }

            // ── Outcomes of network steps ─────────────────────────────────
            (
                WizardState::Contact { draft, mut errors },
                event @ (WizardEvent::EmailTaken | WizardEvent::EmailUnverified),
            ) => {
                errors.insert("email".to_string(), email_message(&event).to_string());
                WizardState::Contact { draft, errors }
            }
            (
                WizardState::WorkExperience { .. } | WizardState::Submitting,
                event @ (WizardEvent::EmailTaken | WizardEvent::EmailUnverified),
            ) => {
                let mut errors = FieldErrors::new();
                errors.insert("email".to_string(), email_message(&event).to_string());
                WizardState::Contact {
                    draft: self.data.contact.clone().unwrap_or_default(),
                    errors,
                }
            }
            (WizardState::Submitting, WizardEvent::SubmissionFailed(message)) => {
                self.blocking_error = Some(message);
                self.work_experience_step()
            }
            (WizardState::Submitting, WizardEvent::Submitted { user_id, logged_in }) => {
                self.data.contact = self.data.contact.as_ref().map(ContactInfo::redacted);
                WizardState::Completed { user_id, logged_in }
            }

            (_, event) => return Err(self.invalid(&event)),
        };

        Ok(next)
    }

    /// Copy safe to persist between requests. Contact drafts lose their
    /// passwords; the confirmed contact keeps them until submission.
    pub fn for_storage(&self) -> Wizard {
        let mut copy = self.clone();
        if let WizardState::Contact { draft, .. } = &mut copy.state {
            *draft = draft.redacted();
        }
        copy
    }

    /// Copy safe to send to a client: no passwords anywhere.
    pub fn redacted(&self) -> Wizard {
        let mut copy = self.for_storage();
        copy.data.contact = copy.data.contact.as_ref().map(ContactInfo::redacted);
        copy
    }

    fn confirm_work_experience(&mut self, draft: WorkExperience) -> WizardState {
        match validate_work_experience(&draft) {
            Ok(valid) => {
                self.data.work_experience = Some(valid);
                WizardState::Submitting
            }
            Err(errors) => WizardState::WorkExperience { draft, errors },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personal_values() -> Value {
        json!({ "name": "Ada Lovelace", "address": "12 Analytical Row", "dob": "10-12-15", "sex": "Female" })
    }

    fn education_values() -> Value {
        json!({ "degree": "BSc Mathematics", "institution": "London University", "address": "Gower Street", "startDate": "2019-09-01", "endDate": "2022-06-30", "grade": "First" })
    }

    fn contact_values(email: &str) -> Value {
        json!({ "phone": "07700900123", "email": email, "password": "engine1", "confirmPassword": "engine1" })
    }

    fn work_values() -> Value {
        json!({ "company": "Babbage & Co", "position": "Analyst", "description": "Notes on the engine" })
    }

    fn at_work_experience() -> Wizard {
        let mut wizard = Wizard::new();
        wizard.apply(WizardEvent::Next(personal_values())).unwrap();
        wizard.apply(WizardEvent::Next(education_values())).unwrap();
        wizard
            .apply(WizardEvent::Next(contact_values("ada@example.com")))
            .unwrap();
        wizard
    }

    #[test]
    fn test_happy_path_reaches_submitting() {
        let mut wizard = at_work_experience();
        assert_eq!(wizard.state.step_index(), Some(3));
        wizard.apply(WizardEvent::Next(work_values())).unwrap();
        assert_eq!(wizard.state, WizardState::Submitting);
    }

    #[test]
    fn test_invalid_step_keeps_draft_and_errors() {
        let mut wizard = Wizard::new();
        wizard
            .apply(WizardEvent::Next(json!({ "name": "A" })))
            .unwrap();
        match &wizard.state {
            WizardState::Personal { draft, errors } => {
                assert_eq!(draft.name, "A");
                assert!(errors.contains_key("name"));
                assert!(errors.contains_key("dob"));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(wizard.data.personal.is_none());
    }

    #[test]
    fn test_next_step_resets_from_cache_not_previous_draft() {
        let mut wizard = Wizard::new();
        wizard.apply(WizardEvent::Next(personal_values())).unwrap();
        match &wizard.state {
            WizardState::Education { draft, errors } => {
                assert_eq!(draft, &EducationInfo::default());
                assert!(errors.is_empty());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_back_persists_live_values_and_restores_cache() {
        let mut wizard = Wizard::new();
        wizard.apply(WizardEvent::Next(personal_values())).unwrap();
        wizard
            .apply(WizardEvent::Back(json!({ "degree": "BSc" })))
            .unwrap();

        match &wizard.state {
            WizardState::Personal { draft, .. } => assert_eq!(draft.name, "Ada Lovelace"),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(wizard.data.education.as_ref().unwrap().degree, "BSc");

        wizard.apply(WizardEvent::Next(personal_values())).unwrap();
        match &wizard.state {
            WizardState::Education { draft, .. } => assert_eq!(draft.degree, "BSc"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_payload_after_back_and_forth_holds_last_confirmed_values() {
        let mut wizard = at_work_experience();
        wizard.apply(WizardEvent::Back(work_values())).unwrap();
        wizard
            .apply(WizardEvent::Next(contact_values("Grace@Example.com")))
            .unwrap();
        wizard.apply(WizardEvent::Next(work_values())).unwrap();

        let payload = wizard.data.to_payload();
        let user_data = payload["userData"].as_object().unwrap();
        assert_eq!(user_data.len(), 4);
        assert_eq!(payload["email"], "grace@example.com");
        assert_eq!(payload["userType"], "applicant");
        assert_eq!(user_data["contact"]["email"], "grace@example.com");
        assert_eq!(user_data["personal"]["dob"], "2015-12-10");
        assert_eq!(user_data["education"].as_array().unwrap().len(), 1);
        assert_eq!(user_data["workExperience"][0]["company"], "Babbage & Co");
    }

    #[test]
    fn test_skipped_contact_email_is_normalized_in_payload() {
        let mut wizard = Wizard::new();
        wizard.apply(WizardEvent::Next(personal_values())).unwrap();
        wizard.apply(WizardEvent::Next(education_values())).unwrap();
        wizard
            .apply(WizardEvent::Skip(contact_values(" Grace@Example.com ")))
            .unwrap();
        wizard.apply(WizardEvent::Submit).unwrap();
        assert_eq!(wizard.state, WizardState::Submitting);

        let payload = wizard.data.to_payload();
        assert_eq!(payload["email"], "grace@example.com");
        assert_eq!(payload["userData"]["contact"]["email"], "grace@example.com");
    }

    #[test]
    fn test_passwords_are_not_kept_after_submission() {
        let mut wizard = at_work_experience();
        assert_eq!(wizard.for_storage().data.contact.unwrap().password, "engine1");
        assert!(wizard.redacted().data.contact.unwrap().password.is_empty());

        wizard.apply(WizardEvent::Submit).unwrap();
        wizard
            .apply(WizardEvent::Submitted {
                user_id: None,
                logged_in: true,
            })
            .unwrap();
        let contact = wizard.data.contact.as_ref().unwrap();
        assert!(contact.password.is_empty());
        assert!(contact.confirm_password.is_empty());
        assert_eq!(contact.email, "ada@example.com");
    }

    #[test]
    fn test_contact_draft_is_stored_without_password() {
        let mut wizard = Wizard::new();
        wizard.apply(WizardEvent::Next(personal_values())).unwrap();
        wizard.apply(WizardEvent::Next(education_values())).unwrap();
        wizard
            .apply(WizardEvent::Next(json!({ "email": "ada@example.com", "password": "engine1" })))
            .unwrap();
        match wizard.for_storage().state {
            WizardState::Contact { draft, errors } => {
                assert!(draft.password.is_empty());
                assert!(errors.contains_key("phone"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_skip_not_allowed_on_required_steps() {
        let mut wizard = Wizard::new();
        let err = wizard.apply(WizardEvent::Skip(json!({}))).unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { .. }));
        assert_eq!(wizard.state.step_index(), Some(0));
    }

    #[test]
    fn test_skip_on_last_step_submits_in_memory_values() {
        let mut wizard = at_work_experience();
        wizard.apply(WizardEvent::Skip(work_values())).unwrap();
        assert_eq!(wizard.state, WizardState::Submitting);
        assert_eq!(
            wizard.data.work_experience.as_ref().unwrap().position,
            "Analyst"
        );
    }

    #[test]
    fn test_skip_keeps_previously_confirmed_values() {
        let mut wizard = at_work_experience();
        wizard.apply(WizardEvent::Back(work_values())).unwrap();
        wizard
            .apply(WizardEvent::Skip(contact_values("other@example.com")))
            .unwrap();
        assert_eq!(
            wizard.data.contact.as_ref().unwrap().email,
            "ada@example.com"
        );
    }

    #[test]
    fn test_email_taken_during_submission_routes_to_contact() {
        let mut wizard = at_work_experience();
        wizard.apply(WizardEvent::Submit).unwrap();
        wizard.apply(WizardEvent::EmailTaken).unwrap();
        match &wizard.state {
            WizardState::Contact { draft, errors } => {
                assert_eq!(draft.email, "ada@example.com");
                assert_eq!(errors["email"], EMAIL_TAKEN_MESSAGE);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_submission_failure_blocks_on_last_step() {
        let mut wizard = at_work_experience();
        wizard.apply(WizardEvent::Submit).unwrap();
        wizard
            .apply(WizardEvent::SubmissionFailed("Registration failed".into()))
            .unwrap();
        assert_eq!(wizard.state.step_index(), Some(3));
        assert_eq!(wizard.blocking_error.as_deref(), Some("Registration failed"));
    }

    #[test]
    fn test_submit_outside_last_step_is_rejected() {
        let mut wizard = Wizard::new();
        assert!(wizard.apply(WizardEvent::Submit).is_err());
        assert_eq!(wizard.state.name(), "personal");
    }

    #[test]
    fn test_event_wire_format() {
        let event: WizardEvent =
            serde_json::from_value(json!({ "type": "next", "values": { "name": "Ada" } })).unwrap();
        assert_eq!(event, WizardEvent::Next(json!({ "name": "Ada" })));
        let event: WizardEvent = serde_json::from_value(json!({ "type": "submit" })).unwrap();
        assert_eq!(event, WizardEvent::Submit);
    }
}
