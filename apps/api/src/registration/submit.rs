//! Network side of the registration wizard: email availability, account
//! creation and auto-login. Outcomes are fed back into the reducer as events.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::backend::{BackendClient, BackendError};
use crate::errors::AppError;
use crate::persistence::{ClientStore, StoreKey};
use crate::registration::schemas::{validate_contact, ContactInfo};
use crate::registration::wizard::{Wizard, WizardEvent, WizardState};

/// The auth endpoints the wizard depends on.
///
/// Carried in `AppState` as `Arc<dyn AuthGateway>`.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn is_email_available(&self, email: &str) -> Result<bool, BackendError>;

    /// Creates the account. Returns the new user id when the backend reports one.
    async fn register(&self, payload: &Value) -> Result<Option<String>, BackendError>;

    async fn login(&self, email: &str, password: &str) -> Result<String, BackendError>;
}

/// `AuthGateway` over the CRUD/auth API.
pub struct HttpAuthGateway {
    backend: BackendClient,
}

impl HttpAuthGateway {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn is_email_available(&self, email: &str) -> Result<bool, BackendError> {
        self.backend.check_email(email).await
    }

    async fn register(&self, payload: &Value) -> Result<Option<String>, BackendError> {
        self.backend.register(payload).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<String, BackendError> {
        self.backend.login(email, password).await
    }
}

fn is_email_conflict(e: &BackendError) -> bool {
    let message = e.message().to_ascii_lowercase();
    e.status() == Some(409)
        || message.contains("email already exists")
        || message.contains("already registered")
}

pub struct RegistrationFlow {
    gateway: Arc<dyn AuthGateway>,
    store: Arc<dyn ClientStore>,
}

impl RegistrationFlow {
    pub fn new(gateway: Arc<dyn AuthGateway>, store: Arc<dyn ClientStore>) -> Self {
        Self { gateway, store }
    }

    /// Applies a client event, running whatever network step it triggers.
    pub async fn handle(&self, wizard: &mut Wizard, event: WizardEvent) -> Result<(), AppError> {
        if !event.is_client_event() {
            return Err(AppError::Validation(format!(
                "'{}' cannot be sent by a client",
                event.name()
            )));
        }

        match (&wizard.state, event) {
            (WizardState::Contact { .. }, WizardEvent::Next(values)) => {
                self.continue_from_contact(wizard, values).await?;
            }
            (_, event) => wizard.apply(event)?,
        }

        if wizard.state == WizardState::Submitting {
            self.submit(wizard).await?;
        }
        Ok(())
    }

    /// The contact step only advances once the email is known to be free.
    async fn continue_from_contact(&self, wizard: &mut Wizard, values: Value) -> Result<(), AppError> {
        let parsed: Option<ContactInfo> = serde_json::from_value(values.clone()).ok();
        let Some(valid) = parsed.and_then(|c| validate_contact(&c).ok()) else {
            // Invalid input: let the reducer record the field errors.
            wizard.apply(WizardEvent::Next(values))?;
            return Ok(());
        };

        let available = self.gateway.is_email_available(&valid.email).await;

        wizard.apply(WizardEvent::Next(values))?;
        match available {
            Ok(true) => {}
            Ok(false) => {
                info!("Email {} is already registered", valid.email);
                wizard.apply(WizardEvent::EmailTaken)?;
            }
            Err(e) => {
                warn!("Email availability check failed: {e}");
                wizard.apply(WizardEvent::EmailUnverified)?;
            }
        }
        Ok(())
    }

    /// Terminal action: re-check the email, register, then log in.
    async fn submit(&self, wizard: &mut Wizard) -> Result<(), AppError> {
        let contact = wizard.data.contact.clone().unwrap_or_default();
        let email = contact.email.trim().to_lowercase();
        let password = contact.password;

        if email.is_empty() {
            wizard.apply(WizardEvent::SubmissionFailed(
                "Email is required. Please go back to the contact step and provide an email address."
                    .to_string(),
            ))?;
            return Ok(());
        }

        match self.gateway.is_email_available(&email).await {
            Ok(true) => {}
            Ok(false) => {
                wizard.apply(WizardEvent::EmailTaken)?;
                return Ok(());
            }
            Err(e) => {
                warn!("Email availability check failed: {e}");
                wizard.apply(WizardEvent::EmailUnverified)?;
                return Ok(());
            }
        }

        let payload = wizard.data.to_payload();
        let user_id = match self.gateway.register(&payload).await {
            Ok(user_id) => user_id,
            Err(e) if is_email_conflict(&e) => {
                wizard.apply(WizardEvent::EmailTaken)?;
                return Ok(());
            }
            Err(e) => {
                warn!("Registration failed: {e}");
                wizard.apply(WizardEvent::SubmissionFailed(format!(
                    "Registration failed: {}",
                    e.message()
                )))?;
                return Ok(());
            }
        };
        info!("Registered applicant {email}");

        // A failed auto-login is not fatal; the user can log in manually.
        let logged_in = match self.gateway.login(&email, &password).await {
            Ok(token) => {
                let owner = user_id.clone().unwrap_or_else(|| email.clone());
                if let Err(e) = self.store.set_raw(&StoreKey::AuthToken(owner), token).await {
                    warn!("Could not persist session token: {e}");
                }
                true
            }
            Err(e) => {
                warn!("Auto-login after registration failed: {e}");
                false
            }
        };

        wizard.apply(WizardEvent::Submitted { user_id, logged_in })?;
        Ok(())
    }
}
