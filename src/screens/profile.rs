//! Signed-in user's own profile and password.
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::model::Mutation;
use crate::api::{ApiError, AuthService, ResourceService};
use crate::listview::SubmitState;
use crate::model::User;
use crate::notice::{Notice, Notices};
use crate::session::{AuthError, SessionStore};
use crate::validate::{is_valid_email, is_valid_phone, PasswordChange, Validate, ValidationError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ProfileError {
    pub fn display_message(&self) -> String {
        match self {
            ProfileError::Auth(e) => e.display_message(),
            ProfileError::Api(e) => e.display_message(),
            ProfileError::Validation(e) => e.message.clone(),
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
}

impl Validate for ProfileForm {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "name is required"));
        }
        if !self.email.is_empty() && !is_valid_email(&self.email) {
            return Err(ValidationError::new("email", "email address is not valid"));
        }
        if !self.phone.is_empty() && !is_valid_phone(&self.phone) {
            return Err(ValidationError::new("phone", "phone number is not valid"));
        }
        Ok(())
    }
}

impl ProfileForm {
    fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
        }
    }

    fn apply_to(&self, user: &mut User) {
        user.name = self.name.trim().to_string();
        user.email = self.email.trim().to_string();
        user.phone = Some(self.phone.trim().to_string()).filter(|p| !p.is_empty());
        user.password = None;
    }
}

pub struct ProfileScreen<S>
where
    S: ResourceService<User> + AuthService,
{
    service: S,
    store: SessionStore,
    record: Option<User>,
    form: ProfileForm,
    submit_state: SubmitState,
    notices: Notices,
}

impl<S> ProfileScreen<S>
where
    S: ResourceService<User> + AuthService,
{
    pub fn new(service: S, store: SessionStore, message_delay: Duration) -> Self {
        Self {
            service,
            store,
            record: None,
            form: ProfileForm::default(),
            submit_state: SubmitState::Idle,
            notices: Notices::new(message_delay),
        }
    }

    pub fn form(&self) -> &ProfileForm {
        &self.form
    }

    pub fn submit_state(&self) -> &SubmitState {
        &self.submit_state
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notices.current()
    }

    /// Fill the form from the session, then from the stored user record
    /// when the session carries an id.
    #[instrument(skip_all)]
    pub async fn load(&mut self) -> Result<&ProfileForm, ProfileError> {
        let session = self.store.current().ok_or(AuthError::SignedOut)?;
        self.form = ProfileForm {
            name: session.display_name(),
            username: session.username.clone(),
            ..ProfileForm::default()
        };
        if let Some(id) = session.user_id.as_deref() {
            match self.service.fetch(id).await {
                Ok(user) => {
                    self.form = ProfileForm::from_user(&user);
                    self.record = Some(user);
                }
                Err(err) => {
                    warn!(?err, "failed to load profile record");
                    self.notices.error(err.display_message());
                    return Err(err.into());
                }
            }
        }
        Ok(&self.form)
    }

    fn fail(&mut self, err: ProfileError) -> ProfileError {
        let msg = err.display_message();
        self.submit_state = SubmitState::Failed(msg.clone());
        self.notices.error(msg);
        err
    }

    /// Save the form and publish the new display name.
    #[instrument(skip_all)]
    pub async fn save(&mut self, form: ProfileForm) -> Result<(), ProfileError> {
        if let Err(err) = form.validate() {
            return Err(self.fail(err.into()));
        }
        let Some(mut user) = self.record.clone() else {
            return Err(self.fail(AuthError::SignedOut.into()));
        };
        let Some(id) = user.id.clone() else {
            return Err(self.fail(AuthError::SignedOut.into()));
        };
        form.apply_to(&mut user);
        self.submit_state = SubmitState::Submitting;

        match self.service.update(&id, &user).await {
            Ok(mutation) => {
                let saved = match mutation {
                    Mutation::Saved(saved) => saved,
                    Mutation::Acknowledged { .. } => user,
                };
                info!("profile saved");
                self.store.update_display_name(&saved.name);
                self.form = ProfileForm::from_user(&saved);
                self.record = Some(saved);
                self.submit_state = SubmitState::Succeeded;
                self.notices.success("Profile updated successfully");
                Ok(())
            }
            Err(err) => {
                warn!(?err, "profile update rejected");
                Err(self.fail(err.into()))
            }
        }
    }

    /// On success the session ends; the caller sends the user back to login.
    #[instrument(skip_all)]
    pub async fn change_password(&mut self, change: PasswordChange) -> Result<(), ProfileError> {
        if let Err(err) = change.validate() {
            return Err(self.fail(err.into()));
        }
        self.submit_state = SubmitState::Submitting;
        match self
            .service
            .change_password(&change.old_password, &change.new_password)
            .await
        {
            Ok(()) => {
                info!("password changed; ending session");
                self.store.clear();
                self.submit_state = SubmitState::Succeeded;
                self.notices
                    .success("Password changed. Please sign in again.");
                Ok(())
            }
            Err(err) => {
                warn!(?err, "password change rejected");
                Err(self.fail(err.into()))
            }
        }
    }
}
