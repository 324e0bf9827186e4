use crate::api::TaskApi;
use crate::app::Route;
use crate::form::{Field, Form};
use crate::models::PasswordReset;
use crate::request::RequestState;
use crate::validate::{self, FieldErrors};
use tracing::{info, warn};

const RESET_FIELDS: [&str; 3] = ["otp", "new_password", "confirm_password"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetStep {
    Request,
    Reset,
}

pub struct ResetScreen {
    pub step: ResetStep,
    pub form: Form,
    pub request: RequestState<()>,
}

impl Default for ResetScreen {
    fn default() -> Self {
        ResetScreen::new()
    }
}

impl ResetScreen {
    pub fn new() -> ResetScreen {
        let mut form = Form::new(vec![
            Field::text("email", "Email"),
            Field::text("otp", "OTP"),
            Field::secret("new_password", "New password"),
            Field::secret("confirm_password", "Confirm password"),
        ]);
        for key in RESET_FIELDS {
            form.set_hidden(key, true);
        }
        ResetScreen {
            step: ResetStep::Request,
            form,
            request: RequestState::Idle,
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self.step {
            ResetStep::Request => {
                validate::check(&mut errors, "email", validate::email(self.form.value("email")));
            }
            ResetStep::Reset => {
                validate::check(&mut errors, "otp", validate::otp(self.form.value("otp")));
                validate::check(
                    &mut errors,
                    "new_password",
                    validate::password(self.form.value("new_password")),
                );
                if self.form.value("new_password") != self.form.value("confirm_password") {
                    errors.insert("confirm_password", "Passwords do not match".to_string());
                }
            }
        }
        errors
    }

    pub async fn submit<A: TaskApi>(&mut self, api: &A) -> Option<Route> {
        self.form.errors = self.validate();
        if !self.form.errors.is_empty() {
            return None;
        }
        self.request.start();

        let email = self.form.value("email").trim().to_string();
        match self.step {
            ResetStep::Request => {
                match api.request_password_reset(&email).await {
                    Ok(()) => {
                        info!(email = %email, "password reset otp sent");
                        self.form.set_disabled("email", true);
                        for key in RESET_FIELDS {
                            self.form.set_hidden(key, false);
                        }
                        self.form.focus_key("otp");
                        self.step = ResetStep::Reset;
                        self.request.succeed(());
                    }
                    Err(err) => {
                        warn!(error = %err, "password reset request failed");
                        self.request
                            .fail(err.message_or("Failed to send OTP. Please try again."));
                    }
                }
                None
            }
            ResetStep::Reset => {
                let reset = PasswordReset {
                    email,
                    otp: self.form.value("otp").trim().to_string(),
                    new_password: self.form.value("new_password").to_string(),
                    confirm_password: self.form.value("confirm_password").to_string(),
                };
                match api.reset_password(&reset).await {
                    Ok(()) => {
                        info!(email = %reset.email, "password reset");
                        self.request.succeed(());
                        Some(Route::Login)
                    }
                    Err(err) => {
                        warn!(error = %err, "password reset failed");
                        self.request
                            .fail(err.message_or("Failed to reset password. Please try again."));
                        None
                    }
                }
            }
        }
    }
}
