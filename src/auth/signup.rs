use crate::api::TaskApi;
use crate::app::Route;
use crate::form::{Field, Form};
use crate::models::{NewUser, Role};
use crate::request::RequestState;
use crate::session::SessionStore;
use crate::validate::{self, FieldErrors};
use tracing::{error, info, warn};

const REGISTERED: &str = "User registered successfully";
const IDENTITY_FIELDS: [&str; 3] = ["name", "email", "password"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignupStep {
    Form,
    Otp,
}

pub struct SignupScreen {
    pub step: SignupStep,
    pub form: Form,
    pub request: RequestState<()>,
    otp_required: bool,
}

impl SignupScreen {
    pub fn new(otp_required: bool) -> SignupScreen {
        let mut form = Form::new(vec![
            Field::text("name", "Full name"),
            Field::text("email", "Email"),
            Field::secret("password", "Password"),
            Field::text("otp", "OTP"),
        ]);
        form.set_hidden("otp", true);
        SignupScreen {
            step: SignupStep::Form,
            form,
            request: RequestState::Idle,
            otp_required,
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self.step {
            SignupStep::Form => {
                validate::check(&mut errors, "name", validate::person_name(self.form.value("name")));
                validate::check(&mut errors, "email", validate::email(self.form.value("email")));
                validate::check(
                    &mut errors,
                    "password",
                    validate::password(self.form.value("password")),
                );
            }
            SignupStep::Otp => {
                validate::check(&mut errors, "otp", validate::otp(self.form.value("otp")));
            }
        }
        errors
    }

    fn new_user(&self) -> NewUser {
        NewUser {
            name: self.form.value("name").trim().to_string(),
            email: self.form.value("email").trim().to_string(),
            password: self.form.value("password").to_string(),
        }
    }

    pub async fn submit<A: TaskApi>(&mut self, api: &A, session: &SessionStore) -> Option<Route> {
        self.form.errors = self.validate();
        if !self.form.errors.is_empty() {
            return None;
        }
        self.request.start();

        match self.step {
            SignupStep::Form if self.otp_required => {
                self.send_otp(api).await;
                None
            }
            SignupStep::Form => self.register_direct(api, session).await,
            SignupStep::Otp => self.register(api, session).await,
        }
    }

    async fn send_otp<A: TaskApi>(&mut self, api: &A) {
        let email = self.form.value("email").trim().to_string();
        match api.send_signup_otp(&email).await {
            Ok(()) => {
                info!(email = %email, "signup otp sent");
                for key in IDENTITY_FIELDS {
                    self.form.set_disabled(key, true);
                }
                self.form.set_hidden("otp", false);
                self.form.focus_key("otp");
                self.step = SignupStep::Otp;
                self.request.succeed(());
            }
            Err(err) => {
                warn!(error = %err, "could not send signup otp");
                self.request
                    .fail(err.message_or("Failed to send OTP. Please try again."));
            }
        }
    }

    async fn register<A: TaskApi>(&mut self, api: &A, session: &SessionStore) -> Option<Route> {
        let user = self.new_user();
        let otp = self.form.value("otp").trim().to_string();
        match api.register(&user, &otp).await {
            Ok(reply) if reply.trim() == REGISTERED => self.finish(&user, session),
            Ok(reply) => {
                warn!(reply = %reply, "registration refused");
                self.request.fail(reply.trim());
                None
            }
            Err(err) => {
                warn!(error = %err, "registration failed");
                self.request
                    .fail(err.message_or("Failed to create account. Please try again."));
                None
            }
        }
    }

    async fn register_direct<A: TaskApi>(
        &mut self,
        api: &A,
        session: &SessionStore,
    ) -> Option<Route> {
        let user = self.new_user();
        match api.create_user(&user).await {
            Ok(()) => self.finish(&user, session),
            Err(err) => {
                warn!(error = %err, "direct signup failed");
                self.request
                    .fail(err.message_or("Failed to create account. Please try again."));
                None
            }
        }
    }

    fn finish(&mut self, user: &NewUser, session: &SessionStore) -> Option<Route> {
        if let Err(err) = session.set_identity(&user.email, Role::User, Some(&user.name)) {
            error!(error = %err, "could not store session");
            self.request
                .fail("Could not save your session. Please sign in.");
            return None;
        }
        info!(email = %user.email, "account created");
        self.request.succeed(());
        Some(Route::Tasks)
    }
}
