use crate::api::TaskApi;
use crate::app::Route;
use crate::form::{Field, Form};
use crate::models::Credentials;
use crate::request::RequestState;
use crate::session::SessionStore;
use crate::validate::{self, FieldErrors};
use tracing::{error, info, warn};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct LoginScreen {
    pub form: Form,
    pub request: RequestState<()>,
}

impl Default for LoginScreen {
    fn default() -> Self {
        LoginScreen::new()
    }
}

impl LoginScreen {
    pub fn new() -> LoginScreen {
        LoginScreen {
            form: Form::new(vec![
                Field::text("email", "Email"),
                Field::secret("password", "Password"),
            ]),
            request: RequestState::Idle,
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validate::check(&mut errors, "email", validate::email(self.form.value("email")));
        validate::check(
            &mut errors,
            "password",
            validate::password(self.form.value("password")),
        );
        errors
    }

    pub async fn submit<A: TaskApi>(&mut self, api: &A, session: &SessionStore) -> Option<Route> {
        self.form.errors = self.validate();
        if !self.form.errors.is_empty() {
            return None;
        }

        let credentials = Credentials {
            email: self.form.value("email").trim().to_string(),
            password: self.form.value("password").to_string(),
        };
        self.request.start();

        match api.login(&credentials).await {
            Ok(reply) => {
                let email = reply.email.unwrap_or_else(|| credentials.email.clone());
                let role = reply.role.unwrap_or_default();
                if let Err(err) = session.set_identity(&email, role, reply.name.as_deref()) {
                    error!(error = %err, "could not store session");
                    self.request.fail("Could not save your session. Please try again.");
                    return None;
                }
                info!(email = %email, "signed in");
                self.request.succeed(());
                Some(Route::Tasks)
            }
            Err(err) => {
                // unknown email and wrong password look the same to the user
                warn!(error = %err, "login failed");
                self.request.fail(INVALID_CREDENTIALS);
                None
            }
        }
    }
}
