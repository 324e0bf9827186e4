//! Sign-in, sign-up and password reset screens.

mod login;
mod reset;
mod signup;

pub use login::LoginScreen;
pub use reset::{ResetScreen, ResetStep};
pub use signup::{SignupScreen, SignupStep};
