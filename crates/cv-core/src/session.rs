//! Explicit session context passed to every authenticated call.

use secrecy::{ExposeSecret, SecretString};

/// An authenticated session: bearer token plus the id of the current user.
///
/// `user_id` is `None` until the profile (or the token claims) revealed it.
#[derive(Debug)]
pub struct Session {
    token: SecretString,
    pub user_id: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            user_id,
        }
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..self
        }
    }
}
