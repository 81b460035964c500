//! Write-only repository credentials.

use std::fmt;

/// Git credentials forwarded to workers and never echoed back.
///
/// Implements neither `Serialize` nor a revealing `Debug`; the password is
/// only reachable through [`Self::expose_password`].
#[derive(Clone, PartialEq, Eq)]
pub struct GitCredentials {
    user: String,
    password: String,
}

impl GitCredentials {
    /// Creates credentials from a user name and password.
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Returns the user name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the password for forwarding to a worker or secret store.
    #[must_use]
    pub fn expose_password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for GitCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
