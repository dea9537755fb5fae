//! User identity.
//!
//! Sign-up and sign-in belong to an external identity provider. This module
//! holds what the rest of the crate needs from it: the session of the user
//! the tracker acts for, and the failure reasons the provider reports.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// Why the identity provider rejected a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
    /// The email address is malformed.
    InvalidEmail,
    /// No account exists for the email address.
    UserNotFound,
    /// The password did not match.
    WrongPassword,
    /// An account already exists for the email address.
    EmailAlreadyInUse,
    /// The password does not meet the provider's strength rules.
    WeakPassword,
    /// Any other provider error code.
    Other(String),
}

impl AuthFailureReason {
    /// Map a provider error code (e.g. `auth/wrong-password`) to a reason.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/user-not-found" => Self::UserNotFound,
            "auth/wrong-password" => Self::WrongPassword,
            "auth/email-already-in-use" => Self::EmailAlreadyInUse,
            "auth/weak-password" => Self::WeakPassword,
            other => Self::Other(other.to_string()),
        }
    }

    /// Human-readable message shown to the user.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Invalid email address.",
            Self::UserNotFound => "No user found with this email.",
            Self::WrongPassword => "Incorrect password.",
            Self::EmailAlreadyInUse => "Email already in use.",
            Self::WeakPassword => "Password should be at least 6 characters.",
            Self::Other(_) => "Authentication failed.",
        }
    }
}

/// The authenticated user the tracker acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Stable user identifier; keys the user's document in the store.
    pub user_id: String,
    /// Email address, possibly empty.
    pub email: String,
}

impl UserSession {
    /// Create a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure(InvalidEmail)` if `email` is non-empty and malformed.
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        if !email.is_empty() && !is_plausible_email(&email) {
            return Err(Error::AuthFailure(AuthFailureReason::InvalidEmail));
        }
        Ok(Self {
            user_id: user_id.into(),
            email,
        })
    }

    /// Build the session for the user named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure(InvalidEmail)` if the configured email is malformed.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.user.id.clone(), config.user.email.clone())
    }

    /// Label used in export file names: the email, or the user id when unset.
    #[must_use]
    pub fn export_label(&self) -> &str {
        if self.email.is_empty() {
            &self.user_id
        } else {
            &self.email
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}
