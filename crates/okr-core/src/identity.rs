//! Identity and session state.
//!
//! Authentication itself belongs to an external provider behind
//! [`IdentityProvider`]. The core only needs the signed-in owner id and the
//! sign-in/sign-out transitions, which [`Session`] derives from the
//! provider's event stream.

use std::env;

use serde::Serialize;
use thiserror::Error;

/// Environment variables checked for the owner id, in priority order.
const OWNER_VARS: &[&str] = &["OKR_OWNER", "OKR_USER"];

/// Shortest password a provider should accept.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Why an authentication request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailInUse,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Incorrect password")]
    WrongPassword,

    /// Shorter than [`MIN_PASSWORD_LEN`].
    #[error("Password should be at least 6 characters")]
    WeakPassword,

    /// Any other provider failure.
    #[error("Authentication failed: {0}")]
    Provider(String),
}

/// A signed-in user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Opaque owner id used to namespace remote data.
    pub owner_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    /// Name to show: display name, else the email's local part, else the owner id.
    #[must_use]
    pub fn display_label(&self) -> &str {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name;
        }
        if let Some(local) = self
            .email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|l| !l.is_empty())
        {
            return local;
        }
        &self.owner_id
    }
}

/// External credential provider.
pub trait IdentityProvider {
    /// Create an account and sign it in.
    fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError>;

    /// Sign in to an existing account.
    fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Sign out the current account.
    fn logout(&self) -> Result<(), AuthError>;
}

/// Provider state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { owner_id: String },
    SignedOut,
}

/// What a session change means for the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    /// A new owner signed in; sync must run once for them.
    SignedIn(String),
    SignedOut,
    /// Repeated event, nothing to do.
    Unchanged,
}

/// Tracks the signed-in owner across provider events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    owner: Option<String>,
}

impl Session {
    #[must_use]
    pub const fn signed_out() -> Self {
        Self { owner: None }
    }

    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.owner.is_some()
    }

    /// Fold one provider event into the session.
    ///
    /// Only a change to a concrete (different) owner yields `SignedIn`, so a
    /// provider that re-emits its current state does not trigger another sync.
    pub fn apply(&mut self, event: &AuthEvent) -> SessionTransition {
        match event {
            AuthEvent::SignedIn { owner_id } if owner_id.trim().is_empty() => {
                SessionTransition::Unchanged
            }
            AuthEvent::SignedIn { owner_id } => {
                if self.owner.as_deref() == Some(owner_id.as_str()) {
                    return SessionTransition::Unchanged;
                }
                self.owner = Some(owner_id.clone());
                SessionTransition::SignedIn(owner_id.clone())
            }
            AuthEvent::SignedOut => {
                if self.owner.take().is_some() {
                    SessionTransition::SignedOut
                } else {
                    SessionTransition::Unchanged
                }
            }
        }
    }
}

/// Resolve the owner id for a shell session.
///
/// Resolution order:
/// 1. Explicit override (`--owner`)
/// 2. `OKR_OWNER` environment variable
/// 3. `OKR_USER` environment variable
///
/// Returns `None` when nothing is set: the session runs signed out and
/// changes stay local.
#[must_use]
pub fn resolve_owner(explicit: Option<&str>) -> Option<String> {
    if let Some(owner) = explicit.map(str::trim).filter(|o| !o.is_empty()) {
        return Some(owner.to_string());
    }

    OWNER_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
