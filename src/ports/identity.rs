//! Identity session port: the signed-in user and account operations.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Boxed future type alias used by [`IdentitySession`] account operations.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuthError>> + Send + 'a>>;

/// Callback invoked with the new identity (or `None`) on sign-in/sign-out.
pub type IdentityListener = Box<dyn Fn(Option<Identity>) + Send + Sync>;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id; tasks are owned by this value.
    pub uid: String,
    /// Sign-in email, if any.
    pub email: Option<String>,
    /// Profile display name.
    pub display_name: Option<String>,
    /// Whether the email address has been verified.
    pub email_verified: bool,
}

impl Identity {
    /// An identity with only a uid.
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into(), email: None, display_name: None, email_verified: false }
    }
}

/// Handle for a registered identity listener. Dropping it unregisters.
pub struct IdentitySubscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl IdentitySubscription {
    /// Wraps the closure that unregisters the listener.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Unregisters the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for IdentitySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySubscription").field("active", &self.cancel.is_some()).finish()
    }
}

/// Supplies the current identity and performs account operations.
///
/// Listeners are called after the session's own state has changed and with
/// no internal lock held, so a listener may call back into the session.
pub trait IdentitySession: Send + Sync {
    /// The signed-in user, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// Registers a listener for identity changes.
    fn on_change(&self, listener: IdentityListener) -> IdentitySubscription;

    /// Creates an account, sets its display name, sends a verification
    /// email and signs in.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be created.
    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        display_name: &'a str,
    ) -> AuthFuture<'a, Identity>;

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected.
    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> AuthFuture<'a, Identity>;

    /// Signs out the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails.
    fn sign_out(&self) -> AuthFuture<'_, ()>;

    /// Changes the signed-in user's display name.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] without a user.
    fn update_display_name<'a>(&'a self, display_name: &'a str) -> AuthFuture<'a, Identity>;

    /// Re-authenticates with `current` and then sets `new` as the password.
    ///
    /// # Errors
    ///
    /// Returns an error if re-authentication fails or the new password is
    /// rejected.
    fn update_password<'a>(&'a self, current: &'a str, new: &'a str) -> AuthFuture<'a, ()>;

    /// Sends a verification email to the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] without a user.
    fn send_verification_email(&self) -> AuthFuture<'_, ()>;
}
