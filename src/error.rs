//! Error taxonomy for the task store and its ports.

use thiserror::Error;

/// Input rejected before it is submitted to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The title is empty or whitespace only.
    #[error("Title is required")]
    EmptyTitle,
    /// The due date could not be parsed as `YYYY-MM-DD`.
    #[error("invalid due date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    /// The due time could not be parsed as `HH:MM`.
    #[error("invalid due time {0:?}, expected HH:MM")]
    InvalidTime(String),
    /// The quadrant is not one of `1`..`4`.
    #[error("unknown quadrant {0:?}, expected 1, 2, 3 or 4")]
    UnknownQuadrant(String),
}

/// Failure reported by a remote task feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The feed refused access for the current identity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Any network or service failure that is not a permission problem.
    #[error("feed unavailable: {0}")]
    Transient(String),
    /// The addressed record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// The feed returned data that could not be decoded.
    #[error("malformed feed data: {0}")]
    Decode(String),
}

impl FeedError {
    /// Error code used for permission denials on the wire.
    pub const PERMISSION_DENIED: &'static str = "permission-denied";

    /// Maps a wire error code to a feed error.
    #[must_use]
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Self::PERMISSION_DENIED | "unauthenticated" => Self::PermissionDenied(message),
            "not-found" => Self::NotFound(message),
            "invalid-argument" | "data-loss" => Self::Decode(message),
            _ => Self::Transient(message),
        }
    }

    /// Wire error code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => Self::PERMISSION_DENIED,
            Self::Transient(_) => "unavailable",
            Self::NotFound(_) => "not-found",
            Self::Decode(_) => "data-loss",
        }
    }

    /// The message carried by this error, without its kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::PermissionDenied(m) | Self::Transient(m) | Self::NotFound(m) | Self::Decode(m) => m,
        }
    }

    /// Returns `true` for permission denials.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Failure of an identity (account) operation. Surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The operation needs a signed-in user.
    #[error("No user logged in")]
    NotSignedIn,
    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// An account with this email already exists.
    #[error("email already in use: {0}")]
    EmailInUse(String),
    /// The password does not meet the minimum length.
    #[error("password should be at least {0} characters")]
    WeakPassword(usize),
    /// The email address is malformed.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// The identity provider failed for another reason.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Invalid or missing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be parsed.
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
    /// A variable required by the selected mode is missing.
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_code_maps_to_permission_denied() {
        let err = FeedError::from_code("permission-denied", "no access");
        assert!(err.is_permission_denied());
        assert_eq!(err.code(), "permission-denied");
    }

    #[test]
    fn unknown_codes_are_transient() {
        let err = FeedError::from_code("deadline-exceeded", "slow");
        assert_eq!(err, FeedError::Transient("slow".into()));
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn code_and_message_rebuild_the_error() {
        for err in [
            FeedError::PermissionDenied("a".into()),
            FeedError::Transient("b".into()),
            FeedError::NotFound("c".into()),
            FeedError::Decode("d".into()),
        ] {
            assert_eq!(FeedError::from_code(err.code(), err.message()), err);
        }
    }

    #[test]
    fn validation_message_matches_form_copy() {
        assert_eq!(ValidationError::EmptyTitle.to_string(), "Title is required");
    }
}
