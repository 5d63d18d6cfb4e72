//! Error types for credential hashing and clinician accounts.

use thiserror::Error;

/// Errors raised while deriving credential records.
///
/// Verification never produces one of these: a malformed stored record is
/// reported as a non-match instead.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The operating system's secure random source could not produce a salt.
    ///
    /// This is an environment failure and is not worth retrying.
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),

    /// Hasher parameters outside the supported range.
    #[error("invalid hasher parameters: {0}")]
    InvalidParams(String),
}

/// Errors that can occur when managing clinician accounts.
#[cfg(feature = "accounts")]
#[derive(Debug, Error)]
pub enum AccountError {
    /// Failed to derive a credential record.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Failed to read or write the clinician store.
    #[error("clinician store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored clinician line could not be (de)serialized.
    #[error("malformed clinician entry: {0}")]
    Serde(#[from] serde_json::Error),

    /// Failed to acquire a file lock on the clinician store.
    #[error("failed to acquire store lock")]
    Lock,

    /// No clinician with the given email exists.
    #[error("no clinician registered for {0}")]
    NotFound(String),

    /// A clinician with the given email already exists.
    #[error("a clinician is already registered for {0}")]
    AlreadyExists(String),

    /// The stored credential changed between reading and writing it.
    #[error("credentials for {0} changed concurrently; retry")]
    Conflict(String),

    /// Unknown email, missing hash, or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The email does not have the `local@domain` shape.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The password fails the strength policy.
    #[error(
        "password must be at least 8 characters and contain upper-case, lower-case, digit and special characters"
    )]
    WeakPassword,

    /// Fitzpatrick phototypes run from 1 to 6.
    #[error("invalid Fitzpatrick skin type {0}; expected 1-6")]
    InvalidFitzpatrick(u8),
}

/// Convenience Result type for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;
