//! Salted password hashing for SAGAlyze clinician accounts.
//!
//! This crate turns clinician passwords into verifiable, non-reversible
//! credential records and checks candidate passwords against them:
//!
//! - **Hashing**: PBKDF2-HMAC-SHA256, 100 000 iterations, 16-byte random
//!   salt, 256-bit key
//! - **Record format**: `base64(salt):base64(key)`
//! - **Policy**: password strength and email shape predicates
//! - **Accounts** (feature `accounts`, default): clinician records, storage
//!   and an authenticator
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `accounts` | Yes | Clinician records, stores and [`accounts::Authenticator`] |
//!
//! ## Examples
//!
//! ```rust
//! use credential_hash::{check_strength, hash_password, validate_identifier, verify_password};
//!
//! let password: Vec<char> = "Secure@123".chars().collect();
//! assert!(check_strength(&password));
//! assert!(validate_identifier("doctor@sagalyze.ai"));
//!
//! let stored = hash_password(&password).unwrap();
//! assert!(verify_password(Some(&stored), &password));
//! assert!(!verify_password(Some("onlyonepart"), &password));
//! ```

mod error;
mod hasher;
mod policy;
mod record;

#[cfg(feature = "accounts")]
pub mod accounts;

#[cfg(feature = "accounts")]
pub use error::AccountError;
pub use error::{CredentialError, Result};
pub use hasher::{
    CredentialHasher, DEFAULT_ITERATIONS, DEFAULT_KEY_LENGTH_BITS, HasherParams, ITERATIONS_ENV,
    constant_time_eq, hash_password, verify_password,
};
pub use policy::{MIN_PASSWORD_LEN, check_strength, validate_identifier};
pub use record::{CredentialRecord, KEY_LEN, RecordFormatError, SALT_LEN, SEPARATOR};
