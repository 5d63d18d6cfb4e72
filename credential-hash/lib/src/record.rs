//! The persisted salt + derived-key pair and its string format.
//!
//! A record serializes as `base64(salt):base64(derived_key)`. Both segments
//! are written with the URL-safe alphabet, padded and without line wrapping.
//! Parsing also accepts the standard alphabet so that records written by
//! older clients keep verifying.
//!
//! ## Examples
//!
//! ```rust
//! use credential_hash::CredentialRecord;
//!
//! let record = CredentialRecord::new([7u8; 16], [9u8; 32]);
//! let stored = record.to_string();
//! assert_eq!(stored.matches(':').count(), 1);
//!
//! let parsed: CredentialRecord = stored.parse().unwrap();
//! assert_eq!(parsed.salt(), &[7u8; 16]);
//! ```

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Separator between the encoded salt and the encoded key.
pub const SEPARATOR: char = ':';

/// Reasons a stored record string could not be parsed.
///
/// These never reach callers of `verify`, which treats every one of them as
/// a non-match. They exist for logging and for direct parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordFormatError {
    /// The string did not split into exactly two parts.
    #[error("expected 2 ':'-separated parts, found {0}")]
    PartCount(usize),

    /// One of the two parts was empty.
    #[error("empty {0} segment")]
    EmptySegment(&'static str),

    /// A segment was not valid base64.
    #[error("{0} segment is not valid base64")]
    Encoding(&'static str),

    /// A segment decoded to the wrong number of bytes.
    #[error("{segment} segment decoded to {actual} bytes, expected {expected}")]
    Length {
        segment: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// A salted password hash, as persisted in the clinician table.
///
/// Records are immutable. Changing a password produces a new record which
/// replaces the old one wholesale.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CredentialRecord {
    salt: [u8; SALT_LEN],
    derived_key: [u8; KEY_LEN],
}

impl CredentialRecord {
    /// Builds a record from raw salt and key bytes.
    pub fn new(salt: [u8; SALT_LEN], derived_key: [u8; KEY_LEN]) -> Self {
        Self { salt, derived_key }
    }

    /// The random salt.
    #[must_use]
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// The PBKDF2 output.
    #[must_use]
    pub fn derived_key(&self) -> &[u8; KEY_LEN] {
        &self.derived_key
    }
}

impl fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}",
            URL_SAFE.encode(self.salt),
            URL_SAFE.encode(self.derived_key)
        )
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("salt_len", &self.salt.len())
            .field("derived_key_len", &self.derived_key.len())
            .finish()
    }
}

impl FromStr for CredentialRecord {
    type Err = RecordFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [salt_b64, key_b64] = parts.as_slice() else {
            return Err(RecordFormatError::PartCount(parts.len()));
        };

        let salt = decode_segment::<SALT_LEN>(salt_b64, "salt")?;
        let derived_key = decode_segment::<KEY_LEN>(key_b64, "key")?;
        Ok(Self { salt, derived_key })
    }
}

fn decode_segment<const N: usize>(
    segment: &str,
    name: &'static str,
) -> Result<[u8; N], RecordFormatError> {
    if segment.is_empty() {
        return Err(RecordFormatError::EmptySegment(name));
    }

    let mut bytes = URL_SAFE
        .decode(segment)
        .or_else(|_| STANDARD.decode(segment))
        .map_err(|_| RecordFormatError::Encoding(name))?;

    let result = <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| RecordFormatError::Length {
        segment: name,
        expected: N,
        actual: bytes.len(),
    });
    bytes.zeroize();
    result
}
