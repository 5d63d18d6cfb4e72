//! PBKDF2-HMAC-SHA256 credential hashing.
//!
//! [`CredentialHasher`] turns a plaintext password into a [`CredentialRecord`]
//! and later checks candidate passwords against a stored record without ever
//! reconstructing the plaintext.
//!
//! Plaintexts are taken as `&[char]` rather than `&str` so callers can keep
//! them in a buffer they wipe after use. Internally the characters are
//! transcoded to UTF-8 in a zeroize-on-drop buffer.
//!
//! Both [`CredentialHasher::derive`] and [`CredentialHasher::verify`] are
//! deliberately slow. Run them off any latency-sensitive thread.
//!
//! ## Examples
//!
//! ```rust
//! use credential_hash::{CredentialHasher, HasherParams};
//!
//! // Low iteration count keeps the doctest fast; production uses the default.
//! let hasher = CredentialHasher::new(HasherParams::new(1_000, 256).unwrap());
//! let password: Vec<char> = "Secure@123".chars().collect();
//!
//! let record = hasher.derive(&password).unwrap().to_string();
//! assert!(hasher.verify(Some(&record), &password));
//!
//! let wrong: Vec<char> = "Secure@124".chars().collect();
//! assert!(!hasher.verify(Some(&record), &wrong));
//! assert!(!hasher.verify(None, &password));
//! ```

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CredentialError, Result};
use crate::record::{CredentialRecord, KEY_LEN, SALT_LEN};

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Derived key length in bits. Stored records are always 256-bit.
pub const DEFAULT_KEY_LENGTH_BITS: u32 = 256;

/// Environment variable overriding the iteration count.
pub const ITERATIONS_ENV: &str = "CREDENTIAL_HASH_ITERATIONS";

/// Tunable cost parameters.
///
/// The iteration count is not stored in the record, so the same parameters
/// must be used to verify a record as were used to derive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherParams {
    iterations: u32,
    key_length_bits: u32,
}

impl HasherParams {
    /// Creates parameters after checking they are supported.
    ///
    /// ## Errors
    ///
    /// Returns `CredentialError::InvalidParams` if `iterations` is zero or
    /// `key_length_bits` is anything other than 256.
    pub fn new(iterations: u32, key_length_bits: u32) -> Result<Self> {
        if iterations == 0 {
            return Err(CredentialError::InvalidParams(
                "iteration count must be positive".into(),
            ));
        }
        if key_length_bits as usize != KEY_LEN * 8 {
            return Err(CredentialError::InvalidParams(format!(
                "key length must be {} bits, got {key_length_bits}",
                KEY_LEN * 8
            )));
        }
        Ok(Self {
            iterations,
            key_length_bits,
        })
    }

    /// Default parameters, with the iteration count taken from
    /// `CREDENTIAL_HASH_ITERATIONS` when it holds a positive integer.
    pub fn from_env() -> Self {
        match std::env::var(ITERATIONS_ENV) {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => Self {
                    iterations: n,
                    ..Self::default()
                },
                _ => {
                    warn!(
                        value = %raw,
                        "ignoring invalid {ITERATIONS_ENV}; using {DEFAULT_ITERATIONS}"
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn key_length_bits(&self) -> u32 {
        self.key_length_bits
    }
}

impl Default for HasherParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            key_length_bits: DEFAULT_KEY_LENGTH_BITS,
        }
    }
}

/// Derives and verifies salted password hashes.
///
/// Holds no mutable state; share it freely across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHasher {
    params: HasherParams,
}

impl CredentialHasher {
    pub fn new(params: HasherParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> HasherParams {
        self.params
    }

    /// Derives a new record with a fresh random salt.
    ///
    /// Two calls with the same plaintext return different records.
    ///
    /// ## Errors
    ///
    /// Returns `CredentialError::RandomSource` if the OS random source fails.
    pub fn derive(&self, plaintext: &[char]) -> Result<CredentialRecord> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| CredentialError::RandomSource(e.to_string()))?;

        debug!(
            iterations = self.params.iterations,
            "deriving credential record"
        );
        Ok(self.derive_with_salt(plaintext, salt))
    }

    /// Checks `candidate` against a stored record string.
    ///
    /// Returns `false` for an absent record and for any malformed one, so a
    /// corrupt record is indistinguishable from a wrong password. Those paths
    /// still run one decoy derivation, so every `false` costs the same.
    pub fn verify(&self, stored: Option<&str>, candidate: &[char]) -> bool {
        let Some(stored) = stored else {
            debug!("no stored credential record");
            self.decoy(candidate);
            return false;
        };

        let record = match stored.parse::<CredentialRecord>() {
            Ok(record) => record,
            Err(e) => {
                warn!(reason = %e, "stored credential record is malformed");
                self.decoy(candidate);
                return false;
            }
        };

        let fresh = self.derive_with_salt(candidate, *record.salt());
        constant_time_eq(fresh.derived_key(), record.derived_key())
    }

    /// Derives against a fixed salt and discards the result.
    pub(crate) fn decoy(&self, candidate: &[char]) {
        debug!("running decoy derivation");
        std::hint::black_box(self.derive_with_salt(candidate, [0u8; SALT_LEN]));
    }

    pub(crate) fn derive_with_salt(
        &self,
        plaintext: &[char],
        salt: [u8; SALT_LEN],
    ) -> CredentialRecord {
        let secret = utf8_bytes(plaintext);
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(&secret, &salt, self.params.iterations, &mut key[..]);
        CredentialRecord::new(salt, *key)
    }
}

/// Byte equality whose running time does not depend on where the inputs
/// differ. Inputs of different length compare unequal immediately.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    std::hint::black_box(diff) == 0
}

fn utf8_bytes(chars: &[char]) -> Zeroizing<Vec<u8>> {
    // Exact capacity: the buffer must never reallocate.
    let capacity: usize = chars.iter().map(|c| c.len_utf8()).sum();
    let mut bytes = Zeroizing::new(Vec::with_capacity(capacity));
    let mut scratch = [0u8; 4];
    for c in chars {
        bytes.extend_from_slice(c.encode_utf8(&mut scratch).as_bytes());
    }
    scratch.zeroize();
    bytes
}

/// Hashes a password with default parameters.
///
/// ## Errors
///
/// Returns `CredentialError::RandomSource` if no salt could be generated.
pub fn hash_password(plaintext: &[char]) -> Result<String> {
    CredentialHasher::default()
        .derive(plaintext)
        .map(|record| record.to_string())
}

/// Verifies a password against a stored record with default parameters.
pub fn verify_password(stored: Option<&str>, candidate: &[char]) -> bool {
    CredentialHasher::default().verify(stored, candidate)
}
