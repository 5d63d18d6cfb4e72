//! The clinician account record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AccountError;

/// Fitzpatrick skin phototype, I (always burns) to VI (never burns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FitzpatrickType(u8);

impl FitzpatrickType {
    /// Lowest phototype.
    pub const MIN: u8 = 1;
    /// Highest phototype.
    pub const MAX: u8 = 6;

    /// The numeric phototype, 1 to 6.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FitzpatrickType {
    type Error = AccountError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AccountError::InvalidFitzpatrick(value))
        }
    }
}

impl From<FitzpatrickType> for u8 {
    fn from(value: FitzpatrickType) -> Self {
        value.0
    }
}

impl fmt::Display for FitzpatrickType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NUMERALS: [&str; 6] = ["I", "II", "III", "IV", "V", "VI"];
        f.write_str(NUMERALS[usize::from(self.0 - 1)])
    }
}

/// Profile fields supplied when enrolling a clinician.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewClinician {
    pub email: String,
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub fitzpatrick_type: Option<FitzpatrickType>,
}

impl NewClinician {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_license_number(mut self, license_number: impl Into<String>) -> Self {
        self.license_number = Some(license_number.into());
        self
    }

    pub fn with_fitzpatrick_type(mut self, fitzpatrick_type: FitzpatrickType) -> Self {
        self.fitzpatrick_type = Some(fitzpatrick_type);
        self
    }
}

/// A stored clinician account.
///
/// `email` is unique across a store. `password_hash` holds a serialized
/// [`CredentialRecord`](crate::CredentialRecord) and is treated as an opaque
/// string; it is `None` for accounts authenticated by another provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinician {
    /// Store-assigned identifier; 0 until inserted.
    pub id: u64,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub fitzpatrick_type: Option<FitzpatrickType>,
    pub created_at: DateTime<Utc>,
}

impl Clinician {
    /// Builds an un-inserted clinician from profile fields and an optional
    /// serialized credential record.
    pub fn new(profile: NewClinician, password_hash: Option<String>) -> Self {
        Self {
            id: 0,
            email: profile.email,
            password_hash,
            name: profile.name,
            license_number: profile.license_number,
            fitzpatrick_type: profile.fitzpatrick_type,
            created_at: Utc::now(),
        }
    }

    /// The part of the email after `@`, if the email has exactly one `@`.
    pub fn email_domain(&self) -> Option<&str> {
        email_domain(&self.email)
    }
}

impl fmt::Debug for Clinician {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clinician")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("has_password", &self.password_hash.is_some())
            .field("name", &self.name)
            .field("license_number", &self.license_number)
            .field("fitzpatrick_type", &self.fitzpatrick_type)
            .field("created_at", &self.created_at)
            .finish()
    }
}

pub(crate) fn email_domain(email: &str) -> Option<&str> {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) => Some(domain),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitzpatrick_accepts_one_through_six() {
        for n in 1..=6 {
            assert_eq!(FitzpatrickType::try_from(n).unwrap().value(), n);
        }
    }

    #[test]
    fn fitzpatrick_rejects_out_of_range() {
        assert!(matches!(
            FitzpatrickType::try_from(0),
            Err(AccountError::InvalidFitzpatrick(0))
        ));
        assert!(matches!(
            FitzpatrickType::try_from(7),
            Err(AccountError::InvalidFitzpatrick(7))
        ));
    }

    #[test]
    fn fitzpatrick_displays_roman_numeral() {
        assert_eq!(FitzpatrickType::try_from(3).unwrap().to_string(), "III");
        assert_eq!(FitzpatrickType::try_from(6).unwrap().to_string(), "VI");
    }

    #[test]
    fn email_domain_requires_single_at() {
        assert_eq!(email_domain("doctor@sagalyze.ai"), Some("sagalyze.ai"));
        assert_eq!(email_domain("doctor"), None);
        assert_eq!(email_domain("a@b@c"), None);
        assert_eq!(email_domain("doctor@"), Some(""));
    }

    #[test]
    fn serializes_fitzpatrick_as_integer() {
        let profile = NewClinician::new("doctor@sagalyze.ai")
            .with_name("Dr. Meera")
            .with_fitzpatrick_type(FitzpatrickType::try_from(3).unwrap());
        let clinician = Clinician::new(profile, Some("salt:key".into()));

        let json = serde_json::to_value(&clinician).unwrap();
        assert_eq!(json["fitzpatrick_type"], 3);
        assert_eq!(json["password_hash"], "salt:key");
        assert_eq!(json["license_number"], serde_json::Value::Null);

        let back: Clinician = serde_json::from_value(json).unwrap();
        assert_eq!(back, clinician);
    }

    #[test]
    fn deserialization_rejects_bad_fitzpatrick() {
        let json = r#"{"id":1,"email":"a@b","password_hash":null,"name":null,
            "license_number":null,"fitzpatrick_type":9,"created_at":"2025-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Clinician>(json).is_err());
    }

    #[test]
    fn debug_hides_password_hash() {
        let clinician = Clinician::new(NewClinician::new("a@b.c"), Some("SECRETSALT:KEY".into()));
        let debug = format!("{clinician:?}");
        assert!(debug.contains("has_password: true"));
        assert!(!debug.contains("SECRETSALT"));
    }
}
