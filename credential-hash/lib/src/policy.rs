//! Password strength and email shape checks.
//!
//! Both are pure predicates. A `false` result is an ordinary answer for the
//! caller to branch on before deriving a record, not an error.

use std::sync::OnceLock;

use regex::Regex;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

static IDENTIFIER_PATTERN: OnceLock<Regex> = OnceLock::new();
static DECIMAL_DIGIT: OnceLock<Regex> = OnceLock::new();

fn identifier_pattern() -> &'static Regex {
    IDENTIFIER_PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").expect("identifier pattern is valid")
    })
}

/// Unicode decimal digits (general category `Nd`). Superscripts, fractions
/// and other numerals are not digits.
fn is_decimal_digit(c: char) -> bool {
    let pattern =
        DECIMAL_DIGIT.get_or_init(|| Regex::new(r"^\p{Nd}$").expect("digit pattern is valid"));
    let mut buf = [0u8; 4];
    pattern.is_match(c.encode_utf8(&mut buf))
}

/// Returns `true` when `plaintext` is at least eight characters long and
/// contains an upper-case letter, a lower-case letter, a decimal digit and
/// a character that is neither letter nor decimal digit.
///
/// Each character counts toward the first class it matches, checked in that
/// order. A numeral that is not a decimal digit, such as `²`, is special.
///
/// ## Examples
///
/// ```rust
/// use credential_hash::check_strength;
///
/// let strong: Vec<char> = "Secure@123".chars().collect();
/// let weak: Vec<char> = "alllowercase1".chars().collect();
/// assert!(check_strength(&strong));
/// assert!(!check_strength(&weak));
/// ```
#[must_use]
pub fn check_strength(plaintext: &[char]) -> bool {
    if plaintext.len() < MIN_PASSWORD_LEN {
        return false;
    }

    let (mut upper, mut lower, mut digit, mut special) = (false, false, false, false);
    for &c in plaintext {
        if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if is_decimal_digit(c) {
            digit = true;
        } else if !c.is_alphabetic() {
            special = true;
        }
    }
    upper && lower && digit && special
}

/// Returns `true` when `identifier` looks like `local@domain`.
///
/// The local part may use ASCII letters, digits and `+ _ . -`; the domain
/// ASCII letters, digits, `.` and `-`. Nothing else about the domain is
/// checked.
///
/// ## Examples
///
/// ```rust
/// use credential_hash::validate_identifier;
///
/// assert!(validate_identifier("doctor@sagalyze.ai"));
/// assert!(!validate_identifier("@missing-local.com"));
/// ```
#[must_use]
pub fn validate_identifier(identifier: &str) -> bool {
    identifier_pattern().is_match(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong(s: &str) -> bool {
        check_strength(&s.chars().collect::<Vec<_>>())
    }

    #[test]
    fn strength_literal_cases() {
        assert!(!strong("abc"));
        assert!(strong("Secure@123"));
        assert!(!strong("alllowercase1"));
    }

    #[test]
    fn strength_requires_each_class() {
        assert!(!strong("secure@123"), "no upper-case");
        assert!(!strong("SECURE@123"), "no lower-case");
        assert!(!strong("Secure@abc"), "no digit");
        assert!(!strong("Secure1234"), "no special");
    }

    #[test]
    fn non_decimal_numerals_are_not_digits() {
        assert!(!strong("Secure@²x"));
        assert!(!strong("Secure@½x"));
        // They count as special instead.
        assert!(strong("Secure²1x"));
    }

    #[test]
    fn non_ascii_decimal_digits_count() {
        assert!(strong("Secure@٣x"));
    }

    #[test]
    fn strength_length_boundary() {
        assert!(!strong("Sec@123"));
        assert!(strong("Sec@1234"));
    }

    #[test]
    fn strength_counts_characters_not_bytes() {
        // Seven characters, more than eight UTF-8 bytes.
        assert!(!strong("Éé@1ééé"));
        assert!(strong("Éé@1éééé"));
    }

    #[test]
    fn whitespace_counts_as_special() {
        assert!(strong("Secure 123"));
    }

    #[test]
    fn identifier_literal_cases() {
        assert!(validate_identifier("doctor@sagalyze.ai"));
        assert!(!validate_identifier("not-an-email"));
        assert!(!validate_identifier("@missing-local.com"));
    }

    #[test]
    fn identifier_is_permissive_about_domain() {
        assert!(validate_identifier("a+b_c.d-e@localhost"));
        assert!(validate_identifier("x@-."));
    }

    #[test]
    fn identifier_rejects_empty_domain_and_extra_at() {
        assert!(!validate_identifier("doctor@"));
        assert!(!validate_identifier("doc@tor@sagalyze.ai"));
        assert!(!validate_identifier(""));
        assert!(!validate_identifier("dr meera@sagalyze.ai"));
    }

    #[test]
    fn identifier_is_ascii_only() {
        assert!(!validate_identifier("médecin@sagalyze.ai"));
    }
}
