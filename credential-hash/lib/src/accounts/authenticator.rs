//! Enrollment and login for clinician accounts.

use tracing::{info, warn};

use super::clinician::{Clinician, FitzpatrickType, NewClinician, email_domain};
use super::store::ClinicianStore;
use crate::error::AccountError;
use crate::hasher::CredentialHasher;
use crate::policy::{check_strength, validate_identifier};

/// Email of the demo clinician inserted by [`Authenticator::seed_demo`].
pub const DEMO_EMAIL: &str = "doctor@sagalyze.ai";
/// Password of the demo clinician.
pub const DEMO_PASSWORD: &str = "Secure@123";
pub const DEMO_NAME: &str = "Dr. Meera";
pub const DEMO_LICENSE: &str = "NITR-DR001";
pub const DEMO_FITZPATRICK: u8 = 3;

/// Couples a [`ClinicianStore`] with a [`CredentialHasher`].
///
/// Enrollment and password changes enforce the email and strength policies;
/// the hasher itself stays policy-free.
///
/// ## Examples
///
/// ```rust
/// use credential_hash::accounts::{Authenticator, MemoryClinicianStore, NewClinician};
/// use credential_hash::{CredentialHasher, HasherParams};
///
/// let hasher = CredentialHasher::new(HasherParams::new(1_000, 256).unwrap());
/// let auth = Authenticator::new(MemoryClinicianStore::new(), hasher);
///
/// let password: Vec<char> = "Derm@tology1".chars().collect();
/// auth.enroll(NewClinician::new("a@clinic.org"), &password).unwrap();
///
/// let clinician = auth.authenticate("a@clinic.org", &password).unwrap();
/// assert_eq!(clinician.email, "a@clinic.org");
/// ```
#[derive(Debug)]
pub struct Authenticator<S> {
    store: S,
    hasher: CredentialHasher,
}

impl<S: ClinicianStore> Authenticator<S> {
    pub fn new(store: S, hasher: CredentialHasher) -> Self {
        Self { store, hasher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Registers a new clinician with a freshly derived credential record.
    ///
    /// The duplicate check and the insert are one store operation, so two
    /// concurrent enrollments for the same email cannot both succeed.
    ///
    /// ## Errors
    ///
    /// - `AccountError::InvalidEmail` if the email is malformed
    /// - `AccountError::WeakPassword` if the password fails the policy
    /// - `AccountError::AlreadyExists` if the email is taken
    /// - store and random-source failures
    pub fn enroll(
        &self,
        profile: NewClinician,
        password: &[char],
    ) -> Result<Clinician, AccountError> {
        if !validate_identifier(&profile.email) {
            return Err(AccountError::InvalidEmail(profile.email));
        }
        if !check_strength(password) {
            return Err(AccountError::WeakPassword);
        }

        let record = self.hasher.derive(password)?;
        let stored = self
            .store
            .insert_new(Clinician::new(profile, Some(record.to_string())))?;

        info!(
            id = stored.id,
            domain = stored.email_domain().unwrap_or_default(),
            "clinician enrolled"
        );
        Ok(stored)
    }

    /// Checks an email/password pair and returns the matching clinician.
    ///
    /// ## Errors
    ///
    /// Returns `AccountError::InvalidCredentials` for an unknown email, an
    /// account without a password hash, or a wrong password alike.
    pub fn authenticate(&self, email: &str, password: &[char]) -> Result<Clinician, AccountError> {
        let Some(clinician) = self.store.find_by_email(email)? else {
            // Unknown emails cost one derivation, same as a real check.
            self.hasher.decoy(password);
            warn!(
                domain = email_domain(email).unwrap_or_default(),
                "authentication failed"
            );
            return Err(AccountError::InvalidCredentials);
        };

        if self
            .hasher
            .verify(clinician.password_hash.as_deref(), password)
        {
            info!(id = clinician.id, "clinician authenticated");
            Ok(clinician)
        } else {
            warn!(
                domain = clinician.email_domain().unwrap_or_default(),
                "authentication failed"
            );
            Err(AccountError::InvalidCredentials)
        }
    }

    /// Replaces the clinician's credential record after checking the current
    /// password.
    ///
    /// The write only lands if the stored record is still the one `current`
    /// was checked against.
    ///
    /// ## Errors
    ///
    /// - `AccountError::InvalidCredentials` if `current` does not match
    /// - `AccountError::WeakPassword` if `new` fails the policy
    /// - `AccountError::Conflict` if the record changed in the meantime
    pub fn change_password(
        &self,
        email: &str,
        current: &[char],
        new: &[char],
    ) -> Result<Clinician, AccountError> {
        let clinician = self.authenticate(email, current)?;
        if !check_strength(new) {
            return Err(AccountError::WeakPassword);
        }

        let record = self.hasher.derive(new)?;
        let clinician = self.store.replace_password(
            &clinician.email,
            clinician.password_hash.as_deref(),
            record.to_string(),
        )?;
        info!(id = clinician.id, "clinician password changed");
        Ok(clinician)
    }

    /// Inserts the demo clinician unless it already exists.
    ///
    /// Returns `true` when a row was inserted.
    ///
    /// ## Errors
    ///
    /// Returns store and random-source failures.
    pub fn seed_demo(&self) -> Result<bool, AccountError> {
        if self.store.find_by_email(DEMO_EMAIL)?.is_some() {
            info!("demo clinician already exists");
            return Ok(false);
        }

        let profile = NewClinician::new(DEMO_EMAIL)
            .with_name(DEMO_NAME)
            .with_license_number(DEMO_LICENSE)
            .with_fitzpatrick_type(FitzpatrickType::try_from(DEMO_FITZPATRICK)?);
        let password: Vec<char> = DEMO_PASSWORD.chars().collect();
        match self.enroll(profile, &password) {
            Ok(_) => {
                info!("demo clinician inserted");
                Ok(true)
            }
            Err(AccountError::AlreadyExists(_)) => {
                info!("demo clinician already exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::MemoryClinicianStore;
    use crate::hasher::HasherParams;
    use tracing_test::traced_test;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn authenticator() -> Authenticator<MemoryClinicianStore> {
        let hasher = CredentialHasher::new(HasherParams::new(1_000, 256).unwrap());
        Authenticator::new(MemoryClinicianStore::new(), hasher)
    }

    #[test]
    fn enroll_then_authenticate() {
        let auth = authenticator();
        let enrolled = auth
            .enroll(
                NewClinician::new("skin@clinic.org").with_name("Dr. Rao"),
                &chars("Derm@tology1"),
            )
            .unwrap();
        assert_eq!(enrolled.id, 1);
        assert!(enrolled.password_hash.is_some());

        let found = auth
            .authenticate("skin@clinic.org", &chars("Derm@tology1"))
            .unwrap();
        assert_eq!(found.name.as_deref(), Some("Dr. Rao"));
    }

    #[test]
    fn enroll_rejects_invalid_email() {
        let auth = authenticator();
        let err = auth
            .enroll(NewClinician::new("not-an-email"), &chars("Derm@tology1"))
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidEmail(_)));
        assert!(auth.store().all().unwrap().is_empty());
    }

    #[test]
    fn enroll_rejects_weak_password() {
        let auth = authenticator();
        let err = auth
            .enroll(NewClinician::new("a@clinic.org"), &chars("alllowercase1"))
            .unwrap_err();
        assert!(matches!(err, AccountError::WeakPassword));
        assert!(auth.store().all().unwrap().is_empty());
    }

    #[test]
    fn enroll_rejects_duplicate_email() {
        let auth = authenticator();
        auth.enroll(NewClinician::new("a@clinic.org"), &chars("Derm@tology1"))
            .unwrap();
        let err = auth
            .enroll(NewClinician::new("a@clinic.org"), &chars("Other#Pass2"))
            .unwrap_err();
        assert!(matches!(err, AccountError::AlreadyExists(_)));

        // The original credential still works.
        assert!(auth.authenticate("a@clinic.org", &chars("Derm@tology1")).is_ok());
    }

    #[test]
    fn unknown_email_and_wrong_password_look_the_same() {
        let auth = authenticator();
        auth.enroll(NewClinician::new("a@clinic.org"), &chars("Derm@tology1"))
            .unwrap();

        let unknown = auth
            .authenticate("b@clinic.org", &chars("Derm@tology1"))
            .unwrap_err();
        let wrong = auth
            .authenticate("a@clinic.org", &chars("Derm@tology2"))
            .unwrap_err();
        assert!(matches!(unknown, AccountError::InvalidCredentials));
        assert!(matches!(wrong, AccountError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn account_without_hash_never_authenticates() {
        let auth = authenticator();
        auth.store()
            .insert(Clinician::new(NewClinician::new("sso@clinic.org"), None))
            .unwrap();
        assert!(matches!(
            auth.authenticate("sso@clinic.org", &chars("")),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn corrupt_hash_is_invalid_credentials() {
        let auth = authenticator();
        auth.store()
            .insert(Clinician::new(
                NewClinician::new("a@clinic.org"),
                Some("onlyonepart".into()),
            ))
            .unwrap();
        assert!(matches!(
            auth.authenticate("a@clinic.org", &chars("Derm@tology1")),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn change_password_replaces_record() {
        let auth = authenticator();
        let before = auth
            .enroll(NewClinician::new("a@clinic.org"), &chars("Derm@tology1"))
            .unwrap();

        let after = auth
            .change_password("a@clinic.org", &chars("Derm@tology1"), &chars("N3w!Password"))
            .unwrap();
        assert_eq!(after.id, before.id);
        assert_ne!(after.password_hash, before.password_hash);

        assert!(auth.authenticate("a@clinic.org", &chars("Derm@tology1")).is_err());
        assert!(auth.authenticate("a@clinic.org", &chars("N3w!Password")).is_ok());
    }

    #[test]
    fn change_password_requires_current_and_strength() {
        let auth = authenticator();
        auth.enroll(NewClinician::new("a@clinic.org"), &chars("Derm@tology1"))
            .unwrap();

        assert!(matches!(
            auth.change_password("a@clinic.org", &chars("wrong"), &chars("N3w!Password")),
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.change_password("a@clinic.org", &chars("Derm@tology1"), &chars("weak")),
            Err(AccountError::WeakPassword)
        ));
        assert!(auth.authenticate("a@clinic.org", &chars("Derm@tology1")).is_ok());
    }

    #[test]
    fn concurrent_duplicate_enroll_has_one_winner() {
        use std::sync::{Arc, Barrier};

        for round in 0..10 {
            let auth = Arc::new(authenticator());
            let barrier = Arc::new(Barrier::new(2));
            let email = format!("dup{round}@clinic.org");

            let handles: Vec<_> = ["First#Pass1", "Second#Pass2"]
                .into_iter()
                .map(|password| {
                    let (auth, barrier, email) = (auth.clone(), barrier.clone(), email.clone());
                    std::thread::spawn(move || {
                        barrier.wait();
                        auth.enroll(NewClinician::new(email), &chars(password))
                            .map(|_| password)
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let winners: Vec<&str> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
            assert_eq!(winners.len(), 1, "round {round}");
            assert!(results
                .iter()
                .any(|r| matches!(r, Err(AccountError::AlreadyExists(_)))));

            // The winner's credential is the one stored.
            assert!(auth.authenticate(&email, &chars(winners[0])).is_ok());
            assert_eq!(auth.store().all().unwrap().len(), 1);
        }
    }

    #[test]
    fn change_password_refuses_stale_record() {
        let auth = authenticator();
        auth.enroll(NewClinician::new("a@clinic.org"), &chars("Derm@tology1"))
            .unwrap();
        let stale = auth.store().find_by_email("a@clinic.org").unwrap().unwrap();

        auth.change_password("a@clinic.org", &chars("Derm@tology1"), &chars("N3w!Password"))
            .unwrap();

        // A writer still holding the old record loses.
        assert!(matches!(
            auth.store().replace_password(
                "a@clinic.org",
                stale.password_hash.as_deref(),
                "other:record".into()
            ),
            Err(AccountError::Conflict(_))
        ));
        assert!(auth.authenticate("a@clinic.org", &chars("N3w!Password")).is_ok());
    }

    #[test]
    #[traced_test]
    fn account_without_hash_costs_a_derivation() {
        let auth = authenticator();
        auth.store()
            .insert(Clinician::new(NewClinician::new("sso@clinic.org"), None))
            .unwrap();
        let _ = auth.authenticate("sso@clinic.org", &chars("Derm@tology1"));
        assert!(logs_contain("running decoy derivation"));
    }

    #[test]
    fn seed_demo_is_idempotent() {
        let auth = authenticator();
        assert!(auth.seed_demo().unwrap());
        assert!(!auth.seed_demo().unwrap());
        assert_eq!(auth.store().all().unwrap().len(), 1);

        let demo = auth
            .authenticate(DEMO_EMAIL, &chars(DEMO_PASSWORD))
            .unwrap();
        assert_eq!(demo.name.as_deref(), Some(DEMO_NAME));
        assert_eq!(demo.license_number.as_deref(), Some(DEMO_LICENSE));
        assert_eq!(demo.fitzpatrick_type.map(FitzpatrickType::value), Some(3));
    }

    #[test]
    #[traced_test]
    fn failed_login_logs_domain_only() {
        let auth = authenticator();
        let _ = auth.authenticate("mystery.person@clinic.org", &chars("Hunter@22x"));
        assert!(logs_contain("authentication failed"));
        assert!(logs_contain("clinic.org"));
        assert!(!logs_contain("mystery.person"));
        assert!(!logs_contain("Hunter@22x"));
    }
}
