//! Clinician accounts built on the credential hasher.
//!
//! - [`Clinician`] - A stored clinician account
//! - [`ClinicianStore`] - Storage port, with [`MemoryClinicianStore`] and
//!   [`JsonFileStore`] implementations
//! - [`Authenticator`] - Enrollment, login, password change and demo seeding

mod authenticator;
mod clinician;
mod store;

pub use authenticator::{
    Authenticator, DEMO_EMAIL, DEMO_FITZPATRICK, DEMO_LICENSE, DEMO_NAME, DEMO_PASSWORD,
};
pub use clinician::{Clinician, FitzpatrickType, NewClinician};
pub use store::{ClinicianStore, DEFAULT_STORE_FILE, JsonFileStore, MemoryClinicianStore, STORE_ENV};
