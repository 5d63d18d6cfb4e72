//! Clinician storage.
//!
//! [`ClinicianStore`] is the persistence port the authenticator depends on.
//! Stores are explicit handles owned by the caller; nothing here is a
//! process-wide singleton.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryClinicianStore`] keeps rows in a mutex-guarded map.
//! - [`JsonFileStore`] keeps one JSON object per line with advisory file
//!   locking, so several processes can share a file.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;

use super::clinician::Clinician;
use crate::error::AccountError;

/// Default store file name, placed in the home directory.
pub const DEFAULT_STORE_FILE: &str = ".sagalyze-clinicians.jsonl";

/// Environment variable overriding the store path.
pub const STORE_ENV: &str = "SAGALYZE_STORE";

/// Trait for clinician storage backends.
///
/// Email is the unique key. Implementations must be safe to share between
/// threads.
pub trait ClinicianStore {
    /// Inserts a clinician, replacing any existing row with the same email.
    ///
    /// A replaced row keeps its id; a new row gets the next free id. Returns
    /// the stored row.
    ///
    /// ## Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn insert(&self, clinician: Clinician) -> Result<Clinician, AccountError>;

    /// Inserts a clinician only if no row has the same email.
    ///
    /// The check and the write happen under one lock, so of two concurrent
    /// calls for the same email exactly one succeeds.
    ///
    /// ## Errors
    ///
    /// Returns `AccountError::AlreadyExists` if the email is taken.
    fn insert_new(&self, clinician: Clinician) -> Result<Clinician, AccountError>;

    /// Swaps the stored password hash for `new_hash` if it still equals
    /// `expected`, and returns the updated row.
    ///
    /// ## Errors
    ///
    /// - `AccountError::NotFound` if no such row exists
    /// - `AccountError::Conflict` if the stored hash is no longer `expected`
    fn replace_password(
        &self,
        email: &str,
        expected: Option<&str>,
        new_hash: String,
    ) -> Result<Clinician, AccountError>;

    /// Overwrites the row with the same email.
    ///
    /// ## Errors
    ///
    /// Returns `AccountError::NotFound` if no such row exists.
    fn update(&self, clinician: &Clinician) -> Result<(), AccountError>;

    /// Deletes the row with the given email, returning whether one existed.
    ///
    /// ## Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn delete(&self, email: &str) -> Result<bool, AccountError>;

    /// Looks up a clinician by email.
    ///
    /// ## Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn find_by_email(&self, email: &str) -> Result<Option<Clinician>, AccountError>;

    /// All clinicians, newest first.
    ///
    /// ## Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn all(&self) -> Result<Vec<Clinician>, AccountError>;

    /// Removes every row.
    ///
    /// ## Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn clear(&self) -> Result<(), AccountError>;
}

/// Rows keyed by email. Both stores share the insert/update rules.
#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<String, Clinician>,
}

impl Table {
    fn from_rows(rows: Vec<Clinician>) -> Self {
        Self {
            rows: rows.into_iter().map(|c| (c.email.clone(), c)).collect(),
        }
    }

    fn next_id(&self) -> u64 {
        self.rows.values().map(|c| c.id).max().unwrap_or(0) + 1
    }

    fn insert(&mut self, mut clinician: Clinician) -> Clinician {
        clinician.id = match self.rows.get(&clinician.email) {
            Some(existing) => existing.id,
            None => self.next_id(),
        };
        self.rows.insert(clinician.email.clone(), clinician.clone());
        clinician
    }

    fn insert_new(&mut self, clinician: Clinician) -> Result<Clinician, AccountError> {
        if self.rows.contains_key(&clinician.email) {
            return Err(AccountError::AlreadyExists(clinician.email));
        }
        Ok(self.insert(clinician))
    }

    fn replace_password(
        &mut self,
        email: &str,
        expected: Option<&str>,
        new_hash: String,
    ) -> Result<Clinician, AccountError> {
        let slot = self
            .rows
            .get_mut(email)
            .ok_or_else(|| AccountError::NotFound(email.to_string()))?;
        if slot.password_hash.as_deref() != expected {
            return Err(AccountError::Conflict(email.to_string()));
        }
        slot.password_hash = Some(new_hash);
        Ok(slot.clone())
    }

    fn update(&mut self, clinician: &Clinician) -> Result<(), AccountError> {
        let slot = self
            .rows
            .get_mut(&clinician.email)
            .ok_or_else(|| AccountError::NotFound(clinician.email.clone()))?;
        let id = slot.id;
        *slot = clinician.clone();
        slot.id = id;
        Ok(())
    }

    fn newest_first(&self) -> Vec<Clinician> {
        let mut rows: Vec<Clinician> = self.rows.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    fn into_rows(self) -> Vec<Clinician> {
        let mut rows: Vec<Clinician> = self.rows.into_values().collect();
        rows.sort_by_key(|c| c.id);
        rows
    }
}

/// In-memory clinician store.
///
/// ## Examples
///
/// ```rust
/// use credential_hash::accounts::{Clinician, ClinicianStore, MemoryClinicianStore, NewClinician};
///
/// let store = MemoryClinicianStore::new();
/// let stored = store.insert(Clinician::new(NewClinician::new("a@b.c"), None)).unwrap();
/// assert_eq!(stored.id, 1);
/// assert!(store.find_by_email("a@b.c").unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemoryClinicianStore {
    table: Mutex<Table>,
}

impl MemoryClinicianStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut Table) -> T) -> Result<T, AccountError> {
        let mut table = self.table.lock().map_err(|_| AccountError::Lock)?;
        Ok(f(&mut table))
    }
}

impl ClinicianStore for MemoryClinicianStore {
    fn insert(&self, clinician: Clinician) -> Result<Clinician, AccountError> {
        self.with_table(|t| t.insert(clinician))
    }

    fn insert_new(&self, clinician: Clinician) -> Result<Clinician, AccountError> {
        self.with_table(|t| t.insert_new(clinician))?
    }

    fn replace_password(
        &self,
        email: &str,
        expected: Option<&str>,
        new_hash: String,
    ) -> Result<Clinician, AccountError> {
        self.with_table(|t| t.replace_password(email, expected, new_hash))?
    }

    fn update(&self, clinician: &Clinician) -> Result<(), AccountError> {
        self.with_table(|t| t.update(clinician))?
    }

    fn delete(&self, email: &str) -> Result<bool, AccountError> {
        self.with_table(|t| t.rows.remove(email).is_some())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Clinician>, AccountError> {
        self.with_table(|t| t.rows.get(email).cloned())
    }

    fn all(&self) -> Result<Vec<Clinician>, AccountError> {
        self.with_table(|t| t.newest_first())
    }

    fn clear(&self) -> Result<(), AccountError> {
        self.with_table(|t| t.rows.clear())
    }
}

/// JSONL file-based clinician store.
///
/// Reads take a shared lock, writes an exclusive one and rewrite the whole
/// file. A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Creates a store at `$SAGALYZE_STORE`, or `~/.sagalyze-clinicians.jsonl`
    /// when the variable is unset.
    pub fn default_path() -> Self {
        if let Ok(path) = std::env::var(STORE_ENV) {
            return Self::new(PathBuf::from(path));
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(DEFAULT_STORE_FILE))
    }

    /// Returns the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Table, AccountError> {
        if !self.path.exists() {
            return Ok(Table::default());
        }

        let file = File::open(&self.path)?;
        file.lock_shared().map_err(|_| AccountError::Lock)?;
        let rows = read_rows(&file);
        file.unlock().map_err(|_| AccountError::Lock)?;
        Ok(Table::from_rows(rows?))
    }

    /// Runs `f` against the table under an exclusive lock and writes the
    /// result back.
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut Table) -> Result<T, AccountError>,
    ) -> Result<T, AccountError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive().map_err(|_| AccountError::Lock)?;

        let result = read_rows(&file)
            .map(Table::from_rows)
            .and_then(|mut table| {
                let value = f(&mut table)?;
                write_rows(&mut file, table.into_rows())?;
                Ok(value)
            });

        file.unlock().map_err(|_| AccountError::Lock)?;
        result
    }
}

fn read_rows(file: &File) -> Result<Vec<Clinician>, AccountError> {
    let reader = BufReader::new(file);
    let mut rows = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}

fn write_rows(file: &mut File, rows: Vec<Clinician>) -> Result<(), AccountError> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;

    let mut writer = BufWriter::new(file);
    for row in &rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

impl ClinicianStore for JsonFileStore {
    fn insert(&self, clinician: Clinician) -> Result<Clinician, AccountError> {
        self.modify(|t| Ok(t.insert(clinician)))
    }

    fn insert_new(&self, clinician: Clinician) -> Result<Clinician, AccountError> {
        self.modify(|t| t.insert_new(clinician))
    }

    fn replace_password(
        &self,
        email: &str,
        expected: Option<&str>,
        new_hash: String,
    ) -> Result<Clinician, AccountError> {
        self.modify(|t| t.replace_password(email, expected, new_hash))
    }

    fn update(&self, clinician: &Clinician) -> Result<(), AccountError> {
        self.modify(|t| t.update(clinician))
    }

    fn delete(&self, email: &str) -> Result<bool, AccountError> {
        self.modify(|t| Ok(t.rows.remove(email).is_some()))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Clinician>, AccountError> {
        Ok(self.read()?.rows.remove(email))
    }

    fn all(&self) -> Result<Vec<Clinician>, AccountError> {
        Ok(self.read()?.newest_first())
    }

    fn clear(&self) -> Result<(), AccountError> {
        self.modify(|t| {
            t.rows.clear();
            Ok(())
        })
    }
}
