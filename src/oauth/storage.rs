//! Credential storage backends.
//!
//! Provides the [`CredentialStorage`] trait and several implementations:
//! - [`FileCredentialStorage`] - One JSON file per client identifier
//! - [`MemoryCredentialStorage`] - In-memory storage for tests and ephemeral runs
//! - [`KeyringCredentialStorage`] - System keyring (requires `system-keyring` feature)
//!
//! Backends report every failure. [`CredentialStore`] sits on top and applies
//! the broker's tolerance rules: unreadable records load as absent, and save
//! failures are logged rather than surfaced unless strict writes are enabled.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{error, instrument, warn};

use super::OAuthError;
use super::credential::CredentialRecord;

// =============================================================================
// CredentialStorage trait
// =============================================================================

/// Key-value persistence for credential records, keyed by client identifier.
///
/// Records are never deleted, only replaced by a later authorization for
/// the same client identifier.
pub trait CredentialStorage: Send + Sync {
    /// Load the stored record for a client, if any.
    fn load(&self, client_id: &str) -> Result<Option<CredentialRecord>, OAuthError>;

    /// Save a record for a client, replacing any previous one.
    fn save(&self, client_id: &str, record: &CredentialRecord) -> Result<(), OAuthError>;

    /// Check if a record exists for a client.
    fn exists(&self, client_id: &str) -> Result<bool, OAuthError> {
        Ok(self.load(client_id)?.is_some())
    }

    /// Get the name of this storage backend.
    fn name(&self) -> &str;
}

// =============================================================================
// CredentialStore
// =============================================================================

/// Store facade used by the broker.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CredentialStorage>,
    strict_writes: bool,
}

impl CredentialStore {
    /// Wrap a backend. With `strict_writes` off, save failures are swallowed.
    pub fn new(backend: Arc<dyn CredentialStorage>, strict_writes: bool) -> Self {
        Self {
            backend,
            strict_writes,
        }
    }

    /// Name of the underlying backend.
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn strict_writes(&self) -> bool {
        self.strict_writes
    }

    /// Persist `record` under `client_id`.
    ///
    /// Only returns an error when strict writes are enabled; otherwise the
    /// caller proceeds as if the write succeeded.
    pub fn save(&self, client_id: &str, record: &CredentialRecord) -> Result<(), OAuthError> {
        match self.backend.save(client_id, record) {
            Ok(()) => Ok(()),
            Err(err) if self.strict_writes => {
                error!(client_id, error = %err, "Failed to save credential record");
                Err(err)
            }
            Err(err) => {
                error!(
                    client_id,
                    error = %err,
                    "Failed to save credential record; authorization will not survive"
                );
                Ok(())
            }
        }
    }

    /// Load the record for `client_id`, treating unreadable data as absent.
    pub fn load(&self, client_id: &str) -> Option<CredentialRecord> {
        match self.backend.load(client_id) {
            Ok(record) => record,
            Err(err) => {
                warn!(client_id, error = %err, "Failed to read credential record");
                None
            }
        }
    }

    /// The stored refresh token for `client_id`, if there is a usable one.
    pub fn refresh_token(&self, client_id: &str) -> Option<String> {
        self.load(client_id)
            .map(|record| record.refresh_token)
            .filter(|token| !token.is_empty())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("backend", &self.backend.name())
            .field("strict_writes", &self.strict_writes)
            .finish()
    }
}

// =============================================================================
// FileCredentialStorage
// =============================================================================

/// File permissions for record files (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// File-based credential storage.
///
/// File path: `{dir}/{client_id}.json`. The directory is created on first
/// save. Each write goes to its own temp file that is then renamed over
/// the target.
#[derive(Debug, Clone)]
pub struct FileCredentialStorage {
    dir: PathBuf,
}

impl FileCredentialStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the file path for a client, refusing identifiers that would
    /// escape the storage directory.
    fn record_path(&self, client_id: &str) -> Result<PathBuf, OAuthError> {
        let unsafe_name = client_id.is_empty()
            || client_id == "."
            || client_id == ".."
            || client_id.contains(['/', '\\', '\0']);
        if unsafe_name {
            return Err(OAuthError::Storage(format!(
                "client identifier {client_id:?} is not usable as a file name"
            )));
        }
        Ok(self.dir.join(format!("{client_id}.json")))
    }

    /// Ensure the storage directory exists with correct permissions.
    fn ensure_dir(&self) -> Result<(), OAuthError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                OAuthError::Storage(format!(
                    "Failed to create credential directory '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(DIR_MODE);
                std::fs::set_permissions(&self.dir, perms).map_err(|e| {
                    OAuthError::Storage(format!(
                        "Failed to set directory permissions on '{}': {}",
                        self.dir.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

impl CredentialStorage for FileCredentialStorage {
    #[instrument(skip(self))]
    fn load(&self, client_id: &str) -> Result<Option<CredentialRecord>, OAuthError> {
        let path = self.record_path(client_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OAuthError::Storage(format!(
                    "Failed to read credential file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let record: CredentialRecord = serde_json::from_str(&content).map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to parse credential file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(Some(record))
    }

    #[instrument(skip(self, record))]
    fn save(&self, client_id: &str, record: &CredentialRecord) -> Result<(), OAuthError> {
        let path = self.record_path(client_id)?;
        self.ensure_dir()?;

        let content = serde_json::to_string(record)
            .map_err(|e| OAuthError::Storage(format!("Failed to serialize record: {}", e)))?;

        // Each write gets its own temp file so concurrent saves for one
        // client never share a partially written file.
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to create temp file in '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(FILE_MODE);
            temp.as_file().set_permissions(perms).map_err(|e| {
                OAuthError::Storage(format!(
                    "Failed to set permissions on '{}': {}",
                    temp.path().display(),
                    e
                ))
            })?;
        }

        temp.write_all(content.as_bytes()).map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to write temp file '{}': {}",
                temp.path().display(),
                e
            ))
        })?;
        temp.as_file().sync_all().map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to sync temp file '{}': {}",
                temp.path().display(),
                e
            ))
        })?;

        // On failure the temp file is removed when the returned handle drops.
        temp.persist(&path).map_err(|e| {
            OAuthError::Storage(format!(
                "Failed to move record into '{}': {}",
                path.display(),
                e.error
            ))
        })?;

        Ok(())
    }

    fn exists(&self, client_id: &str) -> Result<bool, OAuthError> {
        Ok(self.record_path(client_id)?.exists())
    }

    fn name(&self) -> &str {
        "file"
    }
}

// =============================================================================
// KeyringCredentialStorage
// =============================================================================

/// Keyring-based credential storage.
///
/// Each client identifier becomes one entry under a shared service name;
/// the record is stored as its JSON encoding.
#[cfg(feature = "system-keyring")]
#[derive(Debug, Clone)]
pub struct KeyringCredentialStorage {
    service: String,
}

#[cfg(feature = "system-keyring")]
impl Default for KeyringCredentialStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "system-keyring")]
impl KeyringCredentialStorage {
    const SERVICE_NAME: &str = "sheetkey";

    pub fn new() -> Self {
        Self::with_service(Self::SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, client_id: &str) -> Result<keyring::Entry, OAuthError> {
        keyring::Entry::new(&self.service, client_id)
            .map_err(|e| OAuthError::Storage(format!("Failed to create keyring entry: {}", e)))
    }
}

#[cfg(feature = "system-keyring")]
impl CredentialStorage for KeyringCredentialStorage {
    #[instrument(skip(self))]
    fn load(&self, client_id: &str) -> Result<Option<CredentialRecord>, OAuthError> {
        let entry = self.entry(client_id)?;
        match entry.get_password() {
            Ok(password) => {
                let record = serde_json::from_str(&password).map_err(|e| {
                    OAuthError::Storage(format!("Failed to parse record from keyring: {}", e))
                })?;
                Ok(Some(record))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(OAuthError::Storage(format!("Keyring error: {}", e))),
        }
    }

    #[instrument(skip(self, record))]
    fn save(&self, client_id: &str, record: &CredentialRecord) -> Result<(), OAuthError> {
        let entry = self.entry(client_id)?;
        let json = serde_json::to_string(record)
            .map_err(|e| OAuthError::Storage(format!("Failed to serialize record: {}", e)))?;
        entry
            .set_password(&json)
            .map_err(|e| OAuthError::Storage(format!("Keyring error: {}", e)))
    }

    fn name(&self) -> &str {
        "keyring"
    }
}

// =============================================================================
// MemoryCredentialStorage
// =============================================================================

/// In-memory credential storage.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the broker wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStorage {
    inner: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl MemoryCredentialStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a MemoryCredentialStorage holding one record.
    pub fn with_record(client_id: impl Into<String>, record: CredentialRecord) -> Self {
        let storage = Self::new();
        if let Ok(mut map) = storage.inner.write() {
            map.insert(client_id.into(), record);
        }
        storage
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStorage for MemoryCredentialStorage {
    fn load(&self, client_id: &str) -> Result<Option<CredentialRecord>, OAuthError> {
        let map = self
            .inner
            .read()
            .map_err(|e| OAuthError::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(map.get(client_id).cloned())
    }

    fn save(&self, client_id: &str, record: &CredentialRecord) -> Result<(), OAuthError> {
        let mut map = self
            .inner
            .write()
            .map_err(|e| OAuthError::Storage(format!("Lock poisoned: {}", e)))?;
        map.insert(client_id.to_string(), record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// Tests
// =============================================================================
