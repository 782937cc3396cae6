//! OS keyring password store
//!
//! Uses the platform credential manager:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;

use super::identity::SecretIdentity;
use super::traits::{BackendKind, SecretStore, SecretStoreError, SecretStoreResult};

/// Default keyring service name entries are filed under
pub const KEYRING_SERVICE: &str = "tiger-cli";

/// Password store backed by the system keyring
///
/// Each identity maps to one keyring entry under the service name, with the
/// account `password-{project}-{service}-{role}`.
///
/// # Example
///
/// ```no_run
/// use tiger_core::secrets::{KeyringStore, SecretIdentity, SecretStore};
///
/// let store = KeyringStore::new();
/// let id = SecretIdentity::new("proj", "svc", "tsdbadmin");
/// store.save(&id, "s3cret").unwrap();
/// assert_eq!(store.get(&id).unwrap(), "s3cret");
/// ```
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Create a keyring store with the default service name
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Create a keyring store under a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
        }
    }

    /// Account name an identity is stored under
    pub fn account(identity: &SecretIdentity) -> String {
        format!(
            "password-{}-{}-{}",
            identity.namespace, identity.resource_id, identity.role
        )
    }

    fn entry(&self, identity: &SecretIdentity) -> SecretStoreResult<Entry> {
        Entry::new(&self.service_name, &Self::account(identity)).map_err(|e| {
            SecretStoreError::unavailable(
                BackendKind::Keyring,
                format!("failed to open keyring entry: {}", e),
            )
        })
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringStore {
    fn name(&self) -> &str {
        BackendKind::Keyring.label()
    }

    fn save(&self, identity: &SecretIdentity, secret: &str) -> SecretStoreResult<()> {
        identity.validate()?;
        tracing::debug!(identity = %identity, service = %self.service_name, "saving password to keyring");

        self.entry(identity)?.set_password(secret).map_err(|e| {
            tracing::warn!(identity = %identity, error = %e, "keyring set_password failed");
            SecretStoreError::unavailable(BackendKind::Keyring, format!("failed to store password: {}", e))
        })?;

        // Read back through a fresh entry so a caching credential daemon cannot fake success
        match self.entry(identity)?.get_password() {
            Ok(stored) if stored == secret => Ok(()),
            Ok(_) => Err(SecretStoreError::unavailable(
                BackendKind::Keyring,
                "verification failed: stored value does not match",
            )),
            Err(e) => Err(SecretStoreError::unavailable(
                BackendKind::Keyring,
                format!("verification failed: could not read back: {}", e),
            )),
        }
    }

    fn get(&self, identity: &SecretIdentity) -> SecretStoreResult<String> {
        identity.validate()?;
        match self.entry(identity)?.get_password() {
            Ok(password) => {
                tracing::debug!(identity = %identity, len = password.len(), "password read from keyring");
                Ok(password)
            }
            Err(keyring::Error::NoEntry) => Err(SecretStoreError::NotFound {
                backend: BackendKind::Keyring,
            }),
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "keyring read failed");
                Err(SecretStoreError::unavailable(BackendKind::Keyring, e.to_string()))
            }
        }
    }

    fn remove(&self, identity: &SecretIdentity) -> SecretStoreResult<()> {
        identity.validate()?;
        match self.entry(identity)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(SecretStoreError::unavailable(
                BackendKind::Keyring,
                format!("failed to delete password: {}", e),
            )),
        }
    }
}
