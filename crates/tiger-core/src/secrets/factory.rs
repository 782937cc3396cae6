//! Backend selection and the package-level save helper

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::fallback_store::FallbackStore;
use super::identity::SecretIdentity;
use super::keyring_store::KeyringStore;
use super::null_store::NullStore;
use super::pgpass_store::PgpassStore;
use super::traits::{SecretStore, StorageOutcome};

/// Where passwords are persisted, as chosen in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStorage {
    Keyring,
    Pgpass,
    None,
    /// Keyring first, `~/.pgpass` when the keyring is unusable
    #[default]
    Fallback,
}

impl PasswordStorage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordStorage::Keyring => "keyring",
            PasswordStorage::Pgpass => "pgpass",
            PasswordStorage::None => "none",
            PasswordStorage::Fallback => "fallback",
        }
    }
}

impl fmt::Display for PasswordStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordStorage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyring" | "keychain" => Ok(PasswordStorage::Keyring),
            "pgpass" => Ok(PasswordStorage::Pgpass),
            "none" | "off" => Ok(PasswordStorage::None),
            "fallback" | "auto" | "" => Ok(PasswordStorage::Fallback),
            other => Err(format!(
                "unknown password storage '{}' (expected keyring, pgpass, none or fallback)",
                other
            )),
        }
    }
}

/// Build the store for a storage choice
///
/// Called once at startup; the returned store is passed to every call site.
pub fn create_secret_store(storage: PasswordStorage) -> Arc<dyn SecretStore> {
    tracing::debug!(storage = %storage, "creating password store");
    match storage {
        PasswordStorage::Keyring => Arc::new(KeyringStore::new()),
        PasswordStorage::Pgpass => Arc::new(PgpassStore::new()),
        PasswordStorage::None => Arc::new(NullStore::new()),
        PasswordStorage::Fallback => Arc::new(FallbackStore::new(
            Arc::new(KeyringStore::new()),
            Arc::new(PgpassStore::new()),
        )),
    }
}

/// Save a password and describe the result for display
///
/// An empty password or an incomplete identity short-circuits before the
/// store is touched.
pub fn save_with_outcome(
    store: &dyn SecretStore,
    identity: &SecretIdentity,
    secret: &str,
) -> StorageOutcome {
    if secret.is_empty() {
        return StorageOutcome::no_secret(store.name());
    }
    if let Err(err) = identity.validate() {
        return store.describe_outcome(&Err(err), secret);
    }
    store.save_with_outcome(identity, secret)
}
