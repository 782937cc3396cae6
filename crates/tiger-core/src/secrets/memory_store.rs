//! In-memory password store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::identity::SecretIdentity;
use super::traits::{BackendKind, SecretStore, SecretStoreError, SecretStoreResult};

/// In-memory password store for tests and ephemeral sessions
///
/// Keyed by `(project, service, role)`. Passwords are lost when the store
/// is dropped.
///
/// # Example
///
/// ```
/// use tiger_core::secrets::{MemorySecretStore, SecretIdentity, SecretStore};
///
/// let store = MemorySecretStore::new();
/// let id = SecretIdentity::new("proj", "svc", "tsdbadmin");
/// store.save(&id, "s3cret").unwrap();
/// assert_eq!(store.get(&id).unwrap(), "s3cret");
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<(String, String, String), String>>,
}

impl MemorySecretStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored passwords
    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(identity: &SecretIdentity) -> (String, String, String) {
        (
            identity.namespace.clone(),
            identity.resource_id.clone(),
            identity.role.clone(),
        )
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        BackendKind::Memory.label()
    }

    fn save(&self, identity: &SecretIdentity, secret: &str) -> SecretStoreResult<()> {
        identity.validate()?;
        self.secrets.write().insert(Self::key(identity), secret.to_string());
        Ok(())
    }

    fn get(&self, identity: &SecretIdentity) -> SecretStoreResult<String> {
        identity.validate()?;
        self.secrets
            .read()
            .get(&Self::key(identity))
            .cloned()
            .ok_or(SecretStoreError::NotFound {
                backend: BackendKind::Memory,
            })
    }

    fn remove(&self, identity: &SecretIdentity) -> SecretStoreResult<()> {
        identity.validate()?;
        self.secrets.write().remove(&Self::key(identity));
        Ok(())
    }
}
