//! Store used when password persistence is switched off

use super::identity::SecretIdentity;
use super::traits::{
    BackendKind, SecretStore, SecretStoreError, SecretStoreResult, StorageOutcome,
};

/// Password store that persists nothing
///
/// Writes and removals succeed without side effects; reads always fail with
/// [`SecretStoreError::StorageDisabled`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

impl SecretStore for NullStore {
    fn name(&self) -> &str {
        BackendKind::Disabled.label()
    }

    fn save(&self, identity: &SecretIdentity, _secret: &str) -> SecretStoreResult<()> {
        identity.validate()
    }

    fn get(&self, identity: &SecretIdentity) -> SecretStoreResult<String> {
        identity.validate()?;
        Err(SecretStoreError::StorageDisabled)
    }

    fn remove(&self, identity: &SecretIdentity) -> SecretStoreResult<()> {
        identity.validate()
    }

    fn describe_outcome(&self, result: &SecretStoreResult<()>, secret: &str) -> StorageOutcome {
        match result {
            Ok(()) => StorageOutcome::new(
                true,
                self.name(),
                "Password not stored (password storage disabled)",
                secret,
            ),
            Err(err) => StorageOutcome::new(
                false,
                self.name(),
                &format!("Password not saved: {}", err),
                secret,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> SecretIdentity {
        SecretIdentity::new("proj", "svc", "tsdbadmin")
    }

    #[test]
    fn test_writes_succeed_reads_fail() {
        let store = NullStore::new();
        store.save(&id(), "p").unwrap();
        store.remove(&id()).unwrap();
        store.remove(&id()).unwrap();

        let err = store.get(&id()).unwrap_err();
        assert!(err.is_storage_disabled());
    }

    #[test]
    fn test_outcome() {
        let store = NullStore::new();
        let outcome = store.save_with_outcome(&id(), "p");
        assert!(outcome.success());
        assert_eq!(outcome.backend(), "none");
        assert!(outcome.message().contains("disabled"));
    }
}
