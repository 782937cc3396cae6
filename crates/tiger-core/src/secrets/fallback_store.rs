//! Password store with a primary backend and a secondary fallback

use std::sync::Arc;

use super::identity::SecretIdentity;
use super::traits::{mask_secret, SecretStore, SecretStoreError, SecretStoreResult, StorageOutcome};

/// A store that composes two backends with fallback behavior
///
/// - Save: primary first; on any error, secondary. The outcome names the
///   backend that actually took the write.
/// - Get: primary first; on any error, secondary.
/// - Remove: both, unconditionally; succeeds if either succeeded.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tiger_core::secrets::{FallbackStore, MemorySecretStore, SecretIdentity, SecretStore};
///
/// let primary = Arc::new(MemorySecretStore::new());
/// let secondary = Arc::new(MemorySecretStore::new());
/// let store = FallbackStore::new(primary.clone(), secondary);
///
/// let id = SecretIdentity::new("proj", "svc", "tsdbadmin");
/// store.save(&id, "s3cret").unwrap();
/// assert_eq!(primary.get(&id).unwrap(), "s3cret");
/// ```
pub struct FallbackStore {
    primary: Arc<dyn SecretStore>,
    secondary: Arc<dyn SecretStore>,
    name: String,
}

impl FallbackStore {
    pub fn new(primary: Arc<dyn SecretStore>, secondary: Arc<dyn SecretStore>) -> Self {
        let name = format!("{} with {} fallback", primary.name(), secondary.name());
        Self {
            primary,
            secondary,
            name,
        }
    }

    pub fn primary(&self) -> &Arc<dyn SecretStore> {
        &self.primary
    }

    pub fn secondary(&self) -> &Arc<dyn SecretStore> {
        &self.secondary
    }
}

impl SecretStore for FallbackStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn save(&self, identity: &SecretIdentity, secret: &str) -> SecretStoreResult<()> {
        identity.validate()?;
        match self.primary.save(identity, secret) {
            Ok(()) => Ok(()),
            Err(primary_error) => {
                tracing::warn!(
                    error = %mask_secret(&primary_error.to_string(), secret),
                    fallback = self.secondary.name(),
                    "primary password store failed, attempting fallback"
                );
                self.secondary.save(identity, secret)
            }
        }
    }

    fn get(&self, identity: &SecretIdentity) -> SecretStoreResult<String> {
        identity.validate()?;
        match self.primary.get(identity) {
            Ok(secret) => Ok(secret),
            Err(primary_error) => {
                tracing::debug!(
                    error = %primary_error,
                    fallback = self.secondary.name(),
                    "primary password store read failed, trying fallback"
                );
                self.secondary.get(identity)
            }
        }
    }

    fn remove(&self, identity: &SecretIdentity) -> SecretStoreResult<()> {
        identity.validate()?;
        let primary = self.primary.remove(identity);
        let secondary = self.secondary.remove(identity);

        match (primary, secondary) {
            (Err(primary), Err(secondary)) => {
                tracing::error!(
                    primary_error = %primary,
                    secondary_error = %secondary,
                    "both password stores failed to remove"
                );
                Err(SecretStoreError::Both {
                    primary: Box::new(primary),
                    secondary: Box::new(secondary),
                })
            }
            _ => Ok(()),
        }
    }

    fn save_with_outcome(&self, identity: &SecretIdentity, secret: &str) -> StorageOutcome {
        if let Err(err) = identity.validate() {
            return self.describe_outcome(&Err(err), secret);
        }
        match self.primary.save(identity, secret) {
            Ok(()) => self.primary.describe_outcome(&Ok(()), secret),
            Err(primary_error) => {
                tracing::warn!(
                    error = %mask_secret(&primary_error.to_string(), secret),
                    fallback = self.secondary.name(),
                    "primary password store failed, attempting fallback"
                );
                let result = self.secondary.save(identity, secret);
                self.secondary.describe_outcome(&result, secret)
            }
        }
    }
}

impl std::fmt::Debug for FallbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackStore")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{BackendKind, MemorySecretStore, NullStore, PgpassStore};
    use tempfile::tempdir;

    /// Store whose every operation fails, echoing the password into its error
    struct LeakyFailingStore;

    impl SecretStore for LeakyFailingStore {
        fn name(&self) -> &str {
            "keyring"
        }

        fn save(&self, _identity: &SecretIdentity, secret: &str) -> SecretStoreResult<()> {
            Err(SecretStoreError::unavailable(
                BackendKind::Keyring,
                format!("daemon rejected value '{}'", secret),
            ))
        }

        fn get(&self, _identity: &SecretIdentity) -> SecretStoreResult<String> {
            Err(SecretStoreError::unavailable(BackendKind::Keyring, "no dbus session"))
        }

        fn remove(&self, _identity: &SecretIdentity) -> SecretStoreResult<()> {
            Err(SecretStoreError::unavailable(BackendKind::Keyring, "no dbus session"))
        }
    }

    fn id() -> SecretIdentity {
        SecretIdentity::new("proj", "svc", "tsdbadmin").with_endpoint("h", 5432)
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let primary = Arc::new(MemorySecretStore::new());
        let secondary = Arc::new(MemorySecretStore::new());
        let store = FallbackStore::new(primary.clone(), secondary.clone());

        let outcome = store.save_with_outcome(&id(), "pw");
        assert!(outcome.success());
        assert_eq!(outcome.backend(), "memory");
        assert_eq!(primary.get(&id()).unwrap(), "pw");
        assert!(secondary.is_empty());
    }

    #[test]
    fn test_save_falls_back_and_tags_secondary() {
        let dir = tempdir().unwrap();
        let pgpass = Arc::new(PgpassStore::at(dir.path().join(".pgpass")));
        let store = FallbackStore::new(Arc::new(LeakyFailingStore), pgpass.clone());

        let outcome = store.save_with_outcome(&id(), "hunter2");
        assert!(outcome.success());
        assert_eq!(outcome.backend(), "pgpass file");
        assert_eq!(outcome.message(), "Password saved to pgpass file");
        assert_eq!(pgpass.get(&id()).unwrap(), "hunter2");
        assert_eq!(store.get(&id()).unwrap(), "hunter2");
    }

    #[test]
    fn test_both_fail_reports_secondary_sanitized() {
        let store = FallbackStore::new(Arc::new(LeakyFailingStore), Arc::new(LeakyFailingStore));

        let outcome = store.save_with_outcome(&id(), "hunter2");
        assert!(!outcome.success());
        assert!(!outcome.message().contains("hunter2"));
        assert!(outcome.message().contains("***"));

        let err = store.save(&id(), "hunter2").unwrap_err();
        assert_eq!(err.backend(), Some(BackendKind::Keyring));
    }

    #[test]
    fn test_get_returns_secondary_error() {
        let store = FallbackStore::new(Arc::new(LeakyFailingStore), Arc::new(NullStore::new()));
        assert!(store.get(&id()).unwrap_err().is_storage_disabled());
    }

    #[test]
    fn test_remove_succeeds_if_either_succeeds() {
        let store = FallbackStore::new(Arc::new(LeakyFailingStore), Arc::new(MemorySecretStore::new()));
        store.remove(&id()).unwrap();
        store.remove(&id()).unwrap();
    }

    #[test]
    fn test_remove_clears_both() {
        let primary = Arc::new(MemorySecretStore::new());
        let secondary = Arc::new(MemorySecretStore::new());
        primary.save(&id(), "a").unwrap();
        secondary.save(&id(), "b").unwrap();

        let store = FallbackStore::new(primary.clone(), secondary.clone());
        store.remove(&id()).unwrap();

        assert!(primary.is_empty());
        assert!(secondary.is_empty());
    }

    #[test]
    fn test_remove_both_fail_names_both() {
        let store = FallbackStore::new(Arc::new(LeakyFailingStore), Arc::new(LeakyFailingStore));
        let err = store.remove(&id()).unwrap_err();
        assert!(matches!(err, SecretStoreError::Both { .. }));
    }

    #[test]
    fn test_validation_before_any_backend() {
        let store = FallbackStore::new(Arc::new(LeakyFailingStore), Arc::new(LeakyFailingStore));
        let bad = SecretIdentity::new("proj", "svc", "");

        let outcome = store.save_with_outcome(&bad, "hunter2");
        assert!(!outcome.success());
        assert!(outcome.message().starts_with("Password not saved"));
        assert!(matches!(store.get(&bad), Err(SecretStoreError::Validation(_))));
    }

    #[test]
    fn test_name() {
        let store = FallbackStore::new(Arc::new(MemorySecretStore::new()), Arc::new(NullStore::new()));
        assert_eq!(store.name(), "memory with none fallback");
    }
}
