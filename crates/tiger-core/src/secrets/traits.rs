//! Core traits and types for password storage

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::identity::SecretIdentity;

/// Token substituted for a password wherever it would otherwise be shown
pub const SECRET_MASK: &str = "***";

/// Which concrete medium a store writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Keyring,
    Pgpass,
    Memory,
    Disabled,
}

impl BackendKind {
    /// Label shown to users next to an outcome
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Keyring => "keyring",
            BackendKind::Pgpass => "pgpass file",
            BackendKind::Memory => "memory",
            BackendKind::Disabled => "none",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors that can occur during password store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    /// Identity is incomplete; raised before any I/O
    #[error("invalid password identity: {0}")]
    Validation(String),

    #[error("no password found in {backend}")]
    NotFound { backend: BackendKind },

    #[error("pgpass file does not exist: {}", path.display())]
    PgpassMissing { path: PathBuf },

    #[error("{backend} unavailable: {message}")]
    BackendUnavailable { backend: BackendKind, message: String },

    #[error("password storage is disabled")]
    StorageDisabled,

    #[error("{primary} (fallback: {secondary})")]
    Both {
        primary: Box<SecretStoreError>,
        secondary: Box<SecretStoreError>,
    },
}

impl SecretStoreError {
    pub fn unavailable(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            message: message.into(),
        }
    }

    /// True when the identity is valid but nothing is stored for it
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::PgpassMissing { .. } => true,
            Self::Both { primary, secondary } => primary.is_not_found() && secondary.is_not_found(),
            _ => false,
        }
    }

    pub fn is_storage_disabled(&self) -> bool {
        matches!(self, Self::StorageDisabled)
    }

    /// Backend that produced this error; for combined errors, the last one tried
    pub fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::NotFound { backend } | Self::BackendUnavailable { backend, .. } => Some(*backend),
            Self::PgpassMissing { .. } => Some(BackendKind::Pgpass),
            Self::StorageDisabled => Some(BackendKind::Disabled),
            Self::Both { secondary, .. } => secondary.backend(),
            Self::Validation(_) => None,
        }
    }
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Replace every occurrence of `secret` in `text` with [`SECRET_MASK`]
pub fn mask_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, SECRET_MASK)
}

/// User-facing report of a save attempt
///
/// Fields are read-only and the message is masked at construction, so an
/// outcome cannot carry the raw password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOutcome {
    success: bool,
    backend: String,
    message: String,
}

impl StorageOutcome {
    pub fn success(&self) -> bool {
        self.success
    }

    /// Label of the backend the outcome refers to
    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn new(success: bool, backend: impl Into<String>, message: &str, secret: &str) -> Self {
        Self {
            success,
            backend: backend.into(),
            message: mask_secret(message, secret),
        }
    }

    pub fn no_secret(backend: impl Into<String>) -> Self {
        Self {
            success: false,
            backend: backend.into(),
            message: "No password provided; nothing to save".to_string(),
        }
    }
}

/// Trait for password storage backends
///
/// Implementations:
/// - OS credential store (`KeyringStore`)
/// - `~/.pgpass` (`PgpassStore`)
/// - Storage disabled (`NullStore`)
/// - Primary with secondary fallback (`FallbackStore`)
/// - In-memory for tests and ephemeral sessions (`MemorySecretStore`)
///
/// Every method validates the identity before touching its medium.
pub trait SecretStore: Send + Sync {
    /// Human-readable label of this store
    fn name(&self) -> &str;

    /// Store a password, replacing any previous one for the identity
    fn save(&self, identity: &SecretIdentity, secret: &str) -> SecretStoreResult<()>;

    /// Retrieve the password for an identity
    fn get(&self, identity: &SecretIdentity) -> SecretStoreResult<String>;

    /// Delete the password for an identity. Absence is not an error.
    fn remove(&self, identity: &SecretIdentity) -> SecretStoreResult<()>;

    /// Turn the result of a save into a sanitized, backend-labelled outcome
    fn describe_outcome(&self, result: &SecretStoreResult<()>, secret: &str) -> StorageOutcome {
        match result {
            Ok(()) => {
                let label = self.name();
                StorageOutcome::new(true, label, &format!("Password saved to {}", label), secret)
            }
            Err(err) => {
                let label = err
                    .backend()
                    .map(|b| b.label().to_string())
                    .unwrap_or_else(|| self.name().to_string());
                let message = match err {
                    SecretStoreError::Validation(_) => format!("Password not saved: {}", err),
                    _ => format!("Failed to save password to {}: {}", label, err),
                };
                StorageOutcome::new(false, label, &message, secret)
            }
        }
    }

    /// Save and describe in one step
    fn save_with_outcome(&self, identity: &SecretIdentity, secret: &str) -> StorageOutcome {
        let result = self.save(identity, secret);
        self.describe_outcome(&result, secret)
    }
}
