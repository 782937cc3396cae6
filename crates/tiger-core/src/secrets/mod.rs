//! Password storage abstractions and implementations
//!
//! This module provides a pluggable password store with:
//! - `SecretStore` trait for implementing backends
//! - Built-in backends: `KeyringStore`, `PgpassStore`, `NullStore`, `FallbackStore`, `MemorySecretStore`
//! - `create_secret_store` to build the configured backend once at startup

mod traits;
mod identity;
mod keyring_store;
mod pgpass_store;
mod null_store;
mod memory_store;
mod fallback_store;
mod factory;

pub use traits::{
    mask_secret, BackendKind, SecretStore, SecretStoreError, SecretStoreResult, StorageOutcome,
    SECRET_MASK,
};
pub use identity::SecretIdentity;
pub use keyring_store::{KeyringStore, KEYRING_SERVICE};
pub use pgpass_store::PgpassStore;
pub use null_store::NullStore;
pub use memory_store::MemorySecretStore;
pub use fallback_store::FallbackStore;
pub use factory::{create_secret_store, save_with_outcome, PasswordStorage};
