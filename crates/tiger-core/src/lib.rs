//! Tiger Core
//!
//! Shared plumbing for the Tiger CLI: where database passwords are kept,
//! how a service becomes a connection string, and how long-running remote
//! operations are polled to completion.
//!
//! ## Passwords
//!
//! ```rust,ignore
//! use tiger_core::secrets::{create_secret_store, save_with_outcome, PasswordStorage, SecretIdentity};
//!
//! let store = create_secret_store(PasswordStorage::Fallback);
//! let identity = SecretIdentity::for_service(&service, "tsdbadmin");
//! let outcome = save_with_outcome(store.as_ref(), &identity, &password);
//! println!("{}", outcome.message());
//! ```
//!
//! ## Connections
//!
//! ```rust,ignore
//! use tiger_core::resolver::{ConnectionOptions, ConnectionResolver, PasswordPolicy};
//!
//! let resolver = ConnectionResolver::new(store);
//! let conn = resolver.resolve(
//!     &service,
//!     ConnectionOptions::new().pooled(true).password_policy(PasswordPolicy::Required),
//! )?;
//! ```
//!
//! ## Waiting
//!
//! ```rust,ignore
//! use tiger_core::waiter::{ReachStatusHandler, WaitConfig, Waiter};
//!
//! let waiter = Waiter::new(WaitConfig::new("waiting for service", config.wait_timeout()));
//! waiter.wait(&fetcher, ReachStatusHandler::new("READY"), &cancel).await?;
//! ```

pub mod types;
pub mod secrets;
pub mod resolver;
pub mod waiter;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use types::{
    CancellationToken, ConnectionEndpoint, ConnectionPooler, ResourceStatus, Service,
    StatusResponse,
};

pub use secrets::{
    create_secret_store, save_with_outcome, FallbackStore, KeyringStore, MemorySecretStore,
    NullStore, PasswordStorage, PgpassStore, SecretIdentity, SecretStore, SecretStoreError,
    SecretStoreResult, StorageOutcome,
};

pub use resolver::{ConnectionDescriptor, ConnectionError, ConnectionResolver, PasswordPolicy};

pub use waiter::{
    ReachAbsenceHandler, ReachStatusHandler, StatusFetcher, WaitConfig, WaitError, WaitHandler,
    WaitOutcome, Waiter,
};

pub use config::{ConfigFile, ConfigProvider, FileConfigProvider};

pub use logging::LogSettings;
