//! Connection resolution for a service
//!
//! Picks the direct or pooled endpoint, applies the password policy against
//! the configured password store, and renders a connection string.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use thiserror::Error;

use crate::secrets::{BackendKind, SecretIdentity, SecretStore, SecretStoreError, SECRET_MASK};
use crate::types::{Service, DEFAULT_DATABASE, DEFAULT_ROLE};

/// Whether, and how strictly, a password should be attached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordPolicy {
    /// Never look up a password
    #[default]
    Exclude,
    /// Fail if no password can be found
    Required,
    /// Attach a password if one can be found
    Optional,
}

/// Errors produced while resolving a connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("service {service_id} has no connection endpoint available")]
    EndpointUnavailable { service_id: String },

    #[error("{0}")]
    PasswordUnavailable(String),
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Per-call options for [`ConnectionResolver::resolve`]
pub struct ConnectionOptions<'a> {
    pub pooled: bool,
    pub role: String,
    pub password_policy: PasswordPolicy,
    /// Password already known to the caller, e.g. just returned by a create call
    pub pre_resolved_secret: Option<String>,
    /// Where advisory warnings go; suppressed when absent
    pub warn_sink: Option<&'a mut dyn Write>,
}

impl Default for ConnectionOptions<'_> {
    fn default() -> Self {
        Self {
            pooled: false,
            role: DEFAULT_ROLE.to_string(),
            password_policy: PasswordPolicy::Exclude,
            pre_resolved_secret: None,
            warn_sink: None,
        }
    }
}

impl<'a> ConnectionOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pooled(mut self, pooled: bool) -> Self {
        self.pooled = pooled;
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    pub fn pre_resolved_secret(mut self, secret: impl Into<String>) -> Self {
        self.pre_resolved_secret = Some(secret.into());
        self
    }

    pub fn warn_sink(mut self, sink: &'a mut dyn Write) -> Self {
        self.warn_sink = Some(sink);
        self
    }
}

/// A fully resolved connection target
///
/// `Display` renders a `postgresql://` URI; `Debug` never shows the password.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub role: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub secret: Option<String>,
}

impl ConnectionDescriptor {
    /// Connection string with the password replaced by the mask token
    pub fn redacted(&self) -> String {
        self.render(self.secret.as_ref().map(|_| SECRET_MASK.to_string()))
    }

    /// Host as it goes into a URI; IPv6 literals are bracketed
    fn uri_host(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// `password` is inserted verbatim and must already be URI-safe
    fn render(&self, password: Option<String>) -> String {
        let role = urlencoding::encode(&self.role);
        let userinfo = match password {
            Some(password) => format!("{}:{}", role, password),
            None => role.into_owned(),
        };
        format!(
            "postgresql://{}@{}:{}/{}?sslmode=require",
            userinfo,
            self.uri_host(),
            self.port,
            self.database
        )
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = self
            .secret
            .as_deref()
            .map(|secret| urlencoding::encode(secret).into_owned());
        f.write_str(&self.render(password))
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("role", &self.role)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("secret", &self.secret.as_ref().map(|_| SECRET_MASK))
            .finish()
    }
}

/// Resolves connection details for services against one password store
pub struct ConnectionResolver {
    store: Arc<dyn SecretStore>,
}

impl ConnectionResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// Resolve how to connect to `service`
    pub fn resolve(
        &self,
        service: &Service,
        mut options: ConnectionOptions<'_>,
    ) -> ConnectionResult<ConnectionDescriptor> {
        let endpoint = if options.pooled {
            match service.pooled_endpoint() {
                Some(pooled) => Some(pooled),
                None => {
                    if let Some(sink) = options.warn_sink.as_mut() {
                        if let Err(e) = writeln!(
                            sink,
                            "Warning: connection pooler not available for service {}, using direct connection",
                            service.service_id
                        ) {
                            tracing::debug!(error = %e, "failed to write pooler warning");
                        }
                    }
                    service.endpoint.as_ref()
                }
            }
        } else {
            service.endpoint.as_ref()
        };

        let endpoint = endpoint.filter(|e| e.is_usable()).ok_or_else(|| {
            ConnectionError::EndpointUnavailable {
                service_id: service.service_id.clone(),
            }
        })?;

        let role = if options.role.is_empty() {
            DEFAULT_ROLE.to_string()
        } else {
            std::mem::take(&mut options.role)
        };

        let secret = match options.password_policy {
            PasswordPolicy::Exclude => None,
            policy => self.resolve_secret(
                service,
                &role,
                policy,
                options.pre_resolved_secret.as_deref(),
            )?,
        };

        tracing::debug!(
            service_id = %service.service_id,
            host = %endpoint.host,
            pooled = options.pooled,
            with_password = secret.is_some(),
            "resolved connection"
        );

        Ok(ConnectionDescriptor {
            role,
            host: endpoint.host.clone(),
            port: endpoint.port_or_default(),
            database: DEFAULT_DATABASE.to_string(),
            secret,
        })
    }

    fn resolve_secret(
        &self,
        service: &Service,
        role: &str,
        policy: PasswordPolicy,
        pre_resolved: Option<&str>,
    ) -> ConnectionResult<Option<String>> {
        if let Some(secret) = pre_resolved.filter(|s| !s.is_empty()) {
            return Ok(Some(secret.to_string()));
        }

        let identity = SecretIdentity::for_service(service, role);
        match (self.store.get(&identity), policy) {
            (Ok(secret), _) if !secret.is_empty() => Ok(Some(secret)),
            (Ok(_), PasswordPolicy::Required) => Err(ConnectionError::PasswordUnavailable(
                format!("no password available for role '{}'", role),
            )),
            (Err(err), PasswordPolicy::Required) => Err(ConnectionError::PasswordUnavailable(
                required_password_message(&err, role),
            )),
            (result, _) => {
                if let Err(err) = result {
                    tracing::debug!(identity = %identity, error = %err, "optional password not found");
                }
                Ok(None)
            }
        }
    }
}

/// Explain why a required password could not be produced
fn required_password_message(err: &SecretStoreError, role: &str) -> String {
    if err.is_storage_disabled() {
        return format!(
            "no password available for role '{}': password storage is disabled",
            role
        );
    }
    if err.is_not_found() {
        return match err.backend() {
            Some(BackendKind::Keyring) => format!("no password found in keyring for role '{}'", role),
            Some(BackendKind::Pgpass) => format!("no password found in ~/.pgpass for role '{}'", role),
            _ => format!("no password found for role '{}'", role),
        };
    }
    format!("failed to retrieve password for role '{}': {}", role, err)
}
