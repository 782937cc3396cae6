//! Composite key identifying one stored password

use std::fmt;

use crate::types::{ConnectionEndpoint, Service};
use super::traits::{SecretStoreError, SecretStoreResult};

/// Identity of a stored password: project, service and database role
///
/// File-backed storage is keyed by host/port rather than by ids, so an
/// identity built from a service also carries the service's direct endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretIdentity {
    pub namespace: String,
    pub resource_id: String,
    pub role: String,
    pub endpoint: Option<ConnectionEndpoint>,
}

impl SecretIdentity {
    pub fn new(
        namespace: impl Into<String>,
        resource_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            resource_id: resource_id.into(),
            role: role.into(),
            endpoint: None,
        }
    }

    /// Build the identity for `role` on `service`, including its direct endpoint
    pub fn for_service(service: &Service, role: impl Into<String>) -> Self {
        Self {
            namespace: service.project_id.clone(),
            resource_id: service.service_id.clone(),
            role: role.into(),
            endpoint: service.endpoint.clone(),
        }
    }

    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.endpoint = Some(ConnectionEndpoint::new(host, port));
        self
    }

    /// Check that every key field is populated. Must pass before any I/O.
    pub fn validate(&self) -> SecretStoreResult<()> {
        let mut missing = Vec::new();
        if self.namespace.is_empty() {
            missing.push("project id");
        }
        if self.resource_id.is_empty() {
            missing.push("service id");
        }
        if self.role.is_empty() {
            missing.push("role");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SecretStoreError::Validation(format!("missing {}", missing.join(", "))))
        }
    }

    /// Endpoint required by host-keyed backends
    pub fn require_endpoint(&self) -> SecretStoreResult<&ConnectionEndpoint> {
        match &self.endpoint {
            Some(endpoint) if endpoint.is_usable() => Ok(endpoint),
            _ => Err(SecretStoreError::Validation(
                "missing service endpoint host".to_string(),
            )),
        }
    }
}

impl fmt::Display for SecretIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.resource_id, self.role)
    }
}
