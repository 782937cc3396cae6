//! Service descriptor types handed in by the REST client

use serde::{Deserialize, Serialize};

/// Default PostgreSQL port used when a service does not advertise one
pub const DEFAULT_PORT: u16 = 5432;

/// Database name every service exposes
pub const DEFAULT_DATABASE: &str = "tsdb";

/// Administrative role created with every service
pub const DEFAULT_ROLE: &str = "tsdbadmin";

/// A host/port pair a service advertises for connections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEndpoint {
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ConnectionEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: Some(port),
        }
    }

    /// Whether this endpoint can be connected to at all
    pub fn is_usable(&self) -> bool {
        !self.host.is_empty()
    }

    /// The advertised port, or the platform default when unset or zero
    pub fn port_or_default(&self) -> u16 {
        match self.port {
            Some(port) if port > 0 => port,
            _ => DEFAULT_PORT,
        }
    }
}

/// Connection pooler attached to a service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPooler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<ConnectionEndpoint>,
}

/// A database service as returned by the platform API
///
/// Only the fields the core needs are modelled; unknown fields in the
/// API payload are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub service_id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Direct endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<ConnectionEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_pooler: Option<ConnectionPooler>,
}

impl Service {
    pub fn new(project_id: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// Set the direct endpoint
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.endpoint = Some(ConnectionEndpoint::new(host, port));
        self
    }

    /// Set the pooled endpoint
    pub fn with_pooler(mut self, host: impl Into<String>, port: u16) -> Self {
        self.connection_pooler = Some(ConnectionPooler {
            endpoint: Some(ConnectionEndpoint::new(host, port)),
        });
        self
    }

    /// Set the reported status
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// The pooled endpoint, if the service has a usable one
    pub fn pooled_endpoint(&self) -> Option<&ConnectionEndpoint> {
        self.connection_pooler
            .as_ref()
            .and_then(|p| p.endpoint.as_ref())
            .filter(|e| e.is_usable())
    }
}

/// Bodies that carry a remote lifecycle status
pub trait ResourceStatus {
    fn status(&self) -> Option<&str>;
}

impl ResourceStatus for Service {
    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

/// Raw result of one status fetch: HTTP-style code plus optional decoded body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse<T> {
    pub status_code: u16,
    pub body: Option<T>,
}

impl<T> StatusResponse<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status_code: 200,
            body: Some(body),
        }
    }

    pub fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            body: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }
}

impl<T: serde::de::DeserializeOwned> StatusResponse<T> {
    /// Decode a response body; non-success or empty bodies carry no value
    pub fn from_json(status_code: u16, body: &[u8]) -> serde_json::Result<Self> {
        let body = if (200..300).contains(&status_code) && !body.is_empty() {
            Some(serde_json::from_slice(body)?)
        } else {
            None
        };
        Ok(Self { status_code, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_from_api_json() {
        let json = r#"{
            "service_id": "svc-1",
            "project_id": "proj-1",
            "name": "db",
            "status": "READY",
            "region_code": "us-east-1",
            "endpoint": {"host": "svc-1.tsdb.cloud", "port": 31234},
            "connection_pooler": {"endpoint": {"host": "svc-1.pool.tsdb.cloud", "port": 6432}}
        }"#;

        let service: Service = serde_json::from_str(json).unwrap();
        assert_eq!(service.service_id, "svc-1");
        assert_eq!(service.status(), Some("READY"));
        assert_eq!(service.endpoint.as_ref().unwrap().port_or_default(), 31234);
        assert_eq!(service.pooled_endpoint().unwrap().host, "svc-1.pool.tsdb.cloud");
    }

    #[test]
    fn test_endpoint_defaults() {
        let endpoint = ConnectionEndpoint {
            host: "h".to_string(),
            port: None,
        };
        assert_eq!(endpoint.port_or_default(), DEFAULT_PORT);
        assert_eq!(ConnectionEndpoint::new("h", 0).port_or_default(), DEFAULT_PORT);
        assert!(!ConnectionEndpoint::default().is_usable());
    }

    #[test]
    fn test_pooler_without_host_is_ignored() {
        let service = Service::new("p", "s").with_pooler("", 6432);
        assert!(service.pooled_endpoint().is_none());
    }

    #[test]
    fn test_status_response_from_json() {
        let ok: StatusResponse<Service> =
            StatusResponse::from_json(200, br#"{"service_id": "s", "status": "PAUSED"}"#).unwrap();
        assert_eq!(ok.body.unwrap().status(), Some("PAUSED"));

        let missing: StatusResponse<Service> =
            StatusResponse::from_json(404, br#"{"message": "not found"}"#).unwrap();
        assert!(missing.is_not_found());
        assert!(missing.body.is_none());
    }
}
