//! Core types shared by the resolver and the waiter

mod service;

pub use service::{
    ConnectionEndpoint, ConnectionPooler, Service, ResourceStatus, StatusResponse,
    DEFAULT_PORT, DEFAULT_DATABASE, DEFAULT_ROLE,
};
pub use tokio_util::sync::CancellationToken;
