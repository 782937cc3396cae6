//! Connection resolution for services
//!
//! Turns a service descriptor plus a password policy into a connection
//! target, consulting the configured password store when asked to.

mod connection_resolver;

pub use connection_resolver::{
    ConnectionDescriptor, ConnectionError, ConnectionOptions, ConnectionResolver, ConnectionResult,
    PasswordPolicy,
};
