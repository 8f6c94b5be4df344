//! Error types for the Scaleway driver.

use crate::config::ConfigError;
use crate::driver::MachineState;
use crate::scaleway::api::ApiError;
use crate::ssh_key::SshKeyError;
use thiserror::Error;

/// Errors raised by the Scaleway driver.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScalewayDriverError {
    /// Raised when the driver configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a supplied reserved IP identifier is not a UUID.
    #[error("reserved IP id '{ip_id}' is not a valid UUID")]
    InvalidReservedIp {
        /// Identifier that failed the syntactic check.
        ip_id: String,
    },
    /// Raised when a supplied reserved IP identifier has no address behind it.
    #[error("reserved IP {ip_id} does not resolve to an address in {region}")]
    UnresolvedReservedIp {
        /// Identifier that was looked up.
        ip_id: String,
        /// Region used for the lookup.
        region: String,
    },
    /// Raised when the configured image label matches no available image.
    #[error("image '{label}' not found in region {region}")]
    ImageNotFound {
        /// Image label passed by the caller.
        label: String,
        /// Region used for the lookup.
        region: String,
    },
    /// Raised when an additional-volume specification cannot be parsed.
    #[error("invalid volume spec '{spec}': {message}")]
    InvalidVolumeSpec {
        /// Specification as supplied by the caller.
        spec: String,
        /// Reason the specification was rejected.
        message: String,
    },
    /// Raised when an operation needs a server the machine never created.
    #[error("machine '{machine}' has no provisioned server")]
    NotProvisioned {
        /// Machine name.
        machine: String,
    },
    /// Raised when an operation needs an IP address the machine never stored.
    #[error("machine '{machine}' has no IP address recorded")]
    MissingIpAddress {
        /// Machine name.
        machine: String,
    },
    /// Raised when an endpoint is requested for a server that is not running.
    #[error("server must be running (current state: {state})")]
    NotRunning {
        /// State observed at the time of the call.
        state: MachineState,
    },
    /// Raised for operations the provider offers no primitive for.
    #[error("{operation} is not supported by the scaleway driver")]
    Unsupported {
        /// Operation that was requested.
        operation: &'static str,
    },
    /// Raised when a bounded wait expires before the target state appears.
    #[error("timeout waiting for {action} on server {server_id}")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Provider server identifier.
        server_id: String,
    },
    /// Raised when removal leaves the server visible in the API.
    #[error("server {server_id} still present after removal")]
    ResidualResource {
        /// Provider server identifier.
        server_id: String,
    },
    /// Wrapper for API client failures.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Wrapper for SSH key generation failures.
    #[error(transparent)]
    SshKey(#[from] SshKeyError),
}

impl From<ConfigError> for ScalewayDriverError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
