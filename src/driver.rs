//! Driver contract shared by provisioning backends.
//!
//! The trait mirrors the method set a machine host invokes on a driver:
//! configuration checks, lifecycle actions, state queries, and connection
//! endpoint derivation. Implementations translate these calls into provider
//! API requests.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Lifecycle states a machine host understands.
///
/// `None` is the explicit sentinel for a server the provider reports in an
/// unrecognised state, or does not report at all; it is a valid answer, not
/// an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MachineState {
    /// The server is booting.
    Starting,
    /// The server is up.
    Running,
    /// The server is shutting down.
    Stopping,
    /// The server is powered off.
    Stopped,
    /// The provider reported an unrecognised state, or no server at all.
    None,
}

impl MachineState {
    /// Returns `true` for states where a power-on would be redundant.
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Returns `true` for states where a power-off would be redundant.
    #[must_use]
    pub const fn is_down(self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::None => "none",
        };
        write!(f, "{label}")
    }
}

/// Future returned by driver operations.
pub type DriverFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Method set a machine host requires from a provisioning driver.
///
/// The host invokes at most one method at a time per machine; drivers hold
/// no shared mutable state and never cache provider answers across calls.
pub trait Driver {
    /// Provider specific error type returned by the driver.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the name the host registers this driver under.
    fn driver_name(&self) -> &'static str;

    /// Validates configuration that must hold before `create` is attempted.
    fn pre_create_check(&self) -> DriverFuture<'_, (), Self::Error>;

    /// Provisions the server and blocks until the provider reports it ready.
    fn create(&mut self) -> DriverFuture<'_, (), Self::Error>;

    /// Powers the server on unless it is already starting or running.
    fn start(&self) -> DriverFuture<'_, (), Self::Error>;

    /// Powers the server off unless it is already stopping or stopped.
    fn stop(&self) -> DriverFuture<'_, (), Self::Error>;

    /// Reboots the server unconditionally.
    fn restart(&self) -> DriverFuture<'_, (), Self::Error>;

    /// Hard-kills the server where the provider supports it.
    fn kill(&self) -> DriverFuture<'_, (), Self::Error>;

    /// Tears the server down and releases associated resources.
    fn remove(&self) -> DriverFuture<'_, (), Self::Error>;

    /// Fetches the server and maps its status onto [`MachineState`].
    fn state(&self) -> DriverFuture<'_, MachineState, Self::Error>;

    /// Returns the Docker daemon endpoint; requires a running server.
    fn url(&self) -> DriverFuture<'_, String, Self::Error>;

    /// Returns the hostname or address used for SSH access.
    fn ssh_hostname(&self) -> DriverFuture<'_, String, Self::Error>;
}
