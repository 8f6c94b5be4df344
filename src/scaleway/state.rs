//! Mapping from provider-reported status strings to machine states.

use crate::driver::MachineState;

/// Maps a provider status onto the machine-state vocabulary.
///
/// The mapping is total: any status outside the four lifecycle strings,
/// including future additions to the provider's vocabulary, yields
/// [`MachineState::None`] rather than an error. The provider is the
/// authority on transitions; nothing is enforced here.
#[must_use]
pub fn machine_state(status: &str) -> MachineState {
    match status {
        "starting" => MachineState::Starting,
        "running" => MachineState::Running,
        "stopping" => MachineState::Stopping,
        "stopped" => MachineState::Stopped,
        _ => MachineState::None,
    }
}
