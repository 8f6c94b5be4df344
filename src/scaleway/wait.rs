//! Bounded wait loops for server lifecycle transitions.
//!
//! Every wait polls the provider at a fixed interval against a deadline;
//! expiry produces a typed error instead of spinning forever. Removal
//! completes only when the provider explicitly reports the server absent —
//! fetch failures propagate rather than being read as "gone".

use std::time::Instant;

use tracing::debug;

use crate::driver::MachineState;
use crate::scaleway::api::InstanceApi;
use crate::scaleway::state::machine_state;
use crate::scaleway::{ScalewayDriver, ScalewayDriverError};

impl<A: InstanceApi, R> ScalewayDriver<A, R> {
    pub(in crate::scaleway) async fn wait_for_state(
        &self,
        server_id: &str,
        target: MachineState,
    ) -> Result<(), ScalewayDriverError> {
        let deadline = Instant::now() + self.wait_timeout;
        while Instant::now() <= deadline {
            if let Some(server) = self.api.get_server(server_id).await? {
                let current = machine_state(&server.state);
                if current == target {
                    return Ok(());
                }
                debug!(server = server_id, state = %server.state, "server not yet {target}");
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(ScalewayDriverError::Timeout {
            action: format!("state {target}"),
            server_id: server_id.to_owned(),
        })
    }

    pub(in crate::scaleway) async fn wait_until_gone(
        &self,
        server_id: &str,
    ) -> Result<(), ScalewayDriverError> {
        let deadline = Instant::now() + self.wait_timeout;
        while Instant::now() <= deadline {
            if self.api.get_server(server_id).await?.is_none() {
                return Ok(());
            }
            debug!(server = server_id, "server still visible after terminate");
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(ScalewayDriverError::ResidualResource {
            server_id: server_id.to_owned(),
        })
    }
}
