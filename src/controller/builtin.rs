use super::core::{Controller, ControllerDefinition};
use crate::params::Parameters;

/// Controller every server registers: `/server/ping` answers liveness probes.
pub struct ServerController {
    parameters: Parameters,
}

impl Controller for ServerController {
    fn from_parameters(parameters: Parameters) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl ServerController {
    /// Definition with only the built-in `ping` action.
    pub fn definition() -> ControllerDefinition<Self> {
        ControllerDefinition::new("Server")
    }
}
