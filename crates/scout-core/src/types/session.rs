//! Authenticated session identity.

use serde::{Deserialize, Serialize};

/// The signed-in field agent a session belongs to.
///
/// Components that need an identity stay idle until one is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Backend identifier sent as `agent_id` with every location report.
    pub agent_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl AgentIdentity {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self { agent_id: agent_id.into(), username: None }
    }
}
