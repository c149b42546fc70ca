//! Static agent roster shown on the dashboard and used to pick the persona to run.

use serde::{Deserialize, Serialize};

/// Lifecycle state reported for an agent. The roster always reports `Initialized`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Initialized,
    Running,
    Stopped,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub status: AgentStatus,
}

impl Persona {
    fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            avatar: format!("/{}-agent.png", id),
            status: AgentStatus::Initialized,
        }
    }

    /// Short title used in replies, e.g. "CEO".
    pub fn title(&self) -> String {
        self.id.to_uppercase()
    }
}

/// The fixed roster: CEO, CFO, CTO and CLO.
pub fn roster() -> Vec<Persona> {
    vec![
        Persona::new(
            "ceo",
            "CEO Agent",
            "Strategic leader responsible for high-level decisions and coordinating other agents.",
        ),
        Persona::new(
            "cfo",
            "CFO Agent",
            "Handles financial oversight, budgeting, and analysis.",
        ),
        Persona::new(
            "cto",
            "CTO Agent",
            "Oversees technology strategy and infrastructure.",
        ),
        Persona::new(
            "clo",
            "CLO Agent",
            "Manages compliance, legal risks, and regulatory matters.",
        ),
    ]
}

/// Look up a persona by id (case-insensitive).
pub fn find(id: &str) -> Option<Persona> {
    let id = id.trim();
    roster().into_iter().find(|p| p.id.eq_ignore_ascii_case(id))
}
