//! Tier tag — the "tagged variant of tier" named in the design notes.

use serde::{Deserialize, Serialize};

/// One of the four storage tiers a [`crate::model::MemoryItem`] can live in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Session,
    Project,
    Global,
    Temporal,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Session => "session",
            Tier::Project => "project",
            Tier::Global => "global",
            Tier::Temporal => "temporal",
        }
    }

    /// The router's tier bonus added during cross-tier scoring (§4.9).
    pub fn tier_bonus(&self) -> f32 {
        match self {
            Tier::Session => 0.10,
            Tier::Project => 0.05,
            Tier::Global => 0.02,
            Tier::Temporal => 0.01,
        }
    }

    /// One tier "up" in priority, used by promotion (§4.9). Global has no tier above it.
    pub fn promoted(&self) -> Option<Tier> {
        match self {
            Tier::Session => Some(Tier::Project),
            Tier::Project => Some(Tier::Global),
            Tier::Global => None,
            Tier::Temporal => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "session" => Ok(Tier::Session),
            "project" => Ok(Tier::Project),
            "global" => Ok(Tier::Global),
            "temporal" => Ok(Tier::Temporal),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}
