//! Simulation profiles accepted by `POST /api/set_profile`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Patient profile the remote simulator switches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    Stable,
    Shock,
    UnreliableSignal,
    Minor,
    Delayed,
    Immediate,
    Assess,
    #[serde(rename = "VOT_Occlusion")]
    VotOcclusion,
}

impl Profile {
    pub const ALL: [Profile; 8] = [
        Profile::Stable,
        Profile::Shock,
        Profile::UnreliableSignal,
        Profile::Minor,
        Profile::Delayed,
        Profile::Immediate,
        Profile::Assess,
        Profile::VotOcclusion,
    ];

    /// Wire name sent in the `profile` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Stable => "Stable",
            Profile::Shock => "Shock",
            Profile::UnreliableSignal => "UnreliableSignal",
            Profile::Minor => "Minor",
            Profile::Delayed => "Delayed",
            Profile::Immediate => "Immediate",
            Profile::Assess => "Assess",
            Profile::VotOcclusion => "VOT_Occlusion",
        }
    }
}

impl FromStr for Profile {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::UnknownProfile(wanted.to_string()))
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body of `POST /api/set_profile`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SetProfileRequest {
    pub profile: Profile,
}
