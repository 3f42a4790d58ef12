use std::fmt;

use serde::{Deserialize, Serialize};

pub type Round = u32;

/// Server-assigned participant identity. Opaque to the client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[serde(alias = "don")]
    LeaderFaction,
    #[serde(alias = "mafia")]
    FactionMember,
    #[serde(alias = "sheriff")]
    Investigator,
    #[serde(alias = "civilian")]
    Bystander,
}

impl Role {
    pub fn is_faction(self) -> bool {
        matches!(self, Role::LeaderFaction | Role::FactionMember)
    }

    /// The night action this role performs, if any.
    pub fn night_action(self) -> Option<NightAction> {
        match self {
            Role::LeaderFaction | Role::FactionMember => Some(NightAction::Kill),
            Role::Investigator => Some(NightAction::Investigate),
            Role::Bystander => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    Lobby,
    RoleAssignment,
    Night,
    DayDiscussion,
    DayVote,
    Resolution,
    Ended,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Lobby
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NightAction {
    Kill,
    Investigate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Winner {
    #[serde(alias = "mafia")]
    Faction,
    #[serde(alias = "civilians")]
    Town,
}

/// What an investigation discloses: the side, never the exact role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    #[serde(alias = "mafia")]
    Faction,
    #[serde(alias = "civilian")]
    Town,
}

impl From<Role> for Alignment {
    fn from(role: Role) -> Self {
        if role.is_faction() {
            Alignment::Faction
        } else {
            Alignment::Town
        }
    }
}
