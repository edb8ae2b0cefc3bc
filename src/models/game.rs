//! Match, Slot and Winner for single-elimination rounds.

use crate::models::team::TeamId;
use serde::{Deserialize, Serialize};

/// One side of a match: a real team, an explicit bye, or nobody yet.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Team(TeamId),
    Bye,
    #[default]
    Unassigned,
}

impl Slot {
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Slot::Team(id) => Some(*id),
            Slot::Bye | Slot::Unassigned => None,
        }
    }

    /// True for `Bye` and `Unassigned`: the slot cannot play.
    pub fn is_vacant(&self) -> bool {
        self.team().is_none()
    }
}

/// Who advanced out of a match. An empty branch advances `Bye`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Team(TeamId),
    Bye,
}

impl Winner {
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Winner::Team(id) => Some(*id),
            Winner::Bye => None,
        }
    }
}

impl From<Winner> for Slot {
    fn from(w: Winner) -> Self {
        match w {
            Winner::Team(id) => Slot::Team(id),
            Winner::Bye => Slot::Bye,
        }
    }
}

/// A single bracket match.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub team1: Slot,
    pub team2: Slot,
    /// None until decided, either automatically (walkover) or by a reported result.
    pub winner: Option<Winner>,
    /// Handle owned by whatever provisions match channels; stored, never read here.
    #[serde(default)]
    pub channel_id: Option<u64>,
}

impl Match {
    /// Build a match and pre-resolve walkovers: two vacant slots advance `Bye`,
    /// one vacant slot advances the other side, two teams stay undecided.
    pub fn resolved(team1: Slot, team2: Slot) -> Self {
        let winner = match (team1.team(), team2.team()) {
            (None, None) => Some(Winner::Bye),
            (Some(t), None) | (None, Some(t)) => Some(Winner::Team(t)),
            (Some(_), Some(_)) => None,
        };
        Self {
            team1,
            team2,
            winner,
            channel_id: None,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    /// Both slots hold real teams, so the result needs an external decision.
    pub fn is_contested(&self) -> bool {
        !self.team1.is_vacant() && !self.team2.is_vacant()
    }

    pub fn contains(&self, team: TeamId) -> bool {
        self.team1 == Slot::Team(team) || self.team2 == Slot::Team(team)
    }

    /// Whether the recorded winner is consistent with the slots.
    pub fn winner_is_consistent(&self) -> bool {
        match self.winner {
            None => true,
            Some(Winner::Team(id)) => self.contains(id),
            Some(Winner::Bye) => self.team1.is_vacant() && self.team2.is_vacant(),
        }
    }
}
