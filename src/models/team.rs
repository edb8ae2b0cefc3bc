//! Team data structures.

use crate::models::tournament::TournamentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a team.
pub type TeamId = Uuid;

/// External identity of a member (e.g. a chat user id).
pub type MemberId = i64;

/// A confirmed team registered in one tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Always contains `leader_id`.
    pub members: Vec<MemberId>,
    pub leader_id: MemberId,
    pub tournament_id: TournamentId,
}

impl Team {
    pub fn new(
        tournament_id: TournamentId,
        name: impl Into<String>,
        leader_id: MemberId,
        members: Vec<MemberId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            members,
            leader_id,
            tournament_id,
        }
    }

    pub fn has_member(&self, member: MemberId) -> bool {
        self.members.contains(&member)
    }

    /// Team names are unique per tournament, compared trimmed and case-insensitively.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}
