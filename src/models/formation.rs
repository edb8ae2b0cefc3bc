//! Pending team formations awaiting member confirmation.

use crate::models::team::{MemberId, Team, TeamId};
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pending formation.
pub type FormationId = Uuid;

/// Why a formation stopped before becoming a team.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    Expired,
    /// The leader withdrew the proposal.
    Cancelled,
    /// An invited member refused.
    Declined,
    /// Could not be finalized (registration closed, name taken, full, or a member moved).
    Rejected,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum FormationState {
    Proposed,
    Finalized(TeamId),
    Aborted(AbortReason),
}

impl fmt::Display for FormationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormationState::Proposed => f.write_str("proposed"),
            FormationState::Finalized(_) => f.write_str("finalized"),
            FormationState::Aborted(AbortReason::Expired) => f.write_str("expired"),
            FormationState::Aborted(AbortReason::Cancelled) => f.write_str("cancelled"),
            FormationState::Aborted(AbortReason::Declined) => f.write_str("declined"),
            FormationState::Aborted(AbortReason::Rejected) => f.write_str("rejected"),
        }
    }
}

/// A roster proposal. Becomes a [`Team`] once every member has confirmed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PendingTeamFormation {
    pub id: FormationId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub leader_id: MemberId,
    pub members: BTreeSet<MemberId>,
    pub confirmed: BTreeSet<MemberId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: FormationState,
}

impl PendingTeamFormation {
    /// New proposal; the leader counts as confirmed from the start.
    pub fn new(
        tournament_id: TournamentId,
        name: impl Into<String>,
        leader_id: MemberId,
        members: BTreeSet<MemberId>,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        let mut members = members;
        members.insert(leader_id);
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            name: name.into(),
            leader_id,
            members,
            confirmed: BTreeSet::from([leader_id]),
            created_at: now,
            expires_at: now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC),
            state: FormationState::Proposed,
        }
    }

    pub fn is_proposed(&self) -> bool {
        self.state == FormationState::Proposed
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_complete(&self) -> bool {
        self.confirmed == self.members
    }

    /// Members still to confirm, in id order.
    pub fn awaiting(&self) -> Vec<MemberId> {
        self.members.difference(&self.confirmed).copied().collect()
    }

    /// The team this proposal describes, leader first.
    pub fn to_team(&self) -> Team {
        let mut members = vec![self.leader_id];
        members.extend(self.members.iter().copied().filter(|&m| m != self.leader_id));
        Team::new(self.tournament_id, self.name.clone(), self.leader_id, members)
    }
}
