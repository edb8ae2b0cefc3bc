//! Invitations to join an already registered team.

use crate::models::team::{MemberId, TeamId};
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type InviteId = Uuid;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteState {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl fmt::Display for InviteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InviteState::Pending => "pending",
            InviteState::Accepted => "accepted",
            InviteState::Declined => "declined",
            InviteState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// A team leader's offer to `member_id`. Only that member can answer it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TeamInvite {
    pub id: InviteId,
    pub tournament_id: TournamentId,
    pub team_id: TeamId,
    pub member_id: MemberId,
    pub invited_by: MemberId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: InviteState,
}

impl TeamInvite {
    pub fn new(
        tournament_id: TournamentId,
        team_id: TeamId,
        member_id: MemberId,
        invited_by: MemberId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            team_id,
            member_id,
            invited_by,
            created_at: now,
            expires_at: now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC),
            state: InviteState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == InviteState::Pending
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
