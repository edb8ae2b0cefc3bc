//! Data structures for bracket tournaments: teams, matches, formations, invites, tournament state.

mod error;
mod formation;
mod game;
mod invite;
mod team;
mod tournament;

pub use error::{ErrorKind, Result, TournamentError};
pub use formation::{AbortReason, FormationId, FormationState, PendingTeamFormation};
pub use game::{Match, Slot, Winner};
pub use invite::{InviteId, InviteState, TeamInvite};
pub use team::{MemberId, Team, TeamId};
pub use tournament::{
    validate_capacity, TenantId, Tournament, TournamentId, TournamentSettings, TournamentStatus,
    MAX_CAPACITY,
};
