//! Error taxonomy shared by every engine.

use crate::models::formation::{FormationId, FormationState};
use crate::models::invite::{InviteId, InviteState};
use crate::models::team::{MemberId, TeamId};
use crate::models::tournament::{TenantId, TournamentId, TournamentStatus};
use thiserror::Error;

/// Result type for tournament operations.
pub type Result<T> = std::result::Result<T, TournamentError>;

/// Broad class of a [`TournamentError`], used by callers to pick a response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Bad input. Nothing was mutated.
    Validation,
    /// The request is valid but collides with current state. Nothing was mutated.
    Conflict,
    NotFound,
    /// Persisted state is structurally broken.
    Invariant,
    /// The persistence collaborator failed.
    Store,
}

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TournamentError {
    #[error("max teams must be an even number between 2 and 64 (got {0})")]
    InvalidCapacity(usize),
    #[error("member limits must satisfy 1 <= min <= max (got {min}-{max})")]
    InvalidMemberBounds { min: usize, max: usize },
    #[error("need at least 2 teams to start (have {0})")]
    NotEnoughTeams(usize),
    #[error("tournament is full ({capacity} teams)")]
    TooManyTeams { capacity: usize },
    #[error("team name must not be empty")]
    EmptyTeamName,
    #[error("a team named {0:?} already exists")]
    DuplicateTeamName(String),
    #[error("member {member} already belongs to team {team:?}")]
    MemberAlreadyOnTeam { member: MemberId, team: String },
    #[error("team must have between {min} and {max} members (found {size})")]
    TeamSizeOutOfBounds { size: usize, min: usize, max: usize },
    #[error("team {0} is not playing in this match")]
    TeamNotInMatch(TeamId),
    #[error("member {0} was not invited to this team")]
    NotInvited(MemberId),
    #[error("only the team leader can do this (member {0} is not the leader)")]
    NotLeader(MemberId),
    #[error("team {team:?} already has the maximum of {max} members")]
    TeamFull { team: String, max: usize },

    #[error("match already has a winner")]
    MatchAlreadyDecided,
    #[error("round {0} still has undecided matches")]
    RoundIncomplete(usize),
    #[error("cannot {action} while tournament is {status}")]
    InvalidState {
        status: TournamentStatus,
        action: &'static str,
    },
    #[error("tenant {0} already has a tournament in progress")]
    TenantBusy(TenantId),
    #[error("team formation is no longer open ({0})")]
    FormationClosed(FormationState),
    #[error("invite is no longer open ({0})")]
    InviteClosed(InviteState),
    #[error("{awaiting} member(s) have not confirmed yet")]
    QuorumIncomplete { awaiting: usize },
    #[error("member {member} joined team {team:?} in the meantime")]
    MemberJoinedOtherTeam { member: MemberId, team: String },
    #[error("tournament was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict { expected: u64, found: u64 },

    #[error("tournament {0} not found")]
    TournamentNotFound(TournamentId),
    #[error("team {0} not found")]
    TeamNotFound(TeamId),
    #[error("team formation {0} not found")]
    FormationNotFound(FormationId),
    #[error("invite {0} not found")]
    InviteNotFound(InviteId),
    #[error("no team named {0:?} in this tournament")]
    TeamNameNotFound(String),
    #[error("match {index} not found in round {round}")]
    MatchNotFound { round: usize, index: usize },
    #[error("member {0} is not on any team in this tournament")]
    MemberHasNoTeam(MemberId),
    #[error("team {0} is not playing in the current round")]
    TeamNotInRound(TeamId),
    #[error("tenant {0} has no tournament in progress")]
    NoLiveTournament(TenantId),

    #[error("corrupted tournament state: {0}")]
    Corrupted(String),
    #[error("store failure: {0}")]
    Store(String),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        use TournamentError::*;
        match self {
            InvalidCapacity(_)
            | InvalidMemberBounds { .. }
            | NotEnoughTeams(_)
            | TooManyTeams { .. }
            | EmptyTeamName
            | DuplicateTeamName(_)
            | MemberAlreadyOnTeam { .. }
            | TeamSizeOutOfBounds { .. }
            | TeamNotInMatch(_)
            | NotInvited(_)
            | NotLeader(_)
            | TeamFull { .. } => ErrorKind::Validation,
            MatchAlreadyDecided
            | RoundIncomplete(_)
            | InvalidState { .. }
            | TenantBusy(_)
            | FormationClosed(_)
            | InviteClosed(_)
            | QuorumIncomplete { .. }
            | MemberJoinedOtherTeam { .. }
            | VersionConflict { .. } => ErrorKind::Conflict,
            TournamentNotFound(_)
            | TeamNotFound(_)
            | FormationNotFound(_)
            | InviteNotFound(_)
            | TeamNameNotFound(_)
            | MatchNotFound { .. }
            | MemberHasNoTeam(_)
            | TeamNotInRound(_)
            | NoLiveTournament(_) => ErrorKind::NotFound,
            Corrupted(_) => ErrorKind::Invariant,
            Store(_) => ErrorKind::Store,
        }
    }
}
