//! Team formation quorum: a roster proposal becomes a team once every member confirms.
//!
//! Proposed -> Finalized | Aborted. Membership is checked when the roster is
//! proposed and again on every confirmation, because a member may join another
//! team between being invited and answering.

use crate::models::{
    AbortReason, FormationState, MemberId, PendingTeamFormation, Result, Team, Tournament,
    TournamentError, TournamentId, TournamentStatus,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A registration request: team name, the leader, and the other members.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub name: String,
    pub leader_id: MemberId,
    /// May or may not repeat the leader; duplicates are ignored.
    #[serde(default)]
    pub members: Vec<MemberId>,
}

/// Result of a single confirmation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ConfirmOutcome {
    /// The member had already confirmed; nothing changed.
    AlreadyConfirmed,
    Waiting { awaiting: usize },
    /// Everyone has confirmed; the proposal can be finalized.
    Complete,
}

/// The team in `tournament_id` that `member` belongs to, if any.
pub fn team_of(teams: &[Team], tournament_id: TournamentId, member: MemberId) -> Option<&Team> {
    teams
        .iter()
        .find(|t| t.tournament_id == tournament_id && t.has_member(member))
}

fn check_name(tournament: &Tournament, teams: &[Team], name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TournamentError::EmptyTeamName);
    }
    let taken = teams
        .iter()
        .any(|t| t.tournament_id == tournament.id && t.name_matches(name));
    if taken {
        return Err(TournamentError::DuplicateTeamName(name.to_string()));
    }
    Ok(())
}

fn check_capacity(tournament: &Tournament, teams: &[Team]) -> Result<()> {
    let registered = teams
        .iter()
        .filter(|t| t.tournament_id == tournament.id)
        .count();
    if registered >= tournament.max_teams {
        return Err(TournamentError::TooManyTeams {
            capacity: tournament.max_teams,
        });
    }
    Ok(())
}

/// Validate a registration and open a proposal for it.
pub fn propose(
    tournament: &Tournament,
    teams: &[Team],
    proposal: &Proposal,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<PendingTeamFormation> {
    tournament.require_status(&[TournamentStatus::Open], "register a team")?;
    let name = proposal.name.trim();
    check_name(tournament, teams, name)?;

    let mut members: BTreeSet<MemberId> = proposal.members.iter().copied().collect();
    members.insert(proposal.leader_id);
    for &member in &members {
        if let Some(team) = team_of(teams, tournament.id, member) {
            return Err(TournamentError::MemberAlreadyOnTeam {
                member,
                team: team.name.clone(),
            });
        }
    }
    let size = members.len();
    if size < tournament.min_members || size > tournament.max_members {
        return Err(TournamentError::TeamSizeOutOfBounds {
            size,
            min: tournament.min_members,
            max: tournament.max_members,
        });
    }
    check_capacity(tournament, teams)?;

    Ok(PendingTeamFormation::new(
        tournament.id,
        name,
        proposal.leader_id,
        members,
        now,
        window,
    ))
}

/// Move an overdue proposal to `Aborted(Expired)`. Returns true if it expired now.
pub fn expire_if_due(formation: &mut PendingTeamFormation, now: DateTime<Utc>) -> bool {
    if formation.is_proposed() && formation.is_expired(now) {
        formation.state = FormationState::Aborted(AbortReason::Expired);
        log::info!("Team formation {} ({}) expired", formation.id, formation.name);
        true
    } else {
        false
    }
}

fn require_proposed(formation: &mut PendingTeamFormation, now: DateTime<Utc>) -> Result<()> {
    expire_if_due(formation, now);
    if formation.is_proposed() {
        Ok(())
    } else {
        Err(TournamentError::FormationClosed(formation.state))
    }
}

/// Record `member`'s confirmation.
///
/// A member who already belongs to another team is rejected and the proposal
/// stays open; confirming twice is a no-op.
pub fn confirm(
    formation: &mut PendingTeamFormation,
    member: MemberId,
    teams: &[Team],
    now: DateTime<Utc>,
) -> Result<ConfirmOutcome> {
    require_proposed(formation, now)?;
    if !formation.members.contains(&member) {
        return Err(TournamentError::NotInvited(member));
    }
    if formation.confirmed.contains(&member) {
        return Ok(ConfirmOutcome::AlreadyConfirmed);
    }
    if let Some(team) = team_of(teams, formation.tournament_id, member) {
        return Err(TournamentError::MemberJoinedOtherTeam {
            member,
            team: team.name.clone(),
        });
    }
    formation.confirmed.insert(member);
    if formation.is_complete() {
        Ok(ConfirmOutcome::Complete)
    } else {
        Ok(ConfirmOutcome::Waiting {
            awaiting: formation.members.len() - formation.confirmed.len(),
        })
    }
}

/// Turn a fully confirmed proposal into a team.
///
/// Registration rules are checked again because the tournament may have moved
/// on since the proposal was made. If they no longer hold, the proposal is
/// rejected for good and the reason is returned.
pub fn finalize(
    formation: &mut PendingTeamFormation,
    tournament: &Tournament,
    teams: &[Team],
    now: DateTime<Utc>,
) -> Result<Team> {
    require_proposed(formation, now)?;
    if !formation.is_complete() {
        return Err(TournamentError::QuorumIncomplete {
            awaiting: formation.members.len() - formation.confirmed.len(),
        });
    }

    let recheck = tournament
        .require_status(&[TournamentStatus::Open], "register a team")
        .and_then(|()| check_name(tournament, teams, &formation.name))
        .and_then(|()| check_capacity(tournament, teams))
        .and_then(|()| {
            match formation
                .members
                .iter()
                .find_map(|&m| team_of(teams, tournament.id, m).map(|t| (m, t)))
            {
                Some((member, team)) => Err(TournamentError::MemberJoinedOtherTeam {
                    member,
                    team: team.name.clone(),
                }),
                None => Ok(()),
            }
        });
    if let Err(e) = recheck {
        formation.state = FormationState::Aborted(AbortReason::Rejected);
        log::info!("Team formation {} ({}) rejected: {}", formation.id, formation.name, e);
        return Err(e);
    }

    let team = formation.to_team();
    formation.state = FormationState::Finalized(team.id);
    log::info!(
        "Team {} ({}) formed in tournament {} with {} member(s)",
        team.name,
        team.id,
        team.tournament_id,
        team.members.len()
    );
    Ok(team)
}

/// An invited member refuses; the proposal is dropped.
pub fn decline(
    formation: &mut PendingTeamFormation,
    member: MemberId,
    now: DateTime<Utc>,
) -> Result<()> {
    require_proposed(formation, now)?;
    if !formation.members.contains(&member) {
        return Err(TournamentError::NotInvited(member));
    }
    formation.state = FormationState::Aborted(AbortReason::Declined);
    log::info!("Member {} declined team formation {}", member, formation.id);
    Ok(())
}

/// The leader withdraws the proposal.
pub fn cancel(
    formation: &mut PendingTeamFormation,
    by: MemberId,
    now: DateTime<Utc>,
) -> Result<()> {
    require_proposed(formation, now)?;
    if by != formation.leader_id {
        return Err(TournamentError::NotLeader(by));
    }
    formation.state = FormationState::Aborted(AbortReason::Cancelled);
    log::info!("Team formation {} cancelled by its leader", formation.id);
    Ok(())
}
