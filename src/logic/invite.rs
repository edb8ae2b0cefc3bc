//! Invitations into a registered team.
//!
//! Only the leader invites, and only while registration is open. The invitee
//! may join another team before answering, so membership and the team size
//! are checked again on acceptance.

use super::formation::team_of;
use crate::models::{
    InviteState, MemberId, Result, Team, TeamInvite, Tournament, TournamentError, TournamentStatus,
};
use chrono::{DateTime, Duration, Utc};

fn check_room(tournament: &Tournament, team: &Team) -> Result<()> {
    if team.members.len() >= tournament.max_members {
        return Err(TournamentError::TeamFull {
            team: team.name.clone(),
            max: tournament.max_members,
        });
    }
    Ok(())
}

/// The leader `inviter` asks `member` to join their team.
pub fn invite(
    tournament: &Tournament,
    teams: &[Team],
    inviter: MemberId,
    member: MemberId,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<TeamInvite> {
    tournament.require_status(&[TournamentStatus::Open], "invite a member")?;
    let team = team_of(teams, tournament.id, inviter)
        .ok_or(TournamentError::MemberHasNoTeam(inviter))?;
    if team.leader_id != inviter {
        return Err(TournamentError::NotLeader(inviter));
    }
    check_room(tournament, team)?;
    if let Some(other) = team_of(teams, tournament.id, member) {
        return Err(TournamentError::MemberAlreadyOnTeam {
            member,
            team: other.name.clone(),
        });
    }
    Ok(TeamInvite::new(tournament.id, team.id, member, inviter, now, window))
}

/// Move an overdue pending invite to `Expired`. Returns true if it expired now.
pub fn expire_invite_if_due(invite: &mut TeamInvite, now: DateTime<Utc>) -> bool {
    if invite.is_pending() && invite.is_expired(now) {
        invite.state = InviteState::Expired;
        log::info!("Invite {} for member {} expired", invite.id, invite.member_id);
        true
    } else {
        false
    }
}

fn require_pending(invite: &mut TeamInvite, member: MemberId, now: DateTime<Utc>) -> Result<()> {
    expire_invite_if_due(invite, now);
    if !invite.is_pending() {
        return Err(TournamentError::InviteClosed(invite.state));
    }
    if member != invite.member_id {
        return Err(TournamentError::NotInvited(member));
    }
    Ok(())
}

/// `member` accepts and is added to `team`. On any error the team is untouched
/// and the invite stays pending, unless it had expired.
pub fn accept_invite(
    invite: &mut TeamInvite,
    member: MemberId,
    tournament: &Tournament,
    team: &mut Team,
    teams: &[Team],
    now: DateTime<Utc>,
) -> Result<()> {
    require_pending(invite, member, now)?;
    tournament.require_status(&[TournamentStatus::Open], "join a team")?;
    if team.has_member(member) {
        return Err(TournamentError::MemberAlreadyOnTeam {
            member,
            team: team.name.clone(),
        });
    }
    if let Some(other) = team_of(teams, tournament.id, member) {
        return Err(TournamentError::MemberJoinedOtherTeam {
            member,
            team: other.name.clone(),
        });
    }
    check_room(tournament, team)?;

    team.members.push(member);
    invite.state = InviteState::Accepted;
    log::info!(
        "Member {} joined team {} ({}), now {} member(s)",
        member,
        team.name,
        team.id,
        team.members.len()
    );
    Ok(())
}

pub fn decline_invite(invite: &mut TeamInvite, member: MemberId, now: DateTime<Utc>) -> Result<()> {
    require_pending(invite, member, now)?;
    invite.state = InviteState::Declined;
    log::info!("Member {} declined invite {}", member, invite.id);
    Ok(())
}
