//! Identity/notification collaborator: reaches members and announces progress.

use crate::models::{MemberId, PendingTeamFormation, Team, TeamId, TeamInvite, Tournament};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum NotifyError {
    /// The member cannot be messaged (unknown, or direct messages closed).
    #[error("could not reach member {0}")]
    Unreachable(MemberId),
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivery is best effort: failures are reported to whoever triggered the
/// event and never undo a committed transition.
pub trait Notifier: Send + Sync {
    /// Ask `member` to confirm joining the proposed team.
    fn confirmation_prompt(
        &self,
        member: MemberId,
        formation: &PendingTeamFormation,
    ) -> Result<(), NotifyError>;

    /// Ask `invite.member_id` to join `team`.
    fn invite_prompt(&self, invite: &TeamInvite, team: &Team) -> Result<(), NotifyError>;

    fn team_created(&self, team: &Team);

    fn member_joined(&self, team: &Team, member: MemberId);

    fn formation_aborted(&self, formation: &PendingTeamFormation);

    fn round_started(&self, tournament: &Tournament);

    fn tournament_finished(&self, tournament: &Tournament, champion: Option<TeamId>);
}

/// Notifier that only writes to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn confirmation_prompt(
        &self,
        member: MemberId,
        formation: &PendingTeamFormation,
    ) -> Result<(), NotifyError> {
        log::info!(
            "Invite sent to member {} for team {:?} (formation {}, expires {})",
            member,
            formation.name,
            formation.id,
            formation.expires_at
        );
        Ok(())
    }

    fn invite_prompt(&self, invite: &TeamInvite, team: &Team) -> Result<(), NotifyError> {
        log::info!(
            "Member {} invited to team {:?} by {} (invite {}, expires {})",
            invite.member_id,
            team.name,
            invite.invited_by,
            invite.id,
            invite.expires_at
        );
        Ok(())
    }

    fn team_created(&self, team: &Team) {
        log::info!("Team {:?} registered with members {:?}", team.name, team.members);
    }

    fn member_joined(&self, team: &Team, member: MemberId) {
        log::info!(
            "Member {} joined team {:?} ({} member(s))",
            member,
            team.name,
            team.members.len()
        );
    }

    fn formation_aborted(&self, formation: &PendingTeamFormation) {
        log::info!(
            "Team formation {:?} ({}) closed: {}",
            formation.name,
            formation.id,
            formation.state
        );
    }

    fn round_started(&self, tournament: &Tournament) {
        log::info!(
            "Tournament {:?}: round {} is open",
            tournament.name,
            tournament.current_round
        );
    }

    fn tournament_finished(&self, tournament: &Tournament, champion: Option<TeamId>) {
        match champion {
            Some(team) => log::info!("Tournament {:?} won by team {}", tournament.name, team),
            None => log::info!("Tournament {:?} ended without a champion", tournament.name),
        }
    }
}
