//! Integration tests for the service layer: full tournament flow over the in-memory store.

use bracket_tourney::logic::Rect;
use bracket_tourney::{
    AbortReason, Config, ConfirmOutcome, FormationState, InviteState, MemberId, MemoryStore,
    Notifier, NotifyError, PendingTeamFormation, Progress, Proposal, Store, Team, TeamId,
    TeamInvite, Tournament, TournamentError, TournamentService, TournamentSettings,
    TournamentStatus,
};
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Mutex;

/// Notifier that records events and cannot reach some members.
#[derive(Default)]
struct Recorder {
    unreachable: HashSet<MemberId>,
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for Recorder {
    fn confirmation_prompt(
        &self,
        member: MemberId,
        formation: &PendingTeamFormation,
    ) -> Result<(), NotifyError> {
        if self.unreachable.contains(&member) {
            return Err(NotifyError::Unreachable(member));
        }
        self.push(format!("prompt {} {}", member, formation.name));
        Ok(())
    }

    fn invite_prompt(&self, invite: &TeamInvite, team: &Team) -> Result<(), NotifyError> {
        if self.unreachable.contains(&invite.member_id) {
            return Err(NotifyError::Unreachable(invite.member_id));
        }
        self.push(format!("invite {} {}", invite.member_id, team.name));
        Ok(())
    }

    fn team_created(&self, team: &Team) {
        self.push(format!("team {}", team.name));
    }

    fn member_joined(&self, team: &Team, member: MemberId) {
        self.push(format!("joined {} {}", member, team.name));
    }

    fn formation_aborted(&self, formation: &PendingTeamFormation) {
        self.push(format!("aborted {} {}", formation.name, formation.state));
    }

    fn round_started(&self, tournament: &Tournament) {
        self.push(format!("round {}", tournament.current_round));
    }

    fn tournament_finished(&self, _tournament: &Tournament, champion: Option<TeamId>) {
        self.push(format!("finished {}", champion.is_some()));
    }
}

type Service = TournamentService<MemoryStore, Recorder>;

fn service_with(config: Config, notifier: Recorder) -> Service {
    TournamentService::new(MemoryStore::new(), notifier, &config)
}

fn service() -> Service {
    service_with(Config::default(), Recorder::default())
}

fn settings(max_teams: usize) -> TournamentSettings {
    TournamentSettings {
        name: "Friday Cup".to_string(),
        description: "weekly".to_string(),
        max_teams,
        min_members: 1,
        max_members: 2,
    }
}

fn proposal(name: &str, leader: MemberId, members: &[MemberId]) -> Proposal {
    Proposal {
        name: name.to_string(),
        leader_id: leader,
        members: members.to_vec(),
    }
}

fn solo_team(s: &Service, t: &Tournament, name: &str, leader: MemberId) -> Team {
    s.register(t.id, &proposal(name, leader, &[])).unwrap().team.unwrap()
}

#[test]
fn three_teams_play_through_a_four_slot_bracket() {
    let s = service();
    let t = s.create_tournament(10, settings(4)).unwrap();

    let reg = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap();
    assert!(reg.team.is_none());
    assert!(reg.undelivered.is_empty());
    let confirmed = s.confirm(reg.formation.id, 2).unwrap();
    assert_eq!(confirmed.outcome, ConfirmOutcome::Complete);
    assert_eq!(confirmed.team.as_ref().unwrap().members, vec![1, 2]);

    solo_team(&s, &t, "Larks", 3);
    solo_team(&s, &t, "Crows", 4);
    assert_eq!(s.teams(t.id).unwrap().len(), 3);

    s.close_registration(t.id).unwrap();
    let (started, progress) = s.start(t.id, &mut StdRng::seed_from_u64(42)).unwrap();
    assert_eq!(progress, Progress::Advanced { round: 1 });
    assert_eq!(started.status, TournamentStatus::Active);
    assert_eq!(started.matches[0].iter().filter(|m| m.is_contested()).count(), 1);
    assert_eq!(started.matches[0].iter().filter(|m| m.is_decided()).count(), 1);

    // Report the contested match through one of its members.
    let contested = started.matches[0].iter().find(|m| m.is_contested()).unwrap();
    let first = s.store().get_team(contested.team1.team().unwrap()).unwrap();
    let (t2, progress) = s.set_winner_for_member(t.id, first.members[0]).unwrap();
    assert_eq!(progress, Progress::Advanced { round: 2 });
    assert_eq!(t2.matches[1].len(), 1);
    assert!(t2.matches[1][0].is_contested());

    let (done, progress) = s.set_winner(t.id, 0, first.id).unwrap();
    assert_eq!(progress, Progress::Finished { winner: Some(first.id) });
    assert_eq!(done.status, TournamentStatus::Finished);
    assert_eq!(done.winner_id, Some(first.id));
    assert_eq!(s.get_tournament(t.id).unwrap().version, done.version);

    let view = s.bracket(t.id, Rect::new(0.0, 0.0, 800.0, 400.0)).unwrap();
    assert_eq!(view.champion, Some(first.id));
    assert_eq!(view.matches.len(), 2);

    let events = s.notifier().events();
    assert!(events.contains(&"prompt 2 Owls".to_string()));
    assert!(events.contains(&"round 2".to_string()));
    assert_eq!(events.last().unwrap(), "finished true");

    // Finished tournaments no longer block the tenant.
    assert!(s.create_tournament(10, settings(4)).is_ok());
}

#[test]
fn a_tenant_runs_one_tournament_at_a_time() {
    let s = service();
    let t = s.create_tournament(5, settings(8)).unwrap();
    assert_eq!(
        s.create_tournament(5, settings(8)).unwrap_err(),
        TournamentError::TenantBusy(5)
    );
    assert_eq!(s.live_tournament(5).unwrap().id, t.id);
    assert!(s.create_tournament(6, settings(8)).is_ok());

    s.delete_tournament(t.id).unwrap();
    assert_eq!(
        s.live_tournament(5).unwrap_err(),
        TournamentError::NoLiveTournament(5)
    );
    assert!(s.create_tournament(5, settings(8)).is_ok());
}

#[test]
fn invalid_settings_are_rejected() {
    let s = service();
    assert_eq!(
        s.create_tournament(1, settings(5)).unwrap_err(),
        TournamentError::InvalidCapacity(5)
    );
    let mut bad = settings(4);
    bad.min_members = 3;
    assert_eq!(
        s.create_tournament(1, bad).unwrap_err(),
        TournamentError::InvalidMemberBounds { min: 3, max: 2 }
    );
}

#[test]
fn member_race_leaves_the_losing_proposal_open() {
    let s = service();
    let t = s.create_tournament(1, settings(8)).unwrap();

    let a = s.register(t.id, &proposal("A", 1, &[2])).unwrap().formation;
    let x = s.register(t.id, &proposal("X", 3, &[2])).unwrap().formation;
    s.confirm(x.id, 2).unwrap();

    assert_eq!(
        s.confirm(a.id, 2).unwrap_err(),
        TournamentError::MemberJoinedOtherTeam {
            member: 2,
            team: "X".to_string()
        }
    );
    assert_eq!(s.get_formation(a.id).unwrap().state, FormationState::Proposed);
    assert_eq!(s.team_of_member(t.id, 2).unwrap().name, "X");
}

#[test]
fn undeliverable_prompts_are_reported_without_rollback() {
    let notifier = Recorder {
        unreachable: HashSet::from([2]),
        ..Recorder::default()
    };
    let s = service_with(Config::default(), notifier);
    let t = s.create_tournament(1, settings(8)).unwrap();

    let reg = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap();
    assert_eq!(reg.undelivered, vec![2]);
    assert_eq!(s.get_formation(reg.formation.id).unwrap().state, FormationState::Proposed);
}

#[test]
fn late_confirmation_expires_the_proposal() {
    let config = Config {
        formation_timeout_secs: 0,
        ..Config::default()
    };
    let s = service_with(config, Recorder::default());
    let t = s.create_tournament(1, settings(8)).unwrap();
    let f = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap().formation;

    assert_eq!(
        s.confirm(f.id, 2).unwrap_err(),
        TournamentError::FormationClosed(FormationState::Aborted(AbortReason::Expired))
    );
    assert_eq!(
        s.get_formation(f.id).unwrap().state,
        FormationState::Aborted(AbortReason::Expired)
    );
    assert!(s.notifier().events().contains(&"aborted Owls expired".to_string()));
    assert!(s.teams(t.id).unwrap().is_empty());
}

#[test]
fn sweep_expires_then_purges() {
    let config = Config {
        formation_timeout_secs: 0,
        formation_retention_secs: 0,
        ..Config::default()
    };
    let s = service_with(config, Recorder::default());
    let t = s.create_tournament(1, settings(8)).unwrap();
    let f = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap().formation;

    let report = s.sweep(Utc::now()).unwrap();
    assert_eq!((report.expired, report.purged), (1, 0));
    assert_eq!(
        s.get_formation(f.id).unwrap().state,
        FormationState::Aborted(AbortReason::Expired)
    );

    let report = s.sweep(Utc::now()).unwrap();
    assert_eq!((report.expired, report.purged), (0, 1));
    assert_eq!(
        s.get_formation(f.id).unwrap_err(),
        TournamentError::FormationNotFound(f.id)
    );
}

#[test]
fn sweep_leaves_fresh_proposals_alone() {
    let s = service();
    let t = s.create_tournament(1, settings(8)).unwrap();
    let f = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap().formation;

    let report = s.sweep(Utc::now() + Duration::seconds(10)).unwrap();
    assert_eq!((report.expired, report.purged), (0, 0));
    assert!(s.get_formation(f.id).unwrap().is_proposed());
}

#[test]
fn decline_and_cancel_through_the_service() {
    let s = service();
    let t = s.create_tournament(1, settings(8)).unwrap();

    let f = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap().formation;
    assert_eq!(
        s.decline(f.id, 2).unwrap().state,
        FormationState::Aborted(AbortReason::Declined)
    );

    let f = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap().formation;
    assert_eq!(s.cancel(f.id, 2).unwrap_err(), TournamentError::NotLeader(2));
    assert_eq!(
        s.cancel(f.id, 1).unwrap().state,
        FormationState::Aborted(AbortReason::Cancelled)
    );
    assert_eq!(
        s.confirm(f.id, 2).unwrap_err(),
        TournamentError::FormationClosed(FormationState::Aborted(AbortReason::Cancelled))
    );
}

#[test]
fn kicking_a_team_is_only_allowed_before_the_start() {
    let s = service();
    let t = s.create_tournament(1, settings(4)).unwrap();
    let owls = solo_team(&s, &t, "Owls", 1);
    let larks = solo_team(&s, &t, "Larks", 2);
    solo_team(&s, &t, "Crows", 3);

    s.kick_team(t.id, owls.id).unwrap();
    assert_eq!(s.teams(t.id).unwrap().len(), 2);
    assert_eq!(
        s.kick_team(t.id, owls.id).unwrap_err(),
        TournamentError::TeamNotFound(owls.id)
    );

    s.start(t.id, &mut StdRng::seed_from_u64(1)).unwrap();
    assert!(matches!(
        s.kick_team(t.id, larks.id),
        Err(TournamentError::InvalidState { status: TournamentStatus::Active, .. })
    ));
}

#[test]
fn stale_updates_are_rejected_by_the_store() {
    let store = MemoryStore::new();
    let t = Tournament::new(1, settings(4)).unwrap();
    store.create_tournament(&t).unwrap();

    let saved = store.update_tournament(&t).unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(
        store.update_tournament(&t).unwrap_err(),
        TournamentError::VersionConflict { expected: 0, found: 1 }
    );
    assert_eq!(store.update_tournament(&saved).unwrap().version, 2);
}

#[test]
fn concurrent_winners_in_one_round_are_both_kept() {
    let s = service();
    let t = s.create_tournament(1, settings(8)).unwrap();
    for i in 0..8 {
        solo_team(&s, &t, &format!("T{i}"), i);
    }
    let (started, _) = s.start(t.id, &mut StdRng::seed_from_u64(9)).unwrap();
    let winners: Vec<TeamId> = started.matches[0]
        .iter()
        .map(|m| m.team1.team().unwrap())
        .collect();

    std::thread::scope(|scope| {
        for (i, &team) in winners.iter().enumerate() {
            let s = &s;
            scope.spawn(move || s.set_winner(t.id, i, team).unwrap());
        }
    });

    let done = s.get_tournament(t.id).unwrap();
    assert_eq!(done.current_round, 2);
    let advanced: HashSet<TeamId> = done.matches[1]
        .iter()
        .flat_map(|m| [m.team1.team(), m.team2.team()])
        .flatten()
        .collect();
    assert_eq!(advanced, winners.into_iter().collect());
}

#[test]
fn deleting_a_tournament_removes_its_teams_and_formations() {
    let s = service();
    let t = s.create_tournament(1, settings(4)).unwrap();
    let team = solo_team(&s, &t, "Owls", 1);
    let f = s.register(t.id, &proposal("Larks", 2, &[3])).unwrap().formation;

    s.delete_tournament(t.id).unwrap();
    assert_eq!(
        s.get_tournament(t.id).unwrap_err(),
        TournamentError::TournamentNotFound(t.id)
    );
    assert_eq!(
        s.store().get_team(team.id).unwrap_err(),
        TournamentError::TeamNotFound(team.id)
    );
    assert_eq!(
        s.get_formation(f.id).unwrap_err(),
        TournamentError::FormationNotFound(f.id)
    );
}

fn three_member_settings() -> TournamentSettings {
    TournamentSettings {
        max_members: 3,
        ..settings(4)
    }
}

#[test]
fn invited_member_joins_an_existing_team() {
    let s = service();
    let t = s.create_tournament(1, three_member_settings()).unwrap();
    let owls = solo_team(&s, &t, "Owls", 1);

    let invitation = s.invite(t.id, 1, 2).unwrap();
    assert!(invitation.delivered);
    assert_eq!(invitation.invite.team_id, owls.id);

    let team = s.accept_invite(invitation.invite.id, 2).unwrap();
    assert_eq!(team.members, vec![1, 2]);
    assert_eq!(s.team_of_member(t.id, 2).unwrap().id, owls.id);
    assert_eq!(
        s.get_invite(invitation.invite.id).unwrap().state,
        InviteState::Accepted
    );
    let events = s.notifier().events();
    assert!(events.contains(&"invite 2 Owls".to_string()));
    assert!(events.contains(&"joined 2 Owls".to_string()));
}

#[test]
fn invitee_who_registered_elsewhere_cannot_accept() {
    let s = service();
    let t = s.create_tournament(1, three_member_settings()).unwrap();
    solo_team(&s, &t, "Owls", 1);
    let invite = s.invite(t.id, 1, 2).unwrap().invite;
    solo_team(&s, &t, "Larks", 2);

    assert_eq!(
        s.accept_invite(invite.id, 2).unwrap_err(),
        TournamentError::MemberJoinedOtherTeam {
            member: 2,
            team: "Larks".to_string()
        }
    );
    assert_eq!(s.team_by_name(t.id, "owls").unwrap().members, vec![1]);
    assert!(s.get_invite(invite.id).unwrap().is_pending());
}

#[test]
fn unreachable_invitee_still_gets_an_invite() {
    let notifier = Recorder {
        unreachable: HashSet::from([2]),
        ..Recorder::default()
    };
    let s = service_with(Config::default(), notifier);
    let t = s.create_tournament(1, three_member_settings()).unwrap();
    solo_team(&s, &t, "Owls", 1);

    let invitation = s.invite(t.id, 1, 2).unwrap();
    assert!(!invitation.delivered);
    assert!(s.get_invite(invitation.invite.id).unwrap().is_pending());
}

#[test]
fn only_leaders_invite_and_only_into_room() {
    let s = service();
    let t = s.create_tournament(1, settings(4)).unwrap();
    let reg = s.register(t.id, &proposal("Owls", 1, &[2])).unwrap();
    s.confirm(reg.formation.id, 2).unwrap();

    assert_eq!(s.invite(t.id, 2, 3).unwrap_err(), TournamentError::NotLeader(2));
    assert_eq!(
        s.invite(t.id, 1, 3).unwrap_err(),
        TournamentError::TeamFull {
            team: "Owls".to_string(),
            max: 2
        }
    );
    assert_eq!(s.invite(t.id, 7, 3).unwrap_err(), TournamentError::MemberHasNoTeam(7));
}

#[test]
fn sweep_expires_and_purges_invites() {
    let config = Config {
        formation_timeout_secs: 0,
        formation_retention_secs: 0,
        ..Config::default()
    };
    let s = service_with(config, Recorder::default());
    let t = s.create_tournament(1, three_member_settings()).unwrap();
    solo_team(&s, &t, "Owls", 1);
    let invite: TeamInvite = s.invite(t.id, 1, 2).unwrap().invite;

    let report = s.sweep(Utc::now()).unwrap();
    assert_eq!((report.invites_expired, report.invites_purged), (1, 0));
    assert_eq!(s.get_invite(invite.id).unwrap().state, InviteState::Expired);

    let report = s.sweep(Utc::now()).unwrap();
    assert_eq!((report.invites_expired, report.invites_purged), (0, 1));
    assert_eq!(
        s.get_invite(invite.id).unwrap_err(),
        TournamentError::InviteNotFound(invite.id)
    );
}

#[test]
fn kicking_a_team_drops_its_invites() {
    let s = service();
    let t = s.create_tournament(1, three_member_settings()).unwrap();
    let owls = solo_team(&s, &t, "Owls", 1);
    let invite = s.invite(t.id, 1, 2).unwrap().invite;

    s.kick_team(t.id, owls.id).unwrap();
    assert_eq!(
        s.accept_invite(invite.id, 2).unwrap_err(),
        TournamentError::InviteNotFound(invite.id)
    );
}

#[test]
fn history_lists_a_tenants_tournaments_newest_first() {
    let s = service();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let t = s.create_tournament(5, settings(2)).unwrap();
        solo_team(&s, &t, "Owls", 1);
        solo_team(&s, &t, "Larks", 2);
        let (started, _) = s.start(t.id, &mut StdRng::seed_from_u64(1)).unwrap();
        let team = started.matches[0][0].team1.team().unwrap();
        s.set_winner(t.id, 0, team).unwrap();
        ids.push(t.id);
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
    s.create_tournament(6, settings(2)).unwrap();

    let page = s.history(5, 0, 2).unwrap();
    assert_eq!(page.total, 3);
    let listed: Vec<_> = page.tournaments.iter().map(|t| t.id).collect();
    assert_eq!(listed, vec![ids[2], ids[1]]);

    let rest = s.history(5, 2, 10).unwrap();
    assert_eq!(rest.tournaments.len(), 1);
    assert_eq!(rest.tournaments[0].id, ids[0]);
    assert!(s.history(7, 0, 10).unwrap().tournaments.is_empty());
}

#[test]
fn team_lookups_by_name_and_member() {
    let s = service();
    let t = s.create_tournament(1, settings(4)).unwrap();
    let owls = solo_team(&s, &t, "Owls", 1);

    assert_eq!(s.team_by_name(t.id, "  OWLS ").unwrap().id, owls.id);
    assert_eq!(
        s.team_by_name(t.id, "Larks").unwrap_err(),
        TournamentError::TeamNameNotFound("Larks".to_string())
    );
    assert_eq!(s.team_of_member(t.id, 1).unwrap().id, owls.id);
    assert_eq!(
        s.team_of_member(t.id, 9).unwrap_err(),
        TournamentError::MemberHasNoTeam(9)
    );
}

#[test]
fn transitions_refuse_a_corrupted_bracket() {
    let s = service();
    let t = s.create_tournament(1, settings(4)).unwrap();
    for (i, name) in ["A", "B", "C", "D"].into_iter().enumerate() {
        solo_team(&s, &t, name, i as MemberId);
    }
    let (mut started, _) = s.start(t.id, &mut StdRng::seed_from_u64(3)).unwrap();
    let team = started.matches[0][0].team1.team().unwrap();
    started.matches[0].pop();
    s.store().update_tournament(&started).unwrap();

    assert!(matches!(
        s.set_winner(t.id, 0, team),
        Err(TournamentError::Corrupted(_))
    ));
    assert!(matches!(
        s.bracket(t.id, Rect::new(0.0, 0.0, 800.0, 600.0)),
        Err(TournamentError::Corrupted(_))
    ));
}
