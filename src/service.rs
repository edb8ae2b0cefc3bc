//! Service layer: runs every state transition under a per-tournament lock and
//! persists the result through the [`Store`], then tells the [`Notifier`].
//!
//! One lock per tournament id serialises seeding, winners, registrations,
//! confirmations, invites and kicks. Creation is serialised per tenant so two requests
//! cannot both pass the one-live-tournament check.

use crate::config::Config;
use crate::logic::{
    self, bracket_view, start_tournament, BracketView, ConfirmOutcome, Progress, Proposal, Rect,
};
use crate::models::{
    FormationId, FormationState, InviteId, MemberId, PendingTeamFormation, Result, Team, TeamId,
    TeamInvite, TenantId, Tournament, TournamentError, TournamentId, TournamentSettings,
    TournamentStatus,
};
use crate::notify::Notifier;
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

type LockMap<K> = Mutex<HashMap<K, Arc<Mutex<()>>>>;

/// Largest page of tournament history returned at once.
pub const MAX_HISTORY_PAGE: usize = 50;

fn poisoned<E>(_: E) -> TournamentError {
    TournamentError::Store("lock poisoned".into())
}

/// Run `f` while holding the lock for `key`.
fn with_lock<K: Eq + Hash, T>(
    locks: &LockMap<K>,
    key: K,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let lock = {
        let mut map = locks.lock().map_err(poisoned)?;
        Arc::clone(map.entry(key).or_default())
    };
    let _guard = lock.lock().map_err(poisoned)?;
    f()
}

/// Result of a registration request.
#[derive(Clone, Debug, Serialize)]
pub struct Registration {
    pub formation: PendingTeamFormation,
    /// Set when the roster was the leader alone and the team exists already.
    pub team: Option<Team>,
    /// Members whose confirmation prompt could not be delivered.
    pub undelivered: Vec<MemberId>,
}

/// Result of a confirmation.
#[derive(Clone, Debug, Serialize)]
pub struct Confirmation {
    pub formation: PendingTeamFormation,
    pub outcome: ConfirmOutcome,
    pub team: Option<Team>,
}

/// Result of an invite request.
#[derive(Clone, Debug, Serialize)]
pub struct Invitation {
    pub invite: TeamInvite,
    /// False when the invitee could not be reached; the invite still stands.
    pub delivered: bool,
}

/// One page of a tenant's tournaments, newest first.
#[derive(Clone, Debug, Serialize)]
pub struct History {
    pub tournaments: Vec<Tournament>,
    pub total: usize,
    pub skip: usize,
}

/// What a sweep did. `expired`/`purged` count formations.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub purged: usize,
    pub invites_expired: usize,
    pub invites_purged: usize,
}

pub struct TournamentService<S, N> {
    store: S,
    notifier: N,
    formation_timeout: Duration,
    formation_retention: Duration,
    locks: LockMap<TournamentId>,
    tenant_locks: LockMap<TenantId>,
}

impl<S: Store, N: Notifier> TournamentService<S, N> {
    pub fn new(store: S, notifier: N, config: &Config) -> Self {
        Self {
            store,
            notifier,
            formation_timeout: config.formation_timeout(),
            formation_retention: config.formation_retention(),
            locks: Mutex::new(HashMap::new()),
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn locked<T>(&self, id: TournamentId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        with_lock(&self.locks, id, f)
    }

    /// Read a tournament and refuse to work on a structurally broken one.
    fn load(&self, id: TournamentId) -> Result<Tournament> {
        let tournament = self.store.get_tournament(id)?;
        tournament.check_structure()?;
        Ok(tournament)
    }

    // ---- tournaments -------------------------------------------------------

    /// Create an open tournament. A tenant can only run one at a time.
    pub fn create_tournament(
        &self,
        tenant: TenantId,
        settings: TournamentSettings,
    ) -> Result<Tournament> {
        let tournament = Tournament::new(tenant, settings)?;
        with_lock(&self.tenant_locks, tenant, || {
            if self.store.live_tournament(tenant)?.is_some() {
                return Err(TournamentError::TenantBusy(tenant));
            }
            self.store.create_tournament(&tournament)?;
            log::info!(
                "Tournament {} ({:?}) created for tenant {}, capacity {}",
                tournament.id,
                tournament.name,
                tenant,
                tournament.max_teams
            );
            Ok(tournament)
        })
    }

    pub fn get_tournament(&self, id: TournamentId) -> Result<Tournament> {
        self.store.get_tournament(id)
    }

    pub fn live_tournament(&self, tenant: TenantId) -> Result<Tournament> {
        self.store
            .live_tournament(tenant)?
            .ok_or(TournamentError::NoLiveTournament(tenant))
    }

    /// A page of the tenant's tournaments, newest first. `limit` is capped at
    /// [`MAX_HISTORY_PAGE`].
    pub fn history(&self, tenant: TenantId, skip: usize, limit: usize) -> Result<History> {
        let limit = limit.min(MAX_HISTORY_PAGE);
        Ok(History {
            tournaments: self.store.tournaments(tenant, skip, limit)?,
            total: self.store.count_tournaments(tenant)?,
            skip,
        })
    }

    /// Delete a tournament with its teams and formations.
    pub fn delete_tournament(&self, id: TournamentId) -> Result<()> {
        self.locked(id, || self.store.delete_tournament(id))?;
        if let Ok(mut map) = self.locks.lock() {
            map.remove(&id);
        }
        log::info!("Tournament {} deleted", id);
        Ok(())
    }

    /// Open -> Pending.
    pub fn close_registration(&self, id: TournamentId) -> Result<Tournament> {
        self.locked(id, || {
            let mut tournament = self.load(id)?;
            tournament.close_registration()?;
            let saved = self.store.update_tournament(&tournament)?;
            log::info!("Tournament {}: registration closed", id);
            Ok(saved)
        })
    }

    /// Seed round 0 from the registered teams and start playing.
    pub fn start<R: Rng + ?Sized>(
        &self,
        id: TournamentId,
        rng: &mut R,
    ) -> Result<(Tournament, Progress)> {
        self.locked(id, || {
            let mut tournament = self.load(id)?;
            let teams = self.store.teams(id)?;
            let progress = start_tournament(&mut tournament, &teams, rng)?;
            let saved = self.store.update_tournament(&tournament)?;
            self.announce(&saved, progress);
            Ok((saved, progress))
        })
    }

    /// Record the winner of match `match_index` in the current round.
    pub fn set_winner(
        &self,
        id: TournamentId,
        match_index: usize,
        team: TeamId,
    ) -> Result<(Tournament, Progress)> {
        self.locked(id, || {
            let mut tournament = self.load(id)?;
            let progress = logic::set_winner(&mut tournament, match_index, team)?;
            let saved = self.store.update_tournament(&tournament)?;
            self.announce(&saved, progress);
            Ok((saved, progress))
        })
    }

    /// Record a win for the team of `member` in its current match.
    pub fn set_winner_for_member(
        &self,
        id: TournamentId,
        member: MemberId,
    ) -> Result<(Tournament, Progress)> {
        self.locked(id, || {
            let mut tournament = self.load(id)?;
            let teams = self.store.teams(id)?;
            let progress = logic::set_winner_for_member(&mut tournament, &teams, member)?;
            let saved = self.store.update_tournament(&tournament)?;
            self.announce(&saved, progress);
            Ok((saved, progress))
        })
    }

    fn announce(&self, tournament: &Tournament, progress: Progress) {
        match progress {
            Progress::Pending => {}
            Progress::Advanced { .. } => self.notifier.round_started(tournament),
            Progress::Finished { winner } => self.notifier.tournament_finished(tournament, winner),
        }
    }

    // ---- teams -------------------------------------------------------------

    pub fn teams(&self, id: TournamentId) -> Result<Vec<Team>> {
        self.store.get_tournament(id)?;
        self.store.teams(id)
    }

    pub fn team_of_member(&self, id: TournamentId, member: MemberId) -> Result<Team> {
        self.store.get_tournament(id)?;
        self.store
            .team_by_member(id, member)?
            .ok_or(TournamentError::MemberHasNoTeam(member))
    }

    pub fn team_by_name(&self, id: TournamentId, name: &str) -> Result<Team> {
        self.store.get_tournament(id)?;
        self.store
            .team_by_name(id, name)?
            .ok_or_else(|| TournamentError::TeamNameNotFound(name.trim().to_string()))
    }

    /// Remove a team before the bracket is seeded.
    pub fn kick_team(&self, id: TournamentId, team_id: TeamId) -> Result<()> {
        self.locked(id, || {
            let tournament = self.load(id)?;
            tournament.require_status(
                &[TournamentStatus::Open, TournamentStatus::Pending],
                "kick a team",
            )?;
            let team = self.store.get_team(team_id)?;
            if team.tournament_id != id {
                return Err(TournamentError::TeamNotFound(team_id));
            }
            self.store.delete_team(team_id)?;
            log::info!("Tournament {}: team {:?} removed", id, team.name);
            Ok(())
        })
    }

    /// Bracket geometry with team names, ready for drawing.
    pub fn bracket(&self, id: TournamentId, bounds: Rect) -> Result<BracketView> {
        let tournament = self.load(id)?;
        let names: HashMap<TeamId, String> = self
            .store
            .teams(id)?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        bracket_view(&tournament, bounds, &names)
    }

    // ---- formations --------------------------------------------------------

    pub fn get_formation(&self, id: FormationId) -> Result<PendingTeamFormation> {
        self.store.get_formation(id)
    }

    /// Propose a team. Every member other than the leader is asked to confirm;
    /// a leader-only roster becomes a team right away.
    pub fn register(&self, id: TournamentId, proposal: &Proposal) -> Result<Registration> {
        self.locked(id, || {
            let now = Utc::now();
            let tournament = self.load(id)?;
            let teams = self.store.teams(id)?;
            let mut formation =
                logic::propose(&tournament, &teams, proposal, now, self.formation_timeout)?;

            if formation.is_complete() {
                let team = logic::finalize(&mut formation, &tournament, &teams, now)?;
                self.store.create_team(&team)?;
                self.store.put_formation(&formation)?;
                self.notifier.team_created(&team);
                return Ok(Registration {
                    formation,
                    team: Some(team),
                    undelivered: Vec::new(),
                });
            }

            self.store.put_formation(&formation)?;
            log::info!(
                "Tournament {}: team {:?} proposed by {}, waiting for {} member(s)",
                id,
                formation.name,
                formation.leader_id,
                formation.awaiting().len()
            );
            let mut undelivered = Vec::new();
            for member in formation.awaiting() {
                if let Err(e) = self.notifier.confirmation_prompt(member, &formation) {
                    log::warn!("Formation {}: {}", formation.id, e);
                    undelivered.push(member);
                }
            }
            Ok(Registration {
                formation,
                team: None,
                undelivered,
            })
        })
    }

    /// Persist a formation after a transition attempt; announce it if it just closed
    /// without becoming a team.
    fn save_formation(&self, formation: &PendingTeamFormation, was_open: bool) -> Result<()> {
        self.store.put_formation(formation)?;
        if was_open && matches!(formation.state, FormationState::Aborted(_)) {
            self.notifier.formation_aborted(formation);
        }
        Ok(())
    }

    /// Apply `f` to a formation under its tournament's lock. The formation is
    /// saved even when `f` fails, since lazy expiry and rejection change it.
    fn with_formation<T>(
        &self,
        id: FormationId,
        f: impl FnOnce(&mut PendingTeamFormation, DateTime<Utc>) -> Result<T>,
    ) -> Result<(PendingTeamFormation, T)> {
        let tournament_id = self.store.get_formation(id)?.tournament_id;
        self.locked(tournament_id, || {
            let mut formation = self.store.get_formation(id)?;
            let before = formation.clone();
            let result = f(&mut formation, Utc::now());
            if formation != before {
                self.save_formation(&formation, before.is_proposed())?;
            }
            result.map(|value| (formation, value))
        })
    }

    /// Record a member's confirmation; the last one creates the team.
    pub fn confirm(&self, id: FormationId, member: MemberId) -> Result<Confirmation> {
        let (formation, (outcome, team)) = self.with_formation(id, |formation, now| {
            let teams = self.store.teams(formation.tournament_id)?;
            let outcome = logic::confirm(formation, member, &teams, now)?;
            if outcome != ConfirmOutcome::Complete {
                return Ok((outcome, None));
            }
            let tournament = self.load(formation.tournament_id)?;
            let team = logic::finalize(formation, &tournament, &teams, now)?;
            self.store.create_team(&team)?;
            Ok((outcome, Some(team)))
        })?;
        if let Some(team) = &team {
            self.notifier.team_created(team);
        }
        Ok(Confirmation {
            formation,
            outcome,
            team,
        })
    }

    pub fn decline(&self, id: FormationId, member: MemberId) -> Result<PendingTeamFormation> {
        self.with_formation(id, |formation, now| logic::decline(formation, member, now))
            .map(|(formation, ())| formation)
    }

    /// Withdraw a proposal; only its leader may.
    pub fn cancel(&self, id: FormationId, by: MemberId) -> Result<PendingTeamFormation> {
        self.with_formation(id, |formation, now| logic::cancel(formation, by, now))
            .map(|(formation, ())| formation)
    }

    // ---- invites -----------------------------------------------------------

    pub fn get_invite(&self, id: InviteId) -> Result<TeamInvite> {
        self.store.get_invite(id)
    }

    /// The leader `inviter` invites `member` into their team. Delivery failure
    /// is reported, the invite is kept.
    pub fn invite(
        &self,
        id: TournamentId,
        inviter: MemberId,
        member: MemberId,
    ) -> Result<Invitation> {
        self.locked(id, || {
            let tournament = self.load(id)?;
            let teams = self.store.teams(id)?;
            let invite = logic::invite(
                &tournament,
                &teams,
                inviter,
                member,
                Utc::now(),
                self.formation_timeout,
            )?;
            self.store.put_invite(&invite)?;
            let team = self.store.get_team(invite.team_id)?;
            log::info!(
                "Tournament {}: member {} invited to team {:?} by {}",
                id,
                member,
                team.name,
                inviter
            );
            let delivered = match self.notifier.invite_prompt(&invite, &team) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Invite {}: {}", invite.id, e);
                    false
                }
            };
            Ok(Invitation { invite, delivered })
        })
    }

    /// Apply `f` to an invite under its tournament's lock, saving the invite
    /// whenever it changed, even if `f` failed.
    fn with_invite<T>(
        &self,
        id: InviteId,
        f: impl FnOnce(&mut TeamInvite, DateTime<Utc>) -> Result<T>,
    ) -> Result<(TeamInvite, T)> {
        let tournament_id = self.store.get_invite(id)?.tournament_id;
        self.locked(tournament_id, || {
            let mut invite = self.store.get_invite(id)?;
            let before = invite.clone();
            let result = f(&mut invite, Utc::now());
            if invite != before {
                self.store.put_invite(&invite)?;
            }
            result.map(|value| (invite, value))
        })
    }

    /// `member` joins the inviting team. Returns the updated team.
    pub fn accept_invite(&self, id: InviteId, member: MemberId) -> Result<Team> {
        let (_, team) = self.with_invite(id, |invite, now| {
            let tournament = self.load(invite.tournament_id)?;
            let teams = self.store.teams(invite.tournament_id)?;
            let mut team = self.store.get_team(invite.team_id)?;
            logic::accept_invite(invite, member, &tournament, &mut team, &teams, now)?;
            self.store.update_team(&team)?;
            Ok(team)
        })?;
        self.notifier.member_joined(&team, member);
        Ok(team)
    }

    pub fn decline_invite(&self, id: InviteId, member: MemberId) -> Result<TeamInvite> {
        self.with_invite(id, |invite, now| logic::decline_invite(invite, member, now))
            .map(|(invite, ())| invite)
    }

    // ---- housekeeping ------------------------------------------------------

    fn purge_due(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expires_at
            .checked_add_signed(self.formation_retention)
            .is_some_and(|purge_at| purge_at <= now)
    }

    /// Expire overdue proposals and invites, and forget closed ones once they
    /// are older than the retention window (measured from their deadline).
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        for formation in self.store.formations()? {
            if formation.is_proposed() {
                if !formation.is_expired(now) {
                    continue;
                }
                let expired = self.locked(formation.tournament_id, || {
                    let mut current = self.store.get_formation(formation.id)?;
                    if logic::expire_if_due(&mut current, now) {
                        self.save_formation(&current, true)?;
                        return Ok(true);
                    }
                    Ok(false)
                });
                match expired {
                    Ok(true) => report.expired += 1,
                    Ok(false) | Err(TournamentError::FormationNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            } else if self.purge_due(formation.expires_at, now) {
                match self.store.delete_formation(formation.id) {
                    Ok(()) => report.purged += 1,
                    Err(TournamentError::FormationNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        for invite in self.store.invites()? {
            if invite.is_pending() {
                if !invite.is_expired(now) {
                    continue;
                }
                let expired = self.locked(invite.tournament_id, || {
                    let mut current = self.store.get_invite(invite.id)?;
                    if logic::expire_invite_if_due(&mut current, now) {
                        self.store.put_invite(&current)?;
                        return Ok(true);
                    }
                    Ok(false)
                });
                match expired {
                    Ok(true) => report.invites_expired += 1,
                    Ok(false) | Err(TournamentError::InviteNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            } else if self.purge_due(invite.expires_at, now) {
                match self.store.delete_invite(invite.id) {
                    Ok(()) => report.invites_purged += 1,
                    Err(TournamentError::InviteNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        if report != SweepReport::default() {
            log::debug!(
                "Sweep: {} formation(s) expired, {} purged; {} invite(s) expired, {} purged",
                report.expired,
                report.purged,
                report.invites_expired,
                report.invites_purged
            );
        }
        Ok(report)
    }
}
