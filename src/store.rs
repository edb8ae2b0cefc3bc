//! Persistence collaborator: tournaments, teams, pending formations and invites.
//!
//! The store does no locking of its own beyond keeping each call atomic;
//! callers serialise transitions per tournament (see [`crate::service`]).
//! Tournament updates are conditional on the version the caller read, so a
//! stale writer gets a conflict instead of overwriting newer rounds.

use crate::models::{
    FormationId, InviteId, MemberId, PendingTeamFormation, Result, TeamId, TeamInvite, TenantId,
    Team, Tournament, TournamentError, TournamentId,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub trait Store: Send + Sync {
    fn get_tournament(&self, id: TournamentId) -> Result<Tournament>;
    fn create_tournament(&self, tournament: &Tournament) -> Result<()>;
    /// Replace the stored tournament if its version still equals `tournament.version`.
    /// Returns the stored copy with the bumped version.
    fn update_tournament(&self, tournament: &Tournament) -> Result<Tournament>;
    /// Remove a tournament together with its teams, formations and invites.
    fn delete_tournament(&self, id: TournamentId) -> Result<()>;
    /// The open, pending or active tournament of a tenant, if any.
    fn live_tournament(&self, tenant: TenantId) -> Result<Option<Tournament>>;
    /// A tenant's tournaments, newest first.
    fn tournaments(&self, tenant: TenantId, skip: usize, limit: usize) -> Result<Vec<Tournament>>;
    fn count_tournaments(&self, tenant: TenantId) -> Result<usize>;

    fn get_team(&self, id: TeamId) -> Result<Team>;
    fn create_team(&self, team: &Team) -> Result<()>;
    /// Replace an existing team.
    fn update_team(&self, team: &Team) -> Result<()>;
    /// Remove a team and the invites into it.
    fn delete_team(&self, id: TeamId) -> Result<()>;
    fn teams(&self, tournament: TournamentId) -> Result<Vec<Team>>;
    fn team_by_member(&self, tournament: TournamentId, member: MemberId) -> Result<Option<Team>>;
    /// Matched trimmed and case-insensitively.
    fn team_by_name(&self, tournament: TournamentId, name: &str) -> Result<Option<Team>>;

    fn get_formation(&self, id: FormationId) -> Result<PendingTeamFormation>;
    fn put_formation(&self, formation: &PendingTeamFormation) -> Result<()>;
    fn delete_formation(&self, id: FormationId) -> Result<()>;
    fn formations(&self) -> Result<Vec<PendingTeamFormation>>;

    fn get_invite(&self, id: InviteId) -> Result<TeamInvite>;
    fn put_invite(&self, invite: &TeamInvite) -> Result<()>;
    fn delete_invite(&self, id: InviteId) -> Result<()>;
    fn invites(&self) -> Result<Vec<TeamInvite>>;
}

#[derive(Default)]
struct Tables {
    tournaments: HashMap<TournamentId, Tournament>,
    teams: HashMap<TeamId, Team>,
    formations: HashMap<FormationId, PendingTeamFormation>,
    invites: HashMap<InviteId, TeamInvite>,
}

/// In-memory [`Store`]. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| TournamentError::Store("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| TournamentError::Store("lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn get_tournament(&self, id: TournamentId) -> Result<Tournament> {
        self.read()?
            .tournaments
            .get(&id)
            .cloned()
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    fn create_tournament(&self, tournament: &Tournament) -> Result<()> {
        self.write()?
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(())
    }

    fn update_tournament(&self, tournament: &Tournament) -> Result<Tournament> {
        let mut g = self.write()?;
        let stored = g
            .tournaments
            .get_mut(&tournament.id)
            .ok_or(TournamentError::TournamentNotFound(tournament.id))?;
        if stored.version != tournament.version {
            return Err(TournamentError::VersionConflict {
                expected: tournament.version,
                found: stored.version,
            });
        }
        *stored = tournament.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    fn delete_tournament(&self, id: TournamentId) -> Result<()> {
        let mut g = self.write()?;
        g.tournaments
            .remove(&id)
            .ok_or(TournamentError::TournamentNotFound(id))?;
        g.teams.retain(|_, t| t.tournament_id != id);
        g.formations.retain(|_, f| f.tournament_id != id);
        g.invites.retain(|_, i| i.tournament_id != id);
        Ok(())
    }

    fn live_tournament(&self, tenant: TenantId) -> Result<Option<Tournament>> {
        Ok(self
            .read()?
            .tournaments
            .values()
            .find(|t| t.tenant_id == tenant && t.status.is_live())
            .cloned())
    }

    fn tournaments(&self, tenant: TenantId, skip: usize, limit: usize) -> Result<Vec<Tournament>> {
        let mut history: Vec<Tournament> = self
            .read()?
            .tournaments
            .values()
            .filter(|t| t.tenant_id == tenant)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(history.into_iter().skip(skip).take(limit).collect())
    }

    fn count_tournaments(&self, tenant: TenantId) -> Result<usize> {
        Ok(self
            .read()?
            .tournaments
            .values()
            .filter(|t| t.tenant_id == tenant)
            .count())
    }

    fn get_team(&self, id: TeamId) -> Result<Team> {
        self.read()?
            .teams
            .get(&id)
            .cloned()
            .ok_or(TournamentError::TeamNotFound(id))
    }

    fn create_team(&self, team: &Team) -> Result<()> {
        self.write()?.teams.insert(team.id, team.clone());
        Ok(())
    }

    fn update_team(&self, team: &Team) -> Result<()> {
        let mut g = self.write()?;
        let stored = g
            .teams
            .get_mut(&team.id)
            .ok_or(TournamentError::TeamNotFound(team.id))?;
        *stored = team.clone();
        Ok(())
    }

    fn delete_team(&self, id: TeamId) -> Result<()> {
        let mut g = self.write()?;
        g.teams.remove(&id).ok_or(TournamentError::TeamNotFound(id))?;
        g.invites.retain(|_, i| i.team_id != id);
        Ok(())
    }

    fn teams(&self, tournament: TournamentId) -> Result<Vec<Team>> {
        let mut teams: Vec<Team> = self
            .read()?
            .teams
            .values()
            .filter(|t| t.tournament_id == tournament)
            .cloned()
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    fn team_by_member(&self, tournament: TournamentId, member: MemberId) -> Result<Option<Team>> {
        Ok(self
            .read()?
            .teams
            .values()
            .find(|t| t.tournament_id == tournament && t.has_member(member))
            .cloned())
    }

    fn team_by_name(&self, tournament: TournamentId, name: &str) -> Result<Option<Team>> {
        Ok(self
            .read()?
            .teams
            .values()
            .find(|t| t.tournament_id == tournament && t.name_matches(name))
            .cloned())
    }

    fn get_formation(&self, id: FormationId) -> Result<PendingTeamFormation> {
        self.read()?
            .formations
            .get(&id)
            .cloned()
            .ok_or(TournamentError::FormationNotFound(id))
    }

    fn put_formation(&self, formation: &PendingTeamFormation) -> Result<()> {
        self.write()?
            .formations
            .insert(formation.id, formation.clone());
        Ok(())
    }

    fn delete_formation(&self, id: FormationId) -> Result<()> {
        self.write()?
            .formations
            .remove(&id)
            .map(|_| ())
            .ok_or(TournamentError::FormationNotFound(id))
    }

    fn formations(&self) -> Result<Vec<PendingTeamFormation>> {
        Ok(self.read()?.formations.values().cloned().collect())
    }

    fn get_invite(&self, id: InviteId) -> Result<TeamInvite> {
        self.read()?
            .invites
            .get(&id)
            .cloned()
            .ok_or(TournamentError::InviteNotFound(id))
    }

    fn put_invite(&self, invite: &TeamInvite) -> Result<()> {
        self.write()?.invites.insert(invite.id, invite.clone());
        Ok(())
    }

    fn delete_invite(&self, id: InviteId) -> Result<()> {
        self.write()?
            .invites
            .remove(&id)
            .map(|_| ())
            .ok_or(TournamentError::InviteNotFound(id))
    }

    fn invites(&self) -> Result<Vec<TeamInvite>> {
        Ok(self.read()?.invites.values().cloned().collect())
    }
}
