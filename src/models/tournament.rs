//! Tournament and TournamentStatus.

use crate::models::error::{Result, TournamentError};
use crate::models::game::Match;
use crate::models::team::TeamId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// The community (chat server) a tournament belongs to.
pub type TenantId = u64;

/// Largest bracket the engines support.
pub const MAX_CAPACITY: usize = 64;

/// Current phase of the tournament.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting team registrations.
    #[default]
    Open,
    /// Registration closed, waiting for the start.
    Pending,
    /// Bracket seeded; rounds are being played.
    Active,
    Finished,
}

impl TournamentStatus {
    /// Open, pending and active tournaments block a new one for the same tenant.
    pub fn is_live(self) -> bool {
        match self {
            TournamentStatus::Open | TournamentStatus::Pending | TournamentStatus::Active => true,
            TournamentStatus::Finished => false,
        }
    }

    pub fn accepts_registrations(self) -> bool {
        matches!(self, TournamentStatus::Open)
    }

    pub fn can_start(self) -> bool {
        matches!(self, TournamentStatus::Open | TournamentStatus::Pending)
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TournamentStatus::Open => "open",
            TournamentStatus::Pending => "pending",
            TournamentStatus::Active => "active",
            TournamentStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Parameters chosen by the organiser when creating a tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentSettings {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub max_teams: usize,
    pub min_members: usize,
    pub max_members: usize,
}

impl TournamentSettings {
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.max_teams)?;
        if self.min_members == 0 || self.min_members > self.max_members {
            return Err(TournamentError::InvalidMemberBounds {
                min: self.min_members,
                max: self.max_members,
            });
        }
        Ok(())
    }
}

/// Capacity must be even and within 2..=64.
pub fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity < 2 || capacity > MAX_CAPACITY || capacity % 2 != 0 {
        return Err(TournamentError::InvalidCapacity(capacity));
    }
    Ok(())
}

/// Full tournament state. Rounds are embedded by value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub status: TournamentStatus,
    /// 0 before the start, then 1-based.
    pub current_round: usize,
    /// One entry per played round; `matches[0]` has `max_teams / 2` matches.
    pub matches: Vec<Vec<Match>>,
    pub max_teams: usize,
    pub min_members: usize,
    pub max_members: usize,
    /// Set only when finished with a real champion.
    pub winner_id: Option<TeamId>,
    pub created_at: DateTime<Utc>,
    /// Bumped by the store on every successful update.
    #[serde(default)]
    pub version: u64,
}

impl Tournament {
    /// Create a new open tournament after validating the settings.
    pub fn new(tenant_id: TenantId, settings: TournamentSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: settings.name.trim().to_string(),
            description: settings.description,
            status: TournamentStatus::Open,
            current_round: 0,
            matches: Vec::new(),
            max_teams: settings.max_teams,
            min_members: settings.min_members,
            max_members: settings.max_members,
            winner_id: None,
            created_at: Utc::now(),
            version: 0,
        })
    }

    /// Error unless the tournament is in one of `allowed`.
    pub fn require_status(
        &self,
        allowed: &[TournamentStatus],
        action: &'static str,
    ) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(TournamentError::InvalidState {
                status: self.status,
                action,
            })
        }
    }

    /// Index of the current round in `matches`, checked against the stored rounds.
    pub fn current_round_index(&self) -> Result<usize> {
        if self.current_round == 0 || self.matches.len() != self.current_round {
            return Err(TournamentError::Corrupted(format!(
                "current round is {} but {} round(s) are stored",
                self.current_round,
                self.matches.len()
            )));
        }
        Ok(self.current_round - 1)
    }

    pub fn current_matches(&self) -> Result<&[Match]> {
        let idx = self.current_round_index()?;
        Ok(&self.matches[idx])
    }

    pub fn current_matches_mut(&mut self) -> Result<&mut Vec<Match>> {
        let idx = self.current_round_index()?;
        Ok(&mut self.matches[idx])
    }

    /// Open registration: close it so the bracket can be started.
    pub fn close_registration(&mut self) -> Result<()> {
        self.require_status(&[TournamentStatus::Open], "close registration")?;
        self.status = TournamentStatus::Pending;
        Ok(())
    }

    /// Check the structural invariants of a started bracket.
    pub fn check_structure(&self) -> Result<()> {
        if self.status == TournamentStatus::Open || self.status == TournamentStatus::Pending {
            return Ok(());
        }
        if self.status == TournamentStatus::Active {
            self.current_round_index()?;
        }
        let first = self
            .matches
            .first()
            .ok_or_else(|| TournamentError::Corrupted("started tournament has no rounds".into()))?;
        if first.len() != self.max_teams / 2 {
            return Err(TournamentError::Corrupted(format!(
                "first round has {} matches, expected {}",
                first.len(),
                self.max_teams / 2
            )));
        }
        for (r, pair) in self.matches.windows(2).enumerate() {
            if pair[1].len() != pair[0].len().div_ceil(2) {
                return Err(TournamentError::Corrupted(format!(
                    "round {} has {} matches after a round of {}",
                    r + 2,
                    pair[1].len(),
                    pair[0].len()
                )));
            }
        }
        for (r, round) in self.matches.iter().enumerate() {
            if let Some(i) = round.iter().position(|m| !m.winner_is_consistent()) {
                return Err(TournamentError::Corrupted(format!(
                    "winner of match {} in round {} is not one of its teams",
                    i,
                    r + 1
                )));
            }
        }
        Ok(())
    }
}
