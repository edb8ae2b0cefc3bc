//! Start phase: seed round 0 from the registered teams (Open/Pending -> Active).

use crate::logic::advancement::{advance, Progress};
use crate::models::{
    validate_capacity, Match, Result, Slot, Team, TeamId, Tournament, TournamentError,
    TournamentStatus,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

/// Order in which round-0 matches receive teams: left half and right half
/// interleaved (L0, R0, L1, R1, ...) so byes spread over both branches.
pub fn fill_order(num_matches: usize) -> Vec<usize> {
    let half = num_matches / 2;
    let mut order = Vec::with_capacity(num_matches);
    for (l, r) in (0..half).zip(half..num_matches) {
        order.push(l);
        order.push(r);
    }
    if num_matches - half > half {
        order.push(num_matches - 1);
    }
    order
}

/// Place `teams` (already in seed order) into `capacity / 2` matches.
///
/// The fill order is walked twice: the first pass fills `team1`, the second
/// `team2`. Slots left over stay `Unassigned` and are resolved as walkovers.
pub fn place_teams(capacity: usize, teams: &[TeamId]) -> Result<Vec<Match>> {
    validate_capacity(capacity)?;
    if teams.len() < 2 {
        return Err(TournamentError::NotEnoughTeams(teams.len()));
    }
    if teams.len() > capacity {
        return Err(TournamentError::TooManyTeams { capacity });
    }

    let num_matches = capacity / 2;
    let order = fill_order(num_matches);
    let mut queue: VecDeque<TeamId> = teams.iter().copied().collect();
    let mut slots = vec![(Slot::Unassigned, Slot::Unassigned); num_matches];

    for &idx in &order {
        match queue.pop_front() {
            Some(id) => slots[idx].0 = Slot::Team(id),
            None => break,
        }
    }
    for &idx in &order {
        match queue.pop_front() {
            Some(id) => slots[idx].1 = Slot::Team(id),
            None => break,
        }
    }

    Ok(slots
        .into_iter()
        .map(|(team1, team2)| Match::resolved(team1, team2))
        .collect())
}

/// Shuffle the teams and build round 0.
pub fn seed_bracket<R: Rng + ?Sized>(
    capacity: usize,
    teams: &[Team],
    rng: &mut R,
) -> Result<Vec<Match>> {
    let mut ids: Vec<TeamId> = teams.iter().map(|t| t.id).collect();
    ids.shuffle(rng);
    place_teams(capacity, &ids)
}

/// Start the tournament: seed round 0, mark it active and cascade any round
/// that is already fully decided by walkovers.
pub fn start_tournament<R: Rng + ?Sized>(
    tournament: &mut Tournament,
    teams: &[Team],
    rng: &mut R,
) -> Result<Progress> {
    if !tournament.status.can_start() {
        return Err(TournamentError::InvalidState {
            status: tournament.status,
            action: "start",
        });
    }
    if let Some(stray) = teams.iter().find(|t| t.tournament_id != tournament.id) {
        return Err(TournamentError::TeamNotFound(stray.id));
    }
    let round = seed_bracket(tournament.max_teams, teams, rng)?;
    let complete = round.iter().all(Match::is_decided);

    tournament.matches = vec![round];
    tournament.current_round = 1;
    tournament.status = TournamentStatus::Active;
    tournament.winner_id = None;
    log::info!(
        "Tournament {} started with {} team(s), capacity {}",
        tournament.id,
        teams.len(),
        tournament.max_teams
    );

    if complete {
        log::debug!("Round 1 of {} resolved entirely by walkovers", tournament.id);
        return advance(tournament);
    }
    Ok(Progress::Advanced { round: 1 })
}
