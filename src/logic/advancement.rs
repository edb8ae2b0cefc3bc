//! Round advancement: record results, build the next round, cascade walkovers.

use crate::models::{
    Match, MemberId, Result, Slot, Team, TeamId, Tournament, TournamentError, TournamentStatus, Winner,
};
use serde::Serialize;

/// Where the bracket stands after a transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "progress")]
pub enum Progress {
    /// The current round still has undecided matches.
    Pending,
    /// A new round was opened (1-based).
    Advanced { round: usize },
    /// The bracket is over. `None` when every branch was empty.
    Finished { winner: Option<TeamId> },
}

/// True when every match of the current round has a winner.
pub fn round_complete(tournament: &Tournament) -> Result<bool> {
    Ok(tournament.current_matches()?.iter().all(Match::is_decided))
}

/// Record `team` as the winner of match `match_index` in the current round.
/// Completing the round advances the bracket immediately.
pub fn set_winner(tournament: &mut Tournament, match_index: usize, team: TeamId) -> Result<Progress> {
    tournament.require_status(&[TournamentStatus::Active], "set a winner")?;
    let round = tournament.current_round;
    let m = tournament
        .current_matches_mut()?
        .get_mut(match_index)
        .ok_or(TournamentError::MatchNotFound {
            round,
            index: match_index,
        })?;
    if m.winner.is_some() {
        return Err(TournamentError::MatchAlreadyDecided);
    }
    if !m.contains(team) {
        return Err(TournamentError::TeamNotInMatch(team));
    }
    m.winner = Some(Winner::Team(team));
    log::info!(
        "Tournament {}: team {} wins match {} of round {}",
        tournament.id,
        team,
        match_index,
        round
    );

    if round_complete(tournament)? {
        advance(tournament)
    } else {
        Ok(Progress::Pending)
    }
}

/// Index of the current-round match that `team` plays in.
pub fn find_match(tournament: &Tournament, team: TeamId) -> Result<usize> {
    tournament
        .current_matches()?
        .iter()
        .position(|m| m.contains(team))
        .ok_or(TournamentError::TeamNotInRound(team))
}

/// Declare the team of `member` the winner of its current match.
pub fn set_winner_for_member(
    tournament: &mut Tournament,
    teams: &[Team],
    member: MemberId,
) -> Result<Progress> {
    let team = teams
        .iter()
        .find(|t| t.tournament_id == tournament.id && t.has_member(member))
        .ok_or(TournamentError::MemberHasNoTeam(member))?;
    let idx = find_match(tournament, team.id)?;
    set_winner(tournament, idx, team.id)
}

/// Pair consecutive winners into the next round. An odd trailing winner meets a bye.
pub fn next_round(winners: &[Winner]) -> Vec<Match> {
    winners
        .chunks(2)
        .map(|pair| {
            let first: Slot = pair[0].into();
            let second = pair.get(1).copied().map_or(Slot::Bye, Into::into);
            Match::resolved(first, second)
        })
        .collect()
}

/// Close the current round.
///
/// A single winner finishes the tournament (with no champion if it is a bye).
/// Otherwise the next round is appended; rounds that are born complete keep
/// advancing until one needs a decision or the bracket finishes. Each pass
/// halves the round, so this stops after at most ceil(log2(capacity)) passes.
pub fn advance(tournament: &mut Tournament) -> Result<Progress> {
    tournament.require_status(&[TournamentStatus::Active], "advance")?;
    loop {
        let round = tournament.current_round;
        let current = tournament.current_matches()?;
        if let Some(i) = current.iter().position(|m| !m.winner_is_consistent()) {
            return Err(TournamentError::Corrupted(format!(
                "winner of match {i} in round {round} is not one of its teams"
            )));
        }
        let winners: Vec<Winner> = current
            .iter()
            .map(|m| m.winner.ok_or(TournamentError::RoundIncomplete(round)))
            .collect::<Result<_>>()?;

        if let [champion] = winners.as_slice() {
            tournament.status = TournamentStatus::Finished;
            tournament.winner_id = champion.team();
            match tournament.winner_id {
                Some(team) => log::info!("Tournament {} finished, champion {}", tournament.id, team),
                None => log::info!("Tournament {} finished without a champion (empty bracket)", tournament.id),
            }
            return Ok(Progress::Finished {
                winner: tournament.winner_id,
            });
        }

        let matches = next_round(&winners);
        let complete = matches.iter().all(Match::is_decided);
        tournament.matches.push(matches);
        tournament.current_round += 1;
        log::info!(
            "Tournament {}: round {} finished, starting round {}",
            tournament.id,
            round,
            tournament.current_round
        );

        if !complete {
            return Ok(Progress::Advanced {
                round: tournament.current_round,
            });
        }
        log::debug!(
            "Tournament {}: round {} resolved automatically",
            tournament.id,
            tournament.current_round
        );
    }
}
