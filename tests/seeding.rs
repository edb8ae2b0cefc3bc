//! Integration tests for bracket seeding: fill order, slot placement and the start transition.

use bracket_tourney::{
    fill_order, place_teams, seed_bracket, start_tournament, Match, Progress, Slot, Team, TeamId,
    Tournament, TournamentError, TournamentSettings, TournamentStatus, Winner,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use uuid::Uuid;

fn settings(max_teams: usize) -> TournamentSettings {
    TournamentSettings {
        name: "Cup".to_string(),
        description: String::new(),
        max_teams,
        min_members: 1,
        max_members: 3,
    }
}

fn tournament_with_teams(max_teams: usize, n: usize) -> (Tournament, Vec<Team>) {
    let t = Tournament::new(1, settings(max_teams)).unwrap();
    let teams = (0..n)
        .map(|i| Team::new(t.id, format!("Team {i}"), i as i64, vec![i as i64]))
        .collect();
    (t, teams)
}

fn ids(n: usize) -> Vec<TeamId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

#[test]
fn fill_order_interleaves_left_and_right_halves() {
    assert_eq!(fill_order(1), vec![0]);
    assert_eq!(fill_order(2), vec![0, 1]);
    assert_eq!(fill_order(4), vec![0, 2, 1, 3]);
    assert_eq!(fill_order(5), vec![0, 2, 1, 3, 4]);
    assert_eq!(fill_order(8), vec![0, 4, 1, 5, 2, 6, 3, 7]);
}

#[test]
fn fill_order_is_a_permutation() {
    for n in 1..=32 {
        let mut order = fill_order(n);
        order.sort_unstable();
        assert_eq!(order, (0..n).collect::<Vec<_>>(), "n = {n}");
    }
}

#[test]
fn placement_holds_for_every_capacity_and_team_count() {
    for capacity in (2..=64).step_by(2) {
        for n in 2..=capacity {
            let teams = ids(n);
            let round = place_teams(capacity, &teams).unwrap();
            let half = capacity / 2;
            assert_eq!(round.len(), half);

            let placed: Vec<TeamId> = round
                .iter()
                .flat_map(|m| [m.team1.team(), m.team2.team()])
                .flatten()
                .collect();
            assert_eq!(placed.len(), n, "C={capacity} N={n}");
            let unique: HashSet<_> = placed.iter().collect();
            assert_eq!(unique.len(), n, "a team was placed twice (C={capacity} N={n})");

            let empty = round
                .iter()
                .flat_map(|m| [m.team1, m.team2])
                .filter(Slot::is_vacant)
                .count();
            assert_eq!(empty, capacity - n);

            let contested = round.iter().filter(|m| m.is_contested()).count();
            assert_eq!(contested, n.saturating_sub(half));
            assert_eq!(round.iter().filter(|m| m.is_decided()).count(), half - contested);

            for m in &round {
                // team2 is only filled after every team1
                if m.team1.is_vacant() {
                    assert!(m.team2.is_vacant());
                    assert_eq!(m.winner, Some(Winner::Bye));
                }
                assert!(m.winner_is_consistent());
            }
        }
    }
}

#[test]
fn eight_slots_five_teams() {
    let teams = ids(5);
    let round = place_teams(8, &teams).unwrap();

    assert_eq!(round.len(), 4);
    assert_eq!(round[0].team1, Slot::Team(teams[0]));
    assert_eq!(round[0].team2, Slot::Team(teams[4]));
    assert_eq!(round[0].winner, None);
    assert_eq!(round[2].team1, Slot::Team(teams[1]));
    assert_eq!(round[1].team1, Slot::Team(teams[2]));
    assert_eq!(round[3].team1, Slot::Team(teams[3]));

    let walkovers = round.iter().filter(|m| m.is_decided()).count();
    assert_eq!(walkovers, 3);
    assert_eq!(round.iter().filter(|m| m.is_contested()).count(), 1);
    assert_eq!(round[1].winner, Some(Winner::Team(teams[2])));
}

#[test]
fn few_teams_land_on_both_halves() {
    let teams = ids(2);
    let round = place_teams(16, &teams).unwrap();
    assert_eq!(round[0].team1, Slot::Team(teams[0]));
    assert_eq!(round[4].team1, Slot::Team(teams[1]));
    assert_eq!(round.iter().filter(|m| m.winner == Some(Winner::Bye)).count(), 6);
}

#[test]
fn placement_rejects_bad_inputs() {
    assert_eq!(
        place_teams(8, &ids(1)),
        Err(TournamentError::NotEnoughTeams(1))
    );
    assert_eq!(
        place_teams(4, &ids(5)),
        Err(TournamentError::TooManyTeams { capacity: 4 })
    );
    assert_eq!(place_teams(7, &ids(3)), Err(TournamentError::InvalidCapacity(7)));
    assert_eq!(place_teams(66, &ids(3)), Err(TournamentError::InvalidCapacity(66)));
    assert_eq!(place_teams(0, &ids(2)), Err(TournamentError::InvalidCapacity(0)));
}

#[test]
fn seeding_is_reproducible_with_a_seeded_rng() {
    let (_, teams) = tournament_with_teams(8, 6);
    let a = seed_bracket(8, &teams, &mut StdRng::seed_from_u64(7)).unwrap();
    let b = seed_bracket(8, &teams, &mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn start_opens_round_one() {
    let (mut t, teams) = tournament_with_teams(8, 5);
    let progress = start_tournament(&mut t, &teams, &mut StdRng::seed_from_u64(1)).unwrap();

    assert_eq!(progress, Progress::Advanced { round: 1 });
    assert_eq!(t.status, TournamentStatus::Active);
    assert_eq!(t.current_round, 1);
    assert_eq!(t.matches.len(), 1);
    assert_eq!(t.matches[0].len(), 4);
    t.check_structure().unwrap();
}

#[test]
fn start_from_pending_is_allowed() {
    let (mut t, teams) = tournament_with_teams(4, 4);
    t.close_registration().unwrap();
    start_tournament(&mut t, &teams, &mut StdRng::seed_from_u64(2)).unwrap();
    assert_eq!(t.status, TournamentStatus::Active);
}

#[test]
fn start_cascades_rounds_decided_by_walkovers() {
    // Two teams in an 8-slot bracket sit in opposite halves, so both walk
    // through rounds 1 and 2 and meet in the final.
    let (mut t, teams) = tournament_with_teams(8, 2);
    let progress = start_tournament(&mut t, &teams, &mut StdRng::seed_from_u64(3)).unwrap();

    assert_eq!(progress, Progress::Advanced { round: 3 });
    assert_eq!(t.current_round, 3);
    assert_eq!(t.matches.len(), 3);
    assert!(t.matches[1].iter().all(|m| m.is_decided() && !m.is_contested()));
    assert_eq!(t.matches[2].len(), 1);
    assert!(t.matches[2][0].is_contested());
    t.check_structure().unwrap();
}

#[test]
fn start_rejects_wrong_state_and_leaves_tournament_untouched() {
    let (mut t, teams) = tournament_with_teams(4, 1);
    assert_eq!(
        start_tournament(&mut t, &teams, &mut StdRng::seed_from_u64(4)),
        Err(TournamentError::NotEnoughTeams(1))
    );
    assert_eq!(t.status, TournamentStatus::Open);
    assert!(t.matches.is_empty());

    let (mut t, teams) = tournament_with_teams(4, 3);
    start_tournament(&mut t, &teams, &mut StdRng::seed_from_u64(5)).unwrap();
    let before: Vec<Vec<Match>> = t.matches.clone();
    assert!(matches!(
        start_tournament(&mut t, &teams, &mut StdRng::seed_from_u64(6)),
        Err(TournamentError::InvalidState { status: TournamentStatus::Active, .. })
    ));
    assert_eq!(t.matches, before);
}

#[test]
fn start_rejects_teams_from_another_tournament() {
    let (mut t, mut teams) = tournament_with_teams(4, 2);
    let (_, others) = tournament_with_teams(4, 1);
    teams.push(others[0].clone());
    assert_eq!(
        start_tournament(&mut t, &teams, &mut StdRng::seed_from_u64(8)),
        Err(TournamentError::TeamNotFound(others[0].id))
    );
}
