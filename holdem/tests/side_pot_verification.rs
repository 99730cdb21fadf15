//! Side pot and settlement tests using property-based testing
//!
//! These tests verify that side pot distribution works correctly in all scenarios:
//! - Multiple all-ins at different amounts
//! - Folded players contribute but can't win
//! - Odd chips are handed out instead of dropped
//! - Side pot eligibility based on contribution levels

use holdem::game::{
    entities::{Card, Chips, Deck, Player, PlayerId, PlayerState},
    settlement::{SidePot, settle, side_pots},
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn player(seat: usize, contributed: Chips, state: PlayerState) -> Player {
    let mut p = Player::new(PlayerId::new(&format!("p{seat}")), &format!("P{seat}"), 0);
    p.contributed = contributed;
    p.state = state;
    p
}

/// Deals two hole cards to everyone still in and returns a five-card board.
fn deal(players: &mut [Player], seed: u64) -> Vec<Card> {
    let mut deck = Deck::shuffled(&mut ChaCha8Rng::seed_from_u64(seed));
    for p in players.iter_mut() {
        p.cards = vec![deck.draw().unwrap(), deck.draw().unwrap()];
    }
    (0..5).map(|_| deck.draw().unwrap()).collect()
}

#[test]
fn test_simple_side_pot_three_players() {
    // Player 0: All-in $50
    // Player 1: Calls $100
    // Player 2: Calls $100
    //
    // Main pot: $150, all 3 eligible
    // Side pot: $100, players 1 and 2 eligible
    let players = vec![
        player(0, 50, PlayerState::AllIn),
        player(1, 100, PlayerState::Call),
        player(2, 100, PlayerState::Call),
    ];
    assert_eq!(
        side_pots(&players),
        vec![
            SidePot {
                amount: 150,
                eligible: vec![0, 1, 2]
            },
            SidePot {
                amount: 100,
                eligible: vec![1, 2]
            },
        ]
    );
}

#[test]
fn test_uncalled_excess_goes_back() {
    // Player 1 shoved 500 into a player with 100 behind.
    let mut players = vec![
        player(0, 100, PlayerState::AllIn),
        player(1, 500, PlayerState::AllIn),
    ];
    let board = deal(&mut players, 1);
    let pots = side_pots(&players);
    assert_eq!(pots[1], SidePot { amount: 400, eligible: vec![1] });

    let result = settle(&players, &board, 600, 0, 1).unwrap();
    assert!(result.payout(1) >= 400);
    assert_eq!(result.payout(0) + result.payout(1), 600);
}

fn state_strategy() -> impl Strategy<Value = PlayerState> {
    prop_oneof![
        Just(PlayerState::AllIn),
        Just(PlayerState::Call),
        Just(PlayerState::Check),
        Just(PlayerState::Fold),
    ]
}

// 2-9 players, each with a contribution and a state; at least one still in
fn table_strategy() -> impl Strategy<Value = Vec<(Chips, PlayerState)>> {
    prop::collection::vec((0 as Chips..=2000, state_strategy()), 2..=9).prop_filter(
        "someone has to contest the pot",
        |seats| {
            seats
                .iter()
                .any(|(c, s)| *s != PlayerState::Fold && *c > 0)
        },
    )
}

fn build(seats: &[(Chips, PlayerState)]) -> Vec<Player> {
    seats
        .iter()
        .enumerate()
        .map(|(seat, (contributed, state))| player(seat, *contributed, *state))
        .collect()
}

proptest! {
    #[test]
    fn test_side_pots_conserve_chips(seats in table_strategy()) {
        let players = build(&seats);
        let total: Chips = players.iter().map(|p| p.contributed).sum();
        let pots = side_pots(&players);
        prop_assert_eq!(pots.iter().map(|p| p.amount).sum::<Chips>(), total);
    }

    #[test]
    fn test_folded_players_never_eligible(seats in table_strategy()) {
        let players = build(&seats);
        for pot in side_pots(&players) {
            prop_assert!(!pot.eligible.is_empty());
            for seat in pot.eligible {
                prop_assert!(players[seat].is_active());
            }
        }
    }

    #[test]
    fn test_eligibility_shrinks_with_each_level(seats in table_strategy()) {
        let pots = side_pots(&build(&seats));
        for pair in pots.windows(2) {
            prop_assert!(pair[1].eligible.len() < pair[0].eligible.len());
            prop_assert!(pair[1].eligible.iter().all(|s| pair[0].eligible.contains(s)));
        }
    }

    #[test]
    fn test_settlement_awards_exactly_the_pot(
        seats in table_strategy(),
        seed in any::<u64>(),
        button in 0usize..9,
    ) {
        let mut players = build(&seats);
        let board = deal(&mut players, seed);
        let pot: Chips = players.iter().map(|p| p.contributed).sum();
        let button = button % players.len();

        let result = settle(&players, &board, pot, button, 1).unwrap();
        let awarded: Chips = result.winners.iter().map(|w| w.amount).sum();
        prop_assert_eq!(awarded, pot);
        prop_assert_eq!(result.pot_awarded, pot);
        for winner in &result.winners {
            prop_assert!(players[winner.seat].is_active(), "folded seat {} won", winner.seat);
        }
    }
}

#[test]
fn test_odd_pot_split_between_two_winners() {
    // Both play the board: broadway straight.
    let board: Vec<Card> = "A♠ K♠ Q♦ J♣ 10♥"
        .split_whitespace()
        .map(|c| c.parse().unwrap())
        .collect();
    let mut players = vec![
        player(0, 50, PlayerState::Call),
        player(1, 1, PlayerState::Fold),
        player(2, 50, PlayerState::Call),
    ];
    players[0].cards = vec!["2♠".parse().unwrap(), "3♥".parse().unwrap()];
    players[1].cards = vec!["7♠".parse().unwrap(), "8♥".parse().unwrap()];
    players[2].cards = vec!["4♦".parse().unwrap(), "5♣".parse().unwrap()];

    // Button on seat 0: seat 2 is the first winner after it going round.
    let result = settle(&players, &board, 101, 0, 1).unwrap();
    assert_eq!(result.payout(2), 51);
    assert_eq!(result.payout(0), 50);
    assert_eq!(result.payout(1), 0);

    let result = settle(&players, &board, 101, 2, 1).unwrap();
    assert_eq!(result.payout(0), 51);
    assert_eq!(result.payout(2), 50);
}
