//! Pot settlement.
//!
//! Pots are built from each player's contribution over the whole hand, so
//! unequal all-ins produce side pots that only the players who matched them
//! can win.

use serde::{Deserialize, Serialize};

use super::{
    entities::{Card, Chips, Player, PlayerId, SeatIndex},
    errors::InvariantViolation,
    functional::{self, HandRank},
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SidePot {
    pub amount: Chips,
    pub eligible: Vec<SeatIndex>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Winner {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub name: String,
    pub amount: Chips,
    /// Absent when everyone else folded and no cards were compared.
    pub hand: Option<HandRank>,
}

/// Outcome of one hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoundResult {
    pub hand_number: u32,
    pub winners: Vec<Winner>,
    pub pot_awarded: Chips,
    pub board: Vec<Card>,
    pub showdown: bool,
    pub side_pots: Vec<SidePot>,
}

impl RoundResult {
    /// Total chips awarded to a seat.
    #[must_use]
    pub fn payout(&self, seat: SeatIndex) -> Chips {
        self.winners
            .iter()
            .filter(|w| w.seat == seat)
            .map(|w| w.amount)
            .sum()
    }
}

/// Splits the contributions into a main pot and side pots, lowest level
/// first.
///
/// Every distinct contribution of a player still in the hand opens a level.
/// Folded players' chips fill the levels they reached but never make them
/// eligible. Chips above the highest contested level land in the last pot.
#[must_use]
pub fn side_pots(players: &[Player]) -> Vec<SidePot> {
    let mut levels: Vec<Chips> = players
        .iter()
        .filter(|p| p.is_active() && p.contributed > 0)
        .map(|p| p.contributed)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let mut pots: Vec<SidePot> = Vec::with_capacity(levels.len());
    let mut prev = 0;
    for level in levels {
        let amount = players
            .iter()
            .map(|p| p.contributed.min(level) - p.contributed.min(prev))
            .sum();
        let eligible = players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active() && p.contributed >= level)
            .map(|(seat, _)| seat)
            .collect();
        pots.push(SidePot { amount, eligible });
        prev = level;
    }

    let overflow: Chips = players
        .iter()
        .map(|p| p.contributed.saturating_sub(prev))
        .sum();
    if let Some(last) = pots.last_mut() {
        last.amount += overflow;
    }
    pots
}

/// Divides `amount` among `winners`. Odd chips go one at a time to the
/// winners closest to the left of the button.
fn split(
    amount: Chips,
    winners: &[SeatIndex],
    button: SeatIndex,
    num_seats: usize,
) -> Vec<(SeatIndex, Chips)> {
    let mut order = winners.to_vec();
    order.sort_by_key(|&seat| (seat + num_seats - button - 1) % num_seats);
    let share = amount / order.len() as Chips;
    let remainder = amount as usize % order.len();
    order
        .into_iter()
        .enumerate()
        .map(|(i, seat)| (seat, share + Chips::from(i < remainder)))
        .collect()
}

/// Works out who wins what. Doesn't move any chips; the caller credits
/// [`RoundResult::winners`].
pub fn settle(
    players: &[Player],
    board: &[Card],
    pot: Chips,
    button: SeatIndex,
    hand_number: u32,
) -> Result<RoundResult, InvariantViolation> {
    let contributed: Chips = players.iter().map(|p| p.contributed).sum();
    if contributed != pot {
        return Err(InvariantViolation::PotMismatch { pot, contributed });
    }
    if button >= players.len() {
        return Err(InvariantViolation::InvalidSeat(button));
    }

    let contenders: Vec<SeatIndex> = players
        .iter()
        .enumerate()
        .filter_map(|(seat, p)| p.is_active().then_some(seat))
        .collect();

    // Everyone else folded: no cards are compared.
    if let [seat] = contenders[..] {
        let player = &players[seat];
        return Ok(RoundResult {
            hand_number,
            winners: vec![Winner {
                seat,
                player_id: player.id.clone(),
                name: player.name.clone(),
                amount: pot,
                hand: None,
            }],
            pot_awarded: pot,
            board: board.to_vec(),
            showdown: false,
            side_pots: vec![SidePot {
                amount: pot,
                eligible: vec![seat],
            }],
        });
    }

    let hands: Vec<Option<HandRank>> = players
        .iter()
        .map(|p| {
            p.is_active().then(|| {
                let mut cards = p.cards.clone();
                cards.extend_from_slice(board);
                functional::eval(&cards)
            })
        })
        .collect();

    let pots = side_pots(players);
    let mut payouts: Vec<Chips> = vec![0; players.len()];
    for pot in &pots {
        let contest: Vec<HandRank> = pot
            .eligible
            .iter()
            .filter_map(|&seat| hands[seat].clone())
            .collect();
        let winners: Vec<SeatIndex> = functional::argmax(&contest)
            .into_iter()
            .map(|idx| pot.eligible[idx])
            .collect();
        if winners.is_empty() {
            continue;
        }
        for (seat, amount) in split(pot.amount, &winners, button, players.len()) {
            payouts[seat] += amount;
        }
    }

    let awarded: Chips = payouts.iter().sum();
    if awarded != pot {
        return Err(InvariantViolation::ChipLeak {
            expected: u64::from(pot),
            actual: u64::from(awarded),
        });
    }

    let winners = payouts
        .iter()
        .enumerate()
        .filter(|(_, amount)| **amount > 0)
        .map(|(seat, &amount)| Winner {
            seat,
            player_id: players[seat].id.clone(),
            name: players[seat].name.clone(),
            amount,
            hand: hands[seat].clone(),
        })
        .collect();

    Ok(RoundResult {
        hand_number,
        winners,
        pot_awarded: pot,
        board: board.to_vec(),
        showdown: true,
        side_pots: pots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::PlayerState;

    fn player(seat: usize, contributed: Chips, state: PlayerState, cards: &str) -> Player {
        let mut p = Player::new(PlayerId::new(&format!("p{seat}")), &format!("P{seat}"), 0);
        p.contributed = contributed;
        p.state = state;
        p.cards = cards.split_whitespace().map(|c| c.parse().unwrap()).collect();
        p
    }

    fn board(s: &str) -> Vec<Card> {
        s.split_whitespace().map(|c| c.parse().unwrap()).collect()
    }

    // === Side Pot Tests ===

    #[test]
    fn test_side_pots_three_levels() {
        let players = vec![
            player(0, 25, PlayerState::AllIn, ""),
            player(1, 75, PlayerState::AllIn, ""),
            player(2, 150, PlayerState::AllIn, ""),
            player(3, 150, PlayerState::Call, ""),
        ];
        let pots = side_pots(&players);
        assert_eq!(
            pots,
            vec![
                SidePot { amount: 100, eligible: vec![0, 1, 2, 3] },
                SidePot { amount: 150, eligible: vec![1, 2, 3] },
                SidePot { amount: 150, eligible: vec![2, 3] },
            ]
        );
    }

    #[test]
    fn test_folded_chips_fill_pots() {
        let players = vec![
            player(0, 50, PlayerState::Fold, ""),
            player(1, 100, PlayerState::AllIn, ""),
            player(2, 100, PlayerState::Call, ""),
        ];
        let pots = side_pots(&players);
        assert_eq!(pots, vec![SidePot { amount: 250, eligible: vec![1, 2] }]);
    }

    #[test]
    fn test_folded_overflow_goes_to_last_pot() {
        let players = vec![
            player(0, 200, PlayerState::Fold, ""),
            player(1, 100, PlayerState::AllIn, ""),
            player(2, 100, PlayerState::AllIn, ""),
        ];
        let pots = side_pots(&players);
        assert_eq!(pots, vec![SidePot { amount: 400, eligible: vec![1, 2] }]);
    }

    // === Settlement Tests ===

    #[test]
    fn test_last_player_standing_takes_pot_without_showdown() {
        let players = vec![
            player(0, 10, PlayerState::Fold, "2♠ 7♥"),
            player(1, 20, PlayerState::Wait, "A♠ A♥"),
        ];
        let result = settle(&players, &[], 30, 0, 1).unwrap();
        assert!(!result.showdown);
        assert_eq!(result.winners.len(), 1);
        assert_eq!(result.winners[0].seat, 1);
        assert_eq!(result.winners[0].amount, 30);
        assert!(result.winners[0].hand.is_none());
    }

    #[test]
    fn test_best_hand_wins() {
        let players = vec![
            player(0, 100, PlayerState::Call, "A♠ K♠"),
            player(1, 100, PlayerState::Call, "A♥ A♦"),
        ];
        let board = board("Q♠ J♠ 10♠ 2♥ 3♦");
        let result = settle(&players, &board, 200, 0, 1).unwrap();
        assert!(result.showdown);
        assert_eq!(result.payout(0), 200);
        assert_eq!(result.payout(1), 0);
        assert_eq!(
            result.winners[0].hand.as_ref().map(|h| h.rank),
            Some(functional::Rank::StraightFlush)
        );
    }

    #[test]
    fn test_odd_chip_goes_left_of_button() {
        // Board plays for both: a straight, so the pot splits.
        let board = board("A♠ K♠ Q♦ J♣ 10♥");
        let players = vec![
            player(0, 50, PlayerState::Call, "2♠ 3♥"),
            player(1, 51, PlayerState::Fold, "7♠ 8♥"),
            player(2, 0, PlayerState::SittingOut, ""),
            player(3, 0, PlayerState::SittingOut, ""),
            player(4, 0, PlayerState::SittingOut, ""),
            player(5, 50, PlayerState::Call, "4♦ 5♣"),
        ];

        let pot = 151;
        // Button on seat 2: seat 5 is reached before seat 0.
        let result = settle(&players, &board, pot, 2, 1).unwrap();
        assert_eq!(result.payout(5), 76);
        assert_eq!(result.payout(0), 75);
        assert_eq!(result.winners.iter().map(|w| w.amount).sum::<Chips>(), pot);

        // Button on seat 5: seat 0 is next.
        let result = settle(&players, &board, pot, 5, 1).unwrap();
        assert_eq!(result.payout(0), 76);
        assert_eq!(result.payout(5), 75);
    }

    #[test]
    fn test_short_all_in_wins_main_pot_only() {
        let board = board("2♣ 7♦ 9♥ J♠ 4♣");
        let players = vec![
            player(0, 50, PlayerState::AllIn, "A♠ A♥"),
            player(1, 200, PlayerState::Call, "K♠ K♥"),
            player(2, 200, PlayerState::Call, "Q♠ Q♥"),
        ];
        let result = settle(&players, &board, 450, 0, 3).unwrap();
        assert_eq!(result.payout(0), 150);
        assert_eq!(result.payout(1), 300);
        assert_eq!(result.payout(2), 0);
        assert_eq!(result.side_pots.len(), 2);
    }

    #[test]
    fn test_pot_mismatch_is_an_invariant_violation() {
        let players = vec![
            player(0, 10, PlayerState::Call, "A♠ A♥"),
            player(1, 10, PlayerState::Call, "K♠ K♥"),
        ];
        assert_eq!(
            settle(&players, &[], 25, 0, 1),
            Err(InvariantViolation::PotMismatch {
                pot: 25,
                contributed: 20
            })
        );
    }
}
