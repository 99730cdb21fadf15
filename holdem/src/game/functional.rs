//! Hand evaluation.
//!
//! [`eval`] classifies the best five-card hand from up to seven cards and
//! produces a tie-break vector so that two [`HandRank`]s compare
//! lexicographically on `(rank, values)`.

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

use super::{
    constants::HAND_SIZE,
    entities::{ACE, Card, Suit, Value},
};

/// Hand categories, weakest first.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl Rank {
    /// Ordinal from 0 (high card) to 8 (straight flush).
    #[must_use]
    pub const fn category(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "one pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
        };
        write!(f, "{repr}")
    }
}

/// Result of an evaluation. Equality and ordering only look at the rank and
/// the tie-break values; `cards` is there for reporting.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HandRank {
    pub rank: Rank,
    pub values: Vec<Value>,
    pub cards: Vec<Card>,
}

impl PartialEq for HandRank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HandRank {}

impl PartialOrd for HandRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.values.cmp(&other.values))
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rank)?;
        if !self.cards.is_empty() {
            let cards: Vec<String> = self.cards.iter().map(ToString::to_string).collect();
            write!(f, " ({})", cards.join(" "))?;
        }
        Ok(())
    }
}

/// Lexicographic comparison on category, then tie-break values.
#[must_use]
pub fn compare_hands(a: &HandRank, b: &HandRank) -> Ordering {
    a.cmp(b)
}

/// Indices of every hand tied for the best.
#[must_use]
pub fn argmax(hands: &[HandRank]) -> Vec<usize> {
    let Some(best) = hands.iter().max() else {
        return Vec::new();
    };
    hands
        .iter()
        .enumerate()
        .filter_map(|(idx, hand)| (hand == best).then_some(idx))
        .collect()
}

/// Highest straight among `values`, if any. Aces also play low.
fn top_straight(values: &[Value]) -> Option<Value> {
    let mut present = [false; ACE as usize + 1];
    for &v in values {
        present[v as usize] = true;
    }
    present[1] = present[ACE as usize];
    (5..=ACE)
        .rev()
        .find(|&high| (high - 4..=high).all(|v| present[v as usize]))
}

/// One card per value of the straight topped by `high`, highest first.
fn straight_cards(cards: &[Card], high: Value) -> Vec<Card> {
    (high - 4..=high)
        .rev()
        .filter_map(|v| {
            let v = if v == 1 { ACE } else { v };
            cards.iter().find(|c| c.0 == v).copied()
        })
        .collect()
}

/// Picks cards by value, in order, skipping ones already taken.
fn pick(sorted: &[Card], values: &[(Value, usize)]) -> Vec<Card> {
    let mut picked = Vec::with_capacity(HAND_SIZE);
    for &(value, n) in values {
        picked.extend(
            sorted
                .iter()
                .filter(|c| c.0 == value)
                .take(n)
                .copied(),
        );
    }
    picked
}

/// Evaluates the best hand out of `cards`.
///
/// Works on any number of cards up to seven. With fewer than five cards the
/// categories that need five cards can't match and the kicker lists are
/// shorter.
#[must_use]
pub fn eval(cards: &[Card]) -> HandRank {
    let mut sorted = cards.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    // Straight flush / flush.
    let mut flush: Option<Vec<Card>> = None;
    for suit in Suit::ALL {
        let suited: Vec<Card> = sorted.iter().filter(|c| c.1 == suit).copied().collect();
        if suited.len() >= HAND_SIZE {
            let values: Vec<Value> = suited.iter().map(|c| c.0).collect();
            if let Some(high) = top_straight(&values) {
                return HandRank {
                    rank: Rank::StraightFlush,
                    values: vec![high],
                    cards: straight_cards(&suited, high),
                };
            }
            flush = Some(suited);
        }
    }

    // Value groups, ordered by size then value, both descending.
    let mut counts = [0usize; ACE as usize + 1];
    for card in &sorted {
        counts[card.0 as usize] += 1;
    }
    let mut groups: Vec<(Value, usize)> = (2..=ACE)
        .rev()
        .filter(|&v| counts[v as usize] > 0)
        .map(|v| (v, counts[v as usize]))
        .collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    let kickers = |exclude: &[Value], n: usize| -> Vec<Value> {
        sorted
            .iter()
            .map(|c| c.0)
            .filter(|v| !exclude.contains(v))
            .take(n)
            .collect()
    };

    if let Some(&(quad, 4)) = groups.first() {
        let mut values = vec![quad];
        values.extend(kickers(&[quad], 1));
        let mut picks = vec![(quad, 4)];
        picks.extend(values[1..].iter().map(|&v| (v, 1)));
        return HandRank {
            rank: Rank::FourOfAKind,
            cards: pick(&sorted, &picks),
            values,
        };
    }

    if let Some(&(trips, 3)) = groups.first() {
        let pair = groups[1..].iter().find(|(_, n)| *n >= 2).map(|(v, _)| *v);
        if let Some(pair) = pair {
            return HandRank {
                rank: Rank::FullHouse,
                values: vec![trips, pair],
                cards: pick(&sorted, &[(trips, 3), (pair, 2)]),
            };
        }
    }

    if let Some(suited) = flush {
        let cards: Vec<Card> = suited.into_iter().take(HAND_SIZE).collect();
        return HandRank {
            rank: Rank::Flush,
            values: cards.iter().map(|c| c.0).collect(),
            cards,
        };
    }

    let values: Vec<Value> = groups.iter().map(|(v, _)| *v).collect();
    if let Some(high) = top_straight(&values) {
        return HandRank {
            rank: Rank::Straight,
            values: vec![high],
            cards: straight_cards(&sorted, high),
        };
    }

    match groups.as_slice() {
        [(trips, 3), ..] => {
            let mut values = vec![*trips];
            values.extend(kickers(&[*trips], 2));
            let mut picks = vec![(*trips, 3)];
            picks.extend(values[1..].iter().map(|&v| (v, 1)));
            HandRank {
                rank: Rank::ThreeOfAKind,
                cards: pick(&sorted, &picks),
                values,
            }
        }
        [(high, 2), (low, 2), ..] => {
            let mut values = vec![*high, *low];
            values.extend(kickers(&[*high, *low], 1));
            let mut picks = vec![(*high, 2), (*low, 2)];
            picks.extend(values[2..].iter().map(|&v| (v, 1)));
            HandRank {
                rank: Rank::TwoPair,
                cards: pick(&sorted, &picks),
                values,
            }
        }
        [(pair, 2), ..] => {
            let mut values = vec![*pair];
            values.extend(kickers(&[*pair], 3));
            let mut picks = vec![(*pair, 2)];
            picks.extend(values[1..].iter().map(|&v| (v, 1)));
            HandRank {
                rank: Rank::OnePair,
                cards: pick(&sorted, &picks),
                values,
            }
        }
        _ => {
            let cards: Vec<Card> = sorted.into_iter().take(HAND_SIZE).collect();
            HandRank {
                rank: Rank::HighCard,
                values: cards.iter().map(|c| c.0).collect(),
                cards,
            }
        }
    }
}
